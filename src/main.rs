mod infra;

use std::sync::Arc;

use infra::ai::AiServices;
use infra::config::{Settings, StoreBackend};
use infra::store::{Gateway, GridFsImages, ImageBucket, MemoryImages, MongoRep, StoreError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum BootError {
    #[error("could not connect to the document store: {0}")]
    Store(#[from] StoreError),
    #[error("server error: {0}")]
    Rocket(#[from] Box<rocket::Error>),
}

impl From<rocket::Error> for BootError {
    fn from(e: rocket::Error) -> Self {
        BootError::Rocket(Box::new(e))
    }
}

#[rocket::main]
async fn main() -> Result<(), BootError> {
    let settings = Settings::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (gateway, images): (Gateway, Arc<dyn ImageBucket>) = match settings.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store");
            (Gateway::in_memory(), Arc::new(MemoryImages::default()))
        }
        StoreBackend::Mongo => {
            let rep = MongoRep::init(&settings.mongodb_uri, &settings.mongodb_database).await?;
            info!(database = %settings.mongodb_database, "connected to mongodb");
            let images = GridFsImages::new(rep.database(), &settings.storage_bucket);
            (Gateway::new(Arc::new(rep)), Arc::new(images))
        }
    };

    let ai = AiServices::from_settings(&settings);
    info!(
        app = %settings.app_name,
        prefix = %settings.api_prefix,
        ai_live = settings.ai_live,
        "starting server"
    );

    infra::build(settings, gateway, images, ai).launch().await?;
    Ok(())
}
