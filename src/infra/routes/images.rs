use std::sync::Arc;

use rocket::http::{ContentType, Header};
use rocket::{get, Responder, State};

use crate::infra::error::{ApiResult, NotFoundAs};
use crate::infra::store::{ImageBucket, StoredImage};

#[derive(Responder)]
pub struct ImageResponse {
    bytes: Vec<u8>,
    content_type: ContentType,
    disposition: Header<'static>,
}

impl From<StoredImage> for ImageResponse {
    fn from(image: StoredImage) -> Self {
        let content_type =
            ContentType::parse_flexible(&image.content_type).unwrap_or(ContentType::Binary);
        let name = image
            .filename
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .replace('"', "");
        ImageResponse {
            bytes: image.bytes,
            content_type,
            disposition: Header::new(
                "Content-Disposition",
                format!("inline; filename=\"{name}\""),
            ),
        }
    }
}

#[get("/<id>")]
pub async fn get_image(
    images: &State<Arc<dyn ImageBucket>>,
    id: &str,
) -> ApiResult<ImageResponse> {
    let image = images.download(id).await.or_not_found("image")?;
    Ok(ImageResponse::from(image))
}
