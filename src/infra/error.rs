use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json, Value};
use rocket::{catch, Request};
use thiserror::Error;
use tracing::error;
use validator::{Validate, ValidationErrors};

use super::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed validation")]
    Validation(#[from] ValidationErrors),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database failure: {0}")]
    Store(StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound("document"),
            other => ApiError::Store(other),
        }
    }
}

impl From<rocket::serde::json::Error<'_>> for ApiError {
    fn from(e: rocket::serde::json::Error<'_>) -> Self {
        match e {
            rocket::serde::json::Error::Io(e) => {
                ApiError::BadRequest(format!("could not read body: {e}"))
            }
            rocket::serde::json::Error::Parse(_, e) => ApiError::MalformedBody(e.to_string()),
        }
    }
}

/// Unwraps a JSON data guard and runs the body's validation rules.
pub fn validated<T: Validate>(
    body: Result<Json<T>, rocket::serde::json::Error<'_>>,
) -> ApiResult<T> {
    let body = body?.into_inner();
    body.validate()?;
    Ok(body)
}

/// Maps a generic store not-found onto the resource the handler was after.
pub trait NotFoundAs<T> {
    fn or_not_found(self, resource: &'static str) -> ApiResult<T>;
}

impl<T> NotFoundAs<T> for Result<T, StoreError> {
    fn or_not_found(self, resource: &'static str) -> ApiResult<T> {
        self.map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound(resource),
            other => ApiError::Store(other),
        })
    }
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => Status::UnprocessableEntity,
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Store(_) => Status::InternalServerError,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!({
                "error": "validation_failed",
                "message": self.to_string(),
                "details": errors,
            }),
            ApiError::MalformedBody(detail) => json!({
                "error": "malformed_body",
                "message": "request body does not match the expected schema",
                "details": detail,
            }),
            ApiError::BadRequest(message) => json!({
                "error": "bad_request",
                "message": message,
            }),
            ApiError::NotFound(_) => json!({
                "error": "not_found",
                "message": self.to_string(),
            }),
            ApiError::Store(_) => json!({
                "error": "database_error",
                "message": "database error occurred, please try again later",
            }),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        if let ApiError::Store(e) = &self {
            error!(uri = %request.uri(), error = %e, "store failure");
        }
        (self.status(), Json(self.body())).respond_to(request)
    }
}

fn catcher_body(status: Status, message: &str) -> Json<Value> {
    Json(json!({
        "error": status.reason_lossy().to_lowercase().replace(' ', "_"),
        "message": message,
    }))
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<Value> {
    catcher_body(Status::BadRequest, "the request could not be understood")
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<Value> {
    catcher_body(Status::NotFound, &format!("no route for {}", req.uri()))
}

#[catch(413)]
pub fn payload_too_large(_req: &Request) -> Json<Value> {
    catcher_body(Status::PayloadTooLarge, "request body exceeds the configured limit")
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<Value> {
    catcher_body(Status::UnprocessableEntity, "request body does not match the expected schema")
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<Value> {
    catcher_body(Status::InternalServerError, "internal server error")
}
