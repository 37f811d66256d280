//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{
    multipart::{MultipartError, MultipartRejection},
    rejection::{FormRejection, JsonRejection, PathRejection},
  },
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use paddock_core::validate::FieldErrors;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication credentials were not provided")]
  Unauthorized,

  #[error("not found")]
  NotFound,

  #[error("invalid input: {0}")]
  Validation(FieldErrors),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("multipart error: {0}")]
  Multipart(#[from] MultipartError),

  #[error("password hashing failed: {0}")]
  Hashing(String),

  #[error("media error: {0}")]
  Media(#[from] std::io::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn field(field: &str, message: impl Into<String>) -> Self {
    Self::Validation(FieldErrors::single(field, message))
  }
}

impl From<paddock_core::Error> for ApiError {
  fn from(e: paddock_core::Error) -> Self {
    match e {
      paddock_core::Error::Unauthenticated => Self::Unauthorized,
      paddock_core::Error::Validation(errors) => Self::Validation(errors),
    }
  }
}

impl From<FieldErrors> for ApiError {
  fn from(errors: FieldErrors) -> Self { Self::Validation(errors) }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { Self::BadRequest(e.body_text()) }
}

impl From<FormRejection> for ApiError {
  fn from(e: FormRejection) -> Self { Self::BadRequest(e.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(e: PathRejection) -> Self { Self::BadRequest(e.body_text()) }
}

impl From<MultipartRejection> for ApiError {
  fn from(e: MultipartRejection) -> Self { Self::BadRequest(e.body_text()) }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(json!({ "detail": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => {
        let mut res = detail(
          StatusCode::UNAUTHORIZED,
          "Authentication credentials were not provided.",
        );
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer realm=\"paddock\""),
        );
        res
      }
      ApiError::NotFound => detail(StatusCode::NOT_FOUND, "Not found."),
      ApiError::Validation(errors) => {
        (StatusCode::BAD_REQUEST, Json(errors)).into_response()
      }
      ApiError::BadRequest(msg) => detail(StatusCode::BAD_REQUEST, msg),
      ApiError::Multipart(e) => detail(e.status(), e.body_text()),
      e @ (ApiError::Hashing(_) | ApiError::Media(_) | ApiError::Store(_)) => {
        tracing::error!(error = %e, "request failed");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Bearer realm=\"paddock\""
    );
  }

  #[test]
  fn core_errors_map_onto_taxonomy() {
    let unauth: ApiError = paddock_core::Error::Unauthenticated.into();
    assert!(matches!(unauth, ApiError::Unauthorized));

    let invalid: ApiError =
      paddock_core::Error::Validation(FieldErrors::single("hr", "bad")).into();
    assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn internal_errors_are_opaque() {
    let err = ApiError::store(std::io::Error::other("disk on fire"));
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
