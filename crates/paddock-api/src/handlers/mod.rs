pub mod datapoints;
pub mod horses;
pub mod users;

use axum::{
  Form, Json,
  extract::{FromRequest, Path, Request, rejection::PathRejection},
  http::header,
};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A request body read as a field map.
///
/// JSON bodies must be an object. `application/x-www-form-urlencoded` bodies
/// are accepted too, with every value kept as a string; numeric fields parse
/// from strings either way.
pub struct Payload(pub Map<String, Value>);

impl<S> FromRequest<S> for Payload
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let is_form = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
      let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state).await?;
      Ok(Self(
        pairs
          .into_iter()
          .map(|(k, v)| (k, Value::String(v)))
          .collect(),
      ))
    } else {
      let Json(map) = Json::<Map<String, Value>>::from_request(req, state).await?;
      Ok(Self(map))
    }
  }
}

/// Extractors whose rejection is surfaced by the handler, so that
/// authentication is checked before the body or path is judged.
pub(crate) type Body = Result<Payload, ApiError>;
pub(crate) type ItemId = Result<Path<i64>, PathRejection>;

pub(crate) fn object(body: Body) -> Result<Map<String, Value>, ApiError> {
  let Payload(map) = body?;
  Ok(map)
}

pub(crate) fn item_id(id: ItemId) -> Result<i64, ApiError> {
  let Path(id) = id?;
  Ok(id)
}
