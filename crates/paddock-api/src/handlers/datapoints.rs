//! Handlers for `/datapoints` endpoints.
//!
//! Creation is the ingestion path: it is open to any caller and is
//! authorised by the device API key in the body alone. Everything else
//! requires a signed-in user and only sees that user's readings.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/datapoints` | `?horse__api_key=&date_created__{gt,gte,lt,lte}=` |
//! | `POST`   | `/datapoints` | JSON or form body `{"api_key", <telemetry>...}`; no session needed |
//! | `GET`    | `/datapoints/{id}` | |
//! | `PUT`    | `/datapoints/{id}` | Absent telemetry fields are cleared |
//! | `PATCH`  | `/datapoints/{id}` | |
//! | `DELETE` | `/datapoints/{id}` | |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use paddock_core::{
  filter::ReadingFilter,
  policy::{Grant, Operation, Principal, authorize, owner},
  reading::{NewReading, ReadingUpdate, Telemetry},
  store::PaddockStore,
  validate::{FieldErrors, NOT_A_STRING, WriteMode},
};
use serde_json::Value;

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  handlers::{Body, ItemId, item_id, object},
  views::ReadingView,
};

pub const INVALID_API_KEY: &str = "Invalid API key.";

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /datapoints[?<filters>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ReadingView>>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::ListReadings)?;
  let filter =
    ReadingFilter::from_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

  let readings = state
    .store
    .list_readings(user.id, &filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(
    readings
      .into_iter()
      .map(|r| ReadingView::new(r, &state.media))
      .collect(),
  ))
}

// ─── Ingestion ────────────────────────────────────────────────────────────────

/// `POST /datapoints`
///
/// Session credentials are never consulted here: the reading's owner is
/// always the owner of the horse the key belongs to.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  body: Body,
) -> Result<impl IntoResponse, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let body = object(body)?;
  let anonymous = Principal::Anonymous;
  let mut errors = FieldErrors::new();

  let grant = match body.get("api_key") {
    Some(raw) if !raw.is_string() && !raw.is_null() => {
      errors.add("api_key", NOT_A_STRING);
      None
    }
    raw => {
      let op = Operation::IngestReading { api_key: raw.and_then(Value::as_str) };
      errors.absorb(authorize(&anonymous, op))?
    }
  };
  let telemetry = errors.absorb(Telemetry::from_body(&body))?;

  let (Some(Grant::Device { api_key }), Some(telemetry)) = errors.finish((grant, telemetry))?
  else {
    return Err(ApiError::Unauthorized);
  };

  let horse = state
    .store
    .horse_by_api_key(api_key.to_owned())
    .await
    .map_err(ApiError::store)?;
  let Some(horse) = horse else {
    tracing::info!("datapoint rejected: unknown api key");
    return Err(ApiError::field("api_key", INVALID_API_KEY));
  };

  let reading = state
    .store
    .create_reading(NewReading { horse_id: horse.id, telemetry })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::field("api_key", INVALID_API_KEY))?;
  tracing::debug!(horse_id = horse.id, reading_id = reading.id, "datapoint ingested");

  Ok((StatusCode::CREATED, Json(ReadingView::new(reading, &state.media))))
}

// ─── Item ─────────────────────────────────────────────────────────────────────

/// `GET /datapoints/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
) -> Result<Json<ReadingView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::ReadReading)?;
  let id = item_id(id)?;
  let reading = state
    .store
    .get_reading(id, user.id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(ReadingView::new(reading, &state.media)))
}

async fn write<S>(
  state: &AppState<S>,
  principal: &Principal,
  id: ItemId,
  body: Body,
  mode: WriteMode,
) -> Result<Json<ReadingView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(principal, Operation::UpdateReading)?;
  let id = item_id(id)?;
  let update = ReadingUpdate::from_body(&object(body)?, mode)?;
  let reading = state
    .store
    .update_reading(id, user.id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(ReadingView::new(reading, &state.media)))
}

/// `PUT /datapoints/{id}`
pub async fn replace<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
  body: Body,
) -> Result<Json<ReadingView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  write(&state, &principal, id, body, WriteMode::Replace).await
}

/// `PATCH /datapoints/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
  body: Body,
) -> Result<Json<ReadingView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  write(&state, &principal, id, body, WriteMode::Partial).await
}

/// `DELETE /datapoints/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
) -> Result<StatusCode, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::DeleteReading)?;
  let id = item_id(id)?;
  let deleted = state
    .store
    .delete_reading(id, user.id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound);
  }
  Ok(StatusCode::NO_CONTENT)
}
