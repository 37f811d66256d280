//! Handlers for `/horses` endpoints. Every operation is scoped to the
//! signed-in user; another user's horse is reported as not found.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/horses` | Newest first |
//! | `POST`   | `/horses` | Body `{"name"}`; the API key is generated |
//! | `GET`    | `/horses/{id}` | |
//! | `PUT`    | `/horses/{id}` | `name` required |
//! | `PATCH`  | `/horses/{id}` | |
//! | `DELETE` | `/horses/{id}` | Removes readings and the image file |
//! | `POST`   | `/horses/{id}/upload-image` | Multipart field `image` |

use axum::{
  Json,
  extract::{
    Multipart, State,
    multipart::MultipartRejection,
  },
  http::StatusCode,
  response::IntoResponse,
};
use paddock_core::{
  horse::HorseChanges,
  policy::{Operation, Principal, owner},
  store::PaddockStore,
  validate::{REQUIRED, WriteMode},
};

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  handlers::{Body, ItemId, item_id, object},
  media::ImageKind,
  views::{HorseImageView, HorseView},
};

pub const NOT_AN_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const NO_FILE: &str = "No file was submitted.";

// ─── List / create ────────────────────────────────────────────────────────────

/// `GET /horses`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
) -> Result<Json<Vec<HorseView>>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::ListHorses)?;
  let horses = state.store.list_horses(user.id).await.map_err(ApiError::store)?;
  Ok(Json(
    horses
      .into_iter()
      .map(|h| HorseView::new(h, &state.media))
      .collect(),
  ))
}

/// `POST /horses`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  body: Body,
) -> Result<impl IntoResponse, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::CreateHorse)?;
  let changes = HorseChanges::from_body(&object(body)?, WriteMode::Create)?;
  let name = changes.name.ok_or_else(|| ApiError::field("name", REQUIRED))?;

  let horse = state
    .store
    .create_horse(user.id, name)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(horse_id = horse.id, owner_id = user.id, "horse registered");

  Ok((StatusCode::CREATED, Json(HorseView::new(horse, &state.media))))
}

// ─── Item ─────────────────────────────────────────────────────────────────────

/// `GET /horses/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
) -> Result<Json<HorseView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::ReadHorse)?;
  let id = item_id(id)?;
  let horse = state
    .store
    .get_horse(id, user.id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(HorseView::new(horse, &state.media)))
}

async fn write<S>(
  state: &AppState<S>,
  principal: &Principal,
  id: ItemId,
  body: Body,
  mode: WriteMode,
) -> Result<Json<HorseView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(principal, Operation::UpdateHorse)?;
  let id = item_id(id)?;
  let changes = HorseChanges::from_body(&object(body)?, mode)?;
  let horse = state
    .store
    .update_horse(id, user.id, changes)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(HorseView::new(horse, &state.media)))
}

/// `PUT /horses/{id}`
pub async fn replace<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
  body: Body,
) -> Result<Json<HorseView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  write(&state, &principal, id, body, WriteMode::Replace).await
}

/// `PATCH /horses/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
  body: Body,
) -> Result<Json<HorseView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  write(&state, &principal, id, body, WriteMode::Partial).await
}

/// `DELETE /horses/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
) -> Result<StatusCode, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::DeleteHorse)?;
  let id = item_id(id)?;
  let horse = state
    .store
    .delete_horse(id, user.id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  if let Some(image) = &horse.image {
    state.media.remove(image).await;
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Image upload ─────────────────────────────────────────────────────────────

/// `POST /horses/{id}/upload-image`
pub async fn upload_image<S>(
  State(state): State<AppState<S>>,
  Caller(principal): Caller,
  id: ItemId,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<HorseImageView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::UploadImage)?;
  let id = item_id(id)?;
  state
    .store
    .get_horse(id, user.id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;

  let mut multipart = multipart?;
  let mut upload = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some("image") {
      upload = Some(field.bytes().await?);
      break;
    }
  }
  let bytes = upload
    .filter(|b| !b.is_empty())
    .ok_or_else(|| ApiError::field("image", NO_FILE))?;
  let kind = ImageKind::sniff(&bytes).ok_or_else(|| ApiError::field("image", NOT_AN_IMAGE))?;
  let decodes = tokio::task::spawn_blocking({
    let bytes = bytes.clone();
    move || kind.decodes(&bytes)
  })
  .await
  .unwrap_or(false);
  if !decodes {
    return Err(ApiError::field("image", NOT_AN_IMAGE));
  }

  let path = state.media.save_horse_image(kind, &bytes).await?;
  let Some((horse, replaced)) = state
    .store
    .set_horse_image(id, user.id, path.clone())
    .await
    .map_err(ApiError::store)?
  else {
    // Deleted while the file was being written.
    state.media.remove(&path).await;
    return Err(ApiError::NotFound);
  };
  if let Some(old) = replaced {
    state.media.remove(&old).await;
  }

  Ok(Json(HorseImageView::new(&horse, &state.media)))
}
