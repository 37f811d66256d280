//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Register; body `{"email","password","name"?}` |
//! | `POST` | `/users/token` | Exchange credentials for a session token |
//! | `GET`  | `/users/me` | The signed-in user |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use paddock_core::{
  policy::{Operation, owner},
  store::PaddockStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{self, Caller},
  error::ApiError,
  views::{TokenView, UserView},
};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
  #[serde(default)]
  pub name:     String,
}

/// `POST /users`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let Json(body) = body?;
  let user =
    auth::create_account(&*state.store, &body.email, &body.password, &body.name, false)
      .await?;
  tracing::info!(user_id = user.id, "user registered");
  Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `POST /users/token`
pub async fn token<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<TokenView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let Json(body) = body?;
  let user = auth::authenticate(&*state.store, &body.email, &body.password).await?;
  let token = auth::issue_token(&*state.store, user.id).await?;
  Ok(Json(TokenView { token }))
}

/// `GET /users/me`
pub async fn me<S>(Caller(principal): Caller) -> Result<Json<UserView>, ApiError>
where
  S: PaddockStore + Clone + 'static,
{
  let user = owner(&principal, Operation::ReadProfile)?;
  Ok(Json(UserView::from(user.clone())))
}
