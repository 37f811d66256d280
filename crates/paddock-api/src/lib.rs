//! JSON REST API for Paddock.
//!
//! Exposes an axum [`Router`] backed by any [`PaddockStore`]: user
//! registration and tokens, the horse registry, and the datapoint collection
//! that devices write to with their API key.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = paddock_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod views;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use paddock_core::store::PaddockStore;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
use handlers::{datapoints, horses, users};
pub use media::MediaStore;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: PaddockStore> {
  pub store:  Arc<S>,
  pub media:  Arc<MediaStore>,
  pub config: Arc<ServerConfig>,
}

impl<S: PaddockStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let media = MediaStore::new(config.media_root.clone(), config.media_url.clone());
    Self {
      store:  Arc::new(store),
      media:  Arc::new(media),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PaddockStore + Clone + 'static,
{
  let upload_limit = state.config.max_upload_bytes;

  Router::new()
    // Users
    .route("/users", post(users::register::<S>))
    .route("/users/token", post(users::token::<S>))
    .route("/users/me", get(users::me::<S>))
    // Horses
    .route("/horses", get(horses::list::<S>).post(horses::create::<S>))
    .route(
      "/horses/{id}",
      get(horses::get_one::<S>)
        .put(horses::replace::<S>)
        .patch(horses::update::<S>)
        .delete(horses::delete_one::<S>),
    )
    .route(
      "/horses/{id}/upload-image",
      post(horses::upload_image::<S>).layer(DefaultBodyLimit::max(upload_limit)),
    )
    // Datapoints
    .route("/datapoints", get(datapoints::list::<S>).post(datapoints::create::<S>))
    .route(
      "/datapoints/{id}",
      get(datapoints::get_one::<S>)
        .put(datapoints::replace::<S>)
        .patch(datapoints::update::<S>)
        .delete(datapoints::delete_one::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
