//! Wire representations of the domain types.
//!
//! Each resource has one canonical shape; image paths are turned into public
//! URLs on the way out.

use chrono::{DateTime, Utc};
use paddock_core::{
  horse::Horse,
  reading::{Reading, Telemetry},
  user::User,
};
use serde::Serialize;

use crate::media::MediaStore;

#[derive(Debug, Serialize)]
pub struct UserView {
  pub id:    i64,
  pub email: String,
  pub name:  String,
}

impl From<User> for UserView {
  fn from(user: User) -> Self {
    Self { id: user.id, email: user.email, name: user.name }
  }
}

#[derive(Debug, Serialize)]
pub struct TokenView {
  pub token: String,
}

#[derive(Debug, Serialize)]
pub struct HorseView {
  pub id:      i64,
  pub name:    String,
  pub api_key: String,
  pub image:   Option<String>,
}

impl HorseView {
  pub fn new(horse: Horse, media: &MediaStore) -> Self {
    Self {
      id:      horse.id,
      name:    horse.name,
      api_key: horse.api_key,
      image:   horse.image.as_deref().map(|p| media.url_for(p)),
    }
  }
}

/// Response of an image upload. Never carries the API key.
#[derive(Debug, Serialize)]
pub struct HorseImageView {
  pub id:    i64,
  pub image: Option<String>,
}

impl HorseImageView {
  pub fn new(horse: &Horse, media: &MediaStore) -> Self {
    Self {
      id:    horse.id,
      image: horse.image.as_deref().map(|p| media.url_for(p)),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ReadingView {
  pub id:           i64,
  pub horse:        i64,
  pub name:         String,
  pub api_key:      String,
  pub image:        Option<String>,
  pub date_created: DateTime<Utc>,
  #[serde(flatten)]
  pub telemetry:    Telemetry,
}

impl ReadingView {
  pub fn new(reading: Reading, media: &MediaStore) -> Self {
    Self {
      id:           reading.id,
      horse:        reading.horse_id,
      name:         reading.name,
      api_key:      reading.api_key,
      image:        reading.image.as_deref().map(|p| media.url_for(p)),
      date_created: reading.date_created,
      telemetry:    reading.telemetry,
    }
  }
}
