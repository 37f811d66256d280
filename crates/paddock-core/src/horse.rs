//! Horses: the telemetry-emitting devices registered by a user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Result,
  validate::{FieldErrors, WriteMode, text_field},
};

pub const NAME_MAX_LEN: usize = 255;

/// A registered device. `api_key` is assigned by the store at creation and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horse {
  pub id:       i64,
  /// The owning user. Fixed for the lifetime of the horse.
  pub owner_id: i64,
  pub name:     String,
  pub api_key:  String,
  /// Path of the uploaded image relative to the media root.
  pub image:    Option<String>,
}

/// The client-writable subset of a horse.
///
/// `api_key`, `owner`/`user`, `id` and `image` are not writable through a
/// request body; if a client sends them they are dropped here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HorseChanges {
  pub name: Option<String>,
}

impl HorseChanges {
  /// Project a request body onto the writable fields for `mode`.
  pub fn from_body(body: &Map<String, Value>, mode: WriteMode) -> Result<Self> {
    let mut errors = FieldErrors::new();
    let name = text_field(body, "name", mode.requires_all(), NAME_MAX_LEN, &mut errors);
    errors.finish(Self { name })
  }
}
