//! The `PaddockStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `paddock-store-sqlite`).
//! The API layer depends on this abstraction, not on any concrete backend.
//!
//! Every item-level operation takes the caller's user id and only matches
//! rows owned by that user. A row that exists but belongs to someone else is
//! reported exactly like a row that does not exist (`None` / `false`), so
//! callers cannot tell the two apart.
//!
//! Each write executes as one atomic unit: concurrent readers never observe
//! a half-written reading or a horse whose key is not yet committed.

use std::future::Future;

use crate::{
  filter::ReadingFilter,
  horse::{Horse, HorseChanges},
  reading::{NewReading, Reading, ReadingUpdate},
  user::{NewUser, User},
};

/// Abstraction over a Paddock store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PaddockStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Persist a new account. Returns `None` if the email is already taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up an account by its normalised email.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Delete an account together with its horses, readings and tokens.
  /// Returns `false` if no such account exists.
  fn delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record a session token for `user_id`. Only the token's digest is
  /// handed to the store.
  fn store_token(
    &self,
    user_id: i64,
    digest: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a session token digest to its user.
  fn user_for_token(
    &self,
    digest: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Device registry ───────────────────────────────────────────────────

  /// Register a horse for `owner_id` under a freshly generated API key.
  ///
  /// Key collisions are resolved inside the store by regenerating; they are
  /// never surfaced to the caller.
  fn create_horse(
    &self,
    owner_id: i64,
    name: String,
  ) -> impl Future<Output = Result<Horse, Self::Error>> + Send + '_;

  /// Exact-match lookup used by every device upload.
  fn horse_by_api_key(
    &self,
    api_key: String,
  ) -> impl Future<Output = Result<Option<Horse>, Self::Error>> + Send + '_;

  /// The owner's horses, newest first.
  fn list_horses(
    &self,
    owner_id: i64,
  ) -> impl Future<Output = Result<Vec<Horse>, Self::Error>> + Send + '_;

  fn get_horse(
    &self,
    id: i64,
    owner_id: i64,
  ) -> impl Future<Output = Result<Option<Horse>, Self::Error>> + Send + '_;

  /// Apply client-writable changes. Owner and API key cannot change.
  fn update_horse(
    &self,
    id: i64,
    owner_id: i64,
    changes: HorseChanges,
  ) -> impl Future<Output = Result<Option<Horse>, Self::Error>> + Send + '_;

  /// Point the horse at a new image. Returns the updated horse and the image
  /// path it replaced, if any.
  fn set_horse_image(
    &self,
    id: i64,
    owner_id: i64,
    image: String,
  ) -> impl Future<Output = Result<Option<(Horse, Option<String>)>, Self::Error>>
  + Send
  + '_;

  /// Delete a horse and, by cascade, its readings. Returns the deleted horse.
  fn delete_horse(
    &self,
    id: i64,
    owner_id: i64,
  ) -> impl Future<Output = Result<Option<Horse>, Self::Error>> + Send + '_;

  // ── Readings ──────────────────────────────────────────────────────────

  /// Record a reading for `input.horse_id`. The owner is copied from the
  /// horse and `date_created` is set by the store. Returns `None` if the
  /// horse no longer exists.
  fn create_reading(
    &self,
    input: NewReading,
  ) -> impl Future<Output = Result<Option<Reading>, Self::Error>> + Send + '_;

  /// The owner's readings matching every predicate of `filter`, newest
  /// first.
  fn list_readings<'a>(
    &'a self,
    owner_id: i64,
    filter: &'a ReadingFilter,
  ) -> impl Future<Output = Result<Vec<Reading>, Self::Error>> + Send + 'a;

  fn get_reading(
    &self,
    id: i64,
    owner_id: i64,
  ) -> impl Future<Output = Result<Option<Reading>, Self::Error>> + Send + '_;

  fn update_reading(
    &self,
    id: i64,
    owner_id: i64,
    update: ReadingUpdate,
  ) -> impl Future<Output = Result<Option<Reading>, Self::Error>> + Send + '_;

  /// Returns `false` if nothing owned by `owner_id` had that id.
  fn delete_reading(
    &self,
    id: i64,
    owner_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
