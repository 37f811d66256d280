//! Who may perform which operation.
//!
//! Every request is evaluated on its own; there is no session state beyond
//! the credential it carries. Two rules exist:
//!
//! - **Ingestion** (creating a reading): no user is needed. The request is
//!   admitted as long as it names a device API key. Whether the key is valid
//!   is decided by the device registry afterwards, and the reading's owner is
//!   always taken from the device.
//! - **Ownership** (everything else): a signed-in, active user is required,
//!   and the handler scopes its query to that user's records. Client-supplied
//!   owner fields are never consulted.

use std::fmt;

use crate::{
  Error, Result,
  user::User,
  validate::{FieldErrors, REQUIRED},
};

/// The identity a request was resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
  Anonymous,
  User(User),
}

impl Principal {
  /// Resolve the user behind a credential. A missing or deactivated account
  /// yields [`Principal::Anonymous`].
  pub fn from_user(user: Option<User>) -> Self {
    match user {
      Some(user) if user.is_active => Self::User(user),
      _ => Self::Anonymous,
    }
  }

  pub fn user(&self) -> Option<&User> {
    match self {
      Self::User(user) => Some(user),
      Self::Anonymous => None,
    }
  }
}

/// An API operation, together with the parts of the request shape the
/// policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
  /// Device upload. Carries the `api_key` field of the payload, if any.
  IngestReading { api_key: Option<&'a str> },
  ListReadings,
  ReadReading,
  UpdateReading,
  DeleteReading,
  ListHorses,
  CreateHorse,
  ReadHorse,
  UpdateHorse,
  DeleteHorse,
  UploadImage,
  ReadProfile,
}

impl fmt::Display for Operation<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::IngestReading { .. } => "ingest_reading",
      Self::ListReadings => "list_readings",
      Self::ReadReading => "read_reading",
      Self::UpdateReading => "update_reading",
      Self::DeleteReading => "delete_reading",
      Self::ListHorses => "list_horses",
      Self::CreateHorse => "create_horse",
      Self::ReadHorse => "read_horse",
      Self::UpdateHorse => "update_horse",
      Self::DeleteHorse => "delete_horse",
      Self::UploadImage => "upload_image",
      Self::ReadProfile => "read_profile",
    };
    f.write_str(name)
  }
}

/// What an admitted request is allowed to act as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Grant<'a> {
  /// Act on the records owned by this user, and only those.
  Owner(&'a User),
  /// Write one reading for the device holding this key.
  Device { api_key: &'a str },
}

/// Decide whether `principal` may perform `op`.
///
/// Failures are [`Error::Unauthenticated`] for an ownership operation
/// without a user, and a validation error on `api_key` for an ingestion
/// request that does not name a key.
pub fn authorize<'a>(principal: &'a Principal, op: Operation<'a>) -> Result<Grant<'a>> {
  match op {
    Operation::IngestReading { api_key } => match api_key.map(str::trim) {
      Some(key) if !key.is_empty() => Ok(Grant::Device { api_key: key }),
      _ => Err(FieldErrors::single("api_key", REQUIRED).into()),
    },
    _ => principal.user().map(Grant::Owner).ok_or(Error::Unauthenticated),
  }
}

/// [`authorize`] for ownership operations: the user whose records the
/// request is confined to.
pub fn owner<'a>(principal: &'a Principal, op: Operation<'a>) -> Result<&'a User> {
  match authorize(principal, op)? {
    Grant::Owner(user) => Ok(user),
    Grant::Device { .. } => Err(Error::Unauthenticated),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn user(active: bool) -> User {
    User {
      id:            7,
      email:         "rider@example.com".into(),
      name:          String::new(),
      password_hash: String::new(),
      is_active:     active,
      is_staff:      false,
      is_superuser:  false,
      date_joined:   Utc::now(),
    }
  }

  const OWNER_OPS: [Operation<'static>; 11] = [
    Operation::ListReadings,
    Operation::ReadReading,
    Operation::UpdateReading,
    Operation::DeleteReading,
    Operation::ListHorses,
    Operation::CreateHorse,
    Operation::ReadHorse,
    Operation::UpdateHorse,
    Operation::DeleteHorse,
    Operation::UploadImage,
    Operation::ReadProfile,
  ];

  #[test]
  fn anonymous_is_refused_every_ownership_operation() {
    for op in OWNER_OPS {
      assert!(
        matches!(authorize(&Principal::Anonymous, op), Err(Error::Unauthenticated)),
        "{op}"
      );
    }
  }

  #[test]
  fn signed_in_user_is_granted_own_scope() {
    let principal = Principal::from_user(Some(user(true)));
    for op in OWNER_OPS {
      let granted = owner(&principal, op).unwrap();
      assert_eq!(granted.id, 7);
    }
  }

  #[test]
  fn inactive_user_is_anonymous() {
    let principal = Principal::from_user(Some(user(false)));
    assert_eq!(principal, Principal::Anonymous);
    assert!(matches!(
      owner(&principal, Operation::ListHorses),
      Err(Error::Unauthenticated)
    ));
  }

  #[test]
  fn ingestion_needs_only_a_key() {
    let op = Operation::IngestReading { api_key: Some(" abcdefghijkl ") };
    assert_eq!(
      authorize(&Principal::Anonymous, op).unwrap(),
      Grant::Device { api_key: "abcdefghijkl" }
    );

    let signed_in = Principal::from_user(Some(user(true)));
    assert_eq!(
      authorize(&signed_in, op).unwrap(),
      Grant::Device { api_key: "abcdefghijkl" }
    );
  }

  #[test]
  fn ingestion_without_key_is_a_field_error() {
    for api_key in [None, Some(""), Some("   ")] {
      let err = authorize(&Principal::Anonymous, Operation::IngestReading { api_key })
        .unwrap_err();
      assert!(
        matches!(&err, Error::Validation(e) if e.get("api_key") == Some(&[REQUIRED.to_owned()][..]))
      );
    }
  }

  #[test]
  fn device_grant_never_yields_an_owner() {
    let op = Operation::IngestReading { api_key: Some("abcdefghijkl") };
    assert!(matches!(
      owner(&Principal::Anonymous, op),
      Err(Error::Unauthenticated)
    ));
  }
}
