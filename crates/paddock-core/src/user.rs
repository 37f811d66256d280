//! User accounts. Credential hashing and token issuance live in the API
//! crate; this module only describes the record and its email rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, validate::FieldErrors};

/// A registered account. Owns horses and, through them, readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub email:         String,
  pub name:          String,
  /// argon2 PHC string; never serialised.
  #[serde(skip)]
  pub password_hash: String,
  pub is_active:     bool,
  pub is_staff:      bool,
  pub is_superuser:  bool,
  pub date_joined:   DateTime<Utc>,
}

/// Input to [`crate::store::PaddockStore::create_user`]. The email must
/// already be normalised with [`normalize_email`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
  pub is_staff:      bool,
  pub is_superuser:  bool,
}

impl NewUser {
  /// A regular (non-staff) account.
  pub fn new(email: String, name: String, password_hash: String) -> Self {
    Self {
      email,
      name,
      password_hash,
      is_staff: false,
      is_superuser: false,
    }
  }
}

pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Normalise an email address: surrounding whitespace is dropped and the
/// domain is lowercased. The local part keeps its case, since mail servers
/// are free to treat it case-sensitively.
pub fn normalize_email(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let Some((local, domain)) = trimmed.rsplit_once('@') else {
    return Err(FieldErrors::single("email", INVALID_EMAIL).into());
  };
  if local.is_empty()
    || domain.is_empty()
    || trimmed.chars().any(char::is_whitespace)
  {
    return Err(FieldErrors::single("email", INVALID_EMAIL).into());
  }
  Ok(format!("{local}@{}", domain.to_lowercase()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[test]
  fn domain_is_lowercased_local_part_preserved() {
    let cases = [
      ("test1@EXAMPLE.com", "test1@example.com"),
      ("Test2@Example.com", "Test2@example.com"),
      ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
      ("test4@example.COM", "test4@example.com"),
    ];
    for (raw, expected) in cases {
      assert_eq!(normalize_email(raw).unwrap(), expected);
    }
  }

  #[test]
  fn surrounding_whitespace_is_ignored() {
    assert_eq!(
      normalize_email("  rider@Stable.org\n").unwrap(),
      "rider@stable.org"
    );
  }

  #[test]
  fn malformed_addresses_are_rejected() {
    for raw in ["", "no-at-sign", "@example.com", "user@", "a b@example.com"] {
      let err = normalize_email(raw).unwrap_err();
      assert!(
        matches!(&err, Error::Validation(e) if e.get("email").is_some()),
        "{raw:?} -> {err:?}"
      );
    }
  }
}
