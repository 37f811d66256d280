//! Error types for `paddock-core`.

use thiserror::Error;

use crate::validate::FieldErrors;

#[derive(Debug, Error)]
pub enum Error {
  /// The operation needs a signed-in user and the request carried none.
  #[error("authentication credentials were not provided")]
  Unauthenticated,

  /// One or more request fields were rejected; nothing was written.
  #[error("invalid input: {0}")]
  Validation(FieldErrors),
}

impl From<FieldErrors> for Error {
  fn from(errors: FieldErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
