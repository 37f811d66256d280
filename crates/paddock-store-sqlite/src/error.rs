//! Error type for `paddock-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("decimal parse error in column {column}: {message}")]
  DecimalParse {
    column:  &'static str,
    message: String,
  },

  /// Every generated API key collided with an existing one.
  #[error("could not allocate a unique api key after {0} attempts")]
  KeySpaceExhausted(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
