//! Session credentials: password hashing, token issuance, and the [`Caller`]
//! extractor that resolves a request to a [`Principal`].

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use paddock_core::{
  policy::Principal,
  store::PaddockStore,
  user::{NewUser, User, normalize_email},
  validate::{BLANK, FieldErrors, REQUIRED},
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{AppState, error::ApiError};

pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
pub const EMAIL_TAKEN: &str = "user with this email already exists.";

/// Random bytes per session token; hex-encoded to 40 characters.
const TOKEN_BYTES: usize = 20;

// ─── Passwords ───────────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// The value stored for a token. The token itself is never persisted.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Mint a token for `user_id` and record its digest.
pub async fn issue_token<S: PaddockStore>(store: &S, user_id: i64) -> Result<String, ApiError> {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  let token = hex::encode(bytes);
  store
    .store_token(user_id, token_digest(&token))
    .await
    .map_err(ApiError::store)?;
  Ok(token)
}

/// The token in an `Authorization: Bearer <t>` or `Token <t>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let token = value
    .strip_prefix("Bearer ")
    .or_else(|| value.strip_prefix("Token "))?
    .trim();
  (!token.is_empty()).then_some(token)
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Validate, hash and persist a new account.
pub async fn create_account<S: PaddockStore>(
  store: &S,
  email: &str,
  password: &str,
  name: &str,
  superuser: bool,
) -> Result<User, ApiError> {
  let mut errors = FieldErrors::new();
  let email = if email.trim().is_empty() {
    errors.add("email", REQUIRED);
    None
  } else {
    match normalize_email(email) {
      Ok(email) => Some(email),
      Err(paddock_core::Error::Validation(e)) => {
        for message in e.get("email").unwrap_or_default() {
          errors.add("email", message.clone());
        }
        None
      }
      Err(e) => return Err(e.into()),
    }
  };
  if password.is_empty() {
    errors.add("password", REQUIRED);
  } else if password.trim().is_empty() {
    errors.add("password", BLANK);
  }
  let email = errors.finish(email)?.unwrap_or_default();

  let mut input = NewUser::new(email, name.trim().to_owned(), hash_password(password)?);
  input.is_staff = superuser;
  input.is_superuser = superuser;

  store
    .create_user(input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::field("email", EMAIL_TAKEN))
}

/// Check an email/password pair. Unknown, inactive and wrong-password
/// accounts are reported identically.
pub async fn authenticate<S: PaddockStore>(
  store: &S,
  email: &str,
  password: &str,
) -> Result<User, ApiError> {
  let rejected = || ApiError::field("non_field_errors", INVALID_CREDENTIALS);
  let Ok(email) = normalize_email(email) else { return Err(rejected()) };
  let user = store
    .find_user_by_email(email)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(rejected)?;
  if !user.is_active || !verify_password(password, &user.password_hash) {
    return Err(rejected());
  }
  Ok(user)
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The principal behind a request. A missing, unknown or revoked token, or
/// a deactivated account, resolves to [`Principal::Anonymous`]; whether that
/// is acceptable is up to the access policy.
pub struct Caller(pub Principal);

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: PaddockStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Some(token) = bearer_token(&parts.headers) else {
      return Ok(Caller(Principal::Anonymous));
    };
    let user = state
      .store
      .user_for_token(token_digest(token))
      .await
      .map_err(ApiError::store)?;
    Ok(Caller(Principal::from_user(user)))
  }
}
