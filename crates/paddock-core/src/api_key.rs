//! Device API keys: short random bearer secrets that authorise telemetry
//! uploads for exactly one horse.
//!
//! Keys are 12 characters over `[A-Za-z0-9]`, about 71 bits of entropy.
//! Uniqueness is not checked here; the store's UNIQUE constraint is the
//! source of truth and the store regenerates on collision.

use rand_core::{OsRng, RngCore};

pub const API_KEY_LEN: usize = 12;

const ALPHABET: &[u8; 62] =
  b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Largest multiple of the alphabet size that fits in a byte; bytes at or
/// above it are discarded so every character is equally likely.
const REJECT_AT: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// Generate a fresh key from the operating system's CSPRNG.
pub fn generate() -> String { generate_with(&mut OsRng) }

/// Generate a key from `rng`.
pub fn generate_with(rng: &mut impl RngCore) -> String {
  let mut key = String::with_capacity(API_KEY_LEN);
  let mut buf = [0u8; 32];
  while key.len() < API_KEY_LEN {
    rng.fill_bytes(&mut buf);
    for &byte in &buf {
      if byte >= REJECT_AT {
        continue;
      }
      key.push(ALPHABET[usize::from(byte) % ALPHABET.len()] as char);
      if key.len() == API_KEY_LEN {
        break;
      }
    }
  }
  key
}
