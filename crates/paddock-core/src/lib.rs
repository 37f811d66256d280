//! Core types and trait definitions for the Paddock telemetry service.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the domain model (users, horses, readings), the access policy, the reading
//! filter engine and the field validation rules; the store and API crates
//! build on top of it.

pub mod api_key;
pub mod error;
pub mod filter;
pub mod horse;
pub mod policy;
pub mod reading;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
