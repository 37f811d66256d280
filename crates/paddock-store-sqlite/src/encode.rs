//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! fraction. Decimals are stored as their canonical string form.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use paddock_core::{
  horse::Horse,
  reading::{Metric, Reading, Telemetry},
  user::User,
};
use rust_decimal::Decimal;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so lexical order matches chronological order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.to_string() }

pub fn decode_decimal(column: &'static str, s: &str) -> Result<Decimal> {
  Decimal::from_str(s).map_err(|e| Error::DecimalParse {
    column,
    message: e.to_string(),
  })
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "id, email, name, password_hash, is_active, is_staff, is_superuser, date_joined";

pub const HORSE_COLUMNS: &str = "id, user_id, name, api_key, image";

/// Readings joined with their horse. Metric columns follow [`Metric::ALL`].
pub const READING_SELECT: &str = "
  SELECT r.id, r.horse_id, r.user_id, h.name, h.api_key, h.image,
         r.date_created,
         r.gps_lat, r.gps_long, r.temp, r.hr, r.hr_interval, r.batt
  FROM readings r
  JOIN horses h ON h.id = r.horse_id";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
  pub is_active:     bool,
  pub is_staff:      bool,
  pub is_superuser:  bool,
  pub date_joined:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      email:         row.get(1)?,
      name:          row.get(2)?,
      password_hash: row.get(3)?,
      is_active:     row.get(4)?,
      is_staff:      row.get(5)?,
      is_superuser:  row.get(6)?,
      date_joined:   row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      email:         self.email,
      name:          self.name,
      password_hash: self.password_hash,
      is_active:     self.is_active,
      is_staff:      self.is_staff,
      is_superuser:  self.is_superuser,
      date_joined:   decode_dt(&self.date_joined)?,
    })
  }
}

/// A `horses` row needs no decoding; it maps straight onto [`Horse`].
pub fn horse_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Horse> {
  Ok(Horse {
    id:       row.get(0)?,
    owner_id: row.get(1)?,
    name:     row.get(2)?,
    api_key:  row.get(3)?,
    image:    row.get(4)?,
  })
}

/// Raw values read from [`READING_SELECT`].
pub struct RawReading {
  pub id:           i64,
  pub horse_id:     i64,
  pub owner_id:     i64,
  pub name:         String,
  pub api_key:      String,
  pub image:        Option<String>,
  pub date_created: String,
  pub metrics:      [Option<String>; 6],
}

impl RawReading {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      horse_id:     row.get(1)?,
      owner_id:     row.get(2)?,
      name:         row.get(3)?,
      api_key:      row.get(4)?,
      image:        row.get(5)?,
      date_created: row.get(6)?,
      metrics:      [
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
      ],
    })
  }

  pub fn into_reading(self) -> Result<Reading> {
    let mut telemetry = Telemetry::default();
    for (metric, raw) in Metric::ALL.into_iter().zip(&self.metrics) {
      let value = raw
        .as_deref()
        .map(|s| decode_decimal(metric.name(), s))
        .transpose()?;
      telemetry.set(metric, value);
    }

    Ok(Reading {
      id: self.id,
      horse_id: self.horse_id,
      owner_id: self.owner_id,
      name: self.name,
      api_key: self.api_key,
      image: self.image,
      date_created: decode_dt(&self.date_created)?,
      telemetry,
    })
  }
}

/// The metric values of `telemetry` in column order.
pub fn encode_metrics(telemetry: &Telemetry) -> [Option<String>; 6] {
  Metric::ALL.map(|metric| telemetry.get(metric).map(encode_decimal))
}
