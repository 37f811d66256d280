//! Declarative filters over a user's readings.
//!
//! A fixed set of optional query parameters is parsed into a
//! [`ReadingFilter`]. Each supplied parameter becomes one [`Predicate`]; the
//! store combines them with `AND` on top of the owner-scoped base query.
//! Unknown parameters are ignored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{Result, validate::FieldErrors};

pub const INVALID_DATETIME: &str = "Enter a valid date/time.";

// ─── Parameters ──────────────────────────────────────────────────────────────

pub const PARAM_API_KEY: &str = "horse__api_key";
pub const PARAM_CREATED_GT: &str = "date_created__gt";
pub const PARAM_CREATED_GTE: &str = "date_created__gte";
pub const PARAM_CREATED_LT: &str = "date_created__lt";
pub const PARAM_CREATED_LTE: &str = "date_created__lte";

/// One condition of a reading query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
  /// The reading's horse has exactly this API key.
  ApiKey(String),
  /// `date_created > t`
  CreatedAfter(DateTime<Utc>),
  /// `date_created >= t`
  CreatedFrom(DateTime<Utc>),
  /// `date_created < t`
  CreatedBefore(DateTime<Utc>),
  /// `date_created <= t`
  CreatedUntil(DateTime<Utc>),
}

/// Parameters for [`crate::store::PaddockStore::list_readings`]. Every bound
/// is independent; an empty filter returns the whole owner-scoped set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingFilter {
  pub api_key:     Option<String>,
  pub created_gt:  Option<DateTime<Utc>>,
  pub created_gte: Option<DateTime<Utc>>,
  pub created_lt:  Option<DateTime<Utc>>,
  pub created_lte: Option<DateTime<Utc>>,
}

impl ReadingFilter {
  /// Build a filter from query-string pairs. Blank values are treated as
  /// absent; an unparseable timestamp is reported against its parameter.
  pub fn from_params<'a, I>(params: I) -> Result<Self>
  where
    I: IntoIterator<Item = (&'a str, &'a str)>,
  {
    let mut filter = Self::default();
    let mut errors = FieldErrors::new();

    for (key, raw) in params {
      let value = raw.trim();
      if value.is_empty() {
        continue;
      }
      let slot = match key {
        PARAM_API_KEY => {
          filter.api_key = Some(value.to_owned());
          continue;
        }
        PARAM_CREATED_GT => &mut filter.created_gt,
        PARAM_CREATED_GTE => &mut filter.created_gte,
        PARAM_CREATED_LT => &mut filter.created_lt,
        PARAM_CREATED_LTE => &mut filter.created_lte,
        _ => continue,
      };
      match parse_timestamp(value) {
        Some(t) => *slot = Some(t),
        None => errors.add(key, INVALID_DATETIME),
      }
    }

    errors.finish(filter)
  }

  /// The conjunction of conditions this filter stands for.
  pub fn predicates(&self) -> Vec<Predicate> {
    let mut out = Vec::new();
    if let Some(key) = &self.api_key {
      out.push(Predicate::ApiKey(key.clone()));
    }
    if let Some(t) = self.created_gt {
      out.push(Predicate::CreatedAfter(t));
    }
    if let Some(t) = self.created_gte {
      out.push(Predicate::CreatedFrom(t));
    }
    if let Some(t) = self.created_lt {
      out.push(Predicate::CreatedBefore(t));
    }
    if let Some(t) = self.created_lte {
      out.push(Predicate::CreatedUntil(t));
    }
    out
  }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset, a naive date-time (taken as UTC), or a
/// bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  for format in NAIVE_FORMATS {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}
