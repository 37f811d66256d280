//! Readings: timestamped telemetry data points belonging to one horse.
//!
//! A reading has one canonical representation ([`Reading`]). What a client
//! may send for each kind of write is described by the [`Metric`] table and
//! projected from the raw JSON body here, so every write path applies the
//! same bounds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Result,
  filter::{INVALID_DATETIME, parse_timestamp},
  validate::{FieldErrors, Precision, WriteMode},
};

// ─── Metric table ────────────────────────────────────────────────────────────

/// A numeric telemetry field and its fixed-precision column bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
  GpsLat,
  GpsLong,
  Temp,
  Hr,
  HrInterval,
  Batt,
}

impl Metric {
  pub const ALL: [Metric; 6] = [
    Metric::GpsLat,
    Metric::GpsLong,
    Metric::Temp,
    Metric::Hr,
    Metric::HrInterval,
    Metric::Batt,
  ];

  /// Field name on the wire and column name in the store.
  pub fn name(self) -> &'static str {
    match self {
      Self::GpsLat => "gps_lat",
      Self::GpsLong => "gps_long",
      Self::Temp => "temp",
      Self::Hr => "hr",
      Self::HrInterval => "hr_interval",
      Self::Batt => "batt",
    }
  }

  pub fn precision(self) -> Precision {
    match self {
      Self::GpsLat | Self::GpsLong => Precision::new(9, 6),
      Self::Temp | Self::Hr | Self::Batt => Precision::new(5, 2),
      Self::HrInterval => Precision::new(7, 2),
    }
  }
}

// ─── Telemetry ───────────────────────────────────────────────────────────────

/// The sensor values of a reading. Every field is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
  pub gps_lat:     Option<Decimal>,
  pub gps_long:    Option<Decimal>,
  pub temp:        Option<Decimal>,
  pub hr:          Option<Decimal>,
  pub hr_interval: Option<Decimal>,
  pub batt:        Option<Decimal>,
}

impl Telemetry {
  pub fn get(&self, metric: Metric) -> Option<Decimal> {
    match metric {
      Metric::GpsLat => self.gps_lat,
      Metric::GpsLong => self.gps_long,
      Metric::Temp => self.temp,
      Metric::Hr => self.hr,
      Metric::HrInterval => self.hr_interval,
      Metric::Batt => self.batt,
    }
  }

  pub fn set(&mut self, metric: Metric, value: Option<Decimal>) {
    let slot = match metric {
      Metric::GpsLat => &mut self.gps_lat,
      Metric::GpsLong => &mut self.gps_long,
      Metric::Temp => &mut self.temp,
      Metric::Hr => &mut self.hr,
      Metric::HrInterval => &mut self.hr_interval,
      Metric::Batt => &mut self.batt,
    };
    *slot = value;
  }

  /// Project a create body. Only the metric fields are read; identity and
  /// ownership fields (`api_key`, `owner`, `user`, `horse`, `date_created`)
  /// are left to the caller or ignored.
  pub fn from_body(body: &Map<String, Value>) -> Result<Self> {
    let mut telemetry = Self::default();
    let mut errors = FieldErrors::new();
    for (metric, value) in parse_metrics(body, &mut errors) {
      telemetry.set(metric, value);
    }
    errors.finish(telemetry)
  }
}

/// Parse every metric present in `body`, recording failures in `errors`.
fn parse_metrics(
  body: &Map<String, Value>,
  errors: &mut FieldErrors,
) -> Vec<(Metric, Option<Decimal>)> {
  let mut out = Vec::new();
  for metric in Metric::ALL {
    let Some(raw) = body.get(metric.name()) else { continue };
    match metric.precision().parse(raw) {
      Ok(value) => out.push((metric, value)),
      Err(message) => errors.add(metric.name(), message),
    }
  }
  out
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// A persisted reading, with the horse's display fields read through a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
  pub id:           i64,
  pub horse_id:     i64,
  /// Copied from the horse's owner when the reading was created.
  pub owner_id:     i64,
  pub name:         String,
  pub api_key:      String,
  pub image:        Option<String>,
  pub date_created: DateTime<Utc>,
  #[serde(flatten)]
  pub telemetry:    Telemetry,
}

/// Input to [`crate::store::PaddockStore::create_reading`].
///
/// There is no owner field: the store derives the owner from the horse, and
/// `date_created` is always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewReading {
  pub horse_id:  i64,
  pub telemetry: Telemetry,
}

/// Changes applied by [`crate::store::PaddockStore::update_reading`].
///
/// The horse reference is not part of an update; a reading stays with the
/// device that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingUpdate {
  /// New creation timestamp, for backdating. `None` keeps the current one.
  pub date_created: Option<DateTime<Utc>>,
  /// Metrics to overwrite; a `None` value clears the metric.
  pub metrics:      Vec<(Metric, Option<Decimal>)>,
}

impl ReadingUpdate {
  /// Project an update body.
  ///
  /// In [`WriteMode::Partial`] only metrics present in the body change. In
  /// [`WriteMode::Replace`] every metric absent from the body is cleared.
  pub fn from_body(body: &Map<String, Value>, mode: WriteMode) -> Result<Self> {
    let mut errors = FieldErrors::new();
    let mut metrics = parse_metrics(body, &mut errors);

    if mode == WriteMode::Replace {
      for metric in Metric::ALL {
        if !body.contains_key(metric.name()) {
          metrics.push((metric, None));
        }
      }
    }

    let date_created = match body.get("date_created") {
      None | Some(Value::Null) => None,
      Some(Value::String(s)) => match parse_timestamp(s) {
        Some(t) => Some(t),
        None => {
          errors.add("date_created", INVALID_DATETIME);
          None
        }
      },
      Some(_) => {
        errors.add("date_created", INVALID_DATETIME);
        None
      }
    };

    errors.finish(Self { date_created, metrics })
  }
}
