//! Field-level validation shared by every write path.
//!
//! Errors are collected per field so a client sees every problem with a
//! request at once. A request with any field error is rejected as a whole.

use std::{collections::BTreeMap, fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_NUMBER: &str = "A valid number is required.";

// ─── Write mode ──────────────────────────────────────────────────────────────

/// Which kind of write a request body is projected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// `POST` on a collection.
  Create,
  /// `PUT` on an item: the body is the complete new representation.
  Replace,
  /// `PATCH` on an item: only the supplied fields change.
  Partial,
}

impl WriteMode {
  /// Whether fields marked required must be present in the body.
  pub fn requires_all(self) -> bool { !matches!(self, Self::Partial) }
}

// ─── FieldErrors ─────────────────────────────────────────────────────────────

/// Messages keyed by the field they refer to. Serialises as
/// `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self { Self::default() }

  /// A single error on a single field.
  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.add(field, message);
    errors
  }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn merge(&mut self, other: FieldErrors) {
    for (field, messages) in other.0 {
      self.0.entry(field).or_default().extend(messages);
    }
  }

  /// Unwrap one step of a larger validation. Field errors from `result` are
  /// merged into `self` and yield `Ok(None)`; any other error is returned.
  pub fn absorb<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
    match result {
      Ok(value) => Ok(Some(value)),
      Err(Error::Validation(errors)) => {
        self.merge(errors);
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  /// `Ok(value)` when no errors were recorded, otherwise a validation error.
  pub fn finish<T>(self, value: T) -> Result<T> {
    if self.is_empty() {
      Ok(value)
    } else {
      Err(Error::Validation(self))
    }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{field}: {message}")?;
        first = false;
      }
    }
    Ok(())
  }
}

// ─── Fixed-precision decimals ────────────────────────────────────────────────

/// Digit bounds of a fixed-precision decimal column.
///
/// `max_digits` counts every significant digit; `decimal_places` of them sit
/// after the point, which leaves `max_digits - decimal_places` before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
  pub max_digits:     u32,
  pub decimal_places: u32,
}

impl Precision {
  pub const fn new(max_digits: u32, decimal_places: u32) -> Self {
    Self { max_digits, decimal_places }
  }

  /// Check a value with `whole` digits before the point and `places` after
  /// it (leading and trailing zeros excluded) against the bounds.
  fn check(&self, whole: u32, places: u32) -> Result<(), String> {
    if whole + places > self.max_digits {
      return Err(format!(
        "Ensure that there are no more than {} digits in total.",
        self.max_digits
      ));
    }
    if places > self.decimal_places {
      return Err(format!(
        "Ensure that there are no more than {} decimal places.",
        self.decimal_places
      ));
    }
    let max_whole = self.max_digits - self.decimal_places;
    if whole > max_whole {
      return Err(format!(
        "Ensure that there are no more than {max_whole} digits before the decimal point."
      ));
    }
    Ok(())
  }

  /// Check `value` against the bounds and rescale it to exactly
  /// `decimal_places`. Trailing zeros never count against the bounds, and a
  /// value that does not fit is rejected rather than rounded.
  pub fn quantize(&self, value: Decimal) -> Result<Decimal, String> {
    let normalized = value.normalize();
    let places = normalized.scale();
    let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    self.check(digits.saturating_sub(places), places)?;

    let mut quantized = normalized;
    quantized.rescale(self.decimal_places);
    Ok(quantized)
  }

  /// Parse a JSON value (number, numeric string, or `null`) into a quantised
  /// decimal. Blank strings count as `null`.
  ///
  /// Plain literals are bounds-checked on their text, before conversion, so
  /// that digits beyond what a [`Decimal`] can hold are refused instead of
  /// rounded away.
  pub fn parse(&self, raw: &Value) -> Result<Option<Decimal>, String> {
    let text = match raw {
      Value::Null => return Ok(None),
      Value::Number(n) => n.to_string(),
      Value::String(s) if s.trim().is_empty() => return Ok(None),
      Value::String(s) => s.trim().to_owned(),
      _ => return Err(NOT_A_NUMBER.to_owned()),
    };

    let value = match literal_digits(&text) {
      Some((whole, places)) => {
        self.check(whole, places)?;
        let exact = if text.contains('.') {
          match text.trim_end_matches('0').trim_end_matches('.') {
            "" | "-" | "+" => "0",
            trimmed => trimmed,
          }
        } else {
          text.as_str()
        };
        Decimal::from_str(exact)
      }
      None => {
        let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
        if let Some((whole, places)) = literal_digits(mantissa)
          && whole + places > MAX_EXACT_DIGITS
        {
          return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            self.max_digits
          ));
        }
        Decimal::from_scientific(&text)
      }
    }
    .map_err(|_| NOT_A_NUMBER.to_owned())?;

    self.quantize(value).map(Some)
  }
}

/// Significant digits a [`Decimal`] always holds without rounding.
const MAX_EXACT_DIGITS: u32 = 28;

/// Digits of a plain decimal literal (`-012.340`) as `(whole, places)`,
/// ignoring leading zeros before the point and trailing zeros after it.
/// `None` when `text` is not such a literal.
fn literal_digits(text: &str) -> Option<(u32, u32)> {
  let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
  let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
  let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
  if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
    return None;
  }
  Some((
    whole.trim_start_matches('0').len() as u32,
    fraction.trim_end_matches('0').len() as u32,
  ))
}

// ─── Strings ─────────────────────────────────────────────────────────────────

/// Validate a required-or-optional text field of bounded length.
///
/// Returns `Ok(None)` when the field is absent and not required.
pub fn text_field(
  body: &serde_json::Map<String, Value>,
  field: &str,
  required: bool,
  max_len: usize,
  errors: &mut FieldErrors,
) -> Option<String> {
  match body.get(field) {
    None | Some(Value::Null) => {
      if required {
        errors.add(field, REQUIRED);
      }
      None
    }
    Some(Value::String(s)) if s.trim().is_empty() => {
      errors.add(field, BLANK);
      None
    }
    Some(Value::String(s)) if s.chars().count() > max_len => {
      errors.add(
        field,
        format!("Ensure this field has no more than {max_len} characters."),
      );
      None
    }
    Some(Value::String(s)) => Some(s.trim().to_owned()),
    Some(_) => {
      errors.add(field, NOT_A_STRING);
      None
    }
  }
}
