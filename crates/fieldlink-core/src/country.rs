//! Country identity — the validated alpha-2 code and the lazily registered
//! country record.
//!
//! Countries are shared: referenced by many assignments and reports, owned
//! by none of them, and never deleted by this subsystem.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── CountryCode ─────────────────────────────────────────────────────────────

/// A normalized ISO-3166 alpha-2 country code: exactly two ASCII letters,
/// stored uppercase.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
  /// Normalize a raw code: trim, uppercase, require exactly two ASCII
  /// letters. Anything else yields `None` — the "no-country" result.
  pub fn parse(raw: &str) -> Option<Self> {
    let trimmed = raw.trim();
    if trimmed.len() != 2 || !trimmed.bytes().all(|b| b.is_ascii_alphabetic())
    {
      return None;
    }
    Some(Self(trimmed.to_ascii_uppercase()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for CountryCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for CountryCode {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
      .ok_or_else(|| format!("invalid country code: {value:?}"))
  }
}

impl From<CountryCode> for String {
  fn from(code: CountryCode) -> Self { code.0 }
}

/// Normalize a sequence of raw codes for reconciliation: invalid entries are
/// silently dropped, duplicates collapse to their first occurrence, order is
/// preserved.
pub fn normalize_codes<I, S>(raw: I) -> Vec<CountryCode>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut out: Vec<CountryCode> = Vec::new();
  for item in raw {
    if let Some(code) = CountryCode::parse(item.as_ref())
      && !out.contains(&code)
    {
      out.push(code);
    }
  }
  out
}

// ─── Country ─────────────────────────────────────────────────────────────────

/// A durable country record, created lazily on first reference by code.
#[derive(Debug, Clone, Serialize)]
pub struct Country {
  pub country_id: Uuid,
  pub code:       CountryCode,
  pub name:       String,
  pub region:     Option<String>,
  pub population: Option<i64>,
  pub christian_percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_trims_and_uppercases() {
    assert_eq!(CountryCode::parse("  ke ").unwrap().as_str(), "KE");
    assert_eq!(CountryCode::parse("Br").unwrap().as_str(), "BR");
  }

  #[test]
  fn parse_rejects_invalid_input() {
    assert!(CountryCode::parse("").is_none());
    assert!(CountryCode::parse("   ").is_none());
    assert!(CountryCode::parse("K").is_none());
    assert!(CountryCode::parse("KEN").is_none());
    assert!(CountryCode::parse("K1").is_none());
  }

  #[test]
  fn normalize_drops_invalid_and_deduplicates() {
    let codes = normalize_codes(["KE", "KE", "ke", "", "XYZ", "in"]);
    let strs: Vec<&str> = codes.iter().map(CountryCode::as_str).collect();
    assert_eq!(strs, ["KE", "IN"]);
  }
}
