//! Quote types for the Tickstream SDK.
//!
//! Provides the latest-value snapshot kept per symbol.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::symbol::Symbol;

/// Quote payload as carried in a `market_data` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteData {
    /// Last traded price.
    pub price: Decimal,

    /// Traded volume for the bar that produced this quote.
    pub volume: Decimal,

    /// Quote time (ISO-8601 on the wire). Values without an offset are UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Absolute change against the reference price.
    pub change: Decimal,

    /// Change against the reference price, in percent.
    pub change_percent: Decimal,
}

/// Latest known values for one symbol.
///
/// A record is always replaced as a whole; fields are never merged from
/// different updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Symbol this record belongs to.
    pub symbol: Symbol,

    /// Last traded price.
    pub price: Decimal,

    /// Traded volume.
    pub volume: Decimal,

    /// Quote time in UTC.
    pub timestamp: DateTime<Utc>,

    /// Absolute change.
    pub change: Decimal,

    /// Percentage change.
    pub change_percent: Decimal,
}

impl QuoteRecord {
    /// Builds a record from a wire payload.
    #[must_use]
    pub fn from_data(symbol: Symbol, data: QuoteData) -> Self {
        Self {
            symbol,
            price: data.price,
            volume: data.volume,
            timestamp: data.timestamp,
            change: data.change,
            change_percent: data.change_percent,
        }
    }
}

/// Naive ISO-8601 layouts accepted when the value carries no offset.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO-8601 timestamp, reading offset-less values as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_timestamp(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {value}")))
}

impl fmt::Display for QuoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({:+} / {:+}%) vol {} @ {}",
            self.symbol,
            self.price,
            self.change,
            self.change_percent,
            self.volume,
            self.timestamp.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> QuoteData {
        QuoteData {
            price: Decimal::new(18950, 2),
            volume: Decimal::new(1200, 0),
            timestamp: DateTime::parse_from_rfc3339("2024-03-01T15:30:00Z")
                .expect("timestamp")
                .with_timezone(&Utc),
            change: Decimal::new(150, 2),
            change_percent: Decimal::new(75, 2),
        }
    }

    #[test]
    fn test_quote_data_deserialize_numbers() {
        let json = r#"{"price":189.5,"volume":1200,"timestamp":"2024-03-01T15:30:00Z","change":1.5,"change_percent":0.75}"#;
        let data: QuoteData = serde_json::from_str(json).expect("deserialize");
        assert_eq!(data, sample_data());
    }

    #[test]
    fn test_quote_data_deserialize_offset_timestamp() {
        let json = r#"{"price":1,"volume":1,"timestamp":"2024-03-01T10:30:00-05:00","change":0,"change_percent":0}"#;
        let data: QuoteData = serde_json::from_str(json).expect("deserialize");
        assert_eq!(data.timestamp, sample_data().timestamp);
    }

    #[test]
    fn test_quote_record_from_data() {
        let symbol = Symbol::new("AAPL").expect("symbol");
        let record = QuoteRecord::from_data(symbol.clone(), sample_data());
        assert_eq!(record.symbol, symbol);
        assert_eq!(record.price, Decimal::new(18950, 2));
        assert_eq!(record.change, Decimal::new(150, 2));
    }

    #[test]
    fn test_quote_data_deserialize_naive_timestamp() {
        let json = r#"{"price":1,"volume":1,"timestamp":"2024-03-01T15:30:00.123456","change":0,"change_percent":0}"#;
        let data: QuoteData = serde_json::from_str(json).expect("deserialize");
        let expected = sample_data().timestamp + chrono::Duration::microseconds(123_456);
        assert_eq!(data.timestamp, expected);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = sample_data().timestamp;
        assert_eq!(parse_timestamp("2024-03-01T15:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T15:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 15:30:00"), Some(expected));
        assert!(parse_timestamp("03/01/2024 15:30").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_quote_data_rejects_garbage_timestamp() {
        let json = r#"{"price":1,"volume":1,"timestamp":"yesterday","change":0,"change_percent":0}"#;
        let err = serde_json::from_str::<QuoteData>(json).expect_err("invalid timestamp");
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn test_quote_record_display() {
        let symbol = Symbol::new("AAPL").expect("symbol");
        let record = QuoteRecord::from_data(symbol, sample_data());
        let text = record.to_string();
        assert!(text.starts_with("AAPL 189.50"));
        assert!(text.contains("+1.50"));
    }
}
