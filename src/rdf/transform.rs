//! Decoding transforms declared per predicate in the namespace table.

use anyhow::{Context, Result, bail};
use jiff::tz::TimeZone;
use jiff::{Timestamp, civil};
use serde::Deserialize;
use serde_json::Value;

/// A `{ function, format }` pair as written in the namespace configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct TransformSpec {
    pub(crate) function: String,
    pub(crate) format: String,
}

impl TransformSpec {
    pub(crate) fn new(function: &str, format: &str) -> TransformSpec {
        TransformSpec {
            function: function.to_string(),
            format: format.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transform {
    /// ISO-8601 timestamp, reasoned as epoch milliseconds
    Timestamp,
    /// Plain numeric data value
    Number,
}

/// Typed value decoded from a raw object string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Reasoned {
    Timestamp(Timestamp),
    Number(f64),
}

impl Transform {
    pub(crate) fn from_spec(spec: &TransformSpec) -> Result<Transform> {
        match (spec.function.as_str(), spec.format.as_str()) {
            ("timestamp", "ISO8601") => Ok(Transform::Timestamp),
            ("timestamp", format) => bail!("only ISO8601 timestamps are supported, found `{format}`"),
            ("data", "number") => Ok(Transform::Number),
            ("data", format) => bail!("only numeric data values are supported, found `{format}`"),
            (function, _) => bail!("unsupported transform type `{function}`"),
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Transform::Timestamp => "timestamp",
            Transform::Number => "data",
        }
    }

    pub(crate) fn apply(self, raw: &str) -> Result<Reasoned> {
        let raw = raw.trim();
        match self {
            Transform::Timestamp => Ok(Reasoned::Timestamp(parse_timestamp(raw)?)),
            Transform::Number => {
                let number: f64 = raw
                    .parse()
                    .with_context(|| format!("`{raw}` is not a number"))?;
                Ok(Reasoned::Number(number))
            }
        }
    }
}

/// An instant, or a date and time without offset which is read as UTC.
fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    if let Ok(timestamp) = raw.parse::<Timestamp>() {
        return Ok(timestamp);
    }
    let zoned = match raw.parse::<civil::DateTime>() {
        Ok(datetime) => datetime.to_zoned(TimeZone::UTC)?,
        Err(_) => raw
            .parse::<civil::Date>()
            .with_context(|| format!("`{raw}` is not an ISO8601 timestamp"))?
            .to_zoned(TimeZone::UTC)?,
    };
    Ok(zoned.timestamp())
}

impl Reasoned {
    /// Numeric view used as sort key and range bound; timestamps map to
    /// milliseconds since the unix epoch.
    pub(crate) fn as_f64(&self) -> f64 {
        match self {
            Reasoned::Timestamp(timestamp) => timestamp.as_millisecond() as f64,
            Reasoned::Number(number) => *number,
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Reasoned::Timestamp(timestamp) => Value::from(timestamp.as_millisecond()),
            Reasoned::Number(number) => Value::from(*number),
        }
    }
}
