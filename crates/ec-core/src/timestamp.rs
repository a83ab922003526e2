//! Capture timestamp encoding.
//!
//! Timestamps travel as naive local date-times written
//! `2024-10-18 14:38:23.343361`. Parsing is lenient and also accepts the
//! `T`-separated form and full RFC 3339 strings.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn parse(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

pub fn format(ts: &NaiveDateTime) -> String {
    ts.format(FORMAT).to_string()
}

pub fn serialize_opt<S>(ts: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ts {
        Some(ts) => serializer.serialize_str(&format(ts)),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{s}'"))),
    }
}
