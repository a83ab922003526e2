//! Sensor samples and the payloads that carry them over the bus.
//!
//! A [`Reading`] can only exist inside its physical bounds: every constructor,
//! including JSON deserialization, goes through [`Reading::new`].

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::numeric::ensure_within;
use crate::timestamp;

pub const TEMPERATURE_RANGE_C: (f64, f64) = (-50.0, 50.0);
pub const HUMIDITY_RANGE_PCT: (f64, f64) = (0.0, 100.0);
pub const PRESSURE_RANGE_HPA: (f64, f64) = (800.0, 1200.0);

/// Standard sea-level atmospheric pressure in hPa.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// One sensor sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReading")]
pub struct Reading {
    temperature: f64,
    humidity: f64,
    pressure: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "timestamp::serialize_opt"
    )]
    timestamp: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
struct RawReading {
    temperature: f64,
    humidity: f64,
    pressure: f64,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    timestamp: Option<NaiveDateTime>,
}

impl TryFrom<RawReading> for Reading {
    type Error = CoreError;

    fn try_from(raw: RawReading) -> CoreResult<Self> {
        let reading = Reading::new(raw.temperature, raw.humidity, raw.pressure)?;
        Ok(Reading {
            id: raw.id,
            timestamp: raw.timestamp,
            ..reading
        })
    }
}

impl Reading {
    /// Create a reading, rejecting any value outside its physical bounds.
    ///
    /// # Arguments
    ///
    /// * `temperature` - degree Celsius, [-50, 50]
    /// * `humidity` - relative humidity in percent, [0, 100]
    /// * `pressure` - hectopascal, [800, 1200]
    pub fn new(temperature: f64, humidity: f64, pressure: f64) -> CoreResult<Self> {
        let (t_min, t_max) = TEMPERATURE_RANGE_C;
        let (h_min, h_max) = HUMIDITY_RANGE_PCT;
        let (p_min, p_max) = PRESSURE_RANGE_HPA;
        Ok(Self {
            temperature: ensure_within(temperature, t_min, t_max, "temperature")?,
            humidity: ensure_within(humidity, h_min, h_max, "humidity")?,
            pressure: ensure_within(pressure, p_min, p_max, "pressure")?,
            id: None,
            timestamp: None,
        })
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach a fresh id and the local capture time.
    pub fn stamped(self) -> Self {
        self.with_id(Uuid::new_v4())
            .with_timestamp(Local::now().naive_local())
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reading(temperature: {}°C, humidity: {}%, pressure: {} hPa)",
            self.temperature, self.humidity, self.pressure
        )
    }
}

/// Internal and external readings captured in one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub internal_sensor_data: Reading,
    pub external_sensor_data: Reading,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "timestamp::serialize_opt",
        deserialize_with = "timestamp::deserialize_opt"
    )]
    pub timestamp: Option<NaiveDateTime>,
}

impl SensorPayload {
    pub fn new(internal: Reading, external: Reading) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            internal_sensor_data: internal,
            external_sensor_data: external,
            timestamp: Some(Local::now().naive_local()),
        }
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Layout of the sensor-data payload a deployment publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// `{"internal_sensor_data": {..}, "external_sensor_data": {..}}`
    #[default]
    Paired,
    /// One flattened reading.
    Single,
}

/// A decoded sensor-data message.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorMessage {
    Paired(SensorPayload),
    Single(Reading),
}

impl SensorMessage {
    /// Decode a sensor-data payload of the given shape.
    ///
    /// Missing fields, wrong types and out-of-range values all fail with
    /// [`CoreError::Parse`].
    pub fn decode(payload: &[u8], shape: PayloadShape) -> CoreResult<Self> {
        match shape {
            PayloadShape::Paired => Ok(Self::Paired(serde_json::from_slice(payload)?)),
            PayloadShape::Single => Ok(Self::Single(serde_json::from_slice(payload)?)),
        }
    }

    /// The reading taken inside the enclosure.
    pub fn internal(&self) -> &Reading {
        match self {
            Self::Paired(p) => &p.internal_sensor_data,
            Self::Single(r) => r,
        }
    }

    /// The external reading, if the payload carries one.
    pub fn external(&self) -> Option<&Reading> {
        match self {
            Self::Paired(p) => Some(&p.external_sensor_data),
            Self::Single(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_bounds_are_inclusive() {
        assert!(Reading::new(-50.0, 0.0, 800.0).is_ok());
        assert!(Reading::new(50.0, 100.0, 1200.0).is_ok());
    }

    #[test]
    fn reading_rejects_out_of_range_values() {
        let err = Reading::new(50.5, 40.0, 1000.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::OutOfRange {
                what: "temperature",
                ..
            }
        ));
        assert!(Reading::new(20.0, -1.0, 1000.0).is_err());
        assert!(Reading::new(20.0, 40.0, 1300.0).is_err());
        assert!(Reading::new(f64::NAN, 40.0, 1000.0).is_err());
    }

    #[test]
    fn deserialize_validates_bounds() {
        let json = r#"{"temperature": 70.0, "humidity": 40.0, "pressure": 1000.0}"#;
        assert!(serde_json::from_str::<Reading>(json).is_err());
    }

    #[test]
    fn deserialize_script_payload() {
        let json = r#"{"id": "bea83a3b-3034-476f-8451-a2677a4ffc3c", "temperature": 21.5,
            "humidity": 85.1, "pressure": 966.18, "timestamp": "2024-10-18 14:38:23.343361"}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.temperature(), 21.5);
        assert_eq!(reading.humidity(), 85.1);
        assert!(reading.id().is_some());
        assert!(reading.timestamp().is_some());
    }

    #[test]
    fn paired_payload_decodes() {
        let json = br#"{
            "internal_sensor_data": {"temperature": 18.0, "humidity": 40.0, "pressure": 1000.0},
            "external_sensor_data": {"temperature": 20.0, "humidity": 55.0, "pressure": 1001.0}
        }"#;
        let msg = SensorMessage::decode(json, PayloadShape::Paired).unwrap();
        assert_eq!(msg.internal().temperature(), 18.0);
        assert_eq!(msg.external().map(Reading::temperature), Some(20.0));
    }

    #[test]
    fn paired_payload_missing_internal_is_parse_error() {
        let json = br#"{"external_sensor_data": {"temperature": 20.0, "humidity": 55.0, "pressure": 1001.0}}"#;
        let err = SensorMessage::decode(json, PayloadShape::Paired).unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn single_payload_has_no_external() {
        let json = br#"{"temperature": 18.0, "humidity": 40.0, "pressure": 1000.0}"#;
        let msg = SensorMessage::decode(json, PayloadShape::Single).unwrap();
        assert!(msg.external().is_none());
    }

    #[test]
    fn payload_json_round_trips_through_decode() {
        let payload = SensorPayload::new(
            Reading::new(18.0, 40.0, 1000.0).unwrap(),
            Reading::new(20.0, 55.0, 1001.0).unwrap(),
        );
        let json = payload.to_json().unwrap();
        let decoded = SensorMessage::decode(json.as_bytes(), PayloadShape::Paired).unwrap();
        match decoded {
            SensorMessage::Paired(p) => {
                assert_eq!(p.id, payload.id);
                assert_eq!(p.internal_sensor_data, payload.internal_sensor_data);
            }
            SensorMessage::Single(_) => panic!("Expected paired payload"),
        }
    }
}
