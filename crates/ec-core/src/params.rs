//! Controller tuning parameters.
//!
//! Parameters arrive as JSON on the heater/steamer parameter topics and are
//! never mutated in place: a new set replaces the active controller wholesale.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::numeric::{ensure_finite, ensure_within};

/// Threshold used when a parameter payload does not carry one.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

pub const SETPOINT_RANGE_C: (f64, f64) = (-100.0, 100.0);

/// Gains and switching threshold for one feedback controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawControlParameters")]
pub struct ControlParameters {
    kp: f64,
    kd: f64,
    ki: f64,
    threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Deserialize)]
struct RawControlParameters {
    kp: f64,
    kd: f64,
    #[serde(default)]
    ki: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
    #[serde(default)]
    temperature: Option<f64>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl TryFrom<RawControlParameters> for ControlParameters {
    type Error = CoreError;

    fn try_from(raw: RawControlParameters) -> CoreResult<Self> {
        let params = ControlParameters::new(raw.kp, raw.kd, raw.threshold)?.with_integral(raw.ki)?;
        match raw.temperature {
            Some(t) => params.with_setpoint(t),
            None => Ok(params),
        }
    }
}

impl ControlParameters {
    /// Create a PD parameter set (integral gain zero, no set-point).
    ///
    /// Gains are tuning knobs, not physical quantities: any finite value is
    /// accepted.
    pub fn new(kp: f64, kd: f64, threshold: f64) -> CoreResult<Self> {
        Ok(Self {
            kp: ensure_finite(kp, "kp")?,
            kd: ensure_finite(kd, "kd")?,
            ki: 0.0,
            threshold: ensure_finite(threshold, "threshold")?,
            temperature: None,
        })
    }

    /// Set the integral gain. Zero disables integral accumulation.
    pub fn with_integral(mut self, ki: f64) -> CoreResult<Self> {
        self.ki = ensure_finite(ki, "ki")?;
        Ok(self)
    }

    /// Attach a temperature set-point in degree Celsius.
    pub fn with_setpoint(mut self, temperature: f64) -> CoreResult<Self> {
        let (min, max) = SETPOINT_RANGE_C;
        self.temperature = Some(ensure_within(temperature, min, max, "set-point temperature")?);
        Ok(self)
    }

    /// Parse a parameter-update payload.
    pub fn from_json(payload: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn setpoint(&self) -> Option<f64> {
        self.temperature
    }
}
