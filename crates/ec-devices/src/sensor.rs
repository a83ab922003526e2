//! Temperature / humidity / pressure sources.

use std::fs;
use std::path::{Path, PathBuf};

use ec_core::reading::{HUMIDITY_RANGE_PCT, PRESSURE_RANGE_HPA, TEMPERATURE_RANGE_C};
use ec_core::units::{as_hpa, kpa};
use ec_core::{Reading, STANDARD_PRESSURE_HPA};

use crate::error::{DeviceError, DeviceResult};

/// Capability of an environmental sensor.
///
/// Units: temperature in °C, relative humidity in percent, pressure in hPa.
pub trait Sensor: Send {
    fn name(&self) -> &str;

    fn temperature(&mut self) -> DeviceResult<f64>;

    fn humidity(&mut self) -> DeviceResult<f64>;

    fn pressure(&mut self) -> DeviceResult<f64>;

    /// Sample all three quantities into a validated [`Reading`].
    fn read(&mut self) -> DeviceResult<Reading> {
        let temperature = self.temperature()?;
        let humidity = self.humidity()?;
        let pressure = self.pressure()?;
        Ok(Reading::new(temperature, humidity, pressure)?)
    }
}

/// Simulated sensor drifting around a base reading.
///
/// Each full [`Sensor::read`] advances the phase by one step. Values follow a
/// slow sine around the base and are clamped to the valid reading bounds, so
/// a sequence is reproducible for a given base and swing.
#[derive(Debug, Clone)]
pub struct MockSensor {
    name: String,
    base: (f64, f64, f64),
    swing: (f64, f64, f64),
    step: u64,
}

const PHASE_STEP: f64 = 0.35;

impl MockSensor {
    pub fn new(name: impl Into<String>, base: &Reading) -> Self {
        Self {
            name: name.into(),
            base: (base.temperature(), base.humidity(), base.pressure()),
            swing: (0.5, 2.0, 1.5),
            step: 0,
        }
    }

    /// Indoor-like defaults: 20 °C, 50 %, standard pressure.
    pub fn simulated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: (20.0, 50.0, STANDARD_PRESSURE_HPA),
            swing: (0.5, 2.0, 1.5),
            step: 0,
        }
    }

    /// Amplitudes for temperature, humidity and pressure.
    pub fn with_swing(mut self, temperature: f64, humidity: f64, pressure: f64) -> Self {
        self.swing = (temperature, humidity, pressure);
        self
    }

    fn wave(&self) -> f64 {
        (self.step as f64 * PHASE_STEP).sin()
    }
}

impl Sensor for MockSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature(&mut self) -> DeviceResult<f64> {
        let (min, max) = TEMPERATURE_RANGE_C;
        Ok((self.base.0 + self.swing.0 * self.wave()).clamp(min, max))
    }

    fn humidity(&mut self) -> DeviceResult<f64> {
        let (min, max) = HUMIDITY_RANGE_PCT;
        Ok((self.base.1 + self.swing.1 * self.wave()).clamp(min, max))
    }

    fn pressure(&mut self) -> DeviceResult<f64> {
        let (min, max) = PRESSURE_RANGE_HPA;
        Ok((self.base.2 + self.swing.2 * self.wave()).clamp(min, max))
    }

    fn read(&mut self) -> DeviceResult<Reading> {
        let reading = Reading::new(self.temperature()?, self.humidity()?, self.pressure()?)?;
        self.step = self.step.wrapping_add(1);
        Ok(reading)
    }
}

/// Which channels an IIO device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IioChannels {
    /// Temperature, humidity and pressure (BME280).
    Full,
    /// Temperature and humidity only (DHT22). Pressure is reported as the
    /// standard atmosphere.
    NoPressure,
}

/// Sensor read through the Linux Industrial I/O sysfs interface.
///
/// Reads the processed attributes of one `iio:deviceN` directory:
/// `in_temp_input` (m°C), `in_humidityrelative_input` (m%) and
/// `in_pressure_input` (kPa).
#[derive(Debug, Clone)]
pub struct IioSensor {
    name: String,
    device_dir: PathBuf,
    channels: IioChannels,
}

impl IioSensor {
    pub fn new(name: impl Into<String>, device_dir: impl Into<PathBuf>, channels: IioChannels) -> Self {
        Self {
            name: name.into(),
            device_dir: device_dir.into(),
            channels,
        }
    }

    /// Device directory for index `n` under `iio_root`.
    pub fn device_dir(iio_root: &Path, index: u32) -> PathBuf {
        iio_root.join(format!("iio:device{index}"))
    }

    pub fn channels(&self) -> IioChannels {
        self.channels
    }

    fn read_attr(&self, attr: &'static str) -> DeviceResult<f64> {
        let path = self.device_dir.join(attr);
        let raw = fs::read_to_string(&path).map_err(|e| DeviceError::Read {
            path: path.clone(),
            source: e,
        })?;
        let value = raw.trim();
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DeviceError::Parse {
                what: attr,
                value: value.to_string(),
            })
    }
}

impl Sensor for IioSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature(&mut self) -> DeviceResult<f64> {
        Ok(self.read_attr("in_temp_input")? / 1000.0)
    }

    fn humidity(&mut self) -> DeviceResult<f64> {
        Ok(self.read_attr("in_humidityrelative_input")? / 1000.0)
    }

    fn pressure(&mut self) -> DeviceResult<f64> {
        match self.channels {
            IioChannels::Full => Ok(as_hpa(kpa(self.read_attr("in_pressure_input")?))),
            IioChannels::NoPressure => Ok(STANDARD_PRESSURE_HPA),
        }
    }
}
