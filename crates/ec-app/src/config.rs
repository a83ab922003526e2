//! YAML configuration.
//!
//! Every section carries `#[serde(default)]`, so a partial file (or an empty
//! one) yields a runnable mock setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ec_controls::ControlMode;
use ec_core::{ControlParameters, DEFAULT_THRESHOLD, DeviceId, PayloadShape};
use ec_devices::{RelayDriver, RelaySettings, RelayTiming, SensorDriver};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Generated at startup when absent.
    pub device_id: Option<String>,
    pub payload_shape: PayloadShape,
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
    pub control: ControlConfig,
    pub relays: RelayConfig,
    pub sensors: SensorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub address: String,
    pub port: u16,
    pub keep_alive_s: u64,
    pub client_id: Option<String>,
    /// Capacity of the client request channel.
    pub queue_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 1883,
            keep_alive_s: 60,
            client_id: None,
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub mode: ControlMode,
    pub capacity_table: PathBuf,
    pub poll_interval_ms: u64,
    pub heater: GainsConfig,
    pub steamer: GainsConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Feedback,
            capacity_table: PathBuf::from("data/waterdampspanning.csv"),
            poll_interval_ms: 250,
            heater: GainsConfig::default(),
            steamer: GainsConfig::default(),
        }
    }
}

/// Start-up gains, replaced at runtime by parameter messages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainsConfig {
    pub kp: f64,
    pub kd: f64,
    pub ki: f64,
    pub threshold: f64,
    /// Heater set-point (°C) used with single-reading payloads.
    pub temperature: Option<f64>,
}

impl Default for GainsConfig {
    fn default() -> Self {
        Self {
            kp: 0.3,
            kd: 0.2,
            ki: 0.0,
            threshold: DEFAULT_THRESHOLD,
            temperature: None,
        }
    }
}

impl GainsConfig {
    pub fn to_params(&self) -> AppResult<ControlParameters> {
        let params = ControlParameters::new(self.kp, self.kd, self.threshold)?
            .with_integral(self.ki)?;
        match self.temperature {
            Some(t) => Ok(params.with_setpoint(t)?),
            None => Ok(params),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub driver: String,
    pub heater_gpio: u32,
    pub steamer_gpio: u32,
    pub active_low: bool,
    pub energize_settle_ms: u64,
    pub deenergize_settle_ms: u64,
    pub gpio_root: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            driver: "mock".to_string(),
            heater_gpio: 17,
            steamer_gpio: 27,
            active_low: true,
            energize_settle_ms: 5000,
            deenergize_settle_ms: 2000,
            gpio_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

impl RelayConfig {
    pub fn driver(&self) -> AppResult<RelayDriver> {
        self.driver
            .parse()
            .map_err(|e: ec_devices::DeviceError| AppError::Config(e.to_string()))
    }

    pub fn settings(&self) -> RelaySettings {
        RelaySettings {
            gpio_root: self.gpio_root.clone(),
            active_low: self.active_low,
            timing: RelayTiming {
                energize: Duration::from_millis(self.energize_settle_ms),
                deenergize: Duration::from_millis(self.deenergize_settle_ms),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub internal_driver: String,
    pub external_driver: String,
    pub internal_device: u32,
    pub external_device: u32,
    pub iio_root: PathBuf,
    pub publish_interval_s: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            internal_driver: "mock".to_string(),
            external_driver: "mock".to_string(),
            internal_device: 0,
            external_device: 1,
            iio_root: PathBuf::from("/sys/bus/iio/devices"),
            publish_interval_s: 3,
        }
    }
}

impl SensorConfig {
    pub fn internal_driver(&self) -> AppResult<SensorDriver> {
        parse_sensor_driver(&self.internal_driver)
    }

    pub fn external_driver(&self) -> AppResult<SensorDriver> {
        parse_sensor_driver(&self.external_driver)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_s)
    }
}

fn parse_sensor_driver(name: &str) -> AppResult<SensorDriver> {
    name.parse()
        .map_err(|e: ec_devices::DeviceError| AppError::Config(e.to_string()))
}

impl AppConfig {
    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> AppResult<Self> {
        // An empty document parses as null, not as an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse configuration YAML: {e}")))
    }

    /// Reject settings that cannot start a service.
    pub fn validate(&self) -> AppResult<()> {
        self.control
            .heater
            .to_params()
            .map_err(|e| AppError::Config(format!("control.heater: {e}")))?;
        self.control
            .steamer
            .to_params()
            .map_err(|e| AppError::Config(format!("control.steamer: {e}")))?;

        if self.control.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "control.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.sensors.publish_interval_s == 0 {
            return Err(AppError::Config(
                "sensors.publish_interval_s must be greater than zero".to_string(),
            ));
        }
        if self.broker.address.trim().is_empty() {
            return Err(AppError::Config("broker.address must not be empty".to_string()));
        }
        if self.broker.keep_alive_s < 5 {
            return Err(AppError::Config(
                "broker.keep_alive_s must be at least 5 seconds".to_string(),
            ));
        }
        if self.broker.queue_capacity == 0 {
            return Err(AppError::Config(
                "broker.queue_capacity must be greater than zero".to_string(),
            ));
        }

        self.relays.driver()?;
        self.sensors.internal_driver()?;
        self.sensors.external_driver()?;
        Ok(())
    }

    /// Configured device id, or a freshly generated one.
    ///
    /// A generated id is only known to this process, so the sensing and
    /// control sides of a device must share a configured one.
    pub fn device_id(&self) -> DeviceId {
        let id = DeviceId::configured_or_generate(self.device_id.as_deref());
        if self.device_id.is_none() {
            tracing::warn!(device_id = %id, "no device_id configured; generated one");
        }
        id
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.control.poll_interval_ms)
    }
}
