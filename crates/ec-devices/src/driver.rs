//! Driver selection from configuration tags.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::DeviceError;
use crate::relay::{GpioRelay, MockRelay, Relay, RelaySettings};
use crate::sensor::{IioChannels, IioSensor, MockSensor, Sensor};

/// Relay implementation named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayDriver {
    #[default]
    Mock,
    /// Raspberry Pi GPIO header via sysfs.
    Rpi,
}

impl FromStr for RelayDriver {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "rpi" | "gpio" => Ok(Self::Rpi),
            _ => Err(DeviceError::UnsupportedDriver {
                kind: "relay",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RelayDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => f.write_str("mock"),
            Self::Rpi => f.write_str("rpi"),
        }
    }
}

/// Sensor implementation named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorDriver {
    #[default]
    Mock,
    Bme280,
    Dht22,
}

impl FromStr for SensorDriver {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "bme280" => Ok(Self::Bme280),
            "dht22" => Ok(Self::Dht22),
            _ => Err(DeviceError::UnsupportedDriver {
                kind: "sensor",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SensorDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => f.write_str("mock"),
            Self::Bme280 => f.write_str("bme280"),
            Self::Dht22 => f.write_str("dht22"),
        }
    }
}

/// Build the relay for `driver` on GPIO `pin`.
pub fn create_relay(
    driver: RelayDriver,
    name: &str,
    pin: u32,
    settings: &RelaySettings,
) -> Box<dyn Relay> {
    tracing::debug!(relay = name, %driver, pin, "creating relay");
    match driver {
        RelayDriver::Mock => Box::new(MockRelay::new(name)),
        RelayDriver::Rpi => Box::new(GpioRelay::new(name, pin, settings)),
    }
}

/// Build the sensor for `driver`, reading IIO device `index` under `iio_root`
/// for hardware drivers.
pub fn create_sensor(
    driver: SensorDriver,
    name: &str,
    index: u32,
    iio_root: &Path,
) -> Box<dyn Sensor> {
    tracing::debug!(sensor = name, %driver, index, "creating sensor");
    let dir = IioSensor::device_dir(iio_root, index);
    match driver {
        SensorDriver::Mock => Box::new(MockSensor::simulated(name)),
        SensorDriver::Bme280 => Box::new(IioSensor::new(name, dir, IioChannels::Full)),
        SensorDriver::Dht22 => Box::new(IioSensor::new(name, dir, IioChannels::NoPressure)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_tags_parse_case_insensitively() {
        assert_eq!("MOCK".parse::<RelayDriver>().unwrap(), RelayDriver::Mock);
        assert_eq!(" Rpi ".parse::<RelayDriver>().unwrap(), RelayDriver::Rpi);
        assert_eq!("BME280".parse::<SensorDriver>().unwrap(), SensorDriver::Bme280);
        assert_eq!("dht22".parse::<SensorDriver>().unwrap(), SensorDriver::Dht22);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "arduino".parse::<RelayDriver>().unwrap_err();
        match err {
            DeviceError::UnsupportedDriver { kind, name } => {
                assert_eq!(kind, "relay");
                assert_eq!(name, "arduino");
            }
            other => panic!("Expected UnsupportedDriver, got {other:?}"),
        }
        assert!("sht31".parse::<SensorDriver>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for d in [SensorDriver::Mock, SensorDriver::Bme280, SensorDriver::Dht22] {
            assert_eq!(d.to_string().parse::<SensorDriver>().unwrap(), d);
        }
    }

    #[test]
    fn mock_drivers_build_named_devices() {
        let relay = create_relay(RelayDriver::Mock, "heater", 17, &RelaySettings::default());
        assert_eq!(relay.name(), "heater");

        let sensor = create_sensor(SensorDriver::Mock, "internal", 0, Path::new("/nonexistent"));
        assert_eq!(sensor.name(), "internal");
    }
}
