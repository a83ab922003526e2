//! Bench check of the configured devices.
//!
//! A registry of named sensors and relays so an operator can read a sensor or
//! click a relay without running the control loop. Names are matched without
//! regard to case.

use std::collections::BTreeMap;

use ec_core::Reading;
use ec_devices::{Relay, RelayState, Sensor};

use crate::error::{AppError, AppResult};

/// Kind of a registered device, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceKind {
    Sensor,
    Relay,
}

#[derive(Default)]
pub struct DeviceRegistry {
    sensors: BTreeMap<String, Box<dyn Sensor>>,
    relays: BTreeMap<String, Box<dyn Relay>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor under its own name. A sensor registered under the
    /// same name replaces the earlier one.
    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.insert(key(sensor.name()), sensor);
    }

    pub fn add_relay(&mut self, relay: Box<dyn Relay>) {
        self.relays.insert(key(relay.name()), relay);
    }

    /// All devices, sorted by name.
    pub fn list(&self) -> Vec<(String, DeviceKind)> {
        let mut devices: Vec<(String, DeviceKind)> = self
            .sensors
            .keys()
            .map(|name| (name.clone(), DeviceKind::Sensor))
            .chain(
                self.relays
                    .keys()
                    .map(|name| (name.clone(), DeviceKind::Relay)),
            )
            .collect();
        devices.sort();
        devices
    }

    pub fn read_sensor(&mut self, name: &str) -> AppResult<Reading> {
        let sensor = self
            .sensors
            .get_mut(&key(name))
            .ok_or_else(|| AppError::InvalidInput(format!("No sensor named '{name}'")))?;
        Ok(sensor.read()?)
    }

    /// Command a relay; `on` closes it. Returns the resulting state.
    pub fn switch_relay(&mut self, name: &str, on: bool) -> AppResult<RelayState> {
        let relay = self
            .relays
            .get_mut(&key(name))
            .ok_or_else(|| AppError::InvalidInput(format!("No relay named '{name}'")))?;
        relay.set(on);
        Ok(relay.state())
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec_devices::{MockRelay, MockSensor};

    fn registry() -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        registry.add_sensor(Box::new(MockSensor::simulated("Internal")));
        registry.add_relay(Box::new(MockRelay::new("heater")));
        registry
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut registry = registry();
        assert!(registry.read_sensor("INTERNAL").is_ok());
        assert_eq!(registry.switch_relay("Heater", true).unwrap(), RelayState::Closed);
        assert_eq!(registry.switch_relay("heater", false).unwrap(), RelayState::Open);
    }

    #[test]
    fn unknown_device_is_invalid_input() {
        let mut registry = registry();
        assert!(matches!(
            registry.read_sensor("external"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.switch_relay("internal", true),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn list_is_sorted_by_name() {
        let registry = registry();
        assert_eq!(
            registry.list(),
            vec![
                ("heater".to_string(), DeviceKind::Relay),
                ("internal".to_string(), DeviceKind::Sensor),
            ]
        );
    }
}
