//! Two-state relay actuators.
//!
//! Semantics follow the relay board contacts:
//! - `open` de-energizes the device (heater/steamer off)
//! - `close` energizes it (heater/steamer on)
//!
//! The hardware variant drives a Linux sysfs GPIO line and waits for the
//! device to settle after each transition, longer after energizing than after
//! de-energizing. It never fails: when the GPIO line cannot be claimed or
//! written, the fault is logged and the relay behaves as a no-op, so the
//! control loop keeps running.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Last commanded relay position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelayState {
    /// Never commanded.
    #[default]
    Unknown,
    /// De-energized.
    Open,
    /// Energized.
    Closed,
}

impl RelayState {
    /// Whether the driven device is on.
    pub fn is_energized(self) -> bool {
        self == RelayState::Closed
    }
}

/// Capability of a two-state actuator.
pub trait Relay: Send {
    /// Name used in logs (e.g. "heater").
    fn name(&self) -> &str;

    /// De-energize the device.
    fn open(&mut self);

    /// Energize the device.
    fn close(&mut self);

    /// Last commanded state.
    fn state(&self) -> RelayState;

    /// `close` when `on`, otherwise `open`.
    fn set(&mut self, on: bool) {
        if on { self.close() } else { self.open() }
    }
}

/// In-memory relay for tests and simulation.
#[derive(Debug, Clone, Default)]
pub struct MockRelay {
    name: String,
    state: RelayState,
    commands: usize,
}

impl MockRelay {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RelayState::Unknown,
            commands: 0,
        }
    }

    /// Number of open/close commands received.
    pub fn commands(&self) -> usize {
        self.commands
    }
}

impl Relay for MockRelay {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) {
        self.commands += 1;
        self.state = RelayState::Open;
    }

    fn close(&mut self) {
        self.commands += 1;
        self.state = RelayState::Closed;
    }

    fn state(&self) -> RelayState {
        self.state
    }
}

/// Settle delays applied after each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTiming {
    /// Delay after `close`.
    pub energize: Duration,
    /// Delay after `open`.
    pub deenergize: Duration,
}

impl Default for RelayTiming {
    fn default() -> Self {
        Self {
            energize: Duration::from_secs(5),
            deenergize: Duration::from_secs(2),
        }
    }
}

impl RelayTiming {
    /// No settle delay, for bench tests.
    pub fn immediate() -> Self {
        Self {
            energize: Duration::ZERO,
            deenergize: Duration::ZERO,
        }
    }
}

/// Wiring of the hardware relays.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    /// sysfs GPIO class directory.
    pub gpio_root: PathBuf,
    /// Relay board energizes on a low level.
    pub active_low: bool,
    pub timing: RelayTiming,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            active_low: true,
            timing: RelayTiming::default(),
        }
    }
}

/// Relay driven through a Linux sysfs GPIO line.
#[derive(Debug)]
pub struct GpioRelay {
    name: String,
    pin: u32,
    value_path: Option<PathBuf>,
    active_low: bool,
    timing: RelayTiming,
    state: RelayState,
}

impl GpioRelay {
    /// Claim `pin` as an output.
    ///
    /// If the line cannot be exported or configured, a warning is logged and
    /// the relay is created detached: commands are recorded but not driven.
    pub fn new(name: impl Into<String>, pin: u32, settings: &RelaySettings) -> Self {
        let name = name.into();
        let value_path = match claim_output(&settings.gpio_root, pin) {
            Ok(path) => {
                tracing::info!(relay = %name, pin, "gpio relay attached");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(
                    relay = %name,
                    pin,
                    error = %e,
                    "gpio line unavailable; relay falls back to no-op"
                );
                None
            }
        };

        Self {
            name,
            pin,
            value_path,
            active_low: settings.active_low,
            timing: settings.timing,
            state: RelayState::Unknown,
        }
    }

    /// Whether a GPIO line backs this relay.
    pub fn is_attached(&self) -> bool {
        self.value_path.is_some()
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn drive(&mut self, energize: bool) {
        self.state = if energize {
            RelayState::Closed
        } else {
            RelayState::Open
        };

        let Some(value_path) = &self.value_path else {
            tracing::warn!(relay = %self.name, state = ?self.state, "no gpio line; command ignored");
            return;
        };

        let high = energize != self.active_low;
        let level = if high { "1" } else { "0" };
        if let Err(e) = fs::write(value_path, level) {
            tracing::warn!(relay = %self.name, pin = self.pin, error = %e, "gpio write failed");
            return;
        }
        tracing::debug!(relay = %self.name, pin = self.pin, level, state = ?self.state, "relay switched");

        let settle = if energize {
            self.timing.energize
        } else {
            self.timing.deenergize
        };
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
    }
}

impl Relay for GpioRelay {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) {
        self.drive(false);
    }

    fn close(&mut self) {
        self.drive(true);
    }

    fn state(&self) -> RelayState {
        self.state
    }
}

/// Export `pin` (if needed) and set it as an output. Returns the value file.
fn claim_output(gpio_root: &Path, pin: u32) -> io::Result<PathBuf> {
    let line_dir = gpio_root.join(format!("gpio{pin}"));
    if !line_dir.exists() {
        fs::write(gpio_root.join("export"), pin.to_string())?;
    }
    fs::write(line_dir.join("direction"), "out")?;
    Ok(line_dir.join("value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_relay_tracks_commands() {
        let mut relay = MockRelay::new("heater");
        assert_eq!(relay.state(), RelayState::Unknown);

        relay.close();
        assert_eq!(relay.state(), RelayState::Closed);
        assert!(relay.state().is_energized());

        relay.set(false);
        assert_eq!(relay.state(), RelayState::Open);
        assert_eq!(relay.commands(), 2);
    }

    #[test]
    fn missing_gpio_root_falls_back_to_noop() {
        let settings = RelaySettings {
            gpio_root: std::env::temp_dir().join("ec_devices_no_such_gpio_root/nested"),
            active_low: true,
            timing: RelayTiming::immediate(),
        };
        let mut relay = GpioRelay::new("steamer", 27, &settings);
        assert!(!relay.is_attached());

        relay.close();
        assert_eq!(relay.state(), RelayState::Closed);
        relay.open();
        assert_eq!(relay.state(), RelayState::Open);
    }

    #[test]
    fn default_timing_settles_longer_on_energize() {
        let timing = RelayTiming::default();
        assert!(timing.energize > timing.deenergize);
    }
}
