//! Device drivers for envirocontrol.
//!
//! Two capabilities sit at the hardware boundary:
//!
//! - [`Relay`]: a two-state actuator (`open` de-energizes, `close` energizes)
//! - [`Sensor`]: a temperature / humidity / pressure source
//!
//! Each has an inert in-memory variant for tests and simulation and a Linux
//! sysfs-backed variant for real hardware. A driver tag from configuration is
//! resolved once at startup into a boxed trait object by [`create_relay`] or
//! [`create_sensor`]; nothing dispatches on driver names after that.

pub mod driver;
pub mod error;
pub mod relay;
pub mod sensor;

pub use driver::{RelayDriver, SensorDriver, create_relay, create_sensor};
pub use error::{DeviceError, DeviceResult};
pub use relay::{GpioRelay, MockRelay, Relay, RelayState, RelaySettings, RelayTiming};
pub use sensor::{IioChannels, IioSensor, MockSensor, Sensor};
