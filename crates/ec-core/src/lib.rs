//! ec-core: stable foundation for envirocontrol.
//!
//! Contains:
//! - reading (validated sensor samples and the paired sensor payload)
//! - params (controller tuning parameters carried over the bus)
//! - numeric (finite/range guards + float helpers)
//! - units (uom SI types + constructors)
//! - ids (device identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod params;
pub mod reading;
pub mod timestamp;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::DeviceId;
pub use numeric::*;
pub use params::{ControlParameters, DEFAULT_THRESHOLD};
pub use reading::{PayloadShape, Reading, SensorMessage, SensorPayload, STANDARD_PRESSURE_HPA};
