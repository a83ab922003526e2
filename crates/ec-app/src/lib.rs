//! Service layer for envirocontrol.
//!
//! Wires the controllers, the capacity table and the devices to a
//! publish/subscribe transport. Both command line services live here:
//! the control loop consuming sensor data and parameter updates, and the
//! sensing side publishing sensor data on an interval.

pub mod bus;
pub mod check;
pub mod config;
pub mod error;
pub mod router;
pub mod sense;
pub mod service;
pub mod shutdown;
pub mod topics;

pub use bus::{InboundMessage, MessageBus, MqttBus};
pub use check::{DeviceKind, DeviceRegistry};
pub use config::{AppConfig, BrokerConfig, ControlConfig, GainsConfig, RelayConfig, SensorConfig};
pub use error::{AppError, AppResult};
pub use router::{ControlLoop, ControlSetup, Dispatch, LoopExit, LoopState, LoopStats};
pub use sense::{SensePublisher, sensor_payload};
pub use service::{
    build_control_loop, build_registry, control_setup, publish_parameters, publish_to_device,
    run_control, run_sense,
};
pub use shutdown::Shutdown;
pub use topics::{TopicKind, Topics};
