//! Service wiring: configuration in, running loops out.

use std::sync::mpsc;

use ec_controls::CapacityTable;
use ec_core::{ControlParameters, DeviceId, PayloadShape};
use ec_devices::{Relay, Sensor, create_relay, create_sensor};

use crate::bus::{MessageBus, MqttBus};
use crate::check::DeviceRegistry;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::router::{ControlLoop, ControlSetup, LoopExit};
use crate::sense::SensePublisher;
use crate::shutdown::Shutdown;
use crate::topics::{TopicKind, Topics};

pub const INTERNAL_SENSOR: &str = "internal";
pub const EXTERNAL_SENSOR: &str = "external";
pub const HEATER_RELAY: &str = "heater";
pub const STEAMER_RELAY: &str = "steamer";

/// Build the two relays named in the configuration: (heater, steamer).
pub fn build_relays(config: &AppConfig) -> AppResult<(Box<dyn Relay>, Box<dyn Relay>)> {
    let driver = config.relays.driver()?;
    let settings = config.relays.settings();
    Ok((
        create_relay(driver, HEATER_RELAY, config.relays.heater_gpio, &settings),
        create_relay(driver, STEAMER_RELAY, config.relays.steamer_gpio, &settings),
    ))
}

/// Build the two sensors named in the configuration: (internal, external).
pub fn build_sensors(config: &AppConfig) -> AppResult<(Box<dyn Sensor>, Box<dyn Sensor>)> {
    let sensors = &config.sensors;
    Ok((
        create_sensor(
            sensors.internal_driver()?,
            INTERNAL_SENSOR,
            sensors.internal_device,
            &sensors.iio_root,
        ),
        create_sensor(
            sensors.external_driver()?,
            EXTERNAL_SENSOR,
            sensors.external_device,
            &sensors.iio_root,
        ),
    ))
}

/// Control-loop settings from the configuration.
pub fn control_setup(config: &AppConfig) -> AppResult<ControlSetup> {
    Ok(ControlSetup {
        shape: config.payload_shape,
        mode: config.control.mode,
        heater: config.control.heater.to_params()?,
        steamer: config.control.steamer.to_params()?,
        heater_setpoint: config.control.heater.temperature,
        poll_interval: config.poll_interval(),
    })
}

/// Assemble a control loop for `topics` from the configuration.
pub fn build_control_loop(config: &AppConfig, topics: Topics) -> AppResult<ControlLoop> {
    let table = CapacityTable::from_path(&config.control.capacity_table)?;
    let (heater, steamer) = build_relays(config)?;
    Ok(ControlLoop::new(
        topics,
        table,
        control_setup(config)?,
        heater,
        steamer,
    ))
}

fn client_id(config: &AppConfig, role: &str, device_id: &DeviceId) -> String {
    match &config.broker.client_id {
        Some(id) if !id.trim().is_empty() => format!("{}-{role}", id.trim()),
        _ => format!("{device_id}-{role}"),
    }
}

/// Run the control side until stopped or the transport goes away.
pub fn run_control(config: &AppConfig, shutdown: &Shutdown) -> AppResult<LoopExit> {
    config.validate()?;
    let device_id = config.device_id();
    let topics = Topics::for_device(&device_id);
    tracing::info!(device_id = %device_id, "starting control service");

    let mut control_loop = build_control_loop(config, topics.clone())?;

    let (inbox_tx, inbox_rx) = mpsc::channel();
    let mut bus = MqttBus::connect(&config.broker, &client_id(config, "control", &device_id), inbox_tx)?;
    for topic in topics.all() {
        bus.subscribe(topic)?;
    }

    let exit = control_loop.run(&inbox_rx, shutdown);
    if let Err(e) = bus.close() {
        tracing::warn!(error = %e, "transport did not close cleanly");
    }
    Ok(exit)
}

/// Run the sensing side until stopped. Returns the number of payloads sent.
pub fn run_sense(config: &AppConfig, shutdown: &Shutdown) -> AppResult<u64> {
    config.validate()?;
    let device_id = config.device_id();
    let topics = Topics::for_device(&device_id);
    tracing::info!(device_id = %device_id, "starting sensing service");

    let (internal, external) = build_sensors(config)?;
    let external = match config.payload_shape {
        PayloadShape::Paired => Some(external),
        PayloadShape::Single => None,
    };

    // Nothing is subscribed, but the receiver must outlive the bus.
    let (inbox_tx, _inbox_rx) = mpsc::channel();
    let bus = MqttBus::connect(&config.broker, &client_id(config, "sense", &device_id), inbox_tx)?;

    let mut publisher = SensePublisher::new(
        topics.sensor_data.clone(),
        config.payload_shape,
        internal,
        external,
        bus,
    )?;
    let queued = publisher.run(config.sensors.publish_interval(), shutdown);
    let published = publisher.into_bus().close()?;
    tracing::info!(queued, published, "sensing service stopped");
    Ok(published)
}

/// Registry of every configured device, for bench checks.
pub fn build_registry(config: &AppConfig) -> AppResult<DeviceRegistry> {
    let (internal, external) = build_sensors(config)?;
    let (heater, steamer) = build_relays(config)?;

    let mut registry = DeviceRegistry::new();
    registry.add_sensor(internal);
    registry.add_sensor(external);
    registry.add_relay(heater);
    registry.add_relay(steamer);
    Ok(registry)
}

/// Publish one payload to a device topic and wait for it to be flushed.
///
/// Fails with [`AppError::Transport`] when the broker never took the message.
pub fn publish_to_device(
    config: &AppConfig,
    device_id: &DeviceId,
    kind: TopicKind,
    payload: &str,
) -> AppResult<()> {
    let topics = Topics::for_device(device_id);
    let (inbox_tx, _inbox_rx) = mpsc::channel();
    let mut bus = MqttBus::connect(&config.broker, &client_id(config, "operator", device_id), inbox_tx)?;
    bus.publish(topics.topic(kind), payload.as_bytes())?;
    bus.close()?;
    Ok(())
}

/// Publish new gains for the heater or steamer controller.
pub fn publish_parameters(
    config: &AppConfig,
    device_id: &DeviceId,
    kind: TopicKind,
    params: &ControlParameters,
) -> AppResult<()> {
    if kind == TopicKind::SensorData {
        return Err(AppError::InvalidInput(
            "parameters go to a heater or steamer topic".to_string(),
        ));
    }
    publish_to_device(config, device_id, kind, &params.to_json()?)
}
