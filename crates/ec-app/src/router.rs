//! The control loop: one consumer of the inbound message queue.
//!
//! Each message is classified by exact topic, decoded, and turned into relay
//! commands or a controller reconfiguration. Bad payloads are logged and
//! dropped; nothing a peer publishes can stop the loop.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use ec_controls::{CapacityTable, ControlMode, FeedbackController};
use ec_core::{ControlParameters, PayloadShape, SensorMessage};
use ec_devices::Relay;

use crate::bus::InboundMessage;
use crate::shutdown::Shutdown;
use crate::topics::{TopicKind, Topics};

/// Start-up settings of the control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSetup {
    pub shape: PayloadShape,
    pub mode: ControlMode,
    pub heater: ControlParameters,
    pub steamer: ControlParameters,
    /// Heater target for single-reading payloads when the newest heater
    /// parameters carry none.
    pub heater_setpoint: Option<f64>,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
}

/// Outcome of handling one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A sensor sample was processed. `None` means the decision was skipped
    /// and the relay left as it was.
    Sensor {
        heater: Option<bool>,
        steamer: Option<bool>,
    },
    HeaterReconfigured,
    SteamerReconfigured,
    Dropped { reason: String },
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop flag was raised.
    Stopped,
    /// Every sender of the inbox is gone.
    TransportClosed,
}

/// Per-run message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub samples: u64,
    pub reconfigurations: u64,
    pub dropped: u64,
    pub ignored: u64,
}

pub struct ControlLoop {
    topics: Topics,
    table: CapacityTable,
    shape: PayloadShape,
    heater: FeedbackController,
    steamer: FeedbackController,
    heater_setpoint: Option<f64>,
    heater_relay: Box<dyn Relay>,
    steamer_relay: Box<dyn Relay>,
    poll_interval: Duration,
    state: LoopState,
    stats: LoopStats,
}

impl ControlLoop {
    /// Build the loop and switch both devices off.
    pub fn new(
        topics: Topics,
        table: CapacityTable,
        setup: ControlSetup,
        mut heater_relay: Box<dyn Relay>,
        mut steamer_relay: Box<dyn Relay>,
    ) -> Self {
        heater_relay.open();
        steamer_relay.open();

        Self {
            topics,
            table,
            shape: setup.shape,
            heater: FeedbackController::new(setup.heater).with_mode(setup.mode),
            steamer: FeedbackController::new(setup.steamer).with_mode(setup.mode),
            heater_setpoint: setup.heater_setpoint,
            heater_relay,
            steamer_relay,
            poll_interval: setup.poll_interval,
            state: LoopState::Running,
            stats: LoopStats::default(),
        }
    }

    /// Process messages until stopped or the inbox disconnects.
    ///
    /// The stop flag is checked between messages, so a message being handled
    /// always completes, relay commands included.
    pub fn run(&mut self, inbox: &Receiver<InboundMessage>, shutdown: &Shutdown) -> LoopExit {
        tracing::info!(topics = ?self.topics.all(), shape = ?self.shape, "control loop started");

        let exit = loop {
            if shutdown.is_requested() {
                break LoopExit::Stopped;
            }
            match inbox.recv_timeout(self.poll_interval) {
                Ok(message) => {
                    self.handle(&message);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break LoopExit::TransportClosed,
            }
        };

        self.state = LoopState::ShuttingDown;
        tracing::info!(
            ?exit,
            samples = self.stats.samples,
            reconfigurations = self.stats.reconfigurations,
            dropped = self.stats.dropped,
            ignored = self.stats.ignored,
            heater = ?self.heater_relay.state(),
            steamer = ?self.steamer_relay.state(),
            "control loop stopped"
        );
        exit
    }

    /// Process exactly one message.
    pub fn handle(&mut self, message: &InboundMessage) -> Dispatch {
        let dispatch = match self.topics.classify(&message.topic) {
            Some(TopicKind::SensorData) => self.on_sensor_data(&message.payload),
            Some(TopicKind::HeaterParameters) => self.on_heater_parameters(&message.payload),
            Some(TopicKind::SteamerParameters) => self.on_steamer_parameters(&message.payload),
            None => Dispatch::Ignored,
        };

        match &dispatch {
            Dispatch::Sensor { .. } => self.stats.samples += 1,
            Dispatch::HeaterReconfigured | Dispatch::SteamerReconfigured => {
                self.stats.reconfigurations += 1
            }
            Dispatch::Dropped { reason } => {
                self.stats.dropped += 1;
                tracing::warn!(topic = %message.topic, reason = %reason, "dropped message");
            }
            Dispatch::Ignored => {
                self.stats.ignored += 1;
                tracing::debug!(topic = %message.topic, "ignored message on unknown topic");
            }
        }
        dispatch
    }

    fn on_sensor_data(&mut self, payload: &[u8]) -> Dispatch {
        let sample = match SensorMessage::decode(payload, self.shape) {
            Ok(sample) => sample,
            Err(e) => {
                return Dispatch::Dropped {
                    reason: e.to_string(),
                };
            }
        };
        let internal = sample.internal();

        let heater_target = match sample.external() {
            Some(external) => Some(external.temperature()),
            None => self.heater.params().setpoint().or(self.heater_setpoint),
        };
        let heater = match heater_target {
            Some(target) => {
                let out = self.heater.step(internal.temperature(), target);
                tracing::debug!(
                    actual = internal.temperature(),
                    target,
                    output = out.output,
                    on = out.on,
                    "heater decision"
                );
                self.heater_relay.set(out.on);
                Some(out.on)
            }
            None => {
                tracing::debug!("no heater set-point; heater decision skipped");
                None
            }
        };

        let steamer = match self.table.closest_at_or_below(internal.temperature() - 1.0) {
            Some((temperature, capacity)) => {
                let out = self.steamer.step(internal.humidity(), capacity);
                tracing::debug!(
                    actual = internal.humidity(),
                    table_temperature = temperature,
                    capacity,
                    output = out.output,
                    on = out.on,
                    "steamer decision"
                );
                self.steamer_relay.set(out.on);
                Some(out.on)
            }
            None => {
                tracing::debug!(
                    temperature = internal.temperature(),
                    "below capacity table; steamer decision skipped"
                );
                None
            }
        };

        Dispatch::Sensor { heater, steamer }
    }

    fn on_heater_parameters(&mut self, payload: &[u8]) -> Dispatch {
        match ControlParameters::from_json(payload) {
            Ok(params) => {
                log_parameters("heater", &params);
                self.heater.configure(params);
                Dispatch::HeaterReconfigured
            }
            Err(e) => Dispatch::Dropped {
                reason: e.to_string(),
            },
        }
    }

    fn on_steamer_parameters(&mut self, payload: &[u8]) -> Dispatch {
        match ControlParameters::from_json(payload) {
            Ok(params) => {
                log_parameters("steamer", &params);
                self.steamer.configure(params);
                Dispatch::SteamerReconfigured
            }
            Err(e) => Dispatch::Dropped {
                reason: e.to_string(),
            },
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn heater(&self) -> &FeedbackController {
        &self.heater
    }

    pub fn steamer(&self) -> &FeedbackController {
        &self.steamer
    }

    pub fn heater_relay(&self) -> &dyn Relay {
        self.heater_relay.as_ref()
    }

    pub fn steamer_relay(&self) -> &dyn Relay {
        self.steamer_relay.as_ref()
    }
}

fn log_parameters(controller: &str, params: &ControlParameters) {
    tracing::info!(
        controller,
        kp = params.kp(),
        kd = params.kd(),
        ki = params.ki(),
        threshold = params.threshold(),
        setpoint = ?params.setpoint(),
        "controller reconfigured"
    );
}
