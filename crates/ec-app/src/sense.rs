//! Sensing side: poll the sensors and publish sensor-data payloads.

use std::time::{Duration, Instant};

use ec_core::{PayloadShape, Reading, SensorPayload};
use ec_devices::Sensor;

use crate::bus::MessageBus;
use crate::error::{AppError, AppResult};
use crate::shutdown::Shutdown;

/// Granularity at which the wait between cycles notices a stop request.
const STOP_POLL: Duration = Duration::from_millis(100);

pub struct SensePublisher<B: MessageBus> {
    topic: String,
    shape: PayloadShape,
    internal: Box<dyn Sensor>,
    external: Option<Box<dyn Sensor>>,
    bus: B,
}

impl<B: MessageBus> SensePublisher<B> {
    /// Paired payloads need an external sensor; single payloads ignore it.
    pub fn new(
        topic: impl Into<String>,
        shape: PayloadShape,
        internal: Box<dyn Sensor>,
        external: Option<Box<dyn Sensor>>,
        bus: B,
    ) -> AppResult<Self> {
        if shape == PayloadShape::Paired && external.is_none() {
            return Err(AppError::Config(
                "paired payloads need an external sensor".to_string(),
            ));
        }
        Ok(Self {
            topic: topic.into(),
            shape,
            internal,
            external,
            bus,
        })
    }

    /// Take one sample and publish it. Returns the JSON that was sent.
    pub fn publish_once(&mut self) -> AppResult<String> {
        let internal = self.internal.read()?;
        let external = match (self.shape, self.external.as_mut()) {
            (PayloadShape::Paired, Some(external)) => Some(external.read()?),
            _ => None,
        };
        let json = sensor_payload(self.shape, internal, external)?;

        self.bus.publish(&self.topic, json.as_bytes())?;
        Ok(json)
    }

    /// Publish every `interval` until stopped. Returns the number of payloads
    /// the bus accepted; an MQTT bus only confirms delivery on close.
    ///
    /// A failed cycle is logged and skipped; the next one runs on schedule.
    pub fn run(&mut self, interval: Duration, shutdown: &Shutdown) -> u64 {
        tracing::info!(topic = %self.topic, interval_s = interval.as_secs_f64(), "sensing started");
        let mut published = 0;

        while !shutdown.is_requested() {
            let started = Instant::now();
            match self.publish_once() {
                Ok(json) => {
                    published += 1;
                    tracing::debug!(payload = %json, "sensor data queued");
                }
                Err(e) => tracing::warn!(error = %e, "sensing cycle skipped"),
            }

            while !shutdown.is_requested() {
                let elapsed = started.elapsed();
                if elapsed >= interval {
                    break;
                }
                std::thread::sleep((interval - elapsed).min(STOP_POLL));
            }
        }

        tracing::info!(published, "sensing stopped");
        published
    }

    pub fn into_bus(self) -> B {
        self.bus
    }
}

/// Sensor-data JSON in the given shape. Paired payloads get a fresh id and
/// capture time; a single reading is stamped itself.
pub fn sensor_payload(
    shape: PayloadShape,
    internal: Reading,
    external: Option<Reading>,
) -> AppResult<String> {
    match (shape, external) {
        (PayloadShape::Paired, Some(external)) => {
            Ok(SensorPayload::new(internal, external).to_json()?)
        }
        (PayloadShape::Paired, None) => Err(AppError::InvalidInput(
            "paired payloads need an external reading".to_string(),
        )),
        (PayloadShape::Single, _) => serde_json::to_string(&internal.stamped())
            .map_err(|e| AppError::InvalidInput(e.to_string())),
    }
}
