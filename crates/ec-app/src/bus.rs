//! Publish/subscribe transport.
//!
//! The control loop never talks to the network directly. A transport pushes
//! every received message into an [`InboundMessage`] channel from its own
//! thread; the loop owns the receiving end.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet, QoS};

use crate::config::BrokerConfig;
use crate::error::{AppError, AppResult};

/// One message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: 0,
        }
    }
}

/// Outbound side of a transport.
pub trait MessageBus {
    fn subscribe(&mut self, topic: &str) -> AppResult<()>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> AppResult<()>;

    /// Release the connection. Further calls are errors or no-ops.
    fn disconnect(&mut self) -> AppResult<()>;
}

/// Delay before polling again after a connection error.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// MQTT transport backed by a `rumqttc` synchronous client.
pub struct MqttBus {
    client: Client,
    closing: Arc<AtomicBool>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    delivery: Arc<Delivery>,
    queued: u64,
    worker: Option<JoinHandle<()>>,
}

/// What the network thread managed to hand to the socket.
#[derive(Debug, Default)]
struct Delivery {
    sent: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl MqttBus {
    /// Create the client and start the network thread.
    ///
    /// The connection is established lazily by the network thread; requests
    /// made before it is up are queued (up to `queue_capacity`).
    pub fn connect(
        broker: &BrokerConfig,
        client_id: &str,
        inbox: Sender<InboundMessage>,
    ) -> AppResult<Self> {
        let mut options = MqttOptions::new(client_id, broker.address.as_str(), broker.port);
        options.set_keep_alive(Duration::from_secs(broker.keep_alive_s));

        let (client, connection) = Client::new(options, broker.queue_capacity);
        let closing = Arc::new(AtomicBool::new(false));
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        let delivery = Arc::new(Delivery::default());

        let network = NetworkWorker {
            client: client.clone(),
            closing: Arc::clone(&closing),
            subscriptions: Arc::clone(&subscriptions),
            delivery: Arc::clone(&delivery),
            inbox,
        };
        let worker = thread::Builder::new()
            .name("mqtt-network".to_string())
            .spawn(move || network.run(connection))?;

        tracing::info!(
            address = %broker.address,
            port = broker.port,
            client_id,
            "mqtt client started"
        );
        Ok(Self {
            client,
            closing,
            subscriptions,
            delivery,
            queued: 0,
            worker: Some(worker),
        })
    }

    /// Disconnect and wait for the network thread to flush queued requests
    /// and exit. Returns the number of publishes written to the broker.
    ///
    /// Fails with [`AppError::Transport`] when any queued publish was dropped
    /// because the connection went away first.
    pub fn close(mut self) -> AppResult<u64> {
        self.disconnect()?;
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| AppError::Transport("mqtt network thread panicked".to_string()))?;
        }

        let sent = self.delivery.sent.load(Ordering::SeqCst);
        if sent < self.queued {
            let cause = self
                .delivery
                .last_error
                .lock()
                .ok()
                .and_then(|e| e.clone())
                .unwrap_or_else(|| "connection closed".to_string());
            return Err(AppError::Transport(format!(
                "{} of {} publishes never reached the broker: {}",
                self.queued - sent,
                self.queued,
                cause
            )));
        }
        Ok(sent)
    }
}

impl MessageBus for MqttBus {
    fn subscribe(&mut self, topic: &str) -> AppResult<()> {
        self.client.subscribe(topic, QoS::AtMostOnce)?;
        if let Ok(mut topics) = self.subscriptions.lock() {
            topics.push(topic.to_string());
        }
        tracing::info!(topic, "subscribed");
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> AppResult<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())?;
        self.queued += 1;
        tracing::info!(topic, bytes = payload.len(), "published");
        Ok(())
    }

    fn disconnect(&mut self) -> AppResult<()> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client
            .disconnect()
            .map_err(|e| AppError::Transport(e.to_string()))?;
        tracing::info!("mqtt disconnect requested");
        Ok(())
    }
}

/// State moved onto the network thread.
struct NetworkWorker {
    client: Client,
    closing: Arc<AtomicBool>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    delivery: Arc<Delivery>,
    inbox: Sender<InboundMessage>,
}

impl NetworkWorker {
    fn run(mut self, mut connection: Connection) {
        let mut connected_before = false;

        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                        qos: publish.qos as u8,
                    };
                    if self.inbox.send(message).is_err() {
                        tracing::debug!("inbox closed; stopping network thread");
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!(session_present = ack.session_present, "connected to broker");
                    if connected_before && !ack.session_present {
                        self.resubscribe();
                    }
                    connected_before = true;
                }
                Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                    self.delivery.sent.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracing::info!("broker closed the session");
                }
                Ok(_) => {}
                Err(e) => {
                    if let Ok(mut last) = self.delivery.last_error.lock() {
                        *last = Some(e.to_string());
                    }
                    if self.closing.load(Ordering::SeqCst) {
                        break;
                    }
                    tracing::warn!(error = %e, "mqtt connection error; retrying");
                    thread::sleep(RECONNECT_BACKOFF);
                }
            }
        }
        tracing::info!("mqtt network thread stopped");
    }

    fn resubscribe(&mut self) {
        let topics = match self.subscriptions.lock() {
            Ok(topics) => topics.clone(),
            Err(_) => return,
        };
        for topic in topics {
            // The request channel is drained by this thread, so never block on it.
            match self.client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                Ok(()) => tracing::info!(topic = %topic, "resubscribed"),
                Err(e) => tracing::warn!(topic = %topic, error = %e, "resubscribe failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_message_defaults_to_qos_zero() {
        let msg = InboundMessage::new("/a/sensor_data/", "{}");
        assert_eq!(msg.qos, 0);
        assert_eq!(msg.payload, b"{}".to_vec());
    }
}
