use crate::config::BrokerConfig;
use crate::errors::{Error, Result};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument, Span};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Connection state as last reported by the event loop task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Down,
    Up,
    Rejected(String),
}

/// Uplink from the node to its gateway.
#[allow(async_fn_in_trait)]
pub trait Link {
    /// Resolves once the gateway acknowledged the session, or fails on rejection or timeout.
    async fn connect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Publishes with at-least-once delivery.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    async fn close(&mut self);
}

/// MQTT uplink backed by `rumqttc`. The event loop runs in its own task and reports
/// status over a watch channel.
pub struct MqttLink {
    options: MqttOptions,
    capacity: usize,
    connect_timeout: Duration,
    client: Option<AsyncClient>,
    status: watch::Receiver<LinkStatus>,
    task: Option<JoinHandle<()>>,
}

impl MqttLink {
    pub fn new(client_id: impl Into<String>, broker: &BrokerConfig) -> Self {
        let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
        options.set_keep_alive(broker.keep_alive);
        options.set_clean_session(true);

        let (_, status) = watch::channel(LinkStatus::Down);

        Self {
            options,
            capacity: broker.capacity,
            connect_timeout: broker.connect_timeout,
            client: None,
            status,
            task: None,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    fn stop_event_loop(&mut self) {
        self.client = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Link for MqttLink {
    async fn connect(&mut self) -> Result<()> {
        let (host, port) = self.options.broker_address();
        info!("Connecting to gateway at {}:{}...", host, port);

        let (client, eventloop) = AsyncClient::new(self.options.clone(), self.capacity);
        let (tx, mut rx) = watch::channel(LinkStatus::Down);

        self.task = Some(tokio::spawn(
            drive_event_loop(eventloop, tx).instrument(Span::current()),
        ));
        self.client = Some(client);
        self.status = rx.clone();

        let settled = async {
            rx.wait_for(|status| *status != LinkStatus::Down)
                .await
                .map(|status| status.clone())
        };

        let outcome = match tokio::time::timeout(self.connect_timeout, settled).await {
            Ok(Ok(LinkStatus::Rejected(reason))) => Err(Error::ConnectionRejected(reason)),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(Error::ConnectionRejected(
                "event loop stopped before acknowledging".to_string(),
            )),
            Err(_) => Err(Error::ConnectionTimeout(self.connect_timeout)),
        };

        if outcome.is_err() {
            self.stop_event_loop();
        }
        outcome
    }

    fn is_connected(&self) -> bool {
        *self.status.borrow() == LinkStatus::Up
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let client = self.client.as_ref().ok_or(Error::NotConnected)?;
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                warn!("Failed to send disconnect: {}", e);
            }
        }

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut task).await.is_err() {
                debug!("Event loop did not stop within {:?}, aborting", DISCONNECT_GRACE);
                task.abort();
            }
        }
    }
}

async fn drive_event_loop(mut eventloop: EventLoop, status: watch::Sender<LinkStatus>) {
    loop {
        match eventloop.poll().await {
            // refused CONNACKs surface as `ConnectionError::ConnectionRefused`
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to gateway");
                status.send_replace(LinkStatus::Up);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                status.send_replace(LinkStatus::Down);
                info!("Disconnected from gateway");
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => {
                error!("Connection failed with code {:?}", code);
                status.send_replace(LinkStatus::Rejected(format!("{:?}", code)));
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
            Err(e) => {
                if *status.borrow() == LinkStatus::Up {
                    warn!("Disconnected from gateway: {}", e);
                } else {
                    debug!("MQTT eventloop error: {}", e);
                }
                status.send_replace(LinkStatus::Down);
                // rumqttc reconnects on the next poll
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
