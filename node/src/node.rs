use crate::config::NodeConfig;
use crate::envelope::{build_envelope, Envelope};
use crate::errors::{Error, Result};
use crate::link::Link;
use crate::sensors::NodeState;
use crate::stats::TxStats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Lifecycle of a node process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    Disconnected,
    Connecting,
    Connected,
    Running,
    ShuttingDown,
    Stopped,
}

/// Result of one read, build and transmit pass.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub envelope: Envelope,
    pub delivered: bool,
}

pub struct Node<L, R = StdRng> {
    config: NodeConfig,
    topic: String,
    state: NodeState,
    link: L,
    rng: R,
    phase: NodePhase,
}

impl<L: Link> Node<L, StdRng> {
    /// Seeds from `config.seed` when set, otherwise from OS entropy.
    pub fn new(config: NodeConfig, link: L) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, link, rng)
    }
}

impl<L: Link, R: Rng> Node<L, R> {
    /// Fails with `Error::Config` if the configuration does not validate.
    pub fn with_rng(config: NodeConfig, link: L, mut rng: R) -> Result<Self> {
        config.validate()?;

        let state = NodeState::new(
            config.device_id.clone(),
            config.display_name.clone(),
            config.radio.clone(),
            &mut rng,
        );

        Ok(Self {
            topic: config.topic(),
            config,
            state,
            link,
            rng,
            phase: NodePhase::Disconnected,
        })
    }

    pub fn phase(&self) -> NodePhase {
        self.phase
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn stats(&self) -> TxStats {
        self.state.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.phase = NodePhase::Connecting;

        match self.link.connect().await {
            Ok(()) => {
                self.phase = NodePhase::Connected;
                Ok(())
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.phase = NodePhase::Stopped;
                Err(e)
            }
        }
    }

    /// Sends the envelope payload to the gateway. Failures are logged and counted, never raised.
    pub async fn transmit(&mut self, envelope: &Envelope) -> bool {
        match self.try_transmit(envelope).await {
            Ok(()) => {
                self.state.stats.record_sent();
                info!(
                    "Packet sent | Moisture: {}% | Temp: {}°C | RSSI: {} dBm",
                    envelope.payload.moisture, envelope.payload.temperature, envelope.metadata.rssi
                );
                true
            }
            Err(e) => {
                if e.is_transmission_error() {
                    self.state.stats.record_error();
                } else {
                    self.state.stats.record_offline();
                }

                match e {
                    Error::NotConnected => warn!("Not connected to gateway"),
                    Error::PacketLost => warn!("Packet lost in transmission"),
                    e => error!("Transmission error: {}", e),
                }
                false
            }
        }
    }

    async fn try_transmit(&mut self, envelope: &Envelope) -> Result<()> {
        if !self.link.is_connected() {
            return Err(Error::NotConnected);
        }

        if self.rng.gen_bool(self.config.loss_probability) {
            return Err(Error::PacketLost);
        }

        let delay = self.rng.gen_range(self.config.propagation_delay.clone());
        tokio::time::sleep(delay).await;

        let payload = envelope.wire_bytes()?;
        self.link.publish(&self.topic, payload).await
    }

    /// Reads the sensors, builds an envelope, transmits it and logs the running stats.
    pub async fn cycle(&mut self) -> Cycle {
        let reading = self.state.read_sensors(&mut self.rng);
        let envelope = build_envelope(&self.state, &reading, &mut self.rng);
        debug!(
            frame_counter = envelope.header.frame_counter,
            snr = envelope.metadata.snr,
            battery = reading.battery,
            "Built envelope"
        );

        let delivered = self.transmit(&envelope).await;

        let stats = self.state.stats;
        info!(
            "Stats: Sent={}, Errors={}, Success Rate={:.1}%",
            stats.packets_sent,
            stats.transmission_errors,
            stats.success_rate()
        );

        Cycle { envelope, delivered }
    }

    async fn idle(&self) {
        let secs = self.config.interval.as_secs();
        if self.config.deep_sleep {
            info!("Entering deep sleep for {}s...", secs);
            tokio::time::sleep(self.config.interval).await;
            info!("Wake up from deep sleep");
        } else {
            debug!("Waiting {}s until next transmission", secs);
            tokio::time::sleep(self.config.interval).await;
        }
    }

    fn log_banner(&self) {
        let radio = &self.config.radio;
        info!("Starting LoRa Node: {}", self.config.display_name);
        info!("Device ID: {}", self.config.device_id);
        info!("Frequency: {} MHz", radio.frequency_mhz);
        info!("Spreading Factor: SF{}", radio.spreading_factor);
        info!("Transmission Interval: {}s", self.config.interval.as_secs());
    }

    /// Connects, then cycles until `shutdown` resolves. Returns early with the connection
    /// error if the gateway never acknowledges; no cycle runs in that case.
    pub async fn run<F: Future>(&mut self, shutdown: F) -> Result<()> {
        self.log_banner();
        tokio::pin!(shutdown);

        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted while connecting");
                self.shutdown().await;
                return Ok(());
            }
            connected = self.connect() => connected?,
        }

        self.phase = NodePhase::Running;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = async {
                    self.cycle().await;
                    self.idle().await;
                } => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        self.phase = NodePhase::ShuttingDown;
        info!("Shutting down node...");
        self.link.close().await;
        self.phase = NodePhase::Stopped;
        info!("Node stopped");
    }
}
