use crate::errors::{Error, Result};
use clap::Parser;
use std::ops::RangeInclusive;
use std::time::Duration;

pub const DEFAULT_DEVICE_ID: &str = "node_01";
const DEFAULT_DISPLAY_NAME: &str = "Field A - Soil Sensor";

/// Radio parameters echoed into every envelope header. They never change behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioConfig {
    pub frequency_mhz: f64,
    pub spreading_factor: u8,
    pub bandwidth_khz: u32,
    pub tx_power_dbm: i8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        // EU868 band, SF7
        Self {
            frequency_mhz: 868.1,
            spreading_factor: 7,
            bandwidth_khz: 125,
            tx_power_dbm: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    /// Capacity of the client request channel feeding the event loop.
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub device_id: String,
    pub display_name: String,
    pub interval: Duration,
    pub deep_sleep: bool,
    pub loss_probability: f64,
    pub propagation_delay: RangeInclusive<Duration>,
    pub seed: Option<u64>,
    pub radio: RadioConfig,
    pub broker: BrokerConfig,
}

impl NodeConfig {
    pub fn new(device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();
        Self {
            display_name: default_display_name(&device_id),
            device_id,
            interval: Duration::from_secs(60),
            deep_sleep: true,
            loss_probability: 0.05,
            propagation_delay: Duration::from_millis(100)..=Duration::from_millis(300),
            seed: None,
            radio: RadioConfig::default(),
            broker: BrokerConfig::default(),
        }
    }

    /// Client identifier presented to the broker.
    pub fn client_id(&self) -> String {
        format!("lora_node_{}", self.device_id)
    }

    pub fn topic(&self) -> String {
        format!("farm/sensors/{}", self.device_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(Error::Config("device id cannot be empty".to_string()));
        }
        if self.interval.is_zero() {
            return Err(Error::Config("interval must be at least 1 second".to_string()));
        }
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(Error::Config(format!(
                "loss probability {} out of range [0, 1]",
                self.loss_probability
            )));
        }
        if self.propagation_delay.start() > self.propagation_delay.end() {
            return Err(Error::Config("propagation delay range is inverted".to_string()));
        }
        if self.broker.connect_timeout.is_zero() {
            return Err(Error::Config("connect timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ID)
    }
}

fn default_display_name(device_id: &str) -> String {
    if device_id == DEFAULT_DEVICE_ID {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        format!("Node {}", device_id)
    }
}

/// Simulated LoRa sensor node publishing to an MQTT gateway.
#[derive(Debug, Parser)]
#[command(name = "lora-node", version, about)]
pub struct Args {
    /// Device identifier, also used for the topic and client id
    #[arg(default_value = DEFAULT_DEVICE_ID)]
    pub device_id: String,

    /// Human-readable node name (defaults to "Node <device_id>")
    pub display_name: Option<String>,

    /// Seconds between transmissions
    #[arg(default_value_t = 60)]
    pub interval: u64,

    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    pub broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub port: u16,

    /// MQTT keep-alive in seconds
    #[arg(long, default_value_t = 60)]
    pub keep_alive: u64,

    /// Seconds to wait for the broker to acknowledge the connection
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Probability that a packet is lost before reaching the gateway
    #[arg(long, default_value_t = 0.05)]
    pub loss_probability: f64,

    /// Seed for a reproducible run
    #[arg(long, env = "NODE_SEED")]
    pub seed: Option<u64>,

    /// Idle between cycles instead of simulating deep sleep
    #[arg(long)]
    pub no_deep_sleep: bool,
}

impl Args {
    pub fn into_config(self) -> Result<NodeConfig> {
        let mut config = NodeConfig::new(self.device_id);
        if let Some(name) = self.display_name {
            config.display_name = name;
        }
        config.interval = Duration::from_secs(self.interval);
        config.deep_sleep = !self.no_deep_sleep;
        config.loss_probability = self.loss_probability;
        config.seed = self.seed;
        config.broker = BrokerConfig {
            host: self.broker,
            port: self.port,
            keep_alive: Duration::from_secs(self.keep_alive),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            ..BrokerConfig::default()
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<NodeConfig> {
        let mut argv = vec!["lora-node"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.device_id, "node_01");
        assert_eq!(config.display_name, "Field A - Soil Sensor");
        assert_eq!(config.interval, Duration::from_secs(60));
        assert!(config.deep_sleep);
        assert_eq!(config.loss_probability, 0.05);
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.radio, RadioConfig::default());
    }

    #[test]
    fn test_positional_args() {
        let config = parse(&["node_02", "Field B - Climate", "45"]).unwrap();

        assert_eq!(config.device_id, "node_02");
        assert_eq!(config.display_name, "Field B - Climate");
        assert_eq!(config.interval, Duration::from_secs(45));
    }

    #[test]
    fn test_display_name_derived_from_device_id() {
        let config = parse(&["node_03"]).unwrap();
        assert_eq!(config.display_name, "Node node_03");
    }

    #[test]
    fn test_topic_and_client_id() {
        let config = NodeConfig::new("node_07");
        assert_eq!(config.topic(), "farm/sensors/node_07");
        assert_eq!(config.client_id(), "lora_node_node_07");
    }

    #[test]
    fn test_invalid_loss_probability() {
        assert!(parse(&["--loss-probability", "1.5"]).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(parse(&["node_01", "Field", "0"]).is_err());
    }

    #[test]
    fn test_empty_device_id_rejected() {
        let config = NodeConfig::new("");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
