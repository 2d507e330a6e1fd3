pub mod config;
pub mod envelope;
pub mod errors;
pub mod link;
pub mod node;
pub mod sensors;
pub mod stats;
pub mod walk;

pub use config::{Args, BrokerConfig, NodeConfig, RadioConfig};
pub use envelope::{build_envelope, Envelope, Header, Metadata, Payload};
pub use errors::{Error, Result};
pub use link::{Link, LinkStatus, MqttLink};
pub use node::{Cycle, Node, NodePhase};
pub use sensors::{NodeState, Reading};
pub use stats::TxStats;
pub use walk::BoundedWalk;
