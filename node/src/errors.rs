use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection timeout after {0:?}")]
    ConnectionTimeout(Duration),

    #[error("Connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("Not connected to gateway")]
    NotConnected,

    #[error("Packet lost in transmission")]
    PacketLost,

    #[error("MQTT error: {0}")]
    Publish(#[from] rumqttc::ClientError),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Failures that count against `transmission_errors`.
    pub fn is_transmission_error(&self) -> bool {
        matches!(self, Error::PacketLost | Error::Publish(_) | Error::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transmission_error_classification() {
        assert!(Error::PacketLost.is_transmission_error());
        assert!(!Error::NotConnected.is_transmission_error());
        assert!(Error::Json(serde_json::from_str::<u8>("x").unwrap_err()).is_transmission_error());
        assert!(!Error::ConnectionTimeout(Duration::from_secs(10)).is_transmission_error());
    }
}
