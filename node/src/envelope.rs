use crate::errors::Result;
use crate::sensors::{round1, NodeState, Reading};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

const RSSI_RANGE_DBM: (i32, i32) = (-120, -70);
const SNR_RANGE_DB: (f64, f64) = (-5.0, 10.0);

/// LoRaWAN-style frame header. Decorative only.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub device_id: String,
    pub frame_counter: u64,
    pub frequency: f64,
    pub sf: String,
    pub bandwidth: u32,
    pub tx_power: i8,
}

/// The part of the envelope that goes on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub device_id: String,
    pub moisture: f64,
    pub temperature: f64,
    pub battery: f64,
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

/// Simulated reception quality, logged but never transmitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub rssi: i32,
    pub snr: f64,
    pub node_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub header: Header,
    pub payload: Payload,
    pub metadata: Metadata,
}

impl Envelope {
    /// JSON bytes of the payload alone.
    pub fn wire_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload)?)
    }
}

/// Wraps a reading in a fresh envelope. The frame counter is the current `packets_sent`.
pub fn build_envelope(state: &NodeState, reading: &Reading, rng: &mut impl Rng) -> Envelope {
    let radio = state.radio();

    Envelope {
        header: Header {
            device_id: state.device_id().to_string(),
            frame_counter: state.stats.packets_sent,
            frequency: radio.frequency_mhz,
            sf: format!("SF{}", radio.spreading_factor),
            bandwidth: radio.bandwidth_khz,
            tx_power: radio.tx_power_dbm,
        },
        payload: Payload {
            device_id: state.device_id().to_string(),
            moisture: reading.moisture,
            temperature: reading.temperature,
            battery: reading.battery,
            timestamp: Utc::now().timestamp_millis(),
        },
        metadata: Metadata {
            rssi: rng.gen_range(RSSI_RANGE_DBM.0..=RSSI_RANGE_DBM.1),
            snr: round1(rng.gen_range(SNR_RANGE_DB.0..=SNR_RANGE_DB.1)),
            node_name: state.display_name().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RadioConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (NodeState, StdRng) {
        let mut rng = StdRng::seed_from_u64(17);
        let state = NodeState::new("node_01", "Field A", RadioConfig::default(), &mut rng);
        (state, rng)
    }

    #[test]
    fn test_header_echoes_radio_config() {
        let (mut state, mut rng) = setup();
        state.stats.packets_sent = 12;
        let reading = state.read_sensors(&mut rng);

        let envelope = build_envelope(&state, &reading, &mut rng);

        assert_eq!(envelope.header.device_id, "node_01");
        assert_eq!(envelope.header.frame_counter, 12);
        assert_eq!(envelope.header.frequency, 868.1);
        assert_eq!(envelope.header.sf, "SF7");
        assert_eq!(envelope.header.bandwidth, 125);
        assert_eq!(envelope.header.tx_power, 14);
        assert_eq!(envelope.metadata.node_name, "Field A");
    }

    #[test]
    fn test_metadata_ranges() {
        let (state, mut rng) = setup();
        let reading = Reading {
            moisture: 50.0,
            temperature: 28.0,
            battery: 100.0,
        };

        for _ in 0..1_000 {
            let envelope = build_envelope(&state, &reading, &mut rng);
            assert!((-120..=-70).contains(&envelope.metadata.rssi));
            assert!((-5.0..=10.0).contains(&envelope.metadata.snr));
        }
    }

    #[test]
    fn test_wire_bytes_contain_payload_only() {
        let (mut state, mut rng) = setup();
        let reading = state.read_sensors(&mut rng);
        let envelope = build_envelope(&state, &reading, &mut rng);

        let bytes = envelope.wire_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let object = json.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["battery", "deviceId", "moisture", "temperature", "timestamp"]
        );
        assert!(object["timestamp"].is_i64());
        assert_eq!(object["moisture"].as_f64(), Some(reading.moisture));

        let decoded: Payload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, envelope.payload);
    }
}
