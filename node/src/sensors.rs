use crate::config::RadioConfig;
use crate::stats::TxStats;
use crate::walk::BoundedWalk;
use rand::Rng;

pub const MOISTURE_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const TEMPERATURE_BOUNDS: (f64, f64) = (15.0, 45.0);
pub const BATTERY_BOUNDS: (f64, f64) = (0.0, 100.0);

const MOISTURE_STEP: (f64, f64) = (-2.0, 2.0);
const TEMPERATURE_STEP: (f64, f64) = (-1.0, 1.0);
const BATTERY_DRAIN: (f64, f64) = (-0.05, -0.01);

const MOISTURE_BASE: f64 = 50.0;
const MOISTURE_SPREAD: f64 = 10.0;
const TEMPERATURE_BASE: f64 = 28.0;
const TEMPERATURE_SPREAD: f64 = 5.0;
const BATTERY_FULL: f64 = 100.0;

/// One set of sensor values, rounded to a single decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub moisture: f64,
    pub temperature: f64,
    pub battery: f64,
}

/// Everything the simulator owns about its node. Only the main loop mutates it.
#[derive(Debug, Clone)]
pub struct NodeState {
    device_id: String,
    display_name: String,
    moisture: BoundedWalk,
    temperature: BoundedWalk,
    battery: BoundedWalk,
    radio: RadioConfig,
    pub stats: TxStats,
}

impl NodeState {
    pub fn new(
        device_id: impl Into<String>,
        display_name: impl Into<String>,
        radio: RadioConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let moisture = MOISTURE_BASE + rng.gen_range(-MOISTURE_SPREAD..=MOISTURE_SPREAD);
        let temperature =
            TEMPERATURE_BASE + rng.gen_range(-TEMPERATURE_SPREAD..=TEMPERATURE_SPREAD);

        Self {
            device_id: device_id.into(),
            display_name: display_name.into(),
            moisture: BoundedWalk::new(moisture, MOISTURE_STEP, MOISTURE_BOUNDS),
            temperature: BoundedWalk::new(temperature, TEMPERATURE_STEP, TEMPERATURE_BOUNDS),
            battery: BoundedWalk::new(BATTERY_FULL, BATTERY_DRAIN, BATTERY_BOUNDS),
            radio,
            stats: TxStats::default(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn radio(&self) -> &RadioConfig {
        &self.radio
    }

    pub fn moisture(&self) -> f64 {
        self.moisture.value()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.value()
    }

    pub fn battery_level(&self) -> f64 {
        self.battery.value()
    }

    /// Advances every sensor by one tick.
    pub fn read_sensors(&mut self, rng: &mut impl Rng) -> Reading {
        Reading {
            moisture: round1(self.moisture.step(rng)),
            temperature: round1(self.temperature.step(rng)),
            battery: round1(self.battery.step(rng)),
        }
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(seed: u64) -> (NodeState, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = NodeState::new("node_01", "Field A", RadioConfig::default(), &mut rng);
        (state, rng)
    }

    #[test]
    fn test_initial_state() {
        let (state, _) = state(3);

        assert_eq!(state.device_id(), "node_01");
        assert_eq!(state.display_name(), "Field A");
        assert!((40.0..=60.0).contains(&state.moisture()));
        assert!((23.0..=33.0).contains(&state.temperature()));
        assert_eq!(state.battery_level(), 100.0);
        assert_eq!(state.stats, TxStats::default());
    }

    #[test]
    fn test_readings_stay_in_range() {
        let (mut state, mut rng) = state(11);

        for _ in 0..5_000 {
            let reading = state.read_sensors(&mut rng);
            assert!((0.0..=100.0).contains(&reading.moisture));
            assert!((15.0..=45.0).contains(&reading.temperature));
            assert!((0.0..=100.0).contains(&reading.battery));
            assert!((0.0..=100.0).contains(&state.moisture()));
            assert!((15.0..=45.0).contains(&state.temperature()));
        }
    }

    #[test]
    fn test_battery_drains_monotonically() {
        let (mut state, mut rng) = state(5);
        let mut prev = state.battery_level();

        for _ in 0..12_000 {
            state.read_sensors(&mut rng);
            let level = state.battery_level();
            assert!(level <= prev);
            let drained = prev - level;
            assert!(level == 0.0 || (0.01 - 1e-9..=0.05 + 1e-9).contains(&drained));
            prev = level;
        }
        // 12000 ticks of at least 0.01 drain a full battery
        assert_eq!(state.battery_level(), 0.0);
    }

    #[test]
    fn test_reading_is_rounded() {
        let (mut state, mut rng) = state(9);
        let reading = state.read_sensors(&mut rng);

        for v in [reading.moisture, reading.temperature, reading.battery] {
            assert!(((v * 10.0).round() - v * 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let (mut a, mut rng_a) = state(21);
        let (mut b, mut rng_b) = state(21);

        for _ in 0..50 {
            assert_eq!(a.read_sensors(&mut rng_a), b.read_sensors(&mut rng_b));
        }
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(round1(12.36), 12.4);
        assert_eq!(round1(-4.96), -5.0);
    }
}
