/// Transmission counters for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    pub packets_sent: u64,
    /// Simulated losses plus failed publish calls.
    pub transmission_errors: u64,
    /// Cycles skipped while the link was down. Not part of the success rate.
    pub offline_skips: u64,
}

impl TxStats {
    pub fn record_sent(&mut self) {
        self.packets_sent += 1;
    }

    pub fn record_error(&mut self) {
        self.transmission_errors += 1;
    }

    pub fn record_offline(&mut self) {
        self.offline_skips += 1;
    }

    pub fn attempts(&self) -> u64 {
        self.packets_sent + self.transmission_errors
    }

    /// Percentage of attempts that were published, 0 before the first attempt.
    pub fn success_rate(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => self.packets_sent as f64 / n as f64 * 100.0,
        }
    }
}
