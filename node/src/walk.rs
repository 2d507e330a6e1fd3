use rand::Rng;

/// A value that drifts by a uniform random step each tick and stays inside fixed bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedWalk {
    value: f64,
    min_step: f64,
    max_step: f64,
    lower: f64,
    upper: f64,
}

impl BoundedWalk {
    /// The initial value is clamped into `[lower, upper]`.
    pub fn new(value: f64, step: (f64, f64), bounds: (f64, f64)) -> Self {
        let (min_step, max_step) = step;
        let (lower, upper) = bounds;
        debug_assert!(min_step <= max_step, "step range is inverted");
        debug_assert!(lower <= upper, "bounds are inverted");
        Self {
            value: value.clamp(lower, upper),
            min_step,
            max_step,
            lower,
            upper,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Applies one random step and returns the clamped result.
    pub fn step(&mut self, rng: &mut impl Rng) -> f64 {
        let delta = if self.min_step == self.max_step {
            self.min_step
        } else {
            rng.gen_range(self.min_step..=self.max_step)
        };
        self.value = (self.value + delta).clamp(self.lower, self.upper);
        self.value
    }
}
