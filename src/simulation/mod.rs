pub mod driver;

pub use driver::SimulationDriver;

use crate::errors::{EngineError, EngineResult};

/// Cyclic range the simulated underlying walks through.
/// Each tick adds `step`; a value that would pass `upper` wraps to `lower`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationRange {
    pub lower: f64,
    pub upper: f64,
    pub step: f64,
}

impl Default for SimulationRange {
    fn default() -> Self {
        Self {
            lower: 50.0,
            upper: 150.0,
            step: 1.0,
        }
    }
}

impl SimulationRange {
    pub fn new(lower: f64, upper: f64, step: f64) -> EngineResult<Self> {
        if !lower.is_finite() || !upper.is_finite() || !step.is_finite() {
            return Err(EngineError::Config("simulation bounds must be finite".into()));
        }
        if lower <= 0.0 {
            return Err(EngineError::Config(format!("simulation lower bound {lower} must be positive")));
        }
        if lower >= upper {
            return Err(EngineError::Config(format!(
                "simulation lower bound {lower} must be below upper bound {upper}"
            )));
        }
        if step <= 0.0 {
            return Err(EngineError::Config(format!("simulation step {step} must be positive")));
        }
        Ok(Self { lower, upper, step })
    }

    /// Next underlying price of the sawtooth. Wraps, never clamps.
    #[inline]
    pub fn advance(&self, underlying: f64) -> f64 {
        let next = underlying + self.step;
        if next > self.upper {
            self.lower
        } else {
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_after_upper_bound() {
        let range = SimulationRange::default();
        let s = range.advance(149.0);
        assert_eq!(s, 150.0);
        let s = range.advance(s);
        assert_eq!(s, 50.0);
        assert_eq!(range.advance(s), 51.0);
    }

    #[test]
    fn test_full_cycle_is_periodic() {
        let range = SimulationRange::default();
        let mut s = 50.0;
        for _ in 0..101 {
            s = range.advance(s);
            assert!((50.0..=150.0).contains(&s));
        }
        assert_eq!(s, 50.0);
    }

    #[test]
    fn test_out_of_range_start() {
        let range = SimulationRange::default();
        // A scenario can leave the underlying far above the range
        assert_eq!(range.advance(1500.0), 50.0);
        // Below the range it climbs back in
        assert_eq!(range.advance(10.0), 11.0);
    }

    #[test]
    fn test_fractional_underlying_wraps_when_step_overshoots() {
        let range = SimulationRange::default();
        assert_eq!(range.advance(149.5), 50.0);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(SimulationRange::new(150.0, 50.0, 1.0).is_err());
        assert!(SimulationRange::new(50.0, 150.0, 0.0).is_err());
        assert!(SimulationRange::new(0.0, 150.0, 1.0).is_err());
        assert!(SimulationRange::new(50.0, f64::INFINITY, 1.0).is_err());
    }
}
