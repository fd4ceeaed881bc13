use crate::errors::{EngineError, EngineResult};
use crate::simulation::SimulationRange;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub static_dir: PathBuf,
    pub sim_tick: Duration,
    pub sim_range: SimulationRange,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let tick_ms = env_var_or("SIM_TICK_MS", "200")
            .parse::<u64>()
            .map_err(|e| EngineError::Config(format!("SIM_TICK_MS: {e}")))?;

        let lower = env_var_or("SIM_LOWER_BOUND", "50")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("SIM_LOWER_BOUND: {e}")))?;

        let upper = env_var_or("SIM_UPPER_BOUND", "150")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("SIM_UPPER_BOUND: {e}")))?;

        let step = env_var_or("SIM_STEP", "1")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("SIM_STEP: {e}")))?;

        Self::build(
            server_port,
            PathBuf::from(env_var_or("STATIC_DIR", "dashboard/dist")),
            tick_ms,
            lower,
            upper,
            step,
        )
    }

    fn build(
        server_port: u16,
        static_dir: PathBuf,
        tick_ms: u64,
        lower: f64,
        upper: f64,
        step: f64,
    ) -> EngineResult<Self> {
        if tick_ms == 0 {
            return Err(EngineError::Config("SIM_TICK_MS must be at least 1".into()));
        }
        let sim_range = SimulationRange::new(lower, upper, step)?;

        Ok(Self {
            server_port,
            static_dir,
            sim_tick: Duration::from_millis(tick_ms),
            sim_range,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            static_dir: PathBuf::from("dashboard/dist"),
            sim_tick: Duration::from_millis(200),
            sim_range: SimulationRange::default(),
        }
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.sim_tick, Duration::from_millis(200));
        assert_eq!(cfg.sim_range.lower, 50.0);
        assert_eq!(cfg.sim_range.upper, 150.0);
        assert_eq!(cfg.sim_range.step, 1.0);
    }

    #[test]
    fn test_zero_tick_rejected() {
        let err = AppConfig::build(3001, PathBuf::from("x"), 0, 50.0, 150.0, 1.0).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = AppConfig::build(3001, PathBuf::from("x"), 200, 150.0, 50.0, 1.0).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
