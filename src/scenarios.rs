use crate::errors::{EngineError, EngineResult};
use crate::state::OptionKind;

/// A named, read-only parameter preset.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Scenario {
    pub id: usize,
    pub slug: &'static str,
    pub name: &'static str,
    pub underlying_price: f64,
    pub strike_price: f64,
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub option_kind: OptionKind,
}

pub const SCENARIOS: [Scenario; 3] = [
    Scenario {
        id: 0,
        slug: "call-purchase",
        name: "Call Purchase",
        underlying_price: 100.0,
        strike_price: 105.0,
        time_to_expiry: 0.5,
        risk_free_rate: 0.05,
        volatility: 0.2,
        option_kind: OptionKind::Call,
    },
    Scenario {
        id: 1,
        slug: "put-protection",
        name: "Put Protection",
        underlying_price: 1500.0,
        strike_price: 1400.0,
        time_to_expiry: 1.0,
        risk_free_rate: 0.03,
        volatility: 0.25,
        option_kind: OptionKind::Put,
    },
    Scenario {
        id: 2,
        slug: "volatility-impact",
        name: "Volatility Impact",
        underlying_price: 200.0,
        strike_price: 200.0,
        time_to_expiry: 0.5,
        risk_free_rate: 0.05,
        volatility: 0.5,
        option_kind: OptionKind::Call,
    },
];

#[inline]
pub fn all() -> &'static [Scenario] {
    &SCENARIOS
}

/// Look a preset up by numeric id or slug.
pub fn find(key: &str) -> EngineResult<&'static Scenario> {
    let key = key.trim();
    let found = match key.parse::<usize>() {
        Ok(id) => SCENARIOS.get(id),
        Err(_) => SCENARIOS.iter().find(|s| s.slug.eq_ignore_ascii_case(key)),
    };
    found.ok_or_else(|| EngineError::UnknownScenario(key.to_string()))
}
