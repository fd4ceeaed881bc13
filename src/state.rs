use crate::config::AppConfig;
use crate::errors::{DomainViolation, EngineResult, PricingResult};
use crate::scenarios::Scenario;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

// ── Contract Parameters ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            Self::Call => Self::Put,
            Self::Put => Self::Call,
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// The single mutable entity of the session.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ContractParameters {
    pub underlying_price: f64,
    pub strike_price: f64,
    /// Years until expiry
    pub time_to_expiry: f64,
    /// Annualized, continuously compounded
    pub risk_free_rate: f64,
    /// Annualized
    pub volatility: f64,
    pub option_kind: OptionKind,
}

impl Default for ContractParameters {
    fn default() -> Self {
        Self {
            underlying_price: 100.0,
            strike_price: 105.0,
            time_to_expiry: 0.5,
            risk_free_rate: 0.05,
            volatility: 0.2,
            option_kind: OptionKind::Call,
        }
    }
}

impl ContractParameters {
    #[inline]
    pub fn with_underlying(self, underlying_price: f64) -> Self {
        Self { underlying_price, ..self }
    }

    /// Scenarios replace every field at once.
    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            underlying_price: scenario.underlying_price,
            strike_price: scenario.strike_price,
            time_to_expiry: scenario.time_to_expiry,
            risk_free_rate: scenario.risk_free_rate,
            volatility: scenario.volatility,
            option_kind: scenario.option_kind,
        }
    }
}

/// Numeric fields editable one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterField {
    UnderlyingPrice,
    StrikePrice,
    TimeToExpiry,
    RiskFreeRate,
    Volatility,
}

impl std::fmt::Display for ParameterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnderlyingPrice => write!(f, "underlying_price"),
            Self::StrikePrice => write!(f, "strike_price"),
            Self::TimeToExpiry => write!(f, "time_to_expiry"),
            Self::RiskFreeRate => write!(f, "risk_free_rate"),
            Self::Volatility => write!(f, "volatility"),
        }
    }
}

/// One sample of the price-vs-underlying curve.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricePoint {
    pub underlying_price: f64,
    pub option_value: f64,
}

// ── Precomputed model parameters (stack, no alloc) ──

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ModelParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub rate: f64,
    // Precomputed
    pub ln_s_k: f64,
    pub sigma_sqrt_t: f64,
    pub half_sigma_sq: f64,
    /// e^(-rT)
    pub discount: f64,
}

impl ModelParams {
    /// Validates the pricing domain and precomputes the shared terms.
    /// NaN inputs fail the positivity checks.
    pub fn new(contract: &ContractParameters) -> PricingResult<Self> {
        let spot = contract.underlying_price;
        let strike = contract.strike_price;
        let ttl_years = contract.time_to_expiry;
        let rate = contract.risk_free_rate;
        let sigma = contract.volatility;

        if !(ttl_years > 0.0) {
            return Err(DomainViolation::NonPositiveExpiry.into());
        }
        if !(sigma > 0.0) {
            return Err(DomainViolation::NonPositiveVolatility.into());
        }
        if !(spot > 0.0) {
            return Err(DomainViolation::NonPositiveUnderlying.into());
        }
        if !(strike > 0.0) {
            return Err(DomainViolation::NonPositiveStrike.into());
        }

        let ln_s_k = (spot / strike).ln();
        if !ln_s_k.is_finite() {
            return Err(DomainViolation::NonFinite("log moneyness").into());
        }

        let sigma_sqrt_t = sigma * ttl_years.sqrt();
        let half_sigma_sq = 0.5 * sigma * sigma;
        if !sigma_sqrt_t.is_finite() || !half_sigma_sq.is_finite() || sigma_sqrt_t == 0.0 {
            return Err(DomainViolation::NonFinite("volatility term").into());
        }

        let discount = (-rate * ttl_years).exp();
        if !discount.is_finite() {
            return Err(DomainViolation::NonFinite("discount factor").into());
        }

        Ok(Self {
            spot,
            strike,
            ttl_years,
            rate,
            ln_s_k,
            sigma_sqrt_t,
            half_sigma_sq,
            discount,
        })
    }
}

// ── Simulation State Machine ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    Idle,
    Running,
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
        }
    }
}

// ── Messages INTO the engine (bounded channel) ──

pub type Reply<T> = oneshot::Sender<EngineResult<T>>;

#[derive(Debug)]
pub enum EngineEvent {
    SetParameter {
        field: ParameterField,
        value: f64,
        reply: Reply<EngineSnapshot>,
    },
    LoadScenario {
        key: String,
        reply: Reply<EngineSnapshot>,
    },
    ToggleOptionKind {
        reply: Reply<EngineSnapshot>,
    },
    StartSimulation {
        reply: Reply<SimulationState>,
    },
    StopSimulation {
        reply: Reply<SimulationState>,
    },
    /// Emitted by the ticker task; `generation` identifies the run it belongs to.
    SimulationTick { generation: u64 },
    Shutdown,
}

// ── Messages OUT of the engine ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "parameters_changed")]
    ParametersChanged {
        parameters: ContractParameters,
        timestamp: String,
    },

    #[serde(rename = "price_update")]
    PriceUpdate {
        price: f64,
        option_kind: OptionKind,
        underlying_price: f64,
        timestamp: String,
    },

    #[serde(rename = "curve_update")]
    CurveUpdate {
        option_kind: OptionKind,
        points: Vec<PricePoint>,
    },

    #[serde(rename = "pricing_error")]
    PricingError {
        target: String,
        error: String,
        timestamp: String,
    },

    #[serde(rename = "simulation_state")]
    SimulationStateMsg {
        state: SimulationState,
        generation: u64,
    },
}

// ── Engine snapshot for dashboard (sent via watch channel) ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineSnapshot {
    pub parameters: ContractParameters,
    pub price: Option<f64>,
    pub curve: Vec<PricePoint>,
    pub simulation: SimulationState,
    pub last_error: Option<String>,
    pub updated_at: String,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            parameters: ContractParameters::default(),
            price: None,
            curve: Vec::new(),
            simulation: SimulationState::Idle,
            last_error: None,
            updated_at: String::new(),
        }
    }
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub events_processed: AtomicU64,
    pub ticks_applied: AtomicU64,
    pub ticks_discarded: AtomicU64,
    pub pricing_errors: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            ticks_applied: AtomicU64::new(0),
            ticks_discarded: AtomicU64::new(0),
            pricing_errors: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,

    // Engine -> Dashboard: latest snapshot (watch = single producer, multi consumer)
    pub snapshot_tx: watch::Sender<EngineSnapshot>,
    pub snapshot_rx: watch::Receiver<EngineSnapshot>,

    // Engine -> Dashboard: event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    // Routes/Ticker -> Engine: bounded event channel
    pub engine_tx: mpsc::Sender<EngineEvent>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, engine_tx: mpsc::Sender<EngineEvent>) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(2048);
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());

        Arc::new(Self {
            config,
            snapshot_tx,
            snapshot_rx,
            ws_tx,
            engine_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }
}
