/// Why a parameter set cannot be priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomainViolation {
    #[error("time to expiry must be positive")]
    NonPositiveExpiry,

    #[error("volatility must be positive")]
    NonPositiveVolatility,

    #[error("underlying price must be positive")]
    NonPositiveUnderlying,

    #[error("strike price must be positive")]
    NonPositiveStrike,

    /// An intermediate or the result overflowed to a non-finite value.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Pricing failures. Local to a single pricing call; never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("invalid domain: {0}")]
    InvalidDomain(#[from] DomainViolation),
}

pub type PricingResult<T> = Result<T, PricingError>;

/// Domain-specific error types for the repricing engine.
/// The engine keeps running on every variant; only a `Config`
/// failure at startup stops the process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
