use crate::errors::{EngineError, EngineResult, PricingError};
use crate::models::curve;
use crate::models::PricingModel;
use crate::scenarios::Scenario;
use crate::state::{ContractParameters, ParameterField, PricePoint};
use smallvec::SmallVec;

/// Which derived values a mutation invalidated.
///
/// Every mutator returns one; the caller feeds it back into
/// `PricingSession::recompute`. Nothing is recomputed implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Recompute {
    pub price: bool,
    pub curve: bool,
}

impl Recompute {
    pub const NONE: Self = Self { price: false, curve: false };
    pub const PRICE: Self = Self { price: true, curve: false };
    pub const ALL: Self = Self { price: true, curve: true };

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.price && !self.curve
    }
}

impl std::ops::BitOr for Recompute {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            price: self.price || rhs.price,
            curve: self.curve || rhs.curve,
        }
    }
}

/// Output of a recompute pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Price(f64),
    Curve(Vec<PricePoint>),
    PriceFailed(PricingError),
    CurveFailed(PricingError),
}

/// Owns the contract parameters plus the last successfully computed price
/// and curve. A failed pricing pass leaves the previous values in place.
pub struct PricingSession {
    model: Box<dyn PricingModel>,
    params: ContractParameters,
    price: Option<f64>,
    curve: Vec<PricePoint>,
    last_error: Option<PricingError>,
}

impl PricingSession {
    pub fn new(model: Box<dyn PricingModel>) -> Self {
        Self::with_parameters(model, ContractParameters::default())
    }

    pub fn with_parameters(model: Box<dyn PricingModel>, params: ContractParameters) -> Self {
        Self {
            model,
            params,
            price: None,
            curve: Vec::new(),
            last_error: None,
        }
    }

    #[inline]
    pub fn parameters(&self) -> &ContractParameters {
        &self.params
    }

    /// None only until the first successful pricing.
    #[inline]
    pub fn price(&self) -> Option<f64> {
        self.price
    }

    #[inline]
    pub fn curve(&self) -> &[PricePoint] {
        &self.curve
    }

    #[inline]
    pub fn last_error(&self) -> Option<PricingError> {
        self.last_error
    }

    #[inline]
    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Edit one numeric field. Non-finite values are rejected untouched.
    /// The curve does not depend on the live underlying, so editing it only
    /// invalidates the price.
    pub fn set_parameter(&mut self, field: ParameterField, value: f64) -> EngineResult<Recompute> {
        if !value.is_finite() {
            return Err(EngineError::InvalidParameter(format!("{field} must be finite, got {value}")));
        }

        let p = &mut self.params;
        let slot = match field {
            ParameterField::UnderlyingPrice => &mut p.underlying_price,
            ParameterField::StrikePrice => &mut p.strike_price,
            ParameterField::TimeToExpiry => &mut p.time_to_expiry,
            ParameterField::RiskFreeRate => &mut p.risk_free_rate,
            ParameterField::Volatility => &mut p.volatility,
        };
        if *slot == value {
            return Ok(Recompute::NONE);
        }
        *slot = value;

        Ok(match field {
            ParameterField::UnderlyingPrice => Recompute::PRICE,
            _ => Recompute::ALL,
        })
    }

    /// Simulation path: only the underlying moves.
    pub fn set_underlying(&mut self, underlying: f64) -> Recompute {
        self.params.underlying_price = underlying;
        Recompute::PRICE
    }

    /// Replace all six fields at once.
    pub fn load_scenario(&mut self, scenario: &Scenario) -> Recompute {
        self.params = ContractParameters::from_scenario(scenario);
        Recompute::ALL
    }

    pub fn toggle_option_kind(&mut self) -> Recompute {
        self.params.option_kind = self.params.option_kind.toggled();
        Recompute::ALL
    }

    /// Re-run the pricer and/or sampler as the signal asks.
    pub fn recompute(&mut self, signal: Recompute) -> SmallVec<[SessionUpdate; 2]> {
        let mut updates: SmallVec<[SessionUpdate; 2]> = SmallVec::new();
        if signal.is_empty() {
            return updates;
        }

        let mut failure = None;

        if signal.price {
            match self.model.price_contract(&self.params) {
                Ok(price) => {
                    self.price = Some(price);
                    updates.push(SessionUpdate::Price(price));
                }
                Err(e) => {
                    failure = Some(e);
                    updates.push(SessionUpdate::PriceFailed(e));
                }
            }
        }

        if signal.curve {
            match curve::sample_curve(&*self.model, &self.params) {
                Ok(points) => {
                    self.curve = points.clone();
                    updates.push(SessionUpdate::Curve(points));
                }
                Err(e) => {
                    failure = failure.or(Some(e));
                    updates.push(SessionUpdate::CurveFailed(e));
                }
            }
        }

        self.last_error = failure;
        updates
    }
}
