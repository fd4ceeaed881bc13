use crate::errors::{DomainViolation, PricingResult};
use crate::models::normal::norm_cdf;
use crate::models::PricingModel;
use crate::state::{ModelParams, OptionKind};

/// Black-Scholes European option pricing, no dividends.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// call = S*Phi(d1) - K*e^(-rT)*Phi(d2)
/// put  = K*e^(-rT)*Phi(-d2) - S*Phi(-d1)
///
/// All computation uses precomputed ModelParams. No allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholesEuropean;

impl BlackScholesEuropean {
    pub fn new() -> Self {
        Self
    }

    /// Both legs at once; parity checks need the pair.
    #[inline]
    pub fn call_put(&self, params: &ModelParams) -> PricingResult<(f64, f64)> {
        let d1 = (params.ln_s_k + (params.rate + params.half_sigma_sq) * params.ttl_years)
            / params.sigma_sqrt_t;
        let d2 = d1 - params.sigma_sqrt_t;
        if !d1.is_finite() || !d2.is_finite() {
            return Err(DomainViolation::NonFinite("d1/d2").into());
        }

        let pv_strike = params.strike * params.discount;
        let call = params.spot * norm_cdf(d1) - pv_strike * norm_cdf(d2);
        let put = pv_strike * norm_cdf(-d2) - params.spot * norm_cdf(-d1);

        if !call.is_finite() || !put.is_finite() {
            return Err(DomainViolation::NonFinite("option value").into());
        }
        Ok((call, put))
    }
}

impl PricingModel for BlackScholesEuropean {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    #[inline]
    fn price(&self, params: &ModelParams, kind: OptionKind) -> PricingResult<f64> {
        let (call, put) = self.call_put(params)?;
        Ok(match kind {
            OptionKind::Call => call,
            OptionKind::Put => put,
        })
    }
}
