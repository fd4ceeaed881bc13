pub mod normal;
pub mod black_scholes;
pub mod curve;

use crate::errors::PricingResult;
use crate::state::{ContractParameters, ModelParams, OptionKind};

/// Closed-form pricers implement this trait.
/// price() must be a pure function: deterministic output from inputs only.
/// Send + Sync required for use across tokio tasks.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Price from already-validated parameters. Fails only on numeric overflow.
    fn price(&self, params: &ModelParams, kind: OptionKind) -> PricingResult<f64>;

    /// Validate a contract and price it.
    #[inline]
    fn price_contract(&self, contract: &ContractParameters) -> PricingResult<f64> {
        let params = ModelParams::new(contract)?;
        self.price(&params, contract.option_kind)
    }
}
