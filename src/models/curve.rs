use crate::errors::PricingResult;
use crate::models::PricingModel;
use crate::state::{ContractParameters, PricePoint};

/// Number of samples on the price-vs-underlying curve.
pub const CURVE_POINTS: usize = 50;
/// Underlying price of the first sample.
pub const CURVE_START: f64 = 50.0;
/// Spacing between samples.
pub const CURVE_STEP: f64 = 2.0;

/// Restartable sequence of curve samples: underlying prices 50, 52, ..., 148
/// priced with every other field of `contract`. The live underlying price
/// is ignored. Clone the iterator to walk it again.
#[derive(Clone)]
pub struct CurveSamples<'a> {
    model: &'a dyn PricingModel,
    contract: ContractParameters,
    next: usize,
}

impl Iterator for CurveSamples<'_> {
    type Item = PricingResult<PricePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= CURVE_POINTS {
            return None;
        }
        let underlying_price = CURVE_START + self.next as f64 * CURVE_STEP;
        self.next += 1;

        let point = self
            .model
            .price_contract(&self.contract.with_underlying(underlying_price))
            .map(|value| PricePoint {
                underlying_price,
                option_value: round_cents(value),
            });
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = CURVE_POINTS - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for CurveSamples<'_> {}

pub fn samples<'a>(model: &'a dyn PricingModel, contract: &ContractParameters) -> CurveSamples<'a> {
    CurveSamples {
        model,
        contract: *contract,
        next: 0,
    }
}

/// Sample the full curve. The first failing point fails the whole curve.
pub fn sample_curve(model: &dyn PricingModel, contract: &ContractParameters) -> PricingResult<Vec<PricePoint>> {
    samples(model, contract).collect()
}

#[inline]
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
