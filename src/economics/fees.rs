use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::EngineConfig;
use crate::core::country::CountryCode;
use crate::error::FeeError;

/// Transaction-level fee quotation, snapshotted once at creation and
/// never recomputed on retry (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeeBreakdown {
    pub base_fee: Decimal,
    pub hop_fees: Decimal,
    pub halt_fines: Decimal,
    pub total_fees: Decimal,
    pub final_amount: Decimal,
}

/// Quote fees for `amount` over `route`, counting any node in `route` for
/// which `halted` returns `true` (§4.3).
///
/// `route` must contain at least two distinct nodes and `amount` must be
/// positive.
pub fn quote(
    config: &EngineConfig,
    amount: Decimal,
    route: &[CountryCode],
    halted: impl Fn(&CountryCode) -> bool,
) -> Result<FeeBreakdown, FeeError> {
    if amount <= Decimal::ZERO {
        return Err(FeeError::InvalidAmount(amount.to_string()));
    }
    if route.len() < 2 {
        return Err(FeeError::InvalidRoute(route.len()));
    }

    let hop_count = Decimal::from(route.len() - 1);
    let halt_count = Decimal::from(route.iter().filter(|code| halted(code)).count());

    let base_fee_rate = rate(config.base_fee_rate);
    let hop_fee_rate = rate(config.hop_fee_rate);
    let halt_fine_rate = rate(config.halt_fine_rate);

    let base_fee = amount * base_fee_rate;
    let hop_fees = amount * hop_fee_rate * hop_count;
    let halt_fines = amount * halt_fine_rate * halt_count;
    let total_fees = base_fee + hop_fees + halt_fines;
    let final_amount = amount - total_fees;

    Ok(FeeBreakdown {
        base_fee,
        hop_fees,
        halt_fines,
        total_fees,
        final_amount,
    })
}

/// The per-hop fee charged against a transaction's original `amount`
/// during hop simulation (§4.4 step 5): `amount * hop_fee_rate`.
pub fn per_hop_fee(config: &EngineConfig, amount: Decimal) -> Decimal {
    amount * rate(config.hop_fee_rate)
}

fn rate(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}
