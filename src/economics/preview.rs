use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Path-level fee economics used by the route preview read path (§4.3).
///
/// Expresses fees as a multiplicative decay over `hop_count` hops rather
/// than the additive per-hop-on-input model [`crate::economics::fees`]
/// uses for transaction quotation — the two are deliberately distinct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEconomics {
    /// `(1 - hop_fee_rate)^hop_count`, the fraction of the amount that
    /// survives the whole path.
    pub final_fraction: f64,
    /// `1 - final_fraction`.
    pub total_fee_fraction: f64,
    /// `total_fee_fraction * 100`.
    pub total_fee_percent: f64,
}

pub fn path_economics(hop_fee_rate: f64, hop_count: usize) -> PathEconomics {
    let final_fraction = (1.0 - hop_fee_rate).powi(hop_count as i32);
    let total_fee_fraction = 1.0 - final_fraction;
    PathEconomics {
        final_fraction,
        total_fee_fraction,
        total_fee_percent: total_fee_fraction * 100.0,
    }
}

/// The fee an optional `amount` would incur over a previewed path, per
/// the decay model above: `amount * total_fee_fraction` (§6 Route query
/// `calculated_fee?`). Returns `None` if `total_fee_fraction` can't be
/// represented exactly as a `Decimal`, which never happens for fractions
/// produced by [`path_economics`].
pub fn calculated_fee(amount: Decimal, total_fee_fraction: f64) -> Option<Decimal> {
    Decimal::from_f64(total_fee_fraction).map(|fraction| amount * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hops_keeps_everything() {
        let e = path_economics(0.0002, 0);
        assert_eq!(e.final_fraction, 1.0);
        assert_eq!(e.total_fee_fraction, 0.0);
    }

    #[test]
    fn two_hops_matches_spec_decay() {
        let e = path_economics(0.0002, 2);
        let expected_final = 0.9998_f64 * 0.9998_f64;
        assert!((e.final_fraction - expected_final).abs() < 1e-12);
        assert!(e.total_fee_fraction > 0.0);
    }

    #[test]
    fn calculated_fee_scales_with_amount() {
        use rust_decimal_macros::dec;
        let e = path_economics(0.0002, 2);
        let fee = calculated_fee(dec!(1000), e.total_fee_fraction).unwrap();
        let expected = Decimal::from_f64(e.total_fee_fraction).unwrap() * dec!(1000);
        assert_eq!(fee, expected);
        assert!(fee > Decimal::ZERO);
    }

    #[test]
    fn final_fraction_is_in_unit_interval() {
        for hops in 0..10 {
            let e = path_economics(0.0002, hops);
            assert!(e.final_fraction > 0.0 && e.final_fraction <= 1.0);
        }
    }
}
