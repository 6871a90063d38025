use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::country::CountryCode;
use crate::core::currency::CurrencyCode;
use crate::economics::fees::FeeBreakdown;

/// Status of a [`Transaction`] (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Refunded,
}

/// Outcome of a single simulated hop, appended to a [`Transaction`]'s
/// `hop_results` in visitation order (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopResult {
    pub from: CountryCode,
    pub to: CountryCode,
    pub success: bool,
    pub latency_ms: u64,
    pub fx_rate: f64,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub hop_fee: Decimal,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

/// A payment moving along a route, with fee quotation snapshotted at
/// creation and never recomputed on retry (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub target_currency: CurrencyCode,
    pub route: Vec<CountryCode>,
    pub status: TransactionStatus,
    pub fees: FeeBreakdown,
    pub hop_results: Vec<HopResult>,
    pub hops_completed: usize,
    pub failed_at: Option<CountryCode>,
    pub attempt: usize,
    pub external_payment_id: Option<String>,
    pub refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Reset to `Pending` for a retry on a new route: clears hop
    /// results and the hop counter, preserves monetary quotation
    /// (§4.4 Reset-for-retry).
    pub fn reset_for_retry(&mut self, route: Vec<CountryCode>) {
        self.route = route;
        self.status = TransactionStatus::Pending;
        self.hop_results.clear();
        self.hops_completed = 0;
        self.failed_at = None;
        self.processed_at = None;
        self.completed_at = None;
        self.attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            amount: dec!(1000),
            currency: CurrencyCode::new("USD"),
            target_currency: CurrencyCode::new("EUR"),
            route: vec![CountryCode::new("USA"), CountryCode::new("DEU")],
            status: TransactionStatus::Failed,
            fees: FeeBreakdown {
                base_fee: dec!(15),
                hop_fees: dec!(0.2),
                halt_fines: dec!(0),
                total_fees: dec!(15.2),
                final_amount: dec!(984.8),
            },
            hop_results: vec![],
            hops_completed: 1,
            failed_at: Some(CountryCode::new("DEU")),
            attempt: 1,
            external_payment_id: Some("ext-1".into()),
            refund_id: None,
            created_at: Utc::now(),
            processed_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn reset_for_retry_preserves_fees_and_clears_progress() {
        let mut tx = sample();
        let fees_before = tx.fees;
        tx.reset_for_retry(vec![
            CountryCode::new("USA"),
            CountryCode::new("GBR"),
            CountryCode::new("DEU"),
        ]);

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.hop_results.is_empty());
        assert_eq!(tx.hops_completed, 0);
        assert_eq!(tx.failed_at, None);
        assert_eq!(tx.fees, fees_before);
        assert_eq!(tx.attempt, 2);
    }
}
