use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::core::country::CountryCode;
use crate::core::currency::CurrencyCode;
use crate::core::fx::FxRateMap;
use crate::economics::fees;
use crate::error::{CoreError, PaymentError};
use crate::payment::hub::quote_alternates;
use crate::payment::transaction::{HopResult, Transaction, TransactionStatus};

/// Owns every in-flight and completed [`Transaction`], each behind its
/// own lazily-acquired lock (§4.4, §5 "each transaction has its own
/// fine-grained lock").
pub struct PaymentStateMachine {
    config: EngineConfig,
    transactions: RwLock<HashMap<Uuid, Arc<tokio::sync::Mutex<Transaction>>>>,
}

impl PaymentStateMachine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            transactions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a transaction in `Pending`, snapshotting fees per §4.3.
    pub fn create(
        &self,
        user_id: impl Into<String>,
        amount: Decimal,
        currency: CurrencyCode,
        target_currency: CurrencyCode,
        route: Vec<CountryCode>,
        halted: impl Fn(&CountryCode) -> bool,
    ) -> Result<Transaction, PaymentError> {
        if currency.as_str().is_empty() || target_currency.as_str().is_empty() {
            return Err(PaymentError::InvalidRoute(
                "currency codes must be non-empty".into(),
            ));
        }

        let fee_breakdown = fees::quote(&self.config, amount, &route, halted).map_err(|e| match e {
            crate::error::FeeError::InvalidAmount(a) => PaymentError::InvalidAmount(a),
            crate::error::FeeError::InvalidRoute(n) => {
                PaymentError::InvalidRoute(format!("route must contain at least two distinct nodes, got {n}"))
            }
        })?;

        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            amount,
            currency,
            target_currency,
            route,
            status: TransactionStatus::Pending,
            fees: fee_breakdown,
            hop_results: Vec::new(),
            hops_completed: 0,
            failed_at: None,
            attempt: 1,
            external_payment_id: None,
            refund_id: None,
            created_at: Utc::now(),
            processed_at: None,
            completed_at: None,
        };

        self.transactions
            .write()
            .insert(tx.id, Arc::new(tokio::sync::Mutex::new(tx.clone())));
        Ok(tx)
    }

    pub async fn get(&self, id: Uuid) -> Option<Transaction> {
        let arc = self.transactions.read().get(&id).cloned()?;
        Some(arc.lock().await.clone())
    }

    fn lookup(&self, id: Uuid) -> Result<Arc<tokio::sync::Mutex<Transaction>>, PaymentError> {
        self.transactions
            .read()
            .get(&id)
            .cloned()
            .ok_or(PaymentError::NotFound(id))
    }

    /// Run the per-hop attempt loop over the transaction's current route
    /// (§4.4 Process). Requires the transaction to be `Pending`; a hop
    /// failure terminates the attempt with status `Failed`, it does not
    /// surface as an `Err`. `rng` is injectable so tests can force
    /// specific hops to fail (§9 "Randomness in processing").
    pub async fn process(
        &self,
        id: Uuid,
        fx_rates: &FxRateMap,
        failure_probability: f64,
        rng: &mut impl rand::Rng,
        mut credibility: impl FnMut(&CountryCode, bool),
        cancel: &CancellationToken,
    ) -> Result<Transaction, PaymentError> {
        let arc = self.lookup(id)?;
        let mut tx = arc.lock().await;

        if tx.status != TransactionStatus::Pending {
            return Err(PaymentError::InvalidState(id, tx.status));
        }
        tx.status = TransactionStatus::Processing;
        tx.processed_at = Some(Utc::now());
        log::info!("transaction {id} Pending -> Processing");

        let mut current = tx.fees.final_amount;
        let route = tx.route.clone();

        for pair in route.windows(2) {
            if cancel.is_cancelled() {
                return Err(PaymentError::Cancelled);
            }

            let from = pair[0].clone();
            let to = pair[1].clone();

            let latency_ms = rng.gen_range(50..200u64);
            tokio::time::sleep(std::time::Duration::from_millis(latency_ms)).await;

            let fx_rate = fx_rates.rate_for(&to);
            let failed = rng.gen_bool(failure_probability.clamp(0.0, 1.0));
            let hop_fee = fees::per_hop_fee(&self.config, tx.amount);
            let amount_in = current;
            let amount_out = if failed {
                Decimal::ZERO
            } else {
                current - hop_fee
            };

            tx.hop_results.push(HopResult {
                from,
                to: to.clone(),
                success: !failed,
                latency_ms,
                fx_rate,
                amount_in,
                amount_out,
                hop_fee,
                timestamp: Utc::now(),
                error: if failed {
                    Some(format!("hop to {to} failed"))
                } else {
                    None
                },
            });
            tx.hops_completed += 1;
            credibility(&to, !failed);

            if failed {
                tx.failed_at = Some(to.clone());
                tx.status = TransactionStatus::Failed;
                tx.completed_at = Some(Utc::now());
                log::info!("transaction {id} Processing -> Failed at {to}");
                return Ok(tx.clone());
            }
            current = amount_out;
        }

        tx.status = TransactionStatus::Success;
        tx.completed_at = Some(Utc::now());
        tx.fees.final_amount = current;
        log::info!("transaction {id} Processing -> Success");
        Ok(tx.clone())
    }

    /// Reset a transaction to `Pending` on a new route, clearing hop
    /// progress while preserving the fee snapshot (§4.4 Reset-for-retry).
    pub async fn reset_for_retry(
        &self,
        id: Uuid,
        route: Vec<CountryCode>,
    ) -> Result<(), PaymentError> {
        let arc = self.lookup(id)?;
        arc.lock().await.reset_for_retry(route);
        log::info!("transaction {id} reset for retry -> Pending");
        Ok(())
    }

    /// The anti-fragile retry loop (§4.4): attempt the original route,
    /// then up to two hub-inserted alternatives, refunding through
    /// `refund` on exhaustion.
    ///
    /// Returns [`CoreError`] rather than [`PaymentError`] directly — this
    /// is the cross-component boundary DESIGN.md calls out: the caller
    /// that drives this loop also consults the router (C2) and the
    /// circuit breaker (C6), so the error type it propagates needs to
    /// compose all three taxonomies, not just the state machine's own.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_with_retry(
        &self,
        id: Uuid,
        fx_rates: &FxRateMap,
        failure_probability: f64,
        rng: &mut impl rand::Rng,
        mut credibility: impl FnMut(&CountryCode, bool),
        mut refund: impl FnMut(&str) -> String,
        cancel: &CancellationToken,
    ) -> Result<Transaction, CoreError> {
        let original_route = self.lookup(id)?.lock().await.route.clone();
        let alternates = quote_alternates(&original_route, &self.config.hub_order);
        let routes_to_try: Vec<Vec<CountryCode>> = std::iter::once(original_route)
            .chain(alternates)
            .take(self.config.max_attempts)
            .collect();

        let mut last = None;
        for (i, route) in routes_to_try.iter().enumerate() {
            if i > 0 {
                self.reset_for_retry(id, route.clone()).await?;
            }
            let tx = self
                .process(id, fx_rates, failure_probability, rng, &mut credibility, cancel)
                .await?;
            let failed = tx.status == TransactionStatus::Failed;
            last = Some(tx);
            if !failed {
                return Ok(last.unwrap());
            }
        }

        let mut tx = last.expect("at least one attempt always runs");
        let external_id = tx.external_payment_id.clone().unwrap_or_default();
        let refund_id = refund(&external_id);
        tx.refund_id = Some(refund_id.clone());
        tx.status = TransactionStatus::Refunded;
        tx.completed_at = Some(Utc::now());
        log::info!("transaction {id} exhausted retries -> Refunded ({refund_id})");

        let arc = self.lookup(id)?;
        let mut stored = arc.lock().await;
        stored.refund_id = Some(refund_id);
        stored.status = TransactionStatus::Refunded;
        stored.completed_at = tx.completed_at;
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rust_decimal_macros::dec;

    fn route(codes: &[&str]) -> Vec<CountryCode> {
        codes.iter().map(|c| CountryCode::new(*c)).collect()
    }

    #[test]
    fn create_rejects_invalid_amount() {
        let sm = PaymentStateMachine::new(EngineConfig::default());
        let err = sm
            .create(
                "user-1",
                dec!(0),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "DEU"]),
                |_| false,
            )
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));
    }

    #[test]
    fn create_snapshots_s3_fees() {
        let sm = PaymentStateMachine::new(EngineConfig::default());
        let tx = sm
            .create(
                "user-1",
                dec!(1000),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "GBR", "DEU"]),
                |_| false,
            )
            .unwrap();
        assert_eq!(tx.fees.total_fees, dec!(15.40));
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn process_rejects_non_pending() {
        let sm = PaymentStateMachine::new(EngineConfig::default());
        let tx = sm
            .create(
                "user-1",
                dec!(1000),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "GBR"]),
                |_| false,
            )
            .unwrap();
        let fx = FxRateMap::new();
        let cancel = CancellationToken::new();
        let mut rng = StepRng::new(0, 1);

        // force it out of Pending
        sm.reset_for_retry(tx.id, tx.route.clone()).await.unwrap();
        {
            let arc = sm.lookup(tx.id).unwrap();
            arc.lock().await.status = TransactionStatus::Processing;
        }

        let err = sm
            .process(tx.id, &fx, 0.0, &mut rng, |_, _| {}, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidState(_, TransactionStatus::Processing)));
    }

    #[tokio::test]
    async fn process_succeeds_with_zero_failure_probability() {
        let sm = PaymentStateMachine::new(EngineConfig::default());
        let tx = sm
            .create(
                "user-1",
                dec!(1000),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "GBR", "DEU"]),
                |_| false,
            )
            .unwrap();
        let fx = FxRateMap::new();
        let cancel = CancellationToken::new();
        let mut rng = StepRng::new(0, 1);

        let result = sm
            .process(tx.id, &fx, 0.0, &mut rng, |_, _| {}, &cancel)
            .await
            .unwrap();
        assert_eq!(result.status, TransactionStatus::Success);
        assert_eq!(result.hops_completed, 2);
        assert_eq!(result.hop_results.len(), 2);
    }

    #[tokio::test]
    async fn process_fails_with_certain_failure_probability() {
        let sm = PaymentStateMachine::new(EngineConfig::default());
        let tx = sm
            .create(
                "user-1",
                dec!(1000),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "GBR", "DEU"]),
                |_| false,
            )
            .unwrap();
        let fx = FxRateMap::new();
        let cancel = CancellationToken::new();
        let mut rng = StepRng::new(0, 1);

        let result = sm
            .process(tx.id, &fx, 1.0, &mut rng, |_, _| {}, &cancel)
            .await
            .unwrap();
        assert_eq!(result.status, TransactionStatus::Failed);
        assert_eq!(result.failed_at, Some(CountryCode::new("GBR")));
        assert_eq!(result.hops_completed, 1);
    }

    #[tokio::test]
    async fn s5_anti_fragile_retry_recovers_on_alternate() {
        let sm = PaymentStateMachine::new(EngineConfig::default());
        let tx = sm
            .create(
                "user-1",
                dec!(1000),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "GBR", "DEU"]),
                |_| false,
            )
            .unwrap();
        let fx = FxRateMap::new();
        let cancel = CancellationToken::new();

        let mut calls = 0usize;
        let mut rng = StepRng::new(0, 1);
        let result = sm
            .execute_with_retry(
                tx.id,
                &fx,
                0.0,
                &mut rng,
                |_, _| {},
                |_ext| {
                    calls += 1;
                    "refund-1".to_string()
                },
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(result.status, TransactionStatus::Success);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn exhausted_retries_trigger_refund() {
        let mut config = EngineConfig::default();
        config.hub_order = vec![CountryCode::new("HKG"), CountryCode::new("SGP")];
        let sm = PaymentStateMachine::new(config);
        let tx = sm
            .create(
                "user-1",
                dec!(1000),
                CurrencyCode::new("USD"),
                CurrencyCode::new("EUR"),
                route(&["USA", "DEU"]),
                |_| false,
            )
            .unwrap();
        {
            let arc = sm.lookup(tx.id).unwrap();
            arc.lock().await.external_payment_id = Some("ext-42".to_string());
        }
        let fx = FxRateMap::new();
        let cancel = CancellationToken::new();
        let mut rng = StepRng::new(0, 1);

        let mut refunded_with = None;
        let result = sm
            .execute_with_retry(
                tx.id,
                &fx,
                1.0,
                &mut rng,
                |_, _| {},
                |ext| {
                    refunded_with = Some(ext.to_string());
                    "refund-9".to_string()
                },
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(result.status, TransactionStatus::Refunded);
        assert_eq!(result.refund_id, Some("refund-9".to_string()));
        assert_eq!(refunded_with, Some("ext-42".to_string()));
    }
}
