//! Mocked protocol calls.
//!
//! Nothing here talks to a chain. Each call sleeps for a configured delay to
//! stand in for confirmation time, checks its inputs the way the contract
//! wrapper would, and answers with a [`ServiceResponse`] carrying a random
//! transaction hash. State changes are the caller's job once a call succeeds.

use crate::config::ServiceConfig;
use crate::margin::OpenRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub message: String,
    /// 0x-prefixed 32 byte hash. present only on success.
    pub tx_hash: Option<String>,
}

impl ServiceResponse {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message,
            tx_hash: Some(random_tx_hash()),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            tx_hash: None,
        }
    }
}

pub fn random_tx_hash() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("0x{}", hex::encode(bytes))
}

/// The protocol surface the desk drives. Implementations settle nothing
/// locally; a success answer is the caller's cue to update its own books.
pub trait HydroService: Send + Sync {
    fn supply_asset(&self, asset: &str, amount: Decimal) -> impl Future<Output = ServiceResponse> + Send;
    fn withdraw_asset(&self, asset: &str, amount: Decimal) -> impl Future<Output = ServiceResponse> + Send;
    fn borrow_asset(&self, asset: &str, amount: Decimal) -> impl Future<Output = ServiceResponse> + Send;
    fn repay_asset(&self, asset: &str, amount: Decimal) -> impl Future<Output = ServiceResponse> + Send;
    fn open_margin_position(&self, request: &OpenRequest) -> impl Future<Output = ServiceResponse> + Send;
    fn add_collateral(
        &self,
        position_id: &str,
        amount: Decimal,
        asset: &str,
    ) -> impl Future<Output = ServiceResponse> + Send;
    /// `portion` is the share to close, in (0, 1].
    fn close_margin_position(&self, position_id: &str, portion: Decimal) -> impl Future<Output = ServiceResponse> + Send;
}

#[derive(Debug, Default)]
pub struct MockHydroService {
    config: ServiceConfig,
    failing: AtomicBool,
    calls: AtomicU64,
}

impl MockHydroService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            failing: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// While set, every call that passes validation answers `success: false`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn settle(&self, delay_ms: u64, op: &str) -> Result<(), ServiceResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(op, delay_ms, "mock service call");
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            warn!(op, "mock service failure injected");
            return Err(ServiceResponse::rejected("Transaction failed. Please try again."));
        }
        Ok(())
    }

    async fn lending_call(&self, op: &str, asset: &str, amount: Decimal, invalid: &str, done: String) -> ServiceResponse {
        if let Err(failed) = self.settle(self.config.lending_delay_ms, op).await {
            return failed;
        }
        if asset.is_empty() || amount <= Decimal::ZERO {
            warn!(op, asset, %amount, "mock service rejected input");
            return ServiceResponse::rejected(invalid);
        }
        ServiceResponse::ok(done)
    }
}

impl HydroService for MockHydroService {
    async fn supply_asset(&self, asset: &str, amount: Decimal) -> ServiceResponse {
        self.lending_call(
            "supply",
            asset,
            amount,
            "Invalid asset or amount.",
            format!("Successfully supplied {} {}.", amount, asset),
        )
        .await
    }

    async fn withdraw_asset(&self, asset: &str, amount: Decimal) -> ServiceResponse {
        self.lending_call(
            "withdraw",
            asset,
            amount,
            "Invalid asset or amount.",
            format!("Successfully withdrew {} {}.", amount, asset),
        )
        .await
    }

    async fn borrow_asset(&self, asset: &str, amount: Decimal) -> ServiceResponse {
        self.lending_call(
            "borrow",
            asset,
            amount,
            "Invalid asset or amount for borrow.",
            format!("Successfully borrowed {} {}.", amount, asset),
        )
        .await
    }

    async fn repay_asset(&self, asset: &str, amount: Decimal) -> ServiceResponse {
        self.lending_call(
            "repay",
            asset,
            amount,
            "Invalid asset or amount for repay.",
            format!("Successfully repaid {} {}.", amount, asset),
        )
        .await
    }

    async fn open_margin_position(&self, request: &OpenRequest) -> ServiceResponse {
        if let Err(failed) = self.settle(self.config.margin_delay_ms, "open_margin").await {
            return failed;
        }
        let valid = !request.pair_id.is_empty()
            && !request.collateral_asset.is_empty()
            && request.size > Decimal::ZERO
            && request.collateral_amount > Decimal::ZERO
            && request.leverage >= Decimal::ONE;
        if !valid {
            warn!(pair = %request.pair_id, "mock service rejected margin open");
            return ServiceResponse::rejected("Invalid parameters for opening margin position.");
        }
        ServiceResponse::ok(format!(
            "Successfully opened {} margin position for {} {}.",
            request.direction, request.size, request.base_asset
        ))
    }

    async fn add_collateral(&self, position_id: &str, amount: Decimal, asset: &str) -> ServiceResponse {
        if let Err(failed) = self.settle(self.config.collateral_delay_ms, "add_collateral").await {
            return failed;
        }
        if position_id.is_empty() || asset.is_empty() || amount <= Decimal::ZERO {
            return ServiceResponse::rejected("Invalid parameters.");
        }
        ServiceResponse::ok(format!(
            "Successfully added {} {} to position {}.",
            amount, asset, position_id
        ))
    }

    async fn close_margin_position(&self, position_id: &str, portion: Decimal) -> ServiceResponse {
        if let Err(failed) = self.settle(self.config.margin_delay_ms, "close_margin").await {
            return failed;
        }
        if position_id.is_empty() || portion <= Decimal::ZERO || portion > Decimal::ONE {
            return ServiceResponse::rejected("Invalid parameters.");
        }
        let pct = (portion * Decimal::ONE_HUNDRED).normalize();
        ServiceResponse::ok(format!("Successfully closed {}% of position {}.", pct, position_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use rust_decimal_macros::dec;

    fn open_request() -> OpenRequest {
        OpenRequest {
            pair_id: "WETH-DAI".to_string(),
            base_asset: "WETH".to_string(),
            quote_asset: "DAI".to_string(),
            direction: Direction::Long,
            size: dec!(1),
            collateral_asset: "DAI".to_string(),
            collateral_amount: dec!(1000),
            leverage: dec!(2),
        }
    }

    #[test]
    fn tx_hash_shape() {
        let hash = random_tx_hash();
        assert_eq!(hash.len(), 66);
        assert!(hash.starts_with("0x"));
        assert!(hex::decode(&hash[2..]).is_ok());
        assert_ne!(hash, random_tx_hash());
    }

    #[tokio::test(start_paused = true)]
    async fn supply_waits_configured_delay() {
        let service = MockHydroService::new(ServiceConfig::default());
        let started = tokio::time::Instant::now();

        let response = service.supply_asset("DAI", dec!(100)).await;

        assert!(response.success);
        assert_eq!(response.message, "Successfully supplied 100 DAI.");
        assert!(response.tx_hash.is_some());
        assert!(started.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test]
    async fn rejects_bad_lending_input() {
        let service = MockHydroService::new(ServiceConfig::instant());
        let response = service.borrow_asset("", dec!(1)).await;
        assert!(!response.success);
        assert_eq!(response.message, "Invalid asset or amount for borrow.");
        assert!(response.tx_hash.is_none());

        let response = service.withdraw_asset("DAI", dec!(0)).await;
        assert_eq!(response.message, "Invalid asset or amount.");
    }

    #[tokio::test]
    async fn open_accepts_one_x() {
        let service = MockHydroService::new(ServiceConfig::instant());
        let mut request = open_request();
        request.leverage = dec!(1);
        let response = service.open_margin_position(&request).await;
        assert!(response.success);
        assert_eq!(response.message, "Successfully opened LONG margin position for 1 WETH.");

        request.leverage = dec!(0.5);
        assert!(!service.open_margin_position(&request).await.success);
    }

    #[tokio::test]
    async fn close_portion_bounds() {
        let service = MockHydroService::new(ServiceConfig::instant());
        assert!(!service.close_margin_position("pos_1", dec!(0)).await.success);
        assert!(!service.close_margin_position("pos_1", dec!(1.5)).await.success);

        let response = service.close_margin_position("pos_1", dec!(0.5)).await;
        assert_eq!(response.message, "Successfully closed 50% of position pos_1.");
    }

    #[tokio::test]
    async fn injected_failure() {
        let service = MockHydroService::new(ServiceConfig::instant());
        service.set_failing(true);
        let response = service.add_collateral("pos_1", dec!(10), "DAI").await;
        assert!(!response.success);
        assert!(response.tx_hash.is_none());

        service.set_failing(false);
        assert!(service.add_collateral("pos_1", dec!(10), "DAI").await.success);
        assert_eq!(service.call_count(), 2);
    }
}
