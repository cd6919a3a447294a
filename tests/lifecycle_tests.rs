//! End to end desk scenarios on a paused tokio clock.
//!
//! Simulated service latency and ticker intervals advance instantly, so these
//! run with the real delays from the default config.

use hydro_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::time::Instant;

fn default_desk() -> Desk {
    let mut config = HydroConfig::default();
    config.ticker.seed = Some(11);
    Desk::new(config)
}

#[tokio::test(start_paused = true)]
async fn lending_lifecycle_with_real_latency() {
    let mut desk = default_desk();
    let started = Instant::now();

    assert!(desk.supply("WETH", "1").await.success);
    assert!(desk.borrow("USDC", "800").await.success);
    assert_eq!(desk.summary().health_factor, HealthFactor::Ratio(dec!(2)));
    assert_eq!(desk.summary().available_to_borrow_usd.value(), dec!(800));

    assert!(desk.repay("USDC", "800").await.success);
    assert!(desk.withdraw("WETH", "1").await.success);

    // four lending calls at 700ms each
    assert!(started.elapsed() >= Duration::from_millis(2800));
    assert_eq!(desk.summary().health_factor, HealthFactor::NotApplicable);
    assert_eq!(desk.funding().wallet_balance("WETH"), dec!(5));
    assert_eq!(desk.funding().wallet_balance("USDC"), dec!(2500));

    let kinds: Vec<_> = desk.transactions().iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Withdraw,
            TransactionKind::Repay,
            TransactionKind::Borrow,
            TransactionKind::Supply,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn margin_lifecycle_with_ticker() {
    let mut desk = default_desk();
    let request = desk.order_for_selected(Direction::Short, dec!(0.5), "DAI", dec!(500), dec!(2));
    let outcome = desk.open_margin(request).await;
    assert!(outcome.success, "{}", outcome.message);
    let id = outcome.position_id.unwrap();
    let opened = desk.position(&id).await.unwrap();

    let ticker = desk.start_ticker();
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(ticker.ticks(), 2);

    let ticked = desk.position(&id).await.unwrap();
    // ±1% of entry, rounded to cents for a DAI quote
    assert!((ticked.current_price.value() - dec!(2000)).abs() <= dec!(20));
    assert_eq!(ticked.current_price.value(), ticked.current_price.value().round_dp(2));
    assert_eq!(ticked.pnl, calculate_pnl(Direction::Short, dec!(0.5), ticked.entry_price, ticked.current_price));
    assert_eq!(ticked.liquidation_price, opened.liquidation_price);

    assert!(desk.add_collateral(&id, "DAI", "500").await.success);
    let topped = desk.position(&id).await.unwrap();
    assert_eq!(topped.leverage, Leverage::one());
    assert!(topped.liquidation_price > opened.liquidation_price);

    let wallet_before = desk.funding().wallet_balance("DAI");
    let pnl = desk.position(&id).await.unwrap().pnl;
    assert!(desk.close_margin(&id).await.success);
    assert_eq!(desk.funding().wallet_balance("DAI"), wallet_before + dec!(1000) + pnl);

    ticker.shutdown().await;
    assert_eq!(desk.transactions().of_kind(TransactionKind::MarginClose).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_ticker_stops_repricing() {
    let mut desk = default_desk();
    let request = desk.order_for_selected(Direction::Long, dec!(1), "DAI", dec!(1000), dec!(2));
    let id = desk.open_margin(request).await.position_id.unwrap();

    let ticker = desk.start_ticker();
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(ticker.ticks(), 1);
    drop(ticker);

    // let the cancelled task observe the token
    tokio::task::yield_now().await;
    let frozen = desk.position(&id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    let later = desk.position(&id).await.unwrap();
    assert_eq!(later.current_price, frozen.current_price);
    assert_eq!(later.updated_at, frozen.updated_at);
}

#[tokio::test(start_paused = true)]
async fn failed_service_call_changes_nothing() {
    let mut desk = default_desk();
    let id = desk
        .open_margin(desk.order_for_selected(Direction::Long, dec!(0.25), "DAI", dec!(500), dec!(1)))
        .await
        .position_id
        .unwrap();
    let entries = desk.transactions().len();
    let wallet = desk.funding().wallet_balance("DAI");

    desk.service().set_failing(true);
    let outcome = desk.add_collateral(&id, "DAI", "100").await;
    assert!(!outcome.success);
    assert!(outcome.tx_hash.is_none());
    let outcome = desk.close_margin(&id).await;
    assert!(!outcome.success);

    assert_eq!(desk.transactions().len(), entries);
    assert_eq!(desk.funding().wallet_balance("DAI"), wallet);
    assert_eq!(desk.position(&id).await.unwrap().collateral_amount, dec!(500));
}

#[tokio::test]
async fn rejected_input_never_reaches_service() {
    let mut desk = Desk::new(HydroConfig::test());

    for outcome in [
        desk.supply("DAI", "").await,
        desk.supply("DAI", "0").await,
        desk.withdraw("DAI", "1").await,
        desk.repay("DAI", "1").await,
        desk.borrow("HYDRO", "1").await,
    ] {
        assert!(!outcome.success);
        assert!(!outcome.message.is_empty());
    }

    let over_levered = desk.order_for_selected(Direction::Long, dec!(1), "DAI", dec!(100), dec!(5));
    assert!(!desk.open_margin(over_levered).await.success);

    assert_eq!(desk.service().call_count(), 0);
    assert!(desk.transactions().is_empty());
    assert_eq!(desk.summary().total_supplied_usd.value(), Decimal::ZERO);
}
