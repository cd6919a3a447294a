//! Hydro desk simulation.
//!
//! Walks through the lending and margin lifecycle against the mocked service:
//! supplying and borrowing, rejected actions, a leveraged position re-priced by
//! the ticker, and the transaction history it all leaves behind.
//!
//! Pass a JSON config path as the first argument. Without one the preset named by
//! `HYDRO_ENV` is used, falling back to the demo preset.

use anyhow::{Context, Result};
use hydro_core::*;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&PathBuf::from(path))?,
        None => config_from_env(Environment::Demo)?,
    };
    logging::init_tracing(&config.logging)?;

    println!("Hydro Desk Simulation");
    println!("Lending, Margin, Mocked Chain Services\n");

    let mut desk = Desk::new(config);

    scenario_1_lending(&mut desk).await;
    scenario_2_rejections(&mut desk).await;
    scenario_3_margin_lifecycle(&mut desk).await?;
    scenario_4_market_filler(&mut desk);
    scenario_5_history(&desk);

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn print_outcome(outcome: &ActionOutcome) {
    let status = if outcome.success { "ok" } else { "rejected" };
    println!("    [{}] {}", status, outcome.message);
}

fn print_summary(desk: &Desk) {
    let s = desk.summary();
    println!(
        "    supplied ${}, borrowed ${}, health {}, can borrow ${}, net apy {}",
        s.total_supplied_usd, s.total_borrowed_usd, s.health_factor, s.available_to_borrow_usd, s.net_apy
    );
}

/// Supply collateral, borrow against it, pay it back.
async fn scenario_1_lending(desk: &mut Desk) {
    println!("Scenario 1: Lending Round Trip\n");

    for asset in desk.funding().assets() {
        println!(
            "  {:<6} supply {} / borrow {}, cf {}, liquidity {}",
            asset.ticker,
            asset.supply_apy,
            asset.borrow_apy,
            asset.collateral_factor,
            asset.liquidity_label()
        );
    }
    println!();

    print_outcome(&desk.supply("WETH", "2").await);
    print_summary(desk);

    print_outcome(&desk.borrow("DAI", "1500").await);
    print_summary(desk);

    print_outcome(&desk.supply("USDC", "1000").await);
    print_outcome(&desk.borrow("DAI", "500").await);
    print_summary(desk);

    print_outcome(&desk.repay("DAI", "2000").await);
    print_outcome(&desk.withdraw("USDC", "1000").await);
    print_summary(desk);
    println!();
}

/// Each of these fails without touching state.
async fn scenario_2_rejections(desk: &mut Desk) {
    println!("Scenario 2: Rejected Actions\n");

    print_outcome(&desk.borrow("WETH", "100").await);
    print_outcome(&desk.supply("DAI", "-5").await);
    print_outcome(&desk.withdraw("HYDRO", "1").await);
    print_outcome(&desk.supply("BTC", "1").await);

    desk.service().set_failing(true);
    print_outcome(&desk.supply("DAI", "10").await);
    desk.service().set_failing(false);

    print_summary(desk);
    println!();
}

/// Open, let the ticker move the price, top up, close.
async fn scenario_3_margin_lifecycle(desk: &mut Desk) -> Result<()> {
    println!("Scenario 3: Margin Position Lifecycle\n");

    let request = desk.order_for_selected(Direction::Long, dec!(0.5), "DAI", dec!(500), dec!(2));
    let estimate = desk.estimate(&request)?;
    println!(
        "  Estimate: notional ${}, required ${}, borrowed ${}, liq price {:.2}",
        estimate.notional_usd, estimate.required_collateral_usd, estimate.borrowed_usd, estimate.liquidation_price
    );

    let outcome = desk.open_margin(request).await;
    print_outcome(&outcome);
    let position_id = outcome.position_id.context("open did not return a position id")?;

    let ticker = desk.start_ticker();
    let interval = desk.config().ticker.interval();
    tokio::time::sleep(interval * 2 + Duration::from_millis(100)).await;

    if let Some(pos) = desk.position(&position_id).await {
        println!(
            "  After {} ticks: price {}, pnl {} {}, liq price {:.2}, liquidatable {}",
            ticker.ticks(),
            pos.current_price,
            pos.pnl_display(),
            pos.quote_asset,
            pos.liquidation_price,
            pos.is_liquidatable()
        );
    }
    println!("  Unrealized pnl across book: {:.2}", desk.margin_book().lock().await.unrealized_pnl());

    print_outcome(&desk.add_collateral(&position_id, "DAI", "250").await);
    if let Some(pos) = desk.position(&position_id).await {
        println!("  After top up: leverage {}, liq price {:.2}", pos.leverage, pos.liquidation_price);
    }

    print_outcome(&desk.close_margin_portion(&position_id, dec!(0.5)).await);
    print_outcome(&desk.close_margin(&position_id).await);
    println!("  Wallet DAI after close: {}", desk.funding().wallet_balance("DAI"));

    ticker.shutdown().await;
    println!();
    Ok(())
}

fn scenario_4_market_filler(desk: &mut Desk) {
    println!("Scenario 4: Market Filler\n");

    let mut feed = RandomWalkFeed::new(desk.config().ticker.seed.unwrap_or(1));
    for pair_id in ["WETH-DAI", "HYDRO-WETH"] {
        desk.select_pair(pair_id);
        let view = desk.market_view(&mut feed);
        let (bid, ask) = (&view.order_book.bids[0], &view.order_book.asks[0]);
        println!(
            "  {}: best bid {} / ask {}, {} trades, last close {}",
            view.pair.display_symbol(),
            bid.price,
            ask.price,
            view.trades.len(),
            view.candles.last().map(|c| c.close).unwrap_or_default()
        );
    }
    println!();
}

fn scenario_5_history(desk: &Desk) {
    println!("Scenario 5: Transaction History\n");

    for record in desk.transactions().iter() {
        println!("  {} [{}] {}", record.timestamp.to_rfc3339(), record.kind, record.summary);
    }
}
