// 8.0 desk/core.rs: the user's desk. funding book, margin book, tx log, markets and the service.

use super::results::{ActionOutcome, DeskError};
use crate::config::HydroConfig;
use crate::funding::FundingBook;
use crate::margin::{MarginBook, MarketPrices};
use crate::market::{MarketCatalogue, TradingPair};
use crate::position::MarginPosition;
use crate::price_feed::{Candle, MarketDataSource, OrderBookSnapshot, RandomWalkFeed, TradePrint};
use crate::service::MockHydroService;
use crate::summary::UserSummary;
use crate::ticker::{spawn_ticker, SharedMarginBook, TickerHandle};
use crate::tx_log::TransactionLog;
use crate::types::{Price, Timestamp};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/** 8.1: all account state lives here. the margin book is shared with the ticker */
#[derive(Debug)]
pub struct Desk<S = MockHydroService> {
    pub(super) config: HydroConfig,
    pub(super) funding: FundingBook,
    pub(super) margin: SharedMarginBook,
    pub(super) log: TransactionLog,
    pub(super) markets: MarketCatalogue,
    pub(super) service: S,
}

/// Filler for the trading view of one pair.
#[derive(Debug, Clone)]
pub struct MarketView {
    pub pair: TradingPair,
    pub order_book: OrderBookSnapshot,
    pub trades: Vec<TradePrint>,
    pub candles: Vec<Candle>,
}

impl Desk<MockHydroService> {
    /// Seeded lending markets and wallet, mock service with the configured latency.
    pub fn new(config: HydroConfig) -> Self {
        let service = MockHydroService::new(config.service.clone());
        Self::with_service(config, FundingBook::default(), service)
    }
}

impl<S> Desk<S> {
    pub fn with_service(config: HydroConfig, funding: FundingBook, service: S) -> Self {
        Self {
            config,
            funding,
            margin: Arc::new(Mutex::new(MarginBook::new())),
            log: TransactionLog::new(),
            markets: MarketCatalogue::default(),
            service,
        }
    }

    pub fn config(&self) -> &HydroConfig {
        &self.config
    }

    pub fn funding(&self) -> &FundingBook {
        &self.funding
    }

    pub fn summary(&self) -> &UserSummary {
        self.funding.summary()
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.log
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn markets(&self) -> &MarketCatalogue {
        &self.markets
    }

    /// Unknown ids leave the current pair selected.
    pub fn select_pair(&mut self, pair_id: &str) -> bool {
        let selected = self.markets.select(pair_id);
        if !selected {
            warn!(pair_id, "unknown trading pair ignored");
        }
        selected
    }

    /// Handle to the shared margin book, for readers and the ticker.
    pub fn margin_book(&self) -> SharedMarginBook {
        Arc::clone(&self.margin)
    }

    pub async fn positions(&self) -> Vec<MarginPosition> {
        self.margin.lock().await.positions().to_vec()
    }

    pub async fn position(&self, position_id: &str) -> Option<MarginPosition> {
        self.margin.lock().await.get(position_id).cloned()
    }

    /// Starts re-pricing open positions on the configured interval.
    /// the ticker runs until the returned handle is dropped or shut down.
    pub fn start_ticker(&self) -> TickerHandle {
        let feed = match self.config.ticker.seed {
            Some(seed) => RandomWalkFeed::new(seed),
            None => RandomWalkFeed::from_entropy(),
        }
        .with_max_move(self.config.ticker.max_move);

        info!(
            interval_secs = self.config.ticker.interval_secs,
            seed = ?self.config.ticker.seed,
            "starting price ticker"
        );
        spawn_ticker(self.margin_book(), feed, self.config.ticker.interval())
    }

    /// Order book, tape and chart for the selected pair.
    pub fn market_view(&self, source: &mut impl MarketDataSource) -> MarketView {
        let pair = self.markets.selected().clone();
        MarketView {
            order_book: source.order_book(&pair, 10),
            trades: source.recent_trades(&pair, 15, Timestamp::now().as_millis()),
            candles: source.daily_candles(&pair, 100, Utc::now().date_naive()),
            pair,
        }
    }

    pub(super) fn price_of(&self, ticker: &str) -> Result<Price, DeskError> {
        self.funding.price(ticker).ok_or_else(|| DeskError::NoPrice(ticker.to_string()))
    }

    pub(super) fn market_prices(&self, base: &str, quote: &str, collateral: &str) -> Result<MarketPrices, DeskError> {
        Ok(MarketPrices {
            base_usd: self.price_of(base)?,
            quote_usd: self.price_of(quote)?,
            collateral_usd: self.price_of(collateral)?,
        })
    }

    pub(super) fn check_wallet(&self, ticker: &str, requested: Decimal) -> Result<(), DeskError> {
        let available = self.funding.wallet_balance(ticker);
        if requested > available {
            return Err(DeskError::InsufficientWallet {
                ticker: ticker.to_string(),
                requested,
                available,
            });
        }
        Ok(())
    }

    // every public action funnels through here so rejections are logged the same way
    pub(super) fn finish(action: &str, result: Result<ActionOutcome, DeskError>) -> ActionOutcome {
        match result {
            Ok(outcome) => {
                info!(action, tx_hash = ?outcome.tx_hash, message = %outcome.message, "action completed");
                outcome
            }
            Err(err) => {
                warn!(action, error = %err, "action rejected");
                ActionOutcome::failed(&err)
            }
        }
    }
}
