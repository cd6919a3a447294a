// hydro-core: lending and margin account arithmetic for the Hydro DEX front-end.
// every chain interaction is mocked. all money math is rust_decimal.
// state changes are synchronous; async only at the service boundary and the price ticker.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Direction, Price, Usd, Leverage, Pct, amount parsing
//   2.x  funding.rs: supply, withdraw, borrow, repay against the lending book
//   2.0  asset.rs: funding assets, seed table, wallet balances
//   3.x  summary.rs: health factor, borrow limit, net apy
//   4.x  position.rs: margin position, pnl, liquidation price
//   5.x  margin.rs: pre-trade estimate, open/top-up/close, margin book
//   6.x  tx_log.rs: append-only transaction history
//   7.x  config.rs: margin params, ticker, service latency, env presets
//   8.x  desk/: user actions: validate, call service, apply, log
//   9.x  ticker.rs: background re-pricing of open positions
//   9.1  price_feed.rs: random walk prices, order book/trade/candle filler
//   9.2  service.rs: mocked protocol calls
//   10.x market.rs: trading pair catalogue
//   11.x logging.rs: tracing subscriber setup

// account state
pub mod asset;
pub mod funding;
pub mod margin;
pub mod position;
pub mod summary;
pub mod tx_log;
pub mod types;

// orchestration
pub mod config;
pub mod desk;
pub mod logging;
pub mod market;
pub mod price_feed;
pub mod service;
pub mod ticker;

// re exports for convenience
pub use asset::{seed_assets, FundingAsset, WalletBalances};
pub use config::{config_from_env, load_config, ConfigError, Environment, HydroConfig};
pub use desk::{ActionOutcome, Desk, DeskError, MarketView};
pub use funding::{FundingAction, FundingBook, FundingError};
pub use margin::{
    estimate_position, validate_open, MarginBook, MarginError, MarginParams, MarketPrices, OpenRequest,
    PositionEstimate,
};
pub use market::{MarketCatalogue, TradingPair};
pub use position::{calculate_liquidation_price, calculate_pnl, MarginPosition};
pub use price_feed::{MarketDataSource, PriceSource, RandomWalkFeed, ScriptedFeed};
pub use service::{HydroService, MockHydroService, ServiceResponse};
pub use summary::{calculate_user_summary, HealthFactor, UserSummary};
pub use ticker::{spawn_ticker, TickerHandle};
pub use tx_log::{NewTransaction, TransactionKind, TransactionLog, TransactionRecord, TransactionRecorder};
pub use types::{parse_amount, AmountError, Direction, Leverage, Pct, Price, Timestamp, Usd};
