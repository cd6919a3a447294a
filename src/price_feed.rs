// Price Feed Simulation
//
// The margin views need a moving price and the trading views need something to
// fill the order book, trade tape and chart. None of it is real market data. We
// define traits so a live feed can replace the simulator later without touching
// the callers, and a seeded random walk that implements them.

use crate::market::TradingPair;
use crate::types::Price;
use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Source of the next price for an instrument trading around `reference`.
pub trait PriceSource: Send {
    fn next_price(&mut self, reference: Price, precision: u32) -> Price;
}

/// Source of the presentation filler shown next to the chart.
pub trait MarketDataSource {
    fn order_book(&mut self, pair: &TradingPair, depth: usize) -> OrderBookSnapshot;
    fn recent_trades(&mut self, pair: &TradingPair, count: usize, now_ms: i64) -> Vec<TradePrint>;
    fn daily_candles(&mut self, pair: &TradingPair, days: usize, last_day: NaiveDate) -> Vec<Candle>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Best (highest) first.
    pub bids: Vec<BookLevel>,
    /// Best (lowest) first.
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bids.first(), self.asks.first()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePrint {
    pub price: Decimal,
    pub amount: Decimal,
    pub time_ms: i64,
    pub side: TradeSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub day: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Reference price the filler generators center on.
pub fn reference_price(pair: &TradingPair) -> Decimal {
    match (pair.base.as_str(), pair.quote.as_str()) {
        ("WETH", "DAI") => dec!(2000),
        ("HYDRO", "WETH") => dec!(0.0005),
        _ => dec!(100),
    }
}

/// Seeded random walk. Each tick lands within ±max_move/2 of the reference price.
#[derive(Debug, Clone)]
pub struct RandomWalkFeed {
    rng: ChaCha8Rng,
    max_move: Decimal,
}

impl RandomWalkFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_move: dec!(0.02),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            max_move: dec!(0.02),
        }
    }

    pub fn with_max_move(mut self, max_move: Decimal) -> Self {
        self.max_move = max_move;
        self
    }

    // uniform in [lo, hi] at 1e-6 resolution
    fn uniform(&mut self, lo: Decimal, hi: Decimal) -> Decimal {
        let step = self.rng.gen_range(0..=1_000_000i64);
        lo + (hi - lo) * Decimal::new(step, 6)
    }

    fn centered(&mut self) -> Decimal {
        self.uniform(dec!(-0.5), dec!(0.5))
    }
}

impl PriceSource for RandomWalkFeed {
    fn next_price(&mut self, reference: Price, precision: u32) -> Price {
        let change = self.centered() * reference.value() * self.max_move;
        let next = (reference.value() + change).round_dp(precision);
        Price::new(next).unwrap_or(reference)
    }
}

impl MarketDataSource for RandomWalkFeed {
    fn order_book(&mut self, pair: &TradingPair, depth: usize) -> OrderBookSnapshot {
        let base = reference_price(pair);
        let precision = pair.price_precision();
        let mut bids = Vec::with_capacity(depth);
        let mut asks = Vec::with_capacity(depth);

        for i in 0..depth {
            let step = base * dec!(0.001) * Decimal::from(i as u64);
            let bid_jitter = self.uniform(Decimal::ZERO, base * dec!(0.0005));
            let ask_jitter = self.uniform(Decimal::ZERO, base * dec!(0.0005));
            bids.push(self.level((base - step - bid_jitter).round_dp(precision)));
            asks.push(self.level((base + step + ask_jitter).round_dp(precision)));
        }

        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        OrderBookSnapshot { bids, asks }
    }

    fn recent_trades(&mut self, pair: &TradingPair, count: usize, now_ms: i64) -> Vec<TradePrint> {
        let base = reference_price(pair);
        let precision = pair.price_precision();
        let mut trades = Vec::with_capacity(count);
        let mut time_ms = now_ms;

        for _ in 0..count {
            let side = if self.rng.gen_bool(0.5) { TradeSide::Buy } else { TradeSide::Sell };
            let price = (base + self.centered() * base * dec!(0.002)).round_dp(precision);
            let amount = self.uniform(dec!(0.1), dec!(10.1)).round_dp(3);
            trades.push(TradePrint { price, amount, time_ms, side });
            // walk back 5 to 65 seconds per print so the tape reads newest first
            time_ms -= self.rng.gen_range(5_000..=65_000i64);
        }
        trades
    }

    fn daily_candles(&mut self, pair: &TradingPair, days: usize, last_day: NaiveDate) -> Vec<Candle> {
        let mut price = match (pair.base.as_str(), pair.quote.as_str()) {
            ("WETH", "DAI") => self.uniform(dec!(1800), dec!(2300)),
            ("HYDRO", "WETH") => self.uniform(dec!(0.0001), dec!(0.0006)),
            _ => self.uniform(dec!(50), dec!(150)),
        };
        let mut candles = Vec::with_capacity(days);

        for i in 0..days {
            let back = (days - 1 - i) as i64;
            let day = last_day - Duration::days(back);
            let open = price;
            let high = open + self.uniform(Decimal::ZERO, price * dec!(0.03));
            let low = open - self.uniform(Decimal::ZERO, price * dec!(0.03));
            let close = (high + low) / dec!(2) + self.centered() * price * dec!(0.015);
            let volume = self.uniform(dec!(200), dec!(1200)).round_dp(2);

            candles.push(Candle {
                day,
                open: open.round_dp(8),
                high: high.round_dp(8),
                low: low.round_dp(8),
                close: close.round_dp(8),
                volume,
            });

            price = close + self.centered() * price * dec!(0.02);
            if price <= Decimal::ZERO {
                price = self.uniform(dec!(0.000001), dec!(0.01));
            }
        }
        candles
    }
}

impl RandomWalkFeed {
    fn level(&mut self, price: Decimal) -> BookLevel {
        let amount = self.uniform(dec!(1), dec!(21)).round_dp(3);
        BookLevel {
            price,
            amount,
            total: (price * amount).round_dp(2),
        }
    }
}

/// Fixed price source for tests and replays.
#[derive(Debug, Clone)]
pub struct ScriptedFeed {
    prices: Vec<Price>,
    cursor: usize,
}

impl ScriptedFeed {
    pub fn new(prices: Vec<Price>) -> Self {
        Self { prices, cursor: 0 }
    }
}

impl PriceSource for ScriptedFeed {
    // repeats the last price once the script runs out
    fn next_price(&mut self, reference: Price, _precision: u32) -> Price {
        let price = self
            .prices
            .get(self.cursor)
            .or_else(|| self.prices.last())
            .copied()
            .unwrap_or(reference);
        self.cursor += 1;
        price
    }
}
