// 4.0: open margin position tracking. pnl = (current - entry) * size * sign.
// 4.1 has the liquidation price formula at the bottom.

use crate::types::{round_2dp, Direction, Leverage, Price, Timestamp, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginPosition {
    pub id: String,
    /// Display pair, e.g. "WETH/DAI".
    pub pair: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub direction: Direction,
    /// Size in base units.
    pub size: Decimal,
    /// Price of one base unit in quote units.
    pub entry_price: Price,
    pub current_price: Price,
    pub collateral_asset: String,
    pub collateral_amount: Decimal,
    /// Longs borrow the quote asset, shorts the base asset.
    pub borrowed_asset: String,
    pub borrowed_usd: Usd,
    /// size × base usd price at open. leverage is re-derived from this on top-up.
    pub entry_notional_usd: Usd,
    pub leverage: Leverage,
    pub liquidation_price: Decimal,
    /// In quote units.
    pub pnl: Decimal,
    pub notes: String,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MarginPosition {
    // 4.2: price tick. only pnl follows the price, risk fields stay put
    pub fn mark(&mut self, current_price: Price, timestamp: Timestamp) {
        self.current_price = current_price;
        self.pnl = calculate_pnl(self.direction, self.size, self.entry_price, current_price);
        self.updated_at = timestamp;
    }

    /// How far the current price sits from liquidation, as a fraction of the current price.
    /// Zero or negative means the threshold has been crossed.
    pub fn liquidation_buffer(&self) -> Decimal {
        let current = self.current_price.value();
        match self.direction {
            Direction::Long => (current - self.liquidation_price) / current,
            Direction::Short => (self.liquidation_price - current) / current,
        }
    }

    pub fn is_liquidatable(&self) -> bool {
        self.liquidation_buffer() <= Decimal::ZERO
    }

    pub fn pnl_display(&self) -> Decimal {
        round_2dp(self.pnl)
    }
}

// 4.3: the pnl formula. positive when the market moved the position's way
pub fn calculate_pnl(direction: Direction, size: Decimal, entry_price: Price, current_price: Price) -> Decimal {
    (current_price.value() - entry_price.value()) * size * direction.sign()
}

// 4.1: liquidation price. k is the share of the initial margin that can be lost
// before the position is closed out: long = entry * (1 - k/lev), short = entry * (1 + k/lev)
pub fn calculate_liquidation_price(
    entry_price: Price,
    leverage: Leverage,
    direction: Direction,
    risk_margin: Decimal,
) -> Decimal {
    let move_fraction = leverage.initial_margin_fraction() * risk_margin;
    let liq = match direction {
        Direction::Long => entry_price.value() * (Decimal::ONE - move_fraction),
        Direction::Short => entry_price.value() * (Decimal::ONE + move_fraction),
    };
    liq.max(Decimal::ZERO)
}
