//! Margin position calculator and the book of open positions.
//!
//! Opening a position sizes the loan as whatever the posted collateral does
//! not cover: `borrowed = max(0, size × base price − collateral value)`.
//! Required collateral is `notional / leverage`; the provided collateral must
//! reach it within a small precision tolerance.
//!
//! Price ticks only move P&L. A collateral top-up re-derives leverage from the
//! entry notional and moves the liquidation price accordingly.

use crate::position::{calculate_liquidation_price, MarginPosition};
use crate::tx_log::{NewTransaction, TransactionRecorder};
use crate::types::{AmountError, Direction, Leverage, Price, Timestamp, Usd};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginParams {
    /// Share of the initial margin that may be lost before liquidation (k).
    pub risk_margin: Decimal,
    /// Provided collateral may fall this far short of the requirement (0.99 = 1% slack).
    pub collateral_tolerance: Decimal,
    pub leverage_options: Vec<Decimal>,
}

impl Default for MarginParams {
    fn default() -> Self {
        Self {
            risk_margin: dec!(0.9),
            collateral_tolerance: dec!(0.99),
            leverage_options: vec![dec!(1), dec!(2), dec!(3), dec!(5)],
        }
    }
}

impl MarginParams {
    pub fn allows(&self, leverage: Leverage) -> bool {
        self.leverage_options.iter().any(|l| *l == leverage.value())
    }
}

/// What the trader asks for on the margin form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub pair_id: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub direction: Direction,
    pub size: Decimal,
    pub collateral_asset: String,
    pub collateral_amount: Decimal,
    pub leverage: Decimal,
}

/// Usd prices the estimate needs. the entry price is base priced in quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketPrices {
    pub base_usd: Price,
    pub quote_usd: Price,
    pub collateral_usd: Price,
}

impl MarketPrices {
    pub fn entry_price(&self) -> Price {
        Price::new_unchecked(self.base_usd.value() / self.quote_usd.value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionEstimate {
    pub notional_usd: Usd,
    pub required_collateral_usd: Usd,
    pub collateral_value_usd: Usd,
    pub borrowed_usd: Usd,
    pub entry_price: Price,
    pub liquidation_price: Decimal,
}

// 5.1: pre trade numbers shown under the form. only fails when an amount is too large to value.
pub fn estimate_position(
    direction: Direction,
    size: Decimal,
    collateral_amount: Decimal,
    leverage: Leverage,
    prices: &MarketPrices,
    params: &MarginParams,
) -> Result<PositionEstimate, MarginError> {
    let notional = prices.base_usd.value_of(size)?;
    let collateral_value = prices.collateral_usd.value_of(collateral_amount)?;
    let entry_price = prices.entry_price();

    Ok(PositionEstimate {
        notional_usd: notional,
        required_collateral_usd: notional.mul(leverage.initial_margin_fraction()),
        collateral_value_usd: collateral_value,
        borrowed_usd: notional.sub(collateral_value).max_zero(),
        entry_price,
        liquidation_price: calculate_liquidation_price(entry_price, leverage, direction, params.risk_margin),
    })
}

// 5.2: the checks the margin form runs before calling the service.
pub fn validate_open(
    request: &OpenRequest,
    prices: &MarketPrices,
    params: &MarginParams,
) -> Result<(Leverage, PositionEstimate), MarginError> {
    if request.size <= Decimal::ZERO || request.collateral_amount <= Decimal::ZERO {
        return Err(MarginError::NonPositiveInput);
    }
    let leverage = Leverage::new(request.leverage).ok_or(MarginError::InvalidLeverage(request.leverage))?;
    if !params.allows(leverage) {
        return Err(MarginError::LeverageNotOffered(request.leverage));
    }

    let estimate = estimate_position(
        request.direction,
        request.size,
        request.collateral_amount,
        leverage,
        prices,
        params,
    )?;

    let floor = estimate.required_collateral_usd.mul(params.collateral_tolerance);
    if estimate.collateral_value_usd < floor {
        return Err(MarginError::InsufficientCollateral {
            provided: estimate.collateral_value_usd,
            required: estimate.required_collateral_usd.rounded(),
            leverage,
            notional: estimate.notional_usd,
        });
    }

    Ok((leverage, estimate))
}

/// Leverage implied by a collateral balance against a fixed notional. floored at 1x.
pub fn implied_leverage(notional: Usd, collateral_value: Usd) -> Leverage {
    if collateral_value.value() <= Decimal::ZERO {
        return Leverage::one();
    }
    Leverage::new(notional.value() / collateral_value.value()).unwrap_or_else(Leverage::one)
}

/// Collateral units handed back on close: collateral plus pnl converted into the
/// collateral asset. a loss bigger than the collateral returns nothing.
pub fn settlement_amount(position: &MarginPosition, quote_usd: Price, collateral_usd: Price) -> Decimal {
    let pnl_in_collateral = position.pnl * quote_usd.value() / collateral_usd.value();
    (position.collateral_amount + pnl_in_collateral).max(Decimal::ZERO)
}

#[derive(Debug, Default)]
pub struct MarginBook {
    positions: Vec<MarginPosition>,
    next_seq: u64,
}

impl MarginBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> &[MarginPosition] {
        &self.positions
    }

    pub fn get(&self, position_id: &str) -> Option<&MarginPosition> {
        self.positions.iter().find(|p| p.id == position_id)
    }

    fn get_mut(&mut self, position_id: &str) -> Result<&mut MarginPosition, MarginError> {
        self.positions
            .iter_mut()
            .find(|p| p.id == position_id)
            .ok_or_else(|| MarginError::PositionNotFound(position_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    // 5.3: validates, creates and logs a new position
    pub fn open(
        &mut self,
        request: &OpenRequest,
        prices: &MarketPrices,
        params: &MarginParams,
        log: &mut impl TransactionRecorder,
    ) -> Result<MarginPosition, MarginError> {
        let (leverage, estimate) = validate_open(request, prices, params)?;
        let now = Timestamp::now();
        self.next_seq += 1;

        let borrowed_asset = match request.direction {
            Direction::Long => request.quote_asset.clone(),
            Direction::Short => request.base_asset.clone(),
        };

        let position = MarginPosition {
            id: format!("pos_{}_{}", now.as_millis(), self.next_seq),
            pair: format!("{}/{}", request.base_asset, request.quote_asset),
            base_asset: request.base_asset.clone(),
            quote_asset: request.quote_asset.clone(),
            direction: request.direction,
            size: request.size,
            entry_price: estimate.entry_price,
            current_price: estimate.entry_price,
            collateral_asset: request.collateral_asset.clone(),
            collateral_amount: request.collateral_amount,
            borrowed_asset,
            borrowed_usd: estimate.borrowed_usd,
            entry_notional_usd: estimate.notional_usd,
            leverage,
            liquidation_price: estimate.liquidation_price,
            pnl: Decimal::ZERO,
            notes: String::new(),
            opened_at: now,
            updated_at: now,
        };

        tracing::info!(
            id = %position.id,
            pair = %position.pair,
            direction = %position.direction,
            size = %position.size,
            leverage = %position.leverage,
            liquidation_price = %position.liquidation_price,
            "margin position opened"
        );

        log.record(NewTransaction::margin_open(&position));
        self.positions.push(position.clone());
        Ok(position)
    }

    // 5.4: top up. leverage and liquidation price are re-derived from the new collateral
    pub fn add_collateral(
        &mut self,
        position_id: &str,
        asset: &str,
        amount: Decimal,
        collateral_usd: Price,
        params: &MarginParams,
        log: &mut impl TransactionRecorder,
    ) -> Result<MarginPosition, MarginError> {
        if amount <= Decimal::ZERO {
            return Err(MarginError::NonPositiveInput);
        }
        let position = self.get_mut(position_id)?;
        if position.collateral_asset != asset {
            return Err(MarginError::CollateralAssetMismatch {
                expected: position.collateral_asset.clone(),
                got: asset.to_string(),
            });
        }

        position.collateral_amount += amount;
        let collateral_value = Usd::new(position.collateral_amount * collateral_usd.value());
        position.leverage = implied_leverage(position.entry_notional_usd, collateral_value);
        position.borrowed_usd = position.entry_notional_usd.sub(collateral_value).max_zero();
        position.liquidation_price = calculate_liquidation_price(
            position.entry_price,
            position.leverage,
            position.direction,
            params.risk_margin,
        );
        position.notes.push_str(&format!("Added {} {} collateral. ", amount, asset));
        position.updated_at = Timestamp::now();

        let updated = position.clone();
        tracing::info!(
            id = %updated.id,
            collateral = %updated.collateral_amount,
            leverage = %updated.leverage,
            liquidation_price = %updated.liquidation_price,
            "collateral added"
        );

        log.record(NewTransaction::margin_add_collateral(position_id, asset, amount, Some(&updated)));
        Ok(updated)
    }

    pub fn update_price(&mut self, position_id: &str, current_price: Price) -> Result<Decimal, MarginError> {
        let position = self.get_mut(position_id)?;
        position.mark(current_price, Timestamp::now());
        Ok(position.pnl)
    }

    // 5.5: one tick over every open position. returns how many were re-priced
    pub fn reprice_all<F>(&mut self, mut next_price: F) -> usize
    where
        F: FnMut(&MarginPosition) -> Price,
    {
        let now = Timestamp::now();
        for position in self.positions.iter_mut() {
            let price = next_price(position);
            position.mark(price, now);
        }
        self.positions.len()
    }

    // 5.6: removes the position outright. realized pnl is whatever pnl held at close
    pub fn close(
        &mut self,
        position_id: &str,
        log: &mut impl TransactionRecorder,
    ) -> Result<MarginPosition, MarginError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.id == position_id)
            .ok_or_else(|| MarginError::PositionNotFound(position_id.to_string()))?;
        let position = self.positions.remove(index);

        tracing::info!(id = %position.id, pnl = %position.pnl_display(), "margin position closed");
        log.record(NewTransaction::margin_close(&position, Decimal::ONE));
        Ok(position)
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.positions.iter().map(|p| p.pnl).sum()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarginError {
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("Size and Collateral Amount must be greater than zero.")]
    NonPositiveInput,

    #[error("Leverage {0} is invalid, must be at least 1x.")]
    InvalidLeverage(Decimal),

    #[error("Leverage {0}x is not offered.")]
    LeverageNotOffered(Decimal),

    #[error("Provided collateral (${provided}) is less than required (${required}) for {leverage} leverage on a ${notional} position.")]
    InsufficientCollateral {
        provided: Usd,
        required: Usd,
        leverage: Leverage,
        notional: Usd,
    },

    #[error("Collateral must be posted in {expected}, got {got}.")]
    CollateralAssetMismatch { expected: String, got: String },

    #[error("Position {0} not found.")]
    PositionNotFound(String),
}
