//! Margin actions. The book lock is never held across a service call; the
//! ticker keeps running while a call is in flight.

use super::core::Desk;
use super::results::{ActionOutcome, DeskError};
use crate::margin::{estimate_position, settlement_amount, validate_open, MarginError, OpenRequest, PositionEstimate};
use crate::service::HydroService;
use crate::types::{parse_amount, Direction, Leverage};
use rust_decimal::Decimal;

impl<S> Desk<S> {
    /// Builds an open request against the selected pair.
    pub fn order_for_selected(
        &self,
        direction: Direction,
        size: Decimal,
        collateral_asset: &str,
        collateral_amount: Decimal,
        leverage: Decimal,
    ) -> OpenRequest {
        let pair = self.markets.selected();
        OpenRequest {
            pair_id: pair.id.clone(),
            base_asset: pair.base.clone(),
            quote_asset: pair.quote.clone(),
            direction,
            size,
            collateral_asset: collateral_asset.to_string(),
            collateral_amount,
            leverage,
        }
    }

    /// Pre-trade numbers for the margin form. no wallet or pair checks.
    pub fn estimate(&self, request: &OpenRequest) -> Result<PositionEstimate, DeskError> {
        let leverage = Leverage::new(request.leverage).ok_or(MarginError::InvalidLeverage(request.leverage))?;
        let prices = self.market_prices(&request.base_asset, &request.quote_asset, &request.collateral_asset)?;
        Ok(estimate_position(
            request.direction,
            request.size,
            request.collateral_amount,
            leverage,
            &prices,
            &self.config.margin,
        )?)
    }
}

impl<S: HydroService> Desk<S> {
    pub async fn open_margin(&mut self, request: OpenRequest) -> ActionOutcome {
        let result = self.try_open_margin(&request).await;
        Self::finish("margin_open", result)
    }

    pub async fn add_collateral(&mut self, position_id: &str, asset: &str, amount: &str) -> ActionOutcome {
        let result = self.try_add_collateral(position_id, asset, amount).await;
        Self::finish("margin_add_collateral", result)
    }

    /// Closes the whole position.
    pub async fn close_margin(&mut self, position_id: &str) -> ActionOutcome {
        self.close_margin_portion(position_id, Decimal::ONE).await
    }

    /// Partial closes are refused until the book can split a position.
    pub async fn close_margin_portion(&mut self, position_id: &str, portion: Decimal) -> ActionOutcome {
        let result = self.try_close_margin(position_id, portion).await;
        Self::finish("margin_close", result)
    }

    async fn try_open_margin(&mut self, request: &OpenRequest) -> Result<ActionOutcome, DeskError> {
        let pair = self
            .markets
            .get(&request.pair_id)
            .ok_or_else(|| DeskError::UnknownPair(request.pair_id.clone()))?;
        if pair.base != request.base_asset || pair.quote != request.quote_asset {
            return Err(DeskError::PairMismatch {
                pair: pair.id.clone(),
                base: request.base_asset.clone(),
                quote: request.quote_asset.clone(),
            });
        }

        let prices = self.market_prices(&request.base_asset, &request.quote_asset, &request.collateral_asset)?;
        validate_open(request, &prices, &self.config.margin)?;
        self.check_wallet(&request.collateral_asset, request.collateral_amount)?;

        let response = self.service.open_margin_position(request).await;
        if !response.success {
            return Err(DeskError::ServiceRejected(response.message));
        }

        let position = self
            .margin
            .lock()
            .await
            .open(request, &prices, &self.config.margin, &mut self.log)?;
        self.funding
            .wallet_mut()
            .debit(&request.collateral_asset, request.collateral_amount);

        Ok(ActionOutcome::from_response(response).with_position(&position.id))
    }

    async fn try_add_collateral(
        &mut self,
        position_id: &str,
        asset: &str,
        amount: &str,
    ) -> Result<ActionOutcome, DeskError> {
        let amount = parse_amount(amount)?;
        {
            let book = self.margin.lock().await;
            let position = book
                .get(position_id)
                .ok_or_else(|| MarginError::PositionNotFound(position_id.to_string()))?;
            if position.collateral_asset != asset {
                return Err(MarginError::CollateralAssetMismatch {
                    expected: position.collateral_asset.clone(),
                    got: asset.to_string(),
                }
                .into());
            }
        }
        let collateral_usd = self.price_of(asset)?;
        self.check_wallet(asset, amount)?;

        let response = self.service.add_collateral(position_id, amount, asset).await;
        if !response.success {
            return Err(DeskError::ServiceRejected(response.message));
        }

        // the position may have been closed while the call was in flight; add_collateral re-checks
        self.margin.lock().await.add_collateral(
            position_id,
            asset,
            amount,
            collateral_usd,
            &self.config.margin,
            &mut self.log,
        )?;
        self.funding.wallet_mut().debit(asset, amount);

        Ok(ActionOutcome::from_response(response).with_position(position_id))
    }

    async fn try_close_margin(&mut self, position_id: &str, portion: Decimal) -> Result<ActionOutcome, DeskError> {
        if portion != Decimal::ONE {
            return Err(DeskError::PartialClose(portion));
        }
        let (quote_asset, collateral_asset) = {
            let book = self.margin.lock().await;
            let position = book
                .get(position_id)
                .ok_or_else(|| MarginError::PositionNotFound(position_id.to_string()))?;
            (position.quote_asset.clone(), position.collateral_asset.clone())
        };
        let quote_usd = self.price_of(&quote_asset)?;
        let collateral_usd = self.price_of(&collateral_asset)?;

        let response = self.service.close_margin_position(position_id, portion).await;
        if !response.success {
            return Err(DeskError::ServiceRejected(response.message));
        }

        let closed = self.margin.lock().await.close(position_id, &mut self.log)?;
        let returned = settlement_amount(&closed, quote_usd, collateral_usd);
        self.funding.wallet_mut().credit(&closed.collateral_asset, returned);

        tracing::info!(
            id = %closed.id,
            pnl = %closed.pnl_display(),
            returned = %returned,
            asset = %closed.collateral_asset,
            "collateral settled to wallet"
        );
        Ok(ActionOutcome::from_response(response).with_position(position_id))
    }
}
