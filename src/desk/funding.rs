//! Lending actions: validate locally, wait on the service, then apply and log.

use super::core::Desk;
use super::results::{ActionOutcome, DeskError};
use crate::funding::FundingAction;
use crate::service::HydroService;
use crate::types::parse_amount;

impl<S: HydroService> Desk<S> {
    pub async fn supply(&mut self, asset: &str, amount: &str) -> ActionOutcome {
        self.funding_action(FundingAction::Supply, asset, amount).await
    }

    pub async fn withdraw(&mut self, asset: &str, amount: &str) -> ActionOutcome {
        self.funding_action(FundingAction::Withdraw, asset, amount).await
    }

    pub async fn borrow(&mut self, asset: &str, amount: &str) -> ActionOutcome {
        self.funding_action(FundingAction::Borrow, asset, amount).await
    }

    pub async fn repay(&mut self, asset: &str, amount: &str) -> ActionOutcome {
        self.funding_action(FundingAction::Repay, asset, amount).await
    }

    async fn funding_action(&mut self, action: FundingAction, asset: &str, amount: &str) -> ActionOutcome {
        let result = self.try_funding_action(action, asset, amount).await;
        Self::finish(action.kind().label(), result)
    }

    async fn try_funding_action(
        &mut self,
        action: FundingAction,
        asset: &str,
        amount: &str,
    ) -> Result<ActionOutcome, DeskError> {
        let amount = parse_amount(amount)?;
        self.funding.preflight(action, asset, amount)?;

        let response = match action {
            FundingAction::Supply => self.service.supply_asset(asset, amount).await,
            FundingAction::Withdraw => self.service.withdraw_asset(asset, amount).await,
            FundingAction::Borrow => self.service.borrow_asset(asset, amount).await,
            FundingAction::Repay => self.service.repay_asset(asset, amount).await,
        };
        if !response.success {
            return Err(DeskError::ServiceRejected(response.message));
        }

        self.funding.execute(action, asset, amount, &mut self.log)?;
        Ok(ActionOutcome::from_response(response))
    }
}
