//! Lending account: supply, withdraw, borrow and repay.
//!
//! Each operation touches exactly one asset's user fields plus the matching
//! wallet balance, then recomputes the summary and appends a transaction
//! record through the injected log. Every precondition is checked before
//! anything is written, so a failed call leaves the book as it was.

use crate::asset::{seed_assets, FundingAsset, WalletBalances};
use crate::summary::{available_to_borrow_for, calculate_user_summary, UserSummary};
use crate::tx_log::{NewTransaction, TransactionKind, TransactionRecorder};
use crate::types::{parse_amount, AmountError, Price, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingBook {
    assets: Vec<FundingAsset>,
    wallet: WalletBalances,
    summary: UserSummary,
}

impl Default for FundingBook {
    fn default() -> Self {
        Self::new(seed_assets(), WalletBalances::seeded())
    }
}

impl FundingBook {
    pub fn new(assets: Vec<FundingAsset>, wallet: WalletBalances) -> Self {
        let summary = calculate_user_summary(&assets);
        Self { assets, wallet, summary }
    }

    pub fn assets(&self) -> &[FundingAsset] {
        &self.assets
    }

    pub fn asset(&self, ticker: &str) -> Option<&FundingAsset> {
        self.assets.iter().find(|a| a.ticker == ticker)
    }

    pub fn price(&self, ticker: &str) -> Option<Price> {
        self.asset(ticker).map(|a| a.price)
    }

    pub fn summary(&self) -> &UserSummary {
        &self.summary
    }

    pub fn wallet(&self) -> &WalletBalances {
        &self.wallet
    }

    pub fn wallet_balance(&self, ticker: &str) -> Decimal {
        self.wallet.balance(ticker)
    }

    pub fn available_to_borrow(&self) -> Usd {
        available_to_borrow_for(&self.assets)
    }

    fn index_of(&self, ticker: &str) -> Result<usize, FundingError> {
        self.assets
            .iter()
            .position(|a| a.ticker == ticker)
            .ok_or_else(|| FundingError::UnknownAsset(ticker.to_string()))
    }

    // 2.1: wallet → pool
    pub fn supply(
        &mut self,
        ticker: &str,
        amount: &str,
        log: &mut impl TransactionRecorder,
    ) -> Result<Decimal, FundingError> {
        self.execute(FundingAction::Supply, ticker, parse_amount(amount)?, log)
    }

    // 2.2: pool → wallet. cannot take out more than was put in
    pub fn withdraw(
        &mut self,
        ticker: &str,
        amount: &str,
        log: &mut impl TransactionRecorder,
    ) -> Result<Decimal, FundingError> {
        self.execute(FundingAction::Withdraw, ticker, parse_amount(amount)?, log)
    }

    // 2.3: loan lands in the wallet. usd value must fit under the borrow limit
    pub fn borrow(
        &mut self,
        ticker: &str,
        amount: &str,
        log: &mut impl TransactionRecorder,
    ) -> Result<Decimal, FundingError> {
        self.execute(FundingAction::Borrow, ticker, parse_amount(amount)?, log)
    }

    // 2.4: wallet → pool against outstanding debt
    pub fn repay(
        &mut self,
        ticker: &str,
        amount: &str,
        log: &mut impl TransactionRecorder,
    ) -> Result<Decimal, FundingError> {
        self.execute(FundingAction::Repay, ticker, parse_amount(amount)?, log)
    }

    /// Runs every check `action` would run without touching state. returns the asset index.
    pub fn preflight(&self, action: FundingAction, ticker: &str, amount: Decimal) -> Result<usize, FundingError> {
        if amount <= Decimal::ZERO {
            return Err(AmountError::NotPositive.into());
        }
        let idx = self.index_of(ticker)?;
        let asset = &self.assets[idx];

        match action {
            FundingAction::Supply => self.check_wallet(ticker, amount)?,
            FundingAction::Withdraw => {
                if amount > asset.user_supplied {
                    return Err(FundingError::InsufficientSupplied {
                        ticker: ticker.to_string(),
                        requested: amount,
                        supplied: asset.user_supplied,
                    });
                }
            }
            FundingAction::Borrow => {
                let requested = asset.price.value_of(amount)?;
                let available = self.available_to_borrow();
                if requested > available {
                    return Err(FundingError::BorrowLimitExceeded { requested, available });
                }
            }
            FundingAction::Repay => {
                self.check_wallet(ticker, amount)?;
                if amount > asset.user_borrowed {
                    return Err(FundingError::RepayExceedsDebt {
                        ticker: ticker.to_string(),
                        requested: amount,
                        borrowed: asset.user_borrowed,
                    });
                }
            }
        }
        Ok(idx)
    }

    /// Checks then applies. a failed check leaves the book as it was.
    pub fn execute(
        &mut self,
        action: FundingAction,
        ticker: &str,
        amount: Decimal,
        log: &mut impl TransactionRecorder,
    ) -> Result<Decimal, FundingError> {
        let idx = self.preflight(action, ticker, amount)?;
        let asset = &mut self.assets[idx];

        match action {
            FundingAction::Supply => {
                asset.user_supplied += amount;
                self.wallet.debit(ticker, amount);
            }
            FundingAction::Withdraw => {
                asset.user_supplied -= amount;
                self.wallet.credit(ticker, amount);
            }
            FundingAction::Borrow => {
                asset.user_borrowed += amount;
                self.wallet.credit(ticker, amount);
            }
            FundingAction::Repay => {
                asset.user_borrowed -= amount;
                self.wallet.debit(ticker, amount);
            }
        }

        self.commit(action.kind(), ticker, amount, log);
        Ok(amount)
    }

    fn check_wallet(&self, ticker: &str, amount: Decimal) -> Result<(), FundingError> {
        let available = self.wallet.balance(ticker);
        if amount > available {
            return Err(FundingError::InsufficientWallet {
                ticker: ticker.to_string(),
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Moves collateral between the wallet and a margin position.
    pub(crate) fn wallet_mut(&mut self) -> &mut WalletBalances {
        &mut self.wallet
    }

    fn commit(
        &mut self,
        kind: TransactionKind,
        ticker: &str,
        amount: Decimal,
        log: &mut impl TransactionRecorder,
    ) {
        self.summary = calculate_user_summary(&self.assets);
        tracing::info!(
            kind = %kind,
            asset = ticker,
            amount = %amount,
            total_supplied_usd = %self.summary.total_supplied_usd,
            total_borrowed_usd = %self.summary.total_borrowed_usd,
            health_factor = %self.summary.health_factor,
            "funding state updated"
        );
        log.record(NewTransaction::funding(kind, ticker, amount));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingAction {
    Supply,
    Withdraw,
    Borrow,
    Repay,
}

impl FundingAction {
    pub fn kind(&self) -> TransactionKind {
        match self {
            FundingAction::Supply => TransactionKind::Supply,
            FundingAction::Withdraw => TransactionKind::Withdraw,
            FundingAction::Borrow => TransactionKind::Borrow,
            FundingAction::Repay => TransactionKind::Repay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FundingError {
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("Unknown asset {0}.")]
    UnknownAsset(String),

    #[error("Insufficient wallet balance. You have {available} {ticker}, need {requested}.")]
    InsufficientWallet {
        ticker: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient supplied balance. You have supplied {supplied} {ticker}.")]
    InsufficientSupplied {
        ticker: String,
        requested: Decimal,
        supplied: Decimal,
    },

    #[error("Repay amount exceeds your borrowed amount of {borrowed} {ticker}.")]
    RepayExceedsDebt {
        ticker: String,
        requested: Decimal,
        borrowed: Decimal,
    },

    #[error("Borrow amount (${requested}) exceeds your available borrow limit of approx. ${available}.")]
    BorrowLimitExceeded { requested: Usd, available: Usd },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::HealthFactor;
    use crate::tx_log::TransactionLog;
    use rust_decimal_macros::dec;

    fn book() -> (FundingBook, TransactionLog) {
        (FundingBook::default(), TransactionLog::new())
    }

    #[test]
    fn supply_moves_wallet_into_pool() {
        let (mut book, mut log) = book();
        book.supply("DAI", "400", &mut log).unwrap();

        assert_eq!(book.asset("DAI").unwrap().user_supplied, dec!(400));
        assert_eq!(book.wallet_balance("DAI"), dec!(600));
        assert_eq!(book.summary().total_supplied_usd.value(), dec!(400));
        assert_eq!(log.latest().unwrap().summary, "Supplied 400 DAI to funding pool.");
    }

    #[test]
    fn supply_then_withdraw_round_trips() {
        let (mut book, mut log) = book();
        book.supply("WETH", "2", &mut log).unwrap();
        let before = book.asset("WETH").unwrap().user_supplied;

        book.supply("WETH", "1.5", &mut log).unwrap();
        book.withdraw("WETH", "1.5", &mut log).unwrap();

        assert_eq!(book.asset("WETH").unwrap().user_supplied, before);
        assert_eq!(book.wallet_balance("WETH"), dec!(3));
    }

    #[test]
    fn withdraw_more_than_supplied_changes_nothing() {
        let (mut book, mut log) = book();
        book.supply("DAI", "100", &mut log).unwrap();
        let snapshot = book.clone();
        let entries = log.len();

        let err = book.withdraw("DAI", "100.01", &mut log).unwrap_err();
        assert!(matches!(err, FundingError::InsufficientSupplied { .. }));
        assert_eq!(book.assets(), snapshot.assets());
        assert_eq!(book.wallet(), snapshot.wallet());
        assert_eq!(log.len(), entries);
    }

    #[test]
    fn invalid_amounts_rejected() {
        let (mut book, mut log) = book();
        assert_eq!(book.supply("DAI", "0", &mut log), Err(FundingError::Amount(AmountError::NotPositive)));
        assert_eq!(book.supply("DAI", "", &mut log), Err(FundingError::Amount(AmountError::Missing)));
        assert_eq!(book.supply("BTC", "1", &mut log), Err(FundingError::UnknownAsset("BTC".to_string())));
        assert!(log.is_empty());
    }

    #[test]
    fn supply_beyond_wallet_rejected() {
        let (mut book, mut log) = book();
        let err = book.supply("WETH", "6", &mut log).unwrap_err();
        assert!(matches!(err, FundingError::InsufficientWallet { .. }));
        assert_eq!(book.asset("WETH").unwrap().user_supplied, Decimal::ZERO);
    }

    #[test]
    fn borrow_too_large_to_value_is_rejected() {
        let (mut book, mut log) = book();
        book.supply("WETH", "1", &mut log).unwrap();
        let entries = log.len();

        let err = book.borrow("WETH", "79228162514264337593543950335", &mut log).unwrap_err();
        assert_eq!(err, FundingError::Amount(AmountError::TooLarge));
        assert_eq!(err.to_string(), "Amount is too large.");
        assert_eq!(book.asset("WETH").unwrap().user_borrowed, Decimal::ZERO);
        assert_eq!(log.len(), entries);
    }

    #[test]
    fn borrow_requires_collateral() {
        let (mut book, mut log) = book();
        let err = book.borrow("DAI", "1", &mut log).unwrap_err();
        assert!(matches!(err, FundingError::BorrowLimitExceeded { .. }));

        book.supply("WETH", "1", &mut log).unwrap(); // 1600 usd borrowing power
        book.borrow("DAI", "800", &mut log).unwrap();

        assert_eq!(book.summary().health_factor, HealthFactor::Ratio(dec!(2)));
        assert_eq!(book.wallet_balance("DAI"), dec!(1800));
        assert_eq!(book.available_to_borrow().value(), dec!(800));
    }

    #[test]
    fn borrow_then_repay_round_trips() {
        let (mut book, mut log) = book();
        book.supply("USDC", "2000", &mut log).unwrap();
        book.borrow("DAI", "300", &mut log).unwrap();
        let before = book.asset("DAI").unwrap().user_borrowed;

        book.borrow("DAI", "200", &mut log).unwrap();
        book.repay("DAI", "200", &mut log).unwrap();

        assert_eq!(book.asset("DAI").unwrap().user_borrowed, before);
    }

    #[test]
    fn repay_bounded_by_debt_and_wallet() {
        let (mut book, mut log) = book();
        book.supply("WETH", "2", &mut log).unwrap();
        book.borrow("USDC", "100", &mut log).unwrap();

        let err = book.repay("USDC", "150", &mut log).unwrap_err();
        assert!(matches!(err, FundingError::RepayExceedsDebt { .. }));

        book.wallet_mut().set("USDC", dec!(50));
        let err = book.repay("USDC", "60", &mut log).unwrap_err();
        assert!(matches!(err, FundingError::InsufficientWallet { .. }));
        assert_eq!(book.asset("USDC").unwrap().user_borrowed, dec!(100));
    }

    #[test]
    fn preflight_matches_execute() {
        let (mut book, mut log) = book();
        assert!(book.preflight(FundingAction::Withdraw, "DAI", dec!(1)).is_err());
        assert!(book.preflight(FundingAction::Supply, "DAI", dec!(1000)).is_ok());
        assert!(book.preflight(FundingAction::Supply, "DAI", dec!(-1)).is_err());
        // preflight alone never mutates
        assert_eq!(book.wallet_balance("DAI"), dec!(1000));

        book.execute(FundingAction::Supply, "DAI", dec!(1000), &mut log).unwrap();
        assert_eq!(book.wallet_balance("DAI"), Decimal::ZERO);
        assert_eq!(log.latest().unwrap().kind, TransactionKind::Supply);
    }

    #[test]
    fn full_repay_resets_health_factor() {
        let (mut book, mut log) = book();
        book.supply("DAI", "1000", &mut log).unwrap();
        book.borrow("USDC", "500", &mut log).unwrap();
        book.repay("USDC", "500", &mut log).unwrap();
        assert_eq!(book.summary().health_factor, HealthFactor::NotApplicable);
    }
}
