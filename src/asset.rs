//! Funding assets and their static market data.
//!
//! Each asset carries the market parameters shown in the lending table
//! (APYs, collateral factor, pool liquidity, oracle price) plus the user's
//! supplied and borrowed amounts. Only the user fields ever change.

use crate::types::{Pct, Price, Usd};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingAsset {
    pub ticker: String,
    pub supply_apy: Pct,
    pub borrow_apy: Pct,
    pub collateral_factor: Pct,
    pub can_be_collateral: bool,
    /// Pool liquidity in units of the asset.
    pub liquidity: Decimal,
    pub price: Price,
    pub user_supplied: Decimal,
    pub user_borrowed: Decimal,
}

impl FundingAsset {
    pub fn new(
        ticker: &str,
        supply_apy: Decimal,
        borrow_apy: Decimal,
        collateral_factor: Decimal,
        can_be_collateral: bool,
        liquidity: Decimal,
        price: Price,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            supply_apy: Pct::new(supply_apy),
            borrow_apy: Pct::new(borrow_apy),
            collateral_factor: Pct::new(collateral_factor),
            can_be_collateral,
            liquidity,
            price,
            user_supplied: Decimal::ZERO,
            user_borrowed: Decimal::ZERO,
        }
    }

    pub fn supplied_usd(&self) -> Usd {
        Usd::new(self.user_supplied * self.price.value())
    }

    pub fn borrowed_usd(&self) -> Usd {
        Usd::new(self.user_borrowed * self.price.value())
    }

    /// Borrowing power this asset contributes: supplied value × collateral factor.
    /// Zero for assets that cannot back a loan.
    pub fn weighted_collateral_usd(&self) -> Usd {
        if !self.can_be_collateral {
            return Usd::zero();
        }
        self.supplied_usd().mul(self.collateral_factor.as_fraction())
    }

    pub fn liquidity_label(&self) -> String {
        format!("{} {}", self.liquidity.normalize(), self.ticker)
    }
}

/// Lending markets as listed at launch: DAI, WETH, USDC, HYDRO.
pub fn seed_assets() -> Vec<FundingAsset> {
    vec![
        FundingAsset::new("DAI", dec!(5.12), dec!(7.34), dec!(75), true, dec!(1_500_000), Price::new_unchecked(dec!(1))),
        FundingAsset::new("WETH", dec!(3.05), dec!(4.22), dec!(80), true, dec!(2_000), Price::new_unchecked(dec!(2000))),
        FundingAsset::new("USDC", dec!(4.88), dec!(6.95), dec!(75), true, dec!(1_200_000), Price::new_unchecked(dec!(1))),
        // HYDRO is listed but not accepted as collateral yet
        FundingAsset::new("HYDRO", dec!(2.50), dec!(3.75), dec!(60), false, dec!(10_000_000), Price::new_unchecked(dec!(0.05))),
    ]
}

/// Balances held in the user's external wallet, per ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletBalances {
    balances: BTreeMap<String, Decimal>,
}

impl WalletBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let mut wallet = Self::new();
        wallet.set("DAI", dec!(1000));
        wallet.set("WETH", dec!(5));
        wallet.set("USDC", dec!(2500));
        wallet.set("HYDRO", dec!(50000));
        wallet
    }

    pub fn balance(&self, ticker: &str) -> Decimal {
        self.balances.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set(&mut self, ticker: &str, amount: Decimal) {
        self.balances.insert(ticker.to_string(), amount);
    }

    pub fn credit(&mut self, ticker: &str, amount: Decimal) {
        let current = self.balance(ticker);
        self.set(ticker, current + amount);
    }

    /// Callers check the balance first; debit itself does not refuse.
    pub fn debit(&mut self, ticker: &str, amount: Decimal) {
        let current = self.balance(ticker);
        self.set(ticker, current - amount);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.balances.iter()
    }
}
