// 3.0: user funding summary. pure function of the asset list, recomputed on every mutation.
// health factor = sum(eligible supplied usd * collateral factor) / total borrowed usd.

use crate::asset::FundingAsset;
use crate::types::{round_2dp, Pct, Usd};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// N/A when nothing is borrowed. ratio otherwise, already rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthFactor {
    NotApplicable,
    Ratio(Decimal),
}

impl HealthFactor {
    pub fn ratio(&self) -> Option<Decimal> {
        match self {
            HealthFactor::NotApplicable => None,
            HealthFactor::Ratio(r) => Some(*r),
        }
    }

    // below 1.0 the position would be liquidated on chain
    pub fn is_at_risk(&self) -> bool {
        matches!(self, HealthFactor::Ratio(r) if *r < Decimal::ONE)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthFactor::NotApplicable => f.write_str("N/A"),
            HealthFactor::Ratio(r) => write!(f, "{:.2}", r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub total_supplied_usd: Usd,
    pub total_borrowed_usd: Usd,
    pub health_factor: HealthFactor,
    pub available_to_borrow_usd: Usd,
    pub net_apy: Pct,
}

impl Default for UserSummary {
    fn default() -> Self {
        calculate_user_summary(&[])
    }
}

// 3.1: the calculator. no side effects, same input gives same output.
pub fn calculate_user_summary(assets: &[FundingAsset]) -> UserSummary {
    let total_supplied: Usd = assets.iter().map(|a| a.supplied_usd()).sum();
    let total_borrowed: Usd = assets.iter().map(|a| a.borrowed_usd()).sum();
    let weighted_collateral: Usd = assets.iter().map(|a| a.weighted_collateral_usd()).sum();

    UserSummary {
        total_supplied_usd: total_supplied.rounded(),
        total_borrowed_usd: total_borrowed.rounded(),
        health_factor: health_factor(weighted_collateral, total_borrowed),
        available_to_borrow_usd: available_to_borrow(weighted_collateral, total_borrowed).rounded(),
        net_apy: net_apy(assets, total_supplied),
    }
}

pub fn health_factor(weighted_collateral: Usd, total_borrowed: Usd) -> HealthFactor {
    if total_borrowed.value() <= Decimal::ZERO {
        return HealthFactor::NotApplicable;
    }
    // borrowing with no eligible collateral gives 0 / borrowed = 0.00
    HealthFactor::Ratio(round_2dp(weighted_collateral.value() / total_borrowed.value()))
}

// 3.2: headroom left under the collateral-derived borrow limit. never negative.
pub fn available_to_borrow(weighted_collateral: Usd, total_borrowed: Usd) -> Usd {
    weighted_collateral.sub(total_borrowed).max_zero()
}

pub fn available_to_borrow_for(assets: &[FundingAsset]) -> Usd {
    let weighted: Usd = assets.iter().map(|a| a.weighted_collateral_usd()).sum();
    let borrowed: Usd = assets.iter().map(|a| a.borrowed_usd()).sum();
    available_to_borrow(weighted, borrowed)
}

// 3.3: supply yield minus borrow cost, over supplied value. 0 when nothing is supplied.
fn net_apy(assets: &[FundingAsset], total_supplied: Usd) -> Pct {
    if total_supplied.is_zero() {
        return Pct::new(Decimal::ZERO);
    }
    let earned: Decimal = assets
        .iter()
        .map(|a| a.supplied_usd().value() * a.supply_apy.as_fraction())
        .sum();
    let paid: Decimal = assets
        .iter()
        .map(|a| a.borrowed_usd().value() * a.borrow_apy.as_fraction())
        .sum();
    Pct::new(round_2dp((earned - paid) / total_supplied.value() * dec!(100)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::seed_assets;

    fn assets_with(f: impl Fn(&mut FundingAsset)) -> Vec<FundingAsset> {
        let mut assets = seed_assets();
        assets.iter_mut().for_each(|a| f(a));
        assets
    }

    #[test]
    fn empty_account_summary() {
        let summary = calculate_user_summary(&seed_assets());
        assert_eq!(summary.total_supplied_usd, Usd::zero());
        assert_eq!(summary.total_borrowed_usd, Usd::zero());
        assert_eq!(summary.health_factor, HealthFactor::NotApplicable);
        assert_eq!(summary.health_factor.to_string(), "N/A");
        assert_eq!(summary.net_apy.value(), Decimal::ZERO);
    }

    #[test]
    fn supply_only_is_not_applicable() {
        let assets = assets_with(|a| {
            if a.ticker == "DAI" {
                a.user_supplied = dec!(1000);
            }
        });
        let summary = calculate_user_summary(&assets);
        assert_eq!(summary.total_supplied_usd.value(), dec!(1000));
        assert_eq!(summary.health_factor, HealthFactor::NotApplicable);
        // 1000 * 75%
        assert_eq!(summary.available_to_borrow_usd.value(), dec!(750));
    }

    #[test]
    fn health_factor_weighted_by_collateral_factor() {
        let assets = assets_with(|a| match a.ticker.as_str() {
            "WETH" => a.user_supplied = dec!(1), // 2000 usd, 80% → 1600
            "DAI" => a.user_borrowed = dec!(800),
            _ => {}
        });
        let summary = calculate_user_summary(&assets);
        assert_eq!(summary.health_factor, HealthFactor::Ratio(dec!(2.00)));
        assert_eq!(summary.health_factor.to_string(), "2.00");
        assert_eq!(summary.available_to_borrow_usd.value(), dec!(800));
    }

    #[test]
    fn borrowing_without_eligible_collateral_is_zero() {
        let assets = assets_with(|a| match a.ticker.as_str() {
            "HYDRO" => a.user_supplied = dec!(100000),
            "USDC" => a.user_borrowed = dec!(10),
            _ => {}
        });
        let summary = calculate_user_summary(&assets);
        assert_eq!(summary.health_factor.to_string(), "0.00");
        assert!(summary.health_factor.is_at_risk());
        assert_eq!(summary.available_to_borrow_usd, Usd::zero());
    }

    #[test]
    fn health_factor_rounds_to_two_decimals() {
        let hf = health_factor(Usd::new(dec!(1000)), Usd::new(dec!(300)));
        assert_eq!(hf, HealthFactor::Ratio(dec!(3.33)));
        assert_eq!(hf.ratio(), Some(dec!(3.33)));
        assert_eq!(HealthFactor::NotApplicable.ratio(), None);
    }

    #[test]
    fn net_apy_nets_borrow_cost() {
        let assets = assets_with(|a| match a.ticker.as_str() {
            "DAI" => {
                a.user_supplied = dec!(1000); // earns 51.2
                a.user_borrowed = dec!(100); // costs 7.34
            }
            _ => {}
        });
        let summary = calculate_user_summary(&assets);
        // (51.2 - 7.34) / 1000 = 4.386%
        assert_eq!(summary.net_apy.value(), dec!(4.39));
    }
}
