// 1.0: all the primitives live here. every calculator in the crate works on these types.
// prices, usd amounts, leverage, percentages, timestamps. newtypes so the compiler catches mixups.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => dec!(1),
            Direction::Short => dec!(-1),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// 1.1: price of one unit of an asset in its quote (usd for funding assets). must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Usd value of `amount` units. user amounts can be near `Decimal::MAX`, so this is checked.
    pub fn value_of(&self, amount: Decimal) -> Result<Usd, AmountError> {
        amount.checked_mul(self.0).map(Usd::new).ok_or(AmountError::TooLarge)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: usd value. supplied/borrowed totals, collateral value, pnl all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usd(Decimal);

impl Usd {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: Usd) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: Usd) -> Self {
        Self(self.0 - other.0)
    }

    pub fn mul(&self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }

    pub fn max_zero(&self) -> Self {
        Self(self.0.max(Decimal::ZERO))
    }

    // display form, 2 decimals
    pub fn rounded(&self) -> Self {
        Self(round_2dp(self.0))
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", round_2dp(self.0))
    }
}

impl PartialOrd for Usd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Usd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, u| acc.add(u))
    }
}

impl<'a> Sum<&'a Usd> for Usd {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, u| acc.add(*u))
    }
}

// 1.3: leverage multiplier. must be >= 1x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Leverage(Decimal);

impl Leverage {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn one() -> Self {
        Self(Decimal::ONE)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    // 2x leverage → 50% of the notional posted as margin
    pub fn initial_margin_fraction(&self) -> Decimal {
        Decimal::ONE / self.0
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0.normalize())
    }
}

// 1.4: percentage as quoted in the market tables. 75 = 75%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pct(Decimal);

impl Pct {
    pub fn new(percent: Decimal) -> Self {
        Self(percent)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        self.0 / dec!(100)
    }
}

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

// 1.5: millisecond wall clock timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

// 1.6: amounts arrive as user typed strings. must parse and be strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Please enter an amount.")]
    Missing,

    #[error("'{0}' is not a valid amount.")]
    Invalid(String),

    #[error("Amount must be greater than zero.")]
    NotPositive,

    #[error("Amount is too large.")]
    TooLarge,
}

pub fn parse_amount(raw: &str) -> Result<Decimal, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Missing);
    }
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| AmountError::Invalid(trimmed.to_string()))?;
    if value <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }
    Ok(value)
}

pub fn round_2dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Long.sign(), dec!(1));
        assert_eq!(Direction::Short.sign(), dec!(-1));
        assert_eq!(Direction::Short.to_string(), "SHORT");
    }

    #[test]
    fn leverage_margin_fraction() {
        let lev_2x = Leverage::new(dec!(2)).unwrap();
        assert_eq!(lev_2x.initial_margin_fraction(), dec!(0.5));
        assert!(Leverage::new(dec!(0.5)).is_none());
        assert_eq!(lev_2x.to_string(), "2x");
    }

    #[test]
    fn pct_conversion() {
        assert_eq!(Pct::new(dec!(75)).as_fraction(), dec!(0.75));
        assert_eq!(Pct::new(dec!(5.12)).to_string(), "5.12%");
    }

    #[test]
    fn usd_display_rounds_to_cents() {
        assert_eq!(Usd::new(dec!(1234.565)).to_string(), "1234.57");
        assert_eq!(Usd::zero().to_string(), "0.00");
        assert_eq!(Usd::new(dec!(-3)).max_zero(), Usd::zero());
    }

    #[test]
    fn parse_amount_accepts_positive_decimals() {
        assert_eq!(parse_amount("100").unwrap(), dec!(100));
        assert_eq!(parse_amount(" 0.25 ").unwrap(), dec!(0.25));
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount(""), Err(AmountError::Missing));
        assert_eq!(parse_amount("0"), Err(AmountError::NotPositive));
        assert_eq!(parse_amount("-5"), Err(AmountError::NotPositive));
        assert!(matches!(parse_amount("abc"), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn value_of_refuses_overflow() {
        let price = Price::new_unchecked(dec!(2000));
        assert_eq!(price.value_of(dec!(1.5)), Ok(Usd::new(dec!(3000))));

        let huge = parse_amount("1e28").unwrap();
        assert_eq!(price.value_of(huge), Err(AmountError::TooLarge));
        assert_eq!(price.value_of(Decimal::MAX), Err(AmountError::TooLarge));
    }

    #[test]
    fn timestamp_formats_as_iso() {
        let ts = Timestamp::from_millis(0);
        assert_eq!(ts.to_rfc3339(), "1970-01-01T00:00:00.000Z");
    }
}
