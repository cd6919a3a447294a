// 6.0: every user action that changes state leaves a transaction record. display only,
// append only, newest first. records never change once written.

use crate::position::MarginPosition;
use crate::types::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    MarginOpen,
    MarginAddCollateral,
    MarginClose,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Supply => "Supply",
            TransactionKind::Withdraw => "Withdraw",
            TransactionKind::Borrow => "Borrow",
            TransactionKind::Repay => "Repay",
            TransactionKind::MarginOpen => "Margin Open",
            TransactionKind::MarginAddCollateral => "Margin Add Collateral",
            TransactionKind::MarginClose => "Margin Close",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Records are only written once the action has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionDetails {
    Funding {
        asset: String,
        amount: Decimal,
    },
    MarginOpen(Box<MarginPosition>),
    MarginAddCollateral {
        position_id: String,
        asset: String,
        amount: Decimal,
        updated_position: Option<Box<MarginPosition>>,
    },
    MarginClose {
        position: Box<MarginPosition>,
        closed_portion: Decimal,
        realized_pnl: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub summary: String,
    pub status: TransactionStatus,
    pub timestamp: Timestamp,
    pub details: TransactionDetails,
}

/// What a caller hands to the log. id, timestamp and status are assigned on append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub summary: String,
    pub details: TransactionDetails,
}

impl NewTransaction {
    pub fn funding(kind: TransactionKind, asset: &str, amount: Decimal) -> Self {
        let summary = match kind {
            TransactionKind::Supply => format!("Supplied {} {} to funding pool.", amount, asset),
            TransactionKind::Withdraw => format!("Withdrew {} {} from funding pool.", amount, asset),
            TransactionKind::Borrow => format!("Borrowed {} {} from funding pool.", amount, asset),
            TransactionKind::Repay => format!("Repaid {} {} to funding pool.", amount, asset),
            other => format!("{} {} {}", other, amount, asset),
        };
        Self {
            kind,
            summary,
            details: TransactionDetails::Funding {
                asset: asset.to_string(),
                amount,
            },
        }
    }

    pub fn margin_open(position: &MarginPosition) -> Self {
        Self {
            kind: TransactionKind::MarginOpen,
            summary: format!(
                "Opened {} {} {} @ {:.2} ({} Lev)",
                position.direction,
                position.size,
                position.pair,
                position.entry_price.value(),
                position.leverage
            ),
            details: TransactionDetails::MarginOpen(Box::new(position.clone())),
        }
    }

    pub fn margin_add_collateral(
        position_id: &str,
        asset: &str,
        amount: Decimal,
        updated: Option<&MarginPosition>,
    ) -> Self {
        let short_id: String = position_id.chars().take(10).collect();
        Self {
            kind: TransactionKind::MarginAddCollateral,
            summary: format!("Added {} {} collateral to position {}...", amount, asset, short_id),
            details: TransactionDetails::MarginAddCollateral {
                position_id: position_id.to_string(),
                asset: asset.to_string(),
                amount,
                updated_position: updated.map(|p| Box::new(p.clone())),
            },
        }
    }

    pub fn margin_close(position: &MarginPosition, closed_portion: Decimal) -> Self {
        Self {
            kind: TransactionKind::MarginClose,
            summary: format!(
                "Closed {} {} {}. P&L: {:.2} {}",
                position.direction,
                position.size,
                position.pair,
                position.pnl_display(),
                position.quote_asset
            ),
            details: TransactionDetails::MarginClose {
                position: Box::new(position.clone()),
                closed_portion,
                realized_pnl: position.pnl,
            },
        }
    }
}

// the seam domain operations write through. the log is injected, never global.
pub trait TransactionRecorder {
    fn record(&mut self, tx: NewTransaction) -> TransactionId;
}

#[derive(Debug)]
pub struct TransactionLog {
    records: VecDeque<TransactionRecord>,
    next_seq: u64,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            next_seq: 1,
        }
    }

    // 6.1: assigns id + timestamp, status Completed, prepends
    pub fn add(&mut self, tx: NewTransaction) -> &TransactionRecord {
        let timestamp = Timestamp::now();
        let seq = self.next_seq;
        self.next_seq += 1;

        let record = TransactionRecord {
            id: TransactionId(format!("tx_{}_{}", timestamp.as_millis(), seq)),
            kind: tx.kind,
            summary: tx.summary,
            status: TransactionStatus::default(),
            timestamp,
            details: tx.details,
        };
        tracing::debug!(id = %record.id, kind = %record.kind, summary = %record.summary, "transaction recorded");

        self.records.push_front(record);
        &self.records[0]
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&TransactionRecord> {
        self.records.front()
    }

    pub fn get(&self, index: usize) -> Option<&TransactionRecord> {
        self.records.get(index)
    }

    pub fn of_kind(&self, kind: TransactionKind) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TransactionRecorder for TransactionLog {
    fn record(&mut self, tx: NewTransaction) -> TransactionId {
        self.add(tx).id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_prepends_with_distinct_ids() {
        let mut log = TransactionLog::new();

        let a = log.add(NewTransaction::funding(TransactionKind::Supply, "DAI", dec!(100))).id.clone();
        let b = log.add(NewTransaction::funding(TransactionKind::Borrow, "WETH", dec!(1))).id.clone();

        assert_eq!(log.len(), 2);
        assert_ne!(a, b);
        assert_eq!(log.get(0).unwrap().id, b);
        assert_eq!(log.get(1).unwrap().id, a);
        assert_eq!(log.latest().unwrap().kind, TransactionKind::Borrow);
    }

    #[test]
    fn new_records_are_completed() {
        let mut log = TransactionLog::new();
        let record = log.add(NewTransaction::funding(TransactionKind::Repay, "USDC", dec!(5)));
        assert_eq!(record.status, TransactionStatus::Completed);
        assert_eq!(record.summary, "Repaid 5 USDC to funding pool.");
        assert!(record.id.0.starts_with("tx_"));
    }

    #[test]
    fn default_log_numbers_from_one() {
        let mut log = TransactionLog::default();
        let id = log.record(NewTransaction::funding(TransactionKind::Supply, "DAI", dec!(1)));
        assert!(id.0.ends_with("_1"), "{}", id);

        let id = log.record(NewTransaction::funding(TransactionKind::Supply, "DAI", dec!(1)));
        assert!(id.0.ends_with("_2"), "{}", id);
    }

    #[test]
    fn filter_by_kind() {
        let mut log = TransactionLog::new();
        log.record(NewTransaction::funding(TransactionKind::Supply, "DAI", dec!(1)));
        log.record(NewTransaction::funding(TransactionKind::Withdraw, "DAI", dec!(1)));
        log.record(NewTransaction::funding(TransactionKind::Supply, "WETH", dec!(1)));

        assert_eq!(log.of_kind(TransactionKind::Supply).count(), 2);
        assert_eq!(log.of_kind(TransactionKind::MarginOpen).count(), 0);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(TransactionKind::MarginAddCollateral.to_string(), "Margin Add Collateral");
        assert_eq!(TransactionKind::Withdraw.label(), "Withdraw");
    }
}
