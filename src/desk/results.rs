// 8.0.2: outcome and error types for desk actions.

use crate::funding::FundingError;
use crate::margin::MarginError;
use crate::service::ServiceResponse;
use crate::types::AmountError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the UI shows after an action: a flag, a message and the mock hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub tx_hash: Option<String>,
    /// Set when the action opened or touched a margin position.
    pub position_id: Option<String>,
}

impl ActionOutcome {
    pub(super) fn from_response(response: ServiceResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            tx_hash: response.tx_hash,
            position_id: None,
        }
    }

    pub(super) fn with_position(mut self, position_id: &str) -> Self {
        self.position_id = Some(position_id.to_string());
        self
    }

    pub(super) fn failed(err: &DeskError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            tx_hash: None,
            position_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Funding(#[from] FundingError),

    #[error(transparent)]
    Margin(#[from] MarginError),

    #[error("Unknown trading pair {0}.")]
    UnknownPair(String),

    #[error("Order for {base}/{quote} does not match pair {pair}.")]
    PairMismatch { pair: String, base: String, quote: String },

    #[error("No price available for {0}.")]
    NoPrice(String),

    #[error("Insufficient {ticker} in wallet. You have {available}, need {requested}.")]
    InsufficientWallet {
        ticker: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Only full closes are supported, got portion {0}.")]
    PartialClose(Decimal),

    /// The service answered `success: false`; its message is passed through.
    #[error("{0}")]
    ServiceRejected(String),
}
