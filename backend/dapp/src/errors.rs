//! Application-wide error types.

use thiserror::Error;

/// Why a write action did not reach a successful on-chain outcome.
///
/// Every variant is shown to the user as the same "Transaction Failed"
/// notification; the distinction only survives in logs and return values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxFailure {
    #[error("failed to build transaction: {0}")]
    BuildFailed(String),

    #[error("signature rejected: {0}")]
    SignRejected(String),

    #[error("failed to submit transaction: {0}")]
    SubmitFailed(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimedOut(String),
}

#[derive(Debug, Error)]
pub enum DappError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxFailure),

    #[error("{0} already has a transaction in flight")]
    Busy(String),

    #[error("No account connected")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, DappError>;
