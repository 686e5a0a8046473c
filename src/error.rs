use thiserror::Error;

/// Top-level error type for the entire crate
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Split configuration error: {0}")]
    Split(#[from] SplitError),

    #[error("Payout error: {0}")]
    Payout(#[from] PayoutError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Split computation errors
///
/// These are configuration errors: raised before anything is submitted to
/// the ledger, fully recoverable by correcting input, never partially
/// applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("split percentages must sum to 100, got {total_percent}")]
    InvalidConfiguration { total_percent: f64 },

    #[error("split rule set is empty")]
    EmptyRules,
}

/// Bulk payout errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayoutError {
    #[error("recipient list is empty")]
    EmptyRun,

    #[error("recipient list must have a header row and at least one data row")]
    MissingRows,

    #[error("recipient list must have an \"address\" or \"wallet\" column")]
    MissingAddressColumn,

    #[error("recipient list must have an \"amount\" column")]
    MissingAmountColumn,

    #[error("invalid address on line {line}: {address}")]
    InvalidAddress { line: usize, address: String },

    #[error("invalid amount on line {line}: {amount}")]
    InvalidAmount { line: usize, amount: String },

    #[error("payout run rejected: {} validation error(s)", .errors.len())]
    ValidationFailed { errors: Vec<String> },
}

/// Ledger submission errors
///
/// Raised by `LedgerClient` implementations. These are the only genuinely
/// exceptional (I/O-bound) failures in the pipeline; validation upstream is
/// expressed as result values instead.
#[derive(Error, Debug, Clone)]
pub enum SubmissionError {
    #[error("batch submission rejected: {0}")]
    BatchRejected(String),

    #[error("transfer to {to} rejected: {message}")]
    TransferRejected { to: String, message: String },

    #[error("ledger transport failure: {0}")]
    Transport(String),

    #[error("transfer subscription unavailable: {0}")]
    SubscriptionUnavailable(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

/// Result type alias for the crate
pub type AppResult<T> = Result<T, AppError>;
