use chrono::NaiveDate;
use thiserror::Error;

use crate::currency::Currency;

/// Error type that captures common ledger failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("currency mismatch: expected {expected}, got {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },
    #[error("invalid posting: {0}")]
    InvalidPosting(String),
    #[error("no exchange rate for {from}/{to} on {date}")]
    RateUnavailable {
        from: Currency,
        to: Currency,
        date: NaiveDate,
    },
    #[error("unparsable money text `{0}`")]
    ParseMoney(String),
    #[error("division of money by zero")]
    DivideByZero,
    #[error("rate solver did not converge within {0} iterations")]
    DidNotConverge(usize),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
