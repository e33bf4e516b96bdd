#![doc(test(attr(deny(warnings))))]

//! Ledger Core is a multi-currency, household-split, double-entry
//! accounting engine: dated money values with rate-table conversion,
//! zero-sum transactions, monthly financial statements with retained
//! earnings and currency-drift tracking, and investment rate-of-return
//! analysis. Storage, rate fetching, and presentation are the caller's
//! concern.

pub mod currency;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Ledger Core tracing initialized.");
    });
}
