use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Closed set of currencies the ledger understands.
///
/// USD is the reporting currency: equity accounts and the income statement
/// are always expressed in it, and every checksum folds into it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Cny,
    Gbp,
}

impl Currency {
    /// Reporting currency for statements and analytics.
    pub const BASE: Currency = Currency::Usd;

    pub fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
            Currency::Gbp => "GBP",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Currency::Eur => '€',
            Currency::Usd => '$',
            Currency::Cny => '¥',
            Currency::Gbp => '£',
        }
    }

    pub fn from_code(code: &str) -> Option<Currency> {
        match code {
            "EUR" => Some(Currency::Eur),
            "USD" => Some(Currency::Usd),
            "CNY" => Some(Currency::Cny),
            "GBP" => Some(Currency::Gbp),
            _ => None,
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Currency> {
        match symbol {
            '€' => Some(Currency::Eur),
            '$' => Some(Currency::Usd),
            '¥' => Some(Currency::Cny),
            '£' => Some(Currency::Gbp),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::BASE
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Capability for date-dependent currency conversion.
///
/// The engine never fetches rates itself; callers hand an implementation to
/// every operation that can convert. Parity pairs must yield 1.0 without
/// consulting any source.
pub trait ExchangeRateProvider {
    fn rate(&self, date: NaiveDate, from: Currency, to: Currency) -> Result<f64, LedgerError>;
}

/// Matching tolerance for rate lookups, in days before the requested date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateTolerance {
    pub days: i64,
}

impl Default for RateTolerance {
    fn default() -> Self {
        Self { days: 5 }
    }
}

/// In-memory exchange-rate store, one dated series per currency pair.
///
/// Lookups prefer an exact date hit, then the nearest prior date within the
/// tolerance, then the inverse pair. Serves both as a cache in front of a
/// remote source and as a fixture in tests.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(Currency, Currency), BTreeMap<NaiveDate, f64>>,
    pub tolerance: RateTolerance,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, from: Currency, to: Currency, rate: f64) {
        if from == to {
            return;
        }
        self.rates.entry((from, to)).or_default().insert(date, rate);
    }

    pub fn remove(&mut self, date: NaiveDate, from: Currency, to: Currency) {
        if let Some(series) = self.rates.get_mut(&(from, to)) {
            series.remove(&date);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.values().all(BTreeMap::is_empty)
    }

    fn lookup_within(&self, series: &BTreeMap<NaiveDate, f64>, date: NaiveDate) -> Option<f64> {
        if let Some(rate) = series.get(&date) {
            return Some(*rate);
        }
        let (near_date, rate) = series.range(..=date).next_back()?;
        if (date - *near_date).num_days() <= self.tolerance.days {
            tracing::debug!(
                requested = %date,
                used = %near_date,
                "rate lookup fell back to nearest prior date"
            );
            Some(*rate)
        } else {
            None
        }
    }
}

impl ExchangeRateProvider for RateTable {
    fn rate(&self, date: NaiveDate, from: Currency, to: Currency) -> Result<f64, LedgerError> {
        if from == to {
            return Ok(1.0);
        }
        if let Some(series) = self.rates.get(&(from, to)) {
            if let Some(rate) = self.lookup_within(series, date) {
                return Ok(rate);
            }
        }
        if let Some(series) = self.rates.get(&(to, from)) {
            if let Some(rate) = self.lookup_within(series, date) {
                if rate.abs() > f64::EPSILON {
                    return Ok(1.0 / rate);
                }
            }
        }
        Err(LedgerError::RateUnavailable { from, to, date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parity_rate_is_identity() {
        let table = RateTable::new();
        let rate = table
            .rate(day(2024, 3, 1), Currency::Usd, Currency::Usd)
            .expect("parity rate");
        assert!((rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lookup_uses_nearest_prior_within_tolerance() {
        let mut table = RateTable::new();
        table.insert(day(2024, 3, 1), Currency::Eur, Currency::Usd, 1.1);

        let rate = table
            .rate(day(2024, 3, 4), Currency::Eur, Currency::Usd)
            .expect("rate within tolerance");
        assert!((rate - 1.1).abs() < f64::EPSILON);

        let err = table
            .rate(day(2024, 3, 20), Currency::Eur, Currency::Usd)
            .expect_err("no rate beyond tolerance");
        assert!(matches!(err, LedgerError::RateUnavailable { .. }));
    }

    #[test]
    fn future_rates_are_never_used() {
        let mut table = RateTable::new();
        table.insert(day(2024, 3, 10), Currency::Eur, Currency::Usd, 1.2);

        let err = table
            .rate(day(2024, 3, 8), Currency::Eur, Currency::Usd)
            .expect_err("only prior rates qualify");
        assert!(matches!(err, LedgerError::RateUnavailable { .. }));
    }

    #[test]
    fn inverse_pair_is_consulted() {
        let mut table = RateTable::new();
        table.insert(day(2024, 3, 1), Currency::Eur, Currency::Usd, 1.25);

        let rate = table
            .rate(day(2024, 3, 1), Currency::Usd, Currency::Eur)
            .expect("inverse rate");
        assert!((rate - 0.8).abs() < 1e-12);
    }

    #[test]
    fn code_and_symbol_tables_round_trip() {
        for currency in [Currency::Eur, Currency::Usd, Currency::Cny, Currency::Gbp] {
            assert_eq!(Currency::from_code(currency.code()), Some(currency));
            assert_eq!(Currency::from_symbol(currency.symbol()), Some(currency));
        }
        assert_eq!(Currency::from_code("JPY"), None);
        assert_eq!(Currency::from_symbol('j'), None);
    }
}
