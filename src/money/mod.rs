use std::fmt;
use std::ops::{Mul, Neg};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::{Currency, ExchangeRateProvider};
use crate::errors::LedgerError;

pub mod household;

pub use household::HouseholdMoney;

/// Amounts below this are treated as zero throughout the ledger: split
/// pruning, checksum validation, realization detection.
pub const ZERO_TOLERANCE: f64 = 0.005;

/// A dated amount in a single currency.
///
/// The date is part of the value: conversions look their rate up at the
/// money's own date unless a caller revalues explicitly via [`Money::valued_at`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Currency,
    pub date: NaiveDate,
}

impl Money {
    pub fn new(amount: f64, currency: Currency, date: NaiveDate) -> Self {
        Self {
            amount,
            currency,
            date,
        }
    }

    pub fn zero(currency: Currency, date: NaiveDate) -> Self {
        Self::new(0.0, currency, date)
    }

    /// Adds `rhs`, converting it into this money's currency at the rate of
    /// the `rhs` date. The result carries the later of the two dates.
    pub fn add(
        &self,
        rhs: &Money,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<Money, LedgerError> {
        let rate = provider.rate(rhs.date, rhs.currency, self.currency)?;
        Ok(Money::new(
            self.amount + rhs.amount * rate,
            self.currency,
            self.date.max(rhs.date),
        ))
    }

    pub fn sub(
        &self,
        rhs: &Money,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<Money, LedgerError> {
        self.add(&-*rhs, provider)
    }

    pub fn try_div(&self, divisor: f64) -> Result<Money, LedgerError> {
        if divisor.abs() < f64::EPSILON {
            return Err(LedgerError::DivideByZero);
        }
        Ok(Money::new(self.amount / divisor, self.currency, self.date))
    }

    /// Converts into `target` at this money's own date.
    pub fn convert_to(
        &self,
        target: Currency,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<Money, LedgerError> {
        let rate = provider.rate(self.date, self.currency, target)?;
        Ok(Money::new(self.amount * rate, target, self.date))
    }

    /// Revalues into `target` at an explicit date; the result carries that
    /// date. This is how statement aggregation measures currency drift.
    pub fn valued_at(
        &self,
        date: NaiveDate,
        target: Currency,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<Money, LedgerError> {
        let rate = provider.rate(date, self.currency, target)?;
        Ok(Money::new(self.amount * rate, target, date))
    }

    /// Rounds half away from zero to cents.
    pub fn rounded(&self) -> Money {
        Money::new(
            (self.amount * 100.0).round() / 100.0,
            self.currency,
            self.date,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.amount.abs() < ZERO_TOLERANCE
    }

    /// Parses the display form back into a value.
    ///
    /// Accepted shapes, in order: optional `(...)` wrapping or leading `-`
    /// for negatives, an optional three-letter code or one-character symbol
    /// prefix, then a comma-grouped decimal. Without a prefix the amount is
    /// read as USD. Anything else is a [`LedgerError::ParseMoney`].
    pub fn parse(text: &str, date: NaiveDate) -> Result<Money, LedgerError> {
        let mut body = text.trim();
        let mut sign = 1.0;
        if let Some(inner) = body.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            sign = -sign;
            body = inner.trim();
        }
        if let Some(rest) = body.strip_prefix('-') {
            sign = -sign;
            body = rest.trim_start();
        }
        let mut currency = Currency::BASE;
        if let Some(first) = body.chars().next() {
            if let Some(found) = Currency::from_symbol(first) {
                currency = found;
                body = &body[first.len_utf8()..];
            } else if body.len() >= 3 && body.is_char_boundary(3) {
                if let Some(found) = Currency::from_code(&body[..3]) {
                    currency = found;
                    body = &body[3..];
                }
            }
        }
        let cleaned: String = body.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err(LedgerError::ParseMoney(text.to_string()));
        }
        let value: f64 = cleaned
            .parse()
            .map_err(|_| LedgerError::ParseMoney(text.to_string()))?;
        Ok(Money::new(sign * value, currency, date))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::new(-self.amount, self.currency, self.date)
    }
}

impl Mul<f64> for Money {
    type Output = Money;

    fn mul(self, factor: f64) -> Money {
        Money::new(self.amount * factor, self.currency, self.date)
    }
}

impl fmt::Display for Money {
    /// Symbol-prefixed, comma-grouped, two decimals; negatives wrap in
    /// parentheses: `$1,234.50`, `($100.00)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = format!("{:.2}", self.amount.abs());
        let grouped = match body.find('.') {
            Some(pos) => format!("{}{}", group_digits(&body[..pos]), &body[pos..]),
            None => group_digits(&body),
        };
        if self.amount < 0.0 {
            write!(f, "({}{})", self.currency.symbol(), grouped)
        } else {
            write!(f, "{}{}", self.currency.symbol(), grouped)
        }
    }
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::new();
    let mut count = 0;
    for ch in digits.chars().rev() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, ',');
        }
        grouped.insert(0, ch);
        count += 1;
    }
    grouped
}
