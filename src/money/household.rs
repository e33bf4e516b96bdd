use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::{Currency, ExchangeRateProvider};
use crate::errors::LedgerError;
use crate::money::Money;

/// One amount split across household members, all in a single currency.
///
/// Members whose share nets to zero are dropped from the map, so an empty
/// container means "nothing here" with no ghost entries. Callers convert
/// before adding; a mismatched currency is an error, not an implicit
/// conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdMoney {
    currency: Currency,
    date: NaiveDate,
    entries: BTreeMap<String, Money>,
}

impl HouseholdMoney {
    pub fn new(currency: Currency, date: NaiveDate) -> Self {
        Self {
            currency,
            date,
            entries: BTreeMap::new(),
        }
    }

    /// Container holding one entry under the given household label, or no
    /// entry at all when the money is zero.
    pub fn single(household: impl Into<String>, money: &Money) -> Self {
        let mut entries = BTreeMap::new();
        if !money.is_zero() {
            entries.insert(household.into(), *money);
        }
        Self {
            currency: money.currency,
            date: money.date,
            entries,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Latest money date seen by this container.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn add(
        &mut self,
        household: impl Into<String>,
        money: &Money,
    ) -> Result<(), LedgerError> {
        if money.currency != self.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                found: money.currency,
            });
        }
        let name = household.into();
        match self.entries.get_mut(&name) {
            Some(entry) => {
                entry.amount += money.amount;
                entry.date = entry.date.max(money.date);
                if entry.is_zero() {
                    self.entries.remove(&name);
                }
            }
            None => {
                if !money.is_zero() {
                    self.entries.insert(name, *money);
                }
            }
        }
        self.date = self.date.max(money.date);
        Ok(())
    }

    pub fn minus(
        &mut self,
        household: impl Into<String>,
        money: &Money,
    ) -> Result<(), LedgerError> {
        self.add(household, &-*money)
    }

    /// Adds every entry of `other` into this container.
    pub fn merge(&mut self, other: &HouseholdMoney) -> Result<(), LedgerError> {
        for (name, money) in &other.entries {
            self.add(name.clone(), money)?;
        }
        self.date = self.date.max(other.date);
        Ok(())
    }

    /// Converts the container and every entry into `target`, each entry at
    /// its own date. Fails as a whole: the original is untouched on error.
    pub fn convert_to(
        &self,
        target: Currency,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<HouseholdMoney, LedgerError> {
        let mut converted = HouseholdMoney::new(target, self.date);
        for (name, money) in &self.entries {
            let value = money.convert_to(target, provider)?;
            converted.add(name.clone(), &value)?;
        }
        Ok(converted)
    }

    pub fn negated(&self) -> HouseholdMoney {
        let mut flipped = self.clone();
        for money in flipped.entries.values_mut() {
            money.amount = -money.amount;
        }
        flipped
    }

    /// Folds all entries into one amount in the container currency.
    pub fn sum(&self) -> Money {
        let mut total = Money::zero(self.currency, self.date);
        for money in self.entries.values() {
            total.amount += money.amount;
        }
        total
    }

    pub fn get(&self, household: &str) -> Option<&Money> {
        self.entries.get(household)
    }

    /// Entries in household-name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Money)> {
        self.entries.iter().map(|(name, money)| (name.as_str(), money))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
