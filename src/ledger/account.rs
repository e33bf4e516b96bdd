use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::currency::Currency;

/// Which financial statement an account type reports on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
}

/// Account classification. Declaration order is the report order, so maps
/// keyed by type iterate assets first and equity last.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum AccountType {
    Asset,
    Liability,
    Revenue,
    Expense,
    Equity,
}

impl AccountType {
    pub fn statement(self) -> StatementKind {
        match self {
            AccountType::Asset | AccountType::Liability | AccountType::Equity => {
                StatementKind::BalanceSheet
            }
            AccountType::Revenue | AccountType::Expense => StatementKind::IncomeStatement,
        }
    }

    /// Double-entry checksum sign. With these signs every balanced
    /// transaction folds to zero: debits (assets, expenses) count positive,
    /// credits (liabilities, revenues, equity) negative.
    pub fn sign(self) -> f64 {
        match self {
            AccountType::Asset | AccountType::Expense => 1.0,
            AccountType::Liability | AccountType::Revenue | AccountType::Equity => -1.0,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
            AccountType::Equity => "Equity",
        };
        f.write_str(label)
    }
}

/// A ledger account identified by its `(type, category, name)` triple.
///
/// Currency and the investment tag are catalog metadata: two accounts with
/// the same triple are the same account regardless of them. Only balance
/// sheet accounts may carry a non-USD currency; income statement and equity
/// accounts always post in USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_type: AccountType,
    pub category: String,
    pub name: String,
    pub currency: Currency,
    pub is_investment: bool,
}

impl Account {
    pub fn asset(
        category: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            account_type: AccountType::Asset,
            category: category.into(),
            name: name.into(),
            currency,
            is_investment: false,
        }
    }

    /// Asset account flagged for currency-risk tracking and rate-of-return
    /// analysis. Realized gains post to the paired revenue account.
    pub fn investment(
        category: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            is_investment: true,
            ..Self::asset(category, name, currency)
        }
    }

    pub fn liability(
        category: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            account_type: AccountType::Liability,
            category: category.into(),
            name: name.into(),
            currency,
            is_investment: false,
        }
    }

    pub fn revenue(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_type: AccountType::Revenue,
            category: category.into(),
            name: name.into(),
            currency: Currency::BASE,
            is_investment: false,
        }
    }

    pub fn expense(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_type: AccountType::Expense,
            category: category.into(),
            name: name.into(),
            currency: Currency::BASE,
            is_investment: false,
        }
    }

    pub fn equity(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_type: AccountType::Equity,
            category: category.into(),
            name: name.into(),
            currency: Currency::BASE,
            is_investment: false,
        }
    }

    pub fn statement(&self) -> StatementKind {
        self.account_type.statement()
    }

    pub fn sign(&self) -> f64 {
        self.account_type.sign()
    }

    /// Paired revenue account receiving this investment's realized gains.
    pub fn gain_account(&self) -> Account {
        Account::revenue("Investment", self.name.clone())
    }

    /// Paired liability account carrying loans taken against this asset.
    pub fn loan_account(&self) -> Account {
        Account::liability("Loan", self.name.clone(), Currency::BASE)
    }

    fn key(&self) -> (AccountType, &str, &str) {
        (self.account_type, &self.category, &self.name)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Account {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Account {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.account_type, self.category, self.name)
    }
}
