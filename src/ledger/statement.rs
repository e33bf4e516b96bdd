use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::currency::{Currency, ExchangeRateProvider};
use crate::errors::LedgerError;
use crate::money::{HouseholdMoney, Money};

use super::account::{Account, AccountType};
use super::transaction::Transaction;

pub const RETAINED_EARNINGS: &str = "Retained Earnings";
pub const RETAINED_EARNING: &str = "Retained Earning";
pub const CURRENCY_ERROR: &str = "Currency Error";
pub const TRANSACTION_ERROR: &str = "Transaction Error";
pub const CONTRIBUTED_CAPITALS: &str = "Contributed Capitals";
pub const CONTRIBUTED_CAPITAL: &str = "Contributed Capital";

/// Household label for the single-bucket equity plugs.
pub const ALL_HOUSEHOLDS: &str = "All";

/// Point-in-time statement: a transaction-shaped accumulator of running
/// balances plus the equity lines derived from them.
///
/// Asset and liability postings are running balances that persist across
/// months; revenue and expense postings cover the current month only and are
/// cleared at every month boundary. Retained earnings, the currency-drift
/// plug, and the checksum-drift plug live outside the postings and surface
/// as synthetic equity accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialStat {
    transaction: Transaction,
    retained_earnings: HouseholdMoney,
    currency_error: Money,
    cumulated_check_sum: Money,
    cursor: NaiveDate,
}

impl FinancialStat {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            transaction: Transaction::new(date, ""),
            retained_earnings: HouseholdMoney::new(Currency::BASE, date),
            currency_error: Money::zero(Currency::BASE, date),
            cumulated_check_sum: Money::zero(Currency::BASE, date),
            cursor: date,
        }
    }

    /// Month label (`"2024-01"`) once snapshotted; empty while live.
    pub fn label(&self) -> &str {
        &self.transaction.description
    }

    pub fn date(&self) -> NaiveDate {
        self.transaction.date
    }

    pub fn retained_earnings(&self) -> &HouseholdMoney {
        &self.retained_earnings
    }

    /// Valuation drift of foreign-currency balances, in USD.
    pub fn currency_error(&self) -> &Money {
        &self.currency_error
    }

    /// Accumulated double-entry checksum drift, in USD. Stays at zero while
    /// the ledger is internally consistent.
    pub fn transaction_error(&self) -> &Money {
        &self.cumulated_check_sum
    }

    pub fn posting(&self, account: &Account) -> Option<&HouseholdMoney> {
        self.transaction.posting(account)
    }

    pub fn is_empty(&self) -> bool {
        self.transaction.is_empty()
    }

    /// Base postings plus the four synthetic equity accounts, in account
    /// order. Contributed capital is reserved and always empty.
    pub fn accounts(&self) -> Vec<(Account, HouseholdMoney)> {
        let mut out: Vec<(Account, HouseholdMoney)> = self
            .transaction
            .accounts()
            .map(|(account, split)| (account.clone(), split.clone()))
            .collect();
        out.push((
            Account::equity(CONTRIBUTED_CAPITALS, CONTRIBUTED_CAPITAL),
            HouseholdMoney::new(Currency::BASE, self.transaction.date),
        ));
        out.push((
            Account::equity(RETAINED_EARNINGS, CURRENCY_ERROR),
            HouseholdMoney::single(ALL_HOUSEHOLDS, &self.currency_error),
        ));
        out.push((
            Account::equity(RETAINED_EARNINGS, RETAINED_EARNING),
            self.retained_earnings.clone(),
        ));
        out.push((
            Account::equity(RETAINED_EARNINGS, TRANSACTION_ERROR),
            HouseholdMoney::single(ALL_HOUSEHOLDS, &self.cumulated_check_sum),
        ));
        out
    }

    /// Captures FX drift from elapsed time on existing non-USD balance
    /// sheet postings: each is revalued from the cursor date to `date` and
    /// the difference lands in the currency-error plug. Runs before each
    /// transaction is merged.
    pub fn cumulate_currency_error(
        &mut self,
        date: NaiveDate,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<(), LedgerError> {
        for account_type in [AccountType::Asset, AccountType::Liability] {
            for (_, split) in self.transaction.accounts_of(account_type) {
                if split.currency() == Currency::BASE {
                    continue;
                }
                let balance = split.sum();
                let before = balance.valued_at(self.cursor, Currency::BASE, provider)?;
                let after = balance.valued_at(date, Currency::BASE, provider)?;
                self.currency_error.amount += after.amount - before.amount;
            }
        }
        self.currency_error.date = self.currency_error.date.max(date);
        self.cursor = date;
        Ok(())
    }

    /// Merges one transaction's postings into the accumulator and adds its
    /// checksum to the transaction-error plug.
    pub fn cumulate_transaction(
        &mut self,
        transaction: &Transaction,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<(), LedgerError> {
        let check = transaction.check_sum(provider)?;
        if !check.is_zero() {
            tracing::warn!(
                id = %transaction.id,
                date = %transaction.date,
                drift = %check,
                "unbalanced transaction folded into the statement"
            );
        }
        self.transaction.merge_postings_from(transaction)?;
        self.cumulated_check_sum.amount += check.amount;
        self.cumulated_check_sum.date = self.cumulated_check_sum.date.max(check.date);
        Ok(())
    }

    /// Rolls the current revenue and expense postings into retained
    /// earnings, per household.
    pub fn cumulate_retained_earning(&mut self) -> Result<(), LedgerError> {
        let mut delta = HouseholdMoney::new(Currency::BASE, self.transaction.date);
        for (_, split) in self.transaction.accounts_of(AccountType::Revenue) {
            delta.merge(split)?;
        }
        for (_, split) in self.transaction.accounts_of(AccountType::Expense) {
            delta.merge(&split.negated())?;
        }
        self.retained_earnings.merge(&delta)?;
        Ok(())
    }

    /// Drops revenue and expense postings. Asset and liability balances
    /// survive: the balance sheet is cumulative, income lines are
    /// period-only.
    pub fn clear_period_postings(&mut self) {
        self.transaction.remove_postings_of(AccountType::Revenue);
        self.transaction.remove_postings_of(AccountType::Expense);
    }

    fn close_month(
        &mut self,
        month: NaiveDate,
        snapshots: &mut Vec<FinancialStat>,
    ) -> Result<(), LedgerError> {
        self.transaction.description = month_label(month);
        self.cumulate_retained_earning()?;
        tracing::debug!(month = %self.transaction.description, "month closed");
        snapshots.insert(0, self.clone());
        self.clear_period_postings();
        Ok(())
    }

    /// Folds a transaction stream into one statement per calendar month,
    /// most recent first.
    ///
    /// Transactions are ordered by `(date, id)` before the walk so same-day
    /// entries aggregate reproducibly; anything dated after `end` is skipped
    /// with a warning. Months without transactions still snapshot — balances
    /// carry forward untouched and income lines stay empty — up to and
    /// including `end`'s month. An empty stream yields an empty list.
    pub fn summarize_by_month(
        transactions: &[Transaction],
        end: NaiveDate,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<Vec<FinancialStat>, LedgerError> {
        let mut ordered: Vec<&Transaction> = Vec::new();
        for transaction in transactions {
            if transaction.date > end {
                tracing::warn!(
                    id = %transaction.id,
                    date = %transaction.date,
                    %end,
                    "transaction dated after the statement end, skipped"
                );
                continue;
            }
            ordered.push(transaction);
        }
        ordered.sort_by_key(|transaction| (transaction.date, transaction.id));

        let first = match ordered.first() {
            Some(first) => first,
            None => return Ok(Vec::new()),
        };

        let mut month = month_begin(first.date);
        let mut stat = FinancialStat::new(first.date);
        let mut snapshots: Vec<FinancialStat> = Vec::new();

        for transaction in &ordered {
            while transaction.date >= next_month(month) {
                stat.close_month(month, &mut snapshots)?;
                month = next_month(month);
            }
            stat.cumulate_currency_error(transaction.date, provider)?;
            stat.cumulate_transaction(transaction, provider)?;
        }
        while end >= next_month(month) {
            stat.close_month(month, &mut snapshots)?;
            month = next_month(month);
        }
        stat.transaction.description = month_label(month);
        stat.cumulate_retained_earning()?;
        snapshots.insert(0, stat);

        tracing::debug!(months = snapshots.len(), "monthly aggregation complete");
        Ok(snapshots)
    }
}

fn month_label(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

fn month_begin(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(month: NaiveDate) -> NaiveDate {
    let (year, next) = if month.month() == 12 {
        (month.year() + 1, 1)
    } else {
        (month.year(), month.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, next, 1).unwrap_or(month)
}
