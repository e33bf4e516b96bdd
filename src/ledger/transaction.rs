use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::{Currency, ExchangeRateProvider};
use crate::errors::LedgerError;
use crate::money::{HouseholdMoney, Money};

use super::account::{Account, AccountType};

/// A double-entry event: dated postings across accounts, each split per
/// household member.
///
/// Postings are keyed by account; the key order (type, then category, then
/// name) makes every iteration deterministic. Equity is never posted — it is
/// derived by the statement layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    #[serde(with = "postings_as_pairs")]
    postings: BTreeMap<Account, HouseholdMoney>,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            description: description.into(),
            postings: BTreeMap::new(),
        }
    }

    /// Adds an amount for one account and household member.
    ///
    /// The first posting for an account fixes that posting's currency; the
    /// money must match it and the account's declared currency. The
    /// transaction date advances to the latest posting date seen.
    pub fn add_money(
        &mut self,
        account: &Account,
        household: impl Into<String>,
        money: &Money,
    ) -> Result<(), LedgerError> {
        if account.account_type == AccountType::Equity {
            return Err(LedgerError::InvalidPosting(format!(
                "equity account {account} is derived, not posted"
            )));
        }
        if money.currency != account.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: account.currency,
                found: money.currency,
            });
        }
        let split = self
            .postings
            .entry(account.clone())
            .or_insert_with(|| HouseholdMoney::new(account.currency, money.date));
        split.add(household, money)?;
        if split.is_empty() {
            self.postings.remove(account);
        }
        self.date = self.date.max(money.date);
        Ok(())
    }

    pub fn posting(&self, account: &Account) -> Option<&HouseholdMoney> {
        self.postings.get(account)
    }

    /// All postings, in account order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Account, &HouseholdMoney)> {
        self.postings.iter()
    }

    pub fn accounts_of(
        &self,
        account_type: AccountType,
    ) -> impl Iterator<Item = (&Account, &HouseholdMoney)> {
        self.postings
            .iter()
            .filter(move |(account, _)| account.account_type == account_type)
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Signed sum of every posting in USD: debits positive, credits
    /// negative. Zero (within tolerance) means the transaction balances.
    pub fn check_sum(&self, provider: &dyn ExchangeRateProvider) -> Result<Money, LedgerError> {
        let mut total = Money::zero(Currency::BASE, self.date);
        for (account, split) in &self.postings {
            let value = split.convert_to(Currency::BASE, provider)?.sum();
            total.amount += account.sign() * value.amount;
        }
        Ok(total)
    }

    /// Lists what keeps this transaction from being well formed. An empty
    /// list means valid.
    pub fn validate(
        &self,
        provider: &dyn ExchangeRateProvider,
    ) -> Result<Vec<String>, LedgerError> {
        let mut issues = Vec::new();
        if self.description.trim().is_empty() {
            issues.push("description empty".to_string());
        }
        if self.postings.is_empty() {
            issues.push("no account entries".to_string());
        } else {
            let check = self.check_sum(provider)?;
            if !check.is_zero() {
                issues.push(format!("checksum not zero: {check}"));
            }
        }
        Ok(issues)
    }

    /// Combines two transactions into one. The result keeps this
    /// transaction's id, takes the later date, joins the descriptions
    /// (dropping one when the other already contains it), and nets the
    /// postings, pruning any that cancel out.
    pub fn merge(&self, other: &Transaction) -> Result<Transaction, LedgerError> {
        let mut merged = self.clone();
        merged.description = merge_descriptions(&self.description, &other.description);
        merged.merge_postings_from(other)?;
        Ok(merged)
    }

    pub(crate) fn merge_postings_from(&mut self, other: &Transaction) -> Result<(), LedgerError> {
        for (account, split) in &other.postings {
            match self.postings.get_mut(account) {
                Some(existing) => {
                    existing.merge(split)?;
                    if existing.is_empty() {
                        self.postings.remove(account);
                    }
                }
                None => {
                    if !split.is_empty() {
                        self.postings.insert(account.clone(), split.clone());
                    }
                }
            }
        }
        self.date = self.date.max(other.date);
        Ok(())
    }

    pub(crate) fn remove_postings_of(&mut self, account_type: AccountType) {
        self.postings
            .retain(|account, _| account.account_type != account_type);
    }

    /// A reversing copy: every posting flipped, fresh id.
    pub fn negated(&self) -> Transaction {
        let mut flipped = self.clone();
        flipped.id = Uuid::new_v4();
        for split in flipped.postings.values_mut() {
            *split = split.negated();
        }
        flipped
    }
}

fn merge_descriptions(lhs: &str, rhs: &str) -> String {
    if lhs.contains(rhs) {
        lhs.to_string()
    } else if rhs.contains(lhs) {
        rhs.to_string()
    } else {
        format!("{lhs}; {rhs}")
    }
}

mod postings_as_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::ledger::account::Account;
    use crate::money::HouseholdMoney;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Account, HouseholdMoney>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&Account, &HouseholdMoney)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Account, HouseholdMoney>, D::Error> {
        let pairs = Vec::<(Account, HouseholdMoney)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::RateTable;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn usd(amount: f64, date: NaiveDate) -> Money {
        Money::new(amount, Currency::Usd, date)
    }

    fn grocery_purchase(date: NaiveDate) -> Transaction {
        let mut tx = Transaction::new(date, "groceries");
        tx.add_money(
            &Account::expense("Food", "Groceries"),
            "alice",
            &usd(50.0, date),
        )
        .expect("expense leg");
        tx.add_money(
            &Account::asset("Bank", "Checking", Currency::Usd),
            "alice",
            &usd(-50.0, date),
        )
        .expect("asset leg");
        tx
    }

    #[test]
    fn balanced_transaction_checksum_is_zero() {
        let table = RateTable::new();
        let tx = grocery_purchase(day(2024, 1, 10));
        let check = tx.check_sum(&table).expect("checksum");
        assert!(check.is_zero(), "got {}", check.amount);
        assert!(tx.validate(&table).expect("validate").is_empty());
    }

    #[test]
    fn multi_currency_checksum_converts_each_leg() {
        let mut table = RateTable::new();
        table.insert(day(2024, 1, 10), Currency::Eur, Currency::Usd, 1.1);

        let mut tx = Transaction::new(day(2024, 1, 10), "dinner abroad");
        tx.add_money(
            &Account::expense("Food", "Restaurants"),
            "alice",
            &usd(55.0, day(2024, 1, 10)),
        )
        .expect("expense leg");
        tx.add_money(
            &Account::asset("Bank", "Euro Account", Currency::Eur),
            "alice",
            &Money::new(-50.0, Currency::Eur, day(2024, 1, 10)),
        )
        .expect("asset leg");

        let check = tx.check_sum(&table).expect("checksum");
        assert!(check.is_zero(), "got {}", check.amount);
    }

    #[test]
    fn equity_postings_are_rejected() {
        let mut tx = Transaction::new(day(2024, 1, 1), "opening");
        let err = tx
            .add_money(
                &Account::equity("Retained Earnings", "Retained Earning"),
                "alice",
                &usd(10.0, day(2024, 1, 1)),
            )
            .expect_err("equity is derived");
        assert!(matches!(err, LedgerError::InvalidPosting(_)));
        assert!(tx.is_empty());
    }

    #[test]
    fn posting_currency_must_match_the_account() {
        let mut tx = Transaction::new(day(2024, 1, 1), "salary");
        let err = tx
            .add_money(
                &Account::asset("Bank", "Checking", Currency::Usd),
                "alice",
                &Money::new(10.0, Currency::Eur, day(2024, 1, 1)),
            )
            .expect_err("currency mismatch");
        assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    }

    #[test]
    fn transaction_date_advances_with_postings() {
        let mut tx = Transaction::new(day(2024, 1, 1), "staggered");
        tx.add_money(
            &Account::asset("Bank", "Checking", Currency::Usd),
            "alice",
            &usd(10.0, day(2024, 1, 20)),
        )
        .expect("later posting");
        assert_eq!(tx.date, day(2024, 1, 20));
    }

    #[test]
    fn validate_reports_each_issue() {
        let table = RateTable::new();

        let empty = Transaction::new(day(2024, 1, 1), "  ");
        let issues = empty.validate(&table).expect("validate");
        assert!(issues.contains(&"description empty".to_string()));
        assert!(issues.contains(&"no account entries".to_string()));

        let mut lopsided = Transaction::new(day(2024, 1, 1), "forgot the other leg");
        lopsided
            .add_money(
                &Account::expense("Food", "Groceries"),
                "alice",
                &usd(100.0, day(2024, 1, 1)),
            )
            .expect("single leg");
        let issues = lopsided.validate(&table).expect("validate");
        assert_eq!(issues, vec!["checksum not zero: $100.00".to_string()]);
    }

    #[test]
    fn merge_nets_postings_and_keeps_the_left_id() {
        let table = RateTable::new();
        let first = grocery_purchase(day(2024, 1, 10));
        let second = grocery_purchase(day(2024, 1, 12));

        let merged = first.merge(&second).expect("merge");
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.date, day(2024, 1, 12));
        assert_eq!(merged.description, "groceries");

        let expense = merged
            .posting(&Account::expense("Food", "Groceries"))
            .expect("merged expense");
        assert!((expense.sum().amount - 100.0).abs() < 1e-9);
        assert!(merged.check_sum(&table).expect("checksum").is_zero());
    }

    #[test]
    fn merge_joins_unrelated_descriptions() {
        let mut lhs = Transaction::new(day(2024, 1, 1), "rent");
        lhs.add_money(
            &Account::expense("Housing", "Rent"),
            "alice",
            &usd(900.0, day(2024, 1, 1)),
        )
        .expect("rent leg");
        let mut rhs = Transaction::new(day(2024, 1, 1), "utilities");
        rhs.add_money(
            &Account::expense("Housing", "Utilities"),
            "alice",
            &usd(80.0, day(2024, 1, 1)),
        )
        .expect("utilities leg");

        let merged = lhs.merge(&rhs).expect("merge");
        assert_eq!(merged.description, "rent; utilities");
        assert_eq!(merged.accounts().count(), 2);
    }

    #[test]
    fn merging_a_transaction_with_its_negation_leaves_nothing() {
        let tx = grocery_purchase(day(2024, 1, 10));
        let merged = tx.merge(&tx.negated()).expect("merge reversal");
        assert!(merged.is_empty());
        assert_eq!(merged.accounts().count(), 0);
    }

    #[test]
    fn accounts_iterate_in_type_category_name_order() {
        let date = day(2024, 1, 5);
        let mut tx = Transaction::new(date, "payday");
        tx.add_money(
            &Account::revenue("Salary", "Employer"),
            "alice",
            &usd(2000.0, date),
        )
        .expect("revenue leg");
        tx.add_money(
            &Account::asset("Bank", "Checking", Currency::Usd),
            "alice",
            &usd(2000.0, date),
        )
        .expect("asset leg");

        let order: Vec<String> = tx.accounts().map(|(a, _)| a.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "Asset / Bank / Checking".to_string(),
                "Revenue / Salary / Employer".to_string(),
            ]
        );
        assert_eq!(tx.accounts_of(AccountType::Revenue).count(), 1);
        assert_eq!(tx.accounts_of(AccountType::Expense).count(), 0);
    }

    #[test]
    fn serde_round_trip_preserves_postings() {
        let tx = grocery_purchase(day(2024, 1, 10));
        let json = serde_json::to_string(&tx).expect("serialize");
        let back: Transaction = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, tx);
    }
}
