use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::currency::{Currency, ExchangeRateProvider};
use crate::errors::LedgerError;
use crate::money::{Money, ZERO_TOLERANCE};

use super::account::{Account, AccountType};
use super::transaction::Transaction;

const MAX_ITERATIONS: usize = 200;
const SOLVE_TOLERANCE: f64 = 1e-8;

/// Rate-of-return analysis for one investment asset.
///
/// Consumes the asset's transaction history — asset postings plus the
/// paired `Revenue / Investment` gains and optional `Liability / Loan`
/// financing — and solves the compounding rate that reconciles the cash
/// flows with the observed principal. Rates are solved in log2-per-day
/// form; base-2 compounding is part of the contract, changing it would
/// change every historical output.
#[derive(Debug, Clone)]
pub struct InvestmentAnalyzer {
    account: Account,
    history: Vec<Transaction>,
    principal: f64,
    discount_rate: f64,
    return_history: BTreeMap<NaiveDate, f64>,
}

impl InvestmentAnalyzer {
    /// Builds the analyzer over the account's transactions. Transactions
    /// sharing a calendar day are merged up front so sub-day ordering never
    /// produces spurious rate events.
    pub fn new(account: Account, transactions: &[Transaction]) -> Result<Self, LedgerError> {
        if account.account_type != AccountType::Asset || !account.is_investment {
            return Err(LedgerError::InvalidInput(format!(
                "{account} is not an investment asset"
            )));
        }
        let mut ordered = transactions.to_vec();
        ordered.sort_by_key(|tx| (tx.date, tx.id));
        let mut history: Vec<Transaction> = Vec::new();
        for tx in ordered {
            match history.last_mut() {
                Some(last) if last.date == tx.date => {
                    *last = last.merge(&tx)?;
                }
                _ => history.push(tx),
            }
        }
        Ok(Self {
            account,
            history,
            principal: 0.0,
            discount_rate: 1.0,
            return_history: BTreeMap::new(),
        })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Day-merged history, ascending.
    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    /// Net asset value in USD after the walk.
    pub fn principal(&self) -> f64 {
        self.principal
    }

    /// Annualized overall return, `2^(rate × 365)`. Parity (1.0) before
    /// analysis or for an empty history.
    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Log2 daily rate solved at each realization event.
    pub fn return_history(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.return_history
    }

    /// Walks the history ascending, accumulating principal and cash flows.
    ///
    /// Every day contributes `balance_change − loan_change − gain_or_loss`
    /// to the flow lists. A day with a non-zero gain posting is a
    /// realization event: the flows since the previous event are solved
    /// against the current principal, the resulting rate is recorded, and
    /// the local list restarts from that principal as its opening position.
    /// One final solve over the whole history yields the discount rate.
    pub fn analyze(&mut self, provider: &dyn ExchangeRateProvider) -> Result<(), LedgerError> {
        self.principal = 0.0;
        self.discount_rate = 1.0;
        self.return_history.clear();

        let gain_account = self.account.gain_account();
        let loan_account = self.account.loan_account();
        let mut local: Vec<Money> = Vec::new();
        let mut alltime: Vec<Money> = Vec::new();
        let mut last_date = None;

        for tx in &self.history {
            let date = tx.date;
            let balance_change = posting_value(tx, &self.account, date, provider)?;
            let gain_or_loss = posting_value(tx, &gain_account, date, provider)?;
            let loan_change = posting_value(tx, &loan_account, date, provider)?;

            self.principal += balance_change - loan_change;
            let flow = Money::new(
                balance_change - loan_change - gain_or_loss,
                Currency::BASE,
                date,
            );
            local.push(flow);
            alltime.push(flow);

            if gain_or_loss.abs() >= ZERO_TOLERANCE {
                let target = Money::new(self.principal, Currency::BASE, date);
                let rate = solve_rate(&local, &target)?;
                self.return_history.insert(date, rate);
                tracing::debug!(%date, rate, principal = self.principal, "realization event");
                local.clear();
                local.push(target);
            }
            last_date = Some(date);
        }

        if let Some(date) = last_date {
            let target = Money::new(self.principal, Currency::BASE, date);
            let rate = solve_rate(&alltime, &target)?;
            self.discount_rate = (rate * 365.0).exp2();
            tracing::debug!(
                rate,
                discount_rate = self.discount_rate,
                "overall return solved"
            );
        }
        Ok(())
    }
}

fn posting_value(
    transaction: &Transaction,
    account: &Account,
    date: NaiveDate,
    provider: &dyn ExchangeRateProvider,
) -> Result<f64, LedgerError> {
    match transaction.posting(account) {
        Some(split) => Ok(split.sum().valued_at(date, Currency::BASE, provider)?.amount),
        None => Ok(0.0),
    }
}

/// Value of a cash-flow history compounded to `as_of` at a log2 daily rate:
/// `Σ amountᵢ · 2^(rate · days(dateᵢ → as_of))`.
fn value_for_date(history: &[Money], log2_rate: f64, as_of: NaiveDate) -> f64 {
    history
        .iter()
        .map(|money| {
            let days = (as_of - money.date).num_days() as f64;
            money.amount * (log2_rate * days).exp2()
        })
        .sum()
}

/// Bisection for the log2 daily rate at which `history` compounds to
/// `target` on the target's date.
///
/// Searches `[-1, 1]`; a preliminary probe decides whether the value grows
/// or shrinks with the rate, since cash-flow sign patterns go both ways.
/// When the midpoint converges onto a bound the bound itself is returned —
/// the degenerate case, e.g. a loss with no offsetting flow. The iteration
/// cap turns NaN poisoning into a typed error instead of a hang.
fn solve_rate(history: &[Money], target: &Money) -> Result<f64, LedgerError> {
    let as_of = target.date;
    let goal = target.amount;
    let increasing = value_for_date(history, 0.01, as_of) >= value_for_date(history, 0.0, as_of);

    let mut lo = -1.0_f64;
    let mut hi = 1.0_f64;
    for _ in 0..MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let value = value_for_date(history, mid, as_of);
        if (value - goal).abs() < SOLVE_TOLERANCE {
            return Ok(mid);
        }
        if (mid + 1.0).abs() < SOLVE_TOLERANCE {
            return Ok(-1.0);
        }
        if (mid - 1.0).abs() < SOLVE_TOLERANCE {
            return Ok(1.0);
        }
        if (value < goal) == increasing {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Err(LedgerError::DidNotConverge(MAX_ITERATIONS))
}
