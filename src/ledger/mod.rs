//! Double-entry ledger model: accounts, transactions, monthly statements,
//! and investment analytics.

pub mod account;
pub mod investment;
pub mod statement;
pub mod transaction;

pub use account::{Account, AccountType, StatementKind};
pub use investment::InvestmentAnalyzer;
pub use statement::FinancialStat;
pub use transaction::Transaction;
