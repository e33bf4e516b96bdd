use chrono::NaiveDate;
use ledger_core::currency::{Currency, ExchangeRateProvider, RateTable};
use ledger_core::errors::LedgerError;
use ledger_core::money::{HouseholdMoney, Money};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn rate_table() -> RateTable {
    let mut table = RateTable::new();
    table.insert(day(2025, 1, 10), Currency::Eur, Currency::Usd, 1.1);
    table.insert(day(2025, 1, 31), Currency::Eur, Currency::Usd, 1.4);
    table.insert(day(2025, 1, 10), Currency::Gbp, Currency::Usd, 1.25);
    table
}

#[test]
fn conversion_round_trip_is_identity() {
    let table = rate_table();
    for amount in [0.0, 1.0, -250.75, 98765.43] {
        let original = Money::new(amount, Currency::Eur, day(2025, 1, 10));
        let usd = original
            .convert_to(Currency::Usd, &table)
            .expect("eur to usd");
        let back = usd.convert_to(Currency::Eur, &table).expect("usd to eur");
        assert!(
            (back.amount - original.amount).abs() < 1e-9,
            "{amount}: got {}",
            back.amount
        );
        assert_eq!(back.currency, Currency::Eur);
    }
}

#[test]
fn conversion_rate_depends_on_the_date() {
    let table = rate_table();
    let eur = Money::new(100.0, Currency::Eur, day(2025, 1, 10));

    let at_posting = eur.convert_to(Currency::Usd, &table).expect("posting date");
    assert!((at_posting.amount - 110.0).abs() < 1e-9);

    let at_month_end = eur
        .valued_at(day(2025, 1, 31), Currency::Usd, &table)
        .expect("month end");
    assert!((at_month_end.amount - 140.0).abs() < 1e-9);
}

#[test]
fn lookup_falls_back_within_tolerance_only() {
    let table = rate_table();
    let eur = Money::new(100.0, Currency::Eur, day(2025, 1, 12));
    let converted = eur
        .convert_to(Currency::Usd, &table)
        .expect("nearest prior rate");
    assert!((converted.amount - 110.0).abs() < 1e-9);

    let stale = Money::new(100.0, Currency::Eur, day(2025, 3, 1));
    let err = stale
        .convert_to(Currency::Usd, &table)
        .expect_err("no rate within tolerance");
    assert!(matches!(err, LedgerError::RateUnavailable { .. }));
}

#[test]
fn money_string_round_trips() {
    let date = day(2025, 1, 10);
    for text in ["$100.00", "-$100.00", "($100.00)", "USD100.00"] {
        let money = Money::parse(text, date).expect(text);
        assert!(
            (money.amount.abs() - 100.0).abs() < 1e-9,
            "{text}: got {}",
            money.amount
        );
        let negative = text.starts_with('-') || text.starts_with('(');
        assert_eq!(money.amount < 0.0, negative, "{text}");

        let reparsed = Money::parse(&money.to_string(), date).expect("reparse");
        assert!(
            (reparsed.amount - money.amount).abs() < 1e-9,
            "{text}: display {} reparsed to {}",
            money,
            reparsed.amount
        );
    }
}

#[test]
fn formatting_groups_thousands_and_wraps_negatives() {
    let date = day(2025, 1, 10);
    assert_eq!(
        Money::new(1234567.891, Currency::Usd, date).to_string(),
        "$1,234,567.89"
    );
    assert_eq!(
        Money::new(-9876.5, Currency::Gbp, date).to_string(),
        "(£9,876.50)"
    );
    assert_eq!(Money::new(0.0, Currency::Cny, date).to_string(), "¥0.00");
}

#[test]
fn malformed_money_text_is_a_typed_error() {
    let err = Money::parse("one hundred", day(2025, 1, 10)).expect_err("not a number");
    match err {
        LedgerError::ParseMoney(text) => assert_eq!(text, "one hundred"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn household_conversion_is_atomic_across_entries() {
    let table = rate_table();
    let mut split = HouseholdMoney::new(Currency::Eur, day(2025, 1, 10));
    split
        .add("alice", &Money::new(100.0, Currency::Eur, day(2025, 1, 10)))
        .expect("alice share");
    split
        .add("bob", &Money::new(50.0, Currency::Eur, day(2025, 1, 31)))
        .expect("bob share");

    let usd = split.convert_to(Currency::Usd, &table).expect("converted");
    assert!((usd.get("alice").expect("alice").amount - 110.0).abs() < 1e-9);
    assert!((usd.get("bob").expect("bob").amount - 70.0).abs() < 1e-9);
    assert!((usd.sum().amount - 180.0).abs() < 1e-9);
    assert_eq!(usd.currency(), Currency::Usd);
}

#[test]
fn provider_parity_needs_no_table() {
    let empty = RateTable::new();
    let rate = empty
        .rate(day(2025, 6, 1), Currency::Cny, Currency::Cny)
        .expect("parity");
    assert!((rate - 1.0).abs() < f64::EPSILON);
}
