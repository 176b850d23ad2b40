use loot_core::field::{field_map, row};
use loot_core::{
    summarize_fields, DepositSource, ExtractedField, FieldValue, MeanPolicy, RowTable,
    StatementTemplate,
};

fn daily_balance(rows: &[(&str, &str)]) -> RowTable {
    RowTable::from_rows(rows.iter().map(|(d, a)| row([("Date", *d), ("Amount", *a)])))
}

#[test]
fn test_daily_balance_scenario() {
    let t = StatementTemplate::generic().unwrap();
    let fields = field_map([
        ExtractedField::text("AccountHolder", "JANE DOE", 0.99),
        ExtractedField::table(
            "DailyEndingBalance",
            daily_balance(&[("1/1", "1,000.00"), ("1/2", "-50.00"), ("N/A", "N/A")]),
        ),
    ]);

    let s = summarize_fields("jan.pdf", &fields, &t, MeanPolicy::MeanOfMeans);
    assert_eq!(s.file_name, "jan.pdf");
    assert_eq!(s.template, "generic");
    assert_eq!(s.average_balance, Some(475.0));
    assert_eq!(s.total_balance, Some(950.0));
    assert_eq!(s.negative_days, Some(1));
    assert_eq!(s.negative_day_pct, Some(50.0));
    assert_eq!(s.balance_tables, 1);
    assert_eq!(s.raw_fields.len(), 2);
}

#[test]
fn test_multi_page_statement_uses_mean_of_means() {
    let t = StatementTemplate::chase().unwrap();
    // page 1: ten days at 100; page 2: ten days at 300
    let page = |v: &str| {
        let rows: Vec<(String, String)> = (1..=10).map(|d| (format!("1/{d}"), v.to_string())).collect();
        RowTable::from_rows(rows.iter().map(|(d, a)| row([("Date", d.as_str()), ("Amount", a.as_str())])))
    };
    let fields = field_map([
        ExtractedField::table("DailyEndingBalance_page1", page("100.00")),
        ExtractedField::table("DailyEndingBalance_page2", page("300.00")),
    ]);

    let s = summarize_fields("feb.pdf", &fields, &t, MeanPolicy::MeanOfMeans);
    assert_eq!(s.total_balance, Some(4000.0));
    assert_eq!(s.average_balance, Some(200.0));
    assert_eq!(s.negative_days, Some(0));
    assert_eq!(s.balance_tables, 2);
}

#[test]
fn test_scalar_deposit_beats_table_total() {
    let t = StatementTemplate::bank_of_america().unwrap();
    let history = RowTable::from_rows([
        row([("Date", "3/1"), ("Deposits", "2,000.00")]),
        row([("Date", "3/9"), ("Deposits", "400.00")]),
    ]);
    let fields = field_map([
        ExtractedField::text("Total Deposit Amount", "2,500.00", 0.95),
        ExtractedField::table("Transactions", history),
    ]);

    let s = summarize_fields("mar.pdf", &fields, &t, MeanPolicy::default());
    assert_eq!(s.total_deposits, Some(2500.0));
    // no count scalar: the count comes from the table
    assert_eq!(s.deposit_count, Some(2));
    assert_eq!(s.deposit_source, Some(DepositSource::Mixed));
}

#[test]
fn test_untrusted_deposit_scalar_never_reported() {
    let t = StatementTemplate::bank_of_america().unwrap();
    let fields = field_map([
        ExtractedField::text("Total Deposit Amount", "9,999.00", 0.89),
        ExtractedField::new("Number of Deposits", FieldValue::Number(12.0), 0.2),
    ]);

    let s = summarize_fields("apr.pdf", &fields, &t, MeanPolicy::default());
    assert_eq!(s.total_deposits, None);
    assert_eq!(s.deposit_count, None);
    assert_eq!(s.deposit_source, None);
}

#[test]
fn test_empty_balance_table_is_not_available() {
    let t = StatementTemplate::generic().unwrap();
    let fields = field_map([ExtractedField::table("DailyEndingBalance", RowTable::new())]);

    let s = summarize_fields("may.pdf", &fields, &t, MeanPolicy::default());
    assert_eq!(s.total_balance, None);
    assert_eq!(s.average_balance, None);
    assert_eq!(s.negative_days, None);
    assert_eq!(s.negative_day_pct, None);
    assert_eq!(s.total_deposits, None);
    assert!(s.metric_rows().iter().all(|(_, v)| v == "N/A"));
}

#[test]
fn test_wells_fargo_transaction_history() {
    let t = StatementTemplate::wells_fargo().unwrap();
    let page = |rows: &[(&str, &str, &str)]| {
        RowTable::from_rows(rows.iter().map(|(d, credit, balance)| {
            row([
                ("Date", *d),
                ("Deposits/Credits", *credit),
                ("Ending daily balance", *balance),
            ])
        }))
    };
    let fields = field_map([
        ExtractedField::table(
            "TranscationHistory_page1",
            page(&[
                ("6/1", "1,500.00", "1,700.00"),
                ("6/2", "N/A", "-25.00"),
                ("6/30", "N/A", "-25.00"),
            ]),
        ),
        ExtractedField::text("Statement Period", "June 2025", 0.98),
    ]);

    let s = summarize_fields("jun.pdf", &fields, &t, MeanPolicy::default());
    // closing row dropped: samples 1700, -25
    assert_eq!(s.total_balance, Some(1675.0));
    assert_eq!(s.average_balance, Some(837.5));
    assert_eq!(s.negative_days, Some(1));
    assert_eq!(s.negative_day_pct, Some(50.0));
    assert_eq!(s.deposit_count, Some(1));
    assert_eq!(s.total_deposits, Some(1500.0));
    assert_eq!(s.deposit_source, Some(DepositSource::Table));
}

#[test]
fn test_wells_fargo_two_pages_drop_one_closing_balance() {
    let t = StatementTemplate::wells_fargo().unwrap();
    let page = |rows: &[(&str, &str, &str)]| {
        RowTable::from_rows(rows.iter().map(|(d, credit, balance)| {
            row([
                ("Date", *d),
                ("Deposits/Credits", *credit),
                ("Ending daily balance", *balance),
            ])
        }))
    };
    let fields = field_map([
        ExtractedField::table(
            "TranscationHistory_page1",
            page(&[("7/1", "250.00", "100.00"), ("7/9", "N/A", "200.00"), ("7/15", "N/A", "300.00")]),
        ),
        ExtractedField::table(
            "TranscationHistory_page2",
            page(&[("7/20", "N/A", "400.00"), ("7/28", "125.00", "500.00"), ("7/31", "N/A", "500.00")]),
        ),
    ]);

    let s = summarize_fields("jul.pdf", &fields, &t, t.mean_policy);
    // only page 2's closing row is dropped
    assert_eq!(s.total_balance, Some(1500.0));
    assert_eq!(s.average_balance, Some(300.0));
    assert_eq!(s.negative_days, Some(0));
    assert_eq!(s.balance_tables, 2);

    // deposits reported per page and in total
    assert_eq!(s.deposit_count, Some(2));
    assert_eq!(s.total_deposits, Some(375.0));
    let per_page: Vec<(&str, Option<u32>, Option<f64>)> = s
        .tables
        .iter()
        .map(|tb| (tb.name.as_str(), tb.deposit_count, tb.total_deposits))
        .collect();
    assert_eq!(
        per_page,
        [
            ("TranscationHistory_page1", Some(1), Some(250.0)),
            ("TranscationHistory_page2", Some(1), Some(125.0)),
        ]
    );
}

#[test]
fn test_chase_unreadable_amount_counts_as_zero_day() {
    let t = StatementTemplate::chase().unwrap();
    let fields = field_map([ExtractedField::table(
        "DailyEndingBalance",
        daily_balance(&[("1/1", "1,000.00"), ("1/2", "illegible")]),
    )]);

    let s = summarize_fields("aug.pdf", &fields, &t, t.mean_policy);
    assert_eq!(s.average_balance, Some(500.0));
    assert_eq!(s.total_balance, Some(1000.0));
    assert_eq!(s.negative_day_pct, Some(0.0));
}
