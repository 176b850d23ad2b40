//! Statement templates: per-bank knowledge expressed as data.
//!
//! Each document model the service runs emits its own field and column names.
//! A template says which fields are balance tables, which columns carry dates,
//! balances and deposits, and how the bank's "days" are counted. Adding a bank
//! means adding a template, not touching the metric code.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::MeanPolicy;

/// Minimum extraction confidence for a scalar metric field to be trusted.
pub const DEFAULT_CONFIDENCE_GATE: f64 = 0.9;

pub const TEMPLATE_IDS: &[&str] = &["generic", "chase", "bank-of-america", "wells-fargo"];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown statement template '{0}'")]
    Unknown(String),

    #[error("invalid column pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Denominator used for the negative-day percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayCountMode {
    /// Every matched balance value counts as a day (multi-column layouts).
    Samples,
    /// Every row with at least one matched value counts as a day.
    Rows,
}

/// What an unparseable monetary cell contributes to sums and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPolicy {
    Exclude,
    Zero,
}

impl MissingPolicy {
    pub fn apply(self, value: Option<f64>) -> Option<f64> {
        match (value, self) {
            (Some(v), _) => Some(v),
            (None, MissingPolicy::Zero) => Some(0.0),
            (None, MissingPolicy::Exclude) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFamily {
    Date,
    Balance,
    Deposit,
}

/// Patterns over canonical column names (see [`crate::normalize::canonical_column`]).
#[derive(Debug, Clone)]
pub struct ColumnFamilies {
    date: Regex,
    balance: Regex,
    deposit: Regex,
}

impl ColumnFamilies {
    pub fn new(date: &str, balance: &str, deposit: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            date: Regex::new(date)?,
            balance: Regex::new(balance)?,
            deposit: Regex::new(deposit)?,
        })
    }

    pub fn is_date(&self, canonical: &str) -> bool {
        self.date.is_match(canonical)
    }

    pub fn is_balance(&self, canonical: &str) -> bool {
        self.balance.is_match(canonical)
    }

    pub fn is_deposit(&self, canonical: &str) -> bool {
        self.deposit.is_match(canonical)
    }

    /// Columns whose cells are coerced to numbers.
    pub fn is_monetary(&self, canonical: &str) -> bool {
        self.is_balance(canonical) || self.is_deposit(canonical)
    }

    pub fn family(&self, canonical: &str) -> Option<ColumnFamily> {
        if self.is_date(canonical) {
            Some(ColumnFamily::Date)
        } else if self.is_balance(canonical) {
            Some(ColumnFamily::Balance)
        } else if self.is_deposit(canonical) {
            Some(ColumnFamily::Deposit)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatementTemplate {
    pub id: &'static str,
    pub issuer: &'static str,
    /// Case-folded substrings of a field name marking a balance table.
    pub balance_table_keywords: Vec<&'static str>,
    pub columns: ColumnFamilies,
    pub deposit_amount_aliases: Vec<&'static str>,
    pub deposit_count_aliases: Vec<&'static str>,
    pub day_count: DayCountMode,
    /// Drop the last row of each balance table (a repeated closing balance).
    pub exclude_closing_row: bool,
    pub balance_missing: MissingPolicy,
    pub deposit_missing: MissingPolicy,
    /// How balance tables of one statement combine into its average.
    pub mean_policy: MeanPolicy,
    pub confidence_gate: f64,
}

const DATE_COLUMNS: &str = r"^(date|day|postingdate|transactiondate)\d*$";
const DEPOSIT_COLUMNS: &str = r"deposit|credit";

const DEPOSIT_AMOUNT_ALIASES: &[&str] = &[
    "total deposit amount",
    "totaldepositamount",
    "deposit amount",
    "depositamount",
    "total deposits",
];

const DEPOSIT_COUNT_ALIASES: &[&str] = &[
    "number of deposits",
    "numberofdeposits",
    "no.of.deposits",
    "no. of deposits",
    "deposit count",
];

impl StatementTemplate {
    fn base(id: &'static str, issuer: &'static str, columns: ColumnFamilies) -> Self {
        Self {
            id,
            issuer,
            balance_table_keywords: vec!["dailyendingbalance", "balance"],
            columns,
            deposit_amount_aliases: DEPOSIT_AMOUNT_ALIASES.to_vec(),
            deposit_count_aliases: DEPOSIT_COUNT_ALIASES.to_vec(),
            day_count: DayCountMode::Samples,
            exclude_closing_row: false,
            balance_missing: MissingPolicy::Exclude,
            deposit_missing: MissingPolicy::Exclude,
            mean_policy: MeanPolicy::MeanOfMeans,
            confidence_gate: DEFAULT_CONFIDENCE_GATE,
        }
    }

    /// Daily-ending-balance layout: `Date`/`Amount` pairs, possibly several per row.
    pub fn generic() -> Result<Self, TemplateError> {
        let columns = ColumnFamilies::new(
            DATE_COLUMNS,
            r"^(amount|balance|endingbalance|dailyendingbalance)\d*$",
            DEPOSIT_COLUMNS,
        )?;
        Ok(Self::base("generic", "Generic daily balance", columns))
    }

    pub fn chase() -> Result<Self, TemplateError> {
        let columns = ColumnFamilies::new(DATE_COLUMNS, r"^amount\d*$", DEPOSIT_COLUMNS)?;
        let mut template = Self::base("chase", "Chase", columns);
        // an unreadable amount on a dated row is a zero-balance day
        template.balance_missing = MissingPolicy::Zero;
        Ok(template)
    }

    /// Ledger balance tables; any column mentioning "balance" is a sample.
    pub fn bank_of_america() -> Result<Self, TemplateError> {
        let columns = ColumnFamilies::new(DATE_COLUMNS, r"balance", DEPOSIT_COLUMNS)?;
        Ok(Self::base("bank-of-america", "Bank of America", columns))
    }

    /// Transaction history tables carry an "Ending daily balance" column and
    /// end with the statement's closing balance.
    pub fn wells_fargo() -> Result<Self, TemplateError> {
        let columns =
            ColumnFamilies::new(DATE_COLUMNS, r"^endingdailybalance\d*$", DEPOSIT_COLUMNS)?;
        let mut template = Self::base("wells-fargo", "Wells Fargo", columns);
        template
            .balance_table_keywords
            .extend(["transactionhistory", "transcationhistory"]);
        template.day_count = DayCountMode::Rows;
        template.exclude_closing_row = true;
        // one flattened run of daily balances across all history pages
        template.mean_policy = MeanPolicy::Weighted;
        Ok(template)
    }

    pub fn is_deposit_amount_alias(&self, field_name: &str) -> bool {
        matches_alias(&self.deposit_amount_aliases, field_name)
    }

    pub fn is_deposit_count_alias(&self, field_name: &str) -> bool {
        matches_alias(&self.deposit_count_aliases, field_name)
    }

    pub fn is_balance_table(&self, field_name: &str) -> bool {
        let name = field_name.to_lowercase();
        self.balance_table_keywords.iter().any(|k| name.contains(k))
    }
}

fn matches_alias(aliases: &[&str], field_name: &str) -> bool {
    let name = field_name.trim().to_lowercase();
    aliases.iter().any(|a| *a == name)
}

/// Look up a built-in template by id.
pub fn template_by_id(id: &str) -> Result<StatementTemplate, TemplateError> {
    match id.trim().to_lowercase().as_str() {
        "generic" => StatementTemplate::generic(),
        "chase" => StatementTemplate::chase(),
        "bank-of-america" | "boa" => StatementTemplate::bank_of_america(),
        "wells-fargo" | "wf" => StatementTemplate::wells_fargo(),
        other => Err(TemplateError::Unknown(other.to_string())),
    }
}

pub fn builtin_templates() -> Result<Vec<StatementTemplate>, TemplateError> {
    TEMPLATE_IDS.iter().map(|id| template_by_id(id)).collect()
}
