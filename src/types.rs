//! Core types and data structures for statement reconciliation

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A piece of text positioned on a statement page, as handed over by the
/// page-text front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedToken {
    /// Text of the token (one word, or one numeral group)
    pub text: String,
    /// Horizontal position of the token's left edge
    pub x: f64,
    /// Vertical position of the token's baseline
    pub y: f64,
    /// Zero-based page index within the document
    pub page: usize,
}

impl PositionedToken {
    /// Create a new token
    pub fn new(text: impl Into<String>, x: f64, y: f64, page: usize) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            page,
        }
    }
}

/// Which record a ledger entry comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The bank-supplied statement
    Statement,
    /// The accounting journal
    Journal,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Statement => write!(f, "statement"),
            Source::Journal => write!(f, "journal"),
        }
    }
}

/// Debit or credit side of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Debit,
    Credit,
}

impl Column {
    /// The other side
    pub fn opposite(self) -> Self {
        match self {
            Column::Debit => Column::Credit,
            Column::Credit => Column::Debit,
        }
    }
}

/// Kinds of extraction noise detected while building or correcting entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// The row had no parseable date and was dropped
    UndatedRow,
    /// An amount cell held text but no digits
    UnreadableAmount,
    /// The running balance invariant does not hold and no plausible fix exists
    BalanceMismatch,
    /// Both debit and credit were nonzero after correction
    DoubleSided,
}

/// Canonical record for a single transaction line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Operation date, absent when the source text did not parse
    pub date: Option<NaiveDate>,
    /// Value date (statement only)
    pub value_date: Option<NaiveDate>,
    /// Free-text label
    pub label: String,
    /// Debit amount
    pub debit: BigDecimal,
    /// Credit amount
    pub credit: BigDecimal,
    /// Running balance as printed on the statement
    pub balance: Option<BigDecimal>,
    /// Statement or journal
    pub source: Source,
    /// Anomalies recorded during extraction and correction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<AnomalyKind>,
}

impl LedgerEntry {
    /// Create a statement entry
    pub fn statement(
        date: NaiveDate,
        label: impl Into<String>,
        debit: BigDecimal,
        credit: BigDecimal,
        balance: BigDecimal,
    ) -> Self {
        Self {
            date: Some(date),
            value_date: None,
            label: label.into(),
            debit,
            credit,
            balance: Some(balance),
            source: Source::Statement,
            anomalies: Vec::new(),
        }
    }

    /// Create a journal entry
    pub fn journal(
        date: NaiveDate,
        label: impl Into<String>,
        debit: BigDecimal,
        credit: BigDecimal,
    ) -> Self {
        Self {
            date: Some(date),
            value_date: None,
            label: label.into(),
            debit,
            credit,
            balance: None,
            source: Source::Journal,
            anomalies: Vec::new(),
        }
    }

    /// Amount held in the given column
    pub fn amount(&self, column: Column) -> &BigDecimal {
        match column {
            Column::Debit => &self.debit,
            Column::Credit => &self.credit,
        }
    }

    /// Whether at least one amount column is nonzero
    pub fn has_movement(&self) -> bool {
        !self.debit.is_zero() || !self.credit.is_zero()
    }

    /// Whether both debit and credit are positive
    pub fn is_double_sided(&self) -> bool {
        let zero = BigDecimal::from(0);
        self.debit > zero && self.credit > zero
    }

    /// Credit minus debit
    pub fn net_movement(&self) -> BigDecimal {
        &self.credit - &self.debit
    }

    /// Record an anomaly once
    pub fn flag(&mut self, kind: AnomalyKind) {
        if !self.anomalies.contains(&kind) {
            self.anomalies.push(kind);
        }
    }

    /// Whether any anomaly was recorded on this entry
    pub fn is_flagged(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

/// Position of an entry inside the statement or journal sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    pub source: Source,
    pub index: usize,
}

impl EntryRef {
    pub fn statement(index: usize) -> Self {
        Self {
            source: Source::Statement,
            index,
        }
    }

    pub fn journal(index: usize) -> Self {
        Self {
            source: Source::Journal,
            index,
        }
    }
}

/// The four columns of a reconciliation statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportColumn {
    JournalDebit,
    JournalCredit,
    StatementDebit,
    StatementCredit,
}

impl ReportColumn {
    /// All columns in display order
    pub const ALL: [ReportColumn; 4] = [
        ReportColumn::JournalDebit,
        ReportColumn::JournalCredit,
        ReportColumn::StatementDebit,
        ReportColumn::StatementCredit,
    ];

    /// Which record this column belongs to
    pub fn source(self) -> Source {
        match self {
            ReportColumn::JournalDebit | ReportColumn::JournalCredit => Source::Journal,
            ReportColumn::StatementDebit | ReportColumn::StatementCredit => Source::Statement,
        }
    }

    /// Debit or credit side within that record
    pub fn column(self) -> Column {
        match self {
            ReportColumn::JournalDebit | ReportColumn::StatementDebit => Column::Debit,
            ReportColumn::JournalCredit | ReportColumn::StatementCredit => Column::Credit,
        }
    }
}

/// Amounts spread over the four reconciliation columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnAmounts {
    #[serde(default)]
    pub journal_debit: BigDecimal,
    #[serde(default)]
    pub journal_credit: BigDecimal,
    #[serde(default)]
    pub statement_debit: BigDecimal,
    #[serde(default)]
    pub statement_credit: BigDecimal,
}

impl ColumnAmounts {
    /// Amounts with a single nonzero column
    pub fn single(column: ReportColumn, amount: BigDecimal) -> Self {
        let mut amounts = Self::default();
        amounts.set(column, amount);
        amounts
    }

    pub fn get(&self, column: ReportColumn) -> &BigDecimal {
        match column {
            ReportColumn::JournalDebit => &self.journal_debit,
            ReportColumn::JournalCredit => &self.journal_credit,
            ReportColumn::StatementDebit => &self.statement_debit,
            ReportColumn::StatementCredit => &self.statement_credit,
        }
    }

    pub fn set(&mut self, column: ReportColumn, amount: BigDecimal) {
        match column {
            ReportColumn::JournalDebit => self.journal_debit = amount,
            ReportColumn::JournalCredit => self.journal_credit = amount,
            ReportColumn::StatementDebit => self.statement_debit = amount,
            ReportColumn::StatementCredit => self.statement_credit = amount,
        }
    }

    /// Whether any column holds a positive amount
    pub fn has_positive(&self) -> bool {
        let zero = BigDecimal::from(0);
        ReportColumn::ALL.iter().any(|c| *self.get(*c) > zero)
    }

    /// Column-wise sum
    pub fn add(&self, other: &ColumnAmounts) -> ColumnAmounts {
        ColumnAmounts {
            journal_debit: &self.journal_debit + &other.journal_debit,
            journal_credit: &self.journal_credit + &other.journal_credit,
            statement_debit: &self.statement_debit + &other.statement_debit,
            statement_credit: &self.statement_credit + &other.statement_credit,
        }
    }
}

/// A suspense item carried forward from the previous period's reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorStateLine {
    pub date: Option<NaiveDate>,
    pub label: String,
    #[serde(flatten)]
    pub amounts: ColumnAmounts,
}

impl PriorStateLine {
    pub fn new(date: Option<NaiveDate>, label: impl Into<String>, amounts: ColumnAmounts) -> Self {
        Self {
            date,
            label: label.into(),
            amounts,
        }
    }

    /// Whether the label marks a summary row (totals, balances) rather than an item
    pub fn is_summary_row(&self) -> bool {
        let label = self.label.to_lowercase();
        ["total", "totaux", "solde", "balance"]
            .iter()
            .any(|marker| label.contains(marker))
    }
}

/// Association of two entries believed to represent the same economic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchedPair {
    /// A statement entry paired with a journal entry of this period
    Direct {
        statement: usize,
        journal: usize,
        amount: BigDecimal,
    },
    /// A prior-period slot resolved by an entry of this period
    CarryForward {
        prior_line: usize,
        slot: ReportColumn,
        entry: EntryRef,
        amount: BigDecimal,
    },
}

impl MatchedPair {
    /// Entries of this period consumed by the pair
    pub fn entries(&self) -> Vec<EntryRef> {
        match self {
            MatchedPair::Direct {
                statement, journal, ..
            } => vec![EntryRef::statement(*statement), EntryRef::journal(*journal)],
            MatchedPair::CarryForward { entry, .. } => vec![*entry],
        }
    }
}

/// Why two entries were treated as cancelling each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CancellationReason {
    /// Journal posting and its negative reversal in the same column
    ExactReversal { column: Column },
    /// Statement debit and credit of equal amount sharing a reference number
    SharedReference { token: String },
}

/// Two entries of the same record that net to zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationPair {
    pub source: Source,
    pub first: usize,
    pub second: usize,
    pub amount: BigDecimal,
    pub reason: CancellationReason,
}

/// Extraction noise found while building or correcting statement entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionAnomaly {
    pub kind: AnomalyKind,
    /// Index in the produced entry sequence, when the entry was kept
    pub entry: Option<usize>,
    pub detail: String,
}

impl ExtractionAnomaly {
    pub fn new(kind: AnomalyKind, entry: Option<usize>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            entry,
            detail: detail.into(),
        }
    }
}

/// Errors that abort a reconciliation run
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Invalid layout profile: {0}")]
    InvalidProfile(String),
    #[error("Unsupported statement layout: {0}")]
    UnsupportedLayout(String),
    #[error("Missing column '{column}' in {input}")]
    MissingColumn { input: String, column: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Token source error: {0}")]
    Source(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn test_double_sided_detection() {
        let mut entry = LedgerEntry::statement(
            date(1),
            "VIR",
            BigDecimal::from(100),
            BigDecimal::from(0),
            BigDecimal::from(900),
        );
        assert!(!entry.is_double_sided());
        entry.credit = BigDecimal::from(50);
        assert!(entry.is_double_sided());
        assert_eq!(entry.net_movement(), BigDecimal::from(-50));
    }

    #[test]
    fn test_flag_is_recorded_once() {
        let mut entry =
            LedgerEntry::journal(date(2), "X", BigDecimal::from(1), BigDecimal::from(0));
        entry.flag(AnomalyKind::BalanceMismatch);
        entry.flag(AnomalyKind::BalanceMismatch);
        assert_eq!(entry.anomalies, vec![AnomalyKind::BalanceMismatch]);
        assert!(entry.is_flagged());
    }

    #[test]
    fn test_summary_rows_are_recognised() {
        let line = PriorStateLine::new(None, "Totaux", ColumnAmounts::default());
        assert!(line.is_summary_row());
        let line = PriorStateLine::new(
            None,
            "Solde rectifié au 30/09/2025",
            ColumnAmounts::default(),
        );
        assert!(line.is_summary_row());
        let line = PriorStateLine::new(None, "CHQ 1234567", ColumnAmounts::default());
        assert!(!line.is_summary_row());
    }

    #[test]
    fn test_column_amounts() {
        let a = ColumnAmounts::single(ReportColumn::StatementDebit, BigDecimal::from(800));
        assert!(a.has_positive());
        assert_eq!(a.get(ReportColumn::StatementDebit), &BigDecimal::from(800));
        let sum = a.add(&ColumnAmounts::single(ReportColumn::JournalDebit, BigDecimal::from(5)));
        assert_eq!(sum.journal_debit, BigDecimal::from(5));
        assert_eq!(sum.statement_debit, BigDecimal::from(800));
        assert!(!ColumnAmounts::default().has_positive());
    }
}
