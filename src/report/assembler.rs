//! Assembly of the four-column reconciliation statement

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ReconcileSettings;
use crate::reconciliation::ReconciliationOutcome;
use crate::types::*;

/// Where a report row comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowOrigin {
    /// Position in the carried-forward list
    CarriedForward { line: usize },
    Journal { index: usize },
    Statement { index: usize },
}

/// One line of the reconciliation statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: Option<NaiveDate>,
    pub label: String,
    pub amounts: ColumnAmounts,
    pub origin: RowOrigin,
}

/// Closing balances of both records, located by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosingBalances {
    pub journal: BigDecimal,
    pub statement: BigDecimal,
}

impl ClosingBalances {
    pub fn new(journal: BigDecimal, statement: BigDecimal) -> Self {
        Self { journal, statement }
    }
}

/// Sizes of the outcome partitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub journal_cancelled: usize,
    pub statement_cancelled: usize,
    pub statement_suspense: usize,
    pub journal_suspense: usize,
    pub carried_forward: usize,
    pub excluded: usize,
}

/// Final snapshot of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    /// Date the reconciliation is drawn up at
    pub as_of: Option<NaiveDate>,
    /// Journal closing balance in journal debit, statement closing balance
    /// in statement credit
    pub opening: ColumnAmounts,
    /// Suspense rows sorted by date, undated rows first
    pub rows: Vec<ReportRow>,
    pub totals: ColumnAmounts,
    pub rectified: ColumnAmounts,
    pub grand_totals: ColumnAmounts,
    pub statement_suspense: Vec<LedgerEntry>,
    pub journal_suspense: Vec<LedgerEntry>,
    pub journal_cancellations: Vec<CancellationPair>,
    pub statement_cancellations: Vec<CancellationPair>,
    pub matched: Vec<MatchedPair>,
    pub carried_forward: Vec<PriorStateLine>,
    pub excluded: Vec<EntryRef>,
    pub summary: ReconciliationSummary,
}

impl ReconciliationResult {
    /// Whether nothing is left in suspense on either side
    pub fn is_fully_reconciled(&self) -> bool {
        self.rows.is_empty()
    }

    /// Caption of the rectified balance line
    pub fn rectified_caption(&self) -> String {
        match self.as_of {
            Some(date) => format!("Solde rectifié au {}", date.format("%d/%m/%Y")),
            None => "Solde rectifié".to_string(),
        }
    }
}

/// Turns a matcher outcome into a [`ReconciliationResult`]
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    rectify_threshold: BigDecimal,
}

impl ReportAssembler {
    pub fn new(settings: &ReconcileSettings) -> Self {
        Self {
            rectify_threshold: settings.rectify_threshold.clone(),
        }
    }

    /// Build the report. Unmatched entries are mirrored into the other
    /// record's columns: a journal debit the bank has not seen is shown as
    /// a statement credit, and so on.
    pub fn assemble(
        &self,
        statement: &[LedgerEntry],
        journal: &[LedgerEntry],
        outcome: ReconciliationOutcome,
        closing: &ClosingBalances,
        as_of: Option<NaiveDate>,
    ) -> ReconciliationResult {
        let zero = BigDecimal::from(0);
        let mut rows = Vec::new();

        for (line, prior) in outcome.carried_forward.iter().enumerate() {
            rows.push(ReportRow {
                date: prior.date,
                label: prior.label.clone(),
                amounts: prior.amounts.clone(),
                origin: RowOrigin::CarriedForward { line },
            });
        }

        for &index in &outcome.journal_suspense {
            let entry = &journal[index];
            let column = if entry.debit > zero {
                ReportColumn::StatementCredit
            } else if entry.credit > zero {
                ReportColumn::StatementDebit
            } else {
                warn!(
                    index,
                    label = %entry.label,
                    "Journal suspense entry with no positive amount left off the report"
                );
                continue;
            };
            rows.push(mirrored_row(entry, column, RowOrigin::Journal { index }));
        }

        for &index in &outcome.statement_suspense {
            let entry = &statement[index];
            let column = if entry.debit > zero {
                ReportColumn::JournalCredit
            } else if entry.credit > zero {
                ReportColumn::JournalDebit
            } else {
                continue;
            };
            rows.push(mirrored_row(entry, column, RowOrigin::Statement { index }));
        }

        rows.sort_by_key(|row| row.date);

        let mut opening =
            ColumnAmounts::single(ReportColumn::JournalDebit, closing.journal.clone());
        opening.set(ReportColumn::StatementCredit, closing.statement.clone());

        let totals = rows
            .iter()
            .fold(opening.clone(), |acc, row| acc.add(&row.amounts));
        let rectified = self.rectify(&totals);
        let grand_totals = totals.add(&rectified);

        let summary = ReconciliationSummary {
            matched: outcome.matched.len(),
            journal_cancelled: outcome.journal_cancellations.len(),
            statement_cancelled: outcome.statement_cancellations.len(),
            statement_suspense: outcome.statement_suspense.len(),
            journal_suspense: outcome.journal_suspense.len(),
            carried_forward: outcome.carried_forward.len(),
            excluded: outcome.excluded.len(),
        };

        info!(
            rows = rows.len(),
            journal_debit = %grand_totals.journal_debit,
            statement_credit = %grand_totals.statement_credit,
            "Reconciliation statement assembled"
        );

        ReconciliationResult {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now().naive_utc(),
            as_of,
            opening,
            rows,
            totals,
            rectified,
            grand_totals,
            statement_suspense: outcome
                .statement_suspense
                .iter()
                .map(|i| statement[*i].clone())
                .collect(),
            journal_suspense: outcome
                .journal_suspense
                .iter()
                .map(|i| journal[*i].clone())
                .collect(),
            journal_cancellations: outcome.journal_cancellations,
            statement_cancellations: outcome.statement_cancellations,
            matched: outcome.matched,
            carried_forward: outcome.carried_forward,
            excluded: outcome.excluded,
            summary,
        }
    }

    /// Amounts that bring each side's debit and credit totals level;
    /// differences within the threshold are left blank
    pub fn rectify(&self, totals: &ColumnAmounts) -> ColumnAmounts {
        let gap = |a: &BigDecimal, b: &BigDecimal| {
            let diff = a - b;
            if diff > self.rectify_threshold {
                diff
            } else {
                BigDecimal::from(0)
            }
        };
        ColumnAmounts {
            journal_debit: gap(&totals.journal_credit, &totals.journal_debit),
            journal_credit: gap(&totals.journal_debit, &totals.journal_credit),
            statement_debit: gap(&totals.statement_credit, &totals.statement_debit),
            statement_credit: gap(&totals.statement_debit, &totals.statement_credit),
        }
    }
}

fn mirrored_row(entry: &LedgerEntry, column: ReportColumn, origin: RowOrigin) -> ReportRow {
    ReportRow {
        date: entry.date,
        label: entry.label.clone(),
        amounts: ColumnAmounts::single(column, entry.amount(column.column().opposite()).clone()),
        origin,
    }
}
