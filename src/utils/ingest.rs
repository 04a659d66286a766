//! Ingestion of tabular journal and prior-period data

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extraction::classifier::parse_statement_date;
use crate::types::*;
use crate::utils::validation::{find_column, require_columns};

const DATE: &[&str] = &["date"];
const LABEL: &[&str] = &["libelle", "label", "libelles"];
const DEBIT: &[&str] = &["debit"];
const CREDIT: &[&str] = &["credit"];
const BALANCE: &[&str] = &["solde", "balance"];

/// A table of text cells as read from a spreadsheet or CSV file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularInput {
    /// Name used in error messages
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularInput {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }
}

/// Journal entries read from a table, with the journal's closing balance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalImport {
    pub entries: Vec<LedgerEntry>,
    /// Last non-blank balance cell, when the table has a balance column
    pub closing_balance: Option<BigDecimal>,
}

/// Parse a signed amount cell. Spaces are thousands separators; a comma
/// is the decimal mark unless the cell also holds a point.
pub fn parse_signed_amount(text: &str) -> Option<BigDecimal> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    if compact.is_empty() {
        return None;
    }
    let normalized = if compact.contains(',') && compact.contains('.') {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact.replace(',', ".")
    };
    normalized.parse::<BigDecimal>().ok()
}

/// Parse a date cell: `D/M/Y`, or ISO `YYYY-MM-DD` optionally followed
/// by a time
pub fn parse_cell_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_statement_date(text).or_else(|| {
        let day = text.get(..10).unwrap_or(text);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    })
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.as_str()).unwrap_or("")
}

fn amount_cell(table: &str, row: usize, column: &str, text: &str) -> BigDecimal {
    if text.trim().is_empty() {
        return BigDecimal::from(0);
    }
    parse_signed_amount(text).unwrap_or_else(|| {
        warn!(table, row, column, text, "Unreadable amount cell read as zero");
        BigDecimal::from(0)
    })
}

/// Read journal entries from a table with `date`, `libelle`, `debit` and
/// `credit` columns. Rows without a usable date are kept with no date so
/// that matching can account for them.
pub fn journal_from_table(table: &TabularInput) -> ReconcileResult<JournalImport> {
    let columns = require_columns(&table.name, &table.headers, &[DATE, LABEL, DEBIT, CREDIT])?;
    let (date_col, label_col, debit_col, credit_col) =
        (columns[0], columns[1], columns[2], columns[3]);
    let balance_col = find_column(&table.headers, BALANCE);

    let mut entries = Vec::with_capacity(table.rows.len());
    let mut closing_balance = None;

    for (index, row) in table.rows.iter().enumerate() {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        if let Some(col) = balance_col {
            if let Some(balance) = parse_signed_amount(cell(row, col)) {
                closing_balance = Some(balance);
            }
        }

        let date_text = cell(row, date_col);
        let date = parse_cell_date(date_text);
        if date.is_none() {
            debug!(
                table = %table.name,
                row = index,
                date = date_text,
                "Journal row without a usable date"
            );
        }

        entries.push(LedgerEntry {
            date,
            value_date: None,
            label: cell(row, label_col).trim().to_string(),
            debit: amount_cell(&table.name, index, "debit", cell(row, debit_col)),
            credit: amount_cell(&table.name, index, "credit", cell(row, credit_col)),
            balance: None,
            source: Source::Journal,
            anomalies: Vec::new(),
        });
    }

    debug!(table = %table.name, entries = entries.len(), "Journal table read");
    Ok(JournalImport {
        entries,
        closing_balance,
    })
}

/// Drop summary rows (totals, balances) from prior-period lines
pub fn prior_state_from_lines(lines: Vec<PriorStateLine>) -> Vec<PriorStateLine> {
    lines
        .into_iter()
        .filter(|line| {
            let keep = !line.is_summary_row();
            if !keep {
                debug!(label = %line.label, "Skipping prior-period summary row");
            }
            keep
        })
        .collect()
}

/// Read prior-period lines from the body of a previous reconciliation
/// statement: date, label, then the four amount columns in report order.
/// Short rows and summary rows are skipped; unreadable amounts count as zero.
pub fn prior_state_from_table(table: &TabularInput) -> Vec<PriorStateLine> {
    let lines = table
        .rows
        .iter()
        .filter(|row| row.len() >= 6)
        .map(|row| {
            let mut amounts = ColumnAmounts::default();
            for (offset, column) in ReportColumn::ALL.into_iter().enumerate() {
                let value = parse_signed_amount(cell(row, 2 + offset)).unwrap_or_default();
                amounts.set(column, value);
            }
            PriorStateLine::new(parse_cell_date(cell(row, 0)), cell(row, 1).trim(), amounts)
        })
        .collect();
    prior_state_from_lines(lines)
}

/// Last balance present in an entry sequence
pub fn last_balance(entries: &[LedgerEntry]) -> Option<BigDecimal> {
    entries.iter().rev().find_map(|entry| entry.balance.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn journal_table() -> TabularInput {
        TabularInput::new(
            "journal",
            strings(&["Date", "Libellé", "Débit", "Crédit", "Solde"]),
            vec![
                strings(&["01/10/2025", "Chèque client", "12 000", "", "112 000"]),
                strings(&["2025-10-03", "Annulation", "-1 500,50", "", ""]),
                strings(&["", "", "", "", ""]),
                strings(&["n/a", "Report", "", "300", "111 700"]),
            ],
        )
    }

    #[test]
    fn test_signed_amounts() {
        assert_eq!(parse_signed_amount("12 000"), Some(BigDecimal::from(12_000)));
        assert_eq!(
            parse_signed_amount("-1 500,50"),
            Some("-1500.50".parse().unwrap())
        );
        assert_eq!(
            parse_signed_amount("1.234,5"),
            Some("1234.5".parse().unwrap())
        );
        assert_eq!(parse_signed_amount("  "), None);
        assert_eq!(parse_signed_amount("abc"), None);
    }

    #[test]
    fn test_cell_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 10, 3);
        assert_eq!(parse_cell_date("03/10/2025"), expected);
        assert_eq!(parse_cell_date("2025-10-03"), expected);
        assert_eq!(parse_cell_date("2025-10-03 00:00:00"), expected);
        assert_eq!(parse_cell_date("soon"), None);
    }

    #[test]
    fn test_journal_from_table() {
        let import = journal_from_table(&journal_table()).unwrap();
        assert_eq!(import.entries.len(), 3);
        assert_eq!(import.entries[0].debit, BigDecimal::from(12_000));
        assert_eq!(import.entries[1].debit, "-1500.50".parse::<BigDecimal>().unwrap());
        assert_eq!(import.entries[2].date, None);
        assert_eq!(import.entries[2].credit, BigDecimal::from(300));
        assert!(import.entries.iter().all(|e| e.source == Source::Journal));
        assert_eq!(import.closing_balance, Some(BigDecimal::from(111_700)));
    }

    #[test]
    fn test_missing_journal_column_is_fatal() {
        let table = TabularInput::new(
            "grand-livre",
            strings(&["Date", "Libellé", "Montant"]),
            Vec::new(),
        );
        assert!(matches!(
            journal_from_table(&table),
            Err(ReconcileError::MissingColumn { ref input, ref column })
                if input == "grand-livre" && column == "debit"
        ));
    }

    #[test]
    fn test_prior_state_skips_summary_rows() {
        let table = TabularInput::new(
            "etat precedent",
            Vec::new(),
            vec![
                strings(&["12/09/2025", "CHQ 881 non débité", "", "", "800", ""]),
                strings(&["", "Totaux", "1000", "200", "800", "0"]),
                strings(&["", "Solde rectifié", "", "800", "", ""]),
                strings(&["short"]),
            ],
        );
        let lines = prior_state_from_table(&table);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amounts.statement_debit, BigDecimal::from(800));
        assert_eq!(lines[0].date, NaiveDate::from_ymd_opt(2025, 9, 12));
    }

    #[test]
    fn test_last_balance() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let mut entries = vec![
            LedgerEntry::statement(
                date,
                "A",
                BigDecimal::from(0),
                BigDecimal::from(10),
                BigDecimal::from(110),
            ),
            LedgerEntry::statement(
                date,
                "B",
                BigDecimal::from(5),
                BigDecimal::from(0),
                BigDecimal::from(105),
            ),
        ];
        assert_eq!(last_balance(&entries), Some(BigDecimal::from(105)));
        entries[1].balance = None;
        assert_eq!(last_balance(&entries), Some(BigDecimal::from(110)));
        assert_eq!(last_balance(&[]), None);
    }
}
