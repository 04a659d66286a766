//! Column classification of grouped rows into raw statement entries

use std::sync::OnceLock;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use crate::extraction::grouper::{normalize_marker_text, TextRow};
use crate::extraction::profile::{LayoutProfile, Zone};
use crate::types::*;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").expect("valid regex"))
}

fn number_like_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\d.,]+$").expect("valid regex"))
}

/// Whether the token text looks like a `D/M/Y` date
pub fn is_date_token(text: &str) -> bool {
    date_pattern().is_match(text.trim())
}

/// Parse a `D/M/Y` date; two-digit years map to 1969..=2068
pub fn parse_statement_date(text: &str) -> Option<NaiveDate> {
    let caps = date_pattern().captures(text.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_text = &caps[3];
    let mut year: i32 = year_text.parse().ok()?;
    if year_text.len() == 2 {
        year += if year < 69 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Strip every non-digit character and read the rest as a whole amount.
/// Empty input yields zero.
pub fn clean_amount(text: &str) -> BigDecimal {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return BigDecimal::from(0);
    }
    digits
        .parse::<BigDecimal>()
        .unwrap_or_else(|_| BigDecimal::from(0))
}

/// Whether a token routed to an amount zone really is an amount fragment
/// rather than label text spilling to the right
pub fn is_amount_fragment(text: &str, max_digits: usize) -> bool {
    if text.chars().any(|c| c.is_alphabetic() || c == '/') {
        return false;
    }
    text.chars().filter(|c| c.is_ascii_digit()).count() <= max_digits
}

/// Collapse whitespace and drop table rule characters from a label
pub fn clean_label(text: &str) -> String {
    text.replace('|', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Column texts accumulated for the transaction being built
#[derive(Debug, Clone, Default, PartialEq)]
struct PendingEntry {
    page: usize,
    date: String,
    value_date: String,
    label: String,
    debit: String,
    credit: String,
    balance: String,
}

#[derive(Debug, Clone, PartialEq)]
enum ScanState {
    Idle,
    Accumulating(PendingEntry),
}

/// Raw statement entries with the anomalies found while building them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedStatement {
    pub entries: Vec<LedgerEntry>,
    pub anomalies: Vec<ExtractionAnomaly>,
}

/// Single-pass scanner turning rows into statement entries.
///
/// Holds exactly one transaction under construction. A row opening with a
/// date in the date zone starts a new one; the previous one is finalized
/// first. Rows carrying a total marker and the end of input finalize too.
pub struct ColumnClassifier<'a> {
    profile: &'a LayoutProfile,
    state: ScanState,
    output: ClassifiedStatement,
}

impl<'a> ColumnClassifier<'a> {
    pub fn new(profile: &'a LayoutProfile) -> Self {
        Self {
            profile,
            state: ScanState::Idle,
            output: ClassifiedStatement::default(),
        }
    }

    /// Classify a whole row sequence
    pub fn classify(profile: &'a LayoutProfile, rows: &[TextRow]) -> ClassifiedStatement {
        let mut classifier = Self::new(profile);
        for row in rows {
            classifier.feed(row);
        }
        classifier.finish()
    }

    /// Whether a transaction is being accumulated
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, ScanState::Accumulating(_))
    }

    /// Consume one row
    pub fn feed(&mut self, row: &TextRow) {
        if let Some(first) = row.tokens.first() {
            if self.profile.zone_for(first.x) == Zone::Date && is_date_token(&first.text) {
                self.finalize();
                self.state = ScanState::Accumulating(PendingEntry {
                    page: row.page,
                    ..PendingEntry::default()
                });
            }

            // Rows before the first dated row are not part of the table
            if let ScanState::Accumulating(pending) = &mut self.state {
                for token in &row.tokens {
                    route_token(self.profile, pending, token);
                }
            }
        }

        if row.closes_transaction {
            self.finalize();
        }
    }

    /// Close the transaction in progress, if any
    pub fn finalize(&mut self) {
        let pending = match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Idle => return,
            ScanState::Accumulating(pending) => pending,
        };

        let index = self.output.entries.len();
        let date = parse_statement_date(&pending.date);
        let label = clean_label(&pending.label);

        let Some(date) = date else {
            warn!(
                page = pending.page,
                date = %pending.date,
                label = %label,
                "Dropping statement row without a usable date"
            );
            self.output.anomalies.push(ExtractionAnomaly::new(
                AnomalyKind::UndatedRow,
                None,
                format!("page {}: '{}' {}", pending.page + 1, pending.date, label),
            ));
            return;
        };

        let mut entry = LedgerEntry {
            date: Some(date),
            value_date: parse_statement_date(&pending.value_date),
            label,
            debit: clean_amount(&pending.debit),
            credit: clean_amount(&pending.credit),
            balance: if pending.balance.trim().is_empty() {
                None
            } else {
                Some(clean_amount(&pending.balance))
            },
            source: Source::Statement,
            anomalies: Vec::new(),
        };

        for (name, raw) in [
            ("debit", &pending.debit),
            ("credit", &pending.credit),
            ("balance", &pending.balance),
        ] {
            if !raw.trim().is_empty() && !raw.chars().any(|c| c.is_ascii_digit()) {
                entry.flag(AnomalyKind::UnreadableAmount);
                self.output.anomalies.push(ExtractionAnomaly::new(
                    AnomalyKind::UnreadableAmount,
                    Some(index),
                    format!("{} cell '{}' holds no digits", name, raw),
                ));
            }
        }

        debug!(
            index,
            date = %date,
            debit = %entry.debit,
            credit = %entry.credit,
            "Statement entry finalized"
        );
        self.output.entries.push(entry);
    }

    /// Finalize the pending transaction and return everything produced
    pub fn finish(mut self) -> ClassifiedStatement {
        self.finalize();
        self.output
    }
}

fn route_token(profile: &LayoutProfile, pending: &mut PendingEntry, token: &PositionedToken) {
    let text = token.text.as_str();
    match profile.zone_for(token.x) {
        Zone::Date => {
            if pending.date.is_empty() {
                pending.date = text.to_string();
            }
        }
        Zone::Label => push_label(pending, text),
        Zone::ValueDate => pending.value_date.push_str(text),
        zone => {
            if !is_amount_fragment(text, profile.max_amount_digits) {
                push_label(pending, text);
                return;
            }
            match zone {
                Zone::Debit => pending.debit.push_str(text),
                Zone::Credit => pending.credit.push_str(text),
                _ => pending.balance.push_str(text),
            }
        }
    }
}

fn push_label(pending: &mut PendingEntry, text: &str) {
    if !pending.label.is_empty() {
        pending.label.push(' ');
    }
    pending.label.push_str(text);
}

/// Locate the opening balance on the first page: the marker words on one
/// line, then the number-like fragments to their right on that line
pub fn detect_opening_balance(
    profile: &LayoutProfile,
    first_page: &[PositionedToken],
) -> Option<BigDecimal> {
    let markers: Vec<String> = profile
        .opening_balance_marker
        .iter()
        .map(|m| normalize_marker_text(m))
        .collect();
    let (anchor_word, leading_words) = markers.split_last()?;
    let tolerance = profile.opening_balance_tolerance;

    let anchor = first_page.iter().find(|token| {
        if !normalize_marker_text(&token.text).contains(anchor_word.as_str()) {
            return false;
        }
        let line: String = first_page
            .iter()
            .filter(|t| (t.y - token.y).abs() < tolerance && t.x <= token.x)
            .map(|t| normalize_marker_text(&t.text))
            .collect();
        leading_words.iter().all(|w| line.contains(w.as_str()))
    })?;

    let mut fragments: Vec<&PositionedToken> = first_page
        .iter()
        .filter(|t| {
            (t.y - anchor.y).abs() < tolerance
                && t.x > anchor.x
                && number_like_pattern().is_match(t.text.trim())
        })
        .collect();
    if fragments.is_empty() {
        warn!(profile = %profile.name, "Opening balance marker found without an amount");
        return None;
    }
    fragments.sort_by(|a, b| a.x.total_cmp(&b.x));

    let joined: String = fragments.iter().map(|t| t.text.as_str()).collect();
    let amount = clean_amount(&joined);
    debug!(amount = %amount, "Opening balance detected");
    Some(amount)
}
