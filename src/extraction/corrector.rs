//! Running-balance driven repair of statement amounts
//!
//! Every statement line must satisfy
//! `balance = previous balance + credit - debit`. The corrector walks the
//! entries in document order and uses that invariant to undo OCR noise and
//! column mix-ups, but only when the fix is a plausible reading of what was
//! printed.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ReconcileSettings;
use crate::extraction::classifier::clean_amount;
use crate::extraction::plausibility::is_plausible_correction;
use crate::types::*;

/// What a correction changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionKind {
    /// Read balance replaced by the balance implied by the movements
    Balance,
    /// Missing balance filled from the movements
    BalanceFilled,
    /// Amount moved from the head of the label into its column
    LabelSpillover,
    /// Misread amount replaced by the expected one
    Amount,
    /// Amount read in the wrong column moved to the right one
    ColumnSwap,
    /// Both sides were set; the side contradicting the balance was cleared
    DoubleSidedResolved,
}

/// One applied correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub entry: usize,
    pub kind: CorrectionKind,
    /// Column written, for movement corrections
    pub column: Option<Column>,
    pub before: BigDecimal,
    pub after: BigDecimal,
}

/// Corrections applied and anomalies left behind by one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub corrections: Vec<Correction>,
    pub anomalies: Vec<ExtractionAnomaly>,
}

impl CorrectionOutcome {
    /// Whether the pass changed nothing
    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Validates and repairs statement entries against the running balance
#[derive(Debug, Clone)]
pub struct BalanceCorrector {
    epsilon: BigDecimal,
    similarity_threshold: f64,
}

impl BalanceCorrector {
    pub fn new(settings: &ReconcileSettings) -> Self {
        Self {
            epsilon: settings.balance_epsilon.clone(),
            similarity_threshold: settings.similarity_threshold,
        }
    }

    /// Correct the entries in place, starting from `opening_balance`
    pub fn correct(
        &self,
        entries: &mut [LedgerEntry],
        opening_balance: &BigDecimal,
    ) -> CorrectionOutcome {
        let mut outcome = CorrectionOutcome::default();
        let mut previous = opening_balance.clone();

        info!(
            entries = entries.len(),
            opening = %opening_balance,
            "Checking statement balances"
        );

        for (index, entry) in entries.iter_mut().enumerate() {
            previous = self.correct_entry(index, entry, &previous, &mut outcome);
        }

        if outcome.corrections.is_empty() {
            info!("No balance corrections needed");
        } else {
            info!(
                corrections = outcome.corrections.len(),
                anomalies = outcome.anomalies.len(),
                "Balance corrections applied"
            );
        }
        outcome
    }

    /// Correct one entry and return the balance the next entry builds on
    fn correct_entry(
        &self,
        index: usize,
        entry: &mut LedgerEntry,
        previous: &BigDecimal,
        outcome: &mut CorrectionOutcome,
    ) -> BigDecimal {
        let theoretical = previous + &entry.credit - &entry.debit;

        // Balance first: a corrupted balance would poison the movement check
        match entry.balance.clone() {
            None => {
                info!(index, balance = %theoretical, "Filling missing balance");
                outcome.corrections.push(Correction {
                    entry: index,
                    kind: CorrectionKind::BalanceFilled,
                    column: None,
                    before: BigDecimal::from(0),
                    after: theoretical.clone(),
                });
                entry.balance = Some(theoretical);
            }
            Some(read)
                if self.deviates(&read, &theoretical) && self.plausible(&read, &theoretical) =>
            {
                info!(index, read = %read, corrected = %theoretical, "Correcting balance");
                outcome.corrections.push(Correction {
                    entry: index,
                    kind: CorrectionKind::Balance,
                    column: None,
                    before: read,
                    after: theoretical.clone(),
                });
                entry.balance = Some(theoretical);
            }
            Some(_) => {}
        }

        let balance = entry.balance.clone().unwrap_or_default();
        let net = &balance - previous;
        let zero = BigDecimal::from(0);

        if net > zero {
            self.repair_movement(index, entry, Column::Credit, &net, outcome);
        } else if net < zero {
            self.repair_movement(index, entry, Column::Debit, &net.abs(), outcome);
        }

        if entry.is_double_sided() {
            self.resolve_double_sided(index, entry, &net, outcome);
        }

        let expected = previous + &entry.credit - &entry.debit;
        if self.deviates(&balance, &expected) {
            warn!(
                index,
                balance = %balance,
                expected = %expected,
                "Balance disagrees with movements and no plausible fix exists"
            );
            entry.flag(AnomalyKind::BalanceMismatch);
            outcome.anomalies.push(ExtractionAnomaly::new(
                AnomalyKind::BalanceMismatch,
                Some(index),
                format!("balance {} but movements give {}", balance, expected),
            ));
        }

        balance
    }

    /// Bring the movement in line with the expected amount on `column`
    fn repair_movement(
        &self,
        index: usize,
        entry: &mut LedgerEntry,
        column: Column,
        expected: &BigDecimal,
        outcome: &mut CorrectionOutcome,
    ) {
        let read = entry.amount(column).clone();
        if !self.deviates(&read, expected) {
            return;
        }
        let other = entry.amount(column.opposite()).clone();

        if read.is_zero() && other.is_zero() {
            if let Some(rest) = leading_label_amount(&entry.label, expected) {
                info!(index, ?column, amount = %expected, "Moving amount from label to its column");
                entry.label = rest;
                set_amount(entry, column, expected.clone());
                outcome.corrections.push(Correction {
                    entry: index,
                    kind: CorrectionKind::LabelSpillover,
                    column: Some(column),
                    before: read,
                    after: expected.clone(),
                });
            }
            return;
        }

        let kind = if !read.is_zero() && self.plausible(&read, expected) {
            CorrectionKind::Amount
        } else if !other.is_zero() && self.plausible(&other, expected) {
            CorrectionKind::ColumnSwap
        } else {
            return;
        };

        let before = if kind == CorrectionKind::Amount { read } else { other };
        info!(index, ?kind, ?column, before = %before, after = %expected, "Correcting movement");
        set_amount(entry, column, expected.clone());
        set_amount(entry, column.opposite(), BigDecimal::from(0));
        outcome.corrections.push(Correction {
            entry: index,
            kind,
            column: Some(column),
            before,
            after: expected.clone(),
        });
    }

    /// Both sides nonzero: keep the side the balance movement confirms,
    /// otherwise leave the entry as read and flag it
    fn resolve_double_sided(
        &self,
        index: usize,
        entry: &mut LedgerEntry,
        net: &BigDecimal,
        outcome: &mut CorrectionOutcome,
    ) {
        let zero = BigDecimal::from(0);
        let confirmed = if *net > zero {
            Some(Column::Credit)
        } else if *net < zero {
            Some(Column::Debit)
        } else {
            None
        };

        if let Some(column) = confirmed {
            if !self.deviates(entry.amount(column), &net.abs()) {
                let dropped = column.opposite();
                let before = entry.amount(dropped).clone();
                info!(
                    index,
                    ?dropped,
                    amount = %before,
                    "Clearing contradicted side of double-sided entry"
                );
                set_amount(entry, dropped, zero.clone());
                outcome.corrections.push(Correction {
                    entry: index,
                    kind: CorrectionKind::DoubleSidedResolved,
                    column: Some(dropped),
                    before,
                    after: zero,
                });
                return;
            }
        }

        warn!(
            index,
            debit = %entry.debit,
            credit = %entry.credit,
            "Entry has both debit and credit"
        );
        entry.flag(AnomalyKind::DoubleSided);
        outcome.anomalies.push(ExtractionAnomaly::new(
            AnomalyKind::DoubleSided,
            Some(index),
            format!("debit {} and credit {} both set", entry.debit, entry.credit),
        ));
    }

    fn deviates(&self, a: &BigDecimal, b: &BigDecimal) -> bool {
        (a - b).abs() > self.epsilon
    }

    fn plausible(&self, read: &BigDecimal, candidate: &BigDecimal) -> bool {
        is_plausible_correction(read, candidate, self.similarity_threshold)
    }
}

fn set_amount(entry: &mut LedgerEntry, column: Column, amount: BigDecimal) {
    match column {
        Column::Debit => entry.debit = amount,
        Column::Credit => entry.credit = amount,
    }
}

/// When the label's first word reads as exactly `expected`, the label
/// without that word
fn leading_label_amount(label: &str, expected: &BigDecimal) -> Option<String> {
    let label = label.trim();
    let (first, rest) = label.split_once(' ').unwrap_or((label, ""));
    if !first.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    (clean_amount(first) == *expected).then(|| rest.trim().to_string())
}

/// Indices of entries whose balance breaks the running-balance chain
pub fn balance_chain_breaks(
    entries: &[LedgerEntry],
    opening_balance: &BigDecimal,
    epsilon: &BigDecimal,
) -> Vec<usize> {
    let mut previous = opening_balance.clone();
    let mut breaks = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let balance = entry.balance.clone().unwrap_or_default();
        let expected = &previous + &entry.credit - &entry.debit;
        if (&balance - &expected).abs() > *epsilon {
            breaks.push(index);
        }
        previous = balance;
    }
    breaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(label: &str, debit: i64, credit: i64, balance: i64) -> LedgerEntry {
        LedgerEntry::statement(
            NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
            label,
            BigDecimal::from(debit),
            BigDecimal::from(credit),
            BigDecimal::from(balance),
        )
    }

    fn corrector() -> BalanceCorrector {
        BalanceCorrector::new(&ReconcileSettings::default())
    }

    #[test]
    fn test_consistent_sequence_untouched() {
        let mut entries = vec![
            entry("VERSEMENT", 0, 5000, 105_000),
            entry("RETRAIT", 2000, 0, 103_000),
        ];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(100_000));
        assert!(outcome.is_clean());
        assert!(outcome.anomalies.is_empty());
    }

    #[test]
    fn test_label_spillover_moved_to_credit() {
        let mut entries = vec![entry("29000 VERSEMENT ESPECES", 0, 0, 129_000)];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(100_000));

        assert_eq!(entries[0].credit, BigDecimal::from(29_000));
        assert_eq!(entries[0].label, "VERSEMENT ESPECES");
        assert_eq!(entries[0].balance, Some(BigDecimal::from(129_000)));
        assert_eq!(outcome.corrections.len(), 1);
        assert_eq!(outcome.corrections[0].kind, CorrectionKind::LabelSpillover);
        assert!(!entries[0].is_flagged());
    }

    #[test]
    fn test_noisy_credit_corrected() {
        // stray zero inserted by the reader
        let mut entries = vec![entry("VIREMENT", 0, 1_502_000, 252_000)];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(100_000));
        assert_eq!(entries[0].credit, BigDecimal::from(152_000));
        assert_eq!(entries[0].balance, Some(BigDecimal::from(252_000)));
        assert_eq!(outcome.corrections[0].kind, CorrectionKind::Amount);
    }

    #[test]
    fn test_corrupted_balance_corrected_first() {
        // trailing digits of the next column glued to the balance
        let mut entries = vec![entry("RETRAIT", 1_500, 0, 983_502)];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(99_850));
        assert_eq!(entries[0].balance, Some(BigDecimal::from(98_350)));
        assert_eq!(outcome.corrections[0].kind, CorrectionKind::Balance);
        assert!(!entries[0].is_flagged());
    }

    #[test]
    fn test_column_swap_repair() {
        let mut entries = vec![entry("FRAIS TENUE", 0, 7_500, 92_500)];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(100_000));
        assert_eq!(entries[0].debit, BigDecimal::from(7_500));
        assert_eq!(entries[0].credit, BigDecimal::from(0));
        assert_eq!(outcome.corrections[0].kind, CorrectionKind::ColumnSwap);
    }

    #[test]
    fn test_implausible_mismatch_flagged_not_changed() {
        let mut entries = vec![entry("CHEQUE", 5_000, 0, 92_000)];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(100_000));
        assert_eq!(entries[0].debit, BigDecimal::from(5_000));
        assert!(entries[0].anomalies.contains(&AnomalyKind::BalanceMismatch));
        assert_eq!(outcome.anomalies.len(), 1);
    }

    #[test]
    fn test_missing_balance_filled() {
        let mut entries = vec![entry("VERSEMENT", 0, 5_000, 0)];
        entries[0].balance = None;
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(10_000));
        assert_eq!(entries[0].balance, Some(BigDecimal::from(15_000)));
        assert_eq!(outcome.corrections[0].kind, CorrectionKind::BalanceFilled);
    }

    #[test]
    fn test_double_sided_entry_resolved_by_balance() {
        let mut entries = vec![entry("VIREMENT", 300, 4_000, 104_000)];
        let outcome = corrector().correct(&mut entries, &BigDecimal::from(100_000));
        // credit confirmed by the balance; the stray debit is cleared
        assert_eq!(entries[0].credit, BigDecimal::from(4_000));
        assert_eq!(entries[0].debit, BigDecimal::from(0));
        assert!(!entries[0].is_double_sided());
        assert!(outcome
            .corrections
            .iter()
            .any(|c| c.kind == CorrectionKind::DoubleSidedResolved));
    }

    #[test]
    fn test_unresolvable_double_sided_flagged() {
        let mut entries = vec![entry("VIREMENT", 500, 1_500, 101_000)];
        corrector().correct(&mut entries, &BigDecimal::from(100_000));
        assert!(entries[0].anomalies.contains(&AnomalyKind::DoubleSided));
    }

    #[test]
    fn test_correction_is_idempotent() {
        let mut entries = vec![
            entry("29000 VERSEMENT", 0, 0, 129_000),
            entry("VIREMENT", 0, 1_502_000, 281_000),
            entry("FRAIS", 0, 7_500, 273_500),
        ];
        let opening = BigDecimal::from(100_000);
        let first = corrector().correct(&mut entries, &opening);
        assert_eq!(first.corrections.len(), 3);
        let snapshot = entries.clone();

        let second = corrector().correct(&mut entries, &opening);
        assert!(second.is_clean());
        assert_eq!(entries, snapshot);
        assert!(balance_chain_breaks(&entries, &opening, &BigDecimal::from(1)).is_empty());
    }
}
