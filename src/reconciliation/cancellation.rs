//! Removal of self-cancelling entries
//!
//! Two passes: journal postings reversed by a negative amount in the same
//! column, and statement debit/credit pairs of equal amount whose labels
//! quote the same reference number.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use bigdecimal::BigDecimal;
use regex::Regex;
use tracing::debug;

use crate::types::*;

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// Numeric reference tokens of a label with at least `min_digits` digits
/// as printed, returned with leading zeros removed
pub fn reference_tokens(label: &str, min_digits: usize) -> HashSet<String> {
    digits_pattern()
        .find_iter(label)
        .filter(|m| m.as_str().len() >= min_digits)
        .map(|m| match m.as_str().trim_start_matches('0') {
            "" => "0".to_string(),
            stripped => stripped.to_string(),
        })
        .collect()
}

/// Pair journal postings with their reversals.
///
/// For the debit column and then the credit column, each negative amount
/// is paired with the first unpaired positive amount of equal magnitude
/// seen before or after it, comparing amounts rounded to `scale` decimals.
/// Only the `candidates` indices are considered. An entry paired in the
/// debit column is not reconsidered for credit.
pub fn journal_reversals(
    entries: &[LedgerEntry],
    candidates: &[usize],
    scale: i64,
) -> Vec<CancellationPair> {
    let mut pairs = Vec::new();
    let mut used: HashSet<usize> = HashSet::new();

    for column in [Column::Debit, Column::Credit] {
        let zero = BigDecimal::from(0);
        let mut positives: HashMap<BigDecimal, VecDeque<usize>> = HashMap::new();
        let mut negatives: HashMap<BigDecimal, VecDeque<usize>> = HashMap::new();
        let mut order: Vec<BigDecimal> = Vec::new();

        for &index in candidates {
            if used.contains(&index) {
                continue;
            }
            let amount = entries[index].amount(column);
            if *amount == zero {
                continue;
            }
            let key = amount.abs().round(scale).normalized();
            if !positives.contains_key(&key) && !negatives.contains_key(&key) {
                order.push(key.clone());
            }
            let queue = if *amount > zero {
                positives.entry(key).or_default()
            } else {
                negatives.entry(key).or_default()
            };
            queue.push_back(index);
        }

        for key in order {
            let (Some(pos), Some(neg)) = (positives.get_mut(&key), negatives.get_mut(&key)) else {
                continue;
            };
            while let (Some(p), Some(n)) = (pos.pop_front(), neg.pop_front()) {
                let (first, second) = if p < n { (p, n) } else { (n, p) };
                debug!(first, second, ?column, amount = %key, "Journal reversal paired");
                used.insert(first);
                used.insert(second);
                pairs.push(CancellationPair {
                    source: Source::Journal,
                    first,
                    second,
                    amount: key.clone(),
                    reason: CancellationReason::ExactReversal { column },
                });
            }
        }
    }

    pairs.sort_by_key(|pair| pair.first);
    pairs
}

/// Pair statement debits with credits of the same amount whose labels
/// share a reference number.
///
/// Only the `candidates` indices are considered. Debits are scanned in
/// order; each takes the first unused credit that qualifies.
pub fn statement_shared_references(
    entries: &[LedgerEntry],
    candidates: &[usize],
    min_digits: usize,
) -> Vec<CancellationPair> {
    let zero = BigDecimal::from(0);
    let mut used: HashSet<usize> = HashSet::new();
    let mut pairs = Vec::new();

    for &debit_index in candidates {
        let debit = &entries[debit_index];
        if debit.debit <= zero || used.contains(&debit_index) {
            continue;
        }
        let debit_refs = reference_tokens(&debit.label, min_digits);
        if debit_refs.is_empty() {
            continue;
        }

        let found = candidates.iter().copied().find_map(|credit_index| {
            let credit = &entries[credit_index];
            if credit_index == debit_index
                || used.contains(&credit_index)
                || credit.credit <= zero
                || credit.credit != debit.debit
            {
                return None;
            }
            let credit_refs = reference_tokens(&credit.label, min_digits);
            let mut shared: Vec<&String> = debit_refs.intersection(&credit_refs).collect();
            shared.sort();
            shared.first().map(|token| (credit_index, (*token).clone()))
        });

        if let Some((credit_index, token)) = found {
            debug!(
                debit_index,
                credit_index,
                token = %token,
                "Statement pair cancelled by shared reference"
            );
            used.insert(debit_index);
            used.insert(credit_index);
            pairs.push(CancellationPair {
                source: Source::Statement,
                first: debit_index,
                second: credit_index,
                amount: debit.debit.clone(),
                reason: CancellationReason::SharedReference { token },
            });
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 6).unwrap()
    }

    fn all(entries: &[LedgerEntry]) -> Vec<usize> {
        (0..entries.len()).collect()
    }

    fn journal(label: &str, debit: &str, credit: &str) -> LedgerEntry {
        LedgerEntry::journal(date(), label, debit.parse().unwrap(), credit.parse().unwrap())
    }

    fn statement(label: &str, debit: i64, credit: i64) -> LedgerEntry {
        LedgerEntry::statement(
            date(),
            label,
            BigDecimal::from(debit),
            BigDecimal::from(credit),
            BigDecimal::from(0),
        )
    }

    #[test]
    fn test_reversal_removes_exactly_the_pair() {
        let entries = vec![
            journal("FACTURE 12", "1500", "0"),
            journal("ANNULATION FACTURE 12", "-1500", "0"),
            journal("FRAIS", "200", "0"),
        ];
        let pairs = journal_reversals(&entries, &all(&entries), 4);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 1));
        assert_eq!(pairs[0].amount, BigDecimal::from(1500));
    }

    #[test]
    fn test_reversal_rounds_before_comparing() {
        let entries = vec![
            journal("A", "0", "100.00001"),
            journal("B", "0", "-100.00004"),
        ];
        let pairs = journal_reversals(&entries, &all(&entries), 4);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].reason,
            CancellationReason::ExactReversal {
                column: Column::Credit
            }
        );
    }

    #[test]
    fn test_reversal_pairs_first_seen() {
        let entries = vec![
            journal("A", "300", "0"),
            journal("B", "300", "0"),
            journal("C", "-300", "0"),
        ];
        let pairs = journal_reversals(&entries, &all(&entries), 4);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 2));
    }

    #[test]
    fn test_entry_used_once_across_columns() {
        let entries = vec![
            journal("A", "50", "-70"),
            journal("B", "-50", "0"),
            journal("C", "0", "70"),
        ];
        let pairs = journal_reversals(&entries, &all(&entries), 4);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 1));
    }

    #[test]
    fn test_reference_tokens() {
        let refs = reference_tokens("CHQ 0045123 DU 12/10", 3);
        assert!(refs.contains("45123"));
        assert!(!refs.contains("12"));
        assert!(reference_tokens("FRAIS 07", 3).is_empty());
        assert!(reference_tokens("CHQ 0012", 3).contains("12"));
    }

    #[test]
    fn test_zero_padded_reference_cancels_pair() {
        let entries = vec![
            statement("CHQ 0012", 3000, 0),
            statement("REJET CHQ 0012", 0, 3000),
        ];
        let pairs = statement_shared_references(&entries, &[0, 1], 3);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 1));
        assert_eq!(
            pairs[0].reason,
            CancellationReason::SharedReference {
                token: "12".to_string()
            }
        );
    }

    #[test]
    fn test_shared_reference_cancels_pair() {
        let entries = vec![
            statement("CHQ 0045123", 3000, 0),
            statement("RETRAIT CHEQUE 45123", 0, 3000),
        ];
        let pairs = statement_shared_references(&entries, &[0, 1], 3);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].reason,
            CancellationReason::SharedReference {
                token: "45123".to_string()
            }
        );
    }

    #[test]
    fn test_shared_reference_requires_equal_amounts() {
        let entries = vec![
            statement("CHQ 45123", 3000, 0),
            statement("CHQ 45123", 0, 2500),
        ];
        assert!(statement_shared_references(&entries, &[0, 1], 3).is_empty());
    }

    #[test]
    fn test_credit_reused_at_most_once() {
        let entries = vec![
            statement("CHQ 45123", 3000, 0),
            statement("CHQ 45123 BIS", 3000, 0),
            statement("REJET CHQ 45123", 0, 3000),
        ];
        let pairs = statement_shared_references(&entries, &[0, 1, 2], 3);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 2));
    }
}
