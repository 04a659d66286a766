//! Pairing of statement entries with journal entries

use std::collections::HashSet;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ReconcileSettings;
use crate::reconciliation::cancellation::{journal_reversals, statement_shared_references};
use crate::types::*;

/// Partition of the period's entries produced by the matcher.
///
/// Every usable entry ends up in exactly one of: a matched pair, a
/// cancellation pair, or a suspense list. Entries without a date or
/// without any movement are listed in `excluded` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// Unmatched statement entries, document order
    pub statement_suspense: Vec<usize>,
    /// Unmatched journal entries, journal order
    pub journal_suspense: Vec<usize>,
    pub journal_cancellations: Vec<CancellationPair>,
    pub statement_cancellations: Vec<CancellationPair>,
    pub matched: Vec<MatchedPair>,
    /// Prior-period lines with the slots still unresolved this period
    pub carried_forward: Vec<PriorStateLine>,
    pub excluded: Vec<EntryRef>,
}

impl ReconciliationOutcome {
    /// Every entry consumed by a match or a cancellation
    pub fn consumed_entries(&self) -> Vec<EntryRef> {
        let mut refs: Vec<EntryRef> = self.matched.iter().flat_map(|m| m.entries()).collect();
        for pair in self.journal_cancellations.iter().chain(&self.statement_cancellations) {
            refs.push(EntryRef {
                source: pair.source,
                index: pair.first,
            });
            refs.push(EntryRef {
                source: pair.source,
                index: pair.second,
            });
        }
        refs
    }
}

/// Runs cancellation, carry-forward and direct matching in order
#[derive(Debug, Clone)]
pub struct ReconciliationMatcher {
    settings: ReconcileSettings,
}

impl ReconciliationMatcher {
    pub fn new(settings: &ReconcileSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Match this period's entries, resolving prior-period lines first
    pub fn reconcile(
        &self,
        statement: &[LedgerEntry],
        journal: &[LedgerEntry],
        prior: &[PriorStateLine],
    ) -> ReconciliationOutcome {
        let mut outcome = ReconciliationOutcome::default();
        let mut consumed: HashSet<EntryRef> = HashSet::new();

        let statement_pool = usable_indices(statement, Source::Statement, &mut outcome.excluded);
        let journal_pool = usable_indices(journal, Source::Journal, &mut outcome.excluded);
        if !outcome.excluded.is_empty() {
            info!(count = outcome.excluded.len(), "Entries without date or movement left out");
        }

        outcome.journal_cancellations =
            journal_reversals(journal, &journal_pool, self.settings.cancellation_scale);
        for pair in &outcome.journal_cancellations {
            consumed.insert(EntryRef::journal(pair.first));
            consumed.insert(EntryRef::journal(pair.second));
        }

        self.resolve_prior(
            statement,
            journal,
            prior,
            &statement_pool,
            &journal_pool,
            &mut consumed,
            &mut outcome,
        );
        self.match_direct(
            statement,
            journal,
            &statement_pool,
            &journal_pool,
            &mut consumed,
            &mut outcome,
        );

        let open_statement: Vec<usize> = statement_pool
            .iter()
            .copied()
            .filter(|i| !consumed.contains(&EntryRef::statement(*i)))
            .collect();
        outcome.statement_cancellations = statement_shared_references(
            statement,
            &open_statement,
            self.settings.reference_min_digits,
        );
        for pair in &outcome.statement_cancellations {
            consumed.insert(EntryRef::statement(pair.first));
            consumed.insert(EntryRef::statement(pair.second));
        }

        outcome.statement_suspense = open_statement
            .into_iter()
            .filter(|i| !consumed.contains(&EntryRef::statement(*i)))
            .collect();
        outcome.journal_suspense = journal_pool
            .into_iter()
            .filter(|i| !consumed.contains(&EntryRef::journal(*i)))
            .collect();

        info!(
            matched = outcome.matched.len(),
            journal_cancelled = outcome.journal_cancellations.len(),
            statement_cancelled = outcome.statement_cancellations.len(),
            statement_suspense = outcome.statement_suspense.len(),
            journal_suspense = outcome.journal_suspense.len(),
            carried_forward = outcome.carried_forward.len(),
            "Reconciliation matching complete"
        );
        outcome
    }

    /// Each nonzero prior slot takes the first free entry holding the same
    /// amount in the same record and column
    #[allow(clippy::too_many_arguments)]
    fn resolve_prior(
        &self,
        statement: &[LedgerEntry],
        journal: &[LedgerEntry],
        prior: &[PriorStateLine],
        statement_pool: &[usize],
        journal_pool: &[usize],
        consumed: &mut HashSet<EntryRef>,
        outcome: &mut ReconciliationOutcome,
    ) {
        let zero = BigDecimal::from(0);

        for (line_index, line) in prior.iter().enumerate() {
            let mut remaining = line.clone();

            for slot in ReportColumn::ALL {
                let amount = line.amounts.get(slot);
                if *amount <= zero {
                    continue;
                }
                let (entries, pool) = match slot.source() {
                    Source::Statement => (statement, statement_pool),
                    Source::Journal => (journal, journal_pool),
                };
                let column = slot.column();
                let found = pool.iter().copied().find(|i| {
                    let entry_ref = EntryRef {
                        source: slot.source(),
                        index: *i,
                    };
                    !consumed.contains(&entry_ref) && entries[*i].amount(column) == amount
                });

                if let Some(index) = found {
                    let entry = EntryRef {
                        source: slot.source(),
                        index,
                    };
                    debug!(
                        line_index,
                        ?slot,
                        index,
                        amount = %amount,
                        "Prior-period slot resolved"
                    );
                    consumed.insert(entry);
                    remaining.amounts.set(slot, zero.clone());
                    outcome.matched.push(MatchedPair::CarryForward {
                        prior_line: line_index,
                        slot,
                        entry,
                        amount: amount.clone(),
                    });
                }
            }

            if remaining.amounts.has_positive() {
                outcome.carried_forward.push(remaining);
            }
        }
    }

    /// Statement debit against journal credit, statement credit against
    /// journal debit; the first free journal entry in order wins
    fn match_direct(
        &self,
        statement: &[LedgerEntry],
        journal: &[LedgerEntry],
        statement_pool: &[usize],
        journal_pool: &[usize],
        consumed: &mut HashSet<EntryRef>,
        outcome: &mut ReconciliationOutcome,
    ) {
        let zero = BigDecimal::from(0);

        for &s in statement_pool {
            if consumed.contains(&EntryRef::statement(s)) {
                continue;
            }
            let entry = &statement[s];
            let (amount, journal_column) = if entry.debit > zero {
                (&entry.debit, Column::Credit)
            } else if entry.credit > zero {
                (&entry.credit, Column::Debit)
            } else {
                continue;
            };

            let found = journal_pool.iter().copied().find(|j| {
                !consumed.contains(&EntryRef::journal(*j))
                    && journal[*j].amount(journal_column) == amount
            });

            if let Some(j) = found {
                debug!(statement = s, journal = j, amount = %amount, "Direct match");
                consumed.insert(EntryRef::statement(s));
                consumed.insert(EntryRef::journal(j));
                outcome.matched.push(MatchedPair::Direct {
                    statement: s,
                    journal: j,
                    amount: amount.clone(),
                });
            }
        }
    }
}

/// Indices of entries that can take part in matching; the rest are
/// recorded as excluded
fn usable_indices(
    entries: &[LedgerEntry],
    source: Source,
    excluded: &mut Vec<EntryRef>,
) -> Vec<usize> {
    let mut usable = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.date.is_some() && entry.has_movement() {
            usable.push(index);
        } else {
            debug!(%source, index, label = %entry.label, "Entry excluded from matching");
            excluded.push(EntryRef { source, index });
        }
    }
    usable
}
