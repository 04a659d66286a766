//! Reconciliation of corrected statement entries against the journal

pub mod cancellation;
pub mod matcher;

pub use cancellation::{journal_reversals, reference_tokens, statement_shared_references};
pub use matcher::{ReconciliationMatcher, ReconciliationOutcome};
