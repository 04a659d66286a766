//! Statement table extraction: positioned tokens to corrected entries

pub mod classifier;
pub mod corrector;
pub mod grouper;
pub mod plausibility;
pub mod profile;

pub use classifier::{detect_opening_balance, ClassifiedStatement, ColumnClassifier};
pub use corrector::{
    balance_chain_breaks, BalanceCorrector, Correction, CorrectionKind, CorrectionOutcome,
};
pub use grouper::{TextRow, TokenGrouper};
pub use profile::{ColumnBounds, LayoutProfile, Zone};

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Corrected statement entries together with everything learnt on the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementExtraction {
    pub entries: Vec<LedgerEntry>,
    /// Balance the first entry builds on
    pub opening_balance: BigDecimal,
    /// Whether the opening balance was read from the document
    pub opening_balance_detected: bool,
    pub corrections: Vec<Correction>,
    pub anomalies: Vec<ExtractionAnomaly>,
}

impl StatementExtraction {
    /// Entries carrying at least one anomaly
    pub fn flagged_entries(&self) -> impl Iterator<Item = (usize, &LedgerEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| e.is_flagged())
    }
}
