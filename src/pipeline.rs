//! Main reconciler that runs the extraction and matching stages in order

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ReconcileConfig, ReconcileSettings};
use crate::extraction::{
    detect_opening_balance, BalanceCorrector, ColumnClassifier, LayoutProfile, StatementExtraction,
    TokenGrouper,
};
use crate::reconciliation::ReconciliationMatcher;
use crate::report::{ClosingBalances, ReconciliationResult, ReportAssembler};
use crate::traits::*;
use crate::types::*;
use crate::utils::ingest::{last_balance, prior_state_from_lines, JournalImport};
use crate::utils::validation::validate_profile;

/// Everything produced by one end-to-end run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRun {
    pub extraction: StatementExtraction,
    pub result: ReconciliationResult,
}

/// Reconciliation system tying a statement layout to a set of tolerances
#[derive(Debug, Clone)]
pub struct Reconciler {
    profile: LayoutProfile,
    settings: ReconcileSettings,
}

impl Reconciler {
    /// Create a reconciler; the profile and settings are validated first
    pub fn new(profile: LayoutProfile, settings: ReconcileSettings) -> ReconcileResult<Self> {
        validate_profile(&profile)?;
        settings.validate()?;
        Ok(Self { profile, settings })
    }

    /// Create a reconciler from a loaded configuration
    pub fn from_config(config: &ReconcileConfig) -> ReconcileResult<Self> {
        Self::new(config.profile()?, config.settings.clone())
    }

    pub fn profile(&self) -> &LayoutProfile {
        &self.profile
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Turn the pages of a statement into corrected entries.
    ///
    /// Pages must be in document order; the running balance check depends
    /// on it.
    pub fn extract_statement(&self, pages: &[Vec<PositionedToken>]) -> StatementExtraction {
        let rows = TokenGrouper::new(&self.profile).group_document(pages);
        info!(pages = pages.len(), rows = rows.len(), "Statement rows grouped");

        let classified = ColumnClassifier::classify(&self.profile, &rows);
        let mut entries = classified.entries;
        let mut anomalies = classified.anomalies;

        let detected = pages
            .first()
            .and_then(|page| detect_opening_balance(&self.profile, page));
        let opening_balance_detected = detected.is_some();
        let opening_balance = detected.unwrap_or_else(|| {
            warn!(profile = %self.profile.name, "No opening balance found, starting from zero");
            BigDecimal::from(0)
        });

        let outcome = BalanceCorrector::new(&self.settings).correct(&mut entries, &opening_balance);
        anomalies.extend(outcome.anomalies);

        info!(
            entries = entries.len(),
            corrections = outcome.corrections.len(),
            anomalies = anomalies.len(),
            "Statement extracted"
        );

        StatementExtraction {
            entries,
            opening_balance,
            opening_balance_detected,
            corrections: outcome.corrections,
            anomalies,
        }
    }

    /// Match statement and journal entries and assemble the report
    pub fn reconcile(
        &self,
        statement: &[LedgerEntry],
        journal: &[LedgerEntry],
        prior: &[PriorStateLine],
        closing: &ClosingBalances,
        as_of: Option<NaiveDate>,
    ) -> ReconciliationResult {
        let outcome =
            ReconciliationMatcher::new(&self.settings).reconcile(statement, journal, prior);
        ReportAssembler::new(&self.settings).assemble(statement, journal, outcome, closing, as_of)
    }

    /// Read every page from `source`, then extract, match and report
    pub async fn run<S: StatementSource + ?Sized>(
        &self,
        source: &S,
        journal: &JournalImport,
        prior: Vec<PriorStateLine>,
        as_of: Option<NaiveDate>,
    ) -> ReconcileResult<ReconciliationRun> {
        let pages = collect_pages(source).await?;
        let extraction = self.extract_statement(&pages);

        let statement_closing = last_balance(&extraction.entries)
            .unwrap_or_else(|| extraction.opening_balance.clone());
        let journal_closing = journal.closing_balance.clone().unwrap_or_else(|| {
            warn!("Journal has no balance column value, using zero");
            BigDecimal::from(0)
        });
        let closing = ClosingBalances::new(journal_closing, statement_closing);

        let prior = prior_state_from_lines(prior);
        let result = self.reconcile(&extraction.entries, &journal.entries, &prior, &closing, as_of);

        Ok(ReconciliationRun { extraction, result })
    }
}
