//! # Statement Reconciler
//!
//! A library reconciling a bank statement against an accounting journal,
//! producing the suspense items of both sides and a four-column
//! reconciliation statement.
//!
//! ## Features
//!
//! - **Table extraction**: rebuilds statement rows from positioned text tokens
//!   using a per-bank layout profile
//! - **Balance-driven correction**: repairs misread amounts with the running
//!   balance, only when the fix is a plausible reading of the printed figure
//! - **Matching**: journal reversal removal, prior-period carry-forward,
//!   direct amount matching and statement self-cancellations
//! - **Reporting**: a neutral report model (rows, totals, rectified balance)
//!   for an external renderer
//! - **Source abstraction**: any text front end can feed the pipeline by
//!   implementing [`StatementSource`]
//!
//! ## Quick Start
//!
//! ```rust
//! use statement_reconciler::{ClosingBalances, ReconcileConfig, Reconciler};
//!
//! let reconciler = Reconciler::from_config(&ReconcileConfig::for_layout("orabank")).unwrap();
//! let extraction = reconciler.extract_statement(&[]);
//! let result = reconciler.reconcile(
//!     &extraction.entries,
//!     &[],
//!     &[],
//!     &ClosingBalances::default(),
//!     None,
//! );
//! assert!(result.is_fully_reconciled());
//! ```

pub mod config;
pub mod extraction;
pub mod pipeline;
pub mod reconciliation;
pub mod report;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use extraction::{
    BalanceCorrector, ColumnClassifier, Correction, CorrectionKind, LayoutProfile,
    StatementExtraction, TokenGrouper,
};
pub use pipeline::*;
pub use reconciliation::{ReconciliationMatcher, ReconciliationOutcome};
pub use report::*;
pub use traits::*;
pub use types::*;
