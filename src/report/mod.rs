//! Neutral reconciliation report model, ready for an external renderer

pub mod assembler;

pub use assembler::*;
