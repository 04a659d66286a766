//! Utility modules

pub mod ingest;
pub mod memory_source;
pub mod validation;

pub use ingest::*;
pub use memory_source::*;
pub use validation::*;
