//! In-memory token source for testing

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory statement source for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStatementSource {
    pages: Arc<RwLock<Vec<Vec<PositionedToken>>>>,
}

impl MemoryStatementSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source holding the given pages
    pub fn from_pages(pages: Vec<Vec<PositionedToken>>) -> Self {
        Self {
            pages: Arc::new(RwLock::new(pages)),
        }
    }

    /// Append a page; tokens are re-tagged with the page's index
    pub fn push_page(&self, tokens: Vec<PositionedToken>) -> ReconcileResult<usize> {
        let mut pages = self
            .pages
            .write()
            .map_err(|e| ReconcileError::Source(e.to_string()))?;
        let index = pages.len();
        pages.push(
            tokens
                .into_iter()
                .map(|token| PositionedToken { page: index, ..token })
                .collect(),
        );
        Ok(index)
    }

    /// Remove all pages
    pub fn clear(&self) -> ReconcileResult<()> {
        self.pages
            .write()
            .map_err(|e| ReconcileError::Source(e.to_string()))?
            .clear();
        Ok(())
    }
}

#[async_trait]
impl StatementSource for MemoryStatementSource {
    async fn page_count(&self) -> ReconcileResult<usize> {
        let pages = self
            .pages
            .read()
            .map_err(|e| ReconcileError::Source(e.to_string()))?;
        Ok(pages.len())
    }

    async fn page_tokens(&self, page: usize) -> ReconcileResult<Vec<PositionedToken>> {
        let pages = self
            .pages
            .read()
            .map_err(|e| ReconcileError::Source(e.to_string()))?;
        pages
            .get(page)
            .cloned()
            .ok_or_else(|| ReconcileError::Source(format!("Page {} out of range", page)))
    }
}
