//! Traits for the external collaborators feeding the pipeline

use async_trait::async_trait;

use crate::types::*;

/// Source of positioned text tokens for a statement document
///
/// This trait lets the reconciler work with any text front end (PDF text
/// layer, OCR engine, pre-extracted JSON) by implementing these methods.
/// Pages are numbered from zero.
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// Number of pages in the document
    async fn page_count(&self) -> ReconcileResult<usize>;

    /// Tokens of one page, in any order
    async fn page_tokens(&self, page: usize) -> ReconcileResult<Vec<PositionedToken>>;
}

/// Load every page of a source, in page order
pub async fn collect_pages<S: StatementSource + ?Sized>(
    source: &S,
) -> ReconcileResult<Vec<Vec<PositionedToken>>> {
    let count = source.page_count().await?;
    let mut pages = Vec::with_capacity(count);
    for page in 0..count {
        pages.push(source.page_tokens(page).await?);
    }
    Ok(pages)
}
