//! Grouping of positioned tokens into text rows

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::profile::LayoutProfile;
use crate::types::*;

/// Tokens sharing one vertical bucket, ordered left to right
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRow {
    pub page: usize,
    /// Integer vertical bucket
    pub y: i64,
    pub tokens: Vec<PositionedToken>,
    /// Set when the row carried a grand-total marker; the transaction in
    /// progress must be closed once the row's remaining tokens are consumed
    pub closes_transaction: bool,
}

impl TextRow {
    /// Space-joined text of the row
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn closing(page: usize, y: i64) -> Self {
        Self {
            page,
            y,
            tokens: Vec::new(),
            closes_transaction: true,
        }
    }
}

/// Lowercase, drop whitespace and fold the accented `e` variants, so that
/// "Total  Général" and "totalgeneral" compare equal
pub fn normalize_marker_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            other => other,
        })
        .collect()
}

/// Groups one page's tokens into cleaned rows
pub struct TokenGrouper<'a> {
    profile: &'a LayoutProfile,
}

impl<'a> TokenGrouper<'a> {
    pub fn new(profile: &'a LayoutProfile) -> Self {
        Self { profile }
    }

    /// Bucket tokens by truncated vertical position; rows ascend vertically
    /// and tokens within a row ascend horizontally
    pub fn bucket_rows(tokens: &[PositionedToken]) -> Vec<TextRow> {
        let mut buckets: BTreeMap<i64, Vec<PositionedToken>> = BTreeMap::new();
        for token in tokens {
            buckets
                .entry(token.y.trunc() as i64)
                .or_default()
                .push(token.clone());
        }

        buckets
            .into_iter()
            .map(|(y, mut tokens)| {
                tokens.sort_by(|a, b| a.x.total_cmp(&b.x));
                TextRow {
                    page: tokens.first().map(|t| t.page).unwrap_or_default(),
                    y,
                    tokens,
                    closes_transaction: false,
                }
            })
            .collect()
    }

    /// Group and clean the tokens of one page
    pub fn group_page(&self, tokens: &[PositionedToken]) -> Vec<TextRow> {
        let mut rows = Vec::new();

        for mut row in Self::bucket_rows(tokens) {
            let mut closes = false;
            if let Some(position) = self.total_marker_position(&row.tokens) {
                debug!(
                    page = row.page,
                    y = row.y,
                    kept = position,
                    "Grand total marker found, truncating row"
                );
                row.tokens.truncate(position);
                closes = true;
            }

            if row.tokens.is_empty() {
                if closes {
                    rows.push(TextRow::closing(row.page, row.y));
                }
                continue;
            }

            let text = row.text();
            if self.is_noise(&text) {
                debug!(page = row.page, y = row.y, text = %text, "Dropping header/footer row");
                if closes {
                    rows.push(TextRow::closing(row.page, row.y));
                }
                continue;
            }

            row.closes_transaction = closes;
            rows.push(row);
        }

        rows
    }

    /// Group every page of a document, keeping page order
    pub fn group_document(&self, pages: &[Vec<PositionedToken>]) -> Vec<TextRow> {
        pages.iter().flat_map(|page| self.group_page(page)).collect()
    }

    /// Index of the first token opening a grand-total marker
    pub fn total_marker_position(&self, tokens: &[PositionedToken]) -> Option<usize> {
        tokens.iter().enumerate().find_map(|(i, token)| {
            if !token.text.to_lowercase().contains("total") {
                return None;
            }
            let end = (i + 8).min(tokens.len());
            let snippet: String = tokens[i..end].iter().map(|t| t.text.as_str()).collect();
            let snippet = normalize_marker_text(&snippet);
            self.profile
                .total_markers
                .iter()
                .any(|marker| snippet.contains(marker.as_str()))
                .then_some(i)
        })
    }

    /// Whether the row text is a header, footer or legal notice
    pub fn is_noise(&self, text: &str) -> bool {
        if self
            .profile
            .boilerplate
            .iter()
            .any(|pattern| text.contains(pattern.as_str()))
        {
            return true;
        }

        if !self.profile.column_header.is_empty()
            && self
                .profile
                .column_header
                .iter()
                .all(|marker| text.contains(marker.as_str()))
        {
            return true;
        }

        !self.profile.page_marker.is_empty()
            && text.contains(self.profile.page_marker.as_str())
            && text.contains('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f64, y: f64) -> PositionedToken {
        PositionedToken::new(text, x, y, 0)
    }

    #[test]
    fn test_tokens_bucketed_by_vertical_position() {
        let tokens = vec![
            tok("B", 200.0, 100.7),
            tok("A", 50.0, 100.2),
            tok("C", 50.0, 90.9),
        ];
        let rows = TokenGrouper::bucket_rows(&tokens);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].y, 90);
        assert_eq!(rows[1].text(), "A B");
    }

    #[test]
    fn test_header_and_footer_rows_dropped() {
        let profile = LayoutProfile::orabank();
        let grouper = TokenGrouper::new(&profile);
        let tokens = vec![
            tok("Date", 40.0, 10.0),
            tok("Libellé", 120.0, 10.0),
            tok("06/10/2025", 40.0, 20.0),
            tok("VIREMENT", 120.0, 20.0),
            tok("Page", 300.0, 800.0),
            tok("1/3", 330.0, 800.0),
        ];
        let rows = grouper.group_page(&tokens);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(), "06/10/2025 VIREMENT");
    }

    #[test]
    fn test_page_word_without_slash_is_kept() {
        let profile = LayoutProfile::orabank();
        let grouper = TokenGrouper::new(&profile);
        assert!(!grouper.is_noise("FRAIS Page WEB"));
        assert!(grouper.is_noise("Page 2/4"));
    }

    #[test]
    fn test_total_marker_truncates_and_closes() {
        let profile = LayoutProfile::orabank();
        let grouper = TokenGrouper::new(&profile);
        let tokens = vec![
            tok("FRAIS", 120.0, 50.0),
            tok("Total", 200.0, 50.0),
            tok("Général", 230.0, 50.0),
            tok("1 250 000", 400.0, 50.0),
        ];
        let rows = grouper.group_page(&tokens);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(), "FRAIS");
        assert!(rows[0].closes_transaction);
    }

    #[test]
    fn test_total_only_row_emits_closing_marker() {
        let profile = LayoutProfile::orabank();
        let grouper = TokenGrouper::new(&profile);
        let tokens = vec![
            tok("Total", 100.0, 70.0),
            tok("des", 130.0, 70.0),
            tok("mouvements", 150.0, 70.0),
        ];
        let rows = grouper.group_page(&tokens);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].tokens.is_empty());
        assert!(rows[0].closes_transaction);
    }

    #[test]
    fn test_normalize_marker_text() {
        assert_eq!(normalize_marker_text("Total  Général"), "totalgeneral");
        assert_eq!(normalize_marker_text("TOTAL DÈB"), "totaldeb");
    }
}
