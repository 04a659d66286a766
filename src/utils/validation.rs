//! Validation utilities

use crate::extraction::profile::LayoutProfile;
use crate::types::*;

/// Validate that a layout profile can drive extraction
pub fn validate_profile(profile: &LayoutProfile) -> ReconcileResult<()> {
    if profile.name.trim().is_empty() {
        return Err(ReconcileError::InvalidProfile(
            "Profile name cannot be empty".to_string(),
        ));
    }

    let bounds = profile.bounds.as_array();
    if bounds.iter().any(|b| !b.is_finite()) {
        return Err(ReconcileError::InvalidProfile(format!(
            "Column bounds of '{}' must be finite",
            profile.name
        )));
    }
    if bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ReconcileError::InvalidProfile(format!(
            "Column bounds of '{}' must be strictly ascending, got {:?}",
            profile.name, bounds
        )));
    }

    if profile.max_amount_digits == 0 {
        return Err(ReconcileError::InvalidProfile(format!(
            "Profile '{}' must allow at least one amount digit",
            profile.name
        )));
    }

    if profile.opening_balance_tolerance.is_nan() || profile.opening_balance_tolerance < 0.0 {
        return Err(ReconcileError::InvalidProfile(format!(
            "Opening balance tolerance of '{}' cannot be negative",
            profile.name
        )));
    }

    if profile.total_markers.iter().any(|m| m.trim().is_empty()) {
        return Err(ReconcileError::InvalidProfile(format!(
            "Profile '{}' has an empty total marker",
            profile.name
        )));
    }

    Ok(())
}

/// Lowercase, trim and fold French diacritics of a column header
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' | 'ä' => 'a',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Position of the first normalized header equal to one of `aliases`
pub fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.contains(&normalize_header(h).as_str()))
}

/// Positions of required columns, in the order requested.
///
/// Each requirement is a list of accepted aliases; the first alias names
/// the column in the error.
pub fn require_columns(
    input: &str,
    headers: &[String],
    required: &[&[&str]],
) -> ReconcileResult<Vec<usize>> {
    required
        .iter()
        .map(|aliases| {
            find_column(headers, aliases).ok_or_else(|| ReconcileError::MissingColumn {
                input: input.to_string(),
                column: aliases.first().copied().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_builtin_profile_is_valid() {
        assert!(validate_profile(&LayoutProfile::orabank()).is_ok());
    }

    #[test]
    fn test_descending_bounds_rejected() {
        let mut profile = LayoutProfile::orabank();
        profile.bounds.debit = 200.0;
        assert!(matches!(
            validate_profile(&profile),
            Err(ReconcileError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_nan_bound_rejected() {
        let mut profile = LayoutProfile::orabank();
        profile.bounds.credit = f64::NAN;
        assert!(validate_profile(&profile).is_err());
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Libellé "), "libelle");
        assert_eq!(normalize_header("DÉBIT"), "debit");
        assert_eq!(normalize_header("Crédit"), "credit");
    }

    #[test]
    fn test_missing_column_names_input_and_column() {
        let err = require_columns(
            "journal.xlsx",
            &headers(&["Date", "Libellé", "Débit"]),
            &[&["date"], &["libelle", "label"], &["debit"], &["credit"]],
        )
        .unwrap_err();
        match err {
            ReconcileError::MissingColumn { input, column } => {
                assert_eq!(input, "journal.xlsx");
                assert_eq!(column, "credit");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_columns_found_by_alias() {
        let found = require_columns(
            "journal",
            &headers(&["Label", "DATE", "Credit", "Debit"]),
            &[&["date"], &["libelle", "label"], &["debit"], &["credit"]],
        )
        .unwrap();
        assert_eq!(found, vec![1, 0, 3, 2]);
    }
}
