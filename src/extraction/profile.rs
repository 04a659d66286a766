//! Column geometry and noise patterns of a statement layout

use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::validate_profile;

/// Logical column a token is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Date,
    Label,
    ValueDate,
    Debit,
    Credit,
    Balance,
}

/// Horizontal thresholds separating the six statement columns.
///
/// A token whose left edge is below `date` belongs to the date column,
/// below `label` to the label column, and so on; anything at or beyond
/// `credit` is in the balance column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBounds {
    pub date: f64,
    pub label: f64,
    pub value_date: f64,
    pub debit: f64,
    pub credit: f64,
}

impl ColumnBounds {
    /// Thresholds in ascending order
    pub fn as_array(&self) -> [f64; 5] {
        [self.date, self.label, self.value_date, self.debit, self.credit]
    }

    /// Column zone for a horizontal position
    pub fn zone_for(&self, x: f64) -> Zone {
        if x < self.date {
            Zone::Date
        } else if x < self.label {
            Zone::Label
        } else if x < self.value_date {
            Zone::ValueDate
        } else if x < self.debit {
            Zone::Debit
        } else if x < self.credit {
            Zone::Credit
        } else {
            Zone::Balance
        }
    }
}

/// Layout profile of one bank's statement.
///
/// Profiles are immutable values selected by the caller; there is no
/// process-wide default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutProfile {
    /// Profile name, used in logs and errors
    pub name: String,
    pub bounds: ColumnBounds,
    /// Rows containing any of these substrings are dropped
    pub boilerplate: Vec<String>,
    /// Rows containing all of these substrings are the column header
    pub column_header: Vec<String>,
    /// Rows containing this word and a slash are page numbering
    pub page_marker: String,
    /// Normalized, space-free markers of a grand-total row
    pub total_markers: Vec<String>,
    /// Words that together locate the opening balance line
    pub opening_balance_marker: Vec<String>,
    /// Vertical tolerance when collecting the opening balance figures
    pub opening_balance_tolerance: f64,
    /// Digit-only amount fragments longer than this are label spillover
    pub max_amount_digits: usize,
}

impl LayoutProfile {
    /// Names of the built-in profiles
    pub const BUILT_IN: &'static [&'static str] = &["orabank"];

    /// Look up a built-in profile by name
    pub fn named(name: &str) -> ReconcileResult<Self> {
        let profile = match name.trim().to_lowercase().as_str() {
            "orabank" => Self::orabank(),
            other => {
                return Err(ReconcileError::UnsupportedLayout(format!(
                    "no layout profile named '{}' (available: {})",
                    other,
                    Self::BUILT_IN.join(", ")
                )))
            }
        };
        validate_profile(&profile)?;
        Ok(profile)
    }

    /// Orabank account statement layout
    pub fn orabank() -> Self {
        Self {
            name: "orabank".to_string(),
            bounds: ColumnBounds {
                date: 90.0,
                label: 260.0,
                value_date: 350.0,
                debit: 430.0,
                credit: 515.0,
            },
            boilerplate: [
                "Libellé",
                "Valeur",
                "Débit",
                "Crédit",
                "Solde",
                "Edité le",
                "www.orabank.net",
                "ORABANK",
                "Capital de",
                "RCCM",
                "Veuillez noter que vous disposez",
                "Place de l'indépendance",
                "Tél. :",
                "Total général",
                "Total des mouvements",
                "RELEVE D'IDENTITE BANCAIRE",
                "EXTRAIT DE COMPTE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            column_header: vec!["Date".to_string(), "Libellé".to_string()],
            page_marker: "Page".to_string(),
            total_markers: [
                "totalgeneral",
                "totalmouvements",
                "totaldesmouvements",
                "totaldeb",
                "totalcred",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            opening_balance_marker: vec!["solde".to_string(), "précédent".to_string()],
            opening_balance_tolerance: 5.0,
            max_amount_digits: 9,
        }
    }

    /// Column zone for a horizontal position
    pub fn zone_for(&self, x: f64) -> Zone {
        self.bounds.zone_for(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_routing() {
        let profile = LayoutProfile::orabank();
        assert_eq!(profile.zone_for(40.0), Zone::Date);
        assert_eq!(profile.zone_for(120.0), Zone::Label);
        assert_eq!(profile.zone_for(300.0), Zone::ValueDate);
        assert_eq!(profile.zone_for(400.0), Zone::Debit);
        assert_eq!(profile.zone_for(430.0), Zone::Credit);
        assert_eq!(profile.zone_for(600.0), Zone::Balance);
    }

    #[test]
    fn test_named_profiles() {
        assert!(LayoutProfile::named("Orabank").is_ok());
        match LayoutProfile::named("ecobank") {
            Err(ReconcileError::UnsupportedLayout(msg)) => assert!(msg.contains("ecobank")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
