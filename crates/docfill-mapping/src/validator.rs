//! Mapping validation and auto-fix
//!
//! A mapping assigns each template field a dotted data path. Entries are
//! checked in field-name order:
//!
//! 1. empty path: warning, the field will render blank
//! 2. deprecated path (or composite part): error with the suggested replacement
//! 3. path unknown to the dictionary: error
//!
//! Only errors make a mapping invalid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::dictionary::{split_composite, DataDictionary, PathStatus};

/// Template field name -> data path
pub type Mapping = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Empty,
    Deprecated,
    Invalid,
}

/// Problem with one mapping entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub field: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationIssue {
    fn empty(field: &str) -> Self {
        Self {
            field: field.to_string(),
            path: String::new(),
            kind: IssueKind::Empty,
            severity: Severity::Warning,
            message: format!("Field {field} is not mapped"),
            suggestion: None,
            reason: None,
        }
    }

    fn deprecated(field: &str, path: &str, suggestion: String, reason: String) -> Self {
        Self {
            field: field.to_string(),
            path: path.to_string(),
            kind: IssueKind::Deprecated,
            severity: Severity::Error,
            message: format!("Path '{path}' is deprecated, use '{suggestion}'"),
            suggestion: Some(suggestion),
            reason: Some(reason),
        }
    }

    fn invalid(field: &str, path: &str, unknown: &str) -> Self {
        let message = if unknown == path {
            format!("Path '{path}' does not exist in the data dictionary")
        } else {
            format!("Path '{path}' contains unknown part '{unknown}'")
        };
        Self {
            field: field.to_string(),
            path: path.to_string(),
            kind: IssueKind::Invalid,
            severity: Severity::Error,
            message,
            suggestion: None,
            reason: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub total_fields: usize,
    /// Entries that are neither errors nor unmapped
    pub valid_fields: usize,
    pub dictionary_version: String,
}

impl ValidationResult {
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// Checks mappings against one dictionary
#[derive(Clone, Copy, Debug)]
pub struct MappingValidator<'d> {
    dictionary: &'d DataDictionary,
}

impl<'d> MappingValidator<'d> {
    pub fn new(dictionary: &'d DataDictionary) -> Self {
        Self { dictionary }
    }

    pub fn dictionary(&self) -> &'d DataDictionary {
        self.dictionary
    }

    pub fn validate(&self, mapping: &Mapping) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (field, path) in mapping {
            match self.check_entry(field, path) {
                Some(issue) if issue.is_error() => errors.push(issue),
                Some(issue) => warnings.push(issue),
                None => {}
            }
        }

        let empty = warnings
            .iter()
            .filter(|w| w.kind == IssueKind::Empty)
            .count();
        let total_fields = mapping.len();
        let valid_fields = total_fields.saturating_sub(errors.len() + empty);

        debug!(
            total = total_fields,
            errors = errors.len(),
            warnings = warnings.len(),
            "validated mapping"
        );

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
            total_fields,
            valid_fields,
            dictionary_version: self.dictionary.version.clone(),
        }
    }

    fn check_entry(&self, field: &str, path: &str) -> Option<ValidationIssue> {
        let path = path.trim();
        if path.is_empty() {
            return Some(ValidationIssue::empty(field));
        }

        if let Some(fixed) = self.dictionary.migrate(path) {
            let reason = split_composite(path)
                .chain(std::iter::once(path))
                .find_map(|part| self.dictionary.deprecation(part))
                .map(|d| d.reason.clone())
                .unwrap_or_default();
            warn!(field, path, suggestion = %fixed, "deprecated mapping path");
            return Some(ValidationIssue::deprecated(field, path, fixed, reason));
        }

        let unknown = split_composite(path).find(|part| {
            part.is_empty() || self.dictionary.classify(part) == PathStatus::Unknown
        })?;
        Some(ValidationIssue::invalid(field, path, unknown))
    }

    /// Replace every deprecated path (or composite part) by its suggestion.
    /// Pure and idempotent for any dictionary whose replacements are final.
    pub fn auto_fix(&self, mapping: &Mapping) -> Mapping {
        mapping
            .iter()
            .map(|(field, path)| {
                let fixed = self
                    .dictionary
                    .migrate(path.trim())
                    .unwrap_or_else(|| path.clone());
                (field.clone(), fixed)
            })
            .collect()
    }
}

/// Validate against the built-in dictionary
pub fn validate_mapping(mapping: &Mapping) -> ValidationResult {
    MappingValidator::new(DataDictionary::builtin()).validate(mapping)
}

/// Auto-fix against the built-in dictionary
pub fn auto_fix_mapping(mapping: &Mapping) -> Mapping {
    MappingValidator::new(DataDictionary::builtin()).auto_fix(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping(entries: &[(&str, &str)]) -> Mapping {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_deprecated_path_is_an_error_with_suggestion() {
        let result = validate_mapping(&mapping(&[("x", "celkova_cena_s_dph")]));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.warnings.is_empty());
        let issue = &result.errors[0];
        assert_eq!(issue.kind, IssueKind::Deprecated);
        assert_eq!(
            issue.suggestion.as_deref(),
            Some("vypocitane.celkova_cena_s_dph")
        );
        assert_eq!(
            issue.reason.as_deref(),
            Some("Prices now live in the vypocitane object")
        );
    }

    #[test]
    fn test_unknown_path_is_invalid() {
        let result = validate_mapping(&mapping(&[("x", "neexistujici_pole")]));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, IssueKind::Invalid);
        assert_eq!(result.valid_fields, 0);
    }

    #[test]
    fn test_empty_path_is_only_a_warning() {
        let result = validate_mapping(&mapping(&[("x", "")]));
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, IssueKind::Empty);
        assert_eq!(result.warnings[0].severity, Severity::Warning);
        assert_eq!(result.total_fields, 1);
        assert_eq!(result.valid_fields, 0);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let entries = mapping(&[("CENA", " celkova_cena_s_dph "), ("NIC", "   ")]);
        let result = validate_mapping(&entries);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, IssueKind::Deprecated);
        assert_eq!(
            result.errors[0].suggestion.as_deref(),
            Some("vypocitane.celkova_cena_s_dph")
        );
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, IssueKind::Empty);

        let fixed = auto_fix_mapping(&entries);
        assert_eq!(fixed["CENA"], "vypocitane.celkova_cena_s_dph");
        assert_eq!(fixed["NIC"], "   ");
    }

    #[test]
    fn test_counts_over_mixed_mapping() {
        let result = validate_mapping(&mapping(&[
            ("CISLO", "cislo_objednavky"),
            ("CENA", "vypocitane.celkova_cena_s_dph_kc"),
            ("DATUM", "aktualni_datum"),
            ("JMENO", "uzivatel.jmeno + uzivatel.prijmeni"),
            ("NIC", "   "),
            ("SPATNE", "uzivatel.neznamy"),
        ]));
        assert!(!result.valid);
        assert_eq!(result.total_fields, 6);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.valid_fields, 3);
        // field-name order
        assert_eq!(result.errors[0].field, "DATUM");
        assert_eq!(result.errors[1].field, "SPATNE");
    }

    #[test]
    fn test_composite_paths_are_checked_part_wise() {
        let result = validate_mapping(&mapping(&[
            ("A", "objednatel.jmeno + uzivatel.prijmeni"),
            ("B", "uzivatel.jmeno + foo"),
            ("C", "uzivatel.jmeno + "),
        ]));
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.errors[0].kind, IssueKind::Deprecated);
        assert_eq!(
            result.errors[0].suggestion.as_deref(),
            Some("uzivatel.jmeno + uzivatel.prijmeni")
        );
        assert_eq!(result.errors[1].kind, IssueKind::Invalid);
        assert!(result.errors[1].message.contains("'foo'"));
        assert_eq!(result.errors[2].kind, IssueKind::Invalid);
    }

    #[test]
    fn test_auto_fix_replaces_deprecated_and_is_idempotent() {
        let original = mapping(&[
            ("CENA", "celkova_cena_s_dph"),
            ("JMENO", "objednatel.jmeno + objednatel.prijmeni"),
            ("PREDMET", "predmet"),
            ("NIC", ""),
            ("SPATNE", "neexistujici_pole"),
        ]);
        let fixed = auto_fix_mapping(&original);
        assert_eq!(
            fixed,
            mapping(&[
                ("CENA", "vypocitane.celkova_cena_s_dph"),
                ("JMENO", "uzivatel.jmeno + uzivatel.prijmeni"),
                ("PREDMET", "predmet"),
                ("NIC", ""),
                ("SPATNE", "neexistujici_pole"),
            ])
        );
        assert_eq!(auto_fix_mapping(&fixed), fixed);

        let after = validate_mapping(&fixed);
        assert!(after.errors.iter().all(|e| e.kind != IssueKind::Deprecated));
    }

    #[test]
    fn test_auto_fix_is_idempotent_for_every_deprecated_path() {
        let dict = DataDictionary::builtin();
        let original: Mapping = dict
            .deprecated
            .keys()
            .enumerate()
            .map(|(i, path)| (format!("F{i}"), path.clone()))
            .collect();
        let once = auto_fix_mapping(&original);
        assert_eq!(auto_fix_mapping(&once), once);
        assert!(validate_mapping(&once).valid);
    }

    #[test]
    fn test_issue_json_shape() {
        let result = validate_mapping(&mapping(&[("x", "vypoctene_dph")]));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["totalFields"], 1);
        assert_eq!(json["errors"][0]["type"], "deprecated");
        assert_eq!(json["errors"][0]["severity"], "error");
        assert_eq!(json["errors"][0]["suggestion"], "vypocitane.vypoctene_dph");
        assert_eq!(json["dictionaryVersion"], "enriched-v1");
    }

    #[test]
    fn test_custom_dictionary() {
        let dict = DataDictionary::from_yaml_str("version: tiny\ntopLevel: [a]\n").unwrap();
        let validator = MappingValidator::new(&dict);
        let result = validator.validate(&mapping(&[("X", "a"), ("Y", "predmet")]));
        assert_eq!(result.valid_fields, 1);
        assert_eq!(result.errors[0].field, "Y");
        assert_eq!(result.dictionary_version, "tiny");
    }
}
