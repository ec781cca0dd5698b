//! Data dictionary and mapping validation for docfill templates
//!
//! Template authors map each field of a template to a dotted path into the
//! enriched order record. This crate knows which paths the record exposes,
//! which ones were renamed, and how to migrate a mapping to the current
//! schema.

mod dictionary;
mod error;
mod validator;

pub use dictionary::{
    split_composite, DataDictionary, Deprecation, NamespaceGroup, PathStatus, COMPOSITE_SEPARATOR,
};
pub use error::DictionaryError;
pub use validator::{
    auto_fix_mapping, validate_mapping, IssueKind, Mapping, MappingValidator, Severity,
    ValidationIssue, ValidationResult,
};
