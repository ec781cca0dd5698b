//! Field substitution for zipped office document templates
//!
//! Templates are zip packages whose primary part (`word/document.xml` by
//! default) holds an XML content tree. Fields are marker sequences inside
//! that tree:
//!
//! ```xml
//! <w:r><w:fldChar w:fldCharType="begin"/></w:r>
//! <w:r><w:instrText> MERGEFIELD DODAVATEL </w:instrText></w:r>
//! <w:r><w:fldChar w:fldCharType="separate"/></w:r>
//! <w:r><w:t>«DODAVATEL»</w:t></w:r>
//! <w:r><w:fldChar w:fldCharType="end"/></w:r>
//! ```
//!
//! Key concepts:
//! - Extraction and substitution share one scanner, so both agree on field identity
//! - Substitution collapses each sequence into one literal run
//! - Untouched archive entries are raw-copied; output is all-or-nothing
//!
//! This crate knows nothing about domain records: callers hand in a flat
//! `field name -> literal text` map.

mod container;
mod engine;
mod error;
mod extractor;
mod metadata;
mod scanner;
pub mod tree;

pub use container::{
    Container, ContainerOptions, PartText, DEFAULT_MAX_TEMPLATE_BYTES, DEFAULT_PRIMARY_PART,
};
pub use engine::{
    substitute_fields, substitute_fields_with, SubstitutionOptions, SubstitutionOutcome,
    SubstitutionStats,
};
pub use error::{DocfillError, Result};
pub use extractor::{
    analyze_template, extract_fields, extract_fields_with, FieldWarning, TemplateAnalysis,
};
pub use metadata::TemplateMetadata;
pub use scanner::{lookup_value, parse_directive, FieldDescriptor, FieldKind};
