//! Field Extractor
//!
//! Lists the field occurrences of a template in document order. Malformed
//! marker sequences never abort extraction: unterminated ones are reported
//! as warnings, unrecognised directives are skipped silently.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::container::{Container, ContainerOptions};
use crate::error::Result;
use crate::metadata::TemplateMetadata;
use crate::scanner::{scan_runs, FieldDescriptor, ScanEvent};
use crate::tree::{Document, Node};

/// Non-fatal problem found while scanning a template
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldWarning {
    /// A begin marker with no end marker in the same container.
    /// `occurrence` counts begin markers in document order, starting at 1.
    Unterminated {
        occurrence: usize,
        instruction: String,
    },
}

impl std::fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldWarning::Unterminated {
                occurrence,
                instruction,
            } => write!(
                f,
                "field #{} is never closed (instruction: '{}')",
                occurrence,
                instruction.trim()
            ),
        }
    }
}

/// Everything the mapping editor needs to know about an uploaded template
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAnalysis {
    /// One entry per occurrence, document order
    pub fields: Vec<FieldDescriptor>,
    /// Distinct field names in first-seen order
    pub names: Vec<String>,
    pub warnings: Vec<FieldWarning>,
    pub metadata: TemplateMetadata,
}

/// List field occurrences of a template
pub fn extract_fields(bytes: &[u8]) -> Result<Vec<FieldDescriptor>> {
    extract_fields_with(bytes, &ContainerOptions::default()).map(|(fields, _)| fields)
}

/// List field occurrences and scan warnings using explicit container options
pub fn extract_fields_with(
    bytes: &[u8],
    options: &ContainerOptions,
) -> Result<(Vec<FieldDescriptor>, Vec<FieldWarning>)> {
    let mut container = Container::open(bytes, options)?;
    let (_, doc) = container.primary_document()?;
    Ok(collect_document(&doc))
}

/// Fields, distinct names, warnings and package metadata of a template
pub fn analyze_template(bytes: &[u8], options: &ContainerOptions) -> Result<TemplateAnalysis> {
    let mut container = Container::open(bytes, options)?;
    let (_, doc) = container.primary_document()?;
    let (fields, warnings) = collect_document(&doc);
    let metadata = TemplateMetadata::read(&mut container);

    let mut names: Vec<String> = Vec::new();
    for field in &fields {
        if !names.contains(&field.name) {
            names.push(field.name.clone());
        }
    }

    debug!(
        occurrences = fields.len(),
        distinct = names.len(),
        warnings = warnings.len(),
        "analysed template"
    );

    Ok(TemplateAnalysis {
        fields,
        names,
        warnings,
        metadata,
    })
}

pub(crate) fn collect_document(doc: &Document) -> (Vec<FieldDescriptor>, Vec<FieldWarning>) {
    let mut collector = Collector::default();
    collector.visit(&doc.nodes);
    (collector.fields, collector.warnings)
}

#[derive(Default)]
struct Collector {
    fields: Vec<FieldDescriptor>,
    warnings: Vec<FieldWarning>,
    begins_seen: usize,
}

impl Collector {
    fn visit(&mut self, children: &[Node]) {
        let events = scan_runs(children);
        let mut pending = events.into_iter().peekable();

        for (idx, child) in children.iter().enumerate() {
            while let Some(event) = pending.next_if(|e| e.begin() == idx) {
                self.record(event);
            }
            if let Node::Element(el) = child {
                self.visit(&el.children);
            }
        }
    }

    fn record(&mut self, event: ScanEvent) {
        self.begins_seen += 1;
        match event {
            ScanEvent::Field { descriptor, .. } => self.fields.push(descriptor),
            ScanEvent::Unrecognized { instruction, .. } => {
                debug!(instruction = instruction.trim(), "ignoring non-merge field");
            }
            ScanEvent::Unterminated { instruction, .. } => {
                warn!(
                    occurrence = self.begins_seen,
                    instruction = instruction.trim(),
                    "unterminated field in template"
                );
                self.warnings.push(FieldWarning::Unterminated {
                    occurrence: self.begins_seen,
                    instruction,
                });
            }
        }
    }
}
