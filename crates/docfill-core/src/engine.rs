//! Substitution Engine
//!
//! Rewrites every recognised field of the primary part into a single literal
//! run and repackages the archive. The tree is rebuilt container by
//! container: each field sequence collapses into the begin run carrying the
//! value, and the remaining runs of the sequence are dropped.
//!
//! All work happens on an owned tree and an in-memory archive; the caller
//! gets either a complete new package or an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::container::{Container, ContainerOptions};
use crate::error::Result;
use crate::extractor::{collect_document, FieldWarning};
use crate::scanner::{lookup_value, scan_runs, FieldDescriptor, ScanEvent};
use crate::tree::{Element, Node};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionOptions {
    /// Leave fields without a value untouched instead of blanking them
    pub keep_empty_fields: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionStats {
    /// Field occurrences collapsed into literal text
    pub replaced_count: usize,
    /// Field occurrences left in place because they had no value
    pub skipped_count: usize,
    /// Distinct keys in the value map, whether or not the template uses them
    pub total_fields: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionOutcome {
    pub output: Vec<u8>,
    pub stats: SubstitutionStats,
    pub warnings: Vec<FieldWarning>,
}

/// Fill a template with resolved values using the default container options
pub fn substitute_fields(
    bytes: &[u8],
    values: &HashMap<String, String>,
    options: SubstitutionOptions,
) -> Result<SubstitutionOutcome> {
    substitute_fields_with(bytes, values, options, &ContainerOptions::default())
}

/// Fill a template with resolved values
pub fn substitute_fields_with(
    bytes: &[u8],
    values: &HashMap<String, String>,
    options: SubstitutionOptions,
    container_options: &ContainerOptions,
) -> Result<SubstitutionOutcome> {
    let mut container = Container::open(bytes, container_options)?;
    let (mut part, mut doc) = container.primary_document()?;

    // Warnings come from the unmodified tree so that occurrence numbers
    // match extraction, including begin markers inside collapsed runs
    let (_, warnings) = collect_document(&doc);

    let mut rewriter = Rewriter::new(values, options);
    doc.nodes = rewriter.rewrite(std::mem::take(&mut doc.nodes));

    part.text = doc.to_xml();
    let primary = container.primary_part().to_string();
    let output = container.with_replaced_part(&primary, &part.into_bytes())?;

    let stats = SubstitutionStats {
        replaced_count: rewriter.replaced,
        skipped_count: rewriter.skipped,
        total_fields: values.len(),
    };

    info!(
        replaced = stats.replaced_count,
        skipped = stats.skipped_count,
        total = stats.total_fields,
        warnings = warnings.len(),
        "template filled"
    );

    Ok(SubstitutionOutcome {
        output,
        stats,
        warnings,
    })
}

struct Rewriter<'v> {
    values: &'v HashMap<String, String>,
    options: SubstitutionOptions,
    replaced: usize,
    skipped: usize,
}

impl<'v> Rewriter<'v> {
    fn new(values: &'v HashMap<String, String>, options: SubstitutionOptions) -> Self {
        Self {
            values,
            options,
            replaced: 0,
            skipped: 0,
        }
    }

    fn rewrite(&mut self, children: Vec<Node>) -> Vec<Node> {
        let mut pending = scan_runs(&children).into_iter().peekable();
        let mut out = Vec::with_capacity(children.len());
        // Child index of the end run of the sequence being collapsed
        let mut collapsing_until: Option<usize> = None;

        for (idx, child) in children.into_iter().enumerate() {
            if collapsing_until.is_some_and(|end| idx > end) {
                collapsing_until = None;
            }

            let mut collapse = None;
            while let Some(event) = pending.next_if(|e| e.begin() == idx) {
                if let Some(plan) = self.decide(event) {
                    collapse = Some(plan);
                }
            }

            match (collapse, child) {
                (Some((end, value)), Node::Element(run)) => {
                    out.push(Node::Element(Element::literal_run(&run, &value)));
                    collapsing_until = Some(end);
                }
                (_, child) if collapsing_until.is_some() && child.as_run().is_some() => {}
                (_, child) => out.push(self.rewrite_node(child)),
            }
        }

        out
    }

    fn rewrite_node(&mut self, node: Node) -> Node {
        match node {
            Node::Element(mut el) => {
                el.children = self.rewrite(std::mem::take(&mut el.children));
                Node::Element(el)
            }
            other => other,
        }
    }

    /// Returns the end index and replacement text when the sequence collapses
    fn decide(&mut self, event: ScanEvent) -> Option<(usize, String)> {
        match event {
            ScanEvent::Field {
                end, descriptor, ..
            } => self.resolve(&descriptor).map(|value| (end, value)),
            ScanEvent::Unrecognized { instruction, .. } => {
                debug!(instruction = instruction.trim(), "leaving non-merge field");
                None
            }
            ScanEvent::Unterminated { .. } => None,
        }
    }

    fn resolve(&mut self, field: &FieldDescriptor) -> Option<String> {
        match lookup_value(self.values, &field.name).filter(|v| !v.trim().is_empty()) {
            Some(value) => {
                debug!(field = %field.name, "replacing field");
                self.replaced += 1;
                Some(value.to_string())
            }
            None if self.options.keep_empty_fields => {
                debug!(field = %field.name, "keeping empty field");
                self.skipped += 1;
                None
            }
            None => {
                debug!(field = %field.name, "blanking empty field");
                self.replaced += 1;
                Some(String::new())
            }
        }
    }
}
