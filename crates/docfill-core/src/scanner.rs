//! Field marker scanning shared by extraction and substitution
//!
//! A field is a begin marker, any number of instruction-text runs, and an end
//! marker, all direct run children of the same container element. Scanning
//! is a two-state machine per container:
//!
//! ```text
//! SEEK_BEGIN ──begin marker──▶ IN_FIELD ──end marker──▶ (emit) ──▶ SEEK_BEGIN
//!                                  │
//!                                  └──runs exhausted──▶ (unterminated) ──▶ SEEK_BEGIN
//! ```
//!
//! Both passes call [`scan_runs`], so they always agree on where fields are
//! and what they are called.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::tree::{Element, Node, NodeKind};

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(MERGEFIELD|DOCVARIABLE)\s+([A-Za-z0-9_|.\-/]+)").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Field directive keyword
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "MERGEFIELD")]
    MergeField,
    #[serde(rename = "DOCVARIABLE")]
    DocVariable,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::MergeField => "MERGEFIELD",
            FieldKind::DocVariable => "DOCVARIABLE",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field occurrence found in a template
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Parse a field instruction such as ` MERGEFIELD  CENA \* MERGEFORMAT `
pub fn parse_directive(instruction: &str) -> Option<FieldDescriptor> {
    let collapsed = WHITESPACE_RE.replace_all(instruction, " ");
    let caps = DIRECTIVE_RE.captures(&collapsed)?;

    let kind = if caps[1].eq_ignore_ascii_case("MERGEFIELD") {
        FieldKind::MergeField
    } else {
        FieldKind::DocVariable
    };
    let name: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();

    Some(FieldDescriptor { name, kind })
}

/// Look up a field value: exact name, then uppercase, then lowercase.
///
/// An empty entry does not count as a hit and falls through to the next
/// case variant. A whitespace-only entry is a hit; the engine treats it
/// as an empty value.
pub fn lookup_value<'a>(values: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    [name.to_string(), name.to_uppercase(), name.to_lowercase()]
        .iter()
        .filter_map(|key| values.get(key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Result of scanning one begin marker
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ScanEvent {
    /// Complete marker sequence with a recognised directive.
    /// `begin` and `end` are child indices of the begin and end runs.
    Field {
        begin: usize,
        end: usize,
        descriptor: FieldDescriptor,
    },
    /// Complete sequence whose instruction is not a MERGEFIELD/DOCVARIABLE
    Unrecognized { begin: usize, instruction: String },
    /// Begin marker with no end marker in the same container
    Unterminated { begin: usize, instruction: String },
}

impl ScanEvent {
    pub(crate) fn begin(&self) -> usize {
        match self {
            ScanEvent::Field { begin, .. }
            | ScanEvent::Unrecognized { begin, .. }
            | ScanEvent::Unterminated { begin, .. } => *begin,
        }
    }
}

/// Scan the direct run children of one container element
pub(crate) fn scan_runs(children: &[Node]) -> Vec<ScanEvent> {
    let runs: Vec<usize> = children
        .iter()
        .enumerate()
        .filter_map(|(idx, node)| node.as_run().map(|_| idx))
        .collect();

    let mut events = Vec::new();
    let mut cursor = 0;

    while cursor < runs.len() {
        let begin = runs[cursor];
        let opens = children[begin].as_run().is_some_and(opens_field);
        if !opens {
            cursor += 1;
            continue;
        }

        let mut instruction = String::new();
        let mut close = None;
        for (pos, &idx) in runs.iter().enumerate().skip(cursor + 1) {
            let closed = children[idx]
                .as_run()
                .is_some_and(|run| collect_until_end(run, &mut instruction));
            if closed {
                close = Some(pos);
                break;
            }
        }

        match close {
            Some(close_pos) => match parse_directive(&instruction) {
                Some(descriptor) => {
                    events.push(ScanEvent::Field {
                        begin,
                        end: runs[close_pos],
                        descriptor,
                    });
                    cursor = close_pos + 1;
                }
                None => {
                    events.push(ScanEvent::Unrecognized { begin, instruction });
                    cursor += 1;
                }
            },
            None => {
                events.push(ScanEvent::Unterminated { begin, instruction });
                cursor += 1;
            }
        }
    }

    events
}

fn opens_field(run: &Element) -> bool {
    run.children
        .iter()
        .filter_map(Node::as_element)
        .any(|el| el.kind == NodeKind::FieldBegin)
}

/// Append instruction text from `run`; returns true once an end marker is seen
fn collect_until_end(run: &Element, instruction: &mut String) -> bool {
    for child in run.children.iter().filter_map(Node::as_element) {
        match child.kind {
            NodeKind::InstrText => instruction.push_str(&child.text_content()),
            NodeKind::FieldEnd => return true,
            NodeKind::Paragraph
            | NodeKind::Run
            | NodeKind::FieldBegin
            | NodeKind::FieldSeparator
            | NodeKind::LiteralText
            | NodeKind::Other => {}
        }
    }
    false
}
