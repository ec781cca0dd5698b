//! Reference value resolver
//!
//! Walks mapping paths over an enriched record (`serde_json::Value`) and
//! produces the flat `field -> text` map the substitution engine consumes.
//!
//! Path syntax:
//! - `dodavatel_nazev`, `financovani.typ` - object keys separated by dots
//! - `prilohy[0].nazev` or `strediska_kod.0` - array indices
//! - `uzivatel.jmeno + uzivatel.prijmeni` - parts joined with one space, blanks dropped
//!
//! Dates (`2025-10-21`, `2025-10-21T08:00:00`, `1. 2. 2025`) are written as `DD.MM.YYYY`.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use docfill_mapping::{split_composite, Mapping, COMPOSITE_SEPARATOR};

static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap());

static DOTTED_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})").unwrap());

/// A mapping path that did not resolve to a value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPath {
    pub field: String,
    pub path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedValues {
    pub values: HashMap<String, String>,
    pub missing: Vec<MissingPath>,
}

/// Resolve every mapping entry against `record`.
///
/// Every field gets an entry; unresolved paths map to `""` and are listed
/// in `missing`. Unmapped fields are not reported as missing.
pub fn resolve_values(record: &Value, mapping: &Mapping) -> ResolvedValues {
    let mut resolved = ResolvedValues::default();

    for (field, path) in mapping {
        let path = path.trim();
        let text = if path.is_empty() {
            String::new()
        } else if path.contains(COMPOSITE_SEPARATOR) {
            let mut parts = Vec::new();
            for part in split_composite(path).filter(|p| !p.is_empty()) {
                match resolve_path(record, part) {
                    Some(text) if !text.is_empty() => parts.push(text),
                    Some(_) => {}
                    None => resolved.missing.push(MissingPath {
                        field: field.clone(),
                        path: part.to_string(),
                    }),
                }
            }
            parts.join(" ")
        } else {
            resolve_path(record, path).unwrap_or_else(|| {
                resolved.missing.push(MissingPath {
                    field: field.clone(),
                    path: path.to_string(),
                });
                String::new()
            })
        };
        resolved.values.insert(field.clone(), text);
    }

    debug!(
        fields = resolved.values.len(),
        missing = resolved.missing.len(),
        "resolved mapping values"
    );
    resolved
}

/// Resolve one plain path to display text; `None` if absent or not renderable
pub fn resolve_path(record: &Value, path: &str) -> Option<String> {
    lookup(record, path).and_then(render)
}

fn lookup<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    let normalized = INDEX_RE.replace_all(path, ".$1");
    normalized
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(record, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(format_date(s).unwrap_or_else(|| s.clone())),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => None,
    }
}

/// `DD.MM.YYYY` for strings that start with a recognisable date
pub fn format_date(text: &str) -> Option<String> {
    let text = text.trim();
    let (year, month, day): (i32, u32, u32) = if let Some(caps) = ISO_DATE_RE.captures(text) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    } else if let Some(caps) = DOTTED_DATE_RE.captures(text) {
        (caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.format("%d.%m.%Y").to_string())
}
