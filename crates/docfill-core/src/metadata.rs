//! Template metadata from `docProps/core.xml` and `docProps/app.xml`
//!
//! Best effort only: a missing or unreadable metadata part leaves the
//! corresponding fields empty and never fails the analysis.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::container::Container;

pub const CORE_PROPERTIES_PART: &str = "docProps/core.xml";
pub const APP_PROPERTIES_PART: &str = "docProps/app.xml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub last_modified_by: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub application: Option<String>,
    pub pages: Option<u32>,
    pub words: Option<u32>,
}

impl TemplateMetadata {
    pub fn read(container: &mut Container<'_>) -> Self {
        let core = read_properties(container, CORE_PROPERTIES_PART);
        let app = read_properties(container, APP_PROPERTIES_PART);

        Self {
            title: core.get("title").cloned(),
            subject: core.get("subject").cloned(),
            creator: core.get("creator").cloned(),
            last_modified_by: core.get("lastModifiedBy").cloned(),
            created: core.get("created").cloned(),
            modified: core.get("modified").cloned(),
            application: app.get("Application").cloned(),
            pages: app.get("Pages").and_then(|v| v.parse().ok()),
            words: app.get("Words").and_then(|v| v.parse().ok()),
        }
    }
}

fn read_properties(container: &mut Container<'_>, part: &str) -> HashMap<String, String> {
    match container.read_text(part) {
        Ok(Some(text)) => flat_properties(&text.text),
        Ok(None) => HashMap::new(),
        Err(e) => {
            debug!(part, error = %e, "skipping unreadable metadata part");
            HashMap::new()
        }
    }
}

/// Collect `local-name -> text` for every leaf child of the root element
fn flat_properties(xml: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut props = HashMap::new();
    let mut depth = 0usize;
    let mut current: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                if depth == 2 {
                    current = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    text.clear();
                } else if depth > 2 {
                    current = None;
                }
            }
            Ok(Event::Text(ref e)) => {
                if current.is_some() {
                    if let Ok(unescaped) = e.unescape() {
                        text.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(name) = current.take() {
                        let value = text.trim();
                        if !value.is_empty() {
                            props.insert(name, value.to_string());
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "metadata part is not well-formed");
                break;
            }
            _ => {}
        }
    }

    props
}
