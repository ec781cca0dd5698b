//! Zip container access
//!
//! Reading never mutates the archive. Rewriting produces a fresh archive in
//! memory where every entry except the rewritten part is raw-copied, so the
//! compressed bytes of untouched parts are carried over as they were.

use std::io::{Cursor, Read, Write};

use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{DocfillError, Result};
use crate::tree::Document;

/// Main content part of a WordprocessingML package
pub const DEFAULT_PRIMARY_PART: &str = "word/document.xml";

/// Upload limit applied before the archive is opened
pub const DEFAULT_MAX_TEMPLATE_BYTES: usize = 10 * 1024 * 1024;

const UTF8_BOM: char = '\u{feff}';

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Archive entry holding the content tree
    pub primary_part: String,
    /// Reject templates larger than this many bytes
    pub max_bytes: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            primary_part: DEFAULT_PRIMARY_PART.to_string(),
            max_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
        }
    }
}

/// Text of an XML part, with a leading byte-order mark split off
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartText {
    pub has_bom: bool,
    pub text: String,
}

impl PartText {
    pub fn into_bytes(self) -> Vec<u8> {
        if self.has_bom {
            let mut out = String::with_capacity(self.text.len() + 3);
            out.push(UTF8_BOM);
            out.push_str(&self.text);
            out.into_bytes()
        } else {
            self.text.into_bytes()
        }
    }
}

/// An opened template archive
pub struct Container<'a> {
    size: usize,
    primary_part: String,
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Container<'a> {
    /// Open a template, checking size, archive structure and the primary part
    pub fn open(bytes: &'a [u8], options: &ContainerOptions) -> Result<Self> {
        if bytes.len() > options.max_bytes {
            return Err(DocfillError::TooLarge {
                size: bytes.len(),
                limit: options.max_bytes,
            });
        }

        let archive = ZipArchive::new(Cursor::new(bytes))?;
        if !archive.file_names().any(|name| name == options.primary_part) {
            return Err(DocfillError::MissingPart {
                part: options.primary_part.clone(),
            });
        }

        debug!(
            entries = archive.len(),
            size = bytes.len(),
            "opened template container"
        );

        Ok(Self {
            size: bytes.len(),
            primary_part: options.primary_part.clone(),
            archive,
        })
    }

    pub fn primary_part(&self) -> &str {
        &self.primary_part
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read a part as UTF-8 text; `None` when the archive has no such entry
    pub fn read_text(&mut self, part: &str) -> Result<Option<PartText>> {
        let mut file = match self.archive.by_name(part) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|_| DocfillError::Encoding {
            part: part.to_string(),
        })?;

        Ok(Some(match text.strip_prefix(UTF8_BOM) {
            Some(rest) => PartText {
                has_bom: true,
                text: rest.to_string(),
            },
            None => PartText {
                has_bom: false,
                text,
            },
        }))
    }

    /// Read and parse the primary content part
    pub fn primary_document(&mut self) -> Result<(PartText, Document)> {
        let part = self.primary_part.clone();
        let text = self
            .read_text(&part)?
            .ok_or_else(|| DocfillError::MissingPart { part: part.clone() })?;
        let doc = Document::parse(&text.text).map_err(|source| DocfillError::Xml {
            part: part.clone(),
            source,
        })?;
        Ok((text, doc))
    }

    /// Build a new archive with `part` replaced by `contents`.
    ///
    /// Entry order is preserved. The replaced entry keeps its compression
    /// method; all other entries are copied without recompression.
    pub fn with_replaced_part(&mut self, part: &str, contents: &[u8]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.size)));

        for idx in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(idx)?;
            if entry.name() == part {
                let name = entry.name().to_string();
                let options = SimpleFileOptions::default().compression_method(entry.compression());
                drop(entry);
                writer.start_file(name, options)?;
                writer.write_all(contents)?;
            } else {
                writer.raw_copy_file(entry)?;
            }
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}
