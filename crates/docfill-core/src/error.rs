//! Error types for container and content-tree handling
//!
//! Every variant here is fatal for the call that produced it: extraction and
//! substitution never return partial output alongside an error.

use thiserror::Error;

/// Main error type for docfill-core
#[derive(Error, Debug)]
pub enum DocfillError {
    #[error("Template is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Template has no '{part}' part")]
    MissingPart { part: String },

    #[error("Part '{part}' is not valid UTF-8")]
    Encoding { part: String },

    #[error("Part '{part}' is not well-formed XML: {source}")]
    Xml {
        part: String,
        #[source]
        source: crate::tree::ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocfillError {
    /// True for errors caused by the template content rather than the environment
    pub fn is_template_error(&self) -> bool {
        !matches!(self, DocfillError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, DocfillError>;
