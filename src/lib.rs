//! docfill - office document templates filled from enriched order records
//!
//! The engine crates do the heavy lifting:
//! - [`docfill_core`] finds and substitutes fields inside template packages
//! - [`docfill_mapping`] validates and migrates field-to-path mappings
//!
//! This crate adds configuration, a reference value resolver, record
//! providers and the [`DocumentGenerator`] service used by the `docfill` CLI.

pub mod config;
pub mod generator;
pub mod provider;
pub mod resolver;

pub use config::{ConfigLoader, EngineConfig};
pub use generator::{DocumentGenerator, GenerationReport};
pub use provider::{InMemoryProvider, JsonFileProvider, RecordProvider};
pub use resolver::{format_date, resolve_path, resolve_values, MissingPath, ResolvedValues};

pub use docfill_core;
pub use docfill_mapping;
