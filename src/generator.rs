//! Document generation service
//!
//! Ties the pieces together for one request:
//! validate mapping -> resolve values from the record -> substitute fields.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use docfill_core::{analyze_template, substitute_fields_with, SubstitutionOutcome, TemplateAnalysis};
use docfill_mapping::{DataDictionary, Mapping, MappingValidator, ValidationResult};

use crate::config::EngineConfig;
use crate::provider::RecordProvider;
use crate::resolver::{resolve_values, MissingPath};

/// Pre-generation validation, generation outcome and unresolved paths
#[derive(Clone, Debug)]
pub struct GenerationReport {
    pub validation: ValidationResult,
    pub outcome: SubstitutionOutcome,
    pub missing_paths: Vec<MissingPath>,
}

pub struct DocumentGenerator {
    config: EngineConfig,
    dictionary: DataDictionary,
}

impl DocumentGenerator {
    pub fn new(config: EngineConfig, dictionary: DataDictionary) -> Self {
        Self { config, dictionary }
    }

    /// Generator using the dictionary the config points at
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let dictionary = config.load_dictionary()?;
        Ok(Self::new(config, dictionary))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &DataDictionary {
        &self.dictionary
    }

    pub fn analyze(&self, template: &[u8]) -> Result<TemplateAnalysis> {
        analyze_template(template, &self.config.container_options())
            .context("Failed to analyse template")
    }

    pub fn validate(&self, mapping: &Mapping) -> ValidationResult {
        MappingValidator::new(&self.dictionary).validate(mapping)
    }

    pub fn auto_fix(&self, mapping: &Mapping) -> Mapping {
        MappingValidator::new(&self.dictionary).auto_fix(mapping)
    }

    /// Fill `template` from `record` through `mapping`.
    ///
    /// Fails without output when the template cannot be processed, or when
    /// `reject_invalid_mapping` is set and the mapping has errors.
    pub fn generate(
        &self,
        template: &[u8],
        mapping: &Mapping,
        record: &Value,
    ) -> Result<GenerationReport> {
        let validation = self.validate(mapping);
        if !validation.valid {
            if self.config.reject_invalid_mapping {
                bail!(
                    "Mapping has {} error(s), first: {}",
                    validation.errors.len(),
                    validation.errors[0].message
                );
            }
            warn!(
                errors = validation.errors.len(),
                "generating from a mapping with errors"
            );
        }

        let resolved = resolve_values(record, mapping);
        let outcome = substitute_fields_with(
            template,
            &resolved.values,
            self.config.substitution_options(),
            &self.config.container_options(),
        )
        .context("Failed to fill template")?;

        Ok(GenerationReport {
            validation,
            outcome,
            missing_paths: resolved.missing,
        })
    }

    /// Fetch the enriched record for `order_id` and generate from it
    pub async fn generate_for_order(
        &self,
        provider: &dyn RecordProvider,
        order_id: i64,
        template: &[u8],
        mapping: &Mapping,
    ) -> Result<GenerationReport> {
        let record = provider
            .enriched_record(order_id)
            .await
            .with_context(|| format!("Failed to load record for order {order_id}"))?;
        let report = self.generate(template, mapping, &record)?;
        info!(
            order_id,
            replaced = report.outcome.stats.replaced_count,
            missing = report.missing_paths.len(),
            "generated document for order"
        );
        Ok(report)
    }
}
