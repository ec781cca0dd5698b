//! docfill command line interface
//!
//! # Usage
//!
//! ```bash
//! # List the fields of a template
//! docfill fields objednavka.docx
//!
//! # Check a mapping against the data dictionary
//! docfill validate mapping.json
//!
//! # Migrate deprecated paths
//! docfill autofix mapping.json > mapping.fixed.json
//!
//! # Fill a template from a flat value map
//! docfill fill objednavka.docx --values values.json --out out.docx
//!
//! # Fill a template from an enriched order record
//! docfill generate objednavka.docx --mapping mapping.json --record order.json --out out.docx
//! docfill generate objednavka.docx --mapping mapping.json --records-dir records/ --order 42 --out out.docx
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use docfill::docfill_core::{substitute_fields_with, FieldWarning, SubstitutionOutcome};
use docfill::docfill_mapping::{Mapping, ValidationResult};
use docfill::{ConfigLoader, DocumentGenerator, EngineConfig, JsonFileProvider};

#[derive(Parser)]
#[command(name = "docfill")]
#[command(version)]
#[command(about = "Fill office document templates and check their field mappings")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Engine configuration file (default: $DOCFILL_CONFIG, then config/docfill.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// List field occurrences, warnings and metadata of a template
    Fields { template: PathBuf },

    /// Validate a mapping JSON file
    Validate { mapping: PathBuf },

    /// Print the mapping with deprecated paths replaced
    Autofix { mapping: PathBuf },

    /// Fill a template from a flat field -> value JSON object
    Fill {
        template: PathBuf,
        #[arg(long)]
        values: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Leave fields without a value untouched
        #[arg(long)]
        keep_empty: bool,
    },

    /// Fill a template from an enriched record through a mapping
    Generate {
        template: PathBuf,
        #[arg(long)]
        mapping: PathBuf,
        /// Record JSON file
        #[arg(long, conflicts_with_all = ["records_dir", "order"])]
        record: Option<PathBuf>,
        /// Directory of `<order>.json` records
        #[arg(long, requires = "order")]
        records_dir: Option<PathBuf>,
        #[arg(long)]
        order: Option<i64>,
        #[arg(long)]
        out: PathBuf,
    },

    /// List every data path the dictionary knows
    Paths,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match load_generator(cli.config.as_deref()) {
        Ok(generator) => run(cli.command, &generator, cli.format).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": e }));
            } else {
                eprintln!("{}: {}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn load_generator(config: Option<&Path>) -> Result<DocumentGenerator, String> {
    let loader = match config {
        Some(path) => ConfigLoader::new(path),
        None => ConfigLoader::from_env(),
    };
    let config: EngineConfig = loader.load().map_err(|e| format!("{e:#}"))?;
    DocumentGenerator::from_config(config).map_err(|e| format!("{e:#}"))
}

/// `Ok(false)` means the command ran but the result is a failure (invalid mapping)
async fn run(
    command: Commands,
    generator: &DocumentGenerator,
    format: OutputFormat,
) -> Result<bool, String> {
    match command {
        Commands::Fields { template } => cmd_fields(&template, generator, format).map(|_| true),
        Commands::Validate { mapping } => cmd_validate(&mapping, generator, format),
        Commands::Autofix { mapping } => cmd_autofix(&mapping, generator).map(|_| true),
        Commands::Fill {
            template,
            values,
            out,
            keep_empty,
        } => cmd_fill(&template, &values, &out, keep_empty, generator, format).map(|_| true),
        Commands::Generate {
            template,
            mapping,
            record,
            records_dir,
            order,
            out,
        } => {
            let source = match (record, records_dir, order) {
                (Some(path), _, _) => RecordSource::File(path),
                (None, Some(dir), Some(id)) => RecordSource::Order(dir, id),
                _ => return Err("generate needs --record or --records-dir with --order".into()),
            };
            cmd_generate(&template, &mapping, source, &out, generator, format)
                .await
                .map(|_| true)
        }
        Commands::Paths => cmd_paths(generator, format).map(|_| true),
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_fields(
    template: &Path,
    generator: &DocumentGenerator,
    format: OutputFormat,
) -> Result<(), String> {
    let bytes = read_bytes(template)?;
    let analysis = generator
        .analyze(&bytes)
        .map_err(|e| format!("{e:#}"))?;

    match format {
        OutputFormat::Json => print_json(&analysis),
        OutputFormat::Pretty => {
            println!(
                "{} {} field occurrence(s), {} distinct",
                "Template".bold(),
                analysis.fields.len(),
                analysis.names.len()
            );
            for field in &analysis.fields {
                println!("  {} {}", field.kind.to_string().dimmed(), field.name.cyan());
            }
            print_field_warnings(&analysis.warnings);
            if let Some(title) = &analysis.metadata.title {
                println!("{} {}", "Title:".dimmed(), title);
            }
            Ok(())
        }
    }
}

fn cmd_validate(
    mapping: &Path,
    generator: &DocumentGenerator,
    format: OutputFormat,
) -> Result<bool, String> {
    let mapping = read_mapping(mapping)?;
    let result = generator.validate(&mapping);

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Pretty => print_validation(&result),
    }
    Ok(result.valid)
}

fn cmd_autofix(mapping: &Path, generator: &DocumentGenerator) -> Result<(), String> {
    let mapping = read_mapping(mapping)?;
    print_json(&generator.auto_fix(&mapping))
}

fn cmd_fill(
    template: &Path,
    values: &Path,
    out: &Path,
    keep_empty: bool,
    generator: &DocumentGenerator,
    format: OutputFormat,
) -> Result<(), String> {
    let bytes = read_bytes(template)?;
    let values: HashMap<String, String> = read_json(values)?;

    let config = generator.config();
    let mut options = config.substitution_options();
    options.keep_empty_fields |= keep_empty;

    let outcome = substitute_fields_with(&bytes, &values, options, &config.container_options())
        .map_err(|e| e.to_string())?;
    write_output(out, &outcome)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "out": out,
            "stats": outcome.stats,
            "warnings": outcome.warnings,
        })),
        OutputFormat::Pretty => {
            print_outcome(out, &outcome);
            Ok(())
        }
    }
}

enum RecordSource {
    File(PathBuf),
    Order(PathBuf, i64),
}

async fn cmd_generate(
    template: &Path,
    mapping: &Path,
    source: RecordSource,
    out: &Path,
    generator: &DocumentGenerator,
    format: OutputFormat,
) -> Result<(), String> {
    let bytes = read_bytes(template)?;
    let mapping = read_mapping(mapping)?;

    let report = match source {
        RecordSource::File(path) => {
            let record: serde_json::Value = read_json(&path)?;
            generator.generate(&bytes, &mapping, &record)
        }
        RecordSource::Order(dir, id) => {
            let provider = JsonFileProvider::new(dir);
            generator
                .generate_for_order(&provider, id, &bytes, &mapping)
                .await
        }
    }
    .map_err(|e| format!("{e:#}"))?;

    write_output(out, &report.outcome)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "out": out,
            "validation": report.validation,
            "stats": report.outcome.stats,
            "warnings": report.outcome.warnings,
            "missingPaths": report.missing_paths,
        })),
        OutputFormat::Pretty => {
            if !report.validation.valid {
                print_validation(&report.validation);
            }
            for missing in &report.missing_paths {
                println!(
                    "  {} {} -> {} resolved to nothing",
                    "MISSING".yellow(),
                    missing.field,
                    missing.path
                );
            }
            print_outcome(out, &report.outcome);
            Ok(())
        }
    }
}

fn cmd_paths(generator: &DocumentGenerator, format: OutputFormat) -> Result<(), String> {
    let paths = generator.dictionary().available_paths();
    match format {
        OutputFormat::Json => print_json(&paths),
        OutputFormat::Pretty => {
            println!(
                "{} {} ({} paths)",
                "Dictionary".bold(),
                generator.dictionary().version,
                paths.len()
            );
            for path in paths {
                println!("  {path}");
            }
            Ok(())
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn read_bytes(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn read_mapping(path: &Path) -> Result<Mapping, String> {
    read_json(path)
}

fn write_output(out: &Path, outcome: &SubstitutionOutcome) -> Result<(), String> {
    std::fs::write(out, &outcome.output)
        .map_err(|e| format!("Failed to write {}: {}", out.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn print_validation(result: &ValidationResult) {
    if result.valid && result.warnings.is_empty() {
        println!(
            "{} {} field(s) mapped (dictionary {})",
            "OK".green().bold(),
            result.valid_fields,
            result.dictionary_version
        );
        return;
    }

    for issue in &result.errors {
        println!("{} {}: {}", "error".red().bold(), issue.field, issue.message);
        if let Some(reason) = &issue.reason {
            println!("       {}", reason.dimmed());
        }
    }
    for issue in &result.warnings {
        println!("{} {}: {}", "warning".yellow().bold(), issue.field, issue.message);
    }
    println!(
        "{}/{} field(s) valid, {} error(s), {} warning(s)",
        result.valid_fields,
        result.total_fields,
        result.errors.len(),
        result.warnings.len()
    );
}

fn print_field_warnings(warnings: &[FieldWarning]) {
    for warning in warnings {
        println!("{} {}", "warning".yellow().bold(), warning);
    }
}

fn print_outcome(out: &Path, outcome: &SubstitutionOutcome) {
    print_field_warnings(&outcome.warnings);
    println!(
        "{} {} (replaced {}, skipped {}, {} value(s))",
        "Wrote".green().bold(),
        out.display(),
        outcome.stats.replaced_count,
        outcome.stats.skipped_count,
        outcome.stats.total_fields
    );
}
