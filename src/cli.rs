//! Minimal CLI: schema + JSON documents → validation report
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;

use record_validate::decode::Decoder;
use record_validate::{Error, Registry, Validator, ValidatorConfig};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON/NDJSON documents against record types declared in a schema file
#[derive(Parser, Debug)]
#[command(name = "record-validate", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// build each document as a record and report every failing field
    Check(CheckOut),
    /// print the resolved record types of a schema file
    Describe(DescribeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema file declaring enums and record types
    #[arg(long)]
    schema: PathBuf,

    /// record type each document is built as
    #[arg(long)]
    record: String,

    /// fail tuples whose length differs from the declared arity
    #[arg(long, default_value_t = false)]
    strict_arity: bool,

    /// report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    /// schema file declaring enums and record types
    #[arg(long)]
    schema: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

struct Document {
    source: String,
    json: serde_json::Value,
}

#[derive(Serialize, Debug)]
struct Report {
    source: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureReport>,
}

#[derive(Serialize, Debug)]
struct FailureReport {
    field: String,
    expected: String,
    received: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            if self.ndjson {
                for (index, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", index + 1);
                    let json_value = serde_json::from_str::<serde_json::Value>(line)
                        .with_context(|| format!("failed to parse JSON line ({label})"))?;
                    documents.push(self.select(label, json_value)?);
                }
            } else {
                let json_value = serde_json::from_str::<serde_json::Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(self.select(source_path_str, json_value)?);
            }
        }
        Ok(documents)
    }

    fn select(&self, source: String, json: serde_json::Value) -> Result<Document> {
        let json = match self.json_pointer.as_deref() {
            None => json,
            Some(pointer) => json
                .pointer(pointer)
                .cloned()
                .with_context(|| format!("JSON pointer {pointer} matched nothing in {source}"))?,
        };
        Ok(Document { source, json })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns whether every checked document passed.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                // 1) load schema
                let registry = Registry::load(&target.schema)
                    .with_context(|| format!("failed to load schema {}", target.schema.display()))?;
                registry.require(&target.record)?;

                // 2) build every document as a record, in parallel
                let validator = Validator::new(ValidatorConfig {
                    strict_arity: target.strict_arity,
                });
                let decoder = Decoder::new(&registry, &validator);
                let documents = target.input_settings.load_documents()?;
                let reports = documents
                    .par_iter()
                    .map(|doc| check_document(&decoder, &target.record, doc))
                    .collect::<Result<Vec<_>>>()?;

                // 3) report
                let rendered = match target.format {
                    Format::Text => render_text(&reports),
                    Format::Json => serde_json::to_string_pretty(&reports)?,
                };
                write_output(target.out.as_ref(), &rendered)?;
                Ok(reports.iter().all(|r| r.ok))
            }
            Command::Describe(target) => {
                let registry = Registry::load(&target.schema)
                    .with_context(|| format!("failed to load schema {}", target.schema.display()))?;
                println!("{}", describe(&registry));
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Data errors become failed reports. An unsupported descriptor is a schema
/// bug and aborts the whole run.
fn check_document(decoder: &Decoder<'_>, record: &str, doc: &Document) -> Result<Report> {
    match decoder.record(record, &doc.json) {
        Ok(_) => Ok(Report {
            source: doc.source.clone(),
            ok: true,
            error: None,
            failures: Vec::new(),
        }),
        Err(err @ Error::UnsupportedDescriptor { .. }) => {
            Err(anyhow::Error::new(err).context(format!("while checking {}", doc.source)))
        }
        Err(err) => {
            let failures = match &err {
                Error::ValidationFailed { failures, .. } => failures
                    .iter()
                    .map(|f| FailureReport {
                        field: f.field.clone(),
                        expected: f.expected.to_string(),
                        received: f.received.to_string(),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            Ok(Report {
                source: doc.source.clone(),
                ok: false,
                error: Some(err.to_string()),
                failures,
            })
        }
    }
}

fn render_text(reports: &[Report]) -> String {
    let mut out = String::new();
    for report in reports {
        if report.ok {
            out.push_str(&format!("{} {}\n", "PASS".green().bold(), report.source));
            continue;
        }
        out.push_str(&format!("{} {}\n", "FAIL".red().bold(), report.source));
        if let Some(error) = &report.error {
            for line in error.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
    }
    let passed = reports.iter().filter(|r| r.ok).count();
    out.push_str(&format!(
        "{passed} passed, {} failed",
        reports.len() - passed
    ));
    out
}

fn describe(registry: &Registry) -> String {
    let mut out = String::new();
    for (name, variants) in registry.enums() {
        out.push_str(&format!("enum {name}: {}\n", variants.join(" | ")));
    }
    for schema in registry.schemas() {
        match schema.bases() {
            [] => out.push_str(&format!("record {}\n", schema.name())),
            bases => out.push_str(&format!("record {} extends {}\n", schema.name(), bases.join(", "))),
        }
        for field in schema.fields() {
            match &field.default {
                Some(default) => out.push_str(&format!("    {}: {} = {}\n", field.name, field.ty, default.repr())),
                None => out.push_str(&format!("    {}: {}\n", field.name, field.ty)),
            }
        }
    }
    out.trim_end().to_owned()
}

fn write_output(out: Option<&PathBuf>, contents: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
