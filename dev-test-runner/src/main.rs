//! Runs fixture cases: each `*.json` file in the fixture directory declares a
//! schema, the record type to build, a document, and the expected outcome
//! (`null` for success, otherwise the exact error message).
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;

use record_validate::decode::Decoder;
use record_validate::registry::SchemaFile;
use record_validate::{Registry, Validator, ValidatorConfig};

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    schema: SchemaFile,
    record: String,
    document: serde_json::Value,
    #[serde(default)]
    strict_arity: bool,
    expect: Option<String>,
}

fn run_case(path: &Path) -> Result<Option<String>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let case: Case = record_validate::path_de::from_str_with_path(&source, &path.to_string_lossy())?;
    let registry = Registry::from_file(case.schema)?;
    let validator = Validator::new(ValidatorConfig {
        strict_arity: case.strict_arity,
    });
    let outcome = Decoder::new(&registry, &validator)
        .record(&case.record, &case.document)
        .err()
        .map(|err| err.to_string());
    if outcome == case.expect {
        return Ok(None);
    }
    Ok(Some(format!(
        "expected {:?}\n    got      {:?}",
        case.expect, outcome
    )))
}

fn fixture_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();
    Ok(paths)
}

fn main() -> ExitCode {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures"));

    let paths = match fixture_paths(&dir) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            return ExitCode::from(2);
        }
    };

    let mut failed = 0;
    for path in &paths {
        let name = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        match run_case(path) {
            Ok(None) => eprintln!("{} {name}", "✅".green()),
            Ok(Some(diff)) => {
                failed += 1;
                eprintln!("{} {name}\n    {diff}", "❌".red());
            }
            Err(error) => {
                failed += 1;
                eprintln!("{} {name}: {error:#}", "❌".red());
            }
        }
    }
    eprintln!("{} cases, {failed} failed", paths.len());
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
