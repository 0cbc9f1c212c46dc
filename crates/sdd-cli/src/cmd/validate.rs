use super::{load_code, ScopeArgs, ValidationFailed};
use crate::output::{print_findings, print_json};
use anyhow::Context;
use sdd_core::config::Config;
use sdd_core::finding::Summary;
use sdd_core::index::ArtifactIndex;
use sdd_core::layer::LayerTable;
use sdd_core::validate::{ValidationOptions, Validator};
use std::path::Path;

pub fn run(
    root: &Path,
    scope: &ScopeArgs,
    orphans: bool,
    strict_elements: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut options = ValidationOptions::from_config(&config);
    options.strict_elements |= strict_elements;
    options.corpus_orphans |= orphans;

    let selected = scope.scope(root)?;
    let index = ArtifactIndex::build(root, &LayerTable::standard())
        .with_context(|| format!("failed to index {}", root.display()))?;
    let code = load_code(root, &config)?;

    let mut validator = Validator::new(&index, options);
    if let Some(code) = &code {
        validator = validator.with_code(code);
    }
    let findings = validator
        .validate(&selected)
        .with_context(|| format!("failed to validate {selected}"))?;
    let summary = Summary::of(&findings);

    if json {
        let value = serde_json::json!({
            "scope": selected.to_string(),
            "artifacts": index.len(),
            "findings": findings,
            "summary": summary,
        });
        print_json(&value)?;
    } else if findings.is_empty() {
        println!("{} artifact(s) checked. No findings.", index.len());
    } else {
        print_findings(root, &findings, false);
        println!(
            "\n{} error(s), {} warning(s), {} info",
            summary.errors, summary.warnings, summary.infos
        );
        if summary.fixable > 0 {
            println!(
                "{} finding(s) can be fixed automatically: sdd fix{}",
                summary.fixable,
                scope.as_flags()
            );
        }
    }

    if summary.errors > 0 {
        return Err(ValidationFailed {
            errors: summary.errors,
        }
        .into());
    }
    Ok(())
}
