use crate::output::{print_json, print_table};
use anyhow::Context;
use sdd_core::config::Config;
use sdd_core::fix::AuditJournal;
use std::path::Path;

pub fn run(root: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let journal = AuditJournal::new(config.audit_file(root));
    let entries = journal
        .tail(limit)
        .with_context(|| format!("failed to read {}", journal.path().display()))?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("Audit journal is empty.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            let content = e
                .removed_content
                .as_deref()
                .map(|r| format!("- {r}"))
                .or_else(|| e.inserted_content.as_deref().map(|i| format!("+ {i}")))
                .unwrap_or_default();
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.file.display().to_string(),
                e.issue_code.to_string(),
                e.action.clone(),
                content.lines().next().unwrap_or("").to_string(),
            ]
        })
        .collect();
    print_table(&["TIMESTAMP", "FILE", "CODE", "ACTION", "CONTENT"], rows);
    Ok(())
}
