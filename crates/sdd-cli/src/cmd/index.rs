use crate::output::{display_path, print_json, print_table};
use anyhow::Context;
use sdd_core::index::ArtifactIndex;
use sdd_core::layer::LayerTable;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let index = ArtifactIndex::build(root, &LayerTable::standard())
        .with_context(|| format!("failed to index {}", root.display()))?;

    if json {
        return print_json(&index.artifacts());
    }

    if index.is_empty() {
        println!("No artifacts found under {}.", root.display());
        return Ok(());
    }

    let rows = index
        .artifacts()
        .iter()
        .map(|a| {
            let status = match (&a.fault, a.deprecated) {
                (Some(fault), _) => format!("fault: {fault}"),
                (None, true) => "deprecated".to_string(),
                (None, false) => a.status.clone().unwrap_or_else(|| "-".to_string()),
            };
            vec![
                a.id.clone(),
                a.layer.to_string(),
                status,
                a.title.clone().unwrap_or_default(),
                display_path(root, &a.path),
            ]
        })
        .collect();
    print_table(&["ID", "LAYER", "STATUS", "TITLE", "PATH"], rows);
    println!("\n{} artifact(s)", index.len());
    Ok(())
}
