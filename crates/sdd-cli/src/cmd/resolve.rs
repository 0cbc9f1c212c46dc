use crate::output::{display_path, print_json};
use anyhow::Context;
use sdd_core::index::ArtifactIndex;
use sdd_core::layer::LayerTable;
use sdd_core::reference::{self, Reference};
use sdd_core::resolver::{Resolution, Resolver};
use std::path::Path;

pub fn run(root: &Path, value: &str, json: bool) -> anyhow::Result<()> {
    let index = ArtifactIndex::build(root, &LayerTable::standard())
        .with_context(|| format!("failed to index {}", root.display()))?;
    let resolver = Resolver::new(&index);
    let reference = Reference::parse(value);

    let (state, target) = match resolver.resolve(&reference) {
        Resolution::NoUpstream => ("no-upstream", None),
        Resolution::Invalid => ("invalid", None),
        Resolution::Missing => ("missing", None),
        Resolution::Faulted(a) => ("faulted", Some(a)),
        Resolution::Found(a) => ("found", Some(a)),
    };
    let suggestion = match reference {
        Reference::Invalid(_) => reference::repair_value(value),
        _ => None,
    };
    let element_defined = match reference {
        Reference::Element { .. } if state == "found" => Some(resolver.element_defined(&reference)),
        _ => None,
    };

    if json {
        let value = serde_json::json!({
            "reference": value,
            "kind": reference.kind(),
            "canonical": reference.to_string(),
            "resolution": state,
            "exists": state == "found",
            "deprecated": target.map(|a| a.deprecated).unwrap_or(false),
            "element_defined": element_defined,
            "suggestion": suggestion,
            "artifact": target.map(|a| serde_json::json!({
                "id": a.id,
                "layer": a.layer,
                "title": a.title,
                "path": display_path(root, &a.path),
            })),
        });
        return print_json(&value);
    }

    println!("{value}: {state}");
    if let Some(a) = target {
        println!("  artifact:   {} (layer {})", a.id, a.layer);
        println!("  path:       {}", display_path(root, &a.path));
        if let Some(title) = &a.title {
            println!("  title:      {title}");
        }
        if a.deprecated {
            println!("  deprecated: yes");
        }
        if let Some(fault) = &a.fault {
            println!("  fault:      {fault}");
        }
    }
    if let Some(defined) = element_defined {
        println!("  element:    {}", if defined { "defined" } else { "not defined" });
    }
    if let Some(s) = suggestion {
        println!("  did you mean {s}?");
    }
    Ok(())
}
