use super::{load_code, ScopeArgs, ValidationFailed};
use crate::output::{display_path, print_findings, print_json};
use anyhow::Context;
use sdd_core::config::Config;
use sdd_core::finding::{Finding, FixAction};
use sdd_core::fix::{Confirm, FixEngine, FixMode, FixReport};
use sdd_core::types::FixStatus;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Asks on stderr, reads the answer from stdin. End of input means no.
struct StdinConfirm {
    root: PathBuf,
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, finding: &Finding) -> bool {
        let what = match &finding.fix_action {
            Some(FixAction::RemoveTag { tag, value }) => format!("@{tag}: {value}"),
            _ => finding.message.clone(),
        };
        eprint!(
            "Remove {what} from {} ({})? [y/N] ",
            display_path(&self.root, &finding.file),
            finding.code
        );
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

pub fn run(
    root: &Path,
    scope: &ScopeArgs,
    dry_run: bool,
    force: bool,
    yes: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let selected = scope.scope(root)?;
    let mode = if dry_run {
        FixMode::DryRun
    } else {
        FixMode::Write
    };

    let mut engine = FixEngine::new(root, &config).mode(mode).force(force);
    if let Some(code) = load_code(root, &config)? {
        engine = engine.with_code(code);
    }

    let outcome = if yes {
        engine.run(&selected, &mut |_: &Finding| true)
    } else {
        engine.run(
            &selected,
            &mut StdinConfirm {
                root: root.to_path_buf(),
            },
        )
    };
    let report = outcome.with_context(|| format!("failed to fix {selected}"))?;

    if json {
        print_json(&report)?;
    } else {
        print_report(root, &report);
    }

    let errors = report.remaining_errors();
    if errors > 0 {
        return Err(ValidationFailed { errors }.into());
    }
    Ok(())
}

fn print_report(root: &Path, report: &FixReport) {
    if report.findings.is_empty() {
        println!("No findings. Nothing to fix.");
        return;
    }
    print_findings(root, &report.findings, true);

    if !report.changes.is_empty() {
        println!();
        for change in &report.changes {
            let verb = if change.written { "fixed" } else { "would fix" };
            println!(
                "{verb} {} ({} change(s))",
                display_path(root, &change.file),
                change.fixes.len()
            );
            for fix in &change.fixes {
                println!("  {} {}", fix.code, fix.action);
            }
            if let Some(backup) = &change.backup {
                println!("  backup kept: {}", display_path(root, backup));
            }
            if let Some(older) = &change.rotated_backup {
                println!("  earlier backup moved to: {}", display_path(root, older));
            }
        }
    }

    println!(
        "\n{} fixed, {} skipped, {} not fixed; {} error(s) remain",
        report.count(FixStatus::Fixed),
        report.count(FixStatus::Skipped),
        report.count(FixStatus::NotFixed),
        report.remaining_errors()
    );
    if report.mode == FixMode::DryRun {
        println!("Dry run: no files were written.");
    }
}
