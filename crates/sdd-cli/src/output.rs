use sdd_core::finding::Finding;
use serde::Serialize;
use std::path::Path;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// `path` relative to the corpus root when possible.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Findings as `FILE:LINE  SEVERITY  CODE  MESSAGE [STATUS]` rows.
pub fn print_findings(root: &Path, findings: &[Finding], with_status: bool) {
    let mut headers = vec!["LOCATION", "SEVERITY", "CODE", "MESSAGE"];
    if with_status {
        headers.push("STATUS");
    }
    let rows = findings
        .iter()
        .map(|f| {
            let mut location = display_path(root, &f.file);
            if let Some(line) = f.line {
                location.push_str(&format!(":{line}"));
            }
            let mut row = vec![
                location,
                f.severity.to_string(),
                f.code.to_string(),
                f.message.clone(),
            ];
            if with_status {
                row.push(f.status.map(|s| s.to_string()).unwrap_or_default());
            }
            row
        })
        .collect();
    print_table(&headers, rows);
}
