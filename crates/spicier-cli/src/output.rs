//! Result export: CSV (time plus one column per probed signal) and JSON
//! `{"steps": [...]}`, in that precedence order when both are requested.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use spicier_solver::TransientResult;

pub enum Format {
    Csv,
    Json,
}

impl Format {
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Csv,
        }
    }
}

pub fn write_result(result: &TransientResult, path: &Path, format: Format) -> Result<()> {
    match format {
        Format::Csv => write_csv(result, path),
        Format::Json => write_json(result, path),
    }
}

fn write_csv(result: &TransientResult, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;

    let node_names: Vec<&str> = result
        .steps
        .first()
        .map(|s| s.node_voltages.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let branch_names: Vec<&str> = result
        .steps
        .first()
        .map(|s| s.branch_currents.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut header = vec!["t".to_string()];
    header.extend(node_names.iter().map(|n| format!("V({n})")));
    header.extend(branch_names.iter().map(|n| format!("I({n})")));
    writeln!(file, "{}", header.join(","))?;

    for step in &result.steps {
        let mut row = vec![format!("{:e}", step.t)];
        for name in &node_names {
            row.push(format!("{:e}", step.node_voltages.get(*name).copied().unwrap_or(0.0)));
        }
        for name in &branch_names {
            row.push(format!("{:e}", step.branch_currents.get(*name).copied().unwrap_or(0.0)));
        }
        writeln!(file, "{}", row.join(","))?;
    }
    Ok(())
}

fn write_json(result: &TransientResult, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, result).context("serializing transient result to JSON")?;
    Ok(())
}
