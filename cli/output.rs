use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use repofuse_core::detect::format_size;
use repofuse_core::{AnalysisResult, TreeNode};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::cli_args::{DataFormat, DataFormatOpts};

/// Prints `data` as JSON, or `plain_text` when the text format is selected.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: impl FnOnce() -> String,
    format_opts: &DataFormatOpts,
) -> Result<()> {
    match format_opts.format.unwrap_or_default() {
        DataFormat::Text => write_to_stdout(&plain_text()),
        DataFormat::Json => {
            let content = serialize_json(data, format_opts.pretty)?;
            write_to_stdout(&content)
        }
    }
}

pub fn serialize_json<T: Serialize>(data: &T, pretty: bool) -> Result<String> {
    let content = if pretty {
        serde_json::to_string_pretty(data)
    } else {
        serde_json::to_string(data)
    };
    content.context("Failed to serialize output as JSON")
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Indented listing of the tree with sizes.
pub fn format_tree_text(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    write_tree_level(&mut out, nodes, "");
    if out.is_empty() {
        out.push_str("(no files)\n");
    }
    out
}

fn write_tree_level(out: &mut String, nodes: &[TreeNode], prefix: &str) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        let label = if node.is_dir() {
            format!("{}/", node.name).blue().bold().to_string()
        } else {
            node.name.clone()
        };
        out.push_str(&format!(
            "{}{}{} {}\n",
            prefix,
            branch,
            label,
            format!("({})", format_size(node.size)).dimmed()
        ));
        if let Some(children) = &node.children {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            write_tree_level(out, children, &child_prefix);
        }
    }
}

pub fn print_analysis_table(result: &AnalysisResult) -> Result<()> {
    println!();
    println!("{}", " Analysis Summary ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Files:".green(),
        result.files_info.len().to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Tokens:".green(),
        result.total_tokens.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Binary Files:".green(),
        result.skipped_binary_files.to_string().cyan()
    );

    if result.files_info.is_empty() {
        println!("\n{}", "(No files passed analysis)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
            Cell::new("Binary").fg(Color::Green),
        ]);
        for file in &result.files_info {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.tokens).set_alignment(CellAlignment::Right),
                Cell::new(if file.is_binary { "yes" } else { "" }).fg(Color::DarkGrey),
            ]);
        }
        println!("{table}");
    }
    println!();
    Ok(())
}
