use anyhow::{Context, Result};
use colored::*;
use repofuse_core::{ExportFormat, ExportOptions, ExportRequest, TiktokenCounter};

use crate::Workspace;
use crate::cli_args::{ExportArgs, ExportFormatArg};
use crate::output;

pub fn handle_export_command(args: &ExportArgs, quiet: bool) -> Result<()> {
    let ws = Workspace::open(&args.root_config)?;
    let config = ws.filter_config()?;
    let mut options =
        ExportOptions::from_yaml_str(&ws.config_content).context("Invalid export options")?;
    if let Some(format) = args.export_format {
        options.export_format = match format {
            ExportFormatArg::Markdown => ExportFormat::Markdown,
            ExportFormatArg::Xml => ExportFormat::Xml,
        };
    }
    options.include_tree_view |= args.tree_view;
    options.show_token_count |= args.token_count;

    let selection = ws.selection(&args.paths);
    let counter = TiktokenCounter::try_new().context("Failed to load tokenizer")?;
    let analysis = ws
        .session
        .analyze_selection(&ws.root, &selection, &config, &counter)?;

    let request = ExportRequest {
        root_path: ws.root.clone(),
        files_info: analysis.files_info,
        tree_view: None,
        options,
    };
    let result = ws.session.process_repository(&request)?;

    match &args.output {
        Some(path) => {
            output::write_to_file(path, &result.content)?;
            if !quiet {
                eprintln!(
                    "{} {} export written to {}",
                    "✅".green(),
                    result.export_format.to_string().cyan(),
                    path.display().to_string().blue()
                );
            }
        }
        None => output::write_to_stdout(&result.content)?,
    }

    if !quiet {
        eprintln!(
            "{} {} processed, {} skipped, {} tokens",
            "Export:".green().bold(),
            result.processed_files.to_string().cyan(),
            result.skipped_files.to_string().yellow(),
            result.total_tokens.to_string().cyan()
        );
    }
    Ok(())
}
