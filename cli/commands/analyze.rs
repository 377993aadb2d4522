use anyhow::{Context, Result};
use repofuse_core::TiktokenCounter;

use crate::Workspace;
use crate::cli_args::{AnalyzeArgs, DataFormat};
use crate::output;

pub fn handle_analyze_command(args: &AnalyzeArgs) -> Result<()> {
    let ws = Workspace::open(&args.root_config)?;
    let config = ws.filter_config()?;
    let selection = ws.selection(&args.paths);

    let counter = TiktokenCounter::try_new().context("Failed to load tokenizer")?;
    let result = ws
        .session
        .analyze_selection(&ws.root, &selection, &config, &counter)?;

    match args.format_output.format.unwrap_or_default() {
        DataFormat::Text => output::print_analysis_table(&result),
        DataFormat::Json => {
            let json = output::serialize_json(&result, args.format_output.pretty)?;
            output::write_to_stdout(&json)
        }
    }
}
