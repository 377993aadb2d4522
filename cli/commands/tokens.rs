use anyhow::{Context, Result};
use repofuse_core::{Session, TiktokenCounter, config};

use crate::cli_args::TokensArgs;
use crate::output;

/// Always JSON: `results` maps each path to its count, `stats` holds size and mtime.
pub fn handle_tokens_command(args: &TokensArgs) -> Result<()> {
    let root = config::determine_root(args.root.as_ref())
        .context("Failed to determine repository root")?;
    let session = Session::with_root(&root)?;
    let counter = TiktokenCounter::try_new().context("Failed to load tokenizer")?;

    let batch = session.count_files_tokens(&root, &args.paths, &counter)?;
    let json = output::serialize_json(&batch, args.pretty)?;
    output::write_to_stdout(&json)
}
