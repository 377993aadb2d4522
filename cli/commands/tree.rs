use anyhow::Result;

use crate::Workspace;
use crate::cli_args::TreeArgs;
use crate::output;

pub fn handle_tree_command(args: &TreeArgs) -> Result<()> {
    let ws = Workspace::open(&args.root_config)?;
    // Surface config errors here; the engine itself would fall back silently.
    ws.filter_config()?;

    let nodes = ws.session.get_directory_tree(&ws.root, &ws.config_content);
    log::info!("Tree has {} top-level entries", nodes.len());

    output::print_data_or_text(
        &nodes,
        || output::format_tree_text(&nodes),
        &args.format_output,
    )
}
