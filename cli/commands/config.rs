use anyhow::{Context, Result};
use colored::*;
use repofuse_core::config::{self, DEFAULT_CONFIG_FILENAME};
use std::io::{self, Write};

use crate::cli_args::ConfigArgs;
use crate::output;

pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let document = config::default_config_document()?;

    if !args.save {
        return output::write_to_stdout(&document);
    }

    let root = config::determine_root(args.root.as_ref())
        .context("Failed to determine target directory")?;
    let save_path = root.join(DEFAULT_CONFIG_FILENAME);

    if save_path.exists() {
        if quiet {
            anyhow::bail!(
                "Target file '{}' exists. Overwrite prevented in quiet mode.",
                save_path.display()
            );
        }
        print!(
            "{} Config file already exists at '{}'. Overwrite? [{}/{}] ",
            "⚠️".yellow(),
            save_path.display().to_string().cyan(),
            "y".green(),
            "N".red()
        );
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .context("Failed to read user input")?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Save cancelled.");
            return Ok(());
        }
    }

    output::write_to_file(&save_path, &document)?;
    if !quiet {
        println!(
            "{} Default configuration saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
