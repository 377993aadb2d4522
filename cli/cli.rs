mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::PathBuf;
use std::process;

use cli_args::{Cli, Commands, RootConfigOpts};
use repofuse_core::tree::collect_file_paths;
use repofuse_core::{AppError, FilterConfig, Session, config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<AppError>();
            let exit_code = match core_err {
                Some(AppError::Config(_)) => 1,
                Some(AppError::YamlError(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::DirRead { .. }) => 2,
                Some(AppError::NotADirectory(_)) => 2,
                Some(AppError::NoAuthorizedRoot) => 3,
                Some(AppError::RootMismatch { .. }) => 3,
                Some(AppError::OutsideRoot(_)) => 3,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(AppError::TikToken(_)) => 8,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(&args)?;
            }
            Commands::Analyze(args) => {
                log::debug!("Executing 'analyze' command...");
                commands::analyze::handle_analyze_command(&args)?;
            }
            Commands::Export(args) => {
                log::debug!("Executing 'export' command...");
                commands::export::handle_export_command(&args, quiet)?;
            }
            Commands::Tokens(args) => {
                log::debug!("Executing 'tokens' command...");
                commands::tokens::handle_tokens_command(&args)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Selected root plus the raw configuration document for it.
pub struct Workspace {
    pub session: Session,
    pub root: PathBuf,
    pub config_content: String,
}

impl Workspace {
    pub fn open(opts: &RootConfigOpts) -> Result<Self> {
        let root = config::determine_root(opts.root.as_ref())
            .context("Failed to determine repository root")?;
        let config_path = config::resolve_config_path(&root, opts.config.as_ref())
            .context("Failed to resolve configuration path")?;
        let config_content = config::read_config_content(config_path.as_deref())
            .context("Failed to read configuration")?;
        let session = Session::with_root(&root)
            .with_context(|| format!("Failed to select root {}", root.display()))?;
        Ok(Self {
            session,
            root,
            config_content,
        })
    }

    /// Strict parse: a broken config file is an error on the command line.
    pub fn filter_config(&self) -> Result<FilterConfig> {
        FilterConfig::from_yaml_str(&self.config_content)
            .context("Invalid filter configuration")
    }

    /// The given paths, or every file of the filtered tree when none are given.
    pub fn selection(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        if !paths.is_empty() {
            return paths.to_vec();
        }
        let nodes = self.session.get_directory_tree(&self.root, &self.config_content);
        collect_file_paths(&nodes)
    }
}
