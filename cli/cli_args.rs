use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct RootConfigOpts {
    #[arg(
        long,
        help = "Directory to select as the repository root (default: current dir).",
        help_heading = "Repository",
        value_name = "PATH"
    )]
    pub root: Option<PathBuf>,

    #[arg(
        long,
        help = "Path of the YAML filter configuration (default: <root>/.repofuse.yaml if present).",
        value_name = "CONFIG_FILE",
        help_heading = "Repository"
    )]
    pub config: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormatArg {
    Markdown,
    Xml,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DataFormatOpts {
    #[arg(
        short = 'f',
        long,
        value_enum,
        help = "Set the output format.",
        value_name = "FORMAT",
        help_heading = "Output Formatting"
    )]
    pub format: Option<DataFormat>,

    #[arg(
        long,
        help = "Pretty-print JSON output.",
        help_heading = "Output Formatting"
    )]
    pub pretty: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Select, filter and export repository content for AI models.",
    long_about = "repofuse walks a repository under a selected root, filters it through gitignore \nrules, custom patterns and a secret scanner, counts tokens and exports the \nselection as a single Markdown or XML document.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  repofuse tree --root ./project\n  repofuse analyze -f json src/main.rs\n  repofuse export --export-format xml --tree-view -o context.xml\n  repofuse tokens src/lib.rs README.md",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(visible_alias = "t", about = "Show the filtered directory tree.")]
    Tree(TreeArgs),

    #[command(
        visible_alias = "a",
        about = "Analyze selected files: filtering, secret scan and token counts."
    )]
    Analyze(AnalyzeArgs),

    #[command(
        visible_alias = "e",
        about = "Export selected files as one Markdown or XML document."
    )]
    Export(ExportArgs),

    #[command(about = "Report token counts and file stats for the given paths.")]
    Tokens(TokensArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub root_config: RootConfigOpts,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[clap(flatten)]
    pub root_config: RootConfigOpts,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
    #[arg(help = "Files to analyze, relative to the root (default: every file in the tree).")]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[clap(flatten)]
    pub root_config: RootConfigOpts,

    #[arg(
        long,
        value_enum,
        help = "Document format [default: from config, else markdown].",
        value_name = "FORMAT",
        help_heading = "Export"
    )]
    pub export_format: Option<ExportFormatArg>,

    #[arg(
        long,
        help = "Include the file structure section.",
        help_heading = "Export"
    )]
    pub tree_view: bool,

    #[arg(
        long,
        help = "Show per-file token counts.",
        help_heading = "Export"
    )]
    pub token_count: bool,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the document to FILE instead of standard output.",
        help_heading = "Export"
    )]
    pub output: Option<PathBuf>,

    #[arg(help = "Files to export, relative to the root (default: every file in the tree).")]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TokensArgs {
    #[arg(
        long,
        help = "Directory to select as the repository root (default: current dir).",
        value_name = "PATH"
    )]
    pub root: Option<PathBuf>,
    #[arg(long, help = "Pretty-print JSON output.")]
    pub pretty: bool,
    #[arg(required = true, help = "Files to count.")]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Directory whose .repofuse.yaml is written by --save (default: current dir).",
        value_name = "PATH"
    )]
    pub root: Option<PathBuf>,
    #[arg(
        long,
        help = "Save the default configuration to <root>/.repofuse.yaml (prompts overwrite)."
    )]
    pub save: bool,
}
