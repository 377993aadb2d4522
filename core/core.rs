pub mod analysis;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod filter;
pub mod gitignore;
pub mod path_guard;
pub mod pattern;
pub mod secrets;
pub mod session;
pub mod tokens;
pub mod tree;

pub use analysis::{AnalysisResult, FileInfo, analyze_selection};
pub use config::{ConfigLoad, ExportFormat, ExportOptions, FilterConfig};
pub use error::{AppError, Result};
pub use export::{ExportRequest, ExportResult, render_tree};
pub use filter::{Filter, should_exclude};
pub use gitignore::{GitignoreCache, GitignorePatterns, parse_gitignore_content};
pub use path_guard::{
    is_path_within_root, is_path_within_temp_root, resolve_authorized_path, resolve_real_path,
};
pub use pattern::{Pattern, PatternSet, matches};
pub use secrets::{
    SecretMatch, SecretScanResult, is_sensitive_file_path, scan_content_for_secrets,
    scan_content_for_secrets_with_policy,
};
pub use session::Session;
pub use tokens::{FileStats, TiktokenCounter, TokenCountBatch, TokenCounter};
pub use tree::{NodeKind, TreeNode, get_directory_tree};
