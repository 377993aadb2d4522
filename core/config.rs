use crate::error::{AppError, Result};
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILENAME: &str = ".repofuse.yaml";

/// Filtering switches and pattern lists applied during traversal and analysis.
///
/// Extensions are normalized when the document is parsed (lowercase, no leading
/// dot), so the filter never has to re-interpret raw user text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FilterConfig {
    #[serde(default, deserialize_with = "deserialize_extensions")]
    pub include_extensions: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub use_custom_includes: bool,
    #[serde(default = "default_true")]
    pub use_custom_excludes: bool,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_true")]
    pub enable_secret_scanning: bool,
    #[serde(default = "default_true")]
    pub exclude_suspicious_files: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Xml,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Markdown => write!(f, "markdown"),
            ExportFormat::Xml => write!(f, "xml"),
        }
    }
}

/// Output switches read from the same document as [`FilterConfig`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ExportOptions {
    #[serde(default)]
    pub export_format: ExportFormat,
    #[serde(default)]
    pub include_tree_view: bool,
    #[serde(default)]
    pub show_token_count: bool,
}

/// Outcome of a lenient config parse. `fallback` is set when the content could
/// not be parsed and `config` holds the fallback instead.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: FilterConfig,
    pub fallback: Option<AppError>,
}

fn default_true() -> bool {
    true
}

fn default_exclude_patterns() -> Vec<String> {
    ["**/.git", "**/.git/**", "**/node_modules", "**/node_modules/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn deserialize_extensions<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(normalize_extensions(&raw))
}

/// Lowercases and strips the leading dot: `".JS"` becomes `"js"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|e| normalize_extension(e))
        .filter(|e| !e.is_empty())
        .collect()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_extensions: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
            use_custom_includes: default_true(),
            use_custom_excludes: default_true(),
            use_gitignore: default_true(),
            enable_secret_scanning: default_true(),
            exclude_suspicious_files: default_true(),
        }
    }
}

impl FilterConfig {
    /// No pattern layer active. Sensitive-file exclusion keeps its default.
    pub fn permissive() -> Self {
        Self {
            include_extensions: Vec::new(),
            exclude_patterns: Vec::new(),
            use_custom_includes: false,
            use_custom_excludes: false,
            use_gitignore: false,
            enable_secret_scanning: default_true(),
            exclude_suspicious_files: default_true(),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str::<FilterConfig>(content)
            .map_err(|e| AppError::Config(format!("Error parsing filter configuration: {}", e)))
    }

    pub fn load_lenient(content: &str) -> ConfigLoad {
        match Self::from_yaml_str(content) {
            Ok(config) => ConfigLoad {
                config,
                fallback: None,
            },
            Err(e) => {
                log::warn!("{}. Continuing without filtering.", e);
                ConfigLoad {
                    config: Self::permissive(),
                    fallback: Some(e),
                }
            }
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yml::to_string(self)?)
    }

    /// True when content-based secret exclusion is active.
    pub fn secret_scanning_active(&self) -> bool {
        self.enable_secret_scanning && self.exclude_suspicious_files
    }
}

impl ExportOptions {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str::<ExportOptions>(content)
            .map_err(|e| AppError::Config(format!("Error parsing export options: {}", e)))
    }
}

/// The document written by `repofuse config`: filter settings followed by
/// export settings, flat, the way both structs read it back.
pub fn default_config_document() -> Result<String> {
    let mut doc = FilterConfig::default().to_yaml_string()?;
    doc.push_str(&serde_yml::to_string(&ExportOptions::default())?);
    Ok(doc)
}

pub fn determine_root(cli_root: Option<&PathBuf>) -> Result<PathBuf> {
    let path_to_resolve = match cli_root {
        Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()),
        None => env::current_dir().map_err(AppError::Io)?,
    };

    let resolved = path_to_resolve.canonicalize().map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to canonicalize root '{}': {}",
                path_to_resolve.display(),
                e
            ),
        ))
    })?;
    if !resolved.is_dir() {
        return Err(AppError::NotADirectory(resolved));
    }
    Ok(resolved)
}

pub fn resolve_config_path(root: &Path, cli_config_file: Option<&String>) -> Result<Option<PathBuf>> {
    match cli_config_file {
        Some(p_str) => {
            let path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            Ok(Some(path))
        }
        None => {
            let default_path = root.join(DEFAULT_CONFIG_FILENAME);
            if default_path.is_file() {
                log::debug!("Using default config file path: {}", default_path.display());
                Ok(Some(default_path))
            } else {
                log::debug!(
                    "No config file specified and default not found at: {}",
                    default_path.display()
                );
                Ok(None)
            }
        }
    }
}

/// Raw config content for a root. An absent file yields an empty document.
pub fn read_config_content(config_path: Option<&Path>) -> Result<String> {
    match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path.display());
            fs::read_to_string(path).map_err(|e| AppError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })
        }
        None => Ok(String::new()),
    }
}
