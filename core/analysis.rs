use crate::config::FilterConfig;
use crate::detect;
use crate::filter::Filter;
use crate::gitignore::{GitignoreCache, GitignorePatterns};
use crate::path_guard;
use crate::secrets;
use crate::tokens::TokenCounter;
use log;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A file accepted by analysis. `path` is root-relative with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub tokens: usize,
    #[serde(default)]
    pub is_binary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub files_info: Vec<FileInfo>,
    pub total_tokens: usize,
    pub skipped_binary_files: usize,
}

/// Runs the selection through path guard, filter, binary detection and the
/// secret scanner, counting tokens for what survives. `root` must already be
/// the canonical authorized root.
pub fn analyze_selection<P: AsRef<Path>>(
    root: &Path,
    selected: &[P],
    config: &FilterConfig,
    gitignore: &GitignoreCache,
    counter: &dyn TokenCounter,
) -> AnalysisResult {
    let patterns = if config.use_gitignore {
        gitignore.get_or_parse(root)
    } else {
        Arc::new(GitignorePatterns::default())
    };
    let filter = Filter::new(root, &patterns, config);
    let mut result = AnalysisResult::default();
    let mut seen = HashSet::new();

    log::debug!("Analyzing {} selected paths", selected.len());
    for candidate in selected {
        let candidate = candidate.as_ref();
        let Some(real) = path_guard::resolve_authorized_path(Some(root), candidate) else {
            continue;
        };
        let lexical = path_guard::normalize_path(&root.join(candidate));
        let rel = match lexical.strip_prefix(root).or_else(|_| real.strip_prefix(root)) {
            Ok(rel) => path_guard::to_slash(rel),
            Err(_) => continue,
        };
        if rel.is_empty() || !seen.insert(rel.clone()) {
            continue;
        }
        match fs::metadata(&real) {
            Ok(m) if m.is_file() => {}
            Ok(_) => {
                log::debug!("Not a regular file, skipping: {}", rel);
                continue;
            }
            Err(e) => {
                log::debug!("Cannot stat '{}', skipping: {}", rel, e);
                continue;
            }
        }
        if !filter.should_process_file(Path::new(&rel)) {
            log::debug!("Filtered out: {}", rel);
            continue;
        }
        if real != lexical && !filter.should_process_file(&real) {
            log::debug!("Filtered out by link target {}: {}", real.display(), rel);
            continue;
        }

        if detect::is_binary_file(&real) {
            log::debug!("Binary file, not counting tokens: {}", rel);
            result.skipped_binary_files += 1;
            result.files_info.push(FileInfo {
                path: rel,
                tokens: 0,
                is_binary: true,
            });
            continue;
        }

        let content = match fs::read(&real) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                log::warn!("Cannot read '{}', skipping: {}", rel, e);
                continue;
            }
        };
        let scan = secrets::scan_content_for_secrets_with_policy(&content, config);
        if scan.is_suspicious {
            let ids: Vec<&str> = scan.matches.iter().map(|m| m.id.as_str()).collect();
            log::warn!("Excluding suspicious file {} ({})", rel, ids.join(", "));
            continue;
        }

        let tokens = counter.count_tokens(&content);
        result.total_tokens += tokens;
        result.files_info.push(FileInfo {
            path: rel,
            tokens,
            is_binary: false,
        });
    }
    log::info!(
        "Analysis: {} files, {} tokens, {} binary",
        result.files_info.len(),
        result.total_tokens,
        result.skipped_binary_files
    );
    result
}
