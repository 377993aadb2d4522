//! Token counting seam and the batch token/stat lookup.

use crate::detect;
use crate::error::{AppError, Result};
use crate::path_guard;
use chrono::{DateTime, Utc};
use log;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Counts tokens in a piece of text. Total: a failing backend reports 0.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> usize {
        self(text)
    }
}

/// `cl100k_base` BPE counter.
pub struct TiktokenCounter {
    bpe: Option<CoreBPE>,
}

impl TiktokenCounter {
    pub fn try_new() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))?;
        Ok(Self { bpe: Some(bpe) })
    }

    /// Like [`TiktokenCounter::try_new`], but a load failure yields a counter
    /// that always reports 0.
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(counter) => counter,
            Err(e) => {
                log::warn!("{}. Token counts will be reported as 0.", e);
                Self { bpe: None }
            }
        }
    }
}

impl Default for TiktokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenCountBatch {
    pub results: BTreeMap<String, usize>,
    pub stats: BTreeMap<String, FileStats>,
}

/// Token count and stats for each path, keyed by resolved path. Paths outside
/// `root` are reported with 0 tokens and no stats.
pub fn count_files_tokens<P: AsRef<Path>>(
    root: &Path,
    paths: &[P],
    counter: &dyn TokenCounter,
) -> TokenCountBatch {
    let mut batch = TokenCountBatch::default();
    for path in paths {
        let path = path.as_ref();
        let Some(resolved) = path_guard::resolve_authorized_path(Some(root), path) else {
            batch.results.insert(path.display().to_string(), 0);
            continue;
        };
        let key = resolved.display().to_string();
        let metadata = match fs::metadata(&resolved) {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                log::debug!("Not a regular file: {}", key);
                batch.results.insert(key, 0);
                continue;
            }
            Err(e) => {
                log::debug!("Cannot stat '{}': {}", key, e);
                batch.results.insert(key, 0);
                continue;
            }
        };
        batch.stats.insert(
            key.clone(),
            FileStats {
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            },
        );
        let tokens = if detect::is_binary_file(&resolved) {
            0
        } else {
            match fs::read(&resolved) {
                Ok(bytes) => counter.count_tokens(&String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    log::debug!("Cannot read '{}': {}", key, e);
                    0
                }
            }
        };
        batch.results.insert(key, tokens);
    }
    log::debug!("Counted tokens for {} paths", batch.results.len());
    batch
}
