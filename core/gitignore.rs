use crate::error::{AppError, Result};
use log;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

pub const GITIGNORE_FILENAME: &str = ".gitignore";

#[derive(Debug, Deserialize)]
struct BuildArtifacts {
    patterns: Vec<String>,
}

static BUILD_ARTIFACT_PATTERNS: Lazy<BuildArtifacts> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/build_artifacts.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/build_artifacts.yaml")
});

pub fn build_artifact_patterns() -> &'static [String] {
    &BUILD_ARTIFACT_PATTERNS.patterns
}

/// Patterns read from a root `.gitignore`. Negated lines land in
/// `include_patterns`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitignorePatterns {
    pub exclude_patterns: Vec<String>,
    pub include_patterns: Vec<String>,
}

impl GitignorePatterns {
    pub fn is_empty(&self) -> bool {
        self.exclude_patterns.is_empty() && self.include_patterns.is_empty()
    }
}

/// Reads `<root>/.gitignore`. `Ok(None)` when the file does not exist.
pub fn read_gitignore(root: &Path) -> Result<Option<String>> {
    let path = root.join(GITIGNORE_FILENAME);
    match fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::FileRead { path, source: e }),
    }
}

/// Parses `.gitignore` text and appends the build-artifact patterns.
pub fn parse_gitignore_content(content: &str) -> GitignorePatterns {
    let mut patterns = GitignorePatterns::default();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (negated, body) = if let Some(rest) = line.strip_prefix('!') {
            (true, rest)
        } else if let Some(rest) = line.strip_prefix('\\') {
            (false, rest)
        } else {
            (false, line)
        };
        let expanded = expand_line(body);
        if expanded.is_empty() {
            continue;
        }
        let target = if negated {
            &mut patterns.include_patterns
        } else {
            &mut patterns.exclude_patterns
        };
        for p in expanded {
            if !target.contains(&p) {
                target.push(p);
            }
        }
    }
    for artifact in build_artifact_patterns() {
        if !patterns.exclude_patterns.contains(artifact) {
            patterns.exclude_patterns.push(artifact.clone());
        }
    }
    log::debug!(
        "Parsed gitignore: {} exclude, {} include patterns",
        patterns.exclude_patterns.len(),
        patterns.include_patterns.len()
    );
    patterns
}

/// Glob forms of one rule body (negation already removed).
fn expand_line(body: &str) -> Vec<String> {
    let rooted = body.starts_with('/');
    let body = body.trim_start_matches('/');
    let body = body.trim_end_matches('/');
    if body.is_empty() {
        return Vec::new();
    }

    let mut bases = Vec::with_capacity(2);
    if rooted {
        bases.push(format!("/{}", body));
    } else {
        bases.push(body.to_string());
        if !body.contains('/') && !body.starts_with("**") {
            bases.push(format!("**/{}", body));
        }
    }

    let mut out = Vec::with_capacity(bases.len() * 2);
    for base in bases {
        let beneath = if base.ends_with("/**") {
            None
        } else {
            Some(format!("{}/**", base))
        };
        out.push(base);
        out.extend(beneath);
    }
    out
}

/// Parsed patterns per root, computed at most once per key.
#[derive(Debug, Default)]
pub struct GitignoreCache {
    entries: Mutex<HashMap<PathBuf, Arc<GitignorePatterns>>>,
}

impl GitignoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached patterns for `root`. A missing `.gitignore` yields empty lists; an
    /// unreadable one is logged and also yields empty lists.
    pub fn get_or_parse(&self, root: &Path) -> Arc<GitignorePatterns> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = entries.get(root) {
            log::trace!("Gitignore cache hit for {}", root.display());
            return Arc::clone(cached);
        }
        let parsed = match read_gitignore(root) {
            Ok(Some(content)) => parse_gitignore_content(&content),
            Ok(None) => {
                log::debug!("No .gitignore found in {}", root.display());
                GitignorePatterns::default()
            }
            Err(e) => {
                log::warn!("{}. Continuing without gitignore rules.", e);
                GitignorePatterns::default()
            }
        };
        let parsed = Arc::new(parsed);
        entries.insert(root.to_path_buf(), Arc::clone(&parsed));
        parsed
    }

    pub fn invalidate(&self, root: &Path) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(root);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
