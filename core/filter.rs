//! Include/exclude decision for a single path.
//!
//! Layers, first decisive one wins:
//! 1. sensitive file names (when secret exclusion is on)
//! 2. extension allow-list (files only)
//! 3. custom exclude patterns
//! 4. gitignore: negations re-include, then gitignore excludes

use crate::config::{FilterConfig, normalize_extension};
use crate::gitignore::GitignorePatterns;
use crate::path_guard;
use crate::pattern::PatternSet;
use crate::secrets;
use log;
use std::path::{Path, PathBuf};

/// A [`FilterConfig`] and gitignore rules compiled for one root.
#[derive(Debug, Clone)]
pub struct Filter {
    root: PathBuf,
    check_sensitive: bool,
    include_extensions: Option<Vec<String>>,
    custom_excludes: Option<PatternSet>,
    gitignore_includes: PatternSet,
    gitignore_excludes: PatternSet,
}

impl Filter {
    pub fn new(root: &Path, gitignore: &GitignorePatterns, config: &FilterConfig) -> Self {
        let include_extensions = (config.use_custom_includes
            && !config.include_extensions.is_empty())
        .then(|| {
            config
                .include_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect()
        });

        let custom_excludes = (config.use_custom_excludes && !config.exclude_patterns.is_empty())
            .then(|| PatternSet::new(&config.exclude_patterns));

        let (gitignore_includes, gitignore_excludes) = if config.use_gitignore {
            let excludes: Vec<&String> = gitignore
                .exclude_patterns
                .iter()
                .filter(|p| !config.exclude_patterns.contains(p))
                .collect();
            (
                PatternSet::new(&gitignore.include_patterns),
                PatternSet::new(&excludes),
            )
        } else {
            (PatternSet::default(), PatternSet::default())
        };

        Self {
            root: root.to_path_buf(),
            check_sensitive: config.secret_scanning_active(),
            include_extensions,
            custom_excludes,
            gitignore_includes,
            gitignore_excludes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the file at `path` (absolute or root-relative) is excluded.
    pub fn should_exclude(&self, path: &Path) -> bool {
        self.decide(path, false)
    }

    /// Like [`Filter::should_exclude`] but for a directory: the extension
    /// allow-list does not apply.
    pub fn should_exclude_dir(&self, path: &Path) -> bool {
        self.decide(path, true)
    }

    /// File-level gate used before reading content.
    pub fn should_process_file(&self, path: &Path) -> bool {
        let rel = path_guard::relative_slash_path(&self.root, path);
        if rel.split('/').any(|segment| segment == "node_modules") {
            log::trace!("Skipping dependency path: {}", rel);
            return false;
        }
        !self.decide(path, false)
    }

    fn decide(&self, path: &Path, is_dir: bool) -> bool {
        let rel = path_guard::relative_slash_path(&self.root, path);

        if self.check_sensitive && secrets::is_sensitive_file_path(&rel) {
            log::trace!("Excluded sensitive file: {}", rel);
            return true;
        }

        if !is_dir {
            if let Some(allowed) = &self.include_extensions {
                if let Some(ext) = Path::new(&rel).extension() {
                    let ext = normalize_extension(&ext.to_string_lossy());
                    if !allowed.contains(&ext) {
                        log::trace!("Excluded by extension filter: {}", rel);
                        return true;
                    }
                }
            }
        }

        if let Some(excludes) = &self.custom_excludes {
            if let Some(p) = excludes.find_match(&rel) {
                log::trace!("Excluded by custom pattern \"{}\": {}", p.as_str(), rel);
                return true;
            }
        }

        if self.gitignore_includes.matches_any(&rel) {
            log::trace!("Re-included by gitignore negation: {}", rel);
            return false;
        }
        if let Some(p) = self.gitignore_excludes.find_match(&rel) {
            log::trace!("Excluded by gitignore pattern \"{}\": {}", p.as_str(), rel);
            return true;
        }
        false
    }
}

/// One-shot form of [`Filter::should_exclude`].
pub fn should_exclude(
    path: &Path,
    root: &Path,
    gitignore: &GitignorePatterns,
    config: &FilterConfig,
) -> bool {
    Filter::new(root, gitignore, config).should_exclude(path)
}
