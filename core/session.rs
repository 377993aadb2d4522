//! The selected root and the state tied to it.
//!
//! Every entry point re-validates against the root held here. Selecting a new
//! root drops cached gitignore rules of the old one.

use crate::analysis::{self, AnalysisResult};
use crate::config::FilterConfig;
use crate::error::{AppError, Result};
use crate::export::{self, ExportRequest, ExportResult};
use crate::gitignore::GitignoreCache;
use crate::path_guard;
use crate::tokens::{self, TokenCountBatch, TokenCounter};
use crate::tree::{self, TreeNode};
use log;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Session {
    authorized_root: Option<PathBuf>,
    gitignore: GitignoreCache,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with `dir` already selected.
    pub fn with_root(dir: impl AsRef<Path>) -> Result<Self> {
        let mut session = Self::new();
        session.authorize(dir)?;
        Ok(session)
    }

    /// Records the directory the user selected. Returns its canonical form.
    pub fn authorize(&mut self, dir: impl AsRef<Path>) -> Result<&Path> {
        let dir = dir.as_ref();
        let real = fs::canonicalize(dir).map_err(|e| AppError::DirRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if !real.is_dir() {
            return Err(AppError::NotADirectory(real));
        }
        log::info!("Selected root: {}", real.display());
        self.gitignore.clear();
        Ok(self.authorized_root.insert(real).as_path())
    }

    pub fn clear(&mut self) {
        self.authorized_root = None;
        self.gitignore.clear();
    }

    pub fn authorized_root(&self) -> Option<&Path> {
        self.authorized_root.as_deref()
    }

    pub fn gitignore_cache(&self) -> &GitignoreCache {
        &self.gitignore
    }

    /// The authorized root, provided `root` resolves to exactly it.
    pub fn ensure_root(&self, root: &Path) -> Result<&Path> {
        let authorized = self
            .authorized_root
            .as_deref()
            .ok_or(AppError::NoAuthorizedRoot)?;
        let requested = path_guard::resolve_real_path(root);
        if requested != authorized {
            log::warn!(
                "Rejected request for root '{}' (selected: '{}')",
                root.display(),
                authorized.display()
            );
            return Err(AppError::RootMismatch {
                requested: root.to_path_buf(),
                authorized: authorized.to_path_buf(),
            });
        }
        Ok(authorized)
    }

    /// Filtered tree under `root`; empty when `root` is not within the
    /// selected root or cannot be read.
    pub fn get_directory_tree(&self, root: &Path, config_content: &str) -> Vec<TreeNode> {
        tree::get_directory_tree(
            self.authorized_root(),
            root,
            config_content,
            &self.gitignore,
        )
    }

    pub fn analyze_selection<P: AsRef<Path>>(
        &self,
        root: &Path,
        selected: &[P],
        config: &FilterConfig,
        counter: &dyn TokenCounter,
    ) -> Result<AnalysisResult> {
        let root = self.ensure_root(root)?;
        Ok(analysis::analyze_selection(
            root,
            selected,
            config,
            &self.gitignore,
            counter,
        ))
    }

    pub fn process_repository(&self, request: &ExportRequest) -> Result<ExportResult> {
        let root = self.ensure_root(&request.root_path)?;
        Ok(export::export_files(
            root,
            &request.files_info,
            request.tree_view.as_deref(),
            &request.options,
        ))
    }

    pub fn count_files_tokens<P: AsRef<Path>>(
        &self,
        root: &Path,
        paths: &[P],
        counter: &dyn TokenCounter,
    ) -> Result<TokenCountBatch> {
        let root = self.ensure_root(root)?;
        Ok(tokens::count_files_tokens(root, paths, counter))
    }
}
