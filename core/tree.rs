use crate::config::{FilterConfig, normalize_extension};
use crate::error::{AppError, Result};
use crate::filter::Filter;
use crate::gitignore::{GitignoreCache, GitignorePatterns};
use crate::path_guard;
use chrono::{DateTime, Utc};
use log;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One entry of the filtered tree. `path` is absolute, under the selected
/// root, and can be handed back as a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Absolute paths of every file node, depth first.
pub fn collect_file_paths(nodes: &[TreeNode]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect_into(nodes, &mut out);
    out
}

fn collect_into(nodes: &[TreeNode], out: &mut Vec<PathBuf>) {
    for node in nodes {
        match &node.children {
            Some(children) => collect_into(children, out),
            None if !node.is_dir() => out.push(node.path.clone()),
            None => {}
        }
    }
}

struct TreeWalker<'a> {
    authorized_root: &'a Path,
    filter: Filter,
    visited: HashSet<PathBuf>,
    /// One per directory edge skipped by the loop guard; each is warned once.
    skipped_cycles: usize,
}

impl<'a> TreeWalker<'a> {
    fn new(authorized_root: &'a Path, filter: Filter, real_root: &Path) -> Self {
        Self {
            authorized_root,
            filter,
            visited: HashSet::from([real_root.to_path_buf()]),
            skipped_cycles: 0,
        }
    }

    fn walk(&mut self, dir: &Path) -> Result<Vec<TreeNode>> {
        let mut nodes = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if let Some(node) = self.visit(&entry) {
                nodes.push(node);
            }
        }
        // Directories first, then files; each group already sorted by name.
        nodes.sort_by_key(|n| n.kind != NodeKind::Directory);
        Ok(nodes)
    }

    fn visit(&mut self, entry: &DirEntry) -> Option<TreeNode> {
        let path = entry.path();
        let (metadata, real_path) = if entry.path_is_symlink() {
            let real = match fs::canonicalize(path) {
                Ok(real) => real,
                Err(e) => {
                    log::warn!("Skipping unresolvable symlink {}: {}", path.display(), e);
                    return None;
                }
            };
            if !real.starts_with(self.authorized_root) {
                log::warn!(
                    "Skipping symlink pointing outside the selected root: {} -> {}",
                    path.display(),
                    real.display()
                );
                return None;
            }
            match fs::metadata(&real) {
                Ok(m) => (m, real),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    return None;
                }
            }
        } else {
            match entry.metadata() {
                Ok(m) => (m, path.to_path_buf()),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    return None;
                }
            }
        };

        if entry.path_is_symlink() && self.target_excluded(&real_path, metadata.is_dir()) {
            log::debug!(
                "Skipping symlink to an excluded target: {} -> {}",
                path.display(),
                real_path.display()
            );
            return None;
        }

        if metadata.is_dir() {
            self.visit_dir(entry, &metadata, real_path)
        } else if metadata.is_file() {
            self.visit_file(entry, &metadata)
        } else {
            log::trace!("Skipping special file {}", path.display());
            None
        }
    }

    /// Filter verdict for the resolved target of a symlink.
    fn target_excluded(&self, real_path: &Path, is_dir: bool) -> bool {
        if is_dir {
            self.filter.should_exclude_dir(real_path)
        } else {
            self.filter.should_exclude(real_path)
        }
    }

    fn visit_dir(
        &mut self,
        entry: &DirEntry,
        metadata: &Metadata,
        real_path: PathBuf,
    ) -> Option<TreeNode> {
        let path = entry.path();
        if self.filter.should_exclude_dir(path) {
            return None;
        }
        let canonical = fs::canonicalize(&real_path).unwrap_or(real_path);
        if !self.visited.insert(canonical.clone()) {
            self.skipped_cycles += 1;
            log::warn!(
                "Skipping already visited directory {} (resolves to {}); possible symlink loop",
                path.display(),
                canonical.display()
            );
            return None;
        }
        let children = match self.walk(path) {
            Ok(children) => children,
            Err(e) => {
                log::warn!("{}", e);
                Vec::new()
            }
        };
        if children.is_empty() {
            log::trace!("Pruning empty directory {}", path.display());
            return None;
        }
        Some(TreeNode {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            kind: NodeKind::Directory,
            size: children.iter().map(|c| c.size).sum(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            extension: None,
            item_count: Some(children.len()),
            children: Some(children),
        })
    }

    fn visit_file(&self, entry: &DirEntry, metadata: &Metadata) -> Option<TreeNode> {
        let path = entry.path();
        if self.filter.should_exclude(path) {
            return None;
        }
        Some(TreeNode {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            kind: NodeKind::File,
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            extension: path
                .extension()
                .map(|e| normalize_extension(&e.to_string_lossy())),
            children: None,
            item_count: None,
        })
    }
}

/// Filtered tree under `root`, which must lie within `authorized_root`.
pub fn build_directory_tree(
    authorized_root: Option<&Path>,
    root: &Path,
    config: &FilterConfig,
    gitignore: &GitignoreCache,
) -> Result<Vec<TreeNode>> {
    let authorized_root = authorized_root.ok_or(AppError::NoAuthorizedRoot)?;
    let real_authorized = path_guard::resolve_real_path(authorized_root);
    let real_root = path_guard::resolve_authorized_path(Some(real_authorized.as_path()), root)
        .ok_or_else(|| AppError::OutsideRoot(root.to_path_buf()))?;
    let metadata = fs::metadata(&real_root).map_err(|e| AppError::DirRead {
        path: real_root.clone(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(AppError::NotADirectory(real_root));
    }

    let patterns = if config.use_gitignore {
        gitignore.get_or_parse(&real_root)
    } else {
        Arc::new(GitignorePatterns::default())
    };
    log::debug!("Building directory tree for {}", real_root.display());

    let filter = Filter::new(&real_root, &patterns, config);
    let mut walker = TreeWalker::new(&real_authorized, filter, &real_root);
    let nodes = walker.walk(&real_root)?;
    log::info!(
        "Directory tree for {}: {} top-level entries, {} directories visited, {} cycles skipped",
        real_root.display(),
        nodes.len(),
        walker.visited.len(),
        walker.skipped_cycles
    );
    Ok(nodes)
}

/// Lenient form of [`build_directory_tree`]: unparseable config falls back to
/// no filtering, and any failure yields an empty tree.
pub fn get_directory_tree(
    authorized_root: Option<&Path>,
    root: &Path,
    config_content: &str,
    gitignore: &GitignoreCache,
) -> Vec<TreeNode> {
    let load = FilterConfig::load_lenient(config_content);
    match build_directory_tree(authorized_root, root, &load.config, gitignore) {
        Ok(nodes) => nodes,
        Err(e) => {
            log::warn!("Cannot build directory tree: {}", e);
            Vec::new()
        }
    }
}
