//! Glob matching for exclude lists and gitignore rules.
//!
//! `*` and `?` stay within one path segment, `**` spans any number of
//! segments. A pattern without `/` is tried against the basename as well as
//! the full relative path, so `*.log` matches `a/b/c.log`. A leading `/`
//! anchors the pattern to the root: `/build` matches `build` but not
//! `src/build`.

use globset::{GlobBuilder, GlobMatcher};
use log;

#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    matcher: Option<GlobMatcher>,
    match_basename: bool,
}

impl Pattern {
    /// Compiles `raw`. An invalid pattern is kept but never matches.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let glob_src = trimmed.trim_start_matches('/');
        let matcher = if glob_src.is_empty() {
            None
        } else {
            match GlobBuilder::new(glob_src).literal_separator(true).build() {
                Ok(glob) => Some(glob.compile_matcher()),
                Err(e) => {
                    log::debug!("Ignoring malformed pattern \"{}\": {}", trimmed, e);
                    None
                }
            }
        };
        Self {
            raw: trimmed.to_string(),
            matcher,
            match_basename: !trimmed.contains('/'),
        }
    }

    /// True when the pattern is rooted with a leading `/`.
    pub fn is_anchored(&self) -> bool {
        self.raw.starts_with('/')
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.matcher.is_some()
    }

    /// `path` is a root-relative path using `/` separators.
    pub fn matches(&self, path: &str) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };
        let path = path.trim_start_matches("./");
        if matcher.is_match(path) {
            return true;
        }
        if self.match_basename {
            let basename = path.rsplit('/').next().unwrap_or(path);
            return matcher.is_match(basename);
        }
        false
    }
}

/// An ordered list of compiled patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            patterns: raw
                .iter()
                .map(|p| p.as_ref())
                .filter(|p| !p.trim().is_empty())
                .map(Pattern::new)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// First pattern matching `path`, if any.
    pub fn find_match(&self, path: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    pub fn matches_any(&self, path: &str) -> bool {
        self.find_match(path).is_some()
    }
}

/// One-off match of `path` against `pattern`.
pub fn matches(path: &str, pattern: &str) -> bool {
    Pattern::new(pattern).matches(path)
}
