use crate::config::{FilterConfig, normalize_extension};
use log;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct SensitiveFiles {
    names: Vec<String>,
    name_prefixes: Vec<String>,
    name_fragments: Vec<String>,
    extensions: Vec<String>,
    path_suffixes: Vec<String>,
}

static SENSITIVE_FILES: Lazy<SensitiveFiles> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/sensitive_files.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/sensitive_files.yaml")
});

/// One content rule. `value_len`, when set, is the exact length required of
/// capture group 1.
pub struct SecretRule {
    pub id: &'static str,
    pub description: &'static str,
    regex: Regex,
    value_len: Option<usize>,
}

fn rule(id: &'static str, description: &'static str, pattern: &str) -> SecretRule {
    SecretRule {
        id,
        description,
        regex: Regex::new(pattern).expect("built-in secret pattern must compile"),
        value_len: None,
    }
}

static SECRET_RULES: Lazy<Vec<SecretRule>> = Lazy::new(|| {
    vec![
        rule(
            "private-key",
            "Private key block",
            r"-----BEGIN (?:(?:RSA|DSA|EC|OPENSSH|PGP|ENCRYPTED) )?PRIVATE KEY(?: BLOCK)?-----",
        ),
        rule(
            "github-token",
            "GitHub access token",
            r"\b(?:gh[pousr]_[A-Za-z0-9]{36,255}|github_pat_[A-Za-z0-9_]{22,255})\b",
        ),
        rule(
            "slack-token",
            "Slack token",
            r"\bxox[abprs]-[A-Za-z0-9-]{10,}\b",
        ),
        rule(
            "aws-access-key-id",
            "AWS access key id",
            r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
        ),
        SecretRule {
            value_len: Some(40),
            ..rule(
                "aws-secret-access-key",
                "AWS secret access key assignment",
                r#"(?i)aws_?secret_?(?:access_?)?key["']?\s*[:=]\s*["']?([A-Za-z0-9/+=]+)"#,
            )
        },
        rule(
            "jwt",
            "JSON Web Token",
            r"\beyJ[A-Za-z0-9_-]{10,}\.eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
        ),
        rule(
            "generic-secret-assignment",
            "Hard-coded credential assignment",
            r#"(?i)\b(?:api[_-]?key|secret(?:[_-]?key)?|password|passwd|auth[_-]?token|access[_-]?token|client[_-]?secret)\b["']?\s*[:=]\s*["']([^"'\s]{8,})["']"#,
        ),
    ]
});

impl SecretRule {
    fn is_match(&self, content: &str) -> bool {
        match self.value_len {
            None => self.regex.is_match(content),
            Some(len) => self
                .regex
                .captures_iter(content)
                .any(|caps| caps.get(1).is_some_and(|m| m.as_str().len() == len)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretMatch {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SecretScanResult {
    pub is_suspicious: bool,
    pub matches: Vec<SecretMatch>,
}

/// Runs every rule in order and collects all that match.
pub fn scan_content_for_secrets(content: &str) -> SecretScanResult {
    let matches: Vec<SecretMatch> = SECRET_RULES
        .iter()
        .filter(|r| r.is_match(content))
        .map(|r| SecretMatch {
            id: r.id.to_string(),
            description: r.description.to_string(),
        })
        .collect();
    SecretScanResult {
        is_suspicious: !matches.is_empty(),
        matches,
    }
}

/// Clean result without scanning when the config turns secret exclusion off.
pub fn scan_content_for_secrets_with_policy(
    content: &str,
    config: &FilterConfig,
) -> SecretScanResult {
    if !config.secret_scanning_active() {
        log::trace!("Secret scanning disabled by configuration");
        return SecretScanResult::default();
    }
    scan_content_for_secrets(content)
}

/// Name-based check on a root-relative `/`-separated path.
pub fn is_sensitive_file_path(path: &str) -> bool {
    let path = path.trim_start_matches("./");
    let lower = path.to_lowercase();
    let basename = lower.rsplit('/').next().unwrap_or(&lower);
    if basename.is_empty() {
        return false;
    }
    let lists = &*SENSITIVE_FILES;

    if lists.names.iter().any(|n| basename == n.to_lowercase()) {
        return true;
    }
    if lists
        .name_prefixes
        .iter()
        .any(|p| basename.starts_with(&p.to_lowercase()))
    {
        return true;
    }
    if lists
        .name_fragments
        .iter()
        .any(|f| basename.contains(&f.to_lowercase()))
    {
        return true;
    }
    if let Some((_, ext)) = basename.rsplit_once('.') {
        let ext = normalize_extension(ext);
        if lists.extensions.iter().any(|e| normalize_extension(e) == ext) {
            return true;
        }
    }
    if lower.split('/').any(|segment| segment == ".ssh") {
        return true;
    }
    lists.path_suffixes.iter().any(|suffix| {
        let suffix = suffix.to_lowercase();
        lower == suffix || lower.ends_with(&format!("/{}", suffix))
    })
}
