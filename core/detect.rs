use crate::config::normalize_extension;
use byte_unit::{Byte, UnitType};
use log;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SNIFF_LEN: usize = 8192;

#[derive(Debug, Deserialize)]
struct BinaryExtensions {
    extensions: Vec<String>,
}

static BINARY_EXTENSIONS: Lazy<HashSet<String>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/binary_extensions.yaml"
    ));
    let parsed: BinaryExtensions = serde_yml::from_str(yaml_content)
        .expect("Failed to parse embedded data/binary_extensions.yaml");
    parsed
        .extensions
        .iter()
        .map(|e| normalize_extension(e))
        .collect()
});

pub fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| BINARY_EXTENSIONS.contains(&normalize_extension(&ext.to_string_lossy())))
        .unwrap_or(false)
}

/// Content heuristic on a leading sample.
pub fn looks_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => false,
        // Sample cut inside a multi-byte sequence.
        Err(e) if e.error_len().is_none() => false,
        Err(_) => {
            let control = sample
                .iter()
                .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t' | 0x0c))
                .count();
            control * 10 > sample.len()
        }
    }
}

/// Extension check first, then a sniff of the first 8 KiB. A file that cannot
/// be opened is reported as binary so it is never read as text.
pub fn is_binary_file(path: &Path) -> bool {
    if has_binary_extension(path) {
        return true;
    }
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Cannot sniff '{}': {}", path.display(), e);
            return true;
        }
    };
    let mut buffer = Vec::with_capacity(SNIFF_LEN);
    if let Err(e) = (&mut file).take(SNIFF_LEN as u64).read_to_end(&mut buffer) {
        log::debug!("Cannot sniff '{}': {}", path.display(), e);
        return true;
    }
    looks_binary(&buffer)
}

pub fn format_size(size: u64) -> String {
    let adjusted = Byte::from_u64(size).get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

/// Placeholder body written in place of binary content.
pub fn describe_binary(path: &Path, size: u64) -> String {
    let kind = path
        .extension()
        .map(|e| e.to_string_lossy().to_uppercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    format!("[BINARY FILE] {} file, {}", kind, format_size(size))
}
