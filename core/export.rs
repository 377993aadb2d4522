use crate::analysis::FileInfo;
use crate::config::{ExportFormat, ExportOptions};
use crate::detect;
use crate::path_guard;
use log;
use quick_xml::escape::escape;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub root_path: PathBuf,
    pub files_info: Vec<FileInfo>,
    /// Pre-rendered structure; rendered from `files_info` when absent.
    pub tree_view: Option<String>,
    pub options: ExportOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub content: String,
    pub export_format: ExportFormat,
    pub total_tokens: usize,
    pub processed_files: usize,
    pub skipped_files: usize,
    /// Entries that made it into `content`, in output order.
    pub files_info: Vec<FileInfo>,
}

enum Body {
    Text(String),
    Binary(String),
}

struct ExportedFile<'a> {
    info: &'a FileInfo,
    body: Body,
}

#[derive(Debug)]
struct OutlineNode {
    name: String,
    is_dir: bool,
    children: Vec<OutlineNode>,
}

fn sort_key(is_dir: bool, name: &str) -> (bool, &str) {
    (!is_dir, name)
}

fn insert_outline(level: &mut Vec<OutlineNode>, components: &[&str]) {
    let Some((first, rest)) = components.split_first() else {
        return;
    };
    let is_dir = !rest.is_empty();
    let position =
        level.binary_search_by(|node| sort_key(node.is_dir, &node.name).cmp(&sort_key(is_dir, first)));
    let index = match position {
        Ok(index) => index,
        Err(index) => {
            level.insert(
                index,
                OutlineNode {
                    name: first.to_string(),
                    is_dir,
                    children: Vec::new(),
                },
            );
            index
        }
    };
    insert_outline(&mut level[index].children, rest);
}

fn write_outline(out: &mut String, nodes: &[OutlineNode], prefix: &str) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let _ = writeln!(out, "{}{}{}", prefix, if last { "└── " } else { "├── " }, node.name);
        if !node.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            write_outline(out, &node.children, &child_prefix);
        }
    }
}

/// Box-drawing outline of root-relative `/` paths: directories before files,
/// each group sorted by name.
pub fn render_tree<S: AsRef<str>>(paths: &[S]) -> String {
    let mut roots = Vec::new();
    for path in paths {
        let components: Vec<&str> = path
            .as_ref()
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        insert_outline(&mut roots, &components);
    }
    let mut out = String::new();
    write_outline(&mut out, &roots, "");
    out
}

/// Drops code points XML 1.0 does not allow.
pub fn strip_invalid_xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c,
                '\u{9}' | '\u{A}' | '\u{D}'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}')
        })
        .collect()
}

/// CDATA section holding `text`; an embedded `]]>` is split across sections.
pub fn wrap_cdata(text: &str) -> String {
    let clean = strip_invalid_xml_chars(text);
    format!("<![CDATA[{}]]>", clean.replace("]]>", "]]]]><![CDATA[>"))
}

pub fn escape_attribute(value: &str) -> String {
    escape(strip_invalid_xml_chars(value).as_str()).into_owned()
}

fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

fn language_hint(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn render_markdown(
    files: &[ExportedFile<'_>],
    tree: Option<&str>,
    options: &ExportOptions,
    total_tokens: usize,
    skipped: usize,
) -> String {
    let mut out = String::from("# Repository Content\n\n");
    if let Some(tree) = tree {
        let fence = fence_for(tree);
        let _ = write!(
            out,
            "## File Structure\n\n{}\n{}\n{}\n\n",
            fence,
            tree.trim_end(),
            fence
        );
    }
    out.push_str("## File Contents\n\n");
    for file in files {
        if options.show_token_count {
            let _ = writeln!(out, "### {} ({} tokens)\n", file.info.path, file.info.tokens);
        } else {
            let _ = writeln!(out, "### {}\n", file.info.path);
        }
        match &file.body {
            Body::Text(content) => {
                let fence = fence_for(content);
                let _ = writeln!(
                    out,
                    "{}{}\n{}\n{}\n",
                    fence,
                    language_hint(&file.info.path),
                    content.trim_end_matches('\n'),
                    fence
                );
            }
            Body::Binary(placeholder) => {
                let _ = writeln!(out, "{}\n", placeholder);
            }
        }
    }
    let _ = write!(
        out,
        "## Summary\n\n- Total tokens: {}\n- Processed files: {}\n- Skipped files: {}\n",
        total_tokens,
        files.len(),
        skipped
    );
    out
}

fn render_xml(
    files: &[ExportedFile<'_>],
    tree: Option<&str>,
    options: &ExportOptions,
    total_tokens: usize,
    skipped: usize,
) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<repository>\n");
    if let Some(tree) = tree {
        let _ = writeln!(out, "  <structure>{}</structure>", wrap_cdata(tree));
    }
    out.push_str("  <files>\n");
    for file in files {
        let path = escape_attribute(&file.info.path);
        let (binary, body) = match &file.body {
            Body::Text(content) => (false, content.as_str()),
            Body::Binary(placeholder) => (true, placeholder.as_str()),
        };
        let tokens = if options.show_token_count {
            format!(" tokens=\"{}\"", file.info.tokens)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "    <file path=\"{}\"{} binary=\"{}\">{}</file>",
            path,
            tokens,
            binary,
            wrap_cdata(body)
        );
    }
    out.push_str("  </files>\n");
    let _ = writeln!(
        out,
        "  <summary totalTokens=\"{}\" processedFiles=\"{}\" skippedFiles=\"{}\"/>",
        total_tokens,
        files.len(),
        skipped
    );
    out.push_str("</repository>\n");
    out
}

/// Builds the export document. `root` must already be the canonical
/// authorized root; every file is re-checked against it and read fresh.
pub fn export_files(
    root: &Path,
    files_info: &[FileInfo],
    tree_view: Option<&str>,
    options: &ExportOptions,
) -> ExportResult {
    let mut exported = Vec::with_capacity(files_info.len());
    let mut skipped = 0;
    let mut total_tokens = 0;

    for info in files_info {
        let Some(real) = path_guard::resolve_authorized_path(Some(root), Path::new(&info.path))
        else {
            skipped += 1;
            continue;
        };
        let metadata = match fs::metadata(&real) {
            Ok(m) if m.is_file() => m,
            _ => {
                log::warn!("Skipping missing or non-regular file: {}", info.path);
                skipped += 1;
                continue;
            }
        };
        let body = if info.is_binary || detect::is_binary_file(&real) {
            Body::Binary(detect::describe_binary(&real, metadata.len()))
        } else {
            match fs::read(&real) {
                Ok(bytes) => Body::Text(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    log::warn!("Cannot read '{}', skipping: {}", info.path, e);
                    skipped += 1;
                    continue;
                }
            }
        };
        total_tokens += info.tokens;
        exported.push(ExportedFile { info, body });
    }

    let rendered_tree;
    let tree = if options.include_tree_view {
        match tree_view {
            Some(tree) => Some(tree),
            None => {
                let paths: Vec<&str> = exported.iter().map(|f| f.info.path.as_str()).collect();
                rendered_tree = render_tree(&paths);
                Some(rendered_tree.as_str())
            }
        }
    } else {
        None
    };

    let content = match options.export_format {
        ExportFormat::Markdown => render_markdown(&exported, tree, options, total_tokens, skipped),
        ExportFormat::Xml => render_xml(&exported, tree, options, total_tokens, skipped),
    };
    log::info!(
        "Exported {} files as {} ({} skipped, {} tokens)",
        exported.len(),
        options.export_format,
        skipped,
        total_tokens
    );
    ExportResult {
        content,
        export_format: options.export_format,
        total_tokens,
        processed_files: exported.len(),
        skipped_files: skipped,
        files_info: exported.iter().map(|f| f.info.clone()).collect(),
    }
}
