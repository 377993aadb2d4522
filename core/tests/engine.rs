use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use repofuse_core::{
    ExportFormat, ExportOptions, ExportRequest, FileInfo, FilterConfig, NodeKind, Session,
    TreeNode,
};
use tempfile::{TempDir, tempdir};

fn words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn write_file(root: &Path, rel: &str, content: &[u8]) -> io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content)?;
    Ok(())
}

/// Root-relative paths of every node, depth first, directories with a
/// trailing `/`.
fn flatten(nodes: &[TreeNode], root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        let rel = node
            .path
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        match node.kind {
            NodeKind::Directory => {
                out.push(format!("{}/", rel));
                out.extend(flatten(node.children.as_deref().unwrap_or(&[]), root));
            }
            NodeKind::File => out.push(rel),
        }
    }
    out
}

fn setup_repository() -> io::Result<TempDir> {
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, "src/index.js", b"console.log('hello world');\n")?;
    write_file(root, "src/util/math.js", b"export const add = (a, b) => a + b;\n")?;
    write_file(root, ".env", b"API_KEY=abc123\n")?;
    write_file(
        root,
        "secrets.js",
        format!("const token = \"ghp_{}\";\n", "a1B2c3D4e5".repeat(4)).as_bytes(),
    )?;
    write_file(root, "image.png", &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0])?;
    write_file(root, "node_modules/pkg/index.js", b"module.exports = {};\n")?;
    write_file(root, "only-secrets/.env.local", b"X=1\n")?;
    fs::create_dir_all(root.join("empty/nested"))?;
    Ok(dir)
}

#[test]
fn test_tree_filters_and_prunes() -> io::Result<()> {
    let dir = setup_repository()?;
    let session = Session::with_root(dir.path()).unwrap();
    let root = session.authorized_root().unwrap().to_path_buf();

    let nodes = session.get_directory_tree(dir.path(), "");
    let paths = flatten(&nodes, &root);
    assert_eq!(
        paths,
        vec![
            "src/",
            "src/util/",
            "src/util/math.js",
            "src/index.js",
            "image.png",
        ]
    );

    let src = &nodes[0];
    assert_eq!(src.item_count, Some(2));
    assert_eq!(
        src.size,
        fs::metadata(root.join("src/index.js"))?.len()
            + fs::metadata(root.join("src/util/math.js"))?.len()
    );
    let image = nodes.iter().find(|n| n.name == "image.png").unwrap();
    assert_eq!(image.extension.as_deref(), Some("png"));
    assert!(image.last_modified.is_some());
    Ok(())
}

#[test]
fn test_tree_is_idempotent() -> io::Result<()> {
    let dir = setup_repository()?;
    let session = Session::with_root(dir.path()).unwrap();
    let first = session.get_directory_tree(dir.path(), "");
    let second = session.get_directory_tree(dir.path(), "");
    assert!(!first.is_empty());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_tree_gitignore_negation_and_custom_exclude() -> io::Result<()> {
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, ".gitignore", b"*.log\n!important.log\nbuild/\n")?;
    write_file(root, "debug.log", b"noise")?;
    write_file(root, "important.log", b"keep")?;
    write_file(root, "logs/important.log", b"keep too")?;
    write_file(root, "build/out.txt", b"artifact")?;
    write_file(root, "app.min.js", b"minified")?;
    write_file(root, "main.rs", b"fn main() {}")?;

    let session = Session::with_root(root).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();

    let paths = flatten(&session.get_directory_tree(root, ""), &canonical);
    assert_eq!(
        paths,
        vec![
            "logs/",
            "logs/important.log",
            ".gitignore",
            "important.log",
            "main.rs",
        ]
    );

    let config = "exclude_patterns:\n  - \"important.log\"\n";
    let paths = flatten(&session.get_directory_tree(root, config), &canonical);
    assert_eq!(paths, vec![".gitignore", "main.rs"]);

    let config = "use_gitignore: false\nexclude_patterns: []\n";
    let paths = flatten(&session.get_directory_tree(root, config), &canonical);
    assert!(paths.contains(&"debug.log".to_string()));
    assert!(paths.contains(&"build/out.txt".to_string()));
    Ok(())
}

#[test]
fn test_tree_rooted_gitignore_rule_stays_at_root() -> io::Result<()> {
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, ".gitignore", b"/build\n")?;
    write_file(root, "build/out.rs", b"fn out() {}")?;
    write_file(root, "src/build/keep.rs", b"fn keep() {}")?;

    let session = Session::with_root(root).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();
    let paths = flatten(
        &session.get_directory_tree(root, "exclude_patterns: []\n"),
        &canonical,
    );
    assert_eq!(
        paths,
        vec!["src/", "src/build/", "src/build/keep.rs", ".gitignore"]
    );

    let result = session
        .analyze_selection(
            root,
            &["src/build/keep.rs", "build/out.rs"],
            &FilterConfig::default(),
            &words,
        )
        .unwrap();
    let analyzed: Vec<&str> = result.files_info.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(analyzed, vec!["src/build/keep.rs"]);
    Ok(())
}

#[test]
fn test_tree_extension_allow_list() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), "src/a.rs", b"fn a() {}")?;
    write_file(dir.path(), "src/b.py", b"def b(): pass")?;
    write_file(dir.path(), "docs/c.md", b"# c")?;
    write_file(dir.path(), "LICENSE", b"MIT")?;

    let session = Session::with_root(dir.path()).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();
    let config = "include_extensions: ['.RS']\n";
    let paths = flatten(&session.get_directory_tree(dir.path(), config), &canonical);
    assert_eq!(paths, vec!["src/", "src/a.rs", "LICENSE"]);
    Ok(())
}

#[test]
fn test_tree_malformed_config_disables_pattern_filtering() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), ".gitignore", b"*.log\n")?;
    write_file(dir.path(), "debug.log", b"noise")?;
    write_file(dir.path(), ".env", b"X=1")?;

    let session = Session::with_root(dir.path()).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();
    let paths = flatten(
        &session.get_directory_tree(dir.path(), "use_gitignore: [oops"),
        &canonical,
    );
    assert!(paths.contains(&"debug.log".to_string()));
    assert!(!paths.contains(&".env".to_string()));
    Ok(())
}

#[test]
fn test_tree_rejects_root_outside_selection() -> io::Result<()> {
    let outer = tempdir()?;
    let root = outer.path().join("root");
    let sibling = outer.path().join("root-secrets");
    write_file(&root, "a.txt", b"a")?;
    write_file(&sibling, "key.txt", b"secret material")?;

    let session = Session::with_root(&root).unwrap();
    assert!(session.get_directory_tree(&sibling, "").is_empty());
    assert!(session.get_directory_tree(&root.join(".."), "").is_empty());
    assert_eq!(session.get_directory_tree(&root, "").len(), 1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_tree_symlink_cycle_terminates() -> io::Result<()> {
    use std::os::unix::fs::symlink;

    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, "real/a.txt", b"a")?;
    symlink(root, root.join("real").join("loop"))?;
    symlink(root.join("real"), root.join("real").join("self"))?;

    let session = Session::with_root(root).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();
    let paths = flatten(&session.get_directory_tree(root, ""), &canonical);
    assert_eq!(paths, vec!["real/", "real/a.txt"]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_tree_skips_symlinks_escaping_root() -> io::Result<()> {
    use std::os::unix::fs::symlink;

    let outer = tempdir()?;
    let root = outer.path().join("root");
    write_file(&root, "inside.txt", b"in")?;
    write_file(outer.path(), "outside/secret-free.txt", b"out")?;
    write_file(outer.path(), "loose.txt", b"out")?;
    symlink(outer.path().join("outside"), root.join("linked-dir"))?;
    symlink(outer.path().join("loose.txt"), root.join("linked-file.txt"))?;
    symlink(root.join("inside.txt"), root.join("alias.txt"))?;

    let session = Session::with_root(&root).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();
    let paths = flatten(&session.get_directory_tree(&root, ""), &canonical);
    assert_eq!(paths, vec!["alias.txt", "inside.txt"]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlink_to_sensitive_file_is_excluded() -> io::Result<()> {
    use std::os::unix::fs::symlink;

    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, ".env", b"DATABASE_URL=postgres://user:pw@db/app\n")?;
    write_file(root, "main.rs", b"fn main() {}")?;
    write_file(root, "keys/deploy.pem", b"not really a key")?;
    symlink(root.join(".env"), root.join("notes.txt"))?;
    symlink(root.join("keys"), root.join("material"))?;

    let session = Session::with_root(root).unwrap();
    let canonical = session.authorized_root().unwrap().to_path_buf();
    let paths = flatten(&session.get_directory_tree(root, ""), &canonical);
    assert_eq!(paths, vec!["main.rs"]);

    let result = session
        .analyze_selection(
            root,
            &["notes.txt", "material/deploy.pem", "main.rs"],
            &FilterConfig::default(),
            &words,
        )
        .unwrap();
    let analyzed: Vec<&str> = result.files_info.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(analyzed, vec!["main.rs"]);
    Ok(())
}

#[test]
fn test_analysis_excludes_secrets_and_flags_binaries() -> io::Result<()> {
    let dir = setup_repository()?;
    write_file(
        dir.path(),
        "src/config.js",
        b"module.exports = { password: \"correct-horse-battery\" };\n",
    )?;
    let session = Session::with_root(dir.path()).unwrap();

    let selection = [
        "src/index.js",
        ".env",
        "secrets.js",
        "image.png",
        "src/config.js",
        "node_modules/pkg/index.js",
        "src/index.js",
        "missing.js",
    ];
    let result = session
        .analyze_selection(dir.path(), &selection, &FilterConfig::default(), &words)
        .unwrap();

    let paths: Vec<&str> = result.files_info.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/index.js", "image.png"]);

    let image = &result.files_info[1];
    assert!(image.is_binary);
    assert_eq!(image.tokens, 0);
    assert_eq!(result.skipped_binary_files, 1);
    assert_eq!(result.total_tokens, words("console.log('hello world');\n"));
    assert_eq!(result.total_tokens, result.files_info[0].tokens);
    Ok(())
}

#[test]
fn test_analysis_rejects_paths_outside_root() -> io::Result<()> {
    let outer = tempdir()?;
    let root = outer.path().join("root");
    write_file(&root, "a.txt", b"inside file")?;
    write_file(outer.path(), "root-secrets/key.txt", b"outside file")?;
    write_file(outer.path(), "outside.js", b"outside")?;

    let session = Session::with_root(&root).unwrap();
    let sibling = outer.path().join("root-secrets").join("key.txt");
    let selection = vec![
        sibling,
        Path::new("../outside.js").to_path_buf(),
        root.join("a.txt"),
    ];
    let result = session
        .analyze_selection(&root, &selection, &FilterConfig::default(), &words)
        .unwrap();
    assert_eq!(result.files_info.len(), 1);
    assert_eq!(result.files_info[0].path, "a.txt");
    Ok(())
}

#[test]
fn test_analysis_secret_scan_can_be_disabled() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), "settings.js", b"const password = \"hunter2hunter2\";\n")?;
    let session = Session::with_root(dir.path()).unwrap();

    let strict = session
        .analyze_selection(dir.path(), &["settings.js"], &FilterConfig::default(), &words)
        .unwrap();
    assert!(strict.files_info.is_empty());

    let relaxed = FilterConfig {
        exclude_suspicious_files: false,
        ..FilterConfig::default()
    };
    let relaxed = session
        .analyze_selection(dir.path(), &["settings.js"], &relaxed, &words)
        .unwrap();
    assert_eq!(relaxed.files_info.len(), 1);
    Ok(())
}

fn export_request(root: &Path, files: Vec<FileInfo>, options: ExportOptions) -> ExportRequest {
    ExportRequest {
        root_path: root.to_path_buf(),
        files_info: files,
        tree_view: None,
        options,
    }
}

fn info(path: &str, tokens: usize) -> FileInfo {
    FileInfo {
        path: path.to_string(),
        tokens,
        is_binary: false,
    }
}

#[test]
fn test_markdown_export_lists_each_file_once() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), "src/main.rs", b"fn main() {\n    println!(\"hi\");\n}\n")?;
    write_file(dir.path(), "docs/guide.md", b"# Guide\n\n```sh\ncargo run\n```\n")?;
    write_file(dir.path(), "README.md", b"Hello.\n")?;
    let session = Session::with_root(dir.path()).unwrap();

    let options = ExportOptions {
        export_format: ExportFormat::Markdown,
        include_tree_view: true,
        show_token_count: true,
    };
    let files = vec![
        info("src/main.rs", 4),
        info("docs/guide.md", 3),
        info("README.md", 1),
    ];
    let request = export_request(dir.path(), files.clone(), options);
    let result = session.process_repository(&request).unwrap();
    let content = &result.content;

    assert_eq!(result.processed_files, 3);
    assert_eq!(result.skipped_files, 0);
    assert_eq!(result.total_tokens, 8);
    assert_eq!(result.files_info, files);
    // Nested paths are spelled out only in their heading.
    assert_eq!(content.matches("src/main.rs").count(), 1);
    assert_eq!(content.matches("docs/guide.md").count(), 1);
    // A root-level name also appears as a structure leaf.
    assert_eq!(content.matches("### README.md").count(), 1);
    assert_eq!(content.matches("└── README.md\n").count(), 1);
    assert_eq!(content.matches("README.md").count(), 2);

    let structure = content.find("## File Structure").unwrap();
    let contents = content.find("## File Contents").unwrap();
    let main_rs = content.find("### src/main.rs (4 tokens)").unwrap();
    let guide = content.find("### docs/guide.md (3 tokens)").unwrap();
    let readme = content.find("### README.md (1 tokens)").unwrap();
    let summary = content.find("## Summary").unwrap();
    assert!(structure < contents && contents < main_rs && main_rs < guide);
    assert!(guide < readme && readme < summary);
    assert!(content.contains(
        "├── docs\n│   └── guide.md\n├── src\n│   └── main.rs\n└── README.md\n"
    ));
    assert!(content.contains("````md\n# Guide"));
    assert!(content.contains("- Total tokens: 8"));
    Ok(())
}

#[test]
fn test_markdown_export_binary_placeholder_and_skips() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), "logo.png", &[0x89, b'P', b'N', b'G', 0, 0, 0, 0])?;
    write_file(dir.path(), "a.txt", b"alpha")?;
    let session = Session::with_root(dir.path()).unwrap();

    let mut png = info("logo.png", 0);
    png.is_binary = true;
    let request = export_request(
        dir.path(),
        vec![png, info("../outside.js", 9), info("gone.txt", 2), info("a.txt", 1)],
        ExportOptions::default(),
    );
    let result = session.process_repository(&request).unwrap();

    assert_eq!(result.skipped_files, 2);
    assert_eq!(result.processed_files, 2);
    assert_eq!(result.total_tokens, 1);
    assert!(result.content.contains("[BINARY FILE] PNG file, "));
    assert!(!result.content.contains("## File Structure"));
    assert!(result.content.contains("### a.txt\n"));
    Ok(())
}

#[test]
fn test_xml_export_is_well_formed() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), "weird.txt", "a]]>b\u{1}c & <d>\n".as_bytes())?;
    write_file(dir.path(), "q\"uote's.txt", b"plain")?;
    write_file(dir.path(), "bin.dat", &[0, 159, 146, 150])?;
    let session = Session::with_root(dir.path()).unwrap();

    let options = ExportOptions {
        export_format: ExportFormat::Xml,
        include_tree_view: true,
        show_token_count: true,
    };
    let request = export_request(
        dir.path(),
        vec![
            info("weird.txt", 3),
            info("q\"uote's.txt", 1),
            info("bin.dat", 0),
            info("../outside.js", 5),
        ],
        options,
    );
    let result = session.process_repository(&request).unwrap();
    assert_eq!(result.export_format, ExportFormat::Xml);
    assert_eq!(result.skipped_files, 1);
    let exported: Vec<&str> = result.files_info.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(exported, vec!["weird.txt", "q\"uote's.txt", "bin.dat"]);

    let mut reader = Reader::from_str(&result.content);
    let mut depth = 0i32;
    let mut cdata = String::new();
    let mut file_paths = Vec::new();
    let mut summary_seen = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if e.name().as_ref() == b"file" {
                    let path = e
                        .try_get_attribute("path")
                        .unwrap()
                        .unwrap()
                        .unescape_value()
                        .unwrap()
                        .into_owned();
                    file_paths.push(path);
                }
            }
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"summary" {
                    summary_seen = true;
                    let total = e.try_get_attribute("totalTokens").unwrap().unwrap();
                    assert_eq!(total.value.as_ref(), b"4");
                }
            }
            Ok(Event::CData(e)) => {
                cdata.push_str(std::str::from_utf8(&e.into_inner()).unwrap());
            }
            Ok(Event::Eof) => break,
            Err(e) => panic!("Error parsing XML: {}", e),
            _ => (),
        }
    }
    assert_eq!(depth, 0);
    assert!(summary_seen);
    assert_eq!(file_paths, vec!["weird.txt", "q\"uote's.txt", "bin.dat"]);
    assert!(cdata.contains("a]]>bc & <d>"));
    assert!(cdata.contains("[BINARY FILE] DAT file"));
    assert!(result.content.contains("binary=\"true\""));
    assert!(result.content.contains("tokens=\"3\""));
    Ok(())
}

#[test]
fn test_entry_points_reject_foreign_root() -> io::Result<()> {
    let outer = tempdir()?;
    let root = outer.path().join("root");
    let other = outer.path().join("other");
    write_file(&root, "a.txt", b"a")?;
    write_file(&other, "b.txt", b"b")?;
    let session = Session::with_root(&root).unwrap();

    let err = session
        .analyze_selection(&other, &["b.txt"], &FilterConfig::default(), &words)
        .unwrap_err();
    assert!(err.is_unauthorized());
    let err = session
        .process_repository(&export_request(&other, vec![info("b.txt", 1)], ExportOptions::default()))
        .unwrap_err();
    assert!(err.is_unauthorized());
    let err = session
        .count_files_tokens(&other, &[other.join("b.txt")], &words)
        .unwrap_err();
    assert!(err.is_unauthorized());
    Ok(())
}

#[test]
fn test_count_files_tokens_reports_stats() -> io::Result<()> {
    let dir = tempdir()?;
    write_file(dir.path(), "a.txt", b"one two three")?;
    write_file(dir.path(), "pic.png", &[0x89, b'P', b'N', b'G'])?;
    let session = Session::with_root(dir.path()).unwrap();
    let root = session.authorized_root().unwrap().to_path_buf();

    let batch = session
        .count_files_tokens(dir.path(), &[root.join("a.txt"), root.join("pic.png")], &words)
        .unwrap();
    let a = root.join("a.txt").display().to_string();
    let pic = root.join("pic.png").display().to_string();
    assert_eq!(batch.results[&a], 3);
    assert_eq!(batch.results[&pic], 0);
    assert_eq!(batch.stats[&a].size, 13);
    assert_eq!(batch.stats[&pic].size, 4);
    assert!(batch.stats[&a].modified.is_some());
    Ok(())
}
