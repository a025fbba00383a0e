//! Test harness for the YAML key converter against fixture files.
//!
//! Every `test/yaml/<name>.yaml` is converted below the root `user` and the
//! formatted key set (with metadata) is compared against `test/keys/<name>.keys`.
//! Files in `test/nay/` are expected to fail; when a `.error` file sits next
//! to one, the error message has to match it exactly.

use std::fs;
use std::path::{Path, PathBuf};

use libyanlr::{parse, parse_with_filename, tokenize, TokenKind};

/// Root test directory.
fn test_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test")
}

/// All files matching `*.<ext>` in a subdirectory of test/, sorted.
fn get_files_in_subdir(subdir: &str, ext: &str) -> Vec<PathBuf> {
    let pattern = test_root().join(subdir).join(format!("*.{}", ext));
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .expect("valid glob pattern")
        .flatten()
        .collect();
    files.sort();
    files
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

/// Read the sibling file with the same stem and another extension.
fn read_companion(path: &Path, subdir: &str, ext: &str) -> Option<String> {
    let stem = path.file_stem().unwrap().to_string_lossy();
    fs::read_to_string(test_root().join(subdir).join(format!("{}.{}", stem, ext))).ok()
}

/// Run a single .yaml test file.
fn run_yaml_test(path: &Path) -> Result<(), String> {
    let filename = file_name(path);
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", filename, e))?;

    let keys = parse_with_filename(&content, "user", Some(&filename))
        .map_err(|e| format!("{}: {}", filename, e))?;
    let actual = keys.format(true);

    match read_companion(path, "keys", "keys") {
        Some(expected) if expected == actual => {
            println!("  {} => {} keys", filename, keys.len());
            Ok(())
        }
        Some(expected) => Err(format!(
            "{}: Key mismatch\n--- expected\n{}--- actual\n{}",
            filename, expected, actual
        )),
        None => Err(format!("{}: Missing .keys file", filename)),
    }
}

/// Run a single .yaml file from test/nay (expected to fail).
fn run_nay_test(path: &Path) -> Result<(), String> {
    let filename = file_name(path);
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", filename, e))?;

    match parse_with_filename(&content, "user", Some(&filename)) {
        Ok(keys) => Err(format!(
            "{}: Expected parse error, but got success:\n{}",
            filename,
            keys.format(true)
        )),
        Err(e) => {
            let actual_error = e.to_string();
            match read_companion(path, "nay", "error") {
                Some(expected) if expected.trim() == actual_error => {
                    println!("  {} => error (as expected)", filename);
                    Ok(())
                }
                Some(expected) => Err(format!(
                    "{}: Error mismatch\n    expected: {}\n    actual:   {}",
                    filename,
                    expected.trim(),
                    actual_error
                )),
                None => {
                    println!(
                        "  {} => error: {} (no .error file to compare)",
                        filename, actual_error
                    );
                    Ok(())
                }
            }
        }
    }
}

fn run_all(kind: &str, files: &[PathBuf], run: fn(&Path) -> Result<(), String>) {
    assert!(!files.is_empty(), "No {} test files found!", kind);

    println!("\nRunning {} {} test files:", files.len(), kind);

    let mut passed = 0;
    let mut errors: Vec<String> = Vec::new();
    for file in files {
        match run(file) {
            Ok(()) => passed += 1,
            Err(e) => errors.push(e),
        }
    }

    println!("\nResults: {} passed, {} failed", passed, errors.len());

    if !errors.is_empty() {
        println!("\nErrors:");
        for error in &errors {
            println!("  - {}", error);
        }
    }

    assert!(errors.is_empty(), "{} {} tests failed", errors.len(), kind);
}

#[test]
fn test_all_yaml_fixtures() {
    run_all("yaml", &get_files_in_subdir("yaml", "yaml"), run_yaml_test);
}

#[test]
fn test_all_nay_fixtures() {
    run_all("nay", &get_files_in_subdir("nay", "yaml"), run_nay_test);
}

/// Every valid fixture scans into a stream whose block markers balance.
#[test]
fn test_block_markers_balance_in_fixtures() {
    for path in get_files_in_subdir("yaml", "yaml") {
        let content = fs::read_to_string(&path).unwrap();
        let tokens = tokenize(&content).unwrap();
        let opened = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::MappingStart | TokenKind::SequenceStart))
            .count();
        let closed = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::BlockEnd)
            .count();
        assert_eq!(opened, closed, "{}", file_name(&path));
    }
}

// =============================================================================
// Individual cases
// =============================================================================

#[test]
fn test_top_level_pairs() {
    let keys = parse("a: 1\nb: 2\n", "user").unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys.value("user/a"), Some("1"));
    assert_eq!(keys.value("user/b"), Some("2"));
}

#[test]
fn test_sequence_below_key() {
    let keys = parse("list:\n  - x\n  - y\n", "user").unwrap();
    assert_eq!(keys.lookup("user/list").unwrap().meta("array"), Some("#1"));
    assert_eq!(keys.value("user/list/#0"), Some("x"));
    assert_eq!(keys.value("user/list/#1"), Some("y"));
}

#[test]
fn test_custom_root() {
    let keys = parse("a:\n  b: c\n", "system/app").unwrap();
    assert_eq!(keys.value("system/app/a/b"), Some("c"));
}

#[test]
fn test_windows_line_endings() {
    let keys = parse("a: 1\r\nb:\r\n  - 2\r\n", "user").unwrap();
    assert_eq!(keys.value("user/a"), Some("1"));
    assert_eq!(keys.value("user/b/#0"), Some("2"));
}

#[test]
fn test_key_with_slash_is_one_segment() {
    let keys = parse("\"a/b\": 1\n", "user").unwrap();
    let key = keys.iter().next().unwrap();
    assert_eq!(key.name().segments(), ["user", "a/b"]);
    assert_eq!(key.name().to_string(), r"user/a\/b");
}

#[test]
fn test_repeated_key_last_write_wins() {
    let keys = parse("a: 1\na: 2\n", "user").unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys.value("user/a"), Some("2"));
}

#[test]
fn test_unterminated_quote_location() {
    let err = parse("a: \"open", "user").unwrap_err();
    let location = err.location().unwrap();
    assert_eq!((location.line, location.column), (1, 3));
}

#[test]
fn test_key_length_limit() {
    let key = "k".repeat(1000);
    let keys = parse(&format!("{}: 1\n", key), "user").unwrap();
    assert_eq!(keys.value(&format!("user/{}", key)), Some("1"));

    let err = parse(&format!("{}: 1\n", "k".repeat(1100)), "user").unwrap_err();
    assert!(err.is_scan(), "{}", err);
}

#[test]
fn test_nested_key_on_value_line_fails() {
    let err = parse("a: b: c\n", "user").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mapping values are not allowed here at 1:5"
    );
}
