use crate::config::RenderConfig;
use crate::error::{AppError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Bytes sampled from the head of a file for the binary heuristic.
const BINARY_SAMPLE_BYTES: usize = 8192;

/// Extensions that are binary by definition, no content probe needed.
static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "png", "jpg", "jpeg", "gif", "webp", "bmp", "svg", "ico", "pdf", "zip", "tar", "gz",
        "bz2", "xz", "7z", "rar", "mp3", "mp4", "mov", "avi", "mkv", "wav", "ogg", "flac", "ttf",
        "otf", "eot", "woff", "woff2", "so", "dll", "dylib", "class", "jar", "exe", "bin",
    ]
    .into_iter()
    .collect()
});

/// Classification outcome for a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Renderable,
    SkippedBinary,
    SkippedOversized,
}

/// One file discovered under the scan root.
///
/// Immutable once the scan pass finishes: `text` is present exactly when
/// the disposition is `Renderable`, and `language` is filled in by the
/// render dispatcher before any assembler runs.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// Slash-separated path relative to the scan root. Unique per tree.
    pub rel_path: String,
    pub size: u64,
    pub depth: usize,
    pub disposition: Disposition,
    pub language: Option<String>,
    pub text: Option<String>,
}

impl FileNode {
    pub fn is_renderable(&self) -> bool {
        self.disposition == Disposition::Renderable
    }
}

/// Result of the walk/classify/load pass.
#[derive(Debug)]
pub struct ScanOutcome {
    /// All discovered files, sorted by `rel_path`.
    pub nodes: Vec<FileNode>,
    /// Per-entry problems that were recovered from rather than aborting.
    pub warnings: Vec<String>,
}

/// Decide a file's disposition from its size and a sampled prefix.
///
/// Pure in (size, extension, sample, threshold): repeated runs over the
/// same input always classify identically. A file at or above the
/// threshold is oversized regardless of content.
pub fn classify(size: u64, extension: Option<&str>, sample: &[u8], threshold: u64) -> Disposition {
    if size >= threshold {
        return Disposition::SkippedOversized;
    }
    if let Some(ext) = extension {
        if BINARY_EXTENSIONS.contains(ext.to_ascii_lowercase().as_str()) {
            return Disposition::SkippedBinary;
        }
    }
    if sample.contains(&0) {
        return Disposition::SkippedBinary;
    }
    let suspect = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
        .count();
    if !sample.is_empty() && suspect * 10 > sample.len() * 3 {
        return Disposition::SkippedBinary;
    }
    Disposition::Renderable
}

/// Decode raw bytes to text, degrading instead of failing.
///
/// Strict UTF-8 first; on failure a lossy pass substitutes U+FFFD. If more
/// than a third of the decoded characters are replacement characters the
/// content is useless and `None` is returned so the caller can reclassify
/// the file as binary.
fn decode_text(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            let lossy = String::from_utf8_lossy(err.as_bytes()).into_owned();
            let total = lossy.chars().count();
            let replaced = lossy.chars().filter(|&c| c == '\u{FFFD}').count();
            if total > 0 && replaced * 3 > total {
                None
            } else {
                Some(lossy)
            }
        }
    }
}

/// Walk the tree under `root`, classify and load every file.
///
/// Fails only if the root itself is unreadable. Individual unreadable
/// entries are recorded as warnings and degraded to `SkippedBinary`.
pub fn scan_tree(root: &Path, config: &RenderConfig) -> Result<ScanOutcome> {
    let metadata = fs::metadata(root).map_err(|e| AppError::Access {
        path: root.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(AppError::Access {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }
    // Surface permission problems on the root before walking; the walker
    // itself reports them as skippable per-entry errors.
    fs::read_dir(root).map_err(|e| AppError::Access {
        path: root.to_path_buf(),
        source: e,
    })?;

    let exclude_set = build_glob_set(&config.exclude_globs)?;

    let mut builder = WalkBuilder::new(root);
    builder.hidden(false);
    builder.follow_links(config.follow_symlinks);
    builder.ignore(config.use_gitignore);
    builder.git_ignore(config.use_gitignore);
    builder.git_exclude(config.use_gitignore);
    builder.require_git(false);
    builder.sort_by_file_path(|a, b| a.cmp(b));
    log::debug!(
        "WalkBuilder configured (gitignore: {}, follow_symlinks: {})",
        config.use_gitignore,
        config.follow_symlinks
    );

    let mut warnings = Vec::new();
    let mut candidates: Vec<(PathBuf, String, usize)> = Vec::new();

    log::info!("Walking scan root: {}", root.display());
    for entry_result in builder.build() {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Error walking directory: {}", e);
                warnings.push(format!("walk: {}", e));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
        if !is_file {
            continue;
        }
        let path = entry.path();
        let Some(relative) = pathdiff::diff_paths(path, root) else {
            log::warn!("Could not get relative path for: {}", path.display());
            continue;
        };
        if relative.components().next() == Some(Component::Normal(".git".as_ref())) {
            log::trace!("Skipping path within .git: {}", relative.display());
            continue;
        }
        let rel_path = normalize_rel_path(&relative);
        if exclude_set.is_match(&rel_path) {
            log::trace!("Excluded by pattern: {}", rel_path);
            continue;
        }
        candidates.push((path.to_path_buf(), rel_path, entry.depth()));
    }
    log::info!("Walk complete. Found {} candidate files.", candidates.len());

    let threshold = config.size_threshold_bytes;
    let results: Vec<(FileNode, Option<String>)> = candidates
        .into_par_iter()
        .map(|(path, rel_path, depth)| load_node(&path, rel_path, depth, threshold))
        .collect();

    let mut nodes = Vec::with_capacity(results.len());
    for (node, warning) in results {
        if let Some(w) = warning {
            log::warn!("{}", w);
            warnings.push(w);
        }
        nodes.push(node);
    }

    // Parallel collection order is nondeterministic in principle; the sort
    // restores the walker's lexicographic contract.
    nodes.par_sort_unstable_by(|a, b| a.rel_path.cmp(&b.rel_path));

    Ok(ScanOutcome { nodes, warnings })
}

/// Classify and (when renderable) load a single file. Returns the node and
/// an optional warning describing a degraded outcome.
fn load_node(
    path: &Path,
    rel_path: String,
    depth: usize,
    threshold: u64,
) -> (FileNode, Option<String>) {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let extension = path.extension().and_then(|e| e.to_str());

    if size >= threshold {
        let node = FileNode {
            rel_path,
            size,
            depth,
            disposition: Disposition::SkippedOversized,
            language: None,
            text: None,
        };
        return (node, None);
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let warning = format!("Failed to read '{}': {}", rel_path, e);
            let node = FileNode {
                rel_path,
                size,
                depth,
                disposition: Disposition::SkippedBinary,
                language: None,
                text: None,
            };
            return (node, Some(warning));
        }
    };

    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_BYTES)];
    let disposition = classify(size, extension, sample, threshold);
    if disposition != Disposition::Renderable {
        let node = FileNode {
            rel_path,
            size,
            depth,
            disposition,
            language: None,
            text: None,
        };
        return (node, None);
    }

    match decode_text(bytes) {
        Some(text) => {
            let node = FileNode {
                rel_path,
                size,
                depth,
                disposition: Disposition::Renderable,
                language: None,
                text: Some(text),
            };
            (node, None)
        }
        None => {
            let warning = format!("Undecodable content, treating as binary: {}", rel_path);
            let node = FileNode {
                rel_path,
                size,
                depth,
                disposition: Disposition::SkippedBinary,
                language: None,
                text: None,
            };
            (node, Some(warning))
        }
    }
}

fn normalize_rel_path(relative: &Path) -> String {
    let raw = relative.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        raw.into_owned()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed = pattern_str.trim().to_string();
        if processed.ends_with('/') && processed.len() > 1 {
            processed.push_str("**");
        }
        match Glob::new(&processed) {
            Ok(glob) => {
                log::trace!("Adding exclude pattern: {}", processed);
                builder.add(glob);
            }
            Err(e) => {
                return Err(AppError::Glob(format!(
                    "Invalid exclude pattern \"{}\": {}",
                    pattern_str, e
                )));
            }
        }
    }
    builder.build().map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan(root: &Path, config: &RenderConfig) -> ScanOutcome {
        scan_tree(root, config).expect("scan should succeed")
    }

    #[test]
    fn test_classify_size_boundary() {
        let threshold = 1024;
        assert_eq!(
            classify(1024, Some("txt"), b"hello", threshold),
            Disposition::SkippedOversized,
            "file exactly at the threshold is oversized"
        );
        assert_eq!(
            classify(1023, Some("txt"), b"hello", threshold),
            Disposition::Renderable,
            "one byte below the threshold is a renderable candidate"
        );
    }

    #[test]
    fn test_classify_oversized_wins_over_content() {
        // Size check happens before any content heuristic.
        assert_eq!(
            classify(10 << 20, Some("txt"), b"plain text", 1 << 20),
            Disposition::SkippedOversized
        );
    }

    #[test]
    fn test_classify_nul_byte_is_binary() {
        assert_eq!(
            classify(10, Some("dat"), b"ab\x00cd", 1024),
            Disposition::SkippedBinary
        );
    }

    #[test]
    fn test_classify_binary_extension() {
        assert_eq!(
            classify(10, Some("png"), b"not actually image data", 1024),
            Disposition::SkippedBinary
        );
        assert_eq!(
            classify(10, Some("PNG"), b"case insensitive", 1024),
            Disposition::SkippedBinary
        );
    }

    #[test]
    fn test_classify_control_byte_ratio() {
        let mostly_control: Vec<u8> = (0..100).map(|i| if i < 50 { 0x01 } else { b'a' }).collect();
        assert_eq!(
            classify(100, None, &mostly_control, 1024),
            Disposition::SkippedBinary
        );
        let mostly_text: Vec<u8> = (0..100).map(|i| if i < 5 { 0x01 } else { b'a' }).collect();
        assert_eq!(classify(100, None, &mostly_text, 1024), Disposition::Renderable);
    }

    #[test]
    fn test_classify_is_pure() {
        let sample = b"some sample bytes";
        let first = classify(17, Some("rs"), sample, 1024);
        for _ in 0..5 {
            assert_eq!(classify(17, Some("rs"), sample, 1024), first);
        }
    }

    #[test]
    fn test_scan_deterministic_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("zebra.txt"), "z").unwrap();
        fs::write(dir.path().join("alpha.txt"), "a").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();

        let config = RenderConfig::default();
        let first = scan(dir.path(), &config);
        let second = scan(dir.path(), &config);

        let paths: Vec<_> = first.nodes.iter().map(|n| n.rel_path.clone()).collect();
        assert_eq!(paths, vec!["alpha.txt", "src/main.rs", "zebra.txt"]);
        let paths_again: Vec<_> = second.nodes.iter().map(|n| n.rel_path.clone()).collect();
        assert_eq!(paths, paths_again, "two runs must enumerate identically");
    }

    #[test]
    fn test_scan_skips_git_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();

        let outcome = scan(dir.path(), &RenderConfig::default());
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.nodes[0].rel_path, "main.rs");
    }

    #[test]
    fn test_scan_exclude_globs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/out.txt"), "build junk").unwrap();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();
        fs::write(dir.path().join("notes.log"), "log").unwrap();

        let config = RenderConfig {
            exclude_globs: vec!["target/".to_string(), "*.log".to_string()],
            ..Default::default()
        };
        let outcome = scan(dir.path(), &config);
        let paths: Vec<_> = outcome.nodes.iter().map(|n| n.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["keep.txt"]);
    }

    #[test]
    fn test_scan_invalid_glob_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = RenderConfig {
            exclude_globs: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            scan_tree(dir.path(), &config),
            Err(AppError::Glob(_))
        ));
    }

    #[test]
    fn test_scan_missing_root_is_access_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(matches!(
            scan_tree(&missing, &RenderConfig::default()),
            Err(AppError::Access { .. })
        ));
    }

    #[test]
    fn test_scan_loads_renderable_text() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hello.py"), "print(1)\n").unwrap();

        let outcome = scan(dir.path(), &RenderConfig::default());
        let node = &outcome.nodes[0];
        assert_eq!(node.disposition, Disposition::Renderable);
        assert_eq!(node.text.as_deref(), Some("print(1)\n"));
    }

    #[test]
    fn test_scan_oversized_has_no_text() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(2048)).unwrap();

        let config = RenderConfig {
            size_threshold_bytes: 1024,
            ..Default::default()
        };
        let outcome = scan(dir.path(), &config);
        let node = &outcome.nodes[0];
        assert_eq!(node.disposition, Disposition::SkippedOversized);
        assert!(node.text.is_none());
    }

    #[test]
    fn test_scan_reclassifies_undecodable_file() {
        let dir = TempDir::new().unwrap();
        // No NUL bytes (so the sample heuristic passes) but nothing valid
        // as UTF-8 either: the lossy pass is all replacement characters.
        fs::write(dir.path().join("junk.txt"), vec![0xFF; 64]).unwrap();

        let outcome = scan(dir.path(), &RenderConfig::default());
        let node = &outcome.nodes[0];
        assert_eq!(node.disposition, Disposition::SkippedBinary);
        assert!(node.text.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_scan_lossy_decode_keeps_mostly_valid_text() {
        let dir = TempDir::new().unwrap();
        let mut bytes = b"mostly valid utf-8 text here".to_vec();
        bytes.push(0xFF);
        fs::write(dir.path().join("mixed.txt"), &bytes).unwrap();

        let outcome = scan(dir.path(), &RenderConfig::default());
        let node = &outcome.nodes[0];
        assert_eq!(node.disposition, Disposition::Renderable);
        assert!(node.text.as_deref().unwrap().contains("mostly valid"));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_unreadable_entry_degrades() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked.txt");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        fs::write(dir.path().join("open.txt"), "readable").unwrap();

        let outcome = scan(dir.path(), &RenderConfig::default());
        // Restore so TempDir cleanup works everywhere.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        // Root ran as non-root: the read fails and the file degrades.
        if !outcome.warnings.is_empty() {
            let node = outcome
                .nodes
                .iter()
                .find(|n| n.rel_path == "locked.txt")
                .unwrap();
            assert_eq!(node.disposition, Disposition::SkippedBinary);
        }
    }
}
