pub mod config;
pub mod corpus;
pub mod error;
pub mod html;
pub mod minify;
pub mod render;
pub mod scan;
pub mod tree;

pub use config::{DEFAULT_SIZE_THRESHOLD, RenderConfig};
pub use corpus::{build_corpus, parse_corpus};
pub use error::{AppError, Result};
pub use html::{PageInfo, build_page, bytes_human};
pub use render::{RenderKind, RenderedSection, build_sections, resolve_kind};
pub use scan::{Disposition, FileNode, ScanOutcome, scan_tree};
pub use tree::{DirectoryNode, ascii_tree, build_tree};

use std::path::Path;

/// The two documents a run produces, plus counters for reporting.
#[derive(Debug)]
pub struct RenderOutput {
    /// The interactive document. None when the run is corpus-only.
    pub human: Option<String>,
    /// The flat tagged corpus.
    pub corpus: String,
    pub stats: RunStats,
}

/// Counters surfaced to the caller after a run.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub total_files: usize,
    pub rendered: usize,
    pub skipped_binary: usize,
    pub skipped_oversized: usize,
    /// Sections that fell back to plain text after a highlighting failure.
    pub degraded: usize,
    /// Per-file problems that did not abort the run.
    pub warnings: Vec<String>,
}

/// Flatten the tree rooted at `root` into both output documents.
///
/// A single filesystem pass feeds every downstream stage; nothing below
/// this touches the disk again. Fails only when the root itself is
/// unreadable or an output invariant cannot be met; per-file problems
/// degrade into warnings.
pub fn render(root: &Path, info: &PageInfo, config: &RenderConfig) -> Result<RenderOutput> {
    log::info!("Flattening '{}'...", root.display());
    let ScanOutcome { mut nodes, warnings } = scan::scan_tree(root, config)?;
    render::resolve_languages(&mut nodes);

    let corpus = corpus::build_corpus(&nodes, config.minify);

    let mut stats = RunStats {
        total_files: nodes.len(),
        skipped_binary: count(&nodes, Disposition::SkippedBinary),
        skipped_oversized: count(&nodes, Disposition::SkippedOversized),
        warnings,
        ..RunStats::default()
    };

    let human = if config.llm_only {
        stats.rendered = nodes.iter().filter(|n| n.is_renderable()).count();
        None
    } else {
        let sections = build_sections(&nodes);
        stats.rendered = sections.len();
        stats.degraded = sections.iter().filter(|s| s.degraded).count();
        let tree_root = build_tree(&info.title, &nodes);
        Some(build_page(info, &tree_root, &nodes, &sections, &corpus))
    };

    log::info!(
        "Done: {} files, {} rendered, {} skipped",
        stats.total_files,
        stats.rendered,
        stats.skipped_binary + stats.skipped_oversized
    );
    Ok(RenderOutput { human, corpus, stats })
}

fn count(nodes: &[FileNode], disposition: Disposition) -> usize {
    nodes.iter().filter(|n| n.disposition == disposition).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn info(title: &str) -> PageInfo {
        PageInfo {
            title: title.to_string(),
            source: format!("/tmp/{}", title),
            head_commit: None,
        }
    }

    /// A small mixed tree: markdown, code and an oversized binary.
    fn mixed_tree(threshold: u64) -> (TempDir, RenderConfig) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "# Hi\n").unwrap();
        fs::write(dir.path().join("a.py"), "print(1)\n").unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; threshold as usize * 2]).unwrap();
        let config = RenderConfig {
            size_threshold_bytes: threshold,
            ..RenderConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_render_mixed_tree() {
        let (dir, config) = mixed_tree(1024);
        let output = render(dir.path(), &info("proj"), &config).unwrap();

        assert_eq!(output.stats.total_files, 3);
        assert_eq!(output.stats.rendered, 2);
        assert_eq!(output.stats.skipped_oversized, 1);

        let blocks = parse_corpus(&output.corpus);
        assert_eq!(blocks.len(), 2, "exactly the two renderable files");
        assert_eq!(blocks[0].0, "README.md");
        assert_eq!(blocks[0].1, "# Hi\n");
        assert_eq!(blocks[1].0, "a.py");
        assert_eq!(blocks[1].1, "print(1)\n");

        let page = output.human.unwrap();
        assert!(page.contains("id=\"file-README-md\""));
        assert!(page.contains("id=\"file-a-py\""));
        assert!(page.contains("big.bin [skipped: oversized]"));
        assert!(!page.contains("id=\"file-big-bin\""));
    }

    #[test]
    fn test_llm_only_skips_human_document() {
        let (dir, config) = mixed_tree(1024);
        let config = RenderConfig { llm_only: true, ..config };
        let output = render(dir.path(), &info("proj"), &config).unwrap();

        assert!(output.human.is_none());
        assert_eq!(output.stats.rendered, 2);
        assert_eq!(parse_corpus(&output.corpus).len(), 2);
    }

    #[test]
    fn test_minified_run_strips_python_comments() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def f():\n    # comment\n    return 1\n").unwrap();
        let config = RenderConfig { minify: true, ..RenderConfig::default() };
        let output = render(dir.path(), &info("proj"), &config).unwrap();

        let blocks = parse_corpus(&output.corpus);
        assert_eq!(blocks[0].1, "def f():\n    return 1\n");
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = render(&missing, &info("x"), &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Access { .. }));
    }

    #[test]
    fn test_corpus_identical_between_modes() {
        let (dir, config) = mixed_tree(1024);
        let both = render(dir.path(), &info("proj"), &config).unwrap();
        let llm_only = render(
            dir.path(),
            &info("proj"),
            &RenderConfig { llm_only: true, ..config },
        )
        .unwrap();
        assert_eq!(both.corpus, llm_only.corpus);
    }
}
