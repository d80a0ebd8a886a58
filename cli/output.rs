use anyhow::{Context, Result};
use colored::*;
use repoflat_core::{RunStats, bytes_human};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default output location: a temp path derived from the source name, the
/// way throwaway flattening runs expect. `.html` for the full document,
/// `.txt` for a corpus-only run.
pub fn default_output_path(source_name: &str, llm_only: bool) -> PathBuf {
    let extension = if llm_only { "txt" } else { "html" };
    std::env::temp_dir().join(format!("{}.{}", source_name, extension))
}

pub fn write_document(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn print_summary(path: &Path, content_len: usize, stats: &RunStats, quiet: bool) {
    for warning in &stats.warnings {
        log::warn!("{}", warning);
    }
    if quiet {
        return;
    }
    println!(
        "{} Wrote {} ({}) to: {}",
        "\u{2705}".green(),
        format!("{} rendered of {} files", stats.rendered, stats.total_files).cyan(),
        bytes_human(content_len as u64),
        path.display().to_string().blue()
    );
    let skipped = stats.skipped_binary + stats.skipped_oversized;
    if skipped > 0 {
        println!(
            "   Skipped: {} binary, {} oversized",
            stats.skipped_binary.to_string().yellow(),
            stats.skipped_oversized.to_string().yellow()
        );
    }
    if stats.degraded > 0 {
        println!(
            "   {} file(s) fell back to plain text rendering",
            stats.degraded.to_string().yellow()
        );
    }
}

/// Open the document in the default browser. Failure is logged, never fatal.
pub fn open_in_browser(path: &Path) {
    match webbrowser::open(&path.display().to_string()) {
        Ok(_) => log::debug!("Opened {} in browser", path.display()),
        Err(e) => log::warn!("Could not open browser for {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path_extension() {
        let html = default_output_path("proj", false);
        let txt = default_output_path("proj", true);
        assert!(html.to_string_lossy().ends_with("proj.html"));
        assert!(txt.to_string_lossy().ends_with("proj.txt"));
    }

    #[test]
    fn test_write_document_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/out.html");
        write_document(&path, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
