use anyhow::{Context, Result, bail};
use git2::build::RepoBuilder;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A source resolved to a local directory, ready to scan.
///
/// For git URLs the clone lives in a temp directory that is removed when
/// this value drops, so callers must keep it alive until the run finishes.
pub struct AcquiredSource {
    pub root: PathBuf,
    /// The source exactly as the user gave it, for display.
    pub display: String,
    /// Short name (directory or repository name) used for titles and
    /// default output paths.
    pub name: String,
    pub head_commit: Option<String>,
    _clone_dir: Option<TempDir>,
}

/// Resolve a CLI source argument: a git URL is shallow-cloned into a temp
/// directory, a local path is used in place.
pub fn acquire(source: &str) -> Result<AcquiredSource> {
    if looks_like_git_url(source) {
        clone_shallow(source)
    } else {
        local_dir(source)
    }
}

fn looks_like_git_url(source: &str) -> bool {
    source.starts_with("http://")
        || source.starts_with("https://")
        || source.starts_with("git@")
        || source.starts_with("ssh://")
}

fn local_dir(source: &str) -> Result<AcquiredSource> {
    let path = Path::new(source);
    if !path.is_dir() {
        bail!("Source is not a directory: {}", source);
    }
    let root = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path {}", source))?;
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    let head_commit = head_commit_of(&root);
    Ok(AcquiredSource {
        root,
        display: source.to_string(),
        name,
        head_commit,
        _clone_dir: None,
    })
}

fn clone_shallow(url: &str) -> Result<AcquiredSource> {
    let clone_dir = TempDir::new().context("Failed to create temp directory for clone")?;
    log::info!("Cloning '{}' (depth 1) into {}...", url, clone_dir.path().display());

    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.depth(1);
    RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, clone_dir.path())
        .with_context(|| format!("Failed to clone {}", url))?;

    let root = clone_dir.path().to_path_buf();
    let head_commit = head_commit_of(&root);
    Ok(AcquiredSource {
        root,
        display: url.to_string(),
        name: repo_name_from_url(url),
        head_commit,
        _clone_dir: Some(clone_dir),
    })
}

/// Short HEAD commit id, when the directory is a git repository.
fn head_commit_of(root: &Path) -> Option<String> {
    let repo = git2::Repository::open(root).ok()?;
    let head = repo.head().ok()?.peel_to_commit().ok()?;
    let mut id = head.id().to_string();
    id.truncate(12);
    Some(id)
}

fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let last = last.rsplit(':').next().unwrap_or(last);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_git_url_detection() {
        assert!(looks_like_git_url("https://example.com/owner/repo.git"));
        assert!(looks_like_git_url("git@example.com:owner/repo.git"));
        assert!(!looks_like_git_url("./local/dir"));
        assert!(!looks_like_git_url("/abs/path"));
    }

    #[test]
    fn test_repo_name_from_url() {
        assert_eq!(repo_name_from_url("https://example.com/owner/repo.git"), "repo");
        assert_eq!(repo_name_from_url("https://example.com/owner/repo/"), "repo");
        assert_eq!(repo_name_from_url("git@example.com:owner/repo.git"), "repo");
    }

    #[test]
    fn test_acquire_local_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hi").unwrap();
        let acquired = acquire(dir.path().to_str().unwrap()).unwrap();
        assert!(acquired.root.is_dir());
        assert!(acquired.head_commit.is_none(), "plain dir has no HEAD");
    }

    #[test]
    fn test_acquire_missing_directory_fails() {
        assert!(acquire("/definitely/not/a/real/path").is_err());
    }
}
