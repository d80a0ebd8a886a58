use crate::scan::{Disposition, FileNode};

/// Aggregate statistics for a directory subtree, computed bottom-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirStats {
    pub total_files: usize,
    pub total_bytes: u64,
    /// Line count summed over renderable files only.
    pub total_lines: usize,
}

/// A directory in the reconstructed hierarchy.
///
/// Built purely from `FileNode` paths, never from a second filesystem
/// walk. `files` holds indices into the scan's node vector so the tree
/// never clones file content.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub name: String,
    pub rel_path: String,
    pub dirs: Vec<DirectoryNode>,
    pub files: Vec<usize>,
    pub stats: DirStats,
}

impl DirectoryNode {
    fn new(name: String, rel_path: String) -> Self {
        DirectoryNode {
            name,
            rel_path,
            dirs: Vec::new(),
            files: Vec::new(),
            stats: DirStats::default(),
        }
    }
}

/// Build the directory hierarchy for a node set.
///
/// Children are kept sorted by name with directories ordered before files
/// at every level, so traversal order is stable across runs.
pub fn build_tree(root_name: &str, nodes: &[FileNode]) -> DirectoryNode {
    log::debug!("Building tree model from {} file paths...", nodes.len());
    let mut root = DirectoryNode::new(root_name.to_string(), String::new());
    for (index, node) in nodes.iter().enumerate() {
        insert_file(&mut root, &node.rel_path, index);
    }
    finalize(&mut root, nodes);
    root
}

fn insert_file(dir: &mut DirectoryNode, remaining: &str, index: usize) {
    match remaining.split_once('/') {
        None => dir.files.push(index),
        Some((head, rest)) => {
            let position = match dir.dirs.binary_search_by(|d| d.name.as_str().cmp(head)) {
                Ok(pos) => pos,
                Err(pos) => {
                    let rel_path = if dir.rel_path.is_empty() {
                        head.to_string()
                    } else {
                        format!("{}/{}", dir.rel_path, head)
                    };
                    dir.dirs.insert(pos, DirectoryNode::new(head.to_string(), rel_path));
                    pos
                }
            };
            insert_file(&mut dir.dirs[position], rest, index);
        }
    }
}

fn finalize(dir: &mut DirectoryNode, nodes: &[FileNode]) {
    dir.files
        .sort_by(|&a, &b| file_name(&nodes[a].rel_path).cmp(file_name(&nodes[b].rel_path)));

    let mut stats = DirStats::default();
    for child in &mut dir.dirs {
        finalize(child, nodes);
        stats.total_files += child.stats.total_files;
        stats.total_bytes += child.stats.total_bytes;
        stats.total_lines += child.stats.total_lines;
    }
    for &index in &dir.files {
        let node = &nodes[index];
        stats.total_files += 1;
        stats.total_bytes += node.size;
        if let Some(text) = &node.text {
            stats.total_lines += text.lines().count();
        }
    }
    dir.stats = stats;
}

fn file_name(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}

/// Render the hierarchy as an ASCII tree preamble. Skipped files carry a
/// short notation instead of appearing as content elsewhere.
pub fn ascii_tree(root: &DirectoryNode, nodes: &[FileNode]) -> String {
    let mut lines = vec![root.name.clone()];
    walk_ascii(root, nodes, "", &mut lines);
    lines.join("\n")
}

fn walk_ascii(dir: &DirectoryNode, nodes: &[FileNode], prefix: &str, lines: &mut Vec<String>) {
    let total = dir.dirs.len() + dir.files.len();
    let mut position = 0;

    for child in &dir.dirs {
        position += 1;
        let last = position == total;
        let branch = if last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, branch, child.name));
        let extension = if last { "    " } else { "│   " };
        walk_ascii(child, nodes, &format!("{}{}", prefix, extension), lines);
    }
    for &index in &dir.files {
        position += 1;
        let last = position == total;
        let branch = if last { "└── " } else { "├── " };
        let node = &nodes[index];
        let notation = match node.disposition {
            Disposition::Renderable => String::new(),
            Disposition::SkippedBinary => " [skipped: binary]".to_string(),
            Disposition::SkippedOversized => " [skipped: oversized]".to_string(),
        };
        lines.push(format!(
            "{}{}{}{}",
            prefix,
            branch,
            file_name(&node.rel_path),
            notation
        ));
    }
}
