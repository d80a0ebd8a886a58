use crate::render::{RenderedSection, assign_anchors, escape_html};
use crate::scan::{Disposition, FileNode};
use crate::tree::{DirectoryNode, ascii_tree};
use byte_unit::{Byte, UnitType};
use chrono::Utc;
use std::collections::HashMap;

const STYLE_CSS: &str = include_str!("assets/style.css");
const VIEW_JS: &str = include_str!("assets/view.js");

/// Run metadata shown in the document header.
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    /// Display name of the flattened root (directory name or repo URL).
    pub title: String,
    /// The source as the user gave it, linked when it looks like a URL.
    pub source: String,
    /// Short HEAD commit id, when the source was a git repository.
    pub head_commit: Option<String>,
}

/// Human-readable byte count ("48.83 KiB" style).
pub fn bytes_human(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Assemble the self-contained interactive document.
///
/// The page embeds everything it needs: styles, the view-toggle script,
/// every rendered section and the full corpus inside a hidden textarea.
/// No external fetches at view time.
pub fn build_page(
    info: &PageInfo,
    tree_root: &DirectoryNode,
    nodes: &[FileNode],
    sections: &[RenderedSection],
    corpus: &str,
) -> String {
    let skipped_binary: Vec<&FileNode> = nodes
        .iter()
        .filter(|n| n.disposition == Disposition::SkippedBinary)
        .collect();
    let skipped_oversized: Vec<&FileNode> = nodes
        .iter()
        .filter(|n| n.disposition == Disposition::SkippedOversized)
        .collect();
    let generated_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    log::debug!(
        "Assembling document: {} sections, {} skipped binary, {} skipped oversized",
        sections.len(),
        skipped_binary.len(),
        skipped_oversized.len()
    );

    let mut page = String::with_capacity(corpus.len() * 2);
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\" />\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    page.push_str(&format!(
        "<title>Flattened source \u{2013} {}</title>\n",
        escape_html(&info.title)
    ));
    page.push_str("<style>\n");
    page.push_str(STYLE_CSS);
    page.push_str("</style>\n</head>\n<body>\n<a id=\"top\"></a>\n\n");

    page.push_str("<div class=\"page\">\n");
    page.push_str(&sidebar(tree_root, nodes, sections));
    page.push_str("<main class=\"container\">\n");
    page.push_str(&header(info, nodes, sections, &generated_at.to_string()));

    page.push_str(
        "<div class=\"view-toggle\">\n  <strong>View:</strong>\n  \
         <button class=\"toggle-btn active\" onclick=\"showHumanView()\">\u{1f464} Human</button>\n  \
         <button class=\"toggle-btn\" onclick=\"showLLMView()\">\u{1f916} LLM</button>\n</div>\n",
    );

    page.push_str("<div id=\"human-view\">\n");
    page.push_str(&tree_section(tree_root, nodes));
    page.push_str(&skipped_section(&skipped_binary, &skipped_oversized));
    for section in sections {
        page.push_str(&file_section(section));
    }
    page.push_str("</div>\n");

    page.push_str(&llm_view(corpus));
    page.push_str("</main>\n</div>\n\n<script>\n");
    page.push_str(VIEW_JS);
    page.push_str("</script>\n</body>\n</html>\n");
    page
}

fn header(
    info: &PageInfo,
    nodes: &[FileNode],
    sections: &[RenderedSection],
    generated_at: &str,
) -> String {
    let source_html = if info.source.starts_with("http://") || info.source.starts_with("https://") {
        format!(
            "<a href=\"{0}\">{0}</a>",
            escape_html(&info.source)
        )
    } else {
        format!("<code>{}</code>", escape_html(&info.source))
    };
    let commit_html = match &info.head_commit {
        Some(commit) => format!(
            "<small><strong>HEAD commit:</strong> {}</small>\n",
            escape_html(commit)
        ),
        None => String::new(),
    };
    let skipped = nodes.len() - sections.len();
    format!(
        "<section>\n<div class=\"meta\">\n\
         <div><strong>Source:</strong> {}</div>\n{}\
         <small><strong>Generated:</strong> {}</small>\n\
         <div class=\"counts\">\n\
         <strong>Total files:</strong> {} \u{00b7} <strong>Rendered:</strong> {} \u{00b7} <strong>Skipped:</strong> {}\n\
         </div>\n</div>\n</section>\n",
        source_html,
        commit_html,
        generated_at,
        nodes.len(),
        sections.len(),
        skipped
    )
}

/// Sidebar navigation: the directory tree as a nested list. Renderable
/// files link to their section anchors; skipped files appear muted with
/// no link, which also keeps referential integrity trivial to check.
fn sidebar(tree_root: &DirectoryNode, nodes: &[FileNode], sections: &[RenderedSection]) -> String {
    let anchors = assign_anchors(nodes);
    let mut items = String::new();
    items.push_str("<li><a href=\"#top\">\u{2191} Back to top</a></li>\n");
    items.push_str(&tree_list_items(tree_root, nodes, &anchors));
    format!(
        "<nav id=\"sidebar\"><div class=\"sidebar-inner\">\n\
         <h2>Table of contents ({})</h2>\n\
         <ul class=\"toc toc-sidebar\">\n{}</ul>\n</div></nav>\n",
        sections.len(),
        items
    )
}

fn tree_list_items(
    dir: &DirectoryNode,
    nodes: &[FileNode],
    anchors: &HashMap<String, String>,
) -> String {
    let mut items = String::new();
    for child in &dir.dirs {
        items.push_str(&format!(
            "<li>{}/\n<ul class=\"toc\">\n{}</ul>\n</li>\n",
            escape_html(&child.name),
            tree_list_items(child, nodes, anchors)
        ));
    }
    for &index in &dir.files {
        let node = &nodes[index];
        let name = node.rel_path.rsplit('/').next().unwrap_or(&node.rel_path);
        match anchors.get(&node.rel_path) {
            Some(anchor) if node.is_renderable() => {
                items.push_str(&format!(
                    "<li><a href=\"#file-{}\">{}</a> <span class=\"muted\">({})</span></li>\n",
                    anchor,
                    escape_html(name),
                    bytes_human(node.size)
                ));
            }
            _ => {
                items.push_str(&format!(
                    "<li><span class=\"muted\">{} (skipped)</span></li>\n",
                    escape_html(name)
                ));
            }
        }
    }
    items
}

fn tree_section(tree_root: &DirectoryNode, nodes: &[FileNode]) -> String {
    let tree_text = ascii_tree(tree_root, nodes);
    format!(
        "<section>\n<h2>Directory tree</h2>\n<details>\n\
         <summary>Click to expand/collapse</summary>\n\
         <pre>{}</pre>\n</details>\n</section>\n",
        escape_html(&tree_text)
    )
}

fn skipped_section(skipped_binary: &[&FileNode], skipped_oversized: &[&FileNode]) -> String {
    let binaries = skip_list("Skipped binaries", skipped_binary);
    let oversized = skip_list("Skipped large files", skipped_oversized);
    let body = if binaries.is_empty() && oversized.is_empty() {
        "No skipped items.".to_string()
    } else {
        format!("{}{}", binaries, oversized)
    };
    format!(
        "<section>\n<h2>Skipped items</h2>\n{}\n</section>\n",
        body
    )
}

fn skip_list(title: &str, items: &[&FileNode]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let lis: Vec<String> = items
        .iter()
        .map(|node| {
            format!(
                "<li><code>{}</code> <span class=\"muted\">({})</span></li>",
                escape_html(&node.rel_path),
                bytes_human(node.size)
            )
        })
        .collect();
    format!(
        "<details open><summary>{} ({})</summary><ul class=\"skip-list\">\n{}\n</ul></details>",
        escape_html(title),
        items.len(),
        lis.join("\n")
    )
}

fn file_section(section: &RenderedSection) -> String {
    let degraded_note = if section.degraded {
        " <span class=\"degraded\">(highlighting unavailable, shown as plain text)</span>"
    } else {
        ""
    };
    format!(
        "\n<section class=\"file-section\" id=\"file-{}\">\n\
         <h2>{} <span class=\"muted\">({})</span>{}</h2>\n\
         <div class=\"file-body\">{}</div>\n\
         <div class=\"back-top\"><a href=\"#top\">\u{2191} Back to top</a></div>\n\
         </section>\n",
        section.anchor,
        escape_html(&section.title),
        bytes_human(section.size),
        degraded_note,
        section.html
    )
}

fn llm_view(corpus: &str) -> String {
    format!(
        "<div id=\"llm-view\">\n<section>\n\
         <h2>\u{1f916} LLM View</h2>\n\
         <p>Copy the text below and paste it to an LLM for analysis:</p>\n\
         <textarea id=\"llm-text\" readonly>{}</textarea>\n\
         <div class=\"copy-hint\">\n\
         \u{1f4a1} <strong>Tip:</strong> Click in the text area and press Ctrl+A (Cmd+A on Mac) to select all, then Ctrl+C (Cmd+C) to copy.\n\
         </div>\n</section>\n</div>\n",
        escape_html(corpus)
    )
}
