use crate::scan::FileNode;
use once_cell::sync::Lazy;
use pulldown_cmark::{Options, Parser, html};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

static MARKDOWN_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["md", "markdown", "mdown", "mkd", "mkdn"].into_iter().collect());

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static THEME: Lazy<Theme> = Lazy::new(|| {
    let mut themes = ThemeSet::load_defaults();
    themes
        .themes
        .remove("InspiredGitHub")
        .unwrap_or_else(Theme::default)
});

/// Rendering strategy for one file, resolved exactly once per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderKind {
    Markdown,
    /// Syntax-highlighted code; the payload is a lowercase language tag
    /// ("python", "javascript", ...) shared with the minifier.
    Code(String),
    Plain,
}

impl RenderKind {
    pub fn language(&self) -> Option<&str> {
        match self {
            RenderKind::Code(lang) => Some(lang),
            RenderKind::Markdown => Some("markdown"),
            RenderKind::Plain => None,
        }
    }

    /// Stable label used in the human document ("markdown", "code:python",
    /// "plain").
    pub fn label(&self) -> String {
        match self {
            RenderKind::Markdown => "markdown".to_string(),
            RenderKind::Code(lang) => format!("code:{}", lang),
            RenderKind::Plain => "plain".to_string(),
        }
    }
}

/// One file's rendered contribution to the human document.
#[derive(Debug, Clone)]
pub struct RenderedSection {
    /// Unique, URL-safe anchor derived from the file path.
    pub anchor: String,
    pub title: String,
    pub kind: RenderKind,
    pub html: String,
    pub size: u64,
    /// True when highlighting failed and the section fell back to plain text.
    pub degraded: bool,
}

/// Resolve the rendering strategy for a file.
///
/// Keyed by case-insensitive extension; extensionless files are sniffed by
/// their first line (shebangs and the like). Anything unrecognized is
/// plain text.
pub fn resolve_kind(rel_path: &str, text: Option<&str>) -> RenderKind {
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let extension = file_name
        .rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext);

    if let Some(ext) = extension {
        if MARKDOWN_EXTENSIONS.contains(ext.as_str()) {
            return RenderKind::Markdown;
        }
        if let Some(syntax) = SYNTAX_SET.find_syntax_by_extension(&ext) {
            if syntax.name != "Plain Text" {
                return RenderKind::Code(syntax.name.to_ascii_lowercase());
            }
        }
        return RenderKind::Plain;
    }

    // No extension: sniff the first line for a shebang or mode line.
    if let Some(first_line) = text.and_then(|t| t.lines().next()) {
        if let Some(syntax) = SYNTAX_SET.find_syntax_by_first_line(first_line) {
            if syntax.name != "Plain Text" {
                return RenderKind::Code(syntax.name.to_ascii_lowercase());
            }
        }
    }
    RenderKind::Plain
}

/// Fill in the language tag on every renderable node. Dispatch happens
/// here once; assemblers and the minifier only consume the stored tag.
pub fn resolve_languages(nodes: &mut [FileNode]) {
    for node in nodes.iter_mut().filter(|n| n.is_renderable()) {
        let kind = resolve_kind(&node.rel_path, node.text.as_deref());
        node.language = kind.language().map(str::to_string);
        log::trace!("Dispatch {} -> {}", node.rel_path, kind.label());
    }
}

/// Derive a URL-safe slug from a path: alphanumerics, dashes and
/// underscores survive, everything else becomes a dash.
pub fn slugify(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// Assign a unique anchor per renderable node, in node order. Distinct
/// paths can slugify to the same string, so collisions get a numeric
/// suffix.
pub fn assign_anchors(nodes: &[FileNode]) -> HashMap<String, String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut anchors = HashMap::new();
    for node in nodes.iter().filter(|n| n.is_renderable()) {
        let base = slugify(&node.rel_path);
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        let anchor = if *count == 1 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        anchors.insert(node.rel_path.clone(), anchor);
    }
    anchors
}

/// Render every renderable node into an HTML section, in node order.
///
/// Per-file rendering is independent, so the work runs on rayon; the
/// output order is restored from the input order afterward.
pub fn build_sections(nodes: &[FileNode]) -> Vec<RenderedSection> {
    let anchors = assign_anchors(nodes);
    let mut sections: Vec<(usize, RenderedSection)> = nodes
        .par_iter()
        .enumerate()
        .filter(|(_, n)| n.is_renderable())
        .map(|(idx, node)| {
            let anchor = anchors
                .get(&node.rel_path)
                .cloned()
                .unwrap_or_else(|| slugify(&node.rel_path));
            (idx, render_section(node, anchor))
        })
        .collect();
    sections.sort_by_key(|(idx, _)| *idx);
    sections.into_iter().map(|(_, s)| s).collect()
}

fn render_section(node: &FileNode, anchor: String) -> RenderedSection {
    let text = node.text.as_deref().unwrap_or_default();
    let kind = resolve_kind(&node.rel_path, node.text.as_deref());
    let (body, degraded) = match &kind {
        RenderKind::Markdown => (render_markdown(text), false),
        RenderKind::Code(lang) => match highlight_code(text, lang) {
            Some(code_html) => (format!("<div class=\"highlight\">{}</div>", code_html), false),
            None => {
                log::warn!(
                    "Highlighting failed for '{}', falling back to plain text",
                    node.rel_path
                );
                (render_plain(text), true)
            }
        },
        RenderKind::Plain => (render_plain(text), false),
    };
    RenderedSection {
        anchor,
        title: node.rel_path.clone(),
        kind,
        html: body,
        size: node.size,
        degraded,
    }
}

fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, parser);
    format!("<div class=\"markdown-body\">{}</div>", out)
}

fn highlight_code(text: &str, language: &str) -> Option<String> {
    let syntax = SYNTAX_SET
        .find_syntax_by_token(language)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    syntect::html::highlighted_html_for_string(text, &SYNTAX_SET, syntax, &THEME).ok()
}

fn render_plain(text: &str) -> String {
    format!("<pre class=\"plain\">{}</pre>", escape_html(text))
}

/// Minimal HTML escaping for text interpolated into the document.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Disposition;

    fn node(rel_path: &str, text: &str) -> FileNode {
        FileNode {
            rel_path: rel_path.to_string(),
            size: text.len() as u64,
            depth: 1,
            disposition: Disposition::Renderable,
            language: None,
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn test_resolve_kind_markdown() {
        assert_eq!(resolve_kind("README.md", None), RenderKind::Markdown);
        assert_eq!(resolve_kind("notes.MARKDOWN", None), RenderKind::Markdown);
    }

    #[test]
    fn test_resolve_kind_code() {
        assert_eq!(
            resolve_kind("src/app.py", None),
            RenderKind::Code("python".to_string())
        );
        assert_eq!(
            resolve_kind("a/b/main.RS", None),
            RenderKind::Code("rust".to_string())
        );
    }

    #[test]
    fn test_resolve_kind_unknown_extension_is_plain() {
        assert_eq!(resolve_kind("data.qqqzzz", None), RenderKind::Plain);
    }

    #[test]
    fn test_resolve_kind_shebang_sniffing() {
        let kind = resolve_kind("scripts/deploy", Some("#!/usr/bin/env python\nprint(1)\n"));
        assert_eq!(kind, RenderKind::Code("python".to_string()));
    }

    #[test]
    fn test_resolve_kind_extensionless_without_shebang() {
        assert_eq!(resolve_kind("LICENSE", Some("MIT License\n")), RenderKind::Plain);
    }

    #[test]
    fn test_dotfile_is_not_treated_as_extension() {
        // ".gitignore" has no stem, so its "extension" must not dispatch.
        assert_eq!(resolve_kind(".gitignore", Some("target/\n")), RenderKind::Plain);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("src/main.rs"), "src-main-rs");
        assert_eq!(slugify("a_b-c.txt"), "a_b-c-txt");
    }

    #[test]
    fn test_assign_anchors_unique_on_collision() {
        let nodes = vec![node("a.b", "x"), node("a/b", "y"), node("a-b", "z")];
        let anchors = assign_anchors(&nodes);
        let mut values: Vec<_> = anchors.values().collect();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), 3, "colliding slugs must be disambiguated");
        assert_eq!(anchors["a.b"], "a-b");
        assert_eq!(anchors["a/b"], "a-b-2");
        assert_eq!(anchors["a-b"], "a-b-3");
    }

    #[test]
    fn test_build_sections_markdown_renders_html() {
        let nodes = vec![node("README.md", "# Hi\n\nSome *text*.\n")];
        let sections = build_sections(&nodes);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, RenderKind::Markdown);
        assert!(sections[0].html.contains("<h1>"));
        assert!(sections[0].html.contains("<em>text</em>"));
    }

    #[test]
    fn test_build_sections_code_is_highlighted() {
        let nodes = vec![node("a.py", "print(1)\n")];
        let sections = build_sections(&nodes);
        assert_eq!(sections[0].kind, RenderKind::Code("python".to_string()));
        assert!(!sections[0].degraded);
        assert!(sections[0].html.contains("highlight"));
    }

    #[test]
    fn test_build_sections_preserves_node_order() {
        let nodes = vec![node("a.py", "1"), node("b.py", "2"), node("c.py", "3")];
        let sections = build_sections(&nodes);
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn test_plain_rendering_escapes_content() {
        let nodes = vec![node("weird.qqqzzz", "<script>alert(1)</script>")];
        let sections = build_sections(&nodes);
        assert!(sections[0].html.contains("&lt;script&gt;"));
        assert!(!sections[0].html.contains("<script>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b&\"c\""), "a&lt;b&amp;&quot;c&quot;");
    }
}
