use crate::minify;
use crate::scan::FileNode;

const OPEN_CONTENT: &str = "<document_content>";
const CLOSE_CONTENT: &str = "</document_content>";

/// Serialize renderable nodes into the flat tagged corpus.
///
/// One block per renderable file, in node (scan) order:
///
/// ```text
/// <documents>
/// <document index="1">
/// <source>REL/PATH</source>
/// <document_content>
/// ...
/// </document_content>
/// </document>
/// </documents>
/// ```
///
/// Content is escaped so the closing delimiter can never occur literally
/// inside a block; `parse_corpus` inverts the escape exactly. Skipped
/// files produce no block at all.
pub fn build_corpus(nodes: &[FileNode], apply_minify: bool) -> String {
    let mut lines: Vec<String> = vec!["<documents>".to_string()];

    let mut index = 0usize;
    for node in nodes.iter().filter(|n| n.is_renderable()) {
        let Some(text) = node.text.as_deref() else {
            continue;
        };
        index += 1;
        let content = if apply_minify {
            match node.language.as_deref() {
                Some(lang) => minify::minify_text(text, lang),
                None => text.to_string(),
            }
        } else {
            text.to_string()
        };
        lines.push(format!("<document index=\"{}\">", index));
        lines.push(format!("<source>{}</source>", node.rel_path));
        lines.push(OPEN_CONTENT.to_string());
        lines.push(escape_content(&content));
        lines.push(CLOSE_CONTENT.to_string());
        lines.push("</document>".to_string());
    }

    lines.push("</documents>".to_string());
    log::debug!("Corpus assembled: {} blocks", index);
    lines.join("\n")
}

/// Make content safe to embed between the block delimiters.
///
/// Two ordered rewrites: `<\` doubles its backslash, then the literal
/// closing tag gets one. `unescape_content` applies the inverse rewrites
/// in reverse order, so the transform is exactly invertible.
pub fn escape_content(content: &str) -> String {
    content
        .replace("<\\", "<\\\\")
        .replace(CLOSE_CONTENT, "<\\/document_content>")
}

/// Inverse of `escape_content`.
pub fn unescape_content(content: &str) -> String {
    content
        .replace("<\\/document_content>", CLOSE_CONTENT)
        .replace("<\\\\", "<\\")
}

/// Reconstruct `(path, content)` pairs from a corpus document.
///
/// Concatenating the returned contents reproduces the rendered file set
/// exactly (minus any minification applied at build time).
pub fn parse_corpus(corpus: &str) -> Vec<(String, String)> {
    let mut blocks = Vec::new();
    let source_to_content = "</source>\n<document_content>\n";
    let mut rest = corpus;

    while let Some(start) = rest.find("<source>") {
        let after_source = &rest[start + "<source>".len()..];
        let Some(path_end) = after_source.find(source_to_content) else {
            break;
        };
        let path = &after_source[..path_end];
        let content_area = &after_source[path_end + source_to_content.len()..];
        // Escaping guarantees the first closing tag at a line start is the
        // real delimiter, not file content.
        let Some(content_end) = content_area.find("\n</document_content>") else {
            break;
        };
        let content = &content_area[..content_end];
        blocks.push((path.to_string(), unescape_content(content)));
        rest = &content_area[content_end..];
    }
    blocks
}
