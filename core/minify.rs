//! Per-language minification for the corpus path.
//!
//! The contract is conservative: only comments, blank lines and other
//! insignificant whitespace are eligible for removal. No identifier
//! renaming, no literal rewriting, nothing that could change what the
//! content means. Every transform is idempotent, and languages outside
//! the recognized set pass through untouched.

/// Minify `text` according to its lowercase language tag.
pub fn minify_text(text: &str, language: &str) -> String {
    match language {
        "python" => minify_python(text),
        "json" => minify_json(text),
        "javascript" => minify_javascript(text),
        "css" => minify_css(text),
        "html" => minify_html(text),
        other => {
            log::trace!("No minifier for language '{}', passing through", other);
            text.to_string()
        }
    }
}

/// JSON: reparse and reserialize compactly. Invalid JSON passes through.
fn minify_json(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|_| text.to_string()),
        Err(_) => text.to_string(),
    }
}

/// Python: strip `#` comments and blank lines, leaving indentation and
/// string literals (including docstrings) intact.
fn minify_python(text: &str) -> String {
    #[derive(PartialEq, Clone, Copy)]
    enum State {
        Code,
        Str(char),
        Triple(char),
    }

    let mut out = String::with_capacity(text.len());
    let mut line = String::new();
    // Lines that carry triple-quoted string content are emitted verbatim:
    // their whitespace is data.
    let mut line_protected = false;
    let mut state = State::Code;
    let mut chars = text.chars().peekable();

    let flush = |out: &mut String, line: &mut String, protected: bool| {
        if protected {
            out.push_str(line);
            out.push('\n');
        } else {
            let trimmed = line.trim_end();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push('\n');
            }
        }
        line.clear();
    };

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '#' => {
                    // Comment runs to end of line; the newline itself is
                    // handled below.
                    for next in chars.by_ref() {
                        if next == '\n' {
                            flush(&mut out, &mut line, line_protected);
                            line_protected = false;
                            break;
                        }
                    }
                }
                '\'' | '"' => {
                    line.push(c);
                    if chars.peek() == Some(&c) {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if lookahead.peek() == Some(&c) {
                            chars.next();
                            chars.next();
                            line.push(c);
                            line.push(c);
                            state = State::Triple(c);
                            line_protected = true;
                            continue;
                        }
                    }
                    state = State::Str(c);
                }
                '\n' => {
                    flush(&mut out, &mut line, line_protected);
                    line_protected = false;
                }
                _ => line.push(c),
            },
            State::Str(quote) => match c {
                '\\' => {
                    line.push(c);
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            // Explicit line continuation inside a string.
                            out.push_str(&line);
                            out.push('\n');
                            line.clear();
                        } else {
                            line.push(escaped);
                        }
                    }
                }
                '\n' => {
                    // Unterminated single-quoted string; emit as-is and
                    // resynchronize.
                    state = State::Code;
                    flush(&mut out, &mut line, true);
                    line_protected = false;
                }
                _ => {
                    line.push(c);
                    if c == quote {
                        state = State::Code;
                    }
                }
            },
            State::Triple(quote) => match c {
                '\\' => {
                    line.push(c);
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            out.push_str(&line);
                            out.push('\n');
                            line.clear();
                        } else {
                            line.push(escaped);
                        }
                    }
                }
                '\n' => {
                    out.push_str(&line);
                    out.push('\n');
                    line.clear();
                    line_protected = true;
                }
                _ => {
                    line.push(c);
                    if c == quote && line.ends_with(&quote.to_string().repeat(3)) {
                        state = State::Code;
                    }
                }
            },
        }
        if matches!(state, State::Triple(_)) {
            line_protected = true;
        }
    }
    if !line.is_empty() {
        flush(&mut out, &mut line, line_protected || matches!(state, State::Triple(_)));
    }
    out
}

/// CSS: drop `/* */` comments (replaced by a single space so adjacent
/// tokens never merge), trailing whitespace and blank lines. Strings are
/// left alone.
fn minify_css(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut line = String::new();
    let mut i = 0;

    let flush = |out: &mut String, line: &mut String| {
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            out.push_str(trimmed);
            out.push('\n');
        }
        line.clear();
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                line.push(' ');
            }
            '"' | '\'' => {
                line.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    line.push(sc);
                    i += 1;
                    if sc == '\\' && i < chars.len() {
                        line.push(chars[i]);
                        i += 1;
                    } else if sc == c || sc == '\n' {
                        break;
                    }
                }
                continue;
            }
            '\n' => {
                flush(&mut out, &mut line);
                i += 1;
            }
            _ => {
                line.push(c);
                i += 1;
            }
        }
    }
    flush(&mut out, &mut line);
    out
}

/// JavaScript: strip `//` and `/* */` comments and blank lines with a
/// lexer that understands strings, template literals (including `${}`
/// expressions) and regex literals. Template content is emitted verbatim.
fn minify_javascript(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut line = String::new();
    let mut line_protected = false;
    let mut prev_significant: Option<char> = None;
    let mut last_word = String::new();
    let mut prev_was_word = false;
    let mut i = 0;

    fn flush(out: &mut String, line: &mut String, protected: bool) {
        if protected {
            out.push_str(line);
            out.push('\n');
        } else {
            let trimmed = line.trim_end();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push('\n');
            }
        }
        line.clear();
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    if chars[i] == '\n' {
                        flush(&mut out, &mut line, line_protected);
                        line_protected = false;
                    }
                    i += 1;
                }
                line.push(' ');
            }
            '/' if regex_can_start(prev_significant, &last_word) => {
                match scan_regex(&chars, i) {
                    Some(end) => {
                        for &rc in &chars[i..end] {
                            line.push(rc);
                        }
                        prev_significant = Some('/');
                        last_word.clear();
                        i = end;
                    }
                    None => {
                        line.push(c);
                        prev_significant = Some(c);
                        last_word.clear();
                        i += 1;
                    }
                }
            }
            '\'' | '"' => {
                line.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    line.push(sc);
                    i += 1;
                    if sc == '\\' && i < chars.len() {
                        line.push(chars[i]);
                        i += 1;
                    } else if sc == c || sc == '\n' {
                        break;
                    }
                }
                prev_significant = Some(c);
                last_word.clear();
            }
            '`' => {
                i = copy_template(&chars, i, &mut line, &mut out, &mut line_protected);
                prev_significant = Some('`');
                last_word.clear();
            }
            '\n' => {
                flush(&mut out, &mut line, line_protected);
                line_protected = false;
                i += 1;
            }
            _ => {
                line.push(c);
                if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                    if !prev_was_word {
                        last_word.clear();
                    }
                    last_word.push(c);
                    prev_was_word = true;
                    prev_significant = Some(c);
                } else if c.is_whitespace() {
                    prev_was_word = false;
                } else {
                    last_word.clear();
                    prev_was_word = false;
                    prev_significant = Some(c);
                }
                i += 1;
            }
        }
    }
    if !line.is_empty() {
        flush(&mut out, &mut line, line_protected);
    }
    out
}

/// Whether a `/` in this position starts a regex literal rather than a
/// division. Heuristic on the previous significant token, as comment
/// strippers conventionally do.
fn regex_can_start(prev: Option<char>, last_word: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "case", "do",
        "else", "yield", "await",
    ];
    match prev {
        None => true,
        Some(c) if "([{,;=:!&|?+-*%^~<>".contains(c) => true,
        _ => KEYWORDS.contains(&last_word),
    }
}

/// Scan a regex literal starting at `start` (a `/`). Returns the index
/// one past the closing slash and flags, or None if no closing slash is
/// found on the same line (then it was a division after all).
fn scan_regex(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => in_class = true,
            ']' => in_class = false,
            '\n' => return None,
            '/' if !in_class => {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Copy a template literal verbatim, descending into `${}` expressions so
/// a `}` or backtick inside nested strings cannot end it early. Newlines
/// inside the template mark the surrounding lines as protected.
fn copy_template(
    chars: &[char],
    start: usize,
    line: &mut String,
    out: &mut String,
    line_protected: &mut bool,
) -> usize {
    let mut i = start;
    line.push(chars[i]); // opening backtick
    i += 1;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                line.push(c);
                i += 1;
                if i < chars.len() {
                    line.push(chars[i]);
                    i += 1;
                }
            }
            '`' => {
                line.push(c);
                return i + 1;
            }
            '\n' => {
                *line_protected = true;
                out.push_str(line);
                out.push('\n');
                line.clear();
                i += 1;
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                line.push('$');
                line.push('{');
                i += 2;
                i = copy_template_expr(chars, i, line, out, line_protected);
            }
            _ => {
                line.push(c);
                i += 1;
            }
        }
    }
    i
}

/// Copy the code inside `${...}` up to its matching close brace.
fn copy_template_expr(
    chars: &[char],
    start: usize,
    line: &mut String,
    out: &mut String,
    line_protected: &mut bool,
) -> usize {
    let mut i = start;
    let mut depth = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '}' if depth == 0 => {
                line.push(c);
                return i + 1;
            }
            '{' => {
                depth += 1;
                line.push(c);
                i += 1;
            }
            '}' => {
                depth -= 1;
                line.push(c);
                i += 1;
            }
            '\'' | '"' => {
                line.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    line.push(sc);
                    i += 1;
                    if sc == '\\' && i < chars.len() {
                        line.push(chars[i]);
                        i += 1;
                    } else if sc == c || sc == '\n' {
                        break;
                    }
                }
            }
            '`' => {
                i = copy_template(chars, i, line, out, line_protected);
            }
            '\n' => {
                *line_protected = true;
                out.push_str(line);
                out.push('\n');
                line.clear();
                i += 1;
            }
            _ => {
                line.push(c);
                i += 1;
            }
        }
    }
    i
}

/// HTML: remove `<!-- -->` comments only. Lines that held nothing but a
/// comment disappear; pre-existing blank lines are kept because inside
/// `<pre>` they are content.
fn minify_html(text: &str) -> String {
    #[derive(PartialEq, Clone, Copy)]
    enum State {
        Data,
        Tag(Option<char>),
        Comment,
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut line = String::new();
    let mut line_had_comment = false;
    let mut state = State::Data;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Data => {
                if c == '<'
                    && chars.get(i + 1) == Some(&'!')
                    && chars.get(i + 2) == Some(&'-')
                    && chars.get(i + 3) == Some(&'-')
                {
                    state = State::Comment;
                    line_had_comment = true;
                    i += 4;
                    continue;
                }
                if c == '<' {
                    state = State::Tag(None);
                }
                if c == '\n' {
                    flush_html_line(&mut out, &mut line, line_had_comment);
                    line_had_comment = false;
                } else {
                    line.push(c);
                }
                i += 1;
            }
            State::Tag(quote) => {
                match quote {
                    Some(q) if c == q => state = State::Tag(None),
                    Some(_) => {}
                    None if c == '"' || c == '\'' => state = State::Tag(Some(c)),
                    None if c == '>' => state = State::Data,
                    None => {}
                }
                if c == '\n' {
                    flush_html_line(&mut out, &mut line, line_had_comment);
                    line_had_comment = false;
                } else {
                    line.push(c);
                }
                i += 1;
            }
            State::Comment => {
                if c == '-' && chars.get(i + 1) == Some(&'-') && chars.get(i + 2) == Some(&'>') {
                    state = State::Data;
                    i += 3;
                    continue;
                }
                if c == '\n' {
                    flush_html_line(&mut out, &mut line, true);
                }
                i += 1;
            }
        }
    }
    // End of input: only a non-empty partial line is worth emitting.
    if line_had_comment {
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            out.push_str(trimmed);
            out.push('\n');
        }
    } else if !line.is_empty() {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn flush_html_line(out: &mut String, line: &mut String, had_comment: bool) {
    if had_comment {
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            out.push_str(trimmed);
            out.push('\n');
        }
    } else {
        out.push_str(line);
        out.push('\n');
    }
    line.clear();
}
