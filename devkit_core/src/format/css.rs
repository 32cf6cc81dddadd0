// CSS minifier and pretty-printer. Stylesheets go through lightningcss; input
// it rejects falls back to a character scanner so minify never fails.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

// Indent unit of lightningcss's non-minified printer.
const PRINTER_INDENT: usize = 2;

fn print(source: &str, minify: bool) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

pub(crate) fn minify(input: &str) -> String {
    match print(input, true) {
        Some(code) => code,
        None => {
            tracing::debug!("stylesheet rejected by parser, scanning instead");
            scan_minify(input)
        }
    }
}

pub(crate) fn pretty(input: &str, indent: usize) -> String {
    match print(input, false) {
        Some(code) => reindent(&code, indent),
        None => {
            tracing::debug!("stylesheet rejected by parser, scanning instead");
            scan_pretty(&scan_minify(input), indent)
        }
    }
}

fn reindent(code: &str, indent: usize) -> String {
    code.lines()
        .map(|line| {
            let body = line.trim_start_matches(' ');
            let depth = (line.len() - body.len()) / PRINTER_INDENT;
            format!("{}{body}", " ".repeat(depth * indent))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

/// Whitespace is removed next to punctuation and collapsed to one space
/// elsewhere, which keeps descendant selectors and `calc()` operands intact.
fn scan_minify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut pending_space = false;
    while let Some(ch) = chars.next() {
        if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = ' ';
            for c in chars.by_ref() {
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            pending_space = true;
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            let after_punct = out.ends_with(|c| matches!(c, '{' | '}' | ';' | ':' | ',' | '>' | '('));
            if !out.is_empty() && !after_punct && !matches!(ch, '{' | '}' | ';' | ',' | '>' | ')') {
                out.push(' ');
            }
            pending_space = false;
        }
        if ch == '}' && out.ends_with(';') {
            out.pop();
        }
        out.push(ch);
        if ch == '"' || ch == '\'' {
            let mut escaped = false;
            for c in chars.by_ref() {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == ch {
                    break;
                }
            }
        }
    }
    out
}

/// Renders minified CSS: one declaration per line, blocks indented, a blank
/// line after each top-level block.
fn scan_pretty(minified: &str, indent: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut buf = String::new();
    let mut chars = minified.chars();
    while let Some(ch) = chars.next() {
        let pad = " ".repeat(depth * indent);
        match ch {
            '"' | '\'' => {
                buf.push(ch);
                let mut escaped = false;
                for c in chars.by_ref() {
                    buf.push(c);
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == ch {
                        break;
                    }
                }
            }
            '{' => {
                lines.push(format!("{pad}{} {{", buf.trim()));
                depth += 1;
                buf.clear();
            }
            ';' => {
                push_statement(&mut lines, &pad, buf.trim(), depth);
                buf.clear();
            }
            '}' => {
                push_statement(&mut lines, &pad, buf.trim(), depth);
                buf.clear();
                depth = depth.saturating_sub(1);
                lines.push(format!("{}}}", " ".repeat(depth * indent)));
                if depth == 0 {
                    lines.push(String::new());
                }
            }
            _ => buf.push(ch),
        }
    }
    let tail = buf.trim();
    if !tail.is_empty() {
        lines.push(format!("{}{tail}", " ".repeat(depth * indent)));
    }
    lines.join("\n").trim_end().to_string()
}

fn push_statement(lines: &mut Vec<String>, pad: &str, statement: &str, depth: usize) {
    if statement.is_empty() {
        return;
    }
    match statement.split_once(':') {
        Some((property, value)) if depth > 0 && !statement.starts_with('@') => {
            lines.push(format!("{pad}{}: {};", property.trim(), value.trim()));
        }
        _ => lines.push(format!("{pad}{statement};")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "/* base */\nbody , p {\n  margin : 0;\n  font: 12px \"Open  Sans\";\n}\n\n@media (max-width: 600px) {\n  a:hover > span { width: calc(100% - 2px) }\n}\n";

    #[test]
    fn minify_compacts_declarations() {
        assert_eq!(minify("a { color : red ; }"), "a{color:red}");
    }

    #[test]
    fn pretty_uses_requested_indent() {
        assert_eq!(pretty("a{color:red}", 4), "a {\n    color: red;\n}");
        assert_eq!(pretty("a { color : red ; }", 2), "a {\n  color: red;\n}");
    }

    #[test]
    fn pretty_reindents_nested_blocks() {
        let out = pretty("@media (max-width: 600px) { a { color: red } }", 3);
        assert!(out.contains("\n   a {\n      color: red;\n   }"), "{out}");
        assert!(!out.contains("/*"));
    }

    #[test]
    fn parsed_stylesheet_is_idempotent() {
        let once = pretty(SHEET, 4);
        assert_eq!(pretty(&once, 4), once);
        let small = minify(SHEET);
        assert_eq!(minify(&small), small);
        assert!(!small.contains("base"));
    }

    #[test]
    fn reindent_scales_each_level() {
        assert_eq!(reindent("a {\n  b {\n    c: d;\n  }\n}\n", 1), "a {\n b {\n  c: d;\n }\n}");
    }

    #[test]
    fn scan_minify_strips_comments_and_spacing() {
        assert_eq!(
            scan_minify(SHEET),
            "body,p{margin :0;font:12px \"Open  Sans\"}@media (max-width:600px){a:hover>span{width:calc(100% - 2px)}}"
        );
    }

    #[test]
    fn scan_pretty_prints_nested_blocks() {
        assert_eq!(
            scan_pretty(&scan_minify(SHEET), 2),
            "body,p {\n  margin: 0;\n  font: 12px \"Open  Sans\";\n}\n\n@media (max-width:600px) {\n  a:hover>span {\n    width: calc(100% - 2px);\n  }\n}"
        );
    }

    #[test]
    fn scanner_is_idempotent() {
        let once = scan_pretty(&scan_minify(SHEET), 4);
        assert_eq!(scan_pretty(&scan_minify(&once), 4), once);
        let small = scan_minify(SHEET);
        assert_eq!(scan_minify(&small), small);
    }

    #[test]
    fn scanner_keeps_top_level_statements() {
        assert_eq!(
            scan_pretty(&scan_minify("@import url(\"a.css\");\n@charset \"utf-8\";"), 2),
            "@import url(\"a.css\");\n@charset \"utf-8\";"
        );
    }
}
