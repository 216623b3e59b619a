//! Component CSS Scoping
//!
//! Rewrites a component stylesheet so its rules only apply inside the
//! component: selectors are prefixed with the tag name, `:host` becomes the
//! tag itself. Conditional group rules are scoped recursively, every other
//! at-rule is copied as written.

use crate::HOST_SELECTOR;

/// At-rules whose blocks contain ordinary style rules
const GROUP_AT_RULES: &[&str] = &["media", "supports", "container", "layer"];

/// Scope a whole stylesheet to `tag`
pub fn scope_stylesheet(css: &str, tag: &str) -> String {
    let css = strip_comments(css);
    scope_block(&css, tag).join("\n")
}

/// Scope a single selector to `tag`
pub fn scope_selector(selector: &str, tag: &str) -> String {
    let selector = selector.trim();
    if selector.is_empty() {
        return String::new();
    }
    if selector.contains(HOST_SELECTOR) {
        return replace_host(selector, tag);
    }
    if selector.starts_with('@') || is_keyframe_selector(selector) {
        return selector.to_string();
    }
    if starts_with_tag(selector, tag) {
        return selector.to_string();
    }
    format!("{} {}", tag, selector)
}

fn scope_block(css: &str, tag: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut rest = css;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let Some(open) = find_top_level(rest, |c| c == '{' || c == ';') else {
            tracing::warn!("Dropping unterminated CSS: {:?}", rest);
            break;
        };
        let prelude = rest[..open].trim();

        // Statement at-rules: @import, @layer a, b;
        if rest[open..].starts_with(';') {
            if !prelude.is_empty() {
                rules.push(format!("{};", prelude));
            }
            rest = &rest[open + 1..];
            continue;
        }

        let close = matching_brace(rest, open);
        let body = &rest[open + 1..close];
        rest = rest.get(close + 1..).unwrap_or("");

        if let Some(at_rule) = prelude.strip_prefix('@') {
            let name = at_rule
                .split(|c: char| c.is_whitespace() || c == '(')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if GROUP_AT_RULES.contains(&name.as_str()) {
                let inner = scope_block(body, tag);
                rules.push(format!("{} {{\n{}\n}}", prelude, inner.join("\n")));
            } else {
                rules.push(format!("{} {{{}}}", prelude, body));
            }
            continue;
        }

        let selectors = split_top_level(prelude, ',')
            .into_iter()
            .map(|s| scope_selector(s, tag))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let body = body.trim();
        if body.is_empty() {
            rules.push(format!("{} {{}}", selectors));
        } else {
            rules.push(format!("{} {{ {} }}", selectors, body));
        }
    }

    rules
}

/// Replace `:host`, `:host(X)` and `:host-context(X)` with the tag
fn replace_host(selector: &str, tag: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut rest = selector;

    while let Some(pos) = rest.find(HOST_SELECTOR) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + HOST_SELECTOR.len()..];
        if let Some(args) = after.strip_prefix("-context(") {
            let (inner, remaining) = split_parenthesized(args);
            out.push_str(inner.trim());
            out.push(' ');
            out.push_str(tag);
            rest = remaining;
        } else if let Some(args) = after.strip_prefix('(') {
            let (inner, remaining) = split_parenthesized(args);
            out.push_str(tag);
            out.push_str(inner.trim());
            rest = remaining;
        } else {
            out.push_str(tag);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Split at the `)` closing an already-opened parenthesis
fn split_parenthesized(s: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return (&s[..i], &s[i + 1..]),
            ')' => depth -= 1,
            _ => {}
        }
    }
    (s, "")
}

fn starts_with_tag(selector: &str, tag: &str) -> bool {
    selector.strip_prefix(tag).is_some_and(|rest| {
        !rest
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
    })
}

fn is_keyframe_selector(selector: &str) -> bool {
    selector == "from"
        || selector == "to"
        || selector
            .strip_suffix('%')
            .is_some_and(|n| n.trim().parse::<f64>().is_ok())
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Byte offset of the first char matching `pred` outside strings and parens
fn find_top_level(s: &str, pred: impl Fn(char) -> bool) -> Option<usize> {
    let mut quote = None;
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, c) if depth == 0 && pred(c) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Offset of the `}` closing the `{` at `open`, or the end of input
fn matching_brace(s: &str, open: usize) -> usize {
    let mut quote = None;
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return open + i;
                }
            }
            _ => {}
        }
    }
    s.len()
}

fn split_top_level(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(pos) = find_top_level(rest, |c| c == separator) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_selector() {
        assert_eq!(scope_selector(".name", "my-card"), "my-card .name");
        assert_eq!(scope_selector("my-card .name", "my-card"), "my-card .name");
        assert_eq!(scope_selector("my-cardish", "my-card"), "my-card my-cardish");
        assert_eq!(scope_selector("50%", "my-card"), "50%");
        assert_eq!(scope_selector("from", "my-card"), "from");
    }

    #[test]
    fn test_host_selector() {
        assert_eq!(scope_selector(":host", "my-card"), "my-card");
        assert_eq!(scope_selector(":host(.active)", "my-card"), "my-card.active");
        assert_eq!(scope_selector(":host > p", "my-card"), "my-card > p");
        assert_eq!(
            scope_selector(":host-context(.dark) p", "my-card"),
            ".dark my-card p"
        );
    }

    #[test]
    fn test_scope_stylesheet() {
        let css = "/* note */ .a, b { color: red; }\n:host { display: block; }";
        assert_eq!(
            scope_stylesheet(css, "x-y"),
            "x-y .a, x-y b { color: red; }\nx-y { display: block; }"
        );
    }

    #[test]
    fn test_group_rules_recurse() {
        let css = "@media (max-width: 600px) { .a { color: red; } }";
        assert_eq!(
            scope_stylesheet(css, "x-y"),
            "@media (max-width: 600px) {\nx-y .a { color: red; }\n}"
        );
    }

    #[test]
    fn test_keyframes_verbatim() {
        let css = "@keyframes spin { from { opacity: 0; } to { opacity: 1; } }";
        assert_eq!(scope_stylesheet(css, "x-y"), css);
    }

    #[test]
    fn test_attribute_values_with_braces() {
        let css = "[data-x=\"{,}\"] { color: red; }";
        assert_eq!(
            scope_stylesheet(css, "x-y"),
            "x-y [data-x=\"{,}\"] { color: red; }"
        );
    }
}
