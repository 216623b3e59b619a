//! Template Scanner
//!
//! Regex-driven tokenizer over raw component markup. Produces tags, literal
//! text and mustache tokens in source order. `<style>` and `<script>`
//! contents are passed through as raw text.

use std::sync::LazyLock;

use fos_dom::serialize::is_raw_text_element;
use regex::Regex;

const TAG_NAME: &str = r"[A-Za-z][A-Za-z0-9:_-]*";
const ATTRIBUTES: &str = r#"(?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*"#;
const MUSTACHE: &str = r"\{\{\{\s*(?P<triple>.*?)\s*\}\}\}|\{\{\s*(?P<sigil>[#/^%+!]?)\s*(?P<body>.*?)\s*\}\}";

fn markup_pattern() -> String {
    format!(
        r"(?s)(?P<comment><!--.*?-->)|</\s*(?P<end>{tag})\s*>|<(?P<start>{tag})(?P<attrs>{attrs})\s*(?P<close>/?)>",
        tag = TAG_NAME,
        attrs = ATTRIBUTES,
    )
}

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{}|{}", markup_pattern(), MUSTACHE)).expect("markup pattern")
});

static MARKUP_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&markup_pattern()).expect("markup pattern"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).expect("attribute pattern")
});

static MUSTACHE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?s){}", MUSTACHE)).expect("mustache pattern"));

/// Mustache token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sigil {
    Escaped,
    Triple,
    Section,
    Inverted,
    End,
    Style,
    Register,
    Comment,
}

impl Sigil {
    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "#" => Sigil::Section,
            "^" => Sigil::Inverted,
            "/" => Sigil::End,
            "%" => Sigil::Style,
            "+" => Sigil::Register,
            "!" => Sigil::Comment,
            _ => Sigil::Escaped,
        }
    }
}

/// Raw attribute as scanned; `None` for boolean attributes
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAttr {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Text(String),
    RawText(String),
    StartTag { name: String, attrs: Vec<RawAttr>, self_closing: bool, offset: usize },
    EndTag { name: String, offset: usize },
    Mustache { sigil: Sigil, body: String, offset: usize },
}

/// Piece of an attribute value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Text(String),
    Mustache { sigil: Sigil, body: String, offset: usize },
}

/// Tokenize template markup
pub(crate) fn scan(src: &str) -> Vec<Token> {
    scan_with(src, &MARKUP)
}

/// Tokenize markup with no mustache syntax, used for unescaped values
pub(crate) fn scan_markup(src: &str) -> Vec<Token> {
    scan_with(src, &MARKUP_ONLY)
}

fn scan_with(src: &str, pattern: &Regex) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let Some(caps) = pattern.captures_at(src, pos) else {
            push_text(&mut tokens, &src[pos..]);
            break;
        };
        let Some(whole) = caps.get(0) else { break };
        push_text(&mut tokens, &src[pos..whole.start()]);
        pos = whole.end();
        let offset = whole.start();

        if caps.name("comment").is_some() {
            continue;
        }

        if let Some(end) = caps.name("end") {
            tokens.push(Token::EndTag { name: end.as_str().to_ascii_lowercase(), offset });
        } else if let Some(start) = caps.name("start") {
            let name = start.as_str().to_ascii_lowercase();
            let attrs = parse_attributes(caps.name("attrs").map_or("", |m| m.as_str()));
            let self_closing = caps.name("close").is_some_and(|m| !m.as_str().is_empty());
            tokens.push(Token::StartTag { name: name.clone(), attrs, self_closing, offset });

            if !self_closing && is_raw_text_element(&name) {
                match find_raw_end(src, pos, &name) {
                    Some((content_end, after)) => {
                        tokens.push(Token::RawText(src[pos..content_end].to_string()));
                        tokens.push(Token::EndTag { name, offset: content_end });
                        pos = after;
                    }
                    None => {
                        tokens.push(Token::RawText(src[pos..].to_string()));
                        pos = src.len();
                    }
                }
            }
        } else if let Some(triple) = caps.name("triple") {
            tokens.push(Token::Mustache {
                sigil: Sigil::Triple,
                body: triple.as_str().to_string(),
                offset,
            });
        } else if let Some(body) = caps.name("body") {
            let sigil = Sigil::from_prefix(caps.name("sigil").map_or("", |m| m.as_str()));
            tokens.push(Token::Mustache { sigil, body: body.as_str().to_string(), offset });
        }
    }

    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    let decoded = decode_entities(text);
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(&decoded);
    } else {
        tokens.push(Token::Text(decoded));
    }
}

/// Start and end offsets of `</name>` at or after `from`
fn find_raw_end(src: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    // ASCII lowercasing keeps byte offsets
    let haystack = src[from..].to_ascii_lowercase();
    let needle = format!("</{}", name);
    let start = haystack.find(&needle)?;
    let close = haystack[start..].find('>')?;
    Some((from + start, from + start + close + 1))
}

fn parse_attributes(text: &str) -> Vec<RawAttr> {
    ATTRIBUTE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string());
            Some(RawAttr { name, value })
        })
        .collect()
}

/// Split an attribute value into literal text and mustache tokens
pub(crate) fn scan_attribute_value(value: &str, base_offset: usize) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for caps in MUSTACHE_ONLY.captures_iter(value) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            pieces.push(Piece::Text(decode_entities(&value[last..whole.start()])));
        }
        last = whole.end();
        let offset = base_offset + whole.start();

        if let Some(triple) = caps.name("triple") {
            pieces.push(Piece::Mustache {
                sigil: Sigil::Triple,
                body: triple.as_str().to_string(),
                offset,
            });
        } else if let Some(body) = caps.name("body") {
            let sigil = Sigil::from_prefix(caps.name("sigil").map_or("", |m| m.as_str()));
            pieces.push(Piece::Mustache { sigil, body: body.as_str().to_string(), offset });
        }
    }

    if last < value.len() {
        pieces.push(Piece::Text(decode_entities(&value[last..])));
    }
    pieces
}

/// Decode the character references templates commonly use
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
