//! Template Parser
//!
//! Builds the AST from scanner tokens. A single stack holds open elements
//! and open blocks so both kinds of nesting are validated together.

use fos_dom::serialize::is_void_element;

use crate::ast::{Attr, AttrPart, AttrSection, AttrTemplate, Element, Expr, ExprKind, Node, Path, Section};
use crate::scanner::{scan, scan_attribute_value, Piece, RawAttr, Sigil, Token};
use crate::ParseError;

enum Frame {
    Element { tag: String, attrs: Vec<Attr>, children: Vec<Node>, offset: usize },
    Section { path: Path, inverted: bool, children: Vec<Node>, offset: usize },
}

impl Frame {
    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::Element { children, .. } | Frame::Section { children, .. } => children,
        }
    }

    fn is_section(&self) -> bool {
        matches!(self, Frame::Section { .. })
    }

    /// Error reported when input ends with this frame still open
    fn unclosed(self) -> ParseError {
        match self {
            Frame::Element { tag, offset, .. } => ParseError::UnclosedTag { tag, offset },
            Frame::Section { path, offset, .. } => ParseError::UnterminatedBlock {
                path: path.as_str().to_string(),
                offset,
            },
        }
    }
}

/// Parse template markup into top-level nodes
pub(crate) fn parse(src: &str) -> Result<Vec<Node>, ParseError> {
    let mut top = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in scan(src) {
        match token {
            Token::Text(text) | Token::RawText(text) => {
                push(&mut stack, &mut top, Node::Text(text));
            }
            Token::StartTag { name, attrs, self_closing, offset } => {
                let attrs = compile_attributes(attrs, offset)?;
                if self_closing || is_void_element(&name) {
                    let element = Element { tag: name, attrs, children: Vec::new() };
                    push(&mut stack, &mut top, Node::Element(element));
                } else {
                    stack.push(Frame::Element { tag: name, attrs, children: Vec::new(), offset });
                }
            }
            Token::EndTag { name, offset } => {
                if is_void_element(&name) {
                    continue;
                }
                match stack.pop() {
                    Some(Frame::Element { tag, attrs, children, .. }) if tag == name => {
                        let element = Element { tag, attrs, children };
                        push(&mut stack, &mut top, Node::Element(element));
                    }
                    Some(Frame::Element { tag, .. }) => {
                        return Err(ParseError::MismatchedTag { expected: tag, found: name, offset });
                    }
                    Some(section) => return Err(section.unclosed()),
                    None => return Err(ParseError::UnexpectedClosingTag { tag: name, offset }),
                }
            }
            Token::Mustache { sigil, body, offset } => match sigil {
                Sigil::Comment => {}
                Sigil::Section | Sigil::Inverted => stack.push(Frame::Section {
                    path: Path::parse(&body),
                    inverted: sigil == Sigil::Inverted,
                    children: Vec::new(),
                    offset,
                }),
                Sigil::End => match stack.pop() {
                    Some(Frame::Section { path, inverted, children, .. }) => {
                        if path.as_str() != body {
                            return Err(ParseError::MismatchedBlock {
                                expected: path.as_str().to_string(),
                                found: body,
                                offset,
                            });
                        }
                        let section = Section { path, inverted, children };
                        push(&mut stack, &mut top, Node::Section(section));
                    }
                    Some(element) if stack.iter().any(Frame::is_section) => return Err(element.unclosed()),
                    _ => return Err(ParseError::UnexpectedBlockEnd { path: body, offset }),
                },
                _ => push(&mut stack, &mut top, Node::Expr(expression(sigil, &body))),
            },
        }
    }

    match stack.pop() {
        Some(frame) => Err(frame.unclosed()),
        None => Ok(top),
    }
}

fn push(stack: &mut [Frame], top: &mut Vec<Node>, node: Node) {
    // Indentation between tags is formatting, not content
    if let Node::Text(text) = &node {
        if text.contains('\n') && text.trim().is_empty() {
            return;
        }
    }
    match stack.last_mut() {
        Some(frame) => frame.children_mut().push(node),
        None => top.push(node),
    }
}

fn expression(sigil: Sigil, body: &str) -> Expr {
    let kind = match sigil {
        Sigil::Triple => ExprKind::Raw,
        Sigil::Style => ExprKind::Style,
        Sigil::Register => ExprKind::Register,
        _ => ExprKind::Escaped,
    };
    let paths = if kind == ExprKind::Style {
        body.split(',').map(Path::parse).collect()
    } else {
        vec![Path::parse(body)]
    };
    Expr { kind, paths }
}

fn compile_attributes(raw: Vec<RawAttr>, offset: usize) -> Result<Vec<Attr>, ParseError> {
    raw.into_iter()
        .map(|attr| -> Result<Attr, ParseError> {
            let value = match attr.value {
                None => AttrTemplate::Static(String::new()),
                Some(text) => compile_attribute_value(&text, offset)?,
            };
            Ok(Attr { name: attr.name, value })
        })
        .collect()
}

fn compile_attribute_value(text: &str, offset: usize) -> Result<AttrTemplate, ParseError> {
    let pieces = scan_attribute_value(text, offset);

    if let [Piece::Mustache { sigil, body, .. }] = pieces.as_slice() {
        if matches!(sigil, Sigil::Escaped | Sigil::Triple | Sigil::Register | Sigil::Style) {
            return Ok(AttrTemplate::Single(expression(*sigil, body)));
        }
    }

    if !pieces.iter().any(|p| matches!(p, Piece::Mustache { .. })) {
        let literal = pieces
            .into_iter()
            .map(|p| match p {
                Piece::Text(text) => text,
                Piece::Mustache { .. } => String::new(),
            })
            .collect();
        return Ok(AttrTemplate::Static(literal));
    }

    let mut top = Vec::new();
    let mut stack: Vec<(AttrSection, usize)> = Vec::new();

    for piece in pieces {
        let part = match piece {
            Piece::Text(text) => AttrPart::Text(text),
            Piece::Mustache { sigil, body, offset } => match sigil {
                Sigil::Comment => continue,
                Sigil::Section | Sigil::Inverted => {
                    let section = AttrSection {
                        path: Path::parse(&body),
                        inverted: sigil == Sigil::Inverted,
                        parts: Vec::new(),
                    };
                    stack.push((section, offset));
                    continue;
                }
                Sigil::End => {
                    let Some((section, _)) = stack.pop() else {
                        return Err(ParseError::UnexpectedBlockEnd { path: body, offset });
                    };
                    if section.path.as_str() != body {
                        return Err(ParseError::MismatchedBlock {
                            expected: section.path.as_str().to_string(),
                            found: body,
                            offset,
                        });
                    }
                    AttrPart::Section(section)
                }
                _ => AttrPart::Expr(expression(sigil, &body)),
            },
        };
        match stack.last_mut() {
            Some((section, _)) => section.parts.push(part),
            None => top.push(part),
        }
    }

    if let Some((section, offset)) = stack.pop() {
        return Err(ParseError::UnterminatedBlock {
            path: section.path.as_str().to_string(),
            offset,
        });
    }
    Ok(AttrTemplate::Mixed(top))
}
