//! Inline style expressions
//!
//! `{{%a,b}}` turns style objects into a declaration string.

use fos_vdom::Value;

/// Properties whose bare numbers stay unitless
const UNITLESS_PROPERTIES: &[&str] = &[
    "opacity", "z-index", "flex", "flex-grow", "flex-shrink",
    "font-weight", "line-height", "order", "zoom",
];

/// Default unit when the scope provides no `styles.defaultUnit`
pub const DEFAULT_UNIT: &str = "px";

/// Render style values as `prop: value` declarations joined by `; `
pub fn style_declarations(values: &[Value], current: &Value, unit: &str) -> String {
    let mut declarations = Vec::new();

    for value in values {
        match value {
            Value::Object(map) => {
                for (key, entry) in map {
                    let property = kebab_case(key);
                    if let Some(text) = declaration_value(&property, entry, current, unit) {
                        declarations.push(format!("{}: {}", property, text));
                    }
                }
            }
            Value::Null | Value::Bool(false) => {}
            other => {
                let text = other.to_text();
                let text = text.trim().trim_end_matches(';').trim();
                if !text.is_empty() {
                    declarations.push(text.to_string());
                }
            }
        }
    }

    declarations.join("; ")
}

fn declaration_value(property: &str, value: &Value, current: &Value, unit: &str) -> Option<String> {
    match value {
        Value::Function(f) => match f(current) {
            Value::Function(_) => None,
            result => declaration_value(property, &result, current, unit),
        },
        Value::Null | Value::Bool(false) => None,
        Value::Number(_) if UNITLESS_PROPERTIES.contains(&property) => Some(value.to_text()),
        Value::Number(_) => Some(format!("{}{}", value.to_text(), unit)),
        Value::String(s) if s.is_empty() => None,
        other => Some(other.to_text()),
    }
}

/// `backgroundColor` -> `background-color`, `WebkitTransform` -> `-webkit-transform`
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
