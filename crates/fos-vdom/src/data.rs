//! Data registry
//!
//! Values that cannot be written as attribute text (arrays, objects,
//! functions) are parked here and referenced by an opaque token of the form
//! `--<id>--`. Ids increase monotonically and are never reused. There is no
//! reference counting: whoever stops referencing a token frees it, and a
//! token referenced twice but freed once stays alive.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::Value;

const TOKEN_FENCE: &str = "--";

static EMBEDDED_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--(\d+)--").expect("token pattern"));

/// Opaque registry id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub u64);

impl DataId {
    /// Textual envelope written into attributes
    pub fn token(self) -> String {
        format!("{TOKEN_FENCE}{}{TOKEN_FENCE}", self.0)
    }

    /// Parse a complete `--<id>--` token
    pub fn parse_token(text: &str) -> Option<DataId> {
        let digits = text.strip_prefix(TOKEN_FENCE)?.strip_suffix(TOKEN_FENCE)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(DataId)
    }

    /// Every `--<id>--` token embedded anywhere in `text`
    pub fn scan_tokens(text: &str) -> Vec<DataId> {
        if !text.contains(TOKEN_FENCE) {
            return Vec::new();
        }
        EMBEDDED_TOKEN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse().ok().map(DataId))
            .collect()
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub created: u64,
    pub freed: u64,
    pub live: usize,
}

/// Id -> value table, one per runtime
#[derive(Debug, Default)]
pub struct DataRegistry {
    entries: HashMap<DataId, Value>,
    last_id: u64,
    created: u64,
    freed: u64,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under a fresh id
    pub fn insert(&mut self, value: Value) -> DataId {
        self.last_id += 1;
        let id = DataId(self.last_id);
        self.entries.insert(id, value);
        self.created += 1;
        tracing::trace!("Registered data {}", id);
        id
    }

    pub fn get(&self, id: DataId) -> Option<&Value> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: DataId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Release an entry. Freeing an unknown id is a no-op.
    pub fn free(&mut self, id: DataId) -> Option<Value> {
        let value = self.entries.remove(&id);
        if value.is_some() {
            self.freed += 1;
            tracing::trace!("Freed data {}", id);
        }
        value
    }

    /// Free `old` (when given) and store `value` under a fresh id
    pub fn replace(&mut self, old: Option<DataId>, value: Value) -> DataId {
        if let Some(old) = old {
            self.free(old);
        }
        self.insert(value)
    }

    /// Value behind a `--<id>--` token
    pub fn resolve_token(&self, text: &str) -> Option<&Value> {
        DataId::parse_token(text).and_then(|id| self.get(id))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            created: self.created,
            freed: self.freed,
            live: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        assert_eq!(DataId(42).token(), "--42--");
        assert_eq!(DataId::parse_token("--42--"), Some(DataId(42)));
        assert_eq!(DataId::parse_token("--x--"), None);
        assert_eq!(DataId::parse_token("----"), None);
        assert_eq!(DataId::parse_token("--42"), None);
        assert_eq!(DataId::parse_token("a--42--"), None);
    }

    #[test]
    fn test_scan_embedded_tokens() {
        assert_eq!(DataId::scan_tokens("ref:--3-- and --41--"), vec![DataId(3), DataId(41)]);
        assert_eq!(DataId::scan_tokens("--7----8--"), vec![DataId(7), DataId(8)]);
        assert!(DataId::scan_tokens("a -- b --x--").is_empty());
        assert!(DataId::scan_tokens("plain").is_empty());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = DataRegistry::new();
        let a = registry.insert(Value::from("a"));
        registry.free(a);
        let b = registry.insert(Value::from("b"));
        assert!(b > a);
        assert_eq!(registry.get(a), None);
    }

    #[test]
    fn test_replace_frees_old() {
        let mut registry = DataRegistry::new();
        let a = registry.insert(Value::Array(vec![]));
        let b = registry.replace(Some(a), Value::Array(vec![Value::Null]));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.stats(),
            RegistryStats { created: 2, freed: 1, live: 1 }
        );
    }

    #[test]
    fn test_double_free_is_noop() {
        let mut registry = DataRegistry::new();
        let a = registry.insert(Value::object());
        assert!(registry.free(a).is_some());
        assert!(registry.free(a).is_none());
        assert_eq!(registry.stats().freed, 1);
    }

    #[test]
    fn test_resolve_token() {
        let mut registry = DataRegistry::new();
        let id = registry.insert(Value::from(vec![Value::from(1)]));
        assert_eq!(
            registry.resolve_token(&id.token()).and_then(Value::len),
            Some(1)
        );
        assert!(registry.resolve_token("plain text").is_none());
    }
}
