//! Core types for spark-mount.
//!
//! These types flow through props, data, mocks, provides and app config.
//! Everything a component reads at render time is a [`Value`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

// =============================================================================
// Value
// =============================================================================

/// Ordered key → value map used for props, attrs, data and mocks.
pub type PropsMap = IndexMap<String, Value>;

/// A dynamic value.
///
/// Props bags are observed through signals, so values must be cheap to
/// compare: `PartialEq` decides whether a write triggers a re-render.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a key on a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Follow a dotted path (`"state.user.name"`) through nested maps.
    pub fn get_path<'a, I>(&self, segments: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        segments
            .into_iter()
            .try_fold(self, |current, segment| current.get(segment))
    }

    /// Text form used for attributes. `None` means "omit the attribute".
    pub fn to_attr(&self) -> Option<String> {
        match self {
            Value::Null | Value::Bool(false) => None,
            Value::Bool(true) => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    fn write_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Null => f.write_str("null"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    /// Interpolation form: `Null` renders as nothing, containers as JSON-like text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    item.write_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "\"{k}\":")?;
                    v.write_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Build a [`PropsMap`] from `key => value` pairs.
///
/// ```ignore
/// let props = props! { "msg" => "hello", "count" => 3 };
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::PropsMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::PropsMap::new();
        $(map.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        map
    }};
}

// =============================================================================
// Injection keys
// =============================================================================

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(0);

/// A unique key with a human-readable description.
///
/// Two symbols created with the same description are still distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: u64,
    description: String,
}

impl Symbol {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// Key for provide/inject. Either a plain name or a [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InjectionKey {
    Name(String),
    Symbol(Symbol),
}

impl From<&str> for InjectionKey {
    fn from(value: &str) -> Self {
        InjectionKey::Name(value.to_string())
    }
}

impl From<String> for InjectionKey {
    fn from(value: String) -> Self {
        InjectionKey::Name(value)
    }
}

impl From<Symbol> for InjectionKey {
    fn from(value: Symbol) -> Self {
        InjectionKey::Symbol(value)
    }
}

impl From<&Symbol> for InjectionKey {
    fn from(value: &Symbol) -> Self {
        InjectionKey::Symbol(value.clone())
    }
}

impl fmt::Display for InjectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionKey::Name(name) => f.write_str(name),
            InjectionKey::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(
            Value::from(vec![Value::from(1), Value::from("a")]).to_string(),
            "[1,\"a\"]"
        );
        assert_eq!(Value::map([("state", "foo")]).to_string(), "{\"state\":\"foo\"}");
    }

    #[test]
    fn test_get_path() {
        let store = Value::map([("state", Value::map([("count", 2)]))]);
        assert_eq!(store.get_path("state.count".split('.')), Some(&Value::Int(2)));
        assert_eq!(store.get_path("state.missing".split('.')), None);
    }

    #[test]
    fn test_attr_form() {
        assert_eq!(Value::Bool(true).to_attr(), Some(String::new()));
        assert_eq!(Value::Bool(false).to_attr(), None);
        assert_eq!(Value::Null.to_attr(), None);
        assert_eq!(Value::from(7).to_attr(), Some("7".to_string()));
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::new("store");
        let b = Symbol::new("store");
        assert_ne!(a, b);
        assert_eq!(InjectionKey::from(&a), InjectionKey::from(a.clone()));
        assert_ne!(InjectionKey::from(&a), InjectionKey::from("store"));
    }

    #[test]
    fn test_props_macro() {
        let map = crate::props! { "x" => 1, "y" => "two" };
        assert_eq!(map.get("x"), Some(&Value::Int(1)));
        assert_eq!(map.get("y"), Some(&Value::Str("two".into())));
        assert!(crate::props! {}.is_empty());
    }
}
