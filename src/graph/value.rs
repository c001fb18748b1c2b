//! Attribute value types for graph nodes and edges
//!
//! Attributes are dynamically typed per entity: a tagged variant covering
//! scalars, sequences, and nested maps. The type carries a total order so
//! ordered secondary indexes and range filters work across value kinds.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A dynamically typed attribute value
///
/// Supports:
/// - Null
/// - Boolean
/// - Integer (i64)
/// - Float (f64)
/// - String
/// - List (Vec<AttrValue>)
/// - Map (BTreeMap<String, AttrValue>)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get list value if this is a list
    pub fn as_list(&self) -> Option<&Vec<AttrValue>> {
        match self {
            AttrValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get map value if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "Null",
            AttrValue::Bool(_) => "Bool",
            AttrValue::Int(_) => "Int",
            AttrValue::Float(_) => "Float",
            AttrValue::Str(_) => "Str",
            AttrValue::List(_) => "List",
            AttrValue::Map(_) => "Map",
        }
    }

    // Variant rank for cross-type ordering. Int and Float share a rank
    // so numeric values compare numerically regardless of representation.
    fn rank(&self) -> u8 {
        match self {
            AttrValue::Null => 0,
            AttrValue::Bool(_) => 1,
            AttrValue::Int(_) | AttrValue::Float(_) => 2,
            AttrValue::Str(_) => 3,
            AttrValue::List(_) => 4,
            AttrValue::Map(_) => 5,
        }
    }
}

impl Ord for AttrValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use AttrValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Str(a), Str(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.iter().cmp(b.iter()),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for AttrValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttrValue {}

impl std::hash::Hash for AttrValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use AttrValue::*;
        // Must agree with `Eq`: equal values hash equally. `Int(1)` and
        // `Float(1.0)` compare equal, so numbers share one tag and hash
        // through the same `f64` total-order bits.
        match self {
            Null => 0u8.hash(state),
            Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Int(i) => {
                2u8.hash(state);
                (*i as f64).to_bits().hash(state);
            }
            Float(f) => {
                2u8.hash(state);
                f.to_bits().hash(state);
            }
            Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            List(list) => {
                4u8.hash(state);
                list.hash(state);
            }
            Map(map) => {
                5u8.hash(state);
                map.hash(state);
            }
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(fl) => write!(f, "{}", fl),
            AttrValue::Str(s) => write!(f, "\"{}\"", s),
            AttrValue::List(list) => {
                write!(f, "[")?;
                for (i, val) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            AttrValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenience conversions
impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Int(i as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(list: Vec<AttrValue>) -> Self {
        AttrValue::List(list)
    }
}

impl From<BTreeMap<String, AttrValue>> for AttrValue {
    fn from(map: BTreeMap<String, AttrValue>) -> Self {
        AttrValue::Map(map)
    }
}

/// Attribute map for nodes and edges
///
/// A BTreeMap so iteration (and therefore every serialized encoding) is
/// deterministic.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Build an [`AttrMap`] from key/value pairs.
///
/// ```
/// use tantu::graph::attrs;
/// let m = attrs([("name", "Alice"), ("city", "Pune")]);
/// assert_eq!(m.get("name").and_then(|v| v.as_str()), Some("Alice"));
/// ```
pub fn attrs<I, K, V>(pairs: I) -> AttrMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(AttrValue::Str("test".to_string()).type_name(), "Str");
        assert_eq!(AttrValue::Int(42).type_name(), "Int");
        assert_eq!(AttrValue::Float(3.14).type_name(), "Float");
        assert_eq!(AttrValue::Bool(true).type_name(), "Bool");
        assert_eq!(AttrValue::List(vec![]).type_name(), "List");
        assert_eq!(AttrValue::Map(BTreeMap::new()).type_name(), "Map");
        assert_eq!(AttrValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_conversions() {
        let s: AttrValue = "hello".into();
        assert_eq!(s.as_str(), Some("hello"));

        let i: AttrValue = 42i64.into();
        assert_eq!(i.as_int(), Some(42));

        let f: AttrValue = 3.14.into();
        assert_eq!(f.as_float(), Some(3.14));

        let b: AttrValue = true.into();
        assert_eq!(b.as_bool(), Some(true));
    }

    #[test]
    fn test_numeric_equality_across_variants() {
        // Int and Float compare numerically, like the index sees them.
        assert_eq!(AttrValue::Int(1), AttrValue::Float(1.0));
        assert!(AttrValue::Int(1) < AttrValue::Float(1.5));
        assert!(AttrValue::Float(2.5) < AttrValue::Int(3));
    }

    #[test]
    fn test_cross_type_ordering_is_total() {
        let mut values = vec![
            AttrValue::Str("a".into()),
            AttrValue::Null,
            AttrValue::Int(5),
            AttrValue::Bool(true),
            AttrValue::Float(-1.0),
            AttrValue::List(vec![AttrValue::Int(1)]),
        ];
        values.sort();
        assert_eq!(values[0], AttrValue::Null);
        assert_eq!(values[1], AttrValue::Bool(true));
        assert_eq!(values[2], AttrValue::Float(-1.0));
        assert_eq!(values[3], AttrValue::Int(5));
        assert_eq!(values[4], AttrValue::Str("a".into()));
    }

    #[test]
    fn test_nan_ordering_is_stable() {
        let nan = AttrValue::Float(f64::NAN);
        assert_eq!(nan.cmp(&AttrValue::Float(f64::NAN)), Ordering::Equal);
        assert!(AttrValue::Float(f64::INFINITY) < nan);
    }

    #[test]
    fn test_attrs_helper() {
        let m = attrs([("age", AttrValue::Int(30)), ("active", AttrValue::Bool(true))]);
        assert_eq!(m.get("age").and_then(|v| v.as_int()), Some(30));
        assert_eq!(m.get("active").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_nested_values() {
        let list = AttrValue::List(vec![AttrValue::Int(1), AttrValue::Int(2)]);
        assert_eq!(list.as_list().unwrap().len(), 2);

        let mut inner = BTreeMap::new();
        inner.insert("key".to_string(), AttrValue::Str("value".to_string()));
        let map = AttrValue::Map(inner);
        assert!(map.as_map().unwrap().contains_key("key"));
    }
}
