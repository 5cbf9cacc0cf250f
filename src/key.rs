//! Key values returned by identity functions and passed to `find`.
//!
//! A key is either a single scalar or an ordered sequence of scalars
//! (a composite key). Integer conversions normalize to [`KeyPart::Int`]
//! whenever the value fits, so `1_i32` and `1_u64` compare equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One scalar component of a key.
///
/// # Examples
///
/// ```
/// use mockset::KeyPart;
///
/// assert_eq!(KeyPart::from(1_u8), KeyPart::from(1_i64));
/// assert_eq!(KeyPart::from("abc").as_str(), Some("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    /// Only used for values above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(String),
}

impl KeyPart {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Converts a scalar JSON value. Arrays and objects are not scalars.
    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_u64().map(Self::UInt))
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl Default for KeyPart {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! key_part_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for KeyPart {
            fn from(v: $t) -> Self {
                Self::Int(i64::from(v))
            }
        })*
    };
}

key_part_from_int!(i8, i16, i32, i64);
key_part_from_int!(u8, u16, u32);

impl From<u64> for KeyPart {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::UInt(v), Self::Int)
    }
}

impl From<usize> for KeyPart {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Self::UInt(v as u64), Self::Int)
    }
}

impl From<bool> for KeyPart {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for KeyPart {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for KeyPart {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for KeyPart {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<uuid::Uuid> for KeyPart {
    fn from(v: uuid::Uuid) -> Self {
        // Matches how serde renders a Uuid field, so convention-derived keys compare equal.
        Self::String(v.to_string())
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// The key of an entity: a scalar, or an ordered composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parts", rename_all = "snake_case")]
pub enum KeyValue {
    Scalar(KeyPart),
    Composite(Vec<KeyPart>),
}

impl KeyValue {
    /// Builds a composite key from its parts, in order.
    pub fn composite<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        Self::Composite(parts.into_iter().map(Into::into).collect())
    }

    /// Number of key columns.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Composite(parts) => parts.len(),
        }
    }

    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Compares against the values passed to a lookup, element-wise in order.
    ///
    /// The caller is responsible for checking arity first.
    pub(crate) fn matches(&self, key_values: &[KeyPart]) -> bool {
        match self {
            Self::Scalar(part) => key_values.first() == Some(part),
            Self::Composite(parts) => parts.as_slice() == key_values,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(part) => write!(f, "{part}"),
            Self::Composite(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

macro_rules! key_value_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for KeyValue {
            fn from(v: $t) -> Self {
                Self::Scalar(KeyPart::from(v))
            }
        })*
    };
}

key_value_from_scalar!(
    i8, i16, i32, i64, u8, u16, u32, u64, usize, bool, f64, String, &str, uuid::Uuid
);

impl From<KeyPart> for KeyValue {
    fn from(part: KeyPart) -> Self {
        Self::Scalar(part)
    }
}

impl<A: Into<KeyPart>, B: Into<KeyPart>> From<(A, B)> for KeyValue {
    fn from((a, b): (A, B)) -> Self {
        Self::Composite(vec![a.into(), b.into()])
    }
}

impl<A: Into<KeyPart>, B: Into<KeyPart>, C: Into<KeyPart>> From<(A, B, C)> for KeyValue {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self::Composite(vec![a.into(), b.into(), c.into()])
    }
}

impl From<Vec<KeyPart>> for KeyValue {
    fn from(parts: Vec<KeyPart>) -> Self {
        Self::Composite(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths_normalize() {
        assert_eq!(KeyPart::from(7_i32), KeyPart::Int(7));
        assert_eq!(KeyPart::from(7_u8), KeyPart::from(7_i64));
        assert_eq!(KeyPart::from(7_usize), KeyPart::Int(7));
        assert_eq!(KeyPart::from(u64::MAX), KeyPart::UInt(u64::MAX));
    }

    #[test]
    fn test_from_json_scalars() {
        let v = serde_json::json!(42);
        assert_eq!(KeyPart::from_json(&v), Some(KeyPart::Int(42)));
        let v = serde_json::json!("abc");
        assert_eq!(KeyPart::from_json(&v), Some(KeyPart::String("abc".into())));
        let v = serde_json::json!(null);
        assert_eq!(KeyPart::from_json(&v), Some(KeyPart::Null));
        let v = serde_json::json!([1, 2]);
        assert_eq!(KeyPart::from_json(&v), None);
    }

    #[test]
    fn test_option_maps_none_to_null() {
        let missing: Option<i32> = None;
        assert!(KeyPart::from(missing).is_null());
        assert_eq!(KeyPart::from(Some(3)), KeyPart::Int(3));
    }

    #[test]
    fn test_key_value_arity_and_matching() {
        let scalar = KeyValue::from(1);
        assert_eq!(scalar.arity(), 1);
        assert!(scalar.matches(&[KeyPart::Int(1)]));
        assert!(!scalar.matches(&[KeyPart::Int(2)]));

        let composite = KeyValue::from((1, 2));
        assert!(composite.is_composite());
        assert_eq!(composite.arity(), 2);
        assert!(composite.matches(&[1.into(), 2.into()]));
        assert!(!composite.matches(&[2.into(), 1.into()]));
    }

    #[test]
    fn test_key_value_display() {
        assert_eq!(KeyValue::from(5).to_string(), "5");
        assert_eq!(KeyValue::composite([1, 2]).to_string(), "(1, 2)");
        assert_eq!(KeyValue::from("x").to_string(), "\"x\"");
    }

    #[test]
    fn test_uuid_key_matches_serialized_form() {
        let id = uuid::Uuid::new_v4();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(KeyPart::from_json(&json), Some(KeyPart::from(id)));
    }
}
