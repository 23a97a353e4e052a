use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::IncomparableKinds;
use crate::schema::{FieldDescriptor, PrimitiveKind};

/// Host-independent runtime value of a field.
///
/// Values are immutable once built. Map entries are kept sorted by key when
/// built through [`Value::map`], so two maps with the same entries compare
/// equal regardless of insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating point number.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// An enum value.
    Enum(EnumValue),
    /// A message.
    Message(MessageValue),
    /// A repeated field.
    List(Vec<Value>),
    /// A map field as `(key, value)` entries.
    Map(Vec<(Value, Value)>),
}

/// An enum value: the enum type and the numeric tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// Full name of the enum type.
    pub type_name: String,
    /// The numeric tag.
    pub number: i32,
}

/// A message value: its type and the fields that hold non-default values.
///
/// Setting a field to its default removes it, so a message with no fields is
/// the default message of its type.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageValue {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl MessageValue {
    /// Create the default message of `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder form of [`MessageValue::set`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field. A default value clears the field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if value.is_default() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value);
        }
    }

    /// Full type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The value of a field, or `None` if it is unset.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Fields holding non-default values, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if no field holds a non-default value.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.fields.values().all(Value::is_default)
    }
}

impl Value {
    /// Build an enum value.
    pub fn enumeration(type_name: impl Into<String>, number: i32) -> Self {
        Self::Enum(EnumValue {
            type_name: type_name.into(),
            number,
        })
    }

    /// Build a map value with entries sorted by key.
    #[must_use]
    pub fn map(mut entries: Vec<(Value, Value)>) -> Self {
        entries.sort_by(|(a, _), (b, _)| key_order(a, b));
        Self::Map(entries)
    }

    /// Returns true if this is the zero/empty value of its kind.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_default(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(v) => !v,
            Self::Int(v) => *v == 0,
            Self::UInt(v) => *v == 0,
            Self::Double(v) => *v == 0.0,
            Self::String(v) => v.is_empty(),
            Self::Bytes(v) => v.is_empty(),
            Self::Enum(v) => v.number == 0,
            Self::Message(v) => v.is_default(),
            Self::List(v) => v.is_empty(),
            Self::Map(v) => v.is_empty(),
        }
    }

    /// Returns true for integer and floating point values.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_) | Self::Double(_))
    }

    /// Returns true for list and map values.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// The name of this value's kind, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Enum(_) => "enum",
            Self::Message(_) => "message",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Order two numeric values.
    ///
    /// # Errors
    ///
    /// Returns [`IncomparableKinds`] when either side is not numeric or the
    /// comparison involves NaN.
    pub fn compare(&self, other: &Value) -> Result<Ordering, IncomparableKinds> {
        let ordering = match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::UInt(a), Self::UInt(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::UInt(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Self::UInt(a), Self::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
            }
            _ => None,
        };
        ordering.ok_or(IncomparableKinds {
            left: self.kind_name(),
            right: other.kind_name(),
        })
    }

    /// Equality that treats numeric values of different kinds by magnitude.
    #[must_use]
    pub fn same_as(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.compare(other) == Ok(Ordering::Equal);
        }
        self == other
    }

    /// Structural equality where doubles compare by bit pattern, so NaN is
    /// identical to itself and `-0.0` differs from `0.0`.
    #[must_use]
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::List(a), Self::List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y)),
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka.identical(kb) && va.identical(vb))
            }
            (Self::Message(a), Self::Message(b)) => {
                a.type_name == b.type_name
                    && a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|((na, va), (nb, vb))| na == nb && va.identical(vb))
            }
            _ => self == other,
        }
    }

    /// Numeric value widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed integer value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Message value.
    #[must_use]
    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Self::Message(v) => Some(v),
            _ => None,
        }
    }
}

/// The sentinel an unset field holds, used by `(required)`.
///
/// Returns `None` for singular bool and numeric fields: `false` and `0`
/// cannot be told apart from "not set".
#[must_use]
pub fn extract_unset_sentinel(field: &FieldDescriptor) -> Option<Value> {
    if !field.is_collection() {
        let kind = field.kind().as_primitive();
        if kind.is_some_and(|k| k.is_numeric() || k == PrimitiveKind::Bool) {
            return None;
        }
    }
    Some(field.default_value())
}

/// Total order over scalar map keys; kinds first, then values.
pub(crate) fn key_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::UInt(_) | Value::Double(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
            Value::Enum(_) => 5,
            Value::Message(_) => 6,
            Value::List(_) => 7,
            Value::Map(_) => 8,
        }
    }

    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
        (Value::Enum(a), Value::Enum(b)) => a.number.cmp(&b.number),
        (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
        (a, b) => a.compare(b).unwrap_or(Ordering::Equal),
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Bytes(v) => {
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Enum(v) => write!(f, "{}", v.number),
            Self::Message(v) => write!(f, "{v}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match value {
                Value::String(s) => write!(f, "{sep}{name}: {s:?}")?,
                other => write!(f, "{sep}{name}: {other}")?,
            }
        }
        if self.fields.is_empty() {
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Double(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<MessageValue> for Value {
    fn from(v: MessageValue) -> Self {
        Self::Message(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}
