use std::collections::BTreeMap;
use std::fmt;

use crate::value::{MessageValue, Value};

/// Full name of the message type treated as a point in time by `(when)`.
pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

/// Scalar kinds a field can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `bool`
    Bool,
    /// `int32`, `sint32`, `sfixed32`
    Int32,
    /// `int64`, `sint64`, `sfixed64`
    Int64,
    /// `uint32`, `fixed32`
    UInt32,
    /// `uint64`, `fixed64`
    UInt64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`
    String,
    /// `bytes`
    Bytes,
}

impl PrimitiveKind {
    /// Returns true for integer and floating point kinds.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating_point()
    }

    /// Returns true for signed and unsigned integer kinds.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::UInt32 | Self::UInt64)
    }

    /// Returns true for `float` and `double`.
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// The zero value of this kind.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int32 | Self::Int64 => Value::Int(0),
            Self::UInt32 | Self::UInt64 => Value::UInt(0),
            Self::Float | Self::Double => Value::Double(0.0),
            Self::String => Value::String(String::new()),
            Self::Bytes => Value::Bytes(Vec::new()),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }
}

/// The declared kind of a field (for maps, the kind of the values).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A scalar.
    Primitive(PrimitiveKind),
    /// An enum, by full type name.
    Enum(String),
    /// A message, by full type name.
    Message(String),
}

impl FieldKind {
    /// Shorthand for `FieldKind::Message(name)`.
    pub fn message(type_name: impl Into<String>) -> Self {
        Self::Message(type_name.into())
    }

    /// Shorthand for `FieldKind::Enum(name)`.
    pub fn enumeration(type_name: impl Into<String>) -> Self {
        Self::Enum(type_name.into())
    }

    /// Returns the primitive kind, if this is a scalar.
    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            Self::Enum(_) | Self::Message(_) => None,
        }
    }

    /// Returns the message type name, if this is a message.
    #[must_use]
    pub fn as_message(&self) -> Option<&str> {
        match self {
            Self::Message(name) => Some(name),
            Self::Primitive(_) | Self::Enum(_) => None,
        }
    }

    /// Returns true for integer and floating point scalars.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_numeric)
    }

    /// The zero value of a single element of this kind.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(kind) => kind.default_value(),
            Self::Enum(name) => Value::enumeration(name.clone(), 0),
            Self::Message(name) => Value::Message(MessageValue::new(name.clone())),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.name()),
            Self::Enum(name) | Self::Message(name) => f.write_str(name),
        }
    }
}

/// Whether a field holds one value, a list, or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// A single value.
    Singular,
    /// A repeated field.
    List,
    /// A map field with the given key kind.
    Map {
        /// The kind of the map keys.
        key: PrimitiveKind,
    },
}

/// Identifies a field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    declaring_type: String,
    name: String,
    cardinality: Cardinality,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// Create a descriptor for a field of `declaring_type`.
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        cardinality: Cardinality,
        kind: FieldKind,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            cardinality,
            kind,
        }
    }

    /// Full name of the type declaring this field.
    #[must_use]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// The field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field cardinality.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The declared kind (the value kind for maps).
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Returns true for list and map fields.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        !matches!(self.cardinality, Cardinality::Singular)
    }

    /// Returns true for map fields.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self.cardinality, Cardinality::Map { .. })
    }

    /// Renders the declared type the way a schema would spell it.
    #[must_use]
    pub fn type_label(&self) -> String {
        match self.cardinality {
            Cardinality::Singular => self.kind.to_string(),
            Cardinality::List => format!("repeated {}", self.kind),
            Cardinality::Map { key } => format!("map<{}, {}>", key.name(), self.kind),
        }
    }

    /// The value an unset field holds.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self.cardinality {
            Cardinality::Singular => self.kind.default_value(),
            Cardinality::List => Value::List(Vec::new()),
            Cardinality::Map { .. } => Value::Map(Vec::new()),
        }
    }
}

/// The role a record type plays, deciding whether its first field is an
/// implicitly required identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordKind {
    /// An ordinary message.
    #[default]
    Plain,
    /// An entity state; the first field is its identifier.
    Entity,
    /// A command; the first field identifies its target.
    Command,
    /// An event; the first field identifies its producer.
    Event,
    /// A rejection; the first field identifies its target.
    Rejection,
}

impl RecordKind {
    /// Returns true if the first declared field is required unless stated otherwise.
    #[must_use]
    pub fn first_field_required(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// A record type and its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    kind: RecordKind,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Create an empty plain type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RecordKind::Plain,
            fields: Vec::new(),
        }
    }

    /// Set the record kind.
    #[must_use]
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    /// Append a singular field.
    #[must_use]
    pub fn singular(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name, Cardinality::Singular, kind)
    }

    /// Append a repeated field.
    #[must_use]
    pub fn list(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name, Cardinality::List, kind)
    }

    /// Append a map field.
    #[must_use]
    pub fn map(self, name: impl Into<String>, key: PrimitiveKind, value: FieldKind) -> Self {
        self.field(name, Cardinality::Map { key }, value)
    }

    /// Append a field with an explicit cardinality.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, cardinality: Cardinality, kind: FieldKind) -> Self {
        let descriptor = FieldDescriptor::new(self.name.clone(), name, cardinality, kind);
        self.fields.push(descriptor);
        self
    }

    /// Full type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record kind.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look a field up by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Index of the field in declaration order.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// The set of record types known at compile time, keyed by full name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    types: BTreeMap<String, TypeDescriptor>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type.
    #[must_use]
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Add or replace a type.
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Look a type up by full name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// All types, ordered by name.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }
}
