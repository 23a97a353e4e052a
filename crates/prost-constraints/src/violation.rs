use std::fmt;
use std::str::FromStr;

use crate::rule::ConstraintKind;
use crate::template::TemplateParams;
use crate::value::Value;

/// Element subscript in a field path: a list index or a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscript {
    /// Position in a repeated field.
    Index(u64),
    /// Boolean map key.
    BoolKey(bool),
    /// Signed integer map key.
    IntKey(i64),
    /// Unsigned integer map key.
    UintKey(u64),
    /// String map key.
    StringKey(String),
}

impl Subscript {
    /// Subscript addressing the map entry with `key`.
    #[must_use]
    pub fn from_key(key: &Value) -> Self {
        match key {
            Value::Bool(b) => Self::BoolKey(*b),
            Value::Int(i) => Self::IntKey(*i),
            Value::UInt(u) => Self::UintKey(*u),
            Value::String(s) => Self::StringKey(s.clone()),
            other => Self::StringKey(other.to_string()),
        }
    }
}

impl fmt::Display for Subscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) | Self::UintKey(i) => write!(f, "{i}"),
            Self::BoolKey(b) => write!(f, "{b}"),
            Self::IntKey(i) => write!(f, "{i}"),
            Self::StringKey(s) => {
                let encoded = serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
                f.write_str(&encoded)
            }
        }
    }
}

/// One segment of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    /// The field name.
    pub field_name: String,
    /// The element of the field, for list and map fields.
    pub subscript: Option<Subscript>,
}

/// Ordered field names leading from a record to the violating value.
///
/// Empty for message-level violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    elements: Vec<PathElement>,
}

impl FieldPath {
    /// The empty path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// This path extended by `field`.
    #[must_use]
    pub fn child(&self, field: &str) -> Self {
        let mut out = self.clone();
        out.elements.push(PathElement {
            field_name: field.to_string(),
            subscript: None,
        });
        out
    }

    /// This path with the last element subscripted.
    #[must_use]
    pub fn with_subscript(&self, subscript: Subscript) -> Self {
        let mut out = self.clone();
        if let Some(last) = out.elements.last_mut() {
            last.subscript = Some(subscript);
        }
        out
    }

    /// `self` followed by `suffix`.
    #[must_use]
    pub fn join(&self, suffix: &FieldPath) -> Self {
        let mut out = self.clone();
        out.elements.extend(suffix.elements.iter().cloned());
        out
    }

    /// The path segments.
    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Returns true for the empty path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&element.field_name)?;
            if let Some(subscript) = &element.subscript {
                write!(f, "[{subscript}]")?;
            }
        }
        Ok(())
    }
}

/// Returned when a string is not a well-formed field path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field path `{0}`")]
pub struct InvalidFieldPath(pub String);

/// Parses the form produced by `Display`.
///
/// Integer subscripts carry no kind in text: a non-negative one parses as
/// [`Subscript::Index`] and a negative one as [`Subscript::IntKey`], so
/// `UintKey` and non-negative `IntKey` subscripts come back as `Index`.
impl FromStr for FieldPath {
    type Err = InvalidFieldPath;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let invalid = || InvalidFieldPath(path.to_string());

        let mut elements = Vec::new();
        for segment in split_segments(path) {
            let name_end = segment.find('[').unwrap_or(segment.len());
            let field_name = &segment[..name_end];
            if field_name.is_empty() {
                return Err(invalid());
            }
            let rest = &segment[name_end..];
            let subscript = if rest.is_empty() {
                None
            } else {
                let token = rest
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .ok_or_else(invalid)?;
                Some(parse_subscript(token).ok_or_else(invalid)?)
            };
            elements.push(PathElement {
                field_name: field_name.to_string(),
                subscript,
            });
        }
        Ok(Self { elements })
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut in_brackets = false;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in path.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if in_brackets => in_string = true,
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            '.' if !in_brackets => {
                segments.push(&path[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments
}

fn parse_subscript(token: &str) -> Option<Subscript> {
    if token.starts_with('"') && token.ends_with('"') && token.len() >= 2 {
        return serde_json::from_str::<String>(token)
            .ok()
            .map(Subscript::StringKey);
    }
    if token == "true" {
        return Some(Subscript::BoolKey(true));
    }
    if token == "false" {
        return Some(Subscript::BoolKey(false));
    }
    if let Ok(index) = token.parse::<u64>() {
        return Some(Subscript::Index(index));
    }
    token.parse::<i64>().ok().map(Subscript::IntKey)
}

/// A single failed constraint, addressed by field path.
///
/// Violations form a tree: a field that failed nested validation carries the
/// nested record's violations, each with a path relative to that record.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ConstraintViolation {
    type_name: String,
    field_path: FieldPath,
    constraint: ConstraintKind,
    template: String,
    params: TemplateParams,
    message: String,
    field_value: Option<Value>,
    nested: Vec<ConstraintViolation>,
}

impl ConstraintViolation {
    /// Start building a violation of `constraint` on a record of `type_name`.
    pub fn builder(
        type_name: impl Into<String>,
        constraint: ConstraintKind,
        message: impl Into<String>,
    ) -> ViolationBuilder {
        let message = message.into();
        ViolationBuilder {
            inner: Self {
                type_name: type_name.into(),
                field_path: FieldPath::root(),
                constraint,
                template: message.clone(),
                params: TemplateParams::new(),
                message,
                field_value: None,
                nested: Vec::new(),
            },
        }
    }

    /// Full name of the type whose rule was violated.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Path of the violating field, relative to the record of [`Self::type_name`].
    #[must_use]
    pub fn field_path(&self) -> &FieldPath {
        &self.field_path
    }

    /// The violated constraint.
    #[must_use]
    pub fn constraint(&self) -> ConstraintKind {
        self.constraint
    }

    /// Machine-readable constraint identifier.
    #[must_use]
    pub fn rule_id(&self) -> &'static str {
        self.constraint.rule_id()
    }

    /// The unformatted message template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Every parameter available to the template.
    #[must_use]
    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    /// The formatted message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The value that failed validation, when there is one.
    #[must_use]
    pub fn field_value(&self) -> Option<&Value> {
        self.field_value.as_ref()
    }

    /// Violations of the nested record, for failed `(validate)` fields.
    #[must_use]
    pub fn nested(&self) -> &[ConstraintViolation] {
        &self.nested
    }

    /// Leaf violations with paths rebased onto this violation's path.
    #[must_use]
    pub fn flatten(&self) -> Vec<ConstraintViolation> {
        if self.nested.is_empty() {
            return vec![self.clone()];
        }
        self.nested
            .iter()
            .flat_map(ConstraintViolation::flatten)
            .map(|mut leaf| {
                leaf.field_path = self.field_path.join(&leaf.field_path);
                leaf
            })
            .collect()
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.field_path.is_empty() {
            write!(f, "{}: ", self.field_path)?;
        }
        if self.message.is_empty() {
            write!(f, "[{}]", self.rule_id())
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Builder for [`ConstraintViolation`].
#[derive(Debug, Clone)]
pub struct ViolationBuilder {
    inner: ConstraintViolation,
}

impl ViolationBuilder {
    /// Set the field path.
    #[must_use]
    pub fn field_path(mut self, path: FieldPath) -> Self {
        self.inner.field_path = path;
        self
    }

    /// Record the template and parameters the message was formatted from.
    #[must_use]
    pub fn template(mut self, template: impl Into<String>, params: TemplateParams) -> Self {
        self.inner.template = template.into();
        self.inner.params = params;
        self
    }

    /// Set the violating value.
    #[must_use]
    pub fn field_value(mut self, value: Value) -> Self {
        self.inner.field_value = Some(value);
        self
    }

    /// Attach nested violations.
    #[must_use]
    pub fn nested(mut self, nested: Vec<ConstraintViolation>) -> Self {
        self.inner.nested = nested;
        self
    }

    /// Finish the violation.
    #[must_use]
    pub fn build(self) -> ConstraintViolation {
        self.inner
    }
}
