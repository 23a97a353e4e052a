use std::fmt;

use crate::violation::ConstraintViolation;

/// Top-level error type returned by the [`Validator`](crate::Validator).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// One or more constraints were violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The constraints attached to a schema could not be compiled.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The validator was called with input it cannot handle.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Returned when one or more constraints are violated.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The top-level violations, in rule declaration order.
    pub violations: Vec<ConstraintViolation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.len() {
            0 => Ok(()),
            1 => {
                write!(f, "validation error: {}", self.violations[0])?;
                write_nested(f, &self.violations[0], 1)
            }
            _ => {
                write!(f, "validation errors:")?;
                for v in &self.violations {
                    write!(f, "\n - {v}")?;
                    write_nested(f, v, 1)?;
                }
                Ok(())
            }
        }
    }
}

fn write_nested(
    f: &mut fmt::Formatter<'_>,
    violation: &ConstraintViolation,
    depth: usize,
) -> fmt::Result {
    for child in violation.nested() {
        write!(f, "\n{:indent$} - {child}", "", indent = depth * 3)?;
        write_nested(f, child, depth + 1)?;
    }
    Ok(())
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Wrap a non-empty violation list; an empty list is no error.
    #[must_use]
    pub fn from_violations(violations: Vec<ConstraintViolation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// Leaf violations with paths relative to the validated record.
    #[must_use]
    pub fn flatten(&self) -> Vec<ConstraintViolation> {
        self.violations
            .iter()
            .flat_map(ConstraintViolation::flatten)
            .collect()
    }
}

/// An authoring mistake in the constraints attached to a schema.
///
/// Raised once, while rules are compiled, never while records are validated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// An option or rule refers to a type the schema does not declare.
    #[error("unknown type `{type_name}`")]
    UnknownType {
        /// The missing type.
        type_name: String,
    },

    /// An option or expression refers to a field the type does not declare.
    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField {
        /// The declaring type.
        type_name: String,
        /// The missing field.
        field: String,
    },

    /// A message-level option was attached to a field, or the other way around.
    #[error("option `{option}` cannot be applied to {target}")]
    MisplacedOption {
        /// The option name.
        option: String,
        /// Where it was found.
        target: String,
    },

    /// The same option was discovered twice on the same target.
    #[error("option `{option}` is declared more than once on {target}")]
    DuplicateOption {
        /// The option name.
        option: String,
        /// Where it was found.
        target: String,
    },

    /// The option payload does not have the expected shape.
    #[error("malformed `{option}` option on {target}: {reason}")]
    MalformedOption {
        /// The option name.
        option: String,
        /// Where it was found.
        target: String,
        /// What is wrong with the payload.
        reason: String,
    },

    /// `(required)` on a field whose unset value cannot be detected.
    #[error("field `{field}` of type `{field_type}` cannot be required")]
    UnsupportedRequired {
        /// Qualified field name.
        field: String,
        /// The declared field type.
        field_type: String,
    },

    /// `(distinct)` on a field that is not a list or map.
    #[error("`(distinct)` applies to repeated and map fields only, `{field}` is `{field_type}`")]
    DistinctOnNonCollection {
        /// Qualified field name.
        field: String,
        /// The declared field type.
        field_type: String,
    },

    /// `(validate)` on a field that does not hold messages.
    #[error("`(validate)` applies to message fields only, `{field}` is `{field_type}`")]
    ValidateOnNonMessage {
        /// Qualified field name.
        field: String,
        /// The declared field type.
        field_type: String,
    },

    /// A numeric bound on a field that does not hold numbers.
    #[error("`({option})` applies to numeric fields only, `{field}` is `{field_type}`")]
    NumericRuleOnNonNumber {
        /// The option name.
        option: String,
        /// Qualified field name.
        field: String,
        /// The declared field type.
        field_type: String,
    },

    /// A `(range)` that cannot be parsed or is empty.
    #[error("invalid range `{range}` on `{field}`: {reason}")]
    InvalidRange {
        /// Qualified field name.
        field: String,
        /// The range text.
        range: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `(min)`/`(max)` bound that cannot be parsed for the field kind.
    #[error("invalid `({option})` bound `{bound}` on `{field}`")]
    InvalidBound {
        /// The option name.
        option: String,
        /// Qualified field name.
        field: String,
        /// The bound text.
        bound: String,
    },

    /// `(pattern)` on a field that does not hold strings.
    #[error("`(pattern)` applies to string fields only, `{field}` is `{field_type}`")]
    PatternOnNonString {
        /// Qualified field name.
        field: String,
        /// The declared field type.
        field_type: String,
    },

    /// A `(pattern)` regular expression that does not compile.
    #[error("invalid `(pattern)` on `{field}`: {reason}")]
    InvalidPattern {
        /// Qualified field name.
        field: String,
        /// The regex compilation error.
        reason: String,
    },

    /// `(when)` on a field that does not hold timestamps.
    #[error("`(when)` applies to `google.protobuf.Timestamp` fields only, `{field}` is `{field_type}`")]
    WhenOnNonTimestamp {
        /// Qualified field name.
        field: String,
        /// The declared field type.
        field_type: String,
    },

    /// `(goes)` between fields that cannot report presence.
    #[error("`(goes)` cannot pair `{field}` with `{companion}`: `{offender}` is `{field_type}`")]
    UnsupportedGoes {
        /// Qualified field name carrying the option.
        field: String,
        /// The companion field name.
        companion: String,
        /// The field whose type is unsupported.
        offender: String,
        /// Its declared type.
        field_type: String,
    },

    /// A `(required_field)` expression that does not parse.
    #[error("malformed required field expression `{expression}` on `{type_name}`: {reason}")]
    MalformedExpression {
        /// The declaring type.
        type_name: String,
        /// The expression text.
        expression: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A rule would carry no error message.
    #[error("empty error message for `{rule}`")]
    EmptyErrorMessage {
        /// The rule id.
        rule: String,
    },
}

/// Returned when the validator is called with records it was not compiled for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("runtime error: {cause}")]
pub struct RuntimeError {
    /// Description of the failure.
    pub cause: String,
}

impl From<prost::DecodeError> for RuntimeError {
    fn from(err: prost::DecodeError) -> Self {
        Self {
            cause: format!("failed to decode record: {err}"),
        }
    }
}

/// Returned when [`Value::compare`](crate::Value::compare) is asked to order
/// values that have no numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot order `{left}` against `{right}`")]
pub struct IncomparableKinds {
    /// Kind of the left operand.
    pub left: &'static str,
    /// Kind of the right operand.
    pub right: &'static str,
}
