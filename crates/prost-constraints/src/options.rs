//! Options discovered on a schema, before they are compiled into rules.
//!
//! The schema front-end reports each option as a [`DiscoveredOption`]: the
//! option name, its payload as a [`Value`], and the field or type it was
//! attached to. Only names in [`CATALOGUE`] are recognised; every other
//! option is ignored.

use std::fmt;

use crate::error::SchemaError;
use crate::rule::{PatternModifier, Time};
use crate::value::{MessageValue, Value};

/// Option names the compiler understands.
pub const CATALOGUE: &[&str] = &[
    "required",
    "range",
    "min",
    "max",
    "pattern",
    "distinct",
    "validate",
    "when",
    "goes",
    "required_field",
    "set_once",
    "if_missing",
    "if_invalid",
];

/// Where an option was attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionTarget {
    /// A field of a type.
    Field {
        /// Full name of the declaring type.
        type_name: String,
        /// The field name.
        field: String,
    },
    /// A whole type.
    Message {
        /// Full type name.
        type_name: String,
    },
}

impl OptionTarget {
    /// Full name of the type the option belongs to.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Field { type_name, .. } | Self::Message { type_name } => type_name,
        }
    }
}

impl fmt::Display for OptionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { type_name, field } => write!(f, "field `{type_name}.{field}`"),
            Self::Message { type_name } => write!(f, "message `{type_name}`"),
        }
    }
}

/// One "option discovered" notification from the schema front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredOption {
    /// Where the option was found.
    pub target: OptionTarget,
    /// Option name without package, e.g. `required`.
    pub name: String,
    /// The option value.
    pub payload: Value,
}

impl DiscoveredOption {
    /// An option attached to `type_name.field`.
    pub fn field(
        type_name: impl Into<String>,
        field: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<Value>,
    ) -> Self {
        Self {
            target: OptionTarget::Field {
                type_name: type_name.into(),
                field: field.into(),
            },
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// An option attached to the type `type_name`.
    pub fn message(
        type_name: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<Value>,
    ) -> Self {
        Self {
            target: OptionTarget::Message {
                type_name: type_name.into(),
            },
            name: name.into(),
            payload: payload.into(),
        }
    }
}

/// A `(min)` or `(max)` bound as declared.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundOption {
    pub value: Value,
    pub exclusive: bool,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RangeOption {
    pub text: String,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PatternOption {
    pub regex: String,
    pub modifier: PatternModifier,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WhenOption {
    /// `None` for an undefined time, which compiles to no rule.
    pub time: Option<Time>,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GoesOption {
    pub with: String,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlagOption {
    pub enabled: bool,
    pub error_msg: Option<String>,
}

/// A recognised option with its payload decoded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OptionKind {
    Required(bool),
    IfMissing(Option<String>),
    Range(RangeOption),
    Min(BoundOption),
    Max(BoundOption),
    Pattern(PatternOption),
    Distinct(bool),
    Validate(bool),
    IfInvalid(Option<String>),
    When(WhenOption),
    Goes(GoesOption),
    RequiredField(String),
    SetOnce(FlagOption),
}

impl OptionKind {
    /// Decode a discovered option, or `None` if its name is not recognised.
    pub(crate) fn parse(option: &DiscoveredOption) -> Result<Option<Self>, SchemaError> {
        let payload = Payload {
            option,
            value: &option.payload,
        };
        let kind = match option.name.as_str() {
            "required" => Self::Required(payload.flag()?),
            "if_missing" => Self::IfMissing(payload.message_override()?),
            "range" => Self::Range(payload.range()?),
            "min" => Self::Min(payload.bound()?),
            "max" => Self::Max(payload.bound()?),
            "pattern" => Self::Pattern(payload.pattern()?),
            "distinct" => Self::Distinct(payload.flag()?),
            "validate" => Self::Validate(payload.flag()?),
            "if_invalid" => Self::IfInvalid(payload.message_override()?),
            "when" => Self::When(payload.when()?),
            "goes" => Self::Goes(payload.goes()?),
            "required_field" => Self::RequiredField(payload.text()?),
            "set_once" => Self::SetOnce(payload.flag_with_message()?),
            _ => return Ok(None),
        };
        Ok(Some(kind))
    }

    /// Returns true for options that belong on a type rather than a field.
    pub(crate) fn is_message_level(&self) -> bool {
        matches!(self, Self::RequiredField(_))
    }
}

struct Payload<'a> {
    option: &'a DiscoveredOption,
    value: &'a Value,
}

impl Payload<'_> {
    fn malformed(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::MalformedOption {
            option: self.option.name.clone(),
            target: self.option.target.to_string(),
            reason: reason.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> SchemaError {
        self.malformed(format!("expected {expected}, found {}", self.value.kind_name()))
    }

    fn flag(&self) -> Result<bool, SchemaError> {
        match self.value {
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            _ => Err(self.unexpected("bool")),
        }
    }

    fn text(&self) -> Result<String, SchemaError> {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            _ => Err(self.unexpected("string")),
        }
    }

    fn structured(&self) -> Option<&MessageValue> {
        self.value.as_message()
    }

    fn error_msg(&self, msg: &MessageValue) -> Result<Option<String>, SchemaError> {
        match msg.get("error_msg") {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.malformed(format!(
                "`error_msg` must be a string, found {}",
                other.kind_name()
            ))),
        }
    }

    fn message_override(&self) -> Result<Option<String>, SchemaError> {
        match self.value {
            Value::String(s) => Ok(Some(s.clone())),
            Value::Message(msg) => self.error_msg(msg),
            Value::Null => Ok(None),
            _ => Err(self.unexpected("string or message")),
        }
    }

    fn flag_with_message(&self) -> Result<FlagOption, SchemaError> {
        if let Some(msg) = self.structured() {
            let enabled = match msg.get("value") {
                None => true,
                Some(Value::Bool(b)) => *b,
                Some(other) => {
                    return Err(self.malformed(format!(
                        "`value` must be a bool, found {}",
                        other.kind_name()
                    )));
                }
            };
            return Ok(FlagOption {
                enabled,
                error_msg: self.error_msg(msg)?,
            });
        }
        Ok(FlagOption {
            enabled: self.flag()?,
            error_msg: None,
        })
    }

    fn range(&self) -> Result<RangeOption, SchemaError> {
        match self.value {
            Value::String(s) => Ok(RangeOption {
                text: s.clone(),
                error_msg: None,
            }),
            Value::Message(msg) => {
                let Some(Value::String(text)) = msg.get("value") else {
                    return Err(self.malformed("missing range text in `value`"));
                };
                Ok(RangeOption {
                    text: text.clone(),
                    error_msg: self.error_msg(msg)?,
                })
            }
            _ => Err(self.unexpected("string or message")),
        }
    }

    fn bound(&self) -> Result<BoundOption, SchemaError> {
        match self.value {
            Value::Int(_) | Value::UInt(_) | Value::Double(_) | Value::String(_) => {
                Ok(BoundOption {
                    value: self.value.clone(),
                    exclusive: false,
                    error_msg: None,
                })
            }
            Value::Message(msg) => {
                let value = match msg.get("value") {
                    Some(v @ (Value::Int(_) | Value::UInt(_) | Value::Double(_) | Value::String(_))) => {
                        v.clone()
                    }
                    Some(other) => {
                        return Err(self.malformed(format!(
                            "bound must be a number or string, found {}",
                            other.kind_name()
                        )));
                    }
                    None => return Err(self.malformed("missing bound in `value`")),
                };
                let exclusive = msg.get("exclusive").and_then(Value::as_bool).unwrap_or(false);
                Ok(BoundOption {
                    value,
                    exclusive,
                    error_msg: self.error_msg(msg)?,
                })
            }
            _ => Err(self.unexpected("number, string, or message")),
        }
    }

    fn pattern(&self) -> Result<PatternOption, SchemaError> {
        match self.value {
            Value::String(s) => Ok(PatternOption {
                regex: s.clone(),
                modifier: PatternModifier::default(),
                error_msg: None,
            }),
            Value::Message(msg) => {
                let Some(Value::String(regex)) = msg.get("regex") else {
                    return Err(self.malformed("missing `regex`"));
                };
                let modifier = match msg.get("modifier") {
                    None => PatternModifier::default(),
                    Some(Value::Message(m)) => {
                        let flag = |name: &str| m.get(name).and_then(Value::as_bool).unwrap_or(false);
                        PatternModifier {
                            case_insensitive: flag("case_insensitive"),
                            multiline: flag("multiline"),
                            dot_all: flag("dot_all"),
                            unicode: flag("unicode"),
                            partial_match: flag("partial_match"),
                        }
                    }
                    Some(other) => {
                        return Err(self.malformed(format!(
                            "`modifier` must be a message, found {}",
                            other.kind_name()
                        )));
                    }
                };
                Ok(PatternOption {
                    regex: regex.clone(),
                    modifier,
                    error_msg: self.error_msg(msg)?,
                })
            }
            _ => Err(self.unexpected("string or message")),
        }
    }

    fn when(&self) -> Result<WhenOption, SchemaError> {
        let (time, error_msg) = match self.value {
            Value::Message(msg) => (msg.get("in").unwrap_or(&Value::Null), self.error_msg(msg)?),
            other => (other, None),
        };
        let time = match time {
            Value::Null => None,
            Value::Enum(e) => self.time_from_number(i64::from(e.number))?,
            Value::Int(n) => self.time_from_number(*n)?,
            Value::String(s) => match s.to_ascii_uppercase().as_str() {
                "" | "TIME_UNDEFINED" | "UNDEFINED" => None,
                "PAST" => Some(Time::Past),
                "FUTURE" => Some(Time::Future),
                _ => return Err(self.malformed(format!("unknown time `{s}`"))),
            },
            other => {
                return Err(self.malformed(format!(
                    "`in` must be an enum, found {}",
                    other.kind_name()
                )));
            }
        };
        Ok(WhenOption { time, error_msg })
    }

    fn time_from_number(&self, number: i64) -> Result<Option<Time>, SchemaError> {
        match number {
            0 => Ok(None),
            1 => Ok(Some(Time::Past)),
            2 => Ok(Some(Time::Future)),
            n => Err(self.malformed(format!("unknown time value {n}"))),
        }
    }

    fn goes(&self) -> Result<GoesOption, SchemaError> {
        let (with, error_msg) = match self.value {
            Value::String(s) => (s.clone(), None),
            Value::Message(msg) => match msg.get("with") {
                Some(Value::String(s)) => (s.clone(), self.error_msg(msg)?),
                _ => return Err(self.malformed("missing companion in `with`")),
            },
            _ => return Err(self.unexpected("string or message")),
        };
        if with.trim().is_empty() {
            return Err(self.malformed("missing companion in `with`"));
        }
        Ok(GoesOption {
            with: with.trim().to_string(),
            error_msg,
        })
    }
}
