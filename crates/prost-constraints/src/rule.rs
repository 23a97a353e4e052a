use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::schema::FieldDescriptor;
use crate::template::ErrorMessage;
use crate::value::{MessageValue, Value};

/// Identifies the option a rule was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// `(required)`, explicit or implied by the record kind.
    Required,
    /// `(range)`
    Range,
    /// `(min)`
    Min,
    /// `(max)`
    Max,
    /// `(pattern)`
    Pattern,
    /// `(distinct)`
    Distinct,
    /// `(validate)`
    Validate,
    /// `(when)`
    When,
    /// `(goes)`
    Goes,
    /// `(required_field)`
    RequiredField,
    /// `(set_once)`
    SetOnce,
}

impl ConstraintKind {
    /// Stable machine-readable identifier.
    #[must_use]
    pub fn rule_id(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Range => "range",
            Self::Min => "min",
            Self::Max => "max",
            Self::Pattern => "pattern",
            Self::Distinct => "distinct",
            Self::Validate => "validate",
            Self::When => "when",
            Self::Goes => "goes",
            Self::RequiredField => "required_field",
            Self::SetOnce => "set_once",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_id())
    }
}

/// Comparison applied by a [`SimpleRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
        })
    }
}

/// How a [`CompositeRule`] combines its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperator {
    /// Every operand must hold.
    And,
    /// At least one operand must hold.
    Or,
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "&",
            Self::Or => "|",
        })
    }
}

/// Compares one field against a threshold.
#[derive(Debug, Clone)]
pub struct SimpleRule {
    /// The constrained field.
    pub field: String,
    /// The comparison the field value must satisfy.
    pub operator: ComparisonOperator,
    /// The right-hand operand.
    pub threshold: Value,
    /// The option the rule came from.
    pub constraint: ConstraintKind,
    /// Message reported when the comparison fails.
    pub message: ErrorMessage,
    /// Skip the rule when the field holds its default value.
    pub ignored_if_unset: bool,
    /// Apply the rule to each element of a collection.
    pub distribute: bool,
}

/// A boolean combination of rules.
///
/// `field` is set when every operand targets the same field, as for
/// `(range)`; message-level combinations leave it empty.
#[derive(Debug, Clone)]
pub struct CompositeRule {
    /// How operands are combined.
    pub operator: BooleanOperator,
    /// The combined rules.
    pub operands: Vec<Rule>,
    /// The shared field of all operands, if any.
    pub field: Option<String>,
    /// The option the rule came from.
    pub constraint: ConstraintKind,
    /// Message reported when the combination fails.
    pub message: ErrorMessage,
    /// Skip the rule when the field holds its default value.
    pub ignored_if_unset: bool,
    /// Apply the rule to each element of a collection.
    pub distribute: bool,
}

/// Argument of a `(when)` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Time {
    /// The timestamp must be before now.
    Past,
    /// The timestamp must be after now.
    Future,
}

impl Time {
    /// Lowercase name used in messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Past => "past",
            Self::Future => "future",
        }
    }
}

/// Regex flags of a `(pattern)` rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct PatternModifier {
    /// Match letters regardless of case.
    pub case_insensitive: bool,
    /// `^` and `$` match at line boundaries.
    pub multiline: bool,
    /// `.` matches line terminators.
    pub dot_all: bool,
    /// Unicode-aware character classes.
    pub unicode: bool,
    /// A match anywhere in the value is enough.
    pub partial_match: bool,
}

impl fmt::Display for PatternModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.case_insensitive, "case_insensitive"),
            (self.multiline, "multiline"),
            (self.dot_all, "dot_all"),
            (self.unicode, "unicode"),
            (self.partial_match, "partial_match"),
        ];
        let set: Vec<&str> = flags
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&set.join(", "))
        }
    }
}

/// Payload of a [`CustomRule`], interpreted by the evaluator named by its kind.
#[derive(Debug, Clone)]
pub enum Feature {
    /// The value must match a regular expression.
    Pattern {
        /// The compiled expression, anchored unless partial match is allowed.
        regex: Regex,
        /// The expression as declared.
        source: String,
        /// The declared flags.
        modifier: PatternModifier,
    },
    /// The collection must not contain equal elements.
    Distinct,
    /// The nested record must pass its own validation.
    RecursiveValidate {
        /// Declared message type of the field.
        type_name: String,
    },
    /// The timestamp must lie on the given side of now.
    TimeBound(Time),
    /// A set field requires the companion to be set too.
    FieldCoOccurrence {
        /// The companion field name.
        companion: String,
    },
}

/// Names the evaluator that interprets a [`Feature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomKind {
    /// [`Feature::Pattern`]
    Pattern,
    /// [`Feature::Distinct`]
    Distinct,
    /// [`Feature::RecursiveValidate`]
    RecursiveValidate,
    /// [`Feature::TimeBound`]
    TimeBound,
    /// [`Feature::FieldCoOccurrence`]
    FieldCoOccurrence,
}

/// A named non-comparison constraint on one field.
#[derive(Debug, Clone)]
pub struct CustomRule {
    /// The constrained field.
    pub field: String,
    /// What the evaluator checks.
    pub feature: Feature,
    /// The option the rule came from.
    pub constraint: ConstraintKind,
    /// Message reported when the check fails.
    pub message: ErrorMessage,
    /// Skip the rule when the field holds its default value.
    pub ignored_if_unset: bool,
    /// Apply the rule to each element of a collection.
    pub distribute: bool,
}

impl CustomRule {
    /// The evaluator this rule dispatches to.
    #[must_use]
    pub fn kind(&self) -> CustomKind {
        match self.feature {
            Feature::Pattern { .. } => CustomKind::Pattern,
            Feature::Distinct => CustomKind::Distinct,
            Feature::RecursiveValidate { .. } => CustomKind::RecursiveValidate,
            Feature::TimeBound(_) => CustomKind::TimeBound,
            Feature::FieldCoOccurrence { .. } => CustomKind::FieldCoOccurrence,
        }
    }
}

/// One compiled, immutable constraint.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A field comparison.
    Simple(SimpleRule),
    /// A boolean combination of rules.
    Composite(CompositeRule),
    /// A named check.
    Custom(CustomRule),
}

impl Rule {
    /// The constrained field, or `None` for message-level rules.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Simple(rule) => Some(&rule.field),
            Self::Composite(rule) => rule.field.as_deref(),
            Self::Custom(rule) => Some(&rule.field),
        }
    }

    /// The option the rule came from.
    #[must_use]
    pub fn constraint(&self) -> ConstraintKind {
        match self {
            Self::Simple(rule) => rule.constraint,
            Self::Composite(rule) => rule.constraint,
            Self::Custom(rule) => rule.constraint,
        }
    }

    /// The message reported when the rule fails.
    #[must_use]
    pub fn message(&self) -> &ErrorMessage {
        match self {
            Self::Simple(rule) => &rule.message,
            Self::Composite(rule) => &rule.message,
            Self::Custom(rule) => &rule.message,
        }
    }

    /// Returns true if the rule is skipped for default values.
    #[must_use]
    pub fn ignored_if_unset(&self) -> bool {
        match self {
            Self::Simple(rule) => rule.ignored_if_unset,
            Self::Composite(rule) => rule.ignored_if_unset,
            Self::Custom(rule) => rule.ignored_if_unset,
        }
    }

    /// Returns true if the rule applies per collection element.
    #[must_use]
    pub fn distribute(&self) -> bool {
        match self {
            Self::Simple(rule) => rule.distribute,
            Self::Composite(rule) => rule.distribute,
            Self::Custom(rule) => rule.distribute,
        }
    }
}

/// A field whose non-default value may not be replaced.
#[derive(Debug, Clone)]
pub struct SetOnceField {
    /// The protected field.
    pub field: FieldDescriptor,
    /// Message reported when the value changes.
    pub message: ErrorMessage,
}

static NULL: Value = Value::Null;

/// The compiled constraints of one record type.
///
/// Built once by the compiler and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct MessageValidation {
    type_name: String,
    rules: Vec<Rule>,
    fields: BTreeMap<String, FieldDescriptor>,
    defaults: BTreeMap<String, Value>,
    set_once: Vec<SetOnceField>,
}

impl MessageValidation {
    pub(crate) fn new(
        type_name: String,
        rules: Vec<Rule>,
        fields: &[FieldDescriptor],
        set_once: Vec<SetOnceField>,
    ) -> Self {
        Self {
            type_name,
            rules,
            fields: fields
                .iter()
                .map(|f| (f.name().to_string(), f.clone()))
                .collect(),
            defaults: fields
                .iter()
                .map(|f| (f.name().to_string(), f.default_value()))
                .collect(),
            set_once,
        }
    }

    /// Full name of the validated type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Rules in evaluation order: field rules in field declaration order,
    /// then message-level rules.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Fields checked by [`Validator::check_transition`](crate::Validator::check_transition).
    #[must_use]
    pub fn set_once_fields(&self) -> &[SetOnceField] {
        &self.set_once
    }

    /// Returns true if there is nothing to check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.set_once.is_empty()
    }

    /// The value of `field` in `record`, or the field's default when unset.
    #[must_use]
    pub fn field_value<'a>(&'a self, record: &'a MessageValue, field: &str) -> &'a Value {
        record
            .get(field)
            .or_else(|| self.defaults.get(field))
            .unwrap_or(&NULL)
    }

    /// Look a declared field up by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Declared type of `field`, as a schema would spell it.
    #[must_use]
    pub fn field_type(&self, field: &str) -> String {
        self.fields
            .get(field)
            .map(FieldDescriptor::type_label)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::{Cardinality, FieldKind, PrimitiveKind};

    fn message() -> ErrorMessage {
        ErrorMessage::new("required", "must be set").expect("non-empty")
    }

    #[test]
    fn rule_accessors_are_uniform_across_variants() {
        let simple = Rule::Simple(SimpleRule {
            field: "name".to_string(),
            operator: ComparisonOperator::NotEqual,
            threshold: Value::from(""),
            constraint: ConstraintKind::Required,
            message: message(),
            ignored_if_unset: false,
            distribute: false,
        });
        let composite = Rule::Composite(CompositeRule {
            operator: BooleanOperator::Or,
            operands: vec![simple.clone()],
            field: None,
            constraint: ConstraintKind::RequiredField,
            message: message(),
            ignored_if_unset: false,
            distribute: false,
        });
        let custom = Rule::Custom(CustomRule {
            field: "tags".to_string(),
            feature: Feature::Distinct,
            constraint: ConstraintKind::Distinct,
            message: message(),
            ignored_if_unset: false,
            distribute: false,
        });

        assert_eq!(simple.field(), Some("name"));
        assert_eq!(composite.field(), None);
        assert_eq!(custom.field(), Some("tags"));
        assert_eq!(composite.constraint().rule_id(), "required_field");
    }

    #[test]
    fn field_value_falls_back_to_declared_default() {
        let fields = vec![
            FieldDescriptor::new(
                "acme.Task",
                "tags",
                Cardinality::List,
                FieldKind::Primitive(PrimitiveKind::String),
            ),
            FieldDescriptor::new(
                "acme.Task",
                "title",
                Cardinality::Singular,
                FieldKind::Primitive(PrimitiveKind::String),
            ),
        ];
        let validation = MessageValidation::new("acme.Task".to_string(), Vec::new(), &fields, Vec::new());
        let record = MessageValue::new("acme.Task").with("title", "Write docs");

        assert_eq!(validation.field_value(&record, "title"), &Value::from("Write docs"));
        assert_eq!(validation.field_value(&record, "tags"), &Value::List(Vec::new()));
        assert_eq!(validation.field_value(&record, "missing"), &Value::Null);
        assert_eq!(validation.field_type("tags"), "repeated string");
        assert!(validation.is_empty());
    }

    #[test]
    fn pattern_modifier_lists_enabled_flags() {
        let modifier = PatternModifier {
            case_insensitive: true,
            partial_match: true,
            ..PatternModifier::default()
        };
        assert_eq!(modifier.to_string(), "case_insensitive, partial_match");
        assert_eq!(PatternModifier::default().to_string(), "none");
    }
}
