use crate::error::SchemaError;
use crate::rule::{BooleanOperator, ComparisonOperator, CompositeRule, ConstraintKind, Rule, SimpleRule};
use crate::schema::TypeDescriptor;
use crate::template::{ErrorMessage, REQUIRED_FIELD_EXPRESSION};
use crate::validator::expression::RequiredFieldExpression;

const DEFAULT_MESSAGE: &str = "The message `{parent.type}` must have at least one of the following field combinations set: `{required_field.expression}`.";

/// Compile the message-level `(required_field)` expression of `declaring`.
///
/// The result is `OR` over `AND` groups of "field is not default" checks.
pub(crate) fn compile(declaring: &TypeDescriptor, expression: &str) -> Result<Option<Rule>, SchemaError> {
    let Some(parsed) = RequiredFieldExpression::parse(declaring.name(), expression)? else {
        return Ok(None);
    };
    let rule_id = ConstraintKind::RequiredField.rule_id();
    let message = ErrorMessage::new(rule_id, DEFAULT_MESSAGE)?.with_param(REQUIRED_FIELD_EXPRESSION, parsed.source.clone());

    let mut alternatives = Vec::with_capacity(parsed.groups.len());
    for group in &parsed.groups {
        let mut operands = Vec::with_capacity(group.len());
        for name in group {
            let Some(field) = declaring.get_field(name) else {
                return Err(SchemaError::UnknownField {
                    type_name: declaring.name().to_string(),
                    field: name.clone(),
                });
            };
            operands.push(Rule::Simple(SimpleRule {
                field: name.clone(),
                operator: ComparisonOperator::NotEqual,
                threshold: field.default_value(),
                constraint: ConstraintKind::RequiredField,
                message: message.clone(),
                ignored_if_unset: false,
                distribute: false,
            }));
        }
        alternatives.push(Rule::Composite(CompositeRule {
            operator: BooleanOperator::And,
            operands,
            field: None,
            constraint: ConstraintKind::RequiredField,
            message: message.clone(),
            ignored_if_unset: false,
            distribute: false,
        }));
    }

    Ok(Some(Rule::Composite(CompositeRule {
        operator: BooleanOperator::Or,
        operands: alternatives,
        field: None,
        constraint: ConstraintKind::RequiredField,
        message,
        ignored_if_unset: false,
        distribute: false,
    })))
}
