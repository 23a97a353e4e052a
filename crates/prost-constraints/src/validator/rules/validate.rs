use crate::error::SchemaError;
use crate::rule::{ConstraintKind, CustomRule, Feature, Rule};
use crate::template::ErrorMessage;

use super::FieldContext;

const DEFAULT_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` of the type `{field.type}` is invalid. The field value: `{field.value}`.";

/// Compile `(validate)` and `(if_invalid)` for a message, repeated message,
/// or map-of-message field.
pub(crate) fn compile(
    ctx: &FieldContext<'_>,
    enabled: bool,
    if_invalid: Option<&str>,
) -> Result<Option<Rule>, SchemaError> {
    if !enabled {
        return Ok(None);
    }
    let Some(type_name) = ctx.field.kind().as_message() else {
        return Err(SchemaError::ValidateOnNonMessage {
            field: ctx.qualified_name(),
            field_type: ctx.type_label(),
        });
    };
    if ctx.schema.get(type_name).is_none() {
        return Err(SchemaError::UnknownType {
            type_name: type_name.to_string(),
        });
    }

    let message = ErrorMessage::custom_or(ConstraintKind::Validate.rule_id(), if_invalid, DEFAULT_MESSAGE)?;
    Ok(Some(Rule::Custom(CustomRule {
        field: ctx.field_name(),
        feature: Feature::RecursiveValidate {
            type_name: type_name.to_string(),
        },
        constraint: ConstraintKind::Validate,
        message,
        ignored_if_unset: true,
        distribute: true,
    })))
}
