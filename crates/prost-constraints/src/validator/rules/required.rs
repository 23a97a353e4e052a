use crate::error::SchemaError;
use crate::rule::{ComparisonOperator, ConstraintKind, Rule, SimpleRule};
use crate::template::ErrorMessage;
use crate::value::extract_unset_sentinel;

use super::FieldContext;

pub(crate) const DEFAULT_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` of the type `{field.type}` must have a non-default value.";

/// Compile `(required)` and `(if_missing)` for one field.
///
/// `explicit` is the declared option value. Without one, the first field of an
/// entity, command, event, or rejection is its identifier and is required.
///
/// The value must differ from the field's unset sentinel, so a required list
/// or map needs at least one entry. Entries are not inspected: a repeated enum
/// holding only zero tags is not empty.
pub(crate) fn compile(
    ctx: &FieldContext<'_>,
    explicit: Option<bool>,
    if_missing: Option<&str>,
) -> Result<Option<Rule>, SchemaError> {
    let implicit = ctx.index == 0 && ctx.declaring.kind().first_field_required();
    if !explicit.unwrap_or(implicit) {
        return Ok(None);
    }

    let Some(sentinel) = extract_unset_sentinel(ctx.field) else {
        if explicit.is_none() {
            tracing::debug!(
                field = %ctx.qualified_name(),
                field_type = %ctx.type_label(),
                "numeric identifier cannot be checked for presence, skipping implicit requirement"
            );
            return Ok(None);
        }
        return Err(SchemaError::UnsupportedRequired {
            field: ctx.qualified_name(),
            field_type: ctx.type_label(),
        });
    };

    let message = ErrorMessage::custom_or(
        ConstraintKind::Required.rule_id(),
        if_missing,
        DEFAULT_MESSAGE,
    )?;

    Ok(Some(Rule::Simple(SimpleRule {
        field: ctx.field_name(),
        operator: ComparisonOperator::NotEqual,
        threshold: sentinel,
        constraint: ConstraintKind::Required,
        message,
        ignored_if_unset: false,
        distribute: false,
    })))
}
