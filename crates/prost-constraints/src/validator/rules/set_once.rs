use crate::error::SchemaError;
use crate::options::FlagOption;
use crate::rule::{ConstraintKind, SetOnceField};
use crate::template::ErrorMessage;

use super::FieldContext;

pub(crate) const DEFAULT_MESSAGE: &str = "The field `{parent.type}.{field.path}` already has a non-default value and cannot be reassigned. The current value is `{field.value}`, the proposed value is `{field.proposed_value}`.";

/// Compile `(set_once)`.
///
/// Collections are exempt: the option is logged and ignored for them.
pub(crate) fn compile(ctx: &FieldContext<'_>, option: &FlagOption) -> Result<Option<SetOnceField>, SchemaError> {
    if !option.enabled {
        return Ok(None);
    }
    if ctx.field.is_collection() {
        tracing::warn!(
            field = %ctx.qualified_name(),
            field_type = %ctx.type_label(),
            "`(set_once)` does not apply to repeated and map fields, ignoring"
        );
        return Ok(None);
    }
    let message = ErrorMessage::custom_or(
        ConstraintKind::SetOnce.rule_id(),
        option.error_msg.as_deref(),
        DEFAULT_MESSAGE,
    )?;
    Ok(Some(SetOnceField {
        field: ctx.field.clone(),
        message,
    }))
}
