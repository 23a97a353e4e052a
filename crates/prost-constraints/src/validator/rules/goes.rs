use crate::error::SchemaError;
use crate::options::GoesOption;
use crate::rule::{ConstraintKind, CustomRule, Feature, Rule};
use crate::schema::FieldDescriptor;
use crate::template::{ErrorMessage, GOES_COMPANION};
use crate::value::extract_unset_sentinel;

use super::FieldContext;

const DEFAULT_MESSAGE: &str =
    "The field `{goes.companion}` must also be set when `{field.path}` is set in `{parent.type}`.";

/// Compile `(goes)`: when the field is set, the companion must be set too.
///
/// Both fields must be able to report presence.
pub(crate) fn compile(ctx: &FieldContext<'_>, option: &GoesOption) -> Result<Option<Rule>, SchemaError> {
    let Some(companion) = ctx.declaring.get_field(&option.with) else {
        return Err(SchemaError::UnknownField {
            type_name: ctx.declaring.name().to_string(),
            field: option.with.clone(),
        });
    };
    for field in [ctx.field, companion] {
        check_presence(ctx, companion, field)?;
    }

    let message = ErrorMessage::custom_or(ConstraintKind::Goes.rule_id(), option.error_msg.as_deref(), DEFAULT_MESSAGE)?
        .with_param(GOES_COMPANION, companion.name());
    Ok(Some(Rule::Custom(CustomRule {
        field: ctx.field_name(),
        feature: Feature::FieldCoOccurrence {
            companion: companion.name().to_string(),
        },
        constraint: ConstraintKind::Goes,
        message,
        ignored_if_unset: true,
        distribute: false,
    })))
}

fn check_presence(
    ctx: &FieldContext<'_>,
    companion: &FieldDescriptor,
    field: &FieldDescriptor,
) -> Result<(), SchemaError> {
    if extract_unset_sentinel(field).is_some() {
        return Ok(());
    }
    Err(SchemaError::UnsupportedGoes {
        field: ctx.qualified_name(),
        companion: companion.name().to_string(),
        offender: field.name().to_string(),
        field_type: field.type_label(),
    })
}
