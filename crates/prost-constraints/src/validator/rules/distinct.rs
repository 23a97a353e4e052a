use crate::error::SchemaError;
use crate::rule::{ConstraintKind, CustomRule, Feature, Rule};
use crate::template::ErrorMessage;

use super::FieldContext;

const DEFAULT_MESSAGE: &str = "The field `{parent.type}.{field.path}` must not contain duplicates. The duplicates found: `{field.duplicates}`.";

/// Compile `(distinct)`. Map fields are checked for duplicate values.
pub(crate) fn compile(ctx: &FieldContext<'_>, enabled: bool) -> Result<Option<Rule>, SchemaError> {
    if !enabled {
        return Ok(None);
    }
    if !ctx.field.is_collection() {
        return Err(SchemaError::DistinctOnNonCollection {
            field: ctx.qualified_name(),
            field_type: ctx.type_label(),
        });
    }
    Ok(Some(Rule::Custom(CustomRule {
        field: ctx.field_name(),
        feature: Feature::Distinct,
        constraint: ConstraintKind::Distinct,
        message: ErrorMessage::new(ConstraintKind::Distinct.rule_id(), DEFAULT_MESSAGE)?,
        ignored_if_unset: false,
        distribute: false,
    })))
}
