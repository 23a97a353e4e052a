use crate::error::SchemaError;
use crate::options::WhenOption;
use crate::rule::{ConstraintKind, CustomRule, Feature, Rule};
use crate::schema::TIMESTAMP_TYPE;
use crate::template::{ErrorMessage, WHEN_IN};

use super::FieldContext;

const DEFAULT_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` must be in the {when.in}. The passed value: `{field.value}`.";

/// Compile `(when)` for a timestamp or repeated timestamp field.
///
/// An undefined time compiles to no rule. The instant compared against is
/// sampled when a record is validated.
pub(crate) fn compile(ctx: &FieldContext<'_>, option: &WhenOption) -> Result<Option<Rule>, SchemaError> {
    let is_timestamp = ctx.field.kind().as_message() == Some(TIMESTAMP_TYPE);
    if !is_timestamp || ctx.field.is_map() {
        return Err(SchemaError::WhenOnNonTimestamp {
            field: ctx.qualified_name(),
            field_type: ctx.type_label(),
        });
    }
    let Some(time) = option.time else {
        return Ok(None);
    };

    let message = ErrorMessage::custom_or(ConstraintKind::When.rule_id(), option.error_msg.as_deref(), DEFAULT_MESSAGE)?
        .with_param(WHEN_IN, time.as_str());
    Ok(Some(Rule::Custom(CustomRule {
        field: ctx.field_name(),
        feature: Feature::TimeBound(time),
        constraint: ConstraintKind::When,
        message,
        ignored_if_unset: true,
        distribute: ctx.field.is_collection(),
    })))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rule::Time;
    use crate::schema::RecordKind;
    use crate::validator::rules::test_support::{schema, with_field};

    #[test]
    fn when_requires_a_timestamp_field() {
        let schema = schema(RecordKind::Plain);
        let option = WhenOption {
            time: Some(Time::Past),
            error_msg: None,
        };
        let rule = with_field(&schema, "when", |ctx| compile(ctx, &option))
            .expect("compiles")
            .expect("rule");
        assert!(rule.ignored_if_unset());
        assert_eq!(rule.message().params().get(WHEN_IN), Some("past"));

        let err = with_field(&schema, "address", |ctx| compile(ctx, &option)).expect_err("not a timestamp");
        assert!(matches!(err, SchemaError::WhenOnNonTimestamp { .. }));
    }

    #[test]
    fn when_applies_to_timestamp_lists_but_not_maps() {
        let schema = schema(RecordKind::Plain);
        let option = WhenOption {
            time: Some(Time::Future),
            error_msg: None,
        };
        let rule = with_field(&schema, "history", |ctx| compile(ctx, &option))
            .expect("compiles")
            .expect("rule");
        assert!(rule.distribute());

        let err = with_field(&schema, "deadlines", |ctx| compile(ctx, &option)).expect_err("map of timestamps");
        assert!(matches!(err, SchemaError::WhenOnNonTimestamp { .. }));
    }

    #[test]
    fn undefined_time_compiles_to_nothing() {
        let schema = schema(RecordKind::Plain);
        let option = WhenOption {
            time: None,
            error_msg: None,
        };
        assert!(with_field(&schema, "when", |ctx| compile(ctx, &option)).expect("compiles").is_none());
    }
}
