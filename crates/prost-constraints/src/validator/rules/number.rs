use std::cmp::Ordering;

use crate::error::SchemaError;
use crate::options::{BoundOption, RangeOption};
use crate::rule::{BooleanOperator, ComparisonOperator, CompositeRule, ConstraintKind, Rule, SimpleRule};
use crate::schema::PrimitiveKind;
use crate::template::{BOUND_VALUE, ErrorMessage, RANGE_VALUE};
use crate::value::Value;

use super::FieldContext;

const MIN_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` must be greater than or equal to {bound.value}. The passed value: `{field.value}`.";
const MIN_EXCLUSIVE_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` must be greater than {bound.value}. The passed value: `{field.value}`.";
const MAX_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` must be less than or equal to {bound.value}. The passed value: `{field.value}`.";
const MAX_EXCLUSIVE_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` must be less than {bound.value}. The passed value: `{field.value}`.";
const RANGE_MESSAGE: &str =
    "The field `{parent.type}.{field.path}` must be within the range {range.value}. The passed value: `{field.value}`.";

/// Compile `(min)`.
pub(crate) fn min(ctx: &FieldContext<'_>, option: &BoundOption) -> Result<Option<Rule>, SchemaError> {
    let (operator, default) = if option.exclusive {
        (ComparisonOperator::Greater, MIN_EXCLUSIVE_MESSAGE)
    } else {
        (ComparisonOperator::GreaterOrEqual, MIN_MESSAGE)
    };
    bound(ctx, ConstraintKind::Min, option, operator, default).map(Some)
}

/// Compile `(max)`.
pub(crate) fn max(ctx: &FieldContext<'_>, option: &BoundOption) -> Result<Option<Rule>, SchemaError> {
    let (operator, default) = if option.exclusive {
        (ComparisonOperator::Less, MAX_EXCLUSIVE_MESSAGE)
    } else {
        (ComparisonOperator::LessOrEqual, MAX_MESSAGE)
    };
    bound(ctx, ConstraintKind::Max, option, operator, default).map(Some)
}

fn bound(
    ctx: &FieldContext<'_>,
    constraint: ConstraintKind,
    option: &BoundOption,
    operator: ComparisonOperator,
    default: &str,
) -> Result<Rule, SchemaError> {
    let kind = numeric_kind(ctx, constraint)?;
    let threshold = parse_bound(kind, &option.value).ok_or_else(|| SchemaError::InvalidBound {
        option: constraint.rule_id().to_string(),
        field: ctx.qualified_name(),
        bound: option.value.to_string(),
    })?;
    let message = ErrorMessage::custom_or(constraint.rule_id(), option.error_msg.as_deref(), default)?
        .with_param(BOUND_VALUE, declared(&option.value));
    Ok(Rule::Simple(SimpleRule {
        field: ctx.field_name(),
        operator,
        threshold,
        constraint,
        message,
        ignored_if_unset: false,
        distribute: ctx.field.is_collection(),
    }))
}

/// Compile `(range)` into `min AND max` over the same field.
pub(crate) fn range(ctx: &FieldContext<'_>, option: &RangeOption) -> Result<Option<Rule>, SchemaError> {
    let kind = numeric_kind(ctx, ConstraintKind::Range)?;
    let parsed = parse_range(kind, &option.text).map_err(|reason| SchemaError::InvalidRange {
        field: ctx.qualified_name(),
        range: option.text.clone(),
        reason,
    })?;

    let rule_id = ConstraintKind::Range.rule_id();
    let message = ErrorMessage::custom_or(rule_id, option.error_msg.as_deref(), RANGE_MESSAGE)?
        .with_param(RANGE_VALUE, option.text.trim());
    let distribute = ctx.field.is_collection();
    let operand = |operator, threshold| {
        Rule::Simple(SimpleRule {
            field: ctx.field_name(),
            operator,
            threshold,
            constraint: ConstraintKind::Range,
            message: message.clone(),
            ignored_if_unset: false,
            distribute,
        })
    };
    let lower_operator = if parsed.lower_inclusive {
        ComparisonOperator::GreaterOrEqual
    } else {
        ComparisonOperator::Greater
    };
    let upper_operator = if parsed.upper_inclusive {
        ComparisonOperator::LessOrEqual
    } else {
        ComparisonOperator::Less
    };
    let operands = vec![
        operand(lower_operator, parsed.lower),
        operand(upper_operator, parsed.upper),
    ];

    Ok(Some(Rule::Composite(CompositeRule {
        operator: BooleanOperator::And,
        operands,
        field: Some(ctx.field_name()),
        constraint: ConstraintKind::Range,
        message,
        ignored_if_unset: false,
        distribute,
    })))
}

/// The bound as written in the option.
fn declared(bound: &Value) -> String {
    match bound {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}

fn numeric_kind(ctx: &FieldContext<'_>, constraint: ConstraintKind) -> Result<PrimitiveKind, SchemaError> {
    ctx.field
        .kind()
        .as_primitive()
        .filter(|kind| kind.is_numeric())
        .ok_or_else(|| SchemaError::NumericRuleOnNonNumber {
            option: constraint.rule_id().to_string(),
            field: ctx.qualified_name(),
            field_type: ctx.type_label(),
        })
}

/// Interpret a declared bound for a field of `kind`.
///
/// Integer fields take integer bounds only; floating point fields take any
/// number. Bounds of `float` fields are rounded to `f32`, the precision the
/// field values have.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn parse_bound(kind: PrimitiveKind, bound: &Value) -> Option<Value> {
    if kind == PrimitiveKind::Float {
        return match bound {
            Value::String(text) => text.trim().parse::<f32>().ok(),
            other => other.as_f64().map(|n| n as f32),
        }
        .map(|n| Value::Double(f64::from(n)));
    }
    if kind.is_floating_point() {
        return match bound {
            Value::String(text) => text.trim().parse::<f64>().ok().map(Value::Double),
            other => other.as_f64().map(Value::Double),
        };
    }
    match bound {
        Value::Int(_) | Value::UInt(_) => Some(bound.clone()),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Value::Int)
                .or_else(|_| text.parse::<u64>().map(Value::UInt))
                .ok()
        }
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
struct ParsedRange {
    lower: Value,
    lower_inclusive: bool,
    upper: Value,
    upper_inclusive: bool,
}

/// Parse `[a..b)` style range text. `,` is accepted in place of `..`.
fn parse_range(kind: PrimitiveKind, text: &str) -> Result<ParsedRange, String> {
    let text = text.trim();
    let mut chars = text.chars();
    let lower_inclusive = match chars.next() {
        Some('[') => true,
        Some('(') => false,
        _ => return Err("must start with `[` or `(`".to_string()),
    };
    let upper_inclusive = match chars.next_back() {
        Some(']') => true,
        Some(')') => false,
        _ => return Err("must end with `]` or `)`".to_string()),
    };
    let inner = chars.as_str();
    let (lower, upper) = inner
        .split_once("..")
        .or_else(|| inner.split_once(','))
        .ok_or_else(|| "bounds must be separated by `..`".to_string())?;

    let parse = |bound: &str| {
        let bound = bound.trim();
        parse_bound(kind, &Value::String(bound.to_string()))
            .ok_or_else(|| format!("`{bound}` is not a valid {kind:?} bound"))
    };
    let lower = parse(lower)?;
    let upper = parse(upper)?;

    let ordering = lower.compare(&upper).map_err(|err| err.to_string())?;
    let empty = match ordering {
        Ordering::Greater => true,
        Ordering::Equal => !(lower_inclusive && upper_inclusive),
        Ordering::Less => false,
    };
    if empty {
        return Err("the range is empty".to_string());
    }

    Ok(ParsedRange {
        lower,
        lower_inclusive,
        upper,
        upper_inclusive,
    })
}
