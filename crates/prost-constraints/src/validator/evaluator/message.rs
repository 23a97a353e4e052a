use crate::rule::{BooleanOperator, ComparisonOperator, MessageValidation, Rule, SimpleRule};
use crate::value::{MessageValue, Value};
use crate::violation::{ConstraintViolation, FieldPath, Subscript};

use super::{EvalContext, Failure, custom, violation};

/// Evaluate every rule of `validation` against `record`.
///
/// Violations come in rule order, then element order for per-element rules.
/// Paths of field rules are `parent_path` extended by the field.
pub(crate) fn validate(
    validation: &MessageValidation,
    record: &MessageValue,
    parent_path: &FieldPath,
    ctx: &EvalContext<'_>,
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    if !ctx.cfg.filter.should_validate(record) {
        return violations;
    }

    for rule in validation.rules() {
        match rule.field() {
            None => {
                if !holds(rule, None, validation, record, ctx) {
                    violations.push(violation(
                        validation,
                        rule,
                        parent_path.clone(),
                        None,
                        Failure::default(),
                    ));
                }
            }
            Some(field) => {
                if let Some(descriptor) = validation.field(field) {
                    if !ctx.cfg.filter.should_validate_field(record, descriptor) {
                        continue;
                    }
                }
                evaluate_field(validation, rule, field, record, parent_path, ctx, &mut violations);
            }
        }
        if ctx.cfg.fail_fast && !violations.is_empty() {
            break;
        }
    }
    violations
}

fn evaluate_field(
    validation: &MessageValidation,
    rule: &Rule,
    field: &str,
    record: &MessageValue,
    parent_path: &FieldPath,
    ctx: &EvalContext<'_>,
    violations: &mut Vec<ConstraintViolation>,
) {
    let value = validation.field_value(record, field);
    if rule.ignored_if_unset() && value.is_default() {
        return;
    }
    let path = parent_path.child(field);

    if !(rule.distribute() && value.is_collection()) {
        if let Some(failure) = check(rule, value, validation, record, ctx) {
            violations.push(violation(validation, rule, path, Some(value), failure));
        }
        return;
    }

    for (subscript, element) in elements(value) {
        if rule.ignored_if_unset() && element.is_default() {
            continue;
        }
        if let Some(failure) = check(rule, element, validation, record, ctx) {
            let element_path = path.with_subscript(subscript);
            violations.push(violation(validation, rule, element_path, Some(element), failure));
            if ctx.cfg.fail_fast {
                return;
            }
        }
    }
}

/// List elements with their index, or map values with their key.
fn elements(value: &Value) -> Vec<(Subscript, &Value)> {
    match value {
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (Subscript::Index(i as u64), item))
            .collect(),
        Value::Map(entries) => entries
            .iter()
            .map(|(key, value)| (Subscript::from_key(key), value))
            .collect(),
        _ => Vec::new(),
    }
}

/// Check one value; `None` means the rule holds.
fn check(
    rule: &Rule,
    value: &Value,
    validation: &MessageValidation,
    record: &MessageValue,
    ctx: &EvalContext<'_>,
) -> Option<Failure> {
    match rule {
        Rule::Custom(custom) => custom::check(custom, value, validation, record, ctx),
        Rule::Simple(_) | Rule::Composite(_) => {
            if holds(rule, Some(value), validation, record, ctx) {
                None
            } else {
                Some(Failure::default())
            }
        }
    }
}

/// Returns true if `rule` holds.
///
/// `value` is the subject of a field rule. Operands of message-level
/// composites resolve their own fields from `record`.
fn holds(
    rule: &Rule,
    value: Option<&Value>,
    validation: &MessageValidation,
    record: &MessageValue,
    ctx: &EvalContext<'_>,
) -> bool {
    match rule {
        Rule::Simple(simple) => {
            let subject = value.unwrap_or_else(|| validation.field_value(record, &simple.field));
            compare(simple, subject)
        }
        Rule::Composite(composite) => {
            let value = if composite.field.is_some() { value } else { None };
            let mut operands = composite.operands.iter();
            match composite.operator {
                BooleanOperator::And => operands.all(|op| holds(op, value, validation, record, ctx)),
                BooleanOperator::Or => operands.any(|op| holds(op, value, validation, record, ctx)),
            }
        }
        Rule::Custom(custom) => {
            let subject = value.unwrap_or_else(|| validation.field_value(record, &custom.field));
            custom::check(custom, subject, validation, record, ctx).is_none()
        }
    }
}

fn compare(rule: &SimpleRule, value: &Value) -> bool {
    let threshold = &rule.threshold;
    match rule.operator {
        ComparisonOperator::Equal => value.same_as(threshold),
        ComparisonOperator::NotEqual => !value.same_as(threshold),
        operator => {
            let Ok(ordering) = value.compare(threshold) else {
                return false;
            };
            match operator {
                ComparisonOperator::Less => ordering.is_lt(),
                ComparisonOperator::LessOrEqual => ordering.is_le(),
                ComparisonOperator::Greater => ordering.is_gt(),
                ComparisonOperator::GreaterOrEqual => ordering.is_ge(),
                ComparisonOperator::Equal | ComparisonOperator::NotEqual => false,
            }
        }
    }
}
