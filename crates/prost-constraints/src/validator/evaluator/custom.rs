use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat};
use prost_types::Timestamp;

use crate::rule::{CustomRule, Feature, MessageValidation, Time};
use crate::schema::TIMESTAMP_TYPE;
use crate::template::{FIELD_DUPLICATES, FIELD_VALUE, TemplateParams};
use crate::value::{MessageValue, Value};
use crate::violation::FieldPath;

use super::{EvalContext, Failure, message};

/// Run the evaluator named by the rule's feature; `None` means the rule holds.
pub(crate) fn check(
    rule: &CustomRule,
    value: &Value,
    validation: &MessageValidation,
    record: &MessageValue,
    ctx: &EvalContext<'_>,
) -> Option<Failure> {
    match &rule.feature {
        Feature::Pattern { regex, .. } => {
            let text = value.as_str()?;
            if regex.is_match(text) {
                None
            } else {
                Some(Failure::default())
            }
        }
        Feature::Distinct => distinct(value),
        Feature::RecursiveValidate { type_name } => recursive(value, type_name, ctx),
        Feature::TimeBound(time) => time_bound(value, *time, &ctx.now),
        Feature::FieldCoOccurrence { companion } => {
            if validation.field_value(record, companion).is_default() {
                Some(Failure::default())
            } else {
                None
            }
        }
    }
}

fn distinct(value: &Value) -> Option<Failure> {
    let items: Vec<&Value> = match value {
        Value::List(items) => items.iter().collect(),
        Value::Map(entries) => entries.iter().map(|(_, v)| v).collect(),
        _ => return None,
    };
    let duplicates = duplicates(&items);
    if duplicates.is_empty() {
        return None;
    }
    let rendered = duplicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(Failure {
        params: TemplateParams::new().with(FIELD_DUPLICATES, rendered),
        nested: Vec::new(),
    })
}

/// Hashable key extracted from a scalar `Value` for O(n) duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniqueKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(u64),
    String(String),
    Bytes(Vec<u8>),
    Enum(i32),
}

fn unique_key(value: &Value) -> Option<UniqueKey> {
    match value {
        Value::Bool(v) => Some(UniqueKey::Bool(*v)),
        Value::Int(v) => Some(UniqueKey::Int(*v)),
        Value::UInt(v) => Some(UniqueKey::UInt(*v)),
        Value::Double(v) => Some(UniqueKey::Double(v.to_bits())),
        Value::String(v) => Some(UniqueKey::String(v.clone())),
        Value::Bytes(v) => Some(UniqueKey::Bytes(v.clone())),
        Value::Enum(v) => Some(UniqueKey::Enum(v.number)),
        // Messages and nested collections fall back to pairwise comparison.
        _ => None,
    }
}

/// Values that occur more than once, each reported once, in order of their
/// second occurrence. Both paths use [`Value::identical`].
fn duplicates<'a>(items: &[&'a Value]) -> Vec<&'a Value> {
    let keys: Option<Vec<UniqueKey>> = items.iter().map(|v| unique_key(v)).collect();
    if let Some(keys) = keys {
        let mut seen = HashSet::with_capacity(keys.len());
        let mut reported = HashSet::new();
        return keys
            .into_iter()
            .zip(items)
            .filter(|(key, _)| !seen.insert(key.clone()) && reported.insert(key.clone()))
            .map(|(_, item)| *item)
            .collect();
    }

    let mut found: Vec<&Value> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let repeated = items[..i].iter().any(|earlier| earlier.identical(item));
        if repeated && !found.iter().any(|reported| reported.identical(item)) {
            found.push(*item);
        }
    }
    found
}

fn recursive(value: &Value, declared: &str, ctx: &EvalContext<'_>) -> Option<Failure> {
    let nested = value.as_message()?;
    let type_name = if nested.type_name().is_empty() {
        declared
    } else {
        nested.type_name()
    };
    let Some(validation) = ctx.table.get(type_name) else {
        tracing::debug!(type_name = %type_name, "no compiled validation for nested record");
        return None;
    };
    let violations = message::validate(validation, nested, &FieldPath::root(), ctx);
    if violations.is_empty() {
        None
    } else {
        Some(Failure {
            params: TemplateParams::new(),
            nested: violations,
        })
    }
}

fn time_bound(value: &Value, time: Time, now: &Timestamp) -> Option<Failure> {
    let ts = timestamp(value.as_message()?)?;
    let ordering = (ts.seconds, ts.nanos).cmp(&(now.seconds, now.nanos));
    let holds = match time {
        Time::Past => ordering == Ordering::Less,
        Time::Future => ordering == Ordering::Greater,
    };
    if holds {
        return None;
    }
    let mut params = TemplateParams::new();
    if let Some(rendered) = rfc3339(&ts) {
        params.insert(FIELD_VALUE, rendered);
    }
    Some(Failure {
        params,
        nested: Vec::new(),
    })
}

fn timestamp(message: &MessageValue) -> Option<Timestamp> {
    if message.type_name() != TIMESTAMP_TYPE {
        return None;
    }
    let seconds = message.get("seconds").and_then(Value::as_i64).unwrap_or(0);
    let nanos = message
        .get("nanos")
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0);
    Some(Timestamp { seconds, nanos })
}

fn rfc3339(ts: &Timestamp) -> Option<String> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn timestamp_value(seconds: i64) -> Value {
        Value::Message(MessageValue::new(TIMESTAMP_TYPE).with("seconds", seconds))
    }

    #[test]
    fn duplicates_are_reported_once_each() {
        let values = [Value::from("a"), Value::from("b"), Value::from("a"), Value::from("a"), Value::from("b")];
        let items: Vec<&Value> = values.iter().collect();
        assert_eq!(duplicates(&items), vec![&Value::from("a"), &Value::from("b")]);
    }

    #[test]
    fn structurally_equal_messages_are_duplicates() {
        let address = |town: &str| Value::Message(MessageValue::new("acme.Address").with("town", town));
        let values = [address("Lviv"), address("Kyiv"), address("Lviv")];
        let items: Vec<&Value> = values.iter().collect();
        assert_eq!(duplicates(&items), vec![&address("Lviv")]);

        let distinct_values = [address("Lviv"), address("Kyiv")];
        let items: Vec<&Value> = distinct_values.iter().collect();
        assert!(duplicates(&items).is_empty());
    }

    #[test]
    fn doubles_repeat_by_bit_pattern_on_both_paths() {
        let values = [Value::Double(f64::NAN), Value::Double(0.0), Value::Double(-0.0), Value::Double(f64::NAN)];
        let items: Vec<&Value> = values.iter().collect();
        let found = duplicates(&items);
        assert_eq!(found.len(), 1);
        assert!(found[0].identical(&Value::Double(f64::NAN)));

        let reading = |sample: f64| {
            Value::Message(MessageValue::new("acme.Reading").with("samples", Value::List(vec![Value::Double(sample)])))
        };
        let values = [reading(f64::NAN), reading(0.0), reading(-0.0), reading(f64::NAN)];
        let items: Vec<&Value> = values.iter().collect();
        let found = duplicates(&items);
        assert_eq!(found.len(), 1);
        assert!(found[0].identical(&reading(f64::NAN)));
    }

    #[test]
    fn map_duplicates_are_looked_for_among_values() {
        let map = Value::map(vec![
            (Value::from("x"), Value::Int(1)),
            (Value::from("y"), Value::Int(1)),
        ]);
        let failure = distinct(&map).expect("values repeat");
        assert_eq!(failure.params.get(FIELD_DUPLICATES), Some("1"));

        let keys_only = Value::map(vec![
            (Value::from("x"), Value::Int(1)),
            (Value::from("y"), Value::Int(2)),
        ]);
        assert!(distinct(&keys_only).is_none());
    }

    #[test]
    fn time_bound_compares_against_now() {
        let now = Timestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        };
        assert!(time_bound(&timestamp_value(1_600_000_000), Time::Past, &now).is_none());
        assert!(time_bound(&timestamp_value(1_800_000_000), Time::Future, &now).is_none());

        let failure = time_bound(&timestamp_value(1_800_000_000), Time::Past, &now).expect("in the future");
        assert_eq!(failure.params.get(FIELD_VALUE), Some("2027-01-15T08:00:00Z"));

        assert!(time_bound(&timestamp_value(1_700_000_000), Time::Future, &now).is_some());
    }
}
