use regex::RegexBuilder;

use crate::error::SchemaError;
use crate::options::PatternOption;
use crate::rule::{ConstraintKind, CustomRule, Feature, Rule};
use crate::schema::PrimitiveKind;
use crate::template::{ErrorMessage, REGEX_MODIFIERS, REGEX_PATTERN};

use super::FieldContext;

const DEFAULT_MESSAGE: &str = "The field `{parent.type}.{field.path}` must match the regular expression `{regex.pattern}` (modifiers: {regex.modifiers}). The passed value: `{field.value}`.";

/// Compile `(pattern)` for a string or repeated string field.
pub(crate) fn compile(ctx: &FieldContext<'_>, option: &PatternOption) -> Result<Option<Rule>, SchemaError> {
    if ctx.field.kind().as_primitive() != Some(PrimitiveKind::String) {
        return Err(SchemaError::PatternOnNonString {
            field: ctx.qualified_name(),
            field_type: ctx.type_label(),
        });
    }

    let modifier = option.modifier;
    let anchored = if modifier.partial_match {
        option.regex.clone()
    } else {
        format!("^(?:{})$", option.regex)
    };
    // Character classes of `regex` are always Unicode-aware, so the unicode
    // flag needs no translation.
    let regex = RegexBuilder::new(&anchored)
        .case_insensitive(modifier.case_insensitive)
        .multi_line(modifier.multiline)
        .dot_matches_new_line(modifier.dot_all)
        .build()
        .map_err(|err| SchemaError::InvalidPattern {
            field: ctx.qualified_name(),
            reason: err.to_string(),
        })?;

    let message = ErrorMessage::custom_or(
        ConstraintKind::Pattern.rule_id(),
        option.error_msg.as_deref(),
        DEFAULT_MESSAGE,
    )?
    .with_param(REGEX_PATTERN, escape_line_separators(&option.regex))
    .with_param(REGEX_MODIFIERS, modifier.to_string());

    Ok(Some(Rule::Custom(CustomRule {
        field: ctx.field_name(),
        feature: Feature::Pattern {
            regex,
            source: option.regex.clone(),
            modifier,
        },
        constraint: ConstraintKind::Pattern,
        message,
        ignored_if_unset: true,
        distribute: ctx.field.is_collection(),
    })))
}

/// Keeps a pattern on one line when it is embedded in a message.
fn escape_line_separators(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}
