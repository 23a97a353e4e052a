pub(crate) mod custom;
pub(crate) mod message;
pub(crate) mod transition;

use prost_types::Timestamp;

use crate::config::ValidationConfig;
use crate::rule::{MessageValidation, Rule};
use crate::template::{FIELD_PATH, FIELD_TYPE, FIELD_VALUE, PARENT_TYPE, TemplateParams};
use crate::value::Value;
use crate::violation::{ConstraintViolation, FieldPath};

use super::builder::ValidationTable;

/// Everything a single `validate` call shares across records.
pub(crate) struct EvalContext<'a> {
    pub table: &'a ValidationTable,
    pub cfg: &'a ValidationConfig,
    /// Sampled once per call so every `(when)` rule sees the same instant.
    pub now: Timestamp,
}

impl<'a> EvalContext<'a> {
    pub fn new(table: &'a ValidationTable, cfg: &'a ValidationConfig) -> Self {
        Self {
            table,
            cfg,
            now: (cfg.now_fn)(),
        }
    }
}

/// What a failed check adds to the violation.
#[derive(Debug, Default)]
pub(crate) struct Failure {
    pub params: TemplateParams,
    pub nested: Vec<ConstraintViolation>,
}

/// Build the violation of `rule` at `path`.
pub(crate) fn violation(
    validation: &MessageValidation,
    rule: &Rule,
    path: FieldPath,
    value: Option<&Value>,
    failure: Failure,
) -> ConstraintViolation {
    let mut params = TemplateParams::new()
        .with(FIELD_PATH, path.to_string())
        .with(PARENT_TYPE, validation.type_name());
    if let Some(field) = rule.field() {
        params.insert(FIELD_TYPE, validation.field_type(field));
    }
    if let Some(value) = value {
        params.insert(FIELD_VALUE, value.to_string());
    }
    params.extend(&failure.params);

    let message = rule.message();
    let text = message.format(&params);
    let mut all = message.params().clone();
    all.extend(&params);

    let mut builder = ConstraintViolation::builder(validation.type_name(), rule.constraint(), text)
        .field_path(path)
        .template(message.template(), all)
        .nested(failure.nested);
    if let Some(value) = value {
        builder = builder.field_value(value.clone());
    }
    builder.build()
}
