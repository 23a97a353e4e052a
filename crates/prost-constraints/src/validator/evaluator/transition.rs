use crate::rule::{ConstraintKind, SetOnceField};
use crate::template::{FIELD_PATH, FIELD_PROPOSED_VALUE, FIELD_TYPE, FIELD_VALUE, PARENT_TYPE, TemplateParams};
use crate::value::MessageValue;
use crate::violation::{ConstraintViolation, FieldPath};

/// Report every set-once field whose non-default value in `previous` is
/// replaced by a different value in `current`.
///
/// Only final field values are compared, so it makes no difference how
/// `current` was produced.
pub(crate) fn check_transition(
    previous: &MessageValue,
    current: &MessageValue,
    fields: &[SetOnceField],
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    for set_once in fields {
        let descriptor = &set_once.field;
        let name = descriptor.name();
        let Some(before) = previous.get(name).filter(|v| !v.is_default()) else {
            continue;
        };
        let after = current
            .get(name)
            .cloned()
            .unwrap_or_else(|| descriptor.default_value());
        if after.identical(before) {
            continue;
        }

        let path = FieldPath::root().child(name);
        let params = TemplateParams::new()
            .with(FIELD_PATH, path.to_string())
            .with(PARENT_TYPE, descriptor.declaring_type())
            .with(FIELD_TYPE, descriptor.type_label())
            .with(FIELD_VALUE, before.to_string())
            .with(FIELD_PROPOSED_VALUE, after.to_string());
        let message = set_once.message.format(&params);
        let mut all = set_once.message.params().clone();
        all.extend(&params);

        violations.push(
            ConstraintViolation::builder(descriptor.declaring_type(), ConstraintKind::SetOnce, message)
                .field_path(path)
                .template(set_once.message.template(), all)
                .field_value(before.clone())
                .build(),
        );
    }
    violations
}
