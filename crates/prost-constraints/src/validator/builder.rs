use std::collections::{BTreeMap, BTreeSet};

use crate::error::SchemaError;
use crate::options::{
    BoundOption, DiscoveredOption, FlagOption, GoesOption, OptionKind, OptionTarget, PatternOption,
    RangeOption, WhenOption,
};
use crate::rule::{MessageValidation, Rule};
use crate::schema::{Schema, TypeDescriptor};

use super::rules::{self, FieldContext};

/// Compiled validations of every type in a schema, keyed by full type name.
///
/// Read-only once built; evaluators receive it by reference.
#[derive(Debug, Clone, Default)]
pub struct ValidationTable {
    types: BTreeMap<String, MessageValidation>,
}

impl ValidationTable {
    /// The validation of `type_name`.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&MessageValidation> {
        self.types.get(type_name)
    }

    /// All validations, ordered by type name.
    pub fn iter(&self) -> impl Iterator<Item = &MessageValidation> {
        self.types.values()
    }

    /// Number of compiled types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type was compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Options of one field, at most one of each kind.
#[derive(Debug, Default)]
pub(crate) struct FieldOptions {
    required: Option<bool>,
    if_missing: Option<String>,
    range: Option<RangeOption>,
    min: Option<BoundOption>,
    max: Option<BoundOption>,
    pattern: Option<PatternOption>,
    distinct: bool,
    validate: bool,
    if_invalid: Option<String>,
    when: Option<WhenOption>,
    goes: Option<GoesOption>,
    set_once: Option<FlagOption>,
}

impl FieldOptions {
    fn set(&mut self, kind: OptionKind) {
        match kind {
            OptionKind::Required(v) => self.required = Some(v),
            OptionKind::IfMissing(v) => self.if_missing = v,
            OptionKind::Range(v) => self.range = Some(v),
            OptionKind::Min(v) => self.min = Some(v),
            OptionKind::Max(v) => self.max = Some(v),
            OptionKind::Pattern(v) => self.pattern = Some(v),
            OptionKind::Distinct(v) => self.distinct = v,
            OptionKind::Validate(v) => self.validate = v,
            OptionKind::IfInvalid(v) => self.if_invalid = v,
            OptionKind::When(v) => self.when = Some(v),
            OptionKind::Goes(v) => self.goes = Some(v),
            OptionKind::SetOnce(v) => self.set_once = Some(v),
            OptionKind::RequiredField(_) => {}
        }
    }
}

/// Options of one type: per-field options and message-level ones.
#[derive(Debug, Default)]
pub(crate) struct TypeOptions {
    fields: BTreeMap<String, FieldOptions>,
    required_field: Option<String>,
}

/// Compile every type of `schema` against the discovered options.
///
/// Options are first grouped per type and field, then each type is compiled
/// once over its complete option list.
pub(crate) fn compile(schema: &Schema, options: &[DiscoveredOption]) -> Result<ValidationTable, SchemaError> {
    let mut collected = collect(schema, options)?;
    let mut types = BTreeMap::new();
    for descriptor in schema.types() {
        let type_options = collected.remove(descriptor.name()).unwrap_or_default();
        let validation = compile_type(schema, descriptor, &type_options)?;
        tracing::debug!(
            type_name = %descriptor.name(),
            rules = validation.rules().len(),
            set_once = validation.set_once_fields().len(),
            "compiled message validation"
        );
        types.insert(descriptor.name().to_string(), validation);
    }
    Ok(ValidationTable { types })
}

fn collect(schema: &Schema, options: &[DiscoveredOption]) -> Result<BTreeMap<String, TypeOptions>, SchemaError> {
    let mut seen = BTreeSet::new();
    let mut collected: BTreeMap<String, TypeOptions> = BTreeMap::new();

    for option in options {
        let Some(kind) = OptionKind::parse(option)? else {
            continue;
        };
        let type_name = option.target.type_name();
        let Some(descriptor) = schema.get(type_name) else {
            return Err(SchemaError::UnknownType {
                type_name: type_name.to_string(),
            });
        };
        if !seen.insert((option.target.clone(), option.name.clone())) {
            return Err(SchemaError::DuplicateOption {
                option: option.name.clone(),
                target: option.target.to_string(),
            });
        }

        let type_options = collected.entry(type_name.to_string()).or_default();
        match (&option.target, kind) {
            (OptionTarget::Message { .. }, OptionKind::RequiredField(expression)) => {
                type_options.required_field = Some(expression);
            }
            (OptionTarget::Field { field, .. }, kind) if !kind.is_message_level() => {
                if descriptor.get_field(field).is_none() {
                    return Err(SchemaError::UnknownField {
                        type_name: type_name.to_string(),
                        field: field.clone(),
                    });
                }
                type_options.fields.entry(field.clone()).or_default().set(kind);
            }
            _ => {
                return Err(SchemaError::MisplacedOption {
                    option: option.name.clone(),
                    target: option.target.to_string(),
                });
            }
        }
    }
    Ok(collected)
}

/// Compile one type. Field rules come in field declaration order, each field
/// contributing required, range, min, max, pattern, distinct, validate, when,
/// and goes in that order; message-level rules follow.
fn compile_type(
    schema: &Schema,
    declaring: &TypeDescriptor,
    options: &TypeOptions,
) -> Result<MessageValidation, SchemaError> {
    let none = FieldOptions::default();
    let mut compiled = Vec::new();
    let mut set_once = Vec::new();

    for (index, field) in declaring.fields().iter().enumerate() {
        let ctx = FieldContext {
            schema,
            declaring,
            field,
            index,
        };
        let opts = options.fields.get(field.name()).unwrap_or(&none);

        push(&mut compiled, rules::required::compile(&ctx, opts.required, opts.if_missing.as_deref())?);
        if let Some(range) = &opts.range {
            push(&mut compiled, rules::number::range(&ctx, range)?);
        }
        if let Some(min) = &opts.min {
            push(&mut compiled, rules::number::min(&ctx, min)?);
        }
        if let Some(max) = &opts.max {
            push(&mut compiled, rules::number::max(&ctx, max)?);
        }
        if let Some(pattern) = &opts.pattern {
            push(&mut compiled, rules::pattern::compile(&ctx, pattern)?);
        }
        push(&mut compiled, rules::distinct::compile(&ctx, opts.distinct)?);
        push(
            &mut compiled,
            rules::validate::compile(&ctx, opts.validate, opts.if_invalid.as_deref())?,
        );
        if let Some(when) = &opts.when {
            push(&mut compiled, rules::when::compile(&ctx, when)?);
        }
        if let Some(goes) = &opts.goes {
            push(&mut compiled, rules::goes::compile(&ctx, goes)?);
        }
        if let Some(option) = &opts.set_once {
            set_once.extend(rules::set_once::compile(&ctx, option)?);
        }
    }

    if let Some(expression) = &options.required_field {
        push(&mut compiled, rules::required_field::compile(declaring, expression)?);
    }

    Ok(MessageValidation::new(
        declaring.name().to_string(),
        compiled,
        declaring.fields(),
        set_once,
    ))
}

fn push(rules: &mut Vec<Rule>, rule: Option<Rule>) {
    rules.extend(rule);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rule::ConstraintKind;
    use crate::schema::{FieldKind, PrimitiveKind, RecordKind};
    use crate::value::{MessageValue, Value};

    fn schema() -> Schema {
        let string = || FieldKind::Primitive(PrimitiveKind::String);
        Schema::new()
            .with_type(
                TypeDescriptor::new("acme.CreateTask")
                    .with_kind(RecordKind::Command)
                    .singular("id", string())
                    .singular("title", string())
                    .singular("priority", FieldKind::Primitive(PrimitiveKind::Int32))
                    .list("tags", string())
                    .singular("assignee", FieldKind::message("acme.User")),
            )
            .with_type(TypeDescriptor::new("acme.User").singular("email", string()))
    }

    fn constraints(table: &ValidationTable, type_name: &str) -> Vec<(Option<String>, ConstraintKind)> {
        table
            .get(type_name)
            .expect("compiled type")
            .rules()
            .iter()
            .map(|rule| (rule.field().map(str::to_string), rule.constraint()))
            .collect()
    }

    #[test]
    fn rules_follow_field_order_then_option_order() {
        let options = vec![
            DiscoveredOption::message("acme.CreateTask", "required_field", "title | tags"),
            DiscoveredOption::field("acme.CreateTask", "tags", "distinct", true),
            DiscoveredOption::field("acme.CreateTask", "priority", "max", 5),
            DiscoveredOption::field("acme.CreateTask", "priority", "range", "[0..10]"),
            DiscoveredOption::field("acme.CreateTask", "title", "pattern", "[A-Z].*"),
            DiscoveredOption::field("acme.CreateTask", "assignee", "validate", true),
        ];
        let table = compile(&schema(), &options).expect("compiles");
        let field = |name: &str| Some(name.to_string());
        assert_eq!(
            constraints(&table, "acme.CreateTask"),
            vec![
                (field("id"), ConstraintKind::Required),
                (field("title"), ConstraintKind::Pattern),
                (field("priority"), ConstraintKind::Range),
                (field("priority"), ConstraintKind::Max),
                (field("tags"), ConstraintKind::Distinct),
                (field("assignee"), ConstraintKind::Validate),
                (None, ConstraintKind::RequiredField),
            ]
        );
        assert!(table.get("acme.User").expect("compiled type").is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unrecognised_options_are_ignored() {
        let options = vec![DiscoveredOption::field("acme.User", "email", "deprecated", true)];
        let table = compile(&schema(), &options).expect("compiles");
        assert!(table.get("acme.User").expect("compiled type").is_empty());
    }

    #[test]
    fn misplaced_duplicate_and_unknown_targets_are_schema_errors() {
        let misplaced = vec![DiscoveredOption::field("acme.User", "email", "required_field", "email")];
        assert!(matches!(
            compile(&schema(), &misplaced),
            Err(SchemaError::MisplacedOption { .. })
        ));

        let on_message = vec![DiscoveredOption::message("acme.User", "required", true)];
        assert!(matches!(
            compile(&schema(), &on_message),
            Err(SchemaError::MisplacedOption { .. })
        ));

        let duplicate = vec![
            DiscoveredOption::field("acme.User", "email", "required", true),
            DiscoveredOption::field("acme.User", "email", "required", false),
        ];
        assert!(matches!(
            compile(&schema(), &duplicate),
            Err(SchemaError::DuplicateOption { .. })
        ));

        let unknown_type = vec![DiscoveredOption::field("acme.Missing", "email", "required", true)];
        assert!(matches!(
            compile(&schema(), &unknown_type),
            Err(SchemaError::UnknownType { .. })
        ));

        let unknown_field = vec![DiscoveredOption::field("acme.User", "phone", "required", true)];
        assert!(matches!(
            compile(&schema(), &unknown_field),
            Err(SchemaError::UnknownField { .. })
        ));
    }

    #[test]
    fn misapplied_option_fails_compilation() {
        let options = vec![DiscoveredOption::field("acme.CreateTask", "priority", "required", true)];
        let err = compile(&schema(), &options).expect_err("numbers cannot be required");
        assert_eq!(
            err,
            SchemaError::UnsupportedRequired {
                field: "acme.CreateTask.priority".to_string(),
                field_type: "int32".to_string(),
            }
        );
    }

    #[test]
    fn set_once_fields_are_kept_outside_the_rule_list() {
        let options = vec![
            DiscoveredOption::field("acme.CreateTask", "priority", "set_once", true),
            DiscoveredOption::field("acme.CreateTask", "tags", "set_once", true),
        ];
        let table = compile(&schema(), &options).expect("compiles");
        let validation = table.get("acme.CreateTask").expect("compiled type");
        let names: Vec<&str> = validation.set_once_fields().iter().map(|f| f.field.name()).collect();
        assert_eq!(names, vec!["priority"]);
        assert_eq!(validation.rules().len(), 1);

        let record = MessageValue::new("acme.CreateTask");
        assert_eq!(validation.field_value(&record, "priority"), &Value::Int(0));
    }
}
