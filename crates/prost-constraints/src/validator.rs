use prost_reflect::{DescriptorPool, ReflectMessage};

use crate::config::{ValidationConfig, ValidationOption, ValidatorOption};
use crate::error::{Error, RuntimeError, SchemaError, ValidationError};
use crate::options::DiscoveredOption;
use crate::reflect;
use crate::rule::MessageValidation;
use crate::schema::Schema;
use crate::value::MessageValue;
use crate::violation::{ConstraintViolation, FieldPath};

mod builder;
mod evaluator;
mod expression;
mod rules;

pub use builder::ValidationTable;

use evaluator::{EvalContext, message, transition};

/// Validates records against the rules compiled from a schema's options.
///
/// All rules are compiled up front, so an authoring mistake surfaces from the
/// constructor and never from [`Validator::validate`]. A `Validator` is
/// immutable afterwards and can be shared across threads.
pub struct Validator {
    table: ValidationTable,
    config: ValidationConfig,
}

impl Validator {
    /// Compile `options` against `schema` with default settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found while compiling.
    pub fn new(schema: &Schema, options: &[DiscoveredOption]) -> Result<Self, SchemaError> {
        Self::with_options(schema, options, &[])
    }

    /// Compile `options` against `schema` with the given validator settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found while compiling.
    pub fn with_options(
        schema: &Schema,
        options: &[DiscoveredOption],
        settings: &[ValidatorOption],
    ) -> Result<Self, SchemaError> {
        let table = builder::compile(schema, options)?;
        Ok(Self {
            table,
            config: ValidationConfig::from_options(settings),
        })
    }

    /// Compile every type of `pool` with the options its descriptors declare.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found while compiling.
    pub fn from_pool(pool: &DescriptorPool, settings: &[ValidatorOption]) -> Result<Self, SchemaError> {
        let schema = reflect::schema_from_pool(pool);
        let options = reflect::discover_options(pool);
        Self::with_options(&schema, &options, settings)
    }

    /// The compiled rules, per type.
    #[must_use]
    pub fn table(&self) -> &ValidationTable {
        &self.table
    }

    /// Validate a record against the rules of its type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every violation found, or
    /// [`Error::Runtime`] if the record's type was never compiled.
    pub fn validate(&self, record: &MessageValue) -> Result<(), Error> {
        self.validate_with(record, &[])
    }

    /// Validate a record with per-call options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every violation found, or
    /// [`Error::Runtime`] if the record's type was never compiled.
    pub fn validate_with(&self, record: &MessageValue, options: &[ValidationOption]) -> Result<(), Error> {
        let validation = self.validation(record)?;
        let cfg = self.config.with_call_options(options);
        let ctx = EvalContext::new(&self.table, &cfg);
        let violations = message::validate(validation, record, &FieldPath::root(), &ctx);
        into_result(violations)
    }

    /// Validate a prost message, generated or dynamic.
    ///
    /// # Errors
    ///
    /// See [`Validator::validate`].
    pub fn validate_message<M: ReflectMessage>(&self, msg: &M) -> Result<(), Error> {
        self.validate_message_with(msg, &[])
    }

    /// Validate a prost message with per-call options.
    ///
    /// # Errors
    ///
    /// See [`Validator::validate`].
    pub fn validate_message_with<M: ReflectMessage>(
        &self,
        msg: &M,
        options: &[ValidationOption],
    ) -> Result<(), Error> {
        let dynamic = msg.transcode_to_dynamic();
        let record = reflect::value_from_message(&dynamic);
        self.validate_with(&record, options)
    }

    /// Check that `current` keeps every `(set_once)` field that `previous`
    /// had already set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing each reassigned field, or
    /// [`Error::Runtime`] if the two records differ in type or the type was
    /// never compiled.
    pub fn check_transition(&self, previous: &MessageValue, current: &MessageValue) -> Result<(), Error> {
        if previous.type_name() != current.type_name() {
            return Err(RuntimeError {
                cause: format!(
                    "cannot compare a `{}` record with a `{}` record",
                    previous.type_name(),
                    current.type_name()
                ),
            }
            .into());
        }
        let validation = self.validation(current)?;
        into_result(transition::check_transition(
            previous,
            current,
            validation.set_once_fields(),
        ))
    }

    fn validation(&self, record: &MessageValue) -> Result<&MessageValidation, RuntimeError> {
        self.table.get(record.type_name()).ok_or_else(|| RuntimeError {
            cause: format!("no compiled validation for type `{}`", record.type_name()),
        })
    }
}

fn into_result(violations: Vec<ConstraintViolation>) -> Result<(), Error> {
    match ValidationError::from_violations(violations) {
        Some(err) => Err(Error::Validation(err)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use prost_reflect::{DynamicMessage, Value as ReflectValue};
    use prost_types::Timestamp;

    use super::*;
    use crate::config::{Filter, NowFn};
    use crate::reflect::fixture;
    use crate::rule::ConstraintKind;
    use crate::schema::TIMESTAMP_TYPE;
    use crate::template::FIELD_DUPLICATES;
    use crate::value::Value;

    const NOW: i64 = 1_700_000_000;

    fn fixed_now(seconds: i64) -> NowFn {
        Arc::new(move || Timestamp { seconds, nanos: 0 })
    }

    fn validator() -> Validator {
        Validator::from_pool(&fixture::pool(), &[ValidatorOption::NowFn(fixed_now(NOW))])
            .expect("fixture options compile")
    }

    fn timestamp(seconds: i64) -> MessageValue {
        MessageValue::new(TIMESTAMP_TYPE).with("seconds", seconds)
    }

    fn address(first_line: &str, town: &str) -> MessageValue {
        MessageValue::new("acme.Address")
            .with("first_line", first_line)
            .with("town", town)
    }

    fn valid_user() -> MessageValue {
        MessageValue::new("acme.User")
            .with("id", "u-1")
            .with("age", 30)
            .with("address", address("1 Main St", "Lviv"))
            .with("emails", vec![Value::from("a@x.io"), Value::from("b@x.io")])
            .with("born", timestamp(NOW - 100_000_000))
            .with("nickname", "neo")
            .with("score", 1.5)
    }

    fn violations(result: Result<(), Error>) -> Vec<ConstraintViolation> {
        match result {
            Err(Error::Validation(err)) => err.violations,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => Vec::new(),
        }
    }

    fn summary(violations: &[ConstraintViolation]) -> Vec<(String, ConstraintKind)> {
        violations
            .iter()
            .map(|v| (v.field_path().to_string(), v.constraint()))
            .collect()
    }

    #[test]
    fn valid_record_passes() {
        assert!(validator().validate(&valid_user()).is_ok());
    }

    #[test]
    fn every_failed_rule_is_reported_in_declaration_order() {
        let user = MessageValue::new("acme.User")
            .with("age", 200)
            .with("address", MessageValue::new("acme.Address").with("first_line", "1 Main St"))
            .with(
                "emails",
                vec![Value::from("a@x.io"), Value::from("nope"), Value::from("a@x.io")],
            )
            .with("born", timestamp(NOW + 100_000_000))
            .with("nickname", "neo")
            .with("score", -1.0);

        let found = violations(validator().validate(&user));
        assert_eq!(
            summary(&found),
            vec![
                ("age".to_string(), ConstraintKind::Range),
                ("address".to_string(), ConstraintKind::Validate),
                ("emails[1]".to_string(), ConstraintKind::Pattern),
                ("emails".to_string(), ConstraintKind::Distinct),
                ("born".to_string(), ConstraintKind::When),
                ("score".to_string(), ConstraintKind::Min),
                (String::new(), ConstraintKind::RequiredField),
            ]
        );
        assert_eq!(found[3].params().get(FIELD_DUPLICATES), Some("a@x.io"));
        assert_eq!(
            found[4].params().get("field.value"),
            Some("2027-01-15T08:00:00Z")
        );
    }

    #[test]
    fn nested_violations_keep_their_own_paths_and_messages() {
        let user = valid_user().with("address", MessageValue::new("acme.Address").with("first_line", "1 Main St"));
        let found = violations(validator().validate(&user));
        assert_eq!(found.len(), 1);
        let nested = found[0].nested();
        assert_eq!(summary(nested), vec![("town".to_string(), ConstraintKind::Required)]);
        assert_eq!(nested[0].type_name(), "acme.Address");
        assert_eq!(nested[0].message(), "A town is needed.");

        let err = ValidationError::from_violations(found).expect("non-empty");
        assert_eq!(summary(&err.flatten()), vec![("address.town".to_string(), ConstraintKind::Required)]);
    }

    #[test]
    fn nested_record_reports_each_failing_field() {
        let user = valid_user().with("address", MessageValue::new("acme.Address").with("number", 7));
        let found = violations(validator().validate(&user));
        assert_eq!(summary(&found), vec![("address".to_string(), ConstraintKind::Validate)]);
        assert_eq!(
            summary(found[0].nested()),
            vec![
                ("first_line".to_string(), ConstraintKind::Required),
                ("town".to_string(), ConstraintKind::Required),
            ]
        );

        let err = ValidationError::from_violations(found).expect("non-empty");
        assert_eq!(
            summary(&err.flatten()),
            vec![
                ("address.first_line".to_string(), ConstraintKind::Required),
                ("address.town".to_string(), ConstraintKind::Required),
            ]
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn validator_is_shareable_across_threads() {
        assert_send_sync::<Validator>();
        assert_send_sync::<ValidationTable>();

        let validator = validator();
        let user = valid_user().with("age", 200).with("emails", vec![Value::from("a@x.io"), Value::from("a@x.io")]);
        let expected = violations(validator.validate(&user));
        assert!(!expected.is_empty());

        let results: Vec<Vec<ConstraintViolation>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| violations(validator.validate(&user))))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("validation thread"))
                .collect()
        });
        for found in results {
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn empty_address_fails_both_required_fields() {
        let found = violations(validator().validate(&MessageValue::new("acme.Address")));
        assert_eq!(
            summary(&found),
            vec![
                ("first_line".to_string(), ConstraintKind::Required),
                ("town".to_string(), ConstraintKind::Required),
            ]
        );
        assert_eq!(
            found[0].message(),
            "The field `acme.Address.first_line` of the type `string` must have a non-default value."
        );
    }

    #[test]
    fn goes_requires_the_companion() {
        let mut user = valid_user();
        user.set("address", MessageValue::new("acme.Address"));
        let found = violations(validator().validate(&user));
        assert_eq!(summary(&found), vec![("nickname".to_string(), ConstraintKind::Goes)]);
    }

    #[test]
    fn identifiers_of_entities_and_events_are_required() {
        let validator = validator();
        let found = violations(validator.validate(&MessageValue::new("acme.Account").with("balance", 5i64)));
        assert_eq!(summary(&found), vec![("uuid".to_string(), ConstraintKind::Required)]);

        let found = violations(validator.validate(&MessageValue::new("acme.UserRegistered")));
        assert_eq!(summary(&found), vec![("user_id".to_string(), ConstraintKind::Required)]);
        assert!(
            validator
                .validate(&MessageValue::new("acme.UserRegistered").with("user_id", "u-1"))
                .is_ok()
        );
    }

    #[test]
    fn set_once_fields_cannot_be_reassigned() {
        let validator = validator();
        let account = |balance: i64| {
            MessageValue::new("acme.Account")
                .with("uuid", "acc-1")
                .with("balance", balance)
        };
        assert!(validator.check_transition(&account(0), &account(60)).is_ok());
        assert!(validator.check_transition(&account(60), &account(60)).is_ok());

        let found = violations(validator.check_transition(&account(60), &account(16)));
        assert_eq!(summary(&found), vec![("balance".to_string(), ConstraintKind::SetOnce)]);
        assert_eq!(found[0].field_value(), Some(&Value::Int(60)));
    }

    #[test]
    fn transition_between_types_is_a_runtime_error() {
        let result = validator().check_transition(&MessageValue::new("acme.Account"), &MessageValue::new("acme.User"));
        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    #[test]
    fn unknown_record_type_is_a_runtime_error() {
        match validator().validate(&MessageValue::new("acme.Missing")) {
            Err(Error::Runtime(err)) => assert!(err.cause.contains("acme.Missing")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    struct DenyFilter;

    impl Filter for DenyFilter {
        fn should_validate(&self, _record: &MessageValue) -> bool {
            false
        }
    }

    #[test]
    fn call_options_apply_to_that_call_only() {
        let validator = validator();
        let user = valid_user().with("age", 200).with("score", -2.0);

        assert_eq!(violations(validator.validate(&user)).len(), 2);
        assert_eq!(
            violations(validator.validate_with(&user, &[ValidationOption::FailFast])).len(),
            1
        );
        assert!(
            validator
                .validate_with(&user, &[ValidationOption::Filter(Arc::new(DenyFilter))])
                .is_ok()
        );
        assert_eq!(violations(validator.validate(&user)).len(), 2);
    }

    #[test]
    fn now_override_moves_the_time_bound() {
        let validator = validator();
        let user = valid_user().with("born", timestamp(NOW + 100));
        assert_eq!(summary(&violations(validator.validate(&user))), vec![("born".to_string(), ConstraintKind::When)]);
        assert!(
            validator
                .validate_with(&user, &[ValidationOption::NowFn(fixed_now(NOW + 1_000))])
                .is_ok()
        );
    }

    #[test]
    fn prost_messages_are_validated_through_reflection() {
        let pool = fixture::pool();
        let validator = Validator::from_pool(&pool, &[]).expect("fixture options compile");
        let descriptor = pool.get_message_by_name("acme.User").expect("User");
        let mut user = DynamicMessage::new(descriptor);
        user.set_field_by_name("login", ReflectValue::String("neo".to_string()));
        user.set_field_by_name("score", ReflectValue::F64(2.0));
        assert!(validator.validate_message(&user).is_ok());

        user.set_field_by_name("age", ReflectValue::I32(-3));
        let found = violations(validator.validate_message(&user));
        assert_eq!(summary(&found), vec![("age".to_string(), ConstraintKind::Range)]);
        assert_eq!(found[0].field_value(), Some(&Value::Int(-3)));
    }

    #[test]
    fn misapplied_option_fails_at_construction() {
        let schema = reflect::schema_from_pool(&fixture::pool());
        let options = [DiscoveredOption::field("acme.User", "age", "pattern", "[0-9]+")];
        assert!(matches!(
            Validator::new(&schema, &options),
            Err(SchemaError::PatternOnNonString { .. })
        ));
    }
}
