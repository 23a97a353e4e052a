//! Declarative field and message constraints for Protocol Buffer records.
//!
//! Options such as `(required)`, `(range)`, `(pattern)` or `(set_once)` are
//! attached to fields and messages of a schema. This crate compiles them once
//! into a table of rules and evaluates records against it, reporting every
//! violated constraint with a field path and a rendered message.
//!
//! # Quick start
//!
//! ```rust
//! use prost_constraints::{
//!     DiscoveredOption, FieldKind, MessageValue, PrimitiveKind, Schema, TypeDescriptor, Validator,
//! };
//!
//! let schema = Schema::new().with_type(
//!     TypeDescriptor::new("acme.Order")
//!         .singular("quantity", FieldKind::Primitive(PrimitiveKind::Int32)),
//! );
//! let options = [DiscoveredOption::field("acme.Order", "quantity", "min", 1)];
//! let validator = Validator::new(&schema, &options)?;
//!
//! assert!(validator.validate(&MessageValue::new("acme.Order").with("quantity", 3)).is_ok());
//! assert!(validator.validate(&MessageValue::new("acme.Order").with("quantity", 0)).is_err());
//! # Ok::<(), prost_constraints::SchemaError>(())
//! ```
//!
//! Schemas and options can also be read from a `prost-reflect`
//! [`DescriptorPool`](prost_reflect::DescriptorPool) with
//! [`Validator::from_pool`], and prost messages validated directly with
//! [`Validator::validate_message`].
//!
//! # Error types
//!
//! | Type | When |
//! |------|------|
//! | [`ValidationError`] | One or more constraint violations detected |
//! | [`SchemaError`] | An option is malformed or misapplied |
//! | [`RuntimeError`] | The validator was handed a record it cannot evaluate |
//!
//! All three are unified under [`Error`].

#![warn(missing_docs)]

mod config;
mod error;
mod options;
pub mod reflect;
mod rule;
mod schema;
pub mod template;
mod validator;
mod value;
mod violation;

pub use config::{Filter, NowFn, ValidationOption, ValidatorOption};
pub use error::{Error, IncomparableKinds, RuntimeError, SchemaError, ValidationError};
pub use options::{CATALOGUE, DiscoveredOption, OptionTarget};
pub use rule::{
    BooleanOperator, ComparisonOperator, CompositeRule, ConstraintKind, CustomKind, CustomRule,
    Feature, MessageValidation, PatternModifier, Rule, SetOnceField, SimpleRule, Time,
};
pub use schema::{
    Cardinality, FieldDescriptor, FieldKind, PrimitiveKind, RecordKind, Schema, TIMESTAMP_TYPE,
    TypeDescriptor,
};
pub use template::{ErrorMessage, TemplateParams};
pub use validator::{ValidationTable, Validator};
pub use value::{EnumValue, MessageValue, Value, extract_unset_sentinel};
pub use violation::{
    ConstraintViolation, FieldPath, InvalidFieldPath, PathElement, Subscript, ViolationBuilder,
};
