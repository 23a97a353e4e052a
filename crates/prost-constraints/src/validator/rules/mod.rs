pub(crate) mod distinct;
pub(crate) mod goes;
pub(crate) mod number;
pub(crate) mod pattern;
pub(crate) mod required;
pub(crate) mod required_field;
pub(crate) mod set_once;
pub(crate) mod validate;
pub(crate) mod when;

use crate::schema::{FieldDescriptor, Schema, TypeDescriptor};

/// The field an option is compiled for, with its surroundings.
pub(crate) struct FieldContext<'a> {
    pub schema: &'a Schema,
    pub declaring: &'a TypeDescriptor,
    pub field: &'a FieldDescriptor,
    /// Position of the field in declaration order.
    pub index: usize,
}

impl FieldContext<'_> {
    /// `Type.field`, for diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring.name(), self.field.name())
    }

    pub fn field_name(&self) -> String {
        self.field.name().to_string()
    }

    pub fn type_label(&self) -> String {
        self.field.type_label()
    }
}
