//! Error message templates.
//!
//! A template references parameters by name (`{field.path}`) or by position
//! (`%s`, consuming the rule's own parameters in declaration order). `%%` is
//! a literal percent sign. Placeholders with no matching parameter are left
//! verbatim so that a typo in a custom message stays visible.

use crate::error::SchemaError;

/// Path of the field, relative to the validated record.
pub const FIELD_PATH: &str = "field.path";
/// The value that failed validation.
pub const FIELD_VALUE: &str = "field.value";
/// The declared type of the field.
pub const FIELD_TYPE: &str = "field.type";
/// The type declaring the field.
pub const PARENT_TYPE: &str = "parent.type";
/// The `(min)`/`(max)` bound.
pub const BOUND_VALUE: &str = "bound.value";
/// The `(range)` text.
pub const RANGE_VALUE: &str = "range.value";
/// The `(pattern)` regular expression.
pub const REGEX_PATTERN: &str = "regex.pattern";
/// The `(pattern)` modifiers.
pub const REGEX_MODIFIERS: &str = "regex.modifiers";
/// `past` or `future`.
pub const WHEN_IN: &str = "when.in";
/// The `(goes)` companion field.
pub const GOES_COMPANION: &str = "goes.companion";
/// The `(required_field)` expression.
pub const REQUIRED_FIELD_EXPRESSION: &str = "required_field.expression";
/// Repeated elements found by `(distinct)`.
pub const FIELD_DUPLICATES: &str = "field.duplicates";
/// The value a `(set_once)` field was about to be overwritten with.
pub const FIELD_PROPOSED_VALUE: &str = "field.proposed_value";

/// Ordered name/value parameters substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams(Vec<(String, String)>);

impl TemplateParams {
    /// Create an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`TemplateParams::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a parameter, keeping its original position if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Append every parameter of `other`, overriding existing names.
    pub fn extend(&mut self, other: &TemplateParams) {
        for (name, value) in &other.0 {
            self.insert(name.clone(), value.clone());
        }
    }

    /// Look a parameter up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A rule's error message: the template and the parameters fixed at compile
/// time. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    template: String,
    params: TemplateParams,
}

impl ErrorMessage {
    /// Create a message for `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyErrorMessage`] when the template is blank.
    pub fn new(rule: &str, template: impl Into<String>) -> Result<Self, SchemaError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(SchemaError::EmptyErrorMessage {
                rule: rule.to_string(),
            });
        }
        Ok(Self {
            template,
            params: TemplateParams::new(),
        })
    }

    /// Prefer a custom template over the default when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyErrorMessage`] when neither is usable.
    pub fn custom_or(
        rule: &str,
        custom: Option<&str>,
        default: &str,
    ) -> Result<Self, SchemaError> {
        match custom.filter(|c| !c.trim().is_empty()) {
            Some(custom) => Self::new(rule, custom),
            None => Self::new(rule, default),
        }
    }

    /// Attach a compile-time parameter.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// The raw template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameters fixed at compile time.
    #[must_use]
    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    /// Substitute the compile-time parameters and `runtime` ones.
    #[must_use]
    pub fn format(&self, runtime: &TemplateParams) -> String {
        let mut all = self.params.clone();
        all.extend(runtime);
        let positional: Vec<&str> = self.params.iter().map(|(_, v)| v).collect();
        format_template(&self.template, &all, &positional)
    }
}

/// Substitute `{name}` placeholders from `params` and `%s` from `positional`.
#[must_use]
pub fn format_template(template: &str, params: &TemplateParams, positional: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next_positional = positional.iter();
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '%']) {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(after) = tail.strip_prefix("%%") {
            out.push('%');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%s") {
            match next_positional.next() {
                Some(value) => out.push_str(value),
                None => out.push_str("%s"),
            }
            rest = after;
        } else if tail.starts_with('{') {
            let close = tail.find('}').filter(|&end| is_param_name(&tail[1..end]));
            match close.and_then(|end| params.get(&tail[1..end]).map(|v| (end, v))) {
                Some((end, value)) => {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
