//! The `(required_field)` expression grammar.
//!
//! ```text
//! expr      := and_group ('|' and_group)*
//! and_group := field_name ('&' field_name)*
//! ```
//!
//! `&` binds tighter than `|`; there are no parentheses. The expression holds
//! when every field of at least one group is set.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SchemaError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
});

/// A parsed expression: alternatives of field names that must be set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequiredFieldExpression {
    pub source: String,
    pub groups: Vec<Vec<String>>,
}

impl RequiredFieldExpression {
    /// Parse `expression` declared on `type_name`.
    ///
    /// A blank expression is no constraint and yields `None`.
    pub(crate) fn parse(type_name: &str, expression: &str) -> Result<Option<Self>, SchemaError> {
        if expression.trim().is_empty() {
            return Ok(None);
        }
        let malformed = |reason: String| SchemaError::MalformedExpression {
            type_name: type_name.to_string(),
            expression: expression.to_string(),
            reason,
        };

        let mut groups = Vec::new();
        for (group_index, group) in expression.split('|').enumerate() {
            let mut names = Vec::new();
            for name in group.split('&') {
                let name = name.trim();
                if name.is_empty() {
                    let reason = if group.trim().is_empty() {
                        format!("alternative {} is empty", group_index + 1)
                    } else {
                        "a field name is missing around `&`".to_string()
                    };
                    return Err(malformed(reason));
                }
                if !IDENTIFIER.is_match(name) {
                    return Err(malformed(format!("`{name}` is not a field name")));
                }
                names.push(name.to_string());
            }
            groups.push(names);
        }

        Ok(Some(Self {
            source: expression.trim().to_string(),
            groups,
        }))
    }

    /// Evaluate against a presence test.
    pub(crate) fn is_satisfied(&self, is_set: impl Fn(&str) -> bool) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|name| is_set(name.as_str())))
    }
}
