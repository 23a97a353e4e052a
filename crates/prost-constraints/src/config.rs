use std::sync::Arc;

use prost_types::Timestamp;

use crate::schema::FieldDescriptor;
use crate::value::MessageValue;

/// Source of the current instant for `(when)` rules.
pub type NowFn = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Options for configuring the `Validator` at construction time.
#[non_exhaustive]
pub enum ValidatorOption {
    /// Stop validation on the first violation instead of collecting all.
    FailFast,

    /// Override the function used to populate `now` in `(when)` rules.
    NowFn(NowFn),

    /// Default filter applied to every validation.
    Filter(Arc<dyn Filter>),
}

/// Options for configuring a single `Validator::validate_with` call.
#[non_exhaustive]
pub enum ValidationOption {
    /// Stop validation on the first violation instead of collecting all.
    FailFast,
    /// Override the filter for this validation call.
    Filter(Arc<dyn Filter>),
    /// Override the function used to populate `now` in `(when)` rules.
    NowFn(NowFn),
}

/// Controls which records and fields are validated.
pub trait Filter: Send + Sync {
    /// Returns true if the given record should be validated.
    fn should_validate(&self, record: &MessageValue) -> bool;

    /// Returns true if the given field should be validated.
    /// Defaults to record-level filtering.
    fn should_validate_field(&self, record: &MessageValue, _field: &FieldDescriptor) -> bool {
        self.should_validate(record)
    }
}

/// A filter that always validates everything.
pub(crate) struct NopFilter;

impl Filter for NopFilter {
    fn should_validate(&self, _record: &MessageValue) -> bool {
        true
    }
}

/// Runtime configuration passed to evaluators during validation.
#[derive(Clone)]
pub(crate) struct ValidationConfig {
    pub fail_fast: bool,
    pub filter: Arc<dyn Filter>,
    pub now_fn: NowFn,
}

/// Default timestamp factory using `SystemTime::now()`.
pub(crate) fn default_now_fn() -> NowFn {
    Arc::new(|| {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        // as_secs() since UNIX_EPOCH fits in i64; subsec_nanos() is < 1e9.
        #[allow(clippy::cast_possible_wrap)]
        Timestamp {
            seconds: now.as_secs() as i64,
            nanos: now.subsec_nanos() as i32,
        }
    })
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            filter: Arc::new(NopFilter),
            now_fn: default_now_fn(),
        }
    }
}

impl ValidationConfig {
    pub(crate) fn from_options(options: &[ValidatorOption]) -> Self {
        let mut cfg = Self::default();
        for option in options {
            match option {
                ValidatorOption::FailFast => cfg.fail_fast = true,
                ValidatorOption::NowFn(now_fn) => cfg.now_fn = Arc::clone(now_fn),
                ValidatorOption::Filter(filter) => cfg.filter = Arc::clone(filter),
            }
        }
        cfg
    }

    /// This configuration with per-call overrides applied.
    pub(crate) fn with_call_options(&self, options: &[ValidationOption]) -> Self {
        let mut cfg = self.clone();
        for option in options {
            match option {
                ValidationOption::FailFast => cfg.fail_fast = true,
                ValidationOption::Filter(filter) => cfg.filter = Arc::clone(filter),
                ValidationOption::NowFn(now_fn) => cfg.now_fn = Arc::clone(now_fn),
            }
        }
        cfg
    }
}
