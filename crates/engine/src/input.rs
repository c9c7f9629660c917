//! Test inputs and the binder that validates them
//!
//! Raw catalog data is bound to a test's input schema in two phases: the test
//! variant is resolved first, then its schema is constructed from the data.
//! Every bound input carries a common envelope (`filters`, `result_overwrite`)
//! next to the test-specific parameters.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use netverify_common::ResultOverwrite;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, InputError, SchemaValidationError};
use crate::plugin::TestVariant;

/// Reserved input key holding tag filters
pub const FILTERS_KEY: &str = "filters";

/// Reserved input key holding result overrides
pub const RESULT_OVERWRITE_KEY: &str = "result_overwrite";

/// Schema of a test's parameters.
///
/// Implementors are plain serde structs. Fields without a default are
/// required; keys the schema ignores while deserializing are rejected as
/// unknown, nested ones included.
pub trait TestInput:
    DeserializeOwned + Serialize + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// Semantic checks run after structural construction succeeded
    fn validate(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Input schema for tests that take no parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoInput {}

impl TestInput for NoInput {}

/// Tag filters attached to a definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputFilters {
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
}

/// A test's parameters together with the common envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedInput<I> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<InputFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_overwrite: Option<ResultOverwrite>,
    #[serde(flatten)]
    pub params: I,
}

impl<I: TestInput> ValidatedInput<I> {
    pub fn new(params: I) -> Self {
        Self {
            filters: None,
            result_overwrite: None,
            params,
        }
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.filters = Some(InputFilters {
            tags: Some(tags.into_iter().map(Into::into).collect()),
        });
        self
    }

    pub fn with_result_overwrite(mut self, overwrite: ResultOverwrite) -> Self {
        self.result_overwrite = Some(overwrite);
        self
    }

    /// Construct from raw field data, `None` meaning defaults only
    pub fn construct(test: &str, fields: Option<Map<String, Value>>) -> Result<Self, InputError> {
        let mut fields = fields.unwrap_or_default();
        let mut errors = Vec::new();

        let filters = take_envelope::<InputFilters>(&mut fields, FILTERS_KEY, &mut errors);
        let result_overwrite =
            take_envelope::<ResultOverwrite>(&mut fields, RESULT_OVERWRITE_KEY, &mut errors);

        let mut ignored = Vec::new();
        match serde_ignored::deserialize::<_, _, I>(Value::Object(fields), |path| {
            ignored.push(path.to_string())
        }) {
            Ok(params) => {
                errors.extend(
                    ignored
                        .into_iter()
                        .map(|path| FieldError::new(path, "extra inputs are not permitted")),
                );
                errors.extend(params.validate());
                if errors.is_empty() {
                    return Ok(Self {
                        filters,
                        result_overwrite,
                        params,
                    });
                }
            }
            Err(e) => errors.push(serde_field_error("", &e)),
        }

        Err(SchemaValidationError {
            test: test.to_string(),
            errors,
        }
        .into())
    }
}

fn take_envelope<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match fields.remove(key) {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(serde_field_error(key, &e));
                None
            }
        },
    }
}

/// Convert a serde error into a field error, recovering the field name when
/// serde reports one
fn serde_field_error(prefix: &str, error: &serde_json::Error) -> FieldError {
    let message = error.to_string();
    let field = ["missing field `", "unknown field `"]
        .iter()
        .find_map(|marker| message.strip_prefix(marker))
        .and_then(|rest| rest.split('`').next());

    let path = match (prefix.is_empty(), field) {
        (true, Some(field)) => field.to_string(),
        (false, Some(field)) => format!("{}.{}", prefix, field),
        (_, None) => prefix.to_string(),
    };
    FieldError::new(path, message)
}

/// Identity of a concrete input schema type
#[derive(Debug, Clone, Copy)]
pub struct InputType {
    id: TypeId,
    name: &'static str,
}

impl InputType {
    pub fn of<I: 'static>() -> Self {
        Self {
            id: TypeId::of::<I>(),
            name: std::any::type_name::<I>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for InputType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InputType {}

/// Type-erased validated input
pub trait BoundInput: Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    /// Concrete type of the test-specific parameters
    fn input_type(&self) -> InputType;

    fn filters(&self) -> Option<&InputFilters>;

    fn result_overwrite(&self) -> Option<&ResultOverwrite>;

    /// Test-specific parameters as a JSON object
    fn arguments(&self) -> Result<Value, serde_json::Error>;

    fn dyn_eq(&self, other: &dyn BoundInput) -> bool;

    /// Tags declared in `filters`, if any
    fn tags(&self) -> Option<&BTreeSet<String>> {
        self.filters().and_then(|f| f.tags.as_ref())
    }
}

impl<I: TestInput> BoundInput for ValidatedInput<I> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn input_type(&self) -> InputType {
        InputType::of::<I>()
    }

    fn filters(&self) -> Option<&InputFilters> {
        self.filters.as_ref()
    }

    fn result_overwrite(&self) -> Option<&ResultOverwrite> {
        self.result_overwrite.as_ref()
    }

    fn arguments(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.params)
    }

    fn dyn_eq(&self, other: &dyn BoundInput) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .map_or(false, |other| self == other)
    }
}

/// Shared handle on a validated input
pub type SharedInput = Arc<dyn BoundInput>;

/// Recover the concrete input behind a type-erased one
pub fn downcast<I: TestInput>(input: &dyn BoundInput) -> Option<&ValidatedInput<I>> {
    input.as_any().downcast_ref::<ValidatedInput<I>>()
}

/// Input data as supplied by a catalog source
#[derive(Debug, Clone)]
pub enum RawInput {
    /// An already validated instance, passed through unchanged
    Bound(SharedInput),
    /// Raw data: `null` for defaults, a mapping of fields, anything else is rejected
    Data(Value),
}

impl RawInput {
    /// Use only default field values
    pub fn defaults() -> Self {
        RawInput::Data(Value::Null)
    }
}

impl From<Value> for RawInput {
    fn from(value: Value) -> Self {
        RawInput::Data(value)
    }
}

impl From<Option<Value>> for RawInput {
    fn from(value: Option<Value>) -> Self {
        RawInput::Data(value.unwrap_or(Value::Null))
    }
}

impl From<SharedInput> for RawInput {
    fn from(input: SharedInput) -> Self {
        RawInput::Bound(input)
    }
}

impl<I: TestInput> From<ValidatedInput<I>> for RawInput {
    fn from(input: ValidatedInput<I>) -> Self {
        RawInput::Bound(Arc::new(input))
    }
}

/// Bind raw input data to the input schema declared by `variant`.
///
/// The bound instance's concrete type must be exactly the variant's declared
/// schema type, which also catches inputs built for a different test.
pub fn bind(variant: &dyn TestVariant, raw: RawInput) -> Result<SharedInput, InputError> {
    let input = match raw {
        RawInput::Bound(input) => input,
        RawInput::Data(Value::Null) => variant.construct_input(None)?,
        RawInput::Data(Value::Object(fields)) => variant.construct_input(Some(fields))?,
        RawInput::Data(other) => {
            return Err(InputError::UnsupportedInput {
                test: variant.name().to_string(),
                found: value_kind(&other),
            })
        }
    };

    let expected = variant.input_type();
    let found = input.input_type();
    if found != expected {
        return Err(InputError::TypeMismatch {
            test: variant.name().to_string(),
            expected: expected.name(),
            found: found.name(),
        });
    }

    Ok(input)
}

/// Human-readable name of a JSON value's shape
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
