use std::borrow::Cow;
use std::cell::RefCell;

use apollo_compiler::resolvers::FieldError;
use apollo_compiler::resolvers::ObjectValue;
use apollo_compiler::resolvers::ResolveInfo;
use apollo_compiler::resolvers::ResolvedValue;
use tower::BoxError;

use crate::context::ExecutionContext;
use crate::error::Failure;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::schema::Resolvers;

/// Delimits the index of a recorded failure inside a field error message.
const FAILURE_MARKER: char = '\u{E000}';

pub(super) const FETCHING_DATA: &str = "exception while fetching data";

/// State shared by every object of one execution.
pub(super) struct Shared<'s> {
    resolvers: &'s Resolvers,
    context: &'s ExecutionContext,
    failures: RefCell<Vec<Failure>>,
}

impl<'s> Shared<'s> {
    pub(super) fn new(resolvers: &'s Resolvers, context: &'s ExecutionContext) -> Self {
        Self {
            resolvers,
            context,
            failures: RefCell::new(Vec::new()),
        }
    }

    /// Records what a resolver returned and hands a field error referring to it to the engine.
    fn fail(&self, error: BoxError) -> FieldError {
        let failure = Failure::caused_by(
            FETCHING_DATA,
            Failure::invocation(Failure::from_error(error.as_ref())),
        );
        let mut failures = self.failures.borrow_mut();
        let index = failures.len();
        failures.push(failure);
        FieldError {
            message: format!("{FAILURE_MARKER}{index}{FAILURE_MARKER}{error}"),
        }
    }

    pub(super) fn into_failures(self) -> Vec<Failure> {
        self.failures.into_inner()
    }
}

/// Finds the recorded failure a field error message refers to.
///
/// Returns the failure index and the resolver's own message: whatever the
/// engine put in front of the marker is dropped along with it.
pub(super) fn take_marker(message: &str) -> Option<(usize, String)> {
    let start = message.find(FAILURE_MARKER)?;
    let digits_start = start + FAILURE_MARKER.len_utf8();
    let length = message[digits_start..].find(FAILURE_MARKER)?;
    let index = message[digits_start..digits_start + length].parse().ok()?;
    let rest = &message[digits_start + length + FAILURE_MARKER.len_utf8()..];
    Some((index, rest.to_string()))
}

/// An object of the response: its JSON properties plus the schema resolvers.
pub(super) struct DataObject<'s> {
    type_name: String,
    fields: Cow<'s, Object>,
    shared: &'s Shared<'s>,
}

impl<'s> DataObject<'s> {
    pub(super) fn new(type_name: String, fields: Cow<'s, Object>, shared: &'s Shared<'s>) -> Self {
        Self {
            type_name,
            fields,
            shared,
        }
    }
}

impl ObjectValue for DataObject<'_> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        let field_name = info.field_name();
        let value = match self.shared.resolvers.get(&self.type_name, field_name) {
            Some(resolver) => {
                match resolver(&*self.fields, info.arguments(), self.shared.context) {
                    Ok(value) => Cow::Owned(value),
                    Err(error) => return Err(self.shared.fail(error)),
                }
            }
            None => match self.fields.get(field_name) {
                Some(value) => Cow::Borrowed(value),
                None => return Ok(ResolvedValue::leaf(Value::Null)),
            },
        };
        resolve_value(value, info, self.shared)
    }
}

fn resolve_value<'a>(
    value: Cow<'a, Value>,
    info: &'a ResolveInfo<'a>,
    shared: &'a Shared<'a>,
) -> Result<ResolvedValue<'a>, FieldError> {
    match value {
        Cow::Borrowed(Value::Object(map)) => Ok(ResolvedValue::object(DataObject::new(
            object_type_name(map, info),
            Cow::Borrowed(map),
            shared,
        ))),
        Cow::Owned(Value::Object(map)) => {
            let type_name = object_type_name(&map, info);
            Ok(ResolvedValue::object(DataObject::new(
                type_name,
                Cow::Owned(map),
                shared,
            )))
        }
        Cow::Borrowed(Value::Array(values)) => Ok(ResolvedValue::List(Box::new(
            values
                .iter()
                .map(move |value| resolve_value(Cow::Borrowed(value), info, shared)),
        ))),
        Cow::Owned(Value::Array(values)) => Ok(ResolvedValue::List(Box::new(
            values
                .into_iter()
                .map(move |value| resolve_value(Cow::Owned(value), info, shared)),
        ))),
        Cow::Borrowed(leaf) => Ok(ResolvedValue::leaf(leaf.clone())),
        Cow::Owned(leaf) => Ok(ResolvedValue::leaf(leaf)),
    }
}

/// `__typename` when the data names its type, the declared field type otherwise.
fn object_type_name(object: &Object, info: &ResolveInfo<'_>) -> String {
    match object.get("__typename").and_then(Value::as_str) {
        Some(type_name) => type_name.to_string(),
        None => info.field_definition().ty.inner_named_type().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_round_trip_through_messages() {
        let resolvers = Resolvers::new();
        let context = ExecutionContext::default();
        let shared = Shared::new(&resolvers, &context);
        shared.fail("first".into());
        let error = shared.fail("boom".into());

        let (index, message) = take_marker(&error.message).unwrap();
        assert_eq!(index, 1);
        assert_eq!(message, "boom");

        let failures = shared.into_failures();
        assert_eq!(
            failures[1],
            Failure::caused_by(FETCHING_DATA, Failure::invocation(Failure::new("boom")))
        );
    }

    #[test]
    fn messages_without_marker() {
        assert_eq!(take_marker("Non-null field returned null"), None);
        assert_eq!(take_marker("half \u{E000}12 marker"), None);
    }

    #[test]
    fn engine_prefix_is_dropped() {
        let (index, message) = take_marker("resolver error: \u{E000}3\u{E000}boom").unwrap();
        assert_eq!(index, 3);
        assert_eq!(message, "boom");
    }
}
