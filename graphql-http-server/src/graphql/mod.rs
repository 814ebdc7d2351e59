//! Types related to GraphQL requests, responses, etc.

mod request;
mod response;

use std::fmt;

use apollo_compiler::response::GraphQLError as CompilerError;
use apollo_compiler::response::ResponseDataPathSegment;
pub use request::Request;
pub use response::Response;
use serde::Deserialize;
use serde::Serialize;

/// The error location
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// The line number
    pub line: u32,
    /// The column number
    pub column: u32,
}

/// One element of the path of a field error within [`Response::data`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field, by its response key.
    Field(String),
    /// An index within a list.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "/{name}"),
            PathSegment::Index(index) => write!(f, "/@{index}"),
        }
    }
}

/// The kind of failure a client-facing [`Error`] reports.
///
/// Sent to clients as `extensions.classification`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorClassification {
    /// The query text could not be parsed.
    InvalidSyntax,
    /// The query is not valid against the schema.
    ValidationError,
    /// A field value could not be fetched.
    DataFetchingException,
    /// The operation cannot be executed by this server.
    OperationNotSupported,
    /// No schema could be resolved for the request.
    SchemaUndefined,
    /// Evaluating the query failed outside of field resolution.
    QueryEvaluationFailed,
}

/// Extensions attached to every client-facing [`Error`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ErrorExtensions {
    /// What kind of failure this error reports.
    pub classification: ErrorClassification,
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as found in the `errors` field of a GraphQL [`Response`].
///
/// An empty `locations` list is serialized as `null`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(
        serialize_with = "serialize_locations",
        deserialize_with = "deserialize_null_default",
        default
    )]
    pub locations: Vec<Location>,

    /// If this is a field error, the path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<PathSegment>,

    /// Error extensions, carrying the classification.
    pub extensions: ErrorExtensions,
}

#[buildstructor::buildstructor]
impl Error {
    /// Returns a builder that builds a GraphQL [`Error`] from its components.
    ///
    /// Builder methods:
    ///
    /// * `.message(impl Into<`[`String`]`>)`
    ///   Required.
    ///
    /// * `.classification(`[`ErrorClassification`]`)`
    ///   Required.
    ///
    /// * `.locations(impl Into<`[`Vec`]`<`[`Location`]`>>)` / `.location(`[`Location`]`)`
    ///   Optional, defaults to empty.
    ///
    /// * `.path(impl Into<`[`Vec`]`<`[`PathSegment`]`>>)`
    ///   Optional, defaults to empty.
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Vec<PathSegment>,
        classification: ErrorClassification,
    ) -> Self {
        Self {
            message,
            locations,
            path,
            extensions: ErrorExtensions { classification },
        }
    }

    /// The error reported when no schema can be resolved for a request.
    pub fn schema_undefined() -> Self {
        Self::builder()
            .message("GraphQL schema is undefined")
            .classification(ErrorClassification::SchemaUndefined)
            .build()
    }

    /// The generic error reported when evaluating a query failed.
    ///
    /// The failure itself only goes to the logs.
    pub fn query_evaluation_failed() -> Self {
        Self::builder()
            .message("Error occurred while evaluating the GraphQL query")
            .classification(ErrorClassification::QueryEvaluationFailed)
            .build()
    }

    /// Converts an error reported by `apollo-compiler`.
    pub fn from_compiler(error: CompilerError, classification: ErrorClassification) -> Self {
        let locations = error
            .locations
            .iter()
            .map(|location| Location {
                line: location.line as u32,
                column: location.column as u32,
            })
            .collect();
        let path = error
            .path
            .iter()
            .map(|segment| match segment {
                ResponseDataPathSegment::Field(name) => PathSegment::Field(name.to_string()),
                ResponseDataPathSegment::ListIndex(index) => PathSegment::Index(*index),
            })
            .collect();
        Self::new(error.message, locations, path, classification)
    }

    /// The classification of this error.
    pub fn classification(&self) -> ErrorClassification {
        self.extensions.classification
    }
}

/// Displays (only) the error message.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

fn serialize_locations<S>(locations: &[Location], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if locations.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.collect_seq(locations)
    }
}

// NOTE: this deserialize helper is used to transform `null` to Default::default()
pub(crate) fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_locations_serialize_as_null() {
        let error = Error::schema_undefined();
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "message": "GraphQL schema is undefined",
                "locations": null,
                "extensions": { "classification": "SchemaUndefined" }
            })
        );
    }

    #[test]
    fn locations_and_path_are_serialized() {
        let error = Error::builder()
            .message("Cannot query field \"nope\" on type \"Query\".")
            .location(Location { line: 1, column: 3 })
            .path(vec![
                PathSegment::Field("hero".to_string()),
                PathSegment::Index(0),
            ])
            .classification(ErrorClassification::ValidationError)
            .build();
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "message": "Cannot query field \"nope\" on type \"Query\".",
                "locations": [{ "line": 1, "column": 3 }],
                "path": ["hero", 0],
                "extensions": { "classification": "ValidationError" }
            })
        );
    }

    #[test]
    fn null_locations_deserialize_as_empty() {
        let error: Error = serde_json::from_value(json!({
            "message": "boom",
            "locations": null,
            "extensions": { "classification": "DataFetchingException" }
        }))
        .unwrap();
        assert!(error.locations.is_empty());
        assert_eq!(
            error.classification(),
            ErrorClassification::DataFetchingException
        );
    }
}
