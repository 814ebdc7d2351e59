use serde::Deserialize;
use serde::Serialize;

use crate::graphql::Error;
use crate::json_ext::Value;

/// A GraphQL response envelope.
///
/// `data` is always serialized, as `null` when absent. `errors` is left out
/// when empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(default)]
    pub data: Option<Value>,

    /// The optional GraphQL errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>) -> Self {
        Self { data, errors }
    }

    /// A response reporting `errors`, with `data` explicitly `null`.
    pub fn from_errors(errors: Vec<Error>) -> Self {
        Self { data: None, errors }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graphql::ErrorClassification;

    #[test]
    fn data_only() {
        let response = Response::builder()
            .data(serde_json_bytes::json!({ "hero": { "name": "Luke" } }))
            .build();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "data": { "hero": { "name": "Luke" } } })
        );
    }

    #[test]
    fn errors_come_with_null_data() {
        let response = Response::from_errors(vec![
            Error::builder()
                .message("boom")
                .classification(ErrorClassification::DataFetchingException)
                .build(),
        ]);
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"data":null,"errors":[{"message":"boom","locations":null,"extensions":{"classification":"DataFetchingException"}}]}"#
        );
    }
}
