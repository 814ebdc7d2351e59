//! Assembly of the response envelope.

use crate::engine::RawResult;
use crate::graphql::Response;
use crate::services::translate::translate;

/// Builds the response envelope of `result`.
///
/// Without errors the data is returned as-is. With errors the data is
/// dropped and the translated errors are returned instead.
pub fn assemble(result: RawResult) -> Response {
    if result.errors.is_empty() {
        return Response::builder().and_data(result.data).build();
    }

    tracing::error!(errors = ?result.errors, "execution reported errors");
    let errors = translate(&result.errors);
    tracing::error!(errors = ?errors, "errors for client");
    Response::from_errors(errors)
}
