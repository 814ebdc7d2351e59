//! Execution of decoded requests.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::context::TransportRequest;
use crate::engine::Engine;
use crate::engine::ExecutionInput;
use crate::engine::RawResult;
use crate::error::EngineError;
use crate::graphql;
use crate::graphql::Request;
use crate::schema::SchemaHandle;

/// Hands decoded requests to the engine and captures whatever comes back.
///
/// Never fails: every failure ends up as an error of the returned result.
#[derive(Clone)]
pub struct ExecutionDispatcher {
    engine: Arc<dyn Engine>,
}

impl ExecutionDispatcher {
    /// Creates a dispatcher executing through `engine`.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Executes `request` against `schema`.
    ///
    /// Without a schema the engine is not invoked at all. Engine failures and
    /// panics are logged with the query text and reported to the client as a
    /// generic evaluation error.
    pub fn dispatch(
        &self,
        request: Request,
        transport: TransportRequest,
        schema: Option<&SchemaHandle>,
    ) -> RawResult {
        let Some(schema) = schema else {
            return RawResult::from_error(graphql::Error::schema_undefined());
        };

        let query = request.query.clone().unwrap_or_default();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let input = execution_input(request, transport)?;
            self.engine.execute(schema, input)
        }));
        let error = match outcome {
            Ok(Ok(result)) => return result,
            Ok(Err(error)) => error,
            Err(panic) => EngineError::Panicked(panic_message(panic.as_ref())),
        };
        tracing::error!(
            query = %query,
            schema = %schema.name(),
            error = %error,
            "Error occurred evaluating query"
        );
        RawResult::from_error(graphql::Error::query_evaluation_failed())
    }
}

fn execution_input(
    request: Request,
    transport: TransportRequest,
) -> Result<ExecutionInput, EngineError> {
    let operation_name = request.non_blank_operation_name().map(str::to_string);
    let query = request
        .query
        .filter(|query| !query.trim().is_empty())
        .ok_or(EngineError::MissingQuery)?;
    Ok(ExecutionInput {
        query,
        operation_name,
        variables: request.variables,
        context: ExecutionContext::builder()
            .transport(transport)
            .and_upload(request.upload)
            .build(),
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
