//! The query execution engine.
//!
//! The rest of the crate only talks to engines through [`Engine`];
//! [`CompilerEngine`] executes against `apollo-compiler` schemas.

use std::borrow::Cow;
use std::sync::Arc;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::ast;
use apollo_compiler::ast::OperationType;
use apollo_compiler::executable::Operation;
use apollo_compiler::introspection;
use apollo_compiler::request::coerce_variable_values;
use apollo_compiler::resolvers::Execution;
use apollo_compiler::response::ExecutionResponse;
use apollo_compiler::response::GraphQLError;
use apollo_compiler::validation::Valid;

use self::resolver::DataObject;
use self::resolver::Shared;
use crate::cache::DocumentKey;
use crate::cache::DocumentProvider;
use crate::cache::PreparsedDocument;
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::error::Failure;
use crate::error::RawError;
use crate::graphql;
use crate::graphql::ErrorClassification;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::schema::SchemaHandle;

mod resolver;

/// What the engine is asked to execute.
#[derive(Clone, Debug)]
pub struct ExecutionInput {
    /// The query text.
    pub query: String,
    /// The operation to execute, when the document holds several.
    pub operation_name: Option<String>,
    /// Variable values. Left out entirely when the request had none.
    pub variables: Option<Object>,
    /// The per-request context handed to resolvers.
    pub context: ExecutionContext,
}

/// The result of an execution, before errors are translated for clients.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResult {
    /// The response data.
    pub data: Option<Value>,
    /// The errors, in the order the engine reported them.
    pub errors: Vec<RawError>,
}

impl RawResult {
    /// A result carrying only errors.
    pub fn from_errors(errors: Vec<RawError>) -> Self {
        Self { data: None, errors }
    }

    /// A result carrying a single engine error.
    pub fn from_error(error: graphql::Error) -> Self {
        Self::from_errors(vec![RawError::Engine(error)])
    }
}

/// Executes GraphQL requests against a schema.
///
/// Errors reported in [`RawResult::errors`] are part of a normal result;
/// an `Err` means the engine itself failed.
pub trait Engine: Send + Sync {
    /// Executes `input` against `schema`.
    fn execute(
        &self,
        schema: &SchemaHandle,
        input: ExecutionInput,
    ) -> Result<RawResult, EngineError>;
}

/// An [`Engine`] built on `apollo-compiler`.
///
/// Documents are obtained through a [`DocumentProvider`], so that repeated
/// query texts are only parsed and validated once.
#[derive(Clone)]
pub struct CompilerEngine {
    documents: Arc<dyn DocumentProvider>,
}

impl CompilerEngine {
    /// Creates an engine reading documents from `documents`.
    pub fn new(documents: Arc<dyn DocumentProvider>) -> Self {
        Self { documents }
    }

    fn execute_operation(
        &self,
        schema: &SchemaHandle,
        document: &Valid<ExecutableDocument>,
        operation: &Operation,
        input: &ExecutionInput,
    ) -> Result<RawResult, EngineError> {
        let empty = Object::new();
        let variables = input.variables.as_ref().unwrap_or(&empty);

        if operation.operation_type == OperationType::Subscription {
            return Ok(RawResult::from_error(not_supported(
                "Subscriptions are not supported",
            )));
        }

        match root_field_kind(document, operation) {
            RootFields::Mixed => Ok(RawResult::from_error(not_supported(
                "Introspection fields cannot be queried together with other root fields",
            ))),
            RootFields::Introspection => {
                let coerced = coerce_variable_values(schema.definitions(), operation, variables)
                    .map_err(|error| EngineError::InvalidVariables(error.message().to_string()))?;
                let response = introspection::partial_execute(
                    schema.definitions(),
                    schema.implementers_map(),
                    document,
                    operation,
                    &coerced,
                )
                .map_err(|error| EngineError::Execution(error.message().to_string()))?;
                Ok(raw_result(response, Vec::new()))
            }
            RootFields::Concrete => {
                let shared = Shared::new(schema.resolvers(), &input.context);
                let root = DataObject::new(
                    operation.selection_set.ty.to_string(),
                    Cow::Borrowed(schema.root_data()),
                    &shared,
                );
                let response = Execution::new(schema.definitions(), document)
                    .operation(operation)
                    .raw_variable_values(variables)
                    .execute_sync(&root)
                    .map_err(|error| EngineError::Execution(error.message().to_string()))?;
                drop(root);
                Ok(raw_result(response, shared.into_failures()))
            }
        }
    }
}

impl Engine for CompilerEngine {
    fn execute(
        &self,
        schema: &SchemaHandle,
        input: ExecutionInput,
    ) -> Result<RawResult, EngineError> {
        let key = DocumentKey {
            schema: schema.name().to_string(),
            query: input.query.clone(),
        };
        let document = self
            .documents
            .get_or_parse(&key, &mut || parse(schema, &input.query));
        let document = match &*document {
            PreparsedDocument::Valid(document) => document,
            PreparsedDocument::Invalid(errors) => {
                return Ok(RawResult::from_errors(
                    errors.iter().cloned().map(RawError::Engine).collect(),
                ));
            }
        };

        let operation_name = input.operation_name.as_deref();
        let operation = document.operations.get(operation_name).map_err(|_| {
            match operation_name {
                Some(name) => EngineError::UnknownOperation(name.to_string()),
                None if document.operations.iter().next().is_none() => EngineError::NoOperation,
                None => EngineError::AmbiguousOperation,
            }
        })?;
        tracing::debug!(
            schema = %schema.name(),
            operation = ?operation.name,
            "executing operation"
        );

        self.execute_operation(schema, document, operation, &input)
    }
}

fn parse(schema: &SchemaHandle, query: &str) -> PreparsedDocument {
    let ast = match ast::Document::parse(query, "query.graphql") {
        Ok(ast) => ast,
        Err(invalid) => {
            return PreparsedDocument::Invalid(
                invalid
                    .errors
                    .iter()
                    .map(|error| {
                        graphql::Error::from_compiler(
                            error.to_json(),
                            ErrorClassification::InvalidSyntax,
                        )
                    })
                    .collect(),
            );
        }
    };
    match ast.to_executable_validate(schema.definitions()) {
        Ok(document) => PreparsedDocument::Valid(document),
        Err(invalid) => PreparsedDocument::Invalid(
            invalid
                .errors
                .iter()
                .map(|error| {
                    graphql::Error::from_compiler(
                        error.to_json(),
                        ErrorClassification::ValidationError,
                    )
                })
                .collect(),
        ),
    }
}

enum RootFields {
    Concrete,
    Introspection,
    Mixed,
}

fn root_field_kind(document: &ExecutableDocument, operation: &Operation) -> RootFields {
    let mut introspection = false;
    let mut concrete = false;
    for field in operation.root_fields(document) {
        match field.name.as_str() {
            "__schema" | "__type" => introspection = true,
            "__typename" => {}
            _ => concrete = true,
        }
    }
    match (introspection, concrete) {
        (true, true) => RootFields::Mixed,
        (true, false) => RootFields::Introspection,
        _ => RootFields::Concrete,
    }
}

fn not_supported(message: &str) -> graphql::Error {
    graphql::Error::builder()
        .message(message)
        .classification(ErrorClassification::OperationNotSupported)
        .build()
}

/// Field errors reported by an execution become data fetching failures.
///
/// The ones raised by resolvers point back to the failure they recorded.
fn raw_result(response: ExecutionResponse, failures: Vec<Failure>) -> RawResult {
    let errors = response
        .errors
        .into_iter()
        .map(|mut error| {
            let recorded = resolver::take_marker(&error.message)
                .and_then(|(index, message)| Some((failures.get(index)?.clone(), message)));
            match recorded {
                Some((exception, message)) => {
                    error.message = message;
                    let error = fetching_error(error);
                    RawError::DataFetching { error, exception }
                }
                None => {
                    let exception = Failure::new(error.message.clone());
                    RawError::DataFetching {
                        error: graphql::Error::from_compiler(
                            error,
                            ErrorClassification::DataFetchingException,
                        ),
                        exception,
                    }
                }
            }
        })
        .collect();
    RawResult {
        data: response.data.map(Value::Object),
        errors,
    }
}

fn fetching_error(error: GraphQLError) -> graphql::Error {
    let mut error =
        graphql::Error::from_compiler(error, ErrorClassification::DataFetchingException);
    let path: String = error.path.iter().map(ToString::to_string).collect();
    error.message = format!("Exception while fetching data ({path}) : {}", error.message);
    error
}
