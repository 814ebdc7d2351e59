//! Errors, both the ones raised by the engine and the ones returned to callers.
use std::fmt;
use std::net::SocketAddr;

use displaydoc::Display;
use http::StatusCode;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
use crate::graphql;

/// An error as reported by the engine, before translation.
#[derive(Clone, Debug, PartialEq)]
pub enum RawError {
    /// An error forwarded to clients as-is: syntax, validation and other
    /// engine-reported errors.
    Engine(graphql::Error),

    /// A failure while fetching the value of a field.
    DataFetching {
        /// The error as the engine would report it.
        error: graphql::Error,
        /// What the resolver raised, as a chain of nested failures.
        exception: Failure,
    },
}

impl RawError {
    /// The error as the engine would report it.
    pub fn error(&self) -> &graphql::Error {
        match self {
            RawError::Engine(error) => error,
            RawError::DataFetching { error, .. } => error,
        }
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawError::Engine(error) => write!(f, "{error}"),
            RawError::DataFetching { error, exception } => write!(f, "{error} ({exception})"),
        }
    }
}

/// A chain of nested failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// A failure with a message, possibly caused by another one.
    Error {
        /// The failure message.
        message: String,
        /// The failure that caused this one.
        cause: Option<Box<Failure>>,
    },

    /// The wrapper placed around whatever a resolver raised when it was invoked.
    Invocation {
        /// What the resolver raised.
        target: Option<Box<Failure>>,
    },
}

impl Failure {
    /// A failure with a message and no cause.
    pub fn new(message: impl Into<String>) -> Self {
        Failure::Error {
            message: message.into(),
            cause: None,
        }
    }

    /// A failure with a message, caused by `cause`.
    pub fn caused_by(message: impl Into<String>, cause: Failure) -> Self {
        Failure::Error {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Wraps what a resolver raised.
    pub fn invocation(target: Failure) -> Self {
        Failure::Invocation {
            target: Some(Box::new(target)),
        }
    }

    /// Converts an error and its chain of sources.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Failure::Error {
            message: error.to_string(),
            cause: error
                .source()
                .map(|source| Box::new(Failure::from_error(source))),
        }
    }

    /// The failure message. Invocation wrappers have none.
    pub fn message(&self) -> Option<&str> {
        match self {
            Failure::Error { message, .. } => Some(message),
            Failure::Invocation { .. } => None,
        }
    }

    /// The next failure in the chain.
    pub fn cause(&self) -> Option<&Failure> {
        match self {
            Failure::Error { cause, .. } => cause.as_deref(),
            Failure::Invocation { target } => target.as_deref(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error { message, .. } => f.write_str(message)?,
            Failure::Invocation { .. } => f.write_str("invocation failed")?,
        }
        if let Some(cause) = self.cause() {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Errors raised while decoding an HTTP request into a GraphQL request.
///
/// These fail the HTTP request itself; they never reach the engine.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum RequestDecodeError {
    /// missing required parameter '{key}'
    MissingQuery {
        /// The name of the query parameter.
        key: String,
    },

    /// missing required file part '{part}'
    MissingFile {
        /// The name of the file part.
        part: String,
    },

    /// variables are not a valid JSON object: {0}
    MalformedVariables(serde_json::Error),

    /// failed to decode the url-encoded parameters: {0}
    MalformedParameters(serde_urlencoded::de::Error),

    /// failed to deserialize the request body into JSON: {0}
    MalformedJson(serde_json::Error),

    /// failed to read the multipart body: {0}
    Multipart(multer::Error),

    /// the request body is not valid UTF-8
    InvalidUtf8,

    /// failed to read the request body: {0}
    Body(String),

    /// unsupported content type '{content_type}'
    UnsupportedContentType {
        /// The content type sent by the client.
        content_type: String,
    },

    /// the request body exceeds the limit of {limit} bytes
    PayloadTooLarge {
        /// The configured limit.
        limit: usize,
    },
}

impl RequestDecodeError {
    /// The HTTP status of the response reporting this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestDecodeError::UnsupportedContentType { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            RequestDecodeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// The `extensions.code` of the response reporting this error.
    pub fn extension_code(&self) -> &'static str {
        match self {
            RequestDecodeError::MissingQuery { .. } => "MISSING_QUERY",
            RequestDecodeError::MissingFile { .. } => "MISSING_FILE",
            RequestDecodeError::MalformedVariables(_) => "MALFORMED_VARIABLES",
            RequestDecodeError::UnsupportedContentType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            RequestDecodeError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            _ => "INVALID_GRAPHQL_REQUEST",
        }
    }
}

/// Failures of the engine itself, as opposed to errors it reports in a result.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    /// the request carries no query text
    MissingQuery,

    /// unknown operation named '{0}'
    UnknownOperation(String),

    /// the document contains several operations and no operation name was given
    AmbiguousOperation,

    /// the document contains no operation
    NoOperation,

    /// invalid variables: {0}
    InvalidVariables(String),

    /// execution failed: {0}
    Execution(String),

    /// the engine panicked: {0}
    Panicked(String),
}

/// Errors raised while building the schema registry.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum SchemaError {
    /// could not read '{path}': {source}
    Read {
        /// The file that could not be read.
        path: String,
        /// The IO error.
        source: std::io::Error,
    },

    /// schema '{name}' is invalid: {message}
    Invalid {
        /// The schema name.
        name: String,
        /// The validation diagnostics.
        message: String,
    },

    /// the root data of schema '{name}' is invalid: {source}
    InvalidData {
        /// The schema name.
        name: String,
        /// The JSON error.
        source: serde_json::Error,
    },

    /// the root data of schema '{name}' must be a JSON object
    DataNotAnObject {
        /// The schema name.
        name: String,
    },

    /// schema '{0}' is registered more than once
    Duplicate(String),
}

/// Errors raised while serving HTTP.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ServerError {
    /// could not bind to {0}: {1}
    Bind(SocketAddr, std::io::Error),

    /// the HTTP server failed: {0}
    Serve(std::io::Error),
}
