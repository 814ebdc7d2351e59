//! Decoding of the supported HTTP encodings into a GraphQL [`Request`].

use std::convert::Infallible;

use bytes::Bytes;
use http::Method;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use mediatype::MediaType;
use mediatype::ReadParams;
use mediatype::names::APPLICATION;
use mediatype::names::BOUNDARY;
use mediatype::names::FORM_DATA;
use mediatype::names::JSON;
use mediatype::names::MULTIPART;

use crate::configuration::Server;
use crate::context::UploadedFile;
use crate::error::RequestDecodeError;
use crate::graphql::Request;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::parse_object;

/// Name of the query parameter, for every encoding except JSON bodies.
pub const QUERY_PARAMETER: &str = "query";
/// Name of the variables parameter, for every encoding except JSON bodies.
pub const VARIABLES_PARAMETER: &str = "variables";
/// Name of the operation name, in parameters and JSON bodies alike.
pub const OPERATION_NAME_KEY: &str = "operationName";

/// How the body of a `POST` request is encoded.
#[derive(Debug, PartialEq, Eq)]
enum Encoding {
    /// `application/graphql`: the body is the query text.
    Raw,
    /// `application/json`
    Json,
    /// `multipart/form-data`
    Multipart { boundary: String },
    /// `application/x-www-form-urlencoded`
    Form,
}

impl Encoding {
    fn from_content_type(content_type: &str) -> Result<Self, RequestDecodeError> {
        let unsupported = || RequestDecodeError::UnsupportedContentType {
            content_type: content_type.to_string(),
        };
        let mime = MediaType::parse(content_type).map_err(|_| unsupported())?;
        if mime.ty == APPLICATION && mime.subty == JSON {
            Ok(Encoding::Json)
        } else if mime.ty == APPLICATION && mime.subty.as_str() == "graphql" {
            Ok(Encoding::Raw)
        } else if mime.ty == APPLICATION && mime.subty.as_str() == "x-www-form-urlencoded" {
            Ok(Encoding::Form)
        } else if mime.ty == MULTIPART && mime.subty == FORM_DATA {
            let boundary = mime
                .get_param(BOUNDARY)
                .ok_or(RequestDecodeError::Multipart(multer::Error::NoBoundary))?
                .to_string();
            Ok(Encoding::Multipart { boundary })
        } else {
            Err(unsupported())
        }
    }
}

/// The `query`, `variables` and `operationName` parameters of a request.
#[derive(Debug, Default, PartialEq)]
struct Parameters {
    query: Option<String>,
    variables: Option<String>,
    operation_name: Option<String>,
}

impl Parameters {
    fn parse(encoded: &[u8]) -> Result<Self, RequestDecodeError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(encoded).map_err(RequestDecodeError::MalformedParameters)?;
        let mut parameters = Self::default();
        for (key, value) in pairs {
            parameters.set(&key, value);
        }
        Ok(parameters)
    }

    fn from_uri(parts: &Parts) -> Result<Self, RequestDecodeError> {
        match parts.uri.query() {
            Some(query) => Self::parse(query.as_bytes()),
            None => Ok(Self::default()),
        }
    }

    /// Keeps the first value of each parameter.
    fn set(&mut self, key: &str, value: String) {
        let slot = match key {
            QUERY_PARAMETER => &mut self.query,
            VARIABLES_PARAMETER => &mut self.variables,
            OPERATION_NAME_KEY => &mut self.operation_name,
            _ => return,
        };
        slot.get_or_insert(value);
    }

    /// Fills missing parameters from `fallback`.
    fn or(self, fallback: Parameters) -> Self {
        Self {
            query: self.query.or(fallback.query),
            variables: self.variables.or(fallback.variables),
            operation_name: self.operation_name.or(fallback.operation_name),
        }
    }

    fn into_request(self, upload: Option<UploadedFile>) -> Result<Request, RequestDecodeError> {
        let query = self.query.ok_or_else(|| RequestDecodeError::MissingQuery {
            key: QUERY_PARAMETER.to_string(),
        })?;
        let variables = match self.variables {
            Some(text) if !text.trim().is_empty() => {
                parse_object(&text).map_err(RequestDecodeError::MalformedVariables)?
            }
            _ => None,
        };
        Ok(Request::builder()
            .query(query)
            .and_variables(variables)
            .and_operation_name(self.operation_name)
            .and_upload(upload)
            .build())
    }
}

/// Turns HTTP requests into GraphQL requests.
///
/// Decoding never executes anything; it fails only when the HTTP request
/// itself is unusable.
#[derive(Clone, Debug)]
pub struct RequestDecoder {
    query_key: String,
    variables_key: String,
    upload_part_name: String,
}

impl RequestDecoder {
    /// Creates a decoder using the key names configured for `server`.
    pub fn new(server: &Server) -> Self {
        Self {
            query_key: server.query_key().to_string(),
            variables_key: server.variables_key().to_string(),
            upload_part_name: server.upload_part_name().to_string(),
        }
    }

    /// Decodes a request, choosing the encoding from its method and content type.
    ///
    /// `HEAD` requests are read like `GET` requests.
    pub async fn decode(&self, parts: &Parts, body: Bytes) -> Result<Request, RequestDecodeError> {
        if parts.method == Method::GET || parts.method == Method::HEAD {
            return self.decode_get(parts);
        }
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        match Encoding::from_content_type(content_type)? {
            Encoding::Raw => self.decode_raw(parts, &body),
            Encoding::Json => self.decode_json(&body),
            Encoding::Multipart { boundary } => self.decode_multipart(parts, boundary, body).await,
            Encoding::Form => self.decode_form(parts, &body),
        }
    }

    /// `GET`: everything comes from the query string.
    pub fn decode_get(&self, parts: &Parts) -> Result<Request, RequestDecodeError> {
        Parameters::from_uri(parts)?.into_request(None)
    }

    /// `application/graphql`: the body is the query, the operation name is a
    /// query string parameter.
    pub fn decode_raw(&self, parts: &Parts, body: &[u8]) -> Result<Request, RequestDecodeError> {
        let query = std::str::from_utf8(body).map_err(|_| RequestDecodeError::InvalidUtf8)?;
        let operation_name = Parameters::from_uri(parts)?.operation_name;
        Ok(Request::builder()
            .query(query)
            .and_operation_name(operation_name)
            .build())
    }

    /// `application/json`: the body is an object with configurable keys.
    ///
    /// A missing or non-string query is left for execution to reject, and
    /// variables that are not an object are ignored.
    pub fn decode_json(&self, body: &[u8]) -> Result<Request, RequestDecodeError> {
        let object: Object =
            serde_json::from_slice(body).map_err(RequestDecodeError::MalformedJson)?;
        let query = object
            .get(self.query_key.as_str())
            .and_then(Value::as_str)
            .map(str::to_string);
        let operation_name = object
            .get(OPERATION_NAME_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        let variables = match object.get(self.variables_key.as_str()) {
            Some(Value::Object(variables)) => Some(variables.clone()),
            Some(other) if !other.is_null() => {
                tracing::debug!(
                    found = crate::json_ext::value_kind(other),
                    "ignoring variables which are not an object"
                );
                None
            }
            _ => None,
        };
        Ok(Request::builder()
            .and_query(query)
            .and_variables(variables)
            .and_operation_name(operation_name)
            .build())
    }

    /// `multipart/form-data`: a file part plus the same parameters as `GET`,
    /// read from the form or else from the query string.
    pub async fn decode_multipart(
        &self,
        parts: &Parts,
        boundary: String,
        body: Bytes,
    ) -> Result<Request, RequestDecodeError> {
        let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let mut form = Parameters::default();
        let mut upload = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(RequestDecodeError::Multipart)?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == self.upload_part_name {
                if upload.is_some() {
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(ToString::to_string);
                let contents = field.bytes().await.map_err(RequestDecodeError::Multipart)?;
                upload = Some(UploadedFile {
                    part_name: name,
                    file_name,
                    content_type,
                    contents,
                });
            } else if matches!(
                name.as_str(),
                QUERY_PARAMETER | VARIABLES_PARAMETER | OPERATION_NAME_KEY
            ) {
                let text = field.text().await.map_err(RequestDecodeError::Multipart)?;
                form.set(&name, text);
            }
        }

        let upload = upload.ok_or_else(|| RequestDecodeError::MissingFile {
            part: self.upload_part_name.clone(),
        })?;
        form.or(Parameters::from_uri(parts)?)
            .into_request(Some(upload))
    }

    /// `application/x-www-form-urlencoded`: the same parameters as `GET`, read
    /// from the body or else from the query string.
    pub fn decode_form(&self, parts: &Parts, body: &[u8]) -> Result<Request, RequestDecodeError> {
        Parameters::parse(body)?
            .or(Parameters::from_uri(parts)?)
            .into_request(None)
    }
}
