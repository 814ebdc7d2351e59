//! Per-request data made available to resolvers.

use bytes::Bytes;
use http::HeaderMap;
use http::Method;
use http::Uri;
use http::request::Parts;

/// The parts of the originating HTTP request that resolvers may read.
#[derive(Clone, Debug, Default)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The request URI, including its query string.
    pub uri: Uri,
    /// The request headers.
    pub headers: HeaderMap,
}

impl From<&Parts> for TransportRequest {
    fn from(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}

/// A file received in a `multipart/form-data` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    /// The name of the form part which carried the file.
    pub part_name: String,
    /// The file name announced by the client.
    pub file_name: Option<String>,
    /// The content type announced by the client.
    pub content_type: Option<String>,
    /// The file contents.
    pub contents: Bytes,
}

/// Ambient data for a single execution.
///
/// Handed to every field resolver.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    transport: TransportRequest,
    upload: Option<UploadedFile>,
}

#[buildstructor::buildstructor]
impl ExecutionContext {
    #[builder(visibility = "pub")]
    fn new(transport: Option<TransportRequest>, upload: Option<UploadedFile>) -> Self {
        Self {
            transport: transport.unwrap_or_default(),
            upload,
        }
    }

    /// The originating HTTP request.
    pub fn transport(&self) -> &TransportRequest {
        &self.transport
    }

    /// The uploaded file, for multipart requests.
    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    /// Looks up a header of the originating request.
    ///
    /// Returns `None` when the header is absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.transport
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}
