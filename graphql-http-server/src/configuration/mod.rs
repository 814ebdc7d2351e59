//! Logic for loading configuration in to an object model

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::cache;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file '{path}': {source}
    Read {
        /// The configuration file.
        path: String,
        /// The IO error.
        source: std::io::Error,
    },
    /// could not deserialize configuration: {0}
    Deserialize(#[from] serde_yaml::Error),
    /// invalid server path '{0}': it must start with '/' and must not end with '/'
    InvalidPath(String),
}

/// The configuration of the server.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with the builder.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    #[serde(default)]
    pub server: Server,

    /// Cache of parsed GraphQL documents.
    #[serde(default)]
    pub document_cache: DocumentCache,

    /// The schemas to serve.
    #[serde(default)]
    pub schemas: Vec<SchemaSource>,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(
        server: Option<Server>,
        document_cache: Option<DocumentCache>,
        schemas: Vec<SchemaSource>,
    ) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            server: server.unwrap_or_default(),
            document_cache: document_cache.unwrap_or_default(),
            schemas,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Reads and validates a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw_yaml = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        raw_yaml.parse()
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let path = &self.server.path;
        if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
            return Err(ConfigurationError::InvalidPath(path.clone()));
        }
        Ok(())
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration = if s.trim().is_empty() {
            Configuration::default()
        } else {
            serde_yaml::from_str(s)?
        };
        configuration.validate()?;
        Ok(configuration)
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_path() -> String {
    "/graphql".to_string()
}

fn default_query_key() -> String {
    "query".to_string()
}

fn default_variables_key() -> String {
    "variables".to_string()
}

fn default_upload_part_name() -> String {
    "file".to_string()
}

const DEFAULT_MAX_REQUEST_BYTES: NonZeroUsize = match NonZeroUsize::new(2_000_000) {
    Some(limit) => limit,
    None => unreachable!(),
};

fn default_max_request_bytes() -> NonZeroUsize {
    DEFAULT_MAX_REQUEST_BYTES
}

/// Configuration options pertaining to the http server component.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Server {
    /// The socket address and port to listen on
    /// Defaults to 127.0.0.1:4000
    #[serde(default = "default_listen")]
    pub(crate) listen: SocketAddr,

    /// The HTTP path on which GraphQL requests will be served.
    /// The introspection endpoint is served below it, at `{path}/schema`.
    /// default: "/graphql"
    #[serde(default = "default_path")]
    pub(crate) path: String,

    /// Key of the query text in JSON request bodies.
    /// A blank key means the default.
    /// default: "query"
    #[serde(default = "default_query_key")]
    pub(crate) query_key: String,

    /// Key of the variables in JSON request bodies.
    /// A blank key means the default.
    /// default: "variables"
    #[serde(default = "default_variables_key")]
    pub(crate) variables_key: String,

    /// Name of the form part carrying the file of multipart requests.
    /// A blank name means the default.
    /// default: "file"
    #[serde(default = "default_upload_part_name")]
    pub(crate) upload_part_name: String,

    /// Largest request body accepted, in bytes. Larger bodies are rejected
    /// with `413 Payload Too Large`.
    /// default: 2000000
    #[serde(default = "default_max_request_bytes")]
    pub(crate) max_request_bytes: NonZeroUsize,
}

#[buildstructor::buildstructor]
impl Server {
    #[builder(visibility = "pub")]
    fn new(
        listen: Option<SocketAddr>,
        path: Option<String>,
        query_key: Option<String>,
        variables_key: Option<String>,
        upload_part_name: Option<String>,
        max_request_bytes: Option<NonZeroUsize>,
    ) -> Self {
        Self {
            listen: listen.unwrap_or_else(default_listen),
            path: path.unwrap_or_else(default_path),
            query_key: query_key.unwrap_or_else(default_query_key),
            variables_key: variables_key.unwrap_or_else(default_variables_key),
            upload_part_name: upload_part_name.unwrap_or_else(default_upload_part_name),
            max_request_bytes: max_request_bytes.unwrap_or_else(default_max_request_bytes),
        }
    }

    /// The socket address to listen on.
    pub fn listen(&self) -> SocketAddr {
        self.listen
    }

    /// The HTTP path of the GraphQL endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The HTTP path of the introspection endpoint.
    pub fn schema_path(&self) -> String {
        format!("{}/schema", self.path.trim_end_matches('/'))
    }

    /// Key of the query text in JSON bodies.
    pub fn query_key(&self) -> &str {
        non_blank_or(&self.query_key, "query")
    }

    /// Key of the variables in JSON bodies.
    pub fn variables_key(&self) -> &str {
        non_blank_or(&self.variables_key, "variables")
    }

    /// Name of the multipart file part.
    pub fn upload_part_name(&self) -> &str {
        non_blank_or(&self.upload_part_name, "file")
    }

    /// Largest request body accepted, in bytes.
    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes.get()
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn non_blank_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Configuration of the cache of parsed GraphQL documents.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DocumentCache {
    /// Maximum number of documents kept.
    /// default: 10000
    #[serde(default = "default_document_cache_capacity")]
    pub capacity: NonZeroUsize,
}

fn default_document_cache_capacity() -> NonZeroUsize {
    cache::DEFAULT_CAPACITY
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self {
            capacity: default_document_cache_capacity(),
        }
    }
}

/// A schema to serve.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SchemaSource {
    /// The name clients select the schema with, in the `graphql-schema` header.
    pub name: String,
    /// Path to the schema definition language file.
    pub sdl: PathBuf,
    /// Path to a JSON file holding the root object of the data served.
    #[serde(default)]
    pub data: Option<PathBuf>,
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}

#[cfg(test)]
mod tests;
