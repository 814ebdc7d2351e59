//! The request pipeline: decode, resolve the schema, dispatch, translate, assemble.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;

pub use self::assemble::assemble;
pub use self::decode::RequestDecoder;
pub use self::dispatch::ExecutionDispatcher;
pub use self::translate::translate;
use crate::cache::DocumentCache;
use crate::configuration::Configuration;
use crate::context::TransportRequest;
use crate::engine::CompilerEngine;
use crate::engine::Engine;
use crate::error::RequestDecodeError;
use crate::graphql;
use crate::introspection::INTROSPECTION_QUERY;
use crate::schema::SchemaRegistry;

pub mod assemble;
pub mod decode;
pub mod dispatch;
pub mod translate;

/// Header naming the schema a request targets.
pub const SCHEMA_HEADER: &str = "graphql-schema";

/// Runs HTTP requests through the whole pipeline.
#[derive(Clone)]
pub struct GraphQLService {
    decoder: RequestDecoder,
    registry: Arc<SchemaRegistry>,
    dispatcher: ExecutionDispatcher,
    documents: Arc<DocumentCache>,
}

#[buildstructor::buildstructor]
impl GraphQLService {
    /// Creates the service.
    ///
    /// Without an explicit engine, a [`CompilerEngine`] reading documents from
    /// the service's document cache is used.
    #[builder(visibility = "pub")]
    fn new(
        configuration: Arc<Configuration>,
        registry: Arc<SchemaRegistry>,
        engine: Option<Arc<dyn Engine>>,
    ) -> Self {
        let documents = Arc::new(DocumentCache::new(configuration.document_cache.capacity));
        let engine =
            engine.unwrap_or_else(|| Arc::new(CompilerEngine::new(documents.clone())));
        Self {
            decoder: RequestDecoder::new(&configuration.server),
            registry,
            dispatcher: ExecutionDispatcher::new(engine),
            documents,
        }
    }

    /// Decodes and executes a GraphQL request.
    ///
    /// Only decoding can fail; execution problems are reported in the response.
    pub async fn call(
        &self,
        parts: &Parts,
        body: Bytes,
    ) -> Result<graphql::Response, RequestDecodeError> {
        let request = self.decoder.decode(parts, body).await?;
        let schema = self.registry.resolve(schema_hint(parts));
        let result = self
            .dispatcher
            .dispatch(request, TransportRequest::from(parts), schema);
        Ok(assemble(result))
    }

    /// Runs the introspection query against the schema `parts` targets.
    ///
    /// Only the data is returned; it is `null` when no schema is resolved or
    /// introspection fails.
    pub fn introspect(&self, parts: &Parts) -> graphql::Response {
        let schema = self.registry.resolve(schema_hint(parts));
        let result = self.dispatcher.dispatch(
            graphql::Request::builder().query(INTROSPECTION_QUERY).build(),
            TransportRequest::from(parts),
            schema,
        );
        if !result.errors.is_empty() {
            tracing::error!(errors = ?result.errors, "introspection failed");
        }
        graphql::Response::builder().and_data(result.data).build()
    }

    /// The schemas served.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The cache of parsed documents.
    pub fn documents(&self) -> &DocumentCache {
        &self.documents
    }
}

fn schema_hint(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(SCHEMA_HEADER)
        .and_then(|value| value.to_str().ok())
}
