//! The HTTP surface, built on axum.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::request::Parts;
use http_body_util::LengthLimitError;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::configuration::Configuration;
use crate::engine::Engine;
use crate::error::RequestDecodeError;
use crate::error::ServerError;
use crate::schema::SchemaRegistry;
use crate::services::GraphQLService;

/// Serves the GraphQL endpoints over HTTP.
pub struct GraphQLServer {
    configuration: Arc<Configuration>,
    service: Arc<GraphQLService>,
}

#[buildstructor::buildstructor]
impl GraphQLServer {
    /// Creates a server for the schemas of `registry`.
    #[builder(visibility = "pub")]
    fn new(
        configuration: Arc<Configuration>,
        registry: Arc<SchemaRegistry>,
        engine: Option<Arc<dyn Engine>>,
    ) -> Self {
        let service = GraphQLService::builder()
            .configuration(configuration.clone())
            .registry(registry)
            .and_engine(engine)
            .build();
        Self {
            configuration,
            service: Arc::new(service),
        }
    }

    /// The pipeline requests go through.
    pub fn service(&self) -> &GraphQLService {
        &self.service
    }

    /// The routes of the server:
    ///
    /// * `GET {path}/schema`: introspection
    /// * `GET {path}`: query string parameters
    /// * `POST {path}`: raw query, JSON, multipart or form-encoded bodies
    pub fn router(&self) -> Router {
        let server = &self.configuration.server;
        let state = HandlerState {
            service: self.service.clone(),
            max_request_bytes: server.max_request_bytes(),
        };
        Router::new()
            .route(&server.schema_path(), get(handle_schema))
            .route(server.path(), get(handle_graphql).post(handle_graphql))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serves until `shutdown` completes.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.configuration.server.listen();
        let listener = TcpListener::bind(address)
            .await
            .map_err(|err| ServerError::Bind(address, err))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` completes.
    pub async fn serve_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address: SocketAddr = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(
            "GraphQL endpoint exposed at http://{}{} 🚀",
            address,
            self.configuration.server.path()
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;
        tracing::info!("stopped");
        Ok(())
    }
}

#[derive(Clone)]
struct HandlerState {
    service: Arc<GraphQLService>,
    max_request_bytes: usize,
}

async fn handle_graphql(State(state): State<HandlerState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match read_body(&parts, body, state.max_request_bytes).await {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };
    match state.service.call(&parts, body).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_schema(State(state): State<HandlerState>, request: Request) -> Response {
    let (parts, _) = request.into_parts();
    Json(state.service.introspect(&parts)).into_response()
}

/// Buffers the body, refusing more than `limit` bytes.
async fn read_body(parts: &Parts, body: Body, limit: usize) -> Result<Bytes, RequestDecodeError> {
    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > limit) {
        return Err(RequestDecodeError::PayloadTooLarge { limit });
    }
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        let err = err.into_inner();
        if err.is::<LengthLimitError>() {
            RequestDecodeError::PayloadTooLarge { limit }
        } else {
            RequestDecodeError::Body(err.to_string())
        }
    })
}

impl IntoResponse for RequestDecodeError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "invalid GraphQL request");
        let body = json!({
            "errors": [{
                "message": "Invalid GraphQL request",
                "extensions": {
                    "code": self.extension_code(),
                    "details": self.to_string(),
                }
            }]
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use serde_json_bytes::json as bjson;
    use tower::ServiceExt;

    use super::*;
    use crate::schema::Resolvers;
    use crate::schema::SchemaHandle;

    fn server(configuration: Configuration) -> GraphQLServer {
        let schema = SchemaHandle::builder()
            .name("starwars")
            .sdl("type Query { hero: Character } type Character { name: String }")
            .resolvers(
                Resolvers::new()
                    .field("Query", "hero", |_, _, _| Ok(bjson!({ "name": "Luke" }))),
            )
            .build()
            .unwrap();
        GraphQLServer::builder()
            .configuration(Arc::new(configuration))
            .registry(Arc::new(SchemaRegistry::new([schema]).unwrap()))
            .build()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn serves_on_the_configured_path() {
        let configuration: Configuration = "server:\n  path: /api\n".parse().unwrap();
        let router = server(configuration).router();

        let response = router
            .clone()
            .oneshot(
                http::Request::get("/api?query=%7Bhero%7Bname%7D%7D")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            body_json(response).await,
            json!({ "data": { "hero": { "name": "Luke" } } })
        );

        let response = router
            .oneshot(
                http::Request::get("/graphql?query=%7Bhero%7Bname%7D%7D")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unsupported_media_type() {
        let response = server(Configuration::default())
            .router()
            .oneshot(
                http::Request::post("/graphql")
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Body::from("{ hero { name } }"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            body_json(response).await,
            json!({
                "errors": [{
                    "message": "Invalid GraphQL request",
                    "extensions": {
                        "code": "UNSUPPORTED_MEDIA_TYPE",
                        "details": "unsupported content type 'text/plain'"
                    }
                }]
            })
        );
    }

    #[tokio::test]
    async fn request_bodies_are_limited() {
        let query = "{ hero { name } }";
        let configuration = Configuration::builder()
            .server(
                crate::configuration::Server::builder()
                    .max_request_bytes(std::num::NonZeroUsize::new(query.len()).unwrap())
                    .build(),
            )
            .build()
            .unwrap();
        let router = server(configuration).router();
        let raw = |body: String| {
            http::Request::post("/graphql")
                .header(CONTENT_TYPE, "application/graphql")
                .body(Body::from(body))
                .unwrap()
        };

        let response = router.clone().oneshot(raw(query.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(raw(format!("{query} "))).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body_json(response).await["errors"][0]["extensions"]["code"],
            "PAYLOAD_TOO_LARGE"
        );

        // without a declared length the limit applies while reading
        let chunks = futures::stream::iter([
            Ok::<_, std::io::Error>(Bytes::from_static(b"{ hero ")),
            Ok(Bytes::from_static(b"{ name } } ")),
        ]);
        let response = router
            .oneshot(
                http::Request::post("/graphql")
                    .header(CONTENT_TYPE, "application/graphql")
                    .body(Body::from_stream(chunks))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn serve_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server(Configuration::default()).serve_listener(
            listener,
            async move {
                let _ = rx.await;
            },
        ));
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
