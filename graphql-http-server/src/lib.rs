//! Serves GraphQL schemas over HTTP.
//!
//! Requests arrive in one of five transport encodings and are normalized into
//! a [`graphql::Request`]. A schema is then picked from the [`SchemaRegistry`],
//! the request is executed through an [`Engine`] whose parsed documents are
//! kept in a [`DocumentCache`], and engine errors are translated into the
//! client-facing [`graphql::Response`] envelope.

#![warn(unreachable_pub)]

pub mod json_ext;

pub mod axum_factory;
pub mod cache;
pub mod configuration;
pub mod context;
pub mod engine;
pub mod error;
mod executable;
pub mod graphql;
pub mod introspection;
pub mod schema;
pub mod services;

pub use axum_factory::GraphQLServer;
pub use cache::DocumentCache;
pub use cache::DocumentProvider;
pub use configuration::Configuration;
pub use context::ExecutionContext;
pub use engine::CompilerEngine;
pub use engine::Engine;
pub use executable::Executable;
pub use executable::main;
pub use schema::SchemaHandle;
pub use schema::SchemaRegistry;
