//! Main entry point for CLI command to start server.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::axum_factory::GraphQLServer;
use crate::configuration::Configuration;
use crate::configuration::generate_config_schema;
use crate::schema::SchemaRegistry;

/// Output format of the logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Options for the server
#[derive(Parser, Debug)]
#[clap(
    name = "graphql-http-server",
    about = "Serves GraphQL schemas over HTTP",
    disable_version_flag = true
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[clap(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "GRAPHQL_SERVER_LOG"
    )]
    log_level: String,

    /// Log output format.
    #[clap(
        long = "log-format",
        value_enum,
        default_value_t = LogFormat::Text,
        env = "GRAPHQL_SERVER_LOG_FORMAT"
    )]
    log_format: LogFormat,

    /// Configuration location relative to the working directory.
    #[clap(short, long = "config", env = "GRAPHQL_SERVER_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Prints the configuration schema.
    #[clap(long)]
    schema: bool,

    /// Display version and exit.
    #[clap(long, short = 'V')]
    version: bool,
}

/// This is the main server entrypoint.
///
/// Starts a Tokio runtime and runs a server in it based on command-line options.
/// Returns on fatal error or after graceful shutdown has completed.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("GRAPHQL_SERVER_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(Executable::builder().start())
}

/// Entry point into creating a server executable.
#[non_exhaustive]
pub struct Executable {}

#[buildstructor::buildstructor]
impl Executable {
    /// Returns a builder that can parse command-line options and run a server.
    ///
    /// ```no_run
    /// use anyhow::Result;
    /// use graphql_http_server::Executable;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<()> {
    /// Executable::builder().start().await
    /// # }
    /// ```
    #[builder(entry = "builder", exit = "start", visibility = "pub")]
    async fn start(cli_args: Option<Vec<String>>) -> Result<()> {
        let opt = match cli_args {
            Some(args) => Opt::parse_from(args),
            None => Opt::parse(),
        };

        if opt.version {
            println!("{}", std::env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        if opt.schema {
            let schema = generate_config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        init_subscriber(&opt)?;
        Self::inner_start(opt).await
    }

    async fn inner_start(opt: Opt) -> Result<()> {
        let configuration = match &opt.config_path {
            Some(path) => {
                let path = if path.is_relative() {
                    std::env::current_dir()?.join(path)
                } else {
                    path.clone()
                };
                Configuration::from_file(&path)
                    .with_context(|| format!("failed to load configuration from {}", path.display()))?
            }
            None => Configuration::default(),
        };

        let registry =
            SchemaRegistry::load(&configuration.schemas).context("failed to load schemas")?;
        if registry.is_empty() {
            tracing::warn!("no schema configured, every request will report an undefined schema");
        } else {
            tracing::info!(schemas = ?registry.names(), "schemas loaded");
        }

        let server = GraphQLServer::builder()
            .configuration(std::sync::Arc::new(configuration))
            .registry(std::sync::Arc::new(registry))
            .build();
        server
            .serve(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::error!("failed to listen for shutdown signal: {}", err);
                }
                tracing::info!("shutting down");
            })
            .await?;
        Ok(())
    }
}

fn init_subscriber(opt: &Opt) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| opt.log_level.clone());
    let builder = tracing_subscriber::fmt::fmt()
        .with_env_filter(EnvFilter::try_new(&env_filter).context("could not parse log")?);
    let result = match opt.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| anyhow::anyhow!("failed to set the global subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parse_options() {
        let opt = Opt::parse_from([
            "graphql-http-server",
            "--config",
            "server.yaml",
            "--log",
            "debug",
            "--log-format",
            "json",
        ]);
        assert_eq!(opt.config_path, Some(PathBuf::from("server.yaml")));
        assert_eq!(opt.log_level, "debug");
        assert_eq!(opt.log_format, LogFormat::Json);
        assert!(!opt.schema);
    }

    #[tokio::test]
    async fn prints_the_configuration_schema() {
        Executable::builder()
            .cli_args(vec!["graphql-http-server".to_string(), "--schema".to_string()])
            .start()
            .await
            .unwrap();
    }
}
