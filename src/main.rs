use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use placeholder_gateway::{
    Gateway, GatewayConfig, GatewayContext, GatewayError, HttpRemoteCollectionClient,
    SchemaRegistry, SqlUserStore,
    config::GatewayArgs,
    resolvers::standard_table,
    server::{self, GRAPHIQL_PATH, GRAPHQL_PATH},
};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    match run(GatewayArgs::parse()).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway stopped");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(args: GatewayArgs) -> Result<(), GatewayError> {
    let config = GatewayConfig::load(args)?;
    info!(
        upstream = %config.upstream_url,
        users_source = ?config.users_source,
        "starting gateway"
    );

    let remote =
        HttpRemoteCollectionClient::new(config.upstream_url.clone(), config.upstream_timeout)?;
    let store = SqlUserStore::connect(&config.database_url, config.max_connections).await?;
    let context = GatewayContext::new(Arc::new(remote), Arc::new(store));

    let registry = SchemaRegistry::builtin()?;
    let table = standard_table(config.users_source)?;
    let gateway = Arc::new(Gateway::new(&registry, &table, context)?);

    let listener = TcpListener::bind(config.listen).await?;
    let addr = listener.local_addr()?;
    info!("GraphQL gateway listening on http://{addr}{GRAPHQL_PATH}");
    info!("GraphiQL UI available at http://{addr}{GRAPHIQL_PATH}");

    server::serve(listener, gateway).await
}
