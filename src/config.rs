use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use reqwest::Url;
use serde::Deserialize;

use crate::{error::GatewayError, remote_client::DEFAULT_UPSTREAM_URL, resolvers::UsersSource};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:4000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://gateway.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Command line of the gateway binary. Every flag can also be given through
/// the environment or the optional YAML file.
#[derive(Debug, Default, Parser)]
#[command(name = "placeholder-gateway", version, about)]
pub struct GatewayArgs {
    /// YAML file providing defaults for the options below
    #[arg(long, env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the GraphQL endpoint listens on
    #[arg(long, env = "GATEWAY_LISTEN")]
    pub listen: Option<String>,

    /// Connection string of the relational user store
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Size of the user store connection pool
    #[arg(long, env = "GATEWAY_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Base URL of the upstream REST collections
    #[arg(long, env = "GATEWAY_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Timeout applied to each upstream request, in seconds
    #[arg(long, env = "GATEWAY_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Backing store of `Query.users`
    #[arg(long, value_enum, env = "GATEWAY_USERS_SOURCE")]
    pub users_source: Option<UsersSource>,
}

/// Contents of the optional YAML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub upstream_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    pub users_source: Option<UsersSource>,
}

impl FileConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, GatewayError> {
        serde_yaml::from_str(contents)
            .map_err(|e| GatewayError::config(format!("failed to parse config file: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }
}

/// Fully resolved and validated gateway settings.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub upstream_url: Url,
    pub upstream_timeout: Duration,
    pub users_source: UsersSource,
}

impl GatewayConfig {
    /// Reads the file named by `--config`, if any, and lays the command line
    /// over it.
    pub fn load(args: GatewayArgs) -> Result<Self, GatewayError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    /// Command line and environment win over the file, the file wins over
    /// the defaults.
    pub fn resolve(args: GatewayArgs, file: FileConfig) -> Result<Self, GatewayError> {
        let listen = args
            .listen
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen
            .parse::<SocketAddr>()
            .map_err(|e| GatewayError::config(format!("invalid listen address {listen}: {e}")))?;

        let upstream_url = args
            .upstream_url
            .or(file.upstream_url)
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_url = Url::parse(&upstream_url).map_err(|e| {
            GatewayError::config(format!("invalid upstream url {upstream_url}: {e}"))
        })?;

        let max_connections = args
            .max_connections
            .or(file.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(GatewayError::config("max connections must be at least 1"));
        }

        let upstream_timeout_secs = args
            .upstream_timeout_secs
            .or(file.upstream_timeout_secs)
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
        if upstream_timeout_secs == 0 {
            return Err(GatewayError::config("upstream timeout must be at least 1s"));
        }

        Ok(GatewayConfig {
            listen,
            database_url: args
                .database_url
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections,
            upstream_url,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            users_source: args
                .users_source
                .or(file.users_source)
                .unwrap_or_default(),
        })
    }
}
