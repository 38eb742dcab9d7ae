pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod remote_client;
pub mod resolver_table;
pub mod resolvers;
pub mod schema_registry;
pub mod server;
pub mod user_store;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use remote_client::{HttpRemoteCollectionClient, RemoteCollection};
pub use resolver_table::{Resolver, ResolverTable};
pub use resolvers::UsersSource;
pub use schema_registry::SchemaRegistry;
pub use user_store::{SqlUserStore, UserStore};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A GraphQL-over-HTTP request body.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Value>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        GraphQLRequest {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// The clients every resolver works through. One instance lives for the
/// whole process; tests build their own with fakes.
#[derive(Clone)]
pub struct GatewayContext {
    pub remote: Arc<dyn RemoteCollection + Send + Sync>,
    pub store: Arc<dyn UserStore + Send + Sync>,
}

impl GatewayContext {
    pub fn new(
        remote: Arc<dyn RemoteCollection + Send + Sync>,
        store: Arc<dyn UserStore + Send + Sync>,
    ) -> Self {
        GatewayContext { remote, store }
    }
}
