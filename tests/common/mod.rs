#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use placeholder_gateway::{
    Gateway, GatewayContext, GatewayError, GraphQLRequest, RemoteCollection, SchemaRegistry,
    SqlUserStore, UsersSource,
    model::{Post, RemoteUser},
    resolvers::standard_table,
};
use serde_json::Value;

/// Upstream stand-in serving fixed collections.
pub struct StaticRemote {
    users: Vec<RemoteUser>,
    posts: Vec<Post>,
    available: bool,
}

impl StaticRemote {
    pub fn sample() -> Self {
        StaticRemote {
            users: vec![
                remote_user("1", "Leanne Graham", "Sincere@april.biz"),
                remote_user("2", "Ervin Howell", "Shanna@melissa.tv"),
            ],
            posts: vec![
                post("1", "1", "sunt aut facere"),
                post("2", "2", "qui est esse"),
                post("3", "1", "ea molestias quasi"),
            ],
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        StaticRemote {
            users: Vec::new(),
            posts: Vec::new(),
            available: false,
        }
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.available {
            Ok(())
        } else {
            Err(GatewayError::UpstreamUnavailable {
                message: "connection refused".to_string(),
            })
        }
    }
}

pub fn remote_user(id: &str, name: &str, email: &str) -> RemoteUser {
    RemoteUser {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
    }
}

pub fn post(id: &str, user_id: &str, title: &str) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        body: format!("body of {title}"),
        user_id: user_id.to_string(),
    }
}

#[async_trait]
impl RemoteCollection for StaticRemote {
    async fn list_users(&self) -> Result<Vec<RemoteUser>, GatewayError> {
        self.check()?;
        Ok(self.users.clone())
    }

    async fn get_user(&self, id: &str) -> Result<RemoteUser, GatewayError> {
        self.check()?;
        self.users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("user", id))
    }

    async fn list_posts(&self) -> Result<Vec<Post>, GatewayError> {
        self.check()?;
        Ok(self.posts.clone())
    }
}

// Test fixture wiring the gateway to an in-memory store and a static upstream
pub struct TestFixture {
    pub gateway: Gateway,
}

impl TestFixture {
    pub async fn setup(users_source: UsersSource) -> Self {
        Self::with_remote(users_source, StaticRemote::sample()).await
    }

    pub async fn with_remote(users_source: UsersSource, remote: StaticRemote) -> Self {
        let store = SqlUserStore::connect("sqlite::memory:", 1)
            .await
            .expect("in-memory store");
        let context = GatewayContext::new(Arc::new(remote), Arc::new(store));

        let registry = SchemaRegistry::builtin().expect("builtin schema");
        let table = standard_table(users_source).expect("standard bindings");
        let gateway = Gateway::new(&registry, &table, context).expect("gateway schema");

        TestFixture { gateway }
    }

    pub async fn execute_query(&self, query: &str, variables: Option<Value>) -> Value {
        let mut request = GraphQLRequest::new(query);
        if let Some(variables) = variables {
            request = request.with_variables(variables);
        }
        self.gateway
            .process_request(request)
            .await
            .expect("serializable response")
    }
}

/// `extensions.code` of the first error in a response.
pub fn first_error_code(response: &Value) -> Option<&str> {
    response["errors"][0]["extensions"]["code"].as_str()
}
