use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::GatewayError,
    model::{Post, RemoteUser},
};

pub const DEFAULT_UPSTREAM_URL: &str = "https://jsonplaceholder.typicode.com/";

/// Read-only access to the upstream user and post collections.
#[async_trait]
pub trait RemoteCollection {
    async fn list_users(&self) -> Result<Vec<RemoteUser>, GatewayError>;
    async fn get_user(&self, id: &str) -> Result<RemoteUser, GatewayError>;
    async fn list_posts(&self) -> Result<Vec<Post>, GatewayError>;
}

/// `RemoteCollection` backed by plain HTTP GETs against one base URL.
pub struct HttpRemoteCollectionClient {
    client: Client,
    base_url: Url,
}

impl HttpRemoteCollectionClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, GatewayError> {
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::config(format!(
                "upstream url {base_url} cannot be used as a base"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("failed to build http client: {e}")))?;

        Ok(HttpRemoteCollectionClient { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::config(format!("invalid upstream url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetches one resource, returning `None` when the upstream answers 404.
    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, GatewayError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        debug!(%url, %status, "upstream request completed");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GatewayError::UpstreamUnavailable {
                message: format!("{url} answered {status}"),
            });
        }

        let body = response.bytes().await?;
        decode(&body).map(Some)
    }

    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let url = self.endpoint(&[collection])?;
        match self.fetch(url.clone()).await? {
            Some(items) => Ok(items),
            None => Err(GatewayError::UpstreamUnavailable {
                message: format!("{url} answered {}", StatusCode::NOT_FOUND),
            }),
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Decode {
        message: e.to_string(),
    })
}

#[async_trait]
impl RemoteCollection for HttpRemoteCollectionClient {
    async fn list_users(&self) -> Result<Vec<RemoteUser>, GatewayError> {
        self.fetch_collection("users").await
    }

    async fn get_user(&self, id: &str) -> Result<RemoteUser, GatewayError> {
        // `users/` is the collection route, not a user.
        if id.trim().is_empty() {
            return Err(GatewayError::not_found("user", id));
        }

        let url = self.endpoint(&["users", id])?;
        let Some(payload) = self.fetch::<Value>(url).await? else {
            return Err(GatewayError::not_found("user", id));
        };

        // Unknown ids come back as an empty object on some routes, and a route
        // that falls through to the collection answers with the whole list.
        let no_record = match &payload {
            Value::Object(fields) => fields.is_empty(),
            Value::Array(_) => true,
            _ => false,
        };
        if no_record {
            return Err(GatewayError::not_found("user", id));
        }

        let user: RemoteUser = serde_json::from_value(payload).map_err(|e| {
            GatewayError::Decode {
                message: e.to_string(),
            }
        })?;
        if user.id != id {
            return Err(GatewayError::not_found("user", id));
        }
        Ok(user)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, GatewayError> {
        self.fetch_collection("posts").await
    }
}
