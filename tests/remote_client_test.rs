use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use placeholder_gateway::{GatewayError, HttpRemoteCollectionClient, RemoteCollection};
use pretty_assertions::assert_eq;
use reqwest::Url;
use tokio::net::TcpListener;

const USERS: &str = r#"[
  { "id": 1, "name": "Leanne Graham", "username": "Bret", "email": "Sincere@april.biz" },
  { "id": 2, "name": "Ervin Howell", "username": "Antonette", "email": "Shanna@melissa.tv" }
]"#;

const USER_ONE: &str =
    r#"{ "id": 1, "name": "Leanne Graham", "username": "Bret", "email": "Sincere@april.biz" }"#;

const POSTS: &str = r#"[
  { "userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit" },
  { "userId": 1, "id": 2, "title": "qui est esse", "body": "est rerum tempore" },
  { "userId": 2, "id": 11, "title": "et ea vero quia", "body": "delectus reiciendis" }
]"#;

fn reply(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match req.uri().path() {
        "/users" | "/users/" | "/users/9" => reply(StatusCode::OK, USERS),
        "/users/1" => reply(StatusCode::OK, USER_ONE),
        "/users/7" => reply(StatusCode::OK, "{}"),
        "/users/8" => reply(StatusCode::OK, USER_ONE),
        "/posts" => reply(StatusCode::OK, POSTS),
        "/broken/users" | "/broken/posts" => reply(StatusCode::OK, "<html>oops</html>"),
        "/failing/users" | "/failing/posts" | "/failing/users/1" => {
            reply(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
        "/slow/posts" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            reply(StatusCode::OK, POSTS)
        }
        _ => reply(StatusCode::NOT_FOUND, "{}"),
    };
    Ok(response)
}

async fn spawn_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(route))
                    .await;
            });
        }
    });

    addr
}

async fn client_at(path: &str) -> HttpRemoteCollectionClient {
    let addr = spawn_upstream().await;
    let base = Url::parse(&format!("http://{addr}{path}")).unwrap();
    HttpRemoteCollectionClient::new(base, Duration::from_secs(1)).unwrap()
}

#[tokio::test]
async fn lists_users_with_numeric_ids_as_strings() {
    let client = client_at("/").await;

    let users = client.list_users().await.unwrap();

    let names: Vec<_> = users
        .iter()
        .map(|user| (user.id.as_str(), user.name.as_str()))
        .collect();
    assert_eq!(names, vec![("1", "Leanne Graham"), ("2", "Ervin Howell")]);
    assert_eq!(users[0].email, "Sincere@april.biz");
}

#[tokio::test]
async fn lists_posts_with_normalized_user_ids() {
    let client = client_at("/").await;

    let posts = client.list_posts().await.unwrap();

    assert_eq!(posts.len(), 3);
    assert_eq!(posts[2].id, "11");
    assert_eq!(posts[2].user_id, "2");
    assert!(posts[0].belongs_to("1"));
    assert!(!posts[2].belongs_to("1"));
}

#[tokio::test]
async fn fetches_one_user() {
    let client = client_at("/").await;

    let user = client.get_user("1").await.unwrap();

    assert_eq!(user.id, "1");
    assert_eq!(user.name, "Leanne Graham");
}

#[tokio::test]
async fn unknown_users_are_not_found() {
    let client = client_at("/").await;

    for id in ["99", "7", "8", "9", "", " "] {
        let result = client.get_user(id).await;
        assert!(
            matches!(result, Err(GatewayError::NotFound { .. })),
            "user {id} resolved to {result:?}"
        );
    }
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let client = client_at("/broken/").await;

    assert!(matches!(
        client.list_users().await,
        Err(GatewayError::Decode { .. })
    ));
    assert!(matches!(
        client.list_posts().await,
        Err(GatewayError::Decode { .. })
    ));
}

#[tokio::test]
async fn error_statuses_mean_the_upstream_is_unavailable() {
    let client = client_at("/failing/").await;

    assert!(matches!(
        client.list_users().await,
        Err(GatewayError::UpstreamUnavailable { .. })
    ));
    assert!(matches!(
        client.get_user("1").await,
        Err(GatewayError::UpstreamUnavailable { .. })
    ));
}

#[tokio::test]
async fn missing_collections_mean_the_upstream_is_unavailable() {
    let client = client_at("/nowhere/").await;

    assert!(matches!(
        client.list_posts().await,
        Err(GatewayError::UpstreamUnavailable { .. })
    ));
}

#[tokio::test]
async fn slow_upstreams_time_out() {
    let client = client_at("/slow/").await;

    assert!(matches!(
        client.list_posts().await,
        Err(GatewayError::UpstreamUnavailable { .. })
    ));
}

#[tokio::test]
async fn refused_connections_mean_the_upstream_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let client = HttpRemoteCollectionClient::new(base, Duration::from_secs(1)).unwrap();

    assert!(matches!(
        client.list_users().await,
        Err(GatewayError::UpstreamUnavailable { .. })
    ));
}
