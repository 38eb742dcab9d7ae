use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, LOCATION,
};
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::{GraphQLRequest, error::GatewayError, gateway::Gateway};

pub const GRAPHQL_PATH: &str = "/graphql";
pub const GRAPHIQL_PATH: &str = "/graphiql";

type ResponseBody = BoxBody<Bytes, hyper::Error>;

fn response_body(content: impl Into<Bytes>) -> ResponseBody {
    Full::new(content.into())
        .map_err(|never| match never {})
        .boxed()
}

/// GraphiQL served from a CDN, pointed at [`GRAPHQL_PATH`].
const GRAPHIQL_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>placeholder-gateway</title>
    <link rel="stylesheet" href="https://unpkg.com/graphiql@3.7.1/graphiql.min.css" />
    <style>html, body, #explorer { height: 100%; margin: 0; }</style>
  </head>
  <body>
    <div id="explorer"></div>
    <script crossorigin src="https://unpkg.com/react@18.3.1/umd/react.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/react-dom@18.3.1/umd/react-dom.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/graphiql@3.7.1/graphiql.min.js"></script>
    <script>
      const fetcher = GraphiQL.createFetcher({ url: "/graphql" });
      ReactDOM.createRoot(document.getElementById("explorer"))
        .render(React.createElement(GraphiQL, { fetcher }));
    </script>
  </body>
</html>
"#;

fn json_response(status: StatusCode, payload: String) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(response_body(payload))
        .unwrap_or_else(|_| internal_server_error())
}

fn internal_server_error() -> Response<ResponseBody> {
    let mut response = Response::new(response_body("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

async fn handle_graphql(req: Request<Incoming>, gateway: &Gateway) -> Response<ResponseBody> {
    let body_bytes = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "errors": [{ "message": "Failed to read request body" }] }).to_string(),
            );
        }
    };

    let request = match serde_json::from_slice::<GraphQLRequest>(&body_bytes) {
        Ok(request) => request,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "errors": [{ "message": format!("Invalid JSON request: {e}") }] })
                    .to_string(),
            );
        }
    };

    match gateway.process_request(request).await {
        Ok(result) => json_response(StatusCode::OK, result.to_string()),
        Err(e) => json_response(StatusCode::OK, error_body(&e)),
    }
}

fn error_body(error: &GatewayError) -> String {
    json!({
        "errors": [{
            "message": error.to_string(),
            "extensions": { "code": error.code() }
        }]
    })
    .to_string()
}

/// Routes one HTTP request.
pub async fn handle_request(
    req: Request<Incoming>,
    gateway: Arc<Gateway>,
) -> Result<Response<ResponseBody>, Infallible> {
    debug!(method = %req.method(), path = req.uri().path(), "request received");

    let response = match (req.method(), req.uri().path()) {
        (&Method::POST, GRAPHQL_PATH) => handle_graphql(req, &gateway).await,

        (&Method::GET, GRAPHIQL_PATH) => Response::builder()
            .header(CONTENT_TYPE, "text/html")
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(response_body(GRAPHIQL_PAGE))
            .unwrap_or_else(|_| internal_server_error()),

        (&Method::GET, "/") => Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, GRAPHIQL_PATH)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(response_body(Bytes::new()))
            .unwrap_or_else(|_| internal_server_error()),

        (&Method::OPTIONS, _) => Response::builder()
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS")
            .header(ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
            .body(response_body(Bytes::new()))
            .unwrap_or_else(|_| internal_server_error()),

        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(response_body("Not Found"))
            .unwrap_or_else(|_| internal_server_error()),
    };

    Ok(response)
}

/// Accepts connections until the listener fails, serving each one on its
/// own task.
pub async fn serve(listener: TcpListener, gateway: Arc<Gateway>) -> Result<(), GatewayError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let gateway = Arc::clone(&gateway);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle_request(req, Arc::clone(&gateway)));

            match auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                Ok(()) => debug!(%peer, "connection closed"),
                Err(e) => warn!(%peer, error = %e, "error serving connection"),
            }
        });
    }
}
