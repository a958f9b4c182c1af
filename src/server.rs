//! HTTP front end for the link checker.

use crate::handler::{CheckResponse, LinkChecker};
use hyper::body::HttpBody;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serve the check endpoint until Ctrl-C.
pub async fn serve(checker: LinkChecker, addr: SocketAddr) -> anyhow::Result<()> {
    let checker = Arc::new(checker);

    let make_svc = make_service_fn(move |_| {
        let checker = checker.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle(checker.clone(), req)))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!(address = %server.local_addr(), "Link checker listening");

    server
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Route a single request.
pub async fn handle(
    checker: Arc<LinkChecker>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    debug!(method = %req.method(), path = %req.uri().path(), "Request received");

    if !route_matches(&checker.config().settings.route, req.uri().path()) {
        return Ok(to_response(CheckResponse::error(
            StatusCode::NOT_FOUND,
            "Not found",
        )));
    }

    if req.method() != Method::POST {
        return Ok(to_response(CheckResponse::error(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        )));
    }

    let limit = checker.config().settings.max_body_bytes;
    let response = match read_body(req.into_body(), limit).await {
        Ok(Some(bytes)) => checker.handle_body(&bytes).await,
        Ok(None) => {
            debug!(limit = limit, "Request body too large");
            CheckResponse::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
        }
        Err(e) => {
            debug!(error = %e, "Failed to read request body");
            CheckResponse::error(StatusCode::BAD_REQUEST, "Malformed JSON body")
        }
    };

    Ok(to_response(response))
}

/// Read the body, or `None` once it grows past `limit` bytes.
async fn read_body(mut body: Body, limit: usize) -> Result<Option<Vec<u8>>, hyper::Error> {
    // Content-Length sets the lower bound.
    if body.size_hint().lower() > limit as u64 {
        return Ok(None);
    }

    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Some(buf))
}

/// Trailing slashes are ignored on both sides.
fn route_matches(route: &str, path: &str) -> bool {
    route.trim_end_matches('/') == path.trim_end_matches('/')
}

fn to_response(response: CheckResponse) -> Response<Body> {
    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = response.status;
    http.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    http
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PollingConfig, Settings, Thresholds, VirusTotalConfig};
    use crate::providers::mock::{ready_report, MockScanProvider};
    use hyper::body::Bytes;

    fn create_checker(provider: MockScanProvider) -> Arc<LinkChecker> {
        create_checker_with_limit(provider, Settings::default().max_body_bytes)
    }

    fn create_checker_with_limit(provider: MockScanProvider, max_body_bytes: usize) -> Arc<LinkChecker> {
        let config = Config {
            settings: Settings {
                max_body_bytes,
                ..Settings::default()
            },
            virustotal: VirusTotalConfig {
                api_key: "test-key".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_ms: 1000,
            },
            polling: PollingConfig { delays_ms: vec![1] },
            thresholds: Thresholds::default(),
        };
        Arc::new(LinkChecker::with_provider(config, Box::new(provider)))
    }

    fn post(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response<Body>) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_route_matches() {
        assert!(route_matches("/check-url/", "/check-url/"));
        assert!(route_matches("/check-url/", "/check-url"));
        assert!(route_matches("/check-url", "/check-url/"));
        assert!(!route_matches("/check-url/", "/check-url/extra"));
        assert!(!route_matches("/check-url/", "/"));
    }

    #[tokio::test]
    async fn test_post_classified() {
        let checker = create_checker(
            MockScanProvider::new().with_report(ready_report(r#"{"a": {"detected": true}}"#)),
        );

        let response = handle(checker, post("/check-url/", r#"{"url": "https://example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(read_json(response).await["status"], "malicious");
    }

    #[tokio::test]
    async fn test_post_missing_url() {
        let checker = create_checker(MockScanProvider::new());
        let response = handle(checker, post("/check-url", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "URL is required");
    }

    #[tokio::test]
    async fn test_post_pending() {
        let checker = create_checker(MockScanProvider::new());
        let response = handle(checker, post("/check-url/", r#"{"url": "https://example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(read_json(response).await["status"], "pending");
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let checker = create_checker(MockScanProvider::new());
        let request = Request::builder()
            .method(Method::GET)
            .uri("/check-url/")
            .body(Body::empty())
            .unwrap();

        let response = handle(checker, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let checker = create_checker(MockScanProvider::new());
        let response = handle(checker, post("/other", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn test_body_over_content_length_limit() {
        let checker = create_checker_with_limit(MockScanProvider::new(), 16);
        let response = handle(checker, post("/check-url/", r#"{"url": "https://example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(read_json(response).await["error"], "Request body too large");
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit() {
        let checker = create_checker_with_limit(MockScanProvider::new(), 16);
        let (mut sender, body) = Body::channel();
        tokio::spawn(async move {
            for _ in 0..4 {
                if sender.send_data(Bytes::from_static(b"0123456789")).await.is_err() {
                    break;
                }
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri("/check-url/")
            .body(body)
            .unwrap();

        let response = handle(checker, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_at_limit_is_read() {
        let body = r#"{"url": "not a url"}"#;
        let checker = create_checker_with_limit(MockScanProvider::new(), body.len());
        let response = handle(checker, post("/check-url/", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Invalid URL provided");
    }
}
