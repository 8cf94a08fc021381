//! Control API server
//!
//! Routes:
//! - `GET  /health`
//! - `GET  /api/status`
//! - `POST /api/manipulate_star` with `{"action": ..., "parameters": {...}}`
//! - `POST /api/reset`
//!
//! `OPTIONS` on any path answers the CORS preflight. A client that stalls
//! mid-request is answered with 408 once the read deadline passes.

use std::sync::atomic::Ordering;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::net::command;
use crate::net::http::{self, Acceptor, Method, Request, Response};
use crate::net::protocol::Health;
use crate::net::session::StarSession;
use crate::sim::systems::effects::Command;

const ROUTES: [&str; 4] = ["/health", "/api/status", "/api/manipulate_star", "/api/reset"];

/// Serve the control API on `listener` until the task is dropped
pub async fn serve(listener: TcpListener, session: StarSession) -> anyhow::Result<()> {
    info!("Control API listening on http://{}", listener.local_addr()?);
    serve_on(listener, session).await;
    Ok(())
}

/// Accept loop; accept errors are logged and retried
pub async fn serve_on<A: Acceptor>(mut acceptor: A, session: StarSession) {
    loop {
        let (socket, peer) = http::next_connection(&mut acceptor).await;
        let session = session.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &session).await {
                debug!("Connection {} ended with error: {}", peer, e);
            }
        });
    }
}

async fn handle_connection<S>(mut stream: S, session: &StarSession) -> Result<(), http::HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match http::read_request_within(&mut stream, http::READ_TIMEOUT).await {
        Ok(request) => route(&request, session),
        Err(e) => match http::error_response(&e) {
            Some(response) => response,
            None => return Err(e),
        },
    };
    session.metrics().http_requests.fetch_add(1, Ordering::Relaxed);
    http::write_response(&mut stream, &response).await
}

pub fn route(request: &Request, session: &StarSession) -> Response {
    match (request.method, request.path.as_str()) {
        (Method::Options, _) => Response::no_content(),
        (Method::Get, "/health") => Response::json(200, &Health::healthy()),
        (Method::Get, "/api/status") => Response::json(200, &session.status()),
        (Method::Post, "/api/manipulate_star") => manipulate(&request.body, session),
        (Method::Post, "/api/reset") => {
            let (_, status) = session.manipulate(Command::Reset);
            Response::json(200, &status)
        }
        (_, path) if ROUTES.contains(&path) => Response::error(405, "Method not allowed"),
        _ => Response::error(404, "Not found"),
    }
}

fn manipulate(body: &[u8], session: &StarSession) -> Response {
    match command::parse_body(body) {
        Ok(command) => {
            let (_, status) = session.manipulate(command);
            Response::json(200, &status)
        }
        Err(e) => {
            session.reject(&e);
            Response::error(400, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::io;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::net::TcpStream;

    use crate::metrics::Metrics;
    use crate::net::protocol::{ErrorBody, StarStatus};
    use crate::sim::state::Display;
    use crate::sim::Simulation;

    fn session() -> StarSession {
        StarSession::new(
            Simulation::new(Display::new(1280.0, 720.0), 3),
            Arc::new(Metrics::new()),
        )
    }

    fn post(path: &str, body: &str) -> Request {
        Request {
            method: Method::Post,
            path: path.to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn get(path: &str) -> Request {
        Request {
            method: Method::Get,
            path: path.to_string(),
            body: Vec::new(),
        }
    }

    fn status_of(response: &Response) -> StarStatus {
        serde_json::from_str(&response.body).unwrap()
    }

    #[test]
    fn test_health() {
        let response = route(&get("/health"), &session());
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Star Theater");
        assert_eq!(body["running"], true);
    }

    #[test]
    fn test_status_defaults() {
        let response = route(&get("/api/status"), &session());
        let status = status_of(&response);
        assert_eq!(status.scale, 1.0);
        assert_eq!(status.color, "#c04015");
        assert!(status.effect_active.is_none());
        assert!(!status.eyes_enabled);
    }

    #[test]
    fn test_manipulate_shrink() {
        let session = session();
        let response = route(&post("/api/manipulate_star", r#"{"action":"shrink"}"#), &session);
        assert_eq!(response.status, 200);
        assert_eq!(status_of(&response).effect_active.as_deref(), Some("shrink"));

        session.tick();
        assert!(session.status().scale < 1.0);
    }

    #[test]
    fn test_unknown_action_leaves_state_untouched() {
        let session = session();
        let before = session.status();
        let response = route(&post("/api/manipulate_star", r#"{"action":"explode"}"#), &session);
        assert_eq!(response.status, 400);
        let err: ErrorBody = serde_json::from_str(&response.body).unwrap();
        assert!(err.error.contains("explode"));
        assert_eq!(session.status(), before);
    }

    #[test]
    fn test_opacity_out_of_range_rejected() {
        let session = session();
        let before = session.status();
        let response = route(
            &post(
                "/api/manipulate_star",
                r#"{"action":"opacity","parameters":{"opacity":1.5}}"#,
            ),
            &session,
        );
        assert_eq!(response.status, 400);
        assert_eq!(session.status(), before);
    }

    #[test]
    fn test_reset_endpoint() {
        let session = session();
        route(
            &post(
                "/api/manipulate_star",
                r##"{"action":"color","parameters":{"color":"#00ff00"}}"##,
            ),
            &session,
        );
        route(&post("/api/manipulate_star", r#"{"action":"corner_trap"}"#), &session);

        let response = route(&post("/api/reset", ""), &session);
        let status = status_of(&response);
        assert_eq!(status.color, "#c04015");
        assert!(!status.corner_trapped);
        assert_eq!(status.position.x, 640.0);
        assert_eq!(status.position.y, 360.0);
    }

    #[test]
    fn test_method_and_path_errors() {
        let session = session();
        assert_eq!(route(&get("/api/manipulate_star"), &session).status, 405);
        assert_eq!(route(&post("/api/status", ""), &session).status, 405);
        assert_eq!(route(&get("/api/teleport"), &session).status, 404);

        let preflight = Request {
            method: Method::Options,
            path: "/api/manipulate_star".to_string(),
            body: Vec::new(),
        };
        assert_eq!(route(&preflight, &session).status, 204);
    }

    async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_serve_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let session = session();
        let server = tokio::spawn(serve(listener, session.clone()));

        let body = r#"{"action":"spin_out"}"#;
        let raw = format!(
            "POST /api/manipulate_star HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let response = roundtrip(addr, &raw).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Access-Control-Allow-Origin: *"));
        assert!(response.contains(r#""effect_active":"spin_out""#));

        let response = roundtrip(addr, "GET /api/status HTTP/1.1\r\n\r\n").await;
        assert!(response.contains(r#""effect_active":"spin_out""#));

        let response = roundtrip(addr, "garbage\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request"));

        assert_eq!(session.metrics().http_requests.load(Ordering::Relaxed), 3);
        server.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_client_gets_request_timeout() {
        let session = session();
        let (mut client, server_side) = tokio::io::duplex(1024);
        client.write_all(b"POST /api/manipulate_star HTTP/1.1\r\nContent-Length: 40\r\n").await.unwrap();

        let handler = tokio::spawn({
            let session = session.clone();
            async move { handle_connection(server_side, &session).await }
        });

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 408 Request Timeout"), "{}", out);
        assert!(handler.await.unwrap().is_ok());
        assert_eq!(session.metrics().http_requests.load(Ordering::Relaxed), 1);
    }

    /// Fails a set number of accepts, then hands out queued streams
    struct FlakyAcceptor {
        failures: usize,
        queued: Vec<DuplexStream>,
    }

    impl Acceptor for FlakyAcceptor {
        type Stream = DuplexStream;

        fn accept_stream(
            &mut self,
        ) -> impl Future<Output = io::Result<(DuplexStream, SocketAddr)>> + Send {
            let next = if self.failures > 0 {
                self.failures -= 1;
                Some(Err(io::Error::other("too many open files")))
            } else {
                self.queued
                    .pop()
                    .map(|stream| Ok((stream, SocketAddr::from(([127, 0, 0, 1], 40000)))))
            };
            async move {
                match next {
                    Some(result) => result,
                    None => std::future::pending().await,
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_serve_survives_accept_errors() {
        let session = session();
        let (mut client, server_side) = tokio::io::duplex(1024);
        client.write_all(b"GET /health HTTP/1.1\r\n\r\n").await.unwrap();

        let acceptor = FlakyAcceptor {
            failures: 3,
            queued: vec![server_side],
        };
        let server = tokio::spawn(serve_on(acceptor, session.clone()));

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK"), "{}", out);
        assert!(out.contains(r#""status":"healthy""#));
        assert!(!server.is_finished());
        server.abort();
    }
}
