//! Minimal HTTP/1.1 plumbing for the control API and the metrics endpoint
//!
//! One request per connection: read the head and a `Content-Length` body,
//! answer, close. Every response carries permissive CORS headers so a
//! browser overlay on another origin can call the API.
//!
//! A client gets [`READ_TIMEOUT`] to deliver its whole request. A failed
//! `accept` is logged and retried after [`ACCEPT_BACKOFF`]; it never stops
//! a server.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::warn;

use crate::net::protocol::ErrorBody;

/// Max bytes of request line + headers
pub const MAX_HEAD_SIZE: usize = 8 * 1024;
/// Max request body
pub const MAX_BODY_SIZE: usize = 16 * 1024;

/// Time allowed for the full request to arrive
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause after a failed accept (e.g. out of file descriptors)
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Malformed request: {0}")]
    Malformed(String),
    #[error("Request too large: {0} bytes (max {1})")]
    TooLarge(usize, usize),
    #[error("Request not received within {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Options,
    Other,
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "OPTIONS" => Method::Options,
            _ => Method::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path without query string
    pub path: String,
    pub body: Vec<u8>,
}

/// Read one request from the stream
pub async fn read_request<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Request, HttpError> {
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD_SIZE {
            return Err(HttpError::TooLarge(buf.len(), MAX_HEAD_SIZE));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return if buf.is_empty() {
                Err(HttpError::ConnectionClosed)
            } else {
                Err(HttpError::Malformed("incomplete request head".to_string()))
            };
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| HttpError::Malformed("request head is not UTF-8".to_string()))?;
    let (method, path, content_length) = parse_head(head)?;

    if content_length > MAX_BODY_SIZE {
        return Err(HttpError::TooLarge(content_length, MAX_BODY_SIZE));
    }

    let mut body = buf.split_off(head_end + 4);
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(HttpError::Malformed(format!(
                "body truncated at {} of {} bytes",
                body.len(),
                content_length
            )));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Request { method, path, body })
}

/// [`read_request`] bounded by `limit`
pub async fn read_request_within<R: AsyncRead + Unpin>(
    stream: &mut R,
    limit: Duration,
) -> Result<Request, HttpError> {
    tokio::time::timeout(limit, read_request(stream))
        .await
        .map_err(|_| HttpError::Timeout(limit))?
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(head: &str) -> Result<(Method, String, usize), HttpError> {
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();

    let (method, target) = match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version)) if version.starts_with("HTTP/1.") => {
            (method, target)
        }
        _ => {
            return Err(HttpError::Malformed(format!(
                "bad request line '{}'",
                request_line
            )))
        }
    };

    let mut content_length = 0;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(HttpError::Malformed(format!("bad header '{}'", line)));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| HttpError::Malformed(format!("bad Content-Length '{}'", value.trim())))?;
        }
    }

    let path = target.split('?').next().unwrap_or(target).to_string();
    Ok((Method::parse(method), path, content_length))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::text(500, format!("serialization failed: {}", e)),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }

    pub fn prometheus(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; version=0.0.4",
            body,
        }
    }

    /// `{"error": message}`
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorBody {
                error: message.into(),
            },
        )
    }

    /// CORS preflight answer
    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: "text/plain",
            body: String::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Connection: close\r\n\r\n{}",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    stream: &mut W,
    response: &Response,
) -> Result<(), HttpError> {
    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Response for a request that could not be read, or `None` when the peer
/// went away and there is nobody to answer
pub fn error_response(err: &HttpError) -> Option<Response> {
    match err {
        HttpError::ConnectionClosed | HttpError::Io(_) => None,
        HttpError::Malformed(msg) => Some(Response::error(400, msg.clone())),
        HttpError::TooLarge(..) => Some(Response::error(413, err.to_string())),
        HttpError::Timeout(_) => Some(Response::error(408, err.to_string())),
    }
}

/// Source of client connections
pub trait Acceptor: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept_stream(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    fn accept_stream(
        &mut self,
    ) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        self.accept()
    }
}

/// Wait for the next connection, retrying past accept errors
pub async fn next_connection<A: Acceptor>(acceptor: &mut A) -> (A::Stream, SocketAddr) {
    loop {
        match acceptor.accept_stream().await {
            Ok(connection) => return connection,
            Err(e) => {
                warn!("Accept failed, retrying in {:?}: {}", ACCEPT_BACKOFF, e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
