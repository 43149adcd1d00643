use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use projection::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod errors;
pub mod requests;

use errors::{Result, ServiceError};
use requests::{ErrorResponse, ProjectionRequest};

pub const PROJECTION_ROUTE: &str = "/projection";

/// Largest request body accepted; anything above is refused unread.
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,projection=debug,edge_service=debug"));
    fmt().with_env_filter(filter).with_target(false).init();
}

struct HttpRequest {
    method: String,
    path: String,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let (method, path) = match (parts.next(), parts.next()) {
        (Some(method), Some(path)) => (method.to_string(), path.to_string()),
        _ => return Err(ServiceError::InvalidRequest(request_line.trim().to_string())),
    };

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().map_err(|_| {
                    ServiceError::InvalidRequest(format!("content-length {}", value.trim()))
                })?;
            }
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Err(ServiceError::InvalidRequest(format!(
            "body of {} bytes exceeds limit of {}",
            content_length, MAX_BODY_BYTES
        )));
    }
    let mut body = Vec::with_capacity(content_length);
    let read = reader
        .by_ref()
        .take(content_length as u64)
        .read_to_end(&mut body)?;
    if read < content_length {
        return Err(ServiceError::InvalidRequest(format!(
            "body ended after {} of {} bytes",
            read, content_length
        )));
    }
    let body = String::from_utf8(body)
        .map_err(|e| ServiceError::InvalidRequest(format!("body is not utf-8: {}", e)))?;
    Ok(HttpRequest { method, path, body })
}

/// Handles one JSON projection request body.
pub fn project(cache: &ProjectionCache, body: &str) -> Result<ProjectionResult> {
    let request: ProjectionRequest = serde_json::from_str(body)?;
    info!(investment = %request.investment_id, "projection requested");
    Ok(cache.get_or_compute(&request.investment_id, request.options.as_ref())?)
}

fn route(cache: &ProjectionCache, request: &HttpRequest) -> Result<String> {
    if request.method != "POST" || request.path != PROJECTION_ROUTE {
        return Err(ServiceError::NotFound(format!(
            "{} {}",
            request.method, request.path
        )));
    }
    let result = project(cache, &request.body)?;
    Ok(serde_json::to_string(&result)?)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/json\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes())
}

pub fn handle_connection(mut stream: TcpStream, cache: &ProjectionCache) {
    let outcome = read_request(&mut stream).and_then(|request| route(cache, &request));
    let (status, body) = match outcome {
        Ok(body) => (200, body),
        Err(e) => {
            warn!(error = %e, "request rejected");
            let body = serde_json::to_string(&ErrorResponse {
                error: e.to_string(),
            })
            .unwrap_or_else(|_| String::from("{}"));
            (e.status(), body)
        }
    };
    if let Err(e) = write_response(&mut stream, status, &body) {
        warn!(error = %e, "failed to write response");
    }
}

pub fn serve(addr: &str, cache: Arc<ProjectionCache>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr)?;
    info!(addr = %listener.local_addr()?, "projection service listening");
    serve_listener(listener, cache)
}

/// One thread per connection; the trial runner keeps its own pool.
pub fn serve_listener(listener: TcpListener, cache: Arc<ProjectionCache>) -> std::io::Result<()> {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let cache = cache.clone();
                std::thread::spawn(move || handle_connection(stream, &cache));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
    Ok(())
}
