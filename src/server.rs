// ABOUTME: HTTP server serving the generated presentation directory
// ABOUTME: Binds with classified errors and serves static files until unblocked

use crate::address::ListenAddress;
use crate::errors::{BildumiloError, Result};
use log::{debug, error, info};
use percent_encoding::percent_decode_str;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// A bound HTTP server. The socket closes when the last handle is dropped.
pub struct PresentationServer {
    server: Arc<Server>,
    address: ListenAddress,
}

impl PresentationServer {
    /// Bind the listening socket, classifying the failures users can fix
    pub fn bind(address: &ListenAddress) -> Result<Self> {
        match Server::http(address.socket_addr()) {
            Ok(server) => {
                info!("HTTP server bound to {}", address);
                Ok(Self {
                    server: Arc::new(server),
                    address: address.clone(),
                })
            }
            Err(e) => Err(classify_bind_error(address, e)),
        }
    }

    pub fn address(&self) -> &ListenAddress {
        &self.address
    }

    /// Port actually bound, which differs from the requested one for port 0
    pub fn local_port(&self) -> Option<u16> {
        self.server.server_addr().to_ip().map(|addr| addr.port())
    }

    /// Handle that can stop a running accept loop from another thread
    pub fn handle(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    /// Serve files below `root` until the server is unblocked
    pub fn run(&self, root: &Path) {
        for request in self.server.incoming_requests() {
            handle_request(request, root);
        }
        info!("HTTP server stopped");
    }
}

fn classify_bind_error(
    address: &ListenAddress,
    err: Box<dyn Error + Send + Sync + 'static>,
) -> BildumiloError {
    let source = match err.downcast::<io::Error>() {
        Ok(io_err) => *io_err,
        Err(other) => io::Error::new(io::ErrorKind::Other, other.to_string()),
    };
    match source.kind() {
        io::ErrorKind::PermissionDenied => BildumiloError::BindPermissionDenied(address.to_string()),
        io::ErrorKind::AddrInUse => BildumiloError::AddressInUse(address.to_string()),
        _ => BildumiloError::Bind {
            address: address.to_string(),
            source,
        },
    }
}

enum Resolved {
    File(PathBuf),
    Forbidden,
    NotFound,
}

/// Map a request URL onto a file below `root`
fn resolve_path(root: &Path, url: &str) -> Resolved {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let decoded = match percent_decode_str(path).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => return Resolved::NotFound,
    };

    let mut file = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Resolved::Forbidden,
            s if s.contains('\\') || s.contains('\0') => return Resolved::Forbidden,
            s => file.push(s),
        }
    }

    if file.is_dir() {
        file.push("index.html");
    }
    if file.is_file() {
        Resolved::File(file)
    } else {
        Resolved::NotFound
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn handle_request(request: Request, root: &Path) {
    let url = request.url().to_string();
    let result = match resolve_path(root, &url) {
        Resolved::File(file_path) => {
            debug!("Request for {:?} -> {:?}", url, file_path);
            match fs::read(&file_path) {
                Ok(content) => {
                    let mut response = Response::from_data(content);
                    if let Ok(header) = Header::from_bytes("Content-Type", content_type(&file_path)) {
                        response = response.with_header(header);
                    }
                    request.respond(response)
                }
                Err(e) => {
                    error!("Failed to read file {:?}: {}", file_path, e);
                    let response = Response::from_string(format!("Failed to read file: {}", e))
                        .with_status_code(StatusCode(500));
                    request.respond(response)
                }
            }
        }
        Resolved::Forbidden => {
            debug!("Refusing request for {:?}", url);
            request.respond(Response::from_string("403 Forbidden").with_status_code(StatusCode(403)))
        }
        Resolved::NotFound => {
            debug!("Not found: {:?}", url);
            request.respond(Response::from_string("404 Not Found").with_status_code(StatusCode(404)))
        }
    };

    if let Err(e) = result {
        error!("Failed to send response: {}", e);
    }
}
