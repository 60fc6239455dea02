// ABOUTME: Listen address parsing for the preview server
// ABOUTME: Accepts "port" or "bind:port" and defaults the bind address to all interfaces

use crate::errors::{BildumiloError, Result};
use std::fmt;

pub const DEFAULT_BIND: &str = "0.0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub bind: String,
    pub port: u16,
}

impl ListenAddress {
    /// Parse `8080` or `127.0.0.1:9000`
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let (bind, port) = match value.rsplit_once(':') {
            Some((bind, port)) => (bind.trim_start_matches('[').trim_end_matches(']'), port),
            None => (DEFAULT_BIND, value),
        };
        if bind.is_empty() {
            return Err(BildumiloError::InvalidAddress(format!("missing bind address in {:?}", value)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| BildumiloError::InvalidAddress(format!("bad port in {:?}: {}", value, e)))?;
        Ok(Self {
            bind: bind.to_string(),
            port,
        })
    }

    /// Address string suitable for binding a socket
    pub fn socket_addr(&self) -> String {
        if self.bind.contains(':') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bind, self.port)
    }
}
