//! Environment-driven configuration
//!
//! Values are read once at startup (after `.env` has been loaded by the binary).

use crate::error::GatewayError;
use crate::Result;
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_DATA_DIR: &str = "test_data_dir";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Root of the canned datasets; one directory per allowed phone number.
    pub data_dir: PathBuf,
    /// Base used for login URLs. Derived from the request `Host` when unset.
    pub public_base_url: Option<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => parse_port(&raw)?,
            Err(_) => DEFAULT_PORT,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|v| normalize_base_url(&v))
            .filter(|v| !v.is_empty());

        Ok(Self {
            bind_addr,
            port,
            data_dir,
            public_base_url,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            public_base_url: None,
        }
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse()
        .map_err(|e| GatewayError::Config(format!("invalid port '{}': {}", raw, e)))
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
