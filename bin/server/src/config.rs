//! Server configuration from environment variables.
//!
//! Everything has a sensible local-dev default:
//!
//! - `SOAPBOX_ADDR`: bind address (default `127.0.0.1:8087`)
//! - `SOAPBOX_DATA_DIR`: RocksDB directory; unset runs memory-only
//! - `SOAPBOX_ACCESS_TTL_SECS`: access-token lifetime (default 900)
//! - `SOAPBOX_TRUST_PROXY_HEADERS`: honor `X-Forwarded-For` (default off)

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8087";
const DEFAULT_ACCESS_TTL_SECS: u64 = 900;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// `None` disables persistence entirely.
    pub data_dir: Option<PathBuf>,
    pub access_ttl: Duration,
    pub trust_proxy_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_dir: None,
            access_ttl: Duration::from_secs(DEFAULT_ACCESS_TTL_SECS),
            trust_proxy_headers: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        ServerConfig {
            bind_addr: std::env::var("SOAPBOX_ADDR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            data_dir: std::env::var("SOAPBOX_DATA_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            access_ttl: parse_ttl(std::env::var("SOAPBOX_ACCESS_TTL_SECS").ok()),
            trust_proxy_headers: parse_flag(std::env::var("SOAPBOX_TRUST_PROXY_HEADERS").ok()),
        }
    }
}

fn parse_ttl(raw: Option<String>) -> Duration {
    let secs = match raw {
        None => DEFAULT_ACCESS_TTL_SECS,
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                warn!(
                    %value,
                    default = DEFAULT_ACCESS_TTL_SECS,
                    "invalid SOAPBOX_ACCESS_TTL_SECS, using default"
                );
                DEFAULT_ACCESS_TTL_SECS
            }
        },
    };
    Duration::from_secs(secs)
}

fn parse_flag(raw: Option<String>) -> bool {
    raw.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}
