//! Configuration for the Boardcast server.
//!
//! Every value has a compile-time default and can be overridden through a
//! `BOARDCAST_*` environment variable. Empty variables count as unset.

use std::net::SocketAddr;
use std::path::PathBuf;

use base64::Engine;

const DEFAULT_CONFIG_DIR: &str = ".config/boardcast/data";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_PGN_FILE: &str = "games.pgn";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAIL_FROM: &str = "no-reply@boardcast.invalid";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOARDCAST_HTTP_ADDR is not a socket address: {0}")]
    InvalidAddr(String),
    #[error("BOARDCAST_RELAY_API_KEY is not valid base64 UTF-8")]
    InvalidRelayKey,
    #[error("BOARDCAST_RELAY_API_KEY is set but BOARDCAST_RELAY_API_URL is not")]
    MissingRelayUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// `host` or `host:port`.
    pub server: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Implicit TLS when set, plain SMTP otherwise.
    pub encryption: bool,
    pub from: String,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayApiConfig {
    pub url: String,
    /// Already base64-decoded.
    pub api_key: String,
    pub from: String,
    pub recipient: String,
}

/// The one notification transport in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyConfig {
    Smtp(SmtpConfig),
    RelayApi(RelayApiConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub pgn_file: PathBuf,
    pub http_addr: SocketAddr,
    pub device_label: String,
    pub email: Option<String>,
    pub notify: Option<NotifyConfig>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get_data_dir(var("BOARDCAST_DATA_DIR"), var("HOME"));
        let pgn_file = var("BOARDCAST_PGN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DEFAULT_PGN_FILE));

        let addr = var("BOARDCAST_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr.parse().map_err(|_| ConfigError::InvalidAddr(addr))?;

        let email = var("BOARDCAST_EMAIL");
        let from = var("BOARDCAST_MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

        let notify = match &email {
            None => None,
            Some(recipient) => {
                if let Some(server) = var("BOARDCAST_SMTP_SERVER") {
                    Some(NotifyConfig::Smtp(SmtpConfig {
                        server,
                        user: var("BOARDCAST_SMTP_USER"),
                        password: var("BOARDCAST_SMTP_PASS"),
                        encryption: var("BOARDCAST_SMTP_ENCRYPTION")
                            .map(|v| parse_flag(&v))
                            .unwrap_or(false),
                        from,
                        recipient: recipient.clone(),
                    }))
                } else if let Some(encoded) = var("BOARDCAST_RELAY_API_KEY") {
                    let api_key = decode_relay_key(&encoded)?;
                    let url = var("BOARDCAST_RELAY_API_URL").ok_or(ConfigError::MissingRelayUrl)?;
                    Some(NotifyConfig::RelayApi(RelayApiConfig {
                        url,
                        api_key,
                        from,
                        recipient: recipient.clone(),
                    }))
                } else {
                    None
                }
            }
        };

        Ok(Self {
            data_dir,
            pgn_file,
            http_addr,
            device_label: var("BOARDCAST_DEVICE_LABEL")
                .unwrap_or_else(|| crate::synth::DEFAULT_DEVICE_LABEL.to_string()),
            email,
            notify,
            log_dir: var("BOARDCAST_LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Get the data directory.
///
/// Priority:
/// 1. `BOARDCAST_DATA_DIR` if set
/// 2. `$HOME/.config/boardcast/data` if HOME is set
/// 3. `./data` as fallback
fn get_data_dir(explicit: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }
    if let Some(home) = home {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }
    PathBuf::from(DEV_DATA_DIR)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn decode_relay_key(encoded: &str) -> Result<String, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| ConfigError::InvalidRelayKey)?;
    String::from_utf8(bytes).map_err(|_| ConfigError::InvalidRelayKey)
}
