//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

use enapi::DocInfo;

/// Default cap on request body size, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Rejected environment values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid socket address (e.g. 0.0.0.0:3000), got {value:?}")]
    InvalidBindAddr { var: &'static str, value: String },

    #[error("{var} must be a literal path starting with '/', got {value:?}")]
    InvalidDocsPath { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Runtime configuration for an enapi server.
///
/// All fields have defaults, so a server can be started with zero
/// configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `ENAPI_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `ENAPI_API_BASE` | derived from `ENAPI_BIND` | Server URL advertised in the OpenAPI document |
/// | `ENAPI_TITLE` | `My Api` | `info.title` of the OpenAPI document |
/// | `ENAPI_VERSION` | `0.0.0` | `info.version` of the OpenAPI document |
/// | `ENAPI_DOCS_PATH` | `/_docs.openapi` | Path the OpenAPI document is served at |
/// | `ENAPI_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `ENAPI_BODY_LIMIT` | `2097152` | Maximum request body size in bytes |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Base URL clients reach the API at, e.g. `"https://api.example.com"`.
    pub api_base: String,

    pub title: String,
    pub version: String,
    pub docs_path: String,

    /// `None` means use in-memory stores (data is lost on restart).
    pub db_path: Option<String>,

    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], 3000));
        let info = DocInfo::default();
        Self {
            bind_addr,
            api_base: format!("http://{bind_addr}"),
            title: info.title,
            version: info.version,
            docs_path: "/_docs.openapi".into(),
            db_path: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Populate config from the process environment, applying defaults where
    /// absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match lookup("ENAPI_BIND") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidBindAddr {
                var: "ENAPI_BIND",
                value,
            })?,
            None => defaults.bind_addr,
        };

        let docs_path = match lookup("ENAPI_DOCS_PATH") {
            Some(value) if !is_literal_path(&value) => {
                return Err(ConfigError::InvalidDocsPath {
                    var: "ENAPI_DOCS_PATH",
                    value,
                })
            }
            Some(value) => value,
            None => defaults.docs_path,
        };

        let body_limit = match lookup("ENAPI_BODY_LIMIT") {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "ENAPI_BODY_LIMIT",
                        value,
                    })
                }
            },
            None => defaults.body_limit,
        };

        Ok(Self {
            bind_addr,
            api_base: lookup("ENAPI_API_BASE").unwrap_or_else(|| format!("http://{bind_addr}")),
            title: lookup("ENAPI_TITLE").unwrap_or(defaults.title),
            version: lookup("ENAPI_VERSION").unwrap_or(defaults.version),
            docs_path,
            db_path: lookup("ENAPI_DB"),
            body_limit,
        })
    }

    /// The `info` and `servers` values of the OpenAPI document.
    pub fn doc_info(&self) -> DocInfo {
        DocInfo {
            title: self.title.clone(),
            version: self.version.clone(),
            server_url: self.api_base.clone(),
        }
    }
}

/// A route path axum accepts as-is: rooted, with no captures or wildcards.
fn is_literal_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(['{', '}', '*'])
        && !path.split('/').any(|segment| segment.starts_with(':'))
}
