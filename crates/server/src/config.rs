use semantic::{Backend, ModelConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Shared secret used when `EMBEDDING_API_KEY` is not set.
pub const DEFAULT_API_KEY: &str = "dev-key-local-only";

/// Port used by both hosts unless overridden.
pub const DEFAULT_PORT: u16 = 8000;

/// Cache directory the managed platform mounts its persistent volume at.
pub const MANAGED_CACHE_DIR: &str = "/model_cache";

/// Deployment environment, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentMode {
    Development,
    /// Any other name (`production`, `staging`, ...), kept verbatim for reporting.
    Other(String),
}

impl EnvironmentMode {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == "development" {
            EnvironmentMode::Development
        } else {
            EnvironmentMode::Other(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EnvironmentMode::Development => "development",
            EnvironmentMode::Other(name) => name,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, EnvironmentMode::Development)
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the shared secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Configured,
    Default,
}

/// Which host the process is being configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Workstation listener started with the `local` argument.
    Local,
    /// Started by the managed serverless platform.
    Managed,
}

/// Service configuration. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub environment: EnvironmentMode,

    /// Skip authentication entirely. Only honoured in development.
    pub auth_bypass_enabled: bool,

    pub api_key: String,
    pub api_key_source: ApiKeySource,

    pub model: ModelConfig,

    pub bind_addr: String,
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    pub max_body_size_mb: usize,

    pub enable_cors: bool,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: EnvironmentMode::Development,
            auth_bypass_enabled: false,
            api_key: DEFAULT_API_KEY.to_string(),
            api_key_source: ApiKeySource::Default,
            model: ModelConfig::with_cache_dir(default_user_cache_dir()),
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            timeout_secs: 120,
            max_body_size_mb: 10,
            enable_cors: true,
            log_level: "info".to_string(),
        }
    }
}

/// Raw values as read from the config file and process environment.
/// Every field is optional; defaults are applied in [`ServiceConfig::resolve`].
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    modal_environment: Option<String>,
    environment: Option<String>,
    disable_api_key_auth: Option<String>,
    embedding_api_key: Option<String>,
    model_cache_dir: Option<PathBuf>,
    model_backend: Option<String>,
    bind_addr: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
    max_body_size_mb: Option<usize>,
    enable_cors: Option<bool>,
    log_level: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from an optional `embedding-service.{toml,yaml,json}`
    /// file overlaid with process environment variables.
    pub fn load(mode: HostMode) -> anyhow::Result<Self> {
        let raw = read_settings(None)?;
        Self::resolve(raw, mode)
    }

    /// Same as [`load`](Self::load) but reads variables from `vars` instead of
    /// the process environment.
    pub fn from_vars(vars: HashMap<String, String>, mode: HostMode) -> anyhow::Result<Self> {
        let raw = read_settings(Some(vars))?;
        Self::resolve(raw, mode)
    }

    fn resolve(raw: RawSettings, mode: HostMode) -> anyhow::Result<Self> {
        let defaults = ServiceConfig::default();

        let environment = match mode {
            HostMode::Local => EnvironmentMode::Development,
            HostMode::Managed => raw
                .modal_environment
                .or(raw.environment)
                .map(|name| EnvironmentMode::parse(&name))
                .unwrap_or(EnvironmentMode::Development),
        };

        let auth_bypass_enabled = raw.disable_api_key_auth.as_deref() == Some("true");

        let (api_key, api_key_source) = match raw.embedding_api_key {
            Some(key) => (key, ApiKeySource::Configured),
            None => (DEFAULT_API_KEY.to_string(), ApiKeySource::Default),
        };

        let cache_dir = raw.model_cache_dir.unwrap_or_else(|| match mode {
            HostMode::Local => default_user_cache_dir(),
            HostMode::Managed => PathBuf::from(MANAGED_CACHE_DIR),
        });
        let backend = match raw.model_backend {
            Some(name) => name.parse::<Backend>().map_err(anyhow::Error::msg)?,
            None => Backend::default(),
        };

        Ok(Self {
            environment,
            auth_bypass_enabled,
            api_key,
            api_key_source,
            model: ModelConfig {
                cache_dir,
                backend,
                ..ModelConfig::default()
            },
            bind_addr: raw.bind_addr.unwrap_or(defaults.bind_addr),
            port: raw.port.unwrap_or(defaults.port),
            timeout_secs: raw.request_timeout_secs.unwrap_or(defaults.timeout_secs),
            max_body_size_mb: raw.max_body_size_mb.unwrap_or(defaults.max_body_size_mb),
            enable_cors: raw.enable_cors.unwrap_or(defaults.enable_cors),
            log_level: raw.log_level.unwrap_or(defaults.log_level),
        })
    }

    /// Whether requests skip authentication: development mode plus the explicit flag.
    pub fn auth_bypass_active(&self) -> bool {
        self.environment.is_development() && self.auth_bypass_enabled
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn read_settings(vars: Option<HashMap<String, String>>) -> Result<RawSettings, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("embedding-service").required(false))
        .add_source(config::Environment::default().source(vars))
        .build()?
        .try_deserialize()
}

/// `~/.cache/embedding-models`, or a relative fallback when there is no home.
fn default_user_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cache"))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("embedding-models")
}
