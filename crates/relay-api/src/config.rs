//! Configuration management for the relay service.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use relay_delivery::{AlertConfig, ClientConfig};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

const LOG_FORMATS: [&str; 2] = ["json", "console"];

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// `AUTH_TOKEN` and `WEBHOOK_AUTH_TOKEN` have no default; loading fails
/// until both are set.
///
/// # Example
///
/// ```no_run
/// use relay_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    // Service
    /// Name reported by `/health` and used in alerts.
    ///
    /// Environment variable: `SERVICE_NAME`
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Version reported by `/health` and `/`.
    ///
    /// Environment variable: `SERVICE_VERSION`
    #[serde(default = "default_service_version")]
    pub service_version: String,
    /// Exposes panic messages in 500 responses.
    ///
    /// Environment variable: `DEBUG`
    #[serde(default)]
    pub debug: bool,

    // Auth
    /// Bearer token required on inbound requests.
    ///
    /// Environment variable: `AUTH_TOKEN`
    #[serde(default)]
    pub auth_token: String,
    /// Bearer token sent on outbound webhook requests.
    ///
    /// Environment variable: `WEBHOOK_AUTH_TOKEN`
    #[serde(default)]
    pub webhook_auth_token: String,

    // Alerts
    /// Alert endpoint; alerts are skipped when unset.
    ///
    /// Environment variable: `ALERT_WEBHOOK_URL`
    #[serde(default)]
    pub alert_webhook_url: Option<String>,
    /// Bearer token for the alert endpoint.
    ///
    /// Environment variable: `ALERT_API_KEY`
    #[serde(default)]
    pub alert_api_key: Option<String>,
    /// Alert request timeout in seconds.
    ///
    /// Environment variable: `ALERT_TIMEOUT_SECONDS`
    #[serde(default = "default_timeout_seconds")]
    pub alert_timeout_seconds: u64,

    // Logging
    /// One of `DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`.
    ///
    /// Environment variable: `LOG_LEVEL`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `json` or `console`.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout: u64,
    /// Time allowed for in-flight background tasks at shutdown, in seconds.
    ///
    /// Environment variable: `SHUTDOWN_GRACE_SECONDS`
    #[serde(default = "default_timeout_seconds")]
    pub shutdown_grace_seconds: u64,

    // Webhooks
    /// Outbound webhook timeout in seconds.
    ///
    /// Environment variable: `WEBHOOK_TIMEOUT_SECONDS`
    #[serde(default = "default_timeout_seconds")]
    pub webhook_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides, then normalize and validate it.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let mut config: Self = figment.extract().context("Failed to load configuration")?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Trims tokens, canonicalizes case, and drops empty optional values.
    pub fn normalize(&mut self) {
        self.auth_token = self.auth_token.trim().to_string();
        self.webhook_auth_token = self.webhook_auth_token.trim().to_string();
        self.log_level = self.log_level.trim().to_uppercase();
        self.log_format = self.log_format.trim().to_lowercase();
        self.alert_webhook_url = non_empty(self.alert_webhook_url.take());
        self.alert_api_key = non_empty(self.alert_api_key.take());
    }

    /// Convert to the webhook client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.webhook_timeout_seconds),
            auth_token: self.webhook_auth_token.clone(),
            ..ClientConfig::default()
        }
    }

    /// Convert to the alert client configuration.
    pub fn to_alert_config(&self) -> AlertConfig {
        AlertConfig {
            webhook_url: self.alert_webhook_url.clone(),
            api_key: self.alert_api_key.clone(),
            service_name: self.service_name.clone(),
            timeout: Duration::from_secs(self.alert_timeout_seconds),
        }
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Shutdown grace period as a duration.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// Filter directive for `tracing-subscriber` derived from `log_level`.
    ///
    /// `WARNING` and `CRITICAL` have no tracing counterpart and map to `warn`
    /// and `error`.
    pub fn tracing_directive(&self) -> &'static str {
        match self.log_level.as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }

    /// Whether logs should be emitted as JSON lines.
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.is_empty() {
            anyhow::bail!("AUTH_TOKEN must be set and non-empty");
        }

        if self.webhook_auth_token.is_empty() {
            anyhow::bail!("WEBHOOK_AUTH_TOKEN must be set and non-empty");
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!("log_level must be one of {}", LOG_LEVELS.join(", "));
        }

        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            anyhow::bail!("log_format must be one of {}", LOG_FORMATS.join(", "));
        }

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 || self.webhook_timeout_seconds == 0 {
            anyhow::bail!("timeouts must be greater than 0");
        }

        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("service_name", &self.service_name)
            .field("service_version", &self.service_version)
            .field("debug", &self.debug)
            .field("auth_token", &"***")
            .field("webhook_auth_token", &"***")
            .field("alert_webhook_url", &self.alert_webhook_url)
            .field("alert_api_key", &self.alert_api_key.as_ref().map(|_| "***"))
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("webhook_timeout_seconds", &self.webhook_timeout_seconds)
            .field("alert_timeout_seconds", &self.alert_timeout_seconds)
            .field("shutdown_grace_seconds", &self.shutdown_grace_seconds)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: default_service_version(),
            debug: false,
            auth_token: String::new(),
            webhook_auth_token: String::new(),
            alert_webhook_url: None,
            alert_api_key: None,
            alert_timeout_seconds: default_timeout_seconds(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_timeout_seconds(),
            shutdown_grace_seconds: default_timeout_seconds(),
            webhook_timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn default_service_name() -> String {
    "my-service".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_seconds() -> u64 {
    relay_delivery::DEFAULT_TIMEOUT_SECONDS
}
