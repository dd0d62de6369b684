//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default upstream WebSocket endpoint.
pub const DEFAULT_SHOWDOWN_WS_URL: &str = "wss://sim3.psim.us/showdown/websocket";

/// Default login endpoint that trades a challenge for an assertion.
pub const DEFAULT_SHOWDOWN_LOGIN_URL: &str = "https://play.pokemonshowdown.com/action.php";

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Upstream WebSocket URL.
    pub showdown_ws_url: String,

    /// Login endpoint URL.
    pub showdown_login_url: String,

    /// Limit for opening the upstream socket.
    pub upstream_connect_timeout: Duration,

    /// Limit for the login HTTP call.
    pub login_timeout: Duration,

    /// Limit applied to every HTTP request handled by the relay.
    pub request_timeout: Duration,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Directory served as the router fallback, if any.
    pub static_dir: Option<PathBuf>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            showdown_ws_url: DEFAULT_SHOWDOWN_WS_URL.to_string(),
            showdown_login_url: DEFAULT_SHOWDOWN_LOGIN_URL.to_string(),
            upstream_connect_timeout: Duration::from_secs(10),
            login_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(30),
            event_bus_capacity: 1024,
            static_dir: None,
            log_format: LogFormat::Text,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(addr) => addr.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let showdown_ws_url =
            std::env::var("SHOWDOWN_WS_URL").unwrap_or(defaults.showdown_ws_url);
        let showdown_login_url =
            std::env::var("SHOWDOWN_LOGIN_URL").unwrap_or(defaults.showdown_login_url);

        let upstream_connect_timeout = Duration::from_secs(parse_env(
            "UPSTREAM_CONNECT_TIMEOUT_SECS",
            defaults.upstream_connect_timeout.as_secs(),
        ));
        let login_timeout =
            Duration::from_secs(parse_env("LOGIN_TIMEOUT_SECS", defaults.login_timeout.as_secs()));
        let request_timeout = Duration::from_secs(parse_env(
            "REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        ));

        // broadcast::channel panics on zero capacity
        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", defaults.event_bus_capacity).max(1);

        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        let log_format = parse_log_format(std::env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self {
            listen_addr,
            showdown_ws_url,
            showdown_login_url,
            upstream_connect_timeout,
            login_timeout,
            request_timeout,
            event_bus_capacity,
            static_dir,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Accepts `"json"` (case-insensitive); anything else is text.
fn parse_log_format(value: Option<&str>) -> LogFormat {
    match value {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}
