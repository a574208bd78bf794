//! Server Configuration
//!
//! Layered from an optional `gateway.{toml,yaml,json}` file and `GATEWAY_*`
//! environment variables (a `.env` file is loaded first when present).

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application name reported by ping
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Prefix every API route is nested under
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Mount the request-signing helper routes
    #[serde(default)]
    pub dev_mode: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Shared secret: body digest key, HMAC signing key and session token key.
    /// Required; there is no built-in value.
    pub secret: String,

    /// Access token lifetime in hours
    #[serde(default = "default_access_token_expire_hours")]
    pub access_token_expire_hours: i64,

    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_token_expire_days")]
    pub refresh_token_expire_days: i64,

    /// Accepted distance between X-TIMESTAMP and server time
    #[serde(default = "default_signature_window_secs")]
    pub signature_window_secs: i64,

    /// Partner RSA public key (SPKI PEM)
    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,

    /// RSA private key used by the signing helper (PKCS#1 or PKCS#8 PEM)
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,

    /// Directory holding the circuit artifacts
    #[serde(default = "default_circuit_dir")]
    pub circuit_dir: PathBuf,

    /// Compile and set up every circuit at startup
    #[serde(default)]
    pub init_circuits: bool,

    /// Lifetime of cached proof material
    #[serde(default = "default_proof_cache_ttl_secs")]
    pub proof_cache_ttl_secs: u64,

    /// Consume proof tokens on first successful redemption
    #[serde(default)]
    pub single_use_proof_tokens: bool,

    /// JSON file with customers and partners to preload
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9800
}

fn default_app_name() -> String {
    "gateway-server".to_string()
}

fn default_root_url() -> String {
    "/api/v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_access_token_expire_hours() -> i64 {
    5
}

fn default_refresh_token_expire_days() -> i64 {
    7
}

fn default_signature_window_secs() -> i64 {
    5 * 60 * 60
}

fn default_public_key_path() -> PathBuf {
    PathBuf::from("./assets/rsa256-public.pem")
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("./assets/rsa256-private.pem")
}

fn default_circuit_dir() -> PathBuf {
    PathBuf::from("./models/circuit")
}

fn default_proof_cache_ttl_secs() -> u64 {
    5 * 60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            app_name: default_app_name(),
            root_url: default_root_url(),
            dev_mode: false,
            log_level: default_log_level(),
            json_logs: false,
            cors_origins: default_cors_origins(),
            secret: String::new(),
            access_token_expire_hours: default_access_token_expire_hours(),
            refresh_token_expire_days: default_refresh_token_expire_days(),
            signature_window_secs: default_signature_window_secs(),
            public_key_path: default_public_key_path(),
            private_key_path: default_private_key_path(),
            circuit_dir: default_circuit_dir(),
            init_circuits: false,
            proof_cache_ttl_secs: default_proof_cache_ttl_secs(),
            single_use_proof_tokens: false,
            seed_path: None,
        }
    }
}

impl Config {
    /// Load configuration from `gateway.*` and `GATEWAY_*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        config::Config::builder()
            .add_source(config::File::with_name("gateway").required(false))
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn signature_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.signature_window_secs)
    }

    pub fn proof_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.proof_cache_ttl_secs)
    }

    pub fn signing_helpers_enabled(&self) -> bool {
        self.dev_mode || cfg!(feature = "dev-mode")
    }
}
