use clap::Parser;
use rand::Rng;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable consulted for the token signing secret.
pub const JWT_SECRET_ENV: &str = "SCRIBBLE_JWT_SECRET";

/// Upper bound for `auth.token_ttl_days` (ten years).
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(Parser, Debug)]
#[command(name = "scribble", about = "A small blogging platform API")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret shared by token issuance and verification.
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    /// Require the owner's bearer token for user and post mutations.
    pub require_owner: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_days: 5,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            require_owner: false,
        }
    }
}

impl AuthConfig {
    /// Token lifetime, or an error when `token_ttl_days` is outside
    /// `1..=MAX_TOKEN_TTL_DAYS`.
    pub fn token_ttl(&self) -> anyhow::Result<chrono::Duration> {
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.token_ttl_days) {
            anyhow::bail!(
                "auth.token_ttl_days must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_DAYS,
                self.token_ttl_days
            );
        }
        chrono::Duration::try_days(self.token_ttl_days)
            .ok_or_else(|| anyhow::anyhow!("auth.token_ttl_days is out of range"))
    }

    /// The configured secret, ignoring blank values.
    pub fn signing_secret(&self) -> Option<&str> {
        self.jwt_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.trim().is_empty() {
                config.auth.jwt_secret = Some(secret);
            }
        }
        // An empty key would let anyone sign tokens.
        if config.auth.signing_secret().is_none() {
            tracing::warn!(
                "No JWT secret configured (set {} or auth.jwt_secret); \
                 using an ephemeral one, tokens will not survive a restart",
                JWT_SECRET_ENV
            );
            config.auth.jwt_secret = Some(generate_secret());
        }

        config.auth.token_ttl()?;

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("scribble.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".scribble")
        })
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.database.path.as_ref()
    }
}

/// Random 32-byte hex secret.
fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
