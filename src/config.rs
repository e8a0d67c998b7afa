//! Configuration for Notewarden
//!
//! CLI arguments with environment variable fallbacks. A `.env` file is
//! loaded by `main` before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

use zeroize::Zeroizing;

use crate::auth::{TokenCodec, DEFAULT_EXPIRY_SECONDS};
use crate::services::BootstrapAdmin;
use crate::types::NotewardenError;

/// Persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Process-local maps, lost on restart
    Memory,
    /// MongoDB at `--mongodb-uri`
    Mongo,
}

/// Notewarden - course notes with vote-driven moderation
#[derive(Parser, Debug, Clone)]
#[command(name = "notewarden")]
#[command(about = "Course notes service with claim-based auth and vote-driven flagging")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5001")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store, fixed token secret, log notifier)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Persistence backend; defaults to memory in dev mode, mongo otherwise
    #[arg(long, env = "STORE_BACKEND", value_enum)]
    pub backend: Option<StoreBackend>,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "notewarden")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production, 32+ chars)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value_t = DEFAULT_EXPIRY_SECONDS)]
    pub jwt_expiry_seconds: u64,

    /// Mail relay endpoint for flag notifications; log only when unset
    #[arg(long, env = "NOTIFY_WEBHOOK_URL")]
    pub notify_webhook_url: Option<String>,

    /// Sender address on flag notifications
    #[arg(long, env = "NOTIFY_FROM", default_value = "noreply@notewarden.local")]
    pub notify_from: String,

    /// Relay request timeout in milliseconds
    #[arg(long, env = "NOTIFY_TIMEOUT_MS", default_value = "5000")]
    pub notify_timeout_ms: u64,

    /// Username of an admin account created at startup if missing
    #[arg(long, env = "BOOTSTRAP_ADMIN_USERNAME")]
    pub bootstrap_admin_username: Option<String>,

    /// Email of the bootstrap admin
    #[arg(long, env = "BOOTSTRAP_ADMIN_EMAIL")]
    pub bootstrap_admin_email: Option<String>,

    /// Initial password of the bootstrap admin
    #[arg(long, env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
    pub bootstrap_admin_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Backend after applying the dev-mode default
    pub fn store_backend(&self) -> StoreBackend {
        self.backend.unwrap_or(if self.dev_mode {
            StoreBackend::Memory
        } else {
            StoreBackend::Mongo
        })
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    /// Build the token codec from the configured secret
    ///
    /// Dev mode without a secret gets the fixed dev codec.
    pub fn token_codec(&self) -> Result<TokenCodec, NotewardenError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => TokenCodec::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(TokenCodec::new_dev()),
            (None, false) => Err(NotewardenError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Bootstrap admin, when all three of its settings are present
    pub fn bootstrap_admin(&self) -> Option<BootstrapAdmin> {
        match (
            &self.bootstrap_admin_username,
            &self.bootstrap_admin_email,
            &self.bootstrap_admin_password,
        ) {
            (Some(username), Some(email), Some(password)) => Some(BootstrapAdmin {
                email: email.clone(),
                username: username.clone(),
                password: Zeroizing::new(password.clone()),
            }),
            _ => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if self.store_backend() == StoreBackend::Mongo && self.mongodb_uri.is_none() {
            return Err("MONGODB_URI is required for the mongo backend".to_string());
        }

        let bootstrap_set = [
            self.bootstrap_admin_username.is_some(),
            self.bootstrap_admin_email.is_some(),
            self.bootstrap_admin_password.is_some(),
        ];
        if bootstrap_set.contains(&true) && bootstrap_set.contains(&false) {
            return Err(
                "BOOTSTRAP_ADMIN_USERNAME, BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                    .to_string(),
            );
        }

        if let Some(url) = &self.notify_webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err("NOTIFY_WEBHOOK_URL must be an http(s) URL".to_string());
            }
        }

        Ok(())
    }
}
