//! Configuration for the submission backend
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Args as ClapArgs, Parser};
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::JwtValidator;
use crate::services::QueueConfig;
use crate::types::MicError;

/// Innovation Centre submission backend
#[derive(Parser, Debug, Clone)]
#[command(name = "mic-backend")]
#[command(about = "Submission workflow backend for the Innovation Centre")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (dev signing key, in-memory fallback store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "mic")]
    pub mongodb_db: String,

    /// Secret for signing bearer tokens (required outside dev mode)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Notification email settings
    #[command(flatten)]
    pub mail: MailArgs,

    /// Base URL of the AI analysis service
    #[arg(long, env = "AI_SERVICE_URL", default_value = "http://localhost:9000")]
    pub ai_service_url: String,

    /// Timeout for outbound HTTP calls in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,
}

/// Mail relay configuration
#[derive(ClapArgs, Debug, Clone)]
pub struct MailArgs {
    /// HTTP mail relay endpoint. Emails are only logged when unset.
    #[arg(long = "mail-relay-url", env = "MAIL_RELAY_URL")]
    pub relay_url: Option<String>,

    /// Sender address
    #[arg(long = "mail-from", env = "MAIL_FROM", default_value = "noreply@mic.local")]
    pub from: String,

    /// Bearer key for the relay
    #[arg(long = "mail-api-key", env = "MAIL_API_KEY")]
    pub api_key: Option<String>,

    /// Email delivery workers
    #[arg(long = "email-workers", env = "EMAIL_WORKERS", default_value = "2")]
    pub workers: usize,

    /// Email queue capacity
    #[arg(long = "email-queue-size", env = "EMAIL_QUEUE_SIZE", default_value = "256")]
    pub queue_size: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.mail.workers == 0 {
            return Err("EMAIL_WORKERS must be at least 1".to_string());
        }

        if self.mail.queue_size == 0 {
            return Err("EMAIL_QUEUE_SIZE must be at least 1".to_string());
        }

        Ok(())
    }

    /// Build the token validator from the configured secret
    pub fn jwt_validator(&self) -> Result<JwtValidator, MicError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(MicError::Config("JWT_SECRET is required in production mode".into())),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            worker_count: self.mail.workers,
            max_queue_size: self.mail.queue_size,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_defaults() {
        let args = Args::parse_from(["mic-backend", "--dev-mode"]);
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
        assert_eq!(args.ai_service_url, "http://localhost:9000");
        assert_eq!(args.mail.workers, 2);
    }

    #[test]
    fn test_production_requires_secret() {
        let mut args = Args::parse_from(["mic-backend", "--dev-mode"]);
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(args.validate().is_err());
        assert!(args.jwt_validator().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut args = Args::parse_from(["mic-backend", "--dev-mode"]);
        args.jwt_secret = Some("too-short".into());
        assert!(matches!(args.jwt_validator(), Err(MicError::Config(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut args = Args::parse_from(["mic-backend", "--dev-mode"]);
        args.mail.workers = 0;
        assert!(args.validate().is_err());
    }
}
