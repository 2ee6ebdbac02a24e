//! Configuration for the Taskify server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskify/config.toml`)
//! 4. Compiled defaults

use std::path::PathBuf;
use std::time::Duration;

use taskify::auth::AccessPolicy;
use taskify::mail::SmtpSettings;
use taskify::mail::smtp::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use taskify::mail::template::DEFAULT_DASHBOARD_URL;
use taskify_proto::user::UserProfile;

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerSection,
    mail: MailSection,
    auth: AuthSection,
    users: Vec<UserProfile>,
}

/// `[server]`
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerSection {
    bind_addr: Option<String>,
    feed_capacity: Option<usize>,
}

/// `[mail]`. Credentials are deliberately not read from the file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct MailSection {
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    timeout_secs: Option<u64>,
    dashboard_url: Option<String>,
}

/// `[auth]`
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthSection {
    enforce_roles: Option<bool>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskify task and notification server")]
pub struct ServerCliArgs {
    /// Address to bind the HTTP server to.
    #[arg(short, long, env = "TASKIFY_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskify/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Change events buffered per live feed before it re-syncs.
    #[arg(long)]
    pub feed_capacity: Option<usize>,

    /// Require the admin role for creating and deleting tasks.
    #[arg(long)]
    pub enforce_roles: Option<bool>,

    /// SMTP username; emails are simulated unless both credentials are set.
    #[arg(long, env = "GMAIL_USER")]
    pub smtp_user: Option<String>,

    /// SMTP app password. Whitespace is ignored.
    #[arg(long, env = "GMAIL_APP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKIFY_LOG")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:3000`).
    pub bind_addr: String,
    /// Capacity of each store change-signal channel.
    pub feed_capacity: usize,
    /// Authorization policy for task writes.
    pub access_policy: AccessPolicy,
    /// SMTP settings, `None` when credentials are missing.
    pub smtp: Option<SmtpSettings>,
    /// Dashboard link embedded in assignment emails.
    pub dashboard_url: String,
    /// Profiles seeded into the directory.
    pub users: Vec<UserProfile>,
    /// Log level filter string.
    pub log_level: String,
    /// Optional log file.
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            feed_capacity: 256,
            access_policy: AccessPolicy::AdminWrites,
            smtp: None,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            users: Vec::new(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    /// Priority: CLI/env > file > default.
    fn resolve(cli: &ServerCliArgs, file: ServerConfigFile) -> Self {
        let defaults = Self::default();

        let enforce_roles = cli.enforce_roles.or(file.auth.enforce_roles).unwrap_or(true);
        let access_policy = if enforce_roles {
            AccessPolicy::AdminWrites
        } else {
            AccessPolicy::Open
        };

        let smtp = SmtpSettings::from_credentials(cli.smtp_user.clone(), cli.smtp_password.clone())
            .map(|settings| {
                let timeout = file
                    .mail
                    .timeout_secs
                    .map_or(settings.timeout, Duration::from_secs);
                settings
                    .with_server(
                        file.mail
                            .smtp_host
                            .clone()
                            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                        file.mail.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
                    )
                    .with_timeout(timeout)
            });

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            feed_capacity: cli
                .feed_capacity
                .or(file.server.feed_capacity)
                .unwrap_or(defaults.feed_capacity),
            access_policy,
            smtp,
            dashboard_url: file.mail.dashboard_url.unwrap_or(defaults.dashboard_url),
            users: file.users,
            log_level: cli.log_level.clone(),
            log_file: cli.log_file.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<ServerConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ServerConfigFile::default());
        };
        config_dir.join("taskify").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
