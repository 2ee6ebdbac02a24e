//! Taskify server binary.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:3000, emails simulated
//! cargo run --bin taskify-server
//!
//! # Real emails
//! GMAIL_USER=me@gmail.com GMAIL_APP_PASSWORD="abcd efgh ijkl mnop" \
//!     cargo run --bin taskify-server -- --config taskify.toml
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use taskify_server::api::{self, AppState};
use taskify_server::config::{ServerCliArgs, ServerConfig};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, config.log_file.as_deref());

    tracing::info!(addr = %config.bind_addr, "starting taskify server");
    if config.users.is_empty() {
        tracing::warn!("no users configured, every API request will be rejected");
    }

    let state = match AppState::from_config(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!(error = %e, "failed to configure mail relay");
            std::process::exit(1);
        }
    };

    match api::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}

/// Initializes tracing to stderr, or to `file_path` when given.
///
/// The returned guard must be held until shutdown so buffered file output
/// is flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let target = file_path.and_then(|path| {
        let file_name = path.file_name()?.to_str()?.to_string();
        let log_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Some((log_dir, file_name))
    });
    let Some((log_dir, file_name)) = target else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
