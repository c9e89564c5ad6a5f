use std::{env, path::PathBuf};

use idbridge_server::{IdbridgeServer, bootstrap, observability};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From IDBRIDGE_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (config.yaml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (IDBRIDGE_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Parse config path from CLI, environment, or use default
    let (config_path, source) = resolve_config_path();

    let settings = match idbridge_config::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    observability::init_tracing_with_level(&settings.log_level);

    tracing::info!(
        path = %config_path.display(),
        source = %source,
        "Configuration loaded"
    );

    let listen_addr = settings.listen_addr;
    let state = match bootstrap::build_state(settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    bootstrap::spawn_nonce_sweeper(state.nonces.clone());

    let server = IdbridgeServer::new(listen_addr, state);
    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: IDBRIDGE_CONFIG
/// 3. Default: config.yaml
fn resolve_config_path() -> (PathBuf, ConfigSource) {
    // 1. Check CLI: --config <path>
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (PathBuf::from(path), ConfigSource::CliArgument);
            }
        }
    }

    // 2. Check environment variable
    if let Ok(path) = env::var("IDBRIDGE_CONFIG") {
        if !path.is_empty() {
            return (PathBuf::from(path), ConfigSource::EnvironmentVariable);
        }
    }

    // 3. Default to config.yaml
    (PathBuf::from("config.yaml"), ConfigSource::Default)
}
