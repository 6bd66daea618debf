//! OAuth 2.0 Authorization Server - Entry Point

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use authz_server::models::Client;
use authz_server::{AuthorizationServer, ClientRegistry, Config, CredentialStore};

#[derive(Parser, Debug)]
#[command(name = "authz-server")]
#[command(about = "OAuth 2.0 authorization server (authorization code + PKCE, refresh rotation)")]
#[command(version)]
struct Cli {
    /// HTTP server port
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Issuer identifier and public base URL (e.g., https://auth.example.com)
    #[arg(long, env = "AUTHZ_ISSUER")]
    issuer: Option<String>,

    /// JSON file with the registered clients
    #[arg(long, env = "AUTHZ_CLIENTS_FILE")]
    clients: Option<PathBuf>,

    /// Header carrying the authenticated user id on /authorize
    #[arg(long, env = "AUTHZ_USER_HEADER")]
    user_header: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

fn load_clients(path: &Path) -> anyhow::Result<Vec<Client>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read clients file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse clients file {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting authorization server");

    let mut config = Config::from_env()?;
    if let Some(issuer) = cli.issuer {
        config = Config { issuer: issuer.trim_end_matches('/').to_string(), ..config };
    }
    if let Some(header) = cli.user_header {
        config.user_header = header.to_ascii_lowercase();
    }

    let registry = match cli.clients.as_deref() {
        Some(path) => ClientRegistry::with_clients(load_clients(path)?)?,
        None => {
            tracing::warn!("No clients file given; every client request will be rejected");
            ClientRegistry::new()
        }
    };

    let server = AuthorizationServer::new(config, registry, CredentialStore::in_memory());
    authz_server::server::serve(server, cli.port).await
}
