//! sentinel-server: HTTP surface for the sentinel gateway — wallet
//! authentication, API-key issuance, the secrets vault, and the
//! identity-aware reverse proxy, composed over a generic
//! [`sentinel_core::Repository`].

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use sentinel_envelope::{resolve_provider, SealedChannel, CryptoError};
use sentinel_repo_memory::MemoryRepository;

use sentinel_server::config::{self, LogFormat};
use sentinel_server::state::AppState;

#[derive(Parser)]
#[command(name = "sentinel-server", version, about = "Identity-aware API gateway")]
struct Cli {
    /// Path to a TOML configuration file. Falls back to SENTINEL_CONFIG.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the configured listen port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate configuration, then exit without binding a socket.
    CheckConfig,
}

/// No real attestation integration exists in this deployment mode; a
/// production build wires a genuine KMS/enclave client in its place.
struct NoSealedChannel;

impl SealedChannel for NoSealedChannel {
    fn is_present(&self) -> bool {
        false
    }

    fn unseal(&self) -> Result<zeroize::Zeroizing<[u8; sentinel_envelope::KEY_LEN]>, CryptoError> {
        Err(CryptoError)
    }
}

fn init_tracing(log_format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sentinel_server=info,tower_http=info".into());
    match log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match config::load(cli.config.as_deref(), cli.port) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    if matches!(cli.command, Some(Command::CheckConfig)) {
        println!("configuration OK: port={}, strict_mode={}", settings.port, settings.strict_mode);
        return ExitCode::SUCCESS;
    }

    init_tracing(settings.log_format);

    let master_key_provider = match resolve_provider(
        settings.strict_mode,
        Some(NoSealedChannel),
        config::MASTER_KEY_ENV,
    ) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(error = %e, "cannot resolve a master-key provider");
            return ExitCode::from(1);
        }
    };
    tracing::info!(kind = master_key_provider.kind(), "master key provider selected");

    let repo = Arc::new(MemoryRepository::new());
    let state = match AppState::new(
        repo,
        master_key_provider.as_ref(),
        settings.route_table,
        settings.service_tokens,
        settings.internal_subnets,
        settings.rate_limit_rps,
        settings.rate_limit_burst,
        settings.strict_mode,
        settings.role_assignments,
    ) {
        Ok(state) => Arc::new(state),
        Err(_) => {
            tracing::error!("failed to initialize gateway state from the master key");
            return ExitCode::from(1);
        }
    };

    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.rate_limiter.cleanup(Duration::from_secs(300)).await;
        }
    });

    let app = sentinel_server::build_router(state);

    tracing::info!(port = settings.port, strict_mode = settings.strict_mode, "starting sentinel-server");

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind listen address");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "server terminated unexpectedly");
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
