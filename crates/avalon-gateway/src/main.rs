//! Avalon Gateway - HTTP API gateway for the game back-end
//!
//! This is the main entry point for the gateway service.
//!
//! # Message Bus
//!
//! Set `AVALOND_BUS_URL` to forward commands to remote workers over HTTP.
//! If not set, the gateway runs an in-process bus with a local build worker.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use avalon_auth::{AuthConfig, OidcVerifier};
use avalon_bus::{HttpBus, LocalBus, MessageBus, RpcBridge};
use avalon_gateway::worker::register_build_worker;
use avalon_gateway::{create_router, GatewayConfig, GatewayState};
use avalon_registry::RocksRegistry;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogKind {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Avalon Gateway - HTTP API for the game back-end.
#[derive(Parser, Debug)]
#[command(name = "avalond")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "AVALOND_GATEWAY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "AVALOND_GATEWAY_PORT", default_value_t = 8080)]
    port: u16,

    /// Deployment environment name.
    #[arg(long, env = "AVALOND_ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Log filter; `RUST_LOG` is used when not set.
    #[arg(long, env = "AVALOND_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, env = "AVALOND_LOG_KIND", value_enum, default_value_t = LogKind::Text)]
    log_kind: LogKind,

    /// OIDC issuer URL.
    #[arg(
        long,
        env = "AVALOND_OIDC_PROVIDER",
        default_value = "https://auth.avalon.cool/realms/avalon"
    )]
    oidc_provider: String,

    /// Expected token audience; empty disables the audience check.
    #[arg(long, env = "AVALOND_OIDC_CLIENT_ID", default_value = "")]
    oidc_client_id: String,

    /// Base URL of the remote message bus.
    #[arg(long, env = "AVALOND_BUS_URL")]
    bus_url: Option<String>,

    /// RocksDB data directory.
    #[arg(long, env = "AVALOND_DATA_DIR", default_value = "/data/avalon")]
    data_dir: String,

    /// Blueprint version served from the cache.
    #[arg(long, env = "AVALOND_BLUEPRINT_VERSION", default_value = "")]
    blueprint_version: String,

    /// Resource name that roles are checked against.
    #[arg(long, env = "AVALOND_ROLE_RESOURCE", default_value = "dev.avalon.cool")]
    role_resource: String,

    /// Seconds to wait for a worker reply.
    #[arg(long, env = "AVALOND_RPC_DEADLINE_SECS", default_value_t = 10)]
    rpc_deadline_secs: u64,

    /// Maximum request body size in bytes.
    #[arg(long, env = "AVALOND_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    max_body_bytes: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "AVALOND_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            role_resource: self.role_resource.clone(),
            blueprint_version: self.blueprint_version.clone(),
            rpc_deadline_seconds: self.rpc_deadline_secs,
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_secs,
            ..GatewayConfig::default()
        }
    }
}

fn init_tracing(args: &Args) {
    let filter = args
        .log_level
        .as_deref()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| "info,avalon=debug".into());

    let (text, json) = match args.log_kind {
        LogKind::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogKind::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args);

    tracing::info!("Starting Avalon Gateway");
    tracing::info!(
        host = %args.host,
        port = args.port,
        environment = %args.environment,
        oidc_provider = %args.oidc_provider,
        bus_url = ?args.bus_url,
        data_dir = %args.data_dir,
        blueprint_version = %args.blueprint_version,
        "Gateway configuration loaded"
    );

    // Initialize RocksDB registry
    tracing::info!(path = %args.data_dir, "Opening RocksDB registry");
    let registry = Arc::new(RocksRegistry::open(&args.data_dir)?);

    // Initialize token verifier
    let auth_config = AuthConfig {
        issuer_url: args.oidc_provider.clone(),
        client_id: args.oidc_client_id.clone(),
        ..AuthConfig::default()
    };
    let verifier = Arc::new(OidcVerifier::discover(auth_config).await?);
    tracing::info!("Token verifier initialized");

    let config = args.gateway_config();

    // Initialize message bus
    let bus: Arc<dyn MessageBus> = if let Some(url) = &args.bus_url {
        tracing::info!(bus_url = %url, "Remote bus enabled");
        Arc::new(HttpBus::new(url)?)
    } else {
        tracing::warn!("No AVALOND_BUS_URL set - running with in-process bus and local worker");
        let bus = LocalBus::new();
        register_build_worker(&bus, &config.build_subject, registry.clone());
        Arc::new(bus)
    };

    let state = GatewayState::new(
        verifier,
        RpcBridge::new(bus),
        registry.clone(),
        registry,
        config,
    )?;

    if !state.config.blueprint_version.is_empty() {
        if let Err(e) = state.cache.refresh(state.registry.as_ref()) {
            tracing::warn!(error = %e, "Initial blueprint cache load failed");
        }
    }

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    let listen_addr = format!("{}:{}", args.host, args.port);
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}
