//! # Partner Gateway Server
//!
//! ## Usage
//!
//! ```bash
//! # Development mode (signing helper routes mounted)
//! GATEWAY_DEV_MODE=true GATEWAY_INIT_CIRCUITS=true cargo run
//!
//! # Seeded in-memory store
//! GATEWAY_SEED_PATH=./assets/seed.json cargo run
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /api/v1/signup` - Create a partner account
//! - `POST /api/v1/{rsa,hmac}/login` - Signed login, returns session tokens
//! - `GET /api/v1/proof` - Issue a proof token
//! - `POST /api/v1/{rsa,hmac}/proof` - Redeem a proof token
//! - `POST /api/v1/transaction/payment[-proof]` - Authorize a payment

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use identity_proof::{AlgorithmId, CircuitStore, DevBackend, ProvingBackend};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gateway_server::middleware::{
    CHANNEL_ID_HEADER, DEVICE_ID_HEADER, EXTERNAL_ID_HEADER, PARTNER_ID_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
use gateway_server::services::accounts::seed_store;
use gateway_server::store::{MemoryCache, MemoryStore};
use gateway_server::{create_routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        dev_mode = config.dev_mode,
        root_url = %config.root_url,
        single_use_proof_tokens = config.single_use_proof_tokens,
        "Starting partner gateway"
    );

    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &config.seed_path {
        seed_store(&store, path).await?;
    }

    let backend: Arc<dyn ProvingBackend> = Arc::new(DevBackend::new());
    init_circuits(&config, backend.as_ref())?;

    if config.signing_helpers_enabled() {
        info!("Running in DEVELOPMENT mode - signing helpers are exposed");
    }

    // Create application state
    let state = AppState::new(config.clone(), store, Arc::new(MemoryCache::new()), backend)?;

    // Build router
    let app = create_routes(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.socket_addr()?;
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Compile and set up every circuit when asked; otherwise report the missing ones.
fn init_circuits(config: &Config, backend: &dyn ProvingBackend) -> anyhow::Result<()> {
    let circuits = CircuitStore::new(&config.circuit_dir);
    for algorithm in AlgorithmId::ALL {
        if config.init_circuits {
            circuits.initialize(backend, algorithm)?;
        } else if !circuits.is_initialized(algorithm) {
            warn!(
                %algorithm,
                dir = %circuits.dir().display(),
                "Circuit artifacts missing; proof issuance for this algorithm will fail"
            );
        }
    }
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderName::from_static(PARTNER_ID_HEADER),
            HeaderName::from_static(EXTERNAL_ID_HEADER),
            HeaderName::from_static(CHANNEL_ID_HEADER),
            HeaderName::from_static(DEVICE_ID_HEADER),
        ])
        .allow_origin(origin)
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    }
}
