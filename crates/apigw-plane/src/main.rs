//! Control Plane Server Binary
//!
//! Runs the control plane HTTP server for the gateway fleet.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use apigw_auth::{InstanceBackend, IssuerConfig, JwtAuthenticator};
use apigw_plane::{create_router, AppState, ControlStore, MemoryStore, PlaneConfig, Seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PlaneConfig::from_env().context("invalid configuration")?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    // Initialize storage
    let (store, instance_backend) = open_store(&config).await?;

    // Initialize JWT verification for the external endpoints
    let mut jwt = JwtAuthenticator::new();
    match &config.jwt {
        Some(settings) => {
            let pem = std::fs::read_to_string(&settings.public_key_file).with_context(|| {
                format!("cannot read {}", settings.public_key_file.display())
            })?;
            jwt = jwt
                .with_issuer(
                    IssuerConfig::new(&settings.issuer, pem).with_algorithm(settings.algorithm),
                )
                .context("invalid JWT issuer key")?;
        }
        None => warn!("No JWT issuer configured, external endpoints will reject every caller"),
    }

    info!(
        port = config.port,
        backend = instance_backend.description(),
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        jwt_issuers = jwt.issuer_count(),
        "Starting control plane server"
    );

    // Create application state
    let state = Arc::new(AppState::new(
        store,
        instance_backend,
        config.instance_cache_ttl,
        jwt,
        config.request_timeout,
    ));

    // Build router
    let app = create_router(state);

    // Start server
    let addr = std::net::SocketAddr::new(config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!(addr = %addr, "Control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

async fn open_store(
    config: &PlaneConfig,
) -> anyhow::Result<(Arc<dyn ControlStore>, Arc<dyn InstanceBackend>)> {
    if let Some(url) = &config.database_url {
        return open_postgres(url, config.database_max_connections).await;
    }

    let store = match &config.seed_file {
        Some(path) => {
            let seed = Seed::from_json_file(path)?;
            info!(
                path = %path.display(),
                instances = seed.instances.len(),
                grants = seed.grants.len(),
                public_keys = seed.public_keys.len(),
                "Loading seed"
            );
            MemoryStore::from_seed(seed)?
        }
        None => MemoryStore::new(),
    };

    let store = Arc::new(store);
    let control: Arc<dyn ControlStore> = store.clone();
    let backend: Arc<dyn InstanceBackend> = store;
    Ok((control, backend))
}

#[cfg(feature = "postgres")]
async fn open_postgres(
    url: &str,
    max_connections: u32,
) -> anyhow::Result<(Arc<dyn ControlStore>, Arc<dyn InstanceBackend>)> {
    let store = Arc::new(apigw_plane::PostgresStore::new(url, max_connections).await?);
    let control: Arc<dyn ControlStore> = store.clone();
    let backend: Arc<dyn InstanceBackend> = store;
    Ok((control, backend))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(
    _url: &str,
    _max_connections: u32,
) -> anyhow::Result<(Arc<dyn ControlStore>, Arc<dyn InstanceBackend>)> {
    anyhow::bail!("APIGW_PLANE_DATABASE_URL is set but the server was built without the postgres feature")
}
