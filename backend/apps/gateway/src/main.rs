//! Gateway Entry Point
//!
//! Wires configuration into the gate crate: session storage backend,
//! upstream clients, OIDC discovery and the background allowlist
//! refresh, then serves the router. Startup errors use `anyhow`;
//! request-level errors stay inside the gate crate.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use gate::application::audit::AuditSink;
use gate::domain::policy::StepUpMatcher;
use gate::domain::store::SessionStore;
use gate::infra::{
    HeraldClient, KvSessionStore, MemorySessionStore, OidcProvider, RedisKv, TotpClient,
    WardenClient,
};
use gate::{gate_router, GateConfig, GateState};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sweep cadence for the in-process session store.
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=info,gate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(GateConfig::from_env()?);

    if config.otlp.enabled {
        tracing::info!(
            endpoint = config.otlp.endpoint.as_deref().unwrap_or("default"),
            "OTLP export requested; attach the collector sidecar"
        );
    }

    // Upstream clients are optional; each absent one disables its flow.
    let warden = match &config.warden {
        Some(cfg) => {
            tracing::info!(url = %cfg.url, "Allowlist directory enabled");
            Some(Arc::new(WardenClient::new(cfg)?))
        }
        None => None,
    };
    let herald = match &config.herald {
        Some(cfg) => {
            tracing::info!(url = %cfg.url, "Credential broker enabled");
            Some(Arc::new(HeraldClient::new(cfg)?))
        }
        None => None,
    };
    let totp = match &config.totp {
        Some(cfg) => {
            tracing::info!(url = %cfg.base_url, "TOTP service enabled");
            Some(Arc::new(TotpClient::new(cfg)?))
        }
        None => None,
    };

    // Discovery failure keeps the gateway up without the OIDC button.
    let oidc = match &config.oidc {
        Some(cfg) => match OidcProvider::discover(cfg).await {
            Ok(provider) => {
                tracing::info!(issuer = %cfg.issuer_url, "OIDC provider ready");
                Some(Arc::new(provider))
            }
            Err(e) => {
                tracing::warn!(error = %e, "OIDC discovery failed, continuing without OIDC");
                None
            }
        },
        None => None,
    };

    if let (true, Some(warden)) = (config.refresh.enabled, warden.clone()) {
        spawn_allowlist_refresh(warden, config.refresh.interval);
    }

    let matcher = Arc::new(StepUpMatcher::compile(
        config.step_up.enabled,
        &config.step_up.paths,
    ));
    let audit = AuditSink::new(config.audit.enabled, config.audit.format);

    let port: u16 = env::var("PORT")
        .ok()
        .map(|raw| raw.parse())
        .transpose()?
        .unwrap_or(4181);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    // Redis when configured, otherwise a swept in-process map.
    match &config.session_storage {
        Some(storage) => {
            let kv = Arc::new(RedisKv::connect(storage).await?);
            tracing::info!(addr = %storage.addr, "Connected to session storage");
            let store = Arc::new(KvSessionStore::new(kv, config.session_expiration));
            let state = build_state(store, warden, herald, totp, oidc, matcher, audit, config);
            serve(state, addr).await
        }
        None => {
            let store = Arc::new(MemorySessionStore::new(config.session_expiration));
            store.start_sweeper(MEMORY_SWEEP_INTERVAL);
            let state = build_state(store, warden, herald, totp, oidc, matcher, audit, config);
            serve(state, addr).await
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_state<S>(
    store: Arc<S>,
    warden: Option<Arc<WardenClient>>,
    herald: Option<Arc<HeraldClient>>,
    totp: Option<Arc<TotpClient>>,
    oidc: Option<Arc<OidcProvider>>,
    matcher: Arc<StepUpMatcher>,
    audit: AuditSink,
    config: Arc<GateConfig>,
) -> GateState<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    GateState {
        store,
        warden,
        herald,
        totp,
        oidc,
        matcher,
        audit,
        config,
    }
}

async fn serve<S>(state: GateState<S>, addr: SocketAddr) -> anyhow::Result<()>
where
    S: SessionStore + Send + Sync + 'static,
{
    let app: Router = gate_router(state).layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Periodic allowlist snapshot refresh. Failures are logged and retried
/// on the next tick.
fn spawn_allowlist_refresh(warden: Arc<WardenClient>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match warden.refresh().await {
                Ok(count) => {
                    tracing::debug!(users = count, "Allowlist snapshot refreshed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Allowlist refresh failed");
                }
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
    }
}
