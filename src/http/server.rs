//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with public and gated routes
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limits)
//! - Bind to a plain or TLS listener
//! - Apply rate-limit policy updates from the config watcher

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenIssuer;
use crate::config::{GatewayConfig, TlsConfig, UploadConfig};
use crate::gate::{gate_middleware, AuditedRoutes, RequestGate};
use crate::generation::GenerationService;
use crate::http::handlers;
use crate::lifecycle::startup::{Components, StartupError};
use crate::net::tls::load_tls_config;
use crate::security::cors::cors_layer;
use crate::security::{RateLimiter, RatePolicy};
use crate::store::DocumentStore;

/// Room for multipart boundaries and the non-file fields of an upload.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const SHUTDOWN_GRACE_SECS: u64 = 10;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub generation: Arc<dyn GenerationService>,
    pub store: Arc<dyn DocumentStore>,
    pub issuer: Arc<TokenIssuer>,
    pub uploads: UploadConfig,
    pub demo_tokens_enabled: bool,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a server with collaborators built from the configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let components = Components::from_config(&config)?;
        Ok(Self::with_components(config, components))
    }

    /// Create a server around caller-supplied collaborators.
    pub fn with_components(config: GatewayConfig, components: Components) -> Self {
        let gate = RequestGate::new(
            components.verifier,
            components.limiter.clone(),
            components.audit,
        )
        .with_audited_routes(audited_routes());
        let state = AppState {
            generation: components.generation,
            store: components.store,
            issuer: Arc::new(TokenIssuer::new(
                &config.auth.secret,
                config.auth.token_ttl_secs,
            )),
            uploads: config.uploads.clone(),
            demo_tokens_enabled: config.auth.demo_tokens_enabled,
        };

        let router = Self::build_router(&config, state, gate);
        Self {
            router,
            config,
            limiter: components.limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState, gate: RequestGate) -> Router {
        let upload_limit = config.uploads.max_file_bytes + MULTIPART_OVERHEAD_BYTES;

        let gated = Router::new()
            .route(
                "/workspaces",
                post(handlers::create_workspace).get(handlers::list_workspaces),
            )
            .route(
                "/documents/upload",
                post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
            )
            .route("/documents", get(handlers::list_documents))
            .route("/documents/{document_id}", delete(handlers::delete_document))
            .route("/chat/query", post(handlers::chat_query))
            .route_layer(middleware::from_fn_with_state(gate, gate_middleware));

        Router::new()
            .route("/", get(handlers::health))
            .route("/health", get(handlers::health))
            .route("/auth/demo-token", post(handlers::demo_token))
            .merge(gated)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors_layer(&config.cors))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload = spawn_policy_updates(self.limiter.clone(), config_updates);
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        reload.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server behind TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
        tracing::info!(address = %addr, "HTTPS server starting");

        let reload = spawn_policy_updates(self.limiter.clone(), config_updates);
        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            wait_for_shutdown(shutdown).await;
            drain.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        reload.abort();
        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Routes whose every admitted request leaves one audit record.
fn audited_routes() -> AuditedRoutes {
    AuditedRoutes::new([
        (Method::POST, "/workspaces", handlers::WORKSPACE_CREATE),
        (Method::POST, "/documents/upload", handlers::DOCUMENT_UPLOAD),
        (Method::DELETE, "/documents/{document_id}", handlers::DOCUMENT_DELETE),
        (Method::POST, "/chat/query", handlers::CHAT_QUERY),
    ])
}

/// Swap the limiter's policy whenever a reloaded config changes it.
fn spawn_policy_updates(
    limiter: Arc<RateLimiter>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            let policy = RatePolicy::from(&config.rate_limit);
            if policy != limiter.policy() {
                limiter.set_policy(policy);
            }
        }
    })
}

async fn wait_for_shutdown(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}
