//! HTTP server setup and the relay handler.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, request ID, client header policy)
//! - Bound the wait for the origin when a request timeout is configured
//! - Run Resolver → Guard → Forwarder → Rewriter for each request
//! - Swap in reloaded configuration without restarting
//! - Serve over plain TCP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::http::forward::Forwarder;
use crate::http::request::{request_id, MakeRelayRequestId};
use crate::http::{portal, response};
use crate::observability::metrics;
use crate::routing::{self, target::is_portal_request, InboundContext, InboundScheme};
use crate::security::headers::{
    ALLOW_HEADERS_VALUE, ALLOW_METHODS_VALUE, ALLOW_ORIGIN_VALUE, CACHE_CONTROL_VALUE,
};
use crate::security::AllowList;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_SECS: u64 = 10;

/// Configuration as seen by one request. Replaced wholesale on reload.
#[derive(Debug)]
pub struct RelaySnapshot {
    pub config: RelayConfig,
    pub allow_list: AllowList,
}

impl RelaySnapshot {
    pub fn new(config: RelayConfig) -> Self {
        let allow_list = AllowList::parse(&config.access.whitelist_domains);
        Self { config, allow_list }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<RelaySnapshot>>,
    pub forwarder: Forwarder,
    pub listener_scheme: InboundScheme,
    pub request_timeout: Option<Duration>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let forwarder = Forwarder::new(&config.timeouts)?;
        let listener_scheme = if config.listener.tls.is_some() {
            InboundScheme::Https
        } else {
            InboundScheme::Http
        };

        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(RelaySnapshot::new(config.clone()))),
            forwarder,
            listener_scheme,
            request_timeout: config.timeouts.request_secs.map(Duration::from_secs),
        };

        let router = Self::build_router(state.clone());
        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(relay_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRelayRequestId))
            // Outermost, so error responses carry the policy too.
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static(CACHE_CONTROL_VALUE),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static(ALLOW_ORIGIN_VALUE),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOW_METHODS_VALUE),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOW_HEADERS_VALUE),
            ))
    }

    /// The fully layered router, e.g. for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Configuration currently in effect.
    pub fn snapshot(&self) -> Arc<RelaySnapshot> {
        self.state.inner.load_full()
    }

    /// Configuration the server was started with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Replace the live configuration.
    pub fn apply_config(&self, config: RelayConfig) {
        apply_snapshot(&self.state.inner, config);
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_config_updates(self.state.inner.clone(), config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        spawn_config_updates(self.state.inner.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn apply_snapshot(inner: &ArcSwap<RelaySnapshot>, config: RelayConfig) {
    let snapshot = RelaySnapshot::new(config);
    tracing::info!(
        allow_list_entries = snapshot.allow_list.domains().len(),
        portal_page = snapshot.config.portal.page.file_name(),
        "Configuration applied"
    );
    inner.store(Arc::new(snapshot));
}

fn spawn_config_updates(
    inner: Arc<ArcSwap<RelaySnapshot>>,
    mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
) {
    tokio::spawn(async move {
        while let Some(config) = config_updates.recv().await {
            apply_snapshot(&inner, config);
        }
    });
}

/// Catch-all handler: portal page at `/`, relay everywhere else.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let snapshot = state.inner.load_full();
    let method = request.method().to_string();
    let request_id = request_id(request.headers()).to_string();

    if is_portal_request(request.uri()) {
        metrics::record_request(&method, 200, "portal", start_time);
        return portal::render(snapshot.config.portal.page);
    }

    let inbound = InboundContext::from_request(
        request.uri(),
        request.headers(),
        state.listener_scheme,
        snapshot.config.listener.trust_forwarded_headers,
        &snapshot.config.listener.bind_address,
    );

    let relayed = relay(&state, &snapshot, &inbound, request);
    let result = match state.request_timeout {
        Some(limit) => tokio::time::timeout(limit, relayed)
            .await
            .unwrap_or_else(|_| Err(RelayError::Timeout(limit.as_secs()))),
        None => relayed.await,
    };

    match result {
        Ok((response, outcome)) => {
            metrics::record_request(&method, response.status().as_u16(), outcome, start_time);
            response
        }
        Err(e) => {
            match &e {
                RelayError::MissingTarget | RelayError::InvalidParams(_) => {
                    tracing::info!(request_id = %request_id, error = %e, "Rejected relay request");
                }
                RelayError::AccessDenied => {}
                _ => {
                    tracing::error!(request_id = %request_id, error = %e, "Relay failed");
                }
            }
            metrics::record_request(&method, e.status_code().as_u16(), e.outcome(), start_time);
            e.into_response()
        }
    }
}

async fn relay(
    state: &AppState,
    snapshot: &RelaySnapshot,
    inbound: &InboundContext,
    request: Request<Body>,
) -> RelayResult<(Response, &'static str)> {
    let request_id = request_id(request.headers()).to_string();
    let target = routing::resolve(request.uri(), inbound.scheme)?;

    if let Err(denial) = snapshot.allow_list.check(target.url()) {
        tracing::warn!(
            request_id = %request_id,
            url = %target.url(),
            reason = ?denial,
            "Destination refused"
        );
        metrics::record_access_denied();
        return Err(RelayError::AccessDenied);
    }

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        url = %target.url(),
        source = ?target.source(),
        "Relaying request"
    );

    let origin = state
        .forwarder
        .forward(
            &target,
            request,
            snapshot.config.forward.reserved_header_prefix.as_deref(),
        )
        .await?;

    let kind = response::classify(origin.status(), origin.headers());
    let response = response::rewrite(origin, inbound, target.url()).await?;
    Ok((response, kind.outcome()))
}
