use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::header::HeaderValue;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use tokio::signal;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::cache_control::DirectiveProfiles;
use crate::error::{AppError, Result};
use crate::gateway::RevalidationGateway;
use crate::identity::IdentityResolver;
use crate::logger::log_request;
use crate::routes::dispatch;
use crate::store::RecipeStore;
use crate::utils::get_url_path;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 所有请求共享的只读依赖
pub struct AppState {
    pub gateway: RevalidationGateway,
    pub store: Arc<dyn RecipeStore>,
    pub identity: Arc<dyn IdentityResolver>,
    pub profiles: DirectiveProfiles,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        identity: Arc<dyn IdentityResolver>,
        profiles: DirectiveProfiles,
    ) -> Self {
        Self {
            gateway: RevalidationGateway::new(store.clone(), identity.clone(), profiles.resource),
            store,
            identity,
            profiles,
        }
    }
}

pub struct RecipeServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl RecipeServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        info!("Creating recipe server on {}", addr);
        Self { addr, state }
    }

    pub async fn run(&self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    #[tracing::instrument(skip(self, shutdown))]
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Starting recipe server on {}", self.addr);
        let state = self.state.clone();

        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let remote_addr = conn.remote_addr();
            debug!("New connection from: {}", remote_addr);
            let state = state.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    debug!("Received request from {}: {} {}", remote_addr, req.method(), req.uri());
                    handle_request(req, state.clone())
                }))
            }
        });

        let server = Server::try_bind(&self.addr)
            .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", self.addr, e)))?
            .serve(make_svc)
            .with_graceful_shutdown(shutdown);
        info!("Recipe server is ready to accept connections");

        if let Err(e) = server.await {
            error!("Server error: {}", e);
            return Err(AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)));
        }

        info!("Recipe server stopped");
        Ok(())
    }
}

/// 处理单个请求；错误在这里统一转换为响应
#[tracing::instrument(skip(req, state), fields(method = %req.method(), path = %req.uri().path()))]
pub async fn handle_request(
    req: Request<Body>,
    state: Arc<AppState>,
) -> std::result::Result<Response<Body>, Infallible> {
    let started = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let uri = req.uri().to_string();

    let mut response = match dispatch(&state, req).await {
        Ok(response) => response,
        Err(e) => {
            debug!("Request {} failed: {}", request_id, e);
            e.into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    log_request(&request_id, &method, get_url_path(&uri), response.status(), started.elapsed());
    Ok(response)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
