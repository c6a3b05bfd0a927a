use hyper::{Method, StatusCode};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "recipe_cache_server=info";

pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

pub fn log_request(
    request_id: &str,
    method: &Method,
    path: &str,
    status: StatusCode,
    duration: std::time::Duration,
) {
    if status.is_server_error() {
        warn!(
            target: "request",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request failed"
        );
    } else {
        info!(
            target: "request",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }
}
