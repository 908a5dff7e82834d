//! Prometheus metrics definitions and HTTP server

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec, Encoder,
    HistogramVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Total number of reconciliations by operation
    pub static ref RECONCILIATIONS: CounterVec = register_counter_vec!(
        "dnsrecord_operator_reconciliations_total",
        "Total number of reconciliations by operation",
        &["operation"]
    ).unwrap();

    /// Total number of reconciliation errors
    pub static ref RECONCILIATION_ERRORS: CounterVec = register_counter_vec!(
        "dnsrecord_operator_reconciliation_errors_total",
        "Total number of reconciliation errors by operation and retryability",
        &["operation", "retryable"]
    ).unwrap();

    /// Reconciliation duration histogram
    pub static ref RECONCILE_DURATION: HistogramVec = register_histogram_vec!(
        "dnsrecord_operator_reconcile_duration_seconds",
        "Duration of reconciliations in seconds",
        &["operation"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    /// Reconciliations skipped before entering the state machine
    pub static ref SKIPPED: CounterVec = register_counter_vec!(
        "dnsrecord_operator_skipped_total",
        "Total number of skipped reconciliations by reason",
        &["reason"]
    ).unwrap();

    /// Ownership checks that denied an operation up front
    pub static ref OWNERSHIP_DENIALS: Counter = register_counter!(
        "dnsrecord_operator_ownership_denials_total",
        "Total number of operations refused because the shoot is owned elsewhere"
    ).unwrap();

    /// Ownership lost while an operation was in flight, by cause
    /// (`not_owned` or `check_failed`)
    pub static ref OWNERSHIP_LOSSES: CounterVec = register_counter_vec!(
        "dnsrecord_operator_ownership_losses_total",
        "Total number of in-flight operations cancelled by the ownership watchdog",
        &["cause"]
    ).unwrap();

    /// Operator health (1 = healthy, 0 = unhealthy)
    pub static ref OPERATOR_HEALTH: prometheus::Gauge = prometheus::register_gauge!(
        "dnsrecord_operator_health",
        "Operator health status (1 = healthy, 0 = unhealthy)"
    ).unwrap();
}

/// Start the metrics and health HTTP server
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "Metrics server listening");

    OPERATOR_HEALTH.set(1.0);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!(error = %e, "Error serving metrics connection");
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let response = match req.uri().path() {
        "/metrics" => metrics_response(),
        "/healthz" | "/readyz" => respond(StatusCode::OK, None, Bytes::from_static(b"ok")),
        _ => respond(StatusCode::NOT_FOUND, None, Bytes::from_static(b"Not Found")),
    };

    Ok(response)
}

fn metrics_response() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            Bytes::from_static(b"Failed to encode metrics"),
        );
    }

    respond(StatusCode::OK, Some(encoder.format_type()), Bytes::from(buffer))
}

fn respond(status: StatusCode, content_type: Option<&str>, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(value) = content_type.and_then(|v| HeaderValue::from_str(v).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}
