use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref UNITS_ATTACHED: IntGauge =
        IntGauge::new("unitd_units_attached", "Number of currently attached units")
            .expect("metric can not be created");

    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("unitd_commands_total", "Control commands by kind and outcome"),
        &["command", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref COMMAND_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("unitd_command_duration_seconds", "Dispatch latency per command")
            .buckets(exponential_buckets(0.000_001, 4.0, 10).expect("valid buckets")),
        &["command"]
    )
    .expect("metric can not be created");

    pub static ref DRAIN_REFUSED: IntCounter =
        IntCounter::new("unitd_drain_refused_total", "Shutdown attempts refused with units attached")
            .expect("metric can not be created");

    pub static ref ATTACH_COLLISIONS: IntCounter =
        IntCounter::new("unitd_attach_collisions_total", "Split-mode attaches that reused a live id")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(UNITS_ATTACHED.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(COMMANDS_TOTAL.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(COMMAND_DURATION.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(DRAIN_REFUSED.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(ATTACH_COLLISIONS.clone()))
            .expect("collector can be registered");
        registry
    };
}

/// Serves `GET /metrics` until the shutdown signal fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let bound = warp::serve(metrics_route).try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
        let _ = shutdown_signal.changed().await;
    });

    match bound {
        Ok((addr, server)) => {
            info!("Metrics server listening on {}", addr);
            server.await;
        }
        Err(e) => error!("Failed to bind metrics server on port {}: {}", port, e),
    }
}

/// Text exposition of every registered collector.
pub fn gather_text() -> crate::Result<String> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| crate::Error::Fatal(format!("metrics are not utf-8: {e}")))
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    match gather_text() {
        Ok(body) => Ok(warp::reply::with_status(body, warp::http::StatusCode::OK)),
        Err(e) => {
            error!("could not encode metrics: {:?}", e);
            Ok(warp::reply::with_status(
                String::new(),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
