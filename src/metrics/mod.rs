use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::GaugeVec;
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
    pub static ref ACTIVE_BRANCHES: IntGauge =
        IntGauge::new("hub_active_branches", "Number of branches currently marked active")
            .expect("metric can not be created");

    pub static ref BRANCH_OFFLINE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hub_branch_offline_total", "Branches marked offline, by detecting task"),
        &["task"]
    )
    .expect("metric can not be created");

    pub static ref BRANCH_LOAD_SCORE: GaugeVec = GaugeVec::new(
        Opts::new("hub_branch_load_score", "Latest computed load score per branch"),
        &["branch"]
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATIONS_PERSISTED: IntCounter = IntCounter::new(
        "hub_notifications_persisted_total",
        "Notifications durably appended to the store"
    )
    .expect("metric can not be created");

    pub static ref PERSISTENCE_FAILURES: IntCounter = IntCounter::new(
        "hub_persistence_failures_total",
        "Notification appends rejected by the store"
    )
    .expect("metric can not be created");

    pub static ref PUSH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("hub_push_failures_total", "Failed live pushes, by reason"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref CALLBACK_EVICTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("hub_callback_evictions_total", "Evicted subscriber handles, by cause"),
        &["cause"]
    )
    .expect("metric can not be created");

    pub static ref SCHEDULER_TASK_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("hub_scheduler_task_failures_total", "Failed or panicked periodic cycles"),
        &["task"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

/// Registers every hub collector into `registry`.
/// Collectors already present are skipped with a log line.
pub fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIVE_BRANCHES.clone()),
        Box::new(BRANCH_OFFLINE_TOTAL.clone()),
        Box::new(BRANCH_LOAD_SCORE.clone()),
        Box::new(NOTIFICATIONS_PERSISTED.clone()),
        Box::new(PERSISTENCE_FAILURES.clone()),
        Box::new(PUSH_FAILURES.clone()),
        Box::new(CALLBACK_EVICTIONS.clone()),
        Box::new(SCHEDULER_TASK_FAILURES.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("collector can not be registered: {}", e);
        }
    }
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);
    prometheus_exporter::init();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!("metrics server listening on 0.0.0.0:{}", port);
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
    info!("metrics server stopped");
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    let mut res = encode_registry(&REGISTRY);
    res.push_str(&get_metrics_body());
    Ok(res)
}

pub(crate) fn encode_registry(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

/// Export autometrics function metrics for Prometheus to scrape
pub fn get_metrics_body() -> String {
    prometheus_exporter::encode_to_string().unwrap_or_default()
}
