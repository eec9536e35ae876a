use crate::{AlertGroupNotification, Engine, Error, Target, TicketStore, metrics};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

struct App<S> {
    engine: Engine<S>,
    prometheus: PrometheusHandle,
}

/// Build the service's router, which receives Alertmanager webhooks at
/// `/issues/{project}/{team}` and also serves health and metrics.
pub fn build_router<S: TicketStore>(
    engine: Engine<S>,
    prometheus: PrometheusHandle,
) -> axum::Router<()> {
    use axum::routing::{get, post};

    let app = Arc::new(App { engine, prometheus });

    axum::Router::new()
        .route("/issues/{project}/{team}", post(file_issue::<S>))
        .route("/-/health", get(health))
        .route("/metrics", get(prometheus_metrics::<S>))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app)
}

// Accepts a JSON notification of version 3 or 4 of Alertmanager's generic
// webhook, and reconciles the issue of its alert group.
async fn file_issue<S: TicketStore>(
    axum::extract::State(app): axum::extract::State<Arc<App<S>>>,
    axum::extract::Path((project, team)): axum::extract::Path<(String, String)>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> Result<axum::http::StatusCode, Error> {
    let started = std::time::Instant::now();
    tracing::info!(%project, %team, "update received from Alertmanager");

    let result = reconcile(&app.engine, Target { project, team }, body).await;

    ::metrics::histogram!(metrics::REQUEST_LATENCY).record(started.elapsed().as_secs_f64());
    result
}

async fn reconcile<S: TicketStore>(
    engine: &Engine<S>,
    target: Target,
    body: serde_json::Value,
) -> Result<axum::http::StatusCode, Error> {
    let notification = AlertGroupNotification::from_value(body)?;

    match engine.reconcile(&target, &notification).await {
        Ok(outcome) => {
            ::metrics::counter!(metrics::RECONCILIATIONS, "outcome" => outcome.name())
                .increment(1);
            tracing::info!(?outcome, "reconciled alert group");
            Ok(axum::http::StatusCode::OK)
        }
        Err(error) => {
            ::metrics::counter!(metrics::RECONCILIATIONS, "outcome" => "failed").increment(1);
            tracing::warn!(?error, "reconciliation failed");
            Err(error)
        }
    }
}

async fn health() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::OK, "OK")
}

#[tracing::instrument(skip_all)]
async fn prometheus_metrics<S: TicketStore>(
    axum::extract::State(app): axum::extract::State<Arc<App<S>>>,
) -> (axum::http::StatusCode, String) {
    (axum::http::StatusCode::OK, app.prometheus.render())
}
