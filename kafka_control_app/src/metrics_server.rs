use anyhow::Context;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use kafka_control::lag_scraper::LagMetrics;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub fn router(metrics: Arc<LagMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<Arc<LagMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics.content_type())], body).into_response(),
        Err(e) => {
            error!("Error while rendering metrics: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serves `/metrics` until `shutdown` is cancelled.
pub async fn serve_metrics(
    listener: TcpListener,
    metrics: Arc<LagMetrics>,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let address = listener.local_addr().context("While reading listener address")?;
    info!("Serving metrics on http://{}/metrics", address);

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("While serving metrics")?;

    info!("Metrics server stopped");
    Ok(())
}
