use crate::{
    metrics::{Exposition, exposition::CONTENT_TYPE},
    sweep::Sweep,
};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use color_eyre::{Result, eyre::bail};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

struct Exporter {
    /// Held for the duration of a sweep so scrapes never overlap.
    sweep: Mutex<Sweep>,
    index: String,
}

/// Build an `axum::Router` serving the index page and the metrics path.
pub fn create_app(sweep: Sweep, metrics_path: &str) -> Result<Router> {
    if !metrics_path.starts_with('/') || metrics_path == "/" {
        bail!("invalid metrics path {metrics_path:?}, expected e.g. /metrics");
    }

    let exporter = Arc::new(Exporter {
        sweep: Mutex::new(sweep),
        index: index_page(metrics_path),
    });

    let app = Router::new()
        .route("/", get(index))
        .route(metrics_path, get(metrics))
        .with_state(exporter);

    Ok(app)
}

async fn index(State(exporter): State<Arc<Exporter>>) -> Html<String> {
    Html(exporter.index.clone())
}

/// The sweep runs on its own task and always finishes, even when the
/// scraper hangs up, so a modem is never left with signal refresh enabled.
async fn metrics(State(exporter): State<Arc<Exporter>>) -> Response {
    let sweep = tokio::spawn(async move {
        let sweep = exporter.sweep.lock().await;
        let report = sweep.run().await;

        Exposition::new(sweep.catalogue(), &report.observations()).to_string()
    });

    match sweep.await {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!("metrics sweep did not complete: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn index_page(metrics_path: &str) -> String {
    format!(
        "<html>\
         <head><title>Modem Exporter</title></head>\
         <body>\
         <h1>Modem Exporter</h1>\
         <p><a href='{metrics_path}'>Metrics</a></p>\
         </body>\
         </html>"
    )
}
