#![cfg(feature = "web")]

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::Result;
use crate::scrape::PageScraper;
use crate::source::QuoteSource;

/// Serialized scrape results, one JSON body per ticker, for the life of the
/// process.
#[derive(Default)]
pub struct ScrapeCache {
    entries: RwLock<HashMap<String, String>>,
}

impl ScrapeCache {
    pub fn get(&self, ticker: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ticker)
            .cloned()
    }

    pub fn insert(&self, ticker: &str, body: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticker.to_string(), body);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct AppState {
    source: Arc<dyn QuoteSource>,
    cache: ScrapeCache,
}

impl AppState {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        AppState {
            source,
            cache: ScrapeCache::default(),
        }
    }

    pub fn cache(&self) -> &ScrapeCache {
        &self.cache
    }
}

#[derive(Deserialize)]
struct EndpointQuery {
    ticker: Option<String>,
    nocache: Option<String>,
}

/// `/endpoint` plus the static bundle as fallback.
pub fn router(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/endpoint", get(scrape_endpoint))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config) -> Result<()> {
    let scraper = PageScraper::new(config.quote_url.clone())?;
    let state = Arc::new(AppState::new(Arc::new(scraper)));
    let app = router(state, &config.static_dir);

    let addr = config.addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on port: {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for interrupt: {}", e);
        return;
    }
    info!("Interrupt received, finishing in-flight requests");
}

async fn scrape_endpoint(
    Query(params): Query<EndpointQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let ticker = params
        .ticker
        .map(|t| t.trim().to_uppercase())
        .unwrap_or_default();
    let nocache = params
        .nocache
        .is_some_and(|n| n.trim().eq_ignore_ascii_case("true"));

    if ticker.is_empty() {
        return json_body("{}".to_string());
    }
    info!("{}", ticker);

    if !nocache {
        if let Some(body) = state.cache.get(&ticker) {
            debug!("Cache hit for {}", ticker);
            return json_body(body);
        }
    }

    match state.source.fetch(&ticker, nocache).await {
        Ok(attributes) => match serde_json::to_string(&attributes) {
            Ok(body) => {
                state.cache.insert(&ticker, body.clone());
                json_body(body)
            }
            Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        Err(e) => {
            warn!("Scrape of {} failed: {}", ticker, e);
            failure(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn failure(status: StatusCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
