//! # API Handlers
//!
//! Axum handlers for the shop page, the asynchronous filter call and the
//! taxonomy listing.

use crate::endpoint::{FilterError, FilterRequest, Trigger};
use crate::render::page;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use pf_core::query::{COLOR_TAXONOMY, SIZE_TAXONOMY};
use pf_core::{Category, NumericPolicy, Term};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct TaxonomyListing {
    pub categories: Vec<Category>,
    pub pa_color: Vec<Term>,
    pub pa_size: Vec<Term>,
    pub brands: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HubStatus {
    pub version: &'static str,
    pub products: usize,
    pub numeric_policy: NumericPolicy,
    pub uptime_seconds: u64,
    pub started_at: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(shop_page))
        .route("/shop", get(shop_page))
        .route("/api/filter", post(filter_products))
        .route("/api/taxonomy", get(taxonomy))
        .route("/api/status", get(status))
        .with_state(state)
}

// =============================================================================
// Filter
// =============================================================================

/// Asynchronous filter call: form fields in, product fragment out.
pub async fn filter_products(
    State(state): State<Arc<AppState>>,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Html<String>, FilterError> {
    let response = state
        .endpoint
        .handle(FilterRequest::new(params, Trigger::Async))
        .await?;
    Ok(Html(response.body))
}

/// Full page with the criteria taken from the URL.
pub async fn shop_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, FilterError> {
    let response = state
        .endpoint
        .handle(FilterRequest::new(params, Trigger::PageLoad))
        .await?;
    Ok(Html(page::render_shop_page(
        &response.criteria,
        state.taxonomy.as_ref(),
        &response.body,
    )))
}

// =============================================================================
// Taxonomy & Status
// =============================================================================

pub async fn taxonomy(State(state): State<Arc<AppState>>) -> Json<TaxonomyListing> {
    let provider = &state.taxonomy;
    Json(TaxonomyListing {
        categories: provider.categories(),
        pa_color: provider.terms(COLOR_TAXONOMY),
        pa_size: provider.terms(SIZE_TAXONOMY),
        brands: provider.brands(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<HubStatus> {
    Json(HubStatus {
        version: env!("CARGO_PKG_VERSION"),
        products: state.product_count,
        numeric_policy: state.endpoint.parser().policy(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.clone(),
    })
}
