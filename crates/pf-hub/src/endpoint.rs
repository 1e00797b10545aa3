//! # Filter Endpoint
//!
//! One request runs `received → parsing → querying → rendering → responded`
//! and either produces a complete body or fails as a whole. Both the
//! full-page load and the asynchronous filter call go through
//! [`FilterEndpoint::handle`], so equal parameters give equal results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pf_core::query::{COLOR_TAXONOMY, SIZE_TAXONOMY};
use pf_core::{criteria, query, Criteria, CriteriaParser, FieldError, ParseError};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

use crate::catalog::{CatalogEngine, CatalogError, TaxonomyProvider};
use crate::render::ProductRenderer;

pub const DEFAULT_EMPTY_MESSAGE: &str = "No products found";

/// Which path triggered the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Full page load with the criteria in the URL.
    PageLoad,
    /// Partial update from the client controller.
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Received,
    Parsing,
    Querying,
    Rendering,
    Responded,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Parsing => write!(f, "parsing"),
            Self::Querying => write!(f, "querying"),
            Self::Rendering => write!(f, "rendering"),
            Self::Responded => write!(f, "responded"),
        }
    }
}

/// Raw filter parameters plus the path they arrived on.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub params: HashMap<String, String>,
    pub trigger: Trigger,
}

impl FilterRequest {
    pub fn new(params: HashMap<String, String>, trigger: Trigger) -> Self {
        Self { params, trigger }
    }
}

#[derive(Debug, Clone)]
pub struct FilterResponse {
    /// The sanitized criteria the body was produced from.
    pub criteria: Criteria,
    /// Concatenated product markup, or the empty-state message.
    pub body: String,
    pub matched: usize,
}

#[derive(Debug)]
pub enum FilterError {
    /// Input rejected under the strict policy.
    Invalid(ParseError),
    /// The catalog engine failed; no partial results.
    Catalog(CatalogError),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{}", e),
            Self::Catalog(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FilterError {}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        match self {
            Self::Invalid(e) => {
                let body = axum::Json(json!({ "error": e.to_string(), "fields": e.errors }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            // Engine details stay in the logs.
            Self::Catalog(_) => {
                let body = axum::Json(json!({ "error": "Unable to load products" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub struct FilterEndpoint {
    parser: CriteriaParser,
    catalog: Arc<dyn CatalogEngine>,
    taxonomy: Arc<dyn TaxonomyProvider>,
    renderer: Arc<dyn ProductRenderer>,
    empty_message: String,
}

impl FilterEndpoint {
    pub fn new(
        parser: CriteriaParser,
        catalog: Arc<dyn CatalogEngine>,
        taxonomy: Arc<dyn TaxonomyProvider>,
        renderer: Arc<dyn ProductRenderer>,
    ) -> Self {
        Self {
            parser,
            catalog,
            taxonomy,
            renderer,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
        }
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn parser(&self) -> &CriteriaParser {
        &self.parser
    }

    pub async fn handle(&self, request: FilterRequest) -> Result<FilterResponse, FilterError> {
        let span = tracing::info_span!(
            "filter",
            request_id = %uuid::Uuid::new_v4(),
            trigger = ?request.trigger,
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: FilterRequest) -> Result<FilterResponse, FilterError> {
        enter(Phase::Received);

        enter(Phase::Parsing);
        let criteria = self.parser.parse(&request.params).map_err(|e| {
            tracing::info!("Rejected filter input: {}", e);
            FilterError::Invalid(e)
        })?;
        self.check_references(&criteria)?;

        enter(Phase::Querying);
        let query = query::build(&criteria);
        tracing::debug!(
            plan = %serde_json::to_string(&query).unwrap_or_default(),
            "Built catalog query"
        );
        let products = self.catalog.find(&query).await.map_err(|e| {
            tracing::error!("Catalog query failed: {}", e);
            FilterError::Catalog(e)
        })?;

        enter(Phase::Rendering);
        let body = if products.is_empty() {
            self.empty_message.clone()
        } else {
            products.iter().map(|p| self.renderer.render(p)).collect()
        };

        enter(Phase::Responded);
        tracing::info!(matched = products.len(), clauses = query.len(), "Filter served");

        Ok(FilterResponse {
            criteria,
            body,
            matched: products.len(),
        })
    }

    /// Under the strict policy, categories and term slugs must exist.
    fn check_references(&self, criteria: &Criteria) -> Result<(), FilterError> {
        if self.parser.policy() != pf_core::NumericPolicy::Strict {
            return Ok(());
        }

        let mut errors = Vec::new();
        if let Some(id) = criteria.category_id() {
            if !self.taxonomy.category_exists(id) {
                errors.push(unknown(criteria::CATEGORY, "category"));
            }
        }
        if let Some(slug) = criteria.color_slug() {
            if !self.taxonomy.term_exists(COLOR_TAXONOMY, slug) {
                errors.push(unknown(criteria::COLOR, "color"));
            }
        }
        if let Some(slug) = criteria.size_slug() {
            if !self.taxonomy.term_exists(SIZE_TAXONOMY, slug) {
                errors.push(unknown(criteria::SIZE, "size"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FilterError::Invalid(ParseError { errors }))
        }
    }
}

fn enter(phase: Phase) {
    tracing::debug!(%phase, "Filter phase");
}

fn unknown(field: &'static str, what: &str) -> FieldError {
    FieldError {
        field,
        reason: format!("unknown {}", what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use pf_core::{NumericPolicy, Product, ProductQuery};

    /// Renders `#<id>` so tests can read the order back.
    struct IdRenderer;

    impl ProductRenderer for IdRenderer {
        fn render(&self, product: &Product) -> String {
            format!("#{}", product.id)
        }
    }

    struct DownCatalog;

    #[async_trait::async_trait]
    impl CatalogEngine for DownCatalog {
        async fn find(&self, _query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
            Err(CatalogError::Unavailable("connection refused".into()))
        }
    }

    fn endpoint(policy: NumericPolicy) -> FilterEndpoint {
        let catalog = Arc::new(sample_catalog());
        FilterEndpoint::new(
            CriteriaParser::new(policy),
            catalog.clone(),
            catalog,
            Arc::new(IdRenderer),
        )
    }

    fn request(pairs: &[(&str, &str)], trigger: Trigger) -> FilterRequest {
        FilterRequest::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            trigger,
        )
    }

    #[tokio::test]
    async fn test_category_price_stock_scenario() {
        let resp = endpoint(NumericPolicy::Coerce)
            .handle(request(
                &[
                    ("category", "5"),
                    ("min_price", "10"),
                    ("max_price", "50"),
                    ("availability", "in_stock"),
                ],
                Trigger::Async,
            ))
            .await
            .unwrap();
        // 6 is a child category of 5; 4 and 10 are out of stock; 3 costs 60.
        assert_eq!(resp.body, "#1#2#6#7");
        assert_eq!(resp.matched, 4);
    }

    #[tokio::test]
    async fn test_default_criteria_returns_whole_catalog() {
        let resp = endpoint(NumericPolicy::Coerce)
            .handle(request(&[("availability", "all")], Trigger::Async))
            .await
            .unwrap();
        assert_eq!(resp.body, "#1#2#3#4#5#6#7#8#9#10");
        assert!(resp.criteria.is_unconstrained());
    }

    #[tokio::test]
    async fn test_zero_matches_returns_empty_state() {
        let resp = endpoint(NumericPolicy::Coerce)
            .handle(request(&[("pa_color", "purple")], Trigger::Async))
            .await
            .unwrap();
        assert_eq!(resp.matched, 0);
        assert_eq!(resp.body, DEFAULT_EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn test_custom_empty_message() {
        let resp = endpoint(NumericPolicy::Coerce)
            .with_empty_message("Nothing here")
            .handle(request(&[("min_price", "1000")], Trigger::Async))
            .await
            .unwrap();
        assert_eq!(resp.body, "Nothing here");
    }

    #[tokio::test]
    async fn test_same_criteria_twice_is_identical() {
        let ep = endpoint(NumericPolicy::Coerce);
        let pairs = [("brand", "Brand"), ("pa_size", "m")];
        let first = ep.handle(request(&pairs, Trigger::Async)).await.unwrap();
        let second = ep.handle(request(&pairs, Trigger::Async)).await.unwrap();
        assert_eq!(first.body, second.body);
        assert_eq!(first.body, "#1#6#9");
    }

    #[tokio::test]
    async fn test_triggers_are_equivalent() {
        let ep = endpoint(NumericPolicy::Coerce);
        let pairs = [("category", "6"), ("color", "red")];
        let page = ep.handle(request(&pairs, Trigger::PageLoad)).await.unwrap();
        let ajax = ep.handle(request(&pairs, Trigger::Async)).await.unwrap();
        assert_eq!(page.body, ajax.body);
        assert_eq!(page.criteria, ajax.criteria);
    }

    #[tokio::test]
    async fn test_lenient_unknown_category_matches_nothing() {
        let resp = endpoint(NumericPolicy::Coerce)
            .handle(request(&[("category", "99")], Trigger::Async))
            .await
            .unwrap();
        assert_eq!(resp.matched, 0);
    }

    #[tokio::test]
    async fn test_strict_rejects_unknown_references() {
        let err = endpoint(NumericPolicy::Strict)
            .handle(request(
                &[("category", "99"), ("pa_color", "red"), ("pa_size", "xxl")],
                Trigger::Async,
            ))
            .await
            .unwrap_err();
        match err {
            FilterError::Invalid(e) => {
                let fields: Vec<&str> = e.errors.iter().map(|f| f.field).collect();
                assert_eq!(fields, vec!["category", "pa_size"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_catalog_failure_is_fatal() {
        let taxonomy = Arc::new(sample_catalog());
        let ep = FilterEndpoint::new(
            CriteriaParser::default(),
            Arc::new(DownCatalog),
            taxonomy,
            Arc::new(IdRenderer),
        );
        let err = ep.handle(request(&[], Trigger::Async)).await.unwrap_err();
        assert!(matches!(err, FilterError::Catalog(CatalogError::Unavailable(_))));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
