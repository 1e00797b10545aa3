//! # Client Controller
//!
//! Captures filter form submissions, sends them to the filter endpoint and
//! keeps a results view in sync with the most recent submit.
//!
//! Every submit takes a sequence number. A response that arrives after a
//! newer submit was issued is dropped, so the view never shows stale results.

use pf_core::criteria as fields;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Form State
// =============================================================================

/// Raw values of the filter form, as the user left them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub category: String,
    pub min_price: String,
    pub max_price: String,
    pub color: String,
    pub size: String,
    pub brand: String,
    pub availability: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            category: "0".into(),
            min_price: String::new(),
            max_price: String::new(),
            color: String::new(),
            size: String::new(),
            brand: String::new(),
            availability: "all".into(),
        }
    }
}

impl FormState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Form fields in wire order. Empty fields and fields left on their
    /// "All" choice are omitted.
    pub fn serialize(&self) -> Vec<(&'static str, String)> {
        let defaults = Self::default();
        [
            (fields::CATEGORY, &self.category, &defaults.category),
            (fields::MIN_PRICE, &self.min_price, &defaults.min_price),
            (fields::MAX_PRICE, &self.max_price, &defaults.max_price),
            (fields::COLOR, &self.color, &defaults.color),
            (fields::SIZE, &self.size, &defaults.size),
            (fields::BRAND, &self.brand, &defaults.brand),
            (fields::AVAILABILITY, &self.availability, &defaults.availability),
        ]
        .into_iter()
        .filter_map(|(name, value, default)| {
            let value = value.trim();
            (!value.is_empty() && value != default.as_str()).then(|| (name, value.to_string()))
        })
        .collect()
    }

    /// `<base>/shop?<criteria>`, or `<base>/shop` for an untouched form.
    pub fn shareable_url(&self, base_url: &str) -> Result<String, ControllerError> {
        let page = format!("{}/shop", base_url.trim_end_matches('/'));
        let params = self.serialize();
        if params.is_empty() {
            return Ok(page);
        }
        reqwest::Url::parse_with_params(&page, &params)
            .map(String::from)
            .map_err(|e| ControllerError::Url(e.to_string()))
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    Timeout(Duration),
    Transport(String),
    /// The endpoint answered with a non-success status.
    Status(u16, String),
    Url(String),
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "request timed out after {:?}", after),
            Self::Transport(msg) => write!(f, "request failed: {}", msg),
            Self::Status(code, body) => write!(f, "filter endpoint returned {}: {}", code, body),
            Self::Url(msg) => write!(f, "invalid url: {}", msg),
        }
    }
}

impl std::error::Error for ControllerError {}

// =============================================================================
// Transport
// =============================================================================

/// Sends serialized form fields to the filter endpoint, returns the body.
#[async_trait::async_trait]
pub trait FilterTransport: Send + Sync {
    async fn fetch(&self, params: &[(&'static str, String)]) -> Result<String, ControllerError>;
}

/// `POST <base>/api/filter` with a form-encoded body.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl FilterTransport for HttpTransport {
    async fn fetch(&self, params: &[(&'static str, String)]) -> Result<String, ControllerError> {
        let url = format!("{}/api/filter", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| ControllerError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ControllerError::Transport(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ControllerError::Status(status.as_u16(), body))
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Content of the results container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultsView {
    #[default]
    Idle,
    Loading { sequence: u64 },
    Loaded { sequence: u64, body: String },
    Failed { sequence: u64, message: String },
}

/// What happened to one submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The response replaced the results view.
    Applied { sequence: u64 },
    /// A newer submit was issued before this one completed.
    Discarded { sequence: u64 },
    /// The view now shows a failure message.
    Failed {
        sequence: u64,
        error: ControllerError,
    },
}

pub struct Controller {
    transport: Arc<dyn FilterTransport>,
    base_url: String,
    timeout: Duration,
    sequence: AtomicU64,
    form: RwLock<FormState>,
    view: RwLock<ResultsView>,
    location: RwLock<String>,
}

impl Controller {
    pub fn new(transport: Arc<dyn FilterTransport>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let location = format!("{}/shop", base_url.trim_end_matches('/'));
        Self {
            transport,
            base_url,
            timeout: DEFAULT_TIMEOUT,
            sequence: AtomicU64::new(0),
            form: RwLock::new(FormState::default()),
            view: RwLock::new(ResultsView::Idle),
            location: RwLock::new(location),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn form(&self) -> FormState {
        self.form.read().await.clone()
    }

    pub async fn view(&self) -> ResultsView {
        self.view.read().await.clone()
    }

    /// Shareable URL of the latest submit that completed.
    pub async fn location(&self) -> String {
        self.location.read().await.clone()
    }

    pub async fn submit(&self, form: FormState) -> Outcome {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let params = form.serialize();
        {
            let mut view = self.view.write().await;
            if self.sequence.load(Ordering::SeqCst) != sequence {
                return Outcome::Discarded { sequence };
            }
            *view = ResultsView::Loading { sequence };
        }
        tracing::debug!(sequence, ?params, "Submitting filter");

        let result = match tokio::time::timeout(self.timeout, self.transport.fetch(&params)).await
        {
            Ok(result) => result,
            Err(_) => Err(ControllerError::Timeout(self.timeout)),
        };

        let mut view = self.view.write().await;
        if self.sequence.load(Ordering::SeqCst) != sequence {
            tracing::debug!(sequence, "Discarding stale response");
            return Outcome::Discarded { sequence };
        }
        // Form and location change together with the view they describe.
        match form.shareable_url(&self.base_url) {
            Ok(url) => *self.location.write().await = url,
            Err(e) => tracing::warn!(sequence, "Location not updated: {}", e),
        }
        *self.form.write().await = form;
        match result {
            Ok(body) => {
                *view = ResultsView::Loaded { sequence, body };
                Outcome::Applied { sequence }
            }
            Err(error) => {
                tracing::warn!(sequence, "Filter request failed: {}", error);
                *view = ResultsView::Failed {
                    sequence,
                    message: error.to_string(),
                };
                Outcome::Failed { sequence, error }
            }
        }
    }

    /// Clears every field and submits the default form.
    pub async fn reset(&self) -> Outcome {
        let mut form = self.form().await;
        form.reset();
        self.submit(form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Form, Router};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Echoes the params back; `brand=slow` takes longer than anything else.
    struct EchoTransport {
        delay: Duration,
        seen: Mutex<Vec<Vec<(&'static str, String)>>>,
    }

    impl EchoTransport {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl FilterTransport for EchoTransport {
        async fn fetch(&self, params: &[(&'static str, String)]) -> Result<String, ControllerError> {
            self.seen.lock().unwrap().push(params.to_vec());
            let slow = params.iter().any(|(k, v)| *k == "brand" && v == "slow");
            let delay = if slow { self.delay * 10 } else { self.delay };
            tokio::time::sleep(delay).await;
            Ok(params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&"))
        }
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl FilterTransport for FailingTransport {
        async fn fetch(&self, _: &[(&'static str, String)]) -> Result<String, ControllerError> {
            Err(ControllerError::Status(500, "Unable to load products".into()))
        }
    }

    async fn echo_filter(
        Form(params): Form<HashMap<String, String>>,
    ) -> Result<String, (StatusCode, String)> {
        if params.get("min_price").map(String::as_str) == Some("bad") {
            return Err((StatusCode::BAD_REQUEST, "invalid filter criteria".into()));
        }
        let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        Ok(pairs.join("&"))
    }

    async fn spawn_filter_server() -> String {
        let app = Router::new().route("/api/filter", post(echo_filter));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn form_with_brand(brand: &str) -> FormState {
        FormState {
            brand: brand.into(),
            ..FormState::default()
        }
    }

    #[test]
    fn test_serialize_omits_empty_and_default_fields() {
        let form = FormState {
            category: "5".into(),
            min_price: " 10 ".into(),
            brand: "   ".into(),
            ..FormState::default()
        };
        assert_eq!(
            form.serialize(),
            vec![("category", "5".to_string()), ("min_price", "10".to_string())]
        );
        assert!(FormState::default().serialize().is_empty());
    }

    #[test]
    fn test_shareable_url() {
        let form = FormState {
            color: "red".into(),
            brand: "Brand One".into(),
            availability: "in_stock".into(),
            ..FormState::default()
        };
        assert_eq!(
            form.shareable_url("http://shop.test/").unwrap(),
            "http://shop.test/shop?pa_color=red&brand=Brand+One&availability=in_stock"
        );
        assert_eq!(
            FormState::default().shareable_url("http://shop.test").unwrap(),
            "http://shop.test/shop"
        );
    }

    #[tokio::test]
    async fn test_submit_updates_view_and_location() {
        let controller = Controller::new(EchoTransport::new(Duration::ZERO), "http://shop.test");
        let outcome = controller.submit(form_with_brand("Acme")).await;

        assert_eq!(outcome, Outcome::Applied { sequence: 1 });
        assert_eq!(
            controller.view().await,
            ResultsView::Loaded {
                sequence: 1,
                body: "brand=Acme".into()
            }
        );
        assert_eq!(controller.location().await, "http://shop.test/shop?brand=Acme");
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let controller = Arc::new(Controller::new(
            EchoTransport::new(Duration::from_millis(20)),
            "http://shop.test",
        ));

        let slow = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit(form_with_brand("slow")).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let fast = controller.submit(form_with_brand("fast")).await;

        assert_eq!(fast, Outcome::Applied { sequence: 2 });
        assert_eq!(slow.await.unwrap(), Outcome::Discarded { sequence: 1 });
        assert_eq!(controller.location().await, "http://shop.test/shop?brand=fast");
        assert_eq!(controller.form().await, form_with_brand("fast"));
        assert_eq!(
            controller.view().await,
            ResultsView::Loaded {
                sequence: 2,
                body: "brand=fast".into()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_shows_failure() {
        let controller = Controller::new(
            EchoTransport::new(Duration::from_millis(500)),
            "http://shop.test",
        )
        .with_timeout(Duration::from_millis(20));

        let outcome = controller.submit(form_with_brand("Acme")).await;
        assert!(matches!(
            outcome,
            Outcome::Failed {
                sequence: 1,
                error: ControllerError::Timeout(_)
            }
        ));
        match controller.view().await {
            ResultsView::Failed { message, .. } => assert!(message.contains("timed out")),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_endpoint_error_shows_failure() {
        let controller = Controller::new(Arc::new(FailingTransport), "http://shop.test");
        let outcome = controller.submit(FormState::default()).await;
        assert!(matches!(
            outcome,
            Outcome::Failed {
                error: ControllerError::Status(500, _),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_http_transport_posts_form() {
        let base_url = spawn_filter_server().await;
        let transport = HttpTransport::new(reqwest::Client::new(), format!("{}/", base_url));

        let form = FormState {
            color: "red".into(),
            brand: "Brand One".into(),
            ..FormState::default()
        };
        let body = transport.fetch(&form.serialize()).await.unwrap();
        assert_eq!(body, "brand=Brand One&pa_color=red");
    }

    #[tokio::test]
    async fn test_http_transport_maps_error_status() {
        let base_url = spawn_filter_server().await;
        let controller = Controller::new(
            Arc::new(HttpTransport::new(reqwest::Client::new(), base_url.clone())),
            base_url,
        );

        let form = FormState {
            min_price: "bad".into(),
            ..FormState::default()
        };
        match controller.submit(form).await {
            Outcome::Failed { error, .. } => assert_eq!(
                error,
                ControllerError::Status(400, "invalid filter criteria".into())
            ),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_submits_default_form() {
        let transport = EchoTransport::new(Duration::ZERO);
        let controller = Controller::new(transport.clone(), "http://shop.test");

        controller
            .submit(FormState {
                category: "6".into(),
                size: "m".into(),
                ..FormState::default()
            })
            .await;
        let outcome = controller.reset().await;

        assert_eq!(outcome, Outcome::Applied { sequence: 2 });
        assert_eq!(controller.form().await, FormState::default());
        assert_eq!(controller.location().await, "http://shop.test/shop");
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].is_empty());
    }
}
