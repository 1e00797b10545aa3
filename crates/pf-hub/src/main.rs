use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pf_core::{CriteriaParser, NumericPolicy};

mod api;
mod catalog;
mod endpoint;
mod render;

use catalog::memory::MemoryCatalog;
use catalog::TaxonomyProvider;
use endpoint::{FilterEndpoint, DEFAULT_EMPTY_MESSAGE};
use render::HtmlRenderer;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "pf-hub", version, about = "Product filter server")]
struct Args {
    /// Server bind address (overrides `[server] bind`)
    #[arg(long)]
    bind: Option<String>,

    /// Path to config file
    #[arg(long, default_value = "pf-hub.toml")]
    config: PathBuf,

    /// Path to the TOML product catalog
    #[arg(long, default_value = "catalog.toml")]
    catalog: PathBuf,

    /// Directory of static assets served for unmatched paths
    #[arg(long)]
    assets: Option<PathBuf>,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    filter: FilterConfig,
    #[serde(default)]
    render: RenderConfig,
}

#[derive(Deserialize, Clone)]
struct ServerConfig {
    #[serde(default = "default_bind")]
    bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Deserialize, Clone, Default)]
struct FilterConfig {
    #[serde(default)]
    numeric_policy: NumericPolicy,
}

#[derive(Deserialize, Clone)]
struct RenderConfig {
    #[serde(default = "default_currency_symbol")]
    currency_symbol: String,
    #[serde(default = "default_empty_message")]
    empty_message: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            empty_message: default_empty_message(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}
fn default_currency_symbol() -> String {
    "$".into()
}
fn default_empty_message() -> String {
    DEFAULT_EMPTY_MESSAGE.into()
}

// =============================================================================
// Application State
// =============================================================================

pub(crate) struct AppState {
    endpoint: FilterEndpoint,
    taxonomy: Arc<dyn TaxonomyProvider>,
    product_count: usize,
    start_time: Instant,
    started_at: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pf_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config: Config = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config).unwrap_or_default();
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid config {:?}: {}", args.config, e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let catalog = match MemoryCatalog::load(&args.catalog) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Failed to load catalog: {}", e);
            std::process::exit(1);
        }
    };
    if catalog.is_empty() {
        tracing::warn!("Catalog {:?} has no products", args.catalog);
    }

    let policy = config.filter.numeric_policy;
    let state = Arc::new(AppState {
        product_count: catalog.len(),
        endpoint: FilterEndpoint::new(
            CriteriaParser::new(policy),
            catalog.clone(),
            catalog.clone(),
            Arc::new(HtmlRenderer::new(config.render.currency_symbol.clone())),
        )
        .with_empty_message(config.render.empty_message.clone()),
        taxonomy: catalog,
        start_time: Instant::now(),
        started_at: chrono::Utc::now().to_rfc3339(),
    });
    let product_count = state.product_count;

    let mut app = api::router(state);
    if let Some(dir) = &args.assets {
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(CorsLayer::permissive());

    let bind = args.bind.unwrap_or(config.server.bind);
    let addr: SocketAddr = match bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address {}: {}", bind, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Product filter v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Shop:     http://{}/shop", addr);
    tracing::info!("  Filter:   http://{}/api/filter", addr);
    tracing::info!("  Catalog:  {:?} ({} products)", args.catalog, product_count);
    tracing::info!("  Policy:   {}", policy);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}
