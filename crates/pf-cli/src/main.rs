//! # pf — product filter client
//!
//! - `pf filter [--category ..] ..` — submit the filter form, print the
//!   results fragment and the shareable URL.
//! - `pf url ..` — print the shareable URL only.
//! - `pf reset` — submit the default form.
//! - `pf terms` — list categories, colors, sizes and brands.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tabled::{Table, Tabled};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pf_core::{Category, Term};

mod controller;

use controller::{Controller, FormState, HttpTransport, Outcome, ResultsView};

#[derive(Parser)]
#[command(name = "pf", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the catalog and print the matching products.
    Filter {
        #[command(flatten)]
        form: FormArgs,

        /// Give up on the request after this many seconds.
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },

    /// Print the shareable shop URL for a selection.
    Url {
        #[command(flatten)]
        form: FormArgs,
    },

    /// Clear every field and filter again.
    Reset {
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },

    /// List the filterable categories, attribute terms and brands.
    Terms,
}

#[derive(Args, Default)]
struct FormArgs {
    /// Category id (0 = all categories).
    #[arg(long)]
    category: Option<u64>,

    #[arg(long)]
    min_price: Option<String>,

    #[arg(long)]
    max_price: Option<String>,

    /// Color term slug.
    #[arg(long)]
    color: Option<String>,

    /// Size term slug.
    #[arg(long)]
    size: Option<String>,

    #[arg(long)]
    brand: Option<String>,

    /// all, in_stock or out_of_stock.
    #[arg(long)]
    availability: Option<String>,
}

impl From<FormArgs> for FormState {
    fn from(args: FormArgs) -> Self {
        let defaults = FormState::default();
        Self {
            category: args
                .category
                .map(|id| id.to_string())
                .unwrap_or(defaults.category),
            min_price: args.min_price.unwrap_or_default(),
            max_price: args.max_price.unwrap_or_default(),
            color: args.color.unwrap_or_default(),
            size: args.size.unwrap_or_default(),
            brand: args.brand.unwrap_or_default(),
            availability: args.availability.unwrap_or(defaults.availability),
        }
    }
}

#[derive(Deserialize)]
struct TaxonomyListing {
    categories: Vec<Category>,
    pa_color: Vec<Term>,
    pa_size: Vec<Term>,
    brands: Vec<String>,
}

#[derive(Tabled)]
struct TermRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Label")]
    label: String,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pf=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let base_url =
        std::env::var("PF_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    match cli.command {
        Commands::Url { form } => match FormState::from(form).shareable_url(&base_url) {
            Ok(url) => println!("{}", url),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        // Async Commands
        cmd => {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to build tokio runtime: {}", e);
                    std::process::exit(1);
                }
            };

            if !rt.block_on(async_main(cmd, base_url)) {
                std::process::exit(1);
            }
        }
    }
}

/// Returns `false` when the command failed.
async fn async_main(cmd: Commands, base_url: String) -> bool {
    let client = reqwest::Client::new();

    match cmd {
        Commands::Filter { form, timeout_secs } => {
            let controller = controller(&client, &base_url, timeout_secs);
            let outcome = controller.submit(form.into()).await;
            print_results(&controller, outcome).await
        }

        Commands::Reset { timeout_secs } => {
            let controller = controller(&client, &base_url, timeout_secs);
            let outcome = controller.reset().await;
            print_results(&controller, outcome).await
        }

        Commands::Terms => {
            let url = format!("{}/api/taxonomy", base_url);
            let listing = match get_request(&client, &url).await {
                Ok(resp) => resp.json::<TaxonomyListing>().await,
                Err(e) => Err(e),
            };
            match listing {
                Ok(listing) => {
                    println!("{}", Table::new(term_rows(listing)));
                    true
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    false
                }
            }
        }

        Commands::Url { .. } => true,
    }
}

fn controller(client: &reqwest::Client, base_url: &str, timeout_secs: u64) -> Controller {
    let transport = Arc::new(HttpTransport::new(client.clone(), base_url));
    Controller::new(transport, base_url).with_timeout(Duration::from_secs(timeout_secs))
}

async fn print_results(controller: &Controller, outcome: Outcome) -> bool {
    match (outcome, controller.view().await) {
        (Outcome::Applied { .. }, ResultsView::Loaded { body, .. }) => {
            println!("{}", body.trim_end());
            println!();
            println!("URL: {}", controller.location().await);
            true
        }
        (_, ResultsView::Failed { message, .. }) => {
            eprintln!("Error: {}", message);
            false
        }
        (outcome, view) => {
            eprintln!("Unexpected state: {:?} / {:?}", outcome, view);
            false
        }
    }
}

fn term_rows(listing: TaxonomyListing) -> Vec<TermRow> {
    let mut rows: Vec<TermRow> = listing
        .categories
        .into_iter()
        .map(|c| TermRow {
            field: pf_core::criteria::CATEGORY,
            value: c.id.to_string(),
            label: c.name,
        })
        .collect();
    for (field, terms) in [
        (pf_core::criteria::COLOR, listing.pa_color),
        (pf_core::criteria::SIZE, listing.pa_size),
    ] {
        rows.extend(terms.into_iter().map(|t| TermRow {
            field,
            value: t.slug,
            label: t.name,
        }));
    }
    rows.extend(listing.brands.into_iter().map(|b| TermRow {
        field: pf_core::criteria::BRAND,
        value: b.clone(),
        label: b,
    }));
    rows
}

async fn get_request(
    client: &reqwest::Client,
    url: &str,
) -> Result<reqwest::Response, reqwest::Error> {
    client.get(url).send().await?.error_for_status()
}
