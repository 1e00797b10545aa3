//! # Catalog Engine
//!
//! The storage/query collaborator of the filter endpoint. Anything that can
//! answer a [`ProductQuery`] implements [`CatalogEngine`]; anything that knows
//! the valid categories and attribute terms implements [`TaxonomyProvider`].
//!
//! [`memory::MemoryCatalog`] implements both over a TOML catalog file.

pub mod memory;

use pf_core::{Category, Product, ProductQuery, Term};

/// Failure of the catalog engine. Fatal for the request that hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog source was read but could not be decoded.
    Load(String),
    /// The catalog source could not be reached or read.
    Unavailable(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(msg) => write!(f, "catalog load failed: {}", msg),
            Self::Unavailable(msg) => write!(f, "catalog unavailable: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Executes product queries. Read-only from the filter's point of view.
#[async_trait::async_trait]
pub trait CatalogEngine: Send + Sync {
    /// Every product matching `query`, in the engine's own order.
    async fn find(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError>;
}

/// Supplies the valid category / attribute / brand values.
///
/// Listings only contain values used by at least one product.
pub trait TaxonomyProvider: Send + Sync {
    fn categories(&self) -> Vec<Category>;

    fn terms(&self, taxonomy: &str) -> Vec<Term>;

    fn brands(&self) -> Vec<String>;

    fn category_exists(&self, id: u64) -> bool;

    fn term_exists(&self, taxonomy: &str, slug: &str) -> bool;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::memory::MemoryCatalog;

    /// Ten products over a small category tree (6 is a child of 5).
    pub const SAMPLE_CATALOG: &str = r#"
[[categories]]
id = 5
name = "Clothing"
slug = "clothing"

[[categories]]
id = 6
name = "T-Shirts"
slug = "t-shirts"
parent = 5

[[categories]]
id = 7
name = "Shoes"
slug = "shoes"

[[categories]]
id = 8
name = "Gift Cards"
slug = "gift-cards"

[[attributes.pa_color]]
slug = "red"
name = "Red"

[[attributes.pa_color]]
slug = "red-2"
name = "Crimson"

[[attributes.pa_color]]
slug = "purple"
name = "Purple"

[[products]]
id = 1
name = "Red Tee"
categories = [6]
price = 15.0
brand = "Brand One"
attributes = { pa_color = ["red"], pa_size = ["m"] }

[[products]]
id = 2
name = "Blue Jeans"
categories = [5]
price = 45.0
brand = "Brand Two"
attributes = { pa_color = ["blue"], pa_size = ["l"] }

[[products]]
id = 3
name = "Green Hoodie"
categories = [5]
price = 60.0
brand = "Brand One"
attributes = { pa_color = ["green"], pa_size = ["xl"] }

[[products]]
id = 4
name = "Black Tee"
categories = [6]
price = 10.0
brand = "Acme"
stock_status = "outofstock"
attributes = { pa_color = ["black"], pa_size = ["s"] }

[[products]]
id = 5
name = "Running Shoe"
categories = [7]
price = 80.0
brand = "Fleet"
attributes = { pa_color = ["red"], pa_size = ["42"] }

[[products]]
id = 6
name = "Crimson Tee"
categories = [6]
price = 25.0
brand = "Brand Three"
attributes = { pa_color = ["red-2"], pa_size = ["m"] }

[[products]]
id = 7
name = "Grey Cap"
categories = [5]
price = 50.0
attributes = { pa_color = ["grey"] }

[[products]]
id = 8
name = "Sandal"
categories = [7]
price = 30.0
brand = "Acme"
stock_status = "onbackorder"
attributes = { pa_color = ["brown"] }

[[products]]
id = 9
name = "White Tee"
categories = [6]
price = 9.5
brand = "Brand One"
attributes = { pa_color = ["white"], pa_size = ["m"] }

[[products]]
id = 10
name = "Wool Scarf"
categories = [5]
price = 20.0
brand = "Brand Two"
stock_status = "outofstock"
attributes = { pa_color = ["red"] }
"#;

    pub fn sample_catalog() -> MemoryCatalog {
        MemoryCatalog::from_toml_str(SAMPLE_CATALOG).unwrap()
    }
}
