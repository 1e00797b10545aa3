//! Catalog records returned by the catalog engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stock status as stored on a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    OnBackorder,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "instock",
            Self::OutOfStock => "outofstock",
            Self::OnBackorder => "onbackorder",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InStock => "In stock",
            Self::OutOfStock => "Out of stock",
            Self::OnBackorder => "On backorder",
        }
    }
}

/// A product category. Categories form a tree through `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent: Option<u64>,
}

/// An attribute term (one color, one size, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Categories the product is directly assigned to.
    #[serde(default)]
    pub categories: Vec<u64>,
    pub price: f64,
    /// Attribute term slugs keyed by attribute taxonomy (`pa_color`, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Product {
    /// Term slugs the product carries for `taxonomy`.
    pub fn terms(&self, taxonomy: &str) -> &[String] {
        self.attributes
            .get(taxonomy)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Exact slug membership.
    pub fn has_term(&self, taxonomy: &str, slug: &str) -> bool {
        self.terms(taxonomy).iter().any(|t| t == slug)
    }
}
