//! # Filter Criteria
//!
//! The typed form of one filter request. Every dimension is optional; an
//! absent dimension places no constraint on the result set.

use serde::{Deserialize, Serialize};

use crate::product::StockStatus;

/// Wire field names shared by the form, the query string and the filter call.
pub const CATEGORY: &str = "category";
pub const MIN_PRICE: &str = "min_price";
pub const MAX_PRICE: &str = "max_price";
pub const COLOR: &str = "pa_color";
pub const COLOR_ALIAS: &str = "color";
pub const SIZE: &str = "pa_size";
pub const SIZE_ALIAS: &str = "size";
pub const BRAND: &str = "brand";
pub const AVAILABILITY: &str = "availability";

/// Stock availability selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    All,
    InStock,
    OutOfStock,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
        }
    }

    /// Normalizes a raw form value. Anything outside the three known values
    /// becomes [`Availability::All`].
    pub fn from_param(raw: &str) -> Self {
        match raw.trim() {
            "in_stock" => Self::InStock,
            "out_of_stock" => Self::OutOfStock,
            _ => Self::All,
        }
    }

    /// The stock status a product must carry, or `None` for no constraint.
    pub fn stock_status(&self) -> Option<StockStatus> {
        match self {
            Self::All => None,
            Self::InStock => Some(StockStatus::InStock),
            Self::OutOfStock => Some(StockStatus::OutOfStock),
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One shopper's filter selection.
///
/// Built by [`crate::parser::CriteriaParser`] or [`CriteriaBuilder`]; read-only
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Criteria {
    category_id: Option<u64>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    color_slug: Option<String>,
    size_slug: Option<String>,
    brand: Option<String>,
    availability: Availability,
}

impl Criteria {
    pub fn builder() -> CriteriaBuilder {
        CriteriaBuilder::default()
    }

    pub fn category_id(&self) -> Option<u64> {
        self.category_id
    }

    pub fn min_price(&self) -> Option<f64> {
        self.min_price
    }

    pub fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    pub fn color_slug(&self) -> Option<&str> {
        self.color_slug.as_deref()
    }

    pub fn size_slug(&self) -> Option<&str> {
        self.size_slug.as_deref()
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// True when no dimension is constrained (the whole catalog matches).
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    /// Canonical wire fields for this selection, in dimension order.
    ///
    /// Unconstrained dimensions are omitted, so an unconstrained selection
    /// yields no fields at all. Feeding the result back through the parser
    /// reproduces the same criteria.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.category_id {
            params.push((CATEGORY, id.to_string()));
        }
        if let Some(min) = self.min_price {
            params.push((MIN_PRICE, min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push((MAX_PRICE, max.to_string()));
        }
        if let Some(color) = &self.color_slug {
            params.push((COLOR, color.clone()));
        }
        if let Some(size) = &self.size_slug {
            params.push((SIZE, size.clone()));
        }
        if let Some(brand) = &self.brand {
            params.push((BRAND, brand.clone()));
        }
        if self.availability != Availability::All {
            params.push((AVAILABILITY, self.availability.as_str().to_string()));
        }
        params
    }
}

/// Builder for [`Criteria`]. Values are taken as given; sanitizing raw input
/// is the parser's job.
#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    inner: Criteria,
}

impl CriteriaBuilder {
    pub fn category(mut self, id: u64) -> Self {
        self.inner.category_id = Some(id);
        self
    }

    pub fn min_price(mut self, price: f64) -> Self {
        self.inner.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: f64) -> Self {
        self.inner.max_price = Some(price);
        self
    }

    pub fn price_range(self, min: f64, max: f64) -> Self {
        self.min_price(min).max_price(max)
    }

    pub fn color(mut self, slug: impl Into<String>) -> Self {
        self.inner.color_slug = Some(slug.into());
        self
    }

    pub fn size(mut self, slug: impl Into<String>) -> Self {
        self.inner.size_slug = Some(slug.into());
        self
    }

    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.inner.brand = Some(brand.into());
        self
    }

    pub fn availability(mut self, availability: Availability) -> Self {
        self.inner.availability = availability;
        self
    }

    pub fn build(self) -> Criteria {
        self.inner
    }
}
