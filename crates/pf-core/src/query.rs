//! # Catalog Query Builder
//!
//! Translates a [`Criteria`] into a [`ProductQuery`]: an AND-combined list of
//! clauses in two families.
//!
//! - taxonomy clauses: term membership (`product_cat`, `pa_color`, `pa_size`)
//! - meta clauses: comparisons on product fields (`_price`, `brand`,
//!   `_stock_status`)
//!
//! Clauses are emitted in dimension order: category, price, color, size,
//! brand, availability.

use serde::Serialize;

use crate::criteria::Criteria;

pub const CATEGORY_TAXONOMY: &str = "product_cat";
pub const COLOR_TAXONOMY: &str = "pa_color";
pub const SIZE_TAXONOMY: &str = "pa_size";

/// Which terms a taxonomy clause selects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", content = "terms", rename_all = "snake_case")]
pub enum TermSelector {
    Id(Vec<u64>),
    Slug(Vec<String>),
}

/// The product carries at least one of the selected terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyClause {
    pub taxonomy: String,
    #[serde(flatten)]
    pub terms: TermSelector,
    /// Also match products assigned to descendant terms.
    pub include_children: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetaKey {
    #[serde(rename = "_price")]
    Price,
    #[serde(rename = "brand")]
    Brand,
    #[serde(rename = "_stock_status")]
    StockStatus,
}

impl MetaKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "_price",
            Self::Brand => "brand",
            Self::StockStatus => "_stock_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "compare", content = "value")]
pub enum MetaCompare {
    #[serde(rename = ">=")]
    Gte(f64),
    #[serde(rename = "<=")]
    Lte(f64),
    /// Inclusive on both ends. Bounds are kept as given, so `min > max`
    /// selects nothing.
    #[serde(rename = "BETWEEN")]
    Between { min: f64, max: f64 },
    /// Case-insensitive substring match.
    #[serde(rename = "LIKE")]
    Like(String),
    #[serde(rename = "=")]
    Eq(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaClause {
    pub key: MetaKey,
    #[serde(flatten)]
    pub compare: MetaCompare,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Clause {
    Taxonomy(TaxonomyClause),
    Meta(MetaClause),
}

/// A conjunctive product query. No clauses means the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductQuery {
    clauses: Vec<Clause>,
}

impl ProductQuery {
    /// The unfiltered query.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// All clauses in insertion order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn taxonomy_clauses(&self) -> impl Iterator<Item = &TaxonomyClause> {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Taxonomy(t) => Some(t),
            Clause::Meta(_) => None,
        })
    }

    pub fn meta_clauses(&self) -> impl Iterator<Item = &MetaClause> {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Meta(m) => Some(m),
            Clause::Taxonomy(_) => None,
        })
    }

    fn push_taxonomy(&mut self, taxonomy: &str, terms: TermSelector, include_children: bool) {
        self.clauses.push(Clause::Taxonomy(TaxonomyClause {
            taxonomy: taxonomy.to_string(),
            terms,
            include_children,
        }));
    }

    fn push_meta(&mut self, key: MetaKey, compare: MetaCompare) {
        self.clauses.push(Clause::Meta(MetaClause { key, compare }));
    }
}

/// Build the catalog query for `criteria`.
pub fn build(criteria: &Criteria) -> ProductQuery {
    let mut query = ProductQuery::all();

    if let Some(id) = criteria.category_id() {
        query.push_taxonomy(CATEGORY_TAXONOMY, TermSelector::Id(vec![id]), true);
    }

    let price = match (criteria.min_price(), criteria.max_price()) {
        (Some(min), Some(max)) => Some(MetaCompare::Between { min, max }),
        (Some(min), None) => Some(MetaCompare::Gte(min)),
        (None, Some(max)) => Some(MetaCompare::Lte(max)),
        (None, None) => None,
    };
    if let Some(compare) = price {
        query.push_meta(MetaKey::Price, compare);
    }

    if let Some(color) = criteria.color_slug() {
        query.push_taxonomy(
            COLOR_TAXONOMY,
            TermSelector::Slug(vec![color.to_string()]),
            false,
        );
    }

    if let Some(size) = criteria.size_slug() {
        query.push_taxonomy(
            SIZE_TAXONOMY,
            TermSelector::Slug(vec![size.to_string()]),
            false,
        );
    }

    if let Some(brand) = criteria.brand() {
        query.push_meta(MetaKey::Brand, MetaCompare::Like(brand.to_string()));
    }

    if let Some(status) = criteria.availability().stock_status() {
        query.push_meta(
            MetaKey::StockStatus,
            MetaCompare::Eq(status.as_str().to_string()),
        );
    }

    query
}
