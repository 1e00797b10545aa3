//! # In-Memory Catalog
//!
//! Evaluates [`ProductQuery`] clauses against a product list loaded from a
//! TOML catalog file. Products are returned in file order.

use pf_core::query::CATEGORY_TAXONOMY;
use pf_core::{
    Category, Clause, MetaClause, MetaCompare, MetaKey, Product, ProductQuery, TaxonomyClause,
    Term, TermSelector,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use super::{CatalogEngine, CatalogError, TaxonomyProvider};

/// On-disk catalog layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Declared attribute terms keyed by taxonomy (`pa_color`, `pa_size`).
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<Term>>,
    #[serde(default)]
    pub products: Vec<Product>,
}

pub struct MemoryCatalog {
    products: Vec<Product>,
    categories: Vec<Category>,
    terms: BTreeMap<String, Vec<Term>>,
}

impl MemoryCatalog {
    pub fn new(file: CatalogFile) -> Self {
        let mut terms = file.attributes;
        // Slugs used by products but never declared get their slug as name.
        for product in &file.products {
            for (taxonomy, slugs) in &product.attributes {
                let declared = terms.entry(taxonomy.clone()).or_default();
                for slug in slugs {
                    if !declared.iter().any(|t| &t.slug == slug) {
                        declared.push(Term {
                            slug: slug.clone(),
                            name: slug.clone(),
                        });
                    }
                }
            }
        }

        Self {
            products: file.products,
            categories: file.categories,
            terms,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::Load(e.to_string()))?;
        Ok(Self::new(file))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Synchronous form of [`CatalogEngine::find`].
    pub fn select(&self, query: &ProductQuery) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| self.evaluate_clauses(p, query.clauses()))
            .cloned()
            .collect()
    }

    fn evaluate_clauses(&self, product: &Product, clauses: &[Clause]) -> bool {
        clauses.iter().all(|clause| match clause {
            Clause::Taxonomy(t) => self.evaluate_taxonomy(product, t),
            Clause::Meta(m) => evaluate_meta(product, m),
        })
    }

    fn evaluate_taxonomy(&self, product: &Product, clause: &TaxonomyClause) -> bool {
        if clause.taxonomy == CATEGORY_TAXONOMY {
            let ids: Vec<u64> = match &clause.terms {
                TermSelector::Id(ids) => ids.clone(),
                TermSelector::Slug(slugs) => self
                    .categories
                    .iter()
                    .filter(|c| slugs.contains(&c.slug))
                    .map(|c| c.id)
                    .collect(),
            };
            let wanted = if clause.include_children {
                self.with_descendants(&ids)
            } else {
                ids.into_iter().collect()
            };
            return product.categories.iter().any(|c| wanted.contains(c));
        }

        match &clause.terms {
            TermSelector::Slug(slugs) => slugs
                .iter()
                .any(|slug| product.has_term(&clause.taxonomy, slug)),
            // Attribute terms are addressed by slug only.
            TermSelector::Id(_) => false,
        }
    }

    /// `roots` plus every category below them.
    fn with_descendants(&self, roots: &[u64]) -> HashSet<u64> {
        let mut found: HashSet<u64> = roots.iter().copied().collect();
        let mut frontier: Vec<u64> = roots.to_vec();
        while let Some(parent) = frontier.pop() {
            for child in self.categories.iter().filter(|c| c.parent == Some(parent)) {
                if found.insert(child.id) {
                    frontier.push(child.id);
                }
            }
        }
        found
    }

    fn used_category_ids(&self) -> HashSet<u64> {
        let direct: Vec<u64> = self
            .products
            .iter()
            .flat_map(|p| p.categories.iter().copied())
            .collect();
        // A parent counts as used when any descendant is.
        let mut used = HashSet::new();
        for id in direct {
            let mut current = Some(id);
            while let Some(cid) = current {
                if !used.insert(cid) {
                    break;
                }
                current = self
                    .categories
                    .iter()
                    .find(|c| c.id == cid)
                    .and_then(|c| c.parent);
            }
        }
        used
    }
}

#[async_trait::async_trait]
impl CatalogEngine for MemoryCatalog {
    async fn find(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        Ok(self.select(query))
    }
}

impl TaxonomyProvider for MemoryCatalog {
    fn categories(&self) -> Vec<Category> {
        let used = self.used_category_ids();
        self.categories
            .iter()
            .filter(|c| used.contains(&c.id))
            .cloned()
            .collect()
    }

    fn terms(&self, taxonomy: &str) -> Vec<Term> {
        self.terms
            .get(taxonomy)
            .map(|terms| {
                terms
                    .iter()
                    .filter(|t| self.products.iter().any(|p| p.has_term(taxonomy, &t.slug)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn brands(&self) -> Vec<String> {
        let brands: BTreeSet<&str> = self
            .products
            .iter()
            .filter_map(|p| p.brand.as_deref())
            .collect();
        brands.into_iter().map(ToString::to_string).collect()
    }

    fn category_exists(&self, id: u64) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    fn term_exists(&self, taxonomy: &str, slug: &str) -> bool {
        self.terms
            .get(taxonomy)
            .is_some_and(|terms| terms.iter().any(|t| t.slug == slug))
    }
}

/// A product field as seen by a meta clause.
enum FieldValue<'a> {
    Number(f64),
    Text(Option<&'a str>),
}

fn extract_field<'a>(product: &'a Product, key: MetaKey) -> FieldValue<'a> {
    match key {
        MetaKey::Price => FieldValue::Number(product.price),
        MetaKey::Brand => FieldValue::Text(product.brand.as_deref()),
        MetaKey::StockStatus => FieldValue::Text(Some(product.stock_status.as_str())),
    }
}

fn evaluate_meta(product: &Product, clause: &MetaClause) -> bool {
    compare(&extract_field(product, clause.key), &clause.compare)
}

fn compare(value: &FieldValue<'_>, op: &MetaCompare) -> bool {
    match (value, op) {
        (FieldValue::Number(n), MetaCompare::Gte(v)) => n >= v,
        (FieldValue::Number(n), MetaCompare::Lte(v)) => n <= v,
        (FieldValue::Number(n), MetaCompare::Between { min, max }) => min <= n && n <= max,
        (FieldValue::Text(Some(text)), MetaCompare::Like(needle)) => {
            text.to_lowercase().contains(&needle.to_lowercase())
        }
        (FieldValue::Text(Some(text)), MetaCompare::Eq(expected)) => text == expected,
        (FieldValue::Number(n), MetaCompare::Eq(expected)) => expected
            .parse::<f64>()
            .map_or(false, |e| (n - e).abs() < f64::EPSILON),
        // Missing fields never match; numeric comparisons on text never match.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use pf_core::{query, Availability, Criteria};

    fn ids(catalog: &MemoryCatalog, criteria: &Criteria) -> Vec<u64> {
        catalog
            .select(&query::build(criteria))
            .iter()
            .map(|p| p.id)
            .collect()
    }

    #[test]
    fn test_unfiltered_returns_everything_in_order() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(&catalog, &Criteria::default()),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
        );
    }

    #[test]
    fn test_category_includes_children() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(&catalog, &Criteria::builder().category(5).build()),
            vec![1, 2, 3, 4, 6, 7, 9, 10]
        );
        assert_eq!(
            ids(&catalog, &Criteria::builder().category(6).build()),
            vec![1, 4, 6, 9]
        );
    }

    #[test]
    fn test_between_is_inclusive() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(&catalog, &Criteria::builder().price_range(10.0, 50.0).build()),
            vec![1, 2, 4, 6, 7, 8, 10]
        );
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let catalog = sample_catalog();
        assert!(ids(&catalog, &Criteria::builder().price_range(50.0, 10.0).build()).is_empty());
    }

    #[test]
    fn test_color_is_exact() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(&catalog, &Criteria::builder().color("red").build()),
            vec![1, 5, 10]
        );
        assert_eq!(
            ids(&catalog, &Criteria::builder().color("red-2").build()),
            vec![6]
        );
    }

    #[test]
    fn test_brand_is_partial_and_case_insensitive() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(&catalog, &Criteria::builder().brand("Brand").build()),
            vec![1, 2, 3, 6, 9, 10]
        );
        assert_eq!(
            ids(&catalog, &Criteria::builder().brand("brand one").build()),
            vec![1, 3, 9]
        );
    }

    #[test]
    fn test_stock_status() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(
                &catalog,
                &Criteria::builder().availability(Availability::OutOfStock).build()
            ),
            vec![4, 10]
        );
        // Backorder is neither in stock nor out of stock.
        assert!(!ids(
            &catalog,
            &Criteria::builder().availability(Availability::InStock).build()
        )
        .contains(&8));
    }

    #[test]
    fn test_taxonomy_listings_hide_unused_values() {
        let catalog = sample_catalog();
        let categories: Vec<u64> = catalog.categories().iter().map(|c| c.id).collect();
        assert_eq!(categories, vec![5, 6, 7]);

        let colors: Vec<String> = catalog.terms("pa_color").into_iter().map(|t| t.slug).collect();
        assert!(colors.contains(&"red-2".to_string()));
        assert!(colors.contains(&"brown".to_string()));
        assert!(!colors.contains(&"purple".to_string()));

        assert_eq!(
            catalog.brands(),
            vec!["Acme", "Brand One", "Brand Three", "Brand Two", "Fleet"]
        );
    }

    #[test]
    fn test_reference_lookups() {
        let catalog = sample_catalog();
        assert!(catalog.category_exists(8));
        assert!(!catalog.category_exists(99));
        assert!(catalog.term_exists("pa_color", "purple"));
        assert!(catalog.term_exists("pa_size", "xl"));
        assert!(!catalog.term_exists("pa_size", "xxl"));
    }

    #[test]
    fn test_bad_catalog_is_a_load_error() {
        let err = MemoryCatalog::from_toml_str("[[products]]\nid = \"one\"").err();
        assert!(matches!(err, Some(CatalogError::Load(_))));
    }

    #[test]
    fn test_missing_catalog_is_unavailable() {
        let err = MemoryCatalog::load(Path::new("/nonexistent/catalog.toml")).err();
        assert!(matches!(err, Some(CatalogError::Unavailable(_))));
    }
}
