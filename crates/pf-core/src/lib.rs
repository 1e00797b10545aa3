//! # pf-core — filter-to-query translation
//!
//! Turns loosely-typed shopper input into a [`Criteria`] and a [`Criteria`]
//! into the conjunctive [`ProductQuery`] a catalog engine executes.
//!
//! - [`parser`] — raw form / query-string fields → [`Criteria`].
//! - [`query`] — [`Criteria`] → [`ProductQuery`] (taxonomy + meta clauses).
//! - [`product`] — the catalog records the engine hands back.

pub mod criteria;
pub mod parser;
pub mod product;
pub mod query;

pub use criteria::{Availability, Criteria, CriteriaBuilder};
pub use parser::{CriteriaParser, FieldError, NumericPolicy, ParseError};
pub use product::{Category, Product, StockStatus, Term};
pub use query::{Clause, MetaClause, MetaCompare, MetaKey, ProductQuery, TaxonomyClause, TermSelector};
