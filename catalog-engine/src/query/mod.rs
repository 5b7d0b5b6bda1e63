//! Query building
//!
//! Typed filters, sorts, projections and page requests, and the compiler that
//! assembles them into an aggregation [`Pipeline`].

pub mod compiler;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod pipeline;
pub mod request;
pub mod select;
pub mod sort;

pub use compiler::QueryCompiler;
pub use error::QueryError;
pub use filter::{Filter, FilterCondition, FilterOperator, FilterValue};
pub use pagination::PageRequest;
pub use pipeline::{FacetBranch, PageReshape, Pipeline, Stage, COUNT_FIELD, DATA_FIELD, TOTAL_BRANCH};
pub use request::ListRequest;
pub use select::{ProjectionMode, SelectField, SelectSpec};
pub use sort::{OrderDirection, SortKey, SortSpec};
