//! List query compilation
//!
//! [`QueryCompiler`] turns filter, search, sort, select and pagination into a
//! single aggregation [`Pipeline`]. Stages always come in the same order:
//!
//! 1. `$match` (omitted when there is nothing to match)
//! 2. `$sort` (always present, falls back to the entity default)
//! 3. either a `$project`, or a `$facet` with `total`/`data` branches followed
//!    by a reshape into `{ data, count }`
//!
//! # Example
//!
//! ```rust
//! use catalog_engine::entity::EntityConfig;
//! use catalog_engine::query::{Filter, PageRequest, QueryCompiler};
//!
//! let compiler = QueryCompiler::new(&EntityConfig::orientation());
//! let pipeline = compiler
//!     .compile(&Filter::new(), Some("land"), None, None, PageRequest::new(10, 0))
//!     .unwrap();
//!
//! assert!(pipeline.is_paginated());
//! assert_eq!(pipeline.len(), 4);
//! ```

use super::error::QueryError;
use super::filter::{Filter, FilterCondition};
use super::pagination::PageRequest;
use super::pipeline::{FacetBranch, PageReshape, Pipeline, Stage, COUNT_FIELD, DATA_FIELD, TOTAL_BRANCH};
use super::request::ListRequest;
use super::select::SelectSpec;
use super::sort::SortSpec;
use crate::entity::EntityConfig;

/// Compiles list requests for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCompiler {
    search_field: String,
    default_sort: SortSpec,
    default_select: SelectSpec,
}

impl QueryCompiler {
    /// Resolve the entity defaults once
    #[must_use]
    pub fn new(entity: &EntityConfig) -> Self {
        Self {
            search_field: entity.search_field.clone(),
            default_sort: entity.default_sort.clone(),
            default_select: entity.default_select.clone(),
        }
    }

    /// Field matched by free-text search
    #[must_use]
    pub fn search_field(&self) -> &str {
        &self.search_field
    }

    /// Compile a typed list request
    pub fn compile_request(&self, request: &ListRequest) -> Result<Pipeline, QueryError> {
        self.compile(
            &request.filter,
            request.search.as_deref(),
            request.sort.as_ref(),
            request.select.as_ref(),
            request.pagination,
        )
    }

    /// Compile into an aggregation pipeline
    ///
    /// Fails with [`QueryError::ProjectionMismatch`] when the effective
    /// projection mixes inclusion and exclusion.
    pub fn compile(
        &self,
        filter: &Filter,
        search: Option<&str>,
        sort: Option<&SortSpec>,
        select: Option<&SelectSpec>,
        pagination: Option<PageRequest>,
    ) -> Result<Pipeline, QueryError> {
        let mut pipeline = Pipeline::new();

        let mut matcher = filter.clone();
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            matcher.push(FilterCondition::contains(self.search_field.as_str(), term));
        }
        if !matcher.is_empty() {
            pipeline.push(Stage::Match(matcher));
        }

        let sort = match sort {
            Some(sort) if !sort.is_empty() => sort.clone(),
            _ => self.default_sort.clone(),
        };
        pipeline.push(Stage::Sort(sort));

        let select = select.filter(|s| !s.is_empty());

        match pagination {
            None => {
                let projection = select.unwrap_or(&self.default_select);
                if !projection.is_empty() {
                    Self::check_projection(projection)?;
                    pipeline.push(Stage::Project(projection.clone()));
                }
            }
            Some(page) => {
                let mut data = vec![Stage::Skip(page.skip()), Stage::Limit(page.limit())];
                if let Some(projection) = select {
                    Self::check_projection(projection)?;
                    data.push(Stage::Project(projection.clone()));
                }
                pipeline.push(Stage::Facet(vec![
                    FacetBranch::new(TOTAL_BRANCH, vec![Stage::Count(COUNT_FIELD.to_string())]),
                    FacetBranch::new(DATA_FIELD, data),
                ]));
                pipeline.push(Stage::PageReshape(PageReshape::default()));
            }
        }

        Ok(pipeline)
    }

    fn check_projection(select: &SelectSpec) -> Result<(), QueryError> {
        select
            .mode()
            .map(|_| ())
            .ok_or(QueryError::ProjectionMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OrderDirection;
    use serde_json::json;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(&EntityConfig::orientation())
    }

    #[test]
    fn test_flat_defaults() {
        let pipeline = compiler()
            .compile(&Filter::new(), None, None, None, None)
            .unwrap();
        assert_eq!(
            pipeline.to_json(),
            json!([
                { "$sort": { "createdAt": -1 } },
                { "$project": { "name": 1 } }
            ])
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let pipeline = compiler()
            .compile(&Filter::new(), Some("   "), None, None, None)
            .unwrap();
        assert!(!matches!(pipeline.stages()[0], Stage::Match(_)));
    }

    #[test]
    fn test_search_joins_filter() {
        let filter = Filter::new().and(FilterCondition::eq("visibility", true));
        let pipeline = compiler()
            .compile(&filter, Some(" Land "), None, None, None)
            .unwrap();
        assert_eq!(
            pipeline.stages()[0].to_json(),
            json!({
                "$match": {
                    "visibility": true,
                    "name": { "$regex": "Land", "$options": "i" }
                }
            })
        );
    }

    #[test]
    fn test_paginated_shape() {
        let sort = SortSpec::new().then("name", OrderDirection::Ascending);
        let pipeline = compiler()
            .compile(&Filter::new(), None, Some(&sort), None, PageRequest::new(2, 1))
            .unwrap();
        assert_eq!(
            pipeline.to_json(),
            json!([
                { "$sort": { "name": 1 } },
                { "$facet": {
                    "total": [ { "$count": "count" } ],
                    "data": [ { "$skip": 2 }, { "$limit": 2 } ]
                } },
                { "$project": {
                    "data": "$data",
                    "count": { "$ifNull": [ { "$arrayElemAt": ["$total.count", 0] }, 0 ] }
                } }
            ])
        );
    }

    #[test]
    fn test_paginated_with_select_projects_inside_data() {
        let select = SelectSpec::new().include("slug");
        let pipeline = compiler()
            .compile(&Filter::new(), None, None, Some(&select), PageRequest::new(5, 0))
            .unwrap();
        let Stage::Facet(branches) = &pipeline.stages()[1] else {
            panic!("expected facet stage");
        };
        assert_eq!(branches[1].name, "data");
        assert_eq!(branches[1].stages.last(), Some(&Stage::Project(select)));
    }

    #[test]
    fn test_empty_sort_uses_default() {
        let pipeline = compiler()
            .compile(&Filter::new(), None, Some(&SortSpec::new()), None, None)
            .unwrap();
        assert_eq!(
            pipeline.stages()[0],
            Stage::Sort(SortSpec::descending("createdAt"))
        );
    }

    #[test]
    fn test_projection_mismatch() {
        let select = SelectSpec::new().include("name").exclude("slug");
        let flat = compiler().compile(&Filter::new(), None, None, Some(&select), None);
        assert_eq!(flat, Err(QueryError::ProjectionMismatch));

        let paged =
            compiler().compile(&Filter::new(), None, None, Some(&select), PageRequest::new(1, 0));
        assert_eq!(paged, Err(QueryError::ProjectionMismatch));
    }

    #[test]
    fn test_compile_request() {
        let request = ListRequest::new()
            .search("x")
            .paginate(PageRequest::new(3, 0).unwrap());
        let pipeline = compiler().compile_request(&request).unwrap();
        assert!(pipeline.is_paginated());
        assert!(matches!(pipeline.stages()[0], Stage::Match(_)));
    }
}
