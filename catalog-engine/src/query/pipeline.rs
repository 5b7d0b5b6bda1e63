//! Aggregation pipeline stages
//!
//! A [`Pipeline`] is an ordered list of typed [`Stage`]s. Backends evaluate the
//! typed form directly or forward [`Pipeline::to_json`], which renders the
//! canonical MongoDB aggregation syntax.

use serde_json::{json, Map, Value};

use super::filter::Filter;
use super::select::SelectSpec;
use super::sort::SortSpec;

/// Output field holding the page of documents in a paginated result
pub const DATA_FIELD: &str = "data";

/// Output field holding the total count in a paginated result
pub const COUNT_FIELD: &str = "count";

/// Facet branch name holding the count sub-result
pub const TOTAL_BRANCH: &str = "total";

/// A named sub-pipeline inside a facet stage
#[derive(Debug, Clone, PartialEq)]
pub struct FacetBranch {
    /// Output field for this branch
    pub name: String,
    /// Stages run against the facet input
    pub stages: Vec<Stage>,
}

impl FacetBranch {
    /// Create a branch
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }
}

/// Final projection turning facet output into `{ data, count }`
///
/// `count` falls back to `0` when the count branch produced nothing, which is
/// what a count stage yields on zero input documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReshape {
    /// Facet branch holding the page
    pub data_branch: String,
    /// Facet branch holding the count document
    pub total_branch: String,
    /// Field inside the count document
    pub count_field: String,
}

impl Default for PageReshape {
    fn default() -> Self {
        Self {
            data_branch: DATA_FIELD.to_string(),
            total_branch: TOTAL_BRANCH.to_string(),
            count_field: COUNT_FIELD.to_string(),
        }
    }
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents matching the filter
    Match(Filter),
    /// Order documents
    Sort(SortSpec),
    /// Keep or drop fields
    Project(SelectSpec),
    /// Drop the first n documents
    Skip(u64),
    /// Keep at most n documents
    Limit(u64),
    /// Replace the input by one `{ field: n }` document (none when n is 0)
    Count(String),
    /// Run independent branches over the same input
    Facet(Vec<FacetBranch>),
    /// Reshape facet output into `{ data, count }`
    PageReshape(PageReshape),
}

impl Stage {
    /// Stage name in aggregation syntax
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Match(_) => "$match",
            Self::Sort(_) => "$sort",
            Self::Project(_) | Self::PageReshape(_) => "$project",
            Self::Skip(_) => "$skip",
            Self::Limit(_) => "$limit",
            Self::Count(_) => "$count",
            Self::Facet(_) => "$facet",
        }
    }

    /// Render as aggregation syntax
    #[must_use]
    pub fn to_json(&self) -> Value {
        let body = match self {
            Self::Match(filter) => filter.to_json(),
            Self::Sort(sort) => sort.to_json(),
            Self::Project(select) => select.to_json(),
            Self::Skip(n) | Self::Limit(n) => Value::from(*n),
            Self::Count(field) => Value::String(field.clone()),
            Self::Facet(branches) => {
                let mut map = Map::new();
                for branch in branches {
                    let stages = branch.stages.iter().map(Stage::to_json).collect();
                    map.insert(branch.name.clone(), Value::Array(stages));
                }
                Value::Object(map)
            }
            Self::PageReshape(reshape) => json!({
                "data": format!("${}", reshape.data_branch),
                "count": {
                    "$ifNull": [
                        { "$arrayElemAt": [format!("${}.{}", reshape.total_branch, reshape.count_field), 0] },
                        0
                    ]
                }
            }),
        };

        let mut stage = Map::new();
        stage.insert(self.name().to_string(), body);
        Value::Object(stage)
    }
}

/// Ordered list of stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// An empty pipeline
    #[must_use]
    pub const fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage
    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Append a stage, builder style
    #[must_use]
    pub fn with(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// The stages, in execution order
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether the pipeline ends in a page reshape
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        matches!(self.stages.last(), Some(Stage::PageReshape(_)))
    }

    /// Render as an aggregation array
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_json).collect())
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterCondition;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Skip(1).name(), "$skip");
        assert_eq!(Stage::Count("count".into()).name(), "$count");
        assert_eq!(Stage::PageReshape(PageReshape::default()).name(), "$project");
    }

    #[test]
    fn test_page_reshape_json() {
        let stage = Stage::PageReshape(PageReshape::default());
        assert_eq!(
            stage.to_json(),
            json!({
                "$project": {
                    "data": "$data",
                    "count": { "$ifNull": [ { "$arrayElemAt": ["$total.count", 0] }, 0 ] }
                }
            })
        );
    }

    #[test]
    fn test_facet_json() {
        let stage = Stage::Facet(vec![
            FacetBranch::new("total", vec![Stage::Count("count".into())]),
            FacetBranch::new("data", vec![Stage::Skip(0), Stage::Limit(2)]),
        ]);
        assert_eq!(
            stage.to_json(),
            json!({
                "$facet": {
                    "total": [ { "$count": "count" } ],
                    "data": [ { "$skip": 0 }, { "$limit": 2 } ]
                }
            })
        );
    }

    #[test]
    fn test_pipeline_is_paginated() {
        let flat = Pipeline::new()
            .with(Stage::Match(Filter::new().and(FilterCondition::eq("a", 1_i64))))
            .with(Stage::Project(SelectSpec::new().include("name")));
        assert!(!flat.is_paginated());
        assert_eq!(flat.len(), 2);

        let paged = flat.with(Stage::PageReshape(PageReshape::default()));
        assert!(paged.is_paginated());
    }
}
