//! In-process evaluation of filters, projections and pipeline stages

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::document::{compare_values, get_path, values_equal, Document, ID_FIELD};
use super::error::StoreError;
use super::traits::StoreResult;
use crate::query::{
    FacetBranch, Filter, FilterCondition, FilterOperator, FilterValue, PageReshape, Pipeline,
    ProjectionMode, SelectSpec, SortSpec, Stage, COUNT_FIELD, DATA_FIELD,
};

/// Whether a document satisfies every condition of the filter
#[must_use]
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|condition| condition_matches(doc, condition))
}

fn condition_matches(doc: &Document, condition: &FilterCondition) -> bool {
    let actual = get_path(doc, &condition.field);
    match condition.operator {
        FilterOperator::Equal => equals(actual, &condition.value),
        FilterOperator::NotEqual => !equals(actual, &condition.value),
        FilterOperator::GreaterThan => compares(actual, &condition.value, |o| o == Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => {
            compares(actual, &condition.value, |o| o != Ordering::Less)
        }
        FilterOperator::LessThan => compares(actual, &condition.value, |o| o == Ordering::Less),
        FilterOperator::LessThanOrEqual => {
            compares(actual, &condition.value, |o| o != Ordering::Greater)
        }
        FilterOperator::In => {
            let candidates = match condition.value.to_json() {
                Value::Array(items) => items,
                other => vec![other],
            };
            any_element(actual, |v| candidates.iter().any(|c| values_equal(v, c)))
        }
        FilterOperator::Contains => match &condition.value {
            FilterValue::String(term) => {
                let needle = term.to_lowercase();
                any_element(actual, |v| {
                    v.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            }
            _ => false,
        },
    }
}

/// Apply `test` to the value, or to each element when the value is an array
fn any_element(actual: Option<&Value>, test: impl Fn(&Value) -> bool) -> bool {
    match actual {
        None => false,
        Some(Value::Array(items)) => items.iter().any(|item| test(item)),
        Some(value) => test(value),
    }
}

fn equals(actual: Option<&Value>, expected: &FilterValue) -> bool {
    let expected = expected.to_json();
    if expected.is_null() {
        return actual.map_or(true, Value::is_null);
    }
    if actual.is_some_and(|v| values_equal(v, &expected)) {
        return true;
    }
    any_element(actual, |v| values_equal(v, &expected))
}

fn same_bracket(left: &Value, right: &Value) -> bool {
    matches!(
        (left, right),
        (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Bool(_), Value::Bool(_))
    )
}

fn compares(actual: Option<&Value>, expected: &FilterValue, accept: impl Fn(Ordering) -> bool) -> bool {
    let expected = expected.to_json();
    any_element(actual, |v| {
        same_bracket(v, &expected) && accept(compare_values(Some(v), Some(&expected)))
    })
}

/// Apply a projection to one document
///
/// Inclusion keeps `_id` unless it is explicitly excluded. Fields keep their
/// stored order.
pub fn project(doc: &Document, select: &SelectSpec) -> StoreResult<Document> {
    if select.is_empty() {
        return Ok(doc.clone());
    }
    let mode = select
        .mode()
        .ok_or_else(|| StoreError::invalid_pipeline("Projection Mismatch"))?;

    let flag = |field: &str| {
        select
            .fields()
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.include)
    };

    let projected = doc
        .iter()
        .filter(|(key, _)| match mode {
            ProjectionMode::Include => match flag(key) {
                Some(include) => include,
                None => key.as_str() == ID_FIELD,
            },
            ProjectionMode::Exclude => flag(key) != Some(false),
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok(projected)
}

/// Stable sort by every key in order
pub fn sort_documents(docs: &mut [Document], sort: &SortSpec) {
    docs.sort_by(|a, b| {
        for key in sort.keys() {
            let ord = compare_values(get_path(a, &key.field), get_path(b, &key.field));
            let ord = match key.direction {
                crate::query::OrderDirection::Ascending => ord,
                crate::query::OrderDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Run a whole pipeline
pub fn run_pipeline(docs: Vec<Document>, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
    run_stages(docs, pipeline.stages())
}

fn run_stages(mut docs: Vec<Document>, stages: &[Stage]) -> StoreResult<Vec<Document>> {
    for stage in stages {
        docs = run_stage(docs, stage)?;
    }
    Ok(docs)
}

fn run_stage(mut docs: Vec<Document>, stage: &Stage) -> StoreResult<Vec<Document>> {
    match stage {
        Stage::Match(filter) => {
            docs.retain(|doc| matches(doc, filter));
            Ok(docs)
        }
        Stage::Sort(sort) => {
            sort_documents(&mut docs, sort);
            Ok(docs)
        }
        Stage::Project(select) => docs.iter().map(|doc| project(doc, select)).collect(),
        Stage::Skip(n) => Ok(docs.into_iter().skip(to_usize(*n)).collect()),
        Stage::Limit(n) => {
            if *n == 0 {
                return Err(StoreError::invalid_pipeline("the limit must be positive"));
            }
            docs.truncate(to_usize(*n));
            Ok(docs)
        }
        Stage::Count(field) => {
            if docs.is_empty() {
                return Ok(Vec::new());
            }
            let mut out = Map::new();
            out.insert(field.clone(), Value::from(docs.len() as u64));
            Ok(vec![out])
        }
        Stage::Facet(branches) => Ok(vec![run_facet(&docs, branches)?]),
        Stage::PageReshape(reshape) => docs.iter().map(|doc| reshape_page(doc, reshape)).collect(),
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn run_facet(docs: &[Document], branches: &[FacetBranch]) -> StoreResult<Document> {
    let mut out = Map::new();
    for branch in branches {
        let results = run_stages(docs.to_vec(), &branch.stages)?;
        out.insert(
            branch.name.clone(),
            Value::Array(results.into_iter().map(Value::Object).collect()),
        );
    }
    Ok(out)
}

fn reshape_page(doc: &Document, reshape: &PageReshape) -> StoreResult<Document> {
    let data = doc
        .get(&reshape.data_branch)
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::invalid_pipeline("page reshape expects facet output"))?;
    let total = doc
        .get(&reshape.total_branch)
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::invalid_pipeline("page reshape expects facet output"))?;

    let count = total
        .first()
        .and_then(|first| first.get(&reshape.count_field))
        .cloned()
        .unwrap_or_else(|| Value::from(0));

    let mut out = Map::new();
    out.insert(DATA_FIELD.to_string(), Value::Array(data.clone()));
    out.insert(COUNT_FIELD.to_string(), count);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterCondition, PageRequest, QueryCompiler};
    use crate::entity::EntityConfig;
    use crate::store::document;
    use crate::store::StoreErrorKind;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        vec![
            document(json!({ "_id": "a", "name": "Landscape", "rank": 3, "tags": ["x", "y"] })),
            document(json!({ "_id": "b", "name": "Portrait", "rank": 1, "visibility": false })),
            document(json!({ "_id": "c", "name": "landing", "rank": 2, "visibility": true })),
        ]
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(|d| d["_id"].as_str()).collect()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let filter = Filter::new().and(FilterCondition::contains("name", "LAND"));
        let out: Vec<_> = docs().into_iter().filter(|d| matches(d, &filter)).collect();
        assert_eq!(ids(&out), vec!["a", "c"]);
    }

    #[test]
    fn test_contains_is_literal() {
        let filter = Filter::new().and(FilterCondition::contains("name", "l.nd"));
        assert!(!docs().iter().any(|d| matches(d, &filter)));
    }

    #[test]
    fn test_comparisons_respect_type_brackets() {
        let filter = Filter::new().and(FilterCondition::gte("rank", 2_i64));
        let out: Vec<_> = docs().into_iter().filter(|d| matches(d, &filter)).collect();
        assert_eq!(ids(&out), vec!["a", "c"]);

        let strings = Filter::new().and(FilterCondition::gt("rank", "0"));
        assert!(!docs().iter().any(|d| matches(d, &strings)));
    }

    #[test]
    fn test_equality_matches_array_elements() {
        let filter = Filter::new().and(FilterCondition::eq("tags", "y"));
        let out: Vec<_> = docs().into_iter().filter(|d| matches(d, &filter)).collect();
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn test_null_equality_matches_missing() {
        let filter = Filter::new().and(FilterCondition::new(
            "visibility",
            FilterOperator::Equal,
            FilterValue::Null,
        ));
        let out: Vec<_> = docs().into_iter().filter(|d| matches(d, &filter)).collect();
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn test_in_and_not_equal() {
        let filter = Filter::new()
            .and(FilterCondition::in_strings("_id", vec!["a".into(), "b".into()]))
            .and(FilterCondition::ne("visibility", false));
        let out: Vec<_> = docs().into_iter().filter(|d| matches(d, &filter)).collect();
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn test_project_include_keeps_id() {
        let doc = &docs()[0];
        let out = project(doc, &SelectSpec::new().include("name")).unwrap();
        assert_eq!(Value::Object(out), json!({ "_id": "a", "name": "Landscape" }));

        let out = project(doc, &SelectSpec::new().include("name").exclude("_id")).unwrap();
        assert_eq!(Value::Object(out), json!({ "name": "Landscape" }));
    }

    #[test]
    fn test_project_exclude() {
        let doc = &docs()[1];
        let out = project(doc, &SelectSpec::new().exclude("rank").exclude("visibility")).unwrap();
        assert_eq!(Value::Object(out), json!({ "_id": "b", "name": "Portrait" }));
    }

    #[test]
    fn test_project_mismatch() {
        let err = project(&docs()[0], &SelectSpec::new().include("name").exclude("rank"))
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::InvalidPipeline);
    }

    #[test]
    fn test_sort_is_stable_and_null_first() {
        let mut all = docs();
        sort_documents(&mut all, &SortSpec::ascending("visibility"));
        assert_eq!(ids(&all), vec!["a", "b", "c"]);

        sort_documents(&mut all, &SortSpec::descending("rank"));
        assert_eq!(ids(&all), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_paginated_pipeline() {
        let compiler = QueryCompiler::new(&EntityConfig::orientation());
        let pipeline = compiler
            .compile(
                &Filter::new(),
                None,
                Some(&SortSpec::ascending("rank")),
                None,
                PageRequest::new(2, 1),
            )
            .unwrap();
        let out = run_pipeline(docs(), &pipeline).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["count"], json!(3));
        let page = out[0]["data"].as_array().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["_id"], json!("a"));
    }

    #[test]
    fn test_paginated_pipeline_on_empty_input() {
        let compiler = QueryCompiler::new(&EntityConfig::orientation());
        let pipeline = compiler
            .compile(&Filter::new(), None, None, None, PageRequest::new(5, 0))
            .unwrap();
        let out = run_pipeline(Vec::new(), &pipeline).unwrap();
        assert_eq!(Value::Object(out[0].clone()), json!({ "data": [], "count": 0 }));
    }

    #[test]
    fn test_reshape_without_facet_is_invalid() {
        let pipeline = Pipeline::new().with(Stage::PageReshape(PageReshape::default()));
        let err = run_pipeline(docs(), &pipeline).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::InvalidPipeline);
    }
}
