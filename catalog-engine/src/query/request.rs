//! List requests
//!
//! [`ListRequest`] is the typed input to a list operation. Callers holding a
//! loosely-typed JSON body use [`ListRequest::from_json`], which accepts only
//! the closed filter vocabulary and rejects everything else.
//!
//! ```rust
//! use catalog_engine::query::ListRequest;
//! use serde_json::json;
//!
//! let request = ListRequest::from_json(&json!({
//!     "filter": { "visibility": true, "rank": { "$gte": 2 } },
//!     "search": "land",
//!     "sort": { "name": "asc" },
//!     "pagination": { "pageSize": 2, "currentPage": 0 }
//! }))
//! .unwrap();
//! assert_eq!(request.filter.conditions().len(), 2);
//!
//! let rejected = ListRequest::from_json(&json!({ "filter": { "$where": "1" } }));
//! assert!(rejected.is_err());
//! ```

use serde_json::{Map, Value};

use super::error::QueryError;
use super::filter::{Filter, FilterCondition, FilterOperator, FilterValue};
use super::pagination::PageRequest;
use super::select::SelectSpec;
use super::sort::{OrderDirection, SortSpec};

/// Typed list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRequest {
    /// Conjunctive filter
    pub filter: Filter,
    /// Free-text search on the entity's search field
    pub search: Option<String>,
    /// Ordering; the entity default applies when absent
    pub sort: Option<SortSpec>,
    /// Projection
    pub select: Option<SelectSpec>,
    /// Page request; switches the result to `{ data, count }`
    pub pagination: Option<PageRequest>,
}

impl ListRequest {
    /// An empty request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the search term
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Set the sort
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the projection
    #[must_use]
    pub fn select(mut self, select: SelectSpec) -> Self {
        self.select = Some(select);
        self
    }

    /// Request a page
    #[must_use]
    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.pagination = Some(page);
        self
    }

    /// Whether a page was requested
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.pagination.is_some()
    }

    /// Parse the loose `{ filter, search, sort, select, pagination }` shape
    ///
    /// `null` means "absent" for every section and for the whole body.
    pub fn from_json(body: &Value) -> Result<Self, QueryError> {
        let body = match body {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(QueryError::invalid("$", "request must be an object")),
        };

        let mut request = Self::default();
        for (key, value) in body {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "filter" => request.filter = parse_filter(value)?,
                "search" => {
                    let term = value
                        .as_str()
                        .ok_or_else(|| QueryError::invalid("search", "expected a string"))?;
                    request.search = Some(term.to_string());
                }
                "sort" => request.sort = Some(parse_sort(value)?),
                "select" => request.select = Some(parse_select(value)?),
                "pagination" => request.pagination = Some(parse_pagination(value)?),
                other => return Err(QueryError::invalid(other, "unknown request section")),
            }
        }
        Ok(request)
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, QueryError> {
    value
        .as_object()
        .ok_or_else(|| QueryError::invalid(path, "expected an object"))
}

fn check_field_name(path: &str, field: &str) -> Result<(), QueryError> {
    if field.is_empty() || field.starts_with('$') {
        return Err(QueryError::invalid(
            format!("{}.{}", path, field),
            "field names must be non-empty and must not start with '$'",
        ));
    }
    Ok(())
}

fn parse_filter(value: &Value) -> Result<Filter, QueryError> {
    let mut filter = Filter::new();
    for (field, constraint) in expect_object(value, "filter")? {
        check_field_name("filter", field)?;
        let path = format!("filter.{}", field);
        match constraint {
            Value::Object(ops) => {
                if ops.is_empty() {
                    return Err(QueryError::invalid(path, "empty operator object"));
                }
                for (op, operand) in ops {
                    filter.push(parse_operator(&path, field, op, operand)?);
                }
            }
            Value::Array(_) => {
                return Err(QueryError::invalid(path, "use $in for list membership"));
            }
            scalar => {
                let value = FilterValue::from_json(scalar)
                    .ok_or_else(|| QueryError::invalid(path.as_str(), "unsupported value"))?;
                filter.push(FilterCondition::new(field.as_str(), FilterOperator::Equal, value));
            }
        }
    }
    Ok(filter)
}

fn parse_operator(
    path: &str,
    field: &str,
    op: &str,
    operand: &Value,
) -> Result<FilterCondition, QueryError> {
    let op_path = format!("{}.{}", path, op);
    let operator = FilterOperator::from_wire(op)
        .ok_or_else(|| QueryError::invalid(op_path.as_str(), "operator not allowed"))?;
    let value = FilterValue::from_json(operand)
        .ok_or_else(|| QueryError::invalid(op_path.as_str(), "unsupported operand"))?;

    match (operator, value.is_list()) {
        (FilterOperator::In, false) => Err(QueryError::invalid(
            op_path,
            "$in expects a list of strings or integers",
        )),
        (FilterOperator::In, true) => Ok(FilterCondition::new(field, operator, value)),
        (_, true) => Err(QueryError::invalid(op_path, "list operand only allowed for $in")),
        (_, false) => Ok(FilterCondition::new(field, operator, value)),
    }
}

fn parse_sort(value: &Value) -> Result<SortSpec, QueryError> {
    let mut sort = SortSpec::new();
    for (field, direction) in expect_object(value, "sort")? {
        check_field_name("sort", field)?;
        let direction = OrderDirection::from_json(direction).ok_or_else(|| {
            QueryError::invalid(format!("sort.{}", field), "expected 1, -1, \"asc\" or \"desc\"")
        })?;
        sort = sort.then(field.as_str(), direction);
    }
    Ok(sort)
}

fn parse_select(value: &Value) -> Result<SelectSpec, QueryError> {
    let mut select = SelectSpec::new();
    for (field, flag) in expect_object(value, "select")? {
        check_field_name("select", field)?;
        let include = match flag {
            Value::Bool(b) => *b,
            Value::Number(n) if n.as_i64() == Some(1) => true,
            Value::Number(n) if n.as_i64() == Some(0) => false,
            _ => {
                return Err(QueryError::invalid(
                    format!("select.{}", field),
                    "expected 1, 0, true or false",
                ))
            }
        };
        select = select.with(field.as_str(), include);
    }
    Ok(select)
}

fn parse_pagination(value: &Value) -> Result<PageRequest, QueryError> {
    let page = expect_object(value, "pagination")?;
    for key in page.keys() {
        if key != "pageSize" && key != "currentPage" {
            return Err(QueryError::invalid(
                format!("pagination.{}", key),
                "unknown pagination field",
            ));
        }
    }

    let page_size = page
        .get("pageSize")
        .and_then(Value::as_u64)
        .ok_or_else(|| QueryError::invalid("pagination.pageSize", "expected a positive integer"))?;
    let current_page = match page.get("currentPage") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            QueryError::invalid("pagination.currentPage", "expected a non-negative integer")
        })?,
    };

    PageRequest::new(page_size, current_page)
        .ok_or_else(|| QueryError::invalid("pagination.pageSize", "expected a positive integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_body_is_empty_request() {
        assert_eq!(ListRequest::from_json(&Value::Null).unwrap(), ListRequest::new());
    }

    #[test]
    fn test_scalar_becomes_equality() {
        let request = ListRequest::from_json(&json!({ "filter": { "visibility": true } })).unwrap();
        assert_eq!(
            request.filter.conditions(),
            &[FilterCondition::eq("visibility", true)]
        );
    }

    #[test]
    fn test_operator_objects() {
        let request = ListRequest::from_json(&json!({
            "filter": {
                "rank": { "$gte": 2, "$lt": 9 },
                "slug": { "$in": ["a", "b"] }
            }
        }))
        .unwrap();
        assert_eq!(request.filter.conditions().len(), 3);
        assert_eq!(request.filter.conditions()[2].operator, FilterOperator::In);
    }

    #[test]
    fn test_rejects_unknown_operator() {
        for body in [
            json!({ "filter": { "name": { "$regex": ".*" } } }),
            json!({ "filter": { "name": { "$where": "true" } } }),
            json!({ "filter": { "$or": [] } }),
            json!({ "filter": { "meta": { "nested": 1 } } }),
            json!({ "filter": { "tags": ["a"] } }),
        ] {
            let err = ListRequest::from_json(&body).unwrap_err();
            assert!(matches!(err, QueryError::InvalidQuery { .. }), "{body}");
        }
    }

    #[test]
    fn test_in_requires_list() {
        let err = ListRequest::from_json(&json!({ "filter": { "slug": { "$in": "a" } } }));
        assert!(err.is_err());
        let err = ListRequest::from_json(&json!({ "filter": { "slug": { "$eq": ["a"] } } }));
        assert!(err.is_err());
    }

    #[test]
    fn test_sort_and_select_forms() {
        let request = ListRequest::from_json(&json!({
            "sort": { "name": "asc", "createdAt": -1 },
            "select": { "name": 1, "_id": false }
        }))
        .unwrap();
        let sort = request.sort.unwrap();
        assert_eq!(sort.keys()[0].direction, OrderDirection::Ascending);
        assert_eq!(sort.keys()[1].direction, OrderDirection::Descending);
        assert_eq!(request.select.unwrap().to_json(), json!({ "name": 1, "_id": 0 }));
    }

    #[test]
    fn test_bad_sort_direction() {
        assert!(ListRequest::from_json(&json!({ "sort": { "name": 2 } })).is_err());
    }

    #[test]
    fn test_pagination() {
        let request =
            ListRequest::from_json(&json!({ "pagination": { "pageSize": 2 } })).unwrap();
        assert_eq!(request.pagination, PageRequest::new(2, 0));

        assert!(ListRequest::from_json(&json!({ "pagination": { "pageSize": 0 } })).is_err());
        assert!(ListRequest::from_json(&json!({ "pagination": { "pageSize": -1 } })).is_err());
        assert!(ListRequest::from_json(
            &json!({ "pagination": { "pageSize": 2, "currentPage": -1 } })
        )
        .is_err());
    }

    #[test]
    fn test_unknown_section() {
        assert!(ListRequest::from_json(&json!({ "limit": 5 })).is_err());
        assert!(ListRequest::from_json(&json!([1])).is_err());
    }
}
