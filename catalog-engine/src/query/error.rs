//! Query construction errors

use thiserror::Error;

/// Errors raised while parsing or compiling a list query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A projection mixes inclusion and exclusion
    #[error("Projection Mismatch")]
    ProjectionMismatch,

    /// A loose request contained something outside the typed query shape
    #[error("Invalid query at '{path}': {reason}")]
    InvalidQuery {
        /// Location inside the request, e.g. `filter.rank.$where`
        path: String,
        /// What was wrong
        reason: String,
    },
}

impl QueryError {
    /// Create an invalid-query error
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(QueryError::ProjectionMismatch.to_string(), "Projection Mismatch");
        let err = QueryError::invalid("filter.$where", "operator not allowed");
        assert_eq!(
            err.to_string(),
            "Invalid query at 'filter.$where': operator not allowed"
        );
    }
}
