//! Slug generation and uniqueness
//!
//! [`slugify`] is the pure transform; [`SlugResolver`] checks a candidate
//! against the store and forces a random suffix when it is taken. There is no
//! retry loop: a residual collision surfaces at insert time as a duplicate key.
//!
//! ```rust
//! use catalog_engine::slug::slugify;
//!
//! assert_eq!(slugify("  Hello, World!  ", false), "hello-world");
//! assert!(slugify("Hello", true).starts_with("hello-"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::entity::SLUG_FIELD;
use crate::query::{Filter, FilterCondition, SelectSpec};
use crate::store::{DocumentStore, StoreResult, ID_FIELD};

/// Length of the random suffix appended by `force_unique`
pub const SUFFIX_LEN: usize = 8;

/// Runs of characters that are neither letters nor digits
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("separator regex is valid"));

fn random_suffix() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(SUFFIX_LEN);
    token
}

/// Turn arbitrary text into a URL-safe slug
///
/// Lower-cases, replaces every run of non-alphanumeric characters with `-`
/// and trims leading and trailing dashes. With `force_unique` a dash and
/// eight random hex characters are appended; an empty stem yields the token
/// alone.
#[must_use]
pub fn slugify(input: &str, force_unique: bool) -> String {
    let lowered = input.to_lowercase();
    let stem = SEPARATORS.replace_all(&lowered, "-");
    let stem = stem.trim_matches('-');

    if !force_unique {
        return stem.to_string();
    }
    if stem.is_empty() {
        return random_suffix();
    }
    format!("{}-{}", stem, random_suffix())
}

/// Resolves slug candidates against one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugResolver {
    collection: String,
}

impl SlugResolver {
    /// Resolver for a collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    /// Whether some record already holds `slug`
    pub async fn exists<S: DocumentStore>(&self, store: &S, slug: &str) -> StoreResult<bool> {
        let filter = Filter::new().and(FilterCondition::eq(SLUG_FIELD, slug));
        let projection = SelectSpec::new().include(ID_FIELD);
        let found = store
            .find_one(&self.collection, &filter, Some(&projection))
            .await?;
        Ok(found.is_some())
    }

    /// Keep `candidate` when free, otherwise return a suffixed variant
    pub async fn resolve<S: DocumentStore>(&self, store: &S, candidate: &str) -> StoreResult<String> {
        if !self.exists(store, candidate).await? {
            return Ok(candidate.to_string());
        }
        let resolved = slugify(candidate, true);
        debug!(
            collection = %self.collection,
            candidate,
            resolved = %resolved,
            "Slug taken, forcing unique suffix"
        );
        Ok(resolved)
    }
}
