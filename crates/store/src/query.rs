//! Filter/sort/paginate query builder mirroring the predicates the
//! backing store can express.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_LIMIT: usize = 25;

/// A single query predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Equal { field: String, value: Value },
    /// Equality against any value in the set (tenant filtering).
    In { field: String, values: Vec<Value> },
    GreaterThanEqual { field: String, value: Value },
    LessThanEqual { field: String, value: Value },
    /// Substring/token search on a string field.
    Search { field: String, term: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    Asc(String),
    Desc(String),
}

/// A list query: predicates plus pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            sort: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Equal {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn equal_any(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            field: field.into(),
            values,
        });
        self
    }

    pub fn greater_than_equal(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter::GreaterThanEqual {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn less_than_equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::LessThanEqual {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn search(mut self, field: impl Into<String>, term: impl Into<String>) -> Self {
        self.filters.push(Filter::Search {
            field: field.into(),
            term: term.into(),
        });
        self
    }

    pub fn order_asc(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(Sort::Asc(field.into()));
        self
    }

    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(Sort::Desc(field.into()));
        self
    }
}
