//! Search query types.
//!
//! This module defines what a caller hands to a search (the query and its
//! options) and what is finally sent to the engine (`SearchRequest`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::types::page::PaginationError;

/// The query part of a search.
///
/// Free text is wrapped into a `query_string` query. A structured query is
/// passed to the engine verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchQuery {
    /// Free-text query using the engine's query-string syntax.
    Text(String),
    /// Engine query DSL object, used as the `query` clause as-is.
    Structured(Value),
}

impl SearchQuery {
    /// Create a free-text query.
    pub fn text(query: impl Into<String>) -> Self {
        Self::Text(query.into())
    }

    /// Create a structured query.
    pub fn structured(query: Value) -> Self {
        Self::Structured(query)
    }

    /// Build the `query` clause sent to the engine.
    ///
    /// `default_operator` only applies to free-text queries.
    pub fn to_query_clause(&self, default_operator: Option<DefaultOperator>) -> Value {
        match self {
            Self::Text(text) => {
                let mut query_string = Map::new();
                query_string.insert("query".to_string(), json!(text));
                if let Some(operator) = default_operator {
                    query_string.insert("default_operator".to_string(), json!(operator.as_str()));
                }
                json!({ "query_string": query_string })
            }
            Self::Structured(query) => query.clone(),
        }
    }
}

impl From<&str> for SearchQuery {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SearchQuery {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for SearchQuery {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

/// Boolean operator applied between terms of a free-text query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefaultOperator {
    And,
    Or,
}

impl DefaultOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// One `{field: direction}` entry of a structured sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl TryFrom<Map<String, Value>> for SortField {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "sort entry must have exactly one field, got {}",
                map.len()
            ));
        }
        let (field, direction) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty sort entry".to_string())?;
        let direction = match direction {
            Value::String(s) => s.parse()?,
            Value::Object(inner) => match inner.get("order") {
                Some(Value::String(s)) => s.parse()?,
                _ => SortDirection::Asc,
            },
            other => return Err(format!("invalid sort direction {}", other)),
        };
        Ok(Self { field, direction })
    }
}

impl From<SortField> for Map<String, Value> {
    fn from(sort: SortField) -> Self {
        let mut map = Map::new();
        map.insert(sort.field, json!(sort.direction.as_str()));
        map
    }
}

/// Result ordering for a search. Omitting the sort means relevance order.
///
/// A bare string (`"id:desc"`, or several comma-separated entries) travels as
/// a URL parameter; structured entries travel in the request body. Both
/// describe the same ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sort {
    QueryString(String),
    Fields(Vec<SortField>),
}

impl Sort {
    pub fn query_string(sort: impl Into<String>) -> Self {
        Self::QueryString(sort.into())
    }

    pub fn fields(fields: Vec<SortField>) -> Self {
        Self::Fields(fields)
    }

    /// Normalized field list, regardless of how the sort was given.
    ///
    /// Fails on a string entry whose direction is neither `asc` nor `desc`.
    pub fn to_fields(&self) -> Result<Vec<SortField>, String> {
        match self {
            Self::Fields(fields) => Ok(fields.clone()),
            Self::QueryString(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| match part.split_once(':') {
                    Some((field, direction)) => Ok(SortField {
                        field: field.to_string(),
                        direction: direction.parse()?,
                    }),
                    None => Ok(SortField::asc(part)),
                })
                .collect(),
        }
    }
}

/// A numeric option that may arrive as a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericParam {
    Number(u64),
    Text(String),
}

impl NumericParam {
    /// Coerce to a positive integer.
    pub fn resolve(&self, name: &str) -> Result<usize, PaginationError> {
        let value = match self {
            Self::Number(n) => *n as usize,
            Self::Text(s) => s
                .trim()
                .parse::<usize>()
                .map_err(|_| PaginationError::invalid_number(name, s))?,
        };
        Ok(value)
    }
}

impl From<u64> for NumericParam {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<usize> for NumericParam {
    fn from(value: usize) -> Self {
        Self::Number(value as u64)
    }
}

impl From<&str> for NumericParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Options recognized by a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Page number, starting at 1. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<NumericParam>,

    /// Page size. Defaults to the record kind's configured per-page value and
    /// is capped by its maximum when one is configured.
    #[serde(default, alias = "size", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<NumericParam>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<DefaultOperator>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: impl Into<NumericParam>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn with_per_page(mut self, per_page: impl Into<NumericParam>) -> Self {
        self.per_page = Some(per_page.into());
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sort with a `"field:direction"` string.
    pub fn sorted_by(self, sort: impl Into<String>) -> Self {
        self.with_sort(Sort::QueryString(sort.into()))
    }

    pub fn with_default_operator(mut self, operator: DefaultOperator) -> Self {
        self.default_operator = Some(operator);
        self
    }

    /// Requested page, defaulting to 1.
    pub fn resolve_page(&self) -> Result<usize, PaginationError> {
        let page = match &self.page {
            Some(param) => param.resolve("page")?,
            None => 1,
        };
        if page < 1 {
            return Err(PaginationError::InvalidPage(page));
        }
        Ok(page)
    }

    /// Requested page size, falling back to `default` and capped by `max`.
    pub fn resolve_per_page(
        &self,
        default: usize,
        max: Option<usize>,
    ) -> Result<usize, PaginationError> {
        let requested = match &self.per_page {
            Some(param) => param.resolve("per_page")?,
            None => default,
        };
        let per_page = match max {
            Some(max) => requested.min(max),
            None => requested,
        };
        if per_page < 1 {
            return Err(PaginationError::InvalidPerPage(per_page));
        }
        Ok(per_page)
    }
}

/// A fully resolved search as sent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Value,
    pub from: usize,
    pub size: usize,
    pub sort: Option<Sort>,
    /// Stored fields to return. Searches only ask for `_id`.
    pub fields: Vec<String>,
}

impl SearchRequest {
    /// Request identifiers only for `query`.
    pub fn ids_only(query: Value, from: usize, size: usize) -> Self {
        Self {
            query,
            from,
            size,
            sort: None,
            fields: vec!["_id".to_string()],
        }
    }

    pub fn with_sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// JSON body of the request. Structured sorts go here.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.clone());
        body.insert("from".to_string(), json!(self.from));
        body.insert("size".to_string(), json!(self.size));
        if !self.fields.is_empty() {
            body.insert("fields".to_string(), json!(self.fields));
        }
        if let Some(Sort::Fields(fields)) = &self.sort {
            body.insert("sort".to_string(), json!(fields));
        }
        Value::Object(body)
    }

    /// URL parameter form of a string sort, if any.
    pub fn sort_param(&self) -> Option<&str> {
        match &self.sort {
            Some(Sort::QueryString(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "query={} from={} size={}",
            self.query, self.from, self.size
        )?;
        match self.sort.as_ref().map(Sort::to_fields) {
            Some(Ok(fields)) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|s| format!("{}:{}", s.field, s.direction.as_str()))
                    .collect();
                write!(f, " sort={}", fields.join(","))?;
            }
            Some(Err(_)) => {
                if let Some(Sort::QueryString(raw)) = &self.sort {
                    write!(f, " sort={}", raw)?;
                }
            }
            None => {}
        }
        Ok(())
    }
}
