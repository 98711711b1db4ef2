//! Index bodies and blue/green index versions.
//!
//! A version is a concrete index named `{alias}_{unix_millis}`. The logical
//! index name is an alias pointing at exactly one version at a time.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};

/// Settings applied when a descriptor carries none.
pub fn default_settings() -> Value {
    json!({
        "number_of_shards": 1,
        "number_of_replicas": 1
    })
}

/// Body for an index create request.
///
/// `mappings` is keyed by type name, e.g. `{"posts": {"properties": {..}}}`.
pub fn create_index_body(settings: Option<&Value>, mappings: Option<&Value>) -> Value {
    let mut body = Map::new();
    body.insert(
        "settings".to_string(),
        settings.cloned().unwrap_or_else(default_settings),
    );
    if let Some(mappings) = mappings {
        body.insert("mappings".to_string(), mappings.clone());
    }
    Value::Object(body)
}

/// One timestamped version of a logical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexVersion {
    /// Logical index name, used as the alias.
    pub alias: String,
    /// Concrete index name.
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl IndexVersion {
    /// Allocate a new version of `alias` stamped with the current time.
    ///
    /// Two versions allocated within the same millisecond share a name.
    pub fn allocate(alias: impl Into<String>) -> Self {
        Self::at(alias, Utc::now())
    }

    /// Version of `alias` stamped with `created_at`, truncated to millis.
    pub fn at(alias: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let alias = alias.into();
        let millis = created_at.timestamp_millis();
        let created_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or(created_at);
        Self {
            name: format!("{}_{}", alias, millis),
            alias,
            created_at,
        }
    }

    /// Recognize `name` as a version of `alias`.
    pub fn parse(alias: &str, name: &str) -> Option<Self> {
        let millis: i64 = name
            .strip_prefix(alias)?
            .strip_prefix('_')?
            .parse()
            .ok()?;
        let created_at = Utc.timestamp_millis_opt(millis).single()?;
        Some(Self {
            alias: alias.to_string(),
            name: name.to_string(),
            created_at,
        })
    }

    /// Wildcard pattern matching every version of `alias`.
    pub fn pattern(alias: &str) -> String {
        format!("{}_*", alias)
    }

    /// True when this version was created before `other`.
    pub fn is_older_than(&self, other: &IndexVersion) -> bool {
        self.created_at < other.created_at
    }
}

impl Ord for IndexVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for IndexVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IndexVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
