//! Indexing conditions.
//!
//! A record is synchronized only when every `if` predicate holds and no
//! `unless` predicate holds. Predicate references are resolved once, when the
//! [`crate::Indexable`] is built, so an unknown method name or a malformed
//! expression fails at setup rather than on the first record.

mod expression;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use expression::Expression;

use crate::errors::SearchSyncError;
use crate::projector::DocumentProjector;
use crate::record::Record;

type PredicateFn<R> = dyn Fn(&R) -> bool + Send + Sync;

/// Reference to a boolean condition on a record.
pub enum Predicate<R> {
    /// A method registered through [`Record::named_predicate`].
    NamedMethod(String),
    /// An inline expression over the projected document.
    Expression(String),
    /// Any closure.
    Callable(Arc<PredicateFn<R>>),
}

impl<R> Predicate<R> {
    pub fn named(name: impl Into<String>) -> Self {
        Self::NamedMethod(name.into())
    }

    pub fn expression(source: impl Into<String>) -> Self {
        Self::Expression(source.into())
    }

    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }
}

impl<R> fmt::Debug for Predicate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedMethod(name) => f.debug_tuple("NamedMethod").field(name).finish(),
            Self::Expression(source) => f.debug_tuple("Expression").field(source).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

enum Resolved<R> {
    Method(fn(&R) -> bool),
    Expression(Expression),
    Callable(Arc<PredicateFn<R>>),
}

impl<R: Record> Resolved<R> {
    fn resolve(predicate: Predicate<R>) -> Result<Self, SearchSyncError> {
        match predicate {
            Predicate::NamedMethod(name) => R::named_predicate(&name)
                .map(Self::Method)
                .ok_or_else(|| {
                    SearchSyncError::config(format!("unknown condition method '{}'", name))
                }),
            Predicate::Expression(source) => Expression::parse(&source).map(Self::Expression),
            Predicate::Callable(f) => Ok(Self::Callable(f)),
        }
    }
}

/// Resolved `if`/`unless` predicates for one record kind.
pub struct ConditionSet<R> {
    required: Vec<Resolved<R>>,
    excluded: Vec<Resolved<R>>,
}

impl<R: Record> ConditionSet<R> {
    /// Resolve predicate references.
    pub fn resolve(
        if_predicates: Vec<Predicate<R>>,
        unless_predicates: Vec<Predicate<R>>,
    ) -> Result<Self, SearchSyncError> {
        Ok(Self {
            required: if_predicates
                .into_iter()
                .map(Resolved::resolve)
                .collect::<Result<_, _>>()?,
            excluded: unless_predicates
                .into_iter()
                .map(Resolved::resolve)
                .collect::<Result<_, _>>()?,
        })
    }

    /// A set with no predicates; every record passes.
    pub fn always() -> Self {
        Self {
            required: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }

    /// True iff all `if` predicates hold and none of the `unless` ones do.
    ///
    /// The record is projected at most once, and only when an expression
    /// needs the document.
    pub fn evaluate(
        &self,
        record: &R,
        projector: &DocumentProjector<R>,
    ) -> Result<bool, SearchSyncError> {
        let mut document: Option<Value> = None;

        for predicate in &self.required {
            if !Self::check(predicate, record, projector, &mut document)? {
                return Ok(false);
            }
        }
        for predicate in &self.excluded {
            if Self::check(predicate, record, projector, &mut document)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check(
        predicate: &Resolved<R>,
        record: &R,
        projector: &DocumentProjector<R>,
        document: &mut Option<Value>,
    ) -> Result<bool, SearchSyncError> {
        match predicate {
            Resolved::Method(method) => Ok(method(record)),
            Resolved::Callable(f) => Ok(f(record)),
            Resolved::Expression(expression) => {
                if document.is_none() {
                    *document = Some(projector.project(record)?);
                }
                Ok(document
                    .as_ref()
                    .is_some_and(|doc| expression.evaluate(doc)))
            }
        }
    }
}
