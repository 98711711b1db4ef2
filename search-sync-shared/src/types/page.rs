//! Page objects produced by a search.
//!
//! Two page shapes are provided. `OffsetPage` exposes `current_page`,
//! `per_page`, `total_entries` and a stored `total_pages` recomputed whenever
//! the total changes. `CountPage` exposes `page`, `limit_value`, `total_count`
//! and derives `num_pages` on demand. Both implement [`Paginator`], and
//! [`PageStyle`] picks one at runtime so calling code does not change.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Page numbers start at 1.
    #[error("Invalid page: {0} (page numbers start at 1)")]
    InvalidPage(usize),

    /// Pages hold at least one entry.
    #[error("Invalid per_page: {0} (cannot be less than 1)")]
    InvalidPerPage(usize),

    /// The first entry of the page lies beyond any addressable offset.
    #[error("Page {page} is out of range for per_page {per_page}")]
    PageOutOfRange { page: usize, per_page: usize },

    /// A numeric option could not be parsed.
    #[error("Invalid numeric value for {name}: '{value}'")]
    InvalidNumber { name: String, value: String },
}

impl PaginationError {
    pub fn invalid_number(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            name: name.into(),
            value: value.into(),
        }
    }
}

fn validate(page: usize, per_page: usize) -> Result<(), PaginationError> {
    if page < 1 {
        return Err(PaginationError::InvalidPage(page));
    }
    if per_page < 1 {
        return Err(PaginationError::InvalidPerPage(per_page));
    }
    page_offset(page, per_page).map(|_| ())
}

/// Zero-based position of the first entry on `page`.
pub fn page_offset(page: usize, per_page: usize) -> Result<usize, PaginationError> {
    page.checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(per_page))
        .ok_or(PaginationError::PageOutOfRange { page, per_page })
}

fn pages_for(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page)
}

/// Page metadata contract shared by every page shape.
pub trait Paginator {
    type Item;

    /// Records on this page.
    fn records(&self) -> &[Self::Item];

    /// 1-based page number.
    fn current_page(&self) -> usize;

    fn per_page(&self) -> usize;

    /// Total number of matching entries, when known.
    fn total_entries(&self) -> Option<usize>;

    /// `ceil(total_entries / per_page)`, 0 while the total is unknown.
    fn total_pages(&self) -> usize;

    fn offset(&self) -> usize {
        (self.current_page() - 1) * self.per_page()
    }

    fn previous_page(&self) -> Option<usize> {
        if self.current_page() > 1 {
            Some(self.current_page() - 1)
        } else {
            None
        }
    }

    fn next_page(&self) -> Option<usize> {
        if self.current_page() < self.total_pages() {
            Some(self.current_page() + 1)
        } else {
            None
        }
    }

    fn is_first_page(&self) -> bool {
        self.current_page() == 1
    }

    fn is_last_page(&self) -> bool {
        self.current_page() >= self.total_pages()
    }

    fn is_out_of_bounds(&self) -> bool {
        self.current_page() > self.total_pages()
    }

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Page shape keyed on `current_page` / `per_page` / `total_entries`.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetPage<T> {
    current_page: usize,
    per_page: usize,
    total_entries: Option<usize>,
    total_pages: usize,
    records: Vec<T>,
}

impl<T> OffsetPage<T> {
    pub fn new(
        records: Vec<T>,
        current_page: usize,
        per_page: usize,
        total: Option<usize>,
    ) -> Result<Self, PaginationError> {
        validate(current_page, per_page)?;
        let mut page = Self {
            current_page,
            per_page,
            total_entries: None,
            total_pages: 0,
            records: Vec::new(),
        };
        if let Some(total) = total {
            page.set_total_entries(total);
        }
        page.replace(records);
        Ok(page)
    }

    /// Set the total and recompute `total_pages`.
    pub fn set_total_entries(&mut self, total: usize) {
        self.total_entries = Some(total);
        self.total_pages = pages_for(total, self.per_page);
    }

    /// Replace the records.
    ///
    /// When no total was supplied and the list is visibly the last page
    /// (shorter than `per_page`, and either the first page or non-empty), the
    /// total is inferred as `offset + len`.
    pub fn replace(&mut self, records: Vec<T>) {
        self.records = records;
        if self.total_entries.is_none()
            && self.records.len() < self.per_page
            && (self.current_page == 1 || !self.records.is_empty())
        {
            let total = self.offset().saturating_add(self.records.len());
            self.set_total_entries(total);
        }
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl<T> Paginator for OffsetPage<T> {
    type Item = T;

    fn records(&self) -> &[T] {
        &self.records
    }

    fn current_page(&self) -> usize {
        self.current_page
    }

    fn per_page(&self) -> usize {
        self.per_page
    }

    fn total_entries(&self) -> Option<usize> {
        self.total_entries
    }

    fn total_pages(&self) -> usize {
        self.total_pages
    }
}

/// Page shape keyed on `page` / `limit_value` / `total_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountPage<T> {
    page: usize,
    limit_value: usize,
    total_count: Option<usize>,
    records: Vec<T>,
}

impl<T> CountPage<T> {
    pub fn new(
        records: Vec<T>,
        page: usize,
        limit_value: usize,
        total: Option<usize>,
    ) -> Result<Self, PaginationError> {
        validate(page, limit_value)?;
        let mut result = Self {
            page,
            limit_value,
            total_count: total,
            records: Vec::new(),
        };
        result.replace(records);
        Ok(result)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit_value(&self) -> usize {
        self.limit_value
    }

    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    pub fn set_total_count(&mut self, total: usize) {
        self.total_count = Some(total);
    }

    /// Number of pages, derived from `total_count` on each call.
    pub fn num_pages(&self) -> usize {
        self.total_count
            .map(|total| pages_for(total, self.limit_value))
            .unwrap_or(0)
    }

    pub fn replace(&mut self, records: Vec<T>) {
        self.records = records;
        if self.total_count.is_none()
            && self.records.len() < self.limit_value
            && (self.page == 1 || !self.records.is_empty())
        {
            self.total_count = Some(self.offset().saturating_add(self.records.len()));
        }
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl<T> Paginator for CountPage<T> {
    type Item = T;

    fn records(&self) -> &[T] {
        &self.records
    }

    fn current_page(&self) -> usize {
        self.page
    }

    fn per_page(&self) -> usize {
        self.limit_value
    }

    fn total_entries(&self) -> Option<usize> {
        self.total_count
    }

    fn total_pages(&self) -> usize {
        self.num_pages()
    }
}

/// Selects which page shape a search produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageStyle {
    #[default]
    Offset,
    Count,
}

impl PageStyle {
    /// Build a page of this style.
    pub fn paginate<T>(
        &self,
        records: Vec<T>,
        page: usize,
        per_page: usize,
        total: Option<usize>,
    ) -> Result<Paginated<T>, PaginationError> {
        match self {
            Self::Offset => Ok(Paginated::Offset(OffsetPage::new(
                records, page, per_page, total,
            )?)),
            Self::Count => Ok(Paginated::Count(CountPage::new(
                records, page, per_page, total,
            )?)),
        }
    }
}

impl FromStr for PageStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "offset" => Ok(Self::Offset),
            "count" => Ok(Self::Count),
            other => Err(format!("unknown page style '{}'", other)),
        }
    }
}

/// A page of either shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Paginated<T> {
    Offset(OffsetPage<T>),
    Count(CountPage<T>),
}

impl<T> Paginated<T> {
    pub fn style(&self) -> PageStyle {
        match self {
            Self::Offset(_) => PageStyle::Offset,
            Self::Count(_) => PageStyle::Count,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records().iter()
    }

    pub fn into_records(self) -> Vec<T> {
        match self {
            Self::Offset(page) => page.into_records(),
            Self::Count(page) => page.into_records(),
        }
    }

    pub fn as_offset(&self) -> Option<&OffsetPage<T>> {
        match self {
            Self::Offset(page) => Some(page),
            Self::Count(_) => None,
        }
    }

    pub fn as_count(&self) -> Option<&CountPage<T>> {
        match self {
            Self::Count(page) => Some(page),
            Self::Offset(_) => None,
        }
    }
}

impl<T> Paginator for Paginated<T> {
    type Item = T;

    fn records(&self) -> &[T] {
        match self {
            Self::Offset(page) => page.records(),
            Self::Count(page) => page.records(),
        }
    }

    fn current_page(&self) -> usize {
        match self {
            Self::Offset(page) => page.current_page(),
            Self::Count(page) => page.current_page(),
        }
    }

    fn per_page(&self) -> usize {
        match self {
            Self::Offset(page) => page.per_page(),
            Self::Count(page) => page.per_page(),
        }
    }

    fn total_entries(&self) -> Option<usize> {
        match self {
            Self::Offset(page) => page.total_entries(),
            Self::Count(page) => page.total_entries(),
        }
    }

    fn total_pages(&self) -> usize {
        match self {
            Self::Offset(page) => page.total_pages(),
            Self::Count(page) => page.total_pages(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Paginated<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
