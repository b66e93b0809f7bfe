//! Storage access for place and street rows.
//!
//! The resolver only needs one capability from storage: fetch the rows of one
//! table whose code matches any of a set of code filters and whose name
//! matches an optional name pattern. [`GeoQuery`] describes such a request and
//! [`GeoStore`] executes it.

mod embedded;
mod memory;

pub use embedded::SledStore;
pub use memory::MemoryStore;

use std::fmt;

use crate::error::StoreError;
use crate::models::{GeoCode, GeoObject};
use crate::resolver::pattern::{CodePattern, NamePattern};

/// Source table of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Regions, areas, cities and settlements
    Places,
    /// Streets keyed by the 11-digit place prefix
    Streets,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Places => "kladr",
            Table::Streets => "street",
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Code,
    /// Name ascending, code as tie-breaker
    Name,
}

/// One alternative of a query's code condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeFilter {
    Exact(GeoCode),
    Like(CodePattern),
}

impl CodeFilter {
    pub fn matches(&self, code: &str) -> bool {
        match self {
            CodeFilter::Exact(exact) => exact.as_str() == code,
            CodeFilter::Like(pattern) => pattern.matches(code),
        }
    }

    fn literal_prefix(&self) -> &str {
        match self {
            CodeFilter::Exact(exact) => exact.as_str(),
            CodeFilter::Like(pattern) => pattern.literal_prefix(),
        }
    }
}

impl fmt::Display for CodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeFilter::Exact(code) => write!(f, "code = '{}'", code),
            CodeFilter::Like(pattern) => write!(f, "code LIKE '{}'", pattern),
        }
    }
}

/// A single storage request: `table WHERE (code filters OR'ed) AND name LIKE ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoQuery {
    pub table: Table,
    pub codes: Vec<CodeFilter>,
    pub name: Option<NamePattern>,
    pub order: Order,
}

impl GeoQuery {
    /// Query over the place table, code-ordered.
    pub fn places(codes: impl IntoIterator<Item = CodeFilter>) -> Self {
        Self {
            table: Table::Places,
            codes: codes.into_iter().collect(),
            name: None,
            order: Order::Code,
        }
    }

    /// Query over the street table. Streets always come back name-ordered.
    pub fn streets(pattern: CodePattern) -> Self {
        Self {
            table: Table::Streets,
            codes: vec![CodeFilter::Like(pattern)],
            name: None,
            order: Order::Name,
        }
    }

    pub fn with_name(mut self, name: NamePattern) -> Self {
        self.name = Some(name);
        self
    }

    pub fn ordered_by(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Row filter shared by in-process backends.
    pub fn matches(&self, object: &GeoObject) -> bool {
        self.codes.iter().any(|filter| filter.matches(&object.id))
            && self
                .name
                .as_ref()
                .map_or(true, |name| name.matches(&object.name))
    }

    /// Longest key prefix every matching row shares, for ordered key scans.
    pub fn scan_prefix(&self) -> &str {
        let mut filters = self.codes.iter().map(CodeFilter::literal_prefix);
        let Some(first) = filters.next() else {
            return "";
        };
        filters.fold(first, |common, next| {
            let len = common
                .bytes()
                .zip(next.bytes())
                .take_while(|(a, b)| a == b)
                .count();
            &common[..len]
        })
    }

    /// Sort rows into the requested order.
    pub fn sort(&self, rows: &mut [GeoObject]) {
        match self.order {
            Order::Code => rows.sort_by(|a, b| a.id.cmp(&b.id)),
            Order::Name => rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))),
        }
    }
}

impl fmt::Display for GeoQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT name, socr, code FROM {} WHERE (", self.table.name())?;
        for (idx, filter) in self.codes.iter().enumerate() {
            if idx > 0 {
                f.write_str(" OR ")?;
            }
            write!(f, "{}", filter)?;
        }
        f.write_str(")")?;
        if let Some(name) = &self.name {
            write!(f, " AND UPPER(name) LIKE UPPER('{}')", name)?;
        }
        match self.order {
            Order::Code => f.write_str(" ORDER BY code"),
            Order::Name => f.write_str(" ORDER BY name, code"),
        }
    }
}

/// Read access to the classifier tables.
///
/// Calls are blocking. Each call is a complete unit of work: implementations
/// acquire whatever they need and release it before returning, on every path.
pub trait GeoStore: Send + Sync {
    /// Rows of `query.table` matching the query, in `query.order`.
    fn fetch(&self, query: &GeoQuery) -> Result<Vec<GeoObject>, StoreError>;
}

impl<T: GeoStore + ?Sized> GeoStore for Box<T> {
    fn fetch(&self, query: &GeoQuery) -> Result<Vec<GeoObject>, StoreError> {
        (**self).fetch(query)
    }
}

impl<T: GeoStore + ?Sized> GeoStore for std::sync::Arc<T> {
    fn fetch(&self, query: &GeoQuery) -> Result<Vec<GeoObject>, StoreError> {
        (**self).fetch(query)
    }
}
