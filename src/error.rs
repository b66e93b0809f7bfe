//! Error types for code parsing, storage access and resolution.

use thiserror::Error;

use crate::store::GeoQuery;

/// Boxed error used to carry backend-specific failures through the store seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a code string was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("expected {expected} digits, got {len} characters")]
    WrongLength { expected: usize, len: usize },

    #[error("non-digit {found:?} at position {position}")]
    NonDigit { position: usize, found: char },

    #[error("street-level code does not name a populated place")]
    StreetLevel,
}

/// Failure reported by a [`GeoStore`](crate::store::GeoStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or read at all.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] BoxError),

    /// The backend rejected or failed a well-formed query.
    #[error("query rejected: {0}")]
    Query(#[source] BoxError),

    /// A stored row could not be decoded.
    #[error("corrupt row {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by the [`Resolver`](crate::resolver::Resolver).
///
/// Storage failures keep the backend's [`StoreError`] as their source and carry
/// the rendered query so callers can log what was running.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("malformed code {code:?}: {source}")]
    MalformedCode {
        code: String,
        #[source]
        source: CodeError,
    },

    #[error("search name is empty")]
    EmptyName,

    #[error("no geo object with code {code}")]
    NotFound { code: String },

    #[error("storage unavailable while running `{query}`")]
    StorageUnavailable {
        query: String,
        #[source]
        source: StoreError,
    },

    #[error("query `{query}` failed")]
    QueryFailed {
        query: String,
        #[source]
        source: StoreError,
    },
}

impl ResolveError {
    pub(crate) fn malformed(code: &str, source: CodeError) -> Self {
        Self::MalformedCode {
            code: code.to_string(),
            source,
        }
    }

    pub(crate) fn from_store(query: &GeoQuery, source: StoreError) -> Self {
        let query = query.to_string();
        match source {
            StoreError::Unavailable(_) => Self::StorageUnavailable { query, source },
            StoreError::Query(_) | StoreError::Corrupt { .. } => Self::QueryFailed { query, source },
        }
    }

    /// True for errors caused by the caller's input rather than the backend.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::MalformedCode { .. } | Self::EmptyName)
    }
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
