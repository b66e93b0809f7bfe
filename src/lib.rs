//! Kladr - resolver for hierarchical address classifier codes
//!
//! This library provides the code classifier, query construction and storage
//! backends shared by the query, ingest and lookup binaries.

pub mod config;
pub mod error;
pub mod models;
pub mod resolver;
pub mod store;

pub use error::{ResolveError, StoreError};
pub use models::{classify, GeoCode, GeoObject, Level, Resolved, SearchResult};
pub use resolver::Resolver;
pub use store::{GeoStore, MemoryStore, SledStore};
