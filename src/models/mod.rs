//! Core data models for the address classifier.

pub mod code;
pub mod place;

pub use code::{check_digits, classify, GeoCode, Level, CODE_LEN, STREET_CODE_LEN};
pub use place::{Area, City, GeoObject, Region, Resolved, SearchResult, Settlement};
