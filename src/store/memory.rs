//! In-memory store for tests and small fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{GeoQuery, GeoStore, Table};
use crate::error::StoreError;
use crate::models::GeoObject;

/// Failure injected into every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Offline,
    Rejecting,
}

/// Vector-backed store that counts the queries it serves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    places: Vec<GeoObject>,
    streets: Vec<GeoObject>,
    fault: Option<Fault>,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new(places: Vec<GeoObject>, streets: Vec<GeoObject>) -> Self {
        Self {
            places,
            streets,
            ..Default::default()
        }
    }

    /// A store whose every fetch fails as unavailable.
    pub fn offline() -> Self {
        Self {
            fault: Some(Fault::Offline),
            ..Default::default()
        }
    }

    /// A store that is reachable but rejects every query.
    pub fn rejecting() -> Self {
        Self {
            fault: Some(Fault::Rejecting),
            ..Default::default()
        }
    }

    /// Number of `fetch` calls so far, failed ones included.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl GeoStore for MemoryStore {
    fn fetch(&self, query: &GeoQuery) -> Result<Vec<GeoObject>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Some(Fault::Offline) => {
                return Err(StoreError::Unavailable("memory store is offline".into()))
            }
            Some(Fault::Rejecting) => {
                return Err(StoreError::Query("memory store rejects queries".into()))
            }
            None => {}
        }

        let table = match query.table {
            Table::Places => &self.places,
            Table::Streets => &self.streets,
        };
        let mut rows: Vec<GeoObject> = table
            .iter()
            .filter(|object| query.matches(object))
            .cloned()
            .collect();
        query.sort(&mut rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::pattern::region_pattern;
    use crate::store::CodeFilter;

    #[test]
    fn test_counts_queries() {
        let store = MemoryStore::new(
            vec![
                GeoObject::new("Moscow", "г", "7700000000000"),
                GeoObject::new("Moscow Oblast", "обл", "5000000000000"),
            ],
            vec![],
        );
        let query = GeoQuery::places([CodeFilter::Like(region_pattern())]);

        let rows = store.fetch(&query).unwrap();
        assert_eq!(rows[0].id, "5000000000000");
        assert_eq!(rows.len(), 2);
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn test_offline_store_fails() {
        let store = MemoryStore::offline();
        let query = GeoQuery::places([CodeFilter::Like(region_pattern())]);
        assert!(matches!(
            store.fetch(&query),
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn test_rejecting_store_fails_with_query_error() {
        let store = MemoryStore::rejecting();
        let query = GeoQuery::places([CodeFilter::Like(region_pattern())]);
        assert!(matches!(store.fetch(&query), Err(StoreError::Query(_))));
    }
}
