//! Embedded sled store.
//!
//! Each table is a sled tree keyed by the row code, so a query's literal code
//! prefix becomes an ordered prefix scan. Values are JSON `{name, type}`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use tracing::{debug, info};

use super::{GeoQuery, GeoStore, Table};
use crate::error::StoreError;
use crate::models::GeoObject;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Place and street tables in one sled database.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    places: Tree,
    streets: Tree,
}

impl SledStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening sled store at {}", path.display());
        let db = sled::open(path).map_err(unavailable)?;
        Self::from_db(db)
    }

    /// Wrap an already opened database.
    pub fn from_db(db: Db) -> Result<Self, StoreError> {
        let places = db.open_tree(Table::Places.name()).map_err(unavailable)?;
        let streets = db.open_tree(Table::Streets.name()).map_err(unavailable)?;
        Ok(Self {
            db,
            places,
            streets,
        })
    }

    fn tree(&self, table: Table) -> &Tree {
        match table {
            Table::Places => &self.places,
            Table::Streets => &self.streets,
        }
    }

    /// Insert or replace one row.
    pub fn upsert(&self, table: Table, object: &GeoObject) -> Result<(), StoreError> {
        let row = StoredRow {
            name: object.name.clone(),
            kind: object.kind.clone(),
        };
        let value = serde_json::to_vec(&row).map_err(|e| StoreError::Query(Box::new(e)))?;
        self.tree(table)
            .insert(object.id.as_bytes(), value)
            .map_err(rejected)?;
        Ok(())
    }

    /// Drop every row of a table.
    pub fn clear(&self, table: Table) -> Result<(), StoreError> {
        self.tree(table).clear().map_err(rejected)
    }

    pub fn len(&self, table: Table) -> usize {
        self.tree(table).len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.streets.is_empty()
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<usize, StoreError> {
        self.db.flush().map_err(unavailable)
    }
}

impl GeoStore for SledStore {
    fn fetch(&self, query: &GeoQuery) -> Result<Vec<GeoObject>, StoreError> {
        let prefix = query.scan_prefix();
        debug!(
            "sled scan on '{}' with prefix '{}'",
            query.table.name(),
            prefix
        );

        let mut rows = Vec::new();
        for entry in self.tree(query.table).scan_prefix(prefix.as_bytes()) {
            let (key, value) = entry.map_err(rejected)?;
            let id = String::from_utf8_lossy(&key).into_owned();
            let row: StoredRow =
                serde_json::from_slice(&value).map_err(|source| StoreError::Corrupt {
                    key: id.clone(),
                    source,
                })?;

            let object = GeoObject {
                name: row.name,
                kind: row.kind,
                id,
            };
            if query.matches(&object) {
                rows.push(object);
            }
        }

        query.sort(&mut rows);
        Ok(rows)
    }
}

fn unavailable(err: sled::Error) -> StoreError {
    StoreError::Unavailable(Box::new(err))
}

fn rejected(err: sled::Error) -> StoreError {
    match err {
        sled::Error::Io(_) => unavailable(err),
        other => StoreError::Query(Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoCode;
    use crate::resolver::pattern::{child_street_pattern, CodePattern, NamePattern};
    use crate::store::CodeFilter;
    use tempfile::Builder;

    fn open_temp() -> (tempfile::TempDir, SledStore) {
        let dir = Builder::new().prefix("kladr-sled-").tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_upsert_and_prefix_fetch() {
        let (_dir, store) = open_temp();
        for object in [
            GeoObject::new("Moscow", "г", "7700000000000"),
            GeoObject::new("Zelenograd", "г", "7700000100000"),
            GeoObject::new("Moscow Oblast", "обл", "5000000000000"),
        ] {
            store.upsert(Table::Places, &object).unwrap();
        }
        assert_eq!(store.len(Table::Places), 3);

        let query = GeoQuery::places([CodeFilter::Like(CodePattern::places_under("77"))]);
        let rows = store.fetch(&query).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["7700000000000", "7700000100000"]);
    }

    #[test]
    fn test_upsert_replaces_row() {
        let (_dir, store) = open_temp();
        store
            .upsert(Table::Places, &GeoObject::new("Old", "г", "7700000000000"))
            .unwrap();
        store
            .upsert(Table::Places, &GeoObject::new("Moscow", "г", "7700000000000"))
            .unwrap();

        let code = GeoCode::parse("7700000000000").unwrap();
        let rows = store
            .fetch(&GeoQuery::places([CodeFilter::Exact(code)]))
            .unwrap();
        assert_eq!(rows, vec![GeoObject::new("Moscow", "г", "7700000000000")]);
    }

    #[test]
    fn test_streets_are_name_ordered_and_filtered() {
        let (_dir, store) = open_temp();
        for object in [
            GeoObject::new("Tverskaya", "ул", "77000000000000100"),
            GeoObject::new("Arbat", "ул", "77000000000000200"),
            GeoObject::new("Old Arbat", "ул", "77000000000000251"),
            GeoObject::new("Central", "пр-кт", "77000001000000100"),
        ] {
            store.upsert(Table::Streets, &object).unwrap();
        }

        let moscow = GeoCode::parse("7700000000000").unwrap();
        let rows = store
            .fetch(&GeoQuery::streets(child_street_pattern(&moscow)))
            .unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Arbat", "Tverskaya"]);

        let rows = store
            .fetch(
                &GeoQuery::streets(child_street_pattern(&moscow))
                    .with_name(NamePattern::new("tver").unwrap()),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Tverskaya");
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let (_dir, store) = open_temp();
        store.places.insert("7700000000000", "not json").unwrap();

        let err = store
            .fetch(&GeoQuery::places([CodeFilter::Like(
                CodePattern::places_under(""),
            )]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "7700000000000"));
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = Builder::new().prefix("kladr-sled-").tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store
                .upsert(Table::Places, &GeoObject::new("Moscow", "г", "7700000000000"))
                .unwrap();
            store.flush().unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.len(Table::Places), 1);
        assert!(!store.is_empty());
    }
}
