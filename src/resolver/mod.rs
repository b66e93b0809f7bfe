//! Code hierarchy resolver.
//!
//! Turns a code or a name into storage queries and sorts the returned rows
//! into the hierarchy by [`classify`].

pub mod pattern;

use tracing::{debug, warn};

use crate::error::{CodeError, ResolveError, Result};
use crate::models::{
    classify, Area, City, GeoCode, GeoObject, Level, Region, Resolved, SearchResult, Settlement,
};
use crate::store::{CodeFilter, GeoQuery, GeoStore, Order};
use pattern::{
    child_area_pattern, child_city_and_settlement_pattern, child_city_pattern,
    child_street_pattern, region_pattern, search_pattern, NamePattern,
};

/// Resolves codes and name searches against an injected store.
pub struct Resolver<S> {
    store: S,
}

impl<S: GeoStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch one node and its direct children.
    pub fn resolve(&self, code: &str) -> Result<Resolved> {
        let code = parse_code(code)?;
        match code.level() {
            Level::Region => self.region(&code).map(Resolved::Region),
            Level::Area => self.area(&code).map(Resolved::Area),
            Level::City => {
                let (object, streets) = self.place_with_streets(&code)?;
                Ok(Resolved::City(City { object, streets }))
            }
            Level::Settlement => {
                let (object, streets) = self.place_with_streets(&code)?;
                Ok(Resolved::Settlement(Settlement { object, streets }))
            }
            Level::Street => Err(ResolveError::malformed(code.as_str(), CodeError::StreetLevel)),
        }
    }

    /// Every region, code-ordered, without children.
    pub fn list_regions(&self) -> Result<Vec<GeoObject>> {
        self.fetch(&GeoQuery::places([CodeFilter::Like(region_pattern())]))
    }

    /// Case-insensitive name search over populated places.
    ///
    /// `scope` narrows the search to a region or an area; a city or settlement
    /// scope searches everything, like no scope.
    pub fn search(&self, name: &str, scope: Option<&str>) -> Result<SearchResult> {
        let scope = scope.map(parse_code).transpose()?;
        let filter = NamePattern::new(name).ok_or(ResolveError::EmptyName)?;

        let query = GeoQuery::places([CodeFilter::Like(search_pattern(scope.as_ref()))])
            .with_name(filter)
            .ordered_by(Order::Name);

        let mut result = SearchResult::new(name);
        for object in self.fetch(&query)? {
            let level = classify(&object.id);
            match result.bucket_mut(level) {
                Some(bucket) => bucket.push(object),
                None => warn!("Street row {} returned by place search", object.id),
            }
        }

        debug!(
            "Search '{}' matched {} regions, {} areas, {} cities, {} settlements",
            name,
            result.regions.len(),
            result.areas.len(),
            result.cities.len(),
            result.settlements.len()
        );
        Ok(result)
    }

    /// Streets of a populated place whose name matches `name`, name-ordered.
    pub fn search_streets(&self, code: &str, name: &str) -> Result<Vec<GeoObject>> {
        let code = parse_code(code)?;
        if code.level() == Level::Street {
            return Err(ResolveError::malformed(code.as_str(), CodeError::StreetLevel));
        }
        let filter = NamePattern::new(name).ok_or(ResolveError::EmptyName)?;
        self.fetch(&GeoQuery::streets(child_street_pattern(&code)).with_name(filter))
    }

    fn region(&self, code: &GeoCode) -> Result<Region> {
        let query = GeoQuery::places([
            CodeFilter::Exact(code.clone()),
            CodeFilter::Like(child_area_pattern(code)),
            CodeFilter::Like(child_city_pattern(code)),
        ])
        .ordered_by(Order::Name);

        let mut object = None;
        let mut areas = Vec::new();
        let mut cities = Vec::new();
        for row in self.fetch(&query)? {
            if row.id == code.as_str() {
                object = Some(row);
                continue;
            }
            match classify(&row.id) {
                Level::Area => areas.push(row),
                Level::City => cities.push(row),
                Level::Region | Level::Settlement | Level::Street => {
                    debug!("Skipping {} under region {}", row.id, code)
                }
            }
        }

        let object = object.ok_or_else(|| not_found(code))?;
        Ok(Region {
            object,
            areas,
            cities,
        })
    }

    fn area(&self, code: &GeoCode) -> Result<Area> {
        let query = GeoQuery::places([CodeFilter::Like(child_city_and_settlement_pattern(code))])
            .ordered_by(Order::Name);

        let mut object = None;
        let mut cities = Vec::new();
        let mut settlements = Vec::new();
        for row in self.fetch(&query)? {
            if row.id == code.as_str() {
                object = Some(row);
                continue;
            }
            match classify(&row.id) {
                Level::City => cities.push(row),
                Level::Settlement => settlements.push(row),
                Level::Region | Level::Area | Level::Street => {
                    debug!("Skipping {} under area {}", row.id, code)
                }
            }
        }

        let object = object.ok_or_else(|| not_found(code))?;
        Ok(Area {
            object,
            cities,
            settlements,
        })
    }

    /// Self row, then its streets. The second query only runs if the first found the node.
    fn place_with_streets(&self, code: &GeoCode) -> Result<(GeoObject, Vec<GeoObject>)> {
        let object = self
            .fetch(&GeoQuery::places([CodeFilter::Exact(code.clone())]))?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(code))?;

        let streets = self.fetch(&GeoQuery::streets(child_street_pattern(code)))?;
        Ok((object, streets))
    }

    fn fetch(&self, query: &GeoQuery) -> Result<Vec<GeoObject>> {
        debug!("{}", query);
        self.store
            .fetch(query)
            .map_err(|err| ResolveError::from_store(query, err))
    }
}

fn parse_code(code: &str) -> Result<GeoCode> {
    GeoCode::parse(code).map_err(|err| ResolveError::malformed(code, err))
}

fn not_found(code: &GeoCode) -> ResolveError {
    ResolveError::NotFound {
        code: code.to_string(),
    }
}
