//! Records returned by the resolver.

use serde::{Deserialize, Serialize};

use super::code::{classify, Level};

/// A single row from the place or street table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoObject {
    /// Display name
    pub name: String,

    /// Abbreviation of the object type (e.g. "г", "обл", "ул")
    #[serde(rename = "type")]
    pub kind: String,

    /// 13-digit place code or 17-digit street code
    pub id: String,
}

impl GeoObject {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn level(&self) -> Level {
        classify(&self.id)
    }
}

/// Region with the areas and cities directly below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(flatten)]
    pub object: GeoObject,
    pub areas: Vec<GeoObject>,
    pub cities: Vec<GeoObject>,
}

/// Area (district) with its cities and settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    #[serde(flatten)]
    pub object: GeoObject,
    pub cities: Vec<GeoObject>,
    pub settlements: Vec<GeoObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(flatten)]
    pub object: GeoObject,
    pub streets: Vec<GeoObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    #[serde(flatten)]
    pub object: GeoObject,
    pub streets: Vec<GeoObject>,
}

/// A resolved node of the hierarchy, tagged by its level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Resolved {
    Region(Region),
    Area(Area),
    City(City),
    Settlement(Settlement),
}

impl Resolved {
    pub fn level(&self) -> Level {
        match self {
            Resolved::Region(_) => Level::Region,
            Resolved::Area(_) => Level::Area,
            Resolved::City(_) => Level::City,
            Resolved::Settlement(_) => Level::Settlement,
        }
    }

    /// The node itself, without children.
    pub fn object(&self) -> &GeoObject {
        match self {
            Resolved::Region(r) => &r.object,
            Resolved::Area(a) => &a.object,
            Resolved::City(c) => &c.object,
            Resolved::Settlement(s) => &s.object,
        }
    }
}

/// Name search hits partitioned by level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub regions: Vec<GeoObject>,
    pub areas: Vec<GeoObject>,
    pub cities: Vec<GeoObject>,
    pub settlements: Vec<GeoObject>,
}

impl SearchResult {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    /// Bucket for a level. Streets have no bucket.
    pub fn bucket_mut(&mut self, level: Level) -> Option<&mut Vec<GeoObject>> {
        match level {
            Level::Region => Some(&mut self.regions),
            Level::Area => Some(&mut self.areas),
            Level::City => Some(&mut self.cities),
            Level::Settlement => Some(&mut self.settlements),
            Level::Street => None,
        }
    }

    /// All hits, regions first.
    pub fn iter(&self) -> impl Iterator<Item = &GeoObject> {
        self.regions
            .iter()
            .chain(&self.areas)
            .chain(&self.cities)
            .chain(&self.settlements)
    }

    pub fn len(&self) -> usize {
        self.regions.len() + self.areas.len() + self.cities.len() + self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
