//! Code and name patterns.
//!
//! Every query the resolver issues is expressed as a fixed-width code pattern
//! in SQL `LIKE` syntax (`_` matches one digit) plus an optional name filter.
//! All code patterns come from [`CodePattern::fill`], so the prefix length and
//! zero tail of each query shape are visible in one place.

use std::fmt;

use crate::models::{GeoCode, Level, CODE_LEN};

const ANY_DIGIT: char = '_';
const ANY_RUN: char = '%';

/// Fixed-width code pattern: a literal prefix, free positions, then zeros.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodePattern(String);

impl CodePattern {
    /// Keep `prefix`, leave positions up to `width - zero_tail` free and end
    /// with `zero_tail` zeros. A prefix overlapping the tail is truncated.
    pub fn fill(prefix: &str, width: usize, zero_tail: usize) -> Self {
        let free_end = width.saturating_sub(zero_tail);
        let prefix = &prefix[..prefix.len().min(free_end)];

        let mut pattern = String::with_capacity(width);
        pattern.push_str(prefix);
        pattern.extend(std::iter::repeat(ANY_DIGIT).take(free_end - prefix.len()));
        pattern.extend(std::iter::repeat('0').take(width - free_end));
        Self(pattern)
    }

    /// Codes below `parent` at `child` level.
    ///
    /// `keep` is how many leading digits of the parent the children share.
    pub fn children(parent: &GeoCode, keep: usize, child: Level) -> Self {
        Self::fill(parent.prefix(keep), child.code_len(), child.zero_tail())
    }

    /// Every populated-place row whose code starts with `prefix`.
    pub fn places_under(prefix: &str) -> Self {
        Self::fill(prefix, CODE_LEN, Level::Settlement.zero_tail())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, code: &str) -> bool {
        code.len() == self.0.len()
            && self
                .0
                .bytes()
                .zip(code.bytes())
                .all(|(p, c)| p == ANY_DIGIT as u8 || p == c)
    }

    /// Literal digits before the first wildcard.
    pub fn literal_prefix(&self) -> &str {
        match self.0.find(ANY_DIGIT) {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for CodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Areas directly below a region: `RR___00000000`.
pub fn child_area_pattern(region: &GeoCode) -> CodePattern {
    CodePattern::children(region, Level::Region.prefix_len(), Level::Area)
}

/// Cities attached to a region without an area: `RR000___00000`.
pub fn child_city_pattern(region: &GeoCode) -> CodePattern {
    CodePattern::children(region, Level::Area.prefix_len(), Level::City)
}

/// Cities and settlements of an area: `RRAAA______00`.
pub fn child_city_and_settlement_pattern(area: &GeoCode) -> CodePattern {
    CodePattern::children(area, Level::Area.prefix_len(), Level::Settlement)
}

/// Streets of a city or settlement: `RRAAACCCSSS____00`.
pub fn child_street_pattern(place: &GeoCode) -> CodePattern {
    CodePattern::children(place, Level::Settlement.prefix_len(), Level::Street)
}

/// Every region: `__00000000000`.
pub fn region_pattern() -> CodePattern {
    CodePattern::fill("", CODE_LEN, Level::Region.zero_tail())
}

/// Places a name search looks at, narrowed by the scope's own level.
///
/// Region scope keeps the region digits, area scope the region and area
/// digits. Any other scope, or none, searches every populated place.
pub fn search_pattern(scope: Option<&GeoCode>) -> CodePattern {
    let prefix = match scope.map(|code| (code, code.level())) {
        Some((code, Level::Region)) => code.region(),
        Some((code, Level::Area)) => code.prefix(Level::Area.prefix_len()),
        Some((_, Level::City | Level::Settlement | Level::Street)) | None => "",
    };
    CodePattern::places_under(prefix)
}

/// Case-insensitive `LIKE` filter on names.
///
/// `%` matches any run of characters and `_` a single one. Text without
/// wildcards is matched as a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePattern {
    raw: String,
    folded: Vec<char>,
}

impl NamePattern {
    /// Returns `None` for blank input.
    pub fn new(query: &str) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let mut raw = query.to_string();
        if !raw.contains(&[ANY_DIGIT, ANY_RUN][..]) {
            raw.push(ANY_RUN);
        }
        let folded = raw.to_uppercase().chars().collect();
        Some(Self { raw, folded })
    }

    /// Matches every name.
    pub fn any() -> Self {
        Self {
            raw: ANY_RUN.to_string(),
            folded: vec![ANY_RUN],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        let text: Vec<char> = name.to_uppercase().chars().collect();
        like_match(&self.folded, &text)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// `LIKE` matching with single-star backtracking.
fn like_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(&ANY_RUN) => {
                resume = Some((p, t));
                p += 1;
            }
            Some(&c) if c == ANY_DIGIT || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((star, start)) => {
                    p = star + 1;
                    t = start + 1;
                    resume = Some((star, start + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == ANY_RUN)
}
