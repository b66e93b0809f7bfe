//! Fixed-width KLADR codes and the hierarchy level they name.
//!
//! A populated-place code is 13 digits: `SS RRR GGG PPP AA` (region, area,
//! city, settlement, type suffix). Street rows use the 11-digit place prefix,
//! a 4-digit street ordinal and the same 2-digit suffix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CodeError;

/// Digits in a populated-place code.
pub const CODE_LEN: usize = 13;

/// Digits in a street code.
pub const STREET_CODE_LEN: usize = 17;

/// Suffix marking an actual (populated-place level) row.
pub const TYPE_SUFFIX: &str = "00";

/// Hierarchy level named by a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Subject of the federation (digits 1-2)
    Region,
    /// District within a region (digits 3-5)
    Area,
    /// City within a region or area (digits 6-8)
    City,
    /// Settlement within an area or city (digits 9-11)
    Settlement,
    /// Row from the street table
    Street,
}

impl Level {
    /// Number of leading digits that identify a node of this level.
    pub fn prefix_len(&self) -> usize {
        match self {
            Level::Region => 2,
            Level::Area => 5,
            Level::City => 8,
            Level::Settlement => 11,
            Level::Street => 15,
        }
    }

    /// Length of the all-zero tail that codes of this level carry.
    pub fn zero_tail(&self) -> usize {
        match self {
            Level::Region => 11,
            Level::Area => 8,
            Level::City => 5,
            Level::Settlement | Level::Street => 2,
        }
    }

    /// Width of the codes stored for this level.
    pub fn code_len(&self) -> usize {
        match self {
            Level::Street => STREET_CODE_LEN,
            _ => CODE_LEN,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            Level::Region => "region",
            Level::Area => "area",
            Level::City => "city",
            Level::Settlement => "settlement",
            Level::Street => "street",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Classify a code by its trailing zero run.
///
/// A suffix other than `00`, or a street-width code, is always a street.
/// Otherwise the longest zero run wins: 10 zeros after the region make a
/// region, 8 an area, 5 a city, anything else a settlement.
pub fn classify(code: &str) -> Level {
    if code.len() == STREET_CODE_LEN || !code.ends_with(TYPE_SUFFIX) {
        return Level::Street;
    }
    if code.ends_with("0000000000") {
        Level::Region
    } else if code.ends_with("00000000") {
        Level::Area
    } else if code.ends_with("00000") {
        Level::City
    } else {
        Level::Settlement
    }
}

/// Check that `code` is exactly `expected` ASCII digits.
pub fn check_digits(code: &str, expected: usize) -> Result<(), CodeError> {
    let len = code.chars().count();
    if len != expected {
        return Err(CodeError::WrongLength { expected, len });
    }
    match code.chars().enumerate().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, found)) => Err(CodeError::NonDigit {
            position: idx + 1,
            found,
        }),
        None => Ok(()),
    }
}

/// A validated 13-digit populated-place code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeoCode(String);

impl GeoCode {
    pub fn parse(code: &str) -> Result<Self, CodeError> {
        check_digits(code, CODE_LEN)?;
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Level this code names.
    pub fn level(&self) -> Level {
        classify(&self.0)
    }

    /// First `len` digits of the code.
    pub fn prefix(&self, len: usize) -> &str {
        &self.0[..len.min(CODE_LEN)]
    }

    /// Two-digit region number.
    pub fn region(&self) -> &str {
        self.prefix(Level::Region.prefix_len())
    }
}

impl FromStr for GeoCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GeoCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_digits(&value, CODE_LEN)?;
        Ok(Self(value))
    }
}

impl From<GeoCode> for String {
    fn from(code: GeoCode) -> Self {
        code.0
    }
}

impl AsRef<str> for GeoCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_levels() {
        assert_eq!(classify("7700000000000"), Level::Region);
        assert_eq!(classify("7701100000000"), Level::Area);
        assert_eq!(classify("7701100100000"), Level::City);
        assert_eq!(classify("7701100100100"), Level::Settlement);
        assert_eq!(classify("7701100100123"), Level::Street);
    }

    #[test]
    fn test_region_wins_over_area() {
        // A region code also ends in 8 and 5 zeros.
        assert_eq!(classify("0100000000000"), Level::Region);
        assert_eq!(classify("9900000000000"), Level::Region);
    }

    #[test]
    fn test_classify_ignores_leading_digits() {
        for region in ["01", "23", "50", "77", "99"] {
            assert_eq!(classify(&format!("{region}00000000000")), Level::Region);
            assert_eq!(classify(&format!("{region}12300000000")), Level::Area);
            assert_eq!(classify(&format!("{region}00045600000")), Level::City);
            assert_eq!(classify(&format!("{region}12345600000")), Level::City);
            assert_eq!(classify(&format!("{region}00000078900")), Level::Settlement);
            assert_eq!(classify(&format!("{region}12300078951")), Level::Street);
        }
    }

    #[test]
    fn test_street_width_code_is_street() {
        assert_eq!(classify("77000000000000100"), Level::Street);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            GeoCode::parse("770000000000"),
            Err(CodeError::WrongLength {
                expected: 13,
                len: 12
            })
        );
        assert!(GeoCode::parse("77000000000000").is_err());
        assert!(GeoCode::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert_eq!(
            GeoCode::parse("77000x0000000"),
            Err(CodeError::NonDigit {
                position: 6,
                found: 'x'
            })
        );
        // Thirteen characters, but not ASCII digits.
        assert!(matches!(
            GeoCode::parse("77000000000٠0"),
            Err(CodeError::NonDigit { position: 12, .. })
        ));
    }

    #[test]
    fn test_code_prefixes() {
        let code = GeoCode::parse("7701100100100").unwrap();
        assert_eq!(code.region(), "77");
        assert_eq!(code.prefix(Level::Area.prefix_len()), "77011");
        assert_eq!(code.prefix(Level::Settlement.prefix_len()), "77011001001");
        assert_eq!(code.level(), Level::Settlement);
    }

    #[test]
    fn test_serde_validates() {
        let code: GeoCode = serde_json::from_str("\"7700000000000\"").unwrap();
        assert_eq!(code.level(), Level::Region);
        assert!(serde_json::from_str::<GeoCode>("\"77\"").is_err());
    }
}
