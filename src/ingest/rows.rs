use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use tracing::warn;

use kladr::models::check_digits;
use kladr::store::Table;
use kladr::GeoObject;

/// Column positions of a classifier export.
#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    socr: usize,
    code: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .with_context(|| format!("Column '{}' not found", column))
        };
        Ok(Self {
            name: find("name")?,
            socr: find("socr")?,
            code: find("code")?,
        })
    }
}

/// Outcome of loading one export.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub skipped: usize,
}

/// Width of the codes a table stores.
fn code_width(table: Table) -> usize {
    match table {
        Table::Places => kladr::models::CODE_LEN,
        Table::Streets => kladr::models::STREET_CODE_LEN,
    }
}

/// Count data records so the progress bar has a length.
pub fn count_records<R: Read>(reader: R, delimiter: u8) -> Result<u64> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(reader);
    let mut count = 0u64;
    for record in csv_reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

/// Read `name, socr, code` rows and hand every valid one to `sink`.
///
/// Rows whose code has the wrong width or non-digit characters are skipped.
pub fn load_rows<R, F>(reader: R, delimiter: u8, table: Table, mut sink: F) -> Result<LoadStats>
where
    R: Read,
    F: FnMut(GeoObject) -> Result<()>,
{
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::locate(csv_reader.headers()?)?;
    let width = code_width(table);
    let mut stats = LoadStats::default();

    for (line, result) in csv_reader.records().enumerate() {
        let record = result?;
        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();

        let code = field(columns.code);
        if let Err(err) = check_digits(code, width) {
            // Header is line 1.
            warn!("Skipping {} row {}: code {:?}: {}", table.name(), line + 2, code, err);
            stats.skipped += 1;
            continue;
        }

        sink(GeoObject::new(field(columns.name), field(columns.socr), code))?;
        stats.loaded += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_places() {
        let data = "NAME,SOCR,CODE,INDEX\n\
                    Москва,г,7700000000000,\n\
                    Зеленоград,г,7700000100000,124482\n\
                    Broken,г,77000,\n";
        let mut rows = Vec::new();
        let stats = load_rows(data.as_bytes(), b',', Table::Places, |row| {
            rows.push(row);
            Ok(())
        })
        .unwrap();

        assert_eq!(stats, LoadStats { loaded: 2, skipped: 1 });
        assert_eq!(rows[0], GeoObject::new("Москва", "г", "7700000000000"));
        assert_eq!(rows[1].id, "7700000100000");
    }

    #[test]
    fn test_load_streets_checks_street_width() {
        let data = "code;name;socr\n\
                    77000000000000100;Тверская;ул\n\
                    7700000000000;Not a street;ул\n";
        let mut rows = Vec::new();
        let stats = load_rows(data.as_bytes(), b';', Table::Streets, |row| {
            rows.push(row);
            Ok(())
        })
        .unwrap();

        assert_eq!(stats, LoadStats { loaded: 1, skipped: 1 });
        assert_eq!(rows[0].name, "Тверская");
    }

    #[test]
    fn test_missing_column() {
        let data = "name,code\nМосква,7700000000000\n";
        let err = load_rows(data.as_bytes(), b',', Table::Places, |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("socr"));
    }

    #[test]
    fn test_count_records() {
        let data = "name,socr,code\na,г,7700000000000\nb,г,7700000100000\n";
        assert_eq!(count_records(data.as_bytes(), b',').unwrap(), 2);
    }
}
