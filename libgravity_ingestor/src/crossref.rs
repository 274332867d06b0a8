use std::fs::File;
use std::io::Read;
use std::path::Path;

use fxhash::FxHashMap;

use super::constants::SITE_ID_LENGTH;
use super::error::CrossRefError;

const ENTRIES_PER_LINE: usize = 2; // station, site id

fn is_site_id(text: &str) -> bool {
    text.len() == SITE_ID_LENGTH && text.bytes().all(|b| b.is_ascii_digit())
}

/// SiteCrossRef maps gravity station names to the 15-digit identifiers of the hydrological
/// monitoring network.
///
/// The table is a CSV file with one `station,site_id` pair per row. Station names are
/// matched without regard to case.
#[derive(Debug, Clone, Default)]
pub struct SiteCrossRef {
    map: FxHashMap<String, String>,
}

impl SiteCrossRef {
    /// Load a cross-reference table from a file
    pub fn new(path: &Path) -> Result<Self, CrossRefError> {
        let mut contents = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
        Self::from_contents(&contents)
    }

    /// Parse a cross-reference table. A first row whose id column is not numeric is taken
    /// as a header.
    pub fn from_contents(contents: &str) -> Result<Self, CrossRefError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(contents.as_bytes());
        let mut table = Self::default();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 1);
            if record.iter().all(|e| e.is_empty()) {
                continue;
            }
            if record.len() != ENTRIES_PER_LINE {
                return Err(CrossRefError::BadFileFormat(line));
            }
            let (station, site_id) = (&record[0], &record[1]);
            if !is_site_id(site_id) {
                if idx == 0 && !site_id.bytes().any(|b| b.is_ascii_digit()) {
                    continue;
                }
                return Err(CrossRefError::BadSiteId(
                    station.to_string(),
                    site_id.to_string(),
                ));
            }
            table.map.insert(station.to_uppercase(), site_id.to_string());
        }
        Ok(table)
    }

    /// The site id for a station. A station named by its own site id maps to itself.
    pub fn lookup<'a>(&'a self, station: &'a str) -> Option<&'a str> {
        if is_site_id(station) {
            return Some(station);
        }
        self.map.get(&station.to_uppercase()).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "grav,nwis\nRM109,344700106300001\nAbq_Well,350512106391201\n\n";

    #[test]
    fn test_lookup_ignores_case() {
        let table = SiteCrossRef::from_contents(TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("rm109"), Some("344700106300001"));
        assert_eq!(table.lookup("ABQ_WELL"), Some("350512106391201"));
        assert_eq!(table.lookup("RM110"), None);
    }

    #[test]
    fn test_site_id_maps_to_itself() {
        let table = SiteCrossRef::default();
        assert_eq!(table.lookup("344700106300001"), Some("344700106300001"));
        assert_eq!(table.lookup("34470010630000"), None);
    }

    #[test]
    fn test_bad_rows() {
        assert!(matches!(
            SiteCrossRef::from_contents("RM109,3447001063"),
            Err(CrossRefError::BadSiteId(_, _))
        ));
        assert!(matches!(
            SiteCrossRef::from_contents("RM109,344700106300001\nRM110"),
            Err(CrossRefError::BadFileFormat(2))
        ));
        assert!(SiteCrossRef::new(Path::new("no/such/crossref.csv")).is_err());
    }

    #[test]
    fn test_quoted_station_name() {
        let text = "\"Well, North\",344700106300001\nRM109,350512106391201\n";
        let table = SiteCrossRef::from_contents(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("well, north"), Some("344700106300001"));
    }
}
