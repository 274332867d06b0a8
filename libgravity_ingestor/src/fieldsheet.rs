use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use time::Date;

use super::error::FieldSheetError;
use super::measurement::GravityMeasurement;
use super::status::SkipNote;
use super::timestamp::{format_date, parse_iso_date, DateWindow};

/// Split a field sheet name, `<station>_<YYYY-MM-DD>.pdf`, into its key.
///
/// The station part may itself contain underscores; only the last one separates the date.
pub fn parse_file_name(path: &Path) -> Result<(String, Date), FieldSheetError> {
    let bad = || FieldSheetError::BadFileName(path.to_path_buf());
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(bad)?;
    let (station, date) = stem.rsplit_once('_').ok_or_else(bad)?;
    if station.is_empty() {
        return Err(bad());
    }
    let date = parse_iso_date(date).map_err(|_| bad())?;
    Ok((station.to_string(), date))
}

fn is_field_sheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Scanned field sheets, keyed by station name and measurement date
#[derive(Debug, Clone, Default)]
pub struct FieldSheetIndex {
    sheets: FxHashMap<(String, Date), PathBuf>,
}

impl FieldSheetIndex {
    /// Index the PDFs directly inside `dir` whose date falls in the window. Badly named
    /// PDFs are noted and left out.
    pub fn from_dir(
        dir: &Path,
        window: &DateWindow,
    ) -> Result<(Self, Vec<SkipNote>), FieldSheetError> {
        let mut index = Self::default();
        let mut notes = Vec::new();
        let mut paths: Vec<PathBuf> = Vec::new();
        for item in dir.read_dir()? {
            let path = item?.path();
            if path.is_file() && is_field_sheet(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match parse_file_name(&path) {
                Ok(key) => {
                    if window.contains(key.1) {
                        index.insert(key, path);
                    }
                }
                Err(e) => {
                    log::warn!("{e}");
                    notes.push(SkipNote::new(&path, e));
                }
            }
        }
        log::info!("Indexed {} field sheets in {dir:?}", index.len());
        Ok((index, notes))
    }

    pub fn insert(&mut self, key: (String, Date), path: PathBuf) {
        self.sheets.insert(key, path);
    }

    pub fn lookup(&self, station: &str, date: Date) -> Option<&PathBuf> {
        self.sheets.get(&(station.to_string(), date))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Attach each measurement's field sheet. Returns how many were found; a missing sheet is
/// only logged.
pub fn assign_field_sheets(
    measurements: &mut [GravityMeasurement],
    index: &FieldSheetIndex,
) -> usize {
    let mut found = 0;
    for measurement in measurements.iter_mut() {
        let Some((station, date)) = measurement.field_sheet_key() else {
            continue;
        };
        match index.lookup(&station, date) {
            Some(path) => {
                measurement.field_sheet = Some(path.clone());
                found += 1;
            }
            None => log::info!(
                "Could not find field sheet: {station} {}",
                format_date(date)
            ),
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name(Path::new("sheets/ABQ1_2018-08-19.pdf")).unwrap(),
            (String::from("ABQ1"), date!(2018 - 08 - 19))
        );
        assert_eq!(
            parse_file_name(Path::new("RG_North_Well_2018-08-20.pdf")).unwrap(),
            (String::from("RG_North_Well"), date!(2018 - 08 - 20))
        );
        assert!(parse_file_name(Path::new("ABQ1.pdf")).is_err());
        assert!(parse_file_name(Path::new("ABQ1_19-08-2018.pdf")).is_err());
        assert!(parse_file_name(Path::new("_2018-08-19.pdf")).is_err());
    }

    #[test]
    fn test_index_from_dir() {
        let dir = std::env::temp_dir().join("gravity_ingestor_fieldsheet_test");
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "ABQ1_2018-08-19.pdf",
            "ABQ2_2018-06-01.pdf",
            "notes.pdf",
            "ABQ3_2018-08-19.txt",
        ] {
            std::fs::write(dir.join(name), b"%PDF").unwrap();
        }
        let window = DateWindow::new(date!(2018 - 08 - 01), date!(2018 - 08 - 31));
        let (index, notes) = FieldSheetIndex::from_dir(&dir, &window).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.lookup("ABQ1", date!(2018 - 08 - 19)),
            Some(&dir.join("ABQ1_2018-08-19.pdf"))
        );
        assert_eq!(index.lookup("ABQ2", date!(2018 - 06 - 01)), None);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].subject, dir.join("notes.pdf"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_assign_field_sheets() {
        let mut index = FieldSheetIndex::default();
        index.insert(
            (String::from("ABQ1"), date!(2018 - 08 - 19)),
            PathBuf::from("ABQ1_2018-08-19.pdf"),
        );
        let mut found = GravityMeasurement::new(Path::new("a.project.txt"));
        found.station = Some(String::from("ABQ1"));
        found.date = Some(date!(2018 - 08 - 19));
        let mut missing = found.clone();
        missing.date = Some(date!(2018 - 08 - 20));

        let mut measurements = vec![found, missing];
        assert_eq!(assign_field_sheets(&mut measurements, &index), 1);
        assert_eq!(
            measurements[0].field_sheet,
            Some(PathBuf::from("ABQ1_2018-08-19.pdf"))
        );
        assert_eq!(measurements[1].field_sheet, None);
    }
}
