use std::path::{Path, PathBuf};
use time::{Date, PrimitiveDateTime};

use super::constants::SENTINEL;
use super::cosmos::CosmosOccupation;
use super::gps::GpsSession;
use super::photo::Photo;

/// The column names of a measurement record, in output order.
///
/// Every record has exactly these columns regardless of the g-software version which
/// wrote the project file; see [`GravityMeasurement::to_record`].
pub const COLUMNS: [&str; 29] = [
    "Created",
    "Project",
    "Station Name",
    "Lat",
    "Long",
    "Elev",
    "Setup Height",
    "Transfer Height",
    "Actual Height",
    "Gradient",
    "NominalAP",
    "Polar(x)",
    "Polar(y)",
    "DF File",
    "OL File",
    "Clock",
    "Blue",
    "Red",
    "Date",
    "Time",
    "Time Offset",
    "Gravity",
    "Set Scatter",
    "Precision",
    "Uncertainty",
    "Collected",
    "Processed",
    "Transfer ht corr",
    "Comments",
];

/// One parsed `.project.txt` file.
///
/// Fields are None when the project file did not carry them (older g versions omit
/// several). The sentinel only appears once the record is serialized.
#[derive(Debug, Clone, Default)]
pub struct GravityMeasurement {
    pub path: PathBuf,
    pub version: Option<f64>,
    pub created: Option<String>,
    pub project: Option<String>,
    pub station: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub setup_height: Option<f64>,
    pub transfer_height: Option<f64>,
    pub actual_height: Option<f64>,
    pub gradient: Option<f64>,
    pub nominal_air_pressure: Option<f64>,
    pub polar_x: Option<f64>,
    pub polar_y: Option<f64>,
    pub delta_factor_file: Option<String>,
    pub ocean_load_file: Option<String>,
    pub rubidium_frequency: Option<f64>,
    pub blue_lock: Option<f64>,
    pub red_lock: Option<f64>,
    pub date: Option<Date>,
    pub time: Option<time::Time>,
    pub date_text: Option<String>,
    pub time_text: Option<String>,
    pub time_offset: Option<String>,
    pub gravity: Option<f64>,
    pub set_scatter: Option<f64>,
    pub precision: Option<f64>,
    pub uncertainty: Option<f64>,
    pub sets_collected: Option<u32>,
    pub sets_processed: Option<u32>,
    pub transfer_height_correction: Option<f64>,
    pub comments: Option<String>,
    /// Filled in by the matcher
    pub cosmic_ray: Option<CosmosOccupation>,
    /// Filled in by the matcher
    pub gps: Option<GpsSession>,
    /// Filled in by the matcher
    pub photos: Vec<Photo>,
    /// Filled in by the field sheet lookup
    pub field_sheet: Option<PathBuf>,
}

fn text_or_sentinel(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| SENTINEL.to_string())
}

fn number_or_sentinel<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| SENTINEL.to_string())
}

impl GravityMeasurement {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Default::default()
        }
    }

    /// The measurement time, the combination of the Date and Time lines
    pub fn timestamp(&self) -> Option<PrimitiveDateTime> {
        Some(PrimitiveDateTime::new(self.date?, self.time?))
    }

    pub fn station_name(&self) -> &str {
        self.station.as_deref().unwrap_or(SENTINEL)
    }

    /// Key used to look up the field sheet for this measurement
    pub fn field_sheet_key(&self) -> Option<(String, Date)> {
        Some((self.station.clone()?, self.date?))
    }

    /// Serialize to the fixed column order of [`COLUMNS`], substituting the sentinel
    /// for every absent field.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            text_or_sentinel(&self.created),
            text_or_sentinel(&self.project),
            text_or_sentinel(&self.station),
            number_or_sentinel(&self.latitude),
            number_or_sentinel(&self.longitude),
            number_or_sentinel(&self.elevation),
            number_or_sentinel(&self.setup_height),
            number_or_sentinel(&self.transfer_height),
            number_or_sentinel(&self.actual_height),
            number_or_sentinel(&self.gradient),
            number_or_sentinel(&self.nominal_air_pressure),
            number_or_sentinel(&self.polar_x),
            number_or_sentinel(&self.polar_y),
            text_or_sentinel(&self.delta_factor_file),
            text_or_sentinel(&self.ocean_load_file),
            number_or_sentinel(&self.rubidium_frequency),
            number_or_sentinel(&self.blue_lock),
            number_or_sentinel(&self.red_lock),
            text_or_sentinel(&self.date_text),
            text_or_sentinel(&self.time_text),
            text_or_sentinel(&self.time_offset),
            number_or_sentinel(&self.gravity),
            number_or_sentinel(&self.set_scatter),
            number_or_sentinel(&self.precision),
            number_or_sentinel(&self.uncertainty),
            number_or_sentinel(&self.sets_collected),
            number_or_sentinel(&self.sets_processed),
            number_or_sentinel(&self.transfer_height_correction),
            self.comments.clone().unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn test_empty_record_is_all_sentinels() {
        let record = GravityMeasurement::new(Path::new("a.project.txt")).to_record();
        assert_eq!(record.len(), COLUMNS.len());
        assert!(record[..COLUMNS.len() - 1].iter().all(|f| f == SENTINEL));
        assert_eq!(record[COLUMNS.len() - 1], "");
    }

    #[test]
    fn test_timestamp_needs_date_and_time() {
        let mut m = GravityMeasurement::new(Path::new("a.project.txt"));
        m.date = Some(date!(2018 - 08 - 19));
        assert_eq!(m.timestamp(), None);
        m.time = Some(time!(09:00:00));
        assert_eq!(m.timestamp(), Some(datetime!(2018-08-19 09:00:00)));
    }
}
