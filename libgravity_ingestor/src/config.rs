use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};

use super::constants::{
    COSMIC_RAY_THRESHOLD_SECS, GPS_THRESHOLD_SECS, PHOTO_THRESHOLD_SECS, START_DATE_OFFSET_DAYS,
};
use super::error::ConfigError;
use super::gps::ConverterConfig;
use super::timestamp::{format_date, parse_iso_date, DateWindow};

/// Structure representing the application configuration. Contains pathing and matching information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Laptop backup of the g software output, searched for project files
    pub project_path: PathBuf,
    /// Archive the project tree is mirrored into
    pub working_path: PathBuf,
    pub cosmos_path: Option<PathBuf>,
    pub gps_path: Option<PathBuf>,
    pub photo_path: Option<PathBuf>,
    pub fieldsheet_path: Option<PathBuf>,
    pub site_description_path: PathBuf,
    pub crossref_path: Option<PathBuf>,
    /// First day of measurements to ingest, YYYY-MM-DD (inclusive)
    pub start_date: String,
    /// Last day of measurements to ingest, YYYY-MM-DD (inclusive)
    pub end_date: String,
    pub copy_project_files: bool,
    /// Hours the camera clock runs ahead of the gravity meter
    pub photo_hour_offset: i64,
    /// Remove photos and field sheets once they are copied
    pub delete_copied: bool,
    pub cosmic_ray_threshold_secs: i64,
    pub gps_threshold_secs: i64,
    pub photo_threshold_secs: i64,
    pub converter: ConverterConfig,
}

impl Default for Config {
    /// Generate a new Config object. Paths are placeholders, and the date window covers the
    /// last sixty days.
    fn default() -> Self {
        let today = OffsetDateTime::now_utc().date();
        Self {
            project_path: PathBuf::from("Laptop_gdata_backup"),
            working_path: PathBuf::from("Working Data"),
            cosmos_path: None,
            gps_path: None,
            photo_path: None,
            fieldsheet_path: None,
            site_description_path: PathBuf::from("Site Descriptions"),
            crossref_path: None,
            start_date: format_date(today - Duration::days(START_DATE_OFFSET_DAYS)),
            end_date: format_date(today),
            copy_project_files: true,
            photo_hour_offset: 0,
            delete_copied: true,
            cosmic_ray_threshold_secs: COSMIC_RAY_THRESHOLD_SECS,
            gps_threshold_secs: GPS_THRESHOLD_SECS,
            photo_threshold_secs: PHOTO_THRESHOLD_SECS,
            converter: ConverterConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// The inclusive window of measurement dates to ingest
    pub fn date_window(&self) -> Result<DateWindow, ConfigError> {
        let start = parse_iso_date(&self.start_date)?;
        let end = parse_iso_date(&self.end_date)?;
        if start > end {
            return Err(ConfigError::EmptyDateWindow(
                self.start_date.clone(),
                self.end_date.clone(),
            ));
        }
        Ok(DateWindow::new(start, end))
    }

    /// Where a file under the project tree lands in the working tree
    pub fn get_working_path(&self, project_file: &Path) -> Result<PathBuf, ConfigError> {
        match project_file.strip_prefix(&self.project_path) {
            Ok(relative) => Ok(self.working_path.join(relative)),
            Err(_) => Err(ConfigError::BadFilePath(project_file.to_path_buf())),
        }
    }

    pub fn cosmic_ray_threshold(&self) -> Duration {
        Duration::seconds(self.cosmic_ray_threshold_secs)
    }

    pub fn gps_threshold(&self) -> Duration {
        Duration::seconds(self.gps_threshold_secs)
    }

    pub fn photo_threshold(&self) -> Duration {
        Duration::seconds(self.photo_threshold_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.project_path, config.project_path);
        assert_eq!(back.start_date, config.start_date);
        assert_eq!(back.converter.dat_to_rinex, "teqc");
        let window = back.date_window().unwrap();
        assert_eq!(window.end - window.start, Duration::days(START_DATE_OFFSET_DAYS));
    }

    #[test]
    fn test_date_window() {
        let mut config = Config::default();
        config.start_date = String::from("2018-08-01");
        config.end_date = String::from("2018-08-31");
        assert_eq!(
            config.date_window().unwrap(),
            DateWindow::new(date!(2018 - 08 - 01), date!(2018 - 08 - 31))
        );
        config.end_date = String::from("2018-07-31");
        assert!(matches!(
            config.date_window(),
            Err(ConfigError::EmptyDateWindow(_, _))
        ));
        config.end_date = String::from("08/31/2018");
        assert!(matches!(config.date_window(), Err(ConfigError::BadDate(_))));
    }

    #[test]
    fn test_working_path() {
        let mut config = Config::default();
        config.project_path = PathBuf::from("/data/Laptop_gdata_backup");
        config.working_path = PathBuf::from("/archive/Working Data");
        let file = Path::new("/data/Laptop_gdata_backup/ABQ/ABQ1/2018-08-19/ABQ1.project.txt");
        assert_eq!(
            config.get_working_path(file).unwrap(),
            PathBuf::from("/archive/Working Data/ABQ/ABQ1/2018-08-19/ABQ1.project.txt")
        );
        assert!(config.get_working_path(Path::new("/elsewhere/x.project.txt")).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            Config::read_config_file(Path::new("no/such/config.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }
}
