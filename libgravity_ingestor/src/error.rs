use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectFileError {
    #[error("Could not open project file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Project file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Error)]
pub enum TimestampError {
    #[error("Could not parse date from {0:?}")]
    BadDate(String),
    #[error("Could not parse time of day from {0:?}")]
    BadTime(String),
    #[error("Could not parse timestamp from {0:?}")]
    BadTimestamp(String),
}

#[derive(Debug, Error)]
pub enum CosmosError {
    #[error("Could not open COSMOS log because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("COSMOS log failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("COSMOS log failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("COSMOS log {0:?} contained no usable records")]
    NoRecords(PathBuf),
}

#[derive(Debug, Error)]
pub enum GpsError {
    #[error("Could not open GPS session because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("GPS session failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Converter {0} could not be launched: {1}")]
    ConverterUnavailable(String, std::io::Error),
    #[error("Converter {program} exited with status {status} for file {file:?}")]
    ConverterFailed {
        program: String,
        status: std::process::ExitStatus,
        file: PathBuf,
    },
    #[error("RINEX file {0:?} could not be read: {1}")]
    RinexError(PathBuf, String),
    #[error("RINEX file {0:?} is not an observation file")]
    NotObservation(PathBuf),
    #[error("RINEX file {0:?} contained no observation epochs")]
    NoEpochs(PathBuf),
    #[error("GPS session failed due to bad epoch: {0}")]
    BadEpoch(#[from] TimestampError),
}

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Photo failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Photo failed to read EXIF data: {0}")]
    ExifError(#[from] exif::Error),
    #[error("EXIF date tag not found in photo {0:?}")]
    MissingDateTag(PathBuf),
    #[error("EXIF date tag in photo {0:?} could not be read")]
    BadDateTag(PathBuf),
    #[error("Photo directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),
}

#[derive(Debug, Error)]
pub enum FieldSheetError {
    #[error("FieldSheetIndex failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Field sheet {0:?} is not named <station>_<YYYY-MM-DD>.pdf")]
    BadFileName(PathBuf),
}

#[derive(Debug, Error)]
pub enum CrossRefError {
    #[error("SiteCrossRef failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("SiteCrossRef failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("SiteCrossRef was given a file with the incorrect format; line {0} does not have two columns")]
    BadFileFormat(usize),
    #[error("Invalid site id {1:?} for station {0}; site ids have 15 digits")]
    BadSiteId(String, String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has a bad date: {0}")]
    BadDate(#[from] TimestampError),
    #[error("Config date window is empty: start {0} is after end {1}")]
    EmptyDateWindow(String, String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Export failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Plan action failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Plan action failed due to COSMOS error: {0}")]
    CosmosError(#[from] CosmosError),
    #[error("Plan action source {0:?} does not exist")]
    MissingSource(PathBuf),
    #[error("Could not place {0:?} in the project tree: {1}")]
    BadProjectPath(PathBuf, String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to SiteCrossRef error: {0}")]
    CrossRefError(#[from] CrossRefError),
    #[error("Processor failed due to Export error: {0}")]
    ExportError(#[from] ExportError),
}
