use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::PrimitiveDateTime;

use super::error::CosmosError;
use super::matcher::{Candidate, Timestamped};
use super::occupation::{segment, Occupation, Sample, StationarityCriteria};
use super::timestamp::parse_log_timestamp;

/// Column layout of a rover-firmware COSMOS probe record
pub const COSMOS_FIELDS: [&str; 29] = [
    "RecordNum",
    "Date Time(UTC)",
    "PTB110_mb",
    "P4_mb",
    "P1_mb",
    "T1_C",
    "RH1",
    "T_CS215",
    "RH_CS215",
    "Vbat",
    "N1Cts",
    "N2Cts",
    "N1ETsec",
    "N2ETsec",
    "N1T(C)",
    "N1RH",
    "N2T(C)",
    "N2RH",
    "GpsUTC",
    "LatDec",
    "LongDec",
    "Alt",
    "Qual",
    "NumSats",
    "HDOP",
    "Speed_kmh",
    "COG",
    "SpeedQuality",
    "strDate",
];

const TIMESTAMP_COLUMN: usize = 1;
const LATITUDE_COLUMN: usize = 19;
const LONGITUDE_COLUMN: usize = 20;
const MIN_COLUMNS: usize = LONGITUDE_COLUMN + 1;

/// Written at the top of every occupation extracted from a probe log, so that the
/// extract can be read by the probe vendor's tools.
pub const COSMOS_HEADER: &str = "//Hydroinnova CRS Probe, rover firmware\n\
//Recordperiod = 5 minutes.\n\
//DataSelect=r1p4p1t1h1t7h7bn1n2e1e2s1s2\n\
//--Data Column Info:\n\
//RecordNum,Date Time(UTC),PTB110_mb,P4_mb,P1_mb,T1_C,RH1,T_CS215,RH_CS215,Vbat,N1Cts,N2Cts, N1ETsec , N2ETsec , N1T(C),N1RH , N2T(C),N2RH ,\n\
//GpsUTC, LatDec, LongDec, Alt, Qual, NumSats, HDOP, COG, Speed_kmh, SpeedQuality, strDate\n";

/// One parsed probe record. The raw fields are kept so the record can be written back out.
#[derive(Debug, Clone, PartialEq)]
pub struct CosmosSample {
    pub row: usize,
    pub time: PrimitiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub fields: Vec<String>,
}

impl Sample for CosmosSample {
    fn timestamp(&self) -> PrimitiveDateTime {
        self.time
    }

    fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

impl CosmosSample {
    /// Build a sample from the fields of one record. None if the record is malformed.
    fn from_fields(row: usize, fields: Vec<String>) -> Option<Self> {
        if fields.len() < MIN_COLUMNS {
            return None;
        }
        if fields.len() != COSMOS_FIELDS.len() {
            log::debug!(
                "COSMOS record {row} has {} columns, expected {}",
                fields.len(),
                COSMOS_FIELDS.len()
            );
        }
        let time = parse_log_timestamp(&fields[TIMESTAMP_COLUMN]).ok()?;
        let latitude = fields[LATITUDE_COLUMN].trim().parse().ok()?;
        let longitude = fields[LONGITUDE_COLUMN].trim().parse().ok()?;
        Some(Self {
            row,
            time,
            latitude,
            longitude,
            fields,
        })
    }

    pub fn to_line(&self) -> String {
        self.fields.join(",")
    }
}

pub type CosmosOccupation = Occupation<CosmosSample>;

impl Timestamped for CosmosOccupation {
    fn timestamp(&self) -> PrimitiveDateTime {
        self.mean_time()
    }
}

impl Candidate for CosmosOccupation {
    fn duration(&self) -> usize {
        self.samples.len()
    }
}

/// A full cosmic-ray probe log
#[derive(Debug, Clone)]
pub struct CosmosLog {
    pub path: PathBuf,
    pub samples: Vec<CosmosSample>,
    pub skipped_rows: usize,
}

impl CosmosLog {
    /// Open and parse a probe log
    pub fn read(path: &Path) -> Result<Self, CosmosError> {
        if !path.exists() {
            return Err(CosmosError::BadFilePath(path.to_path_buf()));
        }
        let log = Self::from_reader(File::open(path)?, path)?;
        if log.samples.is_empty() {
            return Err(CosmosError::NoRecords(path.to_path_buf()));
        }
        Ok(log)
    }

    /// Parse a probe log from a reader. `path` is only recorded.
    ///
    /// `//` comment lines are skipped. Malformed records are skipped and counted, never fatal.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, CosmosError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'/'))
            .from_reader(reader);

        let mut samples = Vec::new();
        let mut skipped_rows = 0;
        for (row, result) in rdr.byte_records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Skipping unreadable COSMOS record {row} in {path:?}: {e}");
                    skipped_rows += 1;
                    continue;
                }
            };
            let fields: Vec<String> = record
                .iter()
                .map(|f| String::from_utf8_lossy(f).trim().to_string())
                .collect();
            match CosmosSample::from_fields(row, fields) {
                Some(sample) => samples.push(sample),
                None => {
                    log::debug!("Skipping malformed COSMOS record {row} in {path:?}");
                    skipped_rows += 1;
                }
            }
        }
        if skipped_rows > 0 {
            log::warn!("Skipped {skipped_rows} malformed records in COSMOS log {path:?}");
        }
        Ok(Self {
            path: path.to_path_buf(),
            samples,
            skipped_rows,
        })
    }

    pub fn occupations(&self, criteria: &StationarityCriteria) -> Vec<CosmosOccupation> {
        segment(&self.samples, criteria, &self.path)
    }
}

/// Write an occupation as a standalone probe file: header, then its raw records
pub fn write_occupation<W: Write>(
    occupation: &CosmosOccupation,
    writer: &mut W,
) -> Result<(), CosmosError> {
    writer.write_all(COSMOS_HEADER.as_bytes())?;
    for sample in occupation.samples.iter() {
        writeln!(writer, "{}", sample.to_line())?;
    }
    Ok(())
}
