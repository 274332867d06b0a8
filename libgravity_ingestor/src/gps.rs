use rinex::observation::EpochFlag;
use rinex::prelude::Epoch;
use rinex::Rinex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use time::{Date, Month, PrimitiveDateTime, Time};
use walkdir::WalkDir;

use super::error::{GpsError, TimestampError};
use super::matcher::{Candidate, Timestamped};
use super::status::SkipNote;
use super::timestamp::mean_timestamp;

/// Converter output is written here and renamed once the converter succeeds
const PARTIAL_RINEX_EXTENSION: &str = "rnx.part";

/// Session hours are named a..x in archive file names
const HOUR_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwx";
const STATION_CODE_LENGTH: usize = 4;

/// External programs used to turn raw receiver sessions into RINEX
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Raw `.T01` to `.dat`
    pub raw_to_dat: String,
    /// `.dat` to RINEX observation file
    pub dat_to_rinex: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            raw_to_dat: String::from("runpkr00"),
            dat_to_rinex: String::from("teqc"),
        }
    }
}

/// One GPS receiver session. The whole session is a single occupation.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsSession {
    pub rinex_path: PathBuf,
    pub raw_path: Option<PathBuf>,
    pub epochs: Vec<PrimitiveDateTime>,
}

impl Timestamped for GpsSession {
    fn timestamp(&self) -> PrimitiveDateTime {
        self.mean_time()
    }
}

impl Candidate for GpsSession {
    fn duration(&self) -> usize {
        self.epochs.len()
    }
}

/// Observation epochs, as opposed to event records (antenna moves, header changes, cycle
/// slips) which carry no new observation time
fn is_observation(flag: &EpochFlag) -> bool {
    matches!(flag, EpochFlag::Ok | EpochFlag::PowerFailure)
}

/// Convert a RINEX epoch to a UTC wall-clock time
fn epoch_time(epoch: Epoch) -> Result<PrimitiveDateTime, TimestampError> {
    let bad = || TimestampError::BadTimestamp(epoch.to_string());
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    let month = Month::try_from(month).map_err(|_| bad())?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| bad())?;
    let time = Time::from_hms_nano(hour, minute, second, nanos).map_err(|_| bad())?;
    Ok(PrimitiveDateTime::new(date, time))
}

/// The times of the observation epochs among a record's keys, in file order
pub fn observation_times<'a, I>(keys: I) -> Result<Vec<PrimitiveDateTime>, TimestampError>
where
    I: IntoIterator<Item = &'a (Epoch, EpochFlag)>,
{
    keys.into_iter()
        .filter(|(_, flag)| is_observation(flag))
        .map(|(epoch, _)| epoch_time(*epoch))
        .collect()
}

/// Read the epoch times of a RINEX observation file
pub fn read_epochs(path: &Path) -> Result<Vec<PrimitiveDateTime>, GpsError> {
    let name = path
        .to_str()
        .ok_or_else(|| GpsError::BadFilePath(path.to_path_buf()))?;
    let rinex = Rinex::from_file(name)
        .map_err(|e| GpsError::RinexError(path.to_path_buf(), e.to_string()))?;
    let record = rinex
        .record
        .as_obs()
        .ok_or_else(|| GpsError::NotObservation(path.to_path_buf()))?;
    let epochs = observation_times(record.keys())?;
    if epochs.is_empty() {
        return Err(GpsError::NoEpochs(path.to_path_buf()));
    }
    Ok(epochs)
}

/// Run an external converter, failing if it cannot be launched or exits badly
fn run_converter(mut command: Command, program: &str, file: &Path) -> Result<(), GpsError> {
    let status = command
        .status()
        .map_err(|e| GpsError::ConverterUnavailable(program.to_string(), e))?;
    if !status.success() {
        return Err(GpsError::ConverterFailed {
            program: program.to_string(),
            status,
            file: file.to_path_buf(),
        });
    }
    Ok(())
}

/// Convert a raw receiver session to RINEX next to the raw file. Returns the RINEX path.
pub fn convert_raw_session(
    raw: &Path,
    converter: &ConverterConfig,
) -> Result<PathBuf, GpsError> {
    if !raw.exists() {
        return Err(GpsError::BadFilePath(raw.to_path_buf()));
    }
    let dat = raw.with_extension("dat");
    let rinex = raw.with_extension("rnx");
    let partial = raw.with_extension(PARTIAL_RINEX_EXTENSION);

    let mut to_dat = Command::new(&converter.raw_to_dat);
    to_dat.arg("-d").arg(raw);
    run_converter(to_dat, &converter.raw_to_dat, raw)?;

    let mut to_rinex = Command::new(&converter.dat_to_rinex);
    to_rinex
        .args(["-tr", "d"])
        .arg(&dat)
        .stdout(Stdio::from(File::create(&partial)?));
    if let Err(e) = run_converter(to_rinex, &converter.dat_to_rinex, &dat) {
        if let Err(remove) = std::fs::remove_file(&partial) {
            log::warn!("Could not remove partial RINEX {partial:?}: {remove}");
        }
        return Err(e);
    }
    std::fs::rename(&partial, &rinex)?;

    log::info!("Converted {raw:?} to {rinex:?}");
    Ok(rinex)
}

fn is_raw_session(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("t01"))
}

impl GpsSession {
    /// Read a session from its RINEX observation file
    pub fn from_rinex(path: &Path) -> Result<Self, GpsError> {
        if !path.exists() {
            return Err(GpsError::BadFilePath(path.to_path_buf()));
        }
        let epochs = read_epochs(path)?;
        Ok(Self {
            rinex_path: path.to_path_buf(),
            raw_path: None,
            epochs,
        })
    }

    /// Use the RINEX file beside a raw session, converting the raw file if there is none yet
    pub fn from_raw(raw: &Path, converter: &ConverterConfig) -> Result<Self, GpsError> {
        let existing = raw.with_extension("rnx");
        let rinex = if existing.exists() {
            existing
        } else {
            convert_raw_session(raw, converter)?
        };
        let mut session = Self::from_rinex(&rinex)?;
        session.raw_path = Some(raw.to_path_buf());
        Ok(session)
    }

    /// Mean epoch time
    pub fn mean_time(&self) -> PrimitiveDateTime {
        mean_timestamp(self.epochs.iter().copied()).unwrap_or(PrimitiveDateTime::MIN)
    }

    /// Archive name of the session: station code padded with `x` to four characters, day of
    /// year and hour letter of the first observation, then `.YYo`
    pub fn rinex_filename(&self, station: &str) -> String {
        let mut code: String = station.chars().take(STATION_CODE_LENGTH).collect();
        while code.chars().count() < STATION_CODE_LENGTH {
            code.push('x');
        }
        let first = self.epochs.first().copied().unwrap_or(PrimitiveDateTime::MIN);
        let letter = HOUR_LETTERS[first.hour() as usize] as char;
        let year = self.mean_time().year().rem_euclid(100);
        format!("{code}{:03}{letter}.{year:02}o", first.ordinal())
    }
}

/// Walk the GPS directory for raw sessions and load each one.
///
/// A session which cannot be converted or read is noted and left out.
pub fn collect_sessions(
    gps_dir: &Path,
    converter: &ConverterConfig,
) -> (Vec<GpsSession>, Vec<SkipNote>) {
    let mut sessions = Vec::new();
    let mut notes = Vec::new();
    for entry in WalkDir::new(gps_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                notes.push(SkipNote::new(gps_dir, e));
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_raw_session(entry.path()) {
            continue;
        }
        match GpsSession::from_raw(entry.path(), converter) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                log::warn!("Skipping GPS session {:?}: {e}", entry.path());
                notes.push(SkipNote::new(entry.path(), e));
            }
        }
    }
    log::info!("Found {} GPS sessions in {gps_dir:?}", sessions.len());
    (sessions, notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    const RINEX2: &str = "     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE
teqc  2016Nov7      USGS                20180819 16:00:00UTCPGM / RUN BY / DATE
ABQ1                                                        MARKER NAME
SWGP                USGS                                    OBSERVER / AGENCY
4929K54321          TRIMBLE NETR9       5.22                REC # / TYPE / VERS
12345               TRM57971.00     NONE                    ANT # / TYPE
 -1494386.0000 -5032456.0000  3660000.0000                  APPROX POSITION XYZ
        0.0000        0.0000        0.0000                  ANTENNA: DELTA H/E/N
     1     1                                                WAVELENGTH FACT L1/2
     2    L1    C1                                          # / TYPES OF OBSERV
    30.000                                                  INTERVAL
  2018     8    19     9     0    0.0000000     GPS         TIME OF FIRST OBS
                                                            END OF HEADER
 18  8 19  9  0  0.0000000  0  2G01G03
  21234567.123    21234567.123
  22234567.123    22234567.123
 18  8 19  9  0 30.0000000  0  2G01G03
  21234568.123    21234568.123
  22234568.123    22234568.123
";

    fn epoch(hour: u8, minute: u8, second: u8) -> Epoch {
        Epoch::from_gregorian_utc(2018, 8, 19, hour, minute, second, 0)
    }

    #[test]
    fn test_event_records_are_not_epochs() {
        let keys = vec![
            (epoch(9, 0, 0), EpochFlag::Ok),
            (epoch(9, 0, 15), EpochFlag::CycleSlip),
            (epoch(9, 0, 20), EpochFlag::AntennaBeingMoved),
            (epoch(9, 0, 30), EpochFlag::PowerFailure),
            (epoch(9, 1, 0), EpochFlag::Ok),
        ];
        assert_eq!(
            observation_times(&keys).unwrap(),
            vec![
                datetime!(2018-08-19 09:00:00),
                datetime!(2018-08-19 09:00:30),
                datetime!(2018-08-19 09:01:00),
            ]
        );
    }

    #[test]
    fn test_read_rinex_file() {
        let dir = std::env::temp_dir().join("gravity_ingestor_rinex_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("abq1.18o");
        std::fs::write(&path, RINEX2).unwrap();

        let session = GpsSession::from_rinex(&path).unwrap();
        assert_eq!(session.duration(), 2);
        // GPS time runs ahead of UTC by the leap seconds
        let offset = session.epochs[0] - datetime!(2018-08-19 09:00:00);
        assert!(offset.abs() < Duration::minutes(1));
        assert_eq!(session.epochs[1] - session.epochs[0], Duration::seconds(30));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unreadable_session() {
        assert!(matches!(
            GpsSession::from_rinex(Path::new("no/such/abq1.18o")),
            Err(GpsError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_session_as_candidate() {
        let session = GpsSession {
            rinex_path: PathBuf::from("abq1.rnx"),
            raw_path: None,
            epochs: vec![
                datetime!(2018-08-19 09:00:00),
                datetime!(2018-08-19 09:00:30),
                datetime!(2018-08-19 09:01:00),
            ],
        };
        assert_eq!(session.duration(), 3);
        assert_eq!(session.timestamp(), datetime!(2018-08-19 09:00:30));
    }

    #[test]
    fn test_rinex_filename() {
        let session = GpsSession {
            rinex_path: PathBuf::from("abq1.rnx"),
            raw_path: None,
            epochs: vec![datetime!(2018-08-19 09:00:00), datetime!(2018-08-19 10:00:00)],
        };
        assert_eq!(session.rinex_filename("ABQ12"), "ABQ1231j.18o");
        assert_eq!(session.rinex_filename("SF"), "SFxx231j.18o");
    }

    #[test]
    fn test_missing_converter_is_an_error() {
        let dir = std::env::temp_dir().join("gravity_ingestor_gps_test");
        std::fs::create_dir_all(&dir).unwrap();
        let raw = dir.join("session.T01");
        std::fs::write(&raw, b"raw").unwrap();
        let converter = ConverterConfig {
            raw_to_dat: String::from("gravity-ingestor-no-such-converter"),
            dat_to_rinex: String::from("gravity-ingestor-no-such-converter"),
        };
        assert!(matches!(
            convert_raw_session(&raw, &converter),
            Err(GpsError::ConverterUnavailable(_, _))
        ));
        let (sessions, notes) = collect_sessions(&dir, &converter);
        assert!(sessions.is_empty());
        assert_eq!(notes.len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_conversion_can_be_retried() {
        let dir = std::env::temp_dir().join("gravity_ingestor_gps_retry_test");
        std::fs::create_dir_all(&dir).unwrap();
        let raw = dir.join("session.T01");
        std::fs::write(&raw, b"raw").unwrap();
        let converter = ConverterConfig {
            raw_to_dat: String::from("true"),
            dat_to_rinex: String::from("false"),
        };
        for _ in 0..2 {
            assert!(matches!(
                GpsSession::from_raw(&raw, &converter),
                Err(GpsError::ConverterFailed { .. })
            ));
            assert!(!raw.with_extension("rnx").exists());
            assert!(!raw.with_extension(PARTIAL_RINEX_EXTENSION).exists());
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
