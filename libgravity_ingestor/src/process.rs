use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::config::Config;
use super::cosmos::CosmosLog;
use super::crossref::SiteCrossRef;
use super::error::{ConfigError, ProcessorError};
use super::export::export_summary;
use super::fieldsheet::{assign_field_sheets, FieldSheetIndex};
use super::gps::collect_sessions;
use super::matcher::{assign_best, assign_photos};
use super::measurement::GravityMeasurement;
use super::occupation::StationarityCriteria;
use super::photo::collect_photos;
use super::plan::IngestPlan;
use super::project_file::parse_project_file;
use super::status::{IngestStatus, SkipNote, Stage};
use super::timestamp::{format_date, DateWindow};

const PROJECT_FILE_MARKER: &str = "project.txt";
/// Auxiliary sources matched in turn: COSMOS, GPS, photos, field sheets
const MATCHING_STEPS: f32 = 4.0;

/// Everything found for one batch, ready to preview or carry out
#[derive(Debug, Clone, Default)]
pub struct Ingestion {
    pub measurements: Vec<GravityMeasurement>,
    /// Hydrological-network site id of each measurement's station, if known
    pub site_ids: Vec<Option<String>>,
    pub plan: IngestPlan,
    pub skipped: Vec<SkipNote>,
}

impl Ingestion {
    /// Log what was matched to each measurement
    pub fn log_summary(&self) {
        for (measurement, site_id) in self.measurements.iter().zip(self.site_ids.iter()) {
            let date = measurement.date.map(format_date).unwrap_or_default();
            let cosmic_ray = match &measurement.cosmic_ray {
                Some(occ) => format!("{} records", occ.samples.len()),
                None => String::from("not found"),
            };
            let gps = match &measurement.gps {
                Some(session) => format!("{} epochs", session.epochs.len()),
                None => String::from("not found"),
            };
            let field_sheet = match &measurement.field_sheet {
                Some(path) => path.to_string_lossy().to_string(),
                None => String::from("not found"),
            };
            log::info!(
                "{} {date}: CR {cosmic_ray}, GPS {gps}, {} photos, field sheet {field_sheet}, site id {}",
                measurement.station_name(),
                measurement.photos.len(),
                site_id.as_deref().unwrap_or("none")
            );
        }
    }
}

/// The outcome of carrying out a plan
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub completed: usize,
    pub copied_bytes: u64,
    pub skipped: Vec<SkipNote>,
}

/// Find every project file under the project directory, in path order
pub fn find_project_files(
    project_dir: &Path,
) -> Result<(Vec<PathBuf>, Vec<SkipNote>), ProcessorError> {
    if !project_dir.exists() {
        return Err(ConfigError::BadFilePath(project_dir.to_path_buf()).into());
    }
    let mut files = Vec::new();
    let mut notes = Vec::new();
    for entry in WalkDir::new(project_dir).sort_by_file_name() {
        match entry {
            Ok(e) => {
                let is_project_file = e
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.contains(PROJECT_FILE_MARKER));
                if e.file_type().is_file() && is_project_file {
                    files.push(e.into_path());
                }
            }
            Err(e) => {
                log::warn!("Directory walk error under {project_dir:?}: {e}");
                notes.push(SkipNote::new(project_dir, e));
            }
        }
    }
    Ok((files, notes))
}

/// Parse every project file and keep the measurements dated inside the window
pub fn load_measurements<F: FnMut(IngestStatus)>(
    config: &Config,
    window: &DateWindow,
    progress: &mut F,
) -> Result<(Vec<GravityMeasurement>, Vec<SkipNote>), ProcessorError> {
    log::info!("Looking for project files in {:?}...", config.project_path);
    let (files, mut notes) = find_project_files(&config.project_path)?;
    let total = files.len().max(1) as f32;
    progress(IngestStatus::new(0.0, Stage::Loading));

    let mut measurements = Vec::new();
    for (idx, file) in files.iter().enumerate() {
        match parse_project_file(file) {
            Ok(measurement) => {
                let date = measurement.date;
                match date {
                    Some(d) if window.contains(d) => measurements.push(measurement),
                    Some(_) => log::debug!("{file:?} is outside the date window"),
                    None => notes.push(SkipNote::new(file, "no measurement date")),
                }
            }
            Err(e) => {
                log::warn!("Skipping project file {file:?}: {e}");
                notes.push(SkipNote::new(file, e));
            }
        }
        progress(IngestStatus::new((idx + 1) as f32 / total, Stage::Loading));
    }
    log::info!(
        "Loaded {} of {} project files in the date window.",
        measurements.len(),
        files.len()
    );
    Ok((measurements, notes))
}

/// Match cosmic-ray occupations, GPS sessions, photos and field sheets to the measurements.
///
/// A source which cannot be read is noted and the remaining sources are still matched.
pub fn match_measurements<F: FnMut(IngestStatus)>(
    config: &Config,
    measurements: &mut [GravityMeasurement],
    window: &DateWindow,
    progress: &mut F,
) -> Vec<SkipNote> {
    let mut notes = Vec::new();
    progress(IngestStatus::new(0.0, Stage::Matching));

    if let Some(cosmos_path) = &config.cosmos_path {
        match CosmosLog::read(cosmos_path) {
            Ok(log) => {
                let occupations = log.occupations(&StationarityCriteria::default());
                let matched = assign_best(
                    measurements,
                    &occupations,
                    config.cosmic_ray_threshold(),
                    |m| &mut m.cosmic_ray,
                );
                log::info!(
                    "Matched {matched} measurements to {} COSMOS occupations.",
                    occupations.len()
                );
            }
            Err(e) => {
                log::warn!("{e}");
                notes.push(SkipNote::new(cosmos_path, e));
            }
        }
    }
    progress(IngestStatus::new(1.0 / MATCHING_STEPS, Stage::Matching));

    if let Some(gps_path) = &config.gps_path {
        let (sessions, mut gps_notes) = collect_sessions(gps_path, &config.converter);
        let matched = assign_best(measurements, &sessions, config.gps_threshold(), |m| &mut m.gps);
        log::info!("Matched {matched} measurements to {} GPS sessions.", sessions.len());
        notes.append(&mut gps_notes);
    }
    progress(IngestStatus::new(2.0 / MATCHING_STEPS, Stage::Matching));

    if let Some(photo_path) = &config.photo_path {
        let (photos, mut photo_notes) = collect_photos(photo_path, config.photo_hour_offset);
        let assigned = assign_photos(measurements, &photos, config.photo_threshold());
        log::info!("Assigned {assigned} of {} photos.", photos.len());
        notes.append(&mut photo_notes);
    }
    progress(IngestStatus::new(3.0 / MATCHING_STEPS, Stage::Matching));

    if let Some(fieldsheet_path) = &config.fieldsheet_path {
        match FieldSheetIndex::from_dir(fieldsheet_path, window) {
            Ok((index, mut sheet_notes)) => {
                let found = assign_field_sheets(measurements, &index);
                log::info!("Found field sheets for {found} measurements.");
                notes.append(&mut sheet_notes);
            }
            Err(e) => {
                log::warn!("{e}");
                notes.push(SkipNote::new(fieldsheet_path, e));
            }
        }
    }
    progress(IngestStatus::new(1.0, Stage::Matching));
    notes
}

/// Load, match and plan a batch without touching any file
pub fn prepare<F: FnMut(IngestStatus)>(
    config: &Config,
    progress: &mut F,
) -> Result<Ingestion, ProcessorError> {
    let window = config.date_window()?;
    let crossref = match &config.crossref_path {
        Some(path) => SiteCrossRef::new(path)?,
        None => SiteCrossRef::default(),
    };

    let (mut measurements, mut skipped) = load_measurements(config, &window, progress)?;
    skipped.append(&mut match_measurements(
        config,
        &mut measurements,
        &window,
        progress,
    ));
    let site_ids = measurements
        .iter()
        .map(|m| crossref.lookup(m.station_name()).map(str::to_string))
        .collect();

    let (plan, mut plan_notes) = IngestPlan::new(config, &measurements);
    skipped.append(&mut plan_notes);
    log::info!(
        "Planned {} actions with total size {}",
        plan.len(),
        human_bytes::human_bytes(plan.get_total_data_size() as f64)
    );

    Ok(Ingestion {
        measurements,
        site_ids,
        plan,
        skipped,
    })
}

/// Carry out every action of a plan. A failed action is noted and the rest still run.
pub fn execute_plan<F: FnMut(IngestStatus)>(
    plan: &IngestPlan,
    progress: &mut F,
) -> IngestReport {
    let mut report = IngestReport::default();
    let total_size = plan.get_total_data_size().max(1);
    progress(IngestStatus::new(0.0, Stage::Copying));
    for action in plan.actions() {
        match action.execute() {
            Ok(()) => {
                report.completed += 1;
                report.copied_bytes += action.size;
                log::info!("{} in {}", action.kind, action.destination.to_string_lossy());
            }
            Err(e) => {
                log::warn!("{} failed: {e}", action.kind);
                report.skipped.push(SkipNote::new(&action.source, e));
            }
        }
        progress(IngestStatus::new(
            report.copied_bytes as f32 / total_size as f32,
            Stage::Copying,
        ));
    }
    progress(IngestStatus::new(1.0, Stage::Copying));
    log::info!("Done with {} of {} actions.", report.completed, plan.len());
    report
}

/// The main loop of gravity_ingestor.
///
/// Finds, matches and plans a batch, then carries the plan out. Anything skipped along the
/// way ends up in the report.
pub fn process<F: FnMut(IngestStatus)>(
    config: &Config,
    progress: &mut F,
) -> Result<IngestReport, ProcessorError> {
    let ingestion = prepare(config, progress)?;
    ingestion.log_summary();
    let mut report = execute_plan(&ingestion.plan, progress);
    let mut skipped = ingestion.skipped;
    skipped.append(&mut report.skipped);
    report.skipped = skipped;
    Ok(report)
}

/// Write the tab-separated summary of every measurement in the date window. Returns the
/// number of measurements written.
pub fn export<F: FnMut(IngestStatus)>(
    config: &Config,
    output: &Path,
    progress: &mut F,
) -> Result<usize, ProcessorError> {
    let window = config.date_window()?;
    let (measurements, skipped) = load_measurements(config, &window, progress)?;
    for note in skipped.iter() {
        log::warn!("Skipped {note}");
    }
    progress(IngestStatus::new(0.0, Stage::Exporting));
    export_summary(&measurements, output)?;
    progress(IngestStatus::new(1.0, Stage::Exporting));
    Ok(measurements.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmos::tests::probe_log;
    use crate::project_file::tests::modern_report;
    use time::macros::datetime;

    fn write_visit(root: &Path, station: &str, time: &str) -> PathBuf {
        let visit = root.join("backup/MRG").join(station).join("2018-08-19");
        std::fs::create_dir_all(&visit).unwrap();
        let file = visit.join(format!("{station}.project.txt"));
        std::fs::write(&file, modern_report(station, "08/19/18", time)).unwrap();
        file
    }

    fn field_day(root: &Path) -> Config {
        let _ = std::fs::remove_dir_all(root);
        write_visit(root, "STA1", "09:00:00");
        write_visit(root, "STA2", "09:05:00");
        write_visit(root, "STA3", "14:00:00");
        let cosmos = root.join("cosmos.dat");
        std::fs::write(
            &cosmos,
            probe_log(&[
                (datetime!(2018-08-19 08:42:00), 9, (35.1, -106.5)),
                (datetime!(2018-08-19 13:35:00), 9, (35.3, -106.7)),
            ]),
        )
        .unwrap();
        let sheets = root.join("sheets");
        std::fs::create_dir_all(&sheets).unwrap();
        std::fs::write(sheets.join("STA3_2018-08-19.pdf"), b"%PDF").unwrap();

        let mut config = Config::default();
        config.project_path = root.join("backup");
        config.working_path = root.join("working");
        config.site_description_path = root.join("sites");
        config.cosmos_path = Some(cosmos);
        config.fieldsheet_path = Some(sheets);
        config.start_date = String::from("2018-08-01");
        config.end_date = String::from("2018-08-31");
        config
    }

    #[test]
    fn test_prepare_field_day() {
        let root = std::env::temp_dir().join("gravity_ingestor_prepare_test");
        let config = field_day(&root);
        let mut stages = Vec::new();
        let ingestion = prepare(&config, &mut |s: IngestStatus| stages.push(s.stage)).unwrap();

        assert_eq!(ingestion.measurements.len(), 3);
        assert!(ingestion.skipped.is_empty());
        let centres: Vec<_> = ingestion
            .measurements
            .iter()
            .map(|m| m.cosmic_ray.as_ref().map(|o| o.mean_time()))
            .collect();
        assert_eq!(
            centres,
            vec![
                Some(datetime!(2018-08-19 09:02:00)),
                Some(datetime!(2018-08-19 09:02:00)),
                Some(datetime!(2018-08-19 13:55:00)),
            ]
        );
        assert!(ingestion.measurements[2].field_sheet.is_some());
        assert_eq!(ingestion.site_ids, vec![None, None, None]);
        // 3 project files, 3 CR extracts, 1 field sheet
        assert_eq!(ingestion.plan.len(), 7);
        assert!(stages.contains(&Stage::Loading));
        assert!(stages.contains(&Stage::Matching));
        assert!(!root.join("working").exists());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_process_and_export() {
        let root = std::env::temp_dir().join("gravity_ingestor_process_test");
        let mut config = field_day(&root);
        std::fs::write(
            root.join("backup/MRG/STA1/2018-08-19/STA1.broken.project.txt"),
            b"",
        )
        .unwrap();
        config.cosmos_path = Some(root.join("missing_cosmos.dat"));

        let report = process(&config, &mut |_| {}).unwrap();
        // the empty file has no date; the missing log is noted
        assert_eq!(report.skipped.len(), 2);
        // 3 project files, the empty file copied as a companion of STA1, and 1 field sheet
        assert_eq!(report.completed, 5);
        let working = root.join("working/MRG/STA3/2018-08-19");
        assert!(working.join("STA3.project.txt").exists());
        assert!(working.join("STA3_2018-08-19.pdf").exists());
        assert!(!root.join("sheets/STA3_2018-08-19.pdf").exists());

        let output = root.join("summary.tsv");
        assert_eq!(export(&config, &output, &mut |_| {}).unwrap(), 3);
        let summary = std::fs::read_to_string(&output).unwrap();
        assert_eq!(summary.lines().count(), 4);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_project_dir_is_fatal() {
        let mut config = Config::default();
        config.project_path = PathBuf::from("no/such/backup");
        assert!(matches!(
            prepare(&config, &mut |_| {}),
            Err(ProcessorError::ConfigError(ConfigError::BadFilePath(_)))
        ));
    }
}
