use std::fmt::Display;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::config::Config;
use super::constants::PHOTO_SUFFIXES;
use super::cosmos::{write_occupation, CosmosOccupation, COSMOS_HEADER};
use super::error::PlanError;
use super::measurement::GravityMeasurement;
use super::status::SkipNote;
use super::timestamp::format_date;

const GSF_EXTENSION: &str = ".gsf";
const GSF_INDEX_DIGITS: usize = 3;

/// What an action does with its source
#[derive(Debug, Clone)]
pub enum ActionKind {
    CopyProjectFile,
    WriteCosmicRayOccupation(Box<CosmosOccupation>),
    CopyGpsSession,
    CopyPhoto,
    CopyFieldSheet,
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CopyProjectFile => write!(f, "Copy project file"),
            Self::WriteCosmicRayOccupation(occ) => {
                write!(f, "Write CR occupation ({} records)", occ.samples.len())
            }
            Self::CopyGpsSession => write!(f, "Copy GPS session"),
            Self::CopyPhoto => write!(f, "Copy and rename photo"),
            Self::CopyFieldSheet => write!(f, "Copy field sheet"),
        }
    }
}

/// One step of an ingestion. Sizes are in bytes.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub kind: ActionKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub size: u64,
    /// The destination already exists and will be overwritten
    pub exists: bool,
    pub remove_source: bool,
}

impl PlannedAction {
    fn new(kind: ActionKind, source: &Path, destination: PathBuf, remove_source: bool) -> Self {
        let size = match &kind {
            ActionKind::WriteCosmicRayOccupation(occ) => occupation_size(occ),
            _ => source.metadata().map(|m| m.len()).unwrap_or(0),
        };
        let exists = destination.exists();
        if exists {
            log::warn!("{destination:?} already exists and will be overwritten");
        }
        Self {
            kind,
            source: source.to_path_buf(),
            destination,
            size,
            exists,
            remove_source,
        }
    }

    /// Carry out the action
    pub fn execute(&self) -> Result<(), PlanError> {
        if let Some(parent) = self.destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match &self.kind {
            ActionKind::WriteCosmicRayOccupation(occ) => {
                let mut writer = BufWriter::new(File::create(&self.destination)?);
                write_occupation(occ, &mut writer)?;
            }
            _ => {
                if !self.source.exists() {
                    return Err(PlanError::MissingSource(self.source.clone()));
                }
                std::fs::copy(&self.source, &self.destination)?;
                if self.remove_source {
                    std::fs::remove_file(&self.source)?;
                }
            }
        }
        Ok(())
    }
}

impl Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.kind,
            self.source.to_string_lossy(),
            self.destination.to_string_lossy(),
            human_bytes::human_bytes(self.size as f64)
        )?;
        if self.exists {
            write!(f, " [destination exists]")?;
        }
        Ok(())
    }
}

fn occupation_size(occupation: &CosmosOccupation) -> u64 {
    let rows: usize = occupation
        .samples
        .iter()
        .map(|s| s.to_line().len() + 1)
        .sum();
    (COSMOS_HEADER.len() + rows) as u64
}

/// True for `<stem>.<anything>` and `<stem>NNN.gsf`
fn is_companion(name: &str, stem: &str) -> bool {
    let Some(rest) = name.strip_prefix(stem) else {
        return false;
    };
    if rest.starts_with('.') {
        return true;
    }
    match rest.strip_suffix(GSF_EXTENSION) {
        Some(index) => {
            index.len() == GSF_INDEX_DIGITS && index.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// The project file and its companions: every file sharing its stem, plus the numbered
/// `.gsf` set files
pub fn project_file_group(project_file: &Path) -> Result<Vec<PathBuf>, PlanError> {
    let bad = |reason: &str| {
        PlanError::BadProjectPath(project_file.to_path_buf(), reason.to_string())
    };
    let dir = project_file.parent().ok_or_else(|| bad("no parent directory"))?;
    let name = project_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| bad("file name is not valid text"))?;
    let stem = name.split('.').next().unwrap_or(name);

    let mut group = Vec::new();
    for item in dir.read_dir()? {
        let path = item?.path();
        let is_match = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| is_companion(n, stem));
        if path.is_file() && is_match {
            group.push(path);
        }
    }
    group.sort();
    Ok(group)
}

/// Destination of a measurement's n-th photo:
/// `<site descriptions>/<project>/<site>/<station>_<YYYY-MM-DD><letter>.jpg`.
///
/// The project file sits in `<project>/<site>/<visit>/`.
pub fn photo_destination(
    site_description_path: &Path,
    measurement: &GravityMeasurement,
    index: usize,
) -> Result<PathBuf, PlanError> {
    let bad =
        |reason: &str| PlanError::BadProjectPath(measurement.path.clone(), reason.to_string());
    let site_dir = measurement
        .path
        .parent()
        .and_then(|p| p.parent())
        .ok_or_else(|| bad("no site directory"))?;
    let project_dir = site_dir.parent().ok_or_else(|| bad("no project directory"))?;
    let (Some(site), Some(project)) = (site_dir.file_name(), project_dir.file_name()) else {
        return Err(bad("no site or project name"));
    };
    let letter = PHOTO_SUFFIXES
        .chars()
        .nth(index)
        .ok_or_else(|| bad("too many photos for one measurement"))?;
    let date = measurement
        .date
        .map(format_date)
        .ok_or_else(|| bad("no measurement date"))?;
    Ok(site_description_path.join(project).join(site).join(format!(
        "{}_{date}{letter}.jpg",
        measurement.station_name()
    )))
}

/// IngestPlan lists every copy and write an ingestion will make, in order.
///
/// Building a plan only reads the file system, so it doubles as a preview.
#[derive(Debug, Clone, Default)]
pub struct IngestPlan {
    actions: Vec<PlannedAction>,
    total_data_size_bytes: u64,
}

impl IngestPlan {
    /// Build the plan for a set of matched measurements. Anything that cannot be placed is
    /// noted instead.
    pub fn new(config: &Config, measurements: &[GravityMeasurement]) -> (Self, Vec<SkipNote>) {
        let mut plan = Self::default();
        let mut notes = Vec::new();
        for measurement in measurements {
            if let Err(e) = plan.add_measurement(config, measurement, &mut notes) {
                log::warn!("Not planning {:?}: {e}", measurement.path);
                notes.push(SkipNote::new(&measurement.path, e));
            }
        }
        (plan, notes)
    }

    fn push(&mut self, action: PlannedAction) {
        self.total_data_size_bytes += action.size;
        self.actions.push(action);
    }

    fn add_measurement(
        &mut self,
        config: &Config,
        measurement: &GravityMeasurement,
        notes: &mut Vec<SkipNote>,
    ) -> Result<(), PlanError> {
        let to_file = config
            .get_working_path(&measurement.path)
            .map_err(|e| PlanError::BadProjectPath(measurement.path.clone(), e.to_string()))?;
        let to_dir = to_file.parent().map(Path::to_path_buf).unwrap_or_default();
        let station = measurement.station_name();

        if config.copy_project_files {
            for file in project_file_group(&measurement.path)? {
                let name = file.file_name().map(PathBuf::from).unwrap_or_default();
                self.push(PlannedAction::new(
                    ActionKind::CopyProjectFile,
                    &file,
                    to_dir.join(name),
                    false,
                ));
            }
        }

        if let (Some(occupation), Some(date)) = (&measurement.cosmic_ray, measurement.date) {
            let destination = to_dir.join(format!("{station}_CR_{}.txt", format_date(date)));
            self.push(PlannedAction::new(
                ActionKind::WriteCosmicRayOccupation(Box::new(occupation.clone())),
                &occupation.source,
                destination,
                false,
            ));
        }

        if let Some(session) = &measurement.gps {
            self.push(PlannedAction::new(
                ActionKind::CopyGpsSession,
                &session.rinex_path,
                to_dir.join(session.rinex_filename(station)),
                false,
            ));
        }

        for (idx, photo) in measurement.photos.iter().enumerate() {
            match photo_destination(&config.site_description_path, measurement, idx) {
                Ok(destination) => self.push(PlannedAction::new(
                    ActionKind::CopyPhoto,
                    &photo.path,
                    destination,
                    config.delete_copied,
                )),
                Err(e) => notes.push(SkipNote::new(&photo.path, e)),
            }
        }

        if let Some(sheet) = &measurement.field_sheet {
            let name = sheet.file_name().map(PathBuf::from).unwrap_or_default();
            self.push(PlannedAction::new(
                ActionKind::CopyFieldSheet,
                sheet,
                to_dir.join(name),
                config.delete_copied,
            ));
        }
        Ok(())
    }

    /// Get total size of the plan in bytes.
    pub fn get_total_data_size(&self) -> u64 {
        self.total_data_size_bytes
    }

    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
