//! Reader for the `.project.txt` reports written by the Micro-g LaCoste g software.
//!
//! The reports are loosely formatted `Label: value unit` lines whose labels drift between
//! g versions. Each line is first normalized to a short label followed by its values (see
//! [`normalize_line`]), then dispatched on that label through the [`RULES`] table. Parsing
//! state (current section, comment accumulation, file version) lives in [`ParserState`].
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::constants::{COMMENT_SEPARATOR, HEIGHTS_MIN_VERSION};
use super::error::ProjectFileError;
use super::measurement::GravityMeasurement;
use super::timestamp::{parse_time_of_day, parse_us_date};

/// Verbose labels and their short replacements. Applied in order, so earlier entries
/// must not be undone by later ones.
const LABEL_SUBSTITUTIONS: [(&str, &str); 30] = [
    ("g Acquisition Version", "Acq"),
    ("g Processing ", ""),
    ("Project Name:", "Project"),
    ("File Created:", "Created"),
    ("Gravity Corrections", "grvcorr"),
    (" Height:", ":"),
    ("Delta Factor Filename:", "DFFile"),
    ("Ocean Load ON, Filename:", "OLFile"),
    ("Nominal Air Pressure:", "Nominal"),
    ("Barometric Admittance Factor:", "Admittance"),
    (" Motion Coord:", ""),
    ("Set Scatter:", "Scatter"),
    ("Offset:", "ofst"),
    ("Time Offset (D h:m:s):", "TimeOffset"),
    ("Ocean Load:", "OLC"),
    ("Rubidium Frequency:", "RubFrequency"),
    ("Blue Lock:", "Blue"),
    ("Red Lock:", "Red"),
    ("Red/Blue Separation:", "Separation"),
    ("Red/Blue Interval:", "Interval"),
    ("Gravity:", "Grv:"),
    ("Number of Sets Collected:", "SetsColl"),
    ("Number of Sets Processed:", "SetsProc"),
    // The polar motion correction, not the coordinates
    ("Polar Motion:", "PolMotC"),
    ("Barometric Pressure:", "BarPresCorr"),
    ("System Setup:", ""),
    ("Total Uncertainty:", "Total_unc"),
    ("Measurement Precision:", "Precision"),
    ("Station Name:", "Name:"),
    ("Comments:", "Comments"),
];

/// Normalize one raw project-file line into `label value value ...` form.
///
/// Pure; the output is split on whitespace by the caller. The first token is the label.
pub fn normalize_line(raw: &str) -> String {
    let mut line = raw.trim().to_string();
    while line.contains(":  ") {
        line = line.replace(":  ", ": ");
    }
    for (from, to) in LABEL_SUBSTITUTIONS.iter() {
        if line.contains(from) {
            line = line.replace(from, to);
        }
    }
    // Drop the colon ending the label, but leave colons inside values (times) alone
    if let Some(idx) = line.find(':') {
        if !line[..idx].contains(char::is_whitespace) {
            line.remove(idx);
        }
    }
    line.replace(',', "")
}

/// Which block of the report we are in. Some labels repeat between blocks with a
/// different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Header,
    Corrections,
    Uncertainties,
}

/// Comment handling: everything after the Comments label, to the end of the file, is
/// free text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommentState {
    #[default]
    NotStarted,
    Collecting(Vec<String>),
}

/// Everything the line loop accumulates while reading one file
#[derive(Debug, Default)]
pub struct ParserState {
    pub measurement: GravityMeasurement,
    pub section: Section,
    pub comments: CommentState,
}

impl ParserState {
    pub fn new(path: &Path) -> Self {
        Self {
            measurement: GravityMeasurement::new(path),
            ..Default::default()
        }
    }

    /// Older g versions do not write heights, time offset or the transfer height
    /// correction. An unknown version is treated as current.
    pub fn has_height_fields(&self) -> bool {
        self.measurement
            .version
            .map(|v| v >= HEIGHTS_MIN_VERSION)
            .unwrap_or(true)
    }

    /// Feed one raw line
    pub fn process_line(&mut self, raw: &str) {
        if let CommentState::Collecting(lines) = &mut self.comments {
            let text = raw.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
            return;
        }

        let normalized = normalize_line(raw);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let Some(label) = tokens.first() else {
            return;
        };
        if let Some(rule) = RULES.iter().find(|rule| rule.label == *label) {
            (rule.apply)(self, &tokens[1..]);
        }
    }

    /// Consume the state and produce the finished measurement
    pub fn finish(mut self) -> GravityMeasurement {
        if let CommentState::Collecting(lines) = self.comments {
            self.measurement.comments = Some(lines.join(COMMENT_SEPARATOR));
        }
        self.measurement
    }
}

/// A label and the setter it feeds. The setter receives the tokens following the label.
pub struct Rule {
    pub label: &'static str,
    pub apply: fn(&mut ParserState, &[&str]),
}

pub const RULES: &[Rule] = &[
    Rule {
        label: "Created",
        apply: set_created,
    },
    Rule {
        label: "Project",
        apply: set_project,
    },
    Rule {
        label: "Name",
        apply: set_station,
    },
    Rule {
        label: "Version",
        apply: set_version,
    },
    Rule {
        label: "Lat",
        apply: set_coordinates,
    },
    Rule {
        label: "Setup",
        apply: set_setup_height,
    },
    Rule {
        label: "Transfer",
        apply: set_transfer,
    },
    Rule {
        label: "Actual",
        apply: set_actual_height,
    },
    Rule {
        label: "Gradient",
        apply: set_gradient,
    },
    Rule {
        label: "Nominal",
        apply: set_nominal_air_pressure,
    },
    Rule {
        label: "Polar",
        apply: set_polar_motion,
    },
    Rule {
        label: "DFFile",
        apply: set_delta_factor_file,
    },
    Rule {
        label: "OLFile",
        apply: set_ocean_load_file,
    },
    Rule {
        label: "RubFrequency",
        apply: set_rubidium_frequency,
    },
    Rule {
        label: "Blue",
        apply: set_blue_lock,
    },
    Rule {
        label: "Red",
        apply: set_red_lock,
    },
    Rule {
        label: "Date",
        apply: set_date,
    },
    Rule {
        label: "Time",
        apply: set_time,
    },
    Rule {
        label: "TimeOffset",
        apply: set_time_offset,
    },
    Rule {
        label: "Grv",
        apply: set_gravity,
    },
    Rule {
        label: "Scatter",
        apply: set_set_scatter,
    },
    Rule {
        label: "Precision",
        apply: set_precision,
    },
    Rule {
        label: "Total_unc",
        apply: set_uncertainty,
    },
    Rule {
        label: "SetsColl",
        apply: set_sets_collected,
    },
    Rule {
        label: "SetsProc",
        apply: set_sets_processed,
    },
    Rule {
        label: "grvcorr",
        apply: enter_corrections,
    },
    Rule {
        label: "Uncertainties",
        apply: enter_uncertainties,
    },
    Rule {
        label: "Comments",
        apply: start_comments,
    },
];

/// Parse a numeric token, tolerating trailing unit marks such as `"`
fn number(token: Option<&&str>) -> Option<f64> {
    let token = token?.trim_end_matches(['"', '\'']);
    match token.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::debug!("Could not parse number from {token:?}; leaving field empty");
            None
        }
    }
}

/// The number following an inline label such as `Long:`
fn labelled_number(tokens: &[&str], label: &str) -> Option<f64> {
    let idx = tokens
        .iter()
        .position(|t| t.trim_end_matches(':') == label)?;
    number(tokens.get(idx + 1))
}

fn rest_of_line(tokens: &[&str]) -> Option<String> {
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

fn joined_name(tokens: &[&str]) -> Option<String> {
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join("_"))
    }
}

fn set_created(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.created = rest_of_line(tokens);
}

fn set_project(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.project = joined_name(tokens);
}

fn set_station(state: &mut ParserState, tokens: &[&str]) {
    // "Name" also appears outside the station block in some versions; keep the first.
    if state.measurement.station.is_none() {
        state.measurement.station = joined_name(tokens);
    }
}

/// Versions look like `5.0` or `9.12.0425`; only major.minor matters here.
fn set_version(state: &mut ParserState, tokens: &[&str]) {
    let Some(token) = tokens.first() else {
        return;
    };
    let mut parts = token.split('.');
    let major = parts.next().unwrap_or_default();
    let version = match parts.next() {
        Some(minor) => format!("{major}.{minor}").parse::<f64>(),
        None => major.parse::<f64>(),
    };
    match version {
        Ok(v) => state.measurement.version = Some(v),
        Err(_) => log::warn!("Unreadable g version {token:?} in {:?}", state.measurement.path),
    }
}

/// `Lat <lat> Long: <long> Elev: <elev> m`; each value is read from its own slot
fn set_coordinates(state: &mut ParserState, tokens: &[&str]) {
    let m = &mut state.measurement;
    m.latitude = number(tokens.first());
    m.longitude = labelled_number(tokens, "Long");
    m.elevation = labelled_number(tokens, "Elev");
}

fn set_setup_height(state: &mut ParserState, tokens: &[&str]) {
    if state.has_height_fields() {
        state.measurement.setup_height = number(tokens.first());
    }
}

fn set_transfer(state: &mut ParserState, tokens: &[&str]) {
    if !state.has_height_fields() {
        return;
    }
    match state.section {
        Section::Header => state.measurement.transfer_height = number(tokens.first()),
        Section::Corrections => {
            state.measurement.transfer_height_correction = number(tokens.first())
        }
        Section::Uncertainties => (),
    }
}

fn set_actual_height(state: &mut ParserState, tokens: &[&str]) {
    if state.has_height_fields() {
        state.measurement.actual_height = number(tokens.first());
    }
}

fn set_gradient(state: &mut ParserState, tokens: &[&str]) {
    // The uncertainty block repeats "Gradient:" with an error budget entry
    if state.section != Section::Uncertainties {
        state.measurement.gradient = number(tokens.first());
    }
}

fn set_nominal_air_pressure(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.nominal_air_pressure = number(tokens.first());
}

fn set_polar_motion(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.polar_x = number(tokens.first());
    state.measurement.polar_y = number(tokens.get(1));
}

fn set_delta_factor_file(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.delta_factor_file = rest_of_line(tokens);
}

fn set_ocean_load_file(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.ocean_load_file = rest_of_line(tokens);
}

fn set_rubidium_frequency(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.rubidium_frequency = number(tokens.first());
}

fn set_blue_lock(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.blue_lock = number(tokens.first());
}

fn set_red_lock(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.red_lock = number(tokens.first());
}

fn set_date(state: &mut ParserState, tokens: &[&str]) {
    let Some(text) = tokens.last() else {
        return;
    };
    state.measurement.date_text = Some(text.to_string());
    match parse_us_date(text) {
        Ok(date) => state.measurement.date = Some(date),
        Err(e) => log::warn!("{e} in {:?}", state.measurement.path),
    }
}

fn set_time(state: &mut ParserState, tokens: &[&str]) {
    let Some(text) = tokens.first() else {
        return;
    };
    state.measurement.time_text = Some(text.to_string());
    match parse_time_of_day(text) {
        Ok(time) => state.measurement.time = Some(time),
        Err(e) => log::warn!("{e} in {:?}", state.measurement.path),
    }
}

fn set_time_offset(state: &mut ParserState, tokens: &[&str]) {
    if state.has_height_fields() {
        state.measurement.time_offset = rest_of_line(tokens);
    }
}

fn set_gravity(state: &mut ParserState, tokens: &[&str]) {
    if state.measurement.gravity.is_none() {
        state.measurement.gravity = number(tokens.first());
    } else {
        log::warn!(
            "Ignoring second gravity value in {:?}",
            state.measurement.path
        );
    }
}

fn set_set_scatter(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.set_scatter = number(tokens.first());
}

fn set_precision(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.precision = number(tokens.first());
}

fn set_uncertainty(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.uncertainty = number(tokens.first());
}

fn set_sets_collected(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.sets_collected = tokens.first().and_then(|t| t.parse().ok());
}

fn set_sets_processed(state: &mut ParserState, tokens: &[&str]) {
    state.measurement.sets_processed = tokens.first().and_then(|t| t.parse().ok());
}

fn enter_corrections(state: &mut ParserState, _tokens: &[&str]) {
    state.section = Section::Corrections;
}

fn enter_uncertainties(state: &mut ParserState, _tokens: &[&str]) {
    state.section = Section::Uncertainties;
}

fn start_comments(state: &mut ParserState, tokens: &[&str]) {
    let mut lines = Vec::new();
    if let Some(text) = rest_of_line(tokens) {
        lines.push(text);
    }
    state.comments = CommentState::Collecting(lines);
}

/// Parse a project report from any buffered reader. `path` is only recorded.
///
/// Lines that are not valid UTF-8 are decoded lossily rather than failing the file.
pub fn parse_project_reader<R: BufRead>(
    mut reader: R,
    path: &Path,
) -> Result<GravityMeasurement, ProjectFileError> {
    let mut state = ParserState::new(path);
    let mut buffer: Vec<u8> = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        state.process_line(&String::from_utf8_lossy(&buffer));
    }
    let measurement = state.finish();
    if measurement.gravity.is_none() {
        log::warn!("No gravity value found in {path:?}");
    }
    Ok(measurement)
}

/// Parse the project report at `path`
pub fn parse_project_file(path: &Path) -> Result<GravityMeasurement, ProjectFileError> {
    if !path.exists() {
        return Err(ProjectFileError::BadFilePath(path.to_path_buf()));
    }
    let file = File::open(path)?;
    parse_project_reader(BufReader::new(file), path)
}
