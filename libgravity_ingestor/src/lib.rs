//! # gravity_ingestor
//!
//! gravity_ingestor brings a field season of absolute-gravity measurements into the
//! archive, written in Rust. It reads the `.project.txt` reports written by the g software
//! for each FG5/A-10 measurement, matches them against the auxiliary records collected in
//! the field (cosmic-ray soil-moisture probe logs, GPS receiver sessions, site photos and
//! scanned field sheets), and copies everything into the working-data and site-description
//! trees under consistent names.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### GPS converters
//!
//! Raw `.T01` receiver sessions are converted to RINEX with two external programs,
//! `runpkr00` (raw to dat) and `teqc` (dat to RINEX). Both must be on your path, or their
//! names set in the configuration, if GPS sessions are to be matched. Sessions which
//! already have a `.rnx` file beside them are not converted again.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./gravity_ingestor_cli` from the
//! top level repository.
//!
//! ## Configuration
//!
//! Configurations are YAML files. A template can be made with
//! `gravity_ingestor_cli -p config.yml new`. The format is as follows:
//!
//! ```yml
//! project_path: Laptop_gdata_backup
//! working_path: Working Data
//! cosmos_path: null
//! gps_path: null
//! photo_path: null
//! fieldsheet_path: null
//! site_description_path: Site Descriptions
//! crossref_path: null
//! start_date: 2018-08-01
//! end_date: 2018-08-31
//! copy_project_files: true
//! photo_hour_offset: 0
//! delete_copied: true
//! cosmic_ray_threshold_secs: 1500
//! gps_threshold_secs: 1500
//! photo_threshold_secs: 1800
//! converter:
//!   raw_to_dat: runpkr00
//!   dat_to_rinex: teqc
//! ```
//!
//! - `project_path`: the laptop backup of the g software output. Every file whose name
//! contains `project.txt` below it is a measurement. The tree is laid out as
//! `<project>/<site>/<visit>/<station>.project.txt`.
//! - `working_path`: the archive the project tree is mirrored into.
//! - `cosmos_path`, `gps_path`, `photo_path`, `fieldsheet_path`: optional auxiliary
//! sources. A source set to `null` is not matched.
//! - `site_description_path`: where matched photos are filed, as
//! `<project>/<site>/<station>_<YYYY-MM-DD><a,b,c...>.jpg`.
//! - `crossref_path`: optional CSV of `station,site_id` pairs mapping gravity stations to
//! 15-digit hydrological-network site ids.
//! - `start_date`, `end_date`: the measurement dates to ingest, both inclusive.
//! - `photo_hour_offset`: hours the camera clock runs ahead of the gravity meter.
//! - `delete_copied`: remove photos and field sheets from their source once copied.
//! - The thresholds are the largest time difference, in seconds, at which an auxiliary
//! record still matches a measurement.
//!
//! ## Matching
//!
//! The COSMOS probe log is split into occupations: runs of records five minutes apart
//! whose position moves less than 0.002 degrees. Each GPS session is one occupation. A
//! measurement takes the longest occupation whose mean time lies within the threshold of
//! its own time. Every photo within the photo threshold is kept. Field sheets are found
//! by their name, `<station>_<YYYY-MM-DD>.pdf`.
//!
//! ## Output
//!
//! Ingesting copies each project file with its companion files, writes the matched
//! cosmic-ray occupation as `<station>_CR_<YYYY-MM-DD>.txt`, copies the GPS session under
//! its RINEX archive name, and files photos and field sheets. Files that cannot be read or
//! copied are reported at the end and never stop the batch. Exporting writes a
//! tab-separated table of every measurement with a fixed set of 29 columns, where `-999`
//! marks a value the project file did not carry.
pub mod config;
pub mod constants;
pub mod cosmos;
pub mod crossref;
pub mod error;
pub mod export;
pub mod fieldsheet;
pub mod gps;
pub mod matcher;
pub mod measurement;
pub mod occupation;
pub mod photo;
pub mod plan;
pub mod process;
pub mod project_file;
pub mod status;
pub mod timestamp;
