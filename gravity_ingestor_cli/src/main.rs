use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use libgravity_ingestor::config::Config;
use libgravity_ingestor::process::{export, prepare, process};
use libgravity_ingestor::status::IngestStatus;

const DEFAULT_EXPORT_FILE: &str = "gravity_summary.tsv";

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("gravity_ingestor_cli")
        .about("Ingest absolute-gravity project files and their auxiliary field records")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("preview")
                .about("Match and list every planned action without touching files"),
        )
        .subcommand(Command::new("ingest").about("Match, then copy everything into the archive"))
        .subcommand(
            Command::new("export")
                .about("Write a tab-separated summary of every measurement")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Path to the summary file")
                        .default_value(DEFAULT_EXPORT_FILE),
                ),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file")
                .required(true)
                .global(true),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }
    log::set_max_level(log::LevelFilter::Info);

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        log::error!("A configuration path is required.");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Could not write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Project Path: {}", config.project_path.to_string_lossy());
    log::info!("Working Path: {}", config.working_path.to_string_lossy());
    log::info!(
        "Site Description Path: {}",
        config.site_description_path.to_string_lossy()
    );
    for (name, path) in [
        ("COSMOS", &config.cosmos_path),
        ("GPS", &config.gps_path),
        ("Photo", &config.photo_path),
        ("Field Sheet", &config.fieldsheet_path),
        ("Site Cross-Reference", &config.crossref_path),
    ] {
        match path {
            Some(p) => log::info!("{name} Path: {}", p.to_string_lossy()),
            None => log::info!("{name} Path: None"),
        }
    }
    log::info!("Start Date: {} End Date: {}", config.start_date, config.end_date);

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{msg:>10} [{bar:40.cyan/blue}] {pos:>3}%") {
        pb.set_style(style);
    }
    let mut update = |status: IngestStatus| {
        pb.set_message(status.stage.to_string());
        pb.set_position((status.progress * 100.0) as u64);
    };

    match matches.subcommand() {
        Some(("export", sub)) => {
            let output = sub
                .get_one::<String>("output")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));
            match export(&config, &output, &mut update) {
                Ok(n) => log::info!("Exported {n} measurements to {}", output.to_string_lossy()),
                Err(e) => log::error!("Export failed with error: {e}"),
            }
        }
        Some(("preview", _)) => match prepare(&config, &mut update) {
            Ok(ingestion) => {
                ingestion.log_summary();
                for action in ingestion.plan.actions() {
                    log::info!("{action}");
                }
                for note in ingestion.skipped.iter() {
                    log::warn!("Skipped {note}");
                }
            }
            Err(e) => log::error!("Preview failed with error: {e}"),
        },
        Some(("ingest", _)) => match process(&config, &mut update) {
            Ok(report) => {
                for note in report.skipped.iter() {
                    log::warn!("Skipped {note}");
                }
                log::info!(
                    "Successfully completed {} actions ({}).",
                    report.completed,
                    human_bytes::human_bytes(report.copied_bytes as f64)
                );
            }
            Err(e) => log::error!("Ingestion failed with error: {e}"),
        },
        _ => (),
    }

    pb.finish();

    log::info!("Done.");
}
