use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::error::ExportError;
use super::measurement::{GravityMeasurement, COLUMNS};

/// Write measurements as tab-separated records, one per measurement, under a header of
/// the record columns
pub fn write_summary<W: Write>(
    measurements: &[GravityMeasurement],
    writer: W,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for measurement in measurements {
        wtr.write_record(measurement.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the summary to a file
pub fn export_summary(measurements: &[GravityMeasurement], path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_summary(measurements, File::create(path)?)?;
    log::info!("Wrote {} measurements to {path:?}", measurements.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_file::parse_project_reader;
    use crate::project_file::tests::{legacy_report, modern_report};

    #[test]
    fn test_summary_has_fixed_columns() {
        let measurements: Vec<GravityMeasurement> = [
            modern_report("ABQ1", "08/19/18", "09:00:00"),
            legacy_report("ABQ2", "08/19/18", "10:00:00"),
        ]
        .iter()
        .map(|r| parse_project_reader(r.as_bytes(), Path::new("x.project.txt")).unwrap())
        .collect();

        let mut out: Vec<u8> = Vec::new();
        write_summary(&measurements, &mut out).unwrap();

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(out.as_slice());
        let header = rdr.headers().unwrap().clone();
        assert_eq!(header.len(), COLUMNS.len());
        assert_eq!(&header[2], "Station Name");
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == COLUMNS.len()));
        assert_eq!(&rows[0][2], "ABQ1");
        assert_eq!(&rows[1][2], "ABQ2");
        assert_eq!(&rows[1][6], "-999");
    }
}
