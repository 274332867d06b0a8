use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use exif::{In, Tag, Value};
use time::{Date, Duration, Month, PrimitiveDateTime, Time};
use walkdir::WalkDir;

use super::error::PhotoError;
use super::matcher::Timestamped;
use super::status::SkipNote;

/// A site photo and the time it was taken, corrected to the gravity meter's clock
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub path: PathBuf,
    pub time: PrimitiveDateTime,
}

impl Timestamped for Photo {
    fn timestamp(&self) -> PrimitiveDateTime {
        self.time
    }
}

/// Photos are any `.jpg`, whatever the case of the extension
pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg"))
}

/// Convert an EXIF timestamp to a measurement-clock time by removing the camera's
/// offset in hours.
pub fn camera_time(stamp: &exif::DateTime, hour_offset: i64) -> Option<PrimitiveDateTime> {
    let month = Month::try_from(stamp.month).ok()?;
    let date = Date::from_calendar_date(stamp.year as i32, month, stamp.day).ok()?;
    let time = Time::from_hms(stamp.hour, stamp.minute, stamp.second).ok()?;
    Some(PrimitiveDateTime::new(date, time) - Duration::hours(hour_offset))
}

impl Photo {
    /// Read a photo's DateTimeOriginal tag
    pub fn read(path: &Path, hour_offset: i64) -> Result<Self, PhotoError> {
        let mut reader = BufReader::new(File::open(path)?);
        let exif = exif::Reader::new().read_from_container(&mut reader)?;
        let field = exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .ok_or_else(|| PhotoError::MissingDateTag(path.to_path_buf()))?;
        let stamp = match field.value {
            Value::Ascii(ref values) if !values.is_empty() => exif::DateTime::from_ascii(&values[0])
                .map_err(|_| PhotoError::BadDateTag(path.to_path_buf()))?,
            _ => return Err(PhotoError::BadDateTag(path.to_path_buf())),
        };
        let time = camera_time(&stamp, hour_offset)
            .ok_or_else(|| PhotoError::BadDateTag(path.to_path_buf()))?;
        Ok(Self {
            path: path.to_path_buf(),
            time,
        })
    }
}

/// Walk the photo directory and read every photo's timestamp.
///
/// Photos that cannot be read are noted and left out; they never stop the walk.
pub fn collect_photos(photo_dir: &Path, hour_offset: i64) -> (Vec<Photo>, Vec<SkipNote>) {
    let mut photos = Vec::new();
    let mut notes = Vec::new();
    for entry in WalkDir::new(photo_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                notes.push(SkipNote::new(photo_dir, PhotoError::from(e)));
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_photo(entry.path()) {
            continue;
        }
        match Photo::read(entry.path(), hour_offset) {
            Ok(photo) => photos.push(photo),
            Err(e) => {
                log::warn!("Skipping photo {:?}: {e}", entry.path());
                notes.push(SkipNote::new(entry.path(), e));
            }
        }
    }
    log::info!("Found {} photos in {photo_dir:?}", photos.len());
    (photos, notes)
}
