/// Placeholder written for any field a project file does not carry
pub const SENTINEL: &str = "-999";

/// Maximum separation between a gravity measurement and a cosmic-ray occupation
pub const COSMIC_RAY_THRESHOLD_SECS: i64 = 25 * 60;
/// Maximum separation between a gravity measurement and a GPS session
pub const GPS_THRESHOLD_SECS: i64 = 25 * 60;
/// Maximum separation between a gravity measurement and a photo
pub const PHOTO_THRESHOLD_SECS: i64 = 30 * 60;

/// Lat/long displacement (degrees) below which consecutive probe records count as stationary
pub const COSMOS_DISTANCE_CRITERION: f64 = 0.002;
/// The probe logs every five minutes; any other spacing breaks an occupation
pub const COSMOS_RECORD_INTERVAL_SECS: i64 = 300;

/// First g-software version which writes heights, time offset and the transfer height correction
pub const HEIGHTS_MIN_VERSION: f64 = 5.0;

pub const COMMENT_SEPARATOR: &str = " | ";

/// How many days before today the default date window opens
pub const START_DATE_OFFSET_DAYS: i64 = 60;

/// Length of a hydrological-network site identifier
pub const SITE_ID_LENGTH: usize = 15;

pub const PHOTO_SUFFIXES: &str = "abcdefghijklmnopqrstuvwxyz";
