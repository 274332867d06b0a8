use std::path::{Path, PathBuf};
use time::{Duration, PrimitiveDateTime};

use super::constants::{COSMOS_DISTANCE_CRITERION, COSMOS_RECORD_INTERVAL_SECS};
use super::timestamp::mean_timestamp;

/// One timestamped, positioned record of an auxiliary sensor log
pub trait Sample {
    fn timestamp(&self) -> PrimitiveDateTime;
    /// (latitude, longitude) in decimal degrees
    fn position(&self) -> (f64, f64);
}

/// When two consecutive samples belong to the same stationary dwell
#[derive(Debug, Clone, Copy)]
pub struct StationarityCriteria {
    /// Euclidean lat/long displacement, in degrees (not a geodesic distance)
    pub max_displacement: f64,
    /// The only sample spacing which continues a dwell
    pub nominal_interval: Duration,
}

impl Default for StationarityCriteria {
    fn default() -> Self {
        Self {
            max_displacement: COSMOS_DISTANCE_CRITERION,
            nominal_interval: Duration::seconds(COSMOS_RECORD_INTERVAL_SECS),
        }
    }
}

impl StationarityCriteria {
    pub fn is_stationary<S: Sample>(&self, previous: &S, current: &S) -> bool {
        let (lat0, lon0) = previous.position();
        let (lat1, lon1) = current.position();
        let displacement = ((lat1 - lat0).powi(2) + (lon1 - lon0).powi(2)).sqrt();
        displacement < self.max_displacement
            && current.timestamp() - previous.timestamp() == self.nominal_interval
    }
}

/// A contiguous run of samples recorded while the sensor sat still
#[derive(Debug, Clone, PartialEq)]
pub struct Occupation<S> {
    pub source: PathBuf,
    /// Index of the first sample within the source log
    pub first_index: usize,
    pub samples: Vec<S>,
}

impl<S: Sample> Occupation<S> {
    /// Mean sample time
    pub fn mean_time(&self) -> PrimitiveDateTime {
        // Occupations always hold at least two samples
        mean_timestamp(self.samples.iter().map(|s| s.timestamp()))
            .unwrap_or_else(|| self.samples[0].timestamp())
    }

    /// Number of samples; a stand-in for dwell length, not wall-clock time
    pub fn duration(&self) -> usize {
        self.samples.len()
    }

    pub fn last_index(&self) -> usize {
        self.first_index + self.samples.len() - 1
    }
}

/// Lazily walks a sample log, yielding each stationary run of more than one sample.
///
/// Runs of a single sample are dropped. The iterator is a pure function of its input, so
/// segmenting the same log again yields identical occupations.
pub struct Segments<'a, S> {
    samples: &'a [S],
    criteria: StationarityCriteria,
    source: &'a Path,
    cursor: usize,
}

impl<'a, S: Sample + Clone> Segments<'a, S> {
    pub fn new(samples: &'a [S], criteria: StationarityCriteria, source: &'a Path) -> Self {
        Self {
            samples,
            criteria,
            source,
            cursor: 0,
        }
    }
}

impl<S: Sample + Clone> Iterator for Segments<'_, S> {
    type Item = Occupation<S>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.samples.len() {
            let start = self.cursor;
            let mut end = start + 1;
            while end < self.samples.len()
                && self
                    .criteria
                    .is_stationary(&self.samples[end - 1], &self.samples[end])
            {
                end += 1;
            }
            // The breaking sample starts the next run
            self.cursor = end;
            if end - start > 1 {
                return Some(Occupation {
                    source: self.source.to_path_buf(),
                    first_index: start,
                    samples: self.samples[start..end].to_vec(),
                });
            }
        }
        None
    }
}

/// Split a time-ordered sample log into stationary occupations
pub fn segment<S: Sample + Clone>(
    samples: &[S],
    criteria: &StationarityCriteria,
    source: &Path,
) -> Vec<Occupation<S>> {
    Segments::new(samples, *criteria, source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[derive(Debug, Clone, PartialEq)]
    struct Fix {
        time: PrimitiveDateTime,
        lat: f64,
        lon: f64,
    }

    impl Sample for Fix {
        fn timestamp(&self) -> PrimitiveDateTime {
            self.time
        }
        fn position(&self) -> (f64, f64) {
            (self.lat, self.lon)
        }
    }

    fn fixes(start: PrimitiveDateTime, step_secs: i64, positions: &[(f64, f64)]) -> Vec<Fix> {
        positions
            .iter()
            .enumerate()
            .map(|(i, (lat, lon))| Fix {
                time: start + Duration::seconds(step_secs * i as i64),
                lat: *lat,
                lon: *lon,
            })
            .collect()
    }

    #[test]
    fn test_all_stationary_is_one_occupation() {
        let log = fixes(datetime!(2018-08-19 09:00:00), 300, &[(35.0, -106.0); 6]);
        let occs = segment(&log, &StationarityCriteria::default(), Path::new("cr.dat"));
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].duration(), 6);
        assert_eq!(occs[0].first_index, 0);
        assert_eq!(occs[0].last_index(), 5);
        assert_eq!(occs[0].mean_time(), datetime!(2018-08-19 09:12:30));
    }

    #[test]
    fn test_nothing_stationary_is_no_occupation() {
        let moving: Vec<(f64, f64)> = (0..6).map(|i| (35.0 + 0.01 * i as f64, -106.0)).collect();
        let log = fixes(datetime!(2018-08-19 09:00:00), 300, &moving);
        assert!(segment(&log, &StationarityCriteria::default(), Path::new("cr.dat")).is_empty());

        let irregular = fixes(datetime!(2018-08-19 09:00:00), 301, &[(35.0, -106.0); 6]);
        assert!(
            segment(&irregular, &StationarityCriteria::default(), Path::new("cr.dat")).is_empty()
        );
    }

    #[test]
    fn test_breaks_and_single_sample_runs() {
        // Two-sample dwell, a lone sample after a jump, then a three-sample dwell
        let log = fixes(
            datetime!(2018-08-19 09:00:00),
            300,
            &[
                (35.0, -106.0),
                (35.0, -106.0),
                (35.1, -106.0),
                (35.2, -106.0),
                (35.2, -106.0),
                (35.2, -106.0),
            ],
        );
        let occs = segment(&log, &StationarityCriteria::default(), Path::new("cr.dat"));
        assert_eq!(occs.len(), 2);
        assert_eq!((occs[0].first_index, occs[0].duration()), (0, 2));
        assert_eq!((occs[1].first_index, occs[1].duration()), (3, 3));
    }

    #[test]
    fn test_segmentation_is_repeatable() {
        let log = fixes(
            datetime!(2018-08-19 09:00:00),
            300,
            &[(35.0, -106.0), (35.0, -106.0), (36.0, -106.0), (36.0, -106.0)],
        );
        let criteria = StationarityCriteria::default();
        let first = segment(&log, &criteria, Path::new("cr.dat"));
        let second: Vec<_> = Segments::new(&log, criteria, Path::new("cr.dat")).collect();
        assert_eq!(first, second);
    }
}
