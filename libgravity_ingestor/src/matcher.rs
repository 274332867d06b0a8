use time::{Duration, PrimitiveDateTime};

use super::measurement::GravityMeasurement;
use super::photo::Photo;

/// Anything that can be matched against a gravity measurement by time
pub trait Timestamped {
    fn timestamp(&self) -> PrimitiveDateTime;
}

/// A matchable record with a dwell length, used to break ties
pub trait Candidate: Timestamped {
    fn duration(&self) -> usize;
}

/// True if the candidate lies strictly inside the window around the reference
pub fn within_window(
    reference: PrimitiveDateTime,
    candidate: PrimitiveDateTime,
    threshold: Duration,
) -> bool {
    (reference - candidate).abs() < threshold
}

/// The longest candidate inside the window. Equal durations keep the earlier candidate.
pub fn best_match<C: Candidate>(
    reference: PrimitiveDateTime,
    candidates: &[C],
    threshold: Duration,
) -> Option<&C> {
    candidates
        .iter()
        .filter(|c| within_window(reference, c.timestamp(), threshold))
        .fold(None, |best: Option<&C>, c| match best {
            Some(b) if b.duration() >= c.duration() => Some(b),
            _ => Some(c),
        })
}

/// Every candidate inside the window, in input order
pub fn all_matches<T: Timestamped>(
    reference: PrimitiveDateTime,
    candidates: &[T],
    threshold: Duration,
) -> Vec<&T> {
    candidates
        .iter()
        .filter(|c| within_window(reference, c.timestamp(), threshold))
        .collect()
}

/// Give each measurement its best candidate, written through `slot`.
///
/// Measurements with no candidate keep None. A candidate may be claimed by more than one
/// measurement. Returns how many measurements were matched.
pub fn assign_best<C, F>(
    measurements: &mut [GravityMeasurement],
    candidates: &[C],
    threshold: Duration,
    mut slot: F,
) -> usize
where
    C: Candidate + Clone,
    F: FnMut(&mut GravityMeasurement) -> &mut Option<C>,
{
    let mut matched = 0;
    for measurement in measurements.iter_mut() {
        let Some(reference) = measurement.timestamp() else {
            log::debug!("No timestamp for {:?}, not matching", measurement.path);
            continue;
        };
        if let Some(best) = best_match(reference, candidates, threshold) {
            *slot(measurement) = Some(best.clone());
            matched += 1;
        }
    }
    matched
}

/// Give each measurement every photo inside the window. Returns the number of photo
/// assignments made.
pub fn assign_photos(
    measurements: &mut [GravityMeasurement],
    photos: &[Photo],
    threshold: Duration,
) -> usize {
    let mut assigned = 0;
    for measurement in measurements.iter_mut() {
        let Some(reference) = measurement.timestamp() else {
            continue;
        };
        measurement.photos = all_matches(reference, photos, threshold)
            .into_iter()
            .cloned()
            .collect();
        assigned += measurement.photos.len();
    }
    assigned
}
