//! Sector and lap boundary markers.

/// Ordered list of session-relative marker times in milliseconds.
///
/// The list never decreases: an absolute marker earlier than the last one is
/// clamped up to the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerList {
    times_ms: Vec<u64>,
}

impl MarkerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a marker at `time_ms` from session start.
    ///
    /// Returns the stored value.
    pub fn add_marker(&mut self, time_ms: u64) -> u64 {
        let time_ms = match self.last() {
            Some(last) if time_ms < last => {
                tracing::debug!(time_ms, last, "Marker earlier than previous, clamping");
                last
            }
            _ => time_ms,
        };
        self.times_ms.push(time_ms);
        time_ms
    }

    /// Append a marker `delta_ms` after the last one, or at `delta_ms` if the
    /// list is empty.
    ///
    /// Returns the stored value.
    pub fn add_relative_marker(&mut self, delta_ms: u64) -> u64 {
        let time_ms = self.last().unwrap_or(0).saturating_add(delta_ms);
        self.times_ms.push(time_ms);
        time_ms
    }

    pub fn last(&self) -> Option<u64> {
        self.times_ms.last().copied()
    }

    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.times_ms
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.times_ms.iter().copied()
    }
}

/// Convert seconds to whole milliseconds, rounding to nearest.
///
/// Negative and non-finite inputs map to 0.
pub fn seconds_to_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    // `as` saturates for values beyond u64::MAX
    (seconds * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_marker_on_empty_list() {
        let mut markers = MarkerList::new();
        assert_eq!(markers.add_relative_marker(34_200), 34_200);
        assert_eq!(markers.as_slice(), &[34_200]);
    }

    #[test]
    fn test_relative_marker_adds_to_last() {
        let mut markers = MarkerList::new();
        markers.add_marker(1_000);
        markers.add_relative_marker(500);
        markers.add_relative_marker(250);
        assert_eq!(markers.as_slice(), &[1_000, 1_500, 1_750]);
    }

    #[test]
    fn test_absolute_marker_is_clamped() {
        let mut markers = MarkerList::new();
        markers.add_marker(5_000);
        assert_eq!(markers.add_marker(4_000), 5_000);
        assert_eq!(markers.as_slice(), &[5_000, 5_000]);
    }

    #[test]
    fn test_zero_relative_delta_repeats_last() {
        let mut markers = MarkerList::new();
        markers.add_marker(2_000);
        assert_eq!(markers.add_relative_marker(0), 2_000);
        assert_eq!(markers.add_relative_marker(300), 2_300);
    }

    #[test]
    fn test_seconds_to_millis_rounds() {
        assert_eq!(seconds_to_millis(34.2), 34_200);
        assert_eq!(seconds_to_millis(71.0 - 34.2), 36_800);
        assert_eq!(seconds_to_millis(0.0004), 0);
        assert_eq!(seconds_to_millis(0.0005), 1);
        assert_eq!(seconds_to_millis(-1.0), 0);
        assert_eq!(seconds_to_millis(f64::NAN), 0);
    }
}
