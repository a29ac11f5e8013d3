//! Lap and sector boundary reconstruction from scoring updates.
//!
//! The host reports the sector the car is currently in (1, 2, then 0 for the
//! third) and split times that only become available once a lap has been
//! completed. A boundary is recorded when the reported sector changes, for the
//! sector that was just completed:
//!
//! | entered  | completed    | marker                                   |
//! |----------|--------------|------------------------------------------|
//! | sector 1 | lap          | relative `last_lap_time - last_sector2`  |
//! | sector 2 | sector 1     | relative `cur_sector1`, else absolute    |
//! | sector 3 | sector 2     | relative `cur_sector2 - cur_sector1`, else absolute |
//!
//! Absolute fallbacks use the session elapsed time; they only occur on the
//! out-lap, before the host publishes splits.

use crate::events::VehicleScoring;
use openmotorsport_format::seconds_to_millis;
use tracing::trace;

/// Sector of a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sector {
    One,
    Two,
    Three,
}

impl Sector {
    /// Decode the host's sector value.
    pub fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            1 => Some(Sector::One),
            2 => Some(Sector::Two),
            0 => Some(Sector::Three),
            _ => None,
        }
    }
}

/// Marker produced by a sector change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorMarker {
    /// Milliseconds from session start
    Absolute(u64),
    /// Milliseconds after the previous marker
    Relative(u64),
}

/// Tracks the current sector of the controlled vehicle.
#[derive(Debug, Clone)]
pub struct SectorTracker {
    current: Sector,
}

impl Default for SectorTracker {
    fn default() -> Self {
        Self {
            current: Sector::One,
        }
    }
}

impl SectorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Sector {
        self.current
    }

    /// Feed a scoring record for the controlled vehicle.
    ///
    /// `elapsed_s` is the session elapsed time, used when no split is
    /// available yet. Returns the marker to record, if any.
    pub fn observe(&mut self, vehicle: &VehicleScoring, elapsed_s: f64) -> Option<SectorMarker> {
        let Some(sector) = Sector::from_raw(vehicle.sector) else {
            trace!(sector = vehicle.sector, "Ignoring unknown sector value");
            return None;
        };
        if sector == self.current {
            return None;
        }
        self.current = sector;

        match sector {
            Sector::One => (vehicle.last_lap_time > 0.0).then(|| {
                SectorMarker::Relative(seconds_to_millis(
                    vehicle.last_lap_time - vehicle.last_sector2,
                ))
            }),
            Sector::Two => Some(if vehicle.cur_sector1 > 0.0 {
                SectorMarker::Relative(seconds_to_millis(vehicle.cur_sector1))
            } else {
                SectorMarker::Absolute(seconds_to_millis(elapsed_s))
            }),
            Sector::Three => Some(if vehicle.cur_sector2 > 0.0 {
                SectorMarker::Relative(seconds_to_millis(
                    vehicle.cur_sector2 - vehicle.cur_sector1,
                ))
            } else {
                SectorMarker::Absolute(seconds_to_millis(elapsed_s))
            }),
        }
    }
}
