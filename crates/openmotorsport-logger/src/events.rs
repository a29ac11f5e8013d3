//! Host event payloads and callback surface
//!
//! These are plain data structs the adapter layer fills in from the
//! simulator's plugin API. Units follow the host: metres, seconds, radians,
//! Newtons, kPa and degrees Celsius.

/// Three-component vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z).length()
    }
}

/// Per-wheel telemetry, ordered LF, RF, LR, RR in [`TelemetryUpdate::wheels`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelTelemetry {
    /// Wheel rotation (radians/sec)
    pub rotation: f64,
    /// Suspension deflection (meters)
    pub suspension_deflection: f64,
    /// Ride height (meters)
    pub ride_height: f64,
    /// Tire load (Newtons)
    pub tire_load: f64,
    /// Lateral force (Newtons)
    pub lateral_force: f64,
    /// Brake temperature (Celsius)
    pub brake_temp: f64,
    /// Tire pressure
    pub pressure: f64,
    /// Tire temperature (Celsius) - left, center, right
    pub temperature: [f64; 3],
}

/// One physics-frame telemetry update for the controlled vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryUpdate {
    /// Time since the previous update (seconds)
    pub delta_time: f64,
    /// Current lap number
    pub lap_number: i32,
    /// Elapsed time at which the current lap started (seconds)
    pub lap_start_et: f64,
    /// World position (meters)
    pub pos: Vec3,
    /// Local velocity (m/s)
    pub local_vel: Vec3,
    /// Local acceleration (m/s^2)
    pub local_accel: Vec3,
    /// Orientation matrix rows
    pub ori: [Vec3; 3],
    /// Gear (-1=reverse, 0=neutral, 1+=forward)
    pub gear: i32,
    /// Engine RPM
    pub engine_rpm: f64,
    /// Clutch RPM
    pub clutch_rpm: f64,
    /// Fuel (liters)
    pub fuel: f64,
    /// Engine overheating flag
    pub overheating: bool,
    /// Unfiltered throttle (0.0-1.0)
    pub unfiltered_throttle: f64,
    /// Unfiltered brake (0.0-1.0)
    pub unfiltered_brake: f64,
    /// Unfiltered clutch (0.0-1.0)
    pub unfiltered_clutch: f64,
    /// Unfiltered steering (-1.0 to 1.0)
    pub unfiltered_steering: f64,
    /// Wheel data (LF, RF, LR, RR)
    pub wheels: [WheelTelemetry; 4],
}

/// Scoring information for one vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleScoring {
    pub driver_name: String,
    pub vehicle_name: String,
    pub vehicle_class: String,
    /// Whether this vehicle is the one controlled locally
    pub is_player: bool,
    /// Current sector as reported by the host (1, 2, then 0 for the third)
    pub sector: i8,
    pub total_laps: i32,
    /// Elapsed time at which the current lap started (seconds)
    pub lap_start_et: f64,
    pub last_lap_time: f64,
    pub last_sector1: f64,
    pub last_sector2: f64,
    /// Current lap sector 1 split, 0 until known
    pub cur_sector1: f64,
    /// Current lap sector 2 split (cumulative), 0 until known
    pub cur_sector2: f64,
}

/// Session-wide scoring update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringUpdate {
    pub track_name: String,
    /// Raw session kind code
    pub session: i32,
    /// Raw game phase code
    pub game_phase: u8,
    /// Current session elapsed time (seconds)
    pub current_et: f64,
    pub vehicles: Vec<VehicleScoring>,
}

impl ScoringUpdate {
    /// The locally controlled vehicle, if present.
    pub fn player_vehicle(&self) -> Option<&VehicleScoring> {
        self.vehicles.iter().find(|vehicle| vehicle.is_player)
    }
}

/// Session stage reported by the host.
///
/// Phases compare by their raw value; a drop in raw value while driving
/// means the session was restarted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GamePhase {
    BeforeSession = 0,
    ReconnaissanceLaps = 1,
    GridWalkThrough = 2,
    FormationLap = 3,
    StartingLightCountdown = 4,
    GreenFlag = 5,
    FullCourseYellow = 6,
    SessionStopped = 7,
    SessionOver = 8,
}

impl GamePhase {
    /// Decode a raw phase value.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(GamePhase::BeforeSession),
            1 => Some(GamePhase::ReconnaissanceLaps),
            2 => Some(GamePhase::GridWalkThrough),
            3 => Some(GamePhase::FormationLap),
            4 => Some(GamePhase::StartingLightCountdown),
            5 => Some(GamePhase::GreenFlag),
            6 => Some(GamePhase::FullCourseYellow),
            7 => Some(GamePhase::SessionStopped),
            8 => Some(GamePhase::SessionOver),
            _ => None,
        }
    }

    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Whether entering real-time mode in this phase starts logging at once.
    ///
    /// Any other phase is the lead-up to a race start; logging then waits
    /// for the green flag so formation laps are not recorded.
    pub fn starts_logging_on_entry(raw: u8) -> bool {
        matches!(
            GamePhase::from_raw(raw),
            Some(GamePhase::BeforeSession | GamePhase::GreenFlag | GamePhase::FullCourseYellow)
        )
    }
}

/// Session kind label written to the session comment.
///
/// Unknown codes map to an empty label.
pub fn session_kind_label(code: i32) -> &'static str {
    match code {
        0 => "Testing",
        1 => "Practice",
        5 => "Qualifying",
        6 => "Warmup",
        7 => "Race",
        _ => "",
    }
}

/// Narrow callback surface a host plugin drives.
pub trait HostCallbacks {
    /// The player entered the cockpit (real-time mode).
    fn on_enter_realtime(&mut self);

    /// The player left real-time mode.
    fn on_exit_realtime(&mut self);

    /// A physics-frame telemetry update arrived.
    fn on_telemetry(&mut self, update: &TelemetryUpdate);

    /// A scoring update arrived.
    fn on_scoring(&mut self, update: &ScoringUpdate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_round_trip_and_unknown() {
        for raw in 0u8..=8 {
            assert_eq!(GamePhase::from_raw(raw).map(GamePhase::raw), Some(raw));
        }
        assert_eq!(GamePhase::from_raw(9), None);
        assert_eq!(GamePhase::from_raw(255), None);
    }

    #[test]
    fn test_phase_ordering_uses_raw_value() {
        assert!(GamePhase::FormationLap < GamePhase::GreenFlag);
        assert!(GamePhase::SessionOver > GamePhase::FullCourseYellow);
    }

    #[test]
    fn test_entry_phases() {
        assert!(GamePhase::starts_logging_on_entry(0));
        assert!(GamePhase::starts_logging_on_entry(5));
        assert!(GamePhase::starts_logging_on_entry(6));
        for raw in [1u8, 2, 3, 4, 7, 8, 10] {
            assert!(!GamePhase::starts_logging_on_entry(raw), "phase {raw}");
        }
    }

    #[test]
    fn test_session_kind_labels() {
        assert_eq!(session_kind_label(0), "Testing");
        assert_eq!(session_kind_label(1), "Practice");
        assert_eq!(session_kind_label(3), "");
        assert_eq!(session_kind_label(5), "Qualifying");
        assert_eq!(session_kind_label(6), "Warmup");
        assert_eq!(session_kind_label(7), "Race");
        assert_eq!(session_kind_label(-1), "");
    }

    #[test]
    fn test_player_vehicle_lookup() {
        let mut scoring = ScoringUpdate::default();
        assert!(scoring.player_vehicle().is_none());

        scoring.vehicles.push(VehicleScoring {
            driver_name: "AI".to_string(),
            ..VehicleScoring::default()
        });
        scoring.vehicles.push(VehicleScoring {
            driver_name: "Player".to_string(),
            is_player: true,
            ..VehicleScoring::default()
        });

        assert_eq!(
            scoring.player_vehicle().map(|v| v.driver_name.as_str()),
            Some("Player")
        );
    }

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
