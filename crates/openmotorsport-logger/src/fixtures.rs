//! Synthetic host event streams for tests and the simulator binary.

use crate::events::{
    GamePhase, HostCallbacks, ScoringUpdate, TelemetryUpdate, Vec3, VehicleScoring,
    WheelTelemetry,
};
use std::f64::consts::TAU;

/// One callback invocation recorded from (or destined for) a host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    EnterRealtime,
    Telemetry(TelemetryUpdate),
    Scoring(ScoringUpdate),
    ExitRealtime,
}

/// Feed `events` to `host` in order.
pub fn dispatch<H: HostCallbacks + ?Sized>(events: &[HostEvent], host: &mut H) {
    for event in events {
        match event {
            HostEvent::EnterRealtime => host.on_enter_realtime(),
            HostEvent::Telemetry(update) => host.on_telemetry(update),
            HostEvent::Scoring(update) => host.on_scoring(update),
            HostEvent::ExitRealtime => host.on_exit_realtime(),
        }
    }
}

const WHEEL_RADIUS_M: f64 = 0.33;

/// Position of the car at one physics frame.
#[derive(Debug, Clone, Copy)]
struct Frame {
    et: f64,
    /// `None` while the session has not gone green yet
    lap: Option<LapProgress>,
}

#[derive(Debug, Clone, Copy)]
struct LapProgress {
    number: u32,
    /// 0, 1 or 2
    sector_index: u32,
    lap_start_et: f64,
    /// Laps driven since the green flag, fractional
    total_progress: f64,
}

/// Deterministic event stream of a car lapping a circular track.
///
/// The car sits on the grid during an optional formation period, then drives
/// an untimed out-lap followed by `laps` timed laps at constant speed. Sector
/// splits are published from the first timed lap onwards, and the previous
/// lap's times once a timed lap has been completed.
#[derive(Debug, Clone)]
pub struct SyntheticRun {
    laps: u32,
    frame_rate_hz: u32,
    scoring_rate_hz: u32,
    lap_time_s: u32,
    lap_length_m: f64,
    entry_phase: GamePhase,
    formation_s: u32,
    session_kind: i32,
    driver: String,
    vehicle: String,
    vehicle_class: String,
    track: String,
}

impl Default for SyntheticRun {
    fn default() -> Self {
        Self {
            laps: 2,
            frame_rate_hz: 50,
            scoring_rate_hz: 5,
            lap_time_s: 60,
            lap_length_m: 2_400.0,
            entry_phase: GamePhase::GreenFlag,
            formation_s: 10,
            session_kind: 0,
            driver: "Test Driver".to_string(),
            vehicle: "Synthetic GT".to_string(),
            vehicle_class: "GT".to_string(),
            track: "Synthetic Oval".to_string(),
        }
    }
}

impl SyntheticRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timed laps driven after the out-lap.
    pub fn laps(mut self, laps: u32) -> Self {
        self.laps = laps;
        self
    }

    pub fn frame_rate_hz(mut self, hz: u32) -> Self {
        self.frame_rate_hz = hz.max(1);
        self
    }

    pub fn scoring_rate_hz(mut self, hz: u32) -> Self {
        self.scoring_rate_hz = hz.max(1);
        self
    }

    pub fn lap_time_s(mut self, seconds: u32) -> Self {
        self.lap_time_s = seconds.max(1);
        self
    }

    pub fn lap_length_m(mut self, meters: f64) -> Self {
        self.lap_length_m = meters;
        self
    }

    /// Game phase reported when the player enters the car.
    ///
    /// Phases that do not start logging on entry are followed by a formation
    /// period before the green flag.
    pub fn entry_phase(mut self, phase: GamePhase) -> Self {
        self.entry_phase = phase;
        self
    }

    pub fn formation_s(mut self, seconds: u32) -> Self {
        self.formation_s = seconds;
        self
    }

    pub fn session_kind(mut self, code: i32) -> Self {
        self.session_kind = code;
        self
    }

    pub fn driver(mut self, name: impl Into<String>) -> Self {
        self.driver = name.into();
        self
    }

    pub fn vehicle(mut self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.vehicle = name.into();
        self.vehicle_class = class.into();
        self
    }

    pub fn track(mut self, name: impl Into<String>) -> Self {
        self.track = name.into();
        self
    }

    fn frame_time_s(&self) -> f64 {
        1.0 / f64::from(self.frame_rate_hz)
    }

    fn formation_frames(&self) -> u32 {
        if GamePhase::starts_logging_on_entry(self.entry_phase.raw()) {
            0
        } else {
            self.formation_s.saturating_mul(self.frame_rate_hz)
        }
    }

    fn lap_frames(&self) -> u32 {
        self.lap_time_s.saturating_mul(self.frame_rate_hz).max(1)
    }

    fn green_phase(&self) -> GamePhase {
        if GamePhase::starts_logging_on_entry(self.entry_phase.raw()) {
            self.entry_phase
        } else {
            GamePhase::GreenFlag
        }
    }

    fn frame(&self, index: u32) -> Frame {
        let dt = self.frame_time_s();
        let formation = self.formation_frames();
        let et = f64::from(index) * dt;

        let Some(driven) = index.checked_sub(formation) else {
            return Frame { et, lap: None };
        };

        let lap_frames = self.lap_frames();
        let number = driven / lap_frames;
        let within = driven % lap_frames;
        let lap_start = formation.saturating_add(number.saturating_mul(lap_frames));

        Frame {
            et,
            lap: Some(LapProgress {
                number,
                sector_index: within.saturating_mul(3) / lap_frames,
                lap_start_et: f64::from(lap_start) * dt,
                total_progress: f64::from(driven) / f64::from(lap_frames),
            }),
        }
    }

    fn telemetry(&self, frame: &Frame) -> TelemetryUpdate {
        let radius = self.lap_length_m / TAU;
        let (lap_number, lap_start_et, angle, speed) = match frame.lap {
            Some(lap) => (
                i32::try_from(lap.number).unwrap_or(i32::MAX),
                lap.lap_start_et,
                lap.total_progress * TAU,
                self.lap_length_m / f64::from(self.lap_time_s),
            ),
            None => (0, 0.0, 0.0, 0.0),
        };
        let moving = speed > 0.0;

        let wheel = WheelTelemetry {
            rotation: -speed / WHEEL_RADIUS_M,
            suspension_deflection: 0.02,
            ride_height: 0.05,
            tire_load: 3_500.0,
            lateral_force: if moving { 1_200.0 } else { 0.0 },
            brake_temp: if moving { 420.0 } else { 80.0 },
            pressure: 170.0,
            temperature: [82.0, 85.0, 83.0],
        };

        TelemetryUpdate {
            delta_time: self.frame_time_s(),
            lap_number,
            lap_start_et,
            pos: Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin()),
            local_vel: Vec3::new(0.0, 0.0, -speed),
            local_accel: Vec3::new(if moving { speed * speed / radius } else { 0.0 }, 0.0, 0.0),
            ori: [
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            gear: if moving { 4 } else { 1 },
            engine_rpm: if moving { 6_800.0 } else { 1_100.0 },
            clutch_rpm: if moving { 6_800.0 } else { 0.0 },
            fuel: 60.0 - frame.et * 0.02,
            overheating: false,
            unfiltered_throttle: if moving { 1.0 } else { 0.0 },
            unfiltered_brake: 0.0,
            unfiltered_clutch: if moving { 0.0 } else { 1.0 },
            unfiltered_steering: if moving { 0.1 } else { 0.0 },
            wheels: [wheel; 4],
        }
    }

    fn player_scoring(&self, frame: &Frame) -> VehicleScoring {
        let lap_time = f64::from(self.lap_time_s);
        let mut vehicle = VehicleScoring {
            driver_name: self.driver.clone(),
            vehicle_name: self.vehicle.clone(),
            vehicle_class: self.vehicle_class.clone(),
            is_player: true,
            sector: 1,
            ..VehicleScoring::default()
        };

        let Some(lap) = frame.lap else {
            return vehicle;
        };

        vehicle.sector = match lap.sector_index {
            0 => 1,
            1 => 2,
            _ => 0,
        };
        vehicle.total_laps = i32::try_from(lap.number).unwrap_or(i32::MAX);
        vehicle.lap_start_et = lap.lap_start_et;

        if lap.number >= 1 {
            if lap.sector_index >= 1 {
                vehicle.cur_sector1 = lap_time / 3.0;
            }
            if lap.sector_index >= 2 {
                vehicle.cur_sector2 = lap_time * 2.0 / 3.0;
            }
        }
        if lap.number >= 2 {
            vehicle.last_lap_time = lap_time;
            vehicle.last_sector1 = lap_time / 3.0;
            vehicle.last_sector2 = lap_time * 2.0 / 3.0;
        }
        vehicle
    }

    fn scoring(&self, frame: &Frame) -> ScoringUpdate {
        let phase = if frame.lap.is_some() {
            self.green_phase()
        } else {
            self.entry_phase
        };

        ScoringUpdate {
            track_name: self.track.clone(),
            session: self.session_kind,
            game_phase: phase.raw(),
            current_et: frame.et,
            vehicles: vec![
                VehicleScoring {
                    driver_name: "AI Driver".to_string(),
                    vehicle_name: "AI Car".to_string(),
                    vehicle_class: self.vehicle_class.clone(),
                    sector: 1,
                    ..VehicleScoring::default()
                },
                self.player_scoring(frame),
            ],
        }
    }

    /// Total number of physics frames in the run.
    pub fn frame_count(&self) -> u32 {
        let driving_laps = self.laps.saturating_add(1);
        // One extra second so the final line crossing is reported.
        self.formation_frames()
            .saturating_add(driving_laps.saturating_mul(self.lap_frames()))
            .saturating_add(self.frame_rate_hz)
    }

    /// Generate the full event stream, from entering the car to leaving it.
    pub fn generate(&self) -> Vec<HostEvent> {
        let frames = self.frame_count();
        let scoring_every = (self.frame_rate_hz / self.scoring_rate_hz.min(self.frame_rate_hz)).max(1);
        let capacity = usize::try_from(frames + frames / scoring_every + 3).unwrap_or(0);
        let mut events = Vec::with_capacity(capacity);

        events.push(HostEvent::Scoring(self.scoring(&self.frame(0))));
        events.push(HostEvent::EnterRealtime);

        for index in 0..frames {
            let frame = self.frame(index);
            events.push(HostEvent::Telemetry(self.telemetry(&frame)));
            if index % scoring_every == 0 {
                events.push(HostEvent::Scoring(self.scoring(&frame)));
            }
        }

        events.push(HostEvent::ExitRealtime);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_sectors(events: &[HostEvent]) -> Vec<i8> {
        let mut sectors: Vec<i8> = Vec::new();
        for event in events {
            if let HostEvent::Scoring(update) = event
                && let Some(player) = update.player_vehicle()
                && sectors.last() != Some(&player.sector)
            {
                sectors.push(player.sector);
            }
        }
        sectors
    }

    #[test]
    fn test_stream_is_framed_by_realtime_events() {
        let events = SyntheticRun::new().laps(1).lap_time_s(6).generate();
        assert!(matches!(events.first(), Some(HostEvent::Scoring(_))));
        assert_eq!(events.get(1), Some(&HostEvent::EnterRealtime));
        assert_eq!(events.last(), Some(&HostEvent::ExitRealtime));
    }

    #[test]
    fn test_sectors_cycle_through_each_lap() {
        let events = SyntheticRun::new().laps(1).lap_time_s(6).generate();
        // Out-lap, one timed lap, then the start of the next lap.
        assert_eq!(player_sectors(&events), vec![1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_out_lap_has_no_splits() {
        let run = SyntheticRun::new().laps(2).lap_time_s(6);
        let out_lap = run.player_scoring(&run.frame(run.lap_frames() - 1));
        assert!(out_lap.cur_sector1 <= 0.0 && out_lap.cur_sector2 <= 0.0);
        assert!(out_lap.last_lap_time <= 0.0);

        let timed = run.player_scoring(&run.frame(2 * run.lap_frames() - 1));
        assert!((timed.cur_sector1 - 2.0).abs() < 1e-9);
        assert!((timed.cur_sector2 - 4.0).abs() < 1e-9);

        let next = run.player_scoring(&run.frame(2 * run.lap_frames()));
        assert!((next.last_lap_time - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_formation_period_precedes_green_flag() {
        let run = SyntheticRun::new()
            .entry_phase(GamePhase::FormationLap)
            .formation_s(2)
            .laps(0)
            .lap_time_s(3);
        let events = run.generate();

        let first_green = events.iter().find_map(|event| match event {
            HostEvent::Scoring(update) if update.game_phase == GamePhase::GreenFlag.raw() => {
                update.player_vehicle().map(|v| v.lap_start_et)
            }
            _ => None,
        });
        assert!(first_green.is_some_and(|et| (et - 2.0).abs() < 1e-9));

        let formation_telemetry = events.iter().find_map(|event| match event {
            HostEvent::Telemetry(update) => Some(update.lap_start_et),
            _ => None,
        });
        assert_eq!(formation_telemetry, Some(0.0));
    }

    #[test]
    fn test_dispatch_counts_callbacks() {
        #[derive(Default)]
        struct Counter {
            enter: u32,
            exit: u32,
            telemetry: u32,
            scoring: u32,
        }

        impl HostCallbacks for Counter {
            fn on_enter_realtime(&mut self) {
                self.enter += 1;
            }
            fn on_exit_realtime(&mut self) {
                self.exit += 1;
            }
            fn on_telemetry(&mut self, _update: &TelemetryUpdate) {
                self.telemetry += 1;
            }
            fn on_scoring(&mut self, _update: &ScoringUpdate) {
                self.scoring += 1;
            }
        }

        let run = SyntheticRun::new()
            .laps(0)
            .lap_time_s(2)
            .frame_rate_hz(10)
            .scoring_rate_hz(2);
        let mut counter = Counter::default();
        dispatch(&run.generate(), &mut counter);

        assert_eq!(counter.enter, 1);
        assert_eq!(counter.exit, 1);
        assert_eq!(counter.telemetry, run.frame_count());
        // One scoring update before entry plus one every fifth frame.
        assert_eq!(counter.scoring, 1 + run.frame_count().div_ceil(5));
    }
}
