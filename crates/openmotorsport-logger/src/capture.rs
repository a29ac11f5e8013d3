//! Capture state machine
//!
//! [`CaptureMachine`] is driven by the host through [`HostCallbacks`]. It
//! decides when a session starts and stops, stamps telemetry with session
//! elapsed time, and turns scoring updates into metadata and lap/sector
//! markers. The session itself lives inside the active sampling pipeline.

use crate::config::{LoggerConfig, SamplingMode};
use crate::events::{GamePhase, HostCallbacks, ScoringUpdate, TelemetryUpdate, session_kind_label};
use crate::finalize::{SaveOutcome, SaveSequencer, SessionFinalizer};
use crate::pipeline::{
    InlinePipeline, PipelineCompletion, QueuedPipeline, SamplingPipeline, SessionCommand,
};
use crate::sampler::{Sampler, TimedSample};
use crate::schema::{SECTORS_PER_LAP, build_session};
use crate::sectors::SectorTracker;
use crate::sink::SessionSink;
use openmotorsport_format::{SessionMetadata, SessionResult, seconds_to_millis};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, trace, warn};

const GREEN_FLAG: u8 = GamePhase::GreenFlag.raw();

/// Capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Not in real-time mode
    Idle,
    /// In real-time mode, waiting for the start condition
    AwaitingEntryCondition,
    /// A session is being recorded
    Logging,
}

struct ActiveCapture {
    pipeline: Box<dyn SamplingPipeline>,
    sectors: SectorTracker,
    elapsed_s: f64,
    entry_lap: Option<i32>,
    current_lap: i32,
    out_lap_marked: bool,
    metadata_recorded: bool,
}

impl ActiveCapture {
    fn new(pipeline: Box<dyn SamplingPipeline>) -> Self {
        Self {
            pipeline,
            sectors: SectorTracker::new(),
            elapsed_s: 0.0,
            entry_lap: None,
            current_lap: 0,
            out_lap_marked: false,
            metadata_recorded: false,
        }
    }

    fn laps_completed(&self) -> i32 {
        self.entry_lap
            .map_or(0, |entry| self.current_lap.saturating_sub(entry))
    }

    fn record_telemetry(&mut self, update: &TelemetryUpdate) {
        let sample = TimedSample::new(self.elapsed_s, *update);

        match self.entry_lap {
            None => {
                debug!(lap = update.lap_number, "Entry lap recorded");
                self.entry_lap = Some(update.lap_number);
                self.pipeline.sample_now(sample);
            }
            Some(entry_lap) => {
                self.pipeline.offer(sample);
                if !self.out_lap_marked && update.lap_number > entry_lap {
                    self.out_lap_marked = true;
                    let at_ms = seconds_to_millis(self.elapsed_s);
                    debug!(at_ms, "Out-lap completed");
                    self.pipeline.apply(SessionCommand::AddMarker(at_ms));
                }
            }
        }

        self.current_lap = update.lap_number;
        self.elapsed_s += update.delta_time;
    }

    fn record_scoring(&mut self, update: &ScoringUpdate, data_source: &str) {
        let Some(player) = update.player_vehicle() else {
            trace!(vehicles = update.vehicles.len(), "No controlled vehicle in scoring");
            return;
        };

        if !self.metadata_recorded {
            self.metadata_recorded = true;
            let metadata = SessionMetadata {
                user: player.driver_name.clone(),
                vehicle: player.vehicle_name.clone(),
                vehicle_category: Some(player.vehicle_class.clone())
                    .filter(|class| !class.is_empty()),
                track: update.track_name.clone(),
                data_source: data_source.to_string(),
                comment: session_kind_label(update.session).to_string(),
                sectors: Some(SECTORS_PER_LAP),
            };
            self.pipeline.apply(SessionCommand::SetMetadata(metadata));
        }

        if let Some(marker) = self.sectors.observe(player, self.elapsed_s) {
            trace!(?marker, "Sector boundary");
            self.pipeline.apply(marker.into());
        }
    }
}

/// Decides when sessions start and stop and feeds the sampling pipeline.
///
/// Finished sessions are handed to the configured [`SessionSink`]. Inline
/// sessions are persisted before the stopping callback returns; queued
/// sessions are persisted by their worker, see
/// [`wait_for_pending_saves`](Self::wait_for_pending_saves). Saves run one
/// at a time in the order their sessions stopped.
///
/// Dropping the machine stops a running session and joins every queued
/// worker, so `drop` blocks until those sessions are saved. With a queued
/// pipeline that takes up to one sampling interval plus the write itself.
pub struct CaptureMachine {
    config: LoggerConfig,
    sink: Arc<dyn SessionSink>,
    state: CaptureState,
    in_realtime: bool,
    last_phase: Option<u8>,
    entry_phase: Option<u8>,
    active: Option<ActiveCapture>,
    retired: Vec<JoinHandle<SaveOutcome>>,
    outcomes: Vec<SaveOutcome>,
    saves: Arc<SaveSequencer>,
}

impl std::fmt::Debug for CaptureMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureMachine")
            .field("state", &self.state)
            .field("in_realtime", &self.in_realtime)
            .field("last_phase", &self.last_phase)
            .field("entry_phase", &self.entry_phase)
            .field("retired", &self.retired.len())
            .finish_non_exhaustive()
    }
}

impl CaptureMachine {
    pub fn new(config: LoggerConfig, sink: Arc<dyn SessionSink>) -> Self {
        Self {
            config,
            sink,
            state: CaptureState::Idle,
            in_realtime: false,
            last_phase: None,
            entry_phase: None,
            active: None,
            retired: Vec::new(),
            outcomes: Vec::new(),
            saves: SaveSequencer::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_logging(&self) -> bool {
        self.state == CaptureState::Logging
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Session elapsed time of the running capture, in seconds.
    pub fn elapsed_secs(&self) -> Option<f64> {
        self.active.as_ref().map(|active| active.elapsed_s)
    }

    /// Wait for queued sessions to be persisted and return every outcome
    /// collected since the last call, oldest first.
    pub fn wait_for_pending_saves(&mut self) -> Vec<SaveOutcome> {
        for handle in std::mem::take(&mut self.retired) {
            self.outcomes.push(join_worker(handle));
        }
        std::mem::take(&mut self.outcomes)
    }

    fn arm(&mut self, entry_phase: Option<u8>) {
        self.state = CaptureState::AwaitingEntryCondition;
        self.entry_phase = entry_phase;
        debug!(?entry_phase, "Waiting for logging start condition");

        if entry_phase.is_some_and(GamePhase::starts_logging_on_entry) {
            self.start_logging();
        }
    }

    fn build_pipeline(&self) -> SessionResult<Box<dyn SamplingPipeline>> {
        let interval_ms = self.config.sampling_interval_ms.max(1);
        let session = build_session(interval_ms)?;
        let sampler = Sampler::new(&session)?;

        if self.config.sampling_mode == SamplingMode::Inline {
            return Ok(Box::new(InlinePipeline::new(session, sampler, interval_ms)));
        }

        match QueuedPipeline::spawn(session, sampler, interval_ms, self.config.queue_capacity) {
            Ok(pipeline) => Ok(Box::new(pipeline)),
            Err(e) => {
                warn!(error = %e, "Failed to start sampling worker, sampling inline");
                let session = build_session(interval_ms)?;
                let sampler = Sampler::new(&session)?;
                Ok(Box::new(InlinePipeline::new(session, sampler, interval_ms)))
            }
        }
    }

    fn start_logging(&mut self) {
        let pipeline = match self.build_pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!(error = %e, "Channel schema is inconsistent, not logging");
                debug_assert!(false, "channel schema is inconsistent: {e}");
                return;
            }
        };

        info!(
            mode = ?pipeline.mode(),
            interval_ms = self.config.sampling_interval_ms,
            entry_phase = ?self.entry_phase,
            "Logging started"
        );
        self.active = Some(ActiveCapture::new(pipeline));
        self.state = CaptureState::Logging;
    }

    fn stop_logging(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.reap_finished_workers();

        let laps_completed = active.laps_completed();
        info!(
            laps_completed,
            elapsed_s = active.elapsed_s,
            "Logging stopped"
        );

        let finalizer =
            SessionFinalizer::new(self.config.clone(), Arc::clone(&self.sink), laps_completed)
                .in_turn(self.saves.ticket());
        match active.pipeline.finish(finalizer) {
            PipelineCompletion::Done(outcome) => self.outcomes.push(outcome),
            PipelineCompletion::Pending(handle) => self.retired.push(handle),
        }
    }

    fn reap_finished_workers(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retired)
            .into_iter()
            .partition(JoinHandle::is_finished);
        self.retired = running;
        for handle in finished {
            self.outcomes.push(join_worker(handle));
        }
    }

    fn deferred_start_allowed(&self, phase: u8, lap_start_et: f64) -> bool {
        self.state == CaptureState::AwaitingEntryCondition
            && phase >= GREEN_FLAG
            && lap_start_et > 0.0
    }
}

fn join_worker(handle: JoinHandle<SaveOutcome>) -> SaveOutcome {
    match handle.join() {
        Ok(outcome) => outcome,
        Err(_panic) => {
            error!("Sampling worker panicked, session lost");
            SaveOutcome::Abandoned
        }
    }
}

impl HostCallbacks for CaptureMachine {
    fn on_enter_realtime(&mut self) {
        if self.in_realtime {
            debug!("Already in real-time mode");
            return;
        }
        self.in_realtime = true;
        self.arm(self.last_phase);
    }

    fn on_exit_realtime(&mut self) {
        self.in_realtime = false;
        self.stop_logging();
        self.state = CaptureState::Idle;
        self.entry_phase = None;
    }

    fn on_scoring(&mut self, update: &ScoringUpdate) {
        let phase = update.game_phase;
        let previous = self.last_phase.replace(phase);

        if self.state == CaptureState::Logging && previous.is_some_and(|prev| phase < prev) {
            info!(?previous, phase, "Session restart detected");
            self.stop_logging();
            self.state = CaptureState::Idle;
            self.entry_phase = None;
            if self.in_realtime {
                self.arm(Some(phase));
            }
        } else if self.state == CaptureState::AwaitingEntryCondition && self.entry_phase.is_none()
        {
            self.arm(Some(phase));
        }

        if self.state == CaptureState::AwaitingEntryCondition {
            let lap_start_et = update.player_vehicle().map_or(0.0, |v| v.lap_start_et);
            if self.deferred_start_allowed(phase, lap_start_et) {
                self.start_logging();
            }
        }

        if let Some(active) = self.active.as_mut() {
            active.record_scoring(update, &self.config.data_source);
        }
    }

    fn on_telemetry(&mut self, update: &TelemetryUpdate) {
        if let Some(phase) = self.last_phase
            && self.deferred_start_allowed(phase, update.lap_start_et)
        {
            self.start_logging();
        }

        if let Some(active) = self.active.as_mut() {
            active.record_telemetry(update);
        }
    }
}

impl Drop for CaptureMachine {
    fn drop(&mut self) {
        if self.active.is_some() {
            debug!("Capture machine dropped while logging");
            self.stop_logging();
        }
        for outcome in self.wait_for_pending_saves() {
            trace!(?outcome, "Session finished during shutdown");
        }
    }
}
