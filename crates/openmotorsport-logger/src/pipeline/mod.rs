//! Sampling pipelines
//!
//! A pipeline owns the session while capture is running and turns telemetry
//! updates into samples at the configured cadence. Two implementations share
//! one trait:
//!
//! - [`InlinePipeline`]: samples on the host callback thread whenever the
//!   accumulated frame time reaches the sampling interval
//! - [`QueuedPipeline`]: enqueues updates with a non-blocking `try_send` and
//!   samples on a dedicated worker thread woken once per interval
//!
//! The capture machine never touches the session directly; marker and
//! metadata changes travel as [`SessionCommand`]s so they reach the session
//! on whichever thread owns it.

mod inline;
mod queued;

pub use inline::InlinePipeline;
pub use queued::QueuedPipeline;

use crate::config::SamplingMode;
use crate::finalize::{SaveOutcome, SessionFinalizer};
use crate::sampler::TimedSample;
use crate::sectors::SectorMarker;
use openmotorsport_format::{Session, SessionMetadata};
use std::thread::JoinHandle;

/// A change to the session requested by the capture machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Marker at milliseconds from session start
    AddMarker(u64),
    /// Marker at milliseconds after the previous marker
    AddRelativeMarker(u64),
    /// Replace the session metadata
    SetMetadata(SessionMetadata),
}

impl SessionCommand {
    /// Apply this command to `session`.
    pub fn apply_to(self, session: &mut Session) {
        match self {
            SessionCommand::AddMarker(ms) => {
                session.add_marker(ms);
            }
            SessionCommand::AddRelativeMarker(ms) => {
                session.add_relative_marker(ms);
            }
            SessionCommand::SetMetadata(metadata) => session.set_metadata(metadata),
        }
    }
}

impl From<SectorMarker> for SessionCommand {
    fn from(marker: SectorMarker) -> Self {
        match marker {
            SectorMarker::Absolute(ms) => SessionCommand::AddMarker(ms),
            SectorMarker::Relative(ms) => SessionCommand::AddRelativeMarker(ms),
        }
    }
}

/// Result of [`SamplingPipeline::finish`].
#[derive(Debug)]
pub enum PipelineCompletion {
    /// The session was finalized synchronously
    Done(SaveOutcome),
    /// The session will be finalized by a worker thread
    Pending(JoinHandle<SaveOutcome>),
}

/// Turns telemetry updates into session samples.
pub trait SamplingPipeline: Send {
    /// Sampling mode implemented by this pipeline.
    fn mode(&self) -> SamplingMode;

    /// Sample `sample` unconditionally and restart the cadence from it.
    fn sample_now(&mut self, sample: TimedSample);

    /// Offer an update; it is sampled only if the cadence allows.
    fn offer(&mut self, sample: TimedSample);

    /// Apply a session change in order with the samples offered so far.
    fn apply(&mut self, command: SessionCommand);

    /// Stop sampling and hand the session to `finalizer`.
    fn finish(self: Box<Self>, finalizer: SessionFinalizer) -> PipelineCompletion;
}
