use super::{PipelineCompletion, SamplingPipeline, SessionCommand};
use crate::config::SamplingMode;
use crate::finalize::SessionFinalizer;
use crate::sampler::{Sampler, TimedSample};
use openmotorsport_format::Session;
use tracing::error;

/// Samples on the calling thread.
///
/// Frame time is accumulated per update; an update is sampled when the time
/// accumulated before it reaches the interval, and the accumulator restarts.
#[derive(Debug)]
pub struct InlinePipeline {
    session: Session,
    sampler: Sampler,
    interval_s: f64,
    since_last_sample_s: f64,
}

impl InlinePipeline {
    pub fn new(session: Session, sampler: Sampler, interval_ms: u32) -> Self {
        Self {
            session,
            sampler,
            interval_s: f64::from(interval_ms) / 1000.0,
            since_last_sample_s: 0.0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn take_sample(&mut self, sample: &TimedSample) {
        if let Err(e) = self.sampler.sample(&mut self.session, sample) {
            error!(error = %e, "Failed to record sample");
        }
    }
}

impl SamplingPipeline for InlinePipeline {
    fn mode(&self) -> SamplingMode {
        SamplingMode::Inline
    }

    fn sample_now(&mut self, sample: TimedSample) {
        self.take_sample(&sample);
        self.since_last_sample_s = sample.update.delta_time;
    }

    fn offer(&mut self, sample: TimedSample) {
        if self.since_last_sample_s >= self.interval_s {
            self.take_sample(&sample);
            self.since_last_sample_s = 0.0;
        }
        self.since_last_sample_s += sample.update.delta_time;
    }

    fn apply(&mut self, command: SessionCommand) {
        command.apply_to(&mut self.session);
    }

    fn finish(self: Box<Self>, finalizer: SessionFinalizer) -> PipelineCompletion {
        PipelineCompletion::Done(finalizer.finalize(self.session))
    }
}
