use super::{PipelineCompletion, SamplingPipeline, SessionCommand};
use crate::config::SamplingMode;
use crate::finalize::{SaveOutcome, SessionFinalizer};
use crate::sampler::{Sampler, TimedSample};
use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError};
use openmotorsport_format::Session;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Name of the sampling worker thread.
pub const SAMPLER_THREAD_NAME: &str = "om-sampler";

enum WorkerMessage {
    SampleNow(TimedSample),
    Command(SessionCommand),
    Finish(SessionFinalizer),
}

/// Samples on a dedicated worker thread.
///
/// Telemetry goes through a bounded queue; when it is full the update is
/// dropped so the host thread never blocks. Commands and the finish request
/// travel on a separate unbounded control channel that the worker drains
/// before every sample.
pub struct QueuedPipeline {
    frames: Sender<TimedSample>,
    control: Sender<WorkerMessage>,
    worker: JoinHandle<SaveOutcome>,
    dropped: u64,
}

impl std::fmt::Debug for QueuedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedPipeline")
            .field("pending", &self.frames.len())
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

impl QueuedPipeline {
    /// Move `session` onto a new sampling worker.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the worker thread cannot be spawned; the
    /// session is dropped in that case.
    pub fn spawn(
        session: Session,
        sampler: Sampler,
        interval_ms: u32,
        queue_capacity: usize,
    ) -> io::Result<Self> {
        let (frames_tx, frames_rx) = crossbeam::channel::bounded(queue_capacity.max(1));
        let (control_tx, control_rx) = crossbeam::channel::unbounded();
        let interval = Duration::from_millis(u64::from(interval_ms.max(1)));

        let worker = thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || worker_main(session, sampler, frames_rx, control_rx, interval))?;

        debug!(interval_ms, queue_capacity, "Sampling worker started");
        Ok(Self {
            frames: frames_tx,
            control: control_tx,
            worker,
            dropped: 0,
        })
    }

    /// Telemetry updates waiting to be sampled.
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    /// Telemetry updates dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn send_control(&self, message: WorkerMessage) {
        if self.control.send(message).is_err() {
            warn!("Sampling worker is gone, message discarded");
        }
    }
}

impl SamplingPipeline for QueuedPipeline {
    fn mode(&self) -> SamplingMode {
        SamplingMode::Queued
    }

    fn sample_now(&mut self, sample: TimedSample) {
        self.send_control(WorkerMessage::SampleNow(sample));
    }

    fn offer(&mut self, sample: TimedSample) {
        match self.frames.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                trace!(dropped = self.dropped, "Telemetry queue full, dropping update");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Sampling worker is gone, dropping update");
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) {
        self.send_control(WorkerMessage::Command(command));
    }

    fn finish(self: Box<Self>, finalizer: SessionFinalizer) -> PipelineCompletion {
        let this = *self;
        this.send_control(WorkerMessage::Finish(finalizer));
        if this.dropped > 0 {
            debug!(dropped = this.dropped, "Telemetry updates dropped during session");
        }
        PipelineCompletion::Pending(this.worker)
    }
}

fn record(sampler: &mut Sampler, session: &mut Session, sample: &TimedSample) {
    if let Err(e) = sampler.sample(session, sample) {
        error!(error = %e, "Failed to record sample");
    }
}

fn worker_main(
    mut session: Session,
    mut sampler: Sampler,
    frames: Receiver<TimedSample>,
    control: Receiver<WorkerMessage>,
    interval: Duration,
) -> SaveOutcome {
    let ticker = crossbeam::channel::tick(interval);

    loop {
        if ticker.recv().is_err() {
            return SaveOutcome::Abandoned;
        }

        loop {
            match control.try_recv() {
                Ok(WorkerMessage::SampleNow(sample)) => {
                    record(&mut sampler, &mut session, &sample);
                }
                Ok(WorkerMessage::Command(command)) => command.apply_to(&mut session),
                Ok(WorkerMessage::Finish(finalizer)) => {
                    let abandoned = frames.len();
                    debug!(
                        samples = sampler.samples_taken(),
                        abandoned, "Sampling worker finishing"
                    );
                    return finalizer.finalize(session);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Capture controller went away without finishing the session");
                    return SaveOutcome::Abandoned;
                }
            }
        }

        match frames.try_recv() {
            Ok(sample) => record(&mut sampler, &mut session, &sample),
            Err(TryRecvError::Empty) => trace!("No telemetry queued at wake"),
            Err(TryRecvError::Disconnected) => {}
        }
    }
}
