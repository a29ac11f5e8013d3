//! Inline and queued pipelines driven through the shared trait.

use openmotorsport_format::SessionMetadata;
use openmotorsport_logger::schema::{CHANNEL_DISTANCE, CHANNEL_TIME, GROUP_POSITION, build_session};
use openmotorsport_logger::{
    InlinePipeline, LoggerConfig, MemorySink, PipelineCompletion, QueuedPipeline, SamplingMode,
    SamplingPipeline, SaveOutcome, Sampler, SessionCommand, SessionFinalizer, TelemetryUpdate,
    TimedSample, Vec3,
};
use std::sync::Arc;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn pipeline(
    mode: SamplingMode,
    interval_ms: u32,
) -> Result<Box<dyn SamplingPipeline>, Box<dyn std::error::Error>> {
    let session = build_session(interval_ms)?;
    let sampler = Sampler::new(&session)?;
    Ok(match mode {
        SamplingMode::Inline => Box::new(InlinePipeline::new(session, sampler, interval_ms)),
        SamplingMode::Queued => Box::new(QueuedPipeline::spawn(session, sampler, interval_ms, 64)?),
    })
}

fn finish(
    pipeline: Box<dyn SamplingPipeline>,
    sink: Arc<MemorySink>,
) -> Result<SaveOutcome, Box<dyn std::error::Error>> {
    let finalizer = SessionFinalizer::new(LoggerConfig::default(), sink, 0);
    match pipeline.finish(finalizer) {
        PipelineCompletion::Done(outcome) => Ok(outcome),
        PipelineCompletion::Pending(handle) => handle
            .join()
            .map_err(|_panic| "sampling worker panicked".into()),
    }
}

fn frame(x: f64) -> TelemetryUpdate {
    TelemetryUpdate {
        delta_time: 0.25,
        pos: Vec3::new(x, 0.0, 0.0),
        ..TelemetryUpdate::default()
    }
}

/// Feeds one update per interval so neither mode skips any.
fn drive(pipeline: &mut dyn SamplingPipeline) {
    pipeline.sample_now(TimedSample::new(0.0, frame(0.0)));
    pipeline.apply(SessionCommand::SetMetadata(SessionMetadata {
        user: "Jane Doe".to_string(),
        sectors: Some(3),
        ..SessionMetadata::default()
    }));
    pipeline.apply(SessionCommand::AddMarker(500));
    for i in 1..=3 {
        pipeline.offer(TimedSample::new(f64::from(i) * 0.25, frame(f64::from(i) * 10.0)));
    }
    pipeline.apply(SessionCommand::AddRelativeMarker(250));
}

#[test]
fn test_inline_finishes_synchronously() -> TestResult {
    let mut pipeline = pipeline(SamplingMode::Inline, 250)?;
    assert_eq!(pipeline.mode(), SamplingMode::Inline);
    drive(pipeline.as_mut());

    let sink = Arc::new(MemorySink::new());
    let finalizer = SessionFinalizer::new(LoggerConfig::default(), sink.clone(), 0);
    assert!(matches!(
        pipeline.finish(finalizer),
        PipelineCompletion::Done(SaveOutcome::Saved(_))
    ));
    assert_eq!(sink.len(), 1);
    Ok(())
}

#[test]
fn test_modes_record_the_same_session() -> TestResult {
    let mut recorded = Vec::new();

    for mode in [SamplingMode::Inline, SamplingMode::Queued] {
        // Queued wakes every millisecond so nothing is left in the queue.
        let interval_ms = if mode == SamplingMode::Inline { 250 } else { 1 };
        let mut pipeline = pipeline(mode, interval_ms)?;
        drive(pipeline.as_mut());
        std::thread::sleep(std::time::Duration::from_millis(50));

        let sink = Arc::new(MemorySink::new());
        assert!(finish(pipeline, sink.clone())?.is_saved());
        let saved = sink.saved().into_iter().next().ok_or("nothing saved")?;
        recorded.push(saved);
    }

    for saved in &recorded {
        assert_eq!(saved.markers(), &[500, 750]);
        assert_eq!(saved.session.metadata().user, "Jane Doe");
        assert_eq!(
            saved.samples(CHANNEL_TIME, Some(GROUP_POSITION)),
            Some([0.0, 250.0, 500.0, 750.0].as_slice())
        );
        assert_eq!(
            saved.samples(CHANNEL_DISTANCE, Some(GROUP_POSITION)),
            Some([0.0, 10.0, 20.0, 30.0].as_slice())
        );
    }
    Ok(())
}

#[test]
fn test_queued_finish_returns_pending_handle() -> TestResult {
    let pipeline = pipeline(SamplingMode::Queued, 5)?;
    assert_eq!(pipeline.mode(), SamplingMode::Queued);

    let sink = Arc::new(MemorySink::new());
    let finalizer = SessionFinalizer::new(LoggerConfig::default(), sink.clone(), 0);
    let PipelineCompletion::Pending(handle) = pipeline.finish(finalizer) else {
        return Err("queued pipeline finished synchronously".into());
    };

    let outcome = handle.join().map_err(|_panic| "sampling worker panicked")?;
    assert!(outcome.is_saved());
    assert_eq!(sink.len(), 1);
    Ok(())
}

#[test]
fn test_queued_abandons_unsampled_telemetry_on_finish() -> TestResult {
    // The worker first wakes a full second after spawning, long after the
    // offers below; it then handles the finish and exits.
    let session = build_session(1_000)?;
    let sampler = Sampler::new(&session)?;
    let mut pipeline = QueuedPipeline::spawn(session, sampler, 1_000, 8)?;

    pipeline.sample_now(TimedSample::new(0.0, frame(0.0)));
    for i in 1..=20 {
        pipeline.offer(TimedSample::new(f64::from(i) * 0.25, frame(0.0)));
    }
    assert_eq!(pipeline.pending() as u64 + pipeline.dropped(), 20);
    assert_eq!(pipeline.pending(), 8);

    let sink = Arc::new(MemorySink::new());
    assert!(finish(Box::new(pipeline), sink.clone())?.is_saved());

    let saved = sink.saved().into_iter().next().ok_or("nothing saved")?;
    assert_eq!(saved.sample_count(CHANNEL_TIME, Some(GROUP_POSITION)), Some(1));
    Ok(())
}
