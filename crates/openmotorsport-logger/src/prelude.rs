//! Prelude module for host adapters and tools.

pub use crate::capture::{CaptureMachine, CaptureState};
pub use crate::config::{DEFAULT_CONFIG_FILE, LoggerConfig, SamplingMode};
pub use crate::events::{GamePhase, HostCallbacks, ScoringUpdate, TelemetryUpdate, VehicleScoring};
pub use crate::finalize::SaveOutcome;
pub use crate::fixtures::{HostEvent, SyntheticRun, dispatch};
pub use crate::sink::{ContainerFileSink, MemorySink, SessionSink};
pub use openmotorsport_format::{Session, SessionMetadata};
