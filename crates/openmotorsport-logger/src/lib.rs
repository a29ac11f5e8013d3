//! Simulator telemetry logger for OpenMotorsport sessions
//!
//! A host plugin forwards its callbacks to a [`CaptureMachine`], which decides
//! when a session starts and stops, samples telemetry at a fixed cadence into
//! the fixed channel [`schema`], reconstructs lap and sector markers from
//! scoring updates and hands finished sessions to a [`SessionSink`].
//!
//! ```text
//! host callbacks ──► CaptureMachine ──► SamplingPipeline ──► Session
//!                        │  (state, markers)   inline | queued     │
//!                        └───────────────► SessionFinalizer ◄──────┘
//!                                              │
//!                                              ▼
//!                                         SessionSink (.om file)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use openmotorsport_logger::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoggerConfig::load(Path::new(DEFAULT_CONFIG_FILE))?;
//! let mut machine = CaptureMachine::new(config, Arc::new(ContainerFileSink::new()));
//!
//! let events = SyntheticRun::new().laps(3).generate();
//! dispatch(&events, &mut machine);
//!
//! for outcome in machine.wait_for_pending_saves() {
//!     println!("{outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod filename;
pub mod finalize;
pub mod fixtures;
pub mod kinematics;
pub mod pipeline;
pub mod prelude;
pub mod sampler;
pub mod schema;
pub mod sectors;
pub mod sink;

pub use capture::{CaptureMachine, CaptureState};
pub use config::{DEFAULT_CONFIG_FILE, LoggerConfig, SamplingMode};
pub use error::{ConfigError, ConfigResult};
pub use events::{
    GamePhase, HostCallbacks, ScoringUpdate, TelemetryUpdate, Vec3, VehicleScoring,
    WheelTelemetry,
};
pub use finalize::{SaveOutcome, SaveSequencer, SaveTicket, SessionFinalizer};
pub use pipeline::{
    InlinePipeline, PipelineCompletion, QueuedPipeline, SamplingPipeline, SessionCommand,
};
pub use sampler::{Sampler, TimedSample};
pub use sectors::{Sector, SectorMarker, SectorTracker};
pub use sink::{ContainerFileSink, MemorySink, SavedSession, SessionSink};
