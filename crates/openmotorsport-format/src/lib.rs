//! OpenMotorsport session model and container writer
//!
//! This crate holds everything needed to describe a recorded session and to
//! persist it as an OpenMotorsport `.om` file:
//!
//! - [`buffer`]: append-only `f32` sample storage
//! - [`channel`]: channel identity, grouping, units and sample interval
//! - [`marker`]: sector/lap boundary markers in milliseconds
//! - [`session`]: the session itself plus its metadata
//! - [`container`]: `meta.xml` manifest encoding and ZIP archive writing
//! - [`error`]: session and container error types
//!
//! # Container layout
//!
//! ```text
//! session.om
//! ├── meta.xml        (Deflated)
//! └── data/
//!     ├── 0.bin       (Stored, little-endian f32)
//!     ├── 1.bin
//!     └── ...
//! ```
//!
//! # Example
//!
//! ```no_run
//! use openmotorsport_format::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new();
//! let speed = session.add_channel(
//!     ChannelSpec::new("Speed").group("Position").units("kph").interval_ms(200),
//! )?;
//!
//! session.push_sample(speed, 142.5)?;
//! session.add_marker(34_200);
//!
//! session.write_container(Path::new("./session.om"))?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buffer;
pub mod channel;
pub mod container;
pub mod error;
pub mod marker;
pub mod prelude;
pub mod session;

pub use buffer::{DATA_BUFFER_INITIAL_CAPACITY, DataBuffer, SAMPLE_SIZE};
pub use channel::{Channel, ChannelId, ChannelSpec, SampleInterval};
pub use container::{MANIFEST_ENTRY, OPENMOTORSPORT_NAMESPACE, PARTIAL_SUFFIX, is_staging_file};
pub use error::{ContainerError, ContainerResult, SessionError, SessionResult};
pub use marker::{MarkerList, seconds_to_millis};
pub use session::{ISO8601_FORMAT, Session, SessionMetadata};
