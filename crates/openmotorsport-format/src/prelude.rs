//! Prelude module for convenient session imports.
//!
//! ```
//! use openmotorsport_format::prelude::*;
//!
//! let mut session = Session::new();
//! assert!(session.add_channel(ChannelSpec::new("RPM").units("rpm")).is_ok());
//! ```

pub use crate::buffer::DataBuffer;
pub use crate::channel::{Channel, ChannelId, ChannelSpec, SampleInterval};
pub use crate::error::{ContainerError, ContainerResult, SessionError, SessionResult};
pub use crate::marker::{MarkerList, seconds_to_millis};
pub use crate::session::{Session, SessionMetadata};
