//! Channel identity and metadata.

use crate::buffer::DataBuffer;
use std::fmt;

/// Dense channel identifier, assigned in creation order within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u32);

impl ChannelId {
    /// Index into the session's channel table.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Name of the payload entry holding this channel's samples.
    pub fn data_entry_name(self) -> String {
        format!("data/{}.bin", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nominal sample interval of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleInterval {
    /// Fixed interval in milliseconds
    Fixed(u32),
    /// Event-based or variable sampling
    #[default]
    Variable,
}

impl SampleInterval {
    /// Interval in milliseconds, if fixed.
    pub fn as_millis(self) -> Option<u32> {
        match self {
            SampleInterval::Fixed(ms) => Some(ms),
            SampleInterval::Variable => None,
        }
    }
}

/// Description of a channel before it is added to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Channel name, unique within its group
    pub name: String,
    /// Optional logical group
    pub group: Option<String>,
    /// Optional unit abbreviation
    pub units: Option<String>,
    /// Nominal sample interval
    pub interval: SampleInterval,
}

impl ChannelSpec {
    /// Ungrouped, unitless, variable-interval channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            units: None,
            interval: SampleInterval::Variable,
        }
    }

    /// Set the group. An empty group name means ungrouped.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into()).filter(|g: &String| !g.is_empty());
        self
    }

    /// Set the unit abbreviation. An empty string means no units.
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into()).filter(|u: &String| !u.is_empty());
        self
    }

    /// Set a fixed sample interval in milliseconds.
    pub fn interval_ms(mut self, interval_ms: u32) -> Self {
        self.interval = SampleInterval::Fixed(interval_ms);
        self
    }
}

/// A named, unit-tagged time series within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: ChannelId,
    name: String,
    group: Option<String>,
    units: Option<String>,
    interval: SampleInterval,
    buffer: DataBuffer,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, spec: ChannelSpec) -> Self {
        Self {
            id,
            name: spec.name,
            group: spec.group,
            units: spec.units,
            interval: spec.interval,
            buffer: DataBuffer::new(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn interval(&self) -> SampleInterval {
        self.interval
    }

    /// Samples written so far.
    pub fn data(&self) -> &DataBuffer {
        &self.buffer
    }

    /// Append a sample to this channel.
    pub fn push(&mut self, value: f32) {
        self.buffer.push(value);
    }
}
