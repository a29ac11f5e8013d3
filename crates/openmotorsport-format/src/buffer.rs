//! Append-only sample storage for a single channel.

use std::io::{self, Write};

/// Initial capacity of a data buffer: 10 minutes at 5 Hz.
pub const DATA_BUFFER_INITIAL_CAPACITY: usize = 3000;

/// Size of one encoded sample in bytes.
pub const SAMPLE_SIZE: usize = std::mem::size_of::<f32>();

/// Append-only sequence of `f32` samples.
///
/// Insertion order is temporal order. Samples can only be appended; the
/// buffer never shrinks and existing samples are never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBuffer {
    samples: Vec<f32>,
}

impl DataBuffer {
    /// Create an empty buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DATA_BUFFER_INITIAL_CAPACITY)
    }

    /// Create an empty buffer able to hold `capacity` samples without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample.
    pub fn push(&mut self, value: f32) {
        self.samples.push(value);
    }

    /// Number of samples written.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been written yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encoded payload size in bytes (`len * 4`).
    pub fn byte_len(&self) -> usize {
        self.samples.len().saturating_mul(SAMPLE_SIZE)
    }

    /// Borrowed view of the samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<f32> {
        self.samples.last().copied()
    }

    /// Write every sample as little-endian IEEE-754 bytes.
    pub fn write_le<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        writer.write_all(&bytes)
    }
}

impl Default for DataBuffer {
    fn default() -> Self {
        Self::new()
    }
}
