//! In-memory session: channels, markers and metadata.

use crate::channel::{Channel, ChannelId, ChannelSpec};
use crate::container;
use crate::error::{ContainerResult, SessionError, SessionResult};
use crate::marker::MarkerList;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::Path;

/// Date format written to the manifest.
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Descriptive session metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    /// Driver name
    pub user: String,
    /// Vehicle name
    pub vehicle: String,
    /// Vehicle class, omitted from the manifest when absent
    pub vehicle_category: Option<String>,
    /// Venue name
    pub track: String,
    /// Name of the producing system
    pub data_source: String,
    /// Free-form comment
    pub comment: String,
    /// Number of sectors per lap, `None` when laps are not tracked
    pub sectors: Option<u16>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            user: "No User".to_string(),
            vehicle: "No Vehicle".to_string(),
            vehicle_category: None,
            track: "No Track".to_string(),
            data_source: String::new(),
            comment: String::new(),
            sectors: None,
        }
    }
}

type ChannelKey = (String, Option<String>);

/// A recording session.
///
/// Created when capture starts, filled by the sampler, and consumed by a
/// single container write when capture stops.
#[derive(Debug, Clone)]
pub struct Session {
    channels: Vec<Channel>,
    index: HashMap<ChannelKey, ChannelId>,
    markers: MarkerList,
    metadata: SessionMetadata,
    created_at: DateTime<Local>,
}

impl Session {
    /// Create an empty session stamped with the current local time.
    pub fn new() -> Self {
        Self::with_created_at(Local::now())
    }

    /// Create an empty session with an explicit creation time.
    pub fn with_created_at(created_at: DateTime<Local>) -> Self {
        Self {
            channels: Vec::new(),
            index: HashMap::new(),
            markers: MarkerList::new(),
            metadata: SessionMetadata::default(),
            created_at,
        }
    }

    /// Add a channel and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateChannel`] if a channel with the same
    /// name and group already exists.
    pub fn add_channel(&mut self, spec: ChannelSpec) -> SessionResult<ChannelId> {
        let key = (spec.name.clone(), spec.group.clone());
        if self.index.contains_key(&key) {
            return Err(SessionError::duplicate(&spec.name, spec.group.as_deref()));
        }

        let raw = u32::try_from(self.channels.len())
            .map_err(|e| SessionError::TooManyChannels(e.to_string()))?;
        let id = ChannelId(raw);
        self.channels.push(Channel::new(id, spec));
        self.index.insert(key, id);
        Ok(id)
    }

    /// Look up a channel id by name and group.
    pub fn channel_id(&self, name: &str, group: Option<&str>) -> Option<ChannelId> {
        let key = (name.to_string(), group.map(str::to_string));
        self.index.get(&key).copied()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.index())
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id.index())
    }

    /// Append one sample to the channel `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidChannelId`] if `id` does not belong to
    /// this session.
    pub fn push_sample(&mut self, id: ChannelId, value: f32) -> SessionResult<()> {
        let channel = self
            .channels
            .get_mut(id.index())
            .ok_or(SessionError::InvalidChannelId(id.0))?;
        channel.push(value);
        Ok(())
    }

    /// Channels in id order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn markers(&self) -> &MarkerList {
        &self.markers
    }

    /// Append an absolute marker in milliseconds from session start.
    pub fn add_marker(&mut self, time_ms: u64) -> u64 {
        self.markers.add_marker(time_ms)
    }

    /// Append a marker `delta_ms` after the previous one.
    pub fn add_relative_marker(&mut self, delta_ms: u64) -> u64 {
        self.markers.add_relative_marker(delta_ms)
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: SessionMetadata) {
        self.metadata = metadata;
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Creation time as `YYYY-MM-DDTHH:MM:SS`.
    pub fn iso8601_date(&self) -> String {
        self.created_at.format(ISO8601_FORMAT).to_string()
    }

    /// Encode the `meta.xml` manifest for this session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ContainerError::Manifest`] if XML encoding fails.
    pub fn manifest_xml(&self) -> ContainerResult<String> {
        container::encode_manifest(self)
    }

    /// Write the session as a `.om` container at `path`.
    ///
    /// The archive is staged next to `path` and only renamed into place once
    /// complete; on failure nothing is left at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ContainerError`] naming the stage that failed.
    pub fn write_container(&self, path: &Path) -> ContainerResult<()> {
        container::write_container(self, path)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::SampleInterval;

    #[test]
    fn test_channel_ids_follow_creation_order() {
        let mut session = Session::new();
        let a = session.add_channel(ChannelSpec::new("Speed").group("Position")).unwrap();
        let b = session.add_channel(ChannelSpec::new("Gear").group("Driver")).unwrap();
        let c = session.add_channel(ChannelSpec::new("Lap")).unwrap();

        assert_eq!((a, b, c), (ChannelId(0), ChannelId(1), ChannelId(2)));
        assert_eq!(session.channel_id("Gear", Some("Driver")), Some(b));
        assert_eq!(session.channel_id("Lap", None), Some(c));
        assert_eq!(session.channel_id("Lap", Some("Driver")), None);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut session = Session::new();
        session.add_channel(ChannelSpec::new("Rotation").group("Wheel LF")).unwrap();
        session.add_channel(ChannelSpec::new("Rotation").group("Wheel RF")).unwrap();

        let err = session
            .add_channel(ChannelSpec::new("Rotation").group("Wheel LF"))
            .unwrap_err();
        assert!(matches!(err, SessionError::DuplicateChannel { .. }));
        assert_eq!(session.channels().len(), 2);
    }

    #[test]
    fn test_push_sample_targets_one_channel() {
        let mut session = Session::new();
        let rpm = session
            .add_channel(ChannelSpec::new("RPM").units("rpm").interval_ms(200))
            .unwrap();
        let fuel = session.add_channel(ChannelSpec::new("Fuel").units("l")).unwrap();

        session.push_sample(rpm, 7200.0).unwrap();
        session.push_sample(rpm, 7300.0).unwrap();

        assert_eq!(session.channel(rpm).unwrap().data().len(), 2);
        assert_eq!(session.channel(fuel).unwrap().data().len(), 0);
        assert_eq!(
            session.channel(rpm).unwrap().interval(),
            SampleInterval::Fixed(200)
        );
        assert!(session.push_sample(ChannelId(9), 1.0).is_err());
    }

    #[test]
    fn test_default_metadata() {
        let session = Session::new();
        let meta = session.metadata();
        assert_eq!(meta.user, "No User");
        assert_eq!(meta.vehicle, "No Vehicle");
        assert_eq!(meta.track, "No Track");
        assert_eq!(meta.sectors, None);
    }

    #[test]
    fn test_iso8601_date() {
        use chrono::TimeZone;
        let created = Local.with_ymd_and_hms(2009, 3, 7, 14, 5, 9).unwrap();
        let session = Session::with_created_at(created);
        assert_eq!(session.iso8601_date(), "2009-03-07T14:05:09");
    }
}
