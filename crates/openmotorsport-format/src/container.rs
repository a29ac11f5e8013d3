//! `.om` container writer
//!
//! A container is a ZIP archive holding:
//!
//! - `meta.xml`: the session manifest (metadata, channel table, markers)
//! - `data/<id>.bin`: one raw little-endian `f32` array per channel
//!
//! The archive is staged in a uniquely named `<name>.<random>.partial` file
//! next to the destination and renamed into place once the central directory
//! has been written, so a failed write never leaves a truncated file at the
//! destination.

use crate::channel::Channel;
use crate::error::{ContainerError, ContainerResult};
use crate::session::Session;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// XML namespace of the manifest root element.
pub const OPENMOTORSPORT_NAMESPACE: &str = "http://66laps.org/ns/openmotorsport-1.0";

/// Name of the manifest entry.
pub const MANIFEST_ENTRY: &str = "meta.xml";

/// Extension of staging files while an archive is being written.
pub const PARTIAL_SUFFIX: &str = "partial";

/// Thin wrapper over the quick-xml writer that maps every failure to
/// [`ContainerError::Manifest`].
struct ManifestWriter {
    writer: Writer<Vec<u8>>,
}

impl ManifestWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b'\t', 1),
        }
    }

    fn event(&mut self, event: Event<'_>) -> ContainerResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| ContainerError::Manifest(e.to_string()))
    }

    fn start(&mut self, element: BytesStart<'_>) -> ContainerResult<()> {
        self.event(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> ContainerResult<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> ContainerResult<()> {
        self.start(BytesStart::new(name))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn into_string(self) -> ContainerResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| ContainerError::Manifest(e.to_string()))
    }
}

/// Top-level entries of the `<channels>` element in first-use order.
enum ChannelNode<'a> {
    Ungrouped(&'a Channel),
    Group(&'a str, Vec<&'a Channel>),
}

fn channel_tree(channels: &[Channel]) -> Vec<ChannelNode<'_>> {
    let mut nodes: Vec<ChannelNode<'_>> = Vec::new();
    for channel in channels {
        let Some(group) = channel.group() else {
            nodes.push(ChannelNode::Ungrouped(channel));
            continue;
        };

        let existing = nodes.iter_mut().find_map(|node| match node {
            ChannelNode::Group(name, members) if *name == group => Some(members),
            _ => None,
        });
        match existing {
            Some(members) => members.push(channel),
            None => nodes.push(ChannelNode::Group(group, vec![channel])),
        }
    }
    nodes
}

fn write_channel(xml: &mut ManifestWriter, channel: &Channel) -> ContainerResult<()> {
    let id = channel.id().to_string();
    let interval = channel.interval().as_millis().map(|ms| ms.to_string());

    let mut element = BytesStart::new("channel");
    element.push_attribute(("id", id.as_str()));
    if let Some(units) = channel.units() {
        element.push_attribute(("units", units));
    }
    if let Some(interval) = interval.as_deref() {
        element.push_attribute(("interval", interval));
    }

    xml.start(element)?;
    xml.text_element("name", channel.name())?;
    xml.end("channel")
}

/// Encode the `meta.xml` manifest of `session`.
pub(crate) fn encode_manifest(session: &Session) -> ContainerResult<String> {
    let meta = session.metadata();
    let mut xml = ManifestWriter::new();

    xml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("openmotorsport");
    root.push_attribute(("xmlns", OPENMOTORSPORT_NAMESPACE));
    xml.start(root)?;

    xml.start(BytesStart::new("metadata"))?;
    xml.text_element("user", &meta.user)?;
    xml.start(BytesStart::new("vehicle"))?;
    xml.text_element("name", &meta.vehicle)?;
    if let Some(category) = meta.vehicle_category.as_deref() {
        xml.text_element("category", category)?;
    }
    xml.end("vehicle")?;
    xml.start(BytesStart::new("venue"))?;
    xml.text_element("name", &meta.track)?;
    xml.end("venue")?;
    xml.text_element("date", &session.iso8601_date())?;
    xml.text_element("datasource", &meta.data_source)?;
    xml.text_element("comments", &meta.comment)?;
    xml.end("metadata")?;

    xml.start(BytesStart::new("channels"))?;
    for node in channel_tree(session.channels()) {
        match node {
            ChannelNode::Ungrouped(channel) => write_channel(&mut xml, channel)?,
            ChannelNode::Group(name, members) => {
                xml.start(BytesStart::new("group"))?;
                xml.text_element("name", name)?;
                for channel in members {
                    write_channel(&mut xml, channel)?;
                }
                xml.end("group")?;
            }
        }
    }
    xml.end("channels")?;

    let sectors = meta.sectors.map(|n| n.to_string());
    let mut markers = BytesStart::new("markers");
    if let Some(sectors) = sectors.as_deref() {
        markers.push_attribute(("sectors", sectors));
    }
    if session.markers().is_empty() {
        xml.event(Event::Empty(markers))?;
    } else {
        xml.start(markers)?;
        for time_ms in session.markers().iter() {
            let time = time_ms.to_string();
            let mut marker = BytesStart::new("marker");
            marker.push_attribute(("time", time.as_str()));
            xml.event(Event::Empty(marker))?;
        }
        xml.end("markers")?;
    }

    xml.end("openmotorsport")?;
    xml.into_string()
}

/// Create a uniquely named staging file next to `path`.
///
/// Each write gets its own file, so two sessions saved to the same
/// destination never share one.
fn staging_file(path: &Path) -> std::io::Result<NamedTempFile> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut prefix = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    prefix.push(".");

    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&format!(".{PARTIAL_SUFFIX}"))
        .tempfile_in(dir)
}

/// Whether `path` names a staging file left by an interrupted write.
pub fn is_staging_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == PARTIAL_SUFFIX)
}

fn write_archive<W: Write + Seek>(session: &Session, out: W) -> ContainerResult<()> {
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let manifest_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let data_options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let manifest = encode_manifest(session)?;
    zip.start_file(MANIFEST_ENTRY, manifest_options)
        .map_err(|e| ContainerError::entry(MANIFEST_ENTRY, e))?;
    zip.write_all(manifest.as_bytes())
        .map_err(|e| ContainerError::entry(MANIFEST_ENTRY, e))?;

    for channel in session.channels() {
        let entry = channel.id().data_entry_name();
        zip.start_file(entry.as_str(), data_options)
            .map_err(|e| ContainerError::entry(&entry, e))?;
        channel
            .data()
            .write_le(&mut zip)
            .map_err(|e| ContainerError::entry(&entry, e))?;
    }

    let mut inner = zip
        .finish()
        .map_err(|e| ContainerError::Finish(e.to_string()))?;
    inner
        .flush()
        .map_err(|e| ContainerError::Finish(e.to_string()))?;
    Ok(())
}

/// Write `session` to `path` via a staging file.
///
/// The staging file is removed when any stage fails.
pub(crate) fn write_container(session: &Session, path: &Path) -> ContainerResult<()> {
    let mut staging = staging_file(path).map_err(|source| ContainerError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    trace!(staging = %staging.path().display(), "Staging container");

    write_archive(session, staging.as_file_mut())?;

    if path.exists() {
        warn!(path = %path.display(), "Replacing existing container");
    }
    staging.persist(path).map_err(|e| ContainerError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    debug!(
        path = %path.display(),
        channels = session.channels().len(),
        markers = session.markers().len(),
        "Container written"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::ChannelSpec;
    use crate::session::SessionMetadata;

    fn sample_session() -> Session {
        let mut session = Session::new();
        session
            .add_channel(ChannelSpec::new("Speed").group("Position").units("kph").interval_ms(200))
            .unwrap();
        session.add_channel(ChannelSpec::new("Beacon")).unwrap();
        session
            .add_channel(ChannelSpec::new("Gear").group("Driver").units("gear").interval_ms(200))
            .unwrap();
        session
            .add_channel(ChannelSpec::new("Distance").group("Position").units("m").interval_ms(200))
            .unwrap();
        session
    }

    #[test]
    fn test_channel_tree_groups_in_first_use_order() {
        let session = sample_session();
        let tree = channel_tree(session.channels());

        assert_eq!(tree.len(), 3);
        let position: Vec<&str> = match tree.first() {
            Some(ChannelNode::Group("Position", members)) => {
                members.iter().map(|c| c.name()).collect()
            }
            _ => Vec::new(),
        };
        assert_eq!(position, ["Speed", "Distance"]);
        assert!(matches!(tree.get(1), Some(ChannelNode::Ungrouped(c)) if c.name() == "Beacon"));
        assert!(matches!(tree.get(2), Some(ChannelNode::Group("Driver", _))));
    }

    #[test]
    fn test_manifest_optional_attributes() {
        let mut session = sample_session();
        session.set_metadata(SessionMetadata {
            vehicle_category: Some("GT3".to_string()),
            sectors: Some(3),
            ..SessionMetadata::default()
        });
        session.add_marker(34_200);

        let xml = encode_manifest(&session).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(&format!("<openmotorsport xmlns=\"{OPENMOTORSPORT_NAMESPACE}\">")));
        assert!(xml.contains("<channel id=\"0\" units=\"kph\" interval=\"200\">"));
        assert!(xml.contains("<channel id=\"1\">"));
        assert!(xml.contains("<category>GT3</category>"));
        assert!(xml.contains("<markers sectors=\"3\">"));
        assert!(xml.contains("<marker time=\"34200\"/>"));
    }

    #[test]
    fn test_manifest_without_sectors_or_markers() {
        let session = sample_session();
        let xml = encode_manifest(&session).unwrap();
        assert!(xml.contains("<markers/>"));
        assert!(!xml.contains("sectors="));
        assert!(!xml.contains("<category>"));
    }

    #[test]
    fn test_manifest_escapes_text() {
        let mut session = Session::new();
        session.set_metadata(SessionMetadata {
            track: "Spa <Francorchamps> & co".to_string(),
            ..SessionMetadata::default()
        });
        let xml = encode_manifest(&session).unwrap();
        assert!(xml.contains("Spa &lt;Francorchamps&gt; &amp; co"));
    }

    #[test]
    fn test_staging_files_are_unique_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.om");

        let first = staging_file(&path).unwrap();
        let second = staging_file(&path).unwrap();

        assert_ne!(first.path(), second.path());
        for staging in [&first, &second] {
            assert_eq!(staging.path().parent(), Some(dir.path()));
            assert!(is_staging_file(staging.path()));
            let name = staging.path().file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("session.om."));
        }
        assert!(!is_staging_file(&path));
    }
}
