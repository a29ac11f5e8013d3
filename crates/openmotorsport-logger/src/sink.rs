//! Destinations for finished sessions.

use openmotorsport_format::{ContainerError, ContainerResult, Session};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists a finished session.
pub trait SessionSink: Send + Sync {
    /// Persist `session` at `path`.
    ///
    /// # Errors
    ///
    /// Returns the [`ContainerError`] of the failed write stage.
    fn persist(&self, session: &Session, path: &Path) -> ContainerResult<()>;
}

/// Writes `.om` container files, creating the output directory on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerFileSink;

impl ContainerFileSink {
    pub fn new() -> Self {
        Self
    }
}

impl SessionSink for ContainerFileSink {
    fn persist(&self, session: &Session, path: &Path) -> ContainerResult<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ContainerError::Create {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        session.write_container(path)
    }
}

/// A session captured by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct SavedSession {
    /// Path the session would have been written to
    pub path: PathBuf,
    pub session: Session,
}

impl SavedSession {
    /// Number of samples in the channel `name` of `group`.
    pub fn sample_count(&self, name: &str, group: Option<&str>) -> Option<usize> {
        let id = self.session.channel_id(name, group)?;
        self.session.channel(id).map(|c| c.data().len())
    }

    /// Samples of the channel `name` of `group`.
    pub fn samples(&self, name: &str, group: Option<&str>) -> Option<&[f32]> {
        let id = self.session.channel_id(name, group)?;
        self.session.channel(id).map(|c| c.data().as_slice())
    }

    pub fn markers(&self) -> &[u64] {
        self.session.markers().as_slice()
    }
}

/// Keeps finished sessions in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<SavedSession>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every session persisted so far.
    pub fn saved(&self) -> Vec<SavedSession> {
        self.saved.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.lock().is_empty()
    }
}

impl SessionSink for MemorySink {
    fn persist(&self, session: &Session, path: &Path) -> ContainerResult<()> {
        debug!(path = %path.display(), "Keeping session in memory");
        self.saved.lock().push(SavedSession {
            path: path.to_path_buf(),
            session: session.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openmotorsport_format::ChannelSpec;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_file_sink_creates_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("logs").join("a.om");

        ContainerFileSink::new().persist(&Session::new(), &path)?;

        assert!(path.is_file());
        Ok(())
    }

    #[test]
    fn test_file_sink_reports_directory_failure() -> TestResult {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory")?;
        let path = blocker.join("a.om");

        let result = ContainerFileSink::new().persist(&Session::new(), &path);

        assert!(matches!(result, Err(ContainerError::Create { .. })));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_memory_sink_keeps_sessions() -> TestResult {
        let sink = MemorySink::new();
        let mut session = Session::new();
        let id = session.add_channel(ChannelSpec::new("RPM").group("Engine"))?;
        session.push_sample(id, 5000.0)?;
        session.add_marker(1_000);

        sink.persist(&session, Path::new("out/a.om"))?;

        assert_eq!(sink.len(), 1);
        let saved = sink.saved();
        let first = saved.first().ok_or("no session")?;
        assert_eq!(first.path, PathBuf::from("out/a.om"));
        assert_eq!(first.sample_count("RPM", Some("Engine")), Some(1));
        assert_eq!(first.markers(), &[1_000]);
        Ok(())
    }
}
