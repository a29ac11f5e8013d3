//! End-of-session handling: save policy, output path and persistence.

use crate::config::LoggerConfig;
use crate::filename::session_filename;
use crate::sink::SessionSink;
use openmotorsport_format::Session;
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What happened to a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The session was persisted at this path
    Saved(PathBuf),
    /// The session was discarded because no lap was completed
    Skipped {
        /// Laps completed while logging
        laps_completed: i32,
    },
    /// Persisting failed; the session was dropped
    Failed {
        /// Intended destination
        path: PathBuf,
        /// Failure description
        error: String,
    },
    /// The sampling worker lost its controller before being told to finish
    Abandoned,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

#[derive(Debug, Default)]
struct SaveTurns {
    issued: u64,
    next: u64,
    /// Tickets released ahead of their turn
    released_early: BTreeSet<u64>,
}

impl SaveTurns {
    fn release(&mut self, ticket: u64) {
        if ticket != self.next {
            self.released_early.insert(ticket);
            return;
        }
        self.next = self.next.saturating_add(1);
        while self.released_early.remove(&self.next) {
            self.next = self.next.saturating_add(1);
        }
    }
}

/// Orders session saves by the time their capture stopped.
///
/// Every stopped session takes a [`SaveTicket`]. A ticket waits in
/// [`SaveTicket::wait_turn`] until all earlier tickets have been released, so
/// saves run one at a time and oldest first even when queued sessions finish
/// on different worker threads.
#[derive(Debug, Default)]
pub struct SaveSequencer {
    turns: Mutex<SaveTurns>,
    turn_changed: Condvar,
}

impl SaveSequencer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the next ticket.
    pub fn ticket(self: &Arc<Self>) -> SaveTicket {
        let mut turns = self.turns.lock();
        let ticket = turns.issued;
        turns.issued = turns.issued.saturating_add(1);
        SaveTicket {
            sequencer: Arc::clone(self),
            ticket,
        }
    }

    /// Number of tickets released so far in order.
    pub fn completed(&self) -> u64 {
        self.turns.lock().next
    }
}

/// A place in a [`SaveSequencer`]; released on drop.
#[derive(Debug)]
pub struct SaveTicket {
    sequencer: Arc<SaveSequencer>,
    ticket: u64,
}

impl SaveTicket {
    /// Block until every earlier ticket has been released.
    pub fn wait_turn(&self) {
        let mut turns = self.sequencer.turns.lock();
        while turns.next < self.ticket {
            self.sequencer.turn_changed.wait(&mut turns);
        }
    }
}

impl Drop for SaveTicket {
    fn drop(&mut self) {
        self.sequencer.turns.lock().release(self.ticket);
        self.sequencer.turn_changed.notify_all();
    }
}

/// Everything needed to persist a session once sampling has stopped.
pub struct SessionFinalizer {
    config: LoggerConfig,
    sink: Arc<dyn SessionSink>,
    laps_completed: i32,
    ticket: Option<SaveTicket>,
}

impl std::fmt::Debug for SessionFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFinalizer")
            .field("output_directory", &self.config.output_directory)
            .field("laps_completed", &self.laps_completed)
            .field("ticket", &self.ticket.as_ref().map(|t| t.ticket))
            .finish_non_exhaustive()
    }
}

impl SessionFinalizer {
    pub fn new(config: LoggerConfig, sink: Arc<dyn SessionSink>, laps_completed: i32) -> Self {
        Self {
            config,
            sink,
            laps_completed,
            ticket: None,
        }
    }

    /// Persist only after every save holding an earlier ticket.
    pub fn in_turn(mut self, ticket: SaveTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Output path for `session` under the configured directory and template.
    pub fn output_path(&self, session: &Session) -> PathBuf {
        self.config
            .output_directory
            .join(session_filename(&self.config.filename_template, session))
    }

    /// Apply the save policy and persist `session`. Never fails; problems are
    /// logged and reported in the outcome.
    pub fn finalize(self, session: Session) -> SaveOutcome {
        if self.config.require_completed_lap && self.laps_completed < 1 {
            info!(
                laps_completed = self.laps_completed,
                "No completed lap, discarding session"
            );
            return SaveOutcome::Skipped {
                laps_completed: self.laps_completed,
            };
        }

        if let Some(ticket) = &self.ticket {
            debug!(ticket = ticket.ticket, "Waiting for earlier saves");
            ticket.wait_turn();
        }

        let path = self.output_path(&session);
        match self.sink.persist(&session, &path) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    markers = session.markers().len(),
                    "Session saved"
                );
                SaveOutcome::Saved(path)
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    stage = e.stage(),
                    error = %e,
                    "Failed to write session"
                );
                SaveOutcome::Failed {
                    path,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn config(require_completed_lap: bool) -> LoggerConfig {
        LoggerConfig {
            output_directory: PathBuf::from("out"),
            filename_template: "%d_%t.om".to_string(),
            require_completed_lap,
            ..LoggerConfig::default()
        }
    }

    #[test]
    fn test_saves_to_templated_path() {
        let sink = Arc::new(MemorySink::new());
        let finalizer = SessionFinalizer::new(config(false), sink.clone(), 0);

        let outcome = finalizer.finalize(Session::new());

        assert_eq!(
            outcome,
            SaveOutcome::Saved(PathBuf::from("out").join("No User_No Track.om"))
        );
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_require_one_lap_skips_short_sessions() {
        let sink = Arc::new(MemorySink::new());

        let outcome = SessionFinalizer::new(config(true), sink.clone(), 0).finalize(Session::new());
        assert_eq!(outcome, SaveOutcome::Skipped { laps_completed: 0 });
        assert!(sink.is_empty());

        let outcome = SessionFinalizer::new(config(true), sink.clone(), 1).finalize(Session::new());
        assert!(outcome.is_saved());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_tickets_released_out_of_order_advance_together() {
        let sequencer = SaveSequencer::new();
        let first = sequencer.ticket();
        let second = sequencer.ticket();
        let third = sequencer.ticket();

        drop(third);
        drop(second);
        assert_eq!(sequencer.completed(), 0);

        drop(first);
        assert_eq!(sequencer.completed(), 3);
    }

    #[test]
    fn test_later_save_waits_for_earlier_ticket() -> Result<(), Box<dyn std::error::Error>> {
        let sequencer = SaveSequencer::new();
        let sink = Arc::new(MemorySink::new());
        let first = sequencer.ticket();
        let second =
            SessionFinalizer::new(config(false), sink.clone(), 0).in_turn(sequencer.ticket());

        let worker = std::thread::spawn(move || second.finalize(Session::new()));
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(sink.is_empty());

        drop(first);
        let outcome = worker.join().map_err(|_panic| "save thread panicked")?;
        assert!(outcome.is_saved());
        assert_eq!(sink.len(), 1);
        assert_eq!(sequencer.completed(), 2);
        Ok(())
    }

    #[test]
    fn test_skipped_session_releases_its_turn() {
        let sequencer = SaveSequencer::new();
        let sink = Arc::new(MemorySink::new());

        let outcome = SessionFinalizer::new(config(true), sink.clone(), 0)
            .in_turn(sequencer.ticket())
            .finalize(Session::new());
        assert_eq!(outcome, SaveOutcome::Skipped { laps_completed: 0 });

        let outcome = SessionFinalizer::new(config(false), sink.clone(), 0)
            .in_turn(sequencer.ticket())
            .finalize(Session::new());
        assert!(outcome.is_saved());
        assert_eq!(sequencer.completed(), 2);
    }
}
