//! JSON state file holding events and availability between invocations.
//!
//! Every invocation holds an exclusive advisory lock on a sibling `.lock`
//! file from load to save, so concurrent processes see each other's writes
//! and confirmations stay serialized across processes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use consensus_engine::{
    AvailabilityWindow, CalendarEvent, ConsensusScheduler, InMemoryAvailabilityStore,
    InMemoryEventStore,
};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

pub type Scheduler = ConsensusScheduler<InMemoryAvailabilityStore, InMemoryEventStore>;

/// Exclusive lock on `<state>.lock`, released when dropped.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
}

impl StateLock {
    /// Block until the lock for `state_path` is held.
    pub fn acquire(state_path: &Path) -> Result<Self> {
        let lock_path = lock_path(state_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock state file: {}", lock_path.display()))?;
        tracing::debug!(path = %lock_path.display(), "state lock acquired");
        Ok(Self { _file: file })
    }
}

fn lock_path(state_path: &Path) -> PathBuf {
    let mut name = state_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
}

impl StateFile {
    /// Load the state file, or start empty if it does not exist yet.
    ///
    /// Takes the [`StateLock`] so the caller cannot load without holding it.
    pub fn load(path: &Path, _lock: &StateLock) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "state file missing, starting empty");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    /// Write through a uniquely named temp file in the same directory, then
    /// rename it over `path`.
    pub fn save(&self, path: &Path, _lock: &StateLock) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .with_context(|| format!("Failed to write temp file: {}", tmp.path().display()))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;
        Ok(())
    }

    pub fn into_scheduler(self) -> Scheduler {
        ConsensusScheduler::new(
            InMemoryAvailabilityStore::from_windows(self.availability),
            InMemoryEventStore::from_events(self.events),
        )
    }

    pub fn from_scheduler(scheduler: Scheduler) -> Result<Self> {
        let (availability, events) = scheduler.into_stores();
        Ok(Self {
            events: events.all_events()?,
            availability: availability.all_windows()?,
        })
    }
}
