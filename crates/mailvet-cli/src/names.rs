//! Batch name directory
//!
//! Durable mapping of batch identifier to display name. The mapping is
//! stored as one JSON object in `verification_batch_names.json` inside the
//! data directory, loaded on first access and rewritten in full on every
//! mutation.
//!
//! Mutations hold the directory lock, re-read the file, apply the change
//! and atomically replace the file, so the listing refresh and a stream's
//! start handler never lose each other's updates.

use crate::error::{CliError, Result};
use chrono::{DateTime, Local, TimeZone};
use rand::Rng;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// File name of the persisted mapping
pub const NAMES_FILE: &str = "verification_batch_names.json";

const ADJECTIVES: [&str; 10] = [
    "Marketing",
    "Sales",
    "Customer",
    "Product",
    "Newsletter",
    "Outreach",
    "Promotional",
    "Campaign",
    "Lead",
    "Prospect",
];

const NOUNS: [&str; 10] = [
    "List",
    "Contacts",
    "Database",
    "Subscribers",
    "Audience",
    "Segment",
    "Group",
    "Collection",
    "Batch",
    "Emails",
];

type Entries = BTreeMap<String, String>;

/// Generate a cosmetic batch name such as `"Lead Segment Oct 2026"`
pub fn generate_batch_name() -> String {
    generate_batch_name_with(&mut rand::thread_rng(), Local::now())
}

/// Generate a batch name from the given randomness and date
pub fn generate_batch_name_with<R, Tz>(rng: &mut R, at: DateTime<Tz>) -> String
where
    R: Rng + ?Sized,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    format!("{} {} {}", adjective, noun, at.format("%b %Y"))
}

/// Process-wide batch name store
///
/// Construct one instance and share it (`Arc<NameDirectory>`) between the
/// orchestrator and the listing refresh.
pub struct NameDirectory {
    path: Option<PathBuf>,
    entries: Mutex<Option<Entries>>,
}

impl NameDirectory {
    /// Directory persisted under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: Some(data_dir.as_ref().join(NAMES_FILE)),
            entries: Mutex::new(None),
        }
    }

    /// Directory that lives only as long as this value
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Some(Entries::new())),
        }
    }

    /// Backing file, if persisted
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Entries>>> {
        self.entries
            .lock()
            .map_err(|_| CliError::name_directory("directory lock poisoned"))
    }

    fn read_file(path: &Path) -> Result<Entries> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable batch name directory"
                );
                Ok(Entries::new())
            }
        }
    }

    fn write_file(path: &Path, entries: &Entries) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| CliError::Io(e.error))?;

        debug!(path = %path.display(), count = entries.len(), "Saved batch names");
        Ok(())
    }

    fn loaded<'a>(
        &self,
        guard: &'a mut MutexGuard<'_, Option<Entries>>,
    ) -> Result<&'a mut Entries> {
        if guard.is_none() {
            let entries = match &self.path {
                Some(path) => Self::read_file(path)?,
                None => Entries::new(),
            };
            **guard = Some(entries);
        }
        guard
            .as_mut()
            .ok_or_else(|| CliError::name_directory("directory not loaded"))
    }

    /// Read-modify-write under the lock; `apply` reports whether it changed anything
    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let mut guard = self.lock()?;

        let mut entries = match &self.path {
            Some(path) => Self::read_file(path)?,
            None => guard.take().unwrap_or_default(),
        };

        let changed = apply(&mut entries);
        if changed {
            if let Some(path) = &self.path {
                Self::write_file(path, &entries)?;
            }
        }

        *guard = Some(entries);
        Ok(())
    }

    /// Stored name for `batch_id`
    pub fn get(&self, batch_id: &str) -> Result<Option<String>> {
        let mut guard = self.lock()?;
        Ok(self.loaded(&mut guard)?.get(batch_id).cloned())
    }

    /// Stored name, or a freshly generated placeholder (not persisted)
    pub fn resolve(&self, batch_id: &str) -> Result<String> {
        Ok(self.get(batch_id)?.unwrap_or_else(generate_batch_name))
    }

    /// Upsert a name; last write wins
    pub fn assign(&self, batch_id: &str, name: &str) -> Result<()> {
        let (id, name) = (batch_id.to_string(), name.to_string());
        self.update(move |entries| entries.insert(id, name.clone()).as_ref() != Some(&name))
    }

    /// Give every id without a name a generated one, in a single write
    ///
    /// Returns how many names were assigned.
    pub fn ensure_names(&self, batch_ids: &[String]) -> Result<usize> {
        let mut assigned = 0;
        self.update(|entries| {
            for id in batch_ids {
                if !entries.contains_key(id) {
                    entries.insert(id.clone(), generate_batch_name());
                    assigned += 1;
                }
            }
            assigned > 0
        })?;
        Ok(assigned)
    }

    /// Copy of the whole mapping
    pub fn entries(&self) -> Result<BTreeMap<String, String>> {
        let mut guard = self.lock()?;
        Ok(self.loaded(&mut guard)?.clone())
    }
}
