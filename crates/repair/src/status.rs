//! Persistent repair-status journal.
//!
//! The journal is the only shared mutable state in a run. Every slice
//! lives in exactly one of four buckets (`pending`, `current`,
//! `finished`, `failed`); each mutation stamps `updated` and atomically
//! replaces the on-disk JSON document, so external readers (the cluster
//! reporter, metrics exporters) only ever observe a complete snapshot.
//! The file schema is an inter-process contract; field names must not
//! change.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::RepairOptions;

/// Placeholder for "every keyspace" / "every column family".
pub const ALL: &str = "<all>";

/// Errors from journal persistence.
///
/// Loss of journal durability defeats resume, so callers treat these as
/// fatal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("status file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("status file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize repair status: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("cannot resume, repair status indicates it has already finished at {0}")]
    AlreadyFinished(String),
    #[error("resume requested but no status file is configured")]
    NoStatusFile,
}

/// Identity of one slice of repair work.
///
/// `keyspace` and `column_families` are stored pre-rendered: `<all>`
/// when unspecified, column families joined with `,` otherwise.
#[derive(Debug, Clone)]
pub struct SliceId {
    pub step: u32,
    pub start: String,
    pub end: String,
    pub nodeposition: String,
    pub keyspace: String,
    pub column_families: String,
}

impl SliceId {
    pub fn new(
        step: u32,
        start: &str,
        end: &str,
        nodeposition: &str,
        keyspace: Option<&str>,
        column_families: &[String],
    ) -> Self {
        SliceId {
            step,
            start: start.to_string(),
            end: end.to_string(),
            nodeposition: nodeposition.to_string(),
            keyspace: render_keyspace(keyspace),
            column_families: render_column_families(column_families),
        }
    }

    /// Deterministic identifier used as the bucket key.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}",
            self.step, self.start, self.end, self.nodeposition, self.keyspace, self.column_families
        )
    }
}

pub fn render_keyspace(keyspace: Option<&str>) -> String {
    match keyspace {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ALL.to_string(),
    }
}

pub fn render_column_families(column_families: &[String]) -> String {
    if column_families.is_empty() {
        ALL.to_string()
    } else {
        column_families.join(",")
    }
}

/// One slice's journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub time: String,
    pub step: u32,
    pub start: String,
    pub end: String,
    pub nodeposition: String,
    pub keyspace: String,
    pub column_families: String,
    pub cmd: String,
}

impl RepairRecord {
    fn build(cmd: &str, slice: &SliceId) -> Self {
        RepairRecord {
            time: now_iso(),
            step: slice.step,
            start: slice.start.clone(),
            end: slice.end.clone(),
            nodeposition: slice.nodeposition.clone(),
            keyspace: slice.keyspace.clone(),
            column_families: slice.column_families.clone(),
            cmd: cmd.to_string(),
        }
    }
}

/// The on-disk journal document. Field names are the external contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusDocument {
    pub started: Option<String>,
    pub updated: Option<String>,
    pub finished: Option<String>,
    /// Fresh runs never wrote this field historically; absence loads as null.
    #[serde(default)]
    pub last_resumed_at: Option<String>,
    pub steps: u32,
    pub successful_count: u64,
    pub failed_count: u64,
    pub failed_repairs: BTreeMap<String, RepairRecord>,
    pub pending_repairs: BTreeMap<String, RepairRecord>,
    pub current_repairs: BTreeMap<String, RepairRecord>,
    pub finished_repairs: BTreeMap<String, RepairRecord>,
}

struct JournalInner {
    filename: Option<PathBuf>,
    log_status: bool,
    doc: StatusDocument,
}

/// Thread-safe journal shared by every worker.
///
/// All mutation funnels through one mutex; the file on disk always
/// corresponds to some serialisation point of the mutation order.
pub struct StatusJournal {
    inner: Mutex<JournalInner>,
}

impl Default for StatusJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusJournal {
    pub fn new() -> Self {
        StatusJournal {
            inner: Mutex::new(JournalInner {
                filename: None,
                log_status: false,
                doc: StatusDocument::default(),
            }),
        }
    }

    /// Begins recording a fresh run: resets all state, stamps `started`
    /// and writes the first snapshot.
    pub fn start(&self, options: &RepairOptions) -> Result<(), JournalError> {
        let mut inner = self.inner.lock();
        inner.filename = options.output_status.clone();
        inner.log_status = options.log_status;
        inner.doc = StatusDocument {
            steps: options.steps,
            started: Some(now_iso()),
            ..StatusDocument::default()
        };
        write_locked(&mut inner)
    }

    /// Registers a slice the driver is about to dispatch.
    pub fn add_pending(&self, slice: &SliceId) {
        let mut inner = self.inner.lock();
        let record = RepairRecord::build("", slice);
        inner.doc.pending_repairs.insert(slice.key(), record);
    }

    /// Records that a slice's repair command is starting.
    pub fn repair_start(&self, cmd: &str, slice: &SliceId) -> Result<(), JournalError> {
        let mut inner = self.inner.lock();
        let key = slice.key();
        inner.doc.pending_repairs.remove(&key);
        let record = RepairRecord::build(cmd, slice);
        inner.doc.current_repairs.insert(key, record);
        write_locked(&mut inner)
    }

    /// Records a successful slice.
    pub fn repair_success(&self, cmd: &str, slice: &SliceId) -> Result<(), JournalError> {
        let mut inner = self.inner.lock();
        let key = slice.key();
        let record = inner
            .doc
            .current_repairs
            .remove(&key)
            .unwrap_or_else(|| RepairRecord::build(cmd, slice));
        inner.doc.pending_repairs.remove(&key);
        inner.doc.finished_repairs.insert(key, record);
        inner.doc.successful_count += 1;
        write_locked(&mut inner)
    }

    /// Records a slice whose repair command failed after all retries.
    pub fn repair_fail(&self, cmd: &str, slice: &SliceId) -> Result<(), JournalError> {
        let mut inner = self.inner.lock();
        let key = slice.key();
        let record = inner
            .doc
            .current_repairs
            .remove(&key)
            .unwrap_or_else(|| RepairRecord::build(cmd, slice));
        inner.doc.pending_repairs.remove(&key);
        inner.doc.failed_repairs.insert(key, record);
        inner.doc.failed_count += 1;
        write_locked(&mut inner)
    }

    /// Marks the run complete.
    pub fn finish(&self) -> Result<(), JournalError> {
        let mut inner = self.inner.lock();
        inner.doc.finished = Some(now_iso());
        write_locked(&mut inner)
    }

    /// Loads an interrupted run from disk and returns its pending slices
    /// for re-dispatch.
    ///
    /// Refuses journals whose `finished` timestamp is set.
    pub fn resume(
        &self,
        options: &RepairOptions,
    ) -> Result<BTreeMap<String, RepairRecord>, JournalError> {
        let path = options
            .output_status
            .clone()
            .ok_or(JournalError::NoStatusFile)?;
        let raw = fs::read_to_string(&path).map_err(|source| JournalError::Io {
            path: path.clone(),
            source,
        })?;
        let doc: StatusDocument =
            serde_json::from_str(&raw).map_err(|source| JournalError::Malformed {
                path: path.clone(),
                source,
            })?;
        if let Some(finished) = &doc.finished {
            return Err(JournalError::AlreadyFinished(finished.clone()));
        }

        let mut inner = self.inner.lock();
        inner.filename = Some(path);
        inner.log_status = options.log_status;
        inner.doc = doc;
        inner.doc.steps = options.steps;
        inner.doc.last_resumed_at = Some(now_iso());
        write_locked(&mut inner)?;
        Ok(inner.doc.pending_repairs.clone())
    }

    /// Point-in-time copy of the journal document.
    pub fn snapshot(&self) -> StatusDocument {
        self.inner.lock().doc.clone()
    }
}

/// Stamps `updated`, then atomically replaces the journal file.
///
/// The document is written to a sibling temp file, chmodded to 0644 and
/// renamed into place so concurrent readers never see a torn write.
fn write_locked(inner: &mut JournalInner) -> Result<(), JournalError> {
    inner.doc.updated = Some(now_iso());
    let json = serde_json::to_string(&inner.doc).map_err(JournalError::Serialize)?;

    if let Some(path) = &inner.filename {
        replace_file(path, &json)?;
    }
    if inner.log_status {
        tracing::error!(target: "status", "repair status: {}", json);
    }
    Ok(())
}

fn replace_file(path: &Path, contents: &str) -> Result<(), JournalError> {
    let io_err = |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, contents).map_err(io_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644)).map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)
}

/// ISO-8601 local timestamp with microsecond precision, the format the
/// downstream status readers parse.
fn now_iso() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
