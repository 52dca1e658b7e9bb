// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Save and load boundary.
//!
//! Saves are fire-and-forget: the payload is handed to a [`SaveSink`] and
//! never awaited. Loads run in the background and carry the local revision
//! they were issued at; a result that arrives after newer local edits is
//! discarded so local state always wins.

use crate::models::project::ProjectData;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

/// Serialized state handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePayload {
    pub revision: u64,
    pub body: String,
}

/// Destination for saves. Implementations must not block the caller.
pub trait SaveSink {
    fn submit(&self, payload: SavePayload);
}

/// Writes each payload to a file on a background thread.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SaveSink for FileSink {
    fn submit(&self, payload: SavePayload) {
        let path = self.path.clone();
        std::thread::spawn(move || match std::fs::write(&path, payload.body) {
            Ok(()) => log::info!("Saved revision {} to {}", payload.revision, path.display()),
            Err(e) => log::error!("Failed to save revision {} to {}: {}", payload.revision, path.display(), e),
        });
    }
}

/// Tracks which local revision was last handed to the sink.
#[derive(Debug, Default)]
pub struct SaveTracker {
    last_submitted: Option<u64>,
}

impl SaveTracker {
    pub fn needs_save(&self, revision: u64) -> bool {
        self.last_submitted != Some(revision)
    }

    /// Treat `revision` as already persisted, e.g. right after loading it.
    pub fn mark_saved(&mut self, revision: u64) {
        self.last_submitted = Some(revision);
    }

    /// Submit `body` if `revision` has not been submitted yet.
    pub fn save(&mut self, sink: &dyn SaveSink, revision: u64, body: String) -> bool {
        if !self.needs_save(revision) {
            return false;
        }
        sink.submit(SavePayload { revision, body });
        self.last_submitted = Some(revision);
        true
    }
}

/// The local revision a load was issued at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    revision: u64,
}

impl LoadTicket {
    pub fn issue(revision: u64) -> Self {
        Self { revision }
    }

    /// The response may be applied only if nothing changed locally since issue.
    pub fn is_current(&self, revision: u64) -> bool {
        self.revision == revision
    }
}

/// Outcome of polling a background load.
#[derive(Debug)]
pub enum LoadPoll<T> {
    Pending,
    Ready(T),
    /// Arrived after newer local edits; dropped.
    Stale,
    Failed(String),
}

/// A load running on a background thread.
pub struct PendingLoad<T> {
    ticket: LoadTicket,
    receiver: Receiver<Result<T, String>>,
}

impl<T: Send + 'static> PendingLoad<T> {
    /// Run `job` on a background thread.
    pub fn spawn<F>(revision: u64, job: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = channel();
        std::thread::spawn(move || {
            let result = job().map_err(|e| format!("{:#}", e));
            let _ = sender.send(result);
        });
        Self {
            ticket: LoadTicket::issue(revision),
            receiver,
        }
    }

    /// Non-blocking check; `current_revision` is the local revision now.
    pub fn poll(&self, current_revision: u64) -> LoadPoll<T> {
        match self.receiver.try_recv() {
            Ok(Ok(value)) if self.ticket.is_current(current_revision) => LoadPoll::Ready(value),
            Ok(Ok(_)) => {
                log::warn!("Discarding load response: local edits happened since it was requested");
                LoadPoll::Stale
            }
            Ok(Err(e)) => LoadPoll::Failed(e),
            Err(TryRecvError::Empty) => LoadPoll::Pending,
            Err(TryRecvError::Disconnected) => LoadPoll::Failed("loader exited without a result".to_string()),
        }
    }
}

/// Background project import.
pub fn spawn_project_load(path: PathBuf, revision: u64) -> PendingLoad<ProjectData> {
    PendingLoad::spawn(revision, move || crate::io::serialization::import_project(&path))
}
