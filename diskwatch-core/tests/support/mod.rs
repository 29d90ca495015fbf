//! In-memory stand-ins for the storage and messaging ports.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use diskwatch_core::{
    NotificationSink, ParseMode, SinkError, StorageBackend, StorageError,
};
use tokio::time::Instant;

/// How a folder answers a listing call.
#[derive(Debug, Clone)]
pub enum Listing {
    Names(Vec<String>),
    NotFound,
    Fail(String),
    Panic(String),
}

impl Listing {
    pub fn names(items: &[&str]) -> Self {
        Listing::Names(items.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Default)]
struct StorageState {
    current: HashMap<String, Listing>,
    once: HashMap<String, VecDeque<Listing>>,
    calls: Vec<(String, Instant)>,
}

/// Storage whose folders answer from a script. Folders with no script are
/// reported as not found.
#[derive(Debug, Default)]
pub struct ScriptedStorage {
    state: Mutex<StorageState>,
}

impl ScriptedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every later call for `folder` with `listing`.
    pub fn set(&self, folder: &str, listing: Listing) {
        self.state
            .lock()
            .unwrap()
            .current
            .insert(folder.to_string(), listing);
    }

    /// Answer only the next call for `folder` with `listing`.
    pub fn push_once(&self, folder: &str, listing: Listing) {
        self.state
            .lock()
            .unwrap()
            .once
            .entry(folder.to_string())
            .or_default()
            .push_back(listing);
    }

    pub fn calls_for(&self, folder: &str) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(name, _)| name == folder)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

#[async_trait]
impl StorageBackend for ScriptedStorage {
    async fn list_names(
        &self,
        folder: &str,
    ) -> Result<HashSet<String>, StorageError> {
        // Resolve under the lock, act after releasing it so a scripted panic
        // does not poison the state.
        let listing = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((folder.to_string(), Instant::now()));
            let once = state.once.get_mut(folder).and_then(VecDeque::pop_front);
            once.or_else(|| state.current.get(folder).cloned())
        };

        match listing {
            Some(Listing::Names(names)) => Ok(names.into_iter().collect()),
            Some(Listing::NotFound) | None => {
                Err(StorageError::NotFound(folder.to_string()))
            }
            Some(Listing::Fail(message)) => Err(StorageError::Api {
                status: 503,
                message,
            }),
            Some(Listing::Panic(message)) => panic!("{message}"),
        }
    }

    async fn check_credentials(&self) -> Result<bool, StorageError> {
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub text: String,
    pub mode: ParseMode,
}

impl SentMessage {
    /// File name announced by the message.
    pub fn file(&self) -> &str {
        between(&self.text, "<b>File:</b> <code>", "</code>")
    }

    /// Folder announced by the message.
    pub fn folder(&self) -> &str {
        between(&self.text, "<b>Folder:</b> <code>", "</code>")
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let from = text.find(start).map(|i| i + start.len()).unwrap_or(0);
    let rest = &text[from..];
    let to = rest.find(end).unwrap_or(rest.len());
    &rest[..to]
}

#[derive(Debug, Default)]
struct SinkState {
    delivered: Vec<SentMessage>,
    attempts: usize,
    failing_files: HashSet<String>,
}

/// Sink that records delivered messages and fails on demand.
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<SinkState>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send announcing `file` fail until [`Self::recover`].
    pub fn fail_for(&self, file: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_files
            .insert(file.to_string());
    }

    pub fn recover(&self, file: &str) {
        self.state.lock().unwrap().failing_files.remove(file);
    }

    pub fn delivered(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().delivered.clone()
    }

    pub fn delivered_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .delivered()
            .iter()
            .map(|m| m.file().to_string())
            .collect();
        files.sort();
        files
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        mode: ParseMode,
    ) -> Result<(), SinkError> {
        let message = SentMessage {
            destination: destination.to_string(),
            text: text.to_string(),
            mode,
        };

        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if state.failing_files.contains(message.file()) {
            return Err(SinkError::Rejected {
                status: 400,
                description: "Bad Request: chat not found".to_string(),
            });
        }
        state.delivered.push(message);
        Ok(())
    }
}
