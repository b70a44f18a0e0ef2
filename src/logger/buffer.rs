//! In-memory log ring
//!
//! Keeps the most recent events for the on-device log viewer. WARN and ERROR
//! are always kept; INFO and below only while detailed mode is on.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::Level;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            level,
            target: target.into(),
            message: message.into(),
        }
    }

    /// `[HH:MM:SS] [LEVEL] message`
    pub fn render(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.time.format("%H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// JSON view of one entry
#[derive(Serialize)]
struct EntryView<'a> {
    time: String,
    level: &'a str,
    target: &'a str,
    message: &'a str,
}

/// JSON view of the whole buffer
#[derive(Serialize)]
struct Snapshot<'a> {
    capacity: usize,
    dropped: u64,
    detailed: bool,
    entries: Vec<EntryView<'a>>,
}

struct Ring {
    entries: VecDeque<LogEntry>,
    dropped: u64,
}

struct Inner {
    capacity: usize,
    detailed: AtomicBool,
    ring: Mutex<Ring>,
}

/// Shared handle to the ring; clones see the same entries
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<Inner>,
}

impl LogBuffer {
    /// `capacity` is clamped to at least one entry
    pub fn new(capacity: usize, detailed: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                capacity,
                detailed: AtomicBool::new(detailed),
                ring: Mutex::new(Ring {
                    entries: VecDeque::with_capacity(capacity.min(1024)),
                    dropped: 0,
                }),
            }),
        }
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.inner.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn is_detailed(&self) -> bool {
        self.inner.detailed.load(Ordering::Relaxed)
    }

    /// Toggle detailed capture
    ///
    /// The notice is logged after the switch, so turning the mode off leaves
    /// no INFO line behind.
    pub fn set_detailed(&self, on: bool) {
        self.inner.detailed.store(on, Ordering::Relaxed);
        tracing::info!("Detailed log mode: {}", if on { "ON" } else { "OFF" });
    }

    /// Whether an event at `level` is kept
    pub fn accepts(&self, level: Level) -> bool {
        level <= Level::WARN || self.is_detailed()
    }

    /// Append unconditionally, evicting the oldest entry when full
    pub fn push(&self, entry: LogEntry) {
        let mut ring = self.ring();
        if ring.entries.len() >= self.inner.capacity {
            ring.entries.pop_front();
            ring.dropped += 1;
        }
        ring.entries.push_back(entry);
    }

    /// Append when the capture policy allows it
    pub fn record(&self, level: Level, target: &str, message: &str) {
        if self.accepts(level) {
            self.push(LogEntry::new(level, target, message));
        }
    }

    pub fn len(&self) -> usize {
        self.ring().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries evicted since the last clear
    pub fn dropped(&self) -> u64 {
        self.ring().dropped
    }

    pub fn clear(&self) {
        let mut ring = self.ring();
        ring.entries.clear();
        ring.dropped = 0;
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.ring().entries.iter().cloned().collect()
    }

    /// Text view: one rendered entry per paragraph
    pub fn render_text(&self) -> String {
        let ring = self.ring();
        let mut out = String::new();
        if ring.dropped > 0 {
            let _ = write!(out, "... {} earlier entries dropped ...\n\n", ring.dropped);
        }
        for entry in &ring.entries {
            out.push_str(&entry.render());
            out.push_str("\n\n");
        }
        out
    }

    /// Serialize the buffer for the shell API
    pub fn to_json(&self) -> serde_json::Value {
        let ring = self.ring();
        let levels: Vec<String> = ring.entries.iter().map(|e| e.level.to_string()).collect();
        let snapshot = Snapshot {
            capacity: self.inner.capacity,
            dropped: ring.dropped,
            detailed: self.is_detailed(),
            entries: ring
                .entries
                .iter()
                .zip(&levels)
                .map(|(e, level)| EntryView {
                    time: e.time.to_rfc3339(),
                    level,
                    target: &e.target,
                    message: &e.message,
                })
                .collect(),
        };
        serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("capacity", &self.inner.capacity)
            .field("detailed", &self.is_detailed())
            .finish_non_exhaustive()
    }
}
