//! Per-request picker broker
//!
//! Every chooser request gets its own id and oneshot channel. The native host
//! answers by id, so concurrent requests never overwrite each other.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Notify};

use super::{classify, ChooserParams, DirectoryMode, PickRequest};
use crate::error::{Result, ShellError};

pub type PickId = u64;

type Outcome = Option<Vec<String>>;

/// Shows a picker on the native side
///
/// `launch` must not block; the answer comes back later through
/// `PickerBroker::complete`.
pub trait PickerLauncher: Send + Sync {
    fn launch(&self, id: PickId, request: &PickRequest) -> Result<()>;

    /// Called when a request is answered or abandoned
    fn dismiss(&self, _id: PickId) {}
}

/// Default launcher: requests stay in the broker's pending list until the
/// host UI polls and answers them. Waiters are woken on every change.
#[derive(Debug, Default)]
pub struct HostQueue {
    changed: Notify,
}

impl HostQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `ready` holds, a request is launched or dismissed, or
    /// `limit` elapses
    ///
    /// Interest is registered before `ready` is checked, so a change that
    /// lands in between still wakes the waiter.
    pub async fn wait_until<F>(&self, limit: Duration, ready: F)
    where
        F: FnOnce() -> bool,
    {
        let notified = self.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if ready() {
            return;
        }
        let _ = tokio::time::timeout(limit, notified).await;
    }
}

impl PickerLauncher for HostQueue {
    fn launch(&self, id: PickId, request: &PickRequest) -> Result<()> {
        tracing::debug!(id, kind = request.label(), "Queued picker request for host");
        self.changed.notify_waiters();
        Ok(())
    }

    fn dismiss(&self, _id: PickId) {
        self.changed.notify_waiters();
    }
}

/// A request waiting for the host, as listed by `/picker/pending`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingPick {
    pub id: PickId,
    pub request: PickRequest,
}

struct Waiting {
    request: PickRequest,
    reply: oneshot::Sender<Outcome>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PickerState {
    last_authorized_dir: Option<String>,
}

struct Inner {
    launcher: Arc<dyn PickerLauncher>,
    directory_mode: DirectoryMode,
    state_file: Option<PathBuf>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<PickId, Waiting>>,
    last_directory: Mutex<Option<String>>,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, HashMap<PickId, Waiting>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abandon(&self, id: PickId) {
        if self.pending().remove(&id).is_some() {
            tracing::info!(id, "Picker request abandoned");
            self.launcher.dismiss(id);
        }
    }
}

/// Resolves with the picked URIs, or `None` when cancelled or failed
///
/// Dropping the ticket abandons the request.
pub struct PickTicket {
    id: PickId,
    rx: oneshot::Receiver<Outcome>,
    inner: Arc<Inner>,
}

impl PickTicket {
    pub const fn id(&self) -> PickId {
        self.id
    }
}

impl Future for PickTicket {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(None))
    }
}

impl Drop for PickTicket {
    fn drop(&mut self) {
        self.inner.abandon(self.id);
    }
}

impl std::fmt::Debug for PickTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickTicket").field("id", &self.id).finish()
    }
}

/// Routes chooser requests to the native host and answers back to the page
#[derive(Clone)]
pub struct PickerBroker {
    inner: Arc<Inner>,
}

impl PickerBroker {
    /// Create a broker; a readable `state_file` restores the last directory
    pub fn new(
        launcher: Arc<dyn PickerLauncher>,
        directory_mode: DirectoryMode,
        state_file: Option<PathBuf>,
    ) -> Self {
        let last = state_file.as_deref().and_then(load_last_directory);
        Self {
            inner: Arc::new(Inner {
                launcher,
                directory_mode,
                state_file,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                last_directory: Mutex::new(last),
            }),
        }
    }

    pub fn directory_mode(&self) -> DirectoryMode {
        self.inner.directory_mode
    }

    pub fn last_directory(&self) -> Option<String> {
        self.inner
            .last_directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Classify and launch a chooser request
    pub fn request(&self, params: &ChooserParams) -> PickTicket {
        let request = classify(params);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        tracing::info!(id, kind = request.label(), "Picker type: {}", request.label());

        self.inner.pending().insert(
            id,
            Waiting {
                request: request.clone(),
                reply: tx,
            },
        );

        if let Err(e) = self.inner.launcher.launch(id, &request) {
            tracing::error!(id, error = %e, "Failed to launch picker");
            if let Some(waiting) = self.inner.pending().remove(&id) {
                let _ = waiting.reply.send(None);
            }
        }

        PickTicket {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Requests still waiting for the host, oldest first
    pub fn pending(&self) -> Vec<PendingPick> {
        let mut list: Vec<PendingPick> = self
            .inner
            .pending()
            .iter()
            .map(|(id, w)| PendingPick {
                id: *id,
                request: w.request.clone(),
            })
            .collect();
        list.sort_by_key(|p| p.id);
        list
    }

    /// Answer request `id`; `None` or an empty list means cancelled
    pub fn complete(&self, id: PickId, outcome: Option<Vec<String>>) -> Result<()> {
        let waiting = self
            .inner
            .pending()
            .remove(&id)
            .ok_or(ShellError::UnknownPick(id))?;
        self.inner.launcher.dismiss(id);

        let outcome = outcome.filter(|uris| !uris.is_empty());
        let result = match (&waiting.request, outcome) {
            (PickRequest::Directory, Some(uris)) => self.finish_directory(&uris[0]),
            (_, outcome) => outcome,
        };

        match &result {
            Some(uris) => tracing::info!(id, count = uris.len(), "Picker completed"),
            None => tracing::info!(id, "Picker cancelled"),
        }

        if waiting.reply.send(result).is_err() {
            tracing::debug!(id, "Picker answered after the page stopped waiting");
        }
        Ok(())
    }

    pub fn cancel(&self, id: PickId) -> Result<()> {
        self.complete(id, None)
    }

    fn finish_directory(&self, dir: &str) -> Option<Vec<String>> {
        self.remember_directory(dir);
        match self.inner.directory_mode {
            DirectoryMode::ReturnDirectory => Some(vec![dir.to_string()]),
            DirectoryMode::EnumerateFiles => match list_files(Path::new(dir)) {
                Ok(files) => Some(files),
                Err(e) => {
                    tracing::error!(dir, error = %e, "Failed to list picked directory");
                    None
                }
            },
        }
    }

    fn remember_directory(&self, dir: &str) {
        *self
            .inner
            .last_directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(dir.to_string());

        if let Some(path) = &self.inner.state_file {
            let state = PickerState {
                last_authorized_dir: Some(dir.to_string()),
            };
            if let Err(e) = save_state(path, &state) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist picker state");
            }
        }
    }
}

impl std::fmt::Debug for PickerBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickerBroker")
            .field("directory_mode", &self.inner.directory_mode)
            .field("pending", &self.inner.pending().len())
            .finish_non_exhaustive()
    }
}

/// Regular files directly inside `dir`, sorted
fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

fn load_last_directory(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<PickerState>(&text) {
        Ok(state) => state.last_authorized_dir,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable picker state");
            None
        }
    }
}

fn save_state(path: &Path, state: &PickerState) -> Result<()> {
    let text = toml::to_string(state)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}
