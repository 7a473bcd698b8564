//! Host-side clipboard API.
//!
//! Runs the owner task on a dedicated thread and turns its one-shot
//! status into a `Result`. Writes through one [`Clipboard`] are
//! serialized: a second write waits until the first has either failed or
//! become the owner.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{Mutex, oneshot};

use crate::owner::clipboard_write;
use crate::status::Status;
use crate::x11::Binding;

/// Clipboard write errors.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("X11 client library unavailable")]
    BindingUnavailable,
    #[error("no X display could be opened")]
    DisplayUnavailable,
    #[error("X server refused CLIPBOARD ownership")]
    OwnershipRefused,
    #[error("clipboard owner exited without reporting")]
    OwnerExited,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClipboardError {
    fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::Acquired => None,
            Status::BindingUnavailable => Some(Self::BindingUnavailable),
            Status::DisplayUnavailable => Some(Self::DisplayUnavailable),
            Status::OwnershipRefused => Some(Self::OwnershipRefused),
        }
    }
}

/// Publishes text on the X11 CLIPBOARD selection.
pub struct Clipboard<B> {
    binding: Arc<B>,
    lock: Mutex<()>,
}

impl<B> Clipboard<B>
where
    B: Binding + Send + Sync + 'static,
{
    pub fn new(binding: B) -> Self {
        Self {
            binding: Arc::new(binding),
            lock: Mutex::new(()),
        }
    }

    pub async fn write_string(&self, text: &str) -> Result<OwnerHandle, ClipboardError> {
        self.write_bytes(text.as_bytes().to_vec()).await
    }

    /// Publish `payload`, which must be UTF-8.
    ///
    /// Resolves once ownership is confirmed or has failed. On success the
    /// returned handle keeps serving pastes in the background.
    pub async fn write_bytes(&self, payload: Vec<u8>) -> Result<OwnerHandle, ClipboardError> {
        let _guard = self.lock.lock().await;

        let bytes = payload.len();
        let binding = Arc::clone(&self.binding);
        let (tx, rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("clipboard-owner".into())
            .spawn(move || clipboard_write(&*binding, &payload, tx))?;

        let Ok(status) = rx.await else {
            if thread.join().is_err() {
                tracing::error!("clipboard owner thread panicked");
            }
            return Err(ClipboardError::OwnerExited);
        };

        if let Some(e) = ClipboardError::from_status(status) {
            // The task returns right after signaling a failure.
            if thread.join().is_err() {
                tracing::error!("clipboard owner thread panicked");
            }
            return Err(e);
        }

        Ok(OwnerHandle { thread, bytes })
    }
}

/// A running clipboard owner.
///
/// Dropping the handle detaches the thread; the data stays on the
/// clipboard until another client takes it or the process exits.
#[derive(Debug)]
pub struct OwnerHandle {
    thread: JoinHandle<()>,
    bytes: usize,
}

impl OwnerHandle {
    /// Size of the published payload.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Whether the owner is still serving paste requests.
    pub fn is_serving(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Wait until ownership is lost.
    pub async fn released(self) -> Result<(), ClipboardError> {
        let joined = tokio::task::spawn_blocking(move || self.thread.join())
            .await
            .map_err(|e| ClipboardError::Io(std::io::Error::other(e)))?;
        joined.map_err(|_| ClipboardError::OwnerExited)
    }
}
