//! One-shot status reporting from the owner task to its caller.

/// Outcome of the ownership handshake. The integer codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    /// Ownership acquired; the task is serving paste requests.
    Acquired = 0,
    /// The X client library could not be loaded.
    BindingUnavailable = -1,
    /// No display could be opened within the retry budget.
    DisplayUnavailable = -2,
    /// The server did not record the agent window as the owner.
    OwnershipRefused = -3,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A channel that accepts exactly one [`Status`].
///
/// `signal` consumes the sink, so a second call cannot compile.
pub trait StatusSink {
    fn signal(self, status: Status);
}

impl StatusSink for tokio::sync::oneshot::Sender<Status> {
    fn signal(self, status: Status) {
        if self.send(status).is_err() {
            tracing::debug!(code = status.code(), "status receiver dropped");
        }
    }
}

impl StatusSink for std::sync::mpsc::Sender<Status> {
    fn signal(self, status: Status) {
        if self.send(status).is_err() {
            tracing::debug!(code = status.code(), "status receiver dropped");
        }
    }
}
