//! `clipwrite copy` — publish text and stay alive while it is needed.

use tokio::io::AsyncReadExt;
use tokio::signal::unix::{SignalKind, signal as tokio_signal};

use crate::cli::Backend;
use clipwrite::clipboard::{Clipboard, ClipboardError, OwnerHandle};
use clipwrite::x11::Binding;
use clipwrite::x11::connection::RustBinding;

/// Copy command errors.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("{0}")]
    Clipboard(#[from] ClipboardError),
    #[error("input is not valid UTF-8")]
    NotUtf8,
    #[cfg_attr(feature = "dl-libxcb", allow(dead_code))]
    #[error("backend {0:?} not available in this build (enable feature dl-libxcb)")]
    BackendUnavailable(Backend),
    #[cfg_attr(not(feature = "dl-libxcb"), allow(dead_code))]
    #[error("invalid display name: {0}")]
    InvalidDisplay(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the copy command.
///
/// Returns once ownership is lost or a termination signal arrives.
pub async fn run(
    text: Option<String>,
    backend: Backend,
    display: Option<String>,
) -> Result<(), CopyError> {
    let text = match text {
        Some(text) => text,
        None => read_stdin().await?,
    };

    let handle = match backend {
        Backend::Rust => {
            let binding = match display {
                Some(name) => RustBinding::with_display(name),
                None => RustBinding::new(),
            };
            publish(binding, &text).await?
        }
        Backend::Xcb => publish(xcb_binding(display)?, &text).await?,
    };

    eprintln!("copied {} bytes to CLIPBOARD", handle.bytes());
    wait(handle).await
}

async fn publish<B>(binding: B, text: &str) -> Result<OwnerHandle, CopyError>
where
    B: Binding + Send + Sync + 'static,
{
    Ok(Clipboard::new(binding).write_string(text).await?)
}

#[cfg(feature = "dl-libxcb")]
fn xcb_binding(display: Option<String>) -> Result<clipwrite::x11::xcb::XcbBinding, CopyError> {
    use clipwrite::x11::xcb::XcbBinding;

    match display {
        Some(name) => {
            XcbBinding::with_display(&name).map_err(|e| CopyError::InvalidDisplay(e.to_string()))
        }
        None => Ok(XcbBinding::new()),
    }
}

#[cfg(not(feature = "dl-libxcb"))]
fn xcb_binding(_display: Option<String>) -> Result<RustBinding, CopyError> {
    Err(CopyError::BackendUnavailable(Backend::Xcb))
}

async fn read_stdin() -> Result<String, CopyError> {
    let mut buf = Vec::new();
    tokio::io::stdin().read_to_end(&mut buf).await?;
    decode(buf)
}

fn decode(buf: Vec<u8>) -> Result<String, CopyError> {
    String::from_utf8(buf).map_err(|_| CopyError::NotUtf8)
}

/// Keep serving until ownership is lost or we are told to stop.
async fn wait(handle: OwnerHandle) -> Result<(), CopyError> {
    let mut sig_term = tokio_signal(SignalKind::terminate())?;
    let mut sig_int = tokio_signal(SignalKind::interrupt())?;

    tokio::select! {
        result = handle.released() => {
            result?;
            tracing::info!("another client took CLIPBOARD");
        }
        _ = sig_term.recv() => {
            tracing::info!("received SIGTERM, releasing CLIPBOARD");
        }
        _ = sig_int.recv() => {
            tracing::info!("received SIGINT, releasing CLIPBOARD");
        }
    }

    Ok(())
}
