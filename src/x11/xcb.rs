//! libxcb binding, resolved through the dynamic loader on first use.

use std::ffi::CString;

use x11rb::xcb_ffi::XCBConnection;

use super::connection::X11Display;
use super::{Binding, BindingError};

/// Binding backed by the system libxcb, loaded at runtime.
///
/// Unlike [`super::connection::RustBinding`], [`Binding::init`] fails
/// when the library cannot be found.
#[derive(Debug, Default, Clone)]
pub struct XcbBinding {
    display_name: Option<CString>,
}

impl XcbBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit display name. Names containing NUL are rejected.
    pub fn with_display(name: &str) -> Result<Self, BindingError> {
        let name = CString::new(name)
            .map_err(|e| BindingError::Library(format!("invalid display name: {e}")))?;
        Ok(Self {
            display_name: Some(name),
        })
    }
}

impl Binding for XcbBinding {
    type Display = X11Display<XCBConnection>;

    fn init(&self) -> Result<(), BindingError> {
        x11rb::xcb_ffi::load_libxcb().map_err(|e| BindingError::Library(e.to_string()))
    }

    fn open_display(&self) -> Option<Self::Display> {
        match XCBConnection::connect(self.display_name.as_deref()) {
            Ok((conn, screen_num)) => Some(X11Display::new(conn, screen_num)),
            Err(e) => {
                tracing::debug!(error = %e, "libxcb connect failed");
                None
            }
        }
    }
}
