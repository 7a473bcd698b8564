//! X11 binding layer — the narrow protocol surface the selection owner
//! needs.
//!
//! [`Binding`] opens connections; [`Display`] is one open connection.
//! Two implementations exist: [`connection::RustBinding`] speaks the wire
//! protocol directly via `x11rb::rust_connection`, and `xcb::XcbBinding`
//! (feature `dl-libxcb`) loads libxcb at runtime. They behave identically
//! except that only the latter can fail [`Binding::init`].

pub mod connection;
#[cfg(test)]
pub mod fake;
#[cfg(feature = "dl-libxcb")]
pub mod xcb;

use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};

pub use x11rb::protocol::xproto::{Atom, PropMode, Timestamp, Window};

/// Pseudo-timestamp meaning "the server's current time".
pub const CURRENT_TIME: Timestamp = x11rb::CURRENT_TIME;

/// The `None` sentinel for atoms and windows.
pub const NONE: Atom = x11rb::NONE;

/// Predefined `ATOM` atom, used as the property type for atom lists.
pub const XA_ATOM: Atom = 4;

/// Binding layer errors.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("X11 client library unavailable: {0}")]
    Library(String),
    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),
    #[error("reply: {0}")]
    Reply(#[from] ReplyError),
    #[error("id allocation: {0}")]
    Id(#[from] ReplyOrIdError),
}

/// Entry point into an X client library.
pub trait Binding {
    type Display: Display;

    /// Make the library usable. Statically available bindings always
    /// succeed.
    fn init(&self) -> Result<(), BindingError>;

    /// Open a connection to the configured display, or `None` if the
    /// server could not be reached.
    fn open_display(&self) -> Option<Self::Display>;
}

/// One open connection to an X server.
pub trait Display {
    /// Root window of the default screen.
    fn default_root(&self) -> Window;

    /// Create an unmapped 1×1 window parented to `parent`.
    fn create_simple_window(&mut self, parent: Window) -> Result<Window, BindingError>;

    fn intern_atom(&mut self, name: &[u8], only_if_exists: bool) -> Result<Atom, BindingError>;

    fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Window,
        time: Timestamp,
    ) -> Result<(), BindingError>;

    /// Synchronous round-trip.
    fn get_selection_owner(&mut self, selection: Atom) -> Result<Window, BindingError>;

    /// Block until the next event arrives.
    fn next_event(&mut self) -> Result<XEvent, BindingError>;

    /// Write `data` into `window.property`. `data` holds `nelements`
    /// items of `format` bits each, in native byte order.
    #[allow(clippy::too_many_arguments)]
    fn change_property(
        &mut self,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        mode: PropMode,
        data: &[u8],
        nelements: u32,
    ) -> ChangeStatus;

    fn send_event(
        &mut self,
        destination: Window,
        propagate: bool,
        event_mask: u32,
        event: &SelectionNotify,
    ) -> Result<(), BindingError>;

    /// Close the connection. Windows created on it are destroyed by the
    /// server.
    fn close(self);
}

/// Xlib-style status returned by [`Display::change_property`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeStatus(pub u32);

impl ChangeStatus {
    /// No property change was attempted.
    pub const NOT_RUN: Self = Self(0);
    /// The request was queued for the server.
    pub const QUEUED: Self = Self(1);
    /// The request could not be queued.
    pub const NOT_QUEUED: Self = Self(Self::NOT_QUEUED_BIT);

    const NOT_QUEUED_BIT: u32 = 0x2;

    /// Whether a reply may be sent for this property write.
    pub fn queued(self) -> bool {
        (self.0 & Self::NOT_QUEUED_BIT) == 0
    }
}

/// Events the selection owner distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    /// Another client took a selection we owned.
    SelectionClear { selection: Atom, owner: Window },
    /// A peer asks for a selection's contents.
    SelectionRequest(SelectionRequest),
    /// Anything else, including protocol errors.
    Other,
}

/// Fields of a `SelectionRequest` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRequest {
    pub time: Timestamp,
    pub owner: Window,
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    pub property: Atom,
}

/// A `SelectionNotify` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionNotify {
    pub time: Timestamp,
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    pub property: Atom,
}

impl SelectionNotify {
    /// Mirror a request. The property is kept, which signals success
    /// unless it is later replaced by [`NONE`].
    pub fn reply_to(request: &SelectionRequest) -> Self {
        Self {
            time: request.time,
            requestor: request.requestor,
            selection: request.selection,
            target: request.target,
            property: request.property,
        }
    }
}
