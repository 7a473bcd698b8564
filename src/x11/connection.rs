//! [`Display`] over an x11rb connection, plus the pure-Rust binding.
//!
//! `X11Display` is generic over `x11rb::connection::Connection`, so the
//! same request code serves both `RustConnection` and `XCBConnection`.

use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    self, CreateWindowAux, EventMask, SelectionNotifyEvent, WindowClass,
};
use x11rb::rust_connection::RustConnection;

use super::{
    Atom, Binding, BindingError, ChangeStatus, Display, PropMode, SelectionNotify,
    SelectionRequest, Timestamp, Window, XEvent,
};

/// An open x11rb connection and its default screen.
pub struct X11Display<C: Connection> {
    conn: C,
    screen_num: usize,
}

impl<C: Connection> X11Display<C> {
    pub fn new(conn: C, screen_num: usize) -> Self {
        Self { conn, screen_num }
    }
}

impl<C: Connection> Display for X11Display<C> {
    fn default_root(&self) -> Window {
        self.conn.setup().roots[self.screen_num].root
    }

    fn create_simple_window(&mut self, parent: Window) -> Result<Window, BindingError> {
        let window = self.conn.generate_id()?;
        xproto::create_window(
            &self.conn,
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            0,
            0,
            1,
            1,
            0, // border_width
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().background_pixel(0).border_pixel(0),
        )?;
        Ok(window)
    }

    fn intern_atom(&mut self, name: &[u8], only_if_exists: bool) -> Result<Atom, BindingError> {
        Ok(xproto::intern_atom(&self.conn, only_if_exists, name)?
            .reply()?
            .atom)
    }

    fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Window,
        time: Timestamp,
    ) -> Result<(), BindingError> {
        xproto::set_selection_owner(&self.conn, owner, selection, time)?;
        Ok(())
    }

    fn get_selection_owner(&mut self, selection: Atom) -> Result<Window, BindingError> {
        Ok(xproto::get_selection_owner(&self.conn, selection)?
            .reply()?
            .owner)
    }

    fn next_event(&mut self) -> Result<XEvent, BindingError> {
        Ok(translate_event(self.conn.wait_for_event()?))
    }

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
    ) -> ChangeStatus {
        if !change_fits(format, nelements, data.len(), self.conn.maximum_request_bytes()) {
            tracing::debug!(window, property, len = data.len(), "change_property too large");
            return ChangeStatus::NOT_QUEUED;
        }
        match xproto::change_property(
            &self.conn, mode, window, property, type_, format, nelements, data,
        ) {
            Ok(_) => ChangeStatus::QUEUED,
            Err(e) => {
                tracing::debug!(window, property, error = %e, "change_property not queued");
                ChangeStatus::NOT_QUEUED
            }
        }
    }

    fn send_event(
        &mut self,
        destination: Window,
        propagate: bool,
        event_mask: u32,
        event: &SelectionNotify,
    ) -> Result<(), BindingError> {
        xproto::send_event(
            &self.conn,
            propagate,
            destination,
            EventMask::from(event_mask),
            notify_event(event),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn close(self) {
        // Dropping the connection closes the socket; the server then
        // destroys our windows.
        drop(self.conn);
    }
}

/// ChangeProperty header size, including the BIG-REQUESTS length word.
const CHANGE_PROPERTY_HEADER: usize = 28;

/// Whether a ChangeProperty of `nelements` `format`-bit items carried in
/// `data_len` bytes can be encoded and fits in one request.
fn change_fits(format: u8, nelements: u32, data_len: usize, max_request_bytes: usize) -> bool {
    let Some(bits) = nelements.checked_mul(u32::from(format)) else {
        return false;
    };
    if usize::try_from(bits / 8).ok() != Some(data_len) {
        return false;
    }
    data_len
        .checked_next_multiple_of(4)
        .and_then(|padded| padded.checked_add(CHANGE_PROPERTY_HEADER))
        .is_some_and(|total| total <= max_request_bytes)
}

/// Reduce an x11rb event to what the selection owner cares about.
fn translate_event(event: Event) -> XEvent {
    match event {
        Event::SelectionClear(e) => XEvent::SelectionClear {
            selection: e.selection,
            owner: e.owner,
        },
        Event::SelectionRequest(e) => XEvent::SelectionRequest(SelectionRequest {
            time: e.time,
            owner: e.owner,
            requestor: e.requestor,
            selection: e.selection,
            target: e.target,
            property: e.property,
        }),
        _ => XEvent::Other,
    }
}

fn notify_event(notify: &SelectionNotify) -> SelectionNotifyEvent {
    SelectionNotifyEvent {
        response_type: xproto::SELECTION_NOTIFY_EVENT,
        sequence: 0,
        time: notify.time,
        requestor: notify.requestor,
        selection: notify.selection,
        target: notify.target,
        property: notify.property,
    }
}

/// Binding that speaks the X11 wire protocol in Rust.
///
/// Nothing is loaded at runtime, so [`Binding::init`] cannot fail.
#[derive(Debug, Default, Clone)]
pub struct RustBinding {
    display_name: Option<String>,
}

impl RustBinding {
    /// Use `$DISPLAY`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit display name such as `:1`.
    pub fn with_display(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
        }
    }
}

impl Binding for RustBinding {
    type Display = X11Display<RustConnection>;

    fn init(&self) -> Result<(), BindingError> {
        Ok(())
    }

    fn open_display(&self) -> Option<Self::Display> {
        match RustConnection::connect(self.display_name.as_deref()) {
            Ok((conn, screen_num)) => Some(X11Display::new(conn, screen_num)),
            Err(e) => {
                tracing::debug!(error = %e, "X11 connect failed");
                None
            }
        }
    }
}
