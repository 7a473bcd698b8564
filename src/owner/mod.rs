//! Selection-owner task — claims CLIPBOARD and serves paste requests.
//!
//! X has no clipboard daemon: the data lives in the owning client, which
//! must stay connected and answer `SelectionRequest` events until another
//! client takes the selection. [`clipboard_write`] is that client. It
//! reports the handshake outcome through a [`StatusSink`] exactly once,
//! then blocks in the event loop.
//!
//! Stages: `Init → DisplayOpen → OwnerClaimed → Serving → Terminated`.

mod request;

use crate::status::{Status, StatusSink};
use crate::x11::{
    Atom, Binding, BindingError, CURRENT_TIME, ChangeStatus, Display, PropMode, SelectionRequest,
    Window, XEvent,
};

/// How many times to try opening the display before giving up. Rides
/// out a server that is still starting with the session.
pub const DISPLAY_OPEN_ATTEMPTS: u32 = 42;

/// Atoms interned once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomSet {
    pub clipboard: Atom,
    pub utf8_string: Atom,
    pub targets: Atom,
}

impl AtomSet {
    fn intern<D: Display>(display: &mut D) -> Result<Self, BindingError> {
        Ok(Self {
            clipboard: display.intern_atom(b"CLIPBOARD", false)?,
            utf8_string: display.intern_atom(b"UTF8_STRING", false)?,
            targets: display.intern_atom(b"TARGETS", false)?,
        })
    }
}

/// The invisible window that owns the selection.
#[derive(Debug)]
struct Agent {
    window: Window,
    atoms: AtomSet,
}

enum Claim {
    Owned(Agent),
    Refused { owner: Window },
}

/// Publish `payload` as the CLIPBOARD selection.
///
/// Signals `status` exactly once: [`Status::Acquired`] after ownership is
/// verified, or the failure. On success, keeps serving until another
/// client takes the selection or the connection breaks, then returns.
pub fn clipboard_write<B: Binding>(binding: &B, payload: &[u8], status: impl StatusSink) {
    if let Err(e) = binding.init() {
        tracing::warn!(error = %e, "X11 binding unavailable");
        status.signal(Status::BindingUnavailable);
        return;
    }

    let Some(mut display) = open_display(binding, DISPLAY_OPEN_ATTEMPTS) else {
        tracing::warn!(
            attempts = DISPLAY_OPEN_ATTEMPTS,
            "could not open X display"
        );
        status.signal(Status::DisplayUnavailable);
        return;
    };

    let agent = match claim(&mut display) {
        Ok(Claim::Owned(agent)) => agent,
        Ok(Claim::Refused { owner }) => {
            tracing::warn!(owner, "server did not record us as CLIPBOARD owner");
            display.close();
            status.signal(Status::OwnershipRefused);
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not claim CLIPBOARD");
            display.close();
            status.signal(Status::OwnershipRefused);
            return;
        }
    };

    tracing::info!(
        window = agent.window,
        bytes = payload.len(),
        "CLIPBOARD ownership acquired"
    );
    status.signal(Status::Acquired);

    serve(&mut display, &agent, payload);
    display.close();
}

fn open_display<B: Binding>(binding: &B, attempts: u32) -> Option<B::Display> {
    (1..=attempts).find_map(|attempt| {
        let display = binding.open_display();
        if display.is_none() {
            tracing::debug!(attempt, "open_display returned nothing");
        }
        display
    })
}

/// Create the agent window and make it the CLIPBOARD owner.
fn claim<D: Display>(display: &mut D) -> Result<Claim, BindingError> {
    let root = display.default_root();
    let window = display.create_simple_window(root)?;
    let atoms = AtomSet::intern(display)?;

    display.set_selection_owner(atoms.clipboard, window, CURRENT_TIME)?;
    let owner = display.get_selection_owner(atoms.clipboard)?;

    if owner == window {
        Ok(Claim::Owned(Agent { window, atoms }))
    } else {
        Ok(Claim::Refused { owner })
    }
}

/// Event loop. Returns when ownership is lost or the connection breaks.
fn serve<D: Display>(display: &mut D, agent: &Agent, payload: &[u8]) {
    loop {
        match display.next_event() {
            Ok(XEvent::SelectionClear { selection, owner }) => {
                tracing::info!(selection, owner, "CLIPBOARD ownership lost");
                return;
            }
            Ok(XEvent::SelectionRequest(request)) => answer(display, agent, payload, &request),
            Ok(XEvent::Other) => tracing::trace!("ignoring event"),
            Err(e) => {
                tracing::warn!(error = %e, "X11 connection lost while serving");
                return;
            }
        }
    }
}

fn answer<D: Display>(display: &mut D, agent: &Agent, payload: &[u8], request: &SelectionRequest) {
    let Some(reply) = request::reply_for(request, &agent.atoms, payload) else {
        tracing::trace!(selection = request.selection, "request for another selection");
        return;
    };

    let result = match &reply.write {
        Some(write) => display.change_property(
            write.window,
            write.property,
            write.type_,
            write.format,
            PropMode::REPLACE,
            &write.data,
            write.nelements,
        ),
        None => ChangeStatus::NOT_RUN,
    };

    tracing::debug!(
        requestor = request.requestor,
        target = request.target,
        refused = reply.write.is_none(),
        "answering selection request"
    );

    if !result.queued() {
        tracing::debug!(requestor = request.requestor, "property not queued, no reply");
        return;
    }

    if let Err(e) = display.send_event(reply.notify.requestor, false, 0, &reply.notify) {
        tracing::debug!(requestor = request.requestor, error = %e, "send_event failed");
    }
}
