//! In-process stand-in for an X server, for tests.
//!
//! Implements [`Binding`] and [`Display`] with per-client event queues,
//! selection ownership, window properties and a call log. Ownership
//! changes deliver `SelectionClear` to the previous owner the way a real
//! server does.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use x11rb::errors::ConnectionError;

use super::{
    Atom, Binding, BindingError, ChangeStatus, Display, NONE, PropMode, SelectionNotify,
    SelectionRequest, Timestamp, Window, XA_ATOM, XEvent,
};
use crate::status::{Status, StatusSink};

pub const ROOT: Window = 0x100;
pub const PRIMARY: Atom = 1;

const WAIT: Duration = Duration::from_secs(5);

pub type ClientId = usize;

/// Something that happened on the server, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(ClientId),
    SetOwner { selection: Atom, owner: Window },
    GetOwner { selection: Atom, owner: Window },
    ChangeProperty { window: Window, property: Atom },
    Send(SelectionNotify),
    Close(ClientId),
    Status(Status),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub type_: Atom,
    pub format: u8,
    pub mode: PropMode,
    pub data: Vec<u8>,
    pub nelements: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub destination: Window,
    pub propagate: bool,
    pub event_mask: u32,
    pub event: SelectionNotify,
}

#[derive(Default)]
struct Client {
    queue: VecDeque<XEvent>,
    windows: Vec<Window>,
    closed: bool,
    severed: bool,
}

struct State {
    atoms: HashMap<Vec<u8>, Atom>,
    next_atom: Atom,
    next_window: Window,
    clients: Vec<Client>,
    owners: HashMap<Atom, Window>,
    properties: HashMap<(Window, Atom), Property>,
    sent: Vec<Sent>,
    log: Vec<Call>,
    open_failures: u32,
    open_attempts: u32,
    library_missing: bool,
    refuse_ownership: bool,
    unqueueable_properties: bool,
}

impl State {
    fn intern(&mut self, name: &[u8], only_if_exists: bool) -> Atom {
        if let Some(&atom) = self.atoms.get(name) {
            return atom;
        }
        if only_if_exists {
            return NONE;
        }
        let atom = self.next_atom;
        self.next_atom += 1;
        self.atoms.insert(name.to_vec(), atom);
        atom
    }

    fn new_window(&mut self, client: ClientId) -> Window {
        let window = self.next_window;
        self.next_window += 1;
        self.clients[client].windows.push(window);
        window
    }

    fn client_of(&self, window: Window) -> Option<ClientId> {
        self.clients
            .iter()
            .position(|c| c.windows.contains(&window))
    }

    fn set_owner(&mut self, selection: Atom, owner: Window) {
        if let Some(previous) = self.owners.insert(selection, owner)
            && previous != owner
            && let Some(client) = self.client_of(previous)
        {
            self.clients[client].queue.push_back(XEvent::SelectionClear {
                selection,
                owner: previous,
            });
        }
    }
}

struct Inner {
    state: Mutex<State>,
    changed: Condvar,
}

/// Shared handle to the fake server.
#[derive(Clone)]
pub struct FakeServer {
    inner: Arc<Inner>,
}

impl FakeServer {
    pub fn new() -> Self {
        let mut atoms = HashMap::new();
        atoms.insert(b"PRIMARY".to_vec(), PRIMARY);
        atoms.insert(b"ATOM".to_vec(), XA_ATOM);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    atoms,
                    next_atom: 69,
                    next_window: 0x200000,
                    clients: Vec::new(),
                    owners: HashMap::new(),
                    properties: HashMap::new(),
                    sent: Vec::new(),
                    log: Vec::new(),
                    open_failures: 0,
                    open_attempts: 0,
                    library_missing: false,
                    refuse_ownership: false,
                    unqueueable_properties: false,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap()
    }

    fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let result = f(&mut self.lock());
        self.inner.changed.notify_all();
        result
    }

    /// Block until `done` holds, panicking after a timeout.
    fn wait_until(&self, what: &str, mut done: impl FnMut(&State) -> bool) {
        let deadline = Instant::now() + WAIT;
        let mut state = self.lock();
        while !done(&*state) {
            let left = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_else(|| panic!("timed out waiting for {what}"));
            state = self.inner.changed.wait_timeout(state, left).unwrap().0;
        }
    }

    pub fn binding(&self) -> FakeBinding {
        FakeBinding {
            server: self.clone(),
        }
    }

    /// A status sink that logs the status on the server before
    /// forwarding it.
    pub fn sink(&self, tx: mpsc::Sender<Status>) -> FakeSink {
        FakeSink {
            server: self.clone(),
            tx,
        }
    }

    pub fn fail_opens(&self, n: u32) {
        self.update(|s| s.open_failures = n);
    }

    pub fn hide_library(&self) {
        self.update(|s| s.library_missing = true);
    }

    pub fn refuse_ownership(&self) {
        self.update(|s| s.refuse_ownership = true);
    }

    pub fn reject_property_writes(&self) {
        self.update(|s| s.unqueueable_properties = true);
    }

    pub fn open_attempts(&self) -> u32 {
        self.lock().open_attempts
    }

    pub fn atom(&self, name: &str) -> Atom {
        self.update(|s| s.intern(name.as_bytes(), false))
    }

    pub fn owner(&self, selection: Atom) -> Window {
        self.lock().owners.get(&selection).copied().unwrap_or(NONE)
    }

    pub fn log(&self) -> Vec<Call> {
        self.lock().log.clone()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.lock().sent.clone()
    }

    pub fn property(&self, window: Window, property: Atom) -> Option<Property> {
        self.lock().properties.get(&(window, property)).cloned()
    }

    /// Connect a bystander client owning one window, as a paste client
    /// would.
    pub fn peer(&self) -> Window {
        self.update(|s| {
            s.clients.push(Client::default());
            let id = s.clients.len() - 1;
            s.new_window(id)
        })
    }

    /// Have `requestor` ask the current owner of `selection` for
    /// `target`, answering into `property`.
    pub fn request(&self, requestor: Window, selection: Atom, target: Atom, property: Atom) {
        let owner = self.owner(selection);
        assert_ne!(owner, NONE, "selection has no owner");
        self.deliver(
            owner,
            SelectionRequest {
                time: 0,
                owner,
                requestor,
                selection,
                target,
                property,
            },
        );
    }

    /// Queue a raw request on the client that created `owner`.
    pub fn deliver(&self, owner: Window, request: SelectionRequest) {
        self.update(|s| {
            let client = s.client_of(owner).expect("unknown window");
            s.clients[client]
                .queue
                .push_back(XEvent::SelectionRequest(request));
        });
    }

    pub fn deliver_other(&self, owner: Window) {
        self.update(|s| {
            let client = s.client_of(owner).expect("unknown window");
            s.clients[client].queue.push_back(XEvent::Other);
        });
    }

    /// Make `window` the owner of `selection`.
    pub fn take_selection(&self, selection: Atom, window: Window) {
        self.update(|s| s.set_owner(selection, window));
    }

    /// Break the connection of the client that created `window`.
    pub fn sever(&self, window: Window) {
        self.update(|s| {
            let client = s.client_of(window).expect("unknown window");
            s.clients[client].severed = true;
        });
    }

    pub fn wait_for_sent(&self, n: usize) -> Vec<Sent> {
        self.wait_until("selection notify", |s| s.sent.len() >= n);
        self.sent()
    }
}

pub struct FakeBinding {
    server: FakeServer,
}

impl Binding for FakeBinding {
    type Display = FakeDisplay;

    fn init(&self) -> Result<(), BindingError> {
        if self.server.lock().library_missing {
            return Err(BindingError::Library("libX11.so.6: not found".into()));
        }
        Ok(())
    }

    fn open_display(&self) -> Option<FakeDisplay> {
        self.server.update(|s| {
            s.open_attempts += 1;
            if s.open_failures > 0 {
                s.open_failures -= 1;
                return None;
            }
            s.clients.push(Client::default());
            let client = s.clients.len() - 1;
            s.log.push(Call::Open(client));
            Some(FakeDisplay {
                server: self.server.clone(),
                client,
            })
        })
    }
}

pub struct FakeDisplay {
    server: FakeServer,
    client: ClientId,
}

impl Display for FakeDisplay {
    fn default_root(&self) -> Window {
        ROOT
    }

    fn create_simple_window(&mut self, _parent: Window) -> Result<Window, BindingError> {
        let client = self.client;
        Ok(self.server.update(|s| s.new_window(client)))
    }

    fn intern_atom(&mut self, name: &[u8], only_if_exists: bool) -> Result<Atom, BindingError> {
        Ok(self.server.update(|s| s.intern(name, only_if_exists)))
    }

    fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Window,
        _time: Timestamp,
    ) -> Result<(), BindingError> {
        self.server.update(|s| {
            s.log.push(Call::SetOwner { selection, owner });
            if !s.refuse_ownership {
                s.set_owner(selection, owner);
            }
        });
        Ok(())
    }

    fn get_selection_owner(&mut self, selection: Atom) -> Result<Window, BindingError> {
        Ok(self.server.update(|s| {
            let owner = s.owners.get(&selection).copied().unwrap_or(NONE);
            s.log.push(Call::GetOwner { selection, owner });
            owner
        }))
    }

    fn next_event(&mut self) -> Result<XEvent, BindingError> {
        let mut state = self.server.lock();
        loop {
            let client = &mut state.clients[self.client];
            if client.severed || client.closed {
                return Err(BindingError::Connection(ConnectionError::IoError(
                    std::io::ErrorKind::ConnectionReset.into(),
                )));
            }
            if let Some(event) = client.queue.pop_front() {
                drop(state);
                self.server.inner.changed.notify_all();
                return Ok(event);
            }
            // Writers left serving at the end of a test park here until
            // the process exits.
            state = self.server.inner.changed.wait(state).unwrap();
        }
    }

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
        self.server.update(|s| {
            if s.unqueueable_properties {
                return ChangeStatus::NOT_QUEUED;
            }
            s.log.push(Call::ChangeProperty { window, property });
            s.properties.insert(
                (window, property),
                Property {
                    type_,
                    format,
                    mode,
                    data: data.to_vec(),
                    nelements,
                },
            );
            ChangeStatus::QUEUED
        })
    }

    fn send_event(
        &mut self,
        destination: Window,
        propagate: bool,
        event_mask: u32,
        event: &SelectionNotify,
    ) -> Result<(), BindingError> {
        self.server.update(|s| {
            s.log.push(Call::Send(*event));
            s.sent.push(Sent {
                destination,
                propagate,
                event_mask,
                event: *event,
            });
        });
        Ok(())
    }

    fn close(self) {
        let client = self.client;
        self.server.update(|s| {
            s.log.push(Call::Close(client));
            s.clients[client].closed = true;
            let windows = s.clients[client].windows.clone();
            s.owners.retain(|_, owner| !windows.contains(owner));
        });
    }
}

pub struct FakeSink {
    server: FakeServer,
    tx: mpsc::Sender<Status>,
}

impl StatusSink for FakeSink {
    fn signal(self, status: Status) {
        self.server.update(|s| s.log.push(Call::Status(status)));
        self.tx.signal(status);
    }
}
