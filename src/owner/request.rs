//! Deciding how to answer a `SelectionRequest`.
//!
//! Kept free of I/O so every branch can be checked without a server.

use std::borrow::Cow;

use crate::x11::{Atom, NONE, SelectionNotify, SelectionRequest, Window, XA_ATOM};

use super::AtomSet;

/// A property write on the requestor's window.
#[derive(Debug, PartialEq, Eq)]
pub struct PropertyWrite<'a> {
    pub window: Window,
    pub property: Atom,
    pub type_: Atom,
    pub format: u8,
    pub data: Cow<'a, [u8]>,
    pub nelements: u32,
}

/// What to do for one request: an optional property write followed by
/// a notify.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply<'a> {
    pub write: Option<PropertyWrite<'a>>,
    pub notify: SelectionNotify,
}

/// Build the reply for `request`, or `None` if it is not for CLIPBOARD.
pub fn reply_for<'a>(
    request: &SelectionRequest,
    atoms: &AtomSet,
    payload: &'a [u8],
) -> Option<Reply<'a>> {
    if request.selection != atoms.clipboard {
        return None;
    }

    let mut notify = SelectionNotify::reply_to(request);

    let write = if request.target == atoms.utf8_string {
        // Payloads too large for a single property need INCR; refuse them.
        element_count(payload.len(), 8).map(|nelements| PropertyWrite {
            window: request.requestor,
            property: request.property,
            type_: atoms.utf8_string,
            format: 8,
            data: Cow::Borrowed(payload),
            nelements,
        })
    } else if request.target == atoms.targets {
        Some(PropertyWrite {
            window: request.requestor,
            property: request.property,
            type_: XA_ATOM,
            format: 32,
            data: Cow::Owned(atoms.utf8_string.to_ne_bytes().to_vec()),
            nelements: 1,
        })
    } else {
        None
    };

    if write.is_none() {
        notify.property = NONE;
    }

    Some(Reply { write, notify })
}

/// Number of `format`-bit items in `len` bytes, if the property size in
/// bits still fits the 32-bit length field of a ChangeProperty request.
fn element_count(len: usize, format: u8) -> Option<u32> {
    let bits = u32::try_from(len).ok()?.checked_mul(8)?;
    Some(bits / u32::from(format))
}
