//! Publish UTF-8 text on the X11 CLIPBOARD selection.
//!
//! X keeps no clipboard contents of its own: the client that owns the
//! selection serves every paste. [`owner::clipboard_write`] is that
//! owner, [`clipboard::Clipboard`] runs it on a thread and reports
//! whether ownership was obtained.

pub mod clipboard;
pub mod owner;
pub mod status;
pub mod x11;
