//! macOS backend: the IOKit HID manager for keyboards, mice and gamepads.
//!
//! Callbacks are delivered through the run loop of the thread that created the
//! context, so contexts are tied to that thread. Force feedback is not exposed.

pub mod hidm_device;
pub mod hidm_source;
pub mod iokit;
pub mod usage;
