//! Tick-based input from keyboards, mice and gamepads.
//!
//! `minput` enumerates devices through the native subsystems of the host OS, maps their
//! events onto one closed set of [`InputCode`]s, and keeps a double-buffered
//! [`VirtualAxis`] per code. The host calls [`Context::drain_events`] once per tick;
//! between ticks it reads `current`, `previous` and staged `next` values.
//!
//! - [`context`]: registry, sources and the drain/commit cycle
//! - [`device`]: the [`Device`] trait and its shared [`DeviceCore`]
//! - [`derive`]: deadzones and synthetic axes computed around commit
//! - [`backends`]: evdev, XInput2, Raw Input, XInput, IOKit HID, virtual
//! - [`ffi`]: the flat C API (`rb_minput_*`)

#[macro_use]
pub mod logger;

pub mod backends;
pub mod context;
pub mod derive;
pub mod device;
pub mod enumeration;
pub mod error;
pub mod event;
pub mod ffi;
pub mod input_code;
pub mod metadata;
pub mod options;
pub mod registry;
pub mod source;
pub mod virtual_axis;

pub use context::Context;
pub use device::{Device, DeviceCore, DeviceId, DeviceInfo};
pub use enumeration::Enumeration;
pub use error::{Error, Result};
pub use event::DeviceEvent;
pub use input_code::{InputCategory, InputCode};
pub use logger::{Hooks, LogLevel, LogSink};
pub use metadata::DeviceMeta;
pub use options::{Options, OptionsConfig};
pub use registry::DeviceRegistry;
pub use source::Source;
pub use virtual_axis::{AxisValues, VirtualAxis};
