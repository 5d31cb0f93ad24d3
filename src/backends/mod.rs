//! Input backends for `minput`.
//!
//! One [`Source`](crate::source::Source) per native subsystem. The set is fixed at
//! compile time by target OS and cargo features:
//!
//! | target | feature | source |
//! |---|---|---|
//! | Linux | **`backend-xi2`** | X11 XInput2 raw keyboard/mouse |
//! | Linux | **`backend-evdev`** | evdev gamepads (udev-tagged joysticks) |
//! | Windows | **`backend-raw-input`** | Raw Input keyboard/mouse |
//! | Windows | **`backend-xinput`** | XInput gamepads (slots 0–3) |
//! | macOS | **`backend-hidm`** | IOKit HID manager |
//!
//! [`virtual_input`] is always available; it is not a platform source and is only
//! installed explicitly.

use crate::source::SourceFactory;

pub mod virtual_input;

#[cfg(target_os = "linux")]
#[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
pub mod linux;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

#[cfg(all(target_os = "macos", feature = "backend-hidm"))]
#[cfg_attr(docsrs, doc(cfg(all(target_os = "macos", feature = "backend-hidm"))))]
pub mod macos;

/// Platform sources compiled into this build, in installation order.
pub fn platform_sources() -> Vec<(&'static str, SourceFactory)> {
    #[allow(unused_mut)]
    let mut out: Vec<(&'static str, SourceFactory)> = Vec::new();

    #[cfg(all(target_os = "linux", feature = "backend-xi2"))]
    out.push(("X11 XInput2", linux::xi2_source::create as SourceFactory));

    #[cfg(all(target_os = "linux", feature = "backend-evdev"))]
    out.push(("evdev", linux::evdev_source::create as SourceFactory));

    #[cfg(all(target_os = "windows", feature = "backend-raw-input"))]
    out.push(("Raw Input", windows::raw_input_source::create as SourceFactory));

    #[cfg(all(target_os = "windows", feature = "backend-xinput"))]
    out.push(("XInput", windows::xinput_source::create as SourceFactory));

    #[cfg(all(target_os = "macos", feature = "backend-hidm"))]
    out.push(("HIDManager", macos::hidm_source::create as SourceFactory));

    out
}
