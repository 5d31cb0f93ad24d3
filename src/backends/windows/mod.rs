//! Windows backends: Raw Input for keyboards and mice, XInput for gamepads.
//!
//! Raw Input needs a window to deliver to; the source creates a message-only window on
//! the thread that creates the context and pumps it from
//! [`Context::drain_events`](crate::context::Context::drain_events). Contexts are
//! therefore tied to the thread that made them.

#[cfg(feature = "backend-raw-input")]
pub mod raw_input;
#[cfg(feature = "backend-raw-input")]
pub mod raw_input_device;
#[cfg(feature = "backend-raw-input")]
pub mod raw_input_source;

#[cfg(feature = "backend-xinput")]
pub mod xinput_device;
#[cfg(feature = "backend-xinput")]
pub mod xinput_source;
