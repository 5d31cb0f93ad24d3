//! Linux backends: evdev for gamepads, XInput2 for keyboards and mice.

#[cfg(any(feature = "backend-evdev", feature = "backend-xi2"))]
pub mod udev_info;

#[cfg(feature = "backend-evdev")]
pub mod evdev_device;
#[cfg(feature = "backend-evdev")]
pub mod evdev_source;

#[cfg(feature = "backend-xi2")]
pub mod keysym;
#[cfg(feature = "backend-xi2")]
pub mod xi2_device;
#[cfg(feature = "backend-xi2")]
pub mod xi2_source;
