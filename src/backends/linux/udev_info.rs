//! udev lookups shared by the evdev and XInput2 sources.

use std::ffi::OsStr;
use std::io;
use std::os::unix::io::AsRawFd;

const INPUT_SUBSYSTEM: &str = "input";

/// `eventN` nodes only; the legacy `jsN` and `mouseN` interfaces are skipped.
pub fn is_event_node(sysname: &str) -> bool {
    sysname
        .strip_prefix("event")
        .is_some_and(|number| !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()))
}

/// Hex id property value (`ID_VENDOR_ID` etc.); `0` when absent or malformed.
pub fn parse_hex_id(value: Option<&OsStr>) -> i32 {
    value
        .and_then(OsStr::to_str)
        .and_then(|value| i32::from_str_radix(value, 16).ok())
        .unwrap_or(0)
}

pub fn sysname(device: &udev::Device) -> String {
    device.sysname().to_string_lossy().into_owned()
}

/// Property value or empty string.
pub fn property(device: &udev::Device, key: &str) -> String {
    device
        .property_value(key)
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn hex_property(device: &udev::Device, key: &str) -> i32 {
    parse_hex_id(device.property_value(key))
}

pub fn is_tagged(device: &udev::Device, key: &str) -> bool {
    device.property_value(key) == Some(OsStr::new("1"))
}

/// Every `eventN` device of the input subsystem, ordered by name.
pub fn event_devices() -> io::Result<Vec<udev::Device>> {
    let mut enumerator = udev::Enumerator::new()?;
    enumerator.match_subsystem(INPUT_SUBSYSTEM)?;
    let mut devices: Vec<udev::Device> = enumerator
        .scan_devices()?
        .filter(|device| is_event_node(&sysname(device)))
        .collect();
    devices.sort_by_key(sysname);
    Ok(devices)
}

/// The device behind `/dev/input/<sysname>`.
pub fn event_device(sysname: &str) -> io::Result<udev::Device> {
    udev::Device::from_subsystem_sysname(INPUT_SUBSYSTEM.to_string(), sysname.to_string())
}

/// The `inputN` device an `eventN` node belongs to.
pub fn input_parent(device: &udev::Device) -> io::Result<Option<udev::Device>> {
    device.parent_with_subsystem(INPUT_SUBSYSTEM)
}

/// Monitor on the input subsystem; `iter()` on it never blocks.
pub fn input_monitor() -> io::Result<udev::MonitorSocket> {
    let socket = udev::MonitorBuilder::new()?.match_subsystem(INPUT_SUBSYSTEM)?.listen()?;

    let fd = socket.as_raw_fd();
    // SAFETY: `fd` belongs to `socket`, which is alive for both calls.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_numbered_event_nodes_count() {
        assert!(is_event_node("event0"));
        assert!(is_event_node("event17"));
        assert!(!is_event_node("event"));
        assert!(!is_event_node("js0"));
        assert!(!is_event_node("mouse1"));
        assert!(!is_event_node("input12"));
        assert!(!is_event_node("event3-joystick"));
    }

    #[test]
    fn hex_ids_fall_back_to_zero() {
        assert_eq!(parse_hex_id(Some(OsStr::new("045e"))), 0x045e);
        assert_eq!(parse_hex_id(Some(OsStr::new("02EA"))), 0x02ea);
        assert_eq!(parse_hex_id(Some(OsStr::new("zz"))), 0);
        assert_eq!(parse_hex_id(Some(OsStr::new(""))), 0);
        assert_eq!(parse_hex_id(None), 0);
    }
}
