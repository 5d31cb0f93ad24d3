//! Raw Input packet parsing and device queries.
//!
//! This layer only turns `WM_INPUT` payloads and `GetRawInputDeviceInfoW` results into
//! small structs. Device bookkeeping lives in the source, key/button mapping in the
//! device.

use core::ffi::c_void;
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::UI::Input::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyboardPacket {
    pub make_code: u16,
    pub vkey: u16,
    pub is_e0: bool,
    pub is_break: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MousePacket {
    /// `RAWMOUSE::usFlags` (`MOUSE_MOVE_*`).
    pub flags: u16,
    pub last_x: i32,
    pub last_y: i32,
    /// `RI_MOUSE_*` bits.
    pub button_flags: u16,
    pub button_data: u16,
}

impl MousePacket {
    pub fn is_absolute(&self) -> bool {
        self.flags & MOUSE_MOVE_ABSOLUTE != 0
    }

    pub fn is_virtual_desktop(&self) -> bool {
        self.flags & MOUSE_VIRTUAL_DESKTOP != 0
    }

    /// Vertical wheel movement in notches, `0` when the packet has none.
    pub fn wheel_notches(&self) -> f32 {
        if self.button_flags & RI_MOUSE_WHEEL == 0 {
            return 0.0;
        }
        f32::from(self.button_data as i16) / WHEEL_DELTA
    }

    /// `Some(true)` on press, `Some(false)` on release, `None` when untouched.
    pub fn button(&self, (up, down): (u16, u16)) -> Option<bool> {
        if self.button_flags & down != 0 {
            Some(true)
        } else if self.button_flags & up != 0 {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketKind {
    Keyboard(KeyboardPacket),
    Mouse(MousePacket),
    Hid,
}

#[derive(Clone, Copy, Debug)]
pub struct Packet {
    pub device: HANDLE,
    pub kind: PacketKind,
}

// Local constants (exports of these vary across windows-sys versions).
const RI_KEY_BREAK: u16 = 0x0001;
const RI_KEY_E0: u16 = 0x0002;

const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;
const MOUSE_VIRTUAL_DESKTOP: u16 = 0x0002;

const RI_MOUSE_WHEEL: u16 = 0x0400;
const WHEEL_DELTA: f32 = 120.0;

/// `(up, down)` flag pairs of mouse buttons 1-5.
pub const MOUSE_BUTTON_1: (u16, u16) = (0x0002, 0x0001);
pub const MOUSE_BUTTON_2: (u16, u16) = (0x0008, 0x0004);
pub const MOUSE_BUTTON_3: (u16, u16) = (0x0020, 0x0010);
pub const MOUSE_BUTTON_4: (u16, u16) = (0x0080, 0x0040);
pub const MOUSE_BUTTON_5: (u16, u16) = (0x0200, 0x0100);

/// Copy the payload behind a `WM_INPUT` lparam.
pub fn read_wm_input(lparam: isize) -> Option<Vec<u8>> {
    let header_size = core::mem::size_of::<RAWINPUTHEADER>() as u32;
    unsafe {
        let mut size: u32 = 0;
        let r0 = GetRawInputData(lparam as _, RID_INPUT, core::ptr::null_mut(), &mut size, header_size);
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        let mut buf = vec![0u8; size as usize];
        let r1 = GetRawInputData(lparam as _, RID_INPUT, buf.as_mut_ptr() as *mut c_void, &mut size, header_size);
        if r1 == u32::MAX {
            return None;
        }
        Some(buf)
    }
}

/// Parse a `RID_INPUT` payload copied out during `WM_INPUT`.
pub fn parse_packet(buf: &[u8]) -> Option<Packet> {
    let header_size = core::mem::size_of::<RAWINPUTHEADER>();
    if buf.len() < header_size {
        return None;
    }

    unsafe {
        // RAWINPUT is variable-sized; read the header, then only the variant it names.
        let header: RAWINPUTHEADER = core::ptr::read_unaligned(buf.as_ptr() as *const RAWINPUTHEADER);
        let data = buf.as_ptr().add(header_size);

        let kind = match header.dwType {
            RIM_TYPEKEYBOARD => {
                if buf.len() < header_size + core::mem::size_of::<RAWKEYBOARD>() {
                    return None;
                }
                let keyboard: RAWKEYBOARD = core::ptr::read_unaligned(data as *const RAWKEYBOARD);
                PacketKind::Keyboard(KeyboardPacket {
                    make_code: keyboard.MakeCode,
                    vkey: keyboard.VKey,
                    is_e0: keyboard.Flags & RI_KEY_E0 != 0,
                    is_break: keyboard.Flags & RI_KEY_BREAK != 0,
                })
            }
            RIM_TYPEMOUSE => {
                if buf.len() < header_size + core::mem::size_of::<RAWMOUSE>() {
                    return None;
                }
                let mouse: RAWMOUSE = core::ptr::read_unaligned(data as *const RAWMOUSE);
                PacketKind::Mouse(MousePacket {
                    flags: mouse.usFlags,
                    last_x: mouse.lLastX,
                    last_y: mouse.lLastY,
                    button_flags: mouse.Anonymous.Anonymous.usButtonFlags,
                    button_data: mouse.Anonymous.Anonymous.usButtonData,
                })
            }
            RIM_TYPEHID => PacketKind::Hid,
            _ => return None,
        };

        Some(Packet {
            device: header.hDevice,
            kind,
        })
    }
}

/// Device interface path (`RIDI_DEVICENAME`).
pub fn device_name(device: HANDLE) -> Option<String> {
    unsafe {
        let mut size: u32 = 0;
        let r0 = GetRawInputDeviceInfoW(device, RIDI_DEVICENAME, core::ptr::null_mut(), &mut size);
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        let mut wide: Vec<u16> = vec![0u16; size as usize];
        let r1 = GetRawInputDeviceInfoW(device, RIDI_DEVICENAME, wide.as_mut_ptr() as *mut c_void, &mut size);
        if r1 == u32::MAX {
            return None;
        }

        while wide.last() == Some(&0) {
            wide.pop();
        }
        Some(String::from_utf16_lossy(&wide))
    }
}

/// Type and capabilities (`RIDI_DEVICEINFO`).
pub fn device_info(device: HANDLE) -> Option<RID_DEVICE_INFO> {
    unsafe {
        let mut info: RID_DEVICE_INFO = core::mem::zeroed();
        let mut size = core::mem::size_of::<RID_DEVICE_INFO>() as u32;
        info.cbSize = size;
        let read = GetRawInputDeviceInfoW(device, RIDI_DEVICEINFO, &mut info as *mut _ as *mut c_void, &mut size);
        (read == size).then_some(info)
    }
}

/// Handles of every keyboard and mouse Raw Input currently knows.
pub fn device_list() -> std::io::Result<Vec<HANDLE>> {
    let entry_size = core::mem::size_of::<RAWINPUTDEVICELIST>() as u32;
    unsafe {
        let mut count: u32 = 0;
        if GetRawInputDeviceList(core::ptr::null_mut(), &mut count, entry_size) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        let mut list: Vec<RAWINPUTDEVICELIST> = vec![core::mem::zeroed(); count as usize];
        let read = GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry_size);
        if read == u32::MAX {
            return Err(std::io::Error::last_os_error());
        }
        list.truncate(read as usize);

        Ok(list
            .into_iter()
            .filter(|entry| entry.dwType == RIM_TYPEKEYBOARD || entry.dwType == RIM_TYPEMOUSE)
            .map(|entry| entry.hDevice)
            .collect())
    }
}

/// PnP instance id of a Raw Input device path.
///
/// `\\?\HID#VID_046D&PID_C52B&MI_00#7&2a8a7b9c&0&0000#{884b96c3-...}` becomes
/// `hid\vid_046d&pid_c52b&mi_00\7&2a8a7b9c&0&0000`.
pub fn instance_id(raw_name: &str) -> String {
    let trimmed = raw_name
        .strip_prefix(r"\\?\")
        .or_else(|| raw_name.strip_prefix(r"\??\"))
        .unwrap_or(raw_name);
    let mut parts: Vec<&str> = trimmed.split('#').collect();
    if parts.len() > 1 {
        parts.pop();
    }
    parts.join("\\").to_lowercase()
}

/// `VID_xxxx`/`PID_xxxx` pair embedded in an instance id.
pub fn usb_ids(instance_id: &str) -> Option<(i32, i32)> {
    let hex_after = |tag: &str| -> Option<i32> {
        let start = instance_id.find(tag)? + tag.len();
        let digits = instance_id.get(start..start + 4)?;
        i32::from_str_radix(digits, 16).ok()
    };
    Some((hex_after("vid_")?, hex_after("pid_")?))
}

/// Remote desktop virtual devices; never usable.
pub fn is_blacklisted(instance_id: &str) -> bool {
    instance_id.starts_with(r"root\rdp_kbd") || instance_id.starts_with(r"root\rdp_mou")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_drops_prefix_and_interface_guid() {
        let raw = r"\\?\HID#VID_046D&PID_C52B&MI_00#7&2a8a7b9c&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91e6bf6}";
        assert_eq!(instance_id(raw), r"hid\vid_046d&pid_c52b&mi_00\7&2a8a7b9c&0&0000");
    }

    #[test]
    fn usb_ids_are_hex() {
        assert_eq!(usb_ids(r"hid\vid_046d&pid_c52b&mi_00\7&0"), Some((0x046d, 0xc52b)));
        assert_eq!(usb_ids(r"acpi\pnp0303\4&1d401fb5&0"), None);
    }

    #[test]
    fn rdp_devices_are_blacklisted() {
        assert!(is_blacklisted(r"root\rdp_kbd\0000"));
        assert!(!is_blacklisted(r"hid\vid_046d&pid_c52b\7&0"));
    }

    #[test]
    fn wheel_is_signed_notches() {
        let packet = MousePacket {
            flags: 0,
            last_x: 0,
            last_y: 0,
            button_flags: RI_MOUSE_WHEEL,
            button_data: (-240i16) as u16,
        };
        assert_eq!(packet.wheel_notches(), -2.0);
    }

    #[test]
    fn down_wins_over_up() {
        let packet = MousePacket {
            flags: 0,
            last_x: 0,
            last_y: 0,
            button_flags: 0x0001 | 0x0008,
            button_data: 0,
        };
        assert_eq!(packet.button(MOUSE_BUTTON_1), Some(true));
        assert_eq!(packet.button(MOUSE_BUTTON_2), Some(false));
        assert_eq!(packet.button(MOUSE_BUTTON_3), None);
    }
}
