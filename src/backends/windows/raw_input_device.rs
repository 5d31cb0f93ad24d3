use super::raw_input::{
    KeyboardPacket, MousePacket, PacketKind, MOUSE_BUTTON_1, MOUSE_BUTTON_2, MOUSE_BUTTON_3, MOUSE_BUTTON_4,
    MOUSE_BUTTON_5,
};
use crate::derive;
use crate::device::{Device, DeviceCore, DeviceId};
use crate::input_code::{InputCategory, InputCode};
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use std::any::Any;
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::*;
use windows_sys::Win32::UI::Input::{RIM_TYPEKEYBOARD, RIM_TYPEMOUSE, RID_DEVICE_INFO};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXSCREEN, SM_CXVIRTUALSCREEN, SM_CYSCREEN, SM_CYVIRTUALSCREEN,
};

const MOTION_EPSILON: f32 = 0.00001;

/// Resolve the virtual keys Raw Input reports ambiguously.
///
/// Left/right modifiers come out generic, and with num lock off the keypad reports
/// navigation keys; the E0 prefix tells the two blocks apart.
pub fn fixup_vkey(make_code: u16, vkey: u16, is_e0: bool) -> u16 {
    let pick = |extended: VIRTUAL_KEY, keypad: VIRTUAL_KEY| if is_e0 { extended } else { keypad };
    match vkey {
        0xFF => 0,
        VK_SHIFT => unsafe { MapVirtualKeyW(u32::from(make_code), MAPVK_VSC_TO_VK_EX) as u16 },
        VK_CONTROL => pick(VK_RCONTROL, VK_LCONTROL),
        VK_MENU => pick(VK_RMENU, VK_LMENU),
        VK_RETURN => pick(VK_SEPARATOR, VK_RETURN),
        VK_DELETE => pick(VK_DELETE, VK_DECIMAL),
        VK_INSERT => pick(VK_INSERT, VK_NUMPAD0),
        VK_END => pick(VK_END, VK_NUMPAD1),
        VK_DOWN => pick(VK_DOWN, VK_NUMPAD2),
        VK_NEXT => pick(VK_NEXT, VK_NUMPAD3),
        VK_LEFT => pick(VK_LEFT, VK_NUMPAD4),
        VK_CLEAR => pick(VK_CLEAR, VK_NUMPAD5),
        VK_RIGHT => pick(VK_RIGHT, VK_NUMPAD6),
        VK_HOME => pick(VK_HOME, VK_NUMPAD7),
        VK_UP => pick(VK_UP, VK_NUMPAD8),
        VK_PRIOR => pick(VK_PRIOR, VK_NUMPAD9),
        other => other,
    }
}

fn offset(first: InputCode, delta: u16) -> InputCode {
    InputCode::from_raw(first.raw() + i32::from(delta)).unwrap_or(InputCode::None)
}

pub fn map_vkey(vkey: u16) -> InputCode {
    match vkey {
        0x30..=0x39 => offset(InputCode::Key0, vkey - 0x30),
        0x41..=0x5A => offset(InputCode::KeyA, vkey - 0x41),
        VK_NUMPAD0..=VK_NUMPAD9 => offset(InputCode::KeyNum0, vkey - VK_NUMPAD0),
        VK_F1..=VK_F24 => offset(InputCode::KeyF1, vkey - VK_F1),

        VK_BACK => InputCode::KeyBackspace,
        VK_TAB => InputCode::KeyTab,
        VK_CLEAR => InputCode::KeyClear,
        VK_RETURN => InputCode::KeyEnter,
        VK_PAUSE => InputCode::KeyPause,
        VK_CAPITAL => InputCode::KeyCapsLock,
        VK_ESCAPE => InputCode::KeyEscape,
        VK_SPACE => InputCode::KeySpace,
        VK_PRIOR => InputCode::KeyPageUp,
        VK_NEXT => InputCode::KeyPageDown,
        VK_END => InputCode::KeyEnd,
        VK_HOME => InputCode::KeyHome,
        VK_LEFT => InputCode::KeyLeftArrow,
        VK_UP => InputCode::KeyUpArrow,
        VK_RIGHT => InputCode::KeyRightArrow,
        VK_DOWN => InputCode::KeyDownArrow,
        VK_SNAPSHOT => InputCode::KeyPrintScreen,
        VK_INSERT => InputCode::KeyInsert,
        VK_DELETE => InputCode::KeyDelete,

        VK_MULTIPLY => InputCode::KeyNumMultiply,
        VK_ADD => InputCode::KeyNumPlus,
        VK_SEPARATOR => InputCode::KeyNumEnter,
        VK_SUBTRACT => InputCode::KeyNumMinus,
        VK_DECIMAL => InputCode::KeyNumDecimal,
        VK_DIVIDE => InputCode::KeyNumDivide,

        VK_NUMLOCK => InputCode::KeyNumLock,
        VK_SCROLL => InputCode::KeyScrollLock,
        VK_LSHIFT => InputCode::KeyLeftShift,
        VK_RSHIFT => InputCode::KeyRightShift,
        VK_LCONTROL => InputCode::KeyLeftControl,
        VK_RCONTROL => InputCode::KeyRightControl,
        VK_LMENU => InputCode::KeyLeftAlt,
        VK_RMENU => InputCode::KeyRightAlt,
        VK_LWIN => InputCode::KeyLeftCommand,
        VK_RWIN => InputCode::KeyRightCommand,
        VK_APPS => InputCode::KeyApps,

        VK_OEM_PLUS => InputCode::KeyPlus,
        VK_OEM_COMMA => InputCode::KeyComma,
        VK_OEM_MINUS => InputCode::KeyMinus,
        VK_OEM_PERIOD => InputCode::KeyPeriod,
        VK_OEM_1 => InputCode::KeySemicolon,
        VK_OEM_2 => InputCode::KeySlash,
        VK_OEM_3 => InputCode::KeyAccent,
        VK_OEM_4 => InputCode::KeyLeftBracket,
        VK_OEM_5 => InputCode::KeyBackslash,
        VK_OEM_6 => InputCode::KeyRightBracket,
        VK_OEM_7 => InputCode::KeyQuote,
        VK_OEM_8 => InputCode::KeyOem8,
        VK_OEM_102 => InputCode::KeyOem102,

        _ => InputCode::None,
    }
}

/// Screen extent that absolute mouse coordinates (`0..=65535`) are normalized to.
fn absolute_extent(virtual_desktop: bool) -> (f32, f32) {
    let (cx, cy) = if virtual_desktop {
        (SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN)
    } else {
        (SM_CXSCREEN, SM_CYSCREEN)
    };
    unsafe { (GetSystemMetrics(cx) as f32, GetSystemMetrics(cy) as f32) }
}

/// A Raw Input keyboard or mouse.
pub struct RawInputDevice {
    core: DeviceCore,
    handle: HANDLE,
    /// Last absolute pointer position, in pixels. Tablets and remote sessions report
    /// absolute coordinates; motion is the difference to this.
    last_absolute: Option<(f32, f32)>,
}

impl RawInputDevice {
    pub fn new(id: DeviceId, handle: HANDLE, info: &RID_DEVICE_INFO, meta: DeviceMeta, hooks: &Hooks) -> Self {
        let mut device = Self {
            core: DeviceCore::new(id, meta, hooks),
            handle,
            last_absolute: None,
        };

        match info.dwType {
            RIM_TYPEKEYBOARD => {
                for code in InputCode::of_category(InputCategory::Keyboard) {
                    device.core.add_axis(code);
                }
            }
            RIM_TYPEMOUSE => {
                // SAFETY: `dwType` says the mouse variant is the live one.
                let buttons = unsafe { info.Anonymous.mouse.dwNumberOfButtons };
                device.add_mouse_axes(buttons);
            }
            // The source only hands over keyboards and mice.
            _ => {}
        }

        device
    }

    pub fn handle(&self) -> HANDLE {
        self.handle
    }

    fn add_mouse_axes(&mut self, buttons: u32) {
        for code in derive::MOUSE_MOTION_CODES {
            self.core.add_axis(code);
        }
        self.core.add_axis(InputCode::MouseLeft);
        self.core.add_axis(InputCode::MouseRight);
        for (min_buttons, code) in [
            (3, InputCode::MouseMiddle),
            (4, InputCode::MouseFourth),
            (5, InputCode::MouseFifth),
        ] {
            if buttons >= min_buttons {
                self.core.add_axis(code);
            }
        }
    }

    pub fn update(&mut self, kind: &PacketKind) {
        match kind {
            PacketKind::Keyboard(keyboard) => self.update_keyboard(keyboard),
            PacketKind::Mouse(mouse) => self.update_mouse(mouse),
            PacketKind::Hid => log_at!(self.core.hooks(), Debug, "ri: parsed WM_INPUT as raw HID report, ignoring"),
        }
    }

    fn update_keyboard(&mut self, packet: &KeyboardPacket) {
        let vkey = fixup_vkey(packet.make_code, packet.vkey, packet.is_e0);
        if vkey == 0 {
            return;
        }
        let code = map_vkey(vkey);
        if !code.is_mapped() {
            return;
        }
        self.core.set(code, if packet.is_break { 0.0 } else { 1.0 });
    }

    fn update_mouse(&mut self, packet: &MousePacket) {
        let motion = if packet.is_absolute() {
            let (width, height) = absolute_extent(packet.is_virtual_desktop());
            let position = (
                packet.last_x as f32 / 65535.0 * width,
                packet.last_y as f32 / 65535.0 * height,
            );
            self.last_absolute
                .replace(position)
                .map(|(last_x, last_y)| (position.0 - last_x, position.1 - last_y))
        } else {
            Some((packet.last_x as f32, packet.last_y as f32))
        };

        self.add_motion(InputCode::MouseWheel, packet.wheel_notches());
        if let Some((dx, dy)) = motion {
            self.add_motion(InputCode::MouseX, dx);
            self.add_motion(InputCode::MouseY, dy);
        }

        for (flags, code) in [
            (MOUSE_BUTTON_1, InputCode::MouseLeft),
            (MOUSE_BUTTON_2, InputCode::MouseRight),
            (MOUSE_BUTTON_3, InputCode::MouseMiddle),
            (MOUSE_BUTTON_4, InputCode::MouseFourth),
            (MOUSE_BUTTON_5, InputCode::MouseFifth),
        ] {
            if let Some(pressed) = packet.button(flags) {
                log_at!(self.core.hooks(), Verbose, "ri: mouse: button {} new state = {}", code, pressed);
                self.core.set(code, if pressed { 1.0 } else { 0.0 });
            }
        }
    }

    fn add_motion(&mut self, code: InputCode, value: f32) {
        if value.abs() < MOTION_EPSILON {
            return;
        }
        log_at!(self.core.hooks(), Verbose, "ri: mouse: axis {} += {}", code, value);
        self.core.add(code, value);
    }
}

impl Device for RawInputDevice {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn commit(&mut self) {
        derive::mouse_pre_commit(&mut self.core);
        self.core.commit_axes();
        derive::mouse_post_commit(&mut self.core);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_without_e0_maps_to_numbers() {
        assert_eq!(map_vkey(fixup_vkey(0x47, VK_HOME, false)), InputCode::KeyNum7);
        assert_eq!(map_vkey(fixup_vkey(0x47, VK_HOME, true)), InputCode::KeyHome);
        assert_eq!(map_vkey(fixup_vkey(0x1C, VK_RETURN, true)), InputCode::KeyNumEnter);
        assert_eq!(map_vkey(fixup_vkey(0x53, VK_DELETE, false)), InputCode::KeyNumDecimal);
    }

    #[test]
    fn generic_modifiers_pick_a_side() {
        assert_eq!(map_vkey(fixup_vkey(0x1D, VK_CONTROL, false)), InputCode::KeyLeftControl);
        assert_eq!(map_vkey(fixup_vkey(0x38, VK_MENU, true)), InputCode::KeyRightAlt);
        assert_eq!(fixup_vkey(0, 0xFF, false), 0);
    }

    #[test]
    fn contiguous_runs() {
        assert_eq!(map_vkey(u16::from(b'0')), InputCode::Key0);
        assert_eq!(map_vkey(u16::from(b'Z')), InputCode::KeyZ);
        assert_eq!(map_vkey(VK_NUMPAD9), InputCode::KeyNum9);
        assert_eq!(map_vkey(VK_F24), InputCode::KeyF24);
        assert_eq!(map_vkey(VK_OEM_102), InputCode::KeyOem102);
        assert_eq!(map_vkey(0x07), InputCode::None);
    }
}
