//! HID usage tables: (application collection, element usage) to input codes.

use crate::derive::{self, DEADZONE_LEFT_STICK, DEADZONE_RIGHT_STICK, DEADZONE_TRIGGER, STICK_MAX, TRIGGER_MAX};
use crate::input_code::InputCode;

pub const PAGE_GENERIC_DESKTOP: u32 = 0x01;
pub const PAGE_KEYBOARD: u32 = 0x07;
pub const PAGE_BUTTON: u32 = 0x09;

pub const GD_POINTER: u32 = 0x01;
pub const GD_MOUSE: u32 = 0x02;
pub const GD_JOYSTICK: u32 = 0x04;
pub const GD_GAMEPAD: u32 = 0x05;
pub const GD_KEYBOARD: u32 = 0x06;
pub const GD_KEYPAD: u32 = 0x07;
pub const GD_MULTI_AXIS: u32 = 0x08;

const GD_X: u32 = 0x30;
const GD_Y: u32 = 0x31;
const GD_Z: u32 = 0x32;
const GD_RX: u32 = 0x33;
const GD_RY: u32 = 0x34;
const GD_RZ: u32 = 0x35;
const GD_WHEEL: u32 = 0x38;
const GD_HAT: u32 = 0x39;

/// What kind of device an application collection describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Mouse,
    Keyboard,
    Gamepad,
}

impl Collection {
    pub fn from_usage(page: u32, usage: u32) -> Option<Self> {
        if page != PAGE_GENERIC_DESKTOP {
            return None;
        }
        match usage {
            GD_POINTER | GD_MOUSE => Some(Self::Mouse),
            GD_KEYBOARD | GD_KEYPAD => Some(Self::Keyboard),
            GD_JOYSTICK | GD_GAMEPAD | GD_MULTI_AXIS => Some(Self::Gamepad),
            _ => None,
        }
    }
}

/// Where an element's values go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Axis(InputCode),
    /// 8-way hat switch, fanned out to the four d-pad buttons.
    Hat,
}

impl Target {
    /// Codes to register for this element, derived companions included.
    pub fn codes(self) -> Vec<InputCode> {
        match self {
            Target::Hat => vec![
                InputCode::PadDpadUp,
                InputCode::PadDpadDown,
                InputCode::PadDpadLeft,
                InputCode::PadDpadRight,
                InputCode::PadDpadX,
                InputCode::PadDpadY,
            ],
            Target::Axis(code) => {
                let mut codes = vec![code];
                codes.extend_from_slice(companions(code));
                codes
            }
        }
    }
}

fn companions(code: InputCode) -> &'static [InputCode] {
    match code {
        InputCode::MouseX => &[InputCode::MouseXLeft, InputCode::MouseXRight],
        InputCode::MouseY => &[InputCode::MouseYUp, InputCode::MouseYDown],
        InputCode::MouseWheel => &[InputCode::MouseWheelUp, InputCode::MouseWheelDown],
        InputCode::PadLeftStickX => &[InputCode::PadLeftStickLeft, InputCode::PadLeftStickRight],
        InputCode::PadLeftStickY => &[InputCode::PadLeftStickUp, InputCode::PadLeftStickDown],
        InputCode::PadRightStickX => &[InputCode::PadRightStickLeft, InputCode::PadRightStickRight],
        InputCode::PadRightStickY => &[InputCode::PadRightStickUp, InputCode::PadRightStickDown],
        InputCode::PadDpadUp | InputCode::PadDpadDown => &[InputCode::PadDpadY],
        InputCode::PadDpadLeft | InputCode::PadDpadRight => &[InputCode::PadDpadX],
        _ => &[],
    }
}

pub fn map_element(collection: Collection, page: u32, usage: u32) -> Option<Target> {
    let code = match collection {
        Collection::Mouse => mouse_code(page, usage),
        Collection::Keyboard if page == PAGE_KEYBOARD => keyboard_code(usage),
        Collection::Keyboard => InputCode::None,
        Collection::Gamepad => {
            if page == PAGE_GENERIC_DESKTOP && usage == GD_HAT {
                return Some(Target::Hat);
            }
            gamepad_code(page, usage)
        }
    };
    code.is_mapped().then_some(Target::Axis(code))
}

fn offset(first: InputCode, delta: u32) -> InputCode {
    InputCode::from_raw(first.raw() + delta as i32).unwrap_or(InputCode::None)
}

fn mouse_code(page: u32, usage: u32) -> InputCode {
    match (page, usage) {
        (PAGE_GENERIC_DESKTOP, GD_X) => InputCode::MouseX,
        (PAGE_GENERIC_DESKTOP, GD_Y) => InputCode::MouseY,
        (PAGE_GENERIC_DESKTOP, GD_WHEEL) => InputCode::MouseWheel,
        // Buttons 1-7 follow the left/right/middle/... code order.
        (PAGE_BUTTON, 1..=7) => offset(InputCode::MouseLeft, usage - 1),
        _ => InputCode::None,
    }
}

fn gamepad_code(page: u32, usage: u32) -> InputCode {
    match (page, usage) {
        (PAGE_GENERIC_DESKTOP, GD_X) => InputCode::PadLeftStickX,
        (PAGE_GENERIC_DESKTOP, GD_Y) => InputCode::PadLeftStickY,
        (PAGE_GENERIC_DESKTOP, GD_Z) => InputCode::PadLeftTrigger,
        (PAGE_GENERIC_DESKTOP, GD_RX) => InputCode::PadRightStickX,
        (PAGE_GENERIC_DESKTOP, GD_RY) => InputCode::PadRightStickY,
        (PAGE_GENERIC_DESKTOP, GD_RZ) => InputCode::PadRightTrigger,
        (PAGE_BUTTON, 1) => InputCode::PadA,
        (PAGE_BUTTON, 2) => InputCode::PadB,
        (PAGE_BUTTON, 3) => InputCode::PadX,
        (PAGE_BUTTON, 4) => InputCode::PadY,
        (PAGE_BUTTON, 5) => InputCode::PadLeftBumper,
        (PAGE_BUTTON, 6) => InputCode::PadRightBumper,
        (PAGE_BUTTON, 7) => InputCode::PadLeftStick,
        (PAGE_BUTTON, 8) => InputCode::PadRightStick,
        (PAGE_BUTTON, 9) => InputCode::PadStart,
        (PAGE_BUTTON, 10) => InputCode::PadBack,
        (PAGE_BUTTON, 12) => InputCode::PadDpadUp,
        (PAGE_BUTTON, 13) => InputCode::PadDpadDown,
        (PAGE_BUTTON, 14) => InputCode::PadDpadLeft,
        (PAGE_BUTTON, 15) => InputCode::PadDpadRight,
        _ => InputCode::None,
    }
}

pub fn keyboard_code(usage: u32) -> InputCode {
    match usage {
        0x04..=0x1D => offset(InputCode::KeyA, usage - 0x04),
        0x1E..=0x26 => offset(InputCode::Key1, usage - 0x1E),
        0x27 => InputCode::Key0,
        0x28 => InputCode::KeyEnter,
        0x29 => InputCode::KeyEscape,
        0x2A => InputCode::KeyBackspace,
        0x2B => InputCode::KeyTab,
        0x2C => InputCode::KeySpace,
        0x2D => InputCode::KeyMinus,
        0x2E => InputCode::KeyPlus,
        0x2F => InputCode::KeyLeftBracket,
        0x30 => InputCode::KeyRightBracket,
        // Backslash and the non-US hash key share a position.
        0x31 | 0x32 => InputCode::KeyBackslash,
        0x33 => InputCode::KeySemicolon,
        0x34 => InputCode::KeyQuote,
        0x35 => InputCode::KeyAccent,
        0x36 => InputCode::KeyComma,
        0x37 => InputCode::KeyPeriod,
        0x38 => InputCode::KeySlash,
        0x39 | 0x82 => InputCode::KeyCapsLock,
        0x3A..=0x45 => offset(InputCode::KeyF1, usage - 0x3A),
        0x46 => InputCode::KeyPrintScreen,
        0x47 | 0x84 => InputCode::KeyScrollLock,
        0x48 => InputCode::KeyPause,
        0x49 => InputCode::KeyInsert,
        0x4A => InputCode::KeyHome,
        0x4B => InputCode::KeyPageUp,
        0x4C => InputCode::KeyDelete,
        0x4D => InputCode::KeyEnd,
        0x4E => InputCode::KeyPageDown,
        0x4F => InputCode::KeyRightArrow,
        0x50 => InputCode::KeyLeftArrow,
        0x51 => InputCode::KeyDownArrow,
        0x52 => InputCode::KeyUpArrow,
        0x53 | 0x83 => InputCode::KeyNumLock,
        0x54 => InputCode::KeyNumDivide,
        0x55 => InputCode::KeyNumMultiply,
        0x56 => InputCode::KeyNumMinus,
        0x57 => InputCode::KeyNumPlus,
        0x58 => InputCode::KeyNumEnter,
        0x59..=0x61 => offset(InputCode::KeyNum1, usage - 0x59),
        0x62 => InputCode::KeyNum0,
        0x63 => InputCode::KeyNumDecimal,
        0x64 => InputCode::KeyOem102,
        0x65 => InputCode::KeyApps,
        0x67 | 0x86 => InputCode::KeyPlus,
        0x68..=0x73 => offset(InputCode::KeyF13, usage - 0x68),
        0x85 => InputCode::KeyComma,
        0x87 => InputCode::KeySlash,
        0x9C => InputCode::KeyClear,
        0xE0 => InputCode::KeyLeftControl,
        0xE1 => InputCode::KeyLeftShift,
        0xE2 => InputCode::KeyLeftAlt,
        0xE3 => InputCode::KeyLeftCommand,
        0xE4 => InputCode::KeyRightControl,
        0xE5 => InputCode::KeyRightShift,
        0xE6 => InputCode::KeyRightAlt,
        0xE7 => InputCode::KeyRightCommand,
        _ => InputCode::None,
    }
}

/// Normalize a raw element value given its logical range.
///
/// Sticks are re-centred onto the 16-bit convention before the deadzone applies, and
/// their Y is flipped to up-positive. Triggers use the 8-bit convention. Everything
/// else (buttons, relative mouse motion) passes through.
pub fn map_value(code: InputCode, raw: i64, logical_min: i64, logical_max: i64) -> f32 {
    let span = (logical_max - logical_min) as f32;
    match code {
        InputCode::PadLeftStickX | InputCode::PadLeftStickY | InputCode::PadRightStickX | InputCode::PadRightStickY
            if span > 0.0 =>
        {
            let centred = (raw - logical_min) as f32 / span * 2.0 - 1.0;
            let mut native = centred * STICK_MAX;
            if matches!(code, InputCode::PadLeftStickY | InputCode::PadRightStickY) {
                native = -native;
            }
            let deadzone = if matches!(code, InputCode::PadLeftStickX | InputCode::PadLeftStickY) {
                DEADZONE_LEFT_STICK
            } else {
                DEADZONE_RIGHT_STICK
            };
            derive::scale_signed(native, -STICK_MAX, STICK_MAX, deadzone)
        }
        InputCode::PadLeftTrigger | InputCode::PadRightTrigger if span > 0.0 => {
            let native = (raw - logical_min) as f32 / span * TRIGGER_MAX;
            derive::apply_deadzone(native, TRIGGER_MAX, DEADZONE_TRIGGER)
        }
        _ => raw as f32,
    }
}

/// D-pad button states `(up, down, left, right)` for a hat reading.
///
/// Positions run clockwise from north in eighths; anything outside `0..8` is centred.
pub fn hat_directions(raw: i64, logical_min: i64) -> (bool, bool, bool, bool) {
    match raw - logical_min {
        0 => (true, false, false, false),
        1 => (true, false, false, true),
        2 => (false, false, false, true),
        3 => (false, true, false, true),
        4 => (false, true, false, false),
        5 => (false, true, true, false),
        6 => (false, false, true, false),
        7 => (true, false, true, false),
        _ => (false, false, false, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_from_generic_desktop() {
        assert_eq!(Collection::from_usage(PAGE_GENERIC_DESKTOP, GD_MOUSE), Some(Collection::Mouse));
        assert_eq!(Collection::from_usage(PAGE_GENERIC_DESKTOP, GD_MULTI_AXIS), Some(Collection::Gamepad));
        assert_eq!(Collection::from_usage(0x0C, 0x01), None);
    }

    #[test]
    fn keyboard_runs() {
        assert_eq!(keyboard_code(0x04), InputCode::KeyA);
        assert_eq!(keyboard_code(0x1D), InputCode::KeyZ);
        assert_eq!(keyboard_code(0x1E), InputCode::Key1);
        assert_eq!(keyboard_code(0x27), InputCode::Key0);
        assert_eq!(keyboard_code(0x45), InputCode::KeyF12);
        assert_eq!(keyboard_code(0x73), InputCode::KeyF24);
        assert_eq!(keyboard_code(0x62), InputCode::KeyNum0);
        assert_eq!(keyboard_code(0x61), InputCode::KeyNum9);
        assert_eq!(keyboard_code(0x01), InputCode::None);
    }

    #[test]
    fn buttons_depend_on_collection() {
        assert_eq!(
            map_element(Collection::Mouse, PAGE_BUTTON, 2),
            Some(Target::Axis(InputCode::MouseRight))
        );
        assert_eq!(map_element(Collection::Gamepad, PAGE_BUTTON, 2), Some(Target::Axis(InputCode::PadB)));
        assert_eq!(map_element(Collection::Gamepad, PAGE_BUTTON, 11), None);
        assert_eq!(map_element(Collection::Gamepad, PAGE_GENERIC_DESKTOP, GD_HAT), Some(Target::Hat));
    }

    #[test]
    fn stick_companions_registered() {
        let codes = Target::Axis(InputCode::PadLeftStickY).codes();
        assert!(codes.contains(&InputCode::PadLeftStickUp));
        assert!(codes.contains(&InputCode::PadLeftStickDown));
    }

    #[test]
    fn unsigned_stick_range_is_recentred() {
        assert_eq!(map_value(InputCode::PadLeftStickX, 0, 0, 65535), -1.0);
        assert_eq!(map_value(InputCode::PadLeftStickX, 65535, 0, 65535), 1.0);
        assert_eq!(map_value(InputCode::PadLeftStickX, 32768, 0, 65535), 0.0);
        assert_eq!(map_value(InputCode::PadLeftStickY, 0, 0, 65535), 1.0);
    }

    #[test]
    fn triggers_and_passthrough() {
        assert_eq!(map_value(InputCode::PadRightTrigger, 255, 0, 255), 1.0);
        assert_eq!(map_value(InputCode::PadRightTrigger, 20, 0, 255), 0.0);
        assert_eq!(map_value(InputCode::MouseX, -7, -127, 127), -7.0);
    }

    #[test]
    fn hat_positions() {
        assert_eq!(hat_directions(0, 0), (true, false, false, false));
        assert_eq!(hat_directions(3, 0), (false, true, false, true));
        assert_eq!(hat_directions(8, 0), (false, false, false, false));
        assert_eq!(hat_directions(8, 1), (true, false, true, false));
    }
}
