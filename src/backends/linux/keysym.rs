//! X keysyms to input codes.

use crate::input_code::InputCode;

const XK_SPACE: u32 = 0x0020;
const XK_APOSTROPHE: u32 = 0x0027;
const XK_COMMA: u32 = 0x002c;
const XK_MINUS: u32 = 0x002d;
const XK_PERIOD: u32 = 0x002e;
const XK_SLASH: u32 = 0x002f;
const XK_0: u32 = 0x0030;
const XK_9: u32 = 0x0039;
const XK_SEMICOLON: u32 = 0x003b;
const XK_EQUAL: u32 = 0x003d;
const XK_BRACKETLEFT: u32 = 0x005b;
const XK_BACKSLASH: u32 = 0x005c;
const XK_BRACKETRIGHT: u32 = 0x005d;
const XK_GRAVE: u32 = 0x0060;
const XK_A: u32 = 0x0061;
const XK_Z: u32 = 0x007a;

const XK_ISO_LEVEL3_SHIFT: u32 = 0xfe03;
const XK_BACKSPACE: u32 = 0xff08;
const XK_TAB: u32 = 0xff09;
const XK_LINEFEED: u32 = 0xff0a;
const XK_CLEAR: u32 = 0xff0b;
const XK_RETURN: u32 = 0xff0d;
const XK_PAUSE: u32 = 0xff13;
const XK_SCROLL_LOCK: u32 = 0xff14;
const XK_ESCAPE: u32 = 0xff1b;
const XK_HOME: u32 = 0xff50;
const XK_LEFT: u32 = 0xff51;
const XK_UP: u32 = 0xff52;
const XK_RIGHT: u32 = 0xff53;
const XK_DOWN: u32 = 0xff54;
const XK_PAGE_UP: u32 = 0xff55;
const XK_PAGE_DOWN: u32 = 0xff56;
const XK_END: u32 = 0xff57;
const XK_BEGIN: u32 = 0xff58;
const XK_PRINT: u32 = 0xff61;
const XK_INSERT: u32 = 0xff63;
const XK_MENU: u32 = 0xff67;
const XK_NUM_LOCK: u32 = 0xff7f;
const XK_KP_SPACE: u32 = 0xff80;
const XK_KP_TAB: u32 = 0xff89;
const XK_KP_ENTER: u32 = 0xff8d;
const XK_KP_HOME: u32 = 0xff95;
const XK_KP_LEFT: u32 = 0xff96;
const XK_KP_UP: u32 = 0xff97;
const XK_KP_RIGHT: u32 = 0xff98;
const XK_KP_DOWN: u32 = 0xff99;
const XK_KP_PAGE_UP: u32 = 0xff9a;
const XK_KP_PAGE_DOWN: u32 = 0xff9b;
const XK_KP_END: u32 = 0xff9c;
const XK_KP_BEGIN: u32 = 0xff9d;
const XK_KP_INSERT: u32 = 0xff9e;
const XK_KP_DELETE: u32 = 0xff9f;
const XK_KP_MULTIPLY: u32 = 0xffaa;
const XK_KP_ADD: u32 = 0xffab;
const XK_KP_SEPARATOR: u32 = 0xffac;
const XK_KP_SUBTRACT: u32 = 0xffad;
const XK_KP_DECIMAL: u32 = 0xffae;
const XK_KP_DIVIDE: u32 = 0xffaf;
const XK_KP_0: u32 = 0xffb0;
const XK_KP_9: u32 = 0xffb9;
const XK_F1: u32 = 0xffbe;
const XK_F24: u32 = 0xffd5;
const XK_SHIFT_L: u32 = 0xffe1;
const XK_SHIFT_R: u32 = 0xffe2;
const XK_CONTROL_L: u32 = 0xffe3;
const XK_CONTROL_R: u32 = 0xffe4;
const XK_CAPS_LOCK: u32 = 0xffe5;
const XK_ALT_L: u32 = 0xffe9;
const XK_ALT_R: u32 = 0xffea;
const XK_SUPER_L: u32 = 0xffeb;
const XK_SUPER_R: u32 = 0xffec;
const XK_DELETE: u32 = 0xffff;

/// Offset into a contiguous run of codes.
fn run(first: InputCode, offset: u32) -> InputCode {
    InputCode::from_raw(first.raw() + offset as i32).unwrap_or_default()
}

pub fn map_keysym(keysym: u32) -> InputCode {
    match keysym {
        XK_0..=XK_9 => run(InputCode::Key0, keysym - XK_0),
        XK_A..=XK_Z => run(InputCode::KeyA, keysym - XK_A),
        XK_KP_0..=XK_KP_9 => run(InputCode::KeyNum0, keysym - XK_KP_0),
        XK_F1..=XK_F24 => run(InputCode::KeyF1, keysym - XK_F1),

        XK_BACKSPACE => InputCode::KeyBackspace,
        XK_TAB | XK_KP_TAB => InputCode::KeyTab,
        XK_LINEFEED | XK_RETURN => InputCode::KeyEnter,
        XK_CLEAR => InputCode::KeyClear,
        XK_PAUSE => InputCode::KeyPause,
        XK_SCROLL_LOCK => InputCode::KeyScrollLock,
        XK_ESCAPE => InputCode::KeyEscape,
        XK_DELETE => InputCode::KeyDelete,
        XK_HOME | XK_BEGIN => InputCode::KeyHome,
        XK_LEFT => InputCode::KeyLeftArrow,
        XK_UP => InputCode::KeyUpArrow,
        XK_RIGHT => InputCode::KeyRightArrow,
        XK_DOWN => InputCode::KeyDownArrow,
        XK_PAGE_UP => InputCode::KeyPageUp,
        XK_PAGE_DOWN => InputCode::KeyPageDown,
        XK_END => InputCode::KeyEnd,
        XK_PRINT => InputCode::KeyPrintScreen,
        XK_INSERT => InputCode::KeyInsert,
        XK_MENU => InputCode::KeyApps,
        XK_NUM_LOCK => InputCode::KeyNumLock,

        XK_KP_SPACE | XK_SPACE => InputCode::KeySpace,
        XK_KP_ENTER => InputCode::KeyNumEnter,
        XK_KP_HOME => InputCode::KeyNum7,
        XK_KP_LEFT => InputCode::KeyNum4,
        XK_KP_UP => InputCode::KeyNum8,
        XK_KP_RIGHT => InputCode::KeyNum6,
        XK_KP_DOWN => InputCode::KeyNum2,
        XK_KP_PAGE_UP => InputCode::KeyNum9,
        XK_KP_PAGE_DOWN => InputCode::KeyNum3,
        XK_KP_END => InputCode::KeyNum1,
        XK_KP_BEGIN => InputCode::KeyNum5,
        XK_KP_INSERT => InputCode::KeyNum0,
        XK_KP_DELETE | XK_KP_SEPARATOR | XK_KP_DECIMAL => InputCode::KeyNumDecimal,
        XK_KP_MULTIPLY => InputCode::KeyNumMultiply,
        XK_KP_ADD => InputCode::KeyNumPlus,
        XK_KP_SUBTRACT => InputCode::KeyNumMinus,
        XK_KP_DIVIDE => InputCode::KeyNumDivide,

        XK_SHIFT_L => InputCode::KeyLeftShift,
        XK_SHIFT_R => InputCode::KeyRightShift,
        XK_CONTROL_L => InputCode::KeyLeftControl,
        XK_CONTROL_R => InputCode::KeyRightControl,
        XK_CAPS_LOCK => InputCode::KeyCapsLock,
        XK_ALT_L => InputCode::KeyLeftAlt,
        XK_ALT_R | XK_ISO_LEVEL3_SHIFT => InputCode::KeyRightAlt,
        XK_SUPER_L => InputCode::KeyLeftCommand,
        XK_SUPER_R => InputCode::KeyRightCommand,

        XK_APOSTROPHE => InputCode::KeyQuote,
        XK_COMMA => InputCode::KeyComma,
        XK_MINUS => InputCode::KeyMinus,
        XK_PERIOD => InputCode::KeyPeriod,
        XK_SLASH => InputCode::KeySlash,
        XK_SEMICOLON => InputCode::KeySemicolon,
        XK_EQUAL => InputCode::KeyPlus,
        XK_BRACKETLEFT => InputCode::KeyLeftBracket,
        XK_BACKSLASH => InputCode::KeyBackslash,
        XK_BRACKETRIGHT => InputCode::KeyRightBracket,
        XK_GRAVE => InputCode::KeyAccent,

        _ => InputCode::None,
    }
}

/// Core keyboard mapping: keycode to keysym, first column only.
#[derive(Debug, Default, Clone)]
pub struct Keymap {
    min_keycode: u32,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl Keymap {
    pub fn new(min_keycode: u8, per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self {
            min_keycode: u32::from(min_keycode),
            per_keycode: usize::from(per_keycode),
            keysyms,
        }
    }

    pub fn keysym(&self, keycode: u32) -> u32 {
        if self.per_keycode == 0 || keycode < self.min_keycode {
            return 0;
        }
        let index = (keycode - self.min_keycode) as usize * self.per_keycode;
        self.keysyms.get(index).copied().unwrap_or(0)
    }

    pub fn map(&self, keycode: u32) -> InputCode {
        map_keysym(self.keysym(keycode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_runs() {
        assert_eq!(map_keysym(0x30), InputCode::Key0);
        assert_eq!(map_keysym(0x39), InputCode::Key9);
        assert_eq!(map_keysym(0x61), InputCode::KeyA);
        assert_eq!(map_keysym(0x7a), InputCode::KeyZ);
        assert_eq!(map_keysym(0xffb5), InputCode::KeyNum5);
        assert_eq!(map_keysym(0xffbe), InputCode::KeyF1);
        assert_eq!(map_keysym(0xffd5), InputCode::KeyF24);
    }

    #[test]
    fn keypad_navigation_maps_to_digits() {
        assert_eq!(map_keysym(XK_KP_HOME), InputCode::KeyNum7);
        assert_eq!(map_keysym(XK_KP_INSERT), InputCode::KeyNum0);
        assert_eq!(map_keysym(XK_KP_DELETE), InputCode::KeyNumDecimal);
    }

    #[test]
    fn unknown_keysyms_are_unmapped() {
        assert_eq!(map_keysym(0x41), InputCode::None);
        assert_eq!(map_keysym(0), InputCode::None);
    }

    #[test]
    fn keymap_reads_first_column() {
        // keycodes 8 and 9, two keysyms each
        let keymap = Keymap::new(8, 2, vec![0xff1b, 0, 0x61, 0x41]);
        assert_eq!(keymap.map(8), InputCode::KeyEscape);
        assert_eq!(keymap.map(9), InputCode::KeyA);
        assert_eq!(keymap.map(10), InputCode::None);
        assert_eq!(keymap.map(3), InputCode::None);
    }
}
