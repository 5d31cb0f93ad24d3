//! Canonical input codes.
//!
//! Every backend maps its native usages (evdev codes, X keysyms, Windows virtual keys,
//! HID usages) onto this one closed set. The numeric values are stable and cross the
//! C boundary as `int32_t`, so they must never be renumbered.
//!
//! Codes are grouped by hundreds of thousands purely to make raw values readable in logs:
//! - `100000..` keyboard
//! - `200000..` mouse
//! - `300000..` gamepad
//!
//! [`InputCode::None`] is the "unmapped" sentinel. A device never owns an axis for it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! input_codes {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// Platform-independent identifier of a logical input.
        #[repr(i32)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub enum InputCode {
            #[default]
            None = 0,
            $($variant = $value,)*
        }

        impl InputCode {
            /// Every real code (excludes [`InputCode::None`]), in numeric order.
            pub const ALL: &'static [InputCode] = &[$(InputCode::$variant,)*];

            /// The snake_case name used in logs, configs and the C headers.
            pub const fn as_str(self) -> &'static str {
                match self {
                    InputCode::None => "none",
                    $(InputCode::$variant => $name,)*
                }
            }

            /// Resolve a raw value received across the C boundary.
            pub fn from_raw(raw: i32) -> Option<Self> {
                match raw {
                    0 => Some(InputCode::None),
                    $($value => Some(InputCode::$variant),)*
                    _ => None,
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    "none" => Some(InputCode::None),
                    $($name => Some(InputCode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

input_codes! {
    Key0 = 100000 => "key_0",
    Key1 = 100001 => "key_1",
    Key2 = 100002 => "key_2",
    Key3 = 100003 => "key_3",
    Key4 = 100004 => "key_4",
    Key5 = 100005 => "key_5",
    Key6 = 100006 => "key_6",
    Key7 = 100007 => "key_7",
    Key8 = 100008 => "key_8",
    Key9 = 100009 => "key_9",
    KeyA = 100010 => "key_a",
    KeyB = 100011 => "key_b",
    KeyC = 100012 => "key_c",
    KeyD = 100013 => "key_d",
    KeyE = 100014 => "key_e",
    KeyF = 100015 => "key_f",
    KeyG = 100016 => "key_g",
    KeyH = 100017 => "key_h",
    KeyI = 100018 => "key_i",
    KeyJ = 100019 => "key_j",
    KeyK = 100020 => "key_k",
    KeyL = 100021 => "key_l",
    KeyM = 100022 => "key_m",
    KeyN = 100023 => "key_n",
    KeyO = 100024 => "key_o",
    KeyP = 100025 => "key_p",
    KeyQ = 100026 => "key_q",
    KeyR = 100027 => "key_r",
    KeyS = 100028 => "key_s",
    KeyT = 100029 => "key_t",
    KeyU = 100030 => "key_u",
    KeyV = 100031 => "key_v",
    KeyW = 100032 => "key_w",
    KeyX = 100033 => "key_x",
    KeyY = 100034 => "key_y",
    KeyZ = 100035 => "key_z",
    KeySemicolon = 100036 => "key_semicolon",
    KeySlash = 100037 => "key_slash",
    KeyAccent = 100038 => "key_accent",
    KeyLeftBracket = 100039 => "key_left_bracket",
    KeyBackslash = 100040 => "key_backslash",
    KeyRightBracket = 100041 => "key_right_bracket",
    KeyQuote = 100042 => "key_quote",
    KeyOem8 = 100043 => "key_oem_8",
    KeyOem102 = 100044 => "key_oem_102",
    KeyBackspace = 100045 => "key_backspace",
    KeyTab = 100046 => "key_tab",
    KeyClear = 100047 => "key_clear",
    KeyEnter = 100048 => "key_enter",
    KeyEscape = 100049 => "key_escape",
    KeySpace = 100050 => "key_space",
    KeyPlus = 100051 => "key_plus",
    KeyComma = 100052 => "key_comma",
    KeyMinus = 100053 => "key_minus",
    KeyPeriod = 100054 => "key_period",
    KeyNum0 = 100055 => "key_num_0",
    KeyNum1 = 100056 => "key_num_1",
    KeyNum2 = 100057 => "key_num_2",
    KeyNum3 = 100058 => "key_num_3",
    KeyNum4 = 100059 => "key_num_4",
    KeyNum5 = 100060 => "key_num_5",
    KeyNum6 = 100061 => "key_num_6",
    KeyNum7 = 100062 => "key_num_7",
    KeyNum8 = 100063 => "key_num_8",
    KeyNum9 = 100064 => "key_num_9",
    KeyNumDecimal = 100065 => "key_num_decimal",
    KeyNumDivide = 100066 => "key_num_divide",
    KeyNumMultiply = 100067 => "key_num_multiply",
    KeyNumMinus = 100068 => "key_num_minus",
    KeyNumPlus = 100069 => "key_num_plus",
    KeyNumEnter = 100070 => "key_num_enter",
    KeyUpArrow = 100071 => "key_up_arrow",
    KeyDownArrow = 100072 => "key_down_arrow",
    KeyRightArrow = 100073 => "key_right_arrow",
    KeyLeftArrow = 100074 => "key_left_arrow",
    KeyInsert = 100075 => "key_insert",
    KeyDelete = 100076 => "key_delete",
    KeyHome = 100077 => "key_home",
    KeyEnd = 100078 => "key_end",
    KeyPageUp = 100079 => "key_page_up",
    KeyPageDown = 100080 => "key_page_down",
    KeyF1 = 100081 => "key_f1",
    KeyF2 = 100082 => "key_f2",
    KeyF3 = 100083 => "key_f3",
    KeyF4 = 100084 => "key_f4",
    KeyF5 = 100085 => "key_f5",
    KeyF6 = 100086 => "key_f6",
    KeyF7 = 100087 => "key_f7",
    KeyF8 = 100088 => "key_f8",
    KeyF9 = 100089 => "key_f9",
    KeyF10 = 100090 => "key_f10",
    KeyF11 = 100091 => "key_f11",
    KeyF12 = 100092 => "key_f12",
    KeyF13 = 100093 => "key_f13",
    KeyF14 = 100094 => "key_f14",
    KeyF15 = 100095 => "key_f15",
    KeyF16 = 100096 => "key_f16",
    KeyF17 = 100097 => "key_f17",
    KeyF18 = 100098 => "key_f18",
    KeyF19 = 100099 => "key_f19",
    KeyF20 = 100100 => "key_f20",
    KeyF21 = 100101 => "key_f21",
    KeyF22 = 100102 => "key_f22",
    KeyF23 = 100103 => "key_f23",
    KeyF24 = 100104 => "key_f24",
    KeyRightShift = 100105 => "key_right_shift",
    KeyLeftShift = 100106 => "key_left_shift",
    KeyRightAlt = 100107 => "key_right_alt",
    KeyLeftAlt = 100108 => "key_left_alt",
    KeyRightControl = 100109 => "key_right_control",
    KeyLeftControl = 100110 => "key_left_control",
    KeyRightCommand = 100111 => "key_right_command",
    KeyLeftCommand = 100112 => "key_left_command",
    KeyApps = 100113 => "key_apps",
    KeyPrintScreen = 100114 => "key_print_screen",
    KeyPause = 100115 => "key_pause",
    KeyCapsLock = 100116 => "key_caps_lock",
    KeyNumLock = 100117 => "key_num_lock",
    KeyScrollLock = 100118 => "key_scroll_lock",
    MouseLeft = 200000 => "mouse_left",
    MouseRight = 200001 => "mouse_right",
    MouseMiddle = 200002 => "mouse_middle",
    MouseFourth = 200003 => "mouse_fourth",
    MouseFifth = 200004 => "mouse_fifth",
    MouseSixth = 200005 => "mouse_sixth",
    MouseSeventh = 200006 => "mouse_seventh",
    MouseXLeft = 200007 => "mouse_x_left",
    MouseXRight = 200008 => "mouse_x_right",
    MouseYUp = 200009 => "mouse_y_up",
    MouseYDown = 200010 => "mouse_y_down",
    MouseWheelUp = 200011 => "mouse_wheel_up",
    MouseWheelDown = 200012 => "mouse_wheel_down",
    MouseX = 200013 => "mouse_x",
    MouseY = 200014 => "mouse_y",
    MouseWheel = 200015 => "mouse_wheel",
    PadLeftStickUp = 300000 => "pad_left_stick_up",
    PadLeftStickDown = 300001 => "pad_left_stick_down",
    PadLeftStickLeft = 300002 => "pad_left_stick_left",
    PadLeftStickRight = 300003 => "pad_left_stick_right",
    PadLeftStick = 300004 => "pad_left_stick",
    PadLeftStickX = 300005 => "pad_left_stick_x",
    PadLeftStickY = 300006 => "pad_left_stick_y",
    PadRightStickUp = 300007 => "pad_right_stick_up",
    PadRightStickDown = 300008 => "pad_right_stick_down",
    PadRightStickLeft = 300009 => "pad_right_stick_left",
    PadRightStickRight = 300010 => "pad_right_stick_right",
    PadRightStick = 300011 => "pad_right_stick",
    PadRightStickX = 300012 => "pad_right_stick_x",
    PadRightStickY = 300013 => "pad_right_stick_y",
    PadDpadUp = 300014 => "pad_dpad_up",
    PadDpadDown = 300015 => "pad_dpad_down",
    PadDpadLeft = 300016 => "pad_dpad_left",
    PadDpadRight = 300017 => "pad_dpad_right",
    PadDpadX = 300018 => "pad_dpad_x",
    PadDpadY = 300019 => "pad_dpad_y",
    PadA = 300020 => "pad_a",
    PadB = 300021 => "pad_b",
    PadX = 300022 => "pad_x",
    PadY = 300023 => "pad_y",
    PadLeftTrigger = 300024 => "pad_left_trigger",
    PadRightTrigger = 300025 => "pad_right_trigger",
    PadLeftBumper = 300026 => "pad_left_bumper",
    PadRightBumper = 300027 => "pad_right_bumper",
    PadBack = 300028 => "pad_back",
    PadStart = 300029 => "pad_start",
}

/// Coarse grouping of codes, derived from the numeric range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputCategory {
    None,
    Keyboard,
    Mouse,
    Gamepad,
}

impl InputCode {
    /// Raw value as sent across the C boundary.
    #[inline]
    pub const fn raw(self) -> i32 {
        self as i32
    }

    pub fn category(self) -> InputCategory {
        match self.raw() / 100_000 {
            1 => InputCategory::Keyboard,
            2 => InputCategory::Mouse,
            3 => InputCategory::Gamepad,
            _ => InputCategory::None,
        }
    }

    /// `true` for everything except the [`InputCode::None`] sentinel.
    #[inline]
    pub fn is_mapped(self) -> bool {
        self != InputCode::None
    }

    /// All codes of one category.
    pub fn of_category(category: InputCategory) -> impl Iterator<Item = InputCode> {
        Self::ALL
            .iter()
            .copied()
            .filter(move |code| code.category() == category)
    }
}

impl fmt::Display for InputCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`InputCode::from_str`] for names outside the table.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown input code `{0}`")]
pub struct UnknownInputCode(pub String);

impl FromStr for InputCode {
    type Err = UnknownInputCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownInputCode(s.to_string()))
    }
}

impl Serialize for InputCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InputCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous_per_category() {
        let keys: Vec<i32> = InputCode::of_category(InputCategory::Keyboard)
            .map(InputCode::raw)
            .collect();
        assert_eq!(keys.first(), Some(&100_000));
        assert_eq!(keys.last(), Some(&100_118));
        assert_eq!(keys.len(), 119);

        assert_eq!(InputCode::of_category(InputCategory::Mouse).count(), 16);
        assert_eq!(InputCode::of_category(InputCategory::Gamepad).count(), 30);
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for &code in InputCode::ALL {
            assert_eq!(code.as_str().parse::<InputCode>(), Ok(code));
            assert_eq!(InputCode::from_raw(code.raw()), Some(code));
        }
        assert_eq!("none".parse::<InputCode>(), Ok(InputCode::None));
    }

    #[test]
    fn well_known_values() {
        assert_eq!(InputCode::KeyF24.raw(), 100_104);
        assert_eq!(InputCode::MouseWheel.raw(), 200_015);
        assert_eq!(InputCode::PadStart.raw(), 300_029);
        assert_eq!(InputCode::PadDpadX.to_string(), "pad_dpad_x");
        assert_eq!(InputCode::from_raw(12), None);
        assert!("key_num_10".parse::<InputCode>().is_err());
    }
}
