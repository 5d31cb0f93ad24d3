//! Axis derivation around the commit boundary.
//!
//! Devices expose raw channels (a signed stick axis, a pair of d-pad buttons, a relative
//! mouse delta) and a set of synthetic channels computed from them. The functions here
//! read staged (`next`) values and write staged values, so the derived axes commit in
//! the same tick as their sources.
//!
//! | pass | when | does |
//! |---|---|---|
//! | [`mouse_pre_commit`] | before base commit | invert Y, split X/Y/wheel into directional pairs |
//! | [`mouse_post_commit`] | after base commit | re-zero staged X/Y/wheel deltas |
//! | [`stick_pre_commit`] | before base commit | split both sticks, build d-pad X/Y from buttons |

use crate::device::DeviceCore;
use crate::input_code::InputCode;

/// Native deadzone of the left stick (XInput convention, in native units).
pub const DEADZONE_LEFT_STICK: f32 = 7849.0;
/// Native deadzone of the right stick.
pub const DEADZONE_RIGHT_STICK: f32 = 8689.0;
/// Native deadzone of an 8-bit trigger.
pub const DEADZONE_TRIGGER: f32 = 30.0;

/// Full-scale value of a 16-bit stick.
pub const STICK_MAX: f32 = 32767.0;
/// Full-scale value of an 8-bit trigger.
pub const TRIGGER_MAX: f32 = 255.0;

/// Rescale `value` from `(deadzone, abs_max]` onto `(0, 1]`.
///
/// Values at or below the deadzone give `0`, values above `abs_max` are clamped.
/// Only meaningful for non-negative input; callers handle the sign.
pub fn apply_deadzone(value: f32, abs_max: f32, deadzone: f32) -> f32 {
    if value <= deadzone {
        return 0.0;
    }
    let value = value.min(abs_max);
    (value - deadzone) / (abs_max - deadzone)
}

/// Map a signed native reading onto `[-1, 1]` with a deadzone.
///
/// Negative readings scale against `-min`, positive ones against `max`, so asymmetric
/// native ranges (`-32768..=32767`) reach full scale on both sides.
pub fn scale_signed(value: f32, min: f32, max: f32, deadzone: f32) -> f32 {
    if value < 0.0 {
        -apply_deadzone(-value, -min, deadzone)
    } else {
        apply_deadzone(value, max, deadzone)
    }
}

/// Split a signed source axis into a negative/positive pair.
///
/// Does nothing unless all three axes are registered.
pub fn derive_axis(core: &mut DeviceCore, source: InputCode, negative: InputCode, positive: InputCode) {
    if !(core.has_axis(source) && core.has_axis(negative) && core.has_axis(positive)) {
        return;
    }
    let value = core.next_value(source);
    if value > 0.0 {
        core.set(positive, value);
        core.set(negative, 0.0);
    } else {
        core.set(positive, 0.0);
        core.set(negative, -value);
    }
}

/// Build a bipolar axis from two buttons. The negative button wins a conflict.
pub fn derive_button_axis(core: &mut DeviceCore, negative: InputCode, positive: InputCode, target: InputCode) {
    if !(core.has_axis(negative) && core.has_axis(positive) && core.has_axis(target)) {
        return;
    }
    let neg = core.next_value(negative);
    let value = if neg != 0.0 { -neg } else { core.next_value(positive) };
    core.set(target, value);
}

pub fn mouse_pre_commit(core: &mut DeviceCore) {
    let y = core.next_value(InputCode::MouseY);
    core.set(InputCode::MouseY, -y);

    derive_axis(core, InputCode::MouseX, InputCode::MouseXLeft, InputCode::MouseXRight);
    derive_axis(core, InputCode::MouseY, InputCode::MouseYDown, InputCode::MouseYUp);
    derive_axis(core, InputCode::MouseWheel, InputCode::MouseWheelDown, InputCode::MouseWheelUp);
}

/// Relative axes do not self-zero; clear what was staged so an idle tick reads 0.
pub fn mouse_post_commit(core: &mut DeviceCore) {
    core.set(InputCode::MouseX, 0.0);
    core.set(InputCode::MouseY, 0.0);
    core.set(InputCode::MouseWheel, 0.0);
}

pub fn stick_pre_commit(core: &mut DeviceCore) {
    derive_axis(
        core,
        InputCode::PadLeftStickX,
        InputCode::PadLeftStickLeft,
        InputCode::PadLeftStickRight,
    );
    derive_axis(
        core,
        InputCode::PadLeftStickY,
        InputCode::PadLeftStickDown,
        InputCode::PadLeftStickUp,
    );
    derive_axis(
        core,
        InputCode::PadRightStickX,
        InputCode::PadRightStickLeft,
        InputCode::PadRightStickRight,
    );
    derive_axis(
        core,
        InputCode::PadRightStickY,
        InputCode::PadRightStickDown,
        InputCode::PadRightStickUp,
    );
    derive_button_axis(core, InputCode::PadDpadLeft, InputCode::PadDpadRight, InputCode::PadDpadX);
    derive_button_axis(core, InputCode::PadDpadDown, InputCode::PadDpadUp, InputCode::PadDpadY);
}

/// Codes a relative mouse needs for [`mouse_pre_commit`] to have somewhere to write.
pub const MOUSE_MOTION_CODES: [InputCode; 9] = [
    InputCode::MouseX,
    InputCode::MouseY,
    InputCode::MouseWheel,
    InputCode::MouseXLeft,
    InputCode::MouseXRight,
    InputCode::MouseYUp,
    InputCode::MouseYDown,
    InputCode::MouseWheelUp,
    InputCode::MouseWheelDown,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Hooks;
    use crate::metadata::DeviceMeta;
    use crate::options::Options;

    fn core_with(codes: &[InputCode]) -> DeviceCore {
        let mut core = DeviceCore::new(1, DeviceMeta::new("test"), &Hooks::new(Options::new()));
        for &code in codes {
            core.add_axis(code);
        }
        core
    }

    #[test]
    fn deadzone_edges() {
        assert_eq!(apply_deadzone(0.0, 100.0, 10.0), 0.0);
        assert_eq!(apply_deadzone(10.0, 100.0, 10.0), 0.0);
        assert_eq!(apply_deadzone(100.0, 100.0, 10.0), 1.0);
        assert_eq!(apply_deadzone(250.0, 100.0, 10.0), 1.0);
        assert!((apply_deadzone(55.0, 100.0, 10.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn signed_scaling_uses_each_side_range() {
        assert_eq!(scale_signed(-32768.0, -32768.0, 32767.0, DEADZONE_LEFT_STICK), -1.0);
        assert_eq!(scale_signed(32767.0, -32768.0, 32767.0, DEADZONE_LEFT_STICK), 1.0);
        assert_eq!(scale_signed(-5000.0, -32768.0, 32767.0, DEADZONE_LEFT_STICK), 0.0);
    }

    #[test]
    fn derive_axis_routes_by_sign() {
        let codes = [InputCode::PadLeftStickX, InputCode::PadLeftStickLeft, InputCode::PadLeftStickRight];
        let mut core = core_with(&codes);

        core.set(InputCode::PadLeftStickX, 0.75);
        derive_axis(&mut core, codes[0], codes[1], codes[2]);
        assert_eq!(core.next_value(InputCode::PadLeftStickRight), 0.75);
        assert_eq!(core.next_value(InputCode::PadLeftStickLeft), 0.0);

        core.set(InputCode::PadLeftStickX, -0.5);
        derive_axis(&mut core, codes[0], codes[1], codes[2]);
        assert_eq!(core.next_value(InputCode::PadLeftStickRight), 0.0);
        assert_eq!(core.next_value(InputCode::PadLeftStickLeft), 0.5);

        core.set(InputCode::PadLeftStickX, 0.0);
        derive_axis(&mut core, codes[0], codes[1], codes[2]);
        assert_eq!(core.next_value(InputCode::PadLeftStickRight), 0.0);
        assert_eq!(core.next_value(InputCode::PadLeftStickLeft), 0.0);
    }

    #[test]
    fn negative_button_wins() {
        let codes = [InputCode::PadDpadLeft, InputCode::PadDpadRight, InputCode::PadDpadX];
        let mut core = core_with(&codes);

        core.set(InputCode::PadDpadRight, 1.0);
        derive_button_axis(&mut core, codes[0], codes[1], codes[2]);
        assert_eq!(core.next_value(InputCode::PadDpadX), 1.0);

        core.set(InputCode::PadDpadLeft, 1.0);
        derive_button_axis(&mut core, codes[0], codes[1], codes[2]);
        assert_eq!(core.next_value(InputCode::PadDpadX), -1.0);
    }

    #[test]
    fn mouse_passes_invert_y_and_clear_deltas() {
        let mut core = core_with(&MOUSE_MOTION_CODES);
        core.add(InputCode::MouseX, -3.0);
        core.add(InputCode::MouseY, 4.0);
        core.add(InputCode::MouseWheel, 1.0);

        mouse_pre_commit(&mut core);
        core.commit_axes();
        mouse_post_commit(&mut core);

        let current = |code| core.axis(code).unwrap().get();
        assert_eq!(current(InputCode::MouseX), -3.0);
        assert_eq!(current(InputCode::MouseY), -4.0);
        assert_eq!(current(InputCode::MouseXLeft), 3.0);
        assert_eq!(current(InputCode::MouseYDown), 4.0);
        assert_eq!(current(InputCode::MouseYUp), 0.0);
        assert_eq!(current(InputCode::MouseWheelUp), 1.0);

        assert_eq!(core.next_value(InputCode::MouseX), 0.0);
        assert_eq!(core.next_value(InputCode::MouseY), 0.0);
        assert_eq!(core.next_value(InputCode::MouseWheel), 0.0);
    }

    #[test]
    fn stick_pass_skips_incomplete_triples() {
        let mut core = core_with(&[InputCode::PadLeftStickX, InputCode::PadLeftStickRight]);
        core.set(InputCode::PadLeftStickX, 1.0);
        stick_pre_commit(&mut core);
        assert_eq!(core.next_value(InputCode::PadLeftStickRight), 0.0);
        assert_eq!(core.axis_count(), 2);
    }

    #[test]
    fn button_axis_needs_both_buttons_and_target() {
        let mut core = core_with(&[InputCode::PadDpadRight, InputCode::PadDpadX]);
        core.set(InputCode::PadDpadRight, 1.0);
        derive_button_axis(&mut core, InputCode::PadDpadLeft, InputCode::PadDpadRight, InputCode::PadDpadX);
        assert_eq!(core.next_value(InputCode::PadDpadX), 0.0);
        assert_eq!(core.axis_count(), 2);
    }
}
