use minput::derive::{self, DEADZONE_LEFT_STICK, DEADZONE_TRIGGER, STICK_MAX, TRIGGER_MAX};
use minput::{DeviceCore, DeviceMeta, Hooks, InputCode, Options};
use proptest::prelude::*;

fn core_with(codes: &[InputCode]) -> DeviceCore {
    let mut core = DeviceCore::new(1, DeviceMeta::new("test"), &Hooks::new(Options::new()));
    for &code in codes {
        core.add_axis(code);
    }
    core
}

proptest! {
    #[test]
    fn deadzone_output_stays_in_unit_range(value in -1e6f32..1e6, deadzone in 0f32..200.0) {
        let out = derive::apply_deadzone(value, TRIGGER_MAX, deadzone.min(TRIGGER_MAX - 1.0));
        prop_assert!((0.0..=1.0).contains(&out));
    }

    #[test]
    fn deadzone_is_monotonic(a in 0f32..255.0, b in 0f32..255.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            derive::apply_deadzone(lo, TRIGGER_MAX, DEADZONE_TRIGGER)
                <= derive::apply_deadzone(hi, TRIGGER_MAX, DEADZONE_TRIGGER)
        );
    }

    #[test]
    fn signed_scaling_keeps_the_sign(raw in -32768i32..=32767) {
        let out = derive::scale_signed(raw as f32, -STICK_MAX - 1.0, STICK_MAX, DEADZONE_LEFT_STICK);
        prop_assert!((-1.0..=1.0).contains(&out));
        if (raw as f32).abs() <= DEADZONE_LEFT_STICK {
            prop_assert_eq!(out, 0.0);
        } else {
            prop_assert_eq!(out.signum(), (raw as f32).signum());
        }
    }

    #[test]
    fn split_axis_halves_are_exclusive(value in -1f32..=1.0) {
        let mut core = core_with(&[InputCode::PadLeftStickX, InputCode::PadLeftStickLeft, InputCode::PadLeftStickRight]);
        core.set(InputCode::PadLeftStickX, value);
        derive::derive_axis(&mut core, InputCode::PadLeftStickX, InputCode::PadLeftStickLeft, InputCode::PadLeftStickRight);

        let left = core.next_value(InputCode::PadLeftStickLeft);
        let right = core.next_value(InputCode::PadLeftStickRight);
        prop_assert!(left >= 0.0 && right >= 0.0);
        prop_assert!(left == 0.0 || right == 0.0);
        prop_assert_eq!(right - left, value);
    }
}

#[test]
fn deadzone_edges() {
    assert_eq!(derive::apply_deadzone(DEADZONE_TRIGGER, TRIGGER_MAX, DEADZONE_TRIGGER), 0.0);
    assert_eq!(derive::apply_deadzone(TRIGGER_MAX, TRIGGER_MAX, DEADZONE_TRIGGER), 1.0);
    assert_eq!(derive::apply_deadzone(1000.0, TRIGGER_MAX, DEADZONE_TRIGGER), 1.0);
}

#[test]
fn negative_button_wins_the_dpad() {
    let mut core = core_with(&[InputCode::PadDpadLeft, InputCode::PadDpadRight, InputCode::PadDpadX]);
    core.set(InputCode::PadDpadLeft, 1.0);
    core.set(InputCode::PadDpadRight, 1.0);
    derive::derive_button_axis(&mut core, InputCode::PadDpadLeft, InputCode::PadDpadRight, InputCode::PadDpadX);
    assert_eq!(core.next_value(InputCode::PadDpadX), -1.0);
}

#[test]
fn mouse_pass_inverts_y_and_clears_deltas() {
    let mut core = core_with(&derive::MOUSE_MOTION_CODES);
    core.add(InputCode::MouseY, 4.0);
    core.add(InputCode::MouseWheel, -1.0);

    derive::mouse_pre_commit(&mut core);
    core.commit_axes();
    derive::mouse_post_commit(&mut core);

    let get = |code| core.axis(code).unwrap().get();
    assert_eq!(get(InputCode::MouseY), -4.0);
    assert_eq!(get(InputCode::MouseYDown), 4.0);
    assert_eq!(get(InputCode::MouseWheelDown), 1.0);
    assert_eq!(core.next_value(InputCode::MouseY), 0.0);
    assert_eq!(core.next_value(InputCode::MouseWheel), 0.0);
}
