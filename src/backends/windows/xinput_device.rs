//! XInput gamepad slot.
//!
//! XInput has exactly four slots and no hotplug notifications, so a slot is a device
//! for the lifetime of the context; connection state shows up as usability.

use crate::derive::{self, DEADZONE_LEFT_STICK, DEADZONE_RIGHT_STICK, DEADZONE_TRIGGER, STICK_MAX, TRIGGER_MAX};
use crate::device::{Device, DeviceCore, DeviceId};
use crate::error::{Error, Result};
use crate::input_code::{InputCategory, InputCode};
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use std::any::Any;
use std::time::{Duration, Instant};
use windows_sys::Win32::Foundation::{ERROR_DEVICE_NOT_CONNECTED, ERROR_SUCCESS};
use windows_sys::Win32::UI::Input::XboxController::*;

pub const SLOT_COUNT: u32 = 4;

const BUTTON_MAP: [(u16, InputCode); 14] = [
    (XINPUT_GAMEPAD_DPAD_UP, InputCode::PadDpadUp),
    (XINPUT_GAMEPAD_DPAD_DOWN, InputCode::PadDpadDown),
    (XINPUT_GAMEPAD_DPAD_LEFT, InputCode::PadDpadLeft),
    (XINPUT_GAMEPAD_DPAD_RIGHT, InputCode::PadDpadRight),
    (XINPUT_GAMEPAD_START, InputCode::PadStart),
    (XINPUT_GAMEPAD_BACK, InputCode::PadBack),
    (XINPUT_GAMEPAD_LEFT_THUMB, InputCode::PadLeftStick),
    (XINPUT_GAMEPAD_RIGHT_THUMB, InputCode::PadRightStick),
    (XINPUT_GAMEPAD_LEFT_SHOULDER, InputCode::PadLeftBumper),
    (XINPUT_GAMEPAD_RIGHT_SHOULDER, InputCode::PadRightBumper),
    (XINPUT_GAMEPAD_A, InputCode::PadA),
    (XINPUT_GAMEPAD_B, InputCode::PadB),
    (XINPUT_GAMEPAD_X, InputCode::PadX),
    (XINPUT_GAMEPAD_Y, InputCode::PadY),
];

fn stick(raw: i16, deadzone: f32) -> f32 {
    derive::scale_signed(f32::from(raw), -STICK_MAX, STICK_MAX, deadzone)
}

fn trigger(raw: u8) -> f32 {
    derive::apply_deadzone(f32::from(raw), TRIGGER_MAX, DEADZONE_TRIGGER)
}

fn motor_speed(strength: f32) -> u16 {
    (strength * 65535.0) as u16
}

pub struct XInputDevice {
    core: DeviceCore,
    slot: u32,
    state: XINPUT_STATE,
    rumble_until: Option<Instant>,
}

impl XInputDevice {
    pub fn new(id: DeviceId, slot: u32, hooks: &Hooks) -> Self {
        let internal_id = format!("xinput:{slot}");
        let meta = DeviceMeta::new(format!("XInput Gamepad {}", slot + 1))
            .with_location(internal_id.as_str())
            .with_internal_id(internal_id);

        let mut core = DeviceCore::new(id, meta, hooks);
        for code in InputCode::of_category(InputCategory::Gamepad) {
            core.add_axis(code);
        }

        Self {
            core,
            slot,
            // SAFETY: XINPUT_STATE is plain data; all-zero is a valid "no packet yet".
            state: unsafe { std::mem::zeroed() },
            rumble_until: None,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Poll the slot and stage whatever changed since the last packet.
    pub fn update(&mut self) -> Result<()> {
        let previous_packet = self.state.dwPacketNumber;
        // SAFETY: `state` is a valid out-pointer for the call.
        let connected = unsafe { XInputGetState(self.slot, &mut self.state) } == ERROR_SUCCESS;
        self.set_usable(connected);

        if self.rumble_until.is_some_and(|until| Instant::now() >= until) {
            log_at!(self.core.hooks(), Debug, "xinput: last rumble expired, disabling motors");
            self.rumble_until = None;
            self.set_motors(0.0, 0.0)?;
        }

        if !connected || self.state.dwPacketNumber == previous_packet {
            return Ok(());
        }
        log_at!(
            self.core.hooks(),
            Verbose,
            "xinput: controller {} packet {}",
            self.slot,
            self.state.dwPacketNumber
        );

        let pad = self.state.Gamepad;
        self.core.set(InputCode::PadLeftStickX, stick(pad.sThumbLX, DEADZONE_LEFT_STICK));
        self.core.set(InputCode::PadLeftStickY, stick(pad.sThumbLY, DEADZONE_LEFT_STICK));
        self.core.set(InputCode::PadRightStickX, stick(pad.sThumbRX, DEADZONE_RIGHT_STICK));
        self.core.set(InputCode::PadRightStickY, stick(pad.sThumbRY, DEADZONE_RIGHT_STICK));
        self.core.set(InputCode::PadLeftTrigger, trigger(pad.bLeftTrigger));
        self.core.set(InputCode::PadRightTrigger, trigger(pad.bRightTrigger));

        for (mask, code) in BUTTON_MAP {
            let pressed = pad.wButtons & mask != 0;
            self.core.set(code, if pressed { 1.0 } else { 0.0 });
        }
        Ok(())
    }

    /// `Ok(false)` when the pad turned out to be disconnected.
    fn set_motors(&mut self, left: f32, right: f32) -> Result<bool> {
        let vibration = XINPUT_VIBRATION {
            wLeftMotorSpeed: motor_speed(left),
            wRightMotorSpeed: motor_speed(right),
        };
        // SAFETY: `vibration` outlives the call.
        match unsafe { XInputSetState(self.slot, &vibration) } {
            ERROR_SUCCESS => Ok(true),
            ERROR_DEVICE_NOT_CONNECTED => {
                self.set_usable(false);
                Ok(false)
            }
            code => Err(Error::backend(
                "xinput",
                format!("failed to send vibration command to gamepad {} (error {code})", self.slot),
            )),
        }
    }
}

impl Device for XInputDevice {
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

    fn can_vibrate(&self) -> bool {
        self.core.is_usable()
    }

    fn vibrate(&mut self, duration_ms: u16, left: f32, right: f32) -> Result<bool> {
        if !self.core.is_usable() {
            return Ok(false);
        }
        log_at!(
            self.core.hooks(),
            Debug,
            "xinput: vibrating gamepad {} with force {}/{} for {}ms",
            self.slot,
            left,
            right,
            duration_ms
        );
        let playing = self.set_motors(left, right)?;
        self.rumble_until = playing.then(|| Instant::now() + Duration::from_millis(u64::from(duration_ms)));
        Ok(playing)
    }

    fn commit(&mut self) {
        derive::stick_pre_commit(&mut self.core);
        self.core.commit_axes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticks_clamp_both_ends() {
        assert_eq!(stick(i16::MAX, DEADZONE_LEFT_STICK), 1.0);
        assert_eq!(stick(i16::MIN, DEADZONE_LEFT_STICK), -1.0);
        assert_eq!(stick(5000, DEADZONE_LEFT_STICK), 0.0);
    }

    #[test]
    fn triggers_respect_deadzone() {
        assert_eq!(trigger(30), 0.0);
        assert_eq!(trigger(255), 1.0);
    }

    #[test]
    fn motor_speed_scales_to_u16() {
        assert_eq!(motor_speed(0.0), 0);
        assert_eq!(motor_speed(1.0), 65535);
    }
}
