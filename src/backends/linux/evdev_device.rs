use crate::derive::{self, DEADZONE_LEFT_STICK, DEADZONE_RIGHT_STICK, DEADZONE_TRIGGER};
use crate::device::{Device, DeviceCore, DeviceId};
use crate::error::{Error, Result};
use crate::input_code::InputCode;
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use evdev::{
    AbsoluteAxisCode, EventSummary, FFEffect, FFEffectCode, FFEffectData, FFEffectKind, FFReplay, FFTrigger, InputEvent,
    KeyCode,
};
use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Buttons counted by the garbage-packet guard.
const GUARD_BUTTONS: [InputCode; 14] = [
    InputCode::PadA,
    InputCode::PadB,
    InputCode::PadX,
    InputCode::PadY,
    InputCode::PadDpadLeft,
    InputCode::PadDpadRight,
    InputCode::PadDpadUp,
    InputCode::PadDpadDown,
    InputCode::PadLeftStick,
    InputCode::PadRightStick,
    InputCode::PadLeftBumper,
    InputCode::PadRightBumper,
    InputCode::PadBack,
    InputCode::PadStart,
];

/// Wireless pads emit a burst of bogus state when switched on; nobody holds this many.
const GUARD_THRESHOLD: usize = 6;

const STICK_AXES: [(AbsoluteAxisCode, InputCode, InputCode); 4] = [
    (AbsoluteAxisCode::ABS_X, InputCode::PadLeftStickLeft, InputCode::PadLeftStickRight),
    (AbsoluteAxisCode::ABS_Y, InputCode::PadLeftStickUp, InputCode::PadLeftStickDown),
    (AbsoluteAxisCode::ABS_RX, InputCode::PadRightStickLeft, InputCode::PadRightStickRight),
    (AbsoluteAxisCode::ABS_RY, InputCode::PadRightStickUp, InputCode::PadRightStickDown),
];

const BUTTONS: [KeyCode; 10] = [
    KeyCode::BTN_SOUTH,
    KeyCode::BTN_EAST,
    KeyCode::BTN_NORTH,
    KeyCode::BTN_WEST,
    KeyCode::BTN_THUMBL,
    KeyCode::BTN_THUMBR,
    KeyCode::BTN_TL,
    KeyCode::BTN_TR,
    KeyCode::BTN_SELECT,
    KeyCode::BTN_START,
];

pub fn map_button(code: KeyCode) -> InputCode {
    match code {
        KeyCode::BTN_SOUTH => InputCode::PadA,
        KeyCode::BTN_EAST => InputCode::PadB,
        KeyCode::BTN_NORTH => InputCode::PadX,
        KeyCode::BTN_WEST => InputCode::PadY,
        KeyCode::BTN_TRIGGER_HAPPY1 => InputCode::PadDpadLeft,
        KeyCode::BTN_TRIGGER_HAPPY2 => InputCode::PadDpadRight,
        KeyCode::BTN_TRIGGER_HAPPY3 => InputCode::PadDpadUp,
        KeyCode::BTN_TRIGGER_HAPPY4 => InputCode::PadDpadDown,
        KeyCode::BTN_THUMBL => InputCode::PadLeftStick,
        KeyCode::BTN_THUMBR => InputCode::PadRightStick,
        KeyCode::BTN_TL => InputCode::PadLeftBumper,
        KeyCode::BTN_TR => InputCode::PadRightBumper,
        KeyCode::BTN_SELECT => InputCode::PadBack,
        KeyCode::BTN_START => InputCode::PadStart,
        _ => InputCode::None,
    }
}

pub fn map_axis(code: AbsoluteAxisCode) -> InputCode {
    match code {
        AbsoluteAxisCode::ABS_X => InputCode::PadLeftStickX,
        AbsoluteAxisCode::ABS_Y => InputCode::PadLeftStickY,
        AbsoluteAxisCode::ABS_Z => InputCode::PadLeftTrigger,
        AbsoluteAxisCode::ABS_RX => InputCode::PadRightStickX,
        AbsoluteAxisCode::ABS_RY => InputCode::PadRightStickY,
        AbsoluteAxisCode::ABS_RZ => InputCode::PadRightTrigger,
        _ => InputCode::None,
    }
}

fn deadzone_for(code: AbsoluteAxisCode) -> f32 {
    match code {
        AbsoluteAxisCode::ABS_X | AbsoluteAxisCode::ABS_Y => DEADZONE_LEFT_STICK,
        AbsoluteAxisCode::ABS_RX | AbsoluteAxisCode::ABS_RY => DEADZONE_RIGHT_STICK,
        AbsoluteAxisCode::ABS_Z | AbsoluteAxisCode::ABS_RZ => DEADZONE_TRIGGER,
        _ => 0.0,
    }
}

/// Normalize a raw absolute reading. Y axes are flipped so "up" is positive.
pub fn map_value(code: AbsoluteAxisCode, raw: i32, minimum: i32, maximum: i32) -> f32 {
    let mut raw = raw as f32;
    if code == AbsoluteAxisCode::ABS_Y || code == AbsoluteAxisCode::ABS_RY {
        raw = -raw;
    }
    derive::scale_signed(raw, minimum as f32, maximum as f32, deadzone_for(code))
}

/// An opened `/dev/input/event*` gamepad.
pub struct EvdevDevice {
    core: DeviceCore,
    handle: evdev::Device,
    symbolic_name: String,
    ranges: HashMap<AbsoluteAxisCode, (i32, i32)>,
    has_rumble: bool,
    effect: Option<FFEffect>,
}

impl EvdevDevice {
    /// Open `path` non-blocking and register the axes it supports.
    pub fn open(id: DeviceId, path: &Path, symbolic_name: &str, serial: &str, hooks: &Hooks) -> io::Result<Self> {
        let handle = evdev::Device::open(path)?;
        handle.set_nonblocking(true)?;

        let input_id = handle.input_id();
        let meta = DeviceMeta::new(handle.name().unwrap_or_default())
            .with_location(handle.physical_path().unwrap_or_default())
            .with_internal_id(path.to_string_lossy())
            .with_ids(
                i32::from(input_id.vendor()),
                i32::from(input_id.product()),
                i32::from(input_id.version()),
            )
            .with_serial(serial);

        let mut ranges = HashMap::new();
        if let Ok(state) = handle.get_abs_state() {
            let supported = handle.supported_absolute_axes();
            for code in [
                AbsoluteAxisCode::ABS_X,
                AbsoluteAxisCode::ABS_Y,
                AbsoluteAxisCode::ABS_Z,
                AbsoluteAxisCode::ABS_RX,
                AbsoluteAxisCode::ABS_RY,
                AbsoluteAxisCode::ABS_RZ,
            ] {
                if supported.is_some_and(|axes| axes.contains(code)) {
                    if let Some(info) = state.get(code.0 as usize) {
                        ranges.insert(code, (info.minimum, info.maximum));
                    }
                }
            }
        }

        let has_rumble = handle
            .supported_ff()
            .is_some_and(|effects| effects.contains(FFEffectCode::FF_RUMBLE));

        let mut device = Self {
            core: DeviceCore::new(id, meta, hooks),
            handle,
            symbolic_name: symbolic_name.to_string(),
            ranges,
            has_rumble,
            effect: None,
        };
        device.register_axes();
        Ok(device)
    }

    fn register_axes(&mut self) {
        for (code, negative, positive) in STICK_AXES {
            if self.try_add_abs(code) {
                self.core.add_axis(negative);
                self.core.add_axis(positive);
            }
        }
        if self.try_add_key(KeyCode::BTN_TRIGGER_HAPPY1) & self.try_add_key(KeyCode::BTN_TRIGGER_HAPPY2) {
            self.core.add_axis(InputCode::PadDpadX);
        }
        if self.try_add_key(KeyCode::BTN_TRIGGER_HAPPY3) & self.try_add_key(KeyCode::BTN_TRIGGER_HAPPY4) {
            self.core.add_axis(InputCode::PadDpadY);
        }
        self.try_add_abs(AbsoluteAxisCode::ABS_Z);
        self.try_add_abs(AbsoluteAxisCode::ABS_RZ);
        for key in BUTTONS {
            self.try_add_key(key);
        }
    }

    fn try_add_abs(&mut self, code: AbsoluteAxisCode) -> bool {
        if !self.ranges.contains_key(&code) {
            log_at!(self.core.hooks(), Debug, "evdev: #{} doesn't support {:?}", self.core.id(), code);
            return false;
        }
        self.core.add_axis(map_axis(code));
        true
    }

    fn try_add_key(&mut self, code: KeyCode) -> bool {
        let supported = self.handle.supported_keys().is_some_and(|keys| keys.contains(code));
        if !supported {
            log_at!(self.core.hooks(), Debug, "evdev: #{} doesn't support {:?}", self.core.id(), code);
            return false;
        }
        self.core.add_axis(map_button(code));
        true
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    /// Read every queued event without blocking.
    pub fn pump(&mut self) -> Result<()> {
        loop {
            let fetched: io::Result<Vec<InputEvent>> = self.handle.fetch_events().map(|events| events.collect());
            let events = match fetched {
                Ok(events) => events,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                // Unplugged; the udev remove event drops it on a later drain.
                Err(err) if err.raw_os_error() == Some(libc::ENODEV) => {
                    self.set_usable(false);
                    return Ok(());
                }
                Err(err) => {
                    return Err(Error::backend(
                        "evdev",
                        format!("failed to read device {} ({}): {err}", self.core.id(), self.symbolic_name),
                    ))
                }
            };
            if events.is_empty() {
                return Ok(());
            }
            for event in events {
                self.update(event);
            }
        }
    }

    pub fn update(&mut self, event: InputEvent) {
        match event.destructure() {
            EventSummary::Key(_, code, value) => {
                self.stage(map_button(code), format_args!("{code:?}"), if value != 0 { 1.0 } else { 0.0 });
            }
            EventSummary::AbsoluteAxis(_, code, raw) => {
                let (minimum, maximum) = self.ranges.get(&code).copied().unwrap_or((0, 0));
                let value = map_value(code, raw, minimum, maximum);
                log_at!(self.core.hooks(), Verbose, "evdev: {:?} raw {} mapped {} device {}", code, raw, value, self.core.id());
                self.stage(map_axis(code), format_args!("{code:?}"), value);
            }
            _ => {}
        }
    }

    fn stage(&mut self, code: InputCode, native: std::fmt::Arguments<'_>, value: f32) {
        if !code.is_mapped() {
            return;
        }
        if !self.core.has_axis(code) {
            log_at!(
                self.core.hooks(),
                Warning,
                "evdev: possible bug: got {} (mapped {}) but it wasn't added during discovery",
                native,
                code
            );
            self.core.add_axis(code);
        }
        self.core.set(code, value);
    }

    /// Reset the device if the staged state looks like a power-on burst.
    pub fn post_update(&mut self) {
        if !self.core.is_usable() {
            return;
        }
        let held = GUARD_BUTTONS
            .iter()
            .filter(|&&code| self.core.next_value(code) != 0.0)
            .count();
        if held >= GUARD_THRESHOLD {
            log_at!(
                self.core.hooks(),
                Warning,
                "evdev: {} buttons pressed on device {}: probably garbage data, resetting",
                held,
                self.core.id()
            );
            self.core.reset();
        }
    }
}

impl Device for EvdevDevice {
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
        self.has_rumble
    }

    fn vibrate(&mut self, duration_ms: u16, left: f32, right: f32) -> Result<bool> {
        if !self.has_rumble || !self.core.is_usable() {
            return Ok(false);
        }
        log_at!(
            self.core.hooks(),
            Debug,
            "evdev: vibrating device {} with force {}/{} for {}ms",
            self.core.id(),
            left,
            right,
            duration_ms
        );

        // Dropping the handle erases the effect from device memory.
        self.effect = None;

        let data = FFEffectData {
            direction: 0,
            trigger: FFTrigger { button: 0, interval: 0 },
            replay: FFReplay {
                length: duration_ms,
                delay: 0,
            },
            kind: FFEffectKind::Rumble {
                strong_magnitude: (left * 16384.0) as u16,
                weak_magnitude: (right * 65535.0) as u16,
            },
        };
        let mut effect = self
            .handle
            .upload_ff_effect(data)
            .map_err(|err| Error::backend("evdev", format!("failed to upload FF effect to {}: {err}", self.symbolic_name)))?;
        effect
            .play(1)
            .map_err(|err| Error::backend("evdev", format!("failed to start FF effect on {}: {err}", self.symbolic_name)))?;
        self.effect = Some(effect);
        Ok(true)
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
    fn face_buttons_follow_position() {
        assert_eq!(map_button(KeyCode::BTN_SOUTH), InputCode::PadA);
        assert_eq!(map_button(KeyCode::BTN_NORTH), InputCode::PadX);
        assert_eq!(map_button(KeyCode::BTN_WEST), InputCode::PadY);
        assert_eq!(map_button(KeyCode::KEY_A), InputCode::None);
    }

    #[test]
    fn y_axes_are_flipped() {
        let up = map_value(AbsoluteAxisCode::ABS_Y, -32768, -32768, 32767);
        assert_eq!(up, 1.0);
        let right = map_value(AbsoluteAxisCode::ABS_X, 32767, -32768, 32767);
        assert_eq!(right, 1.0);
    }

    #[test]
    fn deadzone_applies_per_axis() {
        assert_eq!(map_value(AbsoluteAxisCode::ABS_X, 7000, -32768, 32767), 0.0);
        assert!(map_value(AbsoluteAxisCode::ABS_RX, 9000, -32768, 32767) > 0.0);
        assert_eq!(map_value(AbsoluteAxisCode::ABS_Z, 20, 0, 255), 0.0);
        assert_eq!(map_value(AbsoluteAxisCode::ABS_RZ, 255, 0, 255), 1.0);
    }
}
