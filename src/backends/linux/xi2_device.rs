use super::keysym::Keymap;
use crate::derive;
use crate::device::{Device, DeviceCore, DeviceId};
use crate::input_code::InputCode;
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use std::any::Any;
use x11rb::protocol::xinput::{self, DeviceClassData, ValuatorMode};
use x11rb::protocol::xproto::Atom;

/// Valuator label atoms of relative pointer axes; `0` when the server doesn't know them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Labels {
    pub rel_x: Atom,
    pub rel_y: Atom,
    pub rel_horiz_wheel: Atom,
    pub rel_vert_wheel: Atom,
}

pub fn map_button(button: u32) -> InputCode {
    match button {
        1 => InputCode::MouseLeft,
        2 => InputCode::MouseMiddle,
        3 => InputCode::MouseRight,
        // 4..=7 are wheel clicks.
        8 => InputCode::MouseFourth,
        9 => InputCode::MouseFifth,
        10 => InputCode::MouseSixth,
        11 => InputCode::MouseSeventh,
        _ => InputCode::None,
    }
}

pub fn fp3232_to_f32(value: &xinput::Fp3232) -> f32 {
    (f64::from(value.integral) + f64::from(value.frac) / 4_294_967_296.0) as f32
}

/// Indices of the set bits of an XI2 valuator mask, in order.
pub fn mask_bits(mask: &[u32]) -> impl Iterator<Item = u16> + '_ {
    mask.iter().enumerate().flat_map(|(word_index, &word)| {
        (0..32u16)
            .filter(move |bit| word & (1 << bit) != 0)
            .map(move |bit| word_index as u16 * 32 + bit)
    })
}

/// An XInput2 slave keyboard or pointer.
pub struct Xi2Device {
    core: DeviceCore,
    x11_id: u16,
    rel_x: Option<u16>,
    rel_y: Option<u16>,
    rel_vert_wheel: Option<u16>,
    rel_horiz_wheel: Option<u16>,
}

impl Xi2Device {
    pub fn new(id: DeviceId, info: &xinput::XIDeviceInfo, meta: DeviceMeta, labels: &Labels, keymap: &Keymap, hooks: &Hooks) -> Self {
        let mut device = Self {
            core: DeviceCore::new(id, meta, hooks),
            x11_id: info.deviceid,
            rel_x: None,
            rel_y: None,
            rel_vert_wheel: None,
            rel_horiz_wheel: None,
        };

        for class in &info.classes {
            match &class.data {
                DeviceClassData::Valuator(valuator) => {
                    device.add_valuator(valuator.number, valuator.label, valuator.mode, labels);
                }
                DeviceClassData::Button(buttons) => device.add_buttons(buttons.labels.len()),
                DeviceClassData::Key(keys) => {
                    for &keycode in &keys.keys {
                        device.core.add_axis(keymap.map(keycode));
                    }
                }
                _ => {}
            }
        }

        device
    }

    pub fn x11_id(&self) -> u16 {
        self.x11_id
    }

    fn add_valuator(&mut self, number: u16, label: Atom, mode: ValuatorMode, labels: &Labels) {
        if mode != ValuatorMode::RELATIVE || label == 0 {
            return;
        }
        if label == labels.rel_x {
            self.rel_x = Some(number);
            self.add_axes(&[InputCode::MouseXLeft, InputCode::MouseXRight, InputCode::MouseX]);
        } else if label == labels.rel_y {
            self.rel_y = Some(number);
            self.add_axes(&[InputCode::MouseYUp, InputCode::MouseYDown, InputCode::MouseY]);
        } else if label == labels.rel_horiz_wheel {
            // No code for it yet; motion is dropped.
            self.rel_horiz_wheel = Some(number);
        } else if label == labels.rel_vert_wheel {
            self.rel_vert_wheel = Some(number);
            self.add_axes(&[InputCode::MouseWheelUp, InputCode::MouseWheelDown, InputCode::MouseWheel]);
        }
    }

    fn add_buttons(&mut self, count: usize) {
        if count >= 3 {
            self.add_axes(&[InputCode::MouseLeft, InputCode::MouseMiddle, InputCode::MouseRight]);
        }
        for (min_count, code) in [
            (8, InputCode::MouseFourth),
            (9, InputCode::MouseFifth),
            (10, InputCode::MouseSixth),
            (11, InputCode::MouseSeventh),
        ] {
            if count >= min_count {
                self.core.add_axis(code);
            }
        }
    }

    fn add_axes(&mut self, codes: &[InputCode]) {
        for &code in codes {
            self.core.add_axis(code);
        }
    }

    fn press(&mut self, code: InputCode, native: u32, what: &str, pressed: bool) {
        if !code.is_mapped() {
            return;
        }
        if !self.core.has_axis(code) {
            log_at!(
                self.core.hooks(),
                Warning,
                "xi2: possible bug: got {} code {} (mapped {}) but it wasn't added during discovery",
                what,
                native,
                code
            );
            self.core.add_axis(code);
        }
        log_at!(
            self.core.hooks(),
            Verbose,
            "xi2: {} {}: axis {} device {}",
            what,
            if pressed { "press" } else { "release" },
            code,
            self.core.id()
        );
        self.core.set(code, if pressed { 1.0 } else { 0.0 });
    }

    pub fn update_key(&mut self, keymap: &Keymap, keycode: u32, pressed: bool) {
        self.press(keymap.map(keycode), keycode, "key", pressed);
    }

    pub fn update_button(&mut self, button: u32, pressed: bool) {
        self.press(map_button(button), button, "button", pressed);
    }

    /// Accumulate raw relative motion. `values` holds one entry per set mask bit.
    pub fn update_motion(&mut self, mask: &[u32], values: &[xinput::Fp3232]) {
        for (number, value) in mask_bits(mask).zip(values) {
            if Some(number) == self.rel_horiz_wheel {
                continue;
            }
            let code = if Some(number) == self.rel_x {
                InputCode::MouseX
            } else if Some(number) == self.rel_y {
                InputCode::MouseY
            } else if Some(number) == self.rel_vert_wheel {
                InputCode::MouseWheel
            } else {
                continue;
            };
            self.core.add(code, fp3232_to_f32(value));
        }
    }
}

impl Device for Xi2Device {
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
    fn mask_bits_span_words() {
        let bits: Vec<u16> = mask_bits(&[0b1010, 0b1]).collect();
        assert_eq!(bits, vec![1, 3, 32]);
    }

    #[test]
    fn fixed_point_values() {
        let half = xinput::Fp3232 {
            integral: 2,
            frac: 1 << 31,
        };
        assert_eq!(fp3232_to_f32(&half), 2.5);
        let negative = xinput::Fp3232 {
            integral: -3,
            frac: 0,
        };
        assert_eq!(fp3232_to_f32(&negative), -3.0);
    }

    #[test]
    fn wheel_buttons_are_not_mapped() {
        assert_eq!(map_button(1), InputCode::MouseLeft);
        assert_eq!(map_button(4), InputCode::None);
        assert_eq!(map_button(7), InputCode::None);
        assert_eq!(map_button(11), InputCode::MouseSeventh);
    }
}
