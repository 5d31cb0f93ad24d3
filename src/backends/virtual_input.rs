//! In-process virtual devices.
//!
//! [`VirtualController`] scripts devices and input from host code; [`VirtualController::source`]
//! gives the [`Source`] that replays the script into a context on each drain. It behaves
//! like a native backend: plugging is hotplug, slots are the "native handles", and
//! scripted values are staged with `set`/`add` exactly like decoded native events.
//!
//! ```
//! use minput::backends::virtual_input::{VirtualController, VirtualDeviceSpec};
//! use minput::{Context, InputCode, Options};
//!
//! let script = VirtualController::new();
//! let pad = script.plug(VirtualDeviceSpec::gamepad("Virtual Pad"));
//!
//! let mut ctx = Context::empty(Options::new());
//! ctx.add_source(script.source());
//!
//! script.press(pad, InputCode::PadA);
//! ctx.drain_events().unwrap();
//!
//! let id = script.device_id(pad).unwrap();
//! assert_eq!(ctx.get_device(id).unwrap().axis(InputCode::PadA).unwrap().get(), 1.0);
//! ```

use crate::derive;
use crate::device::{Device, DeviceCore, DeviceId};
use crate::error::Result;
use crate::input_code::{InputCategory, InputCode};
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use crate::registry::DeviceRegistry;
use crate::source::Source;
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

/// Which derivation passes a virtual device runs on commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VirtualProfile {
    #[default]
    Plain,
    Mouse,
    Gamepad,
}

/// Description of a device to plug.
#[derive(Clone, Debug, Default)]
pub struct VirtualDeviceSpec {
    pub meta: DeviceMeta,
    pub codes: Vec<InputCode>,
    pub profile: VirtualProfile,
    pub rumble: bool,
}

impl VirtualDeviceSpec {
    pub fn new(name: &str, codes: &[InputCode]) -> Self {
        Self {
            meta: DeviceMeta::new(name).with_location("virtual"),
            codes: codes.to_vec(),
            ..Self::default()
        }
    }

    pub fn keyboard(name: &str) -> Self {
        let codes: Vec<InputCode> = InputCode::of_category(InputCategory::Keyboard).collect();
        Self::new(name, &codes)
    }

    pub fn mouse(name: &str) -> Self {
        let codes: Vec<InputCode> = InputCode::of_category(InputCategory::Mouse).collect();
        Self {
            profile: VirtualProfile::Mouse,
            ..Self::new(name, &codes)
        }
    }

    pub fn gamepad(name: &str) -> Self {
        let codes: Vec<InputCode> = InputCode::of_category(InputCategory::Gamepad).collect();
        Self {
            profile: VirtualProfile::Gamepad,
            rumble: true,
            ..Self::new(name, &codes)
        }
    }
}

/// A rumble request recorded by a virtual device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rumble {
    pub duration_ms: u16,
    pub left: f32,
    pub right: f32,
}

pub struct VirtualDevice {
    core: DeviceCore,
    profile: VirtualProfile,
    rumble: bool,
    last_rumble: Option<Rumble>,
}

impl VirtualDevice {
    pub fn new(id: DeviceId, spec: &VirtualDeviceSpec, hooks: &Hooks) -> Self {
        let mut core = DeviceCore::new(id, spec.meta.clone(), hooks);
        for &code in &spec.codes {
            core.add_axis(code);
        }
        Self {
            core,
            profile: spec.profile,
            rumble: spec.rumble,
            last_rumble: None,
        }
    }

    /// The most recent accepted [`Device::vibrate`] call.
    pub fn last_rumble(&self) -> Option<Rumble> {
        self.last_rumble
    }
}

impl Device for VirtualDevice {
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
        self.rumble && self.core.is_usable()
    }

    fn vibrate(&mut self, duration_ms: u16, left: f32, right: f32) -> Result<bool> {
        if !self.can_vibrate() {
            return Ok(false);
        }
        self.last_rumble = Some(Rumble {
            duration_ms,
            left,
            right,
        });
        Ok(true)
    }

    fn commit(&mut self) {
        match self.profile {
            VirtualProfile::Plain => self.core.commit_axes(),
            VirtualProfile::Mouse => {
                derive::mouse_pre_commit(&mut self.core);
                self.core.commit_axes();
                derive::mouse_post_commit(&mut self.core);
            }
            VirtualProfile::Gamepad => {
                derive::stick_pre_commit(&mut self.core);
                self.core.commit_axes();
            }
        }
    }
}

/// Source-local handle of a scripted device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualSlot(u32);

#[derive(Debug)]
enum Op {
    Plug(VirtualSlot),
    Unplug(VirtualSlot),
    Set(VirtualSlot, InputCode, f32),
    Add(VirtualSlot, InputCode, f32),
    Usable(VirtualSlot, bool),
}

#[derive(Default)]
struct Script {
    next_slot: u32,
    plugged: BTreeMap<VirtualSlot, VirtualDeviceSpec>,
    queue: VecDeque<Op>,
    // Written by the source so the host can map slots to context ids.
    ids: HashMap<VirtualSlot, DeviceId>,
}

/// Host-side handle used to script virtual input.
#[derive(Clone, Default)]
pub struct VirtualController {
    script: Rc<RefCell<Script>>,
}

impl VirtualController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source replaying this script. Install it with [`Context::add_source`](crate::Context::add_source).
    pub fn source(&self) -> Box<dyn Source> {
        Box::new(VirtualSource {
            script: self.script.clone(),
            slots: HashMap::new(),
        })
    }

    /// Plug a device; it appears on the next enumerate or drain.
    pub fn plug(&self, spec: VirtualDeviceSpec) -> VirtualSlot {
        let mut script = self.script.borrow_mut();
        let slot = VirtualSlot(script.next_slot);
        script.next_slot += 1;
        script.plugged.insert(slot, spec);
        script.queue.push_back(Op::Plug(slot));
        slot
    }

    /// Unplug a device; it is removed on the next drain.
    pub fn unplug(&self, slot: VirtualSlot) {
        let mut script = self.script.borrow_mut();
        script.plugged.remove(&slot);
        script.queue.push_back(Op::Unplug(slot));
    }

    pub fn set(&self, slot: VirtualSlot, code: InputCode, value: f32) {
        self.push(Op::Set(slot, code, value));
    }

    /// Relative input; several calls in one tick sum up.
    pub fn add(&self, slot: VirtualSlot, code: InputCode, value: f32) {
        self.push(Op::Add(slot, code, value));
    }

    pub fn press(&self, slot: VirtualSlot, code: InputCode) {
        self.set(slot, code, 1.0);
    }

    pub fn release(&self, slot: VirtualSlot, code: InputCode) {
        self.set(slot, code, 0.0);
    }

    pub fn set_usable(&self, slot: VirtualSlot, usable: bool) {
        self.push(Op::Usable(slot, usable));
    }

    /// Context id currently bound to `slot`.
    pub fn device_id(&self, slot: VirtualSlot) -> Option<DeviceId> {
        self.script.borrow().ids.get(&slot).copied()
    }

    fn push(&self, op: Op) {
        self.script.borrow_mut().queue.push_back(op);
    }
}

struct VirtualSource {
    script: Rc<RefCell<Script>>,
    slots: HashMap<VirtualSlot, DeviceId>,
}

impl VirtualSource {
    fn plug(&mut self, registry: &mut DeviceRegistry, slot: VirtualSlot, spec: &VirtualDeviceSpec) {
        let id = registry.next_id();
        let device = VirtualDevice::new(id, spec, registry.hooks());
        registry.add(Box::new(device));
        self.slots.insert(slot, id);
    }

    fn publish_ids(&self) {
        self.script.borrow_mut().ids = self.slots.clone();
    }
}

impl Source for VirtualSource {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        for (_, id) in self.slots.drain() {
            registry.remove(id);
        }
        let plugged = self.script.borrow().plugged.clone();
        for (slot, spec) in &plugged {
            self.plug(registry, *slot, spec);
        }
        self.publish_ids();
        Ok(())
    }

    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        let ops: Vec<Op> = self.script.borrow_mut().queue.drain(..).collect();
        for op in ops {
            match op {
                Op::Plug(slot) => {
                    if self.slots.contains_key(&slot) {
                        continue;
                    }
                    let spec = self.script.borrow().plugged.get(&slot).cloned();
                    if let Some(spec) = spec {
                        self.plug(registry, slot, &spec);
                    }
                }
                Op::Unplug(slot) => {
                    if let Some(id) = self.slots.remove(&slot) {
                        registry.remove(id);
                    }
                }
                Op::Set(slot, code, value) | Op::Add(slot, code, value) => {
                    let relative = matches!(op, Op::Add(..));
                    let Some(&id) = self.slots.get(&slot) else {
                        log_at!(registry.hooks(), Verbose, "virtual: dropping input for unplugged slot {:?}", slot);
                        continue;
                    };
                    let Some(device) = registry.get_mut(id) else {
                        continue;
                    };
                    let core = device.core_mut();
                    let applied = if relative { core.add(code, value) } else { core.set(code, value) };
                    if !applied {
                        log_at!(core.hooks(), Debug, "virtual: device {} has no axis {}", core.id(), code);
                    }
                }
                Op::Usable(slot, usable) => {
                    if let Some(device) = self.slots.get(&slot).and_then(|&id| registry.get_mut(id)) {
                        device.set_usable(usable);
                    }
                }
            }
        }
        self.publish_ids();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::options::Options;

    #[test]
    fn gamepad_profile_derives_sticks_and_dpad() {
        let script = VirtualController::new();
        let pad = script.plug(VirtualDeviceSpec::gamepad("pad"));
        let mut ctx = Context::empty(Options::new());
        ctx.add_source(script.source());

        script.set(pad, InputCode::PadLeftStickY, -0.5);
        script.press(pad, InputCode::PadDpadLeft);
        ctx.drain_events().unwrap();

        let dev = ctx.get_device(script.device_id(pad).unwrap()).unwrap();
        let get = |code| dev.axis(code).unwrap().get();
        assert_eq!(get(InputCode::PadLeftStickDown), 0.5);
        assert_eq!(get(InputCode::PadLeftStickUp), 0.0);
        assert_eq!(get(InputCode::PadDpadX), -1.0);
    }

    #[test]
    fn mouse_deltas_sum_and_decay() {
        let script = VirtualController::new();
        let mouse = script.plug(VirtualDeviceSpec::mouse("mouse"));
        let mut ctx = Context::empty(Options::new());
        ctx.add_source(script.source());
        let id = script.device_id(mouse).unwrap();

        script.add(mouse, InputCode::MouseX, 2.0);
        script.add(mouse, InputCode::MouseX, 3.0);
        ctx.drain_events().unwrap();
        assert_eq!(ctx.get_device(id).unwrap().axis(InputCode::MouseX).unwrap().get(), 5.0);
        assert_eq!(ctx.get_device(id).unwrap().axis(InputCode::MouseXRight).unwrap().get(), 5.0);

        ctx.drain_events().unwrap();
        let x = ctx.get_device(id).unwrap().axis(InputCode::MouseX).unwrap();
        assert_eq!((x.get(), x.get_previous()), (0.0, 5.0));
    }

    #[test]
    fn enumerate_reassigns_fresh_ids() {
        let script = VirtualController::new();
        let slot = script.plug(VirtualDeviceSpec::keyboard("kbd"));
        let mut source = script.source();
        let mut ctx = Context::empty(Options::new());

        source.enumerate(ctx.registry_mut()).unwrap();
        let first = script.device_id(slot).unwrap();
        source.enumerate(ctx.registry_mut()).unwrap();
        let second = script.device_id(slot).unwrap();

        assert!(second > first);
        assert!(ctx.get_device(first).is_none());
        assert_eq!(ctx.registry().len(), 1);
    }

    #[test]
    fn vibrate_requires_capability_and_usability() {
        let script = VirtualController::new();
        let pad = script.plug(VirtualDeviceSpec::gamepad("pad"));
        let kbd = script.plug(VirtualDeviceSpec::keyboard("kbd"));
        let mut ctx = Context::empty(Options::new());
        ctx.add_source(script.source());

        let pad_id = script.device_id(pad).unwrap();
        let kbd_id = script.device_id(kbd).unwrap();
        assert!(!ctx.get_device_mut(kbd_id).unwrap().vibrate(10, 1.0, 1.0).unwrap());
        assert!(ctx.get_device_mut(pad_id).unwrap().vibrate(250, 0.5, 1.0).unwrap());

        script.set_usable(pad, false);
        ctx.drain_events().unwrap();
        assert!(!ctx.get_device(pad_id).unwrap().can_vibrate());

        let rumble = ctx
            .get_device(pad_id)
            .unwrap()
            .as_any()
            .downcast_ref::<VirtualDevice>()
            .and_then(VirtualDevice::last_rumble);
        assert_eq!(rumble, Some(Rumble { duration_ms: 250, left: 0.5, right: 1.0 }));
    }
}
