//! Devices and their axis state.
//!
//! A device is a set of [`VirtualAxis`] cells keyed by [`InputCode`], plus identity
//! ([`DeviceMeta`]) and a usability flag. Backends implement [`Device`] on their own
//! types and embed a [`DeviceCore`] for the shared state; everything common lives in
//! provided trait methods.
//!
//! ## Tick protocol
//! During a drain, backends stage values with `set`/`add`. The context then calls
//! [`Device::commit`] once per device. Backends override `commit` to run derivation
//! passes around [`DeviceCore::commit_axes`] (pre, base, post), always calling the base
//! exactly once.
//!
//! ## Usability
//! Devices start usable. [`Device::set_usable`] fires a notification only when the
//! flag actually flips; a device that is unusable stays registered.

use crate::error::Result;
use crate::event::DeviceEvent;
use crate::input_code::InputCode;
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use crate::virtual_axis::VirtualAxis;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;

/// Per-process unique device identifier. Never reused.
pub type DeviceId = i64;

/// State shared by every device implementation.
#[derive(Debug)]
pub struct DeviceCore {
    id: DeviceId,
    meta: DeviceMeta,
    axes: HashMap<InputCode, VirtualAxis>,
    usable: bool,
    hooks: Hooks,
}

impl DeviceCore {
    pub fn new(id: DeviceId, meta: DeviceMeta, hooks: &Hooks) -> Self {
        Self {
            id,
            meta,
            axes: HashMap::new(),
            usable: true,
            hooks: hooks.clone(),
        }
    }

    #[inline]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[inline]
    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    #[inline]
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    #[inline]
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Returns `None` for [`InputCode::None`] and for codes this device does not have.
    pub fn axis(&self, code: InputCode) -> Option<&VirtualAxis> {
        self.axes.get(&code)
    }

    pub fn axis_mut(&mut self, code: InputCode) -> Option<&mut VirtualAxis> {
        self.axes.get_mut(&code)
    }

    /// Register an axis, or return the existing one.
    pub fn add_axis(&mut self, code: InputCode) -> Option<&mut VirtualAxis> {
        if !code.is_mapped() {
            return None;
        }
        Some(self.axes.entry(code).or_default())
    }

    pub fn has_axis(&self, code: InputCode) -> bool {
        self.axes.contains_key(&code)
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Registered codes, in no particular order.
    pub fn axis_codes(&self) -> Vec<InputCode> {
        self.axes.keys().copied().collect()
    }

    /// Stage an absolute value. `false` if the axis is missing.
    pub fn set(&mut self, code: InputCode, value: f32) -> bool {
        match self.axes.get_mut(&code) {
            Some(axis) => {
                axis.set(value);
                true
            }
            None => false,
        }
    }

    /// Stage a delta. `false` if the axis is missing.
    pub fn add(&mut self, code: InputCode, value: f32) -> bool {
        match self.axes.get_mut(&code) {
            Some(axis) => {
                axis.add(value);
                true
            }
            None => false,
        }
    }

    /// Staged value of an axis, `0.0` when missing.
    pub fn next_value(&self, code: InputCode) -> f32 {
        self.axes.get(&code).map_or(0.0, VirtualAxis::get_next)
    }

    /// The base commit: promote every axis.
    pub fn commit_axes(&mut self) {
        for axis in self.axes.values_mut() {
            axis.commit();
        }
    }

    pub fn reset(&mut self) {
        for axis in self.axes.values_mut() {
            axis.reset();
        }
    }

    /// Flip the flag; `true` if it changed.
    fn swap_usable(&mut self, usable: bool) -> bool {
        if self.usable == usable {
            return false;
        }
        self.usable = usable;
        true
    }
}

/// A registered input device.
///
/// Implementors provide access to their [`DeviceCore`] and may override capability,
/// vibration and commit behavior. All other methods are provided.
pub trait Device: Any {
    fn core(&self) -> &DeviceCore;
    fn core_mut(&mut self) -> &mut DeviceCore;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether [`vibrate`](Self::vibrate) can have an effect right now.
    fn can_vibrate(&self) -> bool {
        false
    }

    /// Start a rumble. Callers validate `left`/`right` to `[0, 1]`.
    ///
    /// `Ok(false)` means "not applicable" (no motor, device not open).
    fn vibrate(&mut self, duration_ms: u16, left: f32, right: f32) -> Result<bool> {
        let _ = (duration_ms, left, right);
        Ok(false)
    }

    /// Promote staged values. Backends wrap derivation passes around the base commit.
    fn commit(&mut self) {
        self.core_mut().commit_axes();
    }

    fn id(&self) -> DeviceId {
        self.core().id()
    }

    fn name(&self) -> &str {
        &self.core().meta().name
    }

    fn meta(&self) -> &DeviceMeta {
        self.core().meta()
    }

    fn is_usable(&self) -> bool {
        self.core().is_usable()
    }

    /// Update usability, notifying the host on an actual transition only.
    fn set_usable(&mut self, usable: bool) {
        if !self.core_mut().swap_usable(usable) {
            return;
        }
        let info = DeviceInfo::capture(self);
        let hooks = self.core().hooks();
        log_at!(
            hooks,
            Debug,
            "device {} ({}) is now {}",
            info.id,
            info.meta.name,
            if usable { "usable" } else { "unusable" }
        );
        hooks.notify(DeviceEvent::for_usable(usable), info.id, Some(&info));
    }

    fn axis(&self, code: InputCode) -> Option<&VirtualAxis> {
        self.core().axis(code)
    }

    fn axis_mut(&mut self, code: InputCode) -> Option<&mut VirtualAxis> {
        self.core_mut().axis_mut(code)
    }

    fn add_axis(&mut self, code: InputCode) -> Option<&mut VirtualAxis> {
        self.core_mut().add_axis(code)
    }

    fn axis_count(&self) -> usize {
        self.core().axis_count()
    }

    fn axis_codes(&self) -> Vec<InputCode> {
        self.core().axis_codes()
    }

    fn reset(&mut self) {
        self.core_mut().reset();
    }
}

/// Owned snapshot of a device, handed to device callbacks and the C API.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    #[serde(flatten)]
    pub meta: DeviceMeta,
    pub usable: bool,
    pub can_vibrate: bool,
    pub axis_count: usize,
}

impl DeviceInfo {
    pub fn capture<D: Device + ?Sized>(device: &D) -> Self {
        Self {
            id: device.id(),
            meta: device.meta().clone(),
            usable: device.is_usable(),
            can_vibrate: device.can_vibrate(),
            axis_count: device.axis_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct PlainDevice {
        core: DeviceCore,
    }

    impl PlainDevice {
        fn new(id: DeviceId, meta: DeviceMeta, hooks: &Hooks, codes: &[InputCode]) -> Self {
            let mut core = DeviceCore::new(id, meta, hooks);
            for &code in codes {
                core.add_axis(code);
            }
            Self { core }
        }
    }

    impl Device for PlainDevice {
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
    }

    type Seen = Rc<RefCell<Vec<(DeviceEvent, DeviceId, Option<DeviceInfo>)>>>;

    fn hooks_with_recorder() -> (Hooks, Seen) {
        let seen: Seen = Rc::default();
        let sink = seen.clone();
        let mut options = Options::new();
        options.set_device_callback(move |event, id, info| {
            sink.borrow_mut().push((event, id, info.cloned()));
        });
        (Hooks::new(options), seen)
    }

    #[test]
    fn add_axis_is_idempotent() {
        let (hooks, _) = hooks_with_recorder();
        let mut dev = PlainDevice::new(1, DeviceMeta::new("pad"), &hooks, &[]);

        dev.add_axis(InputCode::PadA).unwrap().set(1.0);
        let again = dev.add_axis(InputCode::PadA).unwrap();
        assert_eq!(again.get_next(), 1.0);
        assert_eq!(dev.axis_count(), 1);
    }

    #[test]
    fn none_code_never_gets_an_axis() {
        let (hooks, _) = hooks_with_recorder();
        let mut dev = PlainDevice::new(1, DeviceMeta::new("pad"), &hooks, &[InputCode::None]);
        assert!(dev.add_axis(InputCode::None).is_none());
        assert!(dev.axis(InputCode::None).is_none());
        assert_eq!(dev.axis_count(), 0);
    }

    #[test]
    fn set_usable_notifies_only_on_transition() {
        let (hooks, seen) = hooks_with_recorder();
        let mut dev = PlainDevice::new(7, DeviceMeta::new("kbd"), &hooks, &[InputCode::KeyA]);

        dev.set_usable(true);
        assert!(seen.borrow().is_empty());

        dev.set_usable(false);
        dev.set_usable(false);
        dev.set_usable(true);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, DeviceEvent::Unusable);
        assert_eq!(seen[0].1, 7);
        let info = seen[0].2.as_ref().expect("info snapshot");
        assert!(!info.usable);
        assert_eq!(info.axis_count, 1);
        assert_eq!(info.meta.name, "kbd");
        assert_eq!(seen[1].0, DeviceEvent::Usable);
    }

    #[test]
    fn reset_zeroes_every_axis() {
        let (hooks, _) = hooks_with_recorder();
        let codes = [InputCode::MouseLeft, InputCode::MouseX];
        let mut dev = PlainDevice::new(1, DeviceMeta::new("mouse"), &hooks, &codes);
        dev.core_mut().set(InputCode::MouseLeft, 1.0);
        dev.core_mut().add(InputCode::MouseX, 3.0);
        dev.commit();
        dev.commit();

        dev.reset();
        for code in codes {
            let axis = dev.axis(code).unwrap();
            assert_eq!((axis.get(), axis.get_previous(), axis.get_next()), (0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn default_capabilities() {
        let (hooks, _) = hooks_with_recorder();
        let mut dev = PlainDevice::new(1, DeviceMeta::new("x"), &hooks, &[]);
        assert!(!dev.can_vibrate());
        assert!(!dev.vibrate(100, 1.0, 1.0).unwrap());
    }
}
