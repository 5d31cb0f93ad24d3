use super::iokit::*;
use super::usage::{self, Collection, Target};
use crate::derive;
use crate::device::{Device, DeviceCore, DeviceId};
use crate::input_code::InputCode;
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use std::any::Any;
use std::collections::HashMap;

/// A mapped HID element and the logical range its values arrive in.
#[derive(Debug, Clone, Copy)]
struct Element {
    target: Target,
    logical_min: i64,
    logical_max: i64,
}

fn device_property(handle: IOHIDDeviceRef, key: &str) -> CFTypeRef {
    match CfString::new(key) {
        Some(key) => unsafe { IOHIDDeviceGetProperty(handle, key.as_raw()) },
        None => std::ptr::null(),
    }
}

pub fn string_property(handle: IOHIDDeviceRef, key: &str) -> Option<String> {
    unsafe { string_value(device_property(handle, key)) }
}

pub fn number_property(handle: IOHIDDeviceRef, key: &str) -> Option<i64> {
    unsafe { number_value(device_property(handle, key)) }
}

/// Nearest enclosing application collection of an element.
unsafe fn application_collection(element: IOHIDElementRef) -> Option<Collection> {
    let mut current = IOHIDElementGetParent(element);
    while !current.is_null() {
        if IOHIDElementGetType(current) == kIOHIDElementTypeCollection
            && IOHIDElementGetCollectionType(current) == kIOHIDElementCollectionTypeApplication
        {
            return Collection::from_usage(IOHIDElementGetUsagePage(current), IOHIDElementGetUsage(current));
        }
        current = IOHIDElementGetParent(current);
    }
    None
}

/// A device seen through the IOKit HID manager.
pub struct HidmDevice {
    core: DeviceCore,
    handle: IOHIDDeviceRef,
    elements: HashMap<IOHIDElementCookie, Element>,
}

impl HidmDevice {
    /// `handle` is retained for the lifetime of the device.
    pub fn new(id: DeviceId, handle: IOHIDDeviceRef, name: String, hooks: &Hooks) -> Self {
        unsafe {
            CFRetain(handle as CFTypeRef);
        }

        let number = |key| number_property(handle, key).unwrap_or_default();
        let meta = DeviceMeta::new(name)
            .with_location(number("LocationID").to_string())
            .with_internal_id(number("UniqueID").to_string())
            .with_ids(number("VendorID") as i32, number("ProductID") as i32, number("VersionNumber") as i32)
            .with_serial(string_property(handle, "SerialNumber").unwrap_or_default());

        let mut device = Self {
            core: DeviceCore::new(id, meta, hooks),
            handle,
            elements: HashMap::new(),
        };
        device.map_elements();
        device
    }

    pub fn handle(&self) -> IOHIDDeviceRef {
        self.handle
    }

    /// `true` when at least one element mapped to an input code.
    pub fn has_elements(&self) -> bool {
        !self.elements.is_empty()
    }

    fn map_elements(&mut self) {
        let (mut ignored, mut total) = (0usize, 0usize);
        unsafe {
            let all = IOHIDDeviceCopyMatchingElements(self.handle, std::ptr::null(), kIOHIDOptionsTypeNone);
            for element in array_values(all) {
                let element = element as IOHIDElementRef;
                total += 1;
                if !matches!(
                    IOHIDElementGetType(element),
                    kIOHIDElementTypeInput_Misc
                        | kIOHIDElementTypeInput_Button
                        | kIOHIDElementTypeInput_Axis
                        | kIOHIDElementTypeInput_ScanCodes
                ) {
                    continue;
                }
                let page = IOHIDElementGetUsagePage(element);
                let usage = IOHIDElementGetUsage(element);
                let target = application_collection(element)
                    .and_then(|collection| usage::map_element(collection, page, usage));
                let Some(target) = target else {
                    ignored += 1;
                    continue;
                };

                for code in target.codes() {
                    self.core.add_axis(code);
                }
                self.elements.insert(
                    IOHIDElementGetCookie(element),
                    Element {
                        target,
                        logical_min: IOHIDElementGetLogicalMin(element) as i64,
                        logical_max: IOHIDElementGetLogicalMax(element) as i64,
                    },
                );
            }
            if !all.is_null() {
                CFRelease(all);
            }
        }
        log_at!(
            self.core.hooks(),
            Verbose,
            "hidm: device {} ({}): {} elements, {} mapped, {} ignored",
            self.core.id(),
            self.core.meta().name,
            total,
            self.elements.len(),
            ignored
        );
    }

    /// Apply one value report.
    pub fn on_input(&mut self, cookie: IOHIDElementCookie, raw: i64) {
        let Some(element) = self.elements.get(&cookie).copied() else {
            return;
        };
        match element.target {
            Target::Hat => {
                let (up, down, left, right) = usage::hat_directions(raw, element.logical_min);
                for (code, pressed) in [
                    (InputCode::PadDpadUp, up),
                    (InputCode::PadDpadDown, down),
                    (InputCode::PadDpadLeft, left),
                    (InputCode::PadDpadRight, right),
                ] {
                    self.core.set(code, if pressed { 1.0 } else { 0.0 });
                }
            }
            Target::Axis(code @ (InputCode::MouseX | InputCode::MouseY | InputCode::MouseWheel)) => {
                self.core.add(code, raw as f32);
            }
            Target::Axis(code) => {
                let value = usage::map_value(code, raw, element.logical_min, element.logical_max);
                self.core.set(code, value);
            }
        }
    }
}

impl Device for HidmDevice {
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
        derive::stick_pre_commit(&mut self.core);
        derive::mouse_pre_commit(&mut self.core);
        self.core.commit_axes();
        derive::mouse_post_commit(&mut self.core);
    }
}

impl Drop for HidmDevice {
    fn drop(&mut self) {
        unsafe { CFRelease(self.handle as CFTypeRef) }
    }
}
