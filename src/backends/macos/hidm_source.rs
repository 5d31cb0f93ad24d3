//! IOKit HID manager source.
//!
//! The manager's matching, removal and input-value callbacks only record what
//! happened; `drain_events` spins the current run loop without blocking and then
//! applies the recorded events with the registry in hand.

use super::hidm_device::{self, HidmDevice};
use super::iokit::*;
use super::usage::Collection;
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::logger::Hooks;
use crate::registry::DeviceRegistry;
use crate::source::Source;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;

const NAME: &str = "hidm";

enum HidEvent {
    /// Retained; released once applied.
    Matched(IOHIDDeviceRef),
    Removed(usize),
    Value {
        device: usize,
        cookie: IOHIDElementCookie,
        value: i64,
    },
}

type Queue = RefCell<Vec<HidEvent>>;

unsafe fn queue_from(context: *mut c_void) -> Option<&'static Queue> {
    (context as *const Queue).as_ref()
}

unsafe extern "C" fn on_matched(context: *mut c_void, result: IOReturn, _: *mut c_void, device: IOHIDDeviceRef) {
    if result != kIOReturnSuccess {
        return;
    }
    if let Some(queue) = queue_from(context) {
        CFRetain(device as CFTypeRef);
        queue.borrow_mut().push(HidEvent::Matched(device));
    }
}

unsafe extern "C" fn on_removed(context: *mut c_void, result: IOReturn, _: *mut c_void, device: IOHIDDeviceRef) {
    if result != kIOReturnSuccess {
        return;
    }
    if let Some(queue) = queue_from(context) {
        queue.borrow_mut().push(HidEvent::Removed(device as usize));
    }
}

unsafe extern "C" fn on_value(context: *mut c_void, result: IOReturn, _: *mut c_void, value: IOHIDValueRef) {
    if result != kIOReturnSuccess {
        return;
    }
    let Some(queue) = queue_from(context) else {
        return;
    };
    let element = IOHIDValueGetElement(value);
    if element.is_null() {
        return;
    }
    queue.borrow_mut().push(HidEvent::Value {
        device: IOHIDElementGetDevice(element) as usize,
        cookie: IOHIDElementGetCookie(element),
        value: IOHIDValueGetIntegerValue(value) as i64,
    });
}

/// Open/schedule state of an `IOHIDManagerRef`.
struct HidManager {
    hooks: Hooks,
    raw: IOHIDManagerRef,
    open: bool,
    scheduled: bool,
}

impl HidManager {
    fn new(hooks: &Hooks) -> Result<Self> {
        let raw = unsafe { IOHIDManagerCreate(kCFAllocatorDefault, kIOHIDOptionsTypeNone) };
        if raw.is_null() {
            return Err(Error::unavailable(NAME, "failed to create HIDManager instance"));
        }
        Ok(Self {
            hooks: hooks.clone(),
            raw,
            open: false,
            scheduled: false,
        })
    }

    fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        let code = unsafe { IOHIDManagerOpen(self.raw, kIOHIDOptionsTypeNone) };
        if code != kIOReturnSuccess {
            return Err(Error::backend(
                NAME,
                format!("failed to open HIDManager: {}", describe_ioreturn(code)),
            ));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.unschedule();
            unsafe {
                IOHIDManagerClose(self.raw, kIOHIDOptionsTypeNone);
            }
            self.open = false;
        }
    }

    fn reopen(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn schedule(&mut self) {
        if !self.open {
            log_at!(self.hooks, Warning, "hidm: trying to schedule unopened HIDManager");
        }
        if !self.scheduled {
            unsafe { IOHIDManagerScheduleWithRunLoop(self.raw, CFRunLoopGetCurrent(), kCFRunLoopDefaultMode) };
            self.scheduled = true;
        }
    }

    fn unschedule(&mut self) {
        if self.scheduled {
            unsafe { IOHIDManagerUnscheduleFromRunLoop(self.raw, CFRunLoopGetCurrent(), kCFRunLoopDefaultMode) };
            self.scheduled = false;
        }
    }

    /// Retained handles of every matched device.
    fn copy_devices(&self) -> Vec<IOHIDDeviceRef> {
        unsafe {
            let set = IOHIDManagerCopyDevices(self.raw);
            if set.is_null() {
                return Vec::new();
            }
            let count = CFSetGetCount(set).max(0) as usize;
            let mut values: Vec<*const c_void> = vec![std::ptr::null(); count];
            CFSetGetValues(set, values.as_mut_ptr());
            for &value in &values {
                CFRetain(value);
            }
            CFRelease(set);
            values.into_iter().map(|value| value as IOHIDDeviceRef).collect()
        }
    }
}

impl Drop for HidManager {
    fn drop(&mut self) {
        self.close();
        unsafe { CFRelease(self.raw as CFTypeRef) }
    }
}

pub fn create(hooks: &Hooks) -> Result<Box<dyn Source>> {
    Ok(Box::new(HidmSource::new(hooks)?))
}

pub struct HidmSource {
    hooks: Hooks,
    manager: HidManager,
    /// Callback context; boxed so its address is stable.
    queue: Box<Queue>,
    devices: HashMap<usize, DeviceId>,
}

impl HidmSource {
    pub fn new(hooks: &Hooks) -> Result<Self> {
        let manager = HidManager::new(hooks)?;
        let queue: Box<Queue> = Box::default();
        let context = &*queue as *const Queue as *mut c_void;
        unsafe {
            // Match everything; interesting devices are picked by primary usage on add.
            IOHIDManagerSetDeviceMatching(manager.raw, std::ptr::null());
            IOHIDManagerRegisterDeviceMatchingCallback(manager.raw, Some(on_matched), context);
            IOHIDManagerRegisterDeviceRemovalCallback(manager.raw, Some(on_removed), context);
            IOHIDManagerRegisterInputValueCallback(manager.raw, Some(on_value), context);
        }
        Ok(Self {
            hooks: hooks.clone(),
            manager,
            queue,
            devices: HashMap::new(),
        })
    }

    /// Takes ownership of one retain on `handle`.
    fn add_device(&mut self, registry: &mut DeviceRegistry, handle: IOHIDDeviceRef) {
        self.try_add_device(registry, handle);
        unsafe { CFRelease(handle as CFTypeRef) }
    }

    fn try_add_device(&mut self, registry: &mut DeviceRegistry, handle: IOHIDDeviceRef) {
        if self.devices.contains_key(&(handle as usize)) {
            return;
        }

        let page = hidm_device::number_property(handle, "PrimaryUsagePage").unwrap_or_default() as u32;
        let usage = hidm_device::number_property(handle, "PrimaryUsage").unwrap_or_default() as u32;
        let name = hidm_device::string_property(handle, "Product").unwrap_or_default();
        log_at!(self.hooks, Verbose, "hidm: found device {:p}: {:?} ({:#x}:{:#x})", handle, name, page, usage);

        if Collection::from_usage(page, usage).is_none() {
            log_at!(self.hooks, Verbose, "hidm: skipping {:?}: not a mouse, keyboard or gamepad", name);
            return;
        }
        if name.is_empty() {
            log_at!(self.hooks, Verbose, "hidm: skipping device {:p}: no name", handle);
            return;
        }

        let id = registry.next_id();
        let device = HidmDevice::new(id, handle, name, &self.hooks);
        let usable = device.has_elements();
        registry.add(Box::new(device));
        self.devices.insert(handle as usize, id);
        if !usable {
            if let Some(device) = registry.get_mut(id) {
                device.set_usable(false);
            }
        }
    }

    fn remove_device(&mut self, registry: &mut DeviceRegistry, handle: usize) {
        if let Some(id) = self.devices.remove(&handle) {
            registry.remove(id);
        }
    }

    fn run_loop(&self) {
        unsafe { while CFRunLoopRunInMode(kCFRunLoopDefaultMode, 0.0, 1) == kCFRunLoopRunHandledSource {} }
    }

    fn apply(&mut self, registry: &mut DeviceRegistry, event: HidEvent) {
        match event {
            HidEvent::Matched(handle) => self.add_device(registry, handle),
            HidEvent::Removed(handle) => self.remove_device(registry, handle),
            HidEvent::Value { device, cookie, value } => {
                let Some(&id) = self.devices.get(&device) else {
                    return;
                };
                if let Some(device) = registry.get_as::<HidmDevice>(id) {
                    device.on_input(cookie, value);
                }
            }
        }
    }

    fn discard_queue(&self) {
        for event in self.queue.borrow_mut().drain(..) {
            if let HidEvent::Matched(handle) = event {
                unsafe { CFRelease(handle as CFTypeRef) }
            }
        }
    }
}

impl Source for HidmSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        for (_, id) in self.devices.drain() {
            registry.remove(id);
        }
        self.discard_queue();

        log_at!(self.hooks, Verbose, "hidm: (re)opening manager");
        self.manager.reopen()?;

        let handles = self.manager.copy_devices();
        if handles.is_empty() {
            log_at!(self.hooks, Info, "hidm: no devices found");
        } else {
            log_at!(self.hooks, Info, "hidm: {} devices found", handles.len());
        }
        for handle in handles {
            self.add_device(registry, handle);
        }

        log_at!(self.hooks, Verbose, "hidm: scheduling for regular operation");
        self.manager.schedule();
        Ok(())
    }

    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        self.run_loop();
        let events = std::mem::take(&mut *self.queue.borrow_mut());
        for event in events {
            self.apply(registry, event);
        }
        Ok(())
    }
}

impl Drop for HidmSource {
    fn drop(&mut self) {
        self.manager.unschedule();
        unsafe {
            IOHIDManagerRegisterDeviceMatchingCallback(self.manager.raw, None, std::ptr::null_mut());
            IOHIDManagerRegisterDeviceRemovalCallback(self.manager.raw, None, std::ptr::null_mut());
            IOHIDManagerRegisterInputValueCallback(self.manager.raw, None, std::ptr::null_mut());
        }
        self.discard_queue();
    }
}

