//! The slice of CoreFoundation and IOKit HID this backend calls, plus owned wrappers.

#![allow(non_upper_case_globals, non_camel_case_types)]

use std::ffi::{c_char, c_void, CString};

pub type CFTypeRef = *const c_void;
pub type CFStringRef = *const c_void;
pub type CFArrayRef = *const c_void;
pub type CFSetRef = *const c_void;
pub type CFDictionaryRef = *const c_void;
pub type CFNumberRef = *const c_void;
pub type CFAllocatorRef = *const c_void;
pub type CFRunLoopRef = *const c_void;
pub type CFIndex = isize;
pub type CFTypeID = usize;
pub type Boolean = u8;

pub type IOReturn = i32;
pub type IOOptionBits = u32;
pub type IOHIDManagerRef = *mut c_void;
pub type IOHIDDeviceRef = *mut c_void;
pub type IOHIDElementRef = *mut c_void;
pub type IOHIDValueRef = *mut c_void;
pub type IOHIDElementCookie = u32;

pub type IOHIDDeviceCallback =
    Option<unsafe extern "C" fn(context: *mut c_void, result: IOReturn, sender: *mut c_void, device: IOHIDDeviceRef)>;
pub type IOHIDValueCallback =
    Option<unsafe extern "C" fn(context: *mut c_void, result: IOReturn, sender: *mut c_void, value: IOHIDValueRef)>;

pub const kIOReturnSuccess: IOReturn = 0;
pub const kIOHIDOptionsTypeNone: IOOptionBits = 0;

pub const kCFStringEncodingUTF8: u32 = 0x0800_0100;
pub const kCFNumberSInt64Type: CFIndex = 4;
pub const kCFRunLoopRunHandledSource: i32 = 4;

pub const kIOHIDElementTypeInput_Misc: u32 = 1;
pub const kIOHIDElementTypeInput_Button: u32 = 2;
pub const kIOHIDElementTypeInput_Axis: u32 = 3;
pub const kIOHIDElementTypeInput_ScanCodes: u32 = 4;
pub const kIOHIDElementTypeCollection: u32 = 513;
pub const kIOHIDElementCollectionTypeApplication: u32 = 1;

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    pub static kCFAllocatorDefault: CFAllocatorRef;
    pub static kCFRunLoopDefaultMode: CFStringRef;

    pub fn CFRetain(cf: CFTypeRef) -> CFTypeRef;
    pub fn CFRelease(cf: CFTypeRef);
    pub fn CFGetTypeID(cf: CFTypeRef) -> CFTypeID;

    pub fn CFStringGetTypeID() -> CFTypeID;
    pub fn CFStringCreateWithCString(alloc: CFAllocatorRef, c_str: *const c_char, encoding: u32) -> CFStringRef;
    pub fn CFStringGetLength(string: CFStringRef) -> CFIndex;
    pub fn CFStringGetMaximumSizeForEncoding(length: CFIndex, encoding: u32) -> CFIndex;
    pub fn CFStringGetCString(string: CFStringRef, buffer: *mut c_char, size: CFIndex, encoding: u32) -> Boolean;

    pub fn CFNumberGetTypeID() -> CFTypeID;
    pub fn CFNumberGetValue(number: CFNumberRef, the_type: CFIndex, value: *mut c_void) -> Boolean;

    pub fn CFArrayGetCount(array: CFArrayRef) -> CFIndex;
    pub fn CFArrayGetValueAtIndex(array: CFArrayRef, index: CFIndex) -> *const c_void;

    pub fn CFSetGetCount(set: CFSetRef) -> CFIndex;
    pub fn CFSetGetValues(set: CFSetRef, values: *mut *const c_void);

    pub fn CFRunLoopGetCurrent() -> CFRunLoopRef;
    pub fn CFRunLoopRunInMode(mode: CFStringRef, seconds: f64, return_after_source_handled: Boolean) -> i32;
}

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    pub fn IOHIDManagerCreate(allocator: CFAllocatorRef, options: IOOptionBits) -> IOHIDManagerRef;
    pub fn IOHIDManagerOpen(manager: IOHIDManagerRef, options: IOOptionBits) -> IOReturn;
    pub fn IOHIDManagerClose(manager: IOHIDManagerRef, options: IOOptionBits) -> IOReturn;
    pub fn IOHIDManagerSetDeviceMatching(manager: IOHIDManagerRef, matching: CFDictionaryRef);
    pub fn IOHIDManagerCopyDevices(manager: IOHIDManagerRef) -> CFSetRef;
    pub fn IOHIDManagerRegisterDeviceMatchingCallback(
        manager: IOHIDManagerRef,
        callback: IOHIDDeviceCallback,
        context: *mut c_void,
    );
    pub fn IOHIDManagerRegisterDeviceRemovalCallback(
        manager: IOHIDManagerRef,
        callback: IOHIDDeviceCallback,
        context: *mut c_void,
    );
    pub fn IOHIDManagerRegisterInputValueCallback(
        manager: IOHIDManagerRef,
        callback: IOHIDValueCallback,
        context: *mut c_void,
    );
    pub fn IOHIDManagerScheduleWithRunLoop(manager: IOHIDManagerRef, run_loop: CFRunLoopRef, mode: CFStringRef);
    pub fn IOHIDManagerUnscheduleFromRunLoop(manager: IOHIDManagerRef, run_loop: CFRunLoopRef, mode: CFStringRef);

    pub fn IOHIDDeviceGetProperty(device: IOHIDDeviceRef, key: CFStringRef) -> CFTypeRef;
    pub fn IOHIDDeviceCopyMatchingElements(
        device: IOHIDDeviceRef,
        matching: CFDictionaryRef,
        options: IOOptionBits,
    ) -> CFArrayRef;

    pub fn IOHIDElementGetType(element: IOHIDElementRef) -> u32;
    pub fn IOHIDElementGetCollectionType(element: IOHIDElementRef) -> u32;
    pub fn IOHIDElementGetUsagePage(element: IOHIDElementRef) -> u32;
    pub fn IOHIDElementGetUsage(element: IOHIDElementRef) -> u32;
    pub fn IOHIDElementGetCookie(element: IOHIDElementRef) -> IOHIDElementCookie;
    pub fn IOHIDElementGetParent(element: IOHIDElementRef) -> IOHIDElementRef;
    pub fn IOHIDElementGetDevice(element: IOHIDElementRef) -> IOHIDDeviceRef;
    pub fn IOHIDElementGetLogicalMin(element: IOHIDElementRef) -> CFIndex;
    pub fn IOHIDElementGetLogicalMax(element: IOHIDElementRef) -> CFIndex;

    pub fn IOHIDValueGetElement(value: IOHIDValueRef) -> IOHIDElementRef;
    pub fn IOHIDValueGetIntegerValue(value: IOHIDValueRef) -> CFIndex;
}

/// Owned `CFStringRef` built from a Rust string, used as a property key.
pub struct CfString(CFStringRef);

impl CfString {
    pub fn new(text: &str) -> Option<Self> {
        let c_text = CString::new(text).ok()?;
        let raw = unsafe { CFStringCreateWithCString(kCFAllocatorDefault, c_text.as_ptr(), kCFStringEncodingUTF8) };
        (!raw.is_null()).then_some(Self(raw))
    }

    pub fn as_raw(&self) -> CFStringRef {
        self.0
    }
}

impl Drop for CfString {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0) }
    }
}

/// Copy a borrowed `CFStringRef` into a `String`. `None` for null or non-string values.
///
/// # Safety
/// `value` must be null or a live CF object.
pub unsafe fn string_value(value: CFTypeRef) -> Option<String> {
    if value.is_null() || CFGetTypeID(value) != CFStringGetTypeID() {
        return None;
    }
    let length = CFStringGetLength(value);
    let capacity = CFStringGetMaximumSizeForEncoding(length, kCFStringEncodingUTF8) + 1;
    let mut buffer = vec![0u8; capacity.max(1) as usize];
    if CFStringGetCString(value, buffer.as_mut_ptr() as *mut c_char, capacity, kCFStringEncodingUTF8) == 0 {
        return None;
    }
    let end = buffer.iter().position(|&byte| byte == 0).unwrap_or(buffer.len());
    buffer.truncate(end);
    Some(String::from_utf8_lossy(&buffer).into_owned())
}

/// Read a borrowed `CFNumberRef` as `i64`. `None` for null or non-number values.
///
/// # Safety
/// `value` must be null or a live CF object.
pub unsafe fn number_value(value: CFTypeRef) -> Option<i64> {
    if value.is_null() || CFGetTypeID(value) != CFNumberGetTypeID() {
        return None;
    }
    let mut out: i64 = 0;
    (CFNumberGetValue(value, kCFNumberSInt64Type, &mut out as *mut i64 as *mut c_void) != 0).then_some(out)
}

/// Borrowed elements of a `CFArrayRef`.
///
/// # Safety
/// `array` must be null or a live `CFArrayRef`; the pointers are valid while it is.
pub unsafe fn array_values(array: CFArrayRef) -> Vec<*const c_void> {
    if array.is_null() {
        return Vec::new();
    }
    (0..CFArrayGetCount(array))
        .map(|index| CFArrayGetValueAtIndex(array, index))
        .collect()
}

/// Human-readable `IOReturn`.
pub fn describe_ioreturn(code: IOReturn) -> String {
    let text = match code as u32 {
        0 => "no error",
        0xe00002bc => "general error",
        0xe00002bd => "no memory",
        0xe00002be => "no resources",
        0xe00002c0 => "no such device",
        0xe00002c1 => "privilege violation",
        0xe00002c2 => "invalid argument",
        0xe00002c5 => "device already open for exclusive access",
        0xe00002c7 => "unsupported function",
        0xe00002ca => "general I/O error",
        0xe00002cd => "device not open",
        0xe00002d5 => "device busy",
        0xe00002d6 => "I/O timeout",
        0xe00002d7 => "device offline",
        0xe00002e2 => "not permitted",
        0xe00002ed => "device not responding",
        _ => return format!("IOReturn {:#x}", code as u32),
    };
    text.to_owned()
}
