//! Flat C API.
//!
//! Every `rb_minput_*` function is safe to call with null handles: it returns `0`,
//! `0.0` or null instead. Errors and panics never cross the boundary; they are logged
//! through the context's sink and flattened into the same "did not happen" return.
//!
//! Handles (`options`, `context`, `enumeration`) are boxed Rust values handed out as
//! raw pointers. The host pairs each create with its destroy and never uses a handle
//! after destroying it. All calls on one context must come from the thread that
//! created it.
//!
//! Input codes, log levels and device events cross as `int32_t`; see
//! [`InputCode`], [`LogLevel`] and [`DeviceEvent`] for the values.
//!
//! String fields of [`ApiDevice`] filled by `get_device`/`next_device` stay valid until
//! the device is removed and the next drain (or destroy) runs. Strings passed to the
//! device callback are valid for the duration of the callback only.

#![allow(clippy::missing_safety_doc)]

use crate::context::Context;
use crate::device::{Device, DeviceId, DeviceInfo};
use crate::enumeration::Enumeration;
use crate::error::{Error, Result};
use crate::input_code::InputCode;
use crate::logger::LogLevel;
use crate::metadata::DeviceMeta;
use crate::options::Options;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

pub type ApiBool = i32;
pub type UserData = *mut c_void;

pub type LogCallback = Option<unsafe extern "C" fn(UserData, i32, *const c_char)>;
pub type FindCallback = Option<unsafe extern "C" fn(UserData, DeviceId, i32, f32, f32, f32) -> ApiBool>;
pub type DeviceCallback = Option<unsafe extern "C" fn(UserData, i32, DeviceId, *mut ApiDevice)>;

const MAX_VIBRATION_MS: i32 = 32767;

/// Plain-old-data view of a device.
#[repr(C)]
#[derive(Debug)]
pub struct ApiDevice {
    pub id: DeviceId,
    pub name: *const c_char,
    pub location_id: *const c_char,
    pub internal_id: *const c_char,
    pub vendor_id: i32,
    pub product_id: i32,
    pub revision: i32,
    pub serial: *const c_char,
    pub is_usable: ApiBool,
    pub can_vibrate: ApiBool,
    pub axis_count: usize,
}

impl Default for ApiDevice {
    fn default() -> Self {
        Self {
            id: 0,
            name: ptr::null(),
            location_id: ptr::null(),
            internal_id: ptr::null(),
            vendor_id: 0,
            product_id: 0,
            revision: 0,
            serial: ptr::null(),
            is_usable: 0,
            can_vibrate: 0,
            axis_count: 0,
        }
    }
}

/// NUL-terminated copies of a device's metadata strings.
struct MetaStrings {
    name: CString,
    location: CString,
    internal_id: CString,
    serial: CString,
}

impl MetaStrings {
    fn new(meta: &DeviceMeta) -> Self {
        Self {
            name: c_string(&meta.name),
            location: c_string(&meta.location),
            internal_id: c_string(&meta.internal_id),
            serial: c_string(&meta.serial),
        }
    }

    fn fill(&self, info: &DeviceInfo, out: &mut ApiDevice) {
        out.id = info.id;
        out.name = self.name.as_ptr();
        out.location_id = self.location.as_ptr();
        out.internal_id = self.internal_id.as_ptr();
        out.vendor_id = info.meta.vendor_id;
        out.product_id = info.meta.product_id;
        out.revision = info.meta.revision;
        out.serial = self.serial.as_ptr();
        out.is_usable = info.usable.into();
        out.can_vibrate = info.can_vibrate.into();
        out.axis_count = info.axis_count;
    }
}

fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

/// Context handle: the context plus string storage for filled [`ApiDevice`]s.
pub struct ApiContext {
    ctx: Context,
    strings: HashMap<DeviceId, MetaStrings>,
}

impl ApiContext {
    fn new(ctx: Context) -> Self {
        Self {
            ctx,
            strings: HashMap::new(),
        }
    }

    fn fill(&mut self, id: DeviceId, out: &mut ApiDevice) -> bool {
        let Some(device) = self.ctx.get_device(id) else {
            return false;
        };
        let info = DeviceInfo::capture(device);
        let strings = self
            .strings
            .entry(id)
            .or_insert_with(|| MetaStrings::new(&info.meta));
        strings.fill(&info, out);
        true
    }

    /// Forget strings of devices that are gone.
    fn prune_strings(&mut self) {
        let registry = self.ctx.registry();
        self.strings.retain(|id, _| registry.contains(*id));
    }

    fn device(&self, op: &str, id: DeviceId) -> Option<&dyn Device> {
        let device = self.ctx.get_device(id);
        if device.is_none() {
            log_at!(self.ctx.hooks(), Warning, "{}: device {} not found", op, id);
        }
        device
    }

    fn device_mut(&mut self, op: &str, id: DeviceId) -> Option<&mut (dyn Device + 'static)> {
        if !self.ctx.registry().contains(id) {
            log_at!(self.ctx.hooks(), Warning, "{}: device {} not found", op, id);
            return None;
        }
        self.ctx.get_device_mut(id)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f` against a live context; null handles, errors and panics become `T::default()`.
unsafe fn with_guard<T: Default>(ctx: *mut ApiContext, op: &str, f: impl FnOnce(&mut ApiContext) -> Result<T>) -> T {
    let Some(ctx) = ctx.as_mut() else {
        #[cfg(feature = "debug-log")]
        log::trace!(target: "minput::ffi", "{op}: null context");
        return T::default();
    };
    #[cfg(feature = "debug-log")]
    log::trace!(target: "minput::ffi", "{op}");

    match catch_unwind(AssertUnwindSafe(|| f(ctx))) {
        Ok(Ok(value)) => value,
        Ok(Err(Error::InvalidArgument(msg))) => {
            log_at!(ctx.ctx.hooks(), Error, "{}: {}", op, msg);
            T::default()
        }
        Ok(Err(err)) => {
            log_at!(ctx.ctx.hooks(), Error, "{}: {}", op, err);
            T::default()
        }
        Err(payload) => {
            let _ = catch_unwind(AssertUnwindSafe(|| {
                log_at!(ctx.ctx.hooks(), Error, "native exception caught: {}", panic_message(payload.as_ref()));
            }));
            T::default()
        }
    }
}

/// Like [`with_guard`] for calls that only touch an options handle.
unsafe fn with_options(opts: *mut Options, f: impl FnOnce(&mut Options)) -> ApiBool {
    let Some(opts) = opts.as_mut() else {
        return 0;
    };
    catch_unwind(AssertUnwindSafe(|| f(opts))).is_ok().into()
}

fn code_from_raw(raw: i32) -> Option<InputCode> {
    InputCode::from_raw(raw).filter(|code| code.is_mapped())
}

// ---- options ----

#[no_mangle]
pub extern "C" fn rb_minput_create_options() -> *mut Options {
    catch_unwind(|| Box::into_raw(Box::new(Options::new()))).unwrap_or(ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_set_log_level(opts: *mut Options, level: i32) -> ApiBool {
    let Some(level) = LogLevel::from_raw(level) else {
        return 0;
    };
    with_options(opts, |opts| {
        opts.set_log_level(level);
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_set_stderr_log_sink(opts: *mut Options) -> ApiBool {
    with_options(opts, |opts| {
        opts.set_stderr_log_sink();
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_set_custom_log_sink(opts: *mut Options, callback: LogCallback, data: UserData) -> ApiBool {
    with_options(opts, |opts| match callback {
        None => {
            opts.set_null_log_sink();
        }
        Some(callback) => {
            opts.set_custom_log_sink(move |level, message| {
                let message = c_string(message);
                callback(data, level as i32, message.as_ptr());
            });
        }
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_set_device_callback(opts: *mut Options, callback: DeviceCallback, data: UserData) -> ApiBool {
    with_options(opts, |opts| match callback {
        None => {
            opts.set_null_device_callback();
        }
        Some(callback) => {
            opts.set_device_callback(move |event, id, info| match info {
                Some(info) => {
                    let strings = MetaStrings::new(&info.meta);
                    let mut api = ApiDevice::default();
                    strings.fill(info, &mut api);
                    callback(data, event as i32, id, &mut api);
                }
                None => callback(data, event as i32, id, ptr::null_mut()),
            });
        }
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_destroy_options(opts: *mut Options) -> ApiBool {
    if opts.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| drop(Box::from_raw(opts)))).is_ok().into()
}

// ---- context ----

#[no_mangle]
pub unsafe extern "C" fn rb_minput_create(opts: *mut Options) -> *mut ApiContext {
    let Some(opts) = opts.as_ref() else {
        return ptr::null_mut();
    };
    catch_unwind(AssertUnwindSafe(|| {
        Box::into_raw(Box::new(ApiContext::new(Context::new(opts.clone()))))
    }))
    .unwrap_or(ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_options(ctx: *mut ApiContext) -> *mut Options {
    let opts = with_guard(ctx, "get_options", |ctx| Ok(Some(Box::new(ctx.ctx.options()))));
    opts.map_or(ptr::null_mut(), Box::into_raw)
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_set_options(ctx: *mut ApiContext, opts: *mut Options) -> ApiBool {
    with_guard(ctx, "set_options", |ctx| {
        let Some(opts) = opts.as_ref() else {
            return Ok(0);
        };
        ctx.ctx.set_options(opts.clone());
        Ok(1)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_destroy(ctx: *mut ApiContext) -> ApiBool {
    if ctx.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| drop(Box::from_raw(ctx)))).is_ok().into()
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_reset(ctx: *mut ApiContext) -> ApiBool {
    with_guard(ctx, "reset", |ctx| {
        ctx.ctx.reset();
        Ok(1)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_drain_events(ctx: *mut ApiContext) -> ApiBool {
    with_guard(ctx, "drain_events", |ctx| {
        let result = ctx.ctx.drain_events();
        ctx.prune_strings();
        result.map(|()| 1)
    })
}

// ---- device list ----

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_devices(ctx: *mut ApiContext) -> *mut Enumeration {
    let devices = with_guard(ctx, "get_devices", |ctx| Ok(Some(Box::new(ctx.ctx.devices()))));
    devices.map_or(ptr::null_mut(), Box::into_raw)
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_next_device(ctx: *mut ApiContext, enumeration: *mut Enumeration, buffer: *mut ApiDevice) -> ApiBool {
    with_guard(ctx, "next_device", |ctx| {
        let Some(enumeration) = enumeration.as_mut() else {
            return Err(Error::InvalidArgument("enumeration handle must not be NULL".into()));
        };
        let Some(buffer) = buffer.as_mut() else {
            return Err(Error::InvalidArgument("buffer must not be NULL".into()));
        };
        let Some(id) = enumeration.next(&ctx.ctx).map(|device| device.id()) else {
            return Ok(0);
        };
        Ok(ctx.fill(id, buffer).into())
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_destroy_enumeration(ctx: *mut ApiContext, enumeration: *mut Enumeration) -> ApiBool {
    with_guard(ctx, "destroy_enumeration", |_| {
        if enumeration.is_null() {
            return Err(Error::InvalidArgument("enumeration handle must not be NULL".into()));
        }
        drop(Box::from_raw(enumeration));
        Ok(1)
    })
}

// ---- device ----

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_device(ctx: *mut ApiContext, id: DeviceId, buffer: *mut ApiDevice) -> ApiBool {
    with_guard(ctx, "get_device", |ctx| {
        let Some(buffer) = buffer.as_mut() else {
            return Err(Error::InvalidArgument("buffer must not be NULL".into()));
        };
        Ok(ctx.fill(id, buffer).into())
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_is_usable(ctx: *mut ApiContext, id: DeviceId) -> ApiBool {
    with_guard(ctx, "is_usable", |ctx| {
        Ok(ctx.ctx.get_device(id).is_some_and(|device| device.is_usable()).into())
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_can_vibrate(ctx: *mut ApiContext, id: DeviceId) -> ApiBool {
    with_guard(ctx, "can_vibrate", |ctx| {
        Ok(ctx.ctx.get_device(id).is_some_and(|device| device.can_vibrate()).into())
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_vibrate(ctx: *mut ApiContext, id: DeviceId, duration: i32, left: f32, right: f32) -> ApiBool {
    with_guard(ctx, "vibrate", |ctx| {
        if !(0..=MAX_VIBRATION_MS).contains(&duration) {
            return Err(Error::InvalidArgument(format!(
                "duration must be an integer value between 0 and {MAX_VIBRATION_MS} (got {duration})"
            )));
        }
        if !(0.0..=1.0).contains(&left) {
            return Err(Error::InvalidArgument(format!(
                "left motor strength must be a float value between 0 and 1 (got {left})"
            )));
        }
        if !(0.0..=1.0).contains(&right) {
            return Err(Error::InvalidArgument(format!(
                "right motor strength must be a float value between 0 and 1 (got {right})"
            )));
        }
        let Some(device) = ctx.device_mut("vibrate", id) else {
            return Ok(0);
        };
        // Range checked above.
        let duration = duration as u16;
        Ok(device.vibrate(duration, left, right)?.into())
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_reset_device(ctx: *mut ApiContext, id: DeviceId) -> ApiBool {
    with_guard(ctx, "reset_device", |ctx| {
        let Some(device) = ctx.device_mut("reset_device", id) else {
            return Ok(0);
        };
        device.reset();
        Ok(1)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_axis_count(ctx: *mut ApiContext, id: DeviceId) -> usize {
    with_guard(ctx, "get_axis_count", |ctx| {
        Ok(ctx.device("get_axis_count", id).map_or(0, |device| device.axis_count()))
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_axes(ctx: *mut ApiContext, id: DeviceId, buffer: *mut i32, buffer_size: usize) -> ApiBool {
    with_guard(ctx, "get_axes", |ctx| {
        let Some(device) = ctx.device("get_axes", id) else {
            return Ok(0);
        };
        if buffer.is_null() {
            return Err(Error::InvalidArgument("buffer set to NULL".into()));
        }
        if buffer_size == 0 {
            return Err(Error::InvalidArgument("buffer_size set to 0".into()));
        }
        let codes = device.axis_codes();
        let out = std::slice::from_raw_parts_mut(buffer, buffer_size.min(codes.len()));
        for (slot, code) in out.iter_mut().zip(codes) {
            *slot = code.raw();
        }
        Ok(1)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_has_axis(ctx: *mut ApiContext, id: DeviceId, code: i32) -> ApiBool {
    with_guard(ctx, "has_axis", |ctx| {
        let Some(device) = ctx.device("has_axis", id) else {
            return Ok(0);
        };
        Ok(code_from_raw(code).is_some_and(|code| device.axis(code).is_some()).into())
    })
}

// ---- virtual axes ----

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_values(
    ctx: *mut ApiContext,
    id: DeviceId,
    code: i32,
    current: *mut f32,
    previous: *mut f32,
    next: *mut f32,
) -> ApiBool {
    with_guard(ctx, "get_values", |ctx| {
        let Some(device) = ctx.device("get_values", id) else {
            return Ok(0);
        };
        let Some(axis) = code_from_raw(code).and_then(|code| device.axis(code)) else {
            return Ok(0);
        };
        if let Some(current) = current.as_mut() {
            *current = axis.get();
        }
        if let Some(previous) = previous.as_mut() {
            *previous = axis.get_previous();
        }
        if let Some(next) = next.as_mut() {
            *next = axis.get_next();
        }
        Ok(1)
    })
}

unsafe fn read_axis(ctx: *mut ApiContext, op: &str, id: DeviceId, code: i32, read: fn(&crate::VirtualAxis) -> f32) -> f32 {
    with_guard(ctx, op, |ctx| {
        let Some(device) = ctx.device(op, id) else {
            return Ok(0.0);
        };
        Ok(code_from_raw(code)
            .and_then(|code| device.axis(code))
            .map_or(0.0, read))
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_value(ctx: *mut ApiContext, id: DeviceId, code: i32) -> f32 {
    read_axis(ctx, "get_value", id, code, crate::VirtualAxis::get)
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_previous(ctx: *mut ApiContext, id: DeviceId, code: i32) -> f32 {
    read_axis(ctx, "get_previous", id, code, crate::VirtualAxis::get_previous)
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_get_next(ctx: *mut ApiContext, id: DeviceId, code: i32) -> f32 {
    read_axis(ctx, "get_next", id, code, crate::VirtualAxis::get_next)
}

unsafe fn write_axis(ctx: *mut ApiContext, op: &str, id: DeviceId, code: i32, write: impl FnOnce(&mut crate::VirtualAxis)) -> ApiBool {
    with_guard(ctx, op, |ctx| {
        let Some(device) = ctx.device_mut(op, id) else {
            return Ok(0);
        };
        match code_from_raw(code).and_then(|code| device.axis_mut(code)) {
            Some(axis) => {
                write(axis);
                Ok(1)
            }
            None => {
                let hooks = device.core().hooks().clone();
                log_at!(hooks, Warning, "{}: axis {} not found on device {}", op, code, id);
                Ok(0)
            }
        }
    })
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_set_value(ctx: *mut ApiContext, id: DeviceId, code: i32, value: f32) -> ApiBool {
    write_axis(ctx, "set_value", id, code, |axis| axis.set(value))
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_add_value(ctx: *mut ApiContext, id: DeviceId, code: i32, value: f32) -> ApiBool {
    write_axis(ctx, "add_value", id, code, |axis| axis.add(value))
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_commit_value(ctx: *mut ApiContext, id: DeviceId, code: i32) -> ApiBool {
    write_axis(ctx, "commit_value", id, code, |axis| axis.commit())
}

#[no_mangle]
pub unsafe extern "C" fn rb_minput_find_first(
    ctx: *mut ApiContext,
    callback: FindCallback,
    data: UserData,
    in_codes: *const i32,
    in_size: usize,
    out_id: *mut DeviceId,
    out_code: *mut i32,
) -> ApiBool {
    with_guard(ctx, "find_first", |ctx| {
        let Some(callback) = callback else {
            return Err(Error::InvalidArgument("callback must not be NULL".into()));
        };
        let filter: Option<Vec<InputCode>> = if in_codes.is_null() || in_size == 0 {
            None
        } else {
            let raw = std::slice::from_raw_parts(in_codes, in_size);
            Some(raw.iter().filter_map(|&code| code_from_raw(code)).collect())
        };
        if filter.as_ref().is_some_and(Vec::is_empty) {
            return Ok(0);
        }
        let found = ctx.ctx.find_first(
            |id, code, current, previous, next| callback(data, id, code.raw(), current, previous, next) != 0,
            filter.as_deref(),
        );
        let Some((id, code)) = found else {
            return Ok(0);
        };
        if let Some(out_id) = out_id.as_mut() {
            *out_id = id;
        }
        if let Some(out_code) = out_code.as_mut() {
            *out_code = code.raw();
        }
        Ok(1)
    })
}

/// Wrap an existing [`Context`] in a C handle, e.g. one built with custom sources.
///
/// Release it with [`rb_minput_destroy`].
pub fn into_handle(ctx: Context) -> *mut ApiContext {
    Box::into_raw(Box::new(ApiContext::new(ctx)))
}
