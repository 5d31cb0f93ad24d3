//! Raw Input keyboards and mice.
//!
//! Raw Input only delivers to a window, so the source owns a message-only window and
//! pumps its queue on every drain. The window procedure copies packets and hotplug
//! notifications into a thread-local queue; the source applies them afterwards with
//! the registry in hand.
//!
//! Device metadata comes from hidapi, matched on the PnP instance id both APIs embed
//! in their device paths. Non-HID devices (PS/2, some laptop keyboards) fall back to
//! what the instance id itself says.

use super::raw_input::{self, Packet};
use super::raw_input_device::RawInputDevice;
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use crate::registry::DeviceRegistry;
use crate::source::Source;
use hidapi::HidApi;
use std::cell::RefCell;
use std::collections::HashMap;
use windows_sys::Win32::Foundation::{GetLastError, ERROR_CLASS_ALREADY_EXISTS, HANDLE, HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::Input::{
    RegisterRawInputDevices, RAWINPUTDEVICE, RIDEV_DEVNOTIFY, RIDEV_INPUTSINK, RIM_TYPEKEYBOARD, RIM_TYPEMOUSE,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW, RegisterClassW,
    TranslateMessage, GIDC_ARRIVAL, GIDC_REMOVAL, HWND_MESSAGE, MSG, PM_REMOVE, WM_INPUT, WM_INPUT_DEVICE_CHANGE,
    WNDCLASSW,
};

const NAME: &str = "raw_input";
const WINDOW_CLASS: &str = "minput.RawInput";

const HID_GENERIC_DESKTOP: u16 = 0x01;
const HID_MOUSE: u16 = 0x02;
const HID_KEYBOARD: u16 = 0x06;

enum Message {
    Input(Vec<u8>),
    Arrival(HANDLE),
    Removal(HANDLE),
}

thread_local! {
    /// Messages captured by the window procedure, tagged with the receiving window.
    static QUEUE: RefCell<Vec<(HWND, Message)>> = const { RefCell::new(Vec::new()) };
}

unsafe extern "system" fn window_proc(window: HWND, message: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let captured = match message {
        WM_INPUT => raw_input::read_wm_input(lparam).map(Message::Input),
        WM_INPUT_DEVICE_CHANGE if wparam == GIDC_ARRIVAL as WPARAM => Some(Message::Arrival(lparam as HANDLE)),
        WM_INPUT_DEVICE_CHANGE if wparam == GIDC_REMOVAL as WPARAM => Some(Message::Removal(lparam as HANDLE)),
        _ => None,
    };
    if let Some(captured) = captured {
        QUEUE.with(|queue| queue.borrow_mut().push((window, captured)));
    }
    DefWindowProcW(window, message, wparam, lparam)
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn create_window() -> Result<HWND> {
    let class_name = wide(WINDOW_CLASS);
    unsafe {
        let instance = GetModuleHandleW(std::ptr::null());

        let mut class: WNDCLASSW = std::mem::zeroed();
        class.lpfnWndProc = Some(window_proc);
        class.hInstance = instance;
        class.lpszClassName = class_name.as_ptr();

        if RegisterClassW(&class) == 0 {
            let error = GetLastError();
            if error != ERROR_CLASS_ALREADY_EXISTS {
                return Err(Error::unavailable(
                    NAME,
                    format!("failed to register raw input window class (error {error})"),
                ));
            }
        }

        let window = CreateWindowExW(
            0,
            class_name.as_ptr(),
            std::ptr::null(),
            0,
            0,
            0,
            0,
            0,
            HWND_MESSAGE,
            std::ptr::null_mut(),
            instance,
            std::ptr::null(),
        );
        if window.is_null() {
            return Err(Error::unavailable(
                NAME,
                format!("failed to create raw input message window (error {})", GetLastError()),
            ));
        }
        Ok(window)
    }
}

fn register_for_input(window: HWND) -> Result<()> {
    let flags = RIDEV_DEVNOTIFY | RIDEV_INPUTSINK;
    let devices = [
        RAWINPUTDEVICE {
            usUsagePage: HID_GENERIC_DESKTOP,
            usUsage: HID_MOUSE,
            dwFlags: flags,
            hwndTarget: window,
        },
        RAWINPUTDEVICE {
            usUsagePage: HID_GENERIC_DESKTOP,
            usUsage: HID_KEYBOARD,
            dwFlags: flags,
            hwndTarget: window,
        },
    ];
    let registered = unsafe {
        RegisterRawInputDevices(
            devices.as_ptr(),
            devices.len() as u32,
            std::mem::size_of::<RAWINPUTDEVICE>() as u32,
        )
    };
    if registered == 0 {
        return Err(Error::unavailable(
            NAME,
            format!("failed to register for raw input (error {})", unsafe { GetLastError() }),
        ));
    }
    Ok(())
}

/// What hidapi knows about one HID interface.
#[derive(Debug, Clone, Default)]
struct HidMeta {
    product: Option<String>,
    vendor_id: i32,
    product_id: i32,
    revision: i32,
    serial: String,
}

pub fn create(hooks: &Hooks) -> Result<Box<dyn Source>> {
    Ok(Box::new(RawInputSource::new(hooks)?))
}

pub struct RawInputSource {
    hooks: Hooks,
    window: HWND,
    hid: Option<HidApi>,
    devices: HashMap<usize, DeviceId>,
}

impl RawInputSource {
    pub fn new(hooks: &Hooks) -> Result<Self> {
        let window = create_window()?;
        let mut source = Self {
            hooks: hooks.clone(),
            window,
            hid: None,
            devices: HashMap::new(),
        };
        // Dropping `source` on error destroys the window.
        register_for_input(source.window)?;

        source.hid = match HidApi::new() {
            Ok(api) => Some(api),
            Err(err) => {
                log_at!(hooks, Warning, "ri: hidapi unavailable, device metadata will be minimal: {}", err);
                None
            }
        };
        Ok(source)
    }

    /// Index hidapi's device list by instance id.
    fn hid_metadata(&mut self) -> HashMap<String, HidMeta> {
        let Some(api) = self.hid.as_mut() else {
            return HashMap::new();
        };
        if let Err(err) = api.refresh_devices() {
            log_at!(self.hooks, Warning, "ri: failed to refresh HID device list: {}", err);
        }

        let mut found = HashMap::new();
        for info in api.device_list() {
            let instance_id = raw_input::instance_id(&info.path().to_string_lossy());
            let product = info
                .product_string()
                .filter(|name| !name.trim().is_empty() && !name.eq_ignore_ascii_case("USB Device"))
                .map(str::to_owned);
            log_at!(
                self.hooks,
                Verbose,
                "ri: hid [{}] {:?} (VID = {:x} PID = {:x} Rev = {:x})",
                instance_id,
                product,
                info.vendor_id(),
                info.product_id(),
                info.release_number()
            );
            found.entry(instance_id).or_insert_with(|| HidMeta {
                product,
                vendor_id: i32::from(info.vendor_id()),
                product_id: i32::from(info.product_id()),
                revision: i32::from(info.release_number()),
                serial: info.serial_number().unwrap_or_default().to_owned(),
            });
        }
        found
    }

    fn add_device(&mut self, registry: &mut DeviceRegistry, handle: HANDLE, hid: &HashMap<String, HidMeta>) {
        if self.devices.contains_key(&(handle as usize)) {
            return;
        }

        let Some(raw_name) = raw_input::device_name(handle) else {
            log_at!(self.hooks, Warning, "ri: failed to get the device name for device {:p}", handle);
            return;
        };
        let instance_id = raw_input::instance_id(&raw_name);
        if raw_input::is_blacklisted(&instance_id) {
            log_at!(self.hooks, Verbose, "ri: {} is blacklisted", instance_id);
            return;
        }

        let Some(info) = raw_input::device_info(handle) else {
            log_at!(self.hooks, Warning, "ri: failed to get the device info for device {:p}", handle);
            return;
        };
        let kind = match info.dwType {
            RIM_TYPEKEYBOARD => "Keyboard",
            RIM_TYPEMOUSE => "Mouse",
            _ => return,
        };

        let meta = match hid.get(&instance_id) {
            Some(found) => DeviceMeta::new(found.product.clone().unwrap_or_else(|| kind.to_owned()))
                .with_ids(found.vendor_id, found.product_id, found.revision)
                .with_serial(found.serial.as_str()),
            None => {
                log_at!(self.hooks, Debug, "ri: {} has no HID entry", instance_id);
                let (vendor_id, product_id) = raw_input::usb_ids(&instance_id).unwrap_or_default();
                DeviceMeta::new(kind).with_ids(vendor_id, product_id, 0)
            }
        }
        .with_location(instance_id.as_str())
        .with_internal_id(instance_id.as_str());

        log_at!(self.hooks, Debug, "ri: adding {} ({})", meta.name, instance_id);
        let id = registry.next_id();
        registry.add(Box::new(RawInputDevice::new(id, handle, &info, meta, &self.hooks)));
        self.devices.insert(handle as usize, id);
    }

    fn remove_device(&mut self, registry: &mut DeviceRegistry, handle: HANDLE) {
        if let Some(id) = self.devices.remove(&(handle as usize)) {
            registry.remove(id);
        }
    }

    fn dispatch(&mut self, registry: &mut DeviceRegistry, packet: Packet) {
        let Some(&id) = self.devices.get(&(packet.device as usize)) else {
            log_at!(self.hooks, Verbose, "ri: packet from unknown device {:p}", packet.device);
            return;
        };
        if let Some(device) = registry.get_as::<RawInputDevice>(id) {
            device.update(&packet.kind);
        }
    }

    fn pump(&self) {
        unsafe {
            let mut message: MSG = std::mem::zeroed();
            while PeekMessageW(&mut message, self.window, 0, 0, PM_REMOVE) != 0 {
                TranslateMessage(&message);
                DispatchMessageW(&message);
            }
        }
    }

    fn take_queued(&self) -> Vec<Message> {
        QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            let (ours, others): (Vec<_>, Vec<_>) = queue.drain(..).partition(|(window, _)| *window == self.window);
            *queue = others;
            ours.into_iter().map(|(_, message)| message).collect()
        })
    }
}

impl Source for RawInputSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        // Windows doesn't seem to reuse handles, but ids stay fresh per pass on every platform.
        for (_, id) in self.devices.drain() {
            registry.remove(id);
        }

        let handles = raw_input::device_list()
            .map_err(|err| Error::backend(NAME, format!("failed to get the raw input device list: {err}")))?;
        let hid = self.hid_metadata();
        for handle in handles {
            self.add_device(registry, handle, &hid);
        }
        Ok(())
    }

    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        self.pump();

        for message in self.take_queued() {
            match message {
                Message::Input(bytes) => match raw_input::parse_packet(&bytes) {
                    Some(packet) => self.dispatch(registry, packet),
                    None => log_at!(self.hooks, Debug, "ri: parsed WM_INPUT as unknown packet, ignoring"),
                },
                Message::Arrival(handle) => {
                    log_at!(self.hooks, Debug, "ri: device {:p} attached", handle);
                    let hid = self.hid_metadata();
                    self.add_device(registry, handle, &hid);
                }
                Message::Removal(handle) => {
                    log_at!(self.hooks, Debug, "ri: device {:p} detached", handle);
                    self.remove_device(registry, handle);
                }
            }
        }
        Ok(())
    }
}

impl Drop for RawInputSource {
    fn drop(&mut self) {
        unsafe {
            DestroyWindow(self.window);
        }
        QUEUE.with(|queue| queue.borrow_mut().retain(|(window, _)| *window != self.window));
    }
}
