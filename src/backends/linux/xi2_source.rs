//! X11 XInput2 keyboards and mice.
//!
//! Raw events are selected on the root window for all devices, so input arrives no
//! matter which window has focus. X reuses device ids, which is why every hierarchy
//! change that adds a slave replaces any device registered under the same X id.

use super::keysym::Keymap;
use super::udev_info;
use super::xi2_device::{Labels, Xi2Device};
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::logger::Hooks;
use crate::metadata::DeviceMeta;
use crate::registry::DeviceRegistry;
use crate::source::Source;
use std::collections::HashMap;
use std::path::Path;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xinput::{self, ConnectionExt as _, DeviceType, HierarchyMask, XIEventMask};
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as _};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

/// `XIAllDevices`
const ALL_DEVICES: u16 = 0;

pub fn create(hooks: &Hooks) -> Result<Box<dyn Source>> {
    Ok(Box::new(Xi2Source::connect(hooks)?))
}

fn x11_err(err: impl std::fmt::Display) -> Error {
    Error::backend("xi2", err)
}

fn is_slave(device_type: DeviceType) -> bool {
    matches!(
        device_type,
        DeviceType::SLAVE_POINTER | DeviceType::SLAVE_KEYBOARD | DeviceType::FLOATING_SLAVE
    )
}

/// Skips masters and the XTEST virtual devices.
pub fn is_interesting(device_type: DeviceType, name: &str) -> bool {
    is_slave(device_type) && !name.to_ascii_lowercase().starts_with("virtual core xtest")
}

pub struct Xi2Source {
    hooks: Hooks,
    conn: RustConnection,
    labels: Labels,
    device_node_atom: u32,
    keymap: Keymap,
    devices: HashMap<u16, DeviceId>,
}

impl Xi2Source {
    pub fn connect(hooks: &Hooks) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(|err| Error::unavailable("xi2", err))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| Error::unavailable("xi2", format!("no screen {screen_num}")))?;
        log_at!(hooks, Verbose, "x11: root window = {}", root);

        conn.extension_information(xinput::X11_EXTENSION_NAME)
            .map_err(|err| Error::unavailable("xi2", err))?
            .ok_or_else(|| Error::unavailable("xi2", "XInputExtension is not present"))?;

        let version = conn
            .xinput_xi_query_version(2, 2)
            .map_err(|err| Error::unavailable("xi2", err))?
            .reply()
            .map_err(|err| Error::unavailable("xi2", err))?;
        if (version.major_version, version.minor_version) < (2, 2) {
            return Err(Error::unavailable("xi2", "XInput2 2.2+ is not supported on this X11 server"));
        }

        let mask = XIEventMask::RAW_KEY_PRESS
            | XIEventMask::RAW_KEY_RELEASE
            | XIEventMask::RAW_BUTTON_PRESS
            | XIEventMask::RAW_BUTTON_RELEASE
            | XIEventMask::RAW_MOTION
            | XIEventMask::HIERARCHY;
        conn.xinput_xi_select_events(
            root,
            &[xinput::EventMask {
                deviceid: ALL_DEVICES,
                mask: vec![mask],
            }],
        )
        .map_err(|err| Error::unavailable("xi2", err))?
        .check()
        .map_err(|err| Error::unavailable("xi2", format!("failed to register for XI2 events: {err}")))?;

        let mut source = Self {
            hooks: hooks.clone(),
            labels: Labels::default(),
            device_node_atom: 0,
            keymap: Keymap::default(),
            devices: HashMap::new(),
            conn,
        };
        source.labels = Labels {
            rel_x: source.intern(b"Rel X")?,
            rel_y: source.intern(b"Rel Y")?,
            rel_horiz_wheel: source.intern(b"Rel Horiz Wheel")?,
            rel_vert_wheel: source.intern(b"Rel Vert Wheel")?,
        };
        source.device_node_atom = source.intern(b"Device Node")?;
        source.refresh_keymap()?;
        Ok(source)
    }

    /// Look up an existing atom; `0` if the server has never seen the name.
    fn intern(&self, name: &[u8]) -> Result<u32> {
        Ok(self
            .conn
            .intern_atom(true, name)
            .map_err(x11_err)?
            .reply()
            .map_err(x11_err)?
            .atom)
    }

    fn refresh_keymap(&mut self) -> Result<()> {
        let setup = self.conn.setup();
        let (min_keycode, max_keycode) = (setup.min_keycode, setup.max_keycode);
        let count = max_keycode.saturating_sub(min_keycode).saturating_add(1);
        let reply = self
            .conn
            .get_keyboard_mapping(min_keycode, count)
            .map_err(x11_err)?
            .reply()
            .map_err(x11_err)?;
        self.keymap = Keymap::new(min_keycode, reply.keysyms_per_keycode, reply.keysyms);
        Ok(())
    }

    fn query(&self, x11_id: u16) -> Result<Vec<xinput::XIDeviceInfo>> {
        Ok(self
            .conn
            .xinput_xi_query_device(x11_id)
            .map_err(x11_err)?
            .reply()
            .map_err(x11_err)?
            .infos)
    }

    fn device_node(&self, x11_id: u16) -> Option<String> {
        if self.device_node_atom == 0 {
            return None;
        }
        let reply = self
            .conn
            .xinput_xi_get_property(x11_id, false, self.device_node_atom, AtomEnum::STRING.into(), 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        if reply.bytes_after > 0 {
            return None;
        }
        match reply.items {
            xinput::XIGetPropertyItems::Data8(bytes) => {
                let bytes = bytes.split(|&b| b == 0).next().unwrap_or_default();
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => None,
        }
    }

    /// Metadata from the udev properties of the node's parent `inputN` device.
    fn meta_for(&self, id: DeviceId, info: &xinput::XIDeviceInfo, name: &str) -> DeviceMeta {
        let meta = DeviceMeta::new(name);
        let Some(device_node) = self.device_node(info.deviceid) else {
            return meta;
        };
        let meta = meta.with_internal_id(device_node.as_str());

        let Some(symbolic_name) = Path::new(&device_node).file_name().and_then(|name| name.to_str()) else {
            return meta;
        };
        let parent = match udev_info::event_device(symbolic_name).and_then(|node| udev_info::input_parent(&node)) {
            Ok(Some(parent)) => parent,
            Ok(None) => {
                log_at!(self.hooks, Warning, "xi2: {} has no input parent", id);
                return meta;
            }
            Err(err) => {
                log_at!(self.hooks, Debug, "xi2: no udev device for {}: {}", device_node, err);
                return meta;
            }
        };
        let parent_name = udev_info::sysname(&parent);
        if !parent_name.starts_with("input") {
            log_at!(self.hooks, Warning, "xi2: {} parent not inputNN: {}", id, parent_name);
            return meta;
        }

        meta.with_location(udev_info::property(&parent, "ID_PATH"))
            .with_ids(
                udev_info::hex_property(&parent, "ID_VENDOR_ID"),
                udev_info::hex_property(&parent, "ID_MODEL_ID"),
                udev_info::hex_property(&parent, "ID_REVISION"),
            )
            .with_serial(udev_info::property(&parent, "ID_SERIAL"))
    }

    fn add_device(&mut self, registry: &mut DeviceRegistry, info: &xinput::XIDeviceInfo) {
        let name = String::from_utf8_lossy(&info.name).into_owned();
        if !is_interesting(info.type_, &name) {
            log_at!(self.hooks, Verbose, "xi2: skipping {} ({})", info.deviceid, name);
            return;
        }
        if self.devices.contains_key(&info.deviceid) {
            self.remove_device(registry, info.deviceid);
        }

        let id = registry.next_id();
        let meta = self.meta_for(id, info, &name);
        let device = Xi2Device::new(id, info, meta, &self.labels, &self.keymap, &self.hooks);
        registry.add(Box::new(device));
        self.devices.insert(info.deviceid, id);
        if let Some(device) = registry.get_mut(id) {
            device.set_usable(info.enabled);
        }
    }

    fn remove_device(&mut self, registry: &mut DeviceRegistry, x11_id: u16) {
        if let Some(id) = self.devices.remove(&x11_id) {
            registry.remove(id);
        }
    }

    fn on_hierarchy(&mut self, registry: &mut DeviceRegistry, event: &xinput::HierarchyEvent) -> Result<()> {
        log_at!(self.hooks, Debug, "xi2: hierarchy changed");
        for info in &event.infos {
            if !is_slave(info.type_) {
                continue;
            }
            let flags = u32::from(info.flags);
            log_at!(self.hooks, Verbose, "xi2: device {} flags {}", info.deviceid, flags);

            if flags & u32::from(HierarchyMask::SLAVE_REMOVED) != 0 {
                self.remove_device(registry, info.deviceid);
            } else if flags & u32::from(HierarchyMask::SLAVE_ADDED) != 0 {
                if let Some(added) = self.query(info.deviceid)?.first() {
                    self.add_device(registry, added);
                }
            }

            if let Some(device) = self.devices.get(&info.deviceid).and_then(|&id| registry.get_mut(id)) {
                device.set_usable(info.enabled);
            }
        }
        Ok(())
    }

    fn device(&self, registry: &DeviceRegistry, x11_id: u16) -> Option<DeviceId> {
        let id = self.devices.get(&x11_id).copied()?;
        registry.contains(id).then_some(id)
    }
}

impl Source for Xi2Source {
    fn name(&self) -> &'static str {
        "xi2"
    }

    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        log_at!(self.hooks, Debug, "xi2: enumerating devices");
        for (_, id) in self.devices.drain() {
            registry.remove(id);
        }
        for info in self.query(ALL_DEVICES)? {
            self.add_device(registry, &info);
        }
        Ok(())
    }

    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        self.conn.flush().map_err(x11_err)?;
        while let Some(event) = self.conn.poll_for_event().map_err(x11_err)? {
            match event {
                Event::XinputRawKeyPress(raw) | Event::XinputRawKeyRelease(raw) => {
                    let pressed = raw.event_type == xinput::RAW_KEY_PRESS_EVENT;
                    if let Some(id) = self.device(registry, raw.deviceid) {
                        if let Some(device) = registry.get_as::<Xi2Device>(id) {
                            device.update_key(&self.keymap, raw.detail, pressed);
                        }
                    }
                }
                Event::XinputRawButtonPress(raw) | Event::XinputRawButtonRelease(raw) => {
                    let pressed = raw.event_type == xinput::RAW_BUTTON_PRESS_EVENT;
                    if let Some(id) = self.device(registry, raw.deviceid) {
                        if let Some(device) = registry.get_as::<Xi2Device>(id) {
                            device.update_button(raw.detail, pressed);
                        }
                    }
                }
                Event::XinputRawMotion(raw) => {
                    if let Some(id) = self.device(registry, raw.deviceid) {
                        if let Some(device) = registry.get_as::<Xi2Device>(id) {
                            device.update_motion(&raw.valuator_mask, &raw.axisvalues_raw);
                        }
                    }
                }
                Event::XinputHierarchy(hierarchy) => self.on_hierarchy(registry, &hierarchy)?,
                Event::MappingNotify(_) => {
                    log_at!(self.hooks, Debug, "xi2: keyboard mapping changed");
                    self.refresh_keymap()?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xtest_and_masters_are_skipped() {
        assert!(is_interesting(DeviceType::SLAVE_KEYBOARD, "AT Translated Set 2 keyboard"));
        assert!(is_interesting(DeviceType::FLOATING_SLAVE, "Logitech USB Receiver"));
        assert!(!is_interesting(DeviceType::SLAVE_POINTER, "Virtual core XTEST pointer"));
        assert!(!is_interesting(DeviceType::MASTER_POINTER, "Virtual core pointer"));
    }
}
