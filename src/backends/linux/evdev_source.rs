//! evdev gamepads.
//!
//! Devices are discovered through udev and filtered on the `ID_INPUT_JOYSTICK` tag.
//! Hotplug listens on a udev monitor for the input subsystem. udev broadcasts an add
//! only once its rules have run, so the node's properties are complete by then. Added
//! nodes wait in `pending` until the monitor queue is empty, which lets a remove in the
//! same batch cancel them before they are opened.

use super::evdev_device::EvdevDevice;
use super::udev_info;
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::logger::Hooks;
use crate::registry::DeviceRegistry;
use crate::source::Source;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEV_INPUT: &str = "/dev/input";

pub fn create(hooks: &Hooks) -> Result<Box<dyn Source>> {
    Ok(Box::new(EvdevSource::new(hooks)?))
}

/// What a batch of monitor events asks of the source.
#[derive(Debug, Default, PartialEq, Eq)]
struct Hotplug {
    pending: Vec<String>,
    removed: Vec<String>,
}

impl Hotplug {
    fn on_add(&mut self, name: &str) {
        if !self.pending.iter().any(|pending| pending == name) {
            self.pending.push(name.to_string());
        }
    }

    fn on_remove(&mut self, name: &str) {
        self.pending.retain(|pending| pending != name);
        self.removed.push(name.to_string());
    }
}

pub struct EvdevSource {
    hooks: Hooks,
    monitor: udev::MonitorSocket,
    devices: HashMap<String, DeviceId>,
}

impl EvdevSource {
    pub fn new(hooks: &Hooks) -> Result<Self> {
        let monitor = udev_info::input_monitor()
            .map_err(|err| Error::unavailable("evdev", format!("failed to monitor udev input events: {err}")))?;

        Ok(Self {
            hooks: hooks.clone(),
            monitor,
            devices: HashMap::new(),
        })
    }

    fn add_device(&mut self, registry: &mut DeviceRegistry, device: &udev::Device) {
        let symbolic_name = udev_info::sysname(device);
        if !udev_info::is_event_node(&symbolic_name) {
            return;
        }
        if !udev_info::is_tagged(device, "ID_INPUT_JOYSTICK") {
            log_at!(self.hooks, Verbose, "evdev: skipping non-joystick {}", symbolic_name);
            return;
        }

        if self.devices.contains_key(&symbolic_name) {
            self.remove_device(registry, &symbolic_name);
        }

        let id = registry.next_id();
        let path = device
            .devnode()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEV_INPUT).join(&symbolic_name));
        let serial = udev_info::property(device, "ID_SERIAL");
        match EvdevDevice::open(id, &path, &symbolic_name, &serial, &self.hooks) {
            Ok(opened) => {
                registry.add(Box::new(opened));
                self.devices.insert(symbolic_name, id);
            }
            Err(err) => {
                log_at!(self.hooks, Debug, "evdev: skipping inaccessible {}: {}", path.display(), err);
            }
        }
    }

    fn add_named(&mut self, registry: &mut DeviceRegistry, symbolic_name: &str) {
        match udev_info::event_device(symbolic_name) {
            Ok(device) => self.add_device(registry, &device),
            Err(err) => log_at!(self.hooks, Debug, "evdev: {} vanished before it was added: {}", symbolic_name, err),
        }
    }

    fn remove_device(&mut self, registry: &mut DeviceRegistry, symbolic_name: &str) {
        if let Some(id) = self.devices.remove(symbolic_name) {
            registry.remove(id);
        }
    }

    fn read_monitor(&self) -> Hotplug {
        let mut hotplug = Hotplug::default();
        for event in self.monitor.iter() {
            let name = event.sysname().to_string_lossy().into_owned();
            if !udev_info::is_event_node(&name) {
                continue;
            }
            match event.event_type() {
                udev::EventType::Add => {
                    log_at!(self.hooks, Debug, "evdev: udev add {}", name);
                    hotplug.on_add(&name);
                }
                udev::EventType::Remove => {
                    log_at!(self.hooks, Debug, "evdev: udev remove {}", name);
                    hotplug.on_remove(&name);
                }
                _ => {}
            }
        }
        hotplug
    }
}

impl Source for EvdevSource {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        log_at!(self.hooks, Debug, "evdev: enumerating devices");

        for (_, id) in self.devices.drain() {
            registry.remove(id);
        }

        let devices = udev_info::event_devices()
            .map_err(|err| Error::backend("evdev", format!("failed to enumerate udev input devices: {err}")))?;
        for device in &devices {
            self.add_device(registry, device);
        }
        Ok(())
    }

    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        let hotplug = self.read_monitor();
        for name in &hotplug.removed {
            self.remove_device(registry, name);
        }
        for name in &hotplug.pending {
            log_at!(self.hooks, Debug, "evdev: adding pending device {}", name);
            self.add_named(registry, name);
        }

        let ids: Vec<DeviceId> = self.devices.values().copied().collect();
        for id in ids {
            let Some(device) = registry.get_as::<EvdevDevice>(id) else {
                continue;
            };
            log_at!(self.hooks, Verbose, "evdev: pumping device {} ({})", id, device.symbolic_name());
            device.pump()?;
            device.post_update();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_cancels_a_pending_add() {
        let mut hotplug = Hotplug::default();
        hotplug.on_add("event4");
        hotplug.on_add("event5");
        hotplug.on_remove("event4");
        assert_eq!(hotplug.pending, ["event5"]);
        assert_eq!(hotplug.removed, ["event4"]);
    }

    #[test]
    fn readd_after_remove_is_pending_again() {
        let mut hotplug = Hotplug::default();
        hotplug.on_remove("event7");
        hotplug.on_add("event7");
        hotplug.on_add("event7");
        assert_eq!(hotplug.pending, ["event7"]);
        assert_eq!(hotplug.removed, ["event7"]);
    }
}
