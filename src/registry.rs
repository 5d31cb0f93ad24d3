//! The device registry.
//!
//! Owns every live device, keyed by [`DeviceId`], and hands out fresh ids. Sources
//! receive `&mut DeviceRegistry` during `enumerate`/`drain_events`, which is the only
//! way devices enter or leave the context.

use crate::device::{Device, DeviceId, DeviceInfo};
use crate::event::DeviceEvent;
use crate::logger::Hooks;
use std::collections::HashMap;

pub struct DeviceRegistry {
    devices: HashMap<DeviceId, Box<dyn Device>>,
    last_id: DeviceId,
    hooks: Hooks,
}

impl DeviceRegistry {
    pub(crate) fn new(hooks: Hooks) -> Self {
        Self {
            devices: HashMap::new(),
            last_id: 0,
            hooks,
        }
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Allocate an id. Strictly increasing, starting at 1.
    pub fn next_id(&mut self) -> DeviceId {
        self.last_id += 1;
        self.last_id
    }

    /// Take ownership of a device and announce it.
    pub fn add(&mut self, device: Box<dyn Device>) -> DeviceId {
        let id = device.id();
        log_at!(self.hooks, Debug, "adding device {} ({})", id, device.name());
        self.devices.insert(id, device);
        self.notify(id, DeviceEvent::Created);
        id
    }

    /// Drop a device. Unknown ids are ignored without a notification.
    pub fn remove(&mut self, id: DeviceId) -> bool {
        let Some(device) = self.devices.remove(&id) else {
            return false;
        };
        log_at!(self.hooks, Debug, "removing device {} ({})", id, device.name());
        drop(device);
        self.notify(id, DeviceEvent::Removed);
        true
    }

    /// Fire `event` for `id`, with a snapshot if the device is still registered.
    pub fn notify(&self, id: DeviceId, event: DeviceEvent) {
        match self.devices.get(&id) {
            Some(device) => {
                let info = DeviceInfo::capture(&**device);
                self.hooks.notify(event, id, Some(&info));
            }
            None => self.hooks.notify(event, id, None),
        }
    }

    pub fn get(&self, id: DeviceId) -> Option<&dyn Device> {
        self.devices.get(&id).map(|device| &**device)
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut (dyn Device + 'static)> {
        self.devices.get_mut(&id).map(|device| &mut **device)
    }

    /// Resolve an id to a concrete backend device type.
    pub fn get_as<T: Device>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.devices.get_mut(&id)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Ids of every registered device, in map order.
    pub fn ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn Device + 'static)> + '_ {
        self.devices.values().map(|device| &**device)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Device + 'static)> + '_ {
        self.devices.values_mut().map(|device| &mut **device)
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices.len())
            .field("last_id", &self.last_id)
            .finish()
    }
}
