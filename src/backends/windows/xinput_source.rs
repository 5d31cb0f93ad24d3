//! XInput gamepads (slots 0-3).

use super::xinput_device::{XInputDevice, SLOT_COUNT};
use crate::device::DeviceId;
use crate::error::Result;
use crate::logger::Hooks;
use crate::registry::DeviceRegistry;
use crate::source::Source;

pub fn create(hooks: &Hooks) -> Result<Box<dyn Source>> {
    Ok(Box::new(XInputSource {
        hooks: hooks.clone(),
        slots: Vec::new(),
    }))
}

pub struct XInputSource {
    hooks: Hooks,
    slots: Vec<DeviceId>,
}

impl Source for XInputSource {
    fn name(&self) -> &'static str {
        "xinput"
    }

    /// Slots are fixed, so only the first call creates devices.
    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        if !self.slots.is_empty() {
            log_at!(self.hooks, Debug, "xinput: slots already set up");
            return Ok(());
        }
        for slot in 0..SLOT_COUNT {
            let id = registry.next_id();
            let mut device = XInputDevice::new(id, slot, &self.hooks);
            device.update()?;
            registry.add(Box::new(device));
            self.slots.push(id);
        }
        Ok(())
    }

    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()> {
        for &id in &self.slots {
            if let Some(device) = registry.get_as::<XInputDevice>(id) {
                device.update()?;
            }
        }
        Ok(())
    }
}
