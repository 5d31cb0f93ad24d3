//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is the descriptive identity of a device as the backend discovered it.
//! It is filled once during enumeration or hotplug and never changes afterwards.
//!
//! # Conventions
//! - `name` is the user-facing product name (`"Xbox Wireless Controller"`).
//! - `location` is an OS/topology hint (evdev `phys`, udev `ID_PATH`, `xinput:0`).
//! - `internal_id` is the platform handle path: `/dev/input/event7`, a Windows
//!   instance id, an IOKit registry path. It is diagnostic first, identity second.
//! - `vendor_id`/`product_id`/`revision` are `0` when unknown, strings are empty.
//!
//! ## Persistence notes
//! - `vendor_id`/`product_id` plus `serial` (when present) are the most stable way to
//!   recognize the same physical device across sessions.
//! - The device id assigned by the context is per-process and never reused, so it
//!   must not be persisted.

use serde::{Deserialize, Serialize};

/// Descriptive identity of a single device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Display name.
    pub name: String,
    /// Platform location string (port / bus path).
    pub location: String,
    /// Platform-specific internal identifier.
    pub internal_id: String,
    pub vendor_id: i32,
    pub product_id: i32,
    pub revision: i32,
    /// Serial string, empty when the platform does not expose one.
    pub serial: String,
}

impl DeviceMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_internal_id(mut self, internal_id: impl Into<String>) -> Self {
        self.internal_id = internal_id.into();
        self
    }

    pub fn with_ids(mut self, vendor_id: i32, product_id: i32, revision: i32) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self.revision = revision;
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }
}

impl std::fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if self.vendor_id != 0 || self.product_id != 0 {
            write!(f, " [{:04x}:{:04x}]", self.vendor_id, self.product_id)?;
        }
        if !self.location.is_empty() {
            write!(f, " @ {}", self.location)?;
        }
        Ok(())
    }
}
