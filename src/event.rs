//! Device lifecycle events.
//!
//! The context reports registry membership and usability transitions through the
//! device callback configured in [`Options`](crate::options::Options). Values
//! cross the C boundary unchanged, so they must stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a device.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEvent {
    /// The device was added to the registry.
    Created = 1,
    /// The device was removed. No info snapshot accompanies this event.
    Removed = 2,
    /// The device stays registered but stopped producing input.
    Unusable = 3,
    /// The device became usable again.
    Usable = 4,
}

impl DeviceEvent {
    /// The event fired when usability changes to `usable`.
    pub fn for_usable(usable: bool) -> Self {
        if usable {
            DeviceEvent::Usable
        } else {
            DeviceEvent::Unusable
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceEvent::Created => "created",
            DeviceEvent::Removed => "removed",
            DeviceEvent::Unusable => "unusable",
            DeviceEvent::Usable => "usable",
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
