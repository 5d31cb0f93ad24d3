//! Restartable device snapshots.
//!
//! An [`Enumeration`] freezes the set of device ids at the time
//! [`Context::devices`](crate::context::Context::devices) is called. It holds ids, not
//! device references, and resolves each id through the context on [`next`](Enumeration::next):
//! devices removed after the snapshot are skipped, devices added after it are not seen.
//!
//! # Examples
//! ```no_run
//! use minput::{Context, Options};
//!
//! let ctx = Context::new(Options::new());
//! let mut devices = ctx.devices();
//! while let Some(device) = devices.next(&ctx) {
//!     println!("{}: {}", device.id(), device.name());
//! }
//! devices.reset(); // walk the same snapshot again
//! ```

use crate::context::Context;
use crate::device::{Device, DeviceId};

/// Snapshot of device ids with a cursor.
///
/// Cloning copies the frozen id list, so clones see exactly the same set.
#[derive(Clone, Debug, Default)]
pub struct Enumeration {
    ids: Vec<DeviceId>,
    cursor: usize,
}

impl Enumeration {
    pub(crate) fn new(ids: Vec<DeviceId>) -> Self {
        Self { ids, cursor: 0 }
    }

    /// Next device of the snapshot that is still registered in `ctx`.
    pub fn next<'a>(&mut self, ctx: &'a Context) -> Option<&'a dyn Device> {
        while let Some(&id) = self.ids.get(self.cursor) {
            self.cursor += 1;
            if let Some(device) = ctx.get_device(id) {
                return Some(device);
            }
        }
        None
    }

    /// Rewind to the start of the snapshot.
    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Ids captured by the snapshot, including ones removed since.
    #[inline]
    pub fn ids(&self) -> &[DeviceId] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
