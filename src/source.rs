//! Native input sources.
//!
//! A source wraps one native subsystem (evdev, XInput2, Raw Input, XInput, IOKit HID).
//! It keeps its own map from native handles to [`DeviceId`](crate::device::DeviceId)s
//! and keeps that map in step with the registry: every device it adds or removes goes
//! through the `&mut DeviceRegistry` it is handed.

use crate::error::Result;
use crate::registry::DeviceRegistry;

pub trait Source {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Drop every device this source registered, then rediscover from scratch.
    ///
    /// Native handles may be reused between passes, so there is no incremental diff;
    /// rediscovered devices get fresh ids.
    fn enumerate(&mut self, registry: &mut DeviceRegistry) -> Result<()>;

    /// Apply every native event that is already queued. Must not block.
    fn drain_events(&mut self, registry: &mut DeviceRegistry) -> Result<()>;
}

/// Constructor of a platform source, run when a context is created.
pub type SourceFactory = fn(&crate::logger::Hooks) -> Result<Box<dyn Source>>;
