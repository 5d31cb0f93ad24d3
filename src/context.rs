//! The input context.
//!
//! [`Context`] owns the device registry, the active sources (in registration order) and
//! the options every device logs and notifies through. The host drives it once per tick:
//!
//! ```no_run
//! use minput::{Context, InputCode, Options};
//!
//! let mut ctx = Context::new(Options::new());
//! loop {
//!     ctx.drain_events().ok();
//!     if let Some((id, code)) = ctx.find_first(|_, _, current, _, _| current != 0.0, None) {
//!         println!("device {id} is holding {code}");
//!     }
//!     # break;
//! }
//! ```
//!
//! One context per input session. Sources open exclusive native resources, so several
//! live contexts in one process may interfere with each other.

use crate::backends;
use crate::device::{Device, DeviceId};
use crate::enumeration::Enumeration;
use crate::error::{Error, Result};
use crate::input_code::InputCode;
use crate::logger::{Hooks, LogLevel};
use crate::options::Options;
use crate::registry::DeviceRegistry;
use crate::source::{Source, SourceFactory};
use std::fmt;

pub struct Context {
    hooks: Hooks,
    registry: DeviceRegistry,
    sources: Vec<Box<dyn Source>>,
}

impl Context {
    /// Create a context with every platform source compiled into this build.
    ///
    /// Sources that fail to start are logged and skipped.
    pub fn new(options: Options) -> Self {
        let mut ctx = Self::empty(options);
        for (name, factory) in backends::platform_sources() {
            ctx.add_source_with(name, factory);
        }
        ctx
    }

    /// Create a context with no sources.
    pub fn empty(options: Options) -> Self {
        let hooks = Hooks::new(options);
        Self {
            registry: DeviceRegistry::new(hooks.clone()),
            hooks,
            sources: Vec::new(),
        }
    }

    /// Construct a source and install it; failures are logged, not returned.
    pub fn add_source_with(&mut self, name: &str, factory: SourceFactory) -> bool {
        log_at!(self.hooks, Debug, "adding source: {}", name);
        match factory(&self.hooks) {
            Ok(source) => self.add_source(source),
            Err(err) => {
                log_at!(self.hooks, Error, "source {} failed to start: {}", name, err);
                false
            }
        }
    }

    /// Run the initial enumeration of `source` and keep it if that succeeds.
    pub fn add_source(&mut self, mut source: Box<dyn Source>) -> bool {
        match source.enumerate(&mut self.registry) {
            Ok(()) => {
                self.sources.push(source);
                true
            }
            Err(err) => {
                log_at!(self.hooks, Error, "source {} failed to enumerate: {}", source.name(), err);
                false
            }
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub fn options(&self) -> Options {
        self.hooks.options()
    }

    pub fn set_options(&mut self, options: Options) {
        self.hooks.set_options(options);
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    pub fn next_id(&mut self) -> DeviceId {
        self.registry.next_id()
    }

    pub fn add_device(&mut self, device: Box<dyn Device>) -> DeviceId {
        self.registry.add(device)
    }

    pub fn remove_device(&mut self, id: DeviceId) -> bool {
        self.registry.remove(id)
    }

    pub fn get_device(&self, id: DeviceId) -> Option<&dyn Device> {
        self.registry.get(id)
    }

    pub fn get_device_mut(&mut self, id: DeviceId) -> Option<&mut (dyn Device + 'static)> {
        self.registry.get_mut(id)
    }

    /// Like [`get_device_mut`](Self::get_device_mut), but a missing id is an error.
    pub fn device_mut(&mut self, id: DeviceId) -> Result<&mut (dyn Device + 'static)> {
        self.registry.get_mut(id).ok_or(Error::DeviceNotFound(id))
    }

    /// One tick: pump every source in order, then commit every device.
    ///
    /// The first source error aborts the tick before the commit pass.
    pub fn drain_events(&mut self) -> Result<()> {
        for source in &mut self.sources {
            source.drain_events(&mut self.registry)?;
        }
        for device in self.registry.iter_mut() {
            device.commit();
        }
        Ok(())
    }

    /// Zero every axis of every device.
    pub fn reset(&mut self) {
        for device in self.registry.iter_mut() {
            device.reset();
        }
    }

    /// Snapshot the current device ids.
    pub fn devices(&self) -> Enumeration {
        Enumeration::new(self.registry.ids())
    }

    /// First `(device, code)` among usable devices for which `predicate` holds.
    ///
    /// The predicate gets `(id, code, current, previous, next)`. With `codes` set only
    /// those codes are tried per device (missing ones skipped); otherwise every axis of
    /// the device, in no particular order.
    pub fn find_first<F>(&self, mut predicate: F, codes: Option<&[InputCode]>) -> Option<(DeviceId, InputCode)>
    where
        F: FnMut(DeviceId, InputCode, f32, f32, f32) -> bool,
    {
        for device in self.registry.iter().filter(|device| device.is_usable()) {
            let owned;
            let candidates = match codes {
                Some(codes) if !codes.is_empty() => codes,
                _ => {
                    owned = device.axis_codes();
                    owned.as_slice()
                }
            };
            for &code in candidates {
                let Some(axis) = device.axis(code) else {
                    continue;
                };
                if predicate(device.id(), code, axis.get(), axis.get_previous(), axis.get_next()) {
                    return Some((device.id(), code));
                }
            }
        }
        None
    }

    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.hooks.log(level, args);
    }

    /// Log an error surfaced at the API boundary.
    pub fn log_error(&self, err: &Error) {
        log_at!(self.hooks, Error, "{}", err);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("sources", &self.source_names())
            .field("registry", &self.registry)
            .finish()
    }
}
