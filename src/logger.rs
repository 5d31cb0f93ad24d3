//! Log routing and device notifications.
//!
//! Every device and source holds a clone of [`Hooks`], a cheap shared handle to the
//! context's current [`Options`]. Replacing the options on the context is therefore
//! visible to everything that logs or notifies, without passing the context around.
//!
//! Messages below the configured [`LogLevel`] are dropped before formatting reaches the
//! sink. The sink is one of:
//! - [`LogSink::Null`]: discard (default)
//! - [`LogSink::Stderr`]: `multi-input: {level}: {message}` on standard error
//! - [`LogSink::Facade`]: forward to the [`log`] crate (target `minput`)
//! - [`LogSink::Custom`]: a host closure
//!
//! Host callbacks must not call back into the context; doing so is undefined.

use crate::device::{DeviceId, DeviceInfo};
use crate::event::DeviceEvent;
use crate::options::Options;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Log severity, lowest first.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warning = 3,
    Error = 4,
}

impl LogLevel {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(LogLevel::Verbose),
            1 => Some(LogLevel::Debug),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Warning),
            4 => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    fn to_facade(self) -> log::Level {
        match self {
            LogLevel::Verbose => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-provided log callback.
pub type LogCallback = Rc<dyn Fn(LogLevel, &str)>;

/// Where log lines go.
#[derive(Clone, Default)]
pub enum LogSink {
    #[default]
    Null,
    Stderr,
    Facade,
    Custom(LogCallback),
}

impl LogSink {
    pub fn write(&self, level: LogLevel, message: &str) {
        match self {
            LogSink::Null => {}
            LogSink::Stderr => eprintln!("multi-input: {level}: {message}"),
            LogSink::Facade => log::log!(target: "minput", level.to_facade(), "{message}"),
            LogSink::Custom(callback) => callback(level, message),
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Null => f.write_str("Null"),
            LogSink::Stderr => f.write_str("Stderr"),
            LogSink::Facade => f.write_str("Facade"),
            LogSink::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Shared handle to the context's logging and notification configuration.
#[derive(Clone)]
pub struct Hooks {
    options: Rc<RefCell<Options>>,
}

impl Hooks {
    pub fn new(options: Options) -> Self {
        Self {
            options: Rc::new(RefCell::new(options)),
        }
    }

    /// A copy of the current options.
    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    pub fn set_options(&self, options: Options) {
        *self.options.borrow_mut() = options;
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.options.borrow().log_level()
    }

    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        // The sink is cloned out so a callback never runs under the borrow.
        let sink = {
            let options = self.options.borrow();
            if level < options.log_level() {
                return;
            }
            options.log_sink().clone()
        };
        sink.write(level, &args.to_string());
    }

    /// Invoke the device callback, if any.
    pub fn notify(&self, event: DeviceEvent, id: DeviceId, info: Option<&DeviceInfo>) {
        let callback = self.options.borrow().device_callback().cloned();
        if let Some(callback) = callback {
            callback(event, id, info);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("options", &*self.options.borrow())
            .finish()
    }
}

/// `log_at!(hooks, Warning, "device {} lost", id)`
macro_rules! log_at {
    ($hooks:expr, $level:ident, $($arg:tt)+) => {
        $hooks.log($crate::logger::LogLevel::$level, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn capture(level: LogLevel) -> (Hooks, Rc<RefCell<Vec<(LogLevel, String)>>>) {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = lines.clone();
        let mut options = Options::new();
        options.set_log_level(level);
        options.set_custom_log_sink(move |level, msg| sink.borrow_mut().push((level, msg.to_string())));
        (Hooks::new(options), lines)
    }

    #[test]
    fn threshold_filters_lower_levels() {
        let (hooks, lines) = capture(LogLevel::Warning);
        log_at!(hooks, Info, "dropped");
        log_at!(hooks, Warning, "kept {}", 1);
        log_at!(hooks, Error, "kept {}", 2);

        let lines = lines.borrow();
        assert_eq!(
            *lines,
            vec![
                (LogLevel::Warning, "kept 1".to_string()),
                (LogLevel::Error, "kept 2".to_string()),
            ]
        );
    }

    #[test]
    fn replacing_options_is_seen_by_every_clone() {
        let (hooks, lines) = capture(LogLevel::Error);
        let clone = hooks.clone();
        log_at!(clone, Info, "first");

        let mut options = hooks.options();
        options.set_log_level(LogLevel::Verbose);
        hooks.set_options(options);
        log_at!(clone, Info, "second");

        assert_eq!(lines.borrow().len(), 1);
        assert_eq!(lines.borrow()[0].1, "second");
    }

    #[test]
    fn levels_order_and_parse() {
        assert!(LogLevel::Verbose < LogLevel::Error);
        assert_eq!(LogLevel::from_raw(3), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_raw(7), None);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
