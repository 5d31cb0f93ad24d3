//! Context configuration.
//!
//! [`Options`] carries the log threshold, the log sink and the device callback. It is a
//! plain value: clone it, tweak it, hand it to [`Context::new`](crate::context::Context::new)
//! or [`Context::set_options`](crate::context::Context::set_options).
//!
//! The serializable part (threshold and built-in sinks) can also come from TOML:
//!
//! ```
//! use minput::{LogLevel, Options};
//!
//! let options = Options::from_toml_str(r#"
//!     log_level = "debug"
//!     log_sink = "stderr"
//! "#).unwrap();
//! assert_eq!(options.log_level(), LogLevel::Debug);
//! ```

use crate::device::{DeviceId, DeviceInfo};
use crate::error::Result;
use crate::event::DeviceEvent;
use crate::logger::{LogLevel, LogSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Host-provided device lifecycle callback. `info` is `None` for removals.
pub type DeviceCallback = Rc<dyn Fn(DeviceEvent, DeviceId, Option<&DeviceInfo>)>;

#[derive(Clone, Default)]
pub struct Options {
    log_level: LogLevel,
    log_sink: LogSink,
    device_callback: Option<DeviceCallback>,
}

impl Options {
    /// Info threshold, discarding sink, no device callback.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.log_sink
    }

    pub fn device_callback(&self) -> Option<&DeviceCallback> {
        self.device_callback.as_ref()
    }

    pub fn set_log_level(&mut self, level: LogLevel) -> &mut Self {
        self.log_level = level;
        self
    }

    pub fn set_null_log_sink(&mut self) -> &mut Self {
        self.log_sink = LogSink::Null;
        self
    }

    pub fn set_stderr_log_sink(&mut self) -> &mut Self {
        self.log_sink = LogSink::Stderr;
        self
    }

    /// Route log lines into the `log` crate.
    pub fn set_log_facade_sink(&mut self) -> &mut Self {
        self.log_sink = LogSink::Facade;
        self
    }

    pub fn set_custom_log_sink(&mut self, sink: impl Fn(LogLevel, &str) + 'static) -> &mut Self {
        self.log_sink = LogSink::Custom(Rc::new(sink));
        self
    }

    pub fn set_device_callback(
        &mut self,
        callback: impl Fn(DeviceEvent, DeviceId, Option<&DeviceInfo>) + 'static,
    ) -> &mut Self {
        self.device_callback = Some(Rc::new(callback));
        self
    }

    pub fn set_null_device_callback(&mut self) -> &mut Self {
        self.device_callback = None;
        self
    }

    pub fn from_config(config: &OptionsConfig) -> Self {
        let mut options = Self::new();
        options.set_log_level(config.log_level);
        options.log_sink = match config.log_sink {
            SinkKind::Null => LogSink::Null,
            SinkKind::Stderr => LogSink::Stderr,
            SinkKind::Log => LogSink::Facade,
        };
        options
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: OptionsConfig = toml::from_str(text)?;
        Ok(Self::from_config(&config))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("log_level", &self.log_level)
            .field("log_sink", &self.log_sink)
            .field("device_callback", &self.device_callback.is_some())
            .finish()
    }
}

/// Built-in sinks selectable from a config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Null,
    Stderr,
    Log,
}

/// On-disk form of [`Options`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    pub log_level: LogLevel,
    pub log_sink: SinkKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_an_empty_config() {
        let options = Options::from_toml_str("").unwrap();
        assert_eq!(options.log_level(), LogLevel::Info);
        assert!(matches!(options.log_sink(), LogSink::Null));
        assert!(options.device_callback().is_none());
    }

    #[test]
    fn config_selects_level_and_sink() {
        let options = Options::from_toml_str("log_level = \"verbose\"\nlog_sink = \"log\"\n").unwrap();
        assert_eq!(options.log_level(), LogLevel::Verbose);
        assert!(matches!(options.log_sink(), LogSink::Facade));
    }

    #[test]
    fn unknown_keys_and_levels_are_rejected() {
        assert!(Options::from_toml_str("log_levl = \"info\"").is_err());
        assert!(Options::from_toml_str("log_level = \"loud\"").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"error\"").unwrap();
        let options = Options::from_toml_file(file.path()).unwrap();
        assert_eq!(options.log_level(), LogLevel::Error);
    }

    #[test]
    fn setters_chain() {
        let mut options = Options::new();
        options
            .set_log_level(LogLevel::Debug)
            .set_stderr_log_sink()
            .set_device_callback(|_, _, _| {});
        assert_eq!(options.log_level(), LogLevel::Debug);
        assert!(matches!(options.log_sink(), LogSink::Stderr));
        assert!(options.device_callback().is_some());

        options.set_null_device_callback().set_null_log_sink();
        assert!(options.device_callback().is_none());
        assert!(matches!(options.log_sink(), LogSink::Null));
    }
}
