use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Capabilities the host hands to every surface invocation.
pub trait PluginContext {
    fn log(&self, level: LogLevel, message: &str, metadata: &Value);
    fn output(&mut self) -> &mut dyn Write;
    /// Request id assigned by the host, for REST invocations.
    fn request_id(&self) -> Option<&str> {
        None
    }
}

/// Default context: logs through `tracing`, writes to any sink.
pub struct TracingContext<W> {
    surface: &'static str,
    request_id: Option<String>,
    out: W,
}

impl<W: Write> TracingContext<W> {
    pub fn new(surface: &'static str, out: W) -> Self {
        Self {
            surface,
            request_id: None,
            out,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PluginContext for TracingContext<W> {
    fn log(&self, level: LogLevel, message: &str, metadata: &Value) {
        let request_id = self.request_id.as_deref().unwrap_or("-");
        match level {
            LogLevel::Debug => {
                tracing::debug!(surface = self.surface, request_id, %metadata, "{message}")
            }
            LogLevel::Info => {
                tracing::info!(surface = self.surface, request_id, %metadata, "{message}")
            }
            LogLevel::Warn => {
                tracing::warn!(surface = self.surface, request_id, %metadata, "{message}")
            }
            LogLevel::Error => {
                tracing::error!(surface = self.surface, request_id, %metadata, "{message}")
            }
        }
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Context that records log lines and buffers output for assertions.
    #[derive(Default)]
    pub struct RecordingContext {
        pub logs: RefCell<Vec<(LogLevel, String, Value)>>,
        pub out: Vec<u8>,
        pub request_id: Option<String>,
    }

    impl RecordingContext {
        pub fn output_text(&self) -> String {
            String::from_utf8_lossy(&self.out).into_owned()
        }
    }

    impl PluginContext for RecordingContext {
        fn log(&self, level: LogLevel, message: &str, metadata: &Value) {
            self.logs
                .borrow_mut()
                .push((level, message.to_string(), metadata.clone()));
        }

        fn output(&mut self) -> &mut dyn Write {
            &mut self.out
        }

        fn request_id(&self) -> Option<&str> {
            self.request_id.as_deref()
        }
    }
}
