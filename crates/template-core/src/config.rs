use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::greeting::GreetingInput;

pub const DEFAULT_OUTPUT_DIR: &str = ".kb/template/output";

/// Plugin configuration deserialized from TOML (or the JSON config section
/// seeded by setup).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    pub greeting: GreetingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GreetingConfig {
    /// Name greeted when a surface receives none.
    pub default_name: Option<String>,
    /// Fixed message replacing `Hello, {target}!` in CLI output.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    /// Emit JSON from the CLI without `--json`.
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_OUTPUT_DIR.into(),
            json: false,
        }
    }
}

impl PluginConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output.directory.trim().is_empty() {
            bail!("output.directory must not be empty");
        }
        if let Some(message) = &self.greeting.message {
            if message.trim().is_empty() {
                bail!("greeting.message must contain text when set");
            }
        }
        Ok(())
    }

    /// Fills whatever the caller left out with configured defaults.
    pub fn greeting_input(&self, name: Option<String>, message: Option<String>) -> GreetingInput {
        GreetingInput {
            name: name.or_else(|| self.greeting.default_name.clone()),
            message: message.or_else(|| self.greeting.message.clone()),
        }
    }
}
