pub mod cli;
pub mod config;
pub mod greeting;
pub mod plugin;
pub mod rest;
pub mod setup;

use template_contracts::{LookupError, PluginContracts};

/// Returns the crate version baked in at compile time.
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Every surface the plugin registers with a host, bound to one manifest.
#[derive(Debug, Clone)]
pub struct Surfaces {
    pub hello_command: cli::HelloCommand,
    pub hello_route: rest::HelloRoute,
}

impl Surfaces {
    /// Resolves every identifier the surfaces use. Call this while loading the
    /// plugin so undeclared ids surface before any request is served.
    pub fn bind(contracts: &PluginContracts) -> Result<Self, LookupError> {
        Ok(Self {
            hello_command: cli::HelloCommand::new(contracts)?,
            hello_route: rest::HelloRoute::new(contracts)?,
        })
    }
}
