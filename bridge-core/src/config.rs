//! Bridge configuration.
//!
//! Settings are fixed at host-setup time. They can be built in code or
//! loaded from JSON:
//!
//! ```rust,ignore
//! let config = BridgeConfig::from_json(r#"{ "binding_handler_name": "component" }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_binding_handler_name() -> String {
    "reactComponent".to_string()
}

fn default_shorthand_syntax() -> bool {
    true
}

fn default_max_update_depth() -> usize {
    50
}

/// Host-wide settings for the component host and the markup adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Binding name the component binding handler is registered under.
    #[serde(default = "default_binding_handler_name")]
    pub binding_handler_name: String,

    /// Install the `<!-- react: Name props -->` comment preprocessor.
    #[serde(default = "default_shorthand_syntax")]
    pub shorthand_syntax: bool,

    /// Render passes allowed in one flush before it is treated as a loop.
    #[serde(default = "default_max_update_depth")]
    pub max_update_depth: usize,
}

impl BridgeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            binding_handler_name: default_binding_handler_name(),
            shorthand_syntax: default_shorthand_syntax(),
            max_update_depth: default_max_update_depth(),
        }
    }
}
