//! CLI configuration loading and merging.

use anyhow::Context;
use restora_core::RestoraConfig;
use std::path::Path;

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Explicit config file (--config), or
///    local config file (./.restorarc) over global config file (~/.restora/config.toml)
/// 4. Defaults
pub fn load_config(explicit: Option<&Path>, overrides: Overrides) -> anyhow::Result<RestoraConfig> {
    let mut config = match explicit {
        Some(path) => RestoraConfig::load_explicit(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RestoraConfig::discover_and_load(),
    };

    config.merge(&RestoraConfig {
        api_key: overrides.api_key,
        model: overrides.model,
        base_url: overrides.base_url,
        ..Default::default()
    });

    config.validate()?;
    Ok(config)
}
