use std::path::Path;

use serde::Deserialize;

use super::AppCore;

/// Optional overrides read from `lanchat_config.json` in the data dir.
/// A missing or unparseable file falls back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct CoreConfig {
    /// Name stamped on locally authored messages.
    pub(super) display_name: Option<String>,
}

pub(super) fn load_core_config(data_dir: &str) -> CoreConfig {
    let path = Path::new(data_dir).join("lanchat_config.json");
    let Ok(bytes) = std::fs::read(&path) else {
        return CoreConfig::default();
    };
    serde_json::from_slice::<CoreConfig>(&bytes).unwrap_or_default()
}

impl AppCore {
    pub(super) fn display_name(&self) -> String {
        self.config
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "You".to_string())
    }
}
