use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

pub const ENV_BREAK_BEFORE_TOOL_CALL: &str = "FORGE_DEBUG_BREAK_BEFORE_TOOL_CALL";
pub const ENV_BREAK_AFTER_TOOL_CALL: &str = "FORGE_DEBUG_BREAK_AFTER_TOOL_CALL";
pub const ENV_BREAK_BEFORE_SUBAGENT_CALL: &str = "FORGE_DEBUG_BREAK_BEFORE_SUBAGENT_CALL";
pub const ENV_BREAK_AFTER_SUBAGENT_CALL: &str = "FORGE_DEBUG_BREAK_AFTER_SUBAGENT_CALL";

/// The four global tool-call toggles. Subagent and ordinary-tool toggles are independent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCallBreakSettings {
    pub break_before_tool_call: bool,
    pub break_after_tool_call: bool,
    pub break_before_subagent_call: bool,
    pub break_after_subagent_call: bool,
}

impl ToolCallBreakSettings {
    pub fn before(&self, subagent: bool) -> bool {
        if subagent {
            self.break_before_subagent_call
        } else {
            self.break_before_tool_call
        }
    }

    pub fn after(&self, subagent: bool) -> bool {
        if subagent {
            self.break_after_subagent_call
        } else {
            self.break_after_tool_call
        }
    }

    pub fn any(&self) -> bool {
        self.break_before_tool_call
            || self.break_after_tool_call
            || self.break_before_subagent_call
            || self.break_after_subagent_call
    }
}

/// Read-only boolean source consulted by the tool-call gate on every evaluation.
pub trait SettingsSource: Send + Sync {
    fn tool_call_breaks(&self) -> ToolCallBreakSettings;
}

impl SettingsSource for ToolCallBreakSettings {
    fn tool_call_breaks(&self) -> ToolCallBreakSettings {
        *self
    }
}

/// Settings that a UI layer can flip while a loop is running.
#[derive(Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<ToolCallBreakSettings>>,
}

impl SharedSettings {
    pub fn new(settings: ToolCallBreakSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut ToolCallBreakSettings),
    {
        let mut guard = self.inner.write().expect("settings lock poisoned");
        apply(&mut *guard);
    }
}

impl SettingsSource for SharedSettings {
    fn tool_call_breaks(&self) -> ToolCallBreakSettings {
        *self.inner.read().expect("settings lock poisoned")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub tool_calls: ToolCallBreakSettings,
}

impl DebugConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        debug!(path = %path.display(), "loaded debug config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    /// Applies `FORGE_DEBUG_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let toggles = &mut self.tool_calls;
        for (key, slot) in [
            (ENV_BREAK_BEFORE_TOOL_CALL, &mut toggles.break_before_tool_call),
            (ENV_BREAK_AFTER_TOOL_CALL, &mut toggles.break_after_tool_call),
            (
                ENV_BREAK_BEFORE_SUBAGENT_CALL,
                &mut toggles.break_before_subagent_call,
            ),
            (
                ENV_BREAK_AFTER_SUBAGENT_CALL,
                &mut toggles.break_after_subagent_call,
            ),
        ] {
            let Some(raw) = lookup(key) else {
                continue;
            };
            match parse_bool(&raw) {
                Some(value) => *slot = value,
                None => warn!(key, value = %raw, "ignoring non-boolean override"),
            }
        }
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn debug_config_defaults_disable_every_toggle() {
        let config = DebugConfig::default();
        assert!(!config.tool_calls.any());
    }

    #[test]
    fn partial_toml_fills_missing_toggles_with_defaults() {
        let config = DebugConfig::from_toml_str(
            r#"
            [tool_calls]
            break_before_subagent_call = true
            "#,
        )
        .expect("config should parse");
        assert!(config.tool_calls.break_before_subagent_call);
        assert!(!config.tool_calls.break_before_tool_call);
        assert!(config.tool_calls.before(true));
        assert!(!config.tool_calls.before(false));
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let err = DebugConfig::from_toml_str("[tool_calls]\nbreak_after_tool_call = \"maybe\"")
            .expect_err("non-boolean toggle should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_path_reads_file_and_reports_missing_file() {
        let dir = tempdir().expect("temp dir should be created");
        let path = dir.path().join("debug.toml");
        std::fs::write(&path, "[tool_calls]\nbreak_after_tool_call = true\n")
            .expect("config should write");

        let config = DebugConfig::load_from_path(&path).expect("config should load");
        assert!(config.tool_calls.break_after_tool_call);

        let missing = DebugConfig::load_from_path(&dir.path().join("missing.toml"))
            .expect_err("missing file should fail");
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn overrides_apply_booleans_and_ignore_garbage() {
        let env = HashMap::from([
            (ENV_BREAK_BEFORE_TOOL_CALL, "yes"),
            (ENV_BREAK_AFTER_SUBAGENT_CALL, "sometimes"),
        ]);
        let config = DebugConfig::default()
            .with_overrides_from(|key| env.get(key).map(|value| value.to_string()));
        assert!(config.tool_calls.break_before_tool_call);
        assert!(!config.tool_calls.break_after_subagent_call);
    }

    #[test]
    fn shared_settings_updates_are_visible_to_readers() {
        let shared = SharedSettings::default();
        let reader: Arc<dyn SettingsSource> = Arc::new(shared.clone());
        assert!(!reader.tool_call_breaks().break_after_tool_call);

        shared.update(|settings| settings.break_after_tool_call = true);
        assert!(reader.tool_call_breaks().break_after_tool_call);
    }

    #[test]
    fn config_round_trips_through_toml_text() {
        let mut config = DebugConfig::default();
        config.tool_calls.break_before_tool_call = true;
        let text = config.to_toml_string().expect("config should serialize");
        assert!(text.contains("break_before_tool_call = true"));
    }
}
