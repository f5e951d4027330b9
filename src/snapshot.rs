//! Immutable per-environment configuration snapshots.
//!
//! The snapshot builder derives two payloads from the host's environment
//! config: the full merged snapshot consumed by the sandbox at render time,
//! and the minimal subset embedded for browser consumption. The input
//! config is never mutated; later build phases may re-read it.

use serde_json::{Map, Value};

use crate::errors::ConfigError;

/// Output-tree-relative path of the serialized snapshot.
pub const CONFIG_SNAPSHOT_FILE: &str = "fastboot-config.json";

/// Reserved top-level key holding sandbox-only configuration. It is kept in
/// the snapshot file but never shipped to the browser.
pub const SANDBOX_SECTION: &str = "fastboot";

/// The merged configuration for one environment, with automatic startup
/// forced off. The sandboxed instance must never self-start; the host
/// explicitly creates and boots each render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    env: String,
    full: Value,
    browser: Value,
}

impl ConfigSnapshot {
    /// Build a snapshot from the host's environment config.
    ///
    /// The override is applied to a derived copy: `project_config` is left
    /// untouched. A non-object root or non-object `APP` section is fatal,
    /// never defaulted, since shipping a wrong `autoboot` value causes
    /// duplicate or missing application startup.
    pub fn build(env: &str, project_config: &Value) -> Result<Self, ConfigError> {
        let Value::Object(config) = project_config else {
            return Err(ConfigError::NotAnObject {
                env: env.to_string(),
            });
        };

        let mut full = config.clone();

        let app = full
            .entry("APP".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(app) = app else {
            return Err(ConfigError::AppNotAnObject {
                env: env.to_string(),
            });
        };
        app.insert("autoboot".to_string(), Value::Bool(false));

        let mut browser = Map::new();
        if let Some(prefix) = full.get("modulePrefix") {
            browser.insert("modulePrefix".to_string(), prefix.clone());
        }
        if let Some(app) = full.get("APP") {
            browser.insert("APP".to_string(), app.clone());
        }

        Ok(Self {
            env: env.to_string(),
            full: Value::Object(full),
            browser: Value::Object(browser),
        })
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// The full merged configuration, including the sandbox-only section.
    pub fn full(&self) -> &Value {
        &self.full
    }

    /// The minimal subset embedded for browser consumption.
    pub fn browser(&self) -> &Value {
        &self.browser
    }

    /// Sandbox-only section, if the environment configures one.
    pub fn sandbox_section(&self) -> Option<&Value> {
        self.full.get(SANDBOX_SECTION)
    }

    /// Serialize the full snapshot for the output tree.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(&self.full).map_err(ConfigError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> Value {
        json!({
            "modulePrefix": "my-app",
            "environment": "production",
            "APP": { "autoboot": true, "version": "1.2.3" },
            "apiHost": "https://api.example.com",
            "fastboot": { "hostWhitelist": ["example.com"] }
        })
    }

    #[test]
    fn test_autoboot_is_always_forced_false() {
        let snapshot = ConfigSnapshot::build("production", &sample_config()).unwrap();
        assert_eq!(snapshot.full()["APP"]["autoboot"], json!(false));

        // Also when the input never set it.
        let snapshot = ConfigSnapshot::build("test", &json!({ "APP": {} })).unwrap();
        assert_eq!(snapshot.full()["APP"]["autoboot"], json!(false));
    }

    #[test]
    fn test_app_section_created_when_absent() {
        let snapshot = ConfigSnapshot::build("test", &json!({ "modulePrefix": "x" })).unwrap();
        assert_eq!(snapshot.full()["APP"]["autoboot"], json!(false));
    }

    #[test]
    fn test_input_config_is_never_mutated() {
        let config = sample_config();
        let before = config.clone();
        let _snapshot = ConfigSnapshot::build("production", &config).unwrap();
        assert_eq!(config, before);
        // In particular the original autoboot value survives.
        assert_eq!(config["APP"]["autoboot"], json!(true));
    }

    #[test]
    fn test_env_specific_keys_survive_in_full_snapshot() {
        let snapshot = ConfigSnapshot::build("production", &sample_config()).unwrap();
        assert_eq!(snapshot.full()["apiHost"], json!("https://api.example.com"));
        assert_eq!(snapshot.env(), "production");
    }

    #[test]
    fn test_sandbox_section_split_out_of_browser_subset() {
        let snapshot = ConfigSnapshot::build("production", &sample_config()).unwrap();
        assert_eq!(
            snapshot.sandbox_section(),
            Some(&json!({ "hostWhitelist": ["example.com"] }))
        );
        assert!(snapshot.browser().get(SANDBOX_SECTION).is_none());
        assert!(snapshot.browser().get("apiHost").is_none());
        assert_eq!(snapshot.browser()["modulePrefix"], json!("my-app"));
        assert_eq!(snapshot.browser()["APP"]["autoboot"], json!(false));
    }

    #[test]
    fn test_non_object_root_is_fatal() {
        let err = ConfigSnapshot::build("production", &json!("not an object")).unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject { .. }));
    }

    #[test]
    fn test_non_object_app_section_is_fatal() {
        let err = ConfigSnapshot::build("production", &json!({ "APP": 42 })).unwrap_err();
        assert!(matches!(err, ConfigError::AppNotAnObject { .. }));
    }

    #[test]
    fn test_serialized_snapshot_round_trips() {
        let snapshot = ConfigSnapshot::build("production", &sample_config()).unwrap();
        let parsed: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(&parsed, snapshot.full());
    }
}
