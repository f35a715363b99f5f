// Configuration for the annotation bridge.
//
// Global config: `~/.annotator/config.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frames::debounce::DEFAULT_DEBOUNCE_MS;
use crate::frames::DEFAULT_OPT_IN_ATTRIBUTE;

/// Root directory for annotator state: `~/.annotator/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".annotator"))
}

/// Path to the global config file: `~/.annotator/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub frames: FramesConfig,
    pub rpc: RpcConfig,
    pub broker: BrokerConfig,
    pub anchoring: AnchoringConfig,
}

impl BridgeConfig {
    /// Load from `~/.annotator/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|path| Self::load_from(&path).ok()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Frame discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FramesConfig {
    /// Presence attribute marking iframes as annotatable.
    pub opt_in_attribute: String,
    /// Mutation debounce window in milliseconds (at most 500).
    pub debounce_ms: u64,
    /// How often a loading frame is re-checked, in milliseconds.
    pub ready_poll_ms: u64,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            opt_in_attribute: DEFAULT_OPT_IN_ATTRIBUTE.into(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ready_poll_ms: 50,
        }
    }
}

/// Window-level JSON-RPC settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RpcConfig {
    /// Origins whose requests the JSON-RPC server answers.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BrokerConfig {
    /// Reject channel grants from origins other than the requested host.
    pub strict_connection_origin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnchoringConfig {
    /// Characters of prefix and suffix captured in quote selectors.
    pub context_len: usize,
}

impl Default for AnchoringConfig {
    fn default() -> Self {
        Self { context_len: annotator_common::anchoring::DEFAULT_CONTEXT_LEN }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.frames.opt_in_attribute, "enable-annotation");
        assert_eq!(cfg.frames.debounce_ms, 40);
        assert_eq!(cfg.frames.ready_poll_ms, 50);
        assert!(cfg.rpc.allowed_origins.is_empty());
        assert!(!cfg.broker.strict_connection_origin);
        assert_eq!(cfg.anchoring.context_len, 32);
    }

    #[test]
    fn roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = BridgeConfig {
            frames: FramesConfig { opt_in_attribute: "data-annotate".into(), debounce_ms: 100, ready_poll_ms: 20 },
            rpc: RpcConfig { allowed_origins: vec!["https://sidebar.example".into()] },
            broker: BrokerConfig { strict_connection_origin: true },
            anchoring: AnchoringConfig { context_len: 16 },
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(BridgeConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml_str = r#"
[frames]
debounce_ms = 10

[broker]
strict_connection_origin = true
"#;
        let cfg: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.frames.debounce_ms, 10);
        assert_eq!(cfg.frames.opt_in_attribute, "enable-annotation");
        assert!(cfg.broker.strict_connection_origin);
        assert_eq!(cfg.anchoring, AnchoringConfig::default());
    }

    #[test]
    fn rpc_section_rejects_unknown_keys() {
        let toml_str = r#"
[rpc]
allowed_origin = "https://typo.example"
"#;
        let error = toml::from_str::<BridgeConfig>(toml_str).expect_err("parse should fail");
        assert!(error.to_string().contains("unknown field `allowed_origin`"));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = BridgeConfig::load_from(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn global_dir_is_under_home() {
        let dir = global_dir().expect("home directory should resolve");
        assert!(dir.ends_with(".annotator"));
    }
}
