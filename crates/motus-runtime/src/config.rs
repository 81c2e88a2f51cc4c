//! Robot configuration – reads the component list from a TOML file.
//!
//! ```toml
//! name = "bench"
//!
//! [[components]]
//! name = "arm1"
//! type = "arm"
//! model = "fake"
//! attributes = { joints = 3, link_length_mm = 120.0 }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use motus_types::{ComponentConfig, MotusError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Env var naming the config file.
pub const CONFIG_PATH_VAR: &str = "MOTUS_CONFIG";

/// Env var overriding [`RobotConfig::name`].
pub const ROBOT_NAME_VAR: &str = "MOTUS_ROBOT_NAME";

/// The components of one robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RobotConfig {
    /// Also used as the name of the robot-wide frame system.
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

fn default_name() -> String {
    "robot".to_string()
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            components: Vec::new(),
        }
    }
}

impl RobotConfig {
    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, MotusError> {
        let cfg: Self = toml::from_str(raw).map_err(|e| MotusError::Config(format!("failed to parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Component names must be unique and no component may depend on itself.
    pub fn validate(&self) -> Result<(), MotusError> {
        let mut seen = HashSet::new();
        for c in &self.components {
            if !seen.insert(c.name.as_str()) {
                return Err(MotusError::Config(format!("duplicate component name '{}'", c.name)));
            }
            if c.depends_on.iter().any(|d| d == &c.name) {
                return Err(MotusError::Config(format!("component '{}' depends on itself", c.name)));
            }
        }
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&ComponentConfig> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// JSON schema of the config file.
pub fn schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(RobotConfig)).unwrap_or_default()
}

/// `$MOTUS_CONFIG`, or `motus.toml` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("motus.toml"))
}

/// Load the config from [`config_path`].  `Ok(None)` if the file is absent.
pub fn load() -> Result<Option<RobotConfig>, MotusError> {
    load_from(&config_path())
}

/// Load the config from `path`.  `Ok(None)` if the file is absent.
pub fn load_from(path: &Path) -> Result<Option<RobotConfig>, MotusError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| MotusError::Config(format!("failed to read config at {}: {e}", path.display())))?;
    let mut cfg = RobotConfig::from_toml(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `MOTUS_*` environment overrides.
///
/// | Variable | Field |
/// |---|---|
/// | `MOTUS_ROBOT_NAME` | `name` |
pub fn apply_env_overrides(cfg: &mut RobotConfig) {
    if let Ok(v) = std::env::var(ROBOT_NAME_VAR)
        && !v.is_empty()
    {
        cfg.name = v;
    }
}
