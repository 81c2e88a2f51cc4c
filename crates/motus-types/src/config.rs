//! Component configuration as it arrives from the robot config.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::name::{ResourceKind, ResourceName, Subtype, NAMESPACE_RDK};
use crate::{Extra, MotusError};

/// Declarative description of one component.
///
/// ```toml
/// [[components]]
/// name = "arm1"
/// type = "arm"
/// model = "fake"
/// depends_on = ["board1"]
/// attributes = { joints = 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComponentConfig {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Subtype name, e.g. `"arm"` or `"motor"`.
    #[serde(rename = "type")]
    pub subtype: String,

    /// Driver model, e.g. `"fake"`.
    pub model: String,

    /// Instance names of the components this one is wired to.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Model-specific attributes; decoded by the model constructor.
    #[serde(default)]
    pub attributes: Extra,
}

fn default_namespace() -> String {
    NAMESPACE_RDK.to_string()
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>, subtype: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            subtype: subtype.into(),
            model: model.into(),
            depends_on: Vec::new(),
            attributes: Extra::new(),
        }
    }

    pub fn subtype(&self) -> Subtype {
        Subtype::new(self.namespace.clone(), ResourceKind::Component, self.subtype.clone())
    }

    pub fn resource_name(&self) -> ResourceName {
        self.subtype().named(self.name.clone())
    }

    /// Decode `attributes` into the model's typed attribute struct.
    pub fn attributes_as<T: DeserializeOwned>(&self) -> Result<T, MotusError> {
        serde_json::from_value(serde_json::Value::Object(self.attributes.clone())).map_err(|e| {
            MotusError::Config(format!("invalid attributes for '{}': {e}", self.name))
        })
    }
}

/// How an existing resource should absorb a changed config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    /// Nothing relevant changed.
    None,
    /// Build a new implementation and swap it into the existing handle.
    #[default]
    Reconfigure,
    /// Discard the handle entirely and construct a new one.
    Rebuild,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Attrs {
        joints: usize,
    }

    #[test]
    fn component_config_defaults_namespace() {
        let cfg: ComponentConfig =
            serde_json::from_str(r#"{"name":"arm1","type":"arm","model":"fake"}"#).unwrap();
        assert_eq!(cfg.namespace, "rdk");
        assert!(cfg.depends_on.is_empty());
        assert_eq!(cfg.resource_name().to_string(), "rdk:component:arm/arm1");
    }

    #[test]
    fn attributes_decode_into_typed_struct() {
        let mut cfg = ComponentConfig::new("arm1", "arm", "fake");
        cfg.attributes.insert("joints".into(), serde_json::json!(6));
        let attrs: Attrs = cfg.attributes_as().unwrap();
        assert_eq!(attrs.joints, 6);
    }

    #[test]
    fn bad_attributes_are_config_errors() {
        let mut cfg = ComponentConfig::new("arm1", "arm", "fake");
        cfg.attributes.insert("joints".into(), serde_json::json!("six"));
        let result: Result<Attrs, _> = cfg.attributes_as();
        assert!(matches!(result, Err(MotusError::Config(_))));
    }
}
