//! Resource identifiers.
//!
//! A [`Subtype`] names a family of resources (`rdk:component:arm`); a
//! [`ResourceName`] adds the instance name (`rdk:component:arm/arm1`).  Both
//! are immutable once built and are used as hash-map keys throughout the
//! runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MotusError;

/// Namespace of every built-in subtype.
pub const NAMESPACE_RDK: &str = "rdk";

/// Broad category of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Physical hardware: arms, motors, boards, sensors.
    Component,
    /// Software services built on top of components.
    Service,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Component => "component",
            ResourceKind::Service => "service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = MotusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "component" => Ok(ResourceKind::Component),
            "service" => Ok(ResourceKind::Service),
            other => Err(MotusError::Config(format!("unknown resource kind '{other}'"))),
        }
    }
}

/// `(namespace, kind, subtype)` triple that keys the resource registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subtype {
    namespace: String,
    kind: ResourceKind,
    name: String,
}

impl Subtype {
    pub fn new(namespace: impl Into<String>, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            name: name.into(),
        }
    }

    /// A component subtype in the [`NAMESPACE_RDK`] namespace.
    pub fn component(name: impl Into<String>) -> Self {
        Self::new(NAMESPACE_RDK, ResourceKind::Component, name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the [`ResourceName`] of the instance called `name`.
    pub fn named(&self, name: impl Into<String>) -> ResourceName {
        ResourceName {
            subtype: self.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.kind, self.name)
    }
}

/// Unique identity of one running resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceName {
    subtype: Subtype,
    name: String,
}

impl ResourceName {
    pub fn subtype(&self) -> &Subtype {
        &self.subtype
    }

    /// The instance name, e.g. `"arm1"`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subtype, self.name)
    }
}

impl FromStr for ResourceName {
    type Err = MotusError;

    /// Parse the canonical `namespace:kind:subtype/name` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MotusError::Config(format!("malformed resource name '{s}'"));

        let (triple, name) = s.split_once('/').ok_or_else(malformed)?;
        let mut parts = triple.splitn(3, ':');
        let (Some(namespace), Some(kind), Some(subtype)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if namespace.is_empty() || subtype.is_empty() || name.is_empty() {
            return Err(malformed());
        }
        Ok(Subtype::new(namespace, kind.parse()?, subtype).named(name))
    }
}
