//! [`Registry`] – write-once subtype records and model constructors.
//!
//! The registry is an explicit object: the process builds one, hands it to
//! each subtype's `register` function in a fixed order during bootstrap, and
//! then only reads from it.  Registering the same subtype (or the same
//! subtype/model pair) twice is an error rather than a silent overwrite.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use motus_types::{ComponentConfig, MotusError, Subtype};
use tracing::debug;

use crate::collector::{Collector, CollectorParams};
use crate::reconfigurable::Reconfigurable;
use crate::resource::{Dependencies, Resource};
use crate::rpc::{RpcConn, RpcService, SubtypeService};

/// Wrap a raw implementation in the subtype's reconfigurable handle.
pub type WrapFn = fn(Resource) -> Result<Arc<dyn Reconfigurable>, MotusError>;

/// Produce a JSON status snapshot of a resource.
pub type StatusFn = for<'a> fn(&'a Resource) -> BoxFuture<'a, Result<serde_json::Value, MotusError>>;

/// Build the server adapter that routes inbound calls to local resources.
pub type ServerFactory = fn(SubtypeService) -> Arc<dyn RpcService>;

/// Build a client implementing the subtype's interface over `conn`.
pub type ClientFactory = fn(Arc<dyn RpcConn>, &str) -> Resource;

/// Build a periodic capture of one method of a resource.
pub type CollectorFactory = fn(&Resource, CollectorParams) -> Result<Collector, MotusError>;

/// Construct a raw implementation of one model from its config.
pub type Constructor =
    Arc<dyn Fn(&Dependencies, &ComponentConfig) -> Result<Resource, MotusError> + Send + Sync>;

/// Everything the runtime needs to know about one subtype.
#[derive(Clone)]
pub struct SubtypeRegistration {
    pub reconfigurable: WrapFn,
    pub status: StatusFn,
    pub rpc_server: ServerFactory,
    pub rpc_client: ClientFactory,
    /// Method name → collector factory.
    pub collectors: HashMap<String, CollectorFactory>,
}

/// Central lookup table populated once at bootstrap.
#[derive(Default)]
pub struct Registry {
    subtypes: HashMap<Subtype, SubtypeRegistration>,
    components: HashMap<(Subtype, String), Constructor>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the registration of `subtype`.
    ///
    /// # Errors
    ///
    /// [`MotusError::DuplicateRegistration`] if `subtype` is already present.
    pub fn register_subtype(
        &mut self,
        subtype: Subtype,
        registration: SubtypeRegistration,
    ) -> Result<(), MotusError> {
        if self.subtypes.contains_key(&subtype) {
            return Err(MotusError::DuplicateRegistration(subtype.to_string()));
        }
        debug!(subtype = %subtype, "registered resource subtype");
        self.subtypes.insert(subtype, registration);
        Ok(())
    }

    /// Look up the registration of `subtype`.
    pub fn lookup_subtype(&self, subtype: &Subtype) -> Result<&SubtypeRegistration, MotusError> {
        self.subtypes
            .get(subtype)
            .ok_or_else(|| MotusError::NotFound(subtype.to_string()))
    }

    /// Record the constructor for `model` of `subtype`.
    pub fn register_component(
        &mut self,
        subtype: Subtype,
        model: impl Into<String>,
        constructor: Constructor,
    ) -> Result<(), MotusError> {
        let key = (subtype, model.into());
        if self.components.contains_key(&key) {
            return Err(MotusError::DuplicateRegistration(format!("{}/{}", key.0, key.1)));
        }
        debug!(subtype = %key.0, model = %key.1, "registered component model");
        self.components.insert(key, constructor);
        Ok(())
    }

    /// Look up the constructor for `model` of `subtype`.
    pub fn lookup_component(&self, subtype: &Subtype, model: &str) -> Result<&Constructor, MotusError> {
        self.components
            .get(&(subtype.clone(), model.to_string()))
            .ok_or_else(|| MotusError::NotFound(format!("{subtype}/{model}")))
    }

    /// Every registered subtype, in no particular order.
    pub fn subtypes(&self) -> impl Iterator<Item = &Subtype> {
        self.subtypes.keys()
    }
}
