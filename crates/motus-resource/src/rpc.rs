//! Subtype-agnostic halves of the RPC layer.
//!
//! The wire encoding and transport are not this crate's concern.  A request
//! is an [`RpcRequest`] envelope with a JSON payload; a server adapter is an
//! [`RpcService`]; a client talks through an [`RpcConn`].  Errors travel as
//! [`MotusError`] values so a remote caller sees the same variant a local
//! caller would.
//!
//! [`LoopbackConn`] dispatches to services mounted in the same process and
//! pushes every request and response through JSON on the way, which is enough
//! to prove that remoting is transparent to callers of a capability
//! interface.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use motus_types::{MotusError, Subtype};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::resource::Resource;

/// One inbound or outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: Uuid,
    /// Instance name of the target resource, e.g. `"arm1"`.
    pub resource: String,
    /// Capability method, e.g. `"end_position"`.
    pub method: String,
    #[serde(default)]
    pub payload: Value,
}

impl RpcRequest {
    pub fn new(resource: impl Into<String>, method: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource: resource.into(),
            method: method.into(),
            payload,
        }
    }
}

/// Server adapter translating inbound calls into capability calls.
#[async_trait]
pub trait RpcService: Send + Sync {
    async fn handle(&self, request: RpcRequest) -> Result<Value, MotusError>;
}

/// Client-side connection issuing calls to a remote service.
#[async_trait]
pub trait RpcConn: Send + Sync {
    async fn call(&self, subtype: &Subtype, request: RpcRequest) -> Result<Value, MotusError>;
}

/// The local resources of one subtype, keyed by instance name.
///
/// Shared between the resource manager (which adds and removes entries) and
/// the subtype's server adapter (which looks them up per request).
#[derive(Clone, Default)]
pub struct SubtypeService {
    resources: Arc<RwLock<HashMap<String, Resource>>>,
}

impl SubtypeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, resource: Resource) {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), resource);
    }

    pub fn remove(&self, name: &str) -> Option<Resource> {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn resource(&self, name: &str) -> Option<Resource> {
        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// In-process [`RpcConn`] that dispatches to mounted services.
#[derive(Default)]
pub struct LoopbackConn {
    services: HashMap<Subtype, Arc<dyn RpcService>>,
}

impl LoopbackConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `subtype` with `service`.  A later mount replaces an earlier one.
    pub fn mount(&mut self, subtype: Subtype, service: Arc<dyn RpcService>) {
        self.services.insert(subtype, service);
    }
}

fn wire<T: Serialize + for<'de> Deserialize<'de>>(value: &T) -> Result<T, MotusError> {
    let bytes = serde_json::to_vec(value).map_err(|e| MotusError::Rpc(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| MotusError::Rpc(e.to_string()))
}

#[async_trait]
impl RpcConn for LoopbackConn {
    async fn call(&self, subtype: &Subtype, request: RpcRequest) -> Result<Value, MotusError> {
        let service = self
            .services
            .get(subtype)
            .ok_or_else(|| MotusError::Rpc(format!("no service mounted for {subtype}")))?;
        debug!(subtype = %subtype, method = %request.method, id = %request.id, "loopback call");
        let request = wire(&request)?;
        let response = service.handle(request).await;
        wire(&response)?
    }
}
