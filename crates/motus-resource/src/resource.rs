//! Type-erased resource handles and dependency resolution.
//!
//! A [`Resource`] stores an `Arc<T>` for some capability interface `T`
//! (usually a trait object such as `dyn Arm`).  Resolving it as a different
//! interface fails, which is how the resolver tells "absent" apart from
//! "present but the wrong kind of thing".

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use motus_types::{MotusError, ResourceName, Subtype};

/// A resource instance with its concrete interface erased.
///
/// Cloning is cheap and every clone refers to the same instance.
#[derive(Clone)]
pub struct Resource {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Resource {
    /// Erase `value`, remembering that it was stored as `Arc<T>`.
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Recover the handle if it was stored as `Arc<T>`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// Name of the interface the resource was stored as.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("type_name", &self.type_name).finish()
    }
}

/// The assembled name → instance mapping handed to a constructor.
pub type Dependencies = HashMap<ResourceName, Resource>;

/// Resolve `name` from `deps` as capability interface `T`.
///
/// # Errors
///
/// - [`MotusError::NotFound`] – `name` is absent.
/// - [`MotusError::TypeMismatch`] – `name` is present but does not provide `T`.
pub fn resolve<T: ?Sized + Send + Sync + 'static>(
    deps: &Dependencies,
    name: &ResourceName,
) -> Result<Arc<T>, MotusError> {
    let res = deps
        .get(name)
        .ok_or_else(|| MotusError::NotFound(name.to_string()))?;
    res.downcast::<T>().ok_or_else(|| MotusError::TypeMismatch {
        name: name.to_string(),
        expected: type_name::<T>().to_string(),
        actual: res.type_name().to_string(),
    })
}

/// Instance names of every dependency of the given subtype, sorted.
pub fn names_by_subtype(deps: &Dependencies, subtype: &Subtype) -> Vec<String> {
    let mut names: Vec<String> = deps
        .keys()
        .filter(|n| n.subtype() == subtype)
        .map(|n| n.name().to_string())
        .collect();
    names.sort();
    names
}
