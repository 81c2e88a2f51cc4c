//! Traits shared by every reconfigurable wrapper and capability interface.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use motus_types::{ComponentConfig, Extra, MotusError, UpdateAction};

use crate::resource::Resource;

/// A stable handle whose implementation can be swapped while callers keep
/// using it.
///
/// Implementations hold a reader/writer lock around their delegate: every
/// forwarded call takes the shared side for its whole duration, while
/// [`Reconfigurable::reconfigure`] takes the exclusive side.
#[async_trait]
pub trait Reconfigurable: Send + Sync + 'static {
    /// Replace the current delegate with the one held by `new`.
    ///
    /// `new` must be a handle of exactly the same wrapper shape as `self`;
    /// otherwise [`MotusError::ReconfigureType`] is returned and `self` keeps
    /// its delegate.  The outgoing delegate is closed on a best-effort basis.
    async fn reconfigure(&self, new: Arc<dyn Reconfigurable>) -> Result<(), MotusError>;

    /// Release the current delegate's resources and surface any failure.
    async fn close(&self) -> Result<(), MotusError>;

    /// Ask the current delegate how it would absorb `config`.
    async fn update_action(&self, config: &ComponentConfig) -> UpdateAction;

    /// Human-readable description of the wrapper shape, used in type errors.
    fn shape(&self) -> String;

    fn as_any(&self) -> &dyn Any;

    /// The handle erased as the subtype's capability interface, ready to be
    /// placed in a dependency set.
    fn resource(self: Arc<Self>) -> Resource;
}

/// Free-form command escape hatch supported by every resource.
#[async_trait]
pub trait Generic: Send + Sync {
    async fn do_command(&self, _cmd: Extra) -> Result<Extra, MotusError> {
        Err(MotusError::UnimplementedCapability("DoCommand".to_string()))
    }
}

/// Optional extension for resources that can report whether they are in
/// motion.
#[async_trait]
pub trait MovingCheckable: Send + Sync {
    async fn is_moving(&self) -> Result<bool, MotusError>;
}
