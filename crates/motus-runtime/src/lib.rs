//! `motus-runtime` – hosts the configured components of one robot.
//!
//! # Modules
//!
//! - [`config`] – [`RobotConfig`][config::RobotConfig]: the component list,
//!   loaded from TOML with `MOTUS_*` environment overrides.
//! - [`manager`] – [`ResourceManager`][manager::ResourceManager]: constructs
//!   components in dependency order, reconfigures them in place or rebuilds
//!   them, and serves them over RPC.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.  Set
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` to enable export.
//!
//! # Bootstrap
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), motus_types::MotusError> {
//! use std::sync::Arc;
//! use motus_runtime::{config, default_registry, ResourceManager};
//!
//! let _guard = motus_runtime::telemetry::init_tracing("motus");
//! let robot = config::load()?.unwrap_or_default();
//! let registry = Arc::new(default_registry(None)?);
//! let mut manager = ResourceManager::from_config(registry, &robot).await?;
//! manager.close().await
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod telemetry;

pub use config::RobotConfig;
pub use manager::ResourceManager;

use motus_arm::MotionServices;
use motus_resource::Registry;
use motus_types::MotusError;

/// A registry holding every built-in subtype and model.
///
/// `motion` is handed to models that plan their own pose moves; without it
/// they report pose moves as unimplemented.
pub fn default_registry(motion: Option<MotionServices>) -> Result<Registry, MotusError> {
    let mut registry = Registry::new();
    motus_arm::register(&mut registry)?;
    motus_arm::fake::register(&mut registry, motion)?;
    Ok(registry)
}
