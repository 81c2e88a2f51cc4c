//! [`ResourceManager`] – constructs, reconfigures and closes the configured
//! components of a robot.
//!
//! Each component is built by its model constructor, wrapped in its subtype's
//! reconfigurable handle, and stored under its [`ResourceName`].  The handle
//! is what dependants and RPC servers hold, so a reconfigure that swaps the
//! implementation is invisible to them.  Only a rebuild (a changed shape, or
//! a driver that asks for it) installs a new handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use motus_resource::{
    Collector, CollectorParams, CaptureRecord, Dependencies, LoopbackConn, Reconfigurable, Registry,
    Resource, RpcConn, SubtypeService,
};
use motus_types::{ComponentConfig, MotusError, ResourceName, Subtype, UpdateAction};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RobotConfig;

struct Managed {
    config: ComponentConfig,
    handle: Arc<dyn Reconfigurable>,
    resource: Resource,
}

/// The set of live resources of one robot.
pub struct ResourceManager {
    registry: Arc<Registry>,
    resources: HashMap<ResourceName, Managed>,
    services: HashMap<Subtype, SubtypeService>,
}

impl ResourceManager {
    /// An empty manager.  One RPC service is prepared per registered subtype.
    pub fn new(registry: Arc<Registry>) -> Self {
        let services = registry
            .subtypes()
            .map(|s| (s.clone(), SubtypeService::new()))
            .collect();
        Self {
            registry,
            resources: HashMap::new(),
            services,
        }
    }

    /// Construct every component of `config`, dependencies first.
    ///
    /// # Errors
    ///
    /// [`MotusError::Config`] when the dependencies cannot be ordered (a
    /// cycle, or a name that no component provides); otherwise the first
    /// construction error.
    pub async fn from_config(registry: Arc<Registry>, config: &RobotConfig) -> Result<Self, MotusError> {
        config.validate()?;
        let mut manager = Self::new(registry);
        let mut pending: Vec<&ComponentConfig> = config.components.iter().collect();
        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|c| c.depends_on.iter().all(|d| manager.find(d).is_some()));
            if ready.is_empty() {
                let names: Vec<&str> = blocked.iter().map(|c| c.name.as_str()).collect();
                manager.close().await.ok();
                return Err(MotusError::Config(format!(
                    "unresolvable dependencies for {}",
                    names.join(", ")
                )));
            }
            for c in ready {
                if let Err(e) = manager.construct(c.clone()).await {
                    manager.close().await.ok();
                    return Err(e);
                }
            }
            pending = blocked;
        }
        Ok(manager)
    }

    fn find(&self, instance: &str) -> Option<(&ResourceName, &Managed)> {
        self.resources.iter().find(|(n, _)| n.name() == instance)
    }

    fn managed(&self, name: &ResourceName) -> Result<&Managed, MotusError> {
        self.resources
            .get(name)
            .ok_or_else(|| MotusError::NotFound(name.to_string()))
    }

    /// Resolve `depends_on` against the live resources.
    fn dependencies_of(&self, config: &ComponentConfig) -> Result<Dependencies, MotusError> {
        config
            .depends_on
            .iter()
            .map(|d| {
                self.find(d)
                    .map(|(n, m)| (n.clone(), m.resource.clone()))
                    .ok_or_else(|| MotusError::NotFound(d.clone()))
            })
            .collect()
    }

    /// Build and wrap a fresh implementation of `config`.
    fn build(&self, config: &ComponentConfig) -> Result<Arc<dyn Reconfigurable>, MotusError> {
        let subtype = config.subtype();
        let registration = self.registry.lookup_subtype(&subtype)?;
        let constructor = self.registry.lookup_component(&subtype, &config.model)?;
        let deps = self.dependencies_of(config)?;
        let raw = constructor(&deps, config)?;
        (registration.reconfigurable)(raw)
    }

    fn install(&mut self, config: ComponentConfig, handle: Arc<dyn Reconfigurable>) -> Resource {
        let name = config.resource_name();
        let resource = Arc::clone(&handle).resource();
        if let Some(service) = self.services.get(name.subtype()) {
            service.add(name.name(), resource.clone());
        }
        self.resources.insert(
            name,
            Managed {
                config,
                handle,
                resource: resource.clone(),
            },
        );
        resource
    }

    /// Construct the component described by `config`.
    ///
    /// # Errors
    ///
    /// - [`MotusError::DuplicateRegistration`] – the name is already in use.
    /// - [`MotusError::NotFound`] – unknown subtype, model or dependency.
    /// - Any error from the model constructor or wrapper.
    pub async fn construct(&mut self, config: ComponentConfig) -> Result<Resource, MotusError> {
        let name = config.resource_name();
        if self.resources.contains_key(&name) {
            return Err(MotusError::DuplicateRegistration(name.to_string()));
        }
        let handle = self.build(&config)?;
        info!(resource = %name, model = %config.model, "constructed resource");
        Ok(self.install(config, handle))
    }

    /// Apply a changed config to a live component.
    ///
    /// The existing handle is kept and its implementation swapped unless the
    /// driver asks for a rebuild or the new implementation has a different
    /// shape; then the old handle is closed and replaced.
    pub async fn reconfigure(&mut self, config: ComponentConfig) -> Result<Resource, MotusError> {
        let name = config.resource_name();
        let existing = self.managed(&name)?;
        let action = existing.handle.update_action(&config).await;
        debug!(resource = %name, ?action, "reconfiguring resource");

        if action == UpdateAction::None {
            let resource = existing.resource.clone();
            if let Some(m) = self.resources.get_mut(&name) {
                m.config = config;
            }
            return Ok(resource);
        }

        let fresh = self.build(&config)?;
        let existing = self.managed(&name)?;
        if action == UpdateAction::Reconfigure {
            match existing.handle.reconfigure(Arc::clone(&fresh)).await {
                Ok(()) => {
                    let resource = existing.resource.clone();
                    if let Some(m) = self.resources.get_mut(&name) {
                        m.config = config;
                    }
                    info!(resource = %name, "reconfigured resource in place");
                    return Ok(resource);
                }
                Err(MotusError::ReconfigureType { expected, actual }) => {
                    warn!(resource = %name, %expected, %actual, "shape changed; rebuilding");
                }
                Err(e) => {
                    if let Err(close_err) = fresh.close().await {
                        error!(resource = %name, error = %close_err, "error closing unused resource");
                    }
                    return Err(e);
                }
            }
        }

        if let Err(e) = existing.handle.close().await {
            error!(resource = %name, error = %e, "error closing replaced resource");
        }
        info!(resource = %name, "rebuilt resource");
        Ok(self.install(config, fresh))
    }

    /// Remove and close one component.
    pub async fn remove(&mut self, name: &ResourceName) -> Result<(), MotusError> {
        let managed = self
            .resources
            .remove(name)
            .ok_or_else(|| MotusError::NotFound(name.to_string()))?;
        if let Some(service) = self.services.get(name.subtype()) {
            service.remove(name.name());
        }
        info!(resource = %name, "removing resource");
        managed.handle.close().await
    }

    /// Close every component, in name order.
    ///
    /// All components are closed even if some fail; the first failure is
    /// returned and the rest are logged.
    pub async fn close(&mut self) -> Result<(), MotusError> {
        let mut names: Vec<ResourceName> = self.resources.keys().cloned().collect();
        names.sort_by_key(|n| n.to_string());
        let mut first = None;
        for name in names {
            if let Err(e) = self.remove(&name).await {
                error!(resource = %name, error = %e, "error closing resource");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Status of one component, as produced by its subtype.
    pub async fn status(&self, name: &ResourceName) -> Result<Value, MotusError> {
        let managed = self.managed(name)?;
        let registration = self.registry.lookup_subtype(name.subtype())?;
        (registration.status)(&managed.resource).await
    }

    /// The stable handle of one component.
    pub fn resource(&self, name: &ResourceName) -> Result<Resource, MotusError> {
        Ok(self.managed(name)?.resource.clone())
    }

    /// The config a component was last constructed or reconfigured with.
    pub fn config(&self, name: &ResourceName) -> Result<&ComponentConfig, MotusError> {
        Ok(&self.managed(name)?.config)
    }

    /// Every live component, as a dependency set.
    pub fn dependencies(&self) -> Dependencies {
        self.resources
            .iter()
            .map(|(n, m)| (n.clone(), m.resource.clone()))
            .collect()
    }

    /// Names of every live component, sorted.
    pub fn names(&self) -> Vec<ResourceName> {
        let mut names: Vec<ResourceName> = self.resources.keys().cloned().collect();
        names.sort_by_key(|n| n.to_string());
        names
    }

    /// An in-process connection serving every registered subtype.
    pub fn loopback(&self) -> LoopbackConn {
        let mut conn = LoopbackConn::new();
        for (subtype, service) in &self.services {
            if let Ok(registration) = self.registry.lookup_subtype(subtype) {
                conn.mount(subtype.clone(), (registration.rpc_server)(service.clone()));
            }
        }
        conn
    }

    /// A client for the component called `name`, reached over `conn`.
    pub fn remote(&self, conn: Arc<dyn RpcConn>, name: &ResourceName) -> Result<Resource, MotusError> {
        let registration = self.registry.lookup_subtype(name.subtype())?;
        Ok((registration.rpc_client)(conn, name.name()))
    }

    /// A collector capturing `method` of `name` every `interval`.  The
    /// collector is returned idle; call [`Collector::collect`] to start it.
    pub fn collector(
        &self,
        name: &ResourceName,
        method: &str,
        interval: Duration,
        sink: mpsc::Sender<CaptureRecord>,
    ) -> Result<Collector, MotusError> {
        let managed = self.managed(name)?;
        let registration = self.registry.lookup_subtype(name.subtype())?;
        let factory = registration
            .collectors
            .get(method)
            .ok_or_else(|| MotusError::UnimplementedCapability(format!("{} collector {method}", name.subtype())))?;
        factory(
            &managed.resource,
            CollectorParams {
                resource: name.clone(),
                method: method.to_string(),
                interval,
                sink,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use motus_arm::{Arm, FakeArm, FakeArmConfig, MotionServices};
    use motus_kinematics::{FrameSystem, FrameSystemHandle};
    use motus_motion::{PlanRequest, Planner, PlanningResult};
    use motus_resource::Constructor;
    use motus_types::{Extra, Input, JointPositions, Pose};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    type Built = Arc<Mutex<Vec<Arc<FakeArm>>>>;

    /// A fake model that hands every arm it builds back to the test.
    fn recording(built: Built) -> Constructor {
        Arc::new(move |_deps: &Dependencies, config: &ComponentConfig| {
            let attrs: FakeArmConfig = config.attributes_as()?;
            let mut arm = FakeArm::from_config(config.name.clone(), attrs);
            if let Some(Value::String(msg)) = config.attributes.get("fail_close") {
                arm = arm.with_close_error(msg.clone());
            }
            let arm = Arc::new(arm);
            built.lock().unwrap().push(Arc::clone(&arm));
            Ok(motus_arm::into_resource(arm))
        })
    }

    fn registry(built: &Built) -> Arc<Registry> {
        let mut registry = Registry::new();
        motus_arm::register(&mut registry).unwrap();
        motus_arm::fake::register(&mut registry, None).unwrap();
        registry
            .register_component(motus_arm::subtype(), "recording", recording(Arc::clone(built)))
            .unwrap();
        Arc::new(registry)
    }

    fn arm_config(name: &str, model: &str) -> ComponentConfig {
        ComponentConfig::new(name, "arm", model)
    }

    fn with_attr(mut config: ComponentConfig, key: &str, value: Value) -> ComponentConfig {
        config.attributes.insert(key.to_string(), value);
        config
    }

    fn as_arm(resource: &Resource) -> Arc<dyn Arm> {
        resource.downcast::<dyn Arm>().unwrap()
    }

    #[tokio::test]
    async fn construct_and_report_status() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        manager.construct(arm_config("arm1", "fake")).await.unwrap();

        let name = motus_arm::named("arm1");
        assert_eq!(manager.names(), vec![name.clone()]);
        let status = manager.status(&name).await.unwrap();
        assert_eq!(status["is_moving"], false);
        assert!(as_arm(&manager.resource(&name).unwrap()).as_reconfigurable().is_some());
    }

    #[tokio::test]
    async fn duplicate_construct_is_rejected() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        manager.construct(arm_config("arm1", "fake")).await.unwrap();
        let err = manager.construct(arm_config("arm1", "fake")).await.unwrap_err();
        assert!(matches!(err, MotusError::DuplicateRegistration(_)));
    }

    #[tokio::test]
    async fn unknown_model_and_dependency_are_not_found() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        let err = manager.construct(arm_config("arm1", "ur5")).await.unwrap_err();
        assert!(matches!(err, MotusError::NotFound(_)));

        let mut cfg = arm_config("arm2", "fake");
        cfg.depends_on = vec!["board1".into()];
        let err = manager.construct(cfg).await.unwrap_err();
        assert_eq!(err, MotusError::NotFound("board1".into()));
        assert!(manager.names().is_empty());
    }

    #[tokio::test]
    async fn from_config_orders_by_dependency() {
        let built = Built::default();
        let mut arm2 = arm_config("arm2", "recording");
        arm2.depends_on = vec!["arm1".into()];
        let config = RobotConfig {
            name: "bench".into(),
            components: vec![arm2, arm_config("arm1", "recording")],
        };
        let manager = ResourceManager::from_config(registry(&built), &config).await.unwrap();

        let order: Vec<String> = built.lock().unwrap().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(order, vec!["arm1", "arm2"]);
        assert_eq!(manager.dependencies().len(), 2);
    }

    #[tokio::test]
    async fn from_config_rejects_dependency_cycle() {
        let built = Built::default();
        let mut a = arm_config("a", "recording");
        a.depends_on = vec!["b".into()];
        let mut b = arm_config("b", "recording");
        b.depends_on = vec!["a".into()];
        let config = RobotConfig {
            name: "bench".into(),
            components: vec![a, b],
        };
        let err = ResourceManager::from_config(registry(&built), &config)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MotusError::Config(_)));
        assert!(built.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconfigure_swaps_in_place_and_closes_old_once() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        let name = motus_arm::named("arm1");
        let before = manager.construct(arm_config("arm1", "recording")).await.unwrap();
        let held = as_arm(&before);
        let short = held.end_position(Extra::new()).await.unwrap();

        let cfg = with_attr(arm_config("arm1", "recording"), "link_length_mm", 50.0.into());
        manager.reconfigure(cfg.clone()).await.unwrap();

        {
            let arms = built.lock().unwrap();
            assert_eq!(arms.len(), 2);
            assert_eq!(arms[0].close_count(), 1);
            assert_eq!(arms[1].close_count(), 0);
        }
        // The handle held from before the swap now reaches the new arm.
        let after = held.end_position(Extra::new()).await.unwrap();
        assert!((short.point.x - 300.0).abs() < 1e-9);
        assert!((after.point.x - 150.0).abs() < 1e-9);
        assert_eq!(manager.config(&name).unwrap(), &cfg);

        manager.close().await.unwrap();
        let arms = built.lock().unwrap();
        assert_eq!(arms[0].close_count(), 1);
        assert_eq!(arms[1].close_count(), 1);
    }

    #[tokio::test]
    async fn changed_joint_count_rebuilds() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        let name = motus_arm::named("arm1");
        manager.construct(arm_config("arm1", "recording")).await.unwrap();

        let cfg = with_attr(arm_config("arm1", "recording"), "joints", 2.into());
        let fresh = manager.reconfigure(cfg).await.unwrap();

        assert_eq!(built.lock().unwrap()[0].close_count(), 1);
        let joints = as_arm(&fresh).joint_positions(Extra::new()).await.unwrap();
        assert_eq!(joints.values.len(), 2);
        let current = as_arm(&manager.resource(&name).unwrap());
        assert_eq!(current.joint_positions(Extra::new()).await.unwrap().values.len(), 2);
    }

    #[tokio::test]
    async fn reconfigure_of_unknown_resource_is_not_found() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        let err = manager.reconfigure(arm_config("arm1", "fake")).await.unwrap_err();
        assert!(matches!(err, MotusError::NotFound(_)));
    }

    #[tokio::test]
    async fn close_closes_everything_and_returns_first_error() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        manager
            .construct(with_attr(arm_config("a", "recording"), "fail_close", "stuck brake".into()))
            .await
            .unwrap();
        manager.construct(arm_config("b", "recording")).await.unwrap();

        let err = manager.close().await.unwrap_err();
        assert!(matches!(err, MotusError::Device { .. }));
        assert!(built.lock().unwrap().iter().all(|a| a.close_count() == 1));
        assert!(manager.names().is_empty());
    }

    #[tokio::test]
    async fn remote_client_reaches_managed_arm() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        let name = motus_arm::named("arm1");
        manager.construct(arm_config("arm1", "fake")).await.unwrap();

        let conn: Arc<dyn RpcConn> = Arc::new(manager.loopback());
        let remote = as_arm(&manager.remote(conn, &name).unwrap());
        remote
            .move_to_joint_positions(JointPositions::new(vec![10.0, 20.0, 30.0]), Extra::new())
            .await
            .unwrap();

        let local = as_arm(&manager.resource(&name).unwrap());
        let values = local.joint_positions(Extra::new()).await.unwrap().values;
        for (got, want) in values.iter().zip([10.0, 20.0, 30.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn collector_captures_registered_method() {
        let built = Built::default();
        let mut manager = ResourceManager::new(registry(&built));
        let name = motus_arm::named("arm1");
        manager.construct(arm_config("arm1", "fake")).await.unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let err = manager
            .collector(&name, "battery", Duration::from_millis(10), tx.clone())
            .err()
            .unwrap();
        assert!(matches!(err, MotusError::UnimplementedCapability(_)));

        let mut collector = manager
            .collector(&name, "joint_positions", Duration::from_millis(10), tx)
            .unwrap();
        collector.collect();
        let record = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.method, "joint_positions");
        assert_eq!(record.resource, name.to_string());
        collector.close().await;
    }

    /// Jumps straight to a fixed joint goal.
    struct Direct(Vec<f64>);

    #[async_trait]
    impl Planner for Direct {
        async fn plan(&self, request: &PlanRequest, _cancel: &CancellationToken) -> Result<PlanningResult, MotusError> {
            let name = request.actuator.name().to_string();
            Ok(vec![[(name, Input::from_floats(&self.0))].into_iter().collect()])
        }
    }

    #[tokio::test]
    async fn managed_fake_arm_moves_to_pose() {
        let services = MotionServices::new(
            Arc::new(FrameSystemHandle::new(FrameSystem::new("bench"))),
            Arc::new(Direct(vec![0.5, 0.0, -0.25])),
        );
        let mut registry = Registry::new();
        motus_arm::register(&mut registry).unwrap();
        motus_arm::fake::register(&mut registry, Some(services)).unwrap();
        let mut manager = ResourceManager::new(Arc::new(registry));

        let arm = as_arm(&manager.construct(arm_config("arm1", "fake")).await.unwrap());
        arm.move_to_position(
            Pose::from_point(200.0, 100.0, 0.0),
            None,
            Extra::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let values = arm.joint_positions(Extra::new()).await.unwrap().values;
        assert!((values[0] - 0.5f64.to_degrees()).abs() < 1e-9);
        assert!((values[2] + 0.25f64.to_degrees()).abs() < 1e-9);
        manager.close().await.unwrap();
    }
}
