use std::rc::Rc;

use serde_json::Value;
use tracing::info;

use crate::config::RuntimeConfig;
use crate::ecs::{Component, System, Transform, World};
use crate::host::Host;
use crate::native::{InMemoryBridge, NativeBridge};
use crate::resource::{Resource, ResourceRegistry};
use crate::slot::Shared;
use crate::types::{ResourceOptions, TypeRegistry};

/// Collects type registrations and the bridge before the runtime starts.
///
/// `Transform` and `World` are always registered.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    bridge: Option<Rc<dyn NativeBridge>>,
    types: TypeRegistry,
}

impl RuntimeBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        let mut types = TypeRegistry::new();
        types
            .register_component::<Transform>("Transform")
            .register_resource::<World>("World", ResourceOptions::cached());
        Self {
            config,
            bridge: None,
            types,
        }
    }

    /// Uses `bridge` instead of an in-memory bridge seeded from the config.
    pub fn with_bridge(mut self, bridge: Rc<dyn NativeBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_component<T: Component + Default>(mut self, name: &'static str) -> Self {
        self.types.register_component::<T>(name);
        self
    }

    pub fn with_system<S: System + Default>(mut self, name: &'static str) -> Self {
        self.types.register_system::<S>(name);
        self
    }

    pub fn with_resource<R: Resource>(mut self, name: &'static str, options: ResourceOptions) -> Self {
        self.types.register_resource::<R>(name, options);
        self
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn build(self) -> Runtime {
        let bridge = self
            .bridge
            .unwrap_or_else(|| Rc::new(InMemoryBridge::new(self.config.bridge.seed)));
        let host = Host::new(bridge, self.types);
        let resources = ResourceRegistry::new(host.clone(), self.config.resources.clone());
        info!(
            root = %self.config.resources.root_dir.display(),
            "runtime ready"
        );
        Runtime {
            host,
            resources,
            config: self.config,
        }
    }
}

pub struct Runtime {
    host: Host,
    resources: ResourceRegistry,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn builder(config: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// A free-standing world that is not tracked by the resource registry.
    pub fn create_world(&self) -> World {
        World::new(&self.host)
    }

    /// Loads (or creates) the world stored at `path`.
    pub fn load_world(&self, path: &str) -> Option<Shared<World>> {
        self.resources.load::<World>(path, Value::Null)
    }
}
