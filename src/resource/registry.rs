use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{import, ImportSettings, Resource, ResourceSlot};
use crate::config::ResourceConfig;
use crate::error::{CoreError, CoreResult};
use crate::host::Host;
use crate::id::Uuid;
use crate::slot::Shared;

/// Owns the ID -> instance and path -> ID maps.
///
/// Every method takes `&self` and releases its borrows before running
/// resource hooks, so a hook may call back into the registry.
pub struct ResourceRegistry {
    pub(super) host: Host,
    pub(super) config: ResourceConfig,
    pub(super) instances: RefCell<HashMap<Uuid, ResourceSlot>>,
    pub(super) paths: RefCell<HashMap<String, Uuid>>,
}

impl ResourceRegistry {
    pub fn new(host: Host, config: ResourceConfig) -> Self {
        Self {
            host,
            config,
            instances: RefCell::new(HashMap::new()),
            paths: RefCell::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Native table first, then the managed path map.
    pub fn get_id(&self, path: &str) -> Uuid {
        let native = self.host.bridge().resource_id(path);
        if native.is_valid() {
            return native;
        }
        self.paths
            .borrow()
            .get(path)
            .copied()
            .unwrap_or(Uuid::INVALID)
    }

    pub fn exists(&self, path: &str) -> bool {
        let id = self.get_id(path);
        id.is_valid() && (self.host.bridge().resource_exists(id) || self.is_loaded(id))
    }

    pub fn is_loaded(&self, id: Uuid) -> bool {
        self.instances.borrow().contains_key(&id)
    }

    pub fn path_of(&self, id: Uuid) -> Option<String> {
        if let Some(slot) = self.cached(id) {
            return Some(slot.get().borrow().meta().path());
        }
        self.host.bridge().resource_path(id)
    }

    pub fn loaded_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.instances.borrow().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn cached(&self, id: Uuid) -> Option<ResourceSlot> {
        self.instances.borrow().get(&id).cloned()
    }

    /// Returns the live instance for `path`, constructing and caching one on
    /// first use. Repeated calls return the same instance until `unload`.
    pub fn load<T: Resource>(&self, path: &str, settings: ImportSettings) -> Option<Shared<T>> {
        let id = self.get_id(path);
        if id.is_valid() {
            if let Some(slot) = self.cached(id) {
                return self.typed::<T>(id, &slot);
            }
        }

        let slot = if id.is_valid() && self.host.bridge().resource_exists(id) {
            self.load_existing_unmanaged::<T>(id, path)
        } else {
            self.load_new::<T>(path, settings)
        };
        self.register(&slot);

        let id = slot.get().borrow().meta().id();
        if self.is_disk_cached(&slot) {
            match self.hydrate(&slot) {
                Ok(true) => debug!(%id, path, "hydrated resource from cache"),
                Ok(false) => {}
                Err(err) => warn!(%id, path, %err, "ignoring unreadable resource cache"),
            }
        }
        self.autosave();
        slot.downcast::<T>()
    }

    /// Wraps a resource the native side already knows about.
    fn load_existing_unmanaged<T: Resource>(&self, id: Uuid, path: &str) -> ResourceSlot {
        let mut resource = T::create(&self.host);
        let native_path = self
            .host
            .bridge()
            .resource_path(id)
            .unwrap_or_else(|| path.to_string());
        resource.meta().set_id(id);
        resource.meta().set_path(&native_path);
        resource
            .meta()
            .set_native_handle(self.host.bridge().resource_instance(id));
        resource.on_load();
        debug!(%id, path = native_path.as_str(), "wrapped native resource");
        ResourceSlot::new(resource)
    }

    fn load_new<T: Resource>(&self, path: &str, settings: ImportSettings) -> ResourceSlot {
        let mut resource = T::create(&self.host);
        resource.meta().set_path(path);
        resource.on_load();
        if !resource.meta().id().is_valid() {
            resource.meta().set_id(self.host.bridge().generate_id());
        }
        import(&mut resource, settings);
        info!(id = %resource.meta().id(), path, "created resource");
        ResourceSlot::new(resource)
    }

    pub(super) fn register(&self, slot: &ResourceSlot) {
        let (id, path) = {
            let resource = slot.get().borrow();
            (resource.meta().id(), resource.meta().path())
        };
        if !self.host.bridge().resource_exists(id) {
            self.host.bridge().register_resource(id, &path);
        }
        self.instances.borrow_mut().insert(id, slot.clone());
        self.paths.borrow_mut().insert(path, id);
    }

    fn typed<T: Resource>(&self, id: Uuid, slot: &ResourceSlot) -> Option<Shared<T>> {
        let typed = slot.downcast::<T>();
        if typed.is_none() {
            let err = CoreError::TypeMismatch {
                id,
                cached: slot.type_name(),
                requested: std::any::type_name::<T>(),
            };
            error!(%err, "resource lookup failed");
        }
        typed
    }

    /// Returns `None` for invalid IDs and IDs the native table does not know.
    pub fn get<T: Resource>(&self, id: Uuid) -> Option<Shared<T>> {
        if !id.is_valid() || !self.host.bridge().resource_exists(id) {
            return None;
        }
        if let Some(slot) = self.cached(id) {
            return self.typed::<T>(id, &slot);
        }
        let path = self.host.bridge().resource_path(id)?;
        let slot = self.load_existing_unmanaged::<T>(id, &path);
        self.register(&slot);
        slot.downcast::<T>()
    }

    /// Clones a loaded resource under `new_path`; returns the new ID or
    /// `Uuid::INVALID`.
    ///
    /// Only cached instances can be duplicated: the copy is built through the
    /// registered type of the source, which a native-only entry does not
    /// carry. Wrap such an entry first with [`ResourceRegistry::get`].
    pub fn duplicate(&self, id: Uuid, new_path: &str) -> Uuid {
        let Some(source) = self.cached(id) else {
            warn!(%id, "cannot duplicate a resource that is not loaded");
            return Uuid::INVALID;
        };
        let Some((name, info)) = self.host.types().resource_by_type(source.type_id()) else {
            error!(%id, ty = source.type_name(), "cannot duplicate an unregistered resource type");
            return Uuid::INVALID;
        };

        let new_id = self.host.bridge().duplicate_resource(id, new_path);
        if !new_id.is_valid() {
            warn!(%id, new_path, "native side refused to duplicate resource");
            return Uuid::INVALID;
        }

        match (info.duplicate)(&source, new_id, new_path, &self.host) {
            Ok(copy) => {
                self.register(&copy);
                info!(%id, %new_id, new_path, ty = name, "duplicated resource");
                self.autosave();
                new_id
            }
            Err(err) => {
                error!(%id, new_path, %err, "resource clone failed");
                self.host.bridge().unload_resource(new_id);
                Uuid::INVALID
            }
        }
    }

    /// Calls the unload hook, forgets the instance and tells the native
    /// table. Unloading an unknown ID only informs the native side.
    pub fn unload(&self, id: Uuid) {
        let slot = self.cached(id);
        if let Some(slot) = &slot {
            slot.get().borrow_mut().on_unload();
        }
        self.instances.borrow_mut().remove(&id);
        self.paths.borrow_mut().retain(|_, mapped| *mapped != id);
        self.host.bridge().unload_resource(id);
        if slot.is_some() {
            debug!(%id, "unloaded resource");
            self.autosave();
        }
    }

    /// Writes the resource's own state to its `<path>.cache` sidecar.
    pub fn save_resource(&self, id: Uuid) -> CoreResult<PathBuf> {
        let slot = self.cached(id).ok_or(CoreError::NotLoaded(id))?;
        let (path, data) = {
            let resource = slot.get().borrow();
            (resource.meta().path(), resource.on_serialize()?)
        };
        let file = self.config.cache_path(&path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, serde_json::to_string_pretty(&data)?)?;
        Ok(file)
    }

    /// Feeds the sidecar into the instance. `Ok(false)` when there is none.
    pub(super) fn hydrate(&self, slot: &ResourceSlot) -> CoreResult<bool> {
        let path = slot.get().borrow().meta().path();
        let file = self.config.cache_path(&path);
        if !file.exists() {
            return Ok(false);
        }
        let data: Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
        slot.get().borrow_mut().on_deserialize(&data)?;
        Ok(true)
    }

    pub(super) fn is_disk_cached(&self, slot: &ResourceSlot) -> bool {
        self.host
            .types()
            .resource_by_type(slot.type_id())
            .map(|(_, info)| info.options.disk_cache)
            .unwrap_or(false)
    }

    fn autosave(&self) {
        if !self.config.autosave_manifest {
            return;
        }
        if let Err(err) = self.write_manifest() {
            warn!(%err, "failed to persist resource manifest");
        }
    }
}
