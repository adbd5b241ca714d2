//! Loadable content with a stable identity.
//!
//! A resource is addressed by a virtual path and a [`Uuid`]. The
//! [`ResourceRegistry`] guarantees at most one live managed instance per ID
//! and one ID per path; [`database`] persists the set between sessions.

pub mod database;
mod registry;

pub use database::{DatabaseReport, ManifestEntry};
pub use registry::ResourceRegistry;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use crate::error::CoreResult;
use crate::host::Host;
use crate::id::{NativeHandle, Uuid};
use crate::slot::Slot;

/// Opaque per-resource import settings, stored as given.
pub type ImportSettings = Value;

pub type ResourceSlot = Slot<dyn Resource>;

impl Slot<dyn Resource> {
    pub fn new<R: Resource>(resource: R) -> Self {
        let typed = Rc::new(RefCell::new(resource));
        let inner: Rc<RefCell<dyn Resource>> = typed.clone();
        Slot::from_parts(typed, inner)
    }
}

/// Identity and import state shared by every resource.
///
/// Fields use interior mutability so handle-style resources (a `World` is a
/// cheap clone of shared state) can expose one `meta` from every clone.
#[derive(Debug, Default)]
pub struct ResourceMeta {
    id: Cell<Uuid>,
    path: RefCell<String>,
    settings: RefCell<ImportSettings>,
    native: Cell<Option<NativeHandle>>,
}

impl ResourceMeta {
    pub fn id(&self) -> Uuid {
        self.id.get()
    }

    pub fn set_id(&self, id: Uuid) {
        self.id.set(id);
    }

    pub fn path(&self) -> String {
        self.path.borrow().clone()
    }

    pub fn set_path(&self, path: &str) {
        *self.path.borrow_mut() = path.to_string();
    }

    pub fn settings(&self) -> ImportSettings {
        self.settings.borrow().clone()
    }

    pub fn set_settings(&self, settings: ImportSettings) {
        *self.settings.borrow_mut() = settings;
    }

    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.native.get()
    }

    pub fn set_native_handle(&self, handle: Option<NativeHandle>) {
        self.native.set(handle);
    }

    /// True once the resource wraps storage owned by the native side.
    pub fn is_native_backed(&self) -> bool {
        self.native.get().is_some()
    }
}

pub trait Resource: Any {
    /// Builds an empty instance. Identity is assigned afterwards.
    fn create(host: &Host) -> Self
    where
        Self: Sized;

    fn meta(&self) -> &ResourceMeta;

    /// Runs after construction, before an ID is assigned. A resource that
    /// sets its own ID here keeps it.
    fn on_load(&mut self) {}

    fn on_import(&mut self, _settings: &ImportSettings) {}

    fn on_unload(&mut self) {}

    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(Value::Null)
    }

    fn on_deserialize(&mut self, _data: &Value) -> CoreResult<()> {
        Ok(())
    }

    /// Produces an independent copy living under `id` and `path`.
    ///
    /// The default copies import settings and feeds this resource's
    /// serialized state into a freshly created instance, so the copy shares
    /// no mutable state with the original.
    fn clone_resource(&self, id: Uuid, path: &str, host: &Host) -> CoreResult<Self>
    where
        Self: Sized,
    {
        let mut copy = Self::create(host);
        copy.meta().set_id(id);
        copy.meta().set_path(path);
        copy.meta().set_settings(self.meta().settings());
        copy.meta()
            .set_native_handle(host.bridge().resource_instance(id));
        copy.on_load();
        let state = self.on_serialize()?;
        copy.on_deserialize(&state)?;
        Ok(copy)
    }
}

/// Stores the settings and hands them to the import hook.
pub(crate) fn import(resource: &mut dyn Resource, settings: ImportSettings) {
    resource.meta().set_settings(settings.clone());
    resource.on_import(&settings);
}
