//! Boundary to the native engine.
//!
//! The core never owns renderer, physics or file storage. Everything it needs
//! from the host is reachable through [`NativeBridge`], keyed by numeric IDs
//! and type tokens (the registered type name). Calls are assumed to succeed
//! or return a sentinel; the core does not defend against a failing bridge.

mod memory;

pub use memory::InMemoryBridge;

use crate::id::{NativeHandle, Uuid};

pub trait NativeBridge {
    /// Returns a fresh, never-before-issued, valid ID.
    fn generate_id(&self) -> Uuid;

    // Resource table.
    fn resource_exists(&self, id: Uuid) -> bool;
    fn resource_id(&self, path: &str) -> Uuid;
    fn resource_path(&self, id: Uuid) -> Option<String>;
    /// Records both directions of the path <-> id mapping.
    fn register_resource(&self, id: Uuid, path: &str);
    /// Clones the native side of a resource; returns `Uuid::INVALID` when the
    /// source is unknown.
    fn duplicate_resource(&self, id: Uuid, new_path: &str) -> Uuid;
    fn unload_resource(&self, id: Uuid);
    fn resource_instance(&self, id: Uuid) -> Option<NativeHandle>;

    // Entity table.
    fn create_entity(&self, world: Uuid) -> Uuid;
    fn create_entity_with_id(&self, world: Uuid, id: Uuid) -> Uuid;
    fn has_entity(&self, world: Uuid, id: Uuid) -> bool;
    fn destroy_entity(&self, world: Uuid, id: Uuid);
    fn entities(&self, world: Uuid) -> Vec<Uuid>;

    // Component table.
    fn add_component(&self, world: Uuid, entity: Uuid, token: &str) -> NativeHandle;
    fn remove_component(&self, world: Uuid, entity: Uuid, token: &str);
    fn component_owners(&self, world: Uuid, token: &str) -> Vec<Uuid>;

    // System table.
    fn add_system(&self, world: Uuid, token: &str) -> NativeHandle;
    fn has_system(&self, world: Uuid, token: &str) -> bool;
    fn remove_system(&self, world: Uuid, token: &str);
    fn enable_system(&self, world: Uuid, token: &str, enabled: bool);
}
