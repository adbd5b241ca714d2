//! Startup table mapping stable type names to constructors.
//!
//! Saved worlds and the resource manifest refer to types by name. Every name
//! that can appear on disk is registered here before the runtime starts, so
//! deserialization constructs by declared name without any reflection.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::ecs::{Component, ComponentSlot, System, SystemSlot};
use crate::error::{CoreError, CoreResult};
use crate::host::Host;
use crate::id::Uuid;
use crate::resource::{Resource, ResourceSlot};

pub(crate) type ComponentCtor = fn() -> ComponentSlot;
pub(crate) type SystemCtor = fn() -> SystemSlot;
pub(crate) type ResourceCtor = fn(&Host) -> ResourceSlot;
pub(crate) type ResourceDuplicator =
    fn(&ResourceSlot, Uuid, &str, &Host) -> CoreResult<ResourceSlot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Component,
    System,
    Resource,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Component => write!(f, "component"),
            TypeKind::System => write!(f, "system"),
            TypeKind::Resource => write!(f, "resource"),
        }
    }
}

/// Persistence flags for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOptions {
    /// Listed in the resource manifest by `save_database`.
    pub serializable: bool,
    /// Round-trips its own state through a `<path>.cache` sidecar.
    pub disk_cache: bool,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            serializable: true,
            disk_cache: false,
        }
    }
}

impl ResourceOptions {
    pub fn cached() -> Self {
        Self {
            serializable: true,
            disk_cache: true,
        }
    }

    pub fn transient() -> Self {
        Self {
            serializable: false,
            disk_cache: false,
        }
    }
}

#[derive(Clone, Copy)]
pub struct ResourceType {
    pub(crate) create: ResourceCtor,
    pub(crate) duplicate: ResourceDuplicator,
    pub options: ResourceOptions,
}

#[derive(Clone, Copy)]
enum Constructor {
    Component(ComponentCtor),
    System(SystemCtor),
    Resource(ResourceType),
}

impl Constructor {
    fn kind(&self) -> TypeKind {
        match self {
            Constructor::Component(_) => TypeKind::Component,
            Constructor::System(_) => TypeKind::System,
            Constructor::Resource(_) => TypeKind::Resource,
        }
    }
}

#[derive(Default)]
pub struct TypeRegistry {
    by_name: HashMap<&'static str, Constructor>,
    names: HashMap<TypeId, &'static str>,
}

fn make_component<T: Component + Default>() -> ComponentSlot {
    ComponentSlot::new(T::default())
}

fn make_system<S: System + Default>() -> SystemSlot {
    SystemSlot::new(S::default())
}

fn make_resource<R: Resource>(host: &Host) -> ResourceSlot {
    ResourceSlot::new(R::create(host))
}

fn duplicate_resource<R: Resource>(
    source: &ResourceSlot,
    id: Uuid,
    path: &str,
    host: &Host,
) -> CoreResult<ResourceSlot> {
    let typed = source
        .downcast::<R>()
        .ok_or_else(|| CoreError::TypeMismatch {
            id: source.get().borrow().meta().id(),
            cached: source.type_name(),
            requested: std::any::type_name::<R>(),
        })?;
    let copy = typed.borrow().clone_resource(id, path, host)?;
    Ok(ResourceSlot::new(copy))
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_component<T: Component + Default>(&mut self, name: &'static str) -> &mut Self {
        self.insert::<T>(name, Constructor::Component(make_component::<T>))
    }

    pub fn register_system<S: System + Default>(&mut self, name: &'static str) -> &mut Self {
        self.insert::<S>(name, Constructor::System(make_system::<S>))
    }

    pub fn register_resource<R: Resource>(
        &mut self,
        name: &'static str,
        options: ResourceOptions,
    ) -> &mut Self {
        self.insert::<R>(
            name,
            Constructor::Resource(ResourceType {
                create: make_resource::<R>,
                duplicate: duplicate_resource::<R>,
                options,
            }),
        )
    }

    fn insert<T: 'static>(&mut self, name: &'static str, ctor: Constructor) -> &mut Self {
        let type_id = TypeId::of::<T>();
        if let Some(previous) = self.names.insert(type_id, name) {
            if previous != name {
                warn!(previous, name, "type re-registered under a new name");
                self.by_name.remove(previous);
            }
        }
        if self.by_name.insert(name, ctor).is_some() {
            warn!(name, "type name registered twice; keeping the latest");
        }
        self
    }

    pub fn name_of<T: 'static>(&self) -> Option<&'static str> {
        self.name_of_id(TypeId::of::<T>())
    }

    pub fn name_of_id(&self, type_id: TypeId) -> Option<&'static str> {
        self.names.get(&type_id).copied()
    }

    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        self.by_name.get(name).map(Constructor::kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn lookup(&self, name: &str, expected: TypeKind) -> CoreResult<(&'static str, Constructor)> {
        let (key, ctor) = self
            .by_name
            .get_key_value(name)
            .ok_or_else(|| CoreError::UnknownType(name.to_string()))?;
        if ctor.kind() != expected {
            return Err(CoreError::WrongKind {
                name: name.to_string(),
                expected,
                actual: ctor.kind(),
            });
        }
        Ok((*key, *ctor))
    }

    /// Resolves a component name to its registered spelling and constructor.
    pub(crate) fn component(&self, name: &str) -> CoreResult<(&'static str, ComponentCtor)> {
        match self.lookup(name, TypeKind::Component)? {
            (key, Constructor::Component(ctor)) => Ok((key, ctor)),
            _ => unreachable!("kind checked by lookup"),
        }
    }

    pub(crate) fn system(&self, name: &str) -> CoreResult<(&'static str, SystemCtor)> {
        match self.lookup(name, TypeKind::System)? {
            (key, Constructor::System(ctor)) => Ok((key, ctor)),
            _ => unreachable!("kind checked by lookup"),
        }
    }

    pub fn resource(&self, name: &str) -> CoreResult<ResourceType> {
        match self.lookup(name, TypeKind::Resource)? {
            (_, Constructor::Resource(info)) => Ok(info),
            _ => unreachable!("kind checked by lookup"),
        }
    }

    pub fn resource_by_type(&self, type_id: TypeId) -> Option<(&'static str, ResourceType)> {
        let name = self.name_of_id(type_id)?;
        self.resource(name).ok().map(|info| (name, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Transform;
    use crate::ecs::World;

    #[derive(Default)]
    struct Gravity;
    impl System for Gravity {}

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types
            .register_component::<Transform>("Transform")
            .register_system::<Gravity>("Gravity")
            .register_resource::<World>("World", ResourceOptions::cached());
        types
    }

    #[test]
    fn names_resolve_both_ways() {
        let types = registry();
        assert_eq!(types.name_of::<Transform>(), Some("Transform"));
        assert_eq!(types.kind_of("Gravity"), Some(TypeKind::System));
        assert_eq!(types.kind_of("World"), Some(TypeKind::Resource));
        assert!(types.component("Transform").is_ok());
        assert!(types.resource("World").unwrap().options.disk_cache);
    }

    #[test]
    fn wrong_kind_is_a_precondition_error() {
        let types = registry();
        match types.component("Gravity") {
            Err(CoreError::WrongKind {
                expected, actual, ..
            }) => {
                assert_eq!(expected, TypeKind::Component);
                assert_eq!(actual, TypeKind::System);
            }
            _ => panic!("expected a wrong-kind error"),
        }
        assert!(matches!(
            types.component("Missing"),
            Err(CoreError::UnknownType(_))
        ));
    }

    #[test]
    fn reregistration_replaces_old_name() {
        let mut types = registry();
        types.register_system::<Gravity>("Physics.Gravity");
        assert!(!types.contains("Gravity"));
        assert_eq!(types.name_of::<Gravity>(), Some("Physics.Gravity"));
    }
}
