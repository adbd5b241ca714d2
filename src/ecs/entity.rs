//! Entities and their component caches.
//!
//! An [`Entity`] is a handle: clones share the same identity and the same
//! component cache, which holds at most one instance per concrete component
//! type. The cache borrow is never held while a lifecycle hook runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::component::{self, Component, ComponentSlot};
use super::world::WorldShared;
use super::{Transform, World};
use crate::error::{CoreError, CoreResult};
use crate::id::{NativeHandle, Uuid};
use crate::slot::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Wrapper exists but the world store does not hold it yet.
    Unattached,
    Live,
    /// Terminal.
    Destroyed,
}

#[derive(Clone)]
struct ComponentEntry {
    name: &'static str,
    slot: ComponentSlot,
    handle: NativeHandle,
}

struct EntityData {
    id: Uuid,
    world: Weak<WorldShared>,
    components: RefCell<Vec<ComponentEntry>>,
    state: Cell<EntityState>,
}

#[derive(Clone)]
pub struct Entity(Rc<EntityData>);

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.0.id)
            .field("state", &self.0.state.get())
            .field("components", &self.component_names())
            .finish()
    }
}

impl Entity {
    pub(crate) fn new(id: Uuid, world: Weak<WorldShared>) -> Self {
        Self(Rc::new(EntityData {
            id,
            world,
            components: RefCell::new(Vec::new()),
            state: Cell::new(EntityState::Unattached),
        }))
    }

    pub(crate) fn mark_live(&self) {
        if self.state() == EntityState::Unattached {
            self.0.state.set(EntityState::Live);
        }
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn state(&self) -> EntityState {
        self.0.state.get()
    }

    pub fn is_alive(&self) -> bool {
        self.state() == EntityState::Live
    }

    /// The owning world, if it is still around.
    pub fn world(&self) -> Option<World> {
        self.0.world.upgrade().map(World)
    }

    /// True when both handles point at the same wrapper.
    pub fn same_instance(&self, other: &Entity) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn live_world(&self) -> CoreResult<Rc<WorldShared>> {
        match self.0.world.upgrade() {
            Some(world) if self.state() != EntityState::Destroyed => Ok(world),
            _ => Err(CoreError::EntityNotLive(self.id())),
        }
    }

    fn entries(&self) -> Vec<ComponentEntry> {
        self.0.components.borrow().clone()
    }

    pub fn components(&self) -> Vec<ComponentSlot> {
        self.0
            .components
            .borrow()
            .iter()
            .map(|entry| entry.slot.clone())
            .collect()
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.0
            .components
            .borrow()
            .iter()
            .map(|entry| entry.name)
            .collect()
    }

    pub(crate) fn holds(&self, slot: &ComponentSlot) -> bool {
        self.0
            .components
            .borrow()
            .iter()
            .any(|entry| entry.slot.ptr_eq(slot))
    }

    pub fn native_handle<T: Component>(&self) -> Option<NativeHandle> {
        self.0
            .components
            .borrow()
            .iter()
            .find(|entry| entry.slot.is::<T>())
            .map(|entry| entry.handle)
    }

    pub fn get_component<T: Component>(&self) -> Option<Shared<T>> {
        self.0
            .components
            .borrow()
            .iter()
            .find(|entry| entry.slot.is::<T>())
            .and_then(|entry| entry.slot.downcast::<T>())
    }

    pub fn get_component_named(&self, name: &str) -> Option<ComponentSlot> {
        self.0
            .components
            .borrow()
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.slot.clone())
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.0
            .components
            .borrow()
            .iter()
            .any(|entry| entry.slot.is::<T>())
    }

    /// Attaches a `T`, or returns the one already attached.
    ///
    /// `T` must be registered as a component. When the world is active a
    /// new behaviour is enabled and started before this returns.
    pub fn add_component<T: Component>(&self) -> Option<Shared<T>> {
        if let Some(existing) = self.get_component::<T>() {
            return Some(existing);
        }
        let name = self.0.world.upgrade().and_then(|world| world.host.types().name_of::<T>());
        let Some(name) = name else {
            error!(
                entity = %self.id(),
                component = std::any::type_name::<T>(),
                "component type is not registered"
            );
            return None;
        };
        match self.add_component_named(name) {
            Ok(slot) => slot.downcast::<T>(),
            Err(err) => {
                error!(entity = %self.id(), component = name, %err, "cannot add component");
                None
            }
        }
    }

    /// Attaches a component by registered name.
    pub fn add_component_named(&self, name: &str) -> CoreResult<ComponentSlot> {
        if let Some(existing) = self.get_component_named(name) {
            return Ok(existing);
        }
        let world = self.live_world()?;
        let (name, ctor) = world.host.types().component(name)?;
        Ok(self.attach(&world, name, ctor(), true))
    }

    fn attach(
        &self,
        world: &WorldShared,
        name: &'static str,
        slot: ComponentSlot,
        fire_hooks: bool,
    ) -> ComponentSlot {
        let handle = world
            .host
            .bridge()
            .add_component(world.meta.id(), self.id(), name);
        slot.get().borrow_mut().bind_native(handle);
        self.0.components.borrow_mut().push(ComponentEntry {
            name,
            slot: slot.clone(),
            handle,
        });
        debug!(entity = %self.id(), component = name, "component added");

        if fire_hooks && world.active.get() {
            component::start(&slot, self);
        }
        slot
    }

    /// Detaches the `T` instance. Returns `false` when none is attached.
    ///
    /// The cache entry goes first, so hooks no longer see the component.
    /// While the world is active the behaviour is stopped and then disposed;
    /// an inactive world detaches it silently.
    pub fn remove_component<T: Component>(&self) -> bool {
        self.remove_where(|entry| entry.slot.is::<T>())
    }

    pub fn remove_component_named(&self, name: &str) -> bool {
        self.remove_where(|entry| entry.name == name)
    }

    fn remove_where(&self, matches: impl Fn(&ComponentEntry) -> bool) -> bool {
        let entry = {
            let mut components = self.0.components.borrow_mut();
            match components.iter().position(|entry| matches(entry)) {
                Some(index) => components.remove(index),
                None => return false,
            }
        };

        let world = self.0.world.upgrade();
        if world.as_ref().is_some_and(|world| world.active.get()) {
            component::stop(&entry.slot, self);
            component::dispose(&entry.slot, self);
        }
        if let Some(world) = world {
            world
                .host
                .bridge()
                .remove_component(world.meta.id(), self.id(), entry.name);
        }
        debug!(entity = %self.id(), component = entry.name, "component removed");
        true
    }

    /// Destroys this entity and, first, all of its hierarchy children.
    ///
    /// Every behaviour is disabled and receives `destroyed` whether or not the
    /// world is active. Calling this twice is a no-op.
    pub fn destroy(&self) {
        if self.state() == EntityState::Destroyed {
            return;
        }
        self.0.state.set(EntityState::Destroyed);

        if let Some(world) = self.world() {
            for child in self.children() {
                child.destroy();
            }
            if let Some(parent) = self.parent() {
                if let Some(transform) = parent.get_component::<Transform>() {
                    transform.borrow_mut().detach_child(self.id());
                }
            }
            world.forget_entity(self.id());
            world.host().bridge().destroy_entity(world.id(), self.id());
        }

        for entry in self.entries() {
            component::dispose(&entry.slot, self);
            component::stop(&entry.slot, self);
        }
        self.0.components.borrow_mut().clear();
        debug!(entity = %self.id(), "entity destroyed");
    }

    pub fn parent(&self) -> Option<Entity> {
        let parent = self.get_component::<Transform>()?.borrow().parent?;
        self.world()?.entity(parent)
    }

    pub fn children(&self) -> Vec<Entity> {
        let Some(transform) = self.get_component::<Transform>() else {
            return Vec::new();
        };
        let ids = transform.borrow().children.clone();
        let Some(world) = self.world() else {
            return Vec::new();
        };
        ids.into_iter().filter_map(|id| world.entity(id)).collect()
    }

    /// Re-parents this entity, adding a [`Transform`] to either side where
    /// missing. Rejects parents from another world, dead parents and cycles.
    pub fn set_parent(&self, parent: Option<&Entity>) -> bool {
        if !self.is_alive() {
            return false;
        }
        if let Some(parent) = parent {
            if !parent.is_alive() || !Weak::ptr_eq(&self.0.world, &parent.0.world) {
                warn!(entity = %self.id(), parent = %parent.id(), "parent is not live in this world");
                return false;
            }
            if self.is_ancestor_of(parent) {
                warn!(entity = %self.id(), parent = %parent.id(), "re-parenting would form a cycle");
                return false;
            }
        }

        let Some(transform) = self.add_component::<Transform>() else {
            return false;
        };
        let new_parent = match parent {
            Some(parent) => match parent.add_component::<Transform>() {
                Some(parent_transform) => Some((parent.id(), parent_transform)),
                None => return false,
            },
            None => None,
        };

        if let Some(old) = self.parent() {
            if let Some(old_transform) = old.get_component::<Transform>() {
                old_transform.borrow_mut().detach_child(self.id());
            }
        }
        match new_parent {
            Some((id, parent_transform)) => {
                parent_transform.borrow_mut().attach_child(self.id());
                transform.borrow_mut().parent = Some(id);
            }
            None => transform.borrow_mut().parent = None,
        }
        true
    }

    fn is_ancestor_of(&self, other: &Entity) -> bool {
        let limit = self.world().map(|world| world.entity_count()).unwrap_or(0) + 1;
        let mut cursor = Some(other.clone());
        for _ in 0..=limit {
            match cursor {
                Some(node) if node.id() == self.id() => return true,
                Some(node) => cursor = node.parent(),
                None => return false,
            }
        }
        true
    }

    /// Saves the entity as `{"ID": "<id>", "Components": {name: state}}`.
    /// A component that fails to serialize is logged and left out.
    pub fn on_serialize(&self) -> Value {
        let mut components = Map::new();
        for entry in self.entries() {
            let state = entry.slot.get().borrow().on_serialize();
            match state {
                Ok(state) => {
                    components.insert(entry.name.to_string(), state);
                }
                Err(err) => {
                    error!(entity = %self.id(), component = entry.name, %err, "component failed to serialize");
                }
            }
        }
        let mut entity = Map::new();
        entity.insert("ID".into(), Value::String(self.id().to_string()));
        entity.insert("Components".into(), Value::Object(components));
        Value::Object(entity)
    }

    /// First restore pass: creates an empty shell for every saved component.
    /// No state is applied and no hook fires.
    pub fn on_deserialize(&self, data: &Value) -> CoreResult<()> {
        let world = self.live_world()?;
        let Some(components) = component_map(data)? else {
            return Ok(());
        };
        for name in components.keys() {
            if self.get_component_named(name).is_some() {
                continue;
            }
            match world.host.types().component(name) {
                Ok((name, ctor)) => {
                    self.attach(&world, name, ctor(), false);
                }
                Err(err) => {
                    warn!(entity = %self.id(), component = name.as_str(), %err, "skipping saved component");
                }
            }
        }
        Ok(())
    }

    /// Second restore pass: feeds saved state into the shells. Every entity
    /// of the world exists by now, so cross-references resolve.
    pub fn on_post_deserialize(&self, data: &Value) -> CoreResult<()> {
        let Some(components) = component_map(data)? else {
            return Ok(());
        };
        for (name, state) in components {
            let Some(slot) = self.get_component_named(name) else {
                continue;
            };
            let restored = match slot.get().try_borrow_mut() {
                Ok(mut component) => component.on_deserialize(state, self),
                Err(_) => continue,
            };
            component::settle(self);
            if let Err(err) = restored {
                error!(entity = %self.id(), component = name.as_str(), %err, "component failed to deserialize");
            }
        }
        Ok(())
    }
}

fn component_map(data: &Value) -> CoreResult<Option<&Map<String, Value>>> {
    match data.get("Components") {
        Some(Value::Object(components)) => Ok(Some(components)),
        None | Some(Value::Null) => Ok(None),
        Some(other) => Err(CoreError::Malformed(format!(
            "entity components must be an object, found {other}"
        ))),
    }
}
