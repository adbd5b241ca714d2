//! World - container of entities and systems with an activation flag.
//!
//! A [`World`] is a handle over shared state; clones observe the same
//! entities, systems and flag. It is also a [`Resource`], so worlds load,
//! persist and duplicate through the resource registry like any asset.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::component::{self, Component, ComponentSlot, PendingHook};
use super::system::{SystemRegistry, SystemSlot};
use super::{Entity, System};
use crate::error::{CoreError, CoreResult};
use crate::host::Host;
use crate::id::Uuid;
use crate::resource::{Resource, ResourceMeta};
use crate::slot::Shared;

pub(crate) struct WorldShared {
    pub(crate) meta: ResourceMeta,
    pub(crate) host: Host,
    pub(crate) active: Cell<bool>,
    pub(crate) pending: RefCell<Vec<PendingHook>>,
    entities: RefCell<HashMap<Uuid, Entity>>,
    systems: RefCell<SystemRegistry>,
}

/// Per-call statistics of [`World::update`].
#[derive(Debug, Clone, Default)]
pub struct UpdateStats {
    pub duration: Duration,
    pub systems_run: usize,
    pub behaviours_run: usize,
    pub system_times: Vec<(&'static str, Duration)>,
}

#[derive(Clone)]
pub struct World(pub(crate) Rc<WorldShared>);

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id())
            .field("path", &self.0.meta.path())
            .field("active", &self.is_active())
            .field("entities", &self.0.entities.borrow().len())
            .field("systems", &self.0.systems.borrow().names())
            .finish()
    }
}

impl World {
    fn empty(host: &Host) -> Self {
        Self(Rc::new(WorldShared {
            meta: ResourceMeta::default(),
            host: host.clone(),
            active: Cell::new(false),
            pending: RefCell::new(Vec::new()),
            entities: RefCell::new(HashMap::new()),
            systems: RefCell::new(SystemRegistry::new()),
        }))
    }

    /// Creates an inactive world with a fresh ID, outside any registry.
    pub fn new(host: &Host) -> Self {
        let world = Self::empty(host);
        world.0.meta.set_id(host.bridge().generate_id());
        world
    }

    pub fn id(&self) -> Uuid {
        self.0.meta.id()
    }

    pub fn host(&self) -> &Host {
        &self.0.host
    }

    pub fn same_instance(&self, other: &World) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn create_entity(&self) -> Entity {
        let id = self.0.host.bridge().create_entity(self.id());
        self.adopt(id)
    }

    /// Creates an entity under a caller-chosen ID. An invalid ID falls back
    /// to a fresh one; an ID already live here returns that entity.
    pub fn create_entity_with_id(&self, id: Uuid) -> Entity {
        if !id.is_valid() {
            return self.create_entity();
        }
        if let Some(existing) = self.0.entities.borrow().get(&id).cloned() {
            warn!(world = %self.id(), entity = %id, "entity id already live");
            return existing;
        }
        let id = self.0.host.bridge().create_entity_with_id(self.id(), id);
        self.adopt(id)
    }

    fn adopt(&self, id: Uuid) -> Entity {
        let entity = Entity::new(id, Rc::downgrade(&self.0));
        self.0.entities.borrow_mut().insert(id, entity.clone());
        entity.mark_live();
        debug!(world = %self.id(), entity = %id, "entity created");
        entity
    }

    /// The wrapper for `id`. An entity the native table knows about but that
    /// has no wrapper yet is wrapped and cached on first access.
    pub fn entity(&self, id: Uuid) -> Option<Entity> {
        if !id.is_valid() {
            return None;
        }
        if let Some(entity) = self.0.entities.borrow().get(&id) {
            return Some(entity.clone());
        }
        if self.0.host.bridge().has_entity(self.id(), id) {
            return Some(self.adopt(id));
        }
        None
    }

    /// All live entities, ordered by ID.
    pub fn entities(&self) -> Vec<Entity> {
        self.0
            .host
            .bridge()
            .entities(self.id())
            .into_iter()
            .filter_map(|id| self.entity(id))
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.0.host.bridge().entities(self.id()).len()
    }

    pub(crate) fn forget_entity(&self, id: Uuid) {
        self.0.entities.borrow_mut().remove(&id);
    }

    /// Destroys every entity.
    pub fn clear(&self) {
        for entity in self.entities() {
            entity.destroy();
        }
    }

    /// Every entity holding a `T`, paired with that component.
    pub fn query<T: Component>(&self) -> Vec<(Entity, Shared<T>)> {
        let Some(name) = self.0.host.types().name_of::<T>() else {
            return Vec::new();
        };
        self.0
            .host
            .bridge()
            .component_owners(self.id(), name)
            .into_iter()
            .filter_map(|id| self.entity(id))
            .filter_map(|entity| {
                let component = entity.get_component::<T>()?;
                Some((entity, component))
            })
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Switches the activation flag and fans the transition out.
    ///
    /// Deactivating stops every behaviour, then disables every system.
    /// Activating starts every behaviour, then enables every system. Each
    /// behaviour is visited exactly once per transition. A hook that flips
    /// the flag again ends this fan-out; the nested call owns the rest.
    pub fn set_active(&self, active: bool) {
        if self.is_active() == active {
            return;
        }
        self.0.active.set(active);

        let pairs: Vec<(Entity, ComponentSlot)> = self
            .entities()
            .into_iter()
            .flat_map(|entity| {
                let slots = entity.components();
                slots.into_iter().map(move |slot| (entity.clone(), slot))
            })
            .collect();

        let mut behaviours = 0;
        for (entity, slot) in &pairs {
            if self.is_active() != active {
                debug!(world = %self.id(), active, "activation changed by a hook");
                return;
            }
            if !entity.is_alive() || !entity.holds(slot) {
                continue;
            }
            let fired = if active {
                component::start(slot, entity)
            } else {
                component::stop(slot, entity)
            };
            behaviours += usize::from(fired);
        }

        if self.is_active() != active {
            debug!(world = %self.id(), active, "activation changed by a hook");
            return;
        }
        let names = self.0.systems.borrow().names();
        for name in names {
            self.enable_system_named(name, active);
        }
        info!(world = %self.id(), active, behaviours, "world activation changed");
    }

    pub fn add_system<S: System>(&self) -> Option<Shared<S>> {
        if let Some(existing) = self.get_system::<S>() {
            return Some(existing);
        }
        let Some(name) = self.0.host.types().name_of::<S>() else {
            error!(world = %self.id(), system = std::any::type_name::<S>(), "system type is not registered");
            return None;
        };
        match self.add_system_named(name) {
            Ok(slot) => slot.downcast::<S>(),
            Err(err) => {
                error!(world = %self.id(), system = name, %err, "cannot add system");
                None
            }
        }
    }

    /// Adds a system by registered name, or returns the existing one. A new
    /// system starts enabled exactly when the world is active.
    pub fn add_system_named(&self, name: &str) -> CoreResult<SystemSlot> {
        let (name, ctor) = self.0.host.types().system(name)?;
        if let Some(existing) = self.0.systems.borrow().get(name) {
            return Ok(existing);
        }
        let active = self.is_active();
        let bridge = self.0.host.bridge();
        bridge.add_system(self.id(), name);
        let (slot, _) = self.0.systems.borrow_mut().add(name, ctor(), active);
        if active {
            bridge.enable_system(self.id(), name, true);
            self.notify_enable(name, &slot, true);
        }
        debug!(world = %self.id(), system = name, enabled = active, "system added");
        Ok(slot)
    }

    pub fn get_system<S: System>(&self) -> Option<Shared<S>> {
        self.0
            .systems
            .borrow()
            .get_by_type(TypeId::of::<S>())
            .and_then(|slot| slot.downcast::<S>())
    }

    pub fn get_system_named(&self, name: &str) -> Option<SystemSlot> {
        self.0.systems.borrow().get(name)
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.0.systems.borrow().contains(name)
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.0.systems.borrow().names()
    }

    pub fn is_system_enabled(&self, name: &str) -> bool {
        self.0.systems.borrow().is_enabled(name)
    }

    pub fn remove_system<S: System>(&self) -> bool {
        match self.0.host.types().name_of::<S>() {
            Some(name) => self.remove_system_named(name),
            None => false,
        }
    }

    pub fn remove_system_named(&self, name: &str) -> bool {
        let Some(entry) = self.0.systems.borrow_mut().remove(name) else {
            return false;
        };
        if entry.enabled {
            self.notify_enable(entry.name, &entry.slot, false);
        }
        self.0.host.bridge().remove_system(self.id(), entry.name);
        debug!(world = %self.id(), system = entry.name, "system removed");
        true
    }

    pub fn enable_system<S: System>(&self, enabled: bool) -> bool {
        match self.0.host.types().name_of::<S>() {
            Some(name) => self.enable_system_named(name, enabled),
            None => false,
        }
    }

    /// Returns `false` when the system is missing or already in that state.
    pub fn enable_system_named(&self, name: &str, enabled: bool) -> bool {
        if !self.0.systems.borrow_mut().set_enabled(name, enabled) {
            return false;
        }
        let Some(slot) = self.get_system_named(name) else {
            return false;
        };
        self.0.host.bridge().enable_system(self.id(), name, enabled);
        self.notify_enable(name, &slot, enabled);
        true
    }

    /// A system toggled from inside one of its own callbacks already sees
    /// the new state through the registry; only the notification is skipped.
    fn notify_enable(&self, name: &str, slot: &SystemSlot, enabled: bool) {
        match slot.get().try_borrow_mut() {
            Ok(mut system) => system.on_enable(enabled),
            Err(_) => warn!(world = %self.id(), system = name, enabled, "system is busy; on_enable skipped"),
        }
    }

    /// Runs one frame: enabled systems in registration order, then every
    /// enabled behaviour. Does nothing while the world is inactive.
    pub fn update(&self, dt: f64) -> UpdateStats {
        let started = Instant::now();
        let mut stats = UpdateStats::default();
        if !self.is_active() {
            return stats;
        }

        let entries = self.0.systems.borrow().entries();
        for entry in entries {
            if !self.is_system_enabled(entry.name) {
                continue;
            }
            let Ok(mut system) = entry.slot.get().try_borrow_mut() else {
                continue;
            };
            let system_start = Instant::now();
            system.update(self, dt);
            drop(system);
            stats.system_times.push((entry.name, system_start.elapsed()));
            stats.systems_run += 1;
        }

        for entity in self.entities() {
            for slot in entity.components() {
                if !entity.is_alive() || !entity.holds(&slot) {
                    continue;
                }
                if component::tick(&slot, &entity, dt) {
                    stats.behaviours_run += 1;
                }
            }
        }

        stats.duration = started.elapsed();
        stats
    }

    /// Saves systems and entities as
    /// `{"Systems": {name: state}, "Entities": [entity, ...]}`.
    pub fn on_serialize(&self) -> Value {
        let mut systems = Map::new();
        let entries = self.0.systems.borrow().entries();
        for entry in entries {
            let state = entry.slot.get().borrow().on_serialize();
            match state {
                Ok(state) => {
                    systems.insert(entry.name.to_string(), state);
                }
                Err(err) => {
                    error!(world = %self.id(), system = entry.name, %err, "system failed to serialize");
                }
            }
        }
        let entities: Vec<Value> = self.entities().iter().map(Entity::on_serialize).collect();

        let mut world = Map::new();
        world.insert("Systems".into(), Value::Object(systems));
        world.insert("Entities".into(), Value::Array(entities));
        Value::Object(world)
    }

    /// Replaces the world's content with `data`.
    ///
    /// Failures are logged and leave whatever was restored so far in place.
    pub fn on_deserialize(&self, data: &Value) {
        if let Err(err) = self.restore(data) {
            error!(world = %self.id(), %err, "world restore aborted; keeping partial state");
        }
    }

    fn restore(&self, data: &Value) -> CoreResult<()> {
        let saved: &[Value] = match data.get("Entities") {
            Some(Value::Array(entities)) => entities.as_slice(),
            None | Some(Value::Null) => &[],
            Some(other) => {
                return Err(CoreError::Malformed(format!(
                    "world entities must be an array, found {other}"
                )))
            }
        };

        self.clear();

        // Shells only: every entity and component exists before any state
        // is applied.
        let mut restored = Vec::with_capacity(saved.len());
        for entry in saved {
            let id = match entry.get("ID").map(Uuid::deserialize) {
                Some(Ok(id)) => id,
                Some(Err(err)) => {
                    warn!(world = %self.id(), %err, "saved entity has a malformed ID; skipping");
                    continue;
                }
                None => {
                    warn!(world = %self.id(), "saved entity has no ID; skipping");
                    continue;
                }
            };
            let entity = self.create_entity_with_id(id);
            if let Err(err) = entity.on_deserialize(entry) {
                error!(world = %self.id(), entity = %id, %err, "entity failed to deserialize");
            }
            restored.push((entity, entry));
        }

        for (entity, entry) in &restored {
            if let Err(err) = entity.on_post_deserialize(entry) {
                error!(world = %self.id(), entity = %entity.id(), %err, "entity failed to deserialize");
            }
        }

        if self.is_active() {
            for (entity, _) in &restored {
                for slot in entity.components() {
                    if entity.is_alive() && entity.holds(&slot) {
                        component::start(&slot, entity);
                    }
                }
            }
        }

        if let Some(systems) = data.get("Systems").and_then(Value::as_object) {
            for (name, state) in systems {
                let slot = match self.add_system_named(name) {
                    Ok(slot) => slot,
                    Err(err) => {
                        warn!(world = %self.id(), system = name.as_str(), %err, "skipping saved system");
                        continue;
                    }
                };
                self.enable_system_named(name, self.is_active());
                let Ok(mut system) = slot.get().try_borrow_mut() else {
                    continue;
                };
                let restored = system.on_deserialize(state, self);
                drop(system);
                if let Err(err) = restored {
                    error!(world = %self.id(), system = name.as_str(), %err, "system failed to deserialize");
                }
            }
        }

        info!(world = %self.id(), entities = restored.len(), "world restored");
        Ok(())
    }
}

impl Resource for World {
    fn create(host: &Host) -> Self {
        World::empty(host)
    }

    fn meta(&self) -> &ResourceMeta {
        &self.0.meta
    }

    fn on_unload(&mut self) {
        self.clear();
        self.set_active(false);
    }

    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(World::on_serialize(self))
    }

    fn on_deserialize(&mut self, data: &Value) -> CoreResult<()> {
        World::on_deserialize(self, data);
        Ok(())
    }
}
