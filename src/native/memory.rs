use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::NativeBridge;
use crate::id::{NativeHandle, Uuid};

/// Host-side bridge that keeps every native table in process memory.
///
/// IDs come from a seeded ChaCha stream so two bridges built with the same
/// seed hand out the same sequence.
pub struct InMemoryBridge {
    state: RefCell<BridgeState>,
}

struct BridgeState {
    rng: ChaCha8Rng,
    issued: HashSet<Uuid>,
    next_handle: u64,
    resources: HashMap<Uuid, NativeResource>,
    resource_paths: HashMap<String, Uuid>,
    worlds: HashMap<Uuid, NativeWorld>,
}

struct NativeResource {
    path: String,
    handle: NativeHandle,
}

#[derive(Default)]
struct NativeWorld {
    entities: BTreeSet<Uuid>,
    components: HashMap<Uuid, BTreeMap<String, NativeHandle>>,
    systems: BTreeMap<String, NativeSystem>,
}

struct NativeSystem {
    enabled: bool,
}

impl InMemoryBridge {
    pub fn new(seed: u64) -> Self {
        Self {
            state: RefCell::new(BridgeState {
                rng: ChaCha8Rng::seed_from_u64(seed),
                issued: HashSet::new(),
                next_handle: 1,
                resources: HashMap::new(),
                resource_paths: HashMap::new(),
                worlds: HashMap::new(),
            }),
        }
    }

    /// Creates a native-only resource entry, as if the engine had imported
    /// it before any managed code ran.
    pub fn seed_resource(&self, path: &str) -> Uuid {
        let id = self.generate_id();
        self.register_resource(id, path);
        id
    }

    pub fn resource_count(&self) -> usize {
        self.state.borrow().resources.len()
    }

    pub fn system_enabled(&self, world: Uuid, token: &str) -> Option<bool> {
        let state = self.state.borrow();
        state
            .worlds
            .get(&world)
            .and_then(|w| w.systems.get(token))
            .map(|s| s.enabled)
    }

    pub fn has_component(&self, world: Uuid, entity: Uuid, token: &str) -> bool {
        let state = self.state.borrow();
        state
            .worlds
            .get(&world)
            .and_then(|w| w.components.get(&entity))
            .map(|c| c.contains_key(token))
            .unwrap_or(false)
    }
}

impl Default for InMemoryBridge {
    fn default() -> Self {
        Self::new(0x5EED)
    }
}

impl BridgeState {
    fn next_id(&mut self) -> Uuid {
        loop {
            let id = Uuid::new(self.rng.next_u64());
            if id.is_valid() && self.issued.insert(id) {
                return id;
            }
        }
    }

    fn next_handle(&mut self) -> NativeHandle {
        let handle = NativeHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn world(&mut self, world: Uuid) -> &mut NativeWorld {
        self.worlds.entry(world).or_default()
    }
}

impl NativeBridge for InMemoryBridge {
    fn generate_id(&self) -> Uuid {
        self.state.borrow_mut().next_id()
    }

    fn resource_exists(&self, id: Uuid) -> bool {
        self.state.borrow().resources.contains_key(&id)
    }

    fn resource_id(&self, path: &str) -> Uuid {
        self.state
            .borrow()
            .resource_paths
            .get(path)
            .copied()
            .unwrap_or(Uuid::INVALID)
    }

    fn resource_path(&self, id: Uuid) -> Option<String> {
        self.state
            .borrow()
            .resources
            .get(&id)
            .map(|r| r.path.clone())
    }

    fn register_resource(&self, id: Uuid, path: &str) {
        if !id.is_valid() {
            return;
        }
        let mut state = self.state.borrow_mut();
        state.issued.insert(id);
        let handle = state.next_handle();
        if let Some(previous) = state.resources.insert(
            id,
            NativeResource {
                path: path.to_string(),
                handle,
            },
        ) {
            if previous.path != path {
                state.resource_paths.remove(&previous.path);
            }
        }
        state.resource_paths.insert(path.to_string(), id);
    }

    fn duplicate_resource(&self, id: Uuid, new_path: &str) -> Uuid {
        if !self.resource_exists(id) {
            return Uuid::INVALID;
        }
        let new_id = self.generate_id();
        self.register_resource(new_id, new_path);
        new_id
    }

    fn unload_resource(&self, id: Uuid) {
        let mut state = self.state.borrow_mut();
        if let Some(resource) = state.resources.remove(&id) {
            if state.resource_paths.get(&resource.path) == Some(&id) {
                state.resource_paths.remove(&resource.path);
            }
        }
    }

    fn resource_instance(&self, id: Uuid) -> Option<NativeHandle> {
        self.state.borrow().resources.get(&id).map(|r| r.handle)
    }

    fn create_entity(&self, world: Uuid) -> Uuid {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.world(world).entities.insert(id);
        id
    }

    fn create_entity_with_id(&self, world: Uuid, id: Uuid) -> Uuid {
        if !id.is_valid() {
            return self.create_entity(world);
        }
        let mut state = self.state.borrow_mut();
        state.issued.insert(id);
        state.world(world).entities.insert(id);
        id
    }

    fn has_entity(&self, world: Uuid, id: Uuid) -> bool {
        self.state
            .borrow()
            .worlds
            .get(&world)
            .map(|w| w.entities.contains(&id))
            .unwrap_or(false)
    }

    fn destroy_entity(&self, world: Uuid, id: Uuid) {
        let mut state = self.state.borrow_mut();
        if let Some(native) = state.worlds.get_mut(&world) {
            native.entities.remove(&id);
            native.components.remove(&id);
        }
    }

    fn entities(&self, world: Uuid) -> Vec<Uuid> {
        self.state
            .borrow()
            .worlds
            .get(&world)
            .map(|w| w.entities.iter().copied().collect())
            .unwrap_or_default()
    }

    fn add_component(&self, world: Uuid, entity: Uuid, token: &str) -> NativeHandle {
        let mut state = self.state.borrow_mut();
        if let Some(handle) = state
            .worlds
            .get(&world)
            .and_then(|w| w.components.get(&entity))
            .and_then(|c| c.get(token))
        {
            return *handle;
        }
        let handle = state.next_handle();
        state
            .world(world)
            .components
            .entry(entity)
            .or_default()
            .insert(token.to_string(), handle);
        handle
    }

    fn remove_component(&self, world: Uuid, entity: Uuid, token: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(components) = state
            .worlds
            .get_mut(&world)
            .and_then(|w| w.components.get_mut(&entity))
        {
            components.remove(token);
        }
    }

    fn component_owners(&self, world: Uuid, token: &str) -> Vec<Uuid> {
        let state = self.state.borrow();
        let Some(native) = state.worlds.get(&world) else {
            return Vec::new();
        };
        let mut owners: Vec<Uuid> = native
            .components
            .iter()
            .filter(|(_, tokens)| tokens.contains_key(token))
            .map(|(entity, _)| *entity)
            .collect();
        owners.sort();
        owners
    }

    fn add_system(&self, world: Uuid, token: &str) -> NativeHandle {
        let mut state = self.state.borrow_mut();
        let handle = state.next_handle();
        state
            .world(world)
            .systems
            .entry(token.to_string())
            .or_insert(NativeSystem { enabled: false });
        handle
    }

    fn has_system(&self, world: Uuid, token: &str) -> bool {
        self.state
            .borrow()
            .worlds
            .get(&world)
            .map(|w| w.systems.contains_key(token))
            .unwrap_or(false)
    }

    fn remove_system(&self, world: Uuid, token: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(native) = state.worlds.get_mut(&world) {
            native.systems.remove(token);
        }
    }

    fn enable_system(&self, world: Uuid, token: &str, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if let Some(system) = state
            .worlds
            .get_mut(&world)
            .and_then(|w| w.systems.get_mut(token))
        {
            system.enabled = enabled;
        }
    }
}
