//! World-scoped services.
//!
//! [`SystemRegistry`] is bookkeeping only: it tracks which systems a world
//! holds and whether each is enabled. The owning [`World`](super::World)
//! talks to the native bridge and fires `on_enable` around it.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use super::World;
use crate::error::CoreResult;
use crate::slot::Slot;

pub type SystemSlot = Slot<dyn System>;

impl Slot<dyn System> {
    pub fn new<S: System>(system: S) -> Self {
        let typed = Rc::new(RefCell::new(system));
        let inner: Rc<RefCell<dyn System>> = typed.clone();
        Slot::from_parts(typed, inner)
    }
}

pub trait System: Any {
    fn on_enable(&mut self, _enabled: bool) {}

    fn update(&mut self, _world: &World, _dt: f64) {}

    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(Value::Null)
    }

    fn on_deserialize(&mut self, _data: &Value, _world: &World) -> CoreResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct SystemEntry {
    pub name: &'static str,
    pub slot: SystemSlot,
    pub enabled: bool,
}

#[derive(Default)]
pub struct SystemRegistry {
    entries: Vec<SystemEntry>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<SystemSlot> {
        self.position(name).map(|i| self.entries[i].slot.clone())
    }

    pub fn get_by_type(&self, type_id: TypeId) -> Option<SystemSlot> {
        self.entries
            .iter()
            .find(|entry| entry.slot.type_id() == type_id)
            .map(|entry| entry.slot.clone())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.position(name)
            .map(|i| self.entries[i].enabled)
            .unwrap_or(false)
    }

    /// Inserts `slot` under `name` unless a system of that name already
    /// exists. Returns the slot the registry holds and whether it is new.
    pub(crate) fn add(
        &mut self,
        name: &'static str,
        slot: SystemSlot,
        enabled: bool,
    ) -> (SystemSlot, bool) {
        if let Some(existing) = self.get(name) {
            return (existing, false);
        }
        self.entries.push(SystemEntry {
            name,
            slot: slot.clone(),
            enabled,
        });
        (slot, true)
    }

    /// Flips the enabled flag. Returns `false` when the system is missing or
    /// already in the requested state.
    pub(crate) fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.position(name) {
            Some(i) if self.entries[i].enabled != enabled => {
                self.entries[i].enabled = enabled;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<SystemEntry> {
        self.position(name).map(|i| self.entries.remove(i))
    }

    pub(crate) fn entries(&self) -> Vec<SystemEntry> {
        self.entries.clone()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}
