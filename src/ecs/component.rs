//! Component capabilities.
//!
//! Every component implements [`Component`]. Lifecycle participation is
//! opt-in: a component exposes [`Behaviour`] and/or [`Disposable`] through
//! the `as_*` accessors and the entity/world code dispatches on those.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use tracing::warn;

use super::Entity;
use crate::error::CoreResult;
use crate::id::NativeHandle;
use crate::slot::Slot;

pub type ComponentSlot = Slot<dyn Component>;

impl Slot<dyn Component> {
    pub fn new<T: Component>(component: T) -> Self {
        let typed = Rc::new(RefCell::new(component));
        let inner: Rc<RefCell<dyn Component>> = typed.clone();
        Slot::from_parts(typed, inner)
    }
}

pub trait Component: Any {
    fn as_behaviour(&mut self) -> Option<&mut dyn Behaviour> {
        None
    }

    fn as_disposable(&mut self) -> Option<&mut dyn Disposable> {
        None
    }

    /// Receives the handle of the native storage allocated for this component.
    fn bind_native(&mut self, _handle: NativeHandle) {}

    fn on_serialize(&self) -> CoreResult<Value> {
        Ok(Value::Null)
    }

    /// Populates fields from saved state. Runs once every entity and
    /// component of the world being restored exists, so references to other
    /// entities can be resolved through `entity.world()`.
    fn on_deserialize(&mut self, _data: &Value, _entity: &Entity) -> CoreResult<()> {
        Ok(())
    }
}

/// Lifecycle hooks driven by world activation.
pub trait Behaviour {
    fn enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn start(&mut self, entity: &Entity);

    fn destroyed(&mut self, entity: &Entity);

    fn update(&mut self, _entity: &Entity, _dt: f64) {}
}

pub trait Disposable {
    fn dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Start,
    Stop,
    Dispose,
}

/// A hook that found its component busy inside another of its own hooks.
pub(crate) struct PendingHook {
    slot: ComponentSlot,
    entity: Entity,
    hook: Hook,
}

pub(crate) fn start(slot: &ComponentSlot, entity: &Entity) -> bool {
    run(slot, entity, Hook::Start)
}

pub(crate) fn stop(slot: &ComponentSlot, entity: &Entity) -> bool {
    run(slot, entity, Hook::Stop)
}

pub(crate) fn dispose(slot: &ComponentSlot, entity: &Entity) -> bool {
    run(slot, entity, Hook::Dispose)
}

/// Runs `hook` on the component in `slot`.
///
/// A component that is already executing one of its own hooks cannot be
/// borrowed again; the call is queued on the world instead and runs as soon
/// as the outer hook returns. Returns whether the hook fired now.
fn run(slot: &ComponentSlot, entity: &Entity, hook: Hook) -> bool {
    let Ok(mut component) = slot.get().try_borrow_mut() else {
        defer(slot, entity, hook);
        return false;
    };
    let fired = apply(&mut *component, entity, hook);
    drop(component);
    settle(entity);
    fired
}

fn apply(component: &mut dyn Component, entity: &Entity, hook: Hook) -> bool {
    match hook {
        Hook::Start => match component.as_behaviour() {
            Some(behaviour) => {
                behaviour.set_enabled(true);
                behaviour.start(entity);
                true
            }
            None => false,
        },
        Hook::Stop => match component.as_behaviour() {
            Some(behaviour) => {
                behaviour.set_enabled(false);
                behaviour.destroyed(entity);
                true
            }
            None => false,
        },
        Hook::Dispose => match component.as_disposable() {
            Some(disposable) => {
                disposable.dispose();
                true
            }
            None => false,
        },
    }
}

/// Per-frame update. A busy component skips the frame.
pub(crate) fn tick(slot: &ComponentSlot, entity: &Entity, dt: f64) -> bool {
    let Ok(mut component) = slot.get().try_borrow_mut() else {
        return false;
    };
    let ran = match component.as_behaviour() {
        Some(behaviour) if behaviour.enabled() => {
            behaviour.update(entity, dt);
            true
        }
        _ => false,
    };
    drop(component);
    settle(entity);
    ran
}

fn defer(slot: &ComponentSlot, entity: &Entity, hook: Hook) {
    match entity.world() {
        Some(world) => world.0.pending.borrow_mut().push(PendingHook {
            slot: slot.clone(),
            entity: entity.clone(),
            hook,
        }),
        None => warn!(entity = %entity.id(), ?hook, "dropping re-entrant hook outside a world"),
    }
}

/// Runs every queued hook whose component is free again. Hooks whose
/// component is still busy stay queued, in order.
pub(crate) fn settle(entity: &Entity) {
    let Some(world) = entity.world() else {
        return;
    };
    let queued = std::mem::take(&mut *world.0.pending.borrow_mut());
    if queued.is_empty() {
        return;
    }
    let mut blocked = Vec::new();
    for pending in queued {
        if pending.slot.get().try_borrow_mut().is_err() {
            blocked.push(pending);
            continue;
        }
        run(&pending.slot, &pending.entity, pending.hook);
    }
    if !blocked.is_empty() {
        let mut queue = world.0.pending.borrow_mut();
        blocked.extend(queue.drain(..));
        *queue = blocked;
    }
}
