//! Entity/component/world object model.
//!
//! Entities and worlds are cheap handles over shared state. Every operation
//! takes `&self` and releases its internal borrows before running a user
//! hook, so hooks may freely call back into the same entity or world.

pub mod component;
pub mod entity;
pub mod system;
pub mod transform;
pub mod world;

pub use component::{Behaviour, Component, ComponentSlot, Disposable};
pub use entity::{Entity, EntityState};
pub use system::{System, SystemRegistry, SystemSlot};
pub use transform::Transform;
pub use world::{UpdateStats, World};
