pub mod config;
pub mod ecs;
pub mod error;
pub mod host;
pub mod id;
pub mod logging;
pub mod native;
pub mod resource;
pub mod runtime;
pub mod slot;
pub mod types;

pub use config::RuntimeConfig;
pub use ecs::{Behaviour, Component, Disposable, Entity, System, Transform, World};
pub use error::{CoreError, CoreResult};
pub use host::Host;
pub use id::{NativeHandle, Uuid};
pub use native::{InMemoryBridge, NativeBridge};
pub use resource::{Resource, ResourceMeta, ResourceRegistry};
pub use runtime::{Runtime, RuntimeBuilder};
pub use slot::Shared;
pub use types::{ResourceOptions, TypeRegistry};
