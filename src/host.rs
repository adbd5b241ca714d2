use std::rc::Rc;

use crate::native::{InMemoryBridge, NativeBridge};
use crate::types::TypeRegistry;

/// Collaborators every world and resource needs: the native bridge and the
/// frozen type table. Cloning is cheap.
#[derive(Clone)]
pub struct Host {
    bridge: Rc<dyn NativeBridge>,
    types: Rc<TypeRegistry>,
}

impl Host {
    pub fn new(bridge: Rc<dyn NativeBridge>, types: TypeRegistry) -> Self {
        Self {
            bridge,
            types: Rc::new(types),
        }
    }

    /// Host backed by an [`InMemoryBridge`].
    pub fn in_memory(seed: u64, types: TypeRegistry) -> Self {
        Self::new(Rc::new(InMemoryBridge::new(seed)), types)
    }

    pub fn bridge(&self) -> &dyn NativeBridge {
        self.bridge.as_ref()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }
}
