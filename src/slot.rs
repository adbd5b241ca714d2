//! Shared managed instances.
//!
//! A [`Slot`] keeps one allocation reachable two ways: through the trait
//! object the core dispatches lifecycle hooks on, and as `dyn Any` so typed
//! callers can recover their concrete `Rc<RefCell<T>>`. Both views point at
//! the same `RefCell`, which is what makes the caches identity maps.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

pub type Shared<T> = Rc<RefCell<T>>;

pub struct Slot<D: ?Sized> {
    type_id: TypeId,
    type_name: &'static str,
    any: Rc<dyn Any>,
    inner: Rc<RefCell<D>>,
}

impl<D: ?Sized> Clone for Slot<D> {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            any: Rc::clone(&self.any),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: ?Sized> Slot<D> {
    /// `any` and `inner` must be two views of the same `Rc<RefCell<T>>`.
    pub(crate) fn from_parts<T: Any>(typed: Shared<T>, inner: Rc<RefCell<D>>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            any: typed,
            inner,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn get(&self) -> &Rc<RefCell<D>> {
        &self.inner
    }

    pub fn downcast<T: Any>(&self) -> Option<Shared<T>> {
        Rc::clone(&self.any).downcast::<RefCell<T>>().ok()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.any, &other.any)
    }
}
