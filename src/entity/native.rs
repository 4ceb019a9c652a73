use std::any::Any;

use crate::error::Result;
use crate::value::Value;

/// Fields declared directly on the Rust type backing an entity.
///
/// When an entity is created with [`Context::new_entity_with`](crate::Context::new_entity_with),
/// property reads and writes for a name the native object has go to the field instead of the slot
/// store. Derive it with `#[derive(NativeFields)]`; mark fields that should stay private with
/// `#[native(skip)]`.
pub trait NativeFields: Any + Send {
    fn has_field(&self, name: &str) -> bool;

    /// The field's current value. `None` for a field that holds no value (an empty `Option`).
    fn get_field(&self, name: &str) -> Option<Value>;

    fn set_field(&mut self, name: &str, value: Option<Value>) -> Result<()>;

    /// A fresh native object of the same type, used as the backing object of a clone. Types that
    /// cannot produce one give clones no native object.
    fn create_child(&self) -> Option<Box<dyn NativeFields>> {
        None
    }
}
