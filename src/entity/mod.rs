/*!

An [`Entity`] is the identity behind every facet view. It owns the attached-facet set, the
property slot store and, optionally, a native object whose fields are consulted before the slots.

Entities are handles: cloning one clones a reference to the same underlying state. Facet views
obtained from an entity hold a handle too, so the entity lives as long as any view of it.

```rust
use polycast::prelude::*;

define_facet! {
    interface Named {
        prop name: String;
    }
}

fn main() {
    let context = Context::new();
    let entity = context.new_entity();
    entity.set::<dyn Named, String>("name", "Ada".to_string()).unwrap();
    assert!(entity.is::<dyn Named>());
    assert_eq!(entity.get::<dyn Named, String>("name").unwrap(), "Ada");
}
```

*/

#[allow(clippy::module_inception)]
mod entity;
mod native;
pub(crate) mod property_store;

pub use entity::{Entity, EntityId};
pub(crate) use entity::EntityState;
pub use native::NativeFields;
