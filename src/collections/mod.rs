//! Shared, observable containers backing collection-typed properties.
//!
//! [`ObservableList`], [`ObservableSet`] and [`ObservableMap`] are reference handles: cloning one
//! clones the handle, and every clone sees the same elements. Each is typed by its element
//! [`ValueType`](crate::type_policy::ValueType) and rejects elements of another type.
//!
//! [`List`], [`Set`] and [`Map`] are typed wrappers over the raw containers. Facet accessors for
//! collection properties return them, so mutations through the returned handle are visible to
//! every view of the entity.
//!
//! Observers registered with `subscribe` receive a [`CollectionChange`] after each mutation. They
//! run after the container's own lock is released. Entity writes merge into a container after the
//! entity's state is released, so a handler may read or write the owning entity.
mod observable;
mod typed;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub use observable::{ObservableList, ObservableMap, ObservableSet};
pub use typed::{List, Map, Set};

use crate::error::{PolycastError, Result};
use crate::value::Value;

/// A change made to a container. Map changes carry keys in `Added`/`Removed` and the previous and
/// current values in `Replaced`.
#[derive(Clone, Debug, PartialEq)]
pub enum CollectionChange {
    Added(Vec<Value>),
    Removed(Vec<Value>),
    Replaced { old: Vec<Value>, new: Vec<Value> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type ChangeHandler = Arc<dyn Fn(&CollectionChange) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, ChangeHandler)>>,
}

impl Observers {
    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .expect("Mutex poisoned")
            .push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().expect("Mutex poisoned");
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    fn len(&self) -> usize {
        self.handlers.lock().expect("Mutex poisoned").len()
    }

    fn notify(&self, change: &CollectionChange) {
        // Snapshot so handlers can subscribe or unsubscribe while being notified.
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .lock()
            .expect("Mutex poisoned")
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(change);
        }
    }
}

/// Writes `incoming` into the collection `target` held by a slot.
///
/// A single element, or a container whose element type matches, is merged into `target`. A
/// container of another element type replaces the contents of `target`, converting each element.
/// `None` clears it. When `replace` is set the contents are always replaced. `target` keeps its
/// identity in every case, and is left untouched when an element fails to convert.
pub(crate) fn merge_into(target: &Value, incoming: Option<Value>, replace: bool) -> Result<()> {
    let Some(incoming) = incoming else {
        clear(target);
        return Ok(());
    };
    if target == &incoming {
        return Ok(());
    }

    match (target, incoming) {
        (Value::Map(target), Value::Map(source)) => {
            let compatible = source.key_type() == target.key_type()
                && source.value_type() == target.value_type();
            let entries = source
                .entries()
                .into_iter()
                .map(|(key, value)| {
                    Ok((
                        target.key_type().coerce(key)?,
                        target.value_type().coerce(value)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            if replace || !compatible {
                target.clear();
            }
            for (key, value) in entries {
                target.insert(key, value)?;
            }
            Ok(())
        }
        (Value::Map(target), other) => Err(PolycastError::type_mismatch(
            ("Map", target.key_type(), target.value_type()),
            other.kind_name(),
        )),
        (target, incoming) => {
            let element_type = match target {
                Value::List(list) => list.element_type().clone(),
                Value::Set(set) => set.element_type().clone(),
                other => {
                    return Err(PolycastError::type_mismatch(
                        "a collection slot",
                        other.kind_name(),
                    ))
                }
            };
            let (elements, compatible) = match incoming {
                Value::List(source) => {
                    let compatible = source.element_type() == &element_type;
                    (source.to_vec(), compatible)
                }
                Value::Set(source) => {
                    let compatible = source.element_type() == &element_type;
                    (source.to_vec(), compatible)
                }
                Value::Map(_) => {
                    return Err(PolycastError::type_mismatch(&element_type, "Map"));
                }
                single => (vec![single], true),
            };
            let elements = elements
                .into_iter()
                .map(|element| element_type.coerce(element))
                .collect::<Result<Vec<_>>>()?;
            if replace || !compatible {
                clear(target);
            }
            for element in elements {
                match target {
                    Value::List(list) => list.add(element)?,
                    Value::Set(set) => {
                        set.add(element)?;
                    }
                    _ => unreachable!("checked above"),
                }
            }
            Ok(())
        }
    }
}

fn clear(target: &Value) {
    match target {
        Value::List(list) => list.clear(),
        Value::Set(set) => set.clear(),
        Value::Map(map) => map.clear(),
        _ => {}
    }
}
