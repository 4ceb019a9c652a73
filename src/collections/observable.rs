use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::{IndexMap, IndexSet};

use super::{ChangeHandler, CollectionChange, Observers, SubscriptionId};
use crate::error::{PolycastError, Result};
use crate::type_policy::ValueType;
use crate::value::Value;

fn check(expected: &ValueType, value: &Value) -> Result<()> {
    if expected.accepts(value) {
        Ok(())
    } else {
        Err(PolycastError::type_mismatch(expected, value.kind_name()))
    }
}

struct Inner<C> {
    items: Mutex<C>,
    observers: Observers,
}

impl<C: Default> Inner<C> {
    fn new() -> Arc<Self> {
        Arc::new(Inner {
            items: Mutex::new(C::default()),
            observers: Observers::default(),
        })
    }

    fn items(&self) -> MutexGuard<'_, C> {
        self.items.lock().expect("Mutex poisoned")
    }
}

/// An ordered sequence of values sharing one element type.
#[derive(Clone)]
pub struct ObservableList {
    element: ValueType,
    inner: Arc<Inner<Vec<Value>>>,
}

impl ObservableList {
    pub fn new(element: ValueType) -> Self {
        ObservableList {
            element,
            inner: Inner::new(),
        }
    }

    pub fn element_type(&self) -> &ValueType {
        &self.element
    }

    pub fn add(&self, item: Value) -> Result<()> {
        check(&self.element, &item)?;
        self.inner.items().push(item.clone());
        self.inner.observers.notify(&CollectionChange::Added(vec![item]));
        Ok(())
    }

    pub fn insert(&self, index: usize, item: Value) -> Result<()> {
        check(&self.element, &item)?;
        {
            let mut items = self.inner.items();
            if index > items.len() {
                return Err(PolycastError::InvalidArgument(format!(
                    "index {index} is past the end of a list of {}",
                    items.len()
                )));
            }
            items.insert(index, item.clone());
        }
        self.inner.observers.notify(&CollectionChange::Added(vec![item]));
        Ok(())
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn replace(&self, index: usize, item: Value) -> Result<Value> {
        check(&self.element, &item)?;
        let old = {
            let mut items = self.inner.items();
            let Some(slot) = items.get_mut(index) else {
                return Err(PolycastError::InvalidArgument(format!(
                    "index {index} is out of bounds"
                )));
            };
            std::mem::replace(slot, item.clone())
        };
        self.inner.observers.notify(&CollectionChange::Replaced {
            old: vec![old.clone()],
            new: vec![item],
        });
        Ok(old)
    }

    /// Removes the first occurrence of `item`.
    pub fn remove(&self, item: &Value) -> bool {
        let removed = {
            let mut items = self.inner.items();
            items
                .iter()
                .position(|candidate| candidate == item)
                .map(|index| items.remove(index))
        };
        match removed {
            Some(removed) => {
                self.inner
                    .observers
                    .notify(&CollectionChange::Removed(vec![removed]));
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.inner.items();
            (index < items.len()).then(|| items.remove(index))
        }?;
        self.inner
            .observers
            .notify(&CollectionChange::Removed(vec![removed.clone()]));
        Some(removed)
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.items().get(index).cloned()
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.inner.items());
        if !removed.is_empty() {
            self.inner.observers.notify(&CollectionChange::Removed(removed));
        }
    }

    pub fn contains(&self, item: &Value) -> bool {
        self.inner.items().contains(item)
    }

    pub fn len(&self) -> usize {
        self.inner.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items().is_empty()
    }

    /// A snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items().clone()
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.inner.observers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    pub fn ptr_eq(&self, other: &ObservableList) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

/// An insertion-ordered set of values sharing one element type.
#[derive(Clone)]
pub struct ObservableSet {
    element: ValueType,
    inner: Arc<Inner<IndexSet<Value>>>,
}

impl ObservableSet {
    pub fn new(element: ValueType) -> Self {
        ObservableSet {
            element,
            inner: Inner::new(),
        }
    }

    pub fn element_type(&self) -> &ValueType {
        &self.element
    }

    /// Adds `item`, returning whether it was not already present.
    pub fn add(&self, item: Value) -> Result<bool> {
        check(&self.element, &item)?;
        let added = self.inner.items().insert(item.clone());
        if added {
            self.inner.observers.notify(&CollectionChange::Added(vec![item]));
        }
        Ok(added)
    }

    pub fn remove(&self, item: &Value) -> bool {
        let removed = self.inner.items().shift_remove(item);
        if removed {
            self.inner
                .observers
                .notify(&CollectionChange::Removed(vec![item.clone()]));
        }
        removed
    }

    pub fn clear(&self) {
        let removed: Vec<Value> = std::mem::take(&mut *self.inner.items())
            .into_iter()
            .collect();
        if !removed.is_empty() {
            self.inner.observers.notify(&CollectionChange::Removed(removed));
        }
    }

    pub fn contains(&self, item: &Value) -> bool {
        self.inner.items().contains(item)
    }

    pub fn len(&self) -> usize {
        self.inner.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items().iter().cloned().collect()
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.inner.observers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    pub fn ptr_eq(&self, other: &ObservableSet) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

/// An insertion-ordered map with typed keys and values.
#[derive(Clone)]
pub struct ObservableMap {
    key: ValueType,
    value: ValueType,
    inner: Arc<Inner<IndexMap<Value, Value>>>,
}

impl ObservableMap {
    pub fn new(key: ValueType, value: ValueType) -> Self {
        ObservableMap {
            key,
            value,
            inner: Inner::new(),
        }
    }

    pub fn key_type(&self) -> &ValueType {
        &self.key
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value
    }

    /// Inserts or replaces the entry for `key`, returning the previous value.
    pub fn insert(&self, key: Value, value: Value) -> Result<Option<Value>> {
        check(&self.key, &key)?;
        check(&self.value, &value)?;
        let old = self.inner.items().insert(key.clone(), value.clone());
        let change = match &old {
            Some(old) => CollectionChange::Replaced {
                old: vec![old.clone()],
                new: vec![value],
            },
            None => CollectionChange::Added(vec![key]),
        };
        self.inner.observers.notify(&change);
        Ok(old)
    }

    pub fn remove(&self, key: &Value) -> Option<Value> {
        let removed = self.inner.items().shift_remove(key)?;
        self.inner
            .observers
            .notify(&CollectionChange::Removed(vec![key.clone()]));
        Some(removed)
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.inner.items().get(key).cloned()
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.inner.items().contains_key(key)
    }

    pub fn clear(&self) {
        let removed: Vec<Value> = std::mem::take(&mut *self.inner.items())
            .into_keys()
            .collect();
        if !removed.is_empty() {
            self.inner.observers.notify(&CollectionChange::Removed(removed));
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items().is_empty()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.inner.items().keys().cloned().collect()
    }

    /// A snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.inner
            .items()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.inner.observers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    pub fn ptr_eq(&self, other: &ObservableMap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}
