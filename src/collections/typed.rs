use std::fmt::{self, Debug};
use std::marker::PhantomData;

use super::{ChangeHandler, ObservableList, ObservableMap, ObservableSet, SubscriptionId};
use crate::error::{PolycastError, Result};
use crate::value::{PropertyType, Value};

// Typed values always satisfy the container's element type, so insertion cannot fail. Debug
// builds check it.
fn into_element<T: PropertyType>(item: T) -> Option<Value> {
    item.into_value()
}

fn from_element<T: PropertyType>(value: Value) -> Option<T> {
    T::from_value(Some(value)).ok()
}

/// A typed handle to an [`ObservableList`].
pub struct List<T> {
    raw: ObservableList,
    marker: PhantomData<fn() -> T>,
}

impl<T: PropertyType> List<T> {
    pub fn new() -> Self {
        List {
            raw: ObservableList::new(T::value_type()),
            marker: PhantomData,
        }
    }

    /// Wraps `raw`, checking that its element type is `T`'s.
    pub fn from_raw(raw: ObservableList) -> Result<Self> {
        if raw.element_type() != &T::value_type() {
            return Err(PolycastError::type_mismatch(
                T::value_type(),
                raw.element_type(),
            ));
        }
        Ok(List {
            raw,
            marker: PhantomData,
        })
    }

    pub fn push(&self, item: T) {
        if let Some(value) = into_element(item) {
            let added = self.raw.add(value);
            debug_assert!(added.is_ok(), "typed element rejected: {added:?}");
        }
    }

    pub fn remove(&self, item: &T) -> bool {
        into_element(item.clone()).is_some_and(|value| self.raw.remove(&value))
    }

    pub fn contains(&self, item: &T) -> bool {
        into_element(item.clone()).is_some_and(|value| self.raw.contains(&value))
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.raw.get(index).and_then(from_element)
    }

    pub fn clear(&self) {
        self.raw.clear();
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.raw.to_vec().into_iter().filter_map(from_element).collect()
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.raw.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.raw.unsubscribe(id)
    }

    pub fn ptr_eq(&self, other: &List<T>) -> bool {
        self.raw.ptr_eq(&other.raw)
    }

    pub fn raw(&self) -> &ObservableList {
        &self.raw
    }

    pub fn into_raw(self) -> ObservableList {
        self.raw
    }
}

impl<T: PropertyType> Default for List<T> {
    fn default() -> Self {
        List::new()
    }
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        List {
            raw: self.raw.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: PropertyType> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let list = List::new();
        for item in iter {
            list.push(item);
        }
        list
    }
}

impl<T: PropertyType + Debug> Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

/// A typed handle to an [`ObservableSet`].
pub struct Set<T> {
    raw: ObservableSet,
    marker: PhantomData<fn() -> T>,
}

impl<T: PropertyType> Set<T> {
    pub fn new() -> Self {
        Set {
            raw: ObservableSet::new(T::value_type()),
            marker: PhantomData,
        }
    }

    pub fn from_raw(raw: ObservableSet) -> Result<Self> {
        if raw.element_type() != &T::value_type() {
            return Err(PolycastError::type_mismatch(
                T::value_type(),
                raw.element_type(),
            ));
        }
        Ok(Set {
            raw,
            marker: PhantomData,
        })
    }

    /// Adds `item`, returning whether it was not already present.
    pub fn insert(&self, item: T) -> bool {
        let Some(value) = into_element(item) else {
            return false;
        };
        let added = self.raw.add(value);
        debug_assert!(added.is_ok(), "typed element rejected: {added:?}");
        added.unwrap_or(false)
    }

    pub fn remove(&self, item: &T) -> bool {
        into_element(item.clone()).is_some_and(|value| self.raw.remove(&value))
    }

    pub fn contains(&self, item: &T) -> bool {
        into_element(item.clone()).is_some_and(|value| self.raw.contains(&value))
    }

    pub fn clear(&self) {
        self.raw.clear();
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.raw.to_vec().into_iter().filter_map(from_element).collect()
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.raw.subscribe(handler)
    }

    pub fn ptr_eq(&self, other: &Set<T>) -> bool {
        self.raw.ptr_eq(&other.raw)
    }

    pub fn raw(&self) -> &ObservableSet {
        &self.raw
    }

    pub fn into_raw(self) -> ObservableSet {
        self.raw
    }
}

impl<T: PropertyType> Default for Set<T> {
    fn default() -> Self {
        Set::new()
    }
}

impl<T> Clone for Set<T> {
    fn clone(&self) -> Self {
        Set {
            raw: self.raw.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: PropertyType> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let set = Set::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<T: PropertyType + Debug> Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_vec()).finish()
    }
}

/// A typed handle to an [`ObservableMap`].
pub struct Map<K, V> {
    raw: ObservableMap,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K: PropertyType, V: PropertyType> Map<K, V> {
    pub fn new() -> Self {
        Map {
            raw: ObservableMap::new(K::value_type(), V::value_type()),
            marker: PhantomData,
        }
    }

    pub fn from_raw(raw: ObservableMap) -> Result<Self> {
        if raw.key_type() != &K::value_type() || raw.value_type() != &V::value_type() {
            return Err(PolycastError::type_mismatch(
                (K::value_type(), V::value_type()),
                (raw.key_type(), raw.value_type()),
            ));
        }
        Ok(Map {
            raw,
            marker: PhantomData,
        })
    }

    /// Inserts or replaces the entry for `key`, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let (key, value) = (into_element(key)?, into_element(value)?);
        let previous = self.raw.insert(key, value);
        debug_assert!(previous.is_ok(), "typed entry rejected: {previous:?}");
        previous.ok().flatten().and_then(from_element)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let key = into_element(key.clone())?;
        self.raw.get(&key).and_then(from_element)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let key = into_element(key.clone())?;
        self.raw.remove(&key).and_then(from_element)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        into_element(key.clone()).is_some_and(|key| self.raw.contains_key(&key))
    }

    pub fn clear(&self) {
        self.raw.clear();
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.raw
            .entries()
            .into_iter()
            .filter_map(|(key, value)| Some((from_element(key)?, from_element(value)?)))
            .collect()
    }

    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.raw.subscribe(handler)
    }

    pub fn ptr_eq(&self, other: &Map<K, V>) -> bool {
        self.raw.ptr_eq(&other.raw)
    }

    pub fn raw(&self) -> &ObservableMap {
        &self.raw
    }

    pub fn into_raw(self) -> ObservableMap {
        self.raw
    }
}

impl<K: PropertyType, V: PropertyType> Default for Map<K, V> {
    fn default() -> Self {
        Map::new()
    }
}

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Map {
            raw: self.raw.clone(),
            marker: PhantomData,
        }
    }
}

impl<K: PropertyType, V: PropertyType> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Map::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: PropertyType + Debug, V: PropertyType + Debug> Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_policy::ValueType;

    #[test]
    fn typed_list_round_trips() {
        let list: List<String> = ["a", "b"].into_iter().map(String::from).collect();
        assert_eq!(list.to_vec(), vec!["a".to_string(), "b".to_string()]);
        assert!(list.contains(&"a".to_string()));
        assert!(list.remove(&"a".to_string()));
        assert_eq!(list.get(0), Some("b".to_string()));
    }

    #[test]
    fn from_raw_checks_element_type() {
        let raw = ObservableList::new(ValueType::Int);
        assert!(List::<String>::from_raw(raw.clone()).is_err());
        let list = List::<i64>::from_raw(raw.clone()).unwrap();
        list.push(4);
        assert_eq!(raw.to_vec(), vec![Value::Int(4)]);
    }

    #[test]
    fn typed_map() {
        let map: Map<String, f64> = Map::new();
        assert_eq!(map.insert("price".to_string(), 1.5), None);
        assert_eq!(map.insert("price".to_string(), 2.5), Some(1.5));
        assert_eq!(map.get(&"price".to_string()), Some(2.5));
        assert_eq!(map.entries(), vec![("price".to_string(), 2.5)]);
    }

    #[test]
    fn typed_set() {
        let set: Set<i32> = [1, 2, 2, 3].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert!(!set.insert(3));
    }

    #[test]
    fn narrow_element_types_are_accepted_by_the_container() {
        let list: List<u8> = List::new();
        list.push(7);
        assert_eq!(list.raw().to_vec(), vec![Value::UInt(7)]);

        let set: Set<i16> = Set::new();
        assert!(set.insert(-2));
        assert!(set.raw().contains(&Value::Int(-2)));

        let map: Map<u16, f32> = Map::new();
        assert_eq!(map.insert(1, 0.5), None);
        assert_eq!(map.raw().get(&Value::UInt(1)), Some(Value::Float(0.5)));
    }
}
