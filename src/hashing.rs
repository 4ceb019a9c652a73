//! `HashMap` and `HashSet` variants backed by the Fx hasher from `rustc-hash`.
//!
//! The keys hashed by this crate are type ids, entity handles and object addresses, none of which
//! come from untrusted input. `HashMap<K, V, S>` has no `new` method for a custom hasher; use
//! `HashMap::default()`.

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
