//! View one shared object as any number of independently declared facets.
//!
//! A *facet* is a trait declared with [`define_facet!`]: a set of properties and methods with no
//! storage of its own. An [`Entity`] is the storage. Casting an entity to a facet with
//! [`Entity::act_like`] attaches the facet and returns a view whose properties read and write the
//! entity's slots, so every view of the same entity observes the same state.
//!
//! The crate is organised around a handful of services:
//! * [`facet`]: facet metadata and the process-wide catalog that `define_facet!` registers into.
//! * [`entity`]: entity identity, the attached-facet set, and the slot store holding property
//!   values, optionally backed by native fields.
//! * [`view`]: the adapters returned by casts, and the synthesis of their dispatch tables.
//! * [`registry`]: implementations supplied at runtime for abstract methods and computed
//!   properties.
//! * [`enumerator`] and [`clone`]: enumeration of materialized properties, and shallow and deep
//!   clones built on it.
//! * [`type_policy`], [`value`] and [`collections`]: the stored value model, including observable
//!   collections that accumulate rather than replace on assignment.
//!
//! All of them are reached through a [`Context`], which also owns the [`config::Config`].
//!
//! ```
//! use polycast::prelude::*;
//!
//! define_facet! {
//!     interface Priced {
//!         prop price: f64;
//!     }
//! }
//!
//! define_facet! {
//!     interface Labelled {
//!         prop label: String;
//!     }
//! }
//!
//! fn main() {
//!     let entity = Context::new().new_entity();
//!     let priced = entity.act_like::<dyn Priced>().unwrap();
//!     let labelled = entity.act_like::<dyn Labelled>().unwrap();
//!     priced.set_price(9.5).unwrap();
//!     labelled.set_label("tea".to_string()).unwrap();
//!
//!     let again = labelled.act_like::<dyn Priced>().unwrap();
//!     assert_eq!(again.price(), 9.5);
//!     assert_eq!(again.unwrap_entity(), entity);
//! }
//! ```
extern crate self as polycast;

pub mod clone;
pub mod collections;
pub mod config;
pub mod context;
pub mod dynamic;
pub mod entity;
pub mod enumerator;
pub mod error;
pub mod facet;
pub mod hashing;
pub mod log;
mod macros;
pub mod prelude;
pub mod registry;
pub mod type_policy;
pub mod value;
pub mod view;

// Re-exported for use in macros.
pub use ctor;
pub use paste;

pub use context::Context;
pub use entity::{Entity, EntityId, NativeFields};
pub use error::{PolycastError, Result};
pub use facet::{Facet, FacetId, FacetInfo, FacetKind, FacetObject, PropertyInfo};
pub use hashing::{HashMap, HashSet};
pub use polycast_derive::NativeFields;
pub use value::{PropertyType, Value};
pub use view::{ActLike, FacetView};
