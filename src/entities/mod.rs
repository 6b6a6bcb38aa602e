//! Typed views over the records of a data file.
//!
//! Entities reference each other by record index, never by pointer. The node
//! lattice in particular is shared by many signatures, so every relationship
//! is an index into the owning [`Dataset`](crate::Dataset)'s arena.

mod component;
mod node;
mod profile;
mod property;
mod signature;
mod value;

pub use component::Component;
pub use node::Node;
pub use profile::Profile;
pub(crate) use property::parse_bool;
pub use property::{Property, PropertyValueType, TypedValue};
pub use signature::Signature;
pub use value::Value;

/// Index of an entity within its section.
pub type EntityIndex = u32;
