//! # Property Graph Model
//!
//! Plain data that crosses every boundary: store ↔ backend ↔ caller.
//!
//! Design rule: this module is pure data: no I/O, no locks, no backend types.

pub mod node;
pub mod edge;
pub mod path;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use edge::{Edge, EdgeKey};
pub use path::WeightedPath;
pub use value::Value;
pub use property_map::{PropertyMap, props};
