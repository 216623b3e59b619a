//! fOS Virtual DOM
//!
//! Virtual node model, structural hashing, the data registry for values
//! that cannot travel as attribute text, and the reconciler that patches a
//! live [`fos_dom::Document`] subtree to match a virtual tree.

mod value;
mod data;
mod node;
mod hash;
mod diff;
pub mod serialize;

pub use value::{Value, ValueFn};
pub use data::{DataId, DataRegistry, RegistryStats};
pub use node::{make_node, normalize_children, AttrValue, Child, RenderContext, RenderFn, VChild, VNode};
pub use hash::{fnv1a64, fnv1a64_mix, hash_value, FNV1A_OFFSET_BASIS_64};
pub use diff::{free_subtree_tokens, HashStamps, NoopObserver, PatchObserver, Reconciler, RESERVED_ATTRIBUTE_PREFIX};
pub use serialize::{children_to_text, render_to_text};
