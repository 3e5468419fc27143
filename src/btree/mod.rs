//! B+-tree manager: ordered integer-key index over record ids (`spec.md` §4.4).

mod cursor;
mod node;
mod tree;

pub use cursor::Cursor;
pub use tree::BTreeIndex;
