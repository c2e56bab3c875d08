//! Migration plan model: tree, defaults, validation, change tracking,
//! persistence.

pub mod changes;
pub mod persist;
pub mod plan;
pub mod tree;
pub mod validate;

pub use changes::ChangeTracker;
pub use tree::{ConfigNode, ConfigTree, ConfigValue, Snapshot};
