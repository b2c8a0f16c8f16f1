pub mod tree;
pub mod types;

pub use tree::{DepthFirst, ResultTree, TreeEntry};
pub use types::*;
