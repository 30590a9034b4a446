pub mod build;
pub mod memory;
pub mod segment;
pub mod types;

pub use build::{IndexBuilder, IndexEvent};
pub use memory::{SearchIndex, SharedIndex, read_index, write_index};
pub use types::*;
