pub mod element;
pub mod ids;
pub mod tree;

pub use element::*;
pub use ids::*;
pub use tree::*;
