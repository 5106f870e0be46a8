pub mod coordinator;
pub mod layer;
pub mod marker;
pub mod selection;

pub use coordinator::*;
pub use layer::*;
pub use marker::*;
pub use selection::*;
