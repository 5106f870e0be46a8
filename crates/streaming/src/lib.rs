pub mod cache;
pub mod loader;
pub mod loads;
pub mod request;

pub use cache::*;
pub use loader::*;
pub use loads::*;
pub use request::*;
