pub mod fetch;
pub mod job;

pub use fetch::*;
pub use job::*;
