pub mod coords;
pub mod footprint;
pub mod ingest;
pub mod set;
pub mod temporal;

pub use coords::*;
pub use footprint::*;
pub use ingest::*;
pub use set::*;
pub use temporal::*;
