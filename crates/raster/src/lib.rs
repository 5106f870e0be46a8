pub mod canvas;
pub mod clipper;
pub mod color;
pub mod compositor;
pub mod config;
pub mod imagery;
pub mod path;
pub mod picking;
pub mod projector;
pub mod renderer;
pub mod view;

pub use canvas::*;
pub use clipper::*;
pub use color::*;
pub use compositor::*;
pub use config::*;
pub use imagery::*;
pub use path::*;
pub use picking::*;
pub use projector::*;
pub use renderer::*;
pub use view::*;
