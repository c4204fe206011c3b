pub mod api;
pub mod panel;

pub use api::*;
pub use panel::*;
