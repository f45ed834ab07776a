mod component;
mod render;
mod state;

pub use component::{CanvasSession, ElementHandler, ForceGraphCanvas};
pub use state::ForceGraphState;
