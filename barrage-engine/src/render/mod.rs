//! Rendering support: the delta-coalescing state cache and the quad-building
//! draw frontend.

mod cache;
mod draw;


pub use cache::RenderStateCache;
pub use draw::{DrawFrontend, ProjectionMatrices, ProjectionMode};
