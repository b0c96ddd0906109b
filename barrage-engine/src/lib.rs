//! Barrage - 2D bullet-hell animation and enemy-script runtime
//!
//! Two bytecode interpreters share one design: timed instruction streams
//! drive per-instance state, with interpolated motion, branch/call
//! semantics, interrupt labels, and a sprite/texture catalog behind them.
//!
//! - [`anm`] - per-sprite animation VM (position, scale, rotation, color,
//!   blend, UV scroll) fed from sprite/script archives
//! - [`ecl`] - per-enemy behavior VM (motion, bullet/laser emission,
//!   spellcard lifecycle, call stack, difficulty gates)
//! - [`archive`] / [`texture`] / [`sprite`] - asset catalogs behind the VMs
//! - [`render`] - delta-coalescing state cache and the quad draw frontend
//! - [`backend`] / [`host`] - the seams to the graphics backend and the
//!   game shell (bullets, lasers, items, sound, HUD)
//!
//! The core is single-threaded and cooperative: one tick runs every enemy
//! script, then every VM, then the draw pass. Load paths return
//! [`error::LoadError`]; the interpreters themselves never fail, treating
//! malformed input as no-ops.

pub mod anm;
pub mod archive;
pub mod backend;
pub mod ecl;
pub mod engine;
pub mod error;
pub mod game;
pub mod host;
pub mod options;
pub mod render;
pub mod sprite;
pub mod texture;
pub mod vfs;

pub use anm::{AnmSystem, AnmVm};
pub use backend::{GraphicsBackend, NullBackend, TextureHandle};
pub use ecl::{EclRunner, EclWorld, Enemy};
pub use engine::Engine;
pub use error::LoadError;
pub use game::{Difficulty, GameRng, GameState};
pub use host::{GameHost, NullHost};
pub use options::EngineOptions;
pub use render::{DrawFrontend, RenderStateCache};
pub use sprite::{Sprite, SpriteTable};
pub use texture::TextureStore;
pub use vfs::{DiskVfs, MemoryVfs, Vfs};
