//! ANM: the per-sprite animation VM.
//!
//! Scripts come from sprite/script archives, one VM per visual instance.
//! Each tick the system executes due instructions, applies continuous
//! effects, and advances script time; the draw frontend then turns VM state
//! into textured quads.

mod ops;
mod system;
mod vm;

#[cfg(test)]
mod tests;

pub use ops::{AnmOp, decode, opcode};
pub use system::AnmSystem;
pub use vm::{ANCHOR_LEFT, ANCHOR_TOP, AnmVm, ScriptCursor};
