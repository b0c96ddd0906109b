//! ECL: the enemy-behavior VM.
//!
//! Enemies run subroutines out of a behavior file through a per-enemy
//! execution context with a saturating call stack, an interrupt table, and
//! difficulty-gated instructions. Opcodes cover motion, bullet/laser
//! emission, spellcard lifecycle, and coupling into the ANM VMs.

pub mod enemy;
mod ops;
mod runner;
pub mod spellcard;
pub mod vars;


pub use enemy::{Enemy, ExecContext, MotionKind};
pub use ops::{AluOp, BulletArgs, Cond, EclOp, Flag, LaserArgs, decode, opcode};
pub use runner::{EclRunner, EclWorld, ExCallFn};
