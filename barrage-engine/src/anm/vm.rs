//! Per-instance visual VM state.
//!
//! Hundreds of these exist at once (every bullet, enemy body part, HUD
//! element and effect owns one), so the struct is plain data; the script
//! walker in [`super::AnmSystem`] drives it.

use barrage_common::math::EaseMode;
use barrage_common::pixel::Color;
use barrage_common::timer::FrameTimer;
use glam::{Vec2, Vec3};

use crate::backend::{BlendMode, ColorOp};

/// Anchor bit: quad hangs right of the position instead of centering.
pub const ANCHOR_LEFT: u8 = 1 << 0;
/// Anchor bit: quad hangs below the position instead of centering.
pub const ANCHOR_TOP: u8 = 1 << 1;

/// Location of the script a VM is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptCursor {
    pub archive_slot: usize,
    /// Offset of the first instruction in the archive blob.
    pub begin: u32,
    /// Added to sprite ids the script binds.
    pub sprite_index_offset: i32,
}

/// Per-instance animation state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnmVm {
    // Script position
    pub script: Option<ScriptCursor>,
    /// Offset of the current instruction; `None` = detached.
    pub cursor: Option<u32>,
    pub time: FrameTimer,

    // Active sprite
    pub sprite_index: Option<usize>,
    /// Loaded-sprite generation at bind time, to catch stale indices.
    pub sprite_generation: u32,
    /// Sprite extent over texture extent, cached at bind time.
    pub base_scale: Vec2,

    // Transform
    pub pos: Vec3,
    pub pos_offset: Vec3,
    pub scale: Vec2,
    pub rotation: Vec3,
    pub angular_velocity: Vec3,

    // Color and UV
    pub color: Color,
    /// UV scroll offset, wrapped into [0, 1) on every change.
    pub uv_scroll: Vec2,

    // Scale interpolation. `end == 0` repurposes `final_` as a per-frame
    // additive delta (scale-speed mode).
    pub scale_interp_initial: Vec2,
    pub scale_interp_final: Vec2,
    pub scale_interp_end: i32,
    pub scale_interp_time: FrameTimer,

    // Alpha interpolation (channel-wise over the packed color)
    pub alpha_interp_initial: Color,
    pub alpha_interp_final: Color,
    pub alpha_interp_end: i32,
    pub alpha_interp_time: FrameTimer,

    // Position interpolation
    pub pos_interp_initial: Vec3,
    pub pos_interp_final: Vec3,
    pub pos_interp_end: i32,
    pub pos_interp_time: FrameTimer,
    pub pos_ease: EaseMode,

    // Flags
    pub visible: bool,
    /// Cleared while the owning object is dormant; draws skip when false.
    pub in_use: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    pub anchor: u8,
    pub blend: BlendMode,
    pub color_op: ColorOp,
    pub z_write_disable: bool,
    pub stopped: bool,
    /// Interpolations and SetPosition target `pos_offset` instead of `pos`.
    pub use_pos_offset: bool,
    pub auto_rotate: bool,

    /// Interrupt code delivered before the next step; 0 = none.
    pub pending_interrupt: i32,
}

impl Default for AnmVm {
    fn default() -> Self {
        Self::new()
    }
}

impl AnmVm {
    pub fn new() -> Self {
        Self {
            script: None,
            cursor: None,
            time: FrameTimer::new(),
            sprite_index: None,
            sprite_generation: 0,
            base_scale: Vec2::ONE,
            pos: Vec3::ZERO,
            pos_offset: Vec3::ZERO,
            scale: Vec2::ONE,
            rotation: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            color: Color::WHITE,
            uv_scroll: Vec2::ZERO,
            scale_interp_initial: Vec2::ZERO,
            scale_interp_final: Vec2::ZERO,
            scale_interp_end: 0,
            scale_interp_time: FrameTimer::new(),
            alpha_interp_initial: Color::WHITE,
            alpha_interp_final: Color::WHITE,
            alpha_interp_end: 0,
            alpha_interp_time: FrameTimer::new(),
            pos_interp_initial: Vec3::ZERO,
            pos_interp_final: Vec3::ZERO,
            pos_interp_end: 0,
            pos_interp_time: FrameTimer::new(),
            pos_ease: EaseMode::Linear,
            visible: false,
            in_use: true,
            flip_x: false,
            flip_y: false,
            anchor: 0,
            blend: BlendMode::Normal,
            color_op: ColorOp::Modulate,
            z_write_disable: false,
            stopped: false,
            use_pos_offset: false,
            auto_rotate: false,
            pending_interrupt: 0,
        }
    }

    /// Reset everything that a fresh script expects, keeping the position
    /// the owner placed the VM at.
    pub fn reset_for_script(&mut self) {
        let pos = self.pos;
        let in_use = self.in_use;
        *self = Self::new();
        self.pos = pos;
        self.in_use = in_use;
    }

    /// Drop the script; the VM no longer executes or interpolates.
    pub fn detach(&mut self) {
        self.cursor = None;
    }

    pub fn is_running(&self) -> bool {
        self.cursor.is_some()
    }

    /// Position the draw paths use.
    pub fn render_pos(&self) -> Vec3 {
        self.pos + self.pos_offset
    }

    /// The field timed interpolations and SetPosition write through.
    pub fn interp_target(&mut self) -> &mut Vec3 {
        if self.use_pos_offset {
            &mut self.pos_offset
        } else {
            &mut self.pos
        }
    }
}
