//! Per-enemy state: the register file the ECL interpreter drives.
//!
//! An enemy bundles motion state, its bullet/laser emission config, the
//! execution context plus saved-context stack, the interrupt table, boss
//! bookkeeping, and the ANM VMs that render it.

use barrage_common::math::EaseMode;
use barrage_common::timer::FrameTimer;
use glam::{Vec2, Vec3};

use crate::anm::AnmVm;
use crate::game::GameState;
use crate::host::LaserHandle;

/// Saved-context stack capacity. Pushing into a full stack overwrites the
/// top save instead of growing (the stack saturates).
pub const STACK_CAPACITY: usize = 8;

/// Sub-VM slots beside the primary VM.
pub const VM_SLOTS: usize = 8;

/// Laser handle slots.
pub const LASER_SLOTS: usize = 32;

/// Interrupt-table entries.
pub const INTERRUPT_SLOTS: usize = 16;

/// One running script's registers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecContext {
    /// Offset of the current instruction; `None` = no script.
    pub cursor: Option<u32>,
    pub sub_id: u16,
    pub time: FrameTimer,
    /// Result of the last compare: -1, 0, or 1.
    pub compare: i8,
    pub int_vars: [i32; 4],
    pub float_vars: [f32; 4],
    /// Extrinsic callback invoked every tick, by table index.
    pub repeat_call: Option<usize>,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            cursor: None,
            sub_id: 0,
            time: FrameTimer::new(),
            compare: 0,
            int_vars: [0; 4],
            float_vars: [0.0; 4],
            repeat_call: None,
        }
    }
}

/// How position advances each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionKind {
    /// `axis_speed` integrates directly.
    #[default]
    Axis,
    /// Angle/speed/acceleration recompute `axis_speed` every tick.
    Angular,
    /// Eased interpolation toward a stored target.
    Timed,
}

/// Bullet aim patterns; the opcode picks the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AimMode {
    #[default]
    AimedFan = 0,
    Fan = 1,
    AimedCircle = 2,
    Circle = 3,
    AimedOffsetCircle = 4,
    OffsetCircle = 5,
    RandomAngle = 6,
    RandomSpeed = 7,
    Random = 8,
}

impl AimMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => AimMode::AimedFan,
            1 => AimMode::Fan,
            2 => AimMode::AimedCircle,
            3 => AimMode::Circle,
            4 => AimMode::AimedOffsetCircle,
            5 => AimMode::OffsetCircle,
            6 => AimMode::RandomAngle,
            7 => AimMode::RandomSpeed,
            _ => AimMode::Random,
        }
    }
}

/// Flag bit: the shooter plays a sound on spawn.
pub const SHOOTER_FLAG_SOUND: u32 = 0x200;

/// Parametrized bullet pattern, persisted between shots.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletShooter {
    pub sprite: i32,
    pub sprite_offset: i32,
    pub aim_mode: AimMode,
    pub count1: i32,
    pub count2: i32,
    pub position: Vec3,
    pub angle1: f32,
    pub angle2: f32,
    pub speed1: f32,
    pub speed2: f32,
    pub flags: u32,
    pub sfx: i32,
    pub ex_ints: [i32; 4],
    pub ex_floats: [f32; 4],
}

impl Default for BulletShooter {
    fn default() -> Self {
        Self {
            sprite: 0,
            sprite_offset: 0,
            aim_mode: AimMode::AimedFan,
            count1: 1,
            count2: 1,
            position: Vec3::ZERO,
            angle1: 0.0,
            angle2: 0.0,
            speed1: 0.0,
            speed2: 0.0,
            flags: 0,
            sfx: -1,
            ex_ints: [0; 4],
            ex_floats: [0.0; 4],
        }
    }
}

/// Parametrized laser, handed to the host on creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaserShooter {
    pub position: Vec3,
    pub sprite: i32,
    pub color: i32,
    pub angle: f32,
    pub speed: f32,
    pub start_offset: f32,
    pub end_offset: f32,
    pub start_length: f32,
    pub width: f32,
    pub start_time: i32,
    pub duration: i32,
    pub stop_time: i32,
    pub graze_delay: i32,
    pub graze_distance: i32,
    pub flags: u32,
    /// False for the fixed-angle variant, true when aimed at the player.
    pub aimed: bool,
}

/// Pose-animation script set: primary-VM scripts keyed by horizontal
/// movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseSet {
    pub center: i32,
    pub far_left: i32,
    pub far_right: i32,
    pub left: i32,
    pub right: i32,
}

/// Pose classifier state for "was previously moving far left/right".
pub const POSE_UNSET: u8 = 0xFF;

/// Rank-influence coefficients: each pair is lerped over the rank window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankInfluence {
    pub speed_low: f32,
    pub speed_high: f32,
    pub amount1_low: i32,
    pub amount1_high: i32,
    pub amount2_low: i32,
    pub amount2_high: i32,
    pub interval_low: i32,
    pub interval_high: i32,
}

impl RankInfluence {
    fn lerp_i32(low: i32, high: i32, t: f32) -> i32 {
        (low as f32 + (high - low) as f32 * t).round() as i32
    }

    pub fn speed(&self, game: &GameState) -> f32 {
        self.speed_low + (self.speed_high - self.speed_low) * game.rank_factor()
    }

    pub fn amount1(&self, game: &GameState) -> i32 {
        Self::lerp_i32(self.amount1_low, self.amount1_high, game.rank_factor())
    }

    pub fn amount2(&self, game: &GameState) -> i32 {
        Self::lerp_i32(self.amount2_low, self.amount2_high, game.rank_factor())
    }

    pub fn interval(&self, game: &GameState) -> i32 {
        Self::lerp_i32(self.interval_low, self.interval_high, game.rank_factor())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnemyFlags {
    pub active: bool,
    pub boss: bool,
    /// Clamp position into the move bounds after motion.
    pub clamp_pos: bool,
    /// Bullet opcodes configure but do not spawn.
    pub shoot_disabled: bool,
    pub immortal: bool,
    /// Collision with the player is ignored.
    pub intangible: bool,
    pub invisible: bool,
    /// Calls become tail switches; Ret warns and pops anyway.
    pub disable_call_stack: bool,
    /// Primary VM rotates to face the motion direction.
    pub rotate_to_motion: bool,
    /// Death callbacks are suppressed (mass-kill sweeps skip this enemy).
    pub suppress_callbacks: bool,
    /// Death drops effects/items.
    pub death_effects: bool,
    /// The running spellcard failed by timeout.
    pub spellcard_timeout: bool,
}

/// Full per-enemy register file.
#[derive(Debug, Clone)]
pub struct Enemy {
    pub flags: EnemyFlags,

    // Motion
    pub position: Vec3,
    pub axis_speed: Vec3,
    pub angle: f32,
    pub speed: f32,
    pub acceleration: f32,
    pub angular_velocity: f32,
    pub motion: MotionKind,
    pub move_ease: EaseMode,
    pub move_interp_start: Vec3,
    pub move_interp_delta: Vec3,
    pub move_interp_total: i32,
    pub move_interp_timer: FrameTimer,
    pub lower_move_limit: Vec2,
    pub upper_move_limit: Vec2,

    // Emission
    pub shooter: BulletShooter,
    pub shoot_offset: Vec3,
    pub shoot_interval: i32,
    pub shoot_timer: FrameTimer,
    pub lasers: [Option<LaserHandle>; LASER_SLOTS],
    pub laser_store: usize,

    // Body
    pub hitbox: Vec3,
    pub life: i32,
    pub max_life: i32,

    // Boss state
    pub boss_id: i32,
    pub boss_timer: FrameTimer,

    // Script state
    pub ctx: ExecContext,
    pub stack: [ExecContext; STACK_CAPACITY],
    pub stack_depth: usize,
    pub interrupts: [i32; INTERRUPT_SLOTS],
    /// Interrupt id delivered before the next instruction; -1 = none.
    pub pending_interrupt: i32,

    // Callbacks
    pub death_callback_sub: i32,
    pub life_callback_threshold: i32,
    pub life_callback_sub: i32,
    pub timer_callback_threshold: i32,
    pub timer_callback_sub: i32,

    // Visuals
    pub death_anm: [i32; 3],
    pub pose: Option<PoseSet>,
    pub pose_state: u8,
    pub rank: RankInfluence,
    pub primary_vm: AnmVm,
    pub vms: [AnmVm; VM_SLOTS],
}

impl Default for Enemy {
    fn default() -> Self {
        Self::new()
    }
}

impl Enemy {
    pub fn new() -> Self {
        Self {
            flags: EnemyFlags {
                active: true,
                ..Default::default()
            },
            position: Vec3::ZERO,
            axis_speed: Vec3::ZERO,
            angle: 0.0,
            speed: 0.0,
            acceleration: 0.0,
            angular_velocity: 0.0,
            motion: MotionKind::Axis,
            move_ease: EaseMode::Linear,
            move_interp_start: Vec3::ZERO,
            move_interp_delta: Vec3::ZERO,
            move_interp_total: 0,
            move_interp_timer: FrameTimer::new(),
            lower_move_limit: Vec2::ZERO,
            upper_move_limit: Vec2::ZERO,
            shooter: BulletShooter::default(),
            shoot_offset: Vec3::ZERO,
            shoot_interval: 0,
            shoot_timer: FrameTimer::new(),
            lasers: [None; LASER_SLOTS],
            laser_store: 0,
            hitbox: Vec3::new(16.0, 16.0, 16.0),
            life: 1,
            max_life: 1,
            boss_id: -1,
            boss_timer: FrameTimer::new(),
            ctx: ExecContext::default(),
            stack: Default::default(),
            stack_depth: 0,
            interrupts: [-1; INTERRUPT_SLOTS],
            pending_interrupt: -1,
            death_callback_sub: -1,
            life_callback_threshold: -1,
            life_callback_sub: -1,
            timer_callback_threshold: 0,
            timer_callback_sub: -1,
            death_anm: [-1; 3],
            pose: None,
            pose_state: POSE_UNSET,
            rank: RankInfluence::default(),
            primary_vm: AnmVm::new(),
            vms: Default::default(),
        }
    }

    /// Save the current context. When the stack is full the top save is
    /// overwritten and the depth pins at capacity - 1.
    pub fn push_context(&mut self) {
        self.stack[self.stack_depth] = self.ctx.clone();
        if self.stack_depth < STACK_CAPACITY - 1 {
            self.stack_depth += 1;
        } else {
            tracing::warn!(sub = self.ctx.sub_id, "call stack saturated");
        }
    }

    /// Restore the most recent save.
    pub fn pop_context(&mut self) {
        if self.stack_depth > 0 {
            self.stack_depth -= 1;
        }
        self.ctx = self.stack[self.stack_depth].clone();
    }

    /// Clamp position into the move bounds, when enabled.
    pub fn clamp_position(&mut self) {
        if !self.flags.clamp_pos {
            return;
        }
        self.position.x = self
            .position
            .x
            .clamp(self.lower_move_limit.x, self.upper_move_limit.x);
        self.position.y = self
            .position
            .y
            .clamp(self.lower_move_limit.y, self.upper_move_limit.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_saturates_instead_of_overflowing() {
        let mut enemy = Enemy::new();
        for i in 0..20 {
            enemy.ctx.sub_id = i;
            enemy.push_context();
        }
        assert_eq!(enemy.stack_depth, STACK_CAPACITY - 1);
        // The top save keeps being overwritten by the newest push.
        assert_eq!(enemy.stack[STACK_CAPACITY - 1].sub_id, 19);
    }

    #[test]
    fn test_pop_at_zero_depth_does_not_underflow() {
        let mut enemy = Enemy::new();
        enemy.stack[0].sub_id = 5;
        enemy.pop_context();
        assert_eq!(enemy.stack_depth, 0);
        assert_eq!(enemy.ctx.sub_id, 5);
    }

    #[test]
    fn test_clamp_position() {
        let mut enemy = Enemy::new();
        enemy.lower_move_limit = Vec2::new(0.0, 0.0);
        enemy.upper_move_limit = Vec2::new(100.0, 50.0);
        enemy.position = Vec3::new(150.0, -20.0, 3.0);

        enemy.clamp_position();
        // Clamp disabled by default.
        assert_eq!(enemy.position.x, 150.0);

        enemy.flags.clamp_pos = true;
        enemy.clamp_position();
        assert_eq!(enemy.position, Vec3::new(100.0, 0.0, 3.0));
    }

    #[test]
    fn test_rank_influence_lerps_over_window() {
        let mut game = crate::game::GameState::new(crate::game::Difficulty::Normal, 0);
        let rank = RankInfluence {
            speed_low: -0.5,
            speed_high: 0.5,
            amount1_low: 0,
            amount1_high: 4,
            ..Default::default()
        };
        game.rank = game.min_rank;
        assert_eq!(rank.speed(&game), -0.5);
        assert_eq!(rank.amount1(&game), 0);
        game.rank = game.max_rank;
        assert_eq!(rank.speed(&game), 0.5);
        assert_eq!(rank.amount1(&game), 4);
    }
}
