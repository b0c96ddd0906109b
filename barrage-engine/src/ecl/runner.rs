//! The ECL interpreter.
//!
//! [`EclRunner::run`] advances one enemy by one tick: pending interrupts are
//! delivered first, then instructions execute in stream order while their
//! time has come (honoring the per-instruction difficulty gate), then the
//! continuous updates run (motion, shoot interval, pose animation, boss
//! timers, the repeating extrinsic call) and script time advances.

use barrage_common::formats::ecl::EclFile;
use barrage_common::math::{EaseMode, add_normalize_angle};
use barrage_common::timer::FrameTimer;
use glam::Vec3;
use std::f32::consts::PI;
use tracing::{debug, warn};

use crate::anm::AnmSystem;
use crate::error::LoadError;
use crate::game::GameState;
use crate::host::{GameHost, ItemKind};
use crate::vfs::Vfs;

use super::enemy::{
    Enemy, ExecContext, LASER_SLOTS, MotionKind, POSE_UNSET, PoseSet, RankInfluence,
    SHOOTER_FLAG_SOUND,
};
use super::ops::{AluOp, EclOp, decode};
use super::spellcard::{SpellcardInfo, base_score};
use super::vars::{read_float, read_int, write_float, write_int};

/// Particle effect id used by the spellcard circle effect.
const SPELLCARD_EFFECT_ID: i32 = 13;

/// Scatter radius for dropped items.
const ITEM_DROP_RADIUS: f32 = 72.0;

/// Host-provided extrinsic instruction.
pub type ExCallFn = Box<dyn FnMut(&mut Enemy, &mut GameState)>;

/// Everything outside the enemy that ECL opcodes touch.
pub struct EclWorld<'a> {
    pub anm: &'a AnmSystem,
    pub game: &'a mut GameState,
    pub host: &'a mut dyn GameHost,
}

/// Owns the loaded behavior file and the extrinsic call table.
pub struct EclRunner {
    file: Option<EclFile>,
    ex_calls: Vec<ExCallFn>,
    /// Added to ANM script ids referenced by enemy scripts.
    pub enemy_script_base: i32,
}

impl Default for EclRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl EclRunner {
    pub fn new() -> Self {
        Self {
            file: None,
            ex_calls: Vec::new(),
            enemy_script_base: 0,
        }
    }

    /// Install the extrinsic call table (indexed by the ExCall argument).
    pub fn with_ex_calls(mut self, ex_calls: Vec<ExCallFn>) -> Self {
        self.ex_calls = ex_calls;
        self
    }

    pub fn load(&mut self, vfs: &mut dyn Vfs, path: &str) -> Result<(), LoadError> {
        let bytes = vfs.read(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        self.load_bytes(bytes)
    }

    pub fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<(), LoadError> {
        let file = EclFile::parse(bytes)?;
        debug!(subs = file.sub_count(), "loaded behavior file");
        self.file = Some(file);
        Ok(())
    }

    pub fn unload(&mut self) {
        self.file = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.file.is_some()
    }

    /// Point an enemy's context at sub `sub` from the top.
    pub fn start_sub(&self, enemy: &mut Enemy, sub: u16) -> bool {
        match &self.file {
            Some(file) => call_sub(file, &mut enemy.ctx, sub),
            None => false,
        }
    }

    /// Advance `enemy` by one tick. Returns false once the script has
    /// halted.
    pub fn run(&mut self, enemy: &mut Enemy, world: &mut EclWorld<'_>) -> bool {
        let Self {
            file,
            ex_calls,
            enemy_script_base,
        } = self;
        let Some(file) = file.as_ref() else {
            return false;
        };
        let script_base = *enemy_script_base;

        loop {
            // Interrupt delivery: save the context and switch to the
            // handler sub; Ret resumes where the interrupt landed.
            if enemy.pending_interrupt >= 0 {
                let pending = enemy.pending_interrupt as usize;
                enemy.pending_interrupt = -1;
                let sub = enemy.interrupts.get(pending).copied().unwrap_or(-1);
                if sub >= 0 {
                    enemy.push_context();
                    call_sub(file, &mut enemy.ctx, sub as u16);
                    continue;
                }
                debug!(pending, "interrupt with no handler sub dropped");
            }

            let Some(cursor) = enemy.ctx.cursor else {
                return false;
            };
            let Some(instr) = file.instr_at(cursor as usize) else {
                warn!(cursor, "walked past the end of the instruction stream");
                enemy.ctx.cursor = None;
                return false;
            };
            if (instr.time as i32) > enemy.ctx.time.as_frames() {
                tick_continuous(file, ex_calls, script_base, enemy, world);
                enemy.ctx.time.tick(world.game.framerate_mult);
                return true;
            }

            let next = instr.next_offset as u32;
            // Difficulty gate: a clear bit skips the instruction while time
            // passes normally.
            if instr.difficulty_mask & world.game.difficulty.bit() == 0 {
                enemy.ctx.cursor = Some(next);
                continue;
            }

            let jump_to = |enemy: &mut Enemy, offset: i32, time: i32| {
                let dest = cursor as i64 + offset as i64;
                if dest >= 0 {
                    enemy.ctx.cursor = Some(dest as u32);
                    enemy.ctx.time.set(time);
                } else {
                    enemy.ctx.cursor = Some(next);
                }
            };

            match decode(instr.opcode, instr.args) {
                EclOp::Halt => {
                    enemy.ctx.cursor = None;
                    return false;
                }
                EclOp::Nop => enemy.ctx.cursor = Some(next),

                // --- Control flow ---
                EclOp::Jump { offset, time } => {
                    jump_to(enemy, offset, time);
                    continue;
                }
                EclOp::JumpDec { offset, time, var } => {
                    let value = read_int(enemy, world.game, var) - 1;
                    write_int(enemy, var, value);
                    if value > 0 {
                        jump_to(enemy, offset, time);
                        continue;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::JumpCond { cond, offset, time } => {
                    if cond.holds(enemy.ctx.compare as i32) {
                        jump_to(enemy, offset, time);
                        continue;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::Call { sub, int0, float0 } => {
                    enter_sub(file, enemy, sub, int0, float0, next);
                    continue;
                }
                EclOp::CallCond {
                    cond,
                    sub,
                    int0,
                    float0,
                    lhs,
                    rhs,
                } => {
                    let value = read_int(enemy, world.game, lhs);
                    let ordering = value.cmp(&rhs) as i32;
                    if cond.holds(ordering) {
                        enter_sub(file, enemy, sub, int0, float0, next);
                        continue;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::Ret => {
                    if enemy.flags.disable_call_stack {
                        warn!("ret while the call stack is disabled");
                    }
                    enemy.pop_context();
                    continue;
                }
                EclOp::Interrupt(id) => {
                    // The delivery block at the loop top consumes it, with
                    // this instruction's successor as the return address.
                    enemy.ctx.cursor = Some(next);
                    if id >= 0 {
                        enemy.pending_interrupt = id;
                        continue;
                    }
                }
                EclOp::InterruptSet { id, sub } => {
                    match usize::try_from(id).ok().and_then(|i| enemy.interrupts.get_mut(i)) {
                        Some(slot) => *slot = sub,
                        None => warn!(id, "interrupt table index out of range"),
                    }
                    enemy.ctx.cursor = Some(next);
                }

                // --- Arithmetic ---
                EclOp::SetInt { res, value } => {
                    let value = read_int(enemy, world.game, value);
                    write_int(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::SetFloat { res, value } => {
                    let value = read_float(enemy, world.game, value);
                    write_float(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::NormalizeAngle { res } => {
                    let value = read_float(enemy, world.game, res as f32);
                    write_float(enemy, res, add_normalize_angle(value, 0.0));
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::IntRand { res, range } => {
                    let range = read_int(enemy, world.game, range);
                    let value = world.game.rng.int_in(range);
                    write_int(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::IntRandMin { res, range, min } => {
                    let range = read_int(enemy, world.game, range);
                    let min = read_int(enemy, world.game, min);
                    let value = world.game.rng.int_in(range) + min;
                    write_int(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::FloatRand { res, range } => {
                    let range = read_float(enemy, world.game, range);
                    let value = world.game.rng.f32_in(range);
                    write_float(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::FloatRandMin { res, range, min } => {
                    let range = read_float(enemy, world.game, range);
                    let min = read_float(enemy, world.game, min);
                    let value = world.game.rng.f32_in(range) + min;
                    write_float(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::SetSelfAxis { res, axis } => {
                    let value = enemy.position[axis];
                    write_float(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::IntAlu { op, res, a, b } => {
                    let a = read_int(enemy, world.game, a);
                    let b = read_int(enemy, world.game, b);
                    let value = match op {
                        AluOp::Add => Some(a.wrapping_add(b)),
                        AluOp::Sub => Some(a.wrapping_sub(b)),
                        AluOp::Mul => Some(a.wrapping_mul(b)),
                        // Division by zero is skipped, not raised.
                        AluOp::Div => (b != 0).then(|| a.wrapping_div(b)),
                        AluOp::Mod => (b != 0).then(|| a.wrapping_rem(b)),
                    };
                    if let Some(value) = value {
                        write_int(enemy, res, value);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::FloatAlu { op, res, a, b } => {
                    let a = read_float(enemy, world.game, a);
                    let b = read_float(enemy, world.game, b);
                    let value = match op {
                        AluOp::Add => Some(a + b),
                        AluOp::Sub => Some(a - b),
                        AluOp::Mul => Some(a * b),
                        AluOp::Div => (b != 0.0).then(|| a / b),
                        AluOp::Mod => (b != 0.0).then(|| a % b),
                    };
                    if let Some(value) = value {
                        write_float(enemy, res, value);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::Inc { res } => {
                    let value = read_int(enemy, world.game, res).wrapping_add(1);
                    write_int(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::Dec { res } => {
                    let value = read_int(enemy, world.game, res).wrapping_sub(1);
                    write_int(enemy, res, value);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::Atan2 { res, x1, y1, x2, y2 } => {
                    let x1 = read_float(enemy, world.game, x1);
                    let y1 = read_float(enemy, world.game, y1);
                    let x2 = read_float(enemy, world.game, x2);
                    let y2 = read_float(enemy, world.game, y2);
                    write_float(enemy, res, (y2 - y1).atan2(x2 - x1));
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::CmpInt { lhs, rhs } => {
                    let lhs = read_int(enemy, world.game, lhs);
                    let rhs = read_int(enemy, world.game, rhs);
                    enemy.ctx.compare = lhs.cmp(&rhs) as i8;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::CmpFloat { lhs, rhs } => {
                    let lhs = read_float(enemy, world.game, lhs);
                    let rhs = read_float(enemy, world.game, rhs);
                    enemy.ctx.compare = if lhs == rhs {
                        0
                    } else if lhs < rhs {
                        -1
                    } else {
                        1
                    };
                    enemy.ctx.cursor = Some(next);
                }

                // --- ANM coupling ---
                EclOp::AnmSetMain { script } => {
                    let id = script as i64 + script_base as i64;
                    if id >= 0 {
                        world
                            .anm
                            .set_script(&mut enemy.primary_vm, id as usize, &mut world.game.rng);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::AnmSetSlot { slot, script } => {
                    let id = script as i64 + script_base as i64;
                    match usize::try_from(slot).ok().and_then(|i| enemy.vms.get_mut(i)) {
                        Some(vm) if id >= 0 => {
                            world.anm.set_script(vm, id as usize, &mut world.game.rng);
                        }
                        Some(_) => {}
                        None => warn!(slot, "sub-vm slot out of range"),
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::AnmSetDeath { scripts } => {
                    enemy.death_anm = scripts;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::AnmSetPoses {
                    center,
                    far_left,
                    far_right,
                    left,
                    right,
                } => {
                    enemy.pose = Some(PoseSet {
                        center,
                        far_left,
                        far_right,
                        left,
                        right,
                    });
                    enemy.pose_state = POSE_UNSET;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::AnmInterruptMain { interrupt } => {
                    enemy.primary_vm.pending_interrupt = interrupt;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::AnmInterruptSlot { slot, interrupt } => {
                    if let Some(vm) = usize::try_from(slot).ok().and_then(|i| enemy.vms.get_mut(i))
                    {
                        vm.pending_interrupt = interrupt;
                    }
                    enemy.ctx.cursor = Some(next);
                }

                // --- Motion ---
                EclOp::MovePosition { x, y, z } => {
                    enemy.position = Vec3::new(
                        read_float(enemy, world.game, x),
                        read_float(enemy, world.game, y),
                        read_float(enemy, world.game, z),
                    );
                    enemy.clamp_position();
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveAxisVelocity { x, y, z } => {
                    enemy.axis_speed = Vec3::new(
                        read_float(enemy, world.game, x),
                        read_float(enemy, world.game, y),
                        read_float(enemy, world.game, z),
                    );
                    enemy.motion = MotionKind::Axis;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveVelocity { angle, speed } => {
                    enemy.angle = read_float(enemy, world.game, angle);
                    enemy.speed = read_float(enemy, world.game, speed);
                    enemy.motion = MotionKind::Angular;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveAngularVelocity { velocity } => {
                    enemy.angular_velocity = read_float(enemy, world.game, velocity);
                    enemy.motion = MotionKind::Angular;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveAtPlayer {
                    angle_offset,
                    speed,
                } => {
                    enemy.angle = world.host.player_angle(enemy.position) + angle_offset;
                    enemy.speed = read_float(enemy, world.game, speed);
                    enemy.motion = MotionKind::Angular;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveSpeed { speed } => {
                    enemy.speed = read_float(enemy, world.game, speed);
                    enemy.motion = MotionKind::Angular;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveAcceleration { acceleration } => {
                    enemy.acceleration = read_float(enemy, world.game, acceleration);
                    enemy.motion = MotionKind::Angular;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveDirTime {
                    angle,
                    distance,
                    frames,
                    ease,
                } => {
                    let angle = read_float(enemy, world.game, angle);
                    let distance = read_float(enemy, world.game, distance);
                    let delta = Vec3::new(angle.cos(), angle.sin(), 0.0) * distance;
                    setup_timed_move(enemy, delta, frames, ease);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MovePosTime {
                    x,
                    y,
                    z,
                    frames,
                    ease,
                } => {
                    let target = Vec3::new(
                        read_float(enemy, world.game, x),
                        read_float(enemy, world.game, y),
                        read_float(enemy, world.game, z),
                    );
                    setup_timed_move(enemy, target - enemy.position, frames, ease);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveTime {
                    dx,
                    dy,
                    dz,
                    frames,
                    ease,
                } => {
                    let delta = Vec3::new(
                        read_float(enemy, world.game, dx),
                        read_float(enemy, world.game, dy),
                        read_float(enemy, world.game, dz),
                    );
                    setup_timed_move(enemy, delta, frames, ease);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveBoundsSet { x1, y1, x2, y2 } => {
                    enemy.lower_move_limit = glam::Vec2::new(x1, y1);
                    enemy.upper_move_limit = glam::Vec2::new(x2, y2);
                    enemy.flags.clamp_pos = true;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveBoundsDisable => {
                    enemy.flags.clamp_pos = false;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::MoveRand {
                    min,
                    max,
                    in_bounds,
                } => {
                    let min = read_float(enemy, world.game, min);
                    let max = read_float(enemy, world.game, max);
                    let mut angle = world.game.rng.f32_between(min, max);
                    if in_bounds {
                        angle = reflect_off_bounds(enemy, angle);
                    }
                    enemy.angle = angle;
                    enemy.ctx.cursor = Some(next);
                }

                // --- Bullets ---
                EclOp::Bullet { aim_mode, args } => {
                    let count1 =
                        read_int(enemy, world.game, args.count1) + enemy.rank.amount1(world.game);
                    let count2 =
                        read_int(enemy, world.game, args.count2) + enemy.rank.amount2(world.game);
                    let angle1 = add_normalize_angle(read_float(enemy, world.game, args.angle1), 0.0);
                    let mut speed1 = read_float(enemy, world.game, args.speed1);
                    if speed1 != 0.0 {
                        speed1 = (speed1 + enemy.rank.speed(world.game)).max(0.3);
                    }
                    let angle2 = read_float(enemy, world.game, args.angle2);
                    let speed2 = (read_float(enemy, world.game, args.speed2)
                        + enemy.rank.speed(world.game) / 2.0)
                        .max(0.3);
                    let sprite_offset = read_int(enemy, world.game, args.color);

                    let shooter = &mut enemy.shooter;
                    shooter.sprite = args.sprite;
                    shooter.aim_mode = super::enemy::AimMode::from_u8(aim_mode);
                    shooter.count1 = count1.max(1);
                    shooter.count2 = count2.max(1);
                    shooter.position = enemy.position + enemy.shoot_offset;
                    shooter.angle1 = angle1;
                    shooter.angle2 = angle2;
                    shooter.speed1 = speed1;
                    shooter.speed2 = speed2;
                    shooter.flags = args.flags;
                    shooter.sprite_offset = sprite_offset;
                    if !enemy.flags.shoot_disabled {
                        world.host.spawn_bullets(&enemy.shooter);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BulletEffects { ints, floats } => {
                    for (i, v) in ints.iter().enumerate() {
                        enemy.shooter.ex_ints[i] = read_int(enemy, world.game, *v);
                    }
                    for (i, v) in floats.iter().enumerate() {
                        enemy.shooter.ex_floats[i] = read_float(enemy, world.game, *v);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BulletCancel => {
                    world.host.cancel_bullets_into_points();
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BulletSound { sfx } => {
                    if sfx >= 0 {
                        enemy.shooter.sfx = sfx;
                        enemy.shooter.flags |= SHOOTER_FLAG_SOUND;
                    } else {
                        enemy.shooter.flags &= !SHOOTER_FLAG_SOUND;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BulletRankInfluence {
                    speed_low,
                    speed_high,
                    amount1_low,
                    amount1_high,
                    amount2_low,
                    amount2_high,
                } => {
                    enemy.rank = RankInfluence {
                        speed_low,
                        speed_high,
                        amount1_low,
                        amount1_high,
                        amount2_low,
                        amount2_high,
                        ..enemy.rank
                    };
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::ShootInterval { frames, delayed } => {
                    enemy.shoot_interval = frames + enemy.rank.interval(world.game);
                    if delayed && enemy.shoot_interval != 0 {
                        // Random phase so synchronized spawns do not volley.
                        let phase = world.game.rng.int_in(enemy.shoot_interval);
                        enemy.shoot_timer.set(phase);
                    } else {
                        enemy.shoot_timer.set(0);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::ShootDisabled(disabled) => {
                    enemy.flags.shoot_disabled = disabled;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::ShootNow => {
                    enemy.shooter.position = enemy.position + enemy.shoot_offset;
                    world.host.spawn_bullets(&enemy.shooter);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::ShootOffset { x, y, z } => {
                    enemy.shoot_offset = Vec3::new(
                        read_float(enemy, world.game, x),
                        read_float(enemy, world.game, y),
                        read_float(enemy, world.game, z),
                    );
                    enemy.ctx.cursor = Some(next);
                }

                // --- Lasers ---
                EclOp::Laser { args, aimed } => {
                    let shooter = super::enemy::LaserShooter {
                        position: enemy.position + enemy.shoot_offset,
                        sprite: args.sprite,
                        color: args.color,
                        angle: read_float(enemy, world.game, args.angle),
                        speed: read_float(enemy, world.game, args.speed),
                        start_offset: read_float(enemy, world.game, args.start_offset),
                        end_offset: read_float(enemy, world.game, args.end_offset),
                        start_length: read_float(enemy, world.game, args.start_length),
                        width: args.width,
                        start_time: args.start_time,
                        duration: args.duration,
                        stop_time: args.stop_time,
                        graze_delay: args.graze_delay,
                        graze_distance: args.graze_distance,
                        flags: args.flags,
                        aimed,
                    };
                    let handle = world.host.spawn_laser(&shooter);
                    if let Some(slot) = enemy.lasers.get_mut(enemy.laser_store) {
                        *slot = handle;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserIndex { slot } => {
                    let index = read_int(enemy, world.game, slot);
                    if (0..LASER_SLOTS as i32).contains(&index) {
                        enemy.laser_store = index as usize;
                    } else {
                        warn!(index, "laser store index out of range");
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserRotate { slot, delta } => {
                    let delta = read_float(enemy, world.game, delta);
                    if let Some(handle) = laser_at(enemy, slot) {
                        world.host.laser_rotate(handle, delta);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserRotateFromPlayer { slot, offset } => {
                    let offset = read_float(enemy, world.game, offset);
                    if let Some(handle) = laser_at(enemy, slot) {
                        world.host.laser_aim_at_player(handle, offset);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserOffset { slot, x, y, z } => {
                    if let Some(handle) = laser_at(enemy, slot) {
                        world
                            .host
                            .laser_set_position(handle, enemy.position + Vec3::new(x, y, z));
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserTest { slot } => {
                    let alive =
                        laser_at(enemy, slot).is_some_and(|handle| world.host.laser_alive(handle));
                    enemy.ctx.compare = if alive { 0 } else { 1 };
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserCancel { slot } => {
                    if let Some(handle) = laser_at(enemy, slot) {
                        world.host.laser_cancel(handle);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LaserClearAll => {
                    enemy.lasers = [None; LASER_SLOTS];
                    enemy.ctx.cursor = Some(next);
                }

                // --- Boss and spellcards ---
                EclOp::BossSet { slot } => {
                    if slot >= 0 {
                        world.host.set_boss(slot, true);
                        world.host.set_boss_health(1.0);
                        enemy.flags.boss = true;
                        enemy.boss_id = slot;
                    } else {
                        world.host.set_boss(enemy.boss_id, false);
                        enemy.flags.boss = false;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BossTimerSet { frames } => {
                    enemy.boss_timer.set(frames);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BossTimerClear => {
                    enemy.timer_callback_sub = enemy.death_callback_sub;
                    enemy.boss_timer.set(0);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::BossLifeCount { count } => {
                    world.host.set_boss_life_count(count);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::SpellcardStart { id, sprite, name } => {
                    world.host.show_spellcard(sprite, &name);
                    let idx = id.max(0) as usize;
                    world.game.spellcard = SpellcardInfo {
                        active: true,
                        capturing: true,
                        idx,
                        capture_score: base_score(idx),
                    };
                    world.host.cancel_bullets_into_points();
                    // Spellcards pin the rank influence to a narrow band.
                    enemy.rank = RankInfluence {
                        speed_low: -0.5,
                        speed_high: 0.5,
                        amount1_low: 0,
                        amount1_high: 0,
                        amount2_low: 0,
                        amount2_high: 0,
                        ..enemy.rank
                    };
                    if !world.game.in_replay {
                        let score = world.game.spellcard.capture_score;
                        if let Some(record) = world.game.ledger.get_mut(idx) {
                            record.record_attempt(&name, score);
                        }
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::SpellcardEnd => {
                    if world.game.spellcard.active {
                        world.host.end_spellcard();
                        let _ = world.host.despawn_bullets(12800, true);
                        if world.game.spellcard.capturing {
                            let base = world.game.spellcard.capture_score;
                            let bonus =
                                base + base * world.host.spellcard_seconds_remaining() / 10;
                            world.host.show_spellcard_bonus(bonus);
                            world.game.score += bonus as i64;
                            if !world.game.in_replay {
                                let shot = world.host.shot_type();
                                let idx = world.game.spellcard.idx;
                                if let Some(record) = world.game.ledger.get_mut(idx) {
                                    record.record_capture(shot);
                                }
                            }
                            world.game.spellcards_captured += 1;
                        }
                        world.game.spellcard.active = false;
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::SpellcardEffect {
                    x,
                    y,
                    z,
                    color_id,
                    distance: _,
                } => {
                    world.host.spawn_particles(
                        SPELLCARD_EFFECT_ID,
                        Vec3::new(x, y, z),
                        1,
                        color_id.max(0) as u32,
                    );
                    enemy.ctx.cursor = Some(next);
                }

                // --- Enemy state ---
                EclOp::SetHitbox { x, y, z } => {
                    enemy.hitbox = Vec3::new(x, y, z);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LifeSet { life } => {
                    enemy.life = life;
                    enemy.max_life = life;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::DeathCallbackSub { sub } => {
                    enemy.death_callback_sub = sub;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LifeCallbackThreshold { life } => {
                    enemy.life_callback_threshold = life;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::LifeCallbackSub { sub } => {
                    enemy.life_callback_sub = sub;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::TimerCallbackThreshold { frames } => {
                    enemy.timer_callback_threshold = frames;
                    enemy.boss_timer.set(0);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::TimerCallbackSub { sub } => {
                    enemy.timer_callback_sub = sub;
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::SetFlag { flag, value } => {
                    let on = value != 0;
                    match flag {
                        super::ops::Flag::Intangible => enemy.flags.intangible = on,
                        super::ops::Flag::Immortal => enemy.flags.immortal = on,
                        super::ops::Flag::DeathEffects => enemy.flags.death_effects = on,
                        super::ops::Flag::SuppressCallbacks => {
                            enemy.flags.suppress_callbacks = on;
                        }
                        super::ops::Flag::RotateToMotion => enemy.flags.rotate_to_motion = on,
                        super::ops::Flag::DisableCallStack => {
                            enemy.flags.disable_call_stack = on;
                        }
                        super::ops::Flag::Invisible => enemy.flags.invisible = on,
                        super::ops::Flag::SpellcardTimeout => {
                            enemy.flags.spellcard_timeout = on;
                        }
                    }
                    enemy.ctx.cursor = Some(next);
                }

                // --- Effects and items ---
                EclOp::EffectSound { idx } => {
                    world.host.play_sound(idx);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::EffectParticle {
                    effect,
                    count,
                    color,
                } => {
                    world
                        .host
                        .spawn_particles(effect, enemy.position, count, color);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::DropItems { count } => {
                    for i in 0..count {
                        let pos = enemy.position
                            + Vec3::new(
                                world.game.rng.f32_between(-ITEM_DROP_RADIUS, ITEM_DROP_RADIUS),
                                world.game.rng.f32_between(-ITEM_DROP_RADIUS, ITEM_DROP_RADIUS),
                                0.0,
                            );
                        let kind = if world.game.power < 128 {
                            if i == 0 {
                                ItemKind::PowerBig
                            } else {
                                ItemKind::PowerSmall
                            }
                        } else {
                            ItemKind::Point
                        };
                        world.host.drop_item(pos, kind);
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::DropItemId { id } => {
                    world.host.drop_item_by_id(enemy.position, id);
                    enemy.ctx.cursor = Some(next);
                }

                // --- World coupling ---
                EclOp::EnemyCreate {
                    sub,
                    x,
                    y,
                    z,
                    life,
                    item,
                    score,
                } => {
                    let pos = Vec3::new(
                        read_float(enemy, world.game, x),
                        read_float(enemy, world.game, y),
                        read_float(enemy, world.game, z),
                    );
                    world.host.spawn_enemy(sub, pos, life, item, score);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::EnemyKillAll => {
                    world.host.kill_all_enemies();
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::ExCall { index } => {
                    if let Some(call) = usize::try_from(index).ok().and_then(|i| ex_calls.get_mut(i))
                    {
                        call(enemy, world.game);
                    } else {
                        debug!(index, "extrinsic call index out of table range");
                    }
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::ExRepeat { index } => {
                    enemy.ctx.repeat_call = usize::try_from(index).ok();
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::TimeSet { offset } => {
                    let offset = read_int(enemy, world.game, offset);
                    enemy.ctx.time.advance(offset);
                    enemy.ctx.cursor = Some(next);
                }
                EclOp::StageUnpause => {
                    world.host.stage_unpause();
                    enemy.ctx.cursor = Some(next);
                }
            }
        }
    }
}

/// Point `ctx` at the top of `sub`.
fn call_sub(file: &EclFile, ctx: &mut ExecContext, sub: u16) -> bool {
    match file.sub_offset(sub as usize) {
        Some(offset) => {
            ctx.cursor = Some(offset as u32);
            ctx.time.reset();
            ctx.sub_id = sub;
            true
        }
        None => {
            warn!(sub, "call to unknown sub");
            ctx.cursor = None;
            false
        }
    }
}

/// Call semantics: save the context (unless tail-switching), enter the sub,
/// seed its first scratch registers from the instruction.
fn enter_sub(file: &EclFile, enemy: &mut Enemy, sub: i32, int0: i32, float0: f32, next: u32) {
    enemy.ctx.cursor = Some(next);
    if !enemy.flags.disable_call_stack {
        enemy.push_context();
    }
    call_sub(file, &mut enemy.ctx, sub.max(0) as u16);
    enemy.ctx.int_vars[0] = int0;
    enemy.ctx.float_vars[0] = float0;
}

fn setup_timed_move(enemy: &mut Enemy, delta: Vec3, frames: i32, ease: EaseMode) {
    enemy.move_interp_start = enemy.position;
    enemy.move_interp_delta = delta;
    enemy.move_interp_total = frames.max(1);
    enemy.move_interp_timer = FrameTimer::new();
    enemy.move_ease = ease;
    enemy.motion = MotionKind::Timed;
}

fn laser_at(enemy: &Enemy, slot: i32) -> Option<crate::host::LaserHandle> {
    *enemy.lasers.get(usize::try_from(slot).ok()?)?
}

/// Reflect a random direction away from nearby field edges.
fn reflect_off_bounds(enemy: &Enemy, mut angle: f32) -> f32 {
    if enemy.position.x < enemy.lower_move_limit.x + 96.0 {
        if angle > PI / 2.0 {
            angle = PI - angle;
        } else if angle < -PI / 2.0 {
            angle = -PI - angle;
        }
    }
    if enemy.position.x > enemy.upper_move_limit.x - 96.0 {
        if angle < PI / 2.0 && angle >= 0.0 {
            angle = PI - angle;
        } else if angle > -PI / 2.0 && angle <= 0.0 {
            angle = -PI - angle;
        }
    }
    if enemy.position.y < enemy.lower_move_limit.y + 48.0 && angle < 0.0 {
        angle = -angle;
    }
    if enemy.position.y > enemy.upper_move_limit.y - 48.0 && angle > 0.0 {
        angle = -angle;
    }
    angle
}

/// Continuous updates after the frame's instructions: motion integration,
/// the shoot-interval timer, pose animation, boss timers and thresholds,
/// and the repeating extrinsic call.
fn tick_continuous(
    file: &EclFile,
    ex_calls: &mut [ExCallFn],
    script_base: i32,
    enemy: &mut Enemy,
    world: &mut EclWorld<'_>,
) {
    let mult = world.game.framerate_mult;

    match enemy.motion {
        MotionKind::Axis => {
            enemy.position += enemy.axis_speed * mult;
        }
        MotionKind::Angular => {
            enemy.angle = add_normalize_angle(enemy.angle, mult * enemy.angular_velocity);
            enemy.speed += mult * enemy.acceleration;
            enemy.axis_speed = Vec3::new(
                enemy.angle.cos() * enemy.speed,
                enemy.angle.sin() * enemy.speed,
                0.0,
            );
            enemy.position += enemy.axis_speed * mult;
        }
        MotionKind::Timed => {
            enemy.move_interp_timer.tick(mult);
            let t = (enemy.move_interp_timer.as_frames_f32() / enemy.move_interp_total as f32)
                .min(1.0);
            let eased = enemy.move_ease.apply(t);
            let target = enemy.move_interp_start + enemy.move_interp_delta * eased;
            enemy.axis_speed = target - enemy.position;
            enemy.angle = enemy.axis_speed.y.atan2(enemy.axis_speed.x);
            enemy.position = target;
            if enemy.move_interp_timer.as_frames() >= enemy.move_interp_total {
                enemy.position = enemy.move_interp_start + enemy.move_interp_delta;
                enemy.axis_speed = Vec3::ZERO;
                enemy.motion = MotionKind::Axis;
            }
        }
    }
    enemy.clamp_position();

    if enemy.life <= 0 {
        return;
    }

    if enemy.shoot_interval > 0 {
        enemy.shoot_timer.tick(mult);
        if enemy.shoot_timer.as_frames() >= enemy.shoot_interval {
            enemy.shooter.position = enemy.position + enemy.shoot_offset;
            world.host.spawn_bullets(&enemy.shooter);
            enemy.shoot_timer.reset();
        }
    }

    if let Some(pose) = enemy.pose {
        let class: u8 = if enemy.axis_speed.x < 0.0 {
            1
        } else if enemy.axis_speed.x > 0.0 {
            2
        } else {
            0
        };
        if enemy.pose_state != class {
            let script = match class {
                0 => match enemy.pose_state {
                    POSE_UNSET => pose.center,
                    1 => pose.far_left,
                    _ => pose.far_right,
                },
                1 => pose.left,
                _ => pose.right,
            };
            let id = script as i64 + script_base as i64;
            if id >= 0 {
                world
                    .anm
                    .set_script(&mut enemy.primary_vm, id as usize, &mut world.game.rng);
            }
            enemy.pose_state = class;
        }
    }

    if enemy.flags.rotate_to_motion {
        enemy.primary_vm.rotation.z = enemy.angle;
    }

    if enemy.flags.boss {
        enemy.boss_timer.tick(mult);
    }

    if enemy.life_callback_threshold >= 0
        && enemy.life <= enemy.life_callback_threshold
        && enemy.life_callback_sub >= 0
    {
        let sub = enemy.life_callback_sub;
        enemy.life_callback_threshold = -1;
        enemy.push_context();
        call_sub(file, &mut enemy.ctx, sub as u16);
    }

    if enemy.timer_callback_threshold > 0
        && enemy.boss_timer.as_frames() >= enemy.timer_callback_threshold
        && enemy.timer_callback_sub >= 0
    {
        let sub = enemy.timer_callback_sub;
        enemy.boss_timer.set(0);
        if enemy.flags.spellcard_timeout {
            // Timing out forfeits the capture bonus.
            world.game.spellcard.capturing = false;
        }
        enemy.push_context();
        call_sub(file, &mut enemy.ctx, sub as u16);
    }

    if let Some(index) = enemy.ctx.repeat_call {
        if let Some(call) = ex_calls.get_mut(index) {
            call(enemy, world.game);
        }
    }
}
