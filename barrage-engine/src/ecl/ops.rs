//! ECL opcode set and argument decoding.
//!
//! The same instruction bytes carry many arg layouts; decoding tags them
//! into one sum type per opcode. Unknown opcodes and short argument buffers
//! decode to [`EclOp::Nop`] so forward-versioned files degrade quietly.
//!
//! i32/f32 arguments that scripts may route through registers are kept raw
//! here; the runner resolves them via [`super::vars`].

use barrage_common::Reader;
use barrage_common::math::EaseMode;

/// Opcode numbers as written in script files.
pub mod opcode {
    // Control
    pub const HALT: u16 = 0;
    pub const JUMP: u16 = 1;
    pub const JUMP_DEC: u16 = 2;
    // Arithmetic
    pub const SET_INT: u16 = 3;
    pub const SET_FLOAT: u16 = 4;
    pub const NORM_ANGLE: u16 = 5;
    pub const INT_RAND: u16 = 6;
    pub const INT_RAND_MIN: u16 = 7;
    pub const FLOAT_RAND: u16 = 8;
    pub const FLOAT_RAND_MIN: u16 = 9;
    pub const SET_SELF_X: u16 = 10;
    pub const SET_SELF_Y: u16 = 11;
    pub const SET_SELF_Z: u16 = 12;
    pub const INT_ADD: u16 = 13;
    pub const FLOAT_ADD: u16 = 14;
    pub const INC: u16 = 15;
    pub const DEC: u16 = 16;
    pub const INT_SUB: u16 = 17;
    pub const FLOAT_SUB: u16 = 18;
    pub const INT_MUL: u16 = 19;
    pub const FLOAT_MUL: u16 = 20;
    pub const INT_DIV: u16 = 21;
    pub const FLOAT_DIV: u16 = 22;
    pub const INT_MOD: u16 = 23;
    pub const FLOAT_MOD: u16 = 24;
    pub const ATAN2: u16 = 25;
    // Compare + conditional control
    pub const CMP_INT: u16 = 26;
    pub const CMP_FLOAT: u16 = 27;
    pub const JUMP_LSS: u16 = 28;
    pub const JUMP_LEQ: u16 = 29;
    pub const JUMP_EQU: u16 = 30;
    pub const JUMP_GRE: u16 = 31;
    pub const JUMP_GEQ: u16 = 32;
    pub const JUMP_NEQ: u16 = 33;
    pub const CALL: u16 = 34;
    pub const RET: u16 = 35;
    pub const CALL_LSS: u16 = 36;
    pub const CALL_LEQ: u16 = 37;
    pub const CALL_EQU: u16 = 38;
    pub const CALL_GRE: u16 = 39;
    pub const CALL_GEQ: u16 = 40;
    pub const CALL_NEQ: u16 = 41;
    // ANM coupling
    pub const ANM_SET_MAIN: u16 = 42;
    pub const ANM_SET_SLOT: u16 = 43;
    // Motion
    pub const MOVE_POSITION: u16 = 44;
    pub const MOVE_AXIS_VELOCITY: u16 = 45;
    pub const MOVE_VELOCITY: u16 = 46;
    pub const MOVE_ANGULAR_VELOCITY: u16 = 47;
    pub const MOVE_AT_PLAYER: u16 = 48;
    pub const MOVE_SPEED: u16 = 49;
    pub const MOVE_ACCELERATION: u16 = 50;
    // Bullets
    pub const BULLET_FAN_AIMED: u16 = 51;
    pub const BULLET_FAN: u16 = 52;
    pub const BULLET_CIRCLE_AIMED: u16 = 53;
    pub const BULLET_CIRCLE: u16 = 54;
    pub const BULLET_OFFSET_CIRCLE_AIMED: u16 = 55;
    pub const BULLET_OFFSET_CIRCLE: u16 = 56;
    pub const BULLET_RANDOM_ANGLE: u16 = 57;
    pub const BULLET_RANDOM_SPEED: u16 = 58;
    pub const BULLET_RANDOM: u16 = 59;
    pub const BULLET_EFFECTS: u16 = 60;
    pub const ANM_SET_DEATH: u16 = 61;
    pub const SHOOT_INTERVAL: u16 = 62;
    pub const SHOOT_INTERVAL_DELAYED: u16 = 63;
    pub const SHOOT_DISABLED: u16 = 64;
    pub const SHOOT_ENABLED: u16 = 65;
    pub const SHOOT_NOW: u16 = 66;
    pub const SHOOT_OFFSET: u16 = 67;
    // Lasers
    pub const LASER_CREATE: u16 = 68;
    pub const LASER_CREATE_AIMED: u16 = 69;
    pub const LASER_INDEX: u16 = 70;
    pub const LASER_ROTATE: u16 = 71;
    pub const LASER_ROTATE_FROM_PLAYER: u16 = 72;
    pub const LASER_OFFSET: u16 = 73;
    pub const LASER_TEST: u16 = 74;
    pub const LASER_CANCEL: u16 = 75;
    pub const LASER_CLEAR_ALL: u16 = 76;
    // Boss + spellcard
    pub const BOSS_SET: u16 = 77;
    pub const SPELLCARD_EFFECT: u16 = 78;
    // Timed motion
    pub const MOVE_DIR_TIME_DECEL: u16 = 79;
    pub const MOVE_DIR_TIME_DECEL_FAST: u16 = 80;
    pub const MOVE_DIR_TIME_ACCEL: u16 = 81;
    pub const MOVE_DIR_TIME_ACCEL_FAST: u16 = 82;
    pub const MOVE_POS_TIME_LINEAR: u16 = 83;
    pub const MOVE_POS_TIME_DECEL: u16 = 84;
    pub const MOVE_POS_TIME_DECEL_FAST: u16 = 85;
    pub const MOVE_POS_TIME_ACCEL: u16 = 86;
    pub const MOVE_POS_TIME_ACCEL_FAST: u16 = 87;
    pub const MOVE_TIME_DECEL: u16 = 88;
    pub const MOVE_TIME_DECEL_FAST: u16 = 89;
    pub const MOVE_TIME_ACCEL: u16 = 90;
    pub const MOVE_TIME_ACCEL_FAST: u16 = 91;
    pub const MOVE_BOUNDS_SET: u16 = 92;
    pub const MOVE_BOUNDS_DISABLE: u16 = 93;
    pub const MOVE_RAND: u16 = 94;
    pub const MOVE_RAND_IN_BOUND: u16 = 95;
    // Enemy state
    pub const ANM_SET_POSES: u16 = 96;
    pub const SET_HITBOX: u16 = 97;
    pub const FLAG_INTANGIBLE: u16 = 98;
    pub const FLAG_IMMORTAL: u16 = 99;
    pub const EFFECT_SOUND: u16 = 100;
    pub const FLAG_DEATH_EFFECTS: u16 = 101;
    pub const DEATH_CALLBACK_SUB: u16 = 102;
    pub const INTERRUPT_SET: u16 = 103;
    pub const INTERRUPT: u16 = 104;
    pub const LIFE_SET: u16 = 105;
    pub const SPELLCARD_START: u16 = 106;
    pub const SPELLCARD_END: u16 = 107;
    pub const BOSS_TIMER_SET: u16 = 108;
    pub const LIFE_CALLBACK_THRESHOLD: u16 = 109;
    pub const LIFE_CALLBACK_SUB: u16 = 110;
    pub const TIMER_CALLBACK_THRESHOLD: u16 = 111;
    pub const TIMER_CALLBACK_SUB: u16 = 112;
    pub const FLAG_SUPPRESS_CALLBACKS: u16 = 113;
    pub const EFFECT_PARTICLE: u16 = 114;
    pub const DROP_ITEMS: u16 = 115;
    pub const FLAG_ROTATE_TO_MOTION: u16 = 116;
    // Extrinsic calls + time
    pub const EX_CALL: u16 = 117;
    pub const EX_REPEAT: u16 = 118;
    pub const TIME_SET: u16 = 119;
    pub const DROP_ITEM_ID: u16 = 120;
    pub const STAGE_UNPAUSE: u16 = 121;
    pub const BOSS_LIFE_COUNT: u16 = 122;
    pub const ENEMY_CREATE: u16 = 123;
    pub const ENEMY_KILL_ALL: u16 = 124;
    pub const ANM_INTERRUPT_MAIN: u16 = 125;
    pub const ANM_INTERRUPT_SLOT: u16 = 126;
    pub const BULLET_CANCEL: u16 = 127;
    pub const BULLET_SOUND: u16 = 128;
    pub const FLAG_DISABLE_CALL_STACK: u16 = 129;
    pub const BULLET_RANK_INFLUENCE: u16 = 130;
    pub const FLAG_INVISIBLE: u16 = 131;
    pub const BOSS_TIMER_CLEAR: u16 = 132;
    pub const FLAG_SPELLCARD_TIMEOUT: u16 = 133;
    pub const NOP: u16 = 134;
}

/// Integer comparison condition for conditional jump/call variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Lss,
    Leq,
    Equ,
    Gre,
    Geq,
    Neq,
}

impl Cond {
    pub fn holds(self, ordering: i32) -> bool {
        match self {
            Cond::Lss => ordering < 0,
            Cond::Leq => ordering <= 0,
            Cond::Equ => ordering == 0,
            Cond::Gre => ordering > 0,
            Cond::Geq => ordering >= 0,
            Cond::Neq => ordering != 0,
        }
    }
}

/// Binary ALU operator shared by the int and float variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Bullet pattern args (shared by the nine bullet opcodes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletArgs {
    pub sprite: i32,
    pub count1: i32,
    pub count2: i32,
    pub angle1: f32,
    pub speed1: f32,
    pub angle2: f32,
    pub speed2: f32,
    pub color: i32,
    pub flags: u32,
}

/// Laser creation args.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserArgs {
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
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum EclOp {
    Nop,
    Halt,

    Jump { offset: i32, time: i32 },
    JumpDec { offset: i32, time: i32, var: i32 },
    JumpCond { cond: Cond, offset: i32, time: i32 },
    Call { sub: i32, int0: i32, float0: f32 },
    CallCond { cond: Cond, sub: i32, int0: i32, float0: f32, lhs: i32, rhs: i32 },
    Ret,
    Interrupt(i32),
    InterruptSet { id: i32, sub: i32 },

    SetInt { res: i32, value: i32 },
    SetFloat { res: i32, value: f32 },
    NormalizeAngle { res: i32 },
    IntRand { res: i32, range: i32 },
    IntRandMin { res: i32, range: i32, min: i32 },
    FloatRand { res: i32, range: f32 },
    FloatRandMin { res: i32, range: f32, min: f32 },
    SetSelfAxis { res: i32, axis: usize },
    IntAlu { op: AluOp, res: i32, a: i32, b: i32 },
    FloatAlu { op: AluOp, res: i32, a: f32, b: f32 },
    Inc { res: i32 },
    Dec { res: i32 },
    Atan2 { res: i32, x1: f32, y1: f32, x2: f32, y2: f32 },
    CmpInt { lhs: i32, rhs: i32 },
    CmpFloat { lhs: f32, rhs: f32 },

    AnmSetMain { script: i32 },
    AnmSetSlot { slot: i32, script: i32 },
    AnmSetDeath { scripts: [i32; 3] },
    AnmSetPoses { center: i32, far_left: i32, far_right: i32, left: i32, right: i32 },
    AnmInterruptMain { interrupt: i32 },
    AnmInterruptSlot { slot: i32, interrupt: i32 },

    MovePosition { x: f32, y: f32, z: f32 },
    MoveAxisVelocity { x: f32, y: f32, z: f32 },
    MoveVelocity { angle: f32, speed: f32 },
    MoveAngularVelocity { velocity: f32 },
    MoveAtPlayer { angle_offset: f32, speed: f32 },
    MoveSpeed { speed: f32 },
    MoveAcceleration { acceleration: f32 },
    MoveDirTime { angle: f32, distance: f32, frames: i32, ease: EaseMode },
    MovePosTime { x: f32, y: f32, z: f32, frames: i32, ease: EaseMode },
    MoveTime { dx: f32, dy: f32, dz: f32, frames: i32, ease: EaseMode },
    MoveBoundsSet { x1: f32, y1: f32, x2: f32, y2: f32 },
    MoveBoundsDisable,
    MoveRand { min: f32, max: f32, in_bounds: bool },

    Bullet { aim_mode: u8, args: BulletArgs },
    BulletEffects { ints: [i32; 4], floats: [f32; 4] },
    BulletCancel,
    BulletSound { sfx: i32 },
    BulletRankInfluence {
        speed_low: f32,
        speed_high: f32,
        amount1_low: i32,
        amount1_high: i32,
        amount2_low: i32,
        amount2_high: i32,
    },
    ShootInterval { frames: i32, delayed: bool },
    ShootDisabled(bool),
    ShootNow,
    ShootOffset { x: f32, y: f32, z: f32 },

    Laser { args: LaserArgs, aimed: bool },
    LaserIndex { slot: i32 },
    LaserRotate { slot: i32, delta: f32 },
    LaserRotateFromPlayer { slot: i32, offset: f32 },
    LaserOffset { slot: i32, x: f32, y: f32, z: f32 },
    LaserTest { slot: i32 },
    LaserCancel { slot: i32 },
    LaserClearAll,

    BossSet { slot: i32 },
    BossTimerSet { frames: i32 },
    BossTimerClear,
    BossLifeCount { count: i32 },
    SpellcardStart { id: i32, sprite: i32, name: String },
    SpellcardEnd,
    SpellcardEffect { x: f32, y: f32, z: f32, color_id: i32, distance: f32 },

    SetHitbox { x: f32, y: f32, z: f32 },
    LifeSet { life: i32 },
    DeathCallbackSub { sub: i32 },
    LifeCallbackThreshold { life: i32 },
    LifeCallbackSub { sub: i32 },
    TimerCallbackThreshold { frames: i32 },
    TimerCallbackSub { sub: i32 },
    SetFlag { flag: Flag, value: i32 },

    EffectSound { idx: i32 },
    EffectParticle { effect: i32, count: i32, color: u32 },
    DropItems { count: i32 },
    DropItemId { id: i32 },

    EnemyCreate { sub: i32, x: f32, y: f32, z: f32, life: i32, item: i32, score: i32 },
    EnemyKillAll,

    ExCall { index: i32 },
    ExRepeat { index: i32 },
    TimeSet { offset: i32 },
    StageUnpause,
}

/// Boolean enemy flags settable by one-arg opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Intangible,
    Immortal,
    DeathEffects,
    SuppressCallbacks,
    RotateToMotion,
    DisableCallStack,
    Invisible,
    SpellcardTimeout,
}

/// Decode `opcode` with its raw argument bytes.
pub fn decode(op: u16, args: &[u8]) -> EclOp {
    try_decode(op, args).unwrap_or(EclOp::Nop)
}

fn try_decode(op: u16, args: &[u8]) -> Option<EclOp> {
    use opcode::*;

    let r = Reader::new(args);
    let jump = || {
        Some((r.i32_at(0)?, r.i32_at(4)?))
    };
    let move3 = || Some((r.f32_at(0)?, r.f32_at(4)?, r.f32_at(8)?));
    let flag = |f: Flag| Some(EclOp::SetFlag { flag: f, value: r.i32_at(0)? });

    Some(match op {
        HALT => EclOp::Halt,
        NOP => EclOp::Nop,

        JUMP => {
            let (offset, time) = jump()?;
            EclOp::Jump { offset, time }
        }
        JUMP_DEC => {
            let (offset, time) = jump()?;
            EclOp::JumpDec { offset, time, var: r.i32_at(8)? }
        }
        JUMP_LSS | JUMP_LEQ | JUMP_EQU | JUMP_GRE | JUMP_GEQ | JUMP_NEQ => {
            let (offset, time) = jump()?;
            let cond = match op {
                JUMP_LSS => Cond::Lss,
                JUMP_LEQ => Cond::Leq,
                JUMP_EQU => Cond::Equ,
                JUMP_GRE => Cond::Gre,
                JUMP_GEQ => Cond::Geq,
                _ => Cond::Neq,
            };
            EclOp::JumpCond { cond, offset, time }
        }
        CALL => EclOp::Call {
            sub: r.i32_at(0)?,
            int0: r.i32_at(4)?,
            float0: r.f32_at(8)?,
        },
        CALL_LSS | CALL_LEQ | CALL_EQU | CALL_GRE | CALL_GEQ | CALL_NEQ => {
            let cond = match op {
                CALL_LSS => Cond::Lss,
                CALL_LEQ => Cond::Leq,
                CALL_EQU => Cond::Equ,
                CALL_GRE => Cond::Gre,
                CALL_GEQ => Cond::Geq,
                _ => Cond::Neq,
            };
            EclOp::CallCond {
                cond,
                sub: r.i32_at(0)?,
                int0: r.i32_at(4)?,
                float0: r.f32_at(8)?,
                lhs: r.i32_at(12)?,
                rhs: r.i32_at(16)?,
            }
        }
        RET => EclOp::Ret,
        INTERRUPT => EclOp::Interrupt(r.i32_at(0)?),
        INTERRUPT_SET => EclOp::InterruptSet {
            id: r.i32_at(0)?,
            sub: r.i32_at(4)?,
        },

        SET_INT => EclOp::SetInt { res: r.i32_at(0)?, value: r.i32_at(4)? },
        SET_FLOAT => EclOp::SetFloat { res: r.i32_at(0)?, value: r.f32_at(4)? },
        NORM_ANGLE => EclOp::NormalizeAngle { res: r.i32_at(0)? },
        INT_RAND => EclOp::IntRand { res: r.i32_at(0)?, range: r.i32_at(4)? },
        INT_RAND_MIN => EclOp::IntRandMin {
            res: r.i32_at(0)?,
            range: r.i32_at(4)?,
            min: r.i32_at(8)?,
        },
        FLOAT_RAND => EclOp::FloatRand { res: r.i32_at(0)?, range: r.f32_at(4)? },
        FLOAT_RAND_MIN => EclOp::FloatRandMin {
            res: r.i32_at(0)?,
            range: r.f32_at(4)?,
            min: r.f32_at(8)?,
        },
        SET_SELF_X | SET_SELF_Y | SET_SELF_Z => EclOp::SetSelfAxis {
            res: r.i32_at(0)?,
            axis: (op - SET_SELF_X) as usize,
        },
        INT_ADD | INT_SUB | INT_MUL | INT_DIV | INT_MOD => EclOp::IntAlu {
            op: match op {
                INT_ADD => AluOp::Add,
                INT_SUB => AluOp::Sub,
                INT_MUL => AluOp::Mul,
                INT_DIV => AluOp::Div,
                _ => AluOp::Mod,
            },
            res: r.i32_at(0)?,
            a: r.i32_at(4)?,
            b: r.i32_at(8)?,
        },
        FLOAT_ADD | FLOAT_SUB | FLOAT_MUL | FLOAT_DIV | FLOAT_MOD => EclOp::FloatAlu {
            op: match op {
                FLOAT_ADD => AluOp::Add,
                FLOAT_SUB => AluOp::Sub,
                FLOAT_MUL => AluOp::Mul,
                FLOAT_DIV => AluOp::Div,
                _ => AluOp::Mod,
            },
            res: r.i32_at(0)?,
            a: r.f32_at(4)?,
            b: r.f32_at(8)?,
        },
        INC => EclOp::Inc { res: r.i32_at(0)? },
        DEC => EclOp::Dec { res: r.i32_at(0)? },
        ATAN2 => EclOp::Atan2 {
            res: r.i32_at(0)?,
            x1: r.f32_at(4)?,
            y1: r.f32_at(8)?,
            x2: r.f32_at(12)?,
            y2: r.f32_at(16)?,
        },
        CMP_INT => EclOp::CmpInt { lhs: r.i32_at(0)?, rhs: r.i32_at(4)? },
        CMP_FLOAT => EclOp::CmpFloat { lhs: r.f32_at(0)?, rhs: r.f32_at(4)? },

        ANM_SET_MAIN => EclOp::AnmSetMain { script: r.i32_at(0)? },
        ANM_SET_SLOT => EclOp::AnmSetSlot {
            slot: r.i32_at(0)?,
            script: r.i32_at(4)?,
        },
        ANM_SET_DEATH => EclOp::AnmSetDeath {
            scripts: [r.i32_at(0)?, r.i32_at(4)?, r.i32_at(8)?],
        },
        ANM_SET_POSES => EclOp::AnmSetPoses {
            center: r.i32_at(0)?,
            far_left: r.i32_at(4)?,
            far_right: r.i32_at(8)?,
            left: r.i32_at(12)?,
            right: r.i32_at(16)?,
        },
        ANM_INTERRUPT_MAIN => EclOp::AnmInterruptMain { interrupt: r.i32_at(0)? },
        ANM_INTERRUPT_SLOT => EclOp::AnmInterruptSlot {
            slot: r.i32_at(0)?,
            interrupt: r.i32_at(4)?,
        },

        MOVE_POSITION => {
            let (x, y, z) = move3()?;
            EclOp::MovePosition { x, y, z }
        }
        MOVE_AXIS_VELOCITY => {
            let (x, y, z) = move3()?;
            EclOp::MoveAxisVelocity { x, y, z }
        }
        MOVE_VELOCITY => EclOp::MoveVelocity {
            angle: r.f32_at(0)?,
            speed: r.f32_at(4)?,
        },
        MOVE_ANGULAR_VELOCITY => EclOp::MoveAngularVelocity { velocity: r.f32_at(0)? },
        MOVE_AT_PLAYER => EclOp::MoveAtPlayer {
            angle_offset: r.f32_at(0)?,
            speed: r.f32_at(4)?,
        },
        MOVE_SPEED => EclOp::MoveSpeed { speed: r.f32_at(0)? },
        MOVE_ACCELERATION => EclOp::MoveAcceleration { acceleration: r.f32_at(0)? },
        MOVE_DIR_TIME_DECEL | MOVE_DIR_TIME_DECEL_FAST | MOVE_DIR_TIME_ACCEL
        | MOVE_DIR_TIME_ACCEL_FAST => EclOp::MoveDirTime {
            angle: r.f32_at(0)?,
            distance: r.f32_at(4)?,
            frames: r.i32_at(8)?,
            ease: EaseMode::from_u8((op - MOVE_DIR_TIME_DECEL) as u8 + 1),
        },
        MOVE_POS_TIME_LINEAR | MOVE_POS_TIME_DECEL | MOVE_POS_TIME_DECEL_FAST
        | MOVE_POS_TIME_ACCEL | MOVE_POS_TIME_ACCEL_FAST => EclOp::MovePosTime {
            x: r.f32_at(0)?,
            y: r.f32_at(4)?,
            z: r.f32_at(8)?,
            frames: r.i32_at(12)?,
            ease: EaseMode::from_u8((op - MOVE_POS_TIME_LINEAR) as u8),
        },
        MOVE_TIME_DECEL | MOVE_TIME_DECEL_FAST | MOVE_TIME_ACCEL | MOVE_TIME_ACCEL_FAST => {
            EclOp::MoveTime {
                dx: r.f32_at(0)?,
                dy: r.f32_at(4)?,
                dz: r.f32_at(8)?,
                frames: r.i32_at(12)?,
                ease: EaseMode::from_u8((op - MOVE_TIME_DECEL) as u8 + 1),
            }
        }
        MOVE_BOUNDS_SET => EclOp::MoveBoundsSet {
            x1: r.f32_at(0)?,
            y1: r.f32_at(4)?,
            x2: r.f32_at(8)?,
            y2: r.f32_at(12)?,
        },
        MOVE_BOUNDS_DISABLE => EclOp::MoveBoundsDisable,
        MOVE_RAND | MOVE_RAND_IN_BOUND => EclOp::MoveRand {
            min: r.f32_at(0)?,
            max: r.f32_at(4)?,
            in_bounds: op == MOVE_RAND_IN_BOUND,
        },

        BULLET_FAN_AIMED..=BULLET_RANDOM => EclOp::Bullet {
            aim_mode: (op - BULLET_FAN_AIMED) as u8,
            args: BulletArgs {
                sprite: r.i32_at(0)?,
                count1: r.i32_at(4)?,
                count2: r.i32_at(8)?,
                angle1: r.f32_at(12)?,
                speed1: r.f32_at(16)?,
                angle2: r.f32_at(20)?,
                speed2: r.f32_at(24)?,
                color: r.i32_at(28)?,
                flags: r.u32_at(32)?,
            },
        },
        BULLET_EFFECTS => EclOp::BulletEffects {
            ints: [r.i32_at(0)?, r.i32_at(4)?, r.i32_at(8)?, r.i32_at(12)?],
            floats: [r.f32_at(16)?, r.f32_at(20)?, r.f32_at(24)?, r.f32_at(28)?],
        },
        BULLET_CANCEL => EclOp::BulletCancel,
        BULLET_SOUND => EclOp::BulletSound { sfx: r.i32_at(0)? },
        BULLET_RANK_INFLUENCE => EclOp::BulletRankInfluence {
            speed_low: r.f32_at(0)?,
            speed_high: r.f32_at(4)?,
            amount1_low: r.i32_at(8)?,
            amount1_high: r.i32_at(12)?,
            amount2_low: r.i32_at(16)?,
            amount2_high: r.i32_at(20)?,
        },
        SHOOT_INTERVAL => EclOp::ShootInterval { frames: r.i32_at(0)?, delayed: false },
        SHOOT_INTERVAL_DELAYED => EclOp::ShootInterval { frames: r.i32_at(0)?, delayed: true },
        SHOOT_DISABLED => EclOp::ShootDisabled(true),
        SHOOT_ENABLED => EclOp::ShootDisabled(false),
        SHOOT_NOW => EclOp::ShootNow,
        SHOOT_OFFSET => {
            let (x, y, z) = move3()?;
            EclOp::ShootOffset { x, y, z }
        }

        LASER_CREATE | LASER_CREATE_AIMED => EclOp::Laser {
            aimed: op == LASER_CREATE_AIMED,
            args: LaserArgs {
                sprite: r.i32_at(0)?,
                color: r.i32_at(4)?,
                angle: r.f32_at(8)?,
                speed: r.f32_at(12)?,
                start_offset: r.f32_at(16)?,
                end_offset: r.f32_at(20)?,
                start_length: r.f32_at(24)?,
                width: r.f32_at(28)?,
                start_time: r.i32_at(32)?,
                duration: r.i32_at(36)?,
                stop_time: r.i32_at(40)?,
                graze_delay: r.i32_at(44)?,
                graze_distance: r.i32_at(48)?,
                flags: r.u32_at(52)?,
            },
        },
        LASER_INDEX => EclOp::LaserIndex { slot: r.i32_at(0)? },
        LASER_ROTATE => EclOp::LaserRotate { slot: r.i32_at(0)?, delta: r.f32_at(4)? },
        LASER_ROTATE_FROM_PLAYER => EclOp::LaserRotateFromPlayer {
            slot: r.i32_at(0)?,
            offset: r.f32_at(4)?,
        },
        LASER_OFFSET => EclOp::LaserOffset {
            slot: r.i32_at(0)?,
            x: r.f32_at(4)?,
            y: r.f32_at(8)?,
            z: r.f32_at(12)?,
        },
        LASER_TEST => EclOp::LaserTest { slot: r.i32_at(0)? },
        LASER_CANCEL => EclOp::LaserCancel { slot: r.i32_at(0)? },
        LASER_CLEAR_ALL => EclOp::LaserClearAll,

        BOSS_SET => EclOp::BossSet { slot: r.i32_at(0)? },
        SPELLCARD_EFFECT => EclOp::SpellcardEffect {
            x: r.f32_at(0)?,
            y: r.f32_at(4)?,
            z: r.f32_at(8)?,
            color_id: r.i32_at(12)?,
            distance: r.f32_at(16)?,
        },
        SPELLCARD_START => {
            let name_bytes = r.slice_at(8, args.len().saturating_sub(8))?;
            let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
            EclOp::SpellcardStart {
                id: r.i32_at(0)?,
                sprite: r.i32_at(4)?,
                name: String::from_utf8_lossy(&name_bytes[..end]).into_owned(),
            }
        }
        SPELLCARD_END => EclOp::SpellcardEnd,

        SET_HITBOX => {
            let (x, y, z) = move3()?;
            EclOp::SetHitbox { x, y, z }
        }
        LIFE_SET => EclOp::LifeSet { life: r.i32_at(0)? },
        DEATH_CALLBACK_SUB => EclOp::DeathCallbackSub { sub: r.i32_at(0)? },
        LIFE_CALLBACK_THRESHOLD => EclOp::LifeCallbackThreshold { life: r.i32_at(0)? },
        LIFE_CALLBACK_SUB => EclOp::LifeCallbackSub { sub: r.i32_at(0)? },
        TIMER_CALLBACK_THRESHOLD => EclOp::TimerCallbackThreshold { frames: r.i32_at(0)? },
        TIMER_CALLBACK_SUB => EclOp::TimerCallbackSub { sub: r.i32_at(0)? },
        BOSS_TIMER_SET => EclOp::BossTimerSet { frames: r.i32_at(0)? },
        BOSS_TIMER_CLEAR => EclOp::BossTimerClear,
        BOSS_LIFE_COUNT => EclOp::BossLifeCount { count: r.i32_at(0)? },

        FLAG_INTANGIBLE => flag(Flag::Intangible)?,
        FLAG_IMMORTAL => flag(Flag::Immortal)?,
        FLAG_DEATH_EFFECTS => flag(Flag::DeathEffects)?,
        FLAG_SUPPRESS_CALLBACKS => flag(Flag::SuppressCallbacks)?,
        FLAG_ROTATE_TO_MOTION => flag(Flag::RotateToMotion)?,
        FLAG_DISABLE_CALL_STACK => flag(Flag::DisableCallStack)?,
        FLAG_INVISIBLE => flag(Flag::Invisible)?,
        FLAG_SPELLCARD_TIMEOUT => flag(Flag::SpellcardTimeout)?,

        EFFECT_SOUND => EclOp::EffectSound { idx: r.i32_at(0)? },
        EFFECT_PARTICLE => EclOp::EffectParticle {
            effect: r.i32_at(0)?,
            count: r.i32_at(4)?,
            color: r.u32_at(8)?,
        },
        DROP_ITEMS => EclOp::DropItems { count: r.i32_at(0)? },
        DROP_ITEM_ID => EclOp::DropItemId { id: r.i32_at(0)? },

        ENEMY_CREATE => EclOp::EnemyCreate {
            sub: r.i32_at(0)?,
            x: r.f32_at(4)?,
            y: r.f32_at(8)?,
            z: r.f32_at(12)?,
            life: r.i32_at(16)?,
            item: r.i32_at(20)?,
            score: r.i32_at(24)?,
        },
        ENEMY_KILL_ALL => EclOp::EnemyKillAll,

        EX_CALL => EclOp::ExCall { index: r.i32_at(0)? },
        EX_REPEAT => EclOp::ExRepeat { index: r.i32_at(0)? },
        TIME_SET => EclOp::TimeSet { offset: r.i32_at(0)? },
        STAGE_UNPAUSE => EclOp::StageUnpause,

        _ => EclOp::Nop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrage_common::testutil::{Arg, args};

    #[test]
    fn test_decode_jump_and_call() {
        assert_eq!(
            decode(opcode::JUMP, &args(&[Arg::I32(-24), Arg::I32(30)])),
            EclOp::Jump { offset: -24, time: 30 }
        );
        assert_eq!(
            decode(
                opcode::CALL,
                &args(&[Arg::I32(7), Arg::I32(3), Arg::F32(1.5)])
            ),
            EclOp::Call { sub: 7, int0: 3, float0: 1.5 }
        );
    }

    #[test]
    fn test_decode_bullet_family_aim_modes() {
        let a = args(&[
            Arg::I32(12),
            Arg::I32(3),
            Arg::I32(5),
            Arg::F32(0.1),
            Arg::F32(2.0),
            Arg::F32(0.2),
            Arg::F32(1.0),
            Arg::I32(4),
            Arg::U32(0),
        ]);
        for (i, op) in (opcode::BULLET_FAN_AIMED..=opcode::BULLET_RANDOM).enumerate() {
            match decode(op, &a) {
                EclOp::Bullet { aim_mode, args } => {
                    assert_eq!(aim_mode, i as u8);
                    assert_eq!(args.sprite, 12);
                    assert_eq!(args.count2, 5);
                }
                other => panic!("expected bullet op, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_timed_moves_pick_ease() {
        let pos = args(&[
            Arg::F32(1.0),
            Arg::F32(2.0),
            Arg::F32(0.0),
            Arg::I32(60),
        ]);
        assert!(matches!(
            decode(opcode::MOVE_POS_TIME_LINEAR, &pos),
            EclOp::MovePosTime { ease: EaseMode::Linear, frames: 60, .. }
        ));
        assert!(matches!(
            decode(opcode::MOVE_POS_TIME_ACCEL_FAST, &pos),
            EclOp::MovePosTime { ease: EaseMode::AccelFast, .. }
        ));
        assert!(matches!(
            decode(opcode::MOVE_TIME_DECEL, &pos),
            EclOp::MoveTime { ease: EaseMode::Decel, .. }
        ));
        assert!(matches!(
            decode(opcode::MOVE_DIR_TIME_ACCEL, &args(&[Arg::F32(0.5), Arg::F32(64.0), Arg::I32(30)])),
            EclOp::MoveDirTime { ease: EaseMode::Accel, .. }
        ));
    }

    #[test]
    fn test_decode_spellcard_start_name() {
        let mut a = args(&[Arg::I32(5), Arg::I32(2)]);
        a.extend_from_slice(b"Sign \"Test\"\0");
        match decode(opcode::SPELLCARD_START, &a) {
            EclOp::SpellcardStart { id, sprite, name } => {
                assert_eq!(id, 5);
                assert_eq!(sprite, 2);
                assert_eq!(name, "Sign \"Test\"");
            }
            other => panic!("expected spellcard start, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_truncated_decode_to_nop() {
        assert_eq!(decode(9999, &[]), EclOp::Nop);
        assert_eq!(decode(opcode::JUMP, &[1, 2, 3]), EclOp::Nop);
        assert_eq!(decode(opcode::BULLET_FAN, &[0; 8]), EclOp::Nop);
    }

    #[test]
    fn test_cond_table() {
        assert!(Cond::Lss.holds(-1));
        assert!(!Cond::Lss.holds(0));
        assert!(Cond::Leq.holds(0));
        assert!(Cond::Equ.holds(0));
        assert!(Cond::Gre.holds(1));
        assert!(Cond::Geq.holds(0));
        assert!(Cond::Neq.holds(-1));
        assert!(!Cond::Neq.holds(0));
    }
}
