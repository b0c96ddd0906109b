//! ANM opcode set and argument decoding.
//!
//! Opcodes are a closed set with explicit numbers; anything outside it (or
//! with short args) decodes to [`AnmOp::Nop`] so newer scripts degrade
//! instead of derailing the VM.

use barrage_common::Reader;
use barrage_common::math::EaseMode;
use glam::{Vec2, Vec3};

/// Opcode numbers as written in script files.
pub mod opcode {
    pub const NOP: u16 = 0;
    pub const EXIT: u16 = 1;
    pub const EXIT_HIDE: u16 = 2;
    pub const SET_SPRITE: u16 = 3;
    pub const SET_RANDOM_SPRITE: u16 = 4;
    pub const SET_SCALE: u16 = 5;
    pub const SET_ALPHA: u16 = 6;
    pub const SET_COLOR: u16 = 7;
    pub const JUMP: u16 = 8;
    pub const FLIP_X: u16 = 9;
    pub const FLIP_Y: u16 = 10;
    pub const USE_POS_OFFSET: u16 = 11;
    pub const SET_ROTATION: u16 = 12;
    pub const SET_ANGLE_VEL: u16 = 13;
    pub const SCALE_TIME: u16 = 14;
    pub const SET_SCALE_SPEED: u16 = 15;
    pub const FADE: u16 = 16;
    pub const BLEND_ADDITIVE: u16 = 17;
    pub const BLEND_DEFAULT: u16 = 18;
    pub const SET_POSITION: u16 = 19;
    pub const POS_TIME_LINEAR: u16 = 20;
    pub const POS_TIME_DECEL: u16 = 21;
    pub const POS_TIME_DECEL_FAST: u16 = 22;
    pub const POS_TIME_ACCEL: u16 = 23;
    pub const POS_TIME_ACCEL_FAST: u16 = 24;
    pub const STOP: u16 = 25;
    pub const STOP_HIDE: u16 = 26;
    pub const INTERRUPT_LABEL: u16 = 27;
    pub const SET_VISIBILITY: u16 = 28;
    pub const ANCHOR_TOP_LEFT: u16 = 29;
    pub const SET_AUTO_ROTATE: u16 = 30;
    pub const UV_SCROLL_X: u16 = 31;
    pub const UV_SCROLL_Y: u16 = 32;
    pub const SET_Z_WRITE_DISABLE: u16 = 33;
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnmOp {
    Nop,
    Exit,
    ExitHide,
    SetSprite(i32),
    SetRandomSprite { base: i32, span: i32 },
    SetScale(Vec2),
    SetAlpha(i32),
    SetColor(u32),
    Jump { target: i32, time: i32 },
    FlipX,
    FlipY,
    UsePosOffset(bool),
    SetRotation(Vec3),
    SetAngleVel(Vec3),
    ScaleTime { scale: Vec2, frames: i32 },
    SetScaleSpeed(Vec2),
    Fade { alpha: u32, frames: i32 },
    BlendAdditive,
    BlendDefault,
    SetPosition(Vec3),
    PosTime { target: Vec3, frames: i32, ease: EaseMode },
    Stop,
    StopHide,
    InterruptLabel(i32),
    SetVisibility(bool),
    AnchorTopLeft,
    SetAutoRotate(bool),
    UvScrollX(f32),
    UvScrollY(f32),
    SetZWriteDisable(bool),
}

/// Decode `opcode` with its raw argument bytes.
pub fn decode(op: u16, args: &[u8]) -> AnmOp {
    try_decode(op, args).unwrap_or(AnmOp::Nop)
}

fn try_decode(op: u16, args: &[u8]) -> Option<AnmOp> {
    let r = Reader::new(args);
    let vec3 = || Some(Vec3::new(r.f32_at(0)?, r.f32_at(4)?, r.f32_at(8)?));

    Some(match op {
        opcode::NOP => AnmOp::Nop,
        opcode::EXIT => AnmOp::Exit,
        opcode::EXIT_HIDE => AnmOp::ExitHide,
        opcode::SET_SPRITE => AnmOp::SetSprite(r.i32_at(0)?),
        opcode::SET_RANDOM_SPRITE => AnmOp::SetRandomSprite {
            base: r.i32_at(0)?,
            span: r.i32_at(4)?,
        },
        opcode::SET_SCALE => AnmOp::SetScale(Vec2::new(r.f32_at(0)?, r.f32_at(4)?)),
        opcode::SET_ALPHA => AnmOp::SetAlpha(r.i32_at(0)?),
        opcode::SET_COLOR => AnmOp::SetColor(r.u32_at(0)?),
        opcode::JUMP => AnmOp::Jump {
            target: r.i32_at(0)?,
            time: r.i32_at(4)?,
        },
        opcode::FLIP_X => AnmOp::FlipX,
        opcode::FLIP_Y => AnmOp::FlipY,
        opcode::USE_POS_OFFSET => AnmOp::UsePosOffset(r.i32_at(0)? != 0),
        opcode::SET_ROTATION => AnmOp::SetRotation(vec3()?),
        opcode::SET_ANGLE_VEL => AnmOp::SetAngleVel(vec3()?),
        opcode::SCALE_TIME => AnmOp::ScaleTime {
            scale: Vec2::new(r.f32_at(0)?, r.f32_at(4)?),
            frames: r.i32_at(8)?,
        },
        opcode::SET_SCALE_SPEED => {
            AnmOp::SetScaleSpeed(Vec2::new(r.f32_at(0)?, r.f32_at(4)?))
        }
        opcode::FADE => AnmOp::Fade {
            alpha: r.u32_at(0)?,
            frames: r.i32_at(4)?,
        },
        opcode::BLEND_ADDITIVE => AnmOp::BlendAdditive,
        opcode::BLEND_DEFAULT => AnmOp::BlendDefault,
        opcode::SET_POSITION => AnmOp::SetPosition(vec3()?),
        opcode::POS_TIME_LINEAR
        | opcode::POS_TIME_DECEL
        | opcode::POS_TIME_DECEL_FAST
        | opcode::POS_TIME_ACCEL
        | opcode::POS_TIME_ACCEL_FAST => AnmOp::PosTime {
            target: vec3()?,
            frames: r.i32_at(12)?,
            ease: EaseMode::from_u8((op - opcode::POS_TIME_LINEAR) as u8),
        },
        opcode::STOP => AnmOp::Stop,
        opcode::STOP_HIDE => AnmOp::StopHide,
        opcode::INTERRUPT_LABEL => AnmOp::InterruptLabel(r.i32_at(0)?),
        opcode::SET_VISIBILITY => AnmOp::SetVisibility(r.i32_at(0)? != 0),
        opcode::ANCHOR_TOP_LEFT => AnmOp::AnchorTopLeft,
        opcode::SET_AUTO_ROTATE => AnmOp::SetAutoRotate(r.i32_at(0)? != 0),
        opcode::UV_SCROLL_X => AnmOp::UvScrollX(r.f32_at(0)?),
        opcode::UV_SCROLL_Y => AnmOp::UvScrollY(r.f32_at(0)?),
        opcode::SET_Z_WRITE_DISABLE => AnmOp::SetZWriteDisable(r.i32_at(0)? != 0),
        _ => AnmOp::Nop,
    })
}
