//! ECL variable indirection.
//!
//! Instruction arguments are raw i32/f32 values; ids at or below
//! [`VAR_BASE`] are register references instead of immediates. Float args
//! encode register ids as whole float values (-10005.0 refers to float
//! scratch 0). The split:
//!
//! | id              | register                      |
//! |-----------------|-------------------------------|
//! | -10001..-10004  | context int scratch 0-3       |
//! | -10005..-10008  | context float scratch 0-3     |
//! | -10009          | rank (read-only)              |
//! | -10010          | difficulty (read-only)        |
//! | -10011..-10013  | enemy position x/y/z (read-only) |
//!
//! Writes to read-only or unknown registers are dropped with a debug log;
//! script bugs must not corrupt engine state.

use tracing::debug;

use crate::game::GameState;

use super::enemy::Enemy;

/// Ids at or below this value are register references.
pub const VAR_BASE: i32 = -10001;

/// Lowest register id in use.
pub const VAR_LAST: i32 = -10013;

fn slot(id: i32) -> i32 {
    VAR_BASE - id
}

/// True when an i32 argument denotes a register.
pub fn is_var(id: i32) -> bool {
    (VAR_LAST..=VAR_BASE).contains(&id)
}

/// True when an f32 argument denotes a register (whole-valued id in range).
pub fn is_var_f32(value: f32) -> bool {
    value.fract() == 0.0 && is_var(value as i32)
}

/// Resolve an i32 argument: register read or immediate.
pub fn read_int(enemy: &Enemy, game: &GameState, arg: i32) -> i32 {
    if !is_var(arg) {
        return arg;
    }
    match slot(arg) {
        0..=3 => enemy.ctx.int_vars[slot(arg) as usize],
        4..=7 => enemy.ctx.float_vars[(slot(arg) - 4) as usize] as i32,
        8 => game.rank,
        9 => game.difficulty as i32,
        10 => enemy.position.x as i32,
        11 => enemy.position.y as i32,
        12 => enemy.position.z as i32,
        _ => 0,
    }
}

/// Resolve an f32 argument: register read or immediate.
pub fn read_float(enemy: &Enemy, game: &GameState, arg: f32) -> f32 {
    if !is_var_f32(arg) {
        return arg;
    }
    match slot(arg as i32) {
        0..=3 => enemy.ctx.int_vars[slot(arg as i32) as usize] as f32,
        4..=7 => enemy.ctx.float_vars[(slot(arg as i32) - 4) as usize],
        8 => game.rank as f32,
        9 => game.difficulty as i32 as f32,
        10 => enemy.position.x,
        11 => enemy.position.y,
        12 => enemy.position.z,
        _ => 0.0,
    }
}

/// Write an integer into the register `id` names.
pub fn write_int(enemy: &mut Enemy, id: i32, value: i32) {
    if !is_var(id) {
        debug!(id, "integer write to non-register id dropped");
        return;
    }
    match slot(id) {
        0..=3 => enemy.ctx.int_vars[slot(id) as usize] = value,
        4..=7 => enemy.ctx.float_vars[(slot(id) - 4) as usize] = value as f32,
        _ => debug!(id, "write to read-only register dropped"),
    }
}

/// Write a float into the register `id` names.
pub fn write_float(enemy: &mut Enemy, id: i32, value: f32) {
    if !is_var(id) {
        debug!(id, "float write to non-register id dropped");
        return;
    }
    match slot(id) {
        0..=3 => enemy.ctx.int_vars[slot(id) as usize] = value as i32,
        4..=7 => enemy.ctx.float_vars[(slot(id) - 4) as usize] = value,
        _ => debug!(id, "write to read-only register dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Difficulty, GameState};

    fn fixtures() -> (Enemy, GameState) {
        (Enemy::new(), GameState::new(Difficulty::Hard, 0))
    }

    #[test]
    fn test_immediates_pass_through() {
        let (enemy, game) = fixtures();
        assert_eq!(read_int(&enemy, &game, 42), 42);
        assert_eq!(read_int(&enemy, &game, -3), -3);
        assert_eq!(read_float(&enemy, &game, 1.5), 1.5);
        // Below the register range is immediate again.
        assert_eq!(read_int(&enemy, &game, -20000), -20000);
    }

    #[test]
    fn test_scratch_registers_roundtrip() {
        let (mut enemy, game) = fixtures();
        write_int(&mut enemy, -10002, 77);
        assert_eq!(enemy.ctx.int_vars[1], 77);
        assert_eq!(read_int(&enemy, &game, -10002), 77);

        write_float(&mut enemy, -10007, 2.5);
        assert_eq!(enemy.ctx.float_vars[2], 2.5);
        assert_eq!(read_float(&enemy, &game, -10007.0), 2.5);
        // Cross-typed access converts.
        assert_eq!(read_int(&enemy, &game, -10007), 2);
    }

    #[test]
    fn test_game_registers_are_read_only() {
        let (mut enemy, game) = fixtures();
        assert_eq!(read_int(&enemy, &game, -10009), game.rank);
        assert_eq!(read_int(&enemy, &game, -10010), Difficulty::Hard as i32);

        enemy.position.x = 12.0;
        assert_eq!(read_float(&enemy, &game, -10011.0), 12.0);

        write_int(&mut enemy, -10009, 999);
        assert_eq!(read_int(&enemy, &game, -10009), game.rank);
    }

    #[test]
    fn test_float_register_detection() {
        assert!(is_var_f32(-10005.0));
        assert!(!is_var_f32(-10005.5));
        assert!(!is_var_f32(100.0));
    }
}
