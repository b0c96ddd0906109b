//! Host collaborator interface.
//!
//! Bullet/laser fields, items, particles, sound, and the HUD live outside
//! the core; enemy scripts reach them through [`GameHost`]. Handles returned
//! for lasers are opaque to the engine and stored in the enemy's slot array
//! for later rotate/offset/cancel ops.

use glam::{Vec2, Vec3};

use crate::ecl::enemy::{BulletShooter, LaserShooter};

/// Opaque handle to a host-owned laser.
pub type LaserHandle = u32;

/// Item categories the engine can drop directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    PowerBig,
    PowerSmall,
    Point,
}

pub trait GameHost {
    fn player_position(&self) -> Vec2;

    /// Angle from `from` to the player, in radians.
    fn player_angle(&self, from: Vec3) -> f32 {
        let p = self.player_position();
        (p.y - from.y).atan2(p.x - from.x)
    }

    fn spawn_bullets(&mut self, shooter: &BulletShooter);
    fn cancel_bullets_into_points(&mut self);
    /// Despawn bullets, optionally converting to point items; returns the
    /// score gained.
    fn despawn_bullets(&mut self, limit: i32, spawn_items: bool) -> i32;

    fn spawn_laser(&mut self, shooter: &LaserShooter) -> Option<LaserHandle>;
    fn laser_alive(&self, handle: LaserHandle) -> bool;
    fn laser_rotate(&mut self, handle: LaserHandle, delta: f32);
    /// Point the laser at the player plus `offset` radians.
    fn laser_aim_at_player(&mut self, handle: LaserHandle, offset: f32);
    fn laser_set_position(&mut self, handle: LaserHandle, pos: Vec3);
    fn laser_cancel(&mut self, handle: LaserHandle);

    fn spawn_particles(&mut self, effect: i32, pos: Vec3, count: i32, color: u32);
    fn drop_item(&mut self, pos: Vec3, kind: ItemKind);
    fn drop_item_by_id(&mut self, pos: Vec3, id: i32);
    fn play_sound(&mut self, idx: i32);

    fn spawn_enemy(&mut self, sub: i32, pos: Vec3, life: i32, item: i32, score: i32);
    fn kill_all_enemies(&mut self);

    fn set_boss(&mut self, slot: i32, present: bool);
    fn set_boss_health(&mut self, ratio: f32);
    fn set_boss_life_count(&mut self, count: i32);

    fn show_spellcard(&mut self, sprite: i32, name: &str);
    fn end_spellcard(&mut self);
    fn spellcard_seconds_remaining(&self) -> i32;
    fn show_spellcard_bonus(&mut self, score: i32);
    /// Player character/shot-type identifier recorded in capture records.
    fn shot_type(&self) -> u8;

    fn stage_unpause(&mut self);
}

/// Host that ignores everything; the player sits at the origin.
#[derive(Debug, Default)]
pub struct NullHost;

impl GameHost for NullHost {
    fn player_position(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn spawn_bullets(&mut self, _shooter: &BulletShooter) {}
    fn cancel_bullets_into_points(&mut self) {}
    fn despawn_bullets(&mut self, _limit: i32, _spawn_items: bool) -> i32 {
        0
    }

    fn spawn_laser(&mut self, _shooter: &LaserShooter) -> Option<LaserHandle> {
        None
    }
    fn laser_alive(&self, _handle: LaserHandle) -> bool {
        false
    }
    fn laser_rotate(&mut self, _handle: LaserHandle, _delta: f32) {}
    fn laser_aim_at_player(&mut self, _handle: LaserHandle, _offset: f32) {}
    fn laser_set_position(&mut self, _handle: LaserHandle, _pos: Vec3) {}
    fn laser_cancel(&mut self, _handle: LaserHandle) {}

    fn spawn_particles(&mut self, _effect: i32, _pos: Vec3, _count: i32, _color: u32) {}
    fn drop_item(&mut self, _pos: Vec3, _kind: ItemKind) {}
    fn drop_item_by_id(&mut self, _pos: Vec3, _id: i32) {}
    fn play_sound(&mut self, _idx: i32) {}

    fn spawn_enemy(&mut self, _sub: i32, _pos: Vec3, _life: i32, _item: i32, _score: i32) {}
    fn kill_all_enemies(&mut self) {}

    fn set_boss(&mut self, _slot: i32, _present: bool) {}
    fn set_boss_health(&mut self, _ratio: f32) {}
    fn set_boss_life_count(&mut self, _count: i32) {}

    fn show_spellcard(&mut self, _sprite: i32, _name: &str) {}
    fn end_spellcard(&mut self) {}
    fn spellcard_seconds_remaining(&self) -> i32 {
        0
    }
    fn show_spellcard_bonus(&mut self, _score: i32) {}
    fn shot_type(&self) -> u8 {
        0
    }

    fn stage_unpause(&mut self) {}
}
