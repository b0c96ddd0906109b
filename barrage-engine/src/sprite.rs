//! Sprite table: sprite id → texture sub-rectangle with precomputed UVs.
//!
//! Archives register sprites in bulk at load time; ids written in the
//! archive are shifted by the catalog's sprite-index offset to form the
//! global id space scripts use. Released entries are zeroed with
//! `texture_id = -1` so stale binds fail cleanly.

use glam::Vec2;
use tracing::warn;

/// Number of global sprite slots.
pub const SPRITE_SLOTS: usize = 2048;

/// One loaded sprite rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Source texture slot, or -1 when the entry is free.
    pub texture_id: i32,
    pub start: Vec2,
    pub end: Vec2,
    pub uv_start: Vec2,
    pub uv_end: Vec2,
    pub width_px: f32,
    pub height_px: f32,
    pub texture_width: f32,
    pub texture_height: f32,
    /// Monotonically increasing load counter; detects stale references.
    pub generation: u32,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            texture_id: -1,
            start: Vec2::ZERO,
            end: Vec2::ZERO,
            uv_start: Vec2::ZERO,
            uv_end: Vec2::ZERO,
            width_px: 0.0,
            height_px: 0.0,
            texture_width: 0.0,
            texture_height: 0.0,
            generation: 0,
        }
    }
}

#[derive(Debug)]
pub struct SpriteTable {
    sprites: Vec<Sprite>,
    loaded_count: u32,
}

impl Default for SpriteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteTable {
    pub fn new() -> Self {
        Self {
            sprites: vec![Sprite::default(); SPRITE_SLOTS],
            loaded_count: 0,
        }
    }

    /// Sprite at `index`, only if it is loaded.
    pub fn get(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index).filter(|s| s.texture_id >= 0)
    }

    /// Populate one slot from a raw archive record.
    ///
    /// Texel centers sit at half coordinates and archives use whole-number
    /// pixel rects; with linear filtering a whole-numbered UV pulls equally
    /// from the neighbouring texel, which shows as gaps on sprite edges.
    /// The half-texel inset keeps samples inside the rect.
    pub fn load(
        &mut self,
        index: usize,
        texture_id: i32,
        offset: Vec2,
        size: Vec2,
        texture_width: f32,
        texture_height: f32,
    ) {
        let Some(slot) = self.sprites.get_mut(index) else {
            warn!(index, "sprite id out of table range, dropped");
            return;
        };
        let start = offset;
        let end = offset + size;
        *slot = Sprite {
            texture_id,
            start,
            end,
            uv_start: Vec2::new(
                (start.x + 0.5) / texture_width,
                (start.y + 0.5) / texture_height,
            ),
            uv_end: Vec2::new(
                (end.x - 0.5) / texture_width,
                (end.y - 0.5) / texture_height,
            ),
            width_px: end.x - start.x,
            height_px: end.y - start.y,
            texture_width,
            texture_height,
            generation: self.loaded_count,
        };
        self.loaded_count += 1;
    }

    /// Free every sprite sourced from `texture_id`.
    pub fn release_texture(&mut self, texture_id: i32) {
        for sprite in &mut self.sprites {
            if sprite.texture_id == texture_id {
                *sprite = Sprite::default();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_computes_uv_inset_and_size() {
        let mut table = SpriteTable::new();
        table.load(100, 3, Vec2::new(0.0, 0.0), Vec2::new(64.0, 32.0), 256.0, 128.0);

        let s = table.get(100).unwrap();
        assert_eq!(s.texture_id, 3);
        assert_eq!(s.width_px, 64.0);
        assert_eq!(s.height_px, 32.0);
        assert!((s.uv_start.x - 0.5 / 256.0).abs() < 1e-6);
        assert!((s.uv_start.y - 0.5 / 128.0).abs() < 1e-6);
        assert!((s.uv_end.x - 63.5 / 256.0).abs() < 1e-6);
        assert!((s.uv_end.y - 31.5 / 128.0).abs() < 1e-6);
    }

    #[test]
    fn test_generation_increments_per_load() {
        let mut table = SpriteTable::new();
        table.load(0, 1, Vec2::ZERO, Vec2::ONE, 8.0, 8.0);
        table.load(1, 1, Vec2::ZERO, Vec2::ONE, 8.0, 8.0);
        assert_eq!(table.get(0).unwrap().generation, 0);
        assert_eq!(table.get(1).unwrap().generation, 1);
    }

    #[test]
    fn test_release_texture_frees_only_its_sprites() {
        let mut table = SpriteTable::new();
        table.load(0, 1, Vec2::ZERO, Vec2::ONE, 8.0, 8.0);
        table.load(1, 2, Vec2::ZERO, Vec2::ONE, 8.0, 8.0);
        table.release_texture(1);
        assert!(table.get(0).is_none());
        assert!(table.get(1).is_some());
    }

    #[test]
    fn test_out_of_range_ids() {
        let mut table = SpriteTable::new();
        table.load(SPRITE_SLOTS + 5, 1, Vec2::ZERO, Vec2::ONE, 8.0, 8.0);
        assert!(table.get(SPRITE_SLOTS + 5).is_none());
    }
}
