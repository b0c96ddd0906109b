//! Shared game-wide state threaded through both interpreters.
//!
//! Rather than process-wide singletons, one [`GameState`] is owned by the
//! shell and passed by reference into the step functions. It carries the
//! difficulty/rank window, the deterministic RNG, and the spellcard
//! bookkeeping.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::ecl::spellcard::{SpellcardInfo, SpellcardLedger};

/// Difficulty level; bit position indexes the per-instruction gate mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Difficulty {
    Easy = 0,
    #[default]
    Normal = 1,
    Hard = 2,
    Lunatic = 3,
    Extra = 4,
}

impl Difficulty {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Difficulty::Easy,
            1 => Difficulty::Normal,
            2 => Difficulty::Hard,
            3 => Difficulty::Lunatic,
            4 => Difficulty::Extra,
            _ => Difficulty::Normal,
        }
    }

    /// Bit inside an instruction's difficulty gate mask.
    pub fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Deterministic game RNG.
///
/// Replays depend on the bullet/enemy RNG sequence, so this wraps a seeded
/// PCG instead of thread-local entropy.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: Pcg32,
}

impl GameRng {
    pub fn seed(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[0, range)`. Non-positive ranges yield 0.
    pub fn int_in(&mut self, range: i32) -> i32 {
        if range <= 0 {
            return 0;
        }
        self.inner.random_range(0..range)
    }

    /// Uniform float in `[0, range)`. Non-positive ranges yield 0.
    pub fn f32_in(&mut self, range: f32) -> f32 {
        if range <= 0.0 {
            return 0.0;
        }
        self.inner.random::<f32>() * range
    }

    /// Uniform float in `[lo, hi)`.
    pub fn f32_between(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.f32_in(hi - lo)
    }
}

/// Game-wide registers the interpreters read and write.
#[derive(Debug, Clone)]
pub struct GameState {
    pub difficulty: Difficulty,

    /// Dynamic difficulty scalar and its window.
    pub rank: i32,
    pub min_rank: i32,
    pub max_rank: i32,
    sub_rank: i32,

    /// Player power level; gates big/small power item drops.
    pub power: i32,
    pub score: i64,
    pub spellcards_captured: u32,
    /// Replays must not mutate the capture ledger.
    pub in_replay: bool,
    /// Logic frames advanced per rendered frame.
    pub framerate_mult: f32,

    pub rng: GameRng,
    pub spellcard: SpellcardInfo,
    pub ledger: SpellcardLedger,
}

impl GameState {
    pub fn new(difficulty: Difficulty, rng_seed: u64) -> Self {
        Self {
            difficulty,
            rank: 16,
            min_rank: 10,
            max_rank: 32,
            sub_rank: 0,
            power: 0,
            score: 0,
            spellcards_captured: 0,
            in_replay: false,
            framerate_mult: 1.0,
            rng: GameRng::seed(rng_seed),
            spellcard: SpellcardInfo::default(),
            ledger: SpellcardLedger::default(),
        }
    }

    /// Where `rank` sits inside its window, as [0, 1].
    pub fn rank_factor(&self) -> f32 {
        let span = self.max_rank - self.min_rank;
        if span <= 0 {
            return 0.0;
        }
        ((self.rank - self.min_rank) as f32 / span as f32).clamp(0.0, 1.0)
    }

    /// Accumulate sub-rank; every 100 points moves rank one step.
    pub fn increase_subrank(&mut self, amount: i32) {
        self.sub_rank += amount;
        while self.sub_rank >= 100 {
            self.sub_rank -= 100;
            self.rank += 1;
        }
        self.rank = self.rank.min(self.max_rank);
    }

    pub fn decrease_subrank(&mut self, amount: i32) {
        self.sub_rank -= amount;
        while self.sub_rank < 0 {
            self.sub_rank += 100;
            self.rank -= 1;
        }
        self.rank = self.rank.max(self.min_rank);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = GameRng::seed(7);
        let mut b = GameRng::seed(7);
        for _ in 0..16 {
            assert_eq!(a.int_in(1000), b.int_in(1000));
        }
    }

    #[test]
    fn test_rng_ranges() {
        let mut rng = GameRng::seed(1);
        for _ in 0..100 {
            let v = rng.int_in(8);
            assert!((0..8).contains(&v));
            let f = rng.f32_in(2.5);
            assert!((0.0..2.5).contains(&f));
        }
        assert_eq!(rng.int_in(0), 0);
        assert_eq!(rng.int_in(-3), 0);
        assert_eq!(rng.f32_in(-1.0), 0.0);
    }

    #[test]
    fn test_difficulty_bits() {
        assert_eq!(Difficulty::Easy.bit(), 0b00001);
        assert_eq!(Difficulty::Lunatic.bit(), 0b01000);
        assert_eq!(Difficulty::Extra.bit(), 0b10000);
    }

    #[test]
    fn test_rank_window() {
        let mut game = GameState::new(Difficulty::Normal, 0);
        game.rank = game.max_rank;
        game.increase_subrank(500);
        assert_eq!(game.rank, game.max_rank);
        game.decrease_subrank(100 * 64);
        assert_eq!(game.rank, game.min_rank);
        assert_eq!(game.rank_factor(), 0.0);
    }
}
