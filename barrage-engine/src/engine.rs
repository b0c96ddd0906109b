//! Engine façade: one owning struct instead of process-wide singletons.
//!
//! The shell owns an [`Engine`] plus its enemies and free VMs, and drives
//! the tick: each enemy's behavior script, then every VM, then the draw
//! pass, then a flush. References are threaded through the step functions;
//! nothing here is global.

use crate::anm::{AnmSystem, AnmVm};
use crate::backend::GraphicsBackend;
use crate::ecl::enemy::{Enemy, VM_SLOTS};
use crate::ecl::{EclRunner, EclWorld};
use crate::error::LoadError;
use crate::game::{Difficulty, GameState};
use crate::host::GameHost;
use crate::options::EngineOptions;
use crate::render::{DrawFrontend, RenderStateCache};
use crate::vfs::Vfs;

pub struct Engine {
    pub options: EngineOptions,
    pub anm: AnmSystem,
    pub ecl: EclRunner,
    pub game: GameState,
    pub render_cache: RenderStateCache,
    pub draw: DrawFrontend,
}

impl Engine {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        options: EngineOptions,
        difficulty: Difficulty,
        rng_seed: u64,
    ) -> Result<Self, LoadError> {
        let mut game = GameState::new(difficulty, rng_seed);
        if options.force_60fps {
            game.framerate_mult = 1.0;
        }
        Ok(Self {
            options,
            anm: AnmSystem::new(backend, options)?,
            ecl: EclRunner::new(),
            game,
            render_cache: RenderStateCache::new(),
            draw: DrawFrontend::new(&options),
        })
    }

    /// Run one tick of an enemy: its behavior script, then its VMs.
    ///
    /// Returns false once the enemy's script has halted.
    pub fn tick_enemy(&mut self, enemy: &mut Enemy, host: &mut dyn GameHost) -> bool {
        let mut world = EclWorld {
            anm: &self.anm,
            game: &mut self.game,
            host,
        };
        let alive = self.ecl.run(enemy, &mut world);

        let mult = self.game.framerate_mult;
        self.anm
            .run_vm(&mut enemy.primary_vm, &mut self.game.rng, mult);
        for slot in 0..VM_SLOTS {
            if enemy.vms[slot].is_running() {
                self.anm
                    .run_vm(&mut enemy.vms[slot], &mut self.game.rng, mult);
            }
        }
        alive
    }

    /// Advance a free-standing VM (HUD, effects, backgrounds).
    pub fn tick_vm(&mut self, vm: &mut AnmVm) -> bool {
        let mult = self.game.framerate_mult;
        self.anm.run_vm(vm, &mut self.game.rng, mult)
    }

    /// Draw one VM through the orthographic path.
    pub fn draw_vm(&mut self, vm: &AnmVm, backend: &mut dyn GraphicsBackend) -> bool {
        self.draw.draw(
            vm,
            &self.anm.sprites,
            &mut self.anm.textures,
            &mut self.render_cache,
            backend,
        )
    }

    /// Push any remaining render-state deltas to the backend.
    pub fn flush(&mut self, backend: &mut dyn GraphicsBackend) {
        self.render_cache.flush(backend);
    }

    /// Stage fog parameters; a no-op under the no-fog option.
    pub fn set_fog(&mut self, near: f32, far: f32, color: barrage_common::pixel::Color) {
        if self.options.no_fog {
            return;
        }
        self.render_cache.set_fog(near, far, color);
    }

    /// Chain initialization: load a stage's archive and behavior file
    /// together. Failures here are fatal to the stage, so errors carry the
    /// full context chain.
    pub fn load_stage(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        vfs: &mut dyn Vfs,
        archive_path: &str,
        behavior_path: &str,
    ) -> anyhow::Result<()> {
        use anyhow::Context;

        self.anm
            .load_archive(backend, vfs, 0, archive_path, 0, true)
            .with_context(|| format!("loading stage archive {archive_path}"))?;
        self.ecl
            .load(vfs, behavior_path)
            .with_context(|| format!("loading stage behavior {behavior_path}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;
    use crate::host::NullHost;
    use barrage_common::testutil::{Arg, EclAsm, args, build_ecl_file};

    #[test]
    fn test_engine_ticks_an_enemy_end_to_end() {
        let mut backend = NullBackend::new();
        let mut engine = Engine::new(
            &mut backend,
            EngineOptions::default(),
            Difficulty::Normal,
            7,
        )
        .unwrap();

        let mut asm = EclAsm::new();
        asm.any(
            0,
            crate::ecl::opcode::MOVE_AXIS_VELOCITY,
            &args(&[Arg::F32(3.0), Arg::F32(0.0), Arg::F32(0.0)]),
        );
        asm.any(30000, crate::ecl::opcode::NOP, &[]);
        engine.ecl.load_bytes(build_ecl_file(&[asm.finish()])).unwrap();

        let mut enemy = Enemy::new();
        engine.ecl.start_sub(&mut enemy, 0);
        let mut host = NullHost;
        assert!(engine.tick_enemy(&mut enemy, &mut host));
        assert!((enemy.position.x - 3.0).abs() < 1e-6);
    }
}
