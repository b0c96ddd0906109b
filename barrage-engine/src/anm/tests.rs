//! Scenario tests for archive loading and the ANM script walker.

use barrage_common::formats::anm::SpriteRecord;
use barrage_common::testutil::{AnmAsm, Arg, args, build_anm_archive};
use glam::{Vec2, Vec3};

use crate::backend::{BlendMode, NullBackend};
use crate::game::GameRng;
use crate::vfs::MemoryVfs;

use super::opcode as op;
use super::{AnmSystem, AnmVm};

fn sprites(n: u32) -> Vec<SpriteRecord> {
    (0..n)
        .map(|i| SpriteRecord {
            id: i,
            offset: (i as f32 * 16.0, 0.0),
            size: (16.0, 16.0),
        })
        .collect()
}

/// System with one archive in slot 0 holding `scripts`, an empty 256x256
/// texture, and 8 sprites, registered at `sprite_index_offset`.
fn system_with(scripts: Vec<(u32, Vec<u8>)>, sprite_index_offset: i32) -> (AnmSystem, GameRng) {
    let mut backend = NullBackend::new();
    let mut vfs = MemoryVfs::new();
    vfs.insert(
        "a.anm",
        build_anm_archive(&sprites(8), &scripts, "@tex", 256, 256),
    );
    let mut system = AnmSystem::new(&mut backend, Default::default()).unwrap();
    system
        .load_archive(&mut backend, &mut vfs, 0, "a.anm", sprite_index_offset, true)
        .unwrap();
    (system, GameRng::seed(0))
}

fn fresh_vm(system: &AnmSystem, script_id: usize, rng: &mut GameRng) -> AnmVm {
    let mut vm = AnmVm::new();
    assert!(system.set_script(&mut vm, script_id, rng));
    vm
}

#[test]
fn test_archive_registers_sprites_at_offset() {
    let blob = build_anm_archive(
        &[
            SpriteRecord {
                id: 0,
                offset: (0.0, 0.0),
                size: (32.0, 32.0),
            },
            SpriteRecord {
                id: 1,
                offset: (0.0, 0.0),
                size: (64.0, 32.0),
            },
        ],
        &[],
        "@tex",
        256,
        256,
    );
    let mut backend = NullBackend::new();
    let mut vfs = MemoryVfs::new();
    vfs.insert("a.anm", blob);
    let mut system = AnmSystem::new(&mut backend, Default::default()).unwrap();
    system
        .load_archive(&mut backend, &mut vfs, 0, "a.anm", 100, true)
        .unwrap();

    let s0 = system.sprites.get(100).unwrap();
    assert_eq!(s0.start, Vec2::ZERO);
    assert!((s0.uv_start.x - 0.5 / 256.0).abs() < 1e-6);
    assert!((s0.uv_start.y - 0.5 / 256.0).abs() < 1e-6);
    let s1 = system.sprites.get(101).unwrap();
    assert_eq!(s1.width_px, 64.0);
    assert!(system.sprites.get(0).is_none());
}

#[test]
fn test_reloading_an_archive_reproduces_sprite_entries() {
    let blob = build_anm_archive(&sprites(4), &[], "@tex", 256, 256);
    let mut backend = NullBackend::new();
    let mut vfs = MemoryVfs::new();
    vfs.insert("a.anm", blob);
    let mut system = AnmSystem::new(&mut backend, Default::default()).unwrap();

    system
        .load_archive(&mut backend, &mut vfs, 0, "a.anm", 100, true)
        .unwrap();
    let first: Vec<_> = (100..104)
        .map(|i| *system.sprites.get(i).unwrap())
        .collect();

    system
        .load_archive(&mut backend, &mut vfs, 0, "a.anm", 100, true)
        .unwrap();
    for (i, before) in first.iter().enumerate() {
        let after = system.sprites.get(100 + i).unwrap();
        // Identical apart from the load-generation counter.
        assert_eq!(after.start, before.start);
        assert_eq!(after.end, before.end);
        assert_eq!(after.uv_start, before.uv_start);
        assert_eq!(after.uv_end, before.uv_end);
        assert_eq!(after.width_px, before.width_px);
        assert_eq!(after.texture_id, before.texture_id);
        assert_ne!(after.generation, before.generation);
    }
}

#[test]
fn test_release_frees_sprites_and_scripts() {
    let mut body = AnmAsm::new();
    body.instr(0, op::STOP, &[]);
    let (mut system, _) = system_with(vec![(0, body.finish())], 0);
    assert!(system.script(0).is_some());

    let mut backend = NullBackend::new();
    system.release_archive(&mut backend, 0);
    assert!(system.script(0).is_none());
    assert!(system.sprites.get(0).is_none());
    // Releasing again is a no-op.
    system.release_archive(&mut backend, 0);
}

#[test]
fn test_set_sprite_then_exit_detaches() {
    let mut body = AnmAsm::new();
    body.instr(0, op::SET_SPRITE, &args(&[Arg::I32(5)]));
    body.instr(10, op::EXIT, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    // Frame-zero instructions ran inside set_script.
    assert_eq!(vm.sprite_index, Some(5));
    assert!(vm.visible);
    assert!(vm.is_running());

    for _ in 0..9 {
        assert!(!system.run_vm(&mut vm, &mut rng, 1.0));
    }
    // Tick 10 reaches Exit.
    assert!(system.run_vm(&mut vm, &mut rng, 1.0));
    assert!(!vm.is_running());
    assert!(!vm.visible);
}

#[test]
fn test_fade_is_linear_in_the_alpha_byte() {
    let mut body = AnmAsm::new();
    body.instr(0, op::FADE, &args(&[Arg::U32(0), Arg::I32(10)]));
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    assert_eq!(vm.color.0, 0xFFFF_FFFF);
    for _ in 0..5 {
        system.run_vm(&mut vm, &mut rng, 1.0);
    }
    let alpha = vm.color.alpha() as i32;
    assert!((alpha - 128).abs() <= 1, "alpha at tick 5 was {alpha}");
    // RGB untouched.
    assert_eq!(vm.color.0 & 0x00FF_FFFF, 0x00FF_FFFF);

    for _ in 0..5 {
        system.run_vm(&mut vm, &mut rng, 1.0);
    }
    assert_eq!(vm.color.alpha(), 0);
    assert_eq!(vm.alpha_interp_end, 0);
}

#[test]
fn test_pos_time_decel_midpoint() {
    let mut body = AnmAsm::new();
    body.instr(
        0,
        op::POS_TIME_DECEL,
        &args(&[Arg::F32(100.0), Arg::F32(0.0), Arg::F32(0.0), Arg::I32(10)]),
    );
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    for _ in 0..5 {
        system.run_vm(&mut vm, &mut rng, 1.0);
    }
    // 1 - (1 - 0.5)^2 = 0.75
    assert!((vm.pos.x - 75.0).abs() < 1e-3, "pos.x was {}", vm.pos.x);

    for _ in 0..5 {
        system.run_vm(&mut vm, &mut rng, 1.0);
    }
    assert_eq!(vm.pos, Vec3::new(100.0, 0.0, 0.0));
    assert_eq!(vm.pos_interp_end, 0);
}

#[test]
fn test_scale_time_reaches_target_exactly() {
    let mut body = AnmAsm::new();
    body.instr(
        0,
        op::SCALE_TIME,
        &args(&[Arg::F32(3.0), Arg::F32(5.0), Arg::I32(8)]),
    );
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    for _ in 0..8 {
        system.run_vm(&mut vm, &mut rng, 1.0);
    }
    assert_eq!(vm.scale, Vec2::new(3.0, 5.0));
    assert_eq!(vm.scale_interp_end, 0);
    // Completed interpolation leaves no residual scale speed.
    let before = vm.scale;
    system.run_vm(&mut vm, &mut rng, 1.0);
    assert_eq!(vm.scale, before);
}

#[test]
fn test_uv_scroll_wraps_into_unit_range() {
    let mut body = AnmAsm::new();
    body.instr(0, op::UV_SCROLL_X, &args(&[Arg::F32(0.9)]));
    body.instr(1, op::UV_SCROLL_X, &args(&[Arg::F32(0.2)]));
    body.instr(2, op::UV_SCROLL_Y, &args(&[Arg::F32(-0.3)]));
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    assert!((vm.uv_scroll.x - 0.9).abs() < 1e-6);
    system.run_vm(&mut vm, &mut rng, 1.0);
    // 0.9 + 0.2 wraps to 0.1, not 1.1.
    assert!((vm.uv_scroll.x - 0.1).abs() < 1e-6);
    system.run_vm(&mut vm, &mut rng, 1.0);
    assert!((vm.uv_scroll.y - 0.7).abs() < 1e-6);
    assert!(vm.uv_scroll.x >= 0.0 && vm.uv_scroll.x < 1.0);
    assert!(vm.uv_scroll.y >= 0.0 && vm.uv_scroll.y < 1.0);
}

#[test]
fn test_jump_rewinds_time() {
    // Loop: [t0 SetAlpha(16)] [t1 Jump->start, time=0]
    let mut body = AnmAsm::new();
    body.instr(0, op::SET_ALPHA, &args(&[Arg::I32(16)]));
    body.instr(1, op::JUMP, &args(&[Arg::I32(0), Arg::I32(0)]));
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    // Several ticks in, the VM is still alive and looping.
    for _ in 0..10 {
        assert!(!system.run_vm(&mut vm, &mut rng, 1.0));
    }
    assert!(vm.time.as_frames() <= 1);
}

#[test]
fn test_stop_reexecutes_and_freezes_time() {
    let mut body = AnmAsm::new();
    body.instr(0, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    assert!(vm.stopped);
    let t = vm.time.as_frames();
    for _ in 0..5 {
        system.run_vm(&mut vm, &mut rng, 1.0);
    }
    assert_eq!(vm.time.as_frames(), t);
    assert!(vm.is_running());
}

#[test]
fn test_interrupt_jumps_to_matching_label() {
    // [t0 Stop] [label 3] [t0 SetAlpha(7)] [t0 Stop]
    let mut body = AnmAsm::new();
    body.instr(0, op::STOP, &[]);
    body.instr(0, op::INTERRUPT_LABEL, &args(&[Arg::I32(3)]));
    body.instr(0, op::SET_ALPHA, &args(&[Arg::I32(7)]));
    body.instr(0, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    assert!(vm.stopped);
    vm.pending_interrupt = 3;
    system.run_vm(&mut vm, &mut rng, 1.0);
    assert_eq!(vm.pending_interrupt, 0);
    assert_eq!(vm.color.alpha(), 7);
    assert!(vm.visible);
}

#[test]
fn test_interrupt_falls_back_to_minus_one_label() {
    // [t0 Stop] [label -1] [t0 SetAlpha(9)] [t0 Stop]
    let mut body = AnmAsm::new();
    body.instr(0, op::STOP, &[]);
    body.instr(0, op::INTERRUPT_LABEL, &args(&[Arg::I32(-1)]));
    body.instr(0, op::SET_ALPHA, &args(&[Arg::I32(9)]));
    body.instr(0, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    vm.pending_interrupt = 42;
    system.run_vm(&mut vm, &mut rng, 1.0);
    assert_eq!(vm.pending_interrupt, 0);
    assert_eq!(vm.color.alpha(), 9);
}

#[test]
fn test_interrupt_without_label_stops_vm() {
    let mut body = AnmAsm::new();
    body.instr(0, op::SET_ALPHA, &args(&[Arg::I32(7)]));
    body.instr(5, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    vm.pending_interrupt = 3;
    let t = vm.time.as_frames();
    system.run_vm(&mut vm, &mut rng, 1.0);
    assert_eq!(vm.pending_interrupt, 0);
    assert!(vm.is_running());
    assert_eq!(vm.time.as_frames(), t);
}

#[test]
fn test_flip_negates_scale_and_toggles_back() {
    let mut body = AnmAsm::new();
    body.instr(0, op::FLIP_X, &[]);
    body.instr(1, op::FLIP_X, &[]);
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    assert!(vm.flip_x);
    assert_eq!(vm.scale.x, -1.0);
    system.run_vm(&mut vm, &mut rng, 1.0);
    assert!(!vm.flip_x);
    assert_eq!(vm.scale.x, 1.0);
}

#[test]
fn test_blend_and_misc_flags() {
    let mut body = AnmAsm::new();
    body.instr(0, op::BLEND_ADDITIVE, &[]);
    body.instr(0, op::SET_Z_WRITE_DISABLE, &args(&[Arg::I32(1)]));
    body.instr(0, op::USE_POS_OFFSET, &args(&[Arg::I32(1)]));
    body.instr(
        0,
        op::SET_POSITION,
        &args(&[Arg::F32(3.0), Arg::F32(4.0), Arg::F32(0.0)]),
    );
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let vm = fresh_vm(&system, 0, &mut rng);
    assert_eq!(vm.blend, BlendMode::Additive);
    assert!(vm.z_write_disable);
    // SetPosition after UsePosOffset(1) lands in pos_offset.
    assert_eq!(vm.pos_offset, Vec3::new(3.0, 4.0, 0.0));
    assert_eq!(vm.pos, Vec3::ZERO);
}

#[test]
fn test_random_sprite_stays_in_span() {
    let mut body = AnmAsm::new();
    body.instr(0, op::SET_RANDOM_SPRITE, &args(&[Arg::I32(2), Arg::I32(3)]));
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    for _ in 0..20 {
        let vm = fresh_vm(&system, 0, &mut rng);
        let idx = vm.sprite_index.unwrap();
        assert!((2..5).contains(&idx), "sprite index {idx} out of span");
    }
}

#[test]
fn test_out_of_range_sprite_bind_keeps_vm_spriteless() {
    let mut body = AnmAsm::new();
    body.instr(0, op::SET_SPRITE, &args(&[Arg::I32(1999)]));
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let vm = fresh_vm(&system, 0, &mut rng);
    assert_eq!(vm.sprite_index, None);
}

#[test]
fn test_set_script_unknown_id_detaches() {
    let (system, mut rng) = system_with(vec![], 0);
    let mut vm = AnmVm::new();
    assert!(!system.set_script(&mut vm, 77, &mut rng));
    assert!(!vm.is_running());
}

#[test]
fn test_scale_speed_accumulates_with_framerate_mult() {
    let mut body = AnmAsm::new();
    body.instr(0, op::SET_SCALE_SPEED, &args(&[Arg::F32(0.5), Arg::F32(0.0)]));
    body.instr(60, op::STOP, &[]);
    let (system, mut rng) = system_with(vec![(0, body.finish())], 0);

    let mut vm = fresh_vm(&system, 0, &mut rng);
    let base = vm.scale.x;
    system.run_vm(&mut vm, &mut rng, 0.5);
    assert!((vm.scale.x - (base + 0.25)).abs() < 1e-6);
}
