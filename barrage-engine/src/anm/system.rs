//! Archive loading and the ANM script walker.
//!
//! [`AnmSystem`] owns the archive catalog, texture store, and sprite table,
//! and advances individual [`AnmVm`]s: instructions whose time has come run
//! in file order, then the per-tick continuous effects (angular velocity and
//! the three interpolators) apply, then script time advances.

use barrage_common::formats::anm::{self, AnmArchive};
use barrage_common::math::add_normalize_angle;
use barrage_common::pixel::PixelFormat;
use glam::Vec2;
use tracing::{debug, warn};

use crate::archive::{ArchiveCatalog, LoadedArchive, SCRIPT_SLOTS, ScriptRef};
use crate::backend::{BlendMode, GraphicsBackend};
use crate::error::LoadError;
use crate::game::GameRng;
use crate::options::EngineOptions;
use crate::sprite::SpriteTable;
use crate::texture::{TextureLoadParams, TextureStore};
use crate::vfs::Vfs;

use super::ops::{AnmOp, decode};
use super::vm::{ANCHOR_LEFT, ANCHOR_TOP, AnmVm, ScriptCursor};

/// Owns visual assets and executes ANM scripts against VMs.
pub struct AnmSystem {
    pub catalog: ArchiveCatalog,
    pub textures: TextureStore,
    pub sprites: SpriteTable,
    options: EngineOptions,
}

impl AnmSystem {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        options: EngineOptions,
    ) -> Result<Self, LoadError> {
        Ok(Self {
            catalog: ArchiveCatalog::new(),
            textures: TextureStore::new(backend)?,
            sprites: SpriteTable::new(),
            options,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Load an archive into `slot`, registering its texture, sprites, and
    /// scripts. Sprite and script ids in the file are shifted by
    /// `sprite_index_offset` into the global id space.
    pub fn load_archive(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        vfs: &mut dyn Vfs,
        slot: usize,
        path: &str,
        sprite_index_offset: i32,
        rescale_to_declared: bool,
    ) -> Result<(), LoadError> {
        self.release_archive(backend, slot);

        let bytes = vfs.read(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        let archive = AnmArchive::parse(bytes)?;
        let header = archive.header();
        let texture_id = slot;

        let name_bytes =
            archive
                .name_at(header.name_offset)
                .ok_or(barrage_common::FormatError::BadOffset {
                    what: "texture name",
                    offset: header.name_offset as usize,
                })?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        let format = PixelFormat::from_u32(header.format);
        if name.starts_with('@') {
            self.textures
                .create_empty(backend, texture_id, header.width, header.height, format)?;
        } else {
            self.textures.load(
                backend,
                vfs,
                &self.options,
                texture_id,
                &TextureLoadParams {
                    name: &name,
                    format,
                    color_key: header.color_key,
                    declared_width: header.width,
                    declared_height: header.height,
                    rescale_to_declared,
                    keep_cpu_pixels: false,
                },
            )?;
        }
        if header.alpha_name_offset != 0 {
            debug!(path, "archive carries an alpha image; merge not supported");
        }

        for offset in archive.sprite_offsets() {
            let Some(record) = archive.sprite_record(offset) else {
                warn!(path, offset, "sprite record out of range, skipped");
                continue;
            };
            let global = record.id as i64 + sprite_index_offset as i64;
            if global < 0 {
                continue;
            }
            self.sprites.load(
                global as usize,
                texture_id as i32,
                Vec2::new(record.offset.0, record.offset.1),
                Vec2::new(record.size.0, record.size.1),
                header.width as f32,
                header.height as f32,
            );
        }

        for (id, offset) in archive.script_entries() {
            let global = id as i64 + sprite_index_offset as i64;
            if !(0..SCRIPT_SLOTS as i64).contains(&global) {
                warn!(path, id, "script id out of table range, skipped");
                continue;
            }
            self.catalog.set_script(
                global as usize,
                ScriptRef {
                    archive_slot: slot,
                    offset,
                    sprite_index_offset,
                },
            );
        }

        debug!(
            slot,
            path,
            sprites = header.sprite_count,
            scripts = header.script_count,
            "loaded archive"
        );
        self.catalog.insert(
            slot,
            LoadedArchive {
                archive,
                texture_id,
                sprite_index_offset,
            },
        );
        Ok(())
    }

    /// Release the archive in `slot`: frees the blob, marks its sprites free,
    /// clears its script entries, and deletes its texture.
    pub fn release_archive(&mut self, backend: &mut dyn GraphicsBackend, slot: usize) {
        let Some(loaded) = self.catalog.take(slot) else {
            return;
        };
        self.sprites.release_texture(loaded.texture_id as i32);
        self.catalog.clear_scripts_of(slot);
        self.textures.release(backend, loaded.texture_id);
        debug!(slot, "released archive");
    }

    pub fn script(&self, id: usize) -> Option<ScriptRef> {
        self.catalog.script(id)
    }

    /// Point `vm` at script `id` and execute its frame-zero instructions.
    ///
    /// Returns false (and detaches the VM) when the id is unassigned.
    pub fn set_script(&self, vm: &mut AnmVm, id: usize, rng: &mut GameRng) -> bool {
        let Some(script) = self.catalog.script(id) else {
            vm.detach();
            return false;
        };
        vm.reset_for_script();
        vm.script = Some(ScriptCursor {
            archive_slot: script.archive_slot,
            begin: script.offset,
            sprite_index_offset: script.sprite_index_offset,
        });
        vm.cursor = Some(script.offset);
        vm.visible = false;
        self.run_vm(vm, rng, 1.0);
        true
    }

    /// Bind sprite `index` to the VM. Fails (leaving the VM's sprite as-is)
    /// when the slot is free or out of range.
    pub fn set_active_sprite(&self, vm: &mut AnmVm, index: usize) -> bool {
        let Some(sprite) = self.sprites.get(index) else {
            return false;
        };
        vm.sprite_index = Some(index);
        vm.sprite_generation = sprite.generation;
        vm.base_scale = Vec2::new(
            sprite.width_px / sprite.texture_width,
            sprite.height_px / sprite.texture_height,
        );
        true
    }

    /// Advance `vm` by one tick. Returns true when the VM is (or became)
    /// detached.
    pub fn run_vm(&self, vm: &mut AnmVm, rng: &mut GameRng, framerate_mult: f32) -> bool {
        let Some(script) = vm.script else {
            return true;
        };
        if vm.cursor.is_none() {
            return true;
        }
        let Some(loaded) = self.catalog.slot(script.archive_slot) else {
            // Archive was released under the VM.
            vm.detach();
            return true;
        };
        let blob = loaded.archive.bytes();

        if vm.pending_interrupt != 0 {
            if !self.dispatch_interrupt(vm, blob, script) {
                // No label to deliver to: hold position this frame.
                self.tick_continuous(vm, framerate_mult);
                vm.time.tick(framerate_mult);
                return false;
            }
            if vm.cursor.is_none() {
                return true;
            }
        }

        'exec: while let Some(cursor) = vm.cursor {
            let Some(instr) = anm::instr_at(blob, cursor as usize) else {
                // Walked past the end of the script.
                vm.detach();
                return true;
            };
            if instr.time as i32 > vm.time.as_frames() {
                break 'exec;
            }

            let op = decode(instr.opcode, instr.args);
            match op {
                AnmOp::Exit => {
                    vm.visible = false;
                    vm.detach();
                    return true;
                }
                AnmOp::ExitHide => {
                    vm.detach();
                    return true;
                }
                AnmOp::SetSprite(id) => {
                    vm.visible = true;
                    let global = id as i64 + script.sprite_index_offset as i64;
                    if global >= 0 {
                        self.set_active_sprite(vm, global as usize);
                    }
                }
                AnmOp::SetRandomSprite { base, span } => {
                    vm.visible = true;
                    let global = (base + rng.int_in(span)) as i64
                        + script.sprite_index_offset as i64;
                    if global >= 0 {
                        self.set_active_sprite(vm, global as usize);
                    }
                }
                AnmOp::SetScale(scale) => vm.scale = scale,
                AnmOp::SetAlpha(alpha) => {
                    vm.color = vm.color.with_alpha((alpha & 0xFF) as u8);
                }
                AnmOp::SetColor(rgb) => vm.color = vm.color.with_rgb(rgb),
                AnmOp::Jump { target, time } => {
                    let dest = script.begin as i64 + target as i64;
                    if dest >= 0 && (dest as usize) < blob.len() {
                        vm.cursor = Some(dest as u32);
                        vm.time.set(time);
                        continue 'exec;
                    }
                }
                AnmOp::FlipX => {
                    vm.flip_x = !vm.flip_x;
                    vm.scale.x = -vm.scale.x;
                }
                AnmOp::FlipY => {
                    vm.flip_y = !vm.flip_y;
                    vm.scale.y = -vm.scale.y;
                }
                AnmOp::UsePosOffset(on) => vm.use_pos_offset = on,
                AnmOp::SetRotation(rot) => vm.rotation = rot,
                AnmOp::SetAngleVel(vel) => vm.angular_velocity = vel,
                AnmOp::ScaleTime { scale, frames } => {
                    vm.scale_interp_initial = vm.scale;
                    vm.scale_interp_final = scale;
                    vm.scale_interp_end = frames;
                    vm.scale_interp_time.reset();
                }
                AnmOp::SetScaleSpeed(delta) => {
                    vm.scale_interp_final = delta;
                    vm.scale_interp_end = 0;
                }
                AnmOp::Fade { alpha, frames } => {
                    vm.alpha_interp_initial = vm.color;
                    vm.alpha_interp_final = vm.color.with_alpha((alpha & 0xFF) as u8);
                    vm.alpha_interp_end = frames;
                    vm.alpha_interp_time.reset();
                }
                AnmOp::BlendAdditive => vm.blend = BlendMode::Additive,
                AnmOp::BlendDefault => vm.blend = BlendMode::Normal,
                AnmOp::SetPosition(pos) => *vm.interp_target() = pos,
                AnmOp::PosTime {
                    target,
                    frames,
                    ease,
                } => {
                    vm.pos_interp_initial = *vm.interp_target();
                    vm.pos_interp_final = target;
                    vm.pos_interp_end = frames;
                    vm.pos_interp_time.reset();
                    vm.pos_ease = ease;
                }
                AnmOp::Stop | AnmOp::StopHide => {
                    if op == AnmOp::StopHide {
                        vm.visible = false;
                    }
                    if vm.pending_interrupt == 0 {
                        // Halt here; the rewind makes this instruction run
                        // again next frame.
                        vm.stopped = true;
                        vm.time.rewind(1);
                        break 'exec;
                    }
                    if self.dispatch_interrupt(vm, blob, script) {
                        continue 'exec;
                    }
                    break 'exec;
                }
                AnmOp::SetVisibility(on) => vm.visible = on,
                AnmOp::AnchorTopLeft => vm.anchor = ANCHOR_LEFT | ANCHOR_TOP,
                AnmOp::SetAutoRotate(on) => vm.auto_rotate = on,
                AnmOp::UvScrollX(delta) => {
                    vm.uv_scroll.x = (vm.uv_scroll.x + delta).rem_euclid(1.0);
                }
                AnmOp::UvScrollY(delta) => {
                    vm.uv_scroll.y = (vm.uv_scroll.y + delta).rem_euclid(1.0);
                }
                AnmOp::SetZWriteDisable(on) => vm.z_write_disable = on,
                AnmOp::Nop | AnmOp::InterruptLabel(_) => {}
            }
            vm.cursor = Some(instr.next_offset as u32);
        }

        self.tick_continuous(vm, framerate_mult);
        vm.time.tick(framerate_mult);
        false
    }

    /// Interrupt delivery: scan from the top of the script for a matching
    /// label, falling back to a label with argument -1. Returns false when
    /// no label exists, leaving the VM stopped in place.
    fn dispatch_interrupt(&self, vm: &mut AnmVm, blob: &[u8], script: ScriptCursor) -> bool {
        let mut fallback = None;
        let mut cursor = script.begin as usize;
        let found = loop {
            let Some(instr) = anm::instr_at(blob, cursor) else {
                break None;
            };
            match decode(instr.opcode, instr.args) {
                AnmOp::InterruptLabel(arg) => {
                    if arg == vm.pending_interrupt {
                        break Some(instr.next_offset);
                    }
                    if arg == -1 && fallback.is_none() {
                        fallback = Some(instr.next_offset);
                    }
                }
                AnmOp::Exit | AnmOp::ExitHide => break None,
                _ => {}
            }
            cursor = instr.next_offset;
        };

        vm.pending_interrupt = 0;
        vm.stopped = false;
        match found.or(fallback) {
            Some(next) => {
                if let Some(instr) = anm::instr_at(blob, next) {
                    vm.cursor = Some(next as u32);
                    vm.time.set(instr.time as i32);
                    vm.visible = true;
                } else {
                    vm.detach();
                }
                true
            }
            None => {
                vm.time.rewind(1);
                false
            }
        }
    }

    /// Continuous per-tick effects, applied after the frame's instructions.
    fn tick_continuous(&self, vm: &mut AnmVm, mult: f32) {
        if vm.angular_velocity.x != 0.0 {
            vm.rotation.x = add_normalize_angle(vm.rotation.x, mult * vm.angular_velocity.x);
        }
        if vm.angular_velocity.y != 0.0 {
            vm.rotation.y = add_normalize_angle(vm.rotation.y, mult * vm.angular_velocity.y);
        }
        if vm.angular_velocity.z != 0.0 {
            vm.rotation.z = add_normalize_angle(vm.rotation.z, mult * vm.angular_velocity.z);
        }

        if vm.scale_interp_end > 0 {
            let t = (vm.scale_interp_time.as_frames_f32() / vm.scale_interp_end as f32).min(1.0);
            vm.scale = vm.scale_interp_initial.lerp(vm.scale_interp_final, t);
            if vm.scale_interp_time.as_frames() >= vm.scale_interp_end {
                vm.scale = vm.scale_interp_final;
                vm.scale_interp_end = 0;
                vm.scale_interp_final = Vec2::ZERO;
            }
            vm.scale_interp_time.tick(mult);
            if vm.flip_x {
                vm.scale.x = -vm.scale.x;
            }
            if vm.flip_y {
                vm.scale.y = -vm.scale.y;
            }
        } else {
            // Scale-speed mode: `final` holds a per-frame additive delta.
            vm.scale += vm.scale_interp_final * mult;
        }

        if vm.alpha_interp_end > 0 {
            let t = (vm.alpha_interp_time.as_frames_f32() / vm.alpha_interp_end as f32).min(1.0);
            vm.color = vm.alpha_interp_initial.lerp(vm.alpha_interp_final, t);
            if vm.alpha_interp_time.as_frames() >= vm.alpha_interp_end {
                vm.color = vm.alpha_interp_final;
                vm.alpha_interp_end = 0;
            }
            vm.alpha_interp_time.tick(mult);
        }

        if vm.pos_interp_end > 0 {
            let t = (vm.pos_interp_time.as_frames_f32() / vm.pos_interp_end as f32).min(1.0);
            let f = vm.pos_ease.apply(t);
            let value = vm.pos_interp_initial
                + (vm.pos_interp_final - vm.pos_interp_initial) * f;
            let done = vm.pos_interp_time.as_frames() >= vm.pos_interp_end;
            let final_value = vm.pos_interp_final;
            let target = vm.interp_target();
            *target = if done { final_value } else { value };
            if done {
                vm.pos_interp_end = 0;
            }
            vm.pos_interp_time.tick(mult);
        }
    }
}
