//! Render-state cache: coalesces state writes into per-flush deltas.
//!
//! Mutators write a shadow copy and set a dirty bit; [`RenderStateCache::flush`]
//! walks the set bits and calls the backend only where the shadow value
//! actually differs from the committed one. The backend therefore observes
//! at most one call per slot per flush and none when nothing changed.
//!
//! Blend mode is deliberately not cached here: every draw path reads it
//! directly before issuing its draw call.

use barrage_common::pixel::Color;
use glam::Mat4;

use crate::backend::{
    AttrArray, AttrPointer, ColorOp, ColorOpComponent, DepthFunc, GraphicsBackend, MatrixSlot,
};

/// Dirty-slot bit indices.
mod dirty {
    pub const FOG: u32 = 0;
    pub const DEPTH_CONFIG: u32 = 1;
    pub const VERTEX_ATTR_ENABLE: u32 = 2;
    pub const VERTEX_ATTR_ARRAY: u32 = 3;
    pub const COLOR_OP: u32 = 4;
    pub const TEXTURE_FACTOR: u32 = 5;
    /// Matrix slots occupy MATRIX_BASE .. MATRIX_BASE + 4.
    pub const MATRIX_BASE: u32 = 6;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Shadowed {
    fog_near: f32,
    fog_far: f32,
    fog_color: Color,
    depth_mask: bool,
    depth_func: DepthFunc,
    vertex_attrs: u8,
    attr_arrays: [AttrPointer; AttrArray::COUNT],
    color_ops: [ColorOp; 2],
    texture_factor: Color,
    matrices: [Mat4; MatrixSlot::COUNT],
}

impl Default for Shadowed {
    fn default() -> Self {
        Self {
            fog_near: 0.0,
            fog_far: 1.0,
            fog_color: Color::TRANSPARENT,
            depth_mask: true,
            depth_func: DepthFunc::LessEqual,
            vertex_attrs: 0,
            attr_arrays: [AttrPointer::default(); AttrArray::COUNT],
            color_ops: [ColorOp::Modulate; 2],
            texture_factor: Color::WHITE,
            matrices: [Mat4::IDENTITY; MatrixSlot::COUNT],
        }
    }
}

/// Shadow/committed state pair plus the dirty mask.
#[derive(Debug, Default)]
pub struct RenderStateCache {
    dirty: u32,
    shadow: Shadowed,
    committed: Shadowed,
}

impl RenderStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&mut self, bit: u32) {
        self.dirty |= 1 << bit;
    }

    pub fn set_fog(&mut self, near: f32, far: f32, color: Color) {
        self.shadow.fog_near = near;
        self.shadow.fog_far = far;
        self.shadow.fog_color = color;
        self.mark(dirty::FOG);
    }

    pub fn set_depth_mask(&mut self, write: bool) {
        self.shadow.depth_mask = write;
        self.mark(dirty::DEPTH_CONFIG);
    }

    pub fn set_depth_func(&mut self, func: DepthFunc) {
        self.shadow.depth_func = func;
        self.mark(dirty::DEPTH_CONFIG);
    }

    /// Replace the enabled-attribute bit set.
    pub fn set_vertex_attrs(&mut self, attrs: u8) {
        self.shadow.vertex_attrs = attrs;
        self.mark(dirty::VERTEX_ATTR_ENABLE);
    }

    pub fn set_attr_pointer(&mut self, array: AttrArray, pointer: AttrPointer) {
        self.shadow.attr_arrays[array as usize] = pointer;
        self.mark(dirty::VERTEX_ATTR_ARRAY);
    }

    pub fn set_color_op(&mut self, component: ColorOpComponent, op: ColorOp) {
        self.shadow.color_ops[component as usize] = op;
        self.mark(dirty::COLOR_OP);
    }

    pub fn set_texture_factor(&mut self, color: Color) {
        self.shadow.texture_factor = color;
        self.mark(dirty::TEXTURE_FACTOR);
    }

    pub fn set_matrix(&mut self, slot: MatrixSlot, matrix: Mat4) {
        self.shadow.matrices[slot as usize] = matrix;
        self.mark(dirty::MATRIX_BASE + slot as u32);
    }

    /// Current (shadow) value of a matrix slot; draw paths compose on it.
    pub fn matrix(&self, slot: MatrixSlot) -> Mat4 {
        self.shadow.matrices[slot as usize]
    }

    /// Push pending deltas to the backend, lowest dirty bit first.
    pub fn flush(&mut self, backend: &mut dyn GraphicsBackend) {
        while self.dirty != 0 {
            let bit = self.dirty.trailing_zeros();
            self.dirty &= !(1 << bit);

            match bit {
                dirty::FOG => {
                    if self.shadow.fog_near != self.committed.fog_near
                        || self.shadow.fog_far != self.committed.fog_far
                    {
                        self.committed.fog_near = self.shadow.fog_near;
                        self.committed.fog_far = self.shadow.fog_far;
                        backend.set_fog_range(self.committed.fog_near, self.committed.fog_far);
                    }
                    if self.shadow.fog_color != self.committed.fog_color {
                        self.committed.fog_color = self.shadow.fog_color;
                        backend.set_fog_color(self.committed.fog_color);
                    }
                }
                dirty::DEPTH_CONFIG => {
                    if self.shadow.depth_mask != self.committed.depth_mask {
                        self.committed.depth_mask = self.shadow.depth_mask;
                        backend.set_depth_mask(self.committed.depth_mask);
                    }
                    if self.shadow.depth_func != self.committed.depth_func {
                        self.committed.depth_func = self.shadow.depth_func;
                        backend.set_depth_func(self.committed.depth_func);
                    }
                }
                dirty::VERTEX_ATTR_ENABLE => {
                    let mut changed = self.shadow.vertex_attrs ^ self.committed.vertex_attrs;
                    self.committed.vertex_attrs = self.shadow.vertex_attrs;
                    while changed != 0 {
                        let isolated = changed & changed.wrapping_neg();
                        backend.toggle_vertex_attr(
                            isolated,
                            self.committed.vertex_attrs & isolated != 0,
                        );
                        changed &= changed - 1;
                    }
                }
                dirty::VERTEX_ATTR_ARRAY => {
                    for (i, array) in
                        [AttrArray::Position, AttrArray::TexCoord, AttrArray::Diffuse]
                            .into_iter()
                            .enumerate()
                    {
                        if self.shadow.attr_arrays[i] == self.committed.attr_arrays[i] {
                            continue;
                        }
                        self.committed.attr_arrays[i] = self.shadow.attr_arrays[i];
                        backend.set_attr_pointer(array, self.committed.attr_arrays[i]);
                    }
                }
                dirty::COLOR_OP => {
                    for (i, component) in [ColorOpComponent::Rgb, ColorOpComponent::Alpha]
                        .into_iter()
                        .enumerate()
                    {
                        if self.shadow.color_ops[i] == self.committed.color_ops[i] {
                            continue;
                        }
                        self.committed.color_ops[i] = self.shadow.color_ops[i];
                        backend.set_color_op(component, self.committed.color_ops[i]);
                    }
                }
                dirty::TEXTURE_FACTOR => {
                    if self.shadow.texture_factor != self.committed.texture_factor {
                        self.committed.texture_factor = self.shadow.texture_factor;
                        backend.set_texture_factor(self.committed.texture_factor);
                    }
                }
                _ => {
                    let slot = (bit - dirty::MATRIX_BASE) as usize;
                    if slot < MatrixSlot::COUNT
                        && self.shadow.matrices[slot] != self.committed.matrices[slot]
                    {
                        self.committed.matrices[slot] = self.shadow.matrices[slot];
                        backend.set_transform_matrix(
                            MatrixSlot::from_index(slot),
                            &self.committed.matrices[slot],
                        );
                    }
                }
            }
        }
    }
}
