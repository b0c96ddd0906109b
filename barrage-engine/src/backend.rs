//! Graphics backend interface.
//!
//! The engine never talks to a graphics API directly; everything funnels
//! through [`GraphicsBackend`]. The render-state cache guarantees the
//! backend only sees deltas, and the draw frontend hands over finished
//! quads, so an implementation is a thin translation layer.

use barrage_common::pixel::{Color, PixelFormat};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::LoadError;

/// Handle to a backend texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Invalid/null texture handle
    pub const INVALID: TextureHandle = TextureHandle(0);
}

impl Default for TextureHandle {
    fn default() -> Self {
        TextureHandle::INVALID
    }
}

/// Framebuffer blend mode. Kept outside the dirty-state cache because every
/// draw path reads it immediately before the draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BlendMode {
    /// src-alpha / one-minus-src-alpha
    #[default]
    Normal = 0,
    /// src-alpha / one
    Additive = 1,
}

impl BlendMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BlendMode::Additive,
            _ => BlendMode::Normal,
        }
    }
}

/// Fixed-function color combiner op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ColorOp {
    #[default]
    Modulate = 0,
    Add = 1,
}

/// Which combiner component a [`ColorOp`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ColorOpComponent {
    Rgb = 0,
    Alpha = 1,
}

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DepthFunc {
    #[default]
    LessEqual = 0,
    Always = 1,
}

/// Transform matrix slots mirrored by the render-state cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum MatrixSlot {
    Model = 0,
    View = 1,
    Projection = 2,
    Texture = 3,
}

impl MatrixSlot {
    pub const COUNT: usize = 4;

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => MatrixSlot::Model,
            1 => MatrixSlot::View,
            3 => MatrixSlot::Texture,
            _ => MatrixSlot::Projection,
        }
    }
}

/// Vertex attribute enable bits.
pub const ATTR_TEX_COORD: u8 = 1 << 0;
pub const ATTR_DIFFUSE: u8 = 1 << 1;

/// Vertex attribute array slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum AttrArray {
    Position = 0,
    TexCoord = 1,
    Diffuse = 2,
}

impl AttrArray {
    pub const COUNT: usize = 3;
}

/// Stride/offset of one attribute within the active vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrPointer {
    pub stride: u32,
    pub offset: u32,
}

/// Position + texcoord vertex (texture-factor color path).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

/// Position + diffuse + texcoord vertex (per-vertex color path).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertexColored {
    pub pos: [f32; 3],
    pub diffuse: u32,
    pub uv: [f32; 2],
}

/// Pixel payload for texture creation/update.
///
/// `pixels: None` allocates storage without contents (render targets and
/// `'@'`-named archive textures).
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Option<&'a [u8]>,
}

/// The interface the graphics backend implements.
///
/// All calls arrive on the game thread, already minimized by
/// [`crate::render::RenderStateCache`].
pub trait GraphicsBackend {
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureHandle, LoadError>;
    fn update_texture(
        &mut self,
        handle: TextureHandle,
        upload: &TextureUpload<'_>,
    ) -> Result<(), LoadError>;
    fn delete_texture(&mut self, handle: TextureHandle);
    fn bind_texture(&mut self, handle: TextureHandle);

    fn set_blend_mode(&mut self, mode: BlendMode);
    fn set_fog_range(&mut self, near: f32, far: f32);
    fn set_fog_color(&mut self, color: Color);
    fn set_depth_mask(&mut self, write: bool);
    fn set_depth_func(&mut self, func: DepthFunc);
    fn toggle_vertex_attr(&mut self, attr_bit: u8, enabled: bool);
    fn set_attr_pointer(&mut self, array: AttrArray, pointer: AttrPointer);
    fn set_color_op(&mut self, component: ColorOpComponent, op: ColorOp);
    fn set_texture_factor(&mut self, color: Color);
    fn set_transform_matrix(&mut self, slot: MatrixSlot, matrix: &Mat4);

    fn draw_quad(&mut self, vertices: &[SpriteVertex; 4]);
    fn draw_quad_colored(&mut self, vertices: &[SpriteVertexColored; 4]);
}

/// No-op backend for headless stepping and tests.
///
/// Texture handles are handed out sequentially starting at 1.
#[derive(Debug, Default)]
pub struct NullBackend {
    next_texture: u32,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphicsBackend for NullBackend {
    fn create_texture(&mut self, _upload: &TextureUpload<'_>) -> Result<TextureHandle, LoadError> {
        self.next_texture += 1;
        Ok(TextureHandle(self.next_texture))
    }

    fn update_texture(
        &mut self,
        _handle: TextureHandle,
        _upload: &TextureUpload<'_>,
    ) -> Result<(), LoadError> {
        Ok(())
    }

    fn delete_texture(&mut self, _handle: TextureHandle) {}
    fn bind_texture(&mut self, _handle: TextureHandle) {}
    fn set_blend_mode(&mut self, _mode: BlendMode) {}
    fn set_fog_range(&mut self, _near: f32, _far: f32) {}
    fn set_fog_color(&mut self, _color: Color) {}
    fn set_depth_mask(&mut self, _write: bool) {}
    fn set_depth_func(&mut self, _func: DepthFunc) {}
    fn toggle_vertex_attr(&mut self, _attr_bit: u8, _enabled: bool) {}
    fn set_attr_pointer(&mut self, _array: AttrArray, _pointer: AttrPointer) {}
    fn set_color_op(&mut self, _component: ColorOpComponent, _op: ColorOp) {}
    fn set_texture_factor(&mut self, _color: Color) {}
    fn set_transform_matrix(&mut self, _slot: MatrixSlot, _matrix: &Mat4) {}
    fn draw_quad(&mut self, _vertices: &[SpriteVertex; 4]) {}
    fn draw_quad_colored(&mut self, _vertices: &[SpriteVertexColored; 4]) {}
}
