//! Draw frontend: turns VM state into textured quads.
//!
//! Three path families, selected by projection and rotation:
//! orthographic without rotation (pixel-snapped), orthographic rotated
//! around Z, and perspective (optionally Euler-rotated, composed onto the
//! saved view matrix). A facing-camera variant skips the pixel snap for
//! billboards. All paths share one preallocated quad; the vertex layout
//! (texture-factor color vs. per-vertex diffuse) is a config choice.

use glam::{Mat4, Vec3, Vec4};

use crate::anm::{ANCHOR_LEFT, ANCHOR_TOP, AnmVm};
use crate::backend::{
    ATTR_DIFFUSE, ATTR_TEX_COORD, AttrArray, AttrPointer, BlendMode, ColorOpComponent, DepthFunc,
    GraphicsBackend, MatrixSlot, SpriteVertex, SpriteVertexColored,
};
use crate::options::EngineOptions;
use crate::render::RenderStateCache;
use crate::sprite::{Sprite, SpriteTable};
use crate::texture::TextureStore;

/// Projection families the frontend switches between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Projection/view matrix pairs for both modes, set once per scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionMatrices {
    pub ortho_projection: Mat4,
    pub ortho_view: Mat4,
    pub perspective_projection: Mat4,
    pub perspective_view: Mat4,
}

impl Default for ProjectionMatrices {
    fn default() -> Self {
        Self {
            ortho_projection: Mat4::IDENTITY,
            ortho_view: Mat4::IDENTITY,
            perspective_projection: Mat4::IDENTITY,
            perspective_view: Mat4::IDENTITY,
        }
    }
}

pub struct DrawFrontend {
    quad: [SpriteVertex; 4],
    quad_colored: [SpriteVertexColored; 4],
    /// Generation id of the sprite whose UVs are in the quad.
    current_sprite: Option<u32>,
    current_blend: Option<BlendMode>,
    mode: Option<ProjectionMode>,
    projections: ProjectionMatrices,
    use_vertex_color: bool,
    hw_texture_blending: bool,
    no_depth_test: bool,
}

impl DrawFrontend {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            quad: Default::default(),
            quad_colored: Default::default(),
            current_sprite: None,
            current_blend: None,
            mode: None,
            projections: ProjectionMatrices::default(),
            use_vertex_color: options.dont_use_vertex_buffer,
            hw_texture_blending: options.hw_texture_blending,
            no_depth_test: options.no_depth_test,
        }
    }

    pub fn set_projections(&mut self, projections: ProjectionMatrices) {
        self.projections = projections;
        self.mode = None;
    }

    /// Forget cached sprite/blend state (start of frame, or after external
    /// parties touched the pipeline).
    pub fn invalidate(&mut self) {
        self.current_sprite = None;
        self.current_blend = None;
        self.mode = None;
    }

    fn set_projection(&mut self, mode: ProjectionMode, cache: &mut RenderStateCache) {
        if self.mode == Some(mode) {
            return;
        }
        self.mode = Some(mode);
        let (projection, view) = match mode {
            ProjectionMode::Orthographic => (
                self.projections.ortho_projection,
                self.projections.ortho_view,
            ),
            ProjectionMode::Perspective => (
                self.projections.perspective_projection,
                self.projections.perspective_view,
            ),
        };
        cache.set_matrix(MatrixSlot::Projection, projection);
        cache.set_matrix(MatrixSlot::View, view);
    }

    fn should_skip(vm: &AnmVm) -> bool {
        !vm.visible || !vm.in_use || vm.color.alpha() == 0
    }

    fn sprite_of<'a>(vm: &AnmVm, sprites: &'a SpriteTable) -> Option<&'a Sprite> {
        let sprite = sprites.get(vm.sprite_index?)?;
        // A released-and-reloaded slot carries a new generation id; treat
        // the VM's reference as stale rather than drawing the wrong image.
        (sprite.generation == vm.sprite_generation).then_some(sprite)
    }

    /// Orthographic draw; picks the rotated path when rotation.z is set.
    pub fn draw(
        &mut self,
        vm: &AnmVm,
        sprites: &SpriteTable,
        textures: &mut TextureStore,
        cache: &mut RenderStateCache,
        backend: &mut dyn GraphicsBackend,
    ) -> bool {
        if vm.rotation.z == 0.0 {
            return self.draw_no_rotation(vm, sprites, textures, cache, backend);
        }
        if Self::should_skip(vm) {
            return false;
        }
        let Some(sprite) = Self::sprite_of(vm, sprites) else {
            return false;
        };

        let pos = vm.render_pos();
        let (sin, cos) = vm.rotation.z.sin_cos();
        let x_offset = pos.x.round();
        let y_offset = pos.y.round();
        let half_w = (sprite.width_px * vm.scale.x / 2.0).round();
        let half_h = (sprite.height_px * vm.scale.y / 2.0).round();

        let rotate = |x: f32, y: f32| {
            [
                x * cos + y * sin + x_offset,
                -x * sin + y * cos + y_offset,
                pos.z,
            ]
        };
        self.quad[0].pos = rotate(-half_w - 0.5, -half_h - 0.5);
        self.quad[1].pos = rotate(half_w - 0.5, -half_h - 0.5);
        self.quad[2].pos = rotate(-half_w - 0.5, half_h - 0.5);
        self.quad[3].pos = rotate(half_w - 0.5, half_h - 0.5);
        if vm.anchor & ANCHOR_LEFT != 0 {
            for v in &mut self.quad {
                v.pos[0] += half_w;
            }
        }
        if vm.anchor & ANCHOR_TOP != 0 {
            for v in &mut self.quad {
                v.pos[1] += half_h;
            }
        }
        self.finish_ortho(vm, sprite, textures, cache, backend, false)
    }

    /// Axis-aligned orthographic draw with pixel snapping.
    pub fn draw_no_rotation(
        &mut self,
        vm: &AnmVm,
        sprites: &SpriteTable,
        textures: &mut TextureStore,
        cache: &mut RenderStateCache,
        backend: &mut dyn GraphicsBackend,
    ) -> bool {
        if Self::should_skip(vm) {
            return false;
        }
        let Some(sprite) = Self::sprite_of(vm, sprites) else {
            return false;
        };
        self.build_axis_aligned_quad(vm, sprite);
        self.finish_ortho(vm, sprite, textures, cache, backend, true)
    }

    /// Axis-aligned orthographic draw without pixel snapping, for sprites
    /// that billboard toward the camera.
    pub fn draw_facing_camera(
        &mut self,
        vm: &AnmVm,
        sprites: &SpriteTable,
        textures: &mut TextureStore,
        cache: &mut RenderStateCache,
        backend: &mut dyn GraphicsBackend,
    ) -> bool {
        if Self::should_skip(vm) {
            return false;
        }
        let Some(sprite) = Self::sprite_of(vm, sprites) else {
            return false;
        };
        self.build_axis_aligned_quad(vm, sprite);
        self.finish_ortho(vm, sprite, textures, cache, backend, false)
    }

    fn build_axis_aligned_quad(&mut self, vm: &AnmVm, sprite: &Sprite) {
        let pos = vm.render_pos();
        let half_w = sprite.width_px * vm.scale.x / 2.0;
        let half_h = sprite.height_px * vm.scale.y / 2.0;

        let (x0, x1) = if vm.anchor & ANCHOR_LEFT == 0 {
            (pos.x - half_w, pos.x + half_w)
        } else {
            (pos.x, pos.x + half_w + half_w)
        };
        let (y0, y1) = if vm.anchor & ANCHOR_TOP == 0 {
            (pos.y - half_h, pos.y + half_h)
        } else {
            (pos.y, pos.y + half_h + half_h)
        };

        self.quad[0].pos = [x0, y0, pos.z];
        self.quad[1].pos = [x1, y0, pos.z];
        self.quad[2].pos = [x0, y1, pos.z];
        self.quad[3].pos = [x1, y1, pos.z];
    }

    /// Shared tail of the orthographic paths: UV rebuild and texture bind on
    /// sprite change, per-VM render state, projection, flush, draw.
    fn finish_ortho(
        &mut self,
        vm: &AnmVm,
        sprite: &Sprite,
        textures: &mut TextureStore,
        cache: &mut RenderStateCache,
        backend: &mut dyn GraphicsBackend,
        round_to_pixel: bool,
    ) -> bool {
        if round_to_pixel {
            self.quad[0].pos[0] = self.quad[0].pos[0].round();
            self.quad[2].pos[0] = self.quad[0].pos[0];
            self.quad[1].pos[0] = self.quad[1].pos[0].round();
            self.quad[3].pos[0] = self.quad[1].pos[0];
            self.quad[0].pos[1] = self.quad[0].pos[1].round();
            self.quad[1].pos[1] = self.quad[0].pos[1];
            self.quad[2].pos[1] = self.quad[2].pos[1].round();
            self.quad[3].pos[1] = self.quad[2].pos[1];
        }

        if self.current_sprite != Some(sprite.generation) {
            self.current_sprite = Some(sprite.generation);
            let u0 = sprite.uv_start.x + vm.uv_scroll.x;
            let u1 = sprite.uv_end.x + vm.uv_scroll.x;
            let v0 = sprite.uv_start.y + vm.uv_scroll.y;
            let v1 = sprite.uv_end.y + vm.uv_scroll.y;
            self.quad[0].uv = [u0, v0];
            self.quad[1].uv = [u1, v0];
            self.quad[2].uv = [u0, v1];
            self.quad[3].uv = [u1, v1];
            textures.bind(backend, sprite.texture_id as usize);
        }

        self.apply_vertex_layout(cache);
        self.apply_render_state(vm, cache, backend);
        self.set_projection(ProjectionMode::Orthographic, cache);

        if self.use_vertex_color {
            for (dst, src) in self.quad_colored.iter_mut().zip(&self.quad) {
                dst.pos = src.pos;
                dst.uv = src.uv;
                dst.diffuse = vm.color.0;
            }
            cache.flush(backend);
            backend.draw_quad_colored(&self.quad_colored);
        } else {
            cache.flush(backend);
            backend.draw_quad(&self.quad);
        }
        true
    }

    /// Perspective draw. Falls through to the Euler-rotated variant when
    /// any rotation axis is set.
    pub fn draw_perspective(
        &mut self,
        vm: &AnmVm,
        sprites: &SpriteTable,
        textures: &mut TextureStore,
        cache: &mut RenderStateCache,
        backend: &mut dyn GraphicsBackend,
    ) -> bool {
        if Self::should_skip(vm) {
            return false;
        }
        let rotated = vm.rotation != Vec3::ZERO;
        let Some(sprite) = Self::sprite_of(vm, sprites) else {
            return false;
        };
        let pos = vm.render_pos();

        let scaled_w = sprite.width_px * vm.scale.x;
        let scaled_h = sprite.height_px * vm.scale.y;
        let mut world = Mat4::from_scale(Vec3::new(scaled_w, -scaled_h, 1.0));
        if rotated {
            if vm.rotation.x != 0.0 {
                world = Mat4::from_rotation_x(vm.rotation.x) * world;
            }
            if vm.rotation.y != 0.0 {
                world = Mat4::from_rotation_y(vm.rotation.y) * world;
            }
            if vm.rotation.z != 0.0 {
                world = Mat4::from_rotation_z(vm.rotation.z) * world;
            }
        }

        // Rotated sprites anchor on true position; unrotated ones snap to
        // the pixel grid.
        let (mut tx, mut ty) = if rotated {
            (pos.x, -pos.y)
        } else {
            (pos.x.round() - 0.5, -pos.y.round() + 0.5)
        };
        if vm.anchor & ANCHOR_LEFT != 0 {
            tx += (scaled_w / 2.0).abs();
        }
        if vm.anchor & ANCHOR_TOP != 0 {
            ty -= (scaled_h / 2.0).abs();
        }
        world.w_axis = Vec4::new(tx, ty, pos.z, 1.0);

        self.set_projection(ProjectionMode::Perspective, cache);
        let original_view = cache.matrix(MatrixSlot::View);
        cache.set_matrix(MatrixSlot::View, original_view * world);

        if self.current_sprite != Some(sprite.generation) {
            self.current_sprite = Some(sprite.generation);
            self.quad[0].uv = [sprite.uv_start.x, sprite.uv_start.y];
            self.quad[1].uv = [sprite.uv_end.x, sprite.uv_start.y];
            self.quad[2].uv = [sprite.uv_start.x, sprite.uv_end.y];
            self.quad[3].uv = [sprite.uv_end.x, sprite.uv_end.y];
            textures.bind(backend, sprite.texture_id as usize);
        }
        // UV scroll rides the texture matrix in this path.
        cache.set_matrix(
            MatrixSlot::Texture,
            Mat4::from_translation(Vec3::new(vm.uv_scroll.x, vm.uv_scroll.y, 0.0)),
        );

        // Unit quad centered on the origin; the world matrix sizes it.
        self.quad[0].pos = [-0.5, -0.5, 0.0];
        self.quad[1].pos = [0.5, -0.5, 0.0];
        self.quad[2].pos = [-0.5, 0.5, 0.0];
        self.quad[3].pos = [0.5, 0.5, 0.0];

        self.apply_vertex_layout(cache);
        self.apply_render_state(vm, cache, backend);

        if self.use_vertex_color {
            for (dst, src) in self.quad_colored.iter_mut().zip(&self.quad) {
                dst.pos = src.pos;
                dst.uv = src.uv;
                dst.diffuse = vm.color.0;
            }
            cache.flush(backend);
            backend.draw_quad_colored(&self.quad_colored);
        } else {
            cache.flush(backend);
            backend.draw_quad(&self.quad);
        }

        cache.set_matrix(MatrixSlot::View, original_view);
        true
    }

    fn apply_vertex_layout(&self, cache: &mut RenderStateCache) {
        if self.use_vertex_color {
            let stride = std::mem::size_of::<SpriteVertexColored>() as u32;
            cache.set_vertex_attrs(ATTR_TEX_COORD | ATTR_DIFFUSE);
            cache.set_attr_pointer(AttrArray::Position, AttrPointer { stride, offset: 0 });
            cache.set_attr_pointer(AttrArray::Diffuse, AttrPointer { stride, offset: 12 });
            cache.set_attr_pointer(AttrArray::TexCoord, AttrPointer { stride, offset: 16 });
        } else {
            let stride = std::mem::size_of::<SpriteVertex>() as u32;
            cache.set_vertex_attrs(ATTR_TEX_COORD);
            cache.set_attr_pointer(AttrArray::Position, AttrPointer { stride, offset: 0 });
            cache.set_attr_pointer(AttrArray::TexCoord, AttrPointer { stride, offset: 12 });
        }
    }

    /// Per-VM render state: blend mode straight to the backend, the rest
    /// through the cache.
    fn apply_render_state(
        &mut self,
        vm: &AnmVm,
        cache: &mut RenderStateCache,
        backend: &mut dyn GraphicsBackend,
    ) {
        if self.current_blend != Some(vm.blend) {
            self.current_blend = Some(vm.blend);
            backend.set_blend_mode(vm.blend);
        }
        if !self.hw_texture_blending {
            cache.set_color_op(ColorOpComponent::Rgb, vm.color_op);
        }
        if !self.use_vertex_color {
            cache.set_texture_factor(vm.color);
        }
        cache.set_depth_mask(!vm.z_write_disable);
        if self.no_depth_test {
            cache.set_depth_func(DepthFunc::Always);
        }
    }
}
