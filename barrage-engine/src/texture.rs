//! Texture store: fixed slot table in front of backend texture objects.
//!
//! Slots are addressed by the archive's texture index. Images load through
//! the virtual filesystem, convert to the archive's declared pixel format,
//! and upload through the backend; a 1x1 dummy texture is created and bound
//! at startup so untextured raster paths still see a complete texture unit.

use barrage_common::math::next_pow2;
use barrage_common::pixel::{self, PixelFormat};
use tracing::{debug, warn};

use crate::backend::{GraphicsBackend, TextureHandle, TextureUpload};
use crate::error::LoadError;
use crate::options::EngineOptions;
use crate::vfs::Vfs;

/// Number of texture slots.
pub const TEXTURE_SLOTS: usize = 264;

/// One texture slot.
#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub handle: TextureHandle,
    /// Converted pixel data, kept when the caller wants CPU write-back.
    pub cpu_pixels: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Parameters for one texture load.
#[derive(Debug, Clone, Copy)]
pub struct TextureLoadParams<'a> {
    pub name: &'a str,
    pub format: PixelFormat,
    /// Color key from the archive header. No backend equivalent exists;
    /// recorded for format fidelity only.
    pub color_key: u32,
    /// Size the archive header declared.
    pub declared_width: u32,
    pub declared_height: u32,
    /// When the decoded image disagrees with the declared size, rescale to
    /// the declared size before conversion.
    pub rescale_to_declared: bool,
    /// Keep converted pixels on the CPU side for later write-back.
    pub keep_cpu_pixels: bool,
}

#[derive(Debug)]
pub struct TextureStore {
    textures: Vec<Texture>,
    /// Backend-bound handle, cached to skip redundant binds.
    current: TextureHandle,
    dummy: TextureHandle,
}

impl TextureStore {
    /// Create the store plus the always-bound 1x1 dummy texture.
    pub fn new(backend: &mut dyn GraphicsBackend) -> Result<Self, LoadError> {
        let dummy_pixels = [0xFFu8; 4];
        let dummy = backend.create_texture(&TextureUpload {
            width: 1,
            height: 1,
            format: PixelFormat::Argb8888,
            pixels: Some(&dummy_pixels),
        })?;
        backend.bind_texture(dummy);
        Ok(Self {
            textures: vec![Texture::default(); TEXTURE_SLOTS],
            current: dummy,
            dummy,
        })
    }

    pub fn get(&self, id: usize) -> Option<&Texture> {
        self.textures
            .get(id)
            .filter(|t| t.handle != TextureHandle::INVALID)
    }

    /// Load and upload a texture image into slot `id`.
    pub fn load(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        vfs: &mut dyn Vfs,
        options: &EngineOptions,
        id: usize,
        params: &TextureLoadParams<'_>,
    ) -> Result<(), LoadError> {
        if id >= TEXTURE_SLOTS {
            return Err(LoadError::OutOfSlots("texture"));
        }
        self.release(backend, id);

        let mut format = params.format;
        if format == PixelFormat::Unknown {
            // Treat unknown as a wildcard rather than an error.
            format = PixelFormat::Argb8888;
        }
        if options.force_16bit {
            format = format.forced_16bit();
        }

        let bytes = vfs.read(params.name).map_err(|source| LoadError::Io {
            path: params.name.to_string(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|_| LoadError::CorruptImage {
                path: params.name.to_string(),
            })?
            .to_rgba8();

        let (mut width, mut height) = decoded.dimensions();
        let mut rgba = decoded;
        if params.rescale_to_declared
            && (width, height) != (params.declared_width, params.declared_height)
            && params.declared_width > 0
            && params.declared_height > 0
        {
            // Some archives declare a different texture size than the image
            // file carries; sprite UVs are computed against the declared
            // size, so the pixels are rescaled to match it.
            rgba = image::imageops::resize(
                &rgba,
                params.declared_width,
                params.declared_height,
                image::imageops::FilterType::Triangle,
            );
            (width, height) = (params.declared_width, params.declared_height);
        }

        let pixels = pixel::convert_rgba8(rgba.as_raw(), format)
            .ok_or(LoadError::UnsupportedPixelFormat(format as u32))?;

        let handle = backend.create_texture(&TextureUpload {
            width,
            height,
            format,
            pixels: Some(&pixels),
        })?;

        debug!(
            id,
            name = params.name,
            width,
            height,
            ?format,
            "loaded texture"
        );
        self.textures[id] = Texture {
            handle,
            cpu_pixels: params.keep_cpu_pixels.then_some(pixels),
            width,
            height,
            format,
        };
        Ok(())
    }

    /// Allocate an empty texture with power-of-two dimensions.
    pub fn create_empty(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        id: usize,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<(), LoadError> {
        if id >= TEXTURE_SLOTS {
            return Err(LoadError::OutOfSlots("texture"));
        }
        self.release(backend, id);

        let (width, height) = (next_pow2(width), next_pow2(height));
        let handle = backend.create_texture(&TextureUpload {
            width,
            height,
            format,
            pixels: None,
        })?;
        debug!(id, width, height, ?format, "created empty texture");
        self.textures[id] = Texture {
            handle,
            cpu_pixels: None,
            width,
            height,
            format,
        };
        Ok(())
    }

    /// Replace a texture's contents from raw RGBA8 pixels (screen-capture
    /// write-back). Dimensions must match the slot.
    pub fn write_back(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        id: usize,
        rgba: &[u8],
    ) -> Result<(), LoadError> {
        let Some(texture) = self.textures.get_mut(id).filter(|t| t.handle != TextureHandle::INVALID)
        else {
            warn!(id, "write-back into unloaded texture slot ignored");
            return Ok(());
        };
        let pixels = pixel::convert_rgba8(rgba, texture.format)
            .ok_or(LoadError::UnsupportedPixelFormat(texture.format as u32))?;
        backend.update_texture(
            texture.handle,
            &TextureUpload {
                width: texture.width,
                height: texture.height,
                format: texture.format,
                pixels: Some(&pixels),
            },
        )?;
        if texture.cpu_pixels.is_some() {
            texture.cpu_pixels = Some(pixels);
        }
        Ok(())
    }

    /// Release slot `id`. Double release is a no-op; releasing the currently
    /// bound texture also clears the bind cache.
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend, id: usize) {
        let Some(texture) = self.textures.get_mut(id) else {
            return;
        };
        if texture.handle != TextureHandle::INVALID {
            if self.current == texture.handle {
                self.current = TextureHandle::INVALID;
            }
            backend.delete_texture(texture.handle);
            debug!(id, "released texture");
        }
        *texture = Texture::default();
    }

    /// Bind the texture in slot `id`, skipping the call when already bound.
    pub fn bind(&mut self, backend: &mut dyn GraphicsBackend, id: usize) {
        let handle = self
            .textures
            .get(id)
            .map(|t| t.handle)
            .unwrap_or(TextureHandle::INVALID);
        if handle == TextureHandle::INVALID {
            return;
        }
        if self.current != handle {
            self.current = handle;
            backend.bind_texture(handle);
        }
    }

    pub fn dummy(&self) -> TextureHandle {
        self.dummy
    }

    /// Currently bound handle (dummy at startup).
    pub fn current(&self) -> TextureHandle {
        self.current
    }

    /// Forget the bind cache (e.g. after an external party touched the
    /// texture unit).
    pub fn invalidate_bind_cache(&mut self) {
        self.current = TextureHandle::INVALID;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn params(name: &str, w: u32, h: u32, rescale: bool) -> TextureLoadParams<'_> {
        TextureLoadParams {
            name,
            format: PixelFormat::Argb8888,
            color_key: 0,
            declared_width: w,
            declared_height: h,
            rescale_to_declared: rescale,
            keep_cpu_pixels: false,
        }
    }

    #[test]
    fn test_dummy_texture_bound_at_init() {
        let mut backend = NullBackend::new();
        let store = TextureStore::new(&mut backend).unwrap();
        assert_ne!(store.dummy(), TextureHandle::INVALID);
        assert_eq!(store.current(), store.dummy());
    }

    #[test]
    fn test_load_and_release() {
        let mut backend = NullBackend::new();
        let mut store = TextureStore::new(&mut backend).unwrap();
        let mut vfs = crate::vfs::MemoryVfs::new();
        vfs.insert("tex.png", png_bytes(8, 4));

        store
            .load(
                &mut backend,
                &mut vfs,
                &EngineOptions::default(),
                3,
                &params("tex.png", 8, 4, true),
            )
            .unwrap();
        let t = store.get(3).unwrap();
        assert_eq!((t.width, t.height), (8, 4));

        store.release(&mut backend, 3);
        assert!(store.get(3).is_none());
        // Double release stays quiet.
        store.release(&mut backend, 3);
    }

    #[test]
    fn test_declared_size_mismatch_both_behaviors() {
        let mut backend = NullBackend::new();
        let mut store = TextureStore::new(&mut backend).unwrap();
        let mut vfs = crate::vfs::MemoryVfs::new();
        vfs.insert("tex.png", png_bytes(8, 8));

        // Rescale path: pixels stretched to the declared 16x16.
        store
            .load(
                &mut backend,
                &mut vfs,
                &EngineOptions::default(),
                0,
                &params("tex.png", 16, 16, true),
            )
            .unwrap();
        assert_eq!(store.get(0).unwrap().width, 16);

        // Keep-image-size path.
        store
            .load(
                &mut backend,
                &mut vfs,
                &EngineOptions::default(),
                1,
                &params("tex.png", 16, 16, false),
            )
            .unwrap();
        assert_eq!(store.get(1).unwrap().width, 8);
    }

    #[test]
    fn test_force_16bit_remaps_format() {
        let mut backend = NullBackend::new();
        let mut store = TextureStore::new(&mut backend).unwrap();
        let mut vfs = crate::vfs::MemoryVfs::new();
        vfs.insert("tex.png", png_bytes(4, 4));

        let options = EngineOptions {
            force_16bit: true,
            ..Default::default()
        };
        store
            .load(&mut backend, &mut vfs, &options, 0, &params("tex.png", 4, 4, true))
            .unwrap();
        assert_eq!(store.get(0).unwrap().format, PixelFormat::Argb4444);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut backend = NullBackend::new();
        let mut store = TextureStore::new(&mut backend).unwrap();
        let mut vfs = crate::vfs::MemoryVfs::new();
        let err = store
            .load(
                &mut backend,
                &mut vfs,
                &EngineOptions::default(),
                0,
                &params("absent.png", 4, 4, true),
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_create_empty_rounds_to_pow2() {
        let mut backend = NullBackend::new();
        let mut store = TextureStore::new(&mut backend).unwrap();
        store
            .create_empty(&mut backend, 5, 100, 30, PixelFormat::Rgb565)
            .unwrap();
        let t = store.get(5).unwrap();
        assert_eq!((t.width, t.height), (128, 32));
    }

    #[test]
    fn test_bind_caches_current() {
        let mut backend = NullBackend::new();
        let mut store = TextureStore::new(&mut backend).unwrap();
        store
            .create_empty(&mut backend, 0, 8, 8, PixelFormat::Argb8888)
            .unwrap();
        store.bind(&mut backend, 0);
        let bound = store.current();
        assert_eq!(bound, store.get(0).unwrap().handle);

        // Releasing the bound texture clears the cache.
        store.release(&mut backend, 0);
        assert_eq!(store.current(), TextureHandle::INVALID);
    }
}
