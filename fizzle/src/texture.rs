use crate::graphics::{
    Graphics, GraphicsError, Texture, TextureFilter, TextureFormat, TextureParameter, TextureWrap,
};
use bon::Builder;
use snafu::{Snafu, ensure};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum TextureError {
    #[snafu(display("Texture {name:?} expects {expected} bytes of pixel data, got {actual}"))]
    PixelCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[snafu(transparent)]
    Graphics { source: GraphicsError },
}

/// Describes a 2D texture allocation.
#[derive(Debug, Copy, Clone, Builder)]
pub struct TextureDescriptor {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    #[builder(default = TextureFilter::Linear)]
    pub filter: TextureFilter,
    #[builder(default = TextureWrap::ClampToEdge)]
    pub wrap: TextureWrap,
    #[builder(default = false)]
    pub mipmaps: bool,
    /// Sample as a depth comparison (shadow) texture.
    #[builder(default = false)]
    pub compare: bool,
}

/// Allocates a texture and leaves it bound to the active unit.
pub fn create_texture(
    gfx: &Graphics,
    desc: &TextureDescriptor,
    pixels: Option<&[u8]>,
) -> Result<Texture, GraphicsError> {
    let texture = gfx.create_texture()?;
    gfx.bind_texture(Some(texture));
    gfx.tex_image_2d(desc.format, desc.width, desc.height, pixels);

    let min_filter = if desc.mipmaps && desc.filter == TextureFilter::Linear {
        TextureFilter::LinearMipmapLinear
    } else {
        desc.filter
    };
    let mag_filter = match desc.filter {
        TextureFilter::LinearMipmapLinear => TextureFilter::Linear,
        other => other,
    };

    gfx.tex_parameter(TextureParameter::MinFilter(min_filter));
    gfx.tex_parameter(TextureParameter::MagFilter(mag_filter));
    gfx.tex_parameter(TextureParameter::WrapS(desc.wrap));
    gfx.tex_parameter(TextureParameter::WrapT(desc.wrap));
    if desc.compare {
        gfx.tex_parameter(TextureParameter::CompareRefToTexture(true));
    }
    if desc.mipmaps {
        gfx.generate_mipmap();
    }

    Ok(texture)
}

/// Named texture cache shared by renderables and components.
///
/// Decoding image files is left to the caller, the manager only uploads
/// raw pixels and owns the resulting handles.
#[derive(Debug, Default)]
pub struct TextureManager {
    textures: HashMap<String, Texture>,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads tightly packed RGBA8 pixels under `name`, replacing (and
    /// deleting) any texture previously stored under that name.
    pub fn load_rgba8(
        &mut self,
        gfx: &Graphics,
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Texture, TextureError> {
        let name = name.into();
        let expected = width as usize * height as usize * 4;
        ensure!(
            pixels.len() == expected,
            PixelCountErr {
                name,
                expected,
                actual: pixels.len(),
            }
        );

        let desc = TextureDescriptor::builder()
            .format(TextureFormat::Rgba8)
            .width(width)
            .height(height)
            .wrap(TextureWrap::Repeat)
            .mipmaps(true)
            .build();
        let texture = create_texture(gfx, &desc, Some(pixels))?;
        gfx.bind_texture(None);

        debug!("Loaded texture {name:?} ({width}x{height})");
        if let Some(old) = self.insert(name, texture) {
            gfx.delete_texture(old);
        }
        Ok(texture)
    }

    /// Stores an externally created texture. Returns the handle it replaced.
    pub fn insert(&mut self, name: impl Into<String>, texture: Texture) -> Option<Texture> {
        self.textures.insert(name.into(), texture)
    }

    pub fn get(&self, name: &str) -> Option<Texture> {
        let texture = self.textures.get(name).copied();
        if texture.is_none() {
            warn!("Texture {name:?} is not loaded");
        }
        texture
    }

    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Deletes the named texture. Any core still referencing it will sample garbage.
    pub fn remove(&mut self, gfx: &Graphics, name: &str) -> bool {
        match self.textures.remove(name) {
            Some(texture) => {
                gfx.delete_texture(texture);
                true
            }
            None => false,
        }
    }

    pub fn destroy(&mut self, gfx: &Graphics) {
        for (_, texture) in self.textures.drain() {
            gfx.delete_texture(texture);
        }
    }
}
