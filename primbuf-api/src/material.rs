//! Materials: blending mode, base color and texture layers. Textures themselves live in an
//! external texture manager and are referenced by [`TextureId`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transparency {
    #[default]
    Opaque,
    /// Alpha-tested cut-outs. Depth-correct without sorting, so packed like opaque geometry.
    Binary,
    /// Alpha-blended; drawn back-to-front every frame.
    Translucent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayer {
    pub texture: TextureId,
    /// Multiply the sampled texel with the material color.
    pub color_modulated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub transparency: Transparency,
    /// Linear RGBA.
    pub color: [f32; 4],
    pub texture_layers: Vec<TextureLayer>,
}

impl Material {
    pub fn new(id: MaterialId, name: impl Into<String>, transparency: Transparency, color: [f32; 4]) -> Self {
        Self {
            id,
            name: name.into(),
            transparency,
            color,
            texture_layers: Vec::new(),
        }
    }

    pub fn with_texture_layer(mut self, texture: TextureId) -> Self {
        self.texture_layers.push(TextureLayer {
            texture,
            color_modulated: true,
        });
        self
    }

    pub fn texture_layer_count(&self) -> usize {
        self.texture_layers.len()
    }

    pub fn is_translucent(&self) -> bool {
        self.transparency == Transparency::Translucent
    }
}
