//! Material descriptors
//!
//! Materials are a closed set of shading models. Every shading model carries
//! its own channel values; a channel can additionally be driven by a texture
//! (`TextureRef`), which records how the texels are encoded so the shader can
//! linearize them.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::ids::{MaterialId, TextureId};

/// Shading model tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Lambert,
    Phong,
    MetallicRoughness,
    SpecularGlossiness,
}

impl MaterialKind {
    pub fn name(self) -> &'static str {
        match self {
            MaterialKind::Lambert => "Lambert",
            MaterialKind::Phong => "Phong",
            MaterialKind::MetallicRoughness => "MetallicRoughness",
            MaterialKind::SpecularGlossiness => "SpecularGlossiness",
        }
    }

    /// Whether the shading model uses the GGX microfacet BRDF
    pub fn is_physically_based(self) -> bool {
        matches!(
            self,
            MaterialKind::MetallicRoughness | MaterialKind::SpecularGlossiness
        )
    }
}

/// How texel values are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureEncoding {
    #[default]
    Linear,
    #[serde(rename = "srgb")]
    Srgb,
    Gamma,
}

/// Texture reference attached to a material channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    pub texture: TextureId,
    /// Optional UV transform applied before sampling
    #[serde(default)]
    pub matrix: Option<Mat4>,
    #[serde(default)]
    pub encoding: TextureEncoding,
}

impl TextureRef {
    pub fn new(texture: TextureId) -> Self {
        Self {
            texture,
            matrix: None,
            encoding: TextureEncoding::Linear,
        }
    }

    pub fn with_encoding(mut self, encoding: TextureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix = Some(matrix);
        self
    }
}

/// Alpha treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaMode {
    /// Alpha forced to 1
    #[default]
    Opaque,
    /// Fragments below the cutoff are discarded
    Mask,
    /// Alpha passed through to blending
    Blend,
}

/// Texture channel slots, in the fixed order used for sampler declaration and
/// texture unit assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureChannel {
    Ambient,
    Diffuse,
    BaseColor,
    Specular,
    Glossiness,
    SpecularGlossiness,
    Metallic,
    Roughness,
    MetallicRoughness,
    Emissive,
    Alpha,
    Occlusion,
    Normal,
    Reflectivity,
}

impl TextureChannel {
    pub const ALL: [TextureChannel; 14] = [
        TextureChannel::Ambient,
        TextureChannel::Diffuse,
        TextureChannel::BaseColor,
        TextureChannel::Specular,
        TextureChannel::Glossiness,
        TextureChannel::SpecularGlossiness,
        TextureChannel::Metallic,
        TextureChannel::Roughness,
        TextureChannel::MetallicRoughness,
        TextureChannel::Emissive,
        TextureChannel::Alpha,
        TextureChannel::Occlusion,
        TextureChannel::Normal,
        TextureChannel::Reflectivity,
    ];

    /// GLSL identifier stem (`diffuseMap`, `baseColorMap`, ...)
    pub fn stem(self) -> &'static str {
        match self {
            TextureChannel::Ambient => "ambient",
            TextureChannel::Diffuse => "diffuse",
            TextureChannel::BaseColor => "baseColor",
            TextureChannel::Specular => "specular",
            TextureChannel::Glossiness => "glossiness",
            TextureChannel::SpecularGlossiness => "specularGlossiness",
            TextureChannel::Metallic => "metallic",
            TextureChannel::Roughness => "roughness",
            TextureChannel::MetallicRoughness => "metallicRoughness",
            TextureChannel::Emissive => "emissive",
            TextureChannel::Alpha => "alpha",
            TextureChannel::Occlusion => "occlusion",
            TextureChannel::Normal => "normal",
            TextureChannel::Reflectivity => "reflectivity",
        }
    }
}

/// Fresnel-modulated channels (Phong only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FresnelChannel {
    Diffuse,
    Specular,
    Alpha,
    Emissive,
    Reflectivity,
}

impl FresnelChannel {
    pub const ALL: [FresnelChannel; 5] = [
        FresnelChannel::Diffuse,
        FresnelChannel::Specular,
        FresnelChannel::Alpha,
        FresnelChannel::Emissive,
        FresnelChannel::Reflectivity,
    ];

    pub fn stem(self) -> &'static str {
        match self {
            FresnelChannel::Diffuse => "diffuse",
            FresnelChannel::Specular => "specular",
            FresnelChannel::Alpha => "alpha",
            FresnelChannel::Emissive => "emissive",
            FresnelChannel::Reflectivity => "reflectivity",
        }
    }
}

/// Edge/center color blend driven by the view angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fresnel {
    pub edge_color: Vec3,
    pub center_color: Vec3,
    pub edge_bias: f32,
    pub center_bias: f32,
    pub power: f32,
}

impl Default for Fresnel {
    fn default() -> Self {
        Self {
            edge_color: Vec3::ZERO,
            center_color: Vec3::ONE,
            edge_bias: 0.0,
            center_bias: 1.0,
            power: 1.0,
        }
    }
}

/// Flat Lambertian material, no textures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambertMaterial {
    pub ambient: Vec3,
    pub color: Vec3,
    pub emissive: Vec3,
    pub alpha: f32,
}

impl Default for LambertMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            color: Vec3::ONE,
            emissive: Vec3::ZERO,
            alpha: 1.0,
        }
    }
}

/// Blinn/Phong-style material with fresnel channels and a reflection term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhongMaterial {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub emissive: Vec3,
    pub alpha: f32,
    pub shininess: f32,
    pub reflectivity: f32,

    pub ambient_map: Option<TextureRef>,
    pub diffuse_map: Option<TextureRef>,
    pub specular_map: Option<TextureRef>,
    pub emissive_map: Option<TextureRef>,
    pub alpha_map: Option<TextureRef>,
    pub occlusion_map: Option<TextureRef>,
    pub normal_map: Option<TextureRef>,
    pub reflectivity_map: Option<TextureRef>,

    pub diffuse_fresnel: Option<Fresnel>,
    pub specular_fresnel: Option<Fresnel>,
    pub alpha_fresnel: Option<Fresnel>,
    pub emissive_fresnel: Option<Fresnel>,
    pub reflectivity_fresnel: Option<Fresnel>,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            emissive: Vec3::ZERO,
            alpha: 1.0,
            shininess: 80.0,
            reflectivity: 1.0,
            ambient_map: None,
            diffuse_map: None,
            specular_map: None,
            emissive_map: None,
            alpha_map: None,
            occlusion_map: None,
            normal_map: None,
            reflectivity_map: None,
            diffuse_fresnel: None,
            specular_fresnel: None,
            alpha_fresnel: None,
            emissive_fresnel: None,
            reflectivity_fresnel: None,
        }
    }
}

/// glTF metallic/roughness material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetallicMaterial {
    pub base_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    /// Dielectric reflectance factor; specular reflectance is `0.16 * f0²`
    pub specular_f0: f32,
    pub emissive: Vec3,
    pub alpha: f32,

    pub base_color_map: Option<TextureRef>,
    pub metallic_map: Option<TextureRef>,
    pub roughness_map: Option<TextureRef>,
    pub metallic_roughness_map: Option<TextureRef>,
    pub emissive_map: Option<TextureRef>,
    pub occlusion_map: Option<TextureRef>,
    pub alpha_map: Option<TextureRef>,
    pub normal_map: Option<TextureRef>,
}

impl Default for MetallicMaterial {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            metallic: 1.0,
            roughness: 1.0,
            specular_f0: 0.0,
            emissive: Vec3::ZERO,
            alpha: 1.0,
            base_color_map: None,
            metallic_map: None,
            roughness_map: None,
            metallic_roughness_map: None,
            emissive_map: None,
            occlusion_map: None,
            alpha_map: None,
            normal_map: None,
        }
    }
}

/// glTF specular/glossiness material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecularMaterial {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub glossiness: f32,
    pub emissive: Vec3,
    pub alpha: f32,

    pub diffuse_map: Option<TextureRef>,
    pub specular_map: Option<TextureRef>,
    pub glossiness_map: Option<TextureRef>,
    pub specular_glossiness_map: Option<TextureRef>,
    pub emissive_map: Option<TextureRef>,
    pub occlusion_map: Option<TextureRef>,
    pub alpha_map: Option<TextureRef>,
    pub normal_map: Option<TextureRef>,
}

impl Default for SpecularMaterial {
    fn default() -> Self {
        Self {
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            glossiness: 1.0,
            emissive: Vec3::ZERO,
            alpha: 1.0,
            diffuse_map: None,
            specular_map: None,
            glossiness_map: None,
            specular_glossiness_map: None,
            emissive_map: None,
            occlusion_map: None,
            alpha_map: None,
            normal_map: None,
        }
    }
}

/// Shading model payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Material {
    Lambert(LambertMaterial),
    Phong(PhongMaterial),
    MetallicRoughness(MetallicMaterial),
    SpecularGlossiness(SpecularMaterial),
}

/// Material descriptor as handed over by the scene layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    pub id: MaterialId,
    #[serde(default)]
    pub alpha_mode: AlphaMode,
    #[serde(default = "default_alpha_cutoff")]
    pub alpha_cutoff: f32,
    /// Point sprite size in pixels (points topology only)
    #[serde(default = "default_point_size")]
    pub point_size: f32,
    pub material: Material,
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

fn default_point_size() -> f32 {
    2.0
}

impl MaterialDescriptor {
    pub fn new(id: MaterialId, material: Material) -> Self {
        Self {
            id,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: default_alpha_cutoff(),
            point_size: default_point_size(),
            material,
        }
    }

    pub fn kind(&self) -> MaterialKind {
        match &self.material {
            Material::Lambert(_) => MaterialKind::Lambert,
            Material::Phong(_) => MaterialKind::Phong,
            Material::MetallicRoughness(_) => MaterialKind::MetallicRoughness,
            Material::SpecularGlossiness(_) => MaterialKind::SpecularGlossiness,
        }
    }

    /// Texture bound to `channel`, if the shading model has that channel
    pub fn texture(&self, channel: TextureChannel) -> Option<&TextureRef> {
        use TextureChannel as C;
        match &self.material {
            Material::Lambert(_) => None,
            Material::Phong(m) => match channel {
                C::Ambient => m.ambient_map.as_ref(),
                C::Diffuse => m.diffuse_map.as_ref(),
                C::Specular => m.specular_map.as_ref(),
                C::Emissive => m.emissive_map.as_ref(),
                C::Alpha => m.alpha_map.as_ref(),
                C::Occlusion => m.occlusion_map.as_ref(),
                C::Normal => m.normal_map.as_ref(),
                C::Reflectivity => m.reflectivity_map.as_ref(),
                _ => None,
            },
            Material::MetallicRoughness(m) => match channel {
                C::BaseColor => m.base_color_map.as_ref(),
                C::Metallic => m.metallic_map.as_ref(),
                C::Roughness => m.roughness_map.as_ref(),
                C::MetallicRoughness => m.metallic_roughness_map.as_ref(),
                C::Emissive => m.emissive_map.as_ref(),
                C::Occlusion => m.occlusion_map.as_ref(),
                C::Alpha => m.alpha_map.as_ref(),
                C::Normal => m.normal_map.as_ref(),
                _ => None,
            },
            Material::SpecularGlossiness(m) => match channel {
                C::Diffuse => m.diffuse_map.as_ref(),
                C::Specular => m.specular_map.as_ref(),
                C::Glossiness => m.glossiness_map.as_ref(),
                C::SpecularGlossiness => m.specular_glossiness_map.as_ref(),
                C::Emissive => m.emissive_map.as_ref(),
                C::Occlusion => m.occlusion_map.as_ref(),
                C::Alpha => m.alpha_map.as_ref(),
                C::Normal => m.normal_map.as_ref(),
                _ => None,
            },
        }
    }

    /// Fresnel parameters for `channel` (Phong only)
    pub fn fresnel(&self, channel: FresnelChannel) -> Option<&Fresnel> {
        match &self.material {
            Material::Phong(m) => match channel {
                FresnelChannel::Diffuse => m.diffuse_fresnel.as_ref(),
                FresnelChannel::Specular => m.specular_fresnel.as_ref(),
                FresnelChannel::Alpha => m.alpha_fresnel.as_ref(),
                FresnelChannel::Emissive => m.emissive_fresnel.as_ref(),
                FresnelChannel::Reflectivity => m.reflectivity_fresnel.as_ref(),
            },
            Material::Lambert(_) | Material::MetallicRoughness(_) | Material::SpecularGlossiness(_) => {
                None
            }
        }
    }
}
