//! CPU mirrors of the material terms the fragment stage computes.
//!
//! These follow the generated GLSL line for line. The draw renderer uses
//! [`alpha_mode_cutoff`] to fill `materialAlphaModeCutoff`; the rest exist so
//! the energy rules can be checked without a GPU.

use glam::{Vec3, Vec4};

use scenegl_shared::AlphaMode;

pub const MIN_ROUGHNESS: f32 = 0.04;

/// `0.16 * f0²`
pub fn dielectric_specular(specular_f0: f32) -> f32 {
    0.16 * specular_f0 * specular_f0
}

pub fn clamp_roughness(roughness: f32) -> f32 {
    roughness.clamp(MIN_ROUGHNESS, 1.0)
}

/// Diffuse color of a metallic/roughness surface
pub fn metallic_diffuse_color(base_color: Vec3, metallic: f32, specular_f0: f32) -> Vec3 {
    base_color * (1.0 - dielectric_specular(specular_f0)) * (1.0 - metallic)
}

/// Specular color of a metallic/roughness surface
pub fn metallic_specular_color(base_color: Vec3, metallic: f32, specular_f0: f32) -> Vec3 {
    Vec3::splat(dielectric_specular(specular_f0)).lerp(base_color, metallic)
}

/// Diffuse color of a specular/glossiness surface
pub fn specular_glossiness_diffuse_color(diffuse: Vec3, specular: Vec3) -> Vec3 {
    diffuse * (1.0 - specular.max_element())
}

pub fn glossiness_roughness(glossiness: f32) -> f32 {
    clamp_roughness(1.0 - glossiness)
}

/// `(scale, bias, cutoff, 0)` applied as `alpha = alpha * scale + bias`,
/// discarding below `cutoff`
pub fn alpha_mode_cutoff(mode: AlphaMode, cutoff: f32) -> Vec4 {
    match mode {
        AlphaMode::Opaque => Vec4::new(0.0, 1.0, 0.0, 0.0),
        AlphaMode::Mask => Vec4::new(1.0, 0.0, cutoff, 0.0),
        AlphaMode::Blend => Vec4::new(1.0, 0.0, 0.0, 0.0),
    }
}
