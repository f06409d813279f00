//! Shader source generation
//!
//! `classify` reduces a drawable to a [`FeatureConfig`]; `synthesize` turns a
//! config into GLSL ES 1.00 vertex and fragment sources. Both are pure: the
//! same inputs always produce byte-identical output.

mod brdf;
mod builder;
mod depth;
mod features;
mod fragment;
mod key;
pub mod names;
mod snippets;
mod vertex;


use std::hash::Hasher;

pub use brdf::{
    MIN_ROUGHNESS, alpha_mode_cutoff, clamp_roughness, dielectric_specular,
    glossiness_roughness, metallic_diffuse_color, metallic_specular_color,
    specular_glossiness_diffuse_color,
};
pub use builder::{Declaration, Qualifier, Stage, StageBuilder};
pub use features::{
    FeatureConfig, FresnelFlags, LightSlot, SceneFlags, TextureFeature, TextureFlags, classify,
};
pub use key::{DepthFeatures, ProgramKey};

use crate::config::FloatPrecision;

/// Options that shape generated text but are not per-drawable.
///
/// Fixed for the lifetime of a program cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderOptions {
    pub precision: FloatPrecision,
    pub shadow_kernel_radius: u32,
    pub shadow_depth_bias: f32,
    pub shadow_map_size: u32,
    pub round_points: bool,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self {
            precision: FloatPrecision::High,
            shadow_kernel_radius: 3,
            shadow_depth_bias: 0.0007,
            shadow_map_size: 1024,
            round_points: true,
        }
    }
}

/// Synthesized program source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub vertex: Vec<String>,
    pub fragment: Vec<String>,
    /// xxh3 of both stages
    pub hash: u64,
}

impl ProgramSource {
    fn new(vertex: Vec<String>, fragment: Vec<String>) -> Self {
        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        for line in vertex.iter().chain(fragment.iter()) {
            hasher.write(line.as_bytes());
            hasher.write_u8(b'\n');
        }
        Self {
            vertex,
            fragment,
            hash: hasher.finish(),
        }
    }

    pub fn vertex_text(&self) -> String {
        self.vertex.join("\n")
    }

    pub fn fragment_text(&self) -> String {
        self.fragment.join("\n")
    }

    /// Source lines of one stage
    pub fn stage(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Fragment => &self.fragment,
        }
    }
}

/// Generate the draw program for `config`
pub fn synthesize(config: &FeatureConfig, options: &ShaderOptions) -> ProgramSource {
    let (vertex, fragment) = build_stages(config, options);
    ProgramSource::new(vertex.finish(), fragment.finish())
}

/// Generate the packed-depth program used to render shadow maps
pub fn synthesize_shadow_depth(features: &DepthFeatures, options: &ShaderOptions) -> ProgramSource {
    let vertex = depth::synthesize_depth_vertex(features, options);
    let fragment = depth::synthesize_depth_fragment(options);
    ProgramSource::new(vertex.finish(), fragment.finish())
}

/// Generate whichever program `key` names
pub fn synthesize_key(key: &ProgramKey, options: &ShaderOptions) -> ProgramSource {
    match key {
        ProgramKey::Draw(config) => synthesize(config, options),
        ProgramKey::ShadowDepth(features) => synthesize_shadow_depth(features, options),
    }
}

/// Both stage builders before finishing; exposes declarations for binding and
/// tests
pub fn build_stages(config: &FeatureConfig, options: &ShaderOptions) -> (StageBuilder, StageBuilder) {
    (
        vertex::synthesize_vertex(config, options),
        fragment::synthesize_fragment(config, options),
    )
}
