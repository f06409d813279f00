//! Program key types for caching
//!
//! The key is the full structural configuration. Equality compares every
//! field, so two configs that would synthesize different GLSL can never share
//! a program; the xxh3 digest is only a short id for logs and tooling.

use std::fmt;
use std::hash::{Hash, Hasher};

use scenegl_shared::BillboardMode;

use super::features::FeatureConfig;

/// Features of the packed-depth program used to render shadow maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthFeatures {
    pub quantized: bool,
    pub billboard: BillboardMode,
    pub stationary: bool,
    pub is_points: bool,
}

impl DepthFeatures {
    /// Depth features of a draw configuration
    pub fn from_config(config: &FeatureConfig) -> Self {
        Self {
            quantized: config.quantized,
            billboard: config.billboard,
            stationary: config.stationary,
            is_points: config.is_points,
        }
    }
}

/// Key for program cache lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgramKey {
    /// Regular lit/unlit drawable program
    Draw(FeatureConfig),
    /// Shadow map depth program
    ShadowDepth(DepthFeatures),
}

impl ProgramKey {
    /// Stable 64-bit digest of the key
    pub fn digest(&self) -> u64 {
        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn is_shadow_depth(&self) -> bool {
        matches!(self, ProgramKey::ShadowDepth(_))
    }
}

impl From<FeatureConfig> for ProgramKey {
    fn from(config: FeatureConfig) -> Self {
        ProgramKey::Draw(config)
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ProgramKey::Draw(config) => config.material_kind.name(),
            ProgramKey::ShadowDepth(_) => "shadow-depth",
        };
        write!(f, "{kind}:{:016x}", self.digest())
    }
}
