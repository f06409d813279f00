//! Renderer configuration (`scenegl.toml`)
//!
//! Settings that affect generated shader text (precision, shadow kernel,
//! point sprite shape) are frozen into a [`ShaderOptions`] when the renderer
//! is created; they stay constant for the lifetime of its program cache.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::shader_gen::ShaderOptions;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Float precision qualifier emitted in both shader stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FloatPrecision {
    #[default]
    High,
    Medium,
}

impl FloatPrecision {
    pub fn qualifier(self) -> &'static str {
        match self {
            FloatPrecision::High => "highp",
            FloatPrecision::Medium => "mediump",
        }
    }
}

/// Shadow map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// PCF kernel radius in texels; radius 3 samples a 7×7 grid (default: 3)
    #[serde(default = "default_kernel_radius")]
    pub kernel_radius: u32,
    /// Depth comparison bias against shadow acne (default: 0.0007)
    #[serde(default = "default_depth_bias")]
    pub depth_bias: f32,
    /// Shadow map edge length in texels (default: 1024)
    #[serde(default = "default_map_size")]
    pub map_size: u32,
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Vertex colors are gamma encoded (default: false)
    #[serde(default)]
    pub gamma_input: bool,
    /// Encode the final fragment color with `1/gamma_factor` (default: false)
    #[serde(default)]
    pub gamma_output: bool,
    #[serde(default = "default_gamma_factor")]
    pub gamma_factor: f32,
    #[serde(default)]
    pub precision: FloatPrecision,
    #[serde(default)]
    pub shadow: ShadowConfig,
    /// Overrides the device's texture unit limit
    #[serde(default)]
    pub max_texture_units: Option<u32>,
    /// Discard point sprite fragments outside the unit circle (default: true)
    #[serde(default = "default_true")]
    pub round_points: bool,
}

fn default_kernel_radius() -> u32 {
    3
}
fn default_depth_bias() -> f32 {
    0.0007
}
fn default_map_size() -> u32 {
    1024
}
fn default_gamma_factor() -> f32 {
    2.2
}
fn default_true() -> bool {
    true
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            kernel_radius: default_kernel_radius(),
            depth_bias: default_depth_bias(),
            map_size: default_map_size(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            gamma_input: false,
            gamma_output: false,
            gamma_factor: default_gamma_factor(),
            precision: FloatPrecision::default(),
            shadow: ShadowConfig::default(),
            max_texture_units: None,
            round_points: default_true(),
        }
    }
}

impl RendererConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Shader-text affecting settings
    pub fn shader_options(&self) -> ShaderOptions {
        ShaderOptions {
            precision: self.precision,
            shadow_kernel_radius: self.shadow.kernel_radius,
            shadow_depth_bias: self.shadow.depth_bias,
            shadow_map_size: self.shadow.map_size.max(1),
            round_points: self.round_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RendererConfig::default();
        assert!(!config.gamma_output);
        assert!((config.gamma_factor - 2.2).abs() < f32::EPSILON);
        assert_eq!(config.shadow.kernel_radius, 3);
        assert!((config.shadow.depth_bias - 0.0007).abs() < f32::EPSILON);
        assert!(config.round_points);
        assert_eq!(config.max_texture_units, None);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config = RendererConfig::from_toml_str("").unwrap();
        assert_eq!(config, RendererConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial_shadow() {
        let toml_str = r#"
gamma_output = true
precision = "medium"

[shadow]
kernel_radius = 1
"#;
        let config = RendererConfig::from_toml_str(toml_str).unwrap();
        assert!(config.gamma_output);
        assert_eq!(config.precision, FloatPrecision::Medium);
        assert_eq!(config.shadow.kernel_radius, 1);
        assert_eq!(config.shadow.map_size, 1024); // default
    }

    #[test]
    fn test_config_rejects_bad_types() {
        let result = RendererConfig::from_toml_str("gamma_factor = \"bright\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = RendererConfig {
            gamma_input: true,
            max_texture_units: Some(8),
            ..Default::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenegl.toml");
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = RendererConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RendererConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_shader_options_follow_config() {
        let mut config = RendererConfig::default();
        config.shadow.map_size = 0;
        let options = config.shader_options();
        assert_eq!(options.shadow_map_size, 1);
        assert_eq!(options.precision.qualifier(), "highp");
    }
}
