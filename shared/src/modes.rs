//! Per-drawable render modes

use serde::{Deserialize, Serialize};

/// Billboarding applied to the model/view matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillboardMode {
    #[default]
    None,
    /// Always faces the camera
    Spherical,
    /// Faces the camera around the Y axis only
    Cylindrical,
}

/// Render mode flags attached to a drawable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderModes {
    pub receive_shadow: bool,
    pub billboard: BillboardMode,
    /// Ignore camera translation (skyboxes)
    pub stationary: bool,
    /// Honor the scene clip planes
    pub clippable: bool,
}

impl Default for RenderModes {
    fn default() -> Self {
        Self {
            receive_shadow: true,
            billboard: BillboardMode::None,
            stationary: false,
            clippable: true,
        }
    }
}
