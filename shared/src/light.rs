//! Light descriptors
//!
//! The scene's light list is ordered. A light's position in that list is its
//! slot index and names its uniforms (`lightColor1`, `lightDir1`, ...).

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::ids::TextureId;

/// Coordinate space a light's position/direction is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSpace {
    /// Fixed in the world; transformed by the view matrix in the vertex stage
    #[default]
    World,
    /// Fixed relative to the camera (headlights)
    View,
}

/// Distance falloff `1 / (constant + linear*d + quadratic*d²)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    pub fn to_array(self) -> [f32; 3] {
        [self.constant, self.linear, self.quadratic]
    }
}

/// Light type tag without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightType {
    Ambient,
    Directional,
    Point,
    Spot,
}

/// Light type with its geometric payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightKind {
    Ambient,
    Directional {
        dir: Vec3,
    },
    Point {
        pos: Vec3,
        #[serde(default)]
        attenuation: Attenuation,
    },
    Spot {
        pos: Vec3,
        dir: Vec3,
        #[serde(default)]
        attenuation: Attenuation,
        /// Cosine of the cone half-angle
        cutoff: f32,
    },
}

impl LightKind {
    pub fn light_type(&self) -> LightType {
        match self {
            LightKind::Ambient => LightType::Ambient,
            LightKind::Directional { .. } => LightType::Directional,
            LightKind::Point { .. } => LightType::Point,
            LightKind::Spot { .. } => LightType::Spot,
        }
    }
}

/// One entry of the scene light list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDescriptor {
    #[serde(flatten)]
    pub kind: LightKind,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default)]
    pub space: LightSpace,
    /// Casts shadows onto shadow-receiving drawables
    #[serde(default)]
    pub shadow: bool,
    /// Light view matrix used for the shadow depth pass and lookups
    #[serde(default = "identity")]
    pub shadow_view: Mat4,
    #[serde(default = "identity")]
    pub shadow_projection: Mat4,
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_intensity() -> f32 {
    1.0
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl LightDescriptor {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: default_color(),
            intensity: default_intensity(),
            space: LightSpace::World,
            shadow: false,
            shadow_view: Mat4::IDENTITY,
            shadow_projection: Mat4::IDENTITY,
        }
    }

    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            ..Self::new(LightKind::Ambient)
        }
    }

    pub fn directional(dir: Vec3, space: LightSpace) -> Self {
        Self {
            space,
            ..Self::new(LightKind::Directional { dir })
        }
    }

    pub fn point(pos: Vec3, attenuation: Attenuation) -> Self {
        Self::new(LightKind::Point { pos, attenuation })
    }

    pub fn with_shadow(mut self, view: Mat4, projection: Mat4) -> Self {
        self.shadow = true;
        self.shadow_view = view;
        self.shadow_projection = projection;
        self
    }

    pub fn light_type(&self) -> LightType {
        self.kind.light_type()
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient)
    }

    /// Only non-ambient lights can cast shadows
    pub fn casts_shadow(&self) -> bool {
        self.shadow && !self.is_ambient()
    }

    /// Color premultiplied by intensity, as uploaded
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

/// Scene-level environment cube maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentMaps {
    /// Diffuse irradiance cube
    #[serde(default)]
    pub light_map: Option<TextureId>,
    /// Specular reflection cube
    #[serde(default)]
    pub reflection_map: Option<TextureId>,
}

impl EnvironmentMaps {
    /// Number of texture units the maps occupy
    pub fn unit_count(&self) -> u32 {
        self.light_map.is_some() as u32 + self.reflection_map.is_some() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_lights_never_cast_shadows() {
        let mut ambient = LightDescriptor::ambient(Vec3::splat(0.2), 1.0);
        ambient.shadow = true;
        assert!(!ambient.casts_shadow());
    }

    #[test]
    fn test_radiance_scales_color() {
        let light = LightDescriptor {
            color: Vec3::new(1.0, 0.5, 0.0),
            intensity: 2.0,
            ..LightDescriptor::directional(Vec3::NEG_Z, LightSpace::View)
        };
        assert_eq!(light.radiance(), Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_light_list_entries_parse_flattened() {
        let json = r#"{ "type": "spot", "pos": [0.0, 1.0, 0.0], "dir": [0.0, -1.0, 0.0], "cutoff": 0.9, "shadow": true }"#;
        let light: LightDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(light.light_type(), LightType::Spot);
        assert!(light.casts_shadow());
        assert_eq!(light.space, LightSpace::World);
    }

    #[test]
    fn test_environment_units_count_present_maps() {
        let maps = EnvironmentMaps {
            light_map: Some(TextureId(1)),
            reflection_map: None,
        };
        assert_eq!(maps.unit_count(), 1);
    }
}
