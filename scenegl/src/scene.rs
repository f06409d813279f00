//! Scene-side inputs of the renderer
//!
//! The renderer does not own a scene graph. The host hands it drawables
//! (geometry, material, transform and render modes) plus the scene-wide
//! camera, light list, clip planes and environment maps.

use glam::Mat4;
use serde::{Deserialize, Serialize};

use scenegl_shared::{
    ClipPlane, DrawableId, EnvironmentMaps, GeometryDescriptor, LightDescriptor,
    MaterialDescriptor, RenderModes, TransformId,
};

/// View and projection matrices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Inverse-transpose of the view matrix, for view-space normals
    pub fn view_normal_matrix(&self) -> Mat4 {
        normal_matrix(self.view)
    }
}

/// Model transform with identity, so consecutive draws sharing it skip the
/// upload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub id: TransformId,
    #[serde(default = "identity")]
    pub matrix: Mat4,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl Transform {
    pub fn new(id: TransformId, matrix: Mat4) -> Self {
        Self { id, matrix }
    }

    pub fn normal_matrix(&self) -> Mat4 {
        normal_matrix(self.matrix)
    }
}

/// Inverse-transpose; singular matrices fall back to identity
pub fn normal_matrix(matrix: Mat4) -> Mat4 {
    if matrix.determinant().abs() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    matrix.inverse().transpose()
}

/// One renderable entity/mesh pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub id: DrawableId,
    pub geometry: GeometryDescriptor,
    pub material: MaterialDescriptor,
    pub transform: Transform,
    #[serde(default)]
    pub modes: RenderModes,
}

/// Scene-wide state shared by every drawable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub lights: Vec<LightDescriptor>,
    #[serde(default)]
    pub clips: Vec<ClipPlane>,
    #[serde(default)]
    pub environment: EnvironmentMaps,
}

impl SceneState {
    /// Summed radiance of every ambient light
    pub fn ambient(&self) -> glam::Vec3 {
        ambient_radiance(&self.lights)
    }

    pub fn has_shadow_casters(&self) -> bool {
        self.lights.iter().any(LightDescriptor::casts_shadow)
    }
}

pub fn ambient_radiance(lights: &[LightDescriptor]) -> glam::Vec3 {
    lights
        .iter()
        .filter(|light| light.is_ambient())
        .map(LightDescriptor::radiance)
        .sum()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use scenegl_shared::LightSpace;

    use super::*;

    #[test]
    fn test_ambient_lights_sum() {
        let scene = SceneState {
            lights: vec![
                LightDescriptor::ambient(Vec3::splat(0.1), 1.0),
                LightDescriptor::directional(Vec3::NEG_Y, LightSpace::World),
                LightDescriptor::ambient(Vec3::new(0.2, 0.0, 0.0), 2.0),
            ],
            ..SceneState::default()
        };
        let ambient = scene.ambient();
        assert!((ambient - Vec3::new(0.5, 0.1, 0.1)).length() < 1e-6);
        assert!(!scene.has_shadow_casters());
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let transform = Transform::new(
            TransformId(1),
            Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)),
        );
        let n = transform.normal_matrix().transform_vector3(Vec3::X);
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(normal_matrix(Mat4::ZERO), Mat4::IDENTITY);
    }
}
