//! GLSL identifiers shared by the synthesizers and the uniform binder.
//!
//! Anything the draw renderer looks up by name lives here so the two sides
//! cannot drift apart.

use scenegl_shared::{AttributeKind, FresnelChannel, TextureChannel};

pub const MODEL_MATRIX: &str = "modelMatrix";
pub const VIEW_MATRIX: &str = "viewMatrix";
pub const PROJ_MATRIX: &str = "projMatrix";
pub const MODEL_NORMAL_MATRIX: &str = "modelNormalMatrix";
pub const VIEW_NORMAL_MATRIX: &str = "viewNormalMatrix";
pub const POSITIONS_DECODE_MATRIX: &str = "positionsDecodeMatrix";
pub const UV_DECODE_MATRIX: &str = "uvDecodeMatrix";
pub const POINT_SIZE: &str = "pointSize";
pub const GAMMA_FACTOR: &str = "gammaFactor";
pub const LIGHT_AMBIENT: &str = "lightAmbient";
pub const LIGHT_MAP: &str = "lightMap";
pub const REFLECTION_MAP: &str = "reflectionMap";

pub const MATERIAL_AMBIENT: &str = "materialAmbient";
pub const MATERIAL_COLOR: &str = "materialColor";
pub const MATERIAL_DIFFUSE: &str = "materialDiffuse";
pub const MATERIAL_SPECULAR: &str = "materialSpecular";
pub const MATERIAL_EMISSIVE: &str = "materialEmissive";
pub const MATERIAL_ALPHA: &str = "materialAlpha";
pub const MATERIAL_SHININESS: &str = "materialShininess";
pub const MATERIAL_REFLECTIVITY: &str = "materialReflectivity";
pub const MATERIAL_BASE_COLOR: &str = "materialBaseColor";
pub const MATERIAL_METALLIC: &str = "materialMetallic";
pub const MATERIAL_ROUGHNESS: &str = "materialRoughness";
pub const MATERIAL_SPECULAR_F0: &str = "materialSpecularF0";
pub const MATERIAL_GLOSSINESS: &str = "materialGlossiness";
pub const MATERIAL_ALPHA_MODE_CUTOFF: &str = "materialAlphaModeCutoff";

pub const V_VIEW_POSITION: &str = "vViewPosition";
pub const V_VIEW_NORMAL: &str = "vViewNormal";
pub const V_UV: &str = "vUV";
pub const V_COLOR: &str = "vColor";
pub const V_WORLD_POSITION: &str = "vWorldPosition";

/// Vertex attribute name
pub fn attribute(kind: AttributeKind) -> &'static str {
    match kind {
        AttributeKind::Position => "position",
        AttributeKind::Normal => "normal",
        AttributeKind::Uv => "uv",
        AttributeKind::Color => "color",
    }
}

/// Fixed attribute slot bound before linking
pub fn attribute_slot(kind: AttributeKind) -> u32 {
    match kind {
        AttributeKind::Position => 0,
        AttributeKind::Normal => 1,
        AttributeKind::Uv => 2,
        AttributeKind::Color => 3,
    }
}

pub fn light_color(i: u32) -> String {
    format!("lightColor{i}")
}

pub fn light_dir(i: u32) -> String {
    format!("lightDir{i}")
}

pub fn light_pos(i: u32) -> String {
    format!("lightPos{i}")
}

pub fn light_attenuation(i: u32) -> String {
    format!("lightAttenuation{i}")
}

pub fn light_cutoff(i: u32) -> String {
    format!("lightCutoff{i}")
}

/// Varying carrying a world-space light's view-space reverse direction (xyz)
/// and distance (w)
pub fn light_varying(i: u32) -> String {
    format!("vViewLightReverseDirAndDist{i}")
}

/// Varying carrying a world-space spot light's view-space cone axis
pub fn spot_dir_varying(i: u32) -> String {
    format!("vViewSpotDir{i}")
}

pub fn shadow_map(i: u32) -> String {
    format!("shadowMap{i}")
}

pub fn shadow_view_matrix(i: u32) -> String {
    format!("shadowViewMatrix{i}")
}

pub fn shadow_proj_matrix(i: u32) -> String {
    format!("shadowProjMatrix{i}")
}

pub fn shadow_pos_varying(i: u32) -> String {
    format!("vShadowPosFromLight{i}")
}

pub fn clip_active(i: u32) -> String {
    format!("clipActive{i}")
}

pub fn clip_pos(i: u32) -> String {
    format!("clipPos{i}")
}

pub fn clip_dir(i: u32) -> String {
    format!("clipDir{i}")
}

pub fn texture_map(channel: TextureChannel) -> String {
    format!("{}Map", channel.stem())
}

pub fn texture_matrix(channel: TextureChannel) -> String {
    format!("{}MapMatrix", channel.stem())
}

/// Local holding the decoded texel of `channel`
pub fn texel(channel: TextureChannel) -> String {
    format!("{}Texel", channel.stem())
}

/// Fresnel uniform names for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FresnelNames {
    pub edge_bias: String,
    pub center_bias: String,
    pub power: String,
    pub edge_color: String,
    pub center_color: String,
}

pub fn fresnel(channel: FresnelChannel) -> FresnelNames {
    let stem = channel.stem();
    FresnelNames {
        edge_bias: format!("{stem}FresnelEdgeBias"),
        center_bias: format!("{stem}FresnelCenterBias"),
        power: format!("{stem}FresnelPower"),
        edge_color: format!("{stem}FresnelEdgeColor"),
        center_color: format!("{stem}FresnelCenterColor"),
    }
}
