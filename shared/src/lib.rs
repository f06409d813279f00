//! Shared types for the scenegl engine.
//!
//! These are the descriptors the scene-graph layer hands to the engine core:
//! geometry, materials, lights, clip planes and per-drawable render modes.
//! The engine reads them but never mutates them. Identity is carried by the
//! id newtypes in [`ids`]; a changed id means "re-classify this drawable".

pub mod clip;
pub mod geometry;
pub mod ids;
pub mod light;
pub mod material;
pub mod modes;
pub mod packing;

pub use clip::ClipPlane;
pub use geometry::{
    AttributeKind, ComponentType, GeometryDescriptor, IndexData, PrimitiveTopology, Quantization,
    VertexData,
};
pub use ids::{DrawableId, GeometryId, MaterialId, TextureId, TransformId};
pub use light::{
    Attenuation, EnvironmentMaps, LightDescriptor, LightKind, LightSpace, LightType,
};
pub use material::{
    AlphaMode, Fresnel, FresnelChannel, LambertMaterial, Material, MaterialDescriptor,
    MaterialKind, MetallicMaterial, PhongMaterial, SpecularMaterial, TextureChannel,
    TextureEncoding, TextureRef,
};
pub use modes::{BillboardMode, RenderModes};
