//! scenegl - retained-mode scene renderer core
//!
//! Turns drawables (geometry + material + transform + render modes) and the
//! scene's lights, clip planes and environment maps into GLSL ES programs,
//! shares those programs between drawables with the same structural
//! configuration, and draws everything with minimal state changes.
//!
//! # Architecture
//!
//! **classify** → **ProgramKey** → **ProgramCache** → **DrawRenderer**
//!
//! - [`shader_gen`] reduces a drawable to a [`shader_gen::FeatureConfig`] and
//!   synthesizes GLSL from it
//! - [`graphics`] holds the device seam, the program cache and the draw and
//!   shadow passes
//! - [`Renderer`] ties them together for a host that owns the scene graph

pub mod config;
pub mod graphics;
pub mod renderer;
pub mod scene;
pub mod shader_gen;

pub use config::{ConfigError, FloatPrecision, RendererConfig, ShadowConfig};
pub use renderer::{CompileFailure, Renderer};
pub use scene::{Camera, Drawable, SceneState, Transform};

pub use scenegl_shared as shared;
