//! GPU side of the renderer
//!
//! # Architecture
//!
//! **ProgramCache** (programs) → **ShadowRenderer** (depth maps) →
//! **DrawRenderer** (sorted, state-diffed draws)
//!
//! - Everything talks to the GPU through the [`GraphicsDevice`] trait
//! - `GlowDevice` implements it on OpenGL / GLES / WebGL via glow
//! - `RecordingDevice` implements it without a GPU and logs every call

mod buffer;
pub mod device;
mod draw;
#[cfg(feature = "glow")]
mod glow_device;
mod program;
mod program_cache;
pub mod recording;
mod render_target;
mod shadow;
mod texture_units;

pub use buffer::{AttributeBuffer, GeometryBuffers};
pub use device::{
    AttributeLayout, BufferId, BufferTarget, DeviceError, DeviceLimits, GraphicsDevice, IndexType,
    ProgramId, RenderTargetId, TextureTarget, UniformLocation, UniformValue,
};
pub use draw::{DrawBatchEntry, DrawRenderer, FrameGlobals, FrameStats, ShadowMapBinding};
#[cfg(feature = "glow")]
pub use glow_device::GlowDevice;
pub use program::{CompiledProgram, ProgramBindings, ProgramError};
pub use program_cache::{CacheStats, ProgramCache, ProgramCacheError, ProgramHandle};
pub use recording::{DeviceCall, RecordingDevice};
pub use render_target::RenderTarget;
pub use shadow::{ShadowCaster, ShadowRenderer};
pub use texture_units::TextureUnitAllocator;
