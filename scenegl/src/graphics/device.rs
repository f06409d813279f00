//! GPU device seam
//!
//! Everything the engine asks of the GPU goes through [`GraphicsDevice`].
//! Handles are plain integers allocated by the device, so the cache and the
//! draw renderer stay backend-agnostic and can be driven by the recording
//! device in tests.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use scenegl_shared::{ComponentType, PrimitiveTopology, TextureId};

use super::program::ProgramError;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

define_handle!(
    /// Linked GPU program
    ProgramId
);
define_handle!(
    /// Vertex or index buffer
    BufferId
);
define_handle!(
    /// Offscreen framebuffer with a color texture and depth attachment
    RenderTargetId
);

/// Resolved uniform location inside one program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub slot: u32,
}

/// Value uploaded to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Texture unit index for a sampler
    Sampler(u32),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Buffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

/// How one vertex attribute reads its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLayout {
    pub slot: u32,
    pub components: u32,
    pub component: ComponentType,
    pub normalized: bool,
}

/// Device capabilities the engine adapts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_texture_units: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        // WebGL 1 / GLES 2 guaranteed minimum
        Self {
            max_texture_units: 8,
        }
    }
}

/// Error type for resource creation
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to create buffer: {0}")]
    Buffer(String),
    #[error("failed to create texture: {0}")]
    Texture(String),
    #[error("failed to create render target: {0}")]
    RenderTarget(String),
    #[error("geometry has no positions")]
    EmptyGeometry,
}

/// GPU operations used by the engine.
///
/// Uniform and attribute lookups return `None` for names the driver does not
/// report as active; callers treat that as "nothing to set".
pub trait GraphicsDevice {
    fn limits(&self) -> DeviceLimits;
    /// Size of the default framebuffer when the device was created
    fn surface_size(&self) -> (u32, u32);

    /// Compile both stages and link. `attributes` are bound to fixed slots
    /// before linking.
    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
        attributes: &[(&str, u32)],
    ) -> Result<ProgramId, ProgramError>;
    fn delete_program(&mut self, program: ProgramId);
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32>;
    fn use_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId, DeviceError>;
    fn delete_buffer(&mut self, buffer: BufferId);
    fn bind_vertex_attribute(&mut self, buffer: BufferId, layout: AttributeLayout);
    fn disable_vertex_attribute(&mut self, slot: u32);
    fn bind_index_buffer(&mut self, buffer: BufferId);

    /// RGBA8 2D texture; `pixels` may be omitted for render targets
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId, DeviceError>;
    fn delete_texture(&mut self, texture: TextureId);
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId);

    /// Framebuffer rendering into `color` with its own depth buffer
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        color: TextureId,
    ) -> Result<RenderTargetId, DeviceError>;
    fn delete_render_target(&mut self, target: RenderTargetId);
    /// `None` binds the default framebuffer
    fn bind_render_target(&mut self, target: Option<RenderTargetId>);
    fn set_viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self, color: Option<Vec4>, depth: bool);

    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32);
    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType);
}
