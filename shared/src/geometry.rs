//! Geometry descriptors
//!
//! A geometry is a topology plus a set of vertex attribute arrays. Arrays are
//! either plain `f32` data or quantized storage (u16 positions/UVs, i8
//! octahedral normals, u8 colors) with decode matrices that map the stored
//! integers back to model space.

use glam::{Mat3, Mat4};
use serde::{Deserialize, Serialize};

use crate::ids::GeometryId;

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveTopology {
    /// True for the triangle list/strip/fan variants
    pub fn is_triangles(self) -> bool {
        matches!(
            self,
            PrimitiveTopology::Triangles
                | PrimitiveTopology::TriangleStrip
                | PrimitiveTopology::TriangleFan
        )
    }

    pub fn is_points(self) -> bool {
        self == PrimitiveTopology::Points
    }
}

/// Storage type of one vertex component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    F32,
    U16,
    I8,
    U8,
}

impl ComponentType {
    /// Size of one component in bytes
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::F32 => 4,
            ComponentType::U16 => 2,
            ComponentType::I8 | ComponentType::U8 => 1,
        }
    }
}

/// Which vertex attribute an array feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKind {
    Position,
    Normal,
    Uv,
    Color,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 4] = [
        AttributeKind::Position,
        AttributeKind::Normal,
        AttributeKind::Uv,
        AttributeKind::Color,
    ];

    /// Components per vertex for this attribute.
    ///
    /// Quantized normals are octahedral-encoded and carry two components.
    pub const fn components(self, quantized: bool) -> u32 {
        match self {
            AttributeKind::Position => 3,
            AttributeKind::Normal => {
                if quantized {
                    2
                } else {
                    3
                }
            }
            AttributeKind::Uv => 2,
            AttributeKind::Color => 4,
        }
    }

    /// Whether integer storage is normalized to [0,1] / [-1,1] when fetched.
    ///
    /// Quantized positions and UVs stay unnormalized; the decode matrices
    /// carry the scale.
    pub const fn normalized(self, component: ComponentType) -> bool {
        match (self, component) {
            (_, ComponentType::F32) => false,
            (AttributeKind::Normal, _) | (AttributeKind::Color, _) => true,
            _ => false,
        }
    }
}

/// Raw vertex attribute data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum VertexData {
    F32(Vec<f32>),
    U16(Vec<u16>),
    I8(Vec<i8>),
    U8(Vec<u8>),
}

impl VertexData {
    pub fn component_type(&self) -> ComponentType {
        match self {
            VertexData::F32(_) => ComponentType::F32,
            VertexData::U16(_) => ComponentType::U16,
            VertexData::I8(_) => ComponentType::I8,
            VertexData::U8(_) => ComponentType::U8,
        }
    }

    /// Number of scalar components stored
    pub fn len(&self) -> usize {
        match self {
            VertexData::F32(v) => v.len(),
            VertexData::U16(v) => v.len(),
            VertexData::I8(v) => v.len(),
            VertexData::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte view suitable for a GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexData::F32(v) => bytemuck::cast_slice(v),
            VertexData::U16(v) => bytemuck::cast_slice(v),
            VertexData::I8(v) => bytemuck::cast_slice(v),
            VertexData::U8(v) => v,
        }
    }
}

/// Index data for indexed draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(v) => bytemuck::cast_slice(v),
            IndexData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Indices widened to u32 (for CPU-side processing like normal generation)
    pub fn to_u32(&self) -> Vec<u32> {
        match self {
            IndexData::U16(v) => v.iter().map(|&i| i as u32).collect(),
            IndexData::U32(v) => v.clone(),
        }
    }
}

/// Decode matrices for quantized geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantization {
    /// Maps stored u16 positions back to model space
    pub positions_decode: Mat4,
    /// Maps stored u16 UVs back to texture space
    #[serde(default)]
    pub uv_decode: Option<Mat3>,
}

/// Geometry descriptor as handed over by the scene layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescriptor {
    pub id: GeometryId,
    #[serde(default)]
    pub topology: PrimitiveTopology,
    pub positions: VertexData,
    #[serde(default)]
    pub normals: Option<VertexData>,
    /// Generate smooth vertex normals at upload time when `normals` is absent
    #[serde(default)]
    pub auto_normals: bool,
    #[serde(default)]
    pub uv: Option<VertexData>,
    #[serde(default)]
    pub colors: Option<VertexData>,
    #[serde(default)]
    pub indices: Option<IndexData>,
    #[serde(default)]
    pub quantization: Option<Quantization>,
}

impl GeometryDescriptor {
    /// Plain triangle-list geometry from f32 positions
    pub fn triangles(id: GeometryId, positions: Vec<f32>) -> Self {
        Self {
            id,
            topology: PrimitiveTopology::Triangles,
            positions: VertexData::F32(positions),
            normals: None,
            auto_normals: false,
            uv: None,
            colors: None,
            indices: None,
            quantization: None,
        }
    }

    pub fn is_quantized(&self) -> bool {
        self.quantization.is_some()
    }

    /// Normals are declared explicitly or will be generated at upload
    pub fn declares_normals(&self) -> bool {
        self.normals.as_ref().is_some_and(|n| !n.is_empty()) || self.auto_normals
    }

    pub fn has_uv(&self) -> bool {
        self.uv.as_ref().is_some_and(|uv| !uv.is_empty())
    }

    pub fn has_colors(&self) -> bool {
        self.colors.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_indices(&self) -> bool {
        self.indices.as_ref().is_some_and(|i| !i.is_empty())
    }

    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    /// Number of vertices described by the position array
    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }

    /// Element count for the draw call (indices when present, else vertices)
    pub fn element_count(&self) -> u32 {
        match &self.indices {
            Some(indices) if !indices.is_empty() => indices.len() as u32,
            _ => self.vertex_count(),
        }
    }
}
