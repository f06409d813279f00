//! GPU vertex and index buffers for one geometry
//!
//! Quantized geometry keeps its compact storage on the GPU (u16 positions and
//! UVs, i8 octahedral normals, u8 colors); the shader decodes it. Missing
//! normals are generated at upload time when the geometry asks for them.

use glam::{Mat3, Mat4, Vec3};
use smallvec::SmallVec;

use scenegl_shared::packing::{build_vertex_normals, pack_normals_octahedral};
use scenegl_shared::{
    AttributeKind, GeometryDescriptor, GeometryId, IndexData, PrimitiveTopology, VertexData,
};

use super::device::{AttributeLayout, BufferId, BufferTarget, DeviceError, GraphicsDevice, IndexType};
use super::program::ProgramBindings;
use crate::shader_gen::names;

/// One uploaded vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBuffer {
    pub kind: AttributeKind,
    pub buffer: BufferId,
    pub layout: AttributeLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexBuffer {
    buffer: BufferId,
    index_type: IndexType,
    count: u32,
}

/// Uploaded buffers of a geometry plus what the draw call needs
#[derive(Debug, Clone)]
pub struct GeometryBuffers {
    pub geometry: GeometryId,
    pub topology: PrimitiveTopology,
    pub vertex_count: u32,
    pub positions_decode: Option<Mat4>,
    pub uv_decode: Option<Mat3>,
    attributes: SmallVec<[AttributeBuffer; 4]>,
    index: Option<IndexBuffer>,
}

impl GeometryBuffers {
    /// Upload every attribute array and the index array
    pub fn upload<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        geometry: &GeometryDescriptor,
    ) -> Result<Self, DeviceError> {
        if !geometry.has_positions() {
            return Err(DeviceError::EmptyGeometry);
        }

        let quantized = geometry.is_quantized();
        let normals = resolve_normals(geometry);
        let arrays = [
            (AttributeKind::Position, Some(&geometry.positions)),
            (AttributeKind::Normal, normals.as_ref()),
            (AttributeKind::Uv, geometry.uv.as_ref()),
            (AttributeKind::Color, geometry.colors.as_ref()),
        ];

        let mut attributes: SmallVec<[AttributeBuffer; 4]> = SmallVec::new();
        for (kind, data) in arrays {
            let Some(data) = data.filter(|d| !d.is_empty()) else {
                continue;
            };
            let buffer = match device.create_buffer(BufferTarget::Vertex, data.as_bytes()) {
                Ok(buffer) => buffer,
                Err(e) => {
                    for attr in &attributes {
                        device.delete_buffer(attr.buffer);
                    }
                    return Err(e);
                }
            };
            let component = data.component_type();
            attributes.push(AttributeBuffer {
                kind,
                buffer,
                layout: AttributeLayout {
                    slot: names::attribute_slot(kind),
                    components: kind.components(quantized),
                    component,
                    normalized: kind.normalized(component),
                },
            });
        }

        let index = match geometry.indices.as_ref().filter(|i| !i.is_empty()) {
            Some(indices) => match device.create_buffer(BufferTarget::Index, indices.as_bytes()) {
                Ok(buffer) => Some(IndexBuffer {
                    buffer,
                    index_type: match indices {
                        IndexData::U16(_) => IndexType::U16,
                        IndexData::U32(_) => IndexType::U32,
                    },
                    count: indices.len() as u32,
                }),
                Err(e) => {
                    for attr in &attributes {
                        device.delete_buffer(attr.buffer);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        Ok(Self {
            geometry: geometry.id,
            topology: geometry.topology,
            vertex_count: geometry.vertex_count(),
            positions_decode: geometry.quantization.map(|q| q.positions_decode),
            uv_decode: geometry.quantization.and_then(|q| q.uv_decode),
            attributes,
            index,
        })
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<&AttributeBuffer> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Bind the arrays `bindings` reads; every other slot is disabled
    pub fn bind<D: GraphicsDevice + ?Sized>(&self, device: &mut D, bindings: &ProgramBindings) {
        for kind in AttributeKind::ALL {
            match (bindings.attribute(kind), self.attribute(kind)) {
                (Some(_), Some(attr)) => device.bind_vertex_attribute(attr.buffer, attr.layout),
                _ => device.disable_vertex_attribute(names::attribute_slot(kind)),
            }
        }
        if let Some(index) = self.index {
            device.bind_index_buffer(index.buffer);
        }
    }

    /// Indexed draw when indices exist, array draw otherwise
    pub fn draw<D: GraphicsDevice + ?Sized>(&self, device: &mut D) {
        match self.index {
            Some(index) => device.draw_elements(self.topology, index.count, index.index_type),
            None => device.draw_arrays(self.topology, 0, self.vertex_count),
        }
    }

    pub fn destroy<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        for attr in &self.attributes {
            device.delete_buffer(attr.buffer);
        }
        if let Some(index) = self.index {
            device.delete_buffer(index.buffer);
        }
    }
}

/// Normal array in the storage the shader expects, generating it if asked
fn resolve_normals(geometry: &GeometryDescriptor) -> Option<VertexData> {
    let quantized = geometry.is_quantized();
    match &geometry.normals {
        Some(VertexData::F32(normals)) if quantized && !normals.is_empty() => {
            Some(VertexData::I8(pack_normals_octahedral(normals)))
        }
        Some(normals) if !normals.is_empty() => Some(normals.clone()),
        _ if geometry.auto_normals && geometry.topology.is_triangles() => {
            let positions = decoded_positions(geometry)?;
            let indices = geometry.indices.as_ref().map(IndexData::to_u32);
            let normals = build_vertex_normals(&positions, indices.as_deref());
            tracing::debug!(
                "generated {} vertex normals for {}",
                normals.len() / 3,
                geometry.id
            );
            Some(if quantized {
                VertexData::I8(pack_normals_octahedral(&normals))
            } else {
                VertexData::F32(normals)
            })
        }
        _ => None,
    }
}

/// Model-space f32 positions, decoding quantized storage
fn decoded_positions(geometry: &GeometryDescriptor) -> Option<Vec<f32>> {
    match (&geometry.positions, geometry.quantization) {
        (VertexData::F32(positions), _) => Some(positions.clone()),
        (VertexData::U16(positions), Some(quantization)) => Some(
            positions
                .chunks_exact(3)
                .flat_map(|p| {
                    let stored = Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32);
                    quantization
                        .positions_decode
                        .transform_point3(stored)
                        .to_array()
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use scenegl_shared::packing::quantize_positions;
    use scenegl_shared::{ComponentType, Quantization};

    use super::*;
    use crate::graphics::recording::{DeviceCall, RecordingDevice};

    fn triangle() -> GeometryDescriptor {
        GeometryDescriptor::triangles(
            GeometryId(4),
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        )
    }

    #[test]
    fn test_upload_generates_normals_on_request() {
        let mut device = RecordingDevice::new();
        let mut geometry = triangle();
        geometry.auto_normals = true;

        let buffers = GeometryBuffers::upload(&mut device, &geometry).unwrap();
        let normal = buffers.attribute(AttributeKind::Normal).unwrap();
        assert_eq!(normal.layout.components, 3);
        assert_eq!(normal.layout.component, ComponentType::F32);
        assert!(!buffers.is_indexed());
        assert_eq!(
            device.count(|c| matches!(c, DeviceCall::CreateBuffer { size: 36, .. })),
            2
        );
    }

    #[test]
    fn test_quantized_upload_keeps_compact_storage() {
        let mut device = RecordingDevice::new();
        let (positions, decode) =
            quantize_positions(&[0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let mut geometry = triangle();
        geometry.positions = VertexData::U16(positions);
        geometry.normals = Some(VertexData::F32(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]));
        geometry.indices = Some(IndexData::U16(vec![0, 1, 2]));
        geometry.quantization = Some(Quantization {
            positions_decode: decode,
            uv_decode: None,
        });

        let buffers = GeometryBuffers::upload(&mut device, &geometry).unwrap();
        let position = buffers.attribute(AttributeKind::Position).unwrap();
        assert_eq!(position.layout.component, ComponentType::U16);
        assert!(!position.layout.normalized);
        let normal = buffers.attribute(AttributeKind::Normal).unwrap();
        assert_eq!(normal.layout.component, ComponentType::I8);
        assert_eq!(normal.layout.components, 2);
        assert!(normal.layout.normalized);
        assert_eq!(buffers.positions_decode, Some(decode));

        buffers.draw(&mut device);
        assert!(device.calls().iter().any(|c| matches!(
            c,
            DeviceCall::DrawElements {
                count: 3,
                index_type: IndexType::U16,
                ..
            }
        )));
    }

    #[test]
    fn test_quantized_positions_decode_for_auto_normals() {
        let (positions, decode) =
            quantize_positions(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0, 0.0]);
        let mut geometry = triangle();
        geometry.positions = VertexData::U16(positions);
        geometry.quantization = Some(Quantization {
            positions_decode: decode,
            uv_decode: None,
        });
        let decoded = decoded_positions(&geometry).unwrap();
        assert!((decoded[3] - 4.0).abs() < 1e-3);
        assert!((decoded[7] - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_geometry_is_rejected() {
        let mut device = RecordingDevice::new();
        let geometry = GeometryDescriptor::triangles(GeometryId(9), Vec::new());
        assert!(matches!(
            GeometryBuffers::upload(&mut device, &geometry),
            Err(DeviceError::EmptyGeometry)
        ));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_destroy_releases_every_buffer() {
        let mut device = RecordingDevice::new();
        let mut geometry = triangle();
        geometry.indices = Some(IndexData::U32(vec![0, 1, 2]));
        geometry.uv = Some(VertexData::F32(vec![0.0; 6]));
        let buffers = GeometryBuffers::upload(&mut device, &geometry).unwrap();
        buffers.destroy(&mut device);
        assert_eq!(device.count(|c| matches!(c, DeviceCall::DeleteBuffer(_))), 3);
    }
}
