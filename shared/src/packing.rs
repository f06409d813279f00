//! Vertex data packing utilities
//!
//! Converts f32 vertex arrays into the quantized storage the engine's
//! quantized-geometry path expects:
//! - positions → u16 per component plus a `Mat4` decode matrix
//! - UVs → u16 per component plus a `Mat3` decode matrix
//! - normals → octahedral-encoded i8 pairs (snorm8)
//! - colors → unorm8
//!
//! Also generates smooth vertex normals for geometry that asks for them.

use glam::{Mat3, Mat4, Vec2, Vec3};

// ============================================================================
// Basic Conversion Functions
// ============================================================================

/// Convert f32 to signed normalized 8-bit integer (snorm8)
///
/// Maps f32 range [-1.0, 1.0] to i8 range [-127, 127].
#[inline]
pub fn f32_to_snorm8(value: f32) -> i8 {
    let clamped = value.clamp(-1.0, 1.0);
    (clamped * 127.0).round() as i8
}

/// Convert f32 to unsigned normalized 8-bit integer (unorm8)
///
/// Maps f32 range [0.0, 1.0] to u8 range [0, 255].
#[inline]
pub fn f32_to_unorm8(value: f32) -> u8 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * 255.0).round() as u8
}

// ============================================================================
// Normal Packing
// ============================================================================

/// Encode normalized direction to octahedral coordinates in [-1, 1]²
#[inline]
pub fn encode_octahedral(dir: Vec3) -> (f32, f32) {
    let dir = dir.normalize_or_zero();

    let l1_norm = dir.x.abs() + dir.y.abs() + dir.z.abs();
    if l1_norm == 0.0 {
        return (0.0, 0.0);
    }

    let mut u = dir.x / l1_norm;
    let mut v = dir.y / l1_norm;

    if dir.z < 0.0 {
        let u_abs = u.abs();
        let v_abs = v.abs();
        u = (1.0 - v_abs) * if u >= 0.0 { 1.0 } else { -1.0 };
        v = (1.0 - u_abs) * if v >= 0.0 { 1.0 } else { -1.0 };
    }

    (u, v)
}

/// Decode octahedral coordinates in [-1, 1]² back to normalized direction.
///
/// Mirrors the `octDecode` GLSL function emitted for quantized geometry.
#[inline]
pub fn decode_octahedral(u: f32, v: f32) -> Vec3 {
    let mut dir = Vec3::new(u, v, 1.0 - u.abs() - v.abs());

    if dir.z < 0.0 {
        let old_x = dir.x;
        dir.x = (1.0 - dir.y.abs()) * if old_x >= 0.0 { 1.0 } else { -1.0 };
        dir.y = (1.0 - old_x.abs()) * if dir.y >= 0.0 { 1.0 } else { -1.0 };
    }

    dir.normalize_or_zero()
}

/// Pack a direction into an octahedral snorm8 pair
#[inline]
pub fn pack_octahedral_i8(dir: Vec3) -> [i8; 2] {
    let (u, v) = encode_octahedral(dir);
    [f32_to_snorm8(u), f32_to_snorm8(v)]
}

/// Unpack an octahedral snorm8 pair, as the GPU sees it with normalized fetch
#[inline]
pub fn unpack_octahedral_i8(packed: [i8; 2]) -> Vec3 {
    let u = (packed[0] as f32 / 127.0).max(-1.0);
    let v = (packed[1] as f32 / 127.0).max(-1.0);
    decode_octahedral(u, v)
}

/// Octahedral-encode a flat xyz normal array into a flat i8 array (2 per vertex)
pub fn pack_normals_octahedral(normals: &[f32]) -> Vec<i8> {
    normals
        .chunks_exact(3)
        .flat_map(|n| pack_octahedral_i8(Vec3::new(n[0], n[1], n[2])))
        .collect()
}

/// Pack a flat RGBA array into unorm8
pub fn pack_colors_unorm8(colors: &[f32]) -> Vec<u8> {
    colors.iter().copied().map(f32_to_unorm8).collect()
}

// ============================================================================
// Position / UV Quantization
// ============================================================================

const U16_RANGE: f32 = 65535.0;

fn quantize_axis(value: f32, min: f32, extent: f32) -> u16 {
    if extent <= 0.0 {
        return 0;
    }
    ((value - min) / extent * U16_RANGE).round().clamp(0.0, U16_RANGE) as u16
}

/// Quantize a flat xyz position array to u16 over its bounding box.
///
/// Returns the quantized array and the matrix mapping a quantized position
/// (as a float vec4 with w=1) back to model space.
pub fn quantize_positions(positions: &[f32]) -> (Vec<u16>, Mat4) {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for p in positions.chunks_exact(3) {
        let p = Vec3::new(p[0], p[1], p[2]);
        min = min.min(p);
        max = max.max(p);
    }
    if positions.len() < 3 {
        return (Vec::new(), Mat4::IDENTITY);
    }

    let extent = max - min;
    let quantized = positions
        .chunks_exact(3)
        .flat_map(|p| {
            [
                quantize_axis(p[0], min.x, extent.x),
                quantize_axis(p[1], min.y, extent.y),
                quantize_axis(p[2], min.z, extent.z),
            ]
        })
        .collect();

    let decode = Mat4::from_translation(min) * Mat4::from_scale(extent / U16_RANGE);
    (quantized, decode)
}

/// Quantize a flat uv array to u16 over its bounding rectangle.
///
/// The decode matrix maps `vec3(quantized, 1.0)` back to texture space.
pub fn quantize_uvs(uvs: &[f32]) -> (Vec<u16>, Mat3) {
    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    for uv in uvs.chunks_exact(2) {
        let uv = Vec2::new(uv[0], uv[1]);
        min = min.min(uv);
        max = max.max(uv);
    }
    if uvs.len() < 2 {
        return (Vec::new(), Mat3::IDENTITY);
    }

    let extent = max - min;
    let quantized = uvs
        .chunks_exact(2)
        .flat_map(|uv| {
            [
                quantize_axis(uv[0], min.x, extent.x),
                quantize_axis(uv[1], min.y, extent.y),
            ]
        })
        .collect();

    let decode = Mat3::from_translation(min) * Mat3::from_scale(extent / U16_RANGE);
    (quantized, decode)
}

// ============================================================================
// Normal Generation
// ============================================================================

/// Build smooth per-vertex normals for a triangle list.
///
/// Face normals are area weighted and accumulated on every vertex of the
/// face, then normalized. Without indices, consecutive position triples form
/// the triangles. Degenerate vertices get a zero normal.
pub fn build_vertex_normals(positions: &[f32], indices: Option<&[u32]>) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let position = |i: usize| Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);
    let mut accum = vec![Vec3::ZERO; vertex_count];

    let mut add_face = |a: usize, b: usize, c: usize| {
        if a >= vertex_count || b >= vertex_count || c >= vertex_count {
            return;
        }
        let (pa, pb, pc) = (position(a), position(b), position(c));
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    };

    match indices {
        Some(indices) => {
            for tri in indices.chunks_exact(3) {
                add_face(tri[0] as usize, tri[1] as usize, tri[2] as usize);
            }
        }
        None => {
            for first in (0..vertex_count.saturating_sub(2)).step_by(3) {
                add_face(first, first + 1, first + 2);
            }
        }
    }

    accum
        .into_iter()
        .flat_map(|n| n.normalize_or_zero().to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octahedral_roundtrip_axes() {
        for dir in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            let decoded = unpack_octahedral_i8(pack_octahedral_i8(dir));
            assert!(
                decoded.dot(dir) > 0.99,
                "direction {dir:?} decoded as {decoded:?}"
            );
        }
    }

    #[test]
    fn test_octahedral_zero_vector() {
        assert_eq!(encode_octahedral(Vec3::ZERO), (0.0, 0.0));
    }

    #[test]
    fn test_quantized_positions_decode_back() {
        let positions = [-1.0, 0.0, 2.0, 3.0, 4.0, 2.0, 1.0, 1.0, 2.0];
        let (quantized, decode) = quantize_positions(&positions);
        assert_eq!(quantized.len(), positions.len());

        for (q, p) in quantized.chunks_exact(3).zip(positions.chunks_exact(3)) {
            let decoded = decode.transform_point3(Vec3::new(q[0] as f32, q[1] as f32, q[2] as f32));
            let original = Vec3::new(p[0], p[1], p[2]);
            assert!((decoded - original).length() < 1e-3);
        }
    }

    #[test]
    fn test_quantized_uvs_decode_back() {
        let uvs = [0.0, 0.0, 0.5, 1.0, 1.0, 0.25];
        let (quantized, decode) = quantize_uvs(&uvs);
        let decoded = decode.transform_point2(Vec2::new(quantized[2] as f32, quantized[3] as f32));
        assert!((decoded - Vec2::new(0.5, 1.0)).length() < 1e-4);
    }

    #[test]
    fn test_flat_axis_quantizes_to_zero() {
        let positions = [0.0, 1.0, 5.0, 1.0, 2.0, 5.0];
        let (quantized, decode) = quantize_positions(&positions);
        assert_eq!(quantized[2], 0);
        assert_eq!(quantized[5], 0);
        let decoded = decode.transform_point3(Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(decoded.z, 5.0);
    }

    #[test]
    fn test_vertex_normals_for_ccw_triangle() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = build_vertex_normals(&positions, None);
        assert_eq!(normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_vertex_normals_ignore_out_of_range_indices() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = build_vertex_normals(&positions, Some(&[0, 1, 2, 0, 1, 9]));
        assert_eq!(normals[2], 1.0);
    }

    #[test]
    fn test_unorm8_colors() {
        assert_eq!(pack_colors_unorm8(&[0.0, 1.0, 0.5, 2.0]), vec![0, 255, 128, 255]);
    }
}
