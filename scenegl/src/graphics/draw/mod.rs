//! Draw renderer
//!
//! Draws a batch sorted by `(program, material, transform, geometry)` and
//! only re-issues the state that differs from the previous draw:
//! - program changed: bind it and push the program-global uniforms
//! - material changed: material uniforms and textures
//! - transform changed: model matrices
//! - geometry changed: attribute and index buffers
//!
//! A program switch forgets the other three markers, since the new program
//! holds none of the previous program's state.

mod uniforms;

#[cfg(test)]
mod tests;

pub use uniforms::{FrameGlobals, ShadowMapBinding};
pub(crate) use uniforms::push_transform;

use hashbrown::HashSet;

use scenegl_shared::{DrawableId, GeometryId, MaterialDescriptor, MaterialId, TransformId};

use super::buffer::GeometryBuffers;
use super::device::GraphicsDevice;
use super::program::CompiledProgram;
use super::program_cache::{ProgramCache, ProgramHandle};
use super::texture_units::TextureUnitAllocator;
use crate::scene::Transform;
use crate::shader_gen::{ProgramKey, names};

/// One drawable as submitted to the draw renderer
#[derive(Debug, Clone, Copy)]
pub struct DrawBatchEntry<'a> {
    pub drawable: DrawableId,
    /// `None` when the drawable has no working program
    pub program: Option<ProgramHandle>,
    pub material: &'a MaterialDescriptor,
    pub transform: &'a Transform,
    pub geometry: GeometryId,
    /// `None` when the geometry could not be uploaded
    pub vertex_bufs: Option<&'a GeometryBuffers>,
}

impl DrawBatchEntry<'_> {
    /// Entries without a program sort last
    pub fn sort_key(&self) -> (u32, MaterialId, TransformId, GeometryId) {
        (
            self.program.map_or(u32::MAX, ProgramHandle::index),
            self.material.id,
            self.transform.id,
            self.geometry,
        )
    }
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub program_binds: u32,
    pub material_binds: u32,
    pub transform_binds: u32,
    pub geometry_binds: u32,
    pub draws: u32,
    pub skipped: u32,
}

impl FrameStats {
    pub fn accumulate(&mut self, other: FrameStats) {
        self.program_binds = self.program_binds.wrapping_add(other.program_binds);
        self.material_binds = self.material_binds.wrapping_add(other.material_binds);
        self.transform_binds = self.transform_binds.wrapping_add(other.transform_binds);
        self.geometry_binds = self.geometry_binds.wrapping_add(other.geometry_binds);
        self.draws = self.draws.wrapping_add(other.draws);
        self.skipped = self.skipped.wrapping_add(other.skipped);
    }
}

/// State tracked during a pass to skip redundant binds
#[derive(Debug, Default)]
pub(crate) struct BoundState {
    pub program: Option<ProgramHandle>,
    pub material: Option<MaterialId>,
    pub transform: Option<TransformId>,
    pub geometry: Option<GeometryId>,
}

impl BoundState {
    pub fn bind_program(&mut self, program: ProgramHandle) {
        *self = Self {
            program: Some(program),
            ..Self::default()
        };
    }
}

/// Executes sorted draw batches
#[derive(Debug)]
pub struct DrawRenderer {
    max_texture_units: u32,
    /// Drawables already reported as skipped
    warned: HashSet<DrawableId>,
}

impl DrawRenderer {
    pub fn new(max_texture_units: u32) -> Self {
        Self {
            max_texture_units,
            warned: HashSet::new(),
        }
    }

    pub fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    /// Sort `entries` and draw them
    pub fn render<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        cache: &ProgramCache,
        globals: &FrameGlobals<'_>,
        entries: &mut [DrawBatchEntry<'_>],
    ) -> FrameStats {
        entries.sort_unstable_by_key(|entry| entry.sort_key());

        let mut state = BoundState::default();
        let mut stats = FrameStats::default();
        let mut units = TextureUnitAllocator::new(0, self.max_texture_units);

        for entry in entries.iter() {
            let Some((handle, program, buffers)) = self.resolve(cache, entry) else {
                stats.skipped = stats.skipped.wrapping_add(1);
                continue;
            };
            let Some(ProgramKey::Draw(config)) = cache.key(handle) else {
                stats.skipped = stats.skipped.wrapping_add(1);
                continue;
            };
            let bindings = &program.bindings;

            if state.program != Some(handle) {
                device.use_program(program.id);
                let base = uniforms::push_program_globals(device, bindings, config, globals);
                units = TextureUnitAllocator::new(base, self.max_texture_units);
                state.bind_program(handle);
                stats.program_binds = stats.program_binds.wrapping_add(1);
            }

            if state.material != Some(entry.material.id) {
                uniforms::push_material(device, bindings, config, entry.material, &mut units);
                state.material = Some(entry.material.id);
                stats.material_binds = stats.material_binds.wrapping_add(1);
            }

            if state.transform != Some(entry.transform.id) {
                push_transform(device, bindings, entry.transform, config.has_normals);
                state.transform = Some(entry.transform.id);
                stats.transform_binds = stats.transform_binds.wrapping_add(1);
            }

            if state.geometry != Some(entry.geometry) {
                bind_geometry(device, program, buffers);
                state.geometry = Some(entry.geometry);
                stats.geometry_binds = stats.geometry_binds.wrapping_add(1);
            }

            buffers.draw(device);
            stats.draws = stats.draws.wrapping_add(1);
        }

        stats
    }

    /// Program and buffers of a drawable, or `None` (reported once) when it
    /// cannot be drawn
    fn resolve<'c, 'e>(
        &mut self,
        cache: &'c ProgramCache,
        entry: &DrawBatchEntry<'e>,
    ) -> Option<(ProgramHandle, &'c CompiledProgram, &'e GeometryBuffers)> {
        let reason = match (entry.program, entry.vertex_bufs) {
            (None, _) => "no program",
            (Some(handle), _) if cache.get(handle).is_none() => "stale program handle",
            (_, None) => "no vertex buffers",
            (Some(handle), Some(buffers)) => return Some((handle, cache.get(handle)?, buffers)),
        };
        self.warn_skipped(entry.drawable, reason);
        None
    }

    pub(crate) fn warn_skipped(&mut self, drawable: DrawableId, reason: &str) {
        if self.warned.insert(drawable) {
            tracing::warn!("skipping {drawable}: {reason}");
        }
    }

    /// Allow the next skip of `drawable` to be reported again
    pub fn forget(&mut self, drawable: DrawableId) {
        self.warned.remove(&drawable);
    }
}

/// Attribute and index buffers plus the quantization decode matrices
pub(crate) fn bind_geometry<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    program: &CompiledProgram,
    buffers: &GeometryBuffers,
) {
    buffers.bind(device, &program.bindings);
    if let Some(decode) = buffers.positions_decode {
        program
            .bindings
            .set(device, names::POSITIONS_DECODE_MATRIX, decode);
    }
    if let Some(decode) = buffers.uv_decode {
        program.bindings.set(device, names::UV_DECODE_MATRIX, decode);
    }
}
