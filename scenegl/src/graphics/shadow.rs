//! Shadow map pass
//!
//! Every shadow-casting light owns a render target. Casters are drawn into
//! it with the packed-depth program using the light's view and projection
//! matrices. The pass uses the draw renderer's diffing minus the material
//! level: program, then transform, then geometry.

use glam::Vec4;

use scenegl_shared::{DrawableId, GeometryId, LightDescriptor, TransformId};

use super::buffer::GeometryBuffers;
use super::device::{DeviceError, GraphicsDevice};
use super::draw::{BoundState, FrameStats, ShadowMapBinding, bind_geometry, push_transform};
use super::program_cache::{ProgramCache, ProgramHandle};
use super::render_target::RenderTarget;
use crate::scene::Transform;
use crate::shader_gen::names;

/// A drawable as seen by the shadow pass
#[derive(Debug, Clone, Copy)]
pub struct ShadowCaster<'a> {
    pub drawable: DrawableId,
    /// Packed-depth program
    pub program: Option<ProgramHandle>,
    pub transform: &'a Transform,
    pub geometry: GeometryId,
    pub vertex_bufs: Option<&'a GeometryBuffers>,
    pub point_size: f32,
}

impl ShadowCaster<'_> {
    pub fn sort_key(&self) -> (u32, TransformId, GeometryId) {
        (
            self.program.map_or(u32::MAX, ProgramHandle::index),
            self.transform.id,
            self.geometry,
        )
    }
}

#[derive(Debug)]
struct ShadowMap {
    light_index: u32,
    target: RenderTarget,
}

/// Owns the shadow maps and renders them
#[derive(Debug)]
pub struct ShadowRenderer {
    map_size: u32,
    maps: Vec<ShadowMap>,
}

impl ShadowRenderer {
    pub fn new(map_size: u32) -> Self {
        Self {
            map_size: map_size.max(1),
            maps: Vec::new(),
        }
    }

    pub fn map_size(&self) -> u32 {
        self.map_size
    }

    /// Create or destroy maps so each shadow-casting light has exactly one
    pub fn sync<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        lights: &[LightDescriptor],
    ) -> Result<(), DeviceError> {
        let wanted: Vec<u32> = lights
            .iter()
            .enumerate()
            .filter(|(_, light)| light.casts_shadow())
            .map(|(index, _)| index as u32)
            .collect();

        let (kept, dropped): (Vec<ShadowMap>, Vec<ShadowMap>) = std::mem::take(&mut self.maps)
            .into_iter()
            .partition(|map| wanted.contains(&map.light_index));
        for map in dropped {
            map.target.destroy(device);
        }
        self.maps = kept;

        for light_index in wanted {
            if self.maps.iter().any(|map| map.light_index == light_index) {
                continue;
            }
            let target = RenderTarget::new(device, self.map_size, self.map_size)?;
            self.maps.push(ShadowMap {
                light_index,
                target,
            });
        }
        self.maps.sort_unstable_by_key(|map| map.light_index);
        Ok(())
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    /// Shadow map textures for the draw pass
    pub fn bindings(&self) -> Vec<ShadowMapBinding> {
        self.maps
            .iter()
            .map(|map| ShadowMapBinding {
                light_index: map.light_index,
                texture: map.target.color,
            })
            .collect()
    }

    /// Render every shadow map, then rebind the default framebuffer
    pub fn render<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        cache: &ProgramCache,
        lights: &[LightDescriptor],
        casters: &mut [ShadowCaster<'_>],
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        if self.maps.is_empty() {
            return stats;
        }
        casters.sort_unstable_by_key(|caster| caster.sort_key());

        for map in &self.maps {
            let Some(light) = lights.get(map.light_index as usize) else {
                continue;
            };
            map.target.bind(device);
            device.clear(Some(Vec4::ONE), true);

            let mut state = BoundState::default();
            for caster in casters.iter() {
                let (Some(handle), Some(buffers)) = (caster.program, caster.vertex_bufs) else {
                    stats.skipped = stats.skipped.wrapping_add(1);
                    continue;
                };
                let Some(program) = cache.get(handle) else {
                    stats.skipped = stats.skipped.wrapping_add(1);
                    continue;
                };
                let bindings = &program.bindings;

                if state.program != Some(handle) {
                    device.use_program(program.id);
                    bindings.set(device, names::VIEW_MATRIX, light.shadow_view);
                    bindings.set(device, names::PROJ_MATRIX, light.shadow_projection);
                    state.bind_program(handle);
                    stats.program_binds = stats.program_binds.wrapping_add(1);
                }

                if state.transform != Some(caster.transform.id) {
                    push_transform(device, bindings, caster.transform, false);
                    state.transform = Some(caster.transform.id);
                    stats.transform_binds = stats.transform_binds.wrapping_add(1);
                }

                if state.geometry != Some(caster.geometry) {
                    bind_geometry(device, program, buffers);
                    state.geometry = Some(caster.geometry);
                    stats.geometry_binds = stats.geometry_binds.wrapping_add(1);
                }

                bindings.set(device, names::POINT_SIZE, caster.point_size);
                buffers.draw(device);
                stats.draws = stats.draws.wrapping_add(1);
            }
        }

        device.bind_render_target(None);
        stats
    }

    pub fn destroy<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for map in self.maps.drain(..) {
            map.target.destroy(device);
        }
    }
}
