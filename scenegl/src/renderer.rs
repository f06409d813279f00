//! Renderer facade
//!
//! Owns the device, the program cache, the uploaded geometry and the
//! per-drawable program handles. Scene changes only mark drawables dirty;
//! classification and program acquisition happen in [`Renderer::compile`],
//! which [`Renderer::render`] runs before drawing.

use glam::Vec4;
use hashbrown::HashMap;

use scenegl_shared::{
    ClipPlane, DrawableId, EnvironmentMaps, GeometryDescriptor, GeometryId, LightDescriptor,
    MaterialDescriptor, RenderModes,
};

use crate::config::RendererConfig;
use crate::graphics::{
    DeviceError, DrawBatchEntry, DrawRenderer, FrameGlobals, FrameStats, GeometryBuffers,
    GraphicsDevice, ProgramCache, ProgramError, ProgramHandle, ShadowCaster, ShadowRenderer,
};
use crate::scene::{Camera, Drawable, SceneState, Transform};
use crate::shader_gen::{DepthFeatures, ProgramKey, ProgramSource, SceneFlags, classify};

/// A drawable left without a program by a compile or link failure
#[derive(Debug, Clone, PartialEq)]
pub struct CompileFailure {
    pub drawable: DrawableId,
    pub key: ProgramKey,
    pub error: ProgramError,
}

/// A program reference plus the key that last failed, which is not retried
#[derive(Debug, Default)]
struct ProgramSlot {
    handle: Option<ProgramHandle>,
    failed: Option<ProgramKey>,
}

#[derive(Debug)]
struct DrawableState {
    drawable: Drawable,
    draw: ProgramSlot,
    depth: ProgramSlot,
    dirty: bool,
}

/// Uploaded geometry shared by every drawable with the same geometry id
#[derive(Debug)]
struct GeometryEntry {
    /// `None` when there was nothing to upload
    buffers: Option<GeometryBuffers>,
    users: u32,
}

/// Retained-mode renderer over a [`GraphicsDevice`]
pub struct Renderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    cache: ProgramCache,
    draw: DrawRenderer,
    shadows: ShadowRenderer,
    scene: SceneState,
    drawables: HashMap<DrawableId, DrawableState>,
    geometries: HashMap<GeometryId, GeometryEntry>,
    /// Main pass viewport, restored after the shadow pass
    viewport: (u32, u32),
    clear_color: Vec4,
    shadow_stats: FrameStats,
}

impl<D: GraphicsDevice> Renderer<D> {
    pub fn new(device: D, config: RendererConfig) -> Self {
        let max_texture_units = config
            .max_texture_units
            .unwrap_or(device.limits().max_texture_units);
        tracing::info!(
            "Renderer created: {} texture units, {} precision, {}px shadow maps",
            max_texture_units,
            config.precision.qualifier(),
            config.shadow.map_size
        );
        let viewport = device.surface_size();
        Self {
            cache: ProgramCache::new(config.shader_options()),
            draw: DrawRenderer::new(max_texture_units),
            shadows: ShadowRenderer::new(config.shadow.map_size),
            device,
            config,
            scene: SceneState::default(),
            drawables: HashMap::new(),
            geometries: HashMap::new(),
            viewport,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shadow_stats: FrameStats::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn contains(&self, id: DrawableId) -> bool {
        self.drawables.contains_key(&id)
    }

    // =================================================================
    // Drawables
    // =================================================================

    /// Add a drawable, replacing any drawable with the same id
    pub fn add_drawable(&mut self, drawable: Drawable) -> Result<(), DeviceError> {
        self.remove_drawable(drawable.id);
        self.retain_geometry(&drawable.geometry)?;
        tracing::debug!("Added {} ({})", drawable.id, drawable.geometry.id);
        self.drawables.insert(
            drawable.id,
            DrawableState {
                drawable,
                draw: ProgramSlot::default(),
                depth: ProgramSlot::default(),
                dirty: true,
            },
        );
        Ok(())
    }

    /// Remove a drawable and drop its program and geometry references
    pub fn remove_drawable(&mut self, id: DrawableId) -> bool {
        let Some(state) = self.drawables.remove(&id) else {
            return false;
        };
        for handle in [state.draw.handle, state.depth.handle].into_iter().flatten() {
            // Failures are logged by the cache
            let _ = self.cache.release(&mut self.device, handle);
        }
        self.release_geometry(state.drawable.geometry.id);
        self.draw.forget(id);
        true
    }

    /// Replace the geometry of a drawable
    pub fn set_geometry(
        &mut self,
        id: DrawableId,
        geometry: GeometryDescriptor,
    ) -> Result<bool, DeviceError> {
        let Some(old) = self.drawables.get(&id).map(|s| s.drawable.geometry.id) else {
            return Ok(false);
        };
        self.retain_geometry(&geometry)?;
        self.release_geometry(old);
        if let Some(state) = self.drawables.get_mut(&id) {
            state.drawable.geometry = geometry;
            state.dirty = true;
        }
        self.draw.forget(id);
        Ok(true)
    }

    pub fn set_material(&mut self, id: DrawableId, material: MaterialDescriptor) -> bool {
        self.update(id, |drawable| drawable.material = material)
    }

    pub fn set_modes(&mut self, id: DrawableId, modes: RenderModes) -> bool {
        self.update(id, |drawable| drawable.modes = modes)
    }

    /// Move a drawable; never changes its program
    pub fn set_transform(&mut self, id: DrawableId, transform: Transform) -> bool {
        match self.drawables.get_mut(&id) {
            Some(state) => {
                state.drawable.transform = transform;
                true
            }
            None => false,
        }
    }

    fn update(&mut self, id: DrawableId, apply: impl FnOnce(&mut Drawable)) -> bool {
        let Some(state) = self.drawables.get_mut(&id) else {
            return false;
        };
        apply(&mut state.drawable);
        state.dirty = true;
        self.draw.forget(id);
        true
    }

    fn retain_geometry(&mut self, geometry: &GeometryDescriptor) -> Result<(), DeviceError> {
        if let Some(entry) = self.geometries.get_mut(&geometry.id) {
            entry.users += 1;
            return Ok(());
        }
        let buffers = match GeometryBuffers::upload(&mut self.device, geometry) {
            Ok(buffers) => Some(buffers),
            Err(DeviceError::EmptyGeometry) => {
                tracing::debug!("{} has no positions, nothing uploaded", geometry.id);
                None
            }
            Err(e) => return Err(e),
        };
        self.geometries
            .insert(geometry.id, GeometryEntry { buffers, users: 1 });
        Ok(())
    }

    fn release_geometry(&mut self, id: GeometryId) {
        let Some(entry) = self.geometries.get_mut(&id) else {
            return;
        };
        entry.users -= 1;
        if entry.users > 0 {
            return;
        }
        if let Some(buffers) = self.geometries.remove(&id).and_then(|entry| entry.buffers) {
            buffers.destroy(&mut self.device);
        }
    }

    // =================================================================
    // Scene-wide state
    // =================================================================

    pub fn set_camera(&mut self, camera: Camera) {
        self.scene.camera = camera;
    }

    /// Replace the light list; shadow maps follow the shadow-casting lights
    pub fn set_lights(&mut self, lights: Vec<LightDescriptor>) -> Result<(), DeviceError> {
        self.scene.lights = lights;
        self.mark_all_dirty();
        self.shadows.sync(&mut self.device, &self.scene.lights)
    }

    pub fn set_clips(&mut self, clips: Vec<ClipPlane>) {
        self.scene.clips = clips;
        self.mark_all_dirty();
    }

    pub fn set_environment(&mut self, environment: EnvironmentMaps) {
        self.scene.environment = environment;
        self.mark_all_dirty();
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn mark_all_dirty(&mut self) {
        for state in self.drawables.values_mut() {
            state.dirty = true;
        }
    }

    fn scene_flags(&self) -> SceneFlags {
        SceneFlags {
            gamma_input: self.config.gamma_input,
            gamma_output: self.config.gamma_output,
            has_light_map: self.scene.environment.light_map.is_some(),
            has_reflection_map: self.scene.environment.reflection_map.is_some(),
        }
    }

    // =================================================================
    // Programs
    // =================================================================

    /// Classify dirty drawables and point them at their programs.
    ///
    /// Returns the drawables whose program failed to build this call. A key
    /// that failed once is not rebuilt until the drawable's key changes.
    pub fn compile(&mut self) -> Vec<CompileFailure> {
        let flags = self.scene_flags();
        let shadows = self.scene.has_shadow_casters();
        let mut failures = Vec::new();

        for (&id, state) in self.drawables.iter_mut() {
            if !state.dirty {
                continue;
            }
            state.dirty = false;

            let drawable = &state.drawable;
            let config = classify(
                &drawable.geometry,
                &drawable.material,
                &self.scene.lights,
                &self.scene.clips,
                &drawable.modes,
                &flags,
            );
            let depth_key =
                shadows.then(|| ProgramKey::ShadowDepth(DepthFeatures::from_config(&config)));
            let key = ProgramKey::Draw(config);

            let targets = [(&mut state.draw, Some(key)), (&mut state.depth, depth_key)];
            for (slot, key) in targets {
                if let Err(error) = retarget(&mut self.cache, &mut self.device, slot, key.as_ref()) {
                    failures.extend(key.map(|key| CompileFailure {
                        drawable: id,
                        key,
                        error,
                    }));
                }
            }
        }

        failures
    }

    pub fn program_of(&self, id: DrawableId) -> Option<ProgramHandle> {
        self.drawables.get(&id)?.draw.handle
    }

    pub fn program_key(&self, id: DrawableId) -> Option<&ProgramKey> {
        self.cache.key(self.program_of(id)?)
    }

    pub fn program_source(&self, id: DrawableId) -> Option<&ProgramSource> {
        self.cache.source(self.program_of(id)?)
    }

    // =================================================================
    // Frame
    // =================================================================

    /// Compile, render the shadow maps, then draw every drawable.
    ///
    /// Returns the main pass counters; see [`Renderer::shadow_stats`] for the
    /// shadow pass.
    pub fn render(&mut self) -> FrameStats {
        let failures = self.compile();
        if !failures.is_empty() {
            tracing::debug!("{} programs failed to build this frame", failures.len());
        }

        let geometries = &self.geometries;
        let mut casters: Vec<ShadowCaster<'_>> = self
            .drawables
            .iter()
            .map(|(&id, state)| ShadowCaster {
                drawable: id,
                program: state.depth.handle,
                transform: &state.drawable.transform,
                geometry: state.drawable.geometry.id,
                vertex_bufs: uploaded(geometries, state.drawable.geometry.id),
                point_size: state.drawable.material.point_size,
            })
            .collect();
        self.shadow_stats = self.shadows.render(
            &mut self.device,
            &self.cache,
            &self.scene.lights,
            &mut casters,
        );

        self.device.bind_render_target(None);
        let (width, height) = self.viewport;
        self.device.set_viewport(width, height);
        self.device.clear(Some(self.clear_color), true);

        let shadow_maps = self.shadows.bindings();
        let globals = FrameGlobals {
            camera: &self.scene.camera,
            lights: &self.scene.lights,
            clips: &self.scene.clips,
            environment: &self.scene.environment,
            shadow_maps: &shadow_maps,
            gamma_factor: self.config.gamma_factor,
        };
        let mut entries: Vec<DrawBatchEntry<'_>> = self
            .drawables
            .iter()
            .map(|(&id, state)| DrawBatchEntry {
                drawable: id,
                program: state.draw.handle,
                material: &state.drawable.material,
                transform: &state.drawable.transform,
                geometry: state.drawable.geometry.id,
                vertex_bufs: uploaded(geometries, state.drawable.geometry.id),
            })
            .collect();
        self.draw
            .render(&mut self.device, &self.cache, &globals, &mut entries)
    }

    /// Counters of the last shadow pass
    pub fn shadow_stats(&self) -> FrameStats {
        self.shadow_stats
    }

    pub fn shadow_map_count(&self) -> usize {
        self.shadows.map_count()
    }

    /// Free every GPU resource and hand the device back
    pub fn destroy(mut self) -> D {
        let ids: Vec<DrawableId> = self.drawables.keys().copied().collect();
        for id in ids {
            self.remove_drawable(id);
        }
        self.cache.clear(&mut self.device);
        self.shadows.destroy(&mut self.device);
        self.device
    }
}

fn uploaded(
    geometries: &HashMap<GeometryId, GeometryEntry>,
    id: GeometryId,
) -> Option<&GeometryBuffers> {
    geometries.get(&id)?.buffers.as_ref()
}

/// Point `slot` at the program for `key`.
///
/// The new program is acquired before the old one is released so a program
/// shared with other drawables survives the switch.
fn retarget<D: GraphicsDevice + ?Sized>(
    cache: &mut ProgramCache,
    device: &mut D,
    slot: &mut ProgramSlot,
    key: Option<&ProgramKey>,
) -> Result<(), ProgramError> {
    let Some(key) = key else {
        slot.failed = None;
        if let Some(old) = slot.handle.take() {
            let _ = cache.release(device, old);
        }
        return Ok(());
    };
    if slot.handle.and_then(|h| cache.key(h)) == Some(key) {
        return Ok(());
    }
    if slot.failed.as_ref() == Some(key) {
        return Ok(());
    }

    let acquired = cache.acquire(device, key);
    if let Some(old) = slot.handle.take() {
        let _ = cache.release(device, old);
    }
    match acquired {
        Ok(handle) => {
            slot.handle = Some(handle);
            slot.failed = None;
            Ok(())
        }
        Err(error) => {
            slot.failed = Some(key.clone());
            Err(error)
        }
    }
}
