use glam::{Mat4, Vec3, Vec4};

use scenegl_shared::{
    AlphaMode, ClipPlane, DrawableId, EnvironmentMaps, GeometryDescriptor, GeometryId,
    LightDescriptor, LightSpace, Material, MaterialDescriptor, MaterialId, MetallicMaterial,
    PhongMaterial, RenderModes, TextureId, TextureRef, TransformId, VertexData,
};

use super::*;
use crate::graphics::device::{DeviceLimits, TextureTarget, UniformValue};
use crate::graphics::recording::{DeviceCall, RecordingDevice};
use crate::scene::Camera;
use crate::shader_gen::{SceneFlags, ShaderOptions, classify};

struct Fixture {
    device: RecordingDevice,
    cache: ProgramCache,
    camera: Camera,
    lights: Vec<LightDescriptor>,
    clips: Vec<ClipPlane>,
    environment: EnvironmentMaps,
    shadow_maps: Vec<ShadowMapBinding>,
}

impl Fixture {
    fn new(lights: Vec<LightDescriptor>) -> Self {
        Self::with_device(RecordingDevice::new(), lights)
    }

    fn with_device(device: RecordingDevice, lights: Vec<LightDescriptor>) -> Self {
        Self {
            device,
            cache: ProgramCache::new(ShaderOptions::default()),
            camera: Camera::new(Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)), Mat4::IDENTITY),
            lights,
            clips: Vec::new(),
            environment: EnvironmentMaps::default(),
            shadow_maps: Vec::new(),
        }
    }

    fn scene_flags(&self) -> SceneFlags {
        SceneFlags {
            has_light_map: self.environment.light_map.is_some(),
            has_reflection_map: self.environment.reflection_map.is_some(),
            ..SceneFlags::default()
        }
    }

    fn program(
        &mut self,
        geometry: &GeometryDescriptor,
        material: &MaterialDescriptor,
    ) -> ProgramHandle {
        let config = classify(
            geometry,
            material,
            &self.lights,
            &self.clips,
            &RenderModes::default(),
            &self.scene_flags(),
        );
        self.cache
            .acquire(&mut self.device, &ProgramKey::Draw(config))
            .unwrap()
    }

    fn upload(&mut self, geometry: &GeometryDescriptor) -> GeometryBuffers {
        GeometryBuffers::upload(&mut self.device, geometry).unwrap()
    }

    fn render(&mut self, renderer: &mut DrawRenderer, entries: &mut [DrawBatchEntry<'_>]) -> FrameStats {
        let globals = FrameGlobals {
            camera: &self.camera,
            lights: &self.lights,
            clips: &self.clips,
            environment: &self.environment,
            shadow_maps: &self.shadow_maps,
            gamma_factor: 2.2,
        };
        renderer.render(&mut self.device, &self.cache, &globals, entries)
    }
}

fn lit_geometry(id: u32) -> GeometryDescriptor {
    let mut geometry = GeometryDescriptor::triangles(
        GeometryId(id),
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    );
    geometry.normals = Some(VertexData::F32(vec![
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    ]));
    geometry
}

fn textured_geometry(id: u32) -> GeometryDescriptor {
    let mut geometry = lit_geometry(id);
    geometry.uv = Some(VertexData::F32(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]));
    geometry
}

fn metallic(id: u32) -> MaterialDescriptor {
    MaterialDescriptor::new(
        MaterialId(id),
        Material::MetallicRoughness(MetallicMaterial::default()),
    )
}

fn phong(id: u32) -> MaterialDescriptor {
    MaterialDescriptor::new(MaterialId(id), Material::Phong(PhongMaterial::default()))
}

fn sun() -> LightDescriptor {
    LightDescriptor::directional(Vec3::new(0.0, -1.0, -1.0), LightSpace::World)
}

fn transform(id: u32) -> Transform {
    Transform::new(TransformId(id), Mat4::from_translation(Vec3::X * id as f32))
}

fn entry<'a>(
    drawable: u32,
    program: Option<ProgramHandle>,
    material: &'a MaterialDescriptor,
    transform: &'a Transform,
    buffers: &'a GeometryBuffers,
) -> DrawBatchEntry<'a> {
    DrawBatchEntry {
        drawable: DrawableId(drawable),
        program,
        material,
        transform,
        geometry: buffers.geometry,
        vertex_bufs: Some(buffers),
    }
}

fn sampler(device: &RecordingDevice, name: &str) -> Option<u32> {
    match device.last_uniform(name) {
        Some(UniformValue::Sampler(unit)) => Some(unit),
        _ => None,
    }
}

#[test]
fn test_sorted_batch_skips_redundant_binds() {
    let mut fx = Fixture::new(vec![sun()]);
    let geometry = lit_geometry(1);
    let buffers = fx.upload(&geometry);
    let (m1, m2, m3) = (metallic(1), phong(2), metallic(3));
    let metallic_program = fx.program(&geometry, &m1);
    let phong_program = fx.program(&geometry, &m2);
    assert_eq!(fx.program(&geometry, &m3), metallic_program);
    let (t1, t2) = (transform(1), transform(2));

    let mut entries = vec![
        entry(1, Some(phong_program), &m2, &t1, &buffers),
        entry(2, Some(metallic_program), &m3, &t1, &buffers),
        entry(3, Some(metallic_program), &m1, &t2, &buffers),
        entry(4, Some(metallic_program), &m1, &t1, &buffers),
    ];
    fx.device.clear_calls();
    let mut renderer = DrawRenderer::new(8);
    let stats = fx.render(&mut renderer, &mut entries);

    let order: Vec<u32> = entries.iter().map(|e| e.drawable.0).collect();
    assert_eq!(order, vec![4, 3, 2, 1]);
    assert_eq!(stats.program_binds, 2);
    assert_eq!(stats.material_binds, 3);
    // t1, t2, t1 under the first program, then t1 again after the switch
    assert_eq!(stats.transform_binds, 4);
    assert_eq!(stats.geometry_binds, 2);
    assert_eq!(stats.draws, 4);
    assert_eq!(stats.skipped, 0);
    assert_eq!(fx.device.count(|c| matches!(c, DeviceCall::UseProgram(_))), 2);
    assert_eq!(
        fx.device.count(|c| matches!(c, DeviceCall::DrawArrays { count: 3, .. })),
        4
    );
}

#[test]
fn test_undrawable_entries_are_skipped_and_reported_once() {
    let mut fx = Fixture::new(vec![sun()]);
    let geometry = lit_geometry(1);
    let buffers = fx.upload(&geometry);
    let material = metallic(1);
    let program = fx.program(&geometry, &material);
    let t = transform(1);

    let mut renderer = DrawRenderer::new(8);
    for _ in 0..2 {
        let mut entries = vec![
            entry(1, None, &material, &t, &buffers),
            DrawBatchEntry {
                vertex_bufs: None,
                ..entry(2, Some(program), &material, &t, &buffers)
            },
            entry(3, Some(program), &material, &t, &buffers),
        ];
        let stats = fx.render(&mut renderer, &mut entries);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.draws, 1);
    }
    assert_eq!(renderer.warned.len(), 2);
    renderer.forget(DrawableId(1));
    assert!(!renderer.warned.contains(&DrawableId(1)));
}

#[test]
fn test_stale_program_handle_is_skipped() {
    let mut fx = Fixture::new(vec![sun()]);
    let geometry = lit_geometry(1);
    let buffers = fx.upload(&geometry);
    let material = metallic(1);
    let program = fx.program(&geometry, &material);
    fx.cache.release(&mut fx.device, program).unwrap();
    let t = transform(1);

    let mut renderer = DrawRenderer::new(8);
    let mut entries = vec![entry(1, Some(program), &material, &t, &buffers)];
    let stats = fx.render(&mut renderer, &mut entries);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.draws, 0);
}

#[test]
fn test_program_switch_pushes_lights_and_camera() {
    let mut fx = Fixture::new(vec![
        LightDescriptor::ambient(Vec3::splat(0.25), 2.0),
        LightDescriptor {
            color: Vec3::new(1.0, 0.5, 0.25),
            ..LightDescriptor::directional(Vec3::NEG_Z, LightSpace::View)
        },
    ]);
    let geometry = lit_geometry(1);
    let buffers = fx.upload(&geometry);
    let material = phong(1);
    let program = fx.program(&geometry, &material);
    let t = transform(3);

    let mut renderer = DrawRenderer::new(8);
    fx.render(&mut renderer, &mut [entry(1, Some(program), &material, &t, &buffers)]);

    let device = &fx.device;
    assert_eq!(
        device.last_uniform("lightAmbient"),
        Some(UniformValue::Vec3(Vec3::splat(0.5)))
    );
    assert_eq!(
        device.last_uniform("lightColor1"),
        Some(UniformValue::Vec3(Vec3::new(1.0, 0.5, 0.25)))
    );
    assert_eq!(
        device.last_uniform("lightDir1"),
        Some(UniformValue::Vec3(Vec3::NEG_Z))
    );
    assert_eq!(device.last_uniform("lightColor0"), None);
    assert_eq!(
        device.last_uniform("viewMatrix"),
        Some(UniformValue::Mat4(fx.camera.view))
    );
    assert_eq!(
        device.last_uniform("modelMatrix"),
        Some(UniformValue::Mat4(t.matrix))
    );
    assert_eq!(
        device.last_uniform("modelNormalMatrix"),
        Some(UniformValue::Mat4(t.normal_matrix()))
    );
    assert_eq!(
        device.last_uniform("materialShininess"),
        Some(UniformValue::Float(80.0))
    );
}

#[test]
fn test_material_textures_follow_shadow_and_environment_units() {
    let mut fx = Fixture::new(vec![sun().with_shadow(Mat4::IDENTITY, Mat4::IDENTITY)]);
    fx.environment.light_map = Some(TextureId(60));
    fx.shadow_maps.push(ShadowMapBinding {
        light_index: 0,
        texture: TextureId(50),
    });
    let geometry = textured_geometry(1);
    let buffers = fx.upload(&geometry);
    let material = MaterialDescriptor::new(
        MaterialId(1),
        Material::MetallicRoughness(MetallicMaterial {
            base_color_map: Some(TextureRef::new(TextureId(70))),
            ..MetallicMaterial::default()
        }),
    );
    let program = fx.program(&geometry, &material);
    let t = transform(1);

    fx.device.clear_calls();
    let mut renderer = DrawRenderer::new(8);
    fx.render(&mut renderer, &mut [entry(1, Some(program), &material, &t, &buffers)]);

    let binds: Vec<(u32, TextureTarget, TextureId)> = fx
        .device
        .calls()
        .iter()
        .filter_map(|c| match c {
            DeviceCall::BindTexture {
                unit,
                target,
                texture,
            } => Some((*unit, *target, *texture)),
            _ => None,
        })
        .collect();
    assert_eq!(
        binds,
        vec![
            (0, TextureTarget::Texture2D, TextureId(50)),
            (1, TextureTarget::CubeMap, TextureId(60)),
            (2, TextureTarget::Texture2D, TextureId(70)),
        ]
    );
    assert_eq!(sampler(&fx.device, "shadowMap0"), Some(0));
    assert_eq!(sampler(&fx.device, "lightMap"), Some(1));
    assert_eq!(sampler(&fx.device, "baseColorMap"), Some(2));
}

#[test]
fn test_texture_units_wrap_to_program_base() {
    let device = RecordingDevice::with_limits(DeviceLimits {
        max_texture_units: 3,
    });
    let mut fx = Fixture::with_device(
        device,
        vec![sun().with_shadow(Mat4::IDENTITY, Mat4::IDENTITY)],
    );
    fx.environment.light_map = Some(TextureId(60));
    let geometry = textured_geometry(1);
    let buffers = fx.upload(&geometry);
    let material = MaterialDescriptor::new(
        MaterialId(1),
        Material::MetallicRoughness(MetallicMaterial {
            base_color_map: Some(TextureRef::new(TextureId(70))),
            emissive_map: Some(TextureRef::new(TextureId(71))),
            ..MetallicMaterial::default()
        }),
    );
    let program = fx.program(&geometry, &material);
    let t = transform(1);

    let mut renderer = DrawRenderer::new(3);
    fx.render(&mut renderer, &mut [entry(1, Some(program), &material, &t, &buffers)]);
    assert_eq!(sampler(&fx.device, "baseColorMap"), Some(2));
    assert_eq!(sampler(&fx.device, "emissiveMap"), Some(2));
}

#[test]
fn test_material_switch_pushes_alpha_mode() {
    let mut fx = Fixture::new(vec![sun()]);
    let geometry = lit_geometry(1);
    let buffers = fx.upload(&geometry);
    let opaque = metallic(1);
    let masked = MaterialDescriptor {
        alpha_mode: AlphaMode::Mask,
        alpha_cutoff: 0.3,
        ..metallic(2)
    };
    let program = fx.program(&geometry, &opaque);
    assert_eq!(fx.program(&geometry, &masked), program);
    let t = transform(1);

    let mut renderer = DrawRenderer::new(8);
    let stats = fx.render(
        &mut renderer,
        &mut [
            entry(1, Some(program), &opaque, &t, &buffers),
            entry(2, Some(program), &masked, &t, &buffers),
        ],
    );
    assert_eq!(stats.program_binds, 1);
    assert_eq!(stats.material_binds, 2);
    assert_eq!(stats.transform_binds, 1);
    assert_eq!(
        fx.device.last_uniform("materialAlphaModeCutoff"),
        Some(UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.3, 0.0)))
    );
}

#[test]
fn test_clip_planes_are_program_globals() {
    let mut fx = Fixture::new(Vec::new());
    fx.clips = vec![ClipPlane::new(Vec3::ZERO, Vec3::Y)];
    let geometry = lit_geometry(1);
    let buffers = fx.upload(&geometry);
    let material = metallic(1);
    let program = fx.program(&geometry, &material);
    let t = transform(1);

    let mut renderer = DrawRenderer::new(8);
    fx.render(&mut renderer, &mut [entry(1, Some(program), &material, &t, &buffers)]);
    assert_eq!(fx.device.last_uniform("clipActive0"), Some(UniformValue::Bool(true)));
    assert_eq!(fx.device.last_uniform("clipDir0"), Some(UniformValue::Vec3(Vec3::Y)));
}
