use std::cell::Cell;

use glam::Vec3;

use scenegl_shared::{
    BillboardMode, GeometryDescriptor, GeometryId, LightDescriptor, LightSpace, Material,
    MaterialDescriptor, MaterialId, MetallicMaterial, PhongMaterial, RenderModes, VertexData,
};

use super::*;
use crate::graphics::recording::{DeviceCall, RecordingDevice};
use crate::shader_gen::{DepthFeatures, SceneFlags, Stage, classify, synthesize};

fn draw_key(material: Material) -> ProgramKey {
    let mut geometry = GeometryDescriptor::triangles(GeometryId(1), vec![0.0; 9]);
    geometry.normals = Some(VertexData::F32(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]));
    let material = MaterialDescriptor::new(MaterialId(1), material);
    let lights = [LightDescriptor::directional(Vec3::NEG_Y, LightSpace::World)];
    ProgramKey::Draw(classify(
        &geometry,
        &material,
        &lights,
        &[],
        &RenderModes::default(),
        &SceneFlags::default(),
    ))
}

fn metallic_key() -> ProgramKey {
    draw_key(Material::MetallicRoughness(MetallicMaterial::default()))
}

fn phong_key() -> ProgramKey {
    draw_key(Material::Phong(PhongMaterial::default()))
}

fn creates(device: &RecordingDevice) -> usize {
    device.count(|c| matches!(c, DeviceCall::CreateProgram(_)))
}

fn deletes(device: &RecordingDevice) -> usize {
    device.count(|c| matches!(c, DeviceCall::DeleteProgram(_)))
}

#[test]
fn test_miss_compiles_once_and_hit_reuses() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let key = metallic_key();

    let a = cache.acquire(&mut device, &key).unwrap();
    let b = cache.acquire(&mut device, &key).unwrap();
    assert_eq!(a, b);
    assert_eq!(creates(&device), 1);
    assert_eq!(cache.use_count(a), Some(2));
    assert_eq!(cache.use_count_for_key(&key), 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().compiles, 1);
}

#[test]
fn test_hit_does_not_resynthesize() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let key = phong_key();
    let builds = Cell::new(0);
    let build = |key: &ProgramKey, options: &ShaderOptions| {
        builds.set(builds.get() + 1);
        synthesize_key(key, options)
    };

    cache.acquire_with(&mut device, &key, build).unwrap();
    cache.acquire_with(&mut device, &key, build).unwrap();
    cache.acquire_with(&mut device, &key, build).unwrap();
    assert_eq!(builds.get(), 1);
}

#[test]
fn test_refcount_lifecycle() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let key = metallic_key();

    let handles: Vec<_> = (0..3)
        .map(|_| cache.acquire(&mut device, &key).unwrap())
        .collect();
    for (released, handle) in handles.iter().enumerate() {
        assert_eq!(deletes(&device), 0, "deleted after {released} releases");
        cache.release(&mut device, *handle).unwrap();
    }
    assert!(cache.is_empty());
    assert_eq!(deletes(&device), 1);
    assert_eq!(device.live_programs(), 0);
    assert_eq!(cache.use_count_for_key(&key), 0);

    // Next request recompiles
    let again = cache.acquire(&mut device, &key).unwrap();
    assert_eq!(creates(&device), 2);
    assert_eq!(cache.use_count(again), Some(1));
}

#[test]
fn test_stale_handle_release_is_rejected() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let key = metallic_key();

    let handle = cache.acquire(&mut device, &key).unwrap();
    cache.release(&mut device, handle).unwrap();
    assert_eq!(
        cache.release(&mut device, handle),
        Err(ProgramCacheError::StaleHandle(handle))
    );

    // The slot is reused by a different key; the old handle stays stale
    let other = cache.acquire(&mut device, &phong_key()).unwrap();
    assert_eq!(other.index(), handle.index());
    assert_ne!(other, handle);
    assert!(cache.get(handle).is_none());
    assert_eq!(
        cache.release(&mut device, handle),
        Err(ProgramCacheError::StaleHandle(handle))
    );
    assert_eq!(cache.use_count(other), Some(1));
}

#[test]
fn test_unknown_handle_release_is_rejected() {
    let mut device = RecordingDevice::new();
    let mut other_device = RecordingDevice::new();
    let mut issuing = ProgramCache::new(ShaderOptions::default());
    let mut empty = ProgramCache::new(ShaderOptions::default());

    let handle = issuing.acquire(&mut other_device, &metallic_key()).unwrap();
    assert_eq!(
        empty.release(&mut device, handle),
        Err(ProgramCacheError::UnknownHandle(handle))
    );
    assert_eq!(issuing.use_count(handle), Some(1));
}

#[test]
fn test_compile_failure_is_structured_and_not_cached() {
    let mut device = RecordingDevice::new();
    device.fail_compile(Some(Stage::Fragment));
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let key = metallic_key();

    let err = cache.acquire(&mut device, &key).unwrap_err();
    assert!(matches!(err, ProgramError::Compile { stage: Stage::Fragment, .. }));
    assert!(cache.is_empty());
    assert_eq!(cache.stats().failures, 1);

    device.fail_compile(None);
    device.fail_link(true);
    let err = cache.acquire(&mut device, &key).unwrap_err();
    assert!(matches!(err, ProgramError::Link { .. }));
}

#[test]
fn test_distinct_keys_get_distinct_programs() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());

    let a = cache.acquire(&mut device, &metallic_key()).unwrap();
    let b = cache.acquire(&mut device, &phong_key()).unwrap();
    let depth = cache
        .acquire(
            &mut device,
            &ProgramKey::ShadowDepth(DepthFeatures {
                quantized: false,
                billboard: BillboardMode::None,
                stationary: false,
                is_points: false,
            }),
        )
        .unwrap();
    assert_ne!(a, b);
    assert_ne!(b, depth);
    assert_eq!(cache.len(), 3);
    assert_ne!(cache.get(a).unwrap().id, cache.get(b).unwrap().id);
}

#[test]
fn test_bindings_resolve_declared_uniforms() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let key = metallic_key();

    let handle = cache.acquire(&mut device, &key).unwrap();
    let program = cache.get(handle).unwrap();
    assert!(program.bindings.has_uniform("modelMatrix"));
    assert!(program.bindings.has_uniform("materialBaseColor"));
    assert!(program.bindings.has_uniform("lightColor0"));
    assert!(!program.bindings.has_uniform("materialShininess"));
    assert_eq!(
        program.bindings.attribute(scenegl_shared::AttributeKind::Position),
        Some(0)
    );

    let ProgramKey::Draw(config) = &key else {
        unreachable!()
    };
    let expected = synthesize(config, cache.options());
    assert_eq!(cache.source(handle), Some(&expected));
    assert_eq!(program.source_hash, expected.hash);
}

#[test]
fn test_clear_destroys_everything() {
    let mut device = RecordingDevice::new();
    let mut cache = ProgramCache::new(ShaderOptions::default());
    let a = cache.acquire(&mut device, &metallic_key()).unwrap();
    cache.acquire(&mut device, &phong_key()).unwrap();

    cache.clear(&mut device);
    assert!(cache.is_empty());
    assert_eq!(device.live_programs(), 0);
    assert!(cache.get(a).is_none());
    assert_eq!(
        cache.release(&mut device, a),
        Err(ProgramCacheError::StaleHandle(a))
    );
}
