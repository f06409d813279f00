//! End-to-end tests of the renderer facade on the recording device.

use glam::{Mat4, Vec3};

use scenegl::graphics::{DeviceCall, RecordingDevice};
use scenegl::shader_gen::{ProgramKey, Stage};
use scenegl::shared::{
    DrawableId, GeometryDescriptor, GeometryId, LightDescriptor, LightSpace, Material,
    MaterialDescriptor, MaterialId, MetallicMaterial, PhongMaterial, PrimitiveTopology,
    RenderModes, TransformId, VertexData,
};
use scenegl::{Camera, Drawable, Renderer, RendererConfig, Transform};

fn lit_geometry(id: u32) -> GeometryDescriptor {
    let mut geometry = GeometryDescriptor::triangles(
        GeometryId(id),
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    );
    geometry.auto_normals = true;
    geometry
}

fn points_geometry(id: u32) -> GeometryDescriptor {
    GeometryDescriptor {
        topology: PrimitiveTopology::Points,
        ..GeometryDescriptor::triangles(GeometryId(id), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
    }
}

fn metallic(id: u32, base_color: Vec3) -> MaterialDescriptor {
    MaterialDescriptor::new(
        MaterialId(id),
        Material::MetallicRoughness(MetallicMaterial {
            base_color,
            ..MetallicMaterial::default()
        }),
    )
}

fn drawable(id: u32, geometry: GeometryDescriptor, material: MaterialDescriptor) -> Drawable {
    Drawable {
        id: DrawableId(id),
        geometry,
        material,
        transform: Transform::new(TransformId(id), Mat4::from_translation(Vec3::X * id as f32)),
        modes: RenderModes::default(),
    }
}

fn sun() -> LightDescriptor {
    LightDescriptor::directional(Vec3::new(0.0, -1.0, -1.0), LightSpace::World)
}

fn renderer() -> Renderer<RecordingDevice> {
    let mut renderer = Renderer::new(RecordingDevice::new(), RendererConfig::default());
    renderer.set_camera(Camera::new(
        Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y),
        Mat4::perspective_rh_gl(1.0, 1.5, 0.1, 100.0),
    ));
    renderer.set_viewport(640, 480);
    renderer
}

fn creates(renderer: &Renderer<RecordingDevice>) -> usize {
    renderer
        .device()
        .count(|c| matches!(c, DeviceCall::CreateProgram(_)))
}

fn has_line(lines: &[String], expected: &str) -> bool {
    lines.iter().any(|line| line.trim() == expected)
}

#[test]
fn test_same_configuration_shares_one_program() {
    let mut renderer = renderer();
    renderer.set_lights(vec![sun()]).unwrap();
    renderer
        .add_drawable(drawable(1, lit_geometry(1), metallic(1, Vec3::X)))
        .unwrap();
    renderer
        .add_drawable(drawable(2, lit_geometry(2), metallic(2, Vec3::Y)))
        .unwrap();

    assert!(renderer.compile().is_empty());
    let a = renderer.program_of(DrawableId(1)).unwrap();
    let b = renderer.program_of(DrawableId(2)).unwrap();
    assert_eq!(a, b);
    assert_eq!(renderer.cache().use_count(a), Some(2));
    assert_eq!(creates(&renderer), 1);

    let stats = renderer.render();
    assert_eq!(stats.draws, 2);
    assert_eq!(stats.program_binds, 1);
    assert_eq!(stats.material_binds, 2);
    assert_eq!(stats.skipped, 0);
}

#[test]
fn test_removal_releases_and_readd_recompiles() {
    let mut renderer = renderer();
    renderer.set_lights(vec![sun()]).unwrap();
    for id in 1..=3 {
        renderer
            .add_drawable(drawable(id, lit_geometry(7), metallic(id, Vec3::ONE)))
            .unwrap();
    }
    renderer.render();
    let handle = renderer.program_of(DrawableId(1)).unwrap();
    assert_eq!(renderer.cache().use_count(handle), Some(3));

    assert!(renderer.remove_drawable(DrawableId(1)));
    assert!(renderer.remove_drawable(DrawableId(2)));
    assert!(!renderer.remove_drawable(DrawableId(2)));
    assert_eq!(renderer.cache().use_count(handle), Some(1));
    assert!(renderer.remove_drawable(DrawableId(3)));
    assert!(renderer.cache().is_empty());
    assert_eq!(renderer.device().live_programs(), 0);
    // Shared geometry buffers go with the last user
    assert_eq!(
        renderer
            .device()
            .count(|c| matches!(c, DeviceCall::DeleteBuffer(_))),
        2
    );

    renderer
        .add_drawable(drawable(4, lit_geometry(7), metallic(4, Vec3::ONE)))
        .unwrap();
    renderer.render();
    assert_eq!(creates(&renderer), 2);
}

#[test]
fn test_shadow_receipt_changes_the_program() {
    let mut renderer = renderer();
    let view = Mat4::look_at_rh(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Z);
    let projection = Mat4::orthographic_rh_gl(-5.0, 5.0, -5.0, 5.0, 0.1, 20.0);
    renderer
        .set_lights(vec![sun().with_shadow(view, projection)])
        .unwrap();
    assert_eq!(renderer.shadow_map_count(), 1);

    renderer
        .add_drawable(drawable(1, lit_geometry(1), metallic(1, Vec3::ONE)))
        .unwrap();
    let mut shadowless = drawable(2, lit_geometry(2), metallic(2, Vec3::ONE));
    shadowless.modes.receive_shadow = false;
    renderer.add_drawable(shadowless).unwrap();

    let stats = renderer.render();
    assert_eq!(stats.draws, 2);
    assert_eq!(stats.program_binds, 2);
    assert_ne!(
        renderer.program_of(DrawableId(1)),
        renderer.program_of(DrawableId(2))
    );

    let receiving = renderer.program_source(DrawableId(1)).unwrap();
    assert!(has_line(&receiving.fragment, "uniform sampler2D shadowMap0;"));
    assert!(has_line(
        &receiving.fragment,
        "for (float x = -3.0; x <= 3.0; x += 1.0) {"
    ));
    assert!(receiving.fragment_text().contains("D_GGX"));
    let plain = renderer.program_source(DrawableId(2)).unwrap();
    assert!(!plain.fragment_text().contains("shadowMap"));

    // Both drawables cast into the map with the shared depth program
    let shadow = renderer.shadow_stats();
    assert_eq!(shadow.draws, 2);
    assert_eq!(shadow.program_binds, 1);
    assert!(
        renderer
            .cache()
            .contains(&ProgramKey::ShadowDepth(scenegl::shader_gen::DepthFeatures {
                quantized: false,
                billboard: Default::default(),
                stationary: false,
                is_points: false,
            }))
    );
}

#[test]
fn test_main_pass_restores_surface_viewport_after_shadows() {
    // No set_viewport: the main pass falls back to the device surface size
    let mut renderer = Renderer::new(
        RecordingDevice::new().with_surface_size(800, 600),
        RendererConfig::default(),
    );
    let view = Mat4::look_at_rh(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Z);
    renderer
        .set_lights(vec![sun().with_shadow(view, Mat4::IDENTITY)])
        .unwrap();
    renderer
        .add_drawable(drawable(1, lit_geometry(1), metallic(1, Vec3::ONE)))
        .unwrap();
    renderer.render();

    let calls = renderer.device().calls();
    assert!(calls.contains(&DeviceCall::Viewport(1024, 1024)));
    let last_draw = calls
        .iter()
        .rposition(|c| matches!(c, DeviceCall::DrawArrays { .. } | DeviceCall::DrawElements { .. }))
        .unwrap();
    let main_viewport = calls[..last_draw]
        .iter()
        .rev()
        .find(|c| matches!(c, DeviceCall::Viewport(..)));
    assert_eq!(main_viewport, Some(&DeviceCall::Viewport(800, 600)));

    renderer.set_viewport(320, 200);
    renderer.render();
    assert_eq!(
        renderer
            .device()
            .calls()
            .iter()
            .rev()
            .find(|c| matches!(c, DeviceCall::Viewport(..))),
        Some(&DeviceCall::Viewport(320, 200))
    );
}

#[test]
fn test_points_render_round_sprites_without_normals() {
    let mut renderer = renderer();
    renderer.set_lights(vec![sun()]).unwrap();
    renderer
        .add_drawable(drawable(1, points_geometry(1), metallic(1, Vec3::ONE)))
        .unwrap();
    let stats = renderer.render();
    assert_eq!(stats.draws, 1);

    let Some(ProgramKey::Draw(config)) = renderer.program_key(DrawableId(1)) else {
        panic!("points drawable has no draw program");
    };
    assert!(!config.has_normals);
    assert!(config.is_points);
    let source = renderer.program_source(DrawableId(1)).unwrap();
    assert!(has_line(&source.vertex, "gl_PointSize = pointSize;"));
    assert!(source.fragment_text().contains("dot(cxy, cxy) > 1.0"));
    assert!(
        renderer
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::DrawArrays { topology: PrimitiveTopology::Points, count: 2 }))
    );
}

#[test]
fn test_ambient_and_view_space_light() {
    let mut renderer = renderer();
    renderer
        .set_lights(vec![
            LightDescriptor::ambient(Vec3::splat(0.2), 1.0),
            LightDescriptor::directional(Vec3::NEG_Z, LightSpace::View),
        ])
        .unwrap();
    renderer
        .add_drawable(drawable(
            1,
            lit_geometry(1),
            MaterialDescriptor::new(MaterialId(1), Material::Phong(PhongMaterial::default())),
        ))
        .unwrap();
    renderer.render();

    let source = renderer.program_source(DrawableId(1)).unwrap();
    let ambient = source
        .fragment
        .iter()
        .filter(|line| line.trim() == "uniform vec3 lightAmbient;")
        .count();
    assert_eq!(ambient, 1);
    assert!(has_line(&source.fragment, "uniform vec3 lightColor1;"));
    assert!(has_line(&source.fragment, "uniform vec3 lightDir1;"));
    assert!(!source.fragment_text().contains("lightColor0"));
}

#[test]
fn test_failed_program_is_not_retried_until_key_changes() {
    let mut renderer = renderer();
    renderer.set_lights(vec![sun()]).unwrap();
    renderer.device_mut().fail_compile(Some(Stage::Fragment));
    renderer
        .add_drawable(drawable(1, lit_geometry(1), metallic(1, Vec3::ONE)))
        .unwrap();

    let failures = renderer.compile();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].drawable, DrawableId(1));
    assert!(matches!(
        failures[0].error,
        scenegl::graphics::ProgramError::Compile {
            stage: Stage::Fragment,
            ..
        }
    ));

    let stats = renderer.render();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.draws, 0);

    // Same key: no second attempt even once the device recovers
    renderer.device_mut().fail_compile(None);
    renderer.set_clips(Vec::new());
    assert!(renderer.compile().is_empty());
    assert_eq!(renderer.cache().stats().failures, 1);
    assert!(renderer.program_of(DrawableId(1)).is_none());

    // A different key builds normally
    renderer.set_material(
        DrawableId(1),
        MaterialDescriptor::new(MaterialId(1), Material::Phong(PhongMaterial::default())),
    );
    assert!(renderer.compile().is_empty());
    assert!(renderer.program_of(DrawableId(1)).is_some());
    assert_eq!(renderer.render().draws, 1);
}

#[test]
fn test_transform_update_keeps_the_program() {
    let mut renderer = renderer();
    renderer.set_lights(vec![sun()]).unwrap();
    renderer
        .add_drawable(drawable(1, lit_geometry(1), metallic(1, Vec3::ONE)))
        .unwrap();
    renderer.render();
    let before = renderer.program_of(DrawableId(1));

    assert!(renderer.set_transform(
        DrawableId(1),
        Transform::new(TransformId(1), Mat4::from_rotation_y(0.5)),
    ));
    renderer.render();
    assert_eq!(renderer.program_of(DrawableId(1)), before);
    assert_eq!(creates(&renderer), 1);
}

#[test]
fn test_geometry_without_positions_is_skipped() {
    let mut renderer = renderer();
    renderer
        .add_drawable(drawable(
            1,
            GeometryDescriptor {
                positions: VertexData::F32(Vec::new()),
                ..lit_geometry(1)
            },
            metallic(1, Vec3::ONE),
        ))
        .unwrap();
    let stats = renderer.render();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.draws, 0);
}

#[test]
fn test_destroy_frees_everything() {
    let mut renderer = renderer();
    let view = Mat4::look_at_rh(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Z);
    renderer
        .set_lights(vec![sun().with_shadow(view, Mat4::IDENTITY)])
        .unwrap();
    renderer
        .add_drawable(drawable(1, lit_geometry(1), metallic(1, Vec3::ONE)))
        .unwrap();
    renderer.render();

    let device = renderer.destroy();
    assert_eq!(device.live_programs(), 0);
    assert_eq!(
        device.count(|c| matches!(c, DeviceCall::DeleteRenderTarget(_))),
        1
    );
}
