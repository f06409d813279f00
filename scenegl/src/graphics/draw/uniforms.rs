//! Uniform pushes for the three binding levels of a draw: program globals,
//! material and transform

use glam::Vec3;

use scenegl_shared::{
    ClipPlane, EnvironmentMaps, LightDescriptor, LightKind, Material, MaterialDescriptor,
    TextureId,
};

use crate::graphics::device::{GraphicsDevice, TextureTarget, UniformValue};
use crate::graphics::program::ProgramBindings;
use crate::graphics::texture_units::TextureUnitAllocator;
use crate::scene::{Camera, Transform, ambient_radiance};
use crate::shader_gen::{FeatureConfig, alpha_mode_cutoff, names};

/// Shadow map rendered for the light at `light_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMapBinding {
    pub light_index: u32,
    pub texture: TextureId,
}

/// Scene-wide values pushed whenever the bound program changes
#[derive(Debug, Clone, Copy)]
pub struct FrameGlobals<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [LightDescriptor],
    pub clips: &'a [ClipPlane],
    pub environment: &'a EnvironmentMaps,
    pub shadow_maps: &'a [ShadowMapBinding],
    pub gamma_factor: f32,
}

/// Push camera, lights, shadows, environment maps and clips.
///
/// Shadow maps take units 0.. in light order, then the light map and the
/// reflection map. Returns the first unit left for material textures.
pub(crate) fn push_program_globals<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    bindings: &ProgramBindings,
    config: &FeatureConfig,
    globals: &FrameGlobals<'_>,
) -> u32 {
    bindings.set(device, names::VIEW_MATRIX, globals.camera.view);
    bindings.set(device, names::PROJ_MATRIX, globals.camera.projection);
    bindings.set(
        device,
        names::VIEW_NORMAL_MATRIX,
        globals.camera.view_normal_matrix(),
    );
    bindings.set(device, names::GAMMA_FACTOR, globals.gamma_factor);
    bindings.set(device, names::LIGHT_AMBIENT, ambient_radiance(globals.lights));

    let mut unit = 0;
    for slot in &config.light_slots {
        let i = slot.index;
        let Some(light) = globals.lights.get(i as usize) else {
            continue;
        };
        push_light(device, bindings, i, light);

        if slot.casts_shadow {
            bindings.set(device, &names::shadow_view_matrix(i), light.shadow_view);
            bindings.set(device, &names::shadow_proj_matrix(i), light.shadow_projection);
            if let Some(map) = globals.shadow_maps.iter().find(|m| m.light_index == i) {
                device.bind_texture(unit, TextureTarget::Texture2D, map.texture);
            }
            bindings.set(device, &names::shadow_map(i), UniformValue::Sampler(unit));
            unit += 1;
        }
    }

    let environment = [
        (config.has_light_map, globals.environment.light_map, names::LIGHT_MAP),
        (
            config.has_reflection_map,
            globals.environment.reflection_map,
            names::REFLECTION_MAP,
        ),
    ];
    for (used, texture, name) in environment {
        if !used {
            continue;
        }
        if let Some(texture) = texture {
            device.bind_texture(unit, TextureTarget::CubeMap, texture);
        }
        bindings.set(device, name, UniformValue::Sampler(unit));
        unit += 1;
    }

    for i in 0..config.clip_count {
        let Some(clip) = globals.clips.get(i as usize) else {
            break;
        };
        bindings.set(device, &names::clip_active(i), clip.active);
        bindings.set(device, &names::clip_pos(i), clip.pos);
        bindings.set(device, &names::clip_dir(i), clip.dir);
    }

    unit
}

fn push_light<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    bindings: &ProgramBindings,
    i: u32,
    light: &LightDescriptor,
) {
    bindings.set(device, &names::light_color(i), light.radiance());
    match light.kind {
        LightKind::Ambient => {}
        LightKind::Directional { dir } => {
            bindings.set(device, &names::light_dir(i), dir);
        }
        LightKind::Point { pos, attenuation } => {
            bindings.set(device, &names::light_pos(i), pos);
            bindings.set(
                device,
                &names::light_attenuation(i),
                Vec3::from_array(attenuation.to_array()),
            );
        }
        LightKind::Spot {
            pos,
            dir,
            attenuation,
            cutoff,
        } => {
            bindings.set(device, &names::light_pos(i), pos);
            bindings.set(device, &names::light_dir(i), dir);
            bindings.set(
                device,
                &names::light_attenuation(i),
                Vec3::from_array(attenuation.to_array()),
            );
            bindings.set(device, &names::light_cutoff(i), cutoff);
        }
    }
}

/// Push material channel values and bind its textures starting at the
/// allocator's base unit
pub(crate) fn push_material<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    bindings: &ProgramBindings,
    config: &FeatureConfig,
    material: &MaterialDescriptor,
    units: &mut TextureUnitAllocator,
) {
    bindings.set(
        device,
        names::MATERIAL_ALPHA_MODE_CUTOFF,
        alpha_mode_cutoff(material.alpha_mode, material.alpha_cutoff),
    );
    bindings.set(device, names::POINT_SIZE, material.point_size);

    match &material.material {
        Material::Lambert(m) => {
            bindings.set(device, names::MATERIAL_AMBIENT, m.ambient);
            bindings.set(device, names::MATERIAL_COLOR, m.color);
            bindings.set(device, names::MATERIAL_EMISSIVE, m.emissive);
            bindings.set(device, names::MATERIAL_ALPHA, m.alpha);
        }
        Material::Phong(m) => {
            bindings.set(device, names::MATERIAL_AMBIENT, m.ambient);
            bindings.set(device, names::MATERIAL_DIFFUSE, m.diffuse);
            bindings.set(device, names::MATERIAL_SPECULAR, m.specular);
            bindings.set(device, names::MATERIAL_SHININESS, m.shininess);
            bindings.set(device, names::MATERIAL_REFLECTIVITY, m.reflectivity);
            bindings.set(device, names::MATERIAL_EMISSIVE, m.emissive);
            bindings.set(device, names::MATERIAL_ALPHA, m.alpha);
        }
        Material::MetallicRoughness(m) => {
            bindings.set(device, names::MATERIAL_BASE_COLOR, m.base_color);
            bindings.set(device, names::MATERIAL_METALLIC, m.metallic);
            bindings.set(device, names::MATERIAL_ROUGHNESS, m.roughness);
            bindings.set(device, names::MATERIAL_SPECULAR_F0, m.specular_f0);
            bindings.set(device, names::MATERIAL_EMISSIVE, m.emissive);
            bindings.set(device, names::MATERIAL_ALPHA, m.alpha);
        }
        Material::SpecularGlossiness(m) => {
            bindings.set(device, names::MATERIAL_DIFFUSE, m.diffuse);
            bindings.set(device, names::MATERIAL_SPECULAR, m.specular);
            bindings.set(device, names::MATERIAL_GLOSSINESS, m.glossiness);
            bindings.set(device, names::MATERIAL_EMISSIVE, m.emissive);
            bindings.set(device, names::MATERIAL_ALPHA, m.alpha);
        }
    }

    for channel in config.fresnel.iter() {
        let Some(fresnel) = material.fresnel(channel) else {
            continue;
        };
        let n = names::fresnel(channel);
        bindings.set(device, &n.edge_bias, fresnel.edge_bias);
        bindings.set(device, &n.center_bias, fresnel.center_bias);
        bindings.set(device, &n.power, fresnel.power);
        bindings.set(device, &n.edge_color, fresnel.edge_color);
        bindings.set(device, &n.center_color, fresnel.center_color);
    }

    units.reset();
    for (channel, _) in config.sampled_textures() {
        let Some(texture) = material.texture(channel) else {
            continue;
        };
        let unit = units.next_unit();
        device.bind_texture(unit, TextureTarget::Texture2D, texture.texture);
        bindings.set(device, &names::texture_map(channel), UniformValue::Sampler(unit));
        if let Some(matrix) = texture.matrix {
            bindings.set(device, &names::texture_matrix(channel), matrix);
        }
    }
}

/// Model matrix, plus the model normal matrix when normals are active
pub(crate) fn push_transform<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    bindings: &ProgramBindings,
    transform: &Transform,
    has_normals: bool,
) {
    bindings.set(device, names::MODEL_MATRIX, transform.matrix);
    if has_normals {
        bindings.set(device, names::MODEL_NORMAL_MATRIX, transform.normal_matrix());
    }
}
