//! Vertex stage synthesis

use scenegl_shared::{AttributeKind, BillboardMode, LightType};

use super::builder::{Stage, StageBuilder};
use super::features::FeatureConfig;
use super::{ShaderOptions, names, snippets};

/// Emit the matrix setup shared by the draw and depth programs: local
/// position decode, stationary view, billboarding. Leaves `localPosition`,
/// `worldPosition` and `viewPosition` in scope.
pub(crate) fn emit_positions(
    b: &mut StageBuilder,
    quantized: bool,
    billboard: BillboardMode,
    stationary: bool,
) {
    b.attribute("vec3", names::attribute(AttributeKind::Position));
    b.uniform("mat4", names::MODEL_MATRIX);
    b.uniform("mat4", names::VIEW_MATRIX);
    b.uniform("mat4", names::PROJ_MATRIX);

    if quantized {
        b.uniform("mat4", names::POSITIONS_DECODE_MATRIX);
        b.stmt("vec4 localPosition = positionsDecodeMatrix * vec4(position, 1.0);");
    } else {
        b.stmt("vec4 localPosition = vec4(position, 1.0);");
    }

    b.stmt("mat4 viewMatrix2 = viewMatrix;");
    b.stmt("mat4 modelMatrix2 = modelMatrix;");
    if stationary {
        b.stmt("viewMatrix2[3][0] = viewMatrix2[3][1] = viewMatrix2[3][2] = 0.0;");
    }

    match billboard {
        BillboardMode::None => {
            b.stmt("vec4 worldPosition = modelMatrix2 * localPosition;");
            b.stmt("vec4 viewPosition = viewMatrix2 * worldPosition;");
        }
        BillboardMode::Spherical | BillboardMode::Cylindrical => {
            let helper = if billboard == BillboardMode::Spherical {
                snippets::BILLBOARD_SPHERICAL
            } else {
                snippets::BILLBOARD_CYLINDRICAL
            };
            b.define("billboard", helper);
            b.stmt("billboard(modelMatrix2);");
            b.stmt("billboard(viewMatrix2);");
            b.stmt("vec4 worldPosition = modelMatrix2 * localPosition;");
            b.stmt("mat4 modelViewMatrix = viewMatrix2 * modelMatrix2;");
            b.stmt("billboard(modelViewMatrix);");
            b.stmt("vec4 viewPosition = modelViewMatrix * localPosition;");
        }
    }
}

pub(crate) fn synthesize_vertex(config: &FeatureConfig, options: &ShaderOptions) -> StageBuilder {
    let mut b = StageBuilder::new(Stage::Vertex);
    b.directive(format!("precision {} float;", options.precision.qualifier()));

    emit_positions(&mut b, config.quantized, config.billboard, config.stationary);

    if config.is_shaded() {
        emit_normal_and_lights(&mut b, config);
    }

    if config.uses_uv() {
        b.attribute("vec2", names::attribute(AttributeKind::Uv));
        b.varying("vec2", names::V_UV);
        if config.quantized {
            b.uniform("mat3", names::UV_DECODE_MATRIX);
            b.stmt("vUV = (uvDecodeMatrix * vec3(uv, 1.0)).xy;");
        } else {
            b.stmt("vUV = uv;");
        }
    }

    if config.has_colors {
        b.attribute("vec4", names::attribute(AttributeKind::Color));
        b.varying("vec4", names::V_COLOR);
        b.stmt("vColor = color;");
    }

    if config.clip_count > 0 {
        b.varying("vec4", names::V_WORLD_POSITION);
        b.stmt("vWorldPosition = worldPosition;");
    }

    let shadow_slots: Vec<u32> = config.shadow_slots().map(|slot| slot.index).collect();
    if !shadow_slots.is_empty() {
        b.define("texUnitConverter", snippets::TEX_UNIT_CONVERTER);
        for i in shadow_slots {
            let view = names::shadow_view_matrix(i);
            let proj = names::shadow_proj_matrix(i);
            let varying = names::shadow_pos_varying(i);
            b.uniform("mat4", view.clone());
            b.uniform("mat4", proj.clone());
            b.varying("vec4", varying.clone());
            b.stmt(format!(
                "{varying} = texUnitConverter * {proj} * ({view} * worldPosition);"
            ));
        }
    }

    if config.is_points {
        b.uniform("float", names::POINT_SIZE);
        b.stmt("gl_PointSize = pointSize;");
    }

    b.stmt("gl_Position = projMatrix * viewPosition;");
    b
}

fn emit_normal_and_lights(b: &mut StageBuilder, config: &FeatureConfig) {
    b.uniform("mat4", names::MODEL_NORMAL_MATRIX);
    b.uniform("mat4", names::VIEW_NORMAL_MATRIX);
    b.varying("vec4", names::V_VIEW_POSITION);
    b.varying("vec3", names::V_VIEW_NORMAL);

    if config.quantized {
        b.attribute("vec2", names::attribute(AttributeKind::Normal));
        b.define("octDecode", snippets::OCT_DECODE);
        b.stmt("vec4 localNormal = vec4(octDecode(normal), 0.0);");
    } else {
        b.attribute("vec3", names::attribute(AttributeKind::Normal));
        b.stmt("vec4 localNormal = vec4(normal, 0.0);");
    }
    b.stmt("vec4 worldNormal = modelNormalMatrix * localNormal;");
    b.stmt("vec3 viewNormal = normalize((viewNormalMatrix * worldNormal).xyz);");

    let world_slots: Vec<_> = config
        .light_slots
        .iter()
        .filter(|slot| slot.is_world_space())
        .collect();
    if !world_slots.is_empty() {
        b.stmt("vec3 tmpVec3;");
    }
    for slot in world_slots {
        let i = slot.index;
        let varying = names::light_varying(i);
        b.varying("vec4", varying.clone());
        match slot.light_type {
            LightType::Directional => {
                let dir = names::light_dir(i);
                b.uniform("vec3", dir.clone());
                b.stmt(format!("tmpVec3 = -(viewMatrix * vec4({dir}, 0.0)).xyz;"));
                b.stmt(format!("{varying} = vec4(tmpVec3, 0.0);"));
            }
            LightType::Point | LightType::Spot => {
                let pos = names::light_pos(i);
                b.uniform("vec3", pos.clone());
                b.stmt(format!(
                    "tmpVec3 = (viewMatrix2 * vec4({pos}, 1.0)).xyz - viewPosition.xyz;"
                ));
                b.stmt(format!("{varying} = vec4(tmpVec3, length(tmpVec3));"));
                if slot.light_type == LightType::Spot {
                    let dir = names::light_dir(i);
                    let spot = names::spot_dir_varying(i);
                    b.uniform("vec3", dir.clone());
                    b.varying("vec3", spot.clone());
                    b.stmt(format!("{spot} = (viewMatrix2 * vec4({dir}, 0.0)).xyz;"));
                }
            }
            // Ambient lights never get a slot
            LightType::Ambient => {}
        }
    }

    b.stmt("vViewNormal = viewNormal;");
    b.stmt("vViewPosition = viewPosition;");
}
