//! Fragment stage synthesis
//!
//! The stage is assembled in a fixed order: clip/point discards, material
//! locals, vertex colors, textures, fresnel, the `Material` record, then
//! either the full lighting block or the unlit ambient + emissive fallback,
//! and finally alpha handling and output encoding.

use scenegl_shared::{FresnelChannel, LightType, MaterialKind, TextureChannel, TextureEncoding};

use super::builder::{Stage, StageBuilder};
use super::features::{FeatureConfig, LightSlot, TextureFeature};
use super::{ShaderOptions, names, snippets};

pub(crate) fn synthesize_fragment(config: &FeatureConfig, options: &ShaderOptions) -> StageBuilder {
    let mut b = StageBuilder::new(Stage::Fragment);
    let shaded = config.is_shaded();

    if config.samples_texture(TextureChannel::Normal) {
        b.directive(snippets::DERIVATIVES_EXTENSION);
    }
    b.directive(format!("precision {} float;", options.precision.qualifier()));
    if shaded {
        for line in snippets::MATH_DEFINES.lines() {
            b.directive(line);
        }
    }

    emit_clipping(&mut b, config);
    if config.is_points && options.round_points {
        b.stmt("vec2 cxy = 2.0 * gl_PointCoord - 1.0;");
        b.open("if (dot(cxy, cxy) > 1.0)");
        b.stmt("discard;");
        b.close();
    }

    emit_material_locals(&mut b, config);

    if config.has_colors {
        b.varying("vec4", names::V_COLOR);
        if config.gamma_input {
            use_gamma_factor(&mut b);
            b.define("gammaToLinear", snippets::GAMMA_TO_LINEAR);
            b.stmt("vec4 vertexColor = gammaToLinear(vColor, gammaFactor);");
        } else {
            b.stmt("vec4 vertexColor = vColor;");
        }
        b.stmt(format!("{} *= vertexColor.rgb;", albedo_local(config.material_kind)));
        b.stmt("alpha *= vertexColor.a;");
    }

    if shaded {
        b.varying("vec4", names::V_VIEW_POSITION);
        b.varying("vec3", names::V_VIEW_NORMAL);
        b.stmt("vec3 viewNormal = normalize(vViewNormal);");
        b.stmt("vec3 viewEyeDir = normalize(-vViewPosition.xyz);");
    }

    emit_textures(&mut b, config);
    emit_fresnel(&mut b, config);
    emit_material_record(&mut b, config.material_kind);

    b.uniform("vec3", names::LIGHT_AMBIENT);
    if shaded {
        emit_shading(&mut b, config, options);
        b.stmt("vec3 outgoingLight = (lightAmbient * ambientAlbedo + reflectedLight.diffuse) * occlusion + reflectedLight.specular + emissiveColor;");
    } else {
        b.stmt("vec3 outgoingLight = lightAmbient * ambientAlbedo * occlusion + emissiveColor;");
    }

    b.uniform("vec4", names::MATERIAL_ALPHA_MODE_CUTOFF);
    b.stmt("alpha = alpha * materialAlphaModeCutoff.x + materialAlphaModeCutoff.y;");
    b.open("if (alpha < materialAlphaModeCutoff.z)");
    b.stmt("discard;");
    b.close();

    if config.gamma_output {
        use_gamma_factor(&mut b);
        b.define("linearToGamma", snippets::LINEAR_TO_GAMMA);
        b.stmt("gl_FragColor = linearToGamma(vec4(outgoingLight, alpha), gammaFactor);");
    } else {
        b.stmt("gl_FragColor = vec4(outgoingLight, alpha);");
    }
    b
}

fn use_gamma_factor(b: &mut StageBuilder) {
    b.uniform("float", names::GAMMA_FACTOR);
}

fn emit_clipping(b: &mut StageBuilder, config: &FeatureConfig) {
    if config.clip_count == 0 {
        return;
    }
    b.varying("vec4", names::V_WORLD_POSITION);
    b.stmt("float dist = 0.0;");
    for i in 0..config.clip_count {
        let active = names::clip_active(i);
        let pos = names::clip_pos(i);
        let dir = names::clip_dir(i);
        b.uniform("bool", active.clone());
        b.uniform("vec3", pos.clone());
        b.uniform("vec3", dir.clone());
        b.open(format!("if ({active})"));
        b.stmt(format!(
            "dist += clamp(dot({dir}, vWorldPosition.xyz - {pos}), 0.0, 1000.0);"
        ));
        b.close();
    }
    b.open("if (dist > 0.0)");
    b.stmt("discard;");
    b.close();
}

/// Local holding the surface albedo before energy conservation
fn albedo_local(kind: MaterialKind) -> &'static str {
    match kind {
        MaterialKind::MetallicRoughness => "baseColor",
        MaterialKind::Lambert | MaterialKind::Phong | MaterialKind::SpecularGlossiness => {
            "diffuseColor"
        }
    }
}

/// Local holding the specular color
fn specular_local(kind: MaterialKind) -> &'static str {
    match kind {
        MaterialKind::Phong => "specular",
        MaterialKind::Lambert | MaterialKind::MetallicRoughness | MaterialKind::SpecularGlossiness => {
            "specularColor"
        }
    }
}

fn emit_material_locals(b: &mut StageBuilder, config: &FeatureConfig) {
    b.uniform("vec3", names::MATERIAL_EMISSIVE);
    b.uniform("float", names::MATERIAL_ALPHA);

    match config.material_kind {
        MaterialKind::Lambert => {
            b.uniform("vec3", names::MATERIAL_AMBIENT);
            b.uniform("vec3", names::MATERIAL_COLOR);
            b.stmt("vec3 ambientColor = materialAmbient;");
            b.stmt("vec3 diffuseColor = materialColor;");
        }
        MaterialKind::Phong => {
            b.uniform("vec3", names::MATERIAL_AMBIENT);
            b.uniform("vec3", names::MATERIAL_DIFFUSE);
            b.uniform("vec3", names::MATERIAL_SPECULAR);
            b.uniform("float", names::MATERIAL_SHININESS);
            b.stmt("vec3 ambientColor = materialAmbient;");
            b.stmt("vec3 diffuseColor = materialDiffuse;");
            b.stmt("vec3 specular = materialSpecular;");
            b.stmt("float shininess = materialShininess;");
            if config.has_reflection_map {
                b.uniform("float", names::MATERIAL_REFLECTIVITY);
                b.stmt("float reflectivity = materialReflectivity;");
            }
        }
        MaterialKind::MetallicRoughness => {
            b.uniform("vec3", names::MATERIAL_BASE_COLOR);
            b.uniform("float", names::MATERIAL_METALLIC);
            b.uniform("float", names::MATERIAL_ROUGHNESS);
            b.uniform("float", names::MATERIAL_SPECULAR_F0);
            b.stmt("vec3 baseColor = materialBaseColor;");
            b.stmt("float metallic = materialMetallic;");
            b.stmt("float roughness = materialRoughness;");
            b.stmt("float specularF0 = materialSpecularF0;");
        }
        MaterialKind::SpecularGlossiness => {
            b.uniform("vec3", names::MATERIAL_DIFFUSE);
            b.uniform("vec3", names::MATERIAL_SPECULAR);
            b.uniform("float", names::MATERIAL_GLOSSINESS);
            b.stmt("vec3 diffuseColor = materialDiffuse;");
            b.stmt("vec3 specularColor = materialSpecular;");
            b.stmt("float glossiness = materialGlossiness;");
        }
    }

    b.stmt("vec3 emissiveColor = materialEmissive;");
    b.stmt("float alpha = materialAlpha;");
    b.stmt("float occlusion = 1.0;");
}

fn emit_textures(b: &mut StageBuilder, config: &FeatureConfig) {
    let sampled: Vec<(TextureChannel, TextureFeature)> = config.sampled_textures().collect();
    if sampled.is_empty() || !config.has_uv {
        return;
    }

    b.varying("vec2", names::V_UV);
    b.stmt("vec4 texturePos = vec4(vUV.s, vUV.t, 1.0, 1.0);");

    for (channel, feature) in sampled {
        let map = names::texture_map(channel);
        let texel = names::texel(channel);
        let coord = format!("{}UV", channel.stem());
        b.uniform("sampler2D", map.clone());

        if feature.has_matrix {
            let matrix = names::texture_matrix(channel);
            b.uniform("mat4", matrix.clone());
            b.stmt(format!("vec2 {coord} = ({matrix} * texturePos).xy;"));
        } else {
            b.stmt(format!("vec2 {coord} = texturePos.xy;"));
        }

        let sample = format!("texture2D({map}, {coord})");
        let decoded = match feature.encoding {
            TextureEncoding::Linear => {
                b.define("linearToLinear", snippets::LINEAR_TO_LINEAR);
                format!("linearToLinear({sample})")
            }
            TextureEncoding::Srgb => {
                b.define("sRGBToLinear", snippets::SRGB_TO_LINEAR);
                format!("sRGBToLinear({sample})")
            }
            TextureEncoding::Gamma => {
                use_gamma_factor(b);
                b.define("gammaToLinear", snippets::GAMMA_TO_LINEAR);
                format!("gammaToLinear({sample}, gammaFactor)")
            }
        };
        b.stmt(format!("vec4 {texel} = {decoded};"));

        let kind = config.material_kind;
        match channel {
            TextureChannel::Ambient => b.stmt(format!("ambientColor *= {texel}.rgb;")),
            TextureChannel::Diffuse | TextureChannel::BaseColor => {
                b.stmt(format!("{} *= {texel}.rgb;", albedo_local(kind)));
                b.stmt(format!("alpha *= {texel}.a;"));
            }
            TextureChannel::Specular => {
                b.stmt(format!("{} *= {texel}.rgb;", specular_local(kind)));
            }
            TextureChannel::Glossiness => b.stmt(format!("glossiness *= {texel}.r;")),
            TextureChannel::SpecularGlossiness => {
                b.stmt(format!("specularColor *= {texel}.rgb;"));
                b.stmt(format!("glossiness *= {texel}.a;"));
            }
            TextureChannel::Metallic => b.stmt(format!("metallic *= {texel}.r;")),
            TextureChannel::Roughness => b.stmt(format!("roughness *= {texel}.r;")),
            TextureChannel::MetallicRoughness => {
                b.stmt(format!("roughness *= {texel}.g;"));
                b.stmt(format!("metallic *= {texel}.b;"));
            }
            TextureChannel::Emissive => b.stmt(format!("emissiveColor *= {texel}.rgb;")),
            TextureChannel::Alpha => b.stmt(format!("alpha *= {texel}.r;")),
            TextureChannel::Occlusion => b.stmt(format!("occlusion *= {texel}.r;")),
            TextureChannel::Normal => {
                b.define("perturbNormal2Arb", snippets::PERTURB_NORMAL);
                b.stmt(format!(
                    "viewNormal = perturbNormal2Arb(vViewPosition.xyz, viewNormal, {coord}, {texel}.xyz * 2.0 - 1.0);"
                ));
            }
            TextureChannel::Reflectivity => b.stmt(format!("reflectivity *= {texel}.r;")),
        }
    }
}

fn emit_fresnel(b: &mut StageBuilder, config: &FeatureConfig) {
    if config.fresnel.is_empty() {
        return;
    }
    b.define("fresnel", snippets::FRESNEL);

    for channel in config.fresnel.iter() {
        let n = names::fresnel(channel);
        b.uniform("float", n.edge_bias.clone());
        b.uniform("float", n.center_bias.clone());
        b.uniform("float", n.power.clone());
        b.uniform("vec3", n.edge_color.clone());
        b.uniform("vec3", n.center_color.clone());

        let term = format!(
            "fresnel(viewEyeDir, viewNormal, {}, {}, {})",
            n.edge_bias, n.center_bias, n.power
        );
        let line = match channel {
            FresnelChannel::Diffuse => format!(
                "diffuseColor *= mix({}, {}, {term});",
                n.edge_color, n.center_color
            ),
            FresnelChannel::Specular => format!(
                "specular *= mix({}, {}, {term});",
                n.edge_color, n.center_color
            ),
            FresnelChannel::Alpha => format!(
                "alpha *= mix({}.r, {}.r, {term});",
                n.edge_color, n.center_color
            ),
            FresnelChannel::Emissive => format!(
                "emissiveColor *= mix({}, {}, {term});",
                n.edge_color, n.center_color
            ),
            FresnelChannel::Reflectivity => format!(
                "reflectivity *= mix({}.r, {}.r, {term});",
                n.edge_color, n.center_color
            ),
        };
        b.stmt(line);
    }
}

/// Fill the `Material` record and the ambient albedo.
///
/// Energy conservation lives here: metallic surfaces lose their diffuse term
/// and specular/glossiness surfaces scale diffuse by the strongest specular
/// channel.
fn emit_material_record(b: &mut StageBuilder, kind: MaterialKind) {
    b.define("Material", snippets::MATERIAL_STRUCT);
    b.stmt("Material material;");
    match kind {
        MaterialKind::Lambert => {
            b.stmt("material.diffuseColor = diffuseColor;");
            b.stmt("material.specularColor = vec3(0.0);");
            b.stmt("material.specularRoughness = 1.0;");
            b.stmt("material.shine = 0.0;");
            b.stmt("vec3 ambientAlbedo = ambientColor * material.diffuseColor;");
        }
        MaterialKind::Phong => {
            b.stmt("material.diffuseColor = diffuseColor;");
            b.stmt("material.specularColor = specular;");
            b.stmt("material.specularRoughness = 1.0;");
            b.stmt("material.shine = shininess;");
            b.stmt("vec3 ambientAlbedo = ambientColor * material.diffuseColor;");
        }
        MaterialKind::MetallicRoughness => {
            b.stmt("float dielectricSpecular = 0.16 * specularF0 * specularF0;");
            b.stmt("material.diffuseColor = baseColor * (1.0 - dielectricSpecular) * (1.0 - metallic);");
            b.stmt("material.specularColor = mix(vec3(dielectricSpecular), baseColor, metallic);");
            b.stmt("material.specularRoughness = clamp(roughness, 0.04, 1.0);");
            b.stmt("material.shine = 0.0;");
            b.stmt("vec3 ambientAlbedo = material.diffuseColor;");
        }
        MaterialKind::SpecularGlossiness => {
            b.stmt("material.diffuseColor = diffuseColor * (1.0 - max(max(specularColor.r, specularColor.g), specularColor.b));");
            b.stmt("material.specularColor = specularColor;");
            b.stmt("material.specularRoughness = clamp(1.0 - glossiness, 0.04, 1.0);");
            b.stmt("material.shine = 0.0;");
            b.stmt("vec3 ambientAlbedo = material.diffuseColor;");
        }
    }
}

fn emit_shading(b: &mut StageBuilder, config: &FeatureConfig, options: &ShaderOptions) {
    b.define("ReflectedLight", snippets::REFLECTED_LIGHT_STRUCT);
    b.define("Geometry", snippets::GEOMETRY_STRUCT);

    b.stmt("Geometry geometry;");
    b.stmt("geometry.position = vViewPosition.xyz;");
    b.stmt("geometry.viewNormal = viewNormal;");
    b.stmt("geometry.viewEyeDir = viewEyeDir;");
    b.stmt("ReflectedLight reflectedLight = ReflectedLight(vec3(0.0), vec3(0.0));");

    if config.has_light_map || config.has_reflection_map {
        b.uniform("mat4", names::VIEW_MATRIX);
        b.define("inverseTransformDirection", snippets::INVERSE_TRANSFORM_DIRECTION);
    }
    if config.has_light_map {
        b.uniform("samplerCube", names::LIGHT_MAP);
        b.stmt("vec3 irradiance = textureCube(lightMap, inverseTransformDirection(geometry.viewNormal, viewMatrix)).rgb;");
        b.stmt("reflectedLight.diffuse += irradiance * material.diffuseColor;");
    }
    if config.has_reflection_map {
        b.uniform("samplerCube", names::REFLECTION_MAP);
        b.stmt("vec3 reflectVec = inverseTransformDirection(reflect(-geometry.viewEyeDir, geometry.viewNormal), viewMatrix);");
        b.stmt("vec3 radiance = textureCube(reflectionMap, reflectVec).rgb;");
        match config.material_kind {
            MaterialKind::Phong => b.stmt("reflectedLight.specular += radiance * reflectivity;"),
            MaterialKind::Lambert
            | MaterialKind::MetallicRoughness
            | MaterialKind::SpecularGlossiness => {
                b.stmt("reflectedLight.specular += radiance * material.specularColor;")
            }
        }
    }

    if config.light_slots.is_empty() {
        return;
    }

    b.define("IncidentLight", snippets::INCIDENT_LIGHT_STRUCT);
    b.define("BRDF_Diffuse_Lambert", snippets::BRDF_DIFFUSE_LAMBERT);
    let lighting_fn = match config.material_kind {
        MaterialKind::Lambert => {
            b.define("computeLambertLighting", snippets::LAMBERT_LIGHTING);
            "computeLambertLighting"
        }
        MaterialKind::Phong => {
            b.define("computePhongLighting", snippets::PHONG_LIGHTING);
            "computePhongLighting"
        }
        MaterialKind::MetallicRoughness | MaterialKind::SpecularGlossiness => {
            b.define("F_Schlick", snippets::F_SCHLICK);
            b.define("G_GGX_SmithCorrelated", snippets::G_GGX_SMITH_CORRELATED);
            b.define("D_GGX", snippets::D_GGX);
            b.define("BRDF_Specular_GGX", snippets::BRDF_SPECULAR_GGX);
            b.define("computePBRLighting", snippets::PBR_LIGHTING);
            "computePBRLighting"
        }
    };

    if config.shadow_slots().next().is_some() {
        b.define("unpackDepth", snippets::UNPACK_DEPTH);
        b.define(
            "computeShadow",
            snippets::compute_shadow(
                options.shadow_kernel_radius,
                options.shadow_depth_bias,
                options.shadow_map_size,
            ),
        );
    }

    b.stmt("IncidentLight light;");
    if config.light_slots.iter().any(LightSlot::is_positional) {
        b.stmt("float lightDist;");
    }
    if config
        .light_slots
        .iter()
        .any(|slot| slot.is_positional() && !slot.is_world_space())
    {
        b.stmt("vec3 lightVec;");
    }

    for slot in &config.light_slots {
        emit_light(b, slot);
        b.stmt(format!(
            "{lighting_fn}(light, geometry, material, reflectedLight);"
        ));
    }
}

fn emit_light(b: &mut StageBuilder, slot: &LightSlot) {
    let i = slot.index;

    if slot.is_world_space() {
        let varying = names::light_varying(i);
        b.varying("vec4", varying.clone());
        b.stmt(format!("light.direction = normalize({varying}.xyz);"));
        if slot.is_positional() {
            b.stmt(format!("lightDist = {varying}.w;"));
        }
    } else if slot.is_positional() {
        let pos = names::light_pos(i);
        b.uniform("vec3", pos.clone());
        b.stmt(format!("lightVec = {pos} - vViewPosition.xyz;"));
        b.stmt("lightDist = length(lightVec);");
        b.stmt("light.direction = normalize(lightVec);");
    } else {
        let dir = names::light_dir(i);
        b.uniform("vec3", dir.clone());
        b.stmt(format!("light.direction = normalize(-{dir});"));
    }

    let color = names::light_color(i);
    b.uniform("vec3", color.clone());
    b.stmt(format!("light.color = {color};"));

    if slot.is_positional() {
        let attenuation = names::light_attenuation(i);
        b.uniform("vec3", attenuation.clone());
        b.stmt(format!(
            "light.color *= 1.0 / max(dot({attenuation}, vec3(1.0, lightDist, lightDist * lightDist)), EPSILON);"
        ));
    }

    if slot.light_type == LightType::Spot {
        let cutoff = names::light_cutoff(i);
        b.uniform("float", cutoff.clone());
        let axis = if slot.is_world_space() {
            let spot = names::spot_dir_varying(i);
            b.varying("vec3", spot.clone());
            spot
        } else {
            let dir = names::light_dir(i);
            b.uniform("vec3", dir.clone());
            dir
        };
        b.stmt(format!(
            "light.color *= step({cutoff}, dot(-light.direction, normalize({axis})));"
        ));
    }

    if slot.casts_shadow {
        let map = names::shadow_map(i);
        let varying = names::shadow_pos_varying(i);
        b.uniform("sampler2D", map.clone());
        b.varying("vec4", varying.clone());
        b.stmt(format!("light.color *= computeShadow({map}, {varying});"));
    }
}
