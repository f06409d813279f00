//! Feature classification
//!
//! Reduces a drawable's geometry, material, and the scene's lights, clip
//! planes and render modes to a flat [`FeatureConfig`]. Everything that
//! changes generated GLSL is in the config and nothing else is, so the config
//! itself is the structural program key.

use smallvec::SmallVec;

use scenegl_shared::{
    BillboardMode, ClipPlane, FresnelChannel, GeometryDescriptor, LightDescriptor, LightSpace,
    LightType, MaterialDescriptor, MaterialKind, RenderModes, TextureChannel, TextureEncoding,
};

/// A non-ambient light as seen by one program.
///
/// `index` is the light's position in the scene light list; it names the
/// light's uniforms and stays fixed for the life of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightSlot {
    pub index: u32,
    pub light_type: LightType,
    pub space: LightSpace,
    /// Shadow-mapped for this drawable
    pub casts_shadow: bool,
}

impl LightSlot {
    /// Point and spot lights have a position and distance attenuation
    pub fn is_positional(&self) -> bool {
        matches!(self.light_type, LightType::Point | LightType::Spot)
    }

    pub fn is_world_space(&self) -> bool {
        self.space == LightSpace::World
    }
}

/// How a material texture is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFeature {
    pub encoding: TextureEncoding,
    /// Texture coordinates pass through a per-texture matrix
    pub has_matrix: bool,
}

/// Present texture channels, indexed in [`TextureChannel::ALL`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureFlags([Option<TextureFeature>; TextureChannel::ALL.len()]);

impl TextureFlags {
    pub fn get(&self, channel: TextureChannel) -> Option<TextureFeature> {
        self.0[channel as usize]
    }

    pub fn set(&mut self, channel: TextureChannel, feature: Option<TextureFeature>) {
        self.0[channel as usize] = feature;
    }

    pub fn contains(&self, channel: TextureChannel) -> bool {
        self.get(channel).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Present channels in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (TextureChannel, TextureFeature)> + '_ {
        TextureChannel::ALL
            .iter()
            .filter_map(|&channel| self.get(channel).map(|feature| (channel, feature)))
    }
}

/// Enabled fresnel channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FresnelFlags(u8);

impl FresnelFlags {
    pub fn contains(self, channel: FresnelChannel) -> bool {
        self.0 & (1 << channel as u8) != 0
    }

    pub fn insert(&mut self, channel: FresnelChannel) {
        self.0 |= 1 << channel as u8;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = FresnelChannel> {
        FresnelChannel::ALL
            .into_iter()
            .filter(move |&channel| self.contains(channel))
    }
}

/// Scene-wide inputs to classification that are not per-drawable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneFlags {
    pub gamma_input: bool,
    pub gamma_output: bool,
    pub has_light_map: bool,
    pub has_reflection_map: bool,
}

/// Flat description of everything that shapes a draw program
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureConfig {
    pub has_normals: bool,
    pub has_uv: bool,
    pub has_normal_map: bool,
    pub has_colors: bool,
    /// Clip planes evaluated in the fragment stage
    pub clip_count: u32,
    pub material_kind: MaterialKind,
    pub quantized: bool,
    pub receives_shadow: bool,
    pub gamma_input: bool,
    pub gamma_output: bool,
    /// Non-ambient lights in scene order
    pub light_slots: SmallVec<[LightSlot; 4]>,
    pub is_points: bool,
    pub billboard: BillboardMode,
    pub stationary: bool,
    pub textures: TextureFlags,
    pub fresnel: FresnelFlags,
    pub has_light_map: bool,
    pub has_reflection_map: bool,
}

impl FeatureConfig {
    /// Per-fragment lighting is evaluated (normals plus something that uses them)
    pub fn is_shaded(&self) -> bool {
        self.has_normals
            && (!self.light_slots.is_empty()
                || self.has_light_map
                || self.has_reflection_map
                || !self.fresnel.is_empty())
    }

    pub fn shadow_slots(&self) -> impl Iterator<Item = &LightSlot> + '_ {
        self.light_slots.iter().filter(|slot| slot.casts_shadow)
    }

    /// Whether a present texture channel is actually sampled.
    ///
    /// Channels feeding only the lighting terms are skipped when the program
    /// is not shaded.
    pub fn samples_texture(&self, channel: TextureChannel) -> bool {
        if !self.textures.contains(channel) {
            return false;
        }
        match channel {
            TextureChannel::Ambient
            | TextureChannel::Diffuse
            | TextureChannel::BaseColor
            | TextureChannel::Emissive
            | TextureChannel::Alpha
            | TextureChannel::Occlusion => true,
            TextureChannel::Metallic
            | TextureChannel::Roughness
            | TextureChannel::MetallicRoughness
            | TextureChannel::Specular
            | TextureChannel::Glossiness
            | TextureChannel::SpecularGlossiness
            | TextureChannel::Normal
            | TextureChannel::Reflectivity => self.is_shaded(),
        }
    }

    /// Sampled texture channels in declaration order
    pub fn sampled_textures(&self) -> impl Iterator<Item = (TextureChannel, TextureFeature)> + '_ {
        self.textures
            .iter()
            .filter(|(channel, _)| self.samples_texture(*channel))
    }

    /// UV coordinates reach the fragment stage
    pub fn uses_uv(&self) -> bool {
        self.has_uv && self.sampled_textures().next().is_some()
    }

    /// Clear flags that cannot change the generated text, so two configs
    /// produce the same source exactly when they compare equal.
    fn normalize(&mut self) {
        self.receives_shadow = self.light_slots.iter().any(|slot| slot.casts_shadow);
        for channel in TextureChannel::ALL {
            if !self.samples_texture(channel) {
                self.textures.set(channel, None);
            }
        }
        self.has_uv = self.has_uv && !self.textures.is_empty();
        self.has_normal_map = self.textures.contains(TextureChannel::Normal);
        // Normals only feed the shading path
        if !self.is_shaded() {
            self.has_normals = false;
        }
        self.gamma_input = self.gamma_input && self.has_colors;
    }
}

/// Classify a drawable.
///
/// Never fails: missing or inconsistent inputs switch features off instead,
/// so the worst case is an unlit (ambient + emissive) program.
pub fn classify(
    geometry: &GeometryDescriptor,
    material: &MaterialDescriptor,
    lights: &[LightDescriptor],
    clips: &[ClipPlane],
    modes: &RenderModes,
    scene: &SceneFlags,
) -> FeatureConfig {
    let material_kind = material.kind();
    let has_normals = geometry.declares_normals() && geometry.topology.is_triangles();
    let has_uv = geometry.has_uv();
    let has_normal_map = has_normals
        && has_uv
        && geometry.has_indices()
        && material.texture(TextureChannel::Normal).is_some();
    let receives_shadow = modes.receive_shadow && lights.iter().any(|l| l.casts_shadow());

    let light_slots: SmallVec<[LightSlot; 4]> = if has_normals {
        lights
            .iter()
            .enumerate()
            .filter(|(_, light)| !light.is_ambient())
            .map(|(index, light)| LightSlot {
                index: index as u32,
                light_type: light.light_type(),
                space: light.space,
                casts_shadow: receives_shadow && light.casts_shadow(),
            })
            .collect()
    } else {
        SmallVec::new()
    };

    let has_light_map = has_normals && scene.has_light_map;
    let has_reflection_map =
        has_normals && scene.has_reflection_map && material_kind != MaterialKind::Lambert;

    let mut textures = TextureFlags::default();
    if has_uv {
        for channel in TextureChannel::ALL {
            let allowed = match channel {
                TextureChannel::Normal => has_normal_map,
                TextureChannel::Reflectivity => has_reflection_map,
                _ => true,
            };
            if !allowed {
                continue;
            }
            textures.set(
                channel,
                material.texture(channel).map(|texture| TextureFeature {
                    encoding: texture.encoding,
                    has_matrix: texture.matrix.is_some(),
                }),
            );
        }
    }

    let mut fresnel = FresnelFlags::default();
    if has_normals && material_kind == MaterialKind::Phong {
        for channel in FresnelChannel::ALL {
            if channel == FresnelChannel::Reflectivity && !has_reflection_map {
                continue;
            }
            if material.fresnel(channel).is_some() {
                fresnel.insert(channel);
            }
        }
    }

    let mut config = FeatureConfig {
        has_normals,
        has_uv,
        has_normal_map,
        has_colors: geometry.has_colors(),
        clip_count: if modes.clippable { clips.len() as u32 } else { 0 },
        material_kind,
        quantized: geometry.is_quantized(),
        receives_shadow,
        gamma_input: scene.gamma_input,
        gamma_output: scene.gamma_output,
        light_slots,
        is_points: geometry.topology.is_points(),
        billboard: modes.billboard,
        stationary: modes.stationary,
        textures,
        fresnel,
        has_light_map,
        has_reflection_map,
    };
    config.normalize();
    config
}
