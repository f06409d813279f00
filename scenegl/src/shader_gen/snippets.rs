//! GLSL snippet strings assembled by the stage synthesizers.
//!
//! Kept in a dedicated module so the synthesizers stay readable. Snippets
//! that depend on configuration (shadow kernel, precision) are produced by
//! the small functions at the bottom.

pub(crate) const DERIVATIVES_EXTENSION: &str = "#extension GL_OES_standard_derivatives : enable";

pub(crate) const MATH_DEFINES: &str = "#define PI 3.14159265359
#define RECIPROCAL_PI 0.31830988618
#define EPSILON 1e-6
#define saturate(a) clamp(a, 0.0, 1.0)";

// ----------------------------------------------------------------------------
// Vertex stage
// ----------------------------------------------------------------------------

pub(crate) const OCT_DECODE: &str = r#"vec3 octDecode(vec2 oct) {
    vec3 v = vec3(oct.xy, 1.0 - abs(oct.x) - abs(oct.y));
    if (v.z < 0.0) {
        v.xy = (1.0 - abs(v.yx)) * vec2(v.x >= 0.0 ? 1.0 : -1.0, v.y >= 0.0 ? 1.0 : -1.0);
    }
    return normalize(v);
}"#;

pub(crate) const BILLBOARD_SPHERICAL: &str = r#"void billboard(inout mat4 mat) {
    mat[0][0] = 1.0;
    mat[0][1] = 0.0;
    mat[0][2] = 0.0;
    mat[1][0] = 0.0;
    mat[1][1] = 1.0;
    mat[1][2] = 0.0;
    mat[2][0] = 0.0;
    mat[2][1] = 0.0;
    mat[2][2] = 1.0;
}"#;

pub(crate) const BILLBOARD_CYLINDRICAL: &str = r#"void billboard(inout mat4 mat) {
    mat[0][0] = 1.0;
    mat[0][1] = 0.0;
    mat[0][2] = 0.0;
    mat[2][0] = 0.0;
    mat[2][1] = 0.0;
    mat[2][2] = 1.0;
}"#;

/// Maps clip space [-1, 1] to texture space [0, 1]
pub(crate) const TEX_UNIT_CONVERTER: &str = "const mat4 texUnitConverter = mat4(0.5, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.5, 0.5, 0.5, 1.0);";

// ----------------------------------------------------------------------------
// Fragment stage: color space
// ----------------------------------------------------------------------------

pub(crate) const LINEAR_TO_LINEAR: &str = r#"vec4 linearToLinear(in vec4 value) {
    return value;
}"#;

pub(crate) const SRGB_TO_LINEAR: &str = r#"vec4 sRGBToLinear(in vec4 value) {
    return vec4(mix(pow(value.rgb * 0.9478672986 + vec3(0.0521327014), vec3(2.4)), value.rgb * 0.0773993808, vec3(lessThanEqual(value.rgb, vec3(0.04045)))), value.w);
}"#;

pub(crate) const GAMMA_TO_LINEAR: &str = r#"vec4 gammaToLinear(in vec4 value, in float gammaFactor) {
    return vec4(pow(value.xyz, vec3(gammaFactor)), value.w);
}"#;

pub(crate) const LINEAR_TO_GAMMA: &str = r#"vec4 linearToGamma(in vec4 value, in float gammaFactor) {
    return vec4(pow(value.xyz, vec3(1.0 / gammaFactor)), value.w);
}"#;

// ----------------------------------------------------------------------------
// Fragment stage: surface
// ----------------------------------------------------------------------------

pub(crate) const FRESNEL: &str = r#"float fresnel(vec3 eyeDir, vec3 normal, float edgeBias, float centerBias, float power) {
    float fr = abs(dot(eyeDir, normal));
    float finalFr = clamp((fr - edgeBias) / (centerBias - edgeBias), 0.0, 1.0);
    return pow(finalFr, power);
}"#;

/// Tangent-free normal mapping from screen-space derivatives
pub(crate) const PERTURB_NORMAL: &str = r#"vec3 perturbNormal2Arb(vec3 eyePos, vec3 surfNorm, vec2 uv, vec3 mapN) {
    vec3 q0 = dFdx(eyePos.xyz);
    vec3 q1 = dFdy(eyePos.xyz);
    vec2 st0 = dFdx(uv.st);
    vec2 st1 = dFdy(uv.st);
    vec3 S = normalize(q0 * st1.t - q1 * st0.t);
    vec3 T = normalize(-q0 * st1.s + q1 * st0.s);
    vec3 N = normalize(surfNorm);
    mat3 tsn = mat3(S, T, N);
    return normalize(tsn * mapN);
}"#;

pub(crate) const INVERSE_TRANSFORM_DIRECTION: &str = r#"vec3 inverseTransformDirection(in vec3 dir, in mat4 matrix) {
    return normalize((vec4(dir, 0.0) * matrix).xyz);
}"#;

pub(crate) const UNPACK_DEPTH: &str = r#"float unpackDepth(const in vec4 packedDepth) {
    const vec4 bitShift = vec4(1.0 / (256.0 * 256.0 * 256.0), 1.0 / (256.0 * 256.0), 1.0 / 256.0, 1.0);
    return dot(packedDepth, bitShift);
}"#;

pub(crate) const PACK_DEPTH: &str = r#"vec4 packDepth(const in float depth) {
    const vec4 bitShift = vec4(256.0 * 256.0 * 256.0, 256.0 * 256.0, 256.0, 1.0);
    const vec4 bitMask = vec4(0.0, 1.0 / 256.0, 1.0 / 256.0, 1.0 / 256.0);
    vec4 res = fract(depth * bitShift);
    res -= res.xxyz * bitMask;
    return res;
}"#;

// ----------------------------------------------------------------------------
// Fragment stage: lighting
// ----------------------------------------------------------------------------

pub(crate) const MATERIAL_STRUCT: &str = r#"struct Material {
    vec3 diffuseColor;
    vec3 specularColor;
    float specularRoughness;
    float shine;
};"#;

pub(crate) const INCIDENT_LIGHT_STRUCT: &str = r#"struct IncidentLight {
    vec3 color;
    vec3 direction;
};"#;

pub(crate) const REFLECTED_LIGHT_STRUCT: &str = r#"struct ReflectedLight {
    vec3 diffuse;
    vec3 specular;
};"#;

pub(crate) const GEOMETRY_STRUCT: &str = r#"struct Geometry {
    vec3 position;
    vec3 viewNormal;
    vec3 viewEyeDir;
};"#;

pub(crate) const BRDF_DIFFUSE_LAMBERT: &str = r#"vec3 BRDF_Diffuse_Lambert(const in vec3 diffuseColor) {
    return RECIPROCAL_PI * diffuseColor;
}"#;

pub(crate) const LAMBERT_LIGHTING: &str = r#"void computeLambertLighting(const in IncidentLight directLight, const in Geometry geometry, const in Material material, inout ReflectedLight reflectedLight) {
    float dotNL = saturate(dot(geometry.viewNormal, directLight.direction));
    vec3 irradiance = dotNL * directLight.color * PI;
    reflectedLight.diffuse += irradiance * BRDF_Diffuse_Lambert(material.diffuseColor);
}"#;

pub(crate) const PHONG_LIGHTING: &str = r#"void computePhongLighting(const in IncidentLight directLight, const in Geometry geometry, const in Material material, inout ReflectedLight reflectedLight) {
    float dotNL = saturate(dot(geometry.viewNormal, directLight.direction));
    vec3 irradiance = dotNL * directLight.color * PI;
    reflectedLight.diffuse += irradiance * BRDF_Diffuse_Lambert(material.diffuseColor);
    reflectedLight.specular += directLight.color * material.specularColor * pow(max(dot(reflect(-directLight.direction, geometry.viewNormal), geometry.viewEyeDir), 0.0), material.shine);
}"#;

pub(crate) const F_SCHLICK: &str = r#"vec3 F_Schlick(const in vec3 specularColor, const in float dotLH) {
    float fresnel = exp2((-5.55473 * dotLH - 6.98316) * dotLH);
    return (1.0 - specularColor) * fresnel + specularColor;
}"#;

pub(crate) const G_GGX_SMITH_CORRELATED: &str = r#"float G_GGX_SmithCorrelated(const in float alpha, const in float dotNL, const in float dotNV) {
    float a2 = alpha * alpha;
    float gl = dotNL * sqrt(a2 + (1.0 - a2) * (dotNV * dotNV));
    float gv = dotNV * sqrt(a2 + (1.0 - a2) * (dotNL * dotNL));
    return 0.5 / max(gl + gv, EPSILON);
}"#;

pub(crate) const D_GGX: &str = r#"float D_GGX(const in float alpha, const in float dotNH) {
    float a2 = alpha * alpha;
    float denom = (dotNH * dotNH) * (a2 - 1.0) + 1.0;
    return RECIPROCAL_PI * a2 / (denom * denom);
}"#;

pub(crate) const BRDF_SPECULAR_GGX: &str = r#"vec3 BRDF_Specular_GGX(const in IncidentLight incidentLight, const in Geometry geometry, const in vec3 specularColor, const in float roughness) {
    float alpha = roughness * roughness;
    vec3 halfDir = normalize(incidentLight.direction + geometry.viewEyeDir);
    float dotNL = saturate(dot(geometry.viewNormal, incidentLight.direction));
    float dotNV = saturate(dot(geometry.viewNormal, geometry.viewEyeDir));
    float dotNH = saturate(dot(geometry.viewNormal, halfDir));
    float dotLH = saturate(dot(incidentLight.direction, halfDir));
    vec3 F = F_Schlick(specularColor, dotLH);
    float G = G_GGX_SmithCorrelated(alpha, dotNL, dotNV);
    float D = D_GGX(alpha, dotNH);
    return F * (G * D);
}"#;

pub(crate) const PBR_LIGHTING: &str = r#"void computePBRLighting(const in IncidentLight incidentLight, const in Geometry geometry, const in Material material, inout ReflectedLight reflectedLight) {
    float dotNL = saturate(dot(geometry.viewNormal, incidentLight.direction));
    vec3 irradiance = dotNL * incidentLight.color * PI;
    reflectedLight.diffuse += irradiance * BRDF_Diffuse_Lambert(material.diffuseColor);
    reflectedLight.specular += irradiance * BRDF_Specular_GGX(incidentLight, geometry, material.specularColor, material.specularRoughness);
}"#;

// ----------------------------------------------------------------------------
// Configurable snippets
// ----------------------------------------------------------------------------

/// GLSL float literal that always carries a decimal point or exponent
pub(crate) fn float_literal(value: f32) -> String {
    let text = format!("{value:?}");
    if text.contains(['.', 'e', 'E']) || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{text}.0")
    }
}

/// Percentage-closer filter over a `(2r+1)²` texel grid
pub(crate) fn compute_shadow(radius: u32, bias: f32, map_size: u32) -> String {
    let r = float_literal(radius as f32);
    let taps = (2 * radius + 1) * (2 * radius + 1);
    format!(
        r#"float computeShadow(sampler2D shadowMap, vec4 shadowPosFromLight) {{
    vec3 shadowCoord = shadowPosFromLight.xyz / shadowPosFromLight.w;
    float texelSize = 1.0 / {size};
    float shadow = 0.0;
    for (float x = -{r}; x <= {r}; x += 1.0) {{
        for (float y = -{r}; y <= {r}; y += 1.0) {{
            float depth = unpackDepth(texture2D(shadowMap, shadowCoord.xy + vec2(x, y) * texelSize));
            shadow += (shadowCoord.z - {bias} > depth) ? 0.0 : 1.0;
        }}
    }}
    return shadow / {taps};
}}"#,
        size = float_literal(map_size as f32),
        bias = float_literal(bias),
        taps = float_literal(taps as f32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_literals_are_glsl_floats() {
        assert_eq!(float_literal(3.0), "3.0");
        assert_eq!(float_literal(0.0007), "0.0007");
        assert_eq!(float_literal(49.0), "49.0");
        assert_eq!(float_literal(-1.5), "-1.5");
    }

    #[test]
    fn test_default_kernel_has_49_taps() {
        let source = compute_shadow(3, 0.0007, 1024);
        assert!(source.contains("for (float x = -3.0; x <= 3.0; x += 1.0)"));
        assert!(source.contains("for (float y = -3.0; y <= 3.0; y += 1.0)"));
        assert!(source.contains("shadowCoord.z - 0.0007 > depth"));
        assert!(source.contains("return shadow / 49.0;"));
        assert!(source.contains("1.0 / 1024.0"));
    }

    #[test]
    fn test_zero_radius_is_a_single_tap() {
        let source = compute_shadow(0, 0.001, 512);
        assert!(source.contains("for (float x = -0.0; x <= 0.0; x += 1.0)"));
        assert!(source.contains("return shadow / 1.0;"));
    }
}
