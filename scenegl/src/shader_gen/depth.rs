//! Shadow map depth program
//!
//! Renders fragment depth packed into RGBA8 so shadow maps work without
//! depth textures. Shares the position path with the draw program, so the
//! same model/view/projection uniforms apply; the shadow pass pushes the
//! light's view and projection into them.

use super::ShaderOptions;
use super::builder::{Stage, StageBuilder};
use super::key::DepthFeatures;
use super::names;
use super::snippets;
use super::vertex::emit_positions;

pub(crate) fn synthesize_depth_vertex(
    features: &DepthFeatures,
    options: &ShaderOptions,
) -> StageBuilder {
    let mut b = StageBuilder::new(Stage::Vertex);
    b.directive(format!("precision {} float;", options.precision.qualifier()));
    emit_positions(
        &mut b,
        features.quantized,
        features.billboard,
        features.stationary,
    );
    if features.is_points {
        b.uniform("float", names::POINT_SIZE);
        b.stmt("gl_PointSize = pointSize;");
    }
    b.stmt("gl_Position = projMatrix * viewPosition;");
    b
}

pub(crate) fn synthesize_depth_fragment(options: &ShaderOptions) -> StageBuilder {
    let mut b = StageBuilder::new(Stage::Fragment);
    b.directive(format!("precision {} float;", options.precision.qualifier()));
    b.define("packDepth", snippets::PACK_DEPTH);
    b.stmt("gl_FragColor = packDepth(gl_FragCoord.z);");
    b
}
