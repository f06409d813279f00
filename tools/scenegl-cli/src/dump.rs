//! Dump command - print synthesized GLSL
//!
//! Each program is printed once, headed by the drawables that share it.

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};

use scenegl::shader_gen::{ProgramSource, Stage};
use scenegl::shared::DrawableId;

use crate::scene_file::{LoadedScene, SceneArgs, id_list};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    Vertex,
    Fragment,
    Both,
}

impl StageArg {
    fn stages(self) -> &'static [Stage] {
        match self {
            StageArg::Vertex => &[Stage::Vertex],
            StageArg::Fragment => &[Stage::Fragment],
            StageArg::Both => &[Stage::Vertex, Stage::Fragment],
        }
    }
}

/// Arguments for the dump command
#[derive(Args)]
pub struct DumpArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Which shader stage(s) to print
    #[arg(short, long, value_enum, default_value_t = StageArg::Both)]
    pub stage: StageArg,

    /// Only print the program of this drawable
    #[arg(short, long)]
    pub drawable: Option<u32>,
}

/// Execute the dump command
pub fn execute(args: DumpArgs) -> Result<()> {
    let loaded = LoadedScene::open(&args.scene)?;
    let (groups, orphans) = loaded.groups();
    let cache = loaded.renderer.cache();

    let mut printed = 0;
    for group in &groups {
        if args
            .drawable
            .is_some_and(|id| !group.drawables.contains(&DrawableId(id)))
        {
            continue;
        }
        let (Some(source), Some(key)) = (cache.source(group.handle), cache.key(group.handle))
        else {
            continue;
        };
        println!(
            "// program #{} {:016x} drawables: {}",
            group.handle.index(),
            key.digest(),
            id_list(&group.drawables)
        );
        print!("{}", render_stages(source, args.stage));
        printed += 1;
    }

    if !orphans.is_empty() {
        eprintln!("No program for drawables: {}", id_list(&orphans));
    }
    if printed == 0 {
        match args.drawable {
            Some(id) => bail!("Drawable {id} has no program"),
            None => bail!("Scene has no drawables"),
        }
    }
    Ok(())
}

fn render_stages(source: &ProgramSource, which: StageArg) -> String {
    let mut out = String::new();
    for &stage in which.stages() {
        out.push_str(&format!("// --- {} ---\n", stage.name()));
        for line in source.stage(stage) {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ProgramSource {
        scenegl::shader_gen::synthesize_shadow_depth(
            &scenegl::shader_gen::DepthFeatures {
                quantized: false,
                billboard: Default::default(),
                stationary: false,
                is_points: false,
            },
            &Default::default(),
        )
    }

    #[test]
    fn test_render_single_stage() {
        let text = render_stages(&source(), StageArg::Fragment);
        assert!(text.starts_with(&format!("// --- {} ---\n", Stage::Fragment.name())));
        assert!(!text.contains(&format!("// --- {} ---", Stage::Vertex.name())));
        assert!(text.contains("void main(void) {"));
    }

    #[test]
    fn test_render_both_stages_in_order() {
        let text = render_stages(&source(), StageArg::Both);
        let vertex = text.find(&format!("// --- {} ---", Stage::Vertex.name())).unwrap();
        let fragment = text
            .find(&format!("// --- {} ---", Stage::Fragment.name()))
            .unwrap();
        assert!(vertex < fragment);
    }
}
