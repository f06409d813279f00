//! Keys command - print program keys and sharing groups

use anyhow::Result;
use clap::Args;

use scenegl::shader_gen::{FeatureConfig, ProgramKey};

use crate::scene_file::{LoadedScene, SceneArgs, id_list};

/// Arguments for the keys command
#[derive(Args)]
pub struct KeysArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Print the full key instead of a summary
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the keys command
pub fn execute(args: KeysArgs) -> Result<()> {
    let loaded = LoadedScene::open(&args.scene)?;
    let (groups, orphans) = loaded.groups();
    let cache = loaded.renderer.cache();

    for group in &groups {
        let Some(key) = cache.key(group.handle) else {
            continue;
        };
        println!(
            "#{} {:016x} users={} drawables: {}",
            group.handle.index(),
            key.digest(),
            cache.use_count(group.handle).unwrap_or(0),
            id_list(&group.drawables)
        );
        if args.verbose {
            println!("    {key:?}");
        } else {
            println!("    {}", summarize(key));
        }
    }
    if !orphans.is_empty() {
        println!("no program: {}", id_list(&orphans));
    }

    let stats = cache.stats();
    println!(
        "{} programs, {} compiles, {} cache hits, {} failures",
        cache.len(),
        stats.compiles,
        stats.hits,
        stats.failures
    );
    Ok(())
}

/// One-line description of the features a key enables
pub fn summarize(key: &ProgramKey) -> String {
    match key {
        ProgramKey::ShadowDepth(depth) => {
            let mut parts = vec!["shadow depth".to_string()];
            if depth.quantized {
                parts.push("quantized".to_string());
            }
            if depth.is_points {
                parts.push("points".to_string());
            }
            parts.join(" ")
        }
        ProgramKey::Draw(config) => summarize_config(config),
    }
}

fn summarize_config(config: &FeatureConfig) -> String {
    let mut parts = vec![config.material_kind.name().to_string()];
    if !config.light_slots.is_empty() {
        let lights: Vec<String> = config
            .light_slots
            .iter()
            .map(|slot| {
                let shadow = if slot.casts_shadow { "+shadow" } else { "" };
                format!("{}:{:?}{shadow}", slot.index, slot.light_type).to_lowercase()
            })
            .collect();
        parts.push(format!("lights[{}]", lights.join(" ")));
    }
    if !config.textures.is_empty() {
        let maps: Vec<&str> = config
            .textures
            .iter()
            .map(|(channel, _)| channel.stem())
            .collect();
        parts.push(format!("maps[{}]", maps.join(" ")));
    }
    for (enabled, flag) in [
        (config.has_normals, "normals"),
        (config.has_uv, "uv"),
        (config.has_colors, "colors"),
        (config.has_normal_map, "normal-map"),
        (config.quantized, "quantized"),
        (config.is_points, "points"),
        (config.stationary, "stationary"),
        (config.has_light_map, "light-map"),
        (config.has_reflection_map, "reflection-map"),
    ] {
        if enabled {
            parts.push(flag.to_string());
        }
    }
    if config.clip_count > 0 {
        parts.push(format!("clips={}", config.clip_count));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenegl::shader_gen::DepthFeatures;

    #[test]
    fn test_summarize_depth_key() {
        let key = ProgramKey::ShadowDepth(DepthFeatures {
            quantized: true,
            billboard: Default::default(),
            stationary: false,
            is_points: false,
        });
        assert_eq!(summarize(&key), "shadow depth quantized");
    }
}
