//! Scene description files
//!
//! A scene file is JSON: the scene-wide state (camera, lights, clips,
//! environment) plus the drawables. Loading it builds a renderer on the
//! recording device and compiles every program.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use scenegl::graphics::{ProgramHandle, RecordingDevice};
use scenegl::shared::DrawableId;
use scenegl::{Drawable, Renderer, RendererConfig, SceneState};

/// Arguments shared by every command that reads a scene
#[derive(Args)]
pub struct SceneArgs {
    /// Path to the scene JSON file
    pub scene: PathBuf,

    /// Renderer configuration (TOML); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SceneFile {
    #[serde(flatten)]
    pub scene: SceneState,
    #[serde(default)]
    pub drawables: Vec<Drawable>,
}

impl SceneFile {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse scene file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }
}

/// A loaded scene with every program compiled
pub struct LoadedScene {
    pub renderer: Renderer<RecordingDevice>,
    /// Drawable ids in file order
    pub drawables: Vec<DrawableId>,
}

/// Drawables grouped by the program they share
pub struct ProgramGroup {
    pub handle: ProgramHandle,
    pub drawables: Vec<DrawableId>,
}

impl LoadedScene {
    pub fn open(args: &SceneArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => RendererConfig::load(path)?,
            None => RendererConfig::default(),
        };
        let file = SceneFile::load(&args.scene)?;
        Self::build(file, config)
    }

    pub fn build(file: SceneFile, config: RendererConfig) -> Result<Self> {
        let mut renderer = Renderer::new(RecordingDevice::new(), config);
        renderer.set_camera(file.scene.camera);
        renderer
            .set_lights(file.scene.lights)
            .context("Failed to create shadow maps")?;
        renderer.set_clips(file.scene.clips);
        renderer.set_environment(file.scene.environment);

        let mut drawables = Vec::with_capacity(file.drawables.len());
        for drawable in file.drawables {
            let id = drawable.id;
            renderer
                .add_drawable(drawable)
                .with_context(|| format!("Failed to upload drawable {}", id.0))?;
            if !drawables.contains(&id) {
                drawables.push(id);
            }
        }

        for failure in renderer.compile() {
            tracing::warn!(
                "Drawable {} failed to build: {}",
                failure.drawable.0,
                failure.error
            );
        }

        Ok(Self {
            renderer,
            drawables,
        })
    }

    /// Programs in creation order with their drawables; drawables without a
    /// program are returned separately
    pub fn groups(&self) -> (Vec<ProgramGroup>, Vec<DrawableId>) {
        let mut groups: BTreeMap<u32, ProgramGroup> = BTreeMap::new();
        let mut orphans = Vec::new();
        for &id in &self.drawables {
            match self.renderer.program_of(id) {
                Some(handle) => groups
                    .entry(handle.index())
                    .or_insert_with(|| ProgramGroup {
                        handle,
                        drawables: Vec::new(),
                    })
                    .drawables
                    .push(id),
                None => orphans.push(id),
            }
        }
        (groups.into_values().collect(), orphans)
    }
}

pub fn id_list(ids: &[DrawableId]) -> String {
    ids.iter()
        .map(|id| id.0.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "lights": [
            { "type": "ambient", "color": [0.2, 0.2, 0.2] },
            { "type": "directional", "dir": [0.0, -1.0, 0.0] }
        ],
        "drawables": [
            {
                "id": 1,
                "geometry": { "id": 1, "positions": { "type": "f32", "data": [0, 0, 0, 1, 0, 0, 0, 1, 0] }, "auto_normals": true },
                "material": { "id": 1, "material": { "kind": "phong" } },
                "transform": { "id": 1 }
            },
            {
                "id": 2,
                "geometry": { "id": 1, "positions": { "type": "f32", "data": [0, 0, 0, 1, 0, 0, 0, 1, 0] }, "auto_normals": true },
                "material": { "id": 2, "material": { "kind": "phong", "shininess": 8.0 } },
                "transform": { "id": 2 }
            },
            {
                "id": 3,
                "geometry": { "id": 2, "topology": "points", "positions": { "type": "f32", "data": [0, 0, 0] } },
                "material": { "id": 3, "material": { "kind": "lambert" } },
                "transform": { "id": 3 }
            }
        ]
    }"#;

    #[test]
    fn test_scene_groups_drawables_by_program() {
        let file = SceneFile::parse(SCENE).unwrap();
        assert_eq!(file.scene.lights.len(), 2);
        let loaded = LoadedScene::build(file, RendererConfig::default()).unwrap();

        let (groups, orphans) = loaded.groups();
        assert!(orphans.is_empty());
        assert_eq!(groups.len(), 2);
        let shared = groups
            .iter()
            .find(|group| group.drawables.contains(&DrawableId(1)))
            .unwrap();
        assert_eq!(shared.drawables, vec![DrawableId(1), DrawableId(2)]);
        assert_eq!(id_list(&shared.drawables), "1, 2");
        assert_eq!(
            loaded.renderer.cache().use_count(shared.handle),
            Some(2)
        );
    }

    #[test]
    fn test_scene_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SceneFile::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
