//! scenegl CLI - inspect the programs generated for a scene
//!
//! # Commands
//!
//! - `scenegl dump <scene.json>` - print the synthesized GLSL of every program
//! - `scenegl keys <scene.json>` - print program keys and which drawables share them
//!
//! # Scene file
//!
//! ```json
//! {
//!   "lights": [{ "type": "directional", "dir": [0, -1, 0] }],
//!   "drawables": [{
//!     "id": 1,
//!     "geometry": { "id": 1, "positions": { "type": "f32", "data": [0, 0, 0, 1, 0, 0, 0, 1, 0] }, "auto_normals": true },
//!     "material": { "id": 1, "material": { "kind": "phong" } },
//!     "transform": { "id": 1 }
//!   }]
//! }
//! ```
//!
//! Renderer options come from an optional TOML file (`--config`).

mod dump;
mod keys;
mod scene_file;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// scenegl CLI - inspect generated shader programs
#[derive(Parser)]
#[command(name = "scenegl")]
#[command(about = "Inspect the shader programs scenegl generates for a scene")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the synthesized GLSL of every program in the scene
    Dump(dump::DumpArgs),

    /// Print program keys and the drawables sharing each program
    Keys(keys::KeysArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump(args) => dump::execute(args),
        Commands::Keys(args) => keys::execute(args),
    }
}
