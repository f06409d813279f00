//! Linked programs and their resolved bindings

use hashbrown::HashMap;

use scenegl_shared::AttributeKind;

use super::device::{GraphicsDevice, ProgramId, UniformLocation, UniformValue};
use crate::shader_gen::{ProgramSource, Stage, names};

/// Error type for program creation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: Stage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("device error: {0}")]
    Device(String),
}

/// Uniform and attribute locations of one program, resolved once at link
/// time
#[derive(Debug, Clone, Default)]
pub struct ProgramBindings {
    uniforms: HashMap<String, UniformLocation>,
    attributes: HashMap<AttributeKind, u32>,
}

impl ProgramBindings {
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<u32> {
        self.attributes.get(&kind).copied()
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Upload `value` if the program has an active uniform called `name`
    pub fn set<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        if let Some(location) = self.uniform(name) {
            device.set_uniform(location, value.into());
        }
    }
}

/// A linked program owned by the program cache
#[derive(Debug)]
pub struct CompiledProgram {
    pub id: ProgramId,
    pub bindings: ProgramBindings,
    /// Hash of the source this program was built from
    pub source_hash: u64,
}

impl CompiledProgram {
    /// Compile, link and introspect `source`
    pub fn link<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        source: &ProgramSource,
    ) -> Result<Self, ProgramError> {
        let attributes: Vec<(&str, u32)> = AttributeKind::ALL
            .iter()
            .map(|&kind| (names::attribute(kind), names::attribute_slot(kind)))
            .collect();
        let id = device.create_program(
            &source.vertex_text(),
            &source.fragment_text(),
            &attributes,
        )?;

        let mut bindings = ProgramBindings::default();
        for name in declared_uniforms(source) {
            if let Some(location) = device.uniform_location(id, name) {
                bindings.uniforms.insert(name.to_string(), location);
            }
        }
        for kind in AttributeKind::ALL {
            if let Some(slot) = device.attribute_location(id, names::attribute(kind)) {
                bindings.attributes.insert(kind, slot);
            }
        }

        Ok(Self {
            id,
            bindings,
            source_hash: source.hash,
        })
    }
}

/// Names of the top-level `uniform` declarations in both stages
pub fn declared_uniforms(source: &ProgramSource) -> impl Iterator<Item = &str> {
    source
        .vertex
        .iter()
        .chain(source.fragment.iter())
        .filter_map(|line| {
            let rest = line.strip_prefix("uniform ")?;
            let name = rest.split_whitespace().nth(1)?;
            Some(name.trim_end_matches(';'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_uniforms_parses_both_stages() {
        let source = ProgramSource {
            vertex: vec![
                "precision highp float;".into(),
                "attribute vec3 position;".into(),
                "uniform mat4 modelMatrix;".into(),
            ],
            fragment: vec![
                "uniform vec3 lightColor0;".into(),
                "    float uniformish = 1.0;".into(),
            ],
            hash: 0,
        };
        let names: Vec<&str> = declared_uniforms(&source).collect();
        assert_eq!(names, vec!["modelMatrix", "lightColor0"]);
    }
}
