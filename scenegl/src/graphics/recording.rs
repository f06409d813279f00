//! Recording device
//!
//! Implements [`GraphicsDevice`] without a GPU: every call is appended to a
//! log that tests inspect. Uniform and attribute introspection is answered
//! from the declarations in the submitted source, so a program only reports
//! the names it actually declares.

use glam::Vec4;
use hashbrown::HashMap;

use scenegl_shared::{PrimitiveTopology, TextureId};

use super::device::{
    AttributeLayout, BufferId, BufferTarget, DeviceError, DeviceLimits, GraphicsDevice, IndexType,
    ProgramId, RenderTargetId, TextureTarget, UniformLocation, UniformValue,
};
use super::program::ProgramError;
use crate::shader_gen::Stage;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    CreateBuffer {
        buffer: BufferId,
        target: BufferTarget,
        size: usize,
    },
    DeleteBuffer(BufferId),
    BindAttribute {
        buffer: BufferId,
        layout: AttributeLayout,
    },
    DisableAttribute(u32),
    BindIndexBuffer(BufferId),
    CreateTexture(TextureId),
    DeleteTexture(TextureId),
    BindTexture {
        unit: u32,
        target: TextureTarget,
        texture: TextureId,
    },
    CreateRenderTarget(RenderTargetId),
    DeleteRenderTarget(RenderTargetId),
    BindRenderTarget(Option<RenderTargetId>),
    Viewport(u32, u32),
    Clear {
        color: Option<Vec4>,
        depth: bool,
    },
    DrawArrays {
        topology: PrimitiveTopology,
        count: u32,
    },
    DrawElements {
        topology: PrimitiveTopology,
        count: u32,
        index_type: IndexType,
    },
}

#[derive(Debug, Default)]
struct RecordedProgram {
    uniforms: Vec<String>,
    attributes: HashMap<String, u32>,
}

/// GPU-less device that logs every call
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    programs: HashMap<ProgramId, RecordedProgram>,
    limits: DeviceLimits,
    next_id: u32,
    fail_stage: Option<Stage>,
    fail_link: bool,
    surface_size: (u32, u32),
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            surface_size: (640, 480),
            ..Self::default()
        }
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Self::new()
        }
    }

    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = (width, height);
        self
    }

    /// Make every following compile of `stage` fail
    pub fn fail_compile(&mut self, stage: Option<Stage>) {
        self.fail_stage = stage;
    }

    /// Make every following link fail
    pub fn fail_link(&mut self, fail: bool) {
        self.fail_link = fail;
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Programs currently alive
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Last value uploaded to `name`
    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.calls.iter().rev().find_map(|call| match call {
            DeviceCall::SetUniform {
                name: n, value, ..
            } if n == name => Some(*value),
            _ => None,
        })
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// `qualifier ty name;` declarations at column 0
fn declarations<'a>(source: &'a str, qualifier: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    source.lines().filter_map(move |line| {
        let rest = line.strip_prefix(qualifier)?.strip_prefix(' ')?;
        let name = rest.split_whitespace().nth(1)?;
        Some(name.trim_end_matches(';'))
    })
}

impl GraphicsDevice for RecordingDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
        attributes: &[(&str, u32)],
    ) -> Result<ProgramId, ProgramError> {
        if let Some(stage) = self.fail_stage {
            return Err(ProgramError::Compile {
                stage,
                log: format!("ERROR: 0:1: forced {stage} failure"),
            });
        }
        if self.fail_link {
            return Err(ProgramError::Link {
                log: "forced link failure".to_string(),
            });
        }

        let id = ProgramId(self.allocate());
        let mut program = RecordedProgram::default();
        for name in declarations(vertex, "uniform").chain(declarations(fragment, "uniform")) {
            if !program.uniforms.iter().any(|u| u == name) {
                program.uniforms.push(name.to_string());
            }
        }
        for name in declarations(vertex, "attribute") {
            if let Some(&(_, slot)) = attributes.iter().find(|(n, _)| *n == name) {
                program.attributes.insert(name.to_string(), slot);
            }
        }
        self.programs.insert(id, program);
        self.calls.push(DeviceCall::CreateProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.calls.push(DeviceCall::DeleteProgram(program));
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let slot = self
            .programs
            .get(&program)?
            .uniforms
            .iter()
            .position(|u| u == name)?;
        Some(UniformLocation {
            program,
            slot: slot as u32,
        })
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.attributes.get(name).copied()
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self
            .programs
            .get(&location.program)
            .and_then(|p| p.uniforms.get(location.slot as usize))
            .cloned()
            .unwrap_or_default();
        self.calls.push(DeviceCall::SetUniform {
            program: location.program,
            name,
            value,
        });
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId, DeviceError> {
        let buffer = BufferId(self.allocate());
        self.calls.push(DeviceCall::CreateBuffer {
            buffer,
            target,
            size: data.len(),
        });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.calls.push(DeviceCall::DeleteBuffer(buffer));
    }

    fn bind_vertex_attribute(&mut self, buffer: BufferId, layout: AttributeLayout) {
        self.calls.push(DeviceCall::BindAttribute { buffer, layout });
    }

    fn disable_vertex_attribute(&mut self, slot: u32) {
        self.calls.push(DeviceCall::DisableAttribute(slot));
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.calls.push(DeviceCall::BindIndexBuffer(buffer));
    }

    fn create_texture(
        &mut self,
        _width: u32,
        _height: u32,
        _pixels: Option<&[u8]>,
    ) -> Result<TextureId, DeviceError> {
        let texture = TextureId(self.allocate());
        self.calls.push(DeviceCall::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(DeviceCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId) {
        self.calls.push(DeviceCall::BindTexture {
            unit,
            target,
            texture,
        });
    }

    fn create_render_target(
        &mut self,
        _width: u32,
        _height: u32,
        _color: TextureId,
    ) -> Result<RenderTargetId, DeviceError> {
        let target = RenderTargetId(self.allocate());
        self.calls.push(DeviceCall::CreateRenderTarget(target));
        Ok(target)
    }

    fn delete_render_target(&mut self, target: RenderTargetId) {
        self.calls.push(DeviceCall::DeleteRenderTarget(target));
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.calls.push(DeviceCall::BindRenderTarget(target));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(DeviceCall::Viewport(width, height));
    }

    fn clear(&mut self, color: Option<Vec4>, depth: bool) {
        self.calls.push(DeviceCall::Clear { color, depth });
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, _first: u32, count: u32) {
        self.calls.push(DeviceCall::DrawArrays { topology, count });
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType) {
        self.calls.push(DeviceCall::DrawElements {
            topology,
            count,
            index_type,
        });
    }
}
