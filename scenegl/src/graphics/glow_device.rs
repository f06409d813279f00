//! OpenGL ES 2 / WebGL 1 backend on top of `glow`

use std::sync::Arc;

use glam::Vec4;
use glow::{HasContext, PixelUnpackData};
use hashbrown::HashMap;

use scenegl_shared::{ComponentType, PrimitiveTopology, TextureId};

use super::device::{
    AttributeLayout, BufferId, BufferTarget, DeviceError, DeviceLimits, GraphicsDevice, IndexType,
    ProgramId, RenderTargetId, TextureTarget, UniformLocation, UniformValue,
};
use super::program::ProgramError;
use crate::shader_gen::Stage;

struct GlowProgram {
    native: glow::Program,
    uniforms: Vec<glow::UniformLocation>,
    uniform_slots: HashMap<String, u32>,
}

struct GlowRenderTarget {
    framebuffer: glow::Framebuffer,
    depth: glow::Renderbuffer,
}

/// [`GraphicsDevice`] backed by a current GL context
pub struct GlowDevice {
    gl: Arc<glow::Context>,
    limits: DeviceLimits,
    surface_size: (u32, u32),
    next_id: u32,
    programs: HashMap<ProgramId, GlowProgram>,
    buffers: HashMap<BufferId, glow::Buffer>,
    textures: HashMap<TextureId, glow::Texture>,
    render_targets: HashMap<RenderTargetId, GlowRenderTarget>,
    current_program: Option<ProgramId>,
}

fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn topology_mode(topology: PrimitiveTopology) -> u32 {
    match topology {
        PrimitiveTopology::Points => glow::POINTS,
        PrimitiveTopology::Lines => glow::LINES,
        PrimitiveTopology::LineLoop => glow::LINE_LOOP,
        PrimitiveTopology::LineStrip => glow::LINE_STRIP,
        PrimitiveTopology::Triangles => glow::TRIANGLES,
        PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveTopology::TriangleFan => glow::TRIANGLE_FAN,
    }
}

fn component_type(component: ComponentType) -> u32 {
    match component {
        ComponentType::F32 => glow::FLOAT,
        ComponentType::U16 => glow::UNSIGNED_SHORT,
        ComponentType::I8 => glow::BYTE,
        ComponentType::U8 => glow::UNSIGNED_BYTE,
    }
}

impl GlowDevice {
    /// Wrap a GL context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on this thread for the lifetime of the device,
    /// and [`destroy`](Self::destroy) must run before the context is dropped.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        let units = unsafe { gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS) };
        let limits = DeviceLimits {
            max_texture_units: u32::try_from(units).unwrap_or(0).max(1),
        };
        let mut viewport = [0i32; 4];
        unsafe {
            gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport);
            gl.enable(glow::DEPTH_TEST);
        }
        let surface_size = (
            u32::try_from(viewport[2]).unwrap_or(0),
            u32::try_from(viewport[3]).unwrap_or(0),
        );
        Self {
            gl,
            limits,
            surface_size,
            next_id: 0,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            render_targets: HashMap::new(),
            current_program: None,
        }
    }

    /// Release every GL object still owned by the device
    pub fn destroy(&mut self) {
        let gl = &self.gl;
        unsafe {
            for (_, program) in self.programs.drain() {
                gl.delete_program(program.native);
            }
            for (_, buffer) in self.buffers.drain() {
                gl.delete_buffer(buffer);
            }
            for (_, texture) in self.textures.drain() {
                gl.delete_texture(texture);
            }
            for (_, target) in self.render_targets.drain() {
                gl.delete_framebuffer(target.framebuffer);
                gl.delete_renderbuffer(target.depth);
            }
        }
        self.current_program = None;
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn compile_shader(&self, stage: Stage, source: &str) -> Result<glow::Shader, ProgramError> {
        let gl = &self.gl;
        let ty = match stage {
            Stage::Vertex => glow::VERTEX_SHADER,
            Stage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = gl.create_shader(ty).map_err(ProgramError::Device)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(ProgramError::Compile { stage, log });
            }
            Ok(shader)
        }
    }
}

impl GraphicsDevice for GlowDevice {
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
        let vert = self.compile_shader(Stage::Vertex, vertex)?;
        let frag = match self.compile_shader(Stage::Fragment, fragment) {
            Ok(frag) => frag,
            Err(e) => {
                unsafe { self.gl.delete_shader(vert) };
                return Err(e);
            }
        };

        let gl = &self.gl;
        let native = unsafe {
            let program = match gl.create_program() {
                Ok(program) => program,
                Err(e) => {
                    gl.delete_shader(vert);
                    gl.delete_shader(frag);
                    return Err(ProgramError::Device(e));
                }
            };
            gl.attach_shader(program, vert);
            gl.attach_shader(program, frag);
            for (name, slot) in attributes {
                gl.bind_attrib_location(program, *slot, name);
            }
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            let log = if linked {
                String::new()
            } else {
                gl.get_program_info_log(program)
            };
            gl.detach_shader(program, vert);
            gl.detach_shader(program, frag);
            gl.delete_shader(vert);
            gl.delete_shader(frag);
            if !linked {
                gl.delete_program(program);
                return Err(ProgramError::Link { log });
            }
            program
        };

        let id = ProgramId(self.allocate());
        self.programs.insert(
            id,
            GlowProgram {
                native,
                uniforms: Vec::new(),
                uniform_slots: HashMap::new(),
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(entry) = self.programs.remove(&program) {
            unsafe { self.gl.delete_program(entry.native) };
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let entry = self.programs.get_mut(&program)?;
        if let Some(&slot) = entry.uniform_slots.get(name) {
            return Some(UniformLocation { program, slot });
        }
        let location = unsafe { self.gl.get_uniform_location(entry.native, name) }?;
        let slot = entry.uniforms.len() as u32;
        entry.uniforms.push(location);
        entry.uniform_slots.insert(name.to_string(), slot);
        Some(UniformLocation { program, slot })
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        let entry = self.programs.get(&program)?;
        unsafe { self.gl.get_attrib_location(entry.native, name) }
    }

    fn use_program(&mut self, program: ProgramId) {
        if let Some(entry) = self.programs.get(&program) {
            unsafe { self.gl.use_program(Some(entry.native)) };
            self.current_program = Some(program);
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if self.current_program != Some(location.program) {
            tracing::warn!(
                "uniform upload for program {:?} while another program is bound",
                location.program
            );
            return;
        }
        let Some(loc) = self
            .programs
            .get(&location.program)
            .and_then(|p| p.uniforms.get(location.slot as usize))
        else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            match value {
                UniformValue::Bool(v) => gl.uniform_1_i32(Some(loc), v as i32),
                UniformValue::Float(v) => gl.uniform_1_f32(Some(loc), v),
                UniformValue::Vec2(v) => gl.uniform_2_f32(Some(loc), v.x, v.y),
                UniformValue::Vec3(v) => gl.uniform_3_f32(Some(loc), v.x, v.y, v.z),
                UniformValue::Vec4(v) => gl.uniform_4_f32(Some(loc), v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    gl.uniform_matrix_3_f32_slice(Some(loc), false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    gl.uniform_matrix_4_f32_slice(Some(loc), false, &m.to_cols_array())
                }
                UniformValue::Sampler(unit) => gl.uniform_1_i32(Some(loc), unit as i32),
            }
        }
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId, DeviceError> {
        let gl = &self.gl;
        let binding = match target {
            BufferTarget::Vertex => glow::ARRAY_BUFFER,
            BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
        };
        let buffer = unsafe {
            let buffer = gl.create_buffer().map_err(DeviceError::Buffer)?;
            gl.bind_buffer(binding, Some(buffer));
            gl.buffer_data_u8_slice(binding, data, glow::STATIC_DRAW);
            gl.bind_buffer(binding, None);
            buffer
        };
        let id = BufferId(self.allocate());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(native) = self.buffers.remove(&buffer) {
            unsafe { self.gl.delete_buffer(native) };
        }
    }

    fn bind_vertex_attribute(&mut self, buffer: BufferId, layout: AttributeLayout) {
        let Some(&native) = self.buffers.get(&buffer) else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(native));
            gl.enable_vertex_attrib_array(layout.slot);
            gl.vertex_attrib_pointer_f32(
                layout.slot,
                gl_size(layout.components),
                component_type(layout.component),
                layout.normalized,
                0,
                0,
            );
        }
    }

    fn disable_vertex_attribute(&mut self, slot: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(slot) };
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        if let Some(&native) = self.buffers.get(&buffer) {
            unsafe { self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(native)) };
        }
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId, DeviceError> {
        let gl = &self.gl;
        let texture = unsafe {
            let texture = gl.create_texture().map_err(DeviceError::Texture)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                gl_size(width),
                gl_size(height),
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(pixels),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };
        let id = TextureId(self.allocate());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(native) = self.textures.remove(&texture) {
            unsafe { self.gl.delete_texture(native) };
        }
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId) {
        let Some(&native) = self.textures.get(&texture) else {
            tracing::debug!("bind of unknown texture {texture}");
            return;
        };
        let binding = match target {
            TextureTarget::Texture2D => glow::TEXTURE_2D,
            TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
        };
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(binding, Some(native));
        }
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        color: TextureId,
    ) -> Result<RenderTargetId, DeviceError> {
        let Some(&color_native) = self.textures.get(&color) else {
            return Err(DeviceError::RenderTarget(format!("unknown color texture {color}")));
        };
        let gl = &self.gl;
        let target = unsafe {
            let framebuffer = gl.create_framebuffer().map_err(DeviceError::RenderTarget)?;
            let depth = match gl.create_renderbuffer() {
                Ok(depth) => depth,
                Err(e) => {
                    gl.delete_framebuffer(framebuffer);
                    return Err(DeviceError::RenderTarget(e));
                }
            };
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT16,
                gl_size(width),
                gl_size(height),
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color_native),
                0,
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(framebuffer);
                gl.delete_renderbuffer(depth);
                return Err(DeviceError::RenderTarget(format!(
                    "framebuffer incomplete: 0x{status:x}"
                )));
            }
            GlowRenderTarget { framebuffer, depth }
        };
        let id = RenderTargetId(self.allocate());
        self.render_targets.insert(id, target);
        Ok(id)
    }

    fn delete_render_target(&mut self, target: RenderTargetId) {
        if let Some(entry) = self.render_targets.remove(&target) {
            unsafe {
                self.gl.delete_framebuffer(entry.framebuffer);
                self.gl.delete_renderbuffer(entry.depth);
            }
        }
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        let framebuffer = target
            .and_then(|t| self.render_targets.get(&t))
            .map(|t| t.framebuffer);
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, gl_size(width), gl_size(height)) };
    }

    fn clear(&mut self, color: Option<Vec4>, depth: bool) {
        let mut mask = 0;
        unsafe {
            if let Some(c) = color {
                self.gl.clear_color(c.x, c.y, c.z, c.w);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if depth {
                self.gl.clear_depth_f32(1.0);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(topology_mode(topology), gl_size(first), gl_size(count))
        };
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType) {
        let ty = match index_type {
            IndexType::U16 => glow::UNSIGNED_SHORT,
            IndexType::U32 => glow::UNSIGNED_INT,
        };
        unsafe {
            self.gl
                .draw_elements(topology_mode(topology), gl_size(count), ty, 0)
        };
    }
}
