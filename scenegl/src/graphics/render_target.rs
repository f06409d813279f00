//! Offscreen render targets
//!
//! A render target pairs a color texture with a framebuffer that also has a
//! depth attachment. Shadow maps render packed depth into the color texture.

use scenegl_shared::TextureId;

use super::device::{DeviceError, GraphicsDevice, RenderTargetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: RenderTargetId,
    pub color: TextureId,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        width: u32,
        height: u32,
    ) -> Result<Self, DeviceError> {
        let color = device.create_texture(width, height, None)?;
        let id = match device.create_render_target(width, height, color) {
            Ok(id) => id,
            Err(e) => {
                device.delete_texture(color);
                return Err(e);
            }
        };
        tracing::debug!("Created render target {}x{}", width, height);
        Ok(Self {
            id,
            color,
            width,
            height,
        })
    }

    /// Bind for drawing and cover the whole target with the viewport
    pub fn bind<D: GraphicsDevice + ?Sized>(&self, device: &mut D) {
        device.bind_render_target(Some(self.id));
        device.set_viewport(self.width, self.height);
    }

    pub fn destroy<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        device.delete_render_target(self.id);
        device.delete_texture(self.color);
    }
}
