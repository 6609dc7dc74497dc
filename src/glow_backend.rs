// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::num::NonZeroU32;
use std::rc::Rc;

use glow::{Context as GlowContext, HasContext};

use crate::backend::GlesBackend;

/// Driver-backed implementation over a `glow` context.
///
/// The context lives in an `Rc`, so a backend can be shared by the renderer
/// and the resources it creates but never leaves the rendering thread.
pub struct GlowBackend {
    gl: Rc<GlowContext>,
}

fn shader(name: u32) -> Option<glow::NativeShader> {
    NonZeroU32::new(name).map(glow::NativeShader)
}

fn program(name: u32) -> Option<glow::NativeProgram> {
    NonZeroU32::new(name).map(glow::NativeProgram)
}

fn texture(name: u32) -> Option<glow::NativeTexture> {
    NonZeroU32::new(name).map(glow::NativeTexture)
}

impl GlowBackend {
    pub fn new(gl: Rc<GlowContext>) -> Self {
        Self { gl }
    }

    /// The wrapped context, for draw calls the resource layer does not cover.
    pub fn gl(&self) -> &GlowContext {
        &self.gl
    }
}

impl GlesBackend for GlowBackend {
    fn create_shader(&self, shader_type: u32) -> Result<u32, String> {
        unsafe { self.gl.create_shader(shader_type).map(|s| s.0.get()) }
    }

    fn shader_source(&self, name: u32, source: &str) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.shader_source(s, source) }
        }
    }

    fn compile_shader(&self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.compile_shader(s) }
        }
    }

    fn shader_compile_status(&self, name: u32) -> bool {
        match shader(name) {
            Some(s) => unsafe { self.gl.get_shader_compile_status(s) },
            None => false,
        }
    }

    fn shader_info_log(&self, name: u32) -> String {
        match shader(name) {
            Some(s) => unsafe { self.gl.get_shader_info_log(s) },
            None => String::new(),
        }
    }

    fn delete_shader(&self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn create_program(&self) -> Result<u32, String> {
        unsafe { self.gl.create_program().map(|p| p.0.get()) }
    }

    fn attach_shader(&self, program_name: u32, shader_name: u32) {
        if let (Some(p), Some(s)) = (program(program_name), shader(shader_name)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn link_program(&self, name: u32) {
        if let Some(p) = program(name) {
            unsafe { self.gl.link_program(p) }
        }
    }

    fn program_link_status(&self, name: u32) -> bool {
        match program(name) {
            Some(p) => unsafe { self.gl.get_program_link_status(p) },
            None => false,
        }
    }

    fn program_info_log(&self, name: u32) -> String {
        match program(name) {
            Some(p) => unsafe { self.gl.get_program_info_log(p) },
            None => String::new(),
        }
    }

    fn use_program(&self, name: u32) {
        unsafe { self.gl.use_program(program(name)) }
    }

    fn attrib_location(&self, name: u32, attrib: &str) -> Option<u32> {
        let p = program(name)?;
        unsafe { self.gl.get_attrib_location(p, attrib) }
    }

    fn delete_program(&self, name: u32) {
        if let Some(p) = program(name) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn create_texture(&self) -> Result<u32, String> {
        unsafe { self.gl.create_texture().map(|t| t.0.get()) }
    }

    fn delete_texture(&self, name: u32) {
        if let Some(t) = texture(name) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&self, target: u32, name: u32) {
        unsafe { self.gl.bind_texture(target, texture(name)) }
    }

    fn tex_image_2d(&self, target: u32, level: i32, width: u32, height: u32, rgba: &[u8]) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(rgba)),
            );
        }
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) }
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(pname) }
    }
}
