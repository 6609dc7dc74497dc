// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::backend::GlesBackend;

/// One native call as seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlCall {
    CreateShader { shader_type: u32 },
    ShaderSource { shader: u32, source: String },
    CompileShader { shader: u32 },
    GetShaderCompileStatus { shader: u32 },
    GetShaderInfoLog { shader: u32 },
    DeleteShader { shader: u32 },
    CreateProgram,
    AttachShader { program: u32, shader: u32 },
    LinkProgram { program: u32 },
    GetProgramLinkStatus { program: u32 },
    GetProgramInfoLog { program: u32 },
    UseProgram { program: u32 },
    GetAttribLocation { program: u32, name: String },
    DeleteProgram { program: u32 },
    CreateTexture,
    DeleteTexture { texture: u32 },
    ActiveTexture { unit: u32 },
    BindTexture { target: u32, texture: u32 },
    TexImage2D { target: u32, level: i32, width: u32, height: u32 },
    TexParameter { target: u32, pname: u32, value: i32 },
    GenerateMipmap { target: u32 },
    GetParameter { pname: u32 },
}

/// A driver-less backend that hands out names, simulates the texture unit and
/// binding state, and records every call it receives.
///
/// Integer state queries answer from the simulated state unless a value was
/// pinned with [`RecordingBackend::stub_parameter`].
pub struct RecordingBackend {
    calls: RefCell<Vec<GlCall>>,
    next_name: Cell<u32>,
    fail_allocations: Cell<bool>,
    fail_compiles: Cell<bool>,
    fail_links: Cell<bool>,
    active_unit: Cell<u32>,
    // (active unit enum, target) -> bound texture
    texture_bindings: RefCell<HashMap<(u32, u32), u32>>,
    current_program: Cell<u32>,
    attributes: RefCell<HashMap<String, u32>>,
    stubs: RefCell<HashMap<u32, i32>>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            next_name: Cell::new(1),
            fail_allocations: Cell::new(false),
            fail_compiles: Cell::new(false),
            fail_links: Cell::new(false),
            active_unit: Cell::new(glow::TEXTURE0),
            texture_bindings: RefCell::new(HashMap::new()),
            current_program: Cell::new(0),
            attributes: RefCell::new(HashMap::new()),
            stubs: RefCell::new(HashMap::new()),
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything called so far, oldest first.
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Makes every following `create_*` call fail like an exhausted driver.
    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.set(fail);
    }

    pub fn fail_compiles(&self, fail: bool) {
        self.fail_compiles.set(fail);
    }

    pub fn fail_links(&self, fail: bool) {
        self.fail_links.set(fail);
    }

    /// Declares an active vertex attribute reported by every linked program.
    pub fn define_attribute(&self, name: &str, location: u32) {
        self.attributes.borrow_mut().insert(name.to_string(), location);
    }

    /// Pins the answer of `get_parameter_i32(pname)`.
    pub fn stub_parameter(&self, pname: u32, value: i32) {
        self.stubs.borrow_mut().insert(pname, value);
    }

    pub fn clear_stubs(&self) {
        self.stubs.borrow_mut().clear();
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> Result<u32, String> {
        if self.fail_allocations.get() {
            return Err("out of memory".to_string());
        }
        let name = self.next_name.get();
        self.next_name.set(name + 1);
        Ok(name)
    }

    fn bound_texture(&self, target: u32) -> u32 {
        self.texture_bindings
            .borrow()
            .get(&(self.active_unit.get(), target))
            .copied()
            .unwrap_or(0)
    }
}

impl GlesBackend for RecordingBackend {
    fn create_shader(&self, shader_type: u32) -> Result<u32, String> {
        self.record(GlCall::CreateShader { shader_type });
        self.allocate()
    }

    fn shader_source(&self, shader: u32, source: &str) {
        self.record(GlCall::ShaderSource {
            shader,
            source: source.to_string(),
        });
    }

    fn compile_shader(&self, shader: u32) {
        self.record(GlCall::CompileShader { shader });
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.record(GlCall::GetShaderCompileStatus { shader });
        !self.fail_compiles.get()
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.record(GlCall::GetShaderInfoLog { shader });
        if self.fail_compiles.get() {
            "0:1: error: syntax error".to_string()
        } else {
            String::new()
        }
    }

    fn delete_shader(&self, shader: u32) {
        self.record(GlCall::DeleteShader { shader });
    }

    fn create_program(&self) -> Result<u32, String> {
        self.record(GlCall::CreateProgram);
        self.allocate()
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(GlCall::AttachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        self.record(GlCall::LinkProgram { program });
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.record(GlCall::GetProgramLinkStatus { program });
        !self.fail_links.get()
    }

    fn program_info_log(&self, program: u32) -> String {
        self.record(GlCall::GetProgramInfoLog { program });
        if self.fail_links.get() {
            "error: vertex shader missing".to_string()
        } else {
            String::new()
        }
    }

    fn use_program(&self, program: u32) {
        self.record(GlCall::UseProgram { program });
        self.current_program.set(program);
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        self.record(GlCall::GetAttribLocation {
            program,
            name: name.to_string(),
        });
        self.attributes.borrow().get(name).copied()
    }

    fn delete_program(&self, program: u32) {
        self.record(GlCall::DeleteProgram { program });
        if self.current_program.get() == program {
            self.current_program.set(0);
        }
    }

    fn create_texture(&self) -> Result<u32, String> {
        self.record(GlCall::CreateTexture);
        self.allocate()
    }

    fn delete_texture(&self, texture: u32) {
        self.record(GlCall::DeleteTexture { texture });
        // glDeleteTextures reverts bindings of the deleted name to 0
        self.texture_bindings
            .borrow_mut()
            .retain(|_, bound| *bound != texture);
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture { unit });
        self.active_unit.set(unit);
    }

    fn bind_texture(&self, target: u32, texture: u32) {
        self.record(GlCall::BindTexture { target, texture });
        self.texture_bindings
            .borrow_mut()
            .insert((self.active_unit.get(), target), texture);
    }

    fn tex_image_2d(&self, target: u32, level: i32, width: u32, height: u32, _rgba: &[u8]) {
        self.record(GlCall::TexImage2D {
            target,
            level,
            width,
            height,
        });
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        self.record(GlCall::TexParameter {
            target,
            pname,
            value,
        });
    }

    fn generate_mipmap(&self, target: u32) {
        self.record(GlCall::GenerateMipmap { target });
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        self.record(GlCall::GetParameter { pname });
        if let Some(value) = self.stubs.borrow().get(&pname) {
            return *value;
        }
        match pname {
            glow::ACTIVE_TEXTURE => self.active_unit.get() as i32,
            glow::TEXTURE_BINDING_2D => self.bound_texture(glow::TEXTURE_2D) as i32,
            glow::TEXTURE_BINDING_CUBE_MAP => self.bound_texture(glow::TEXTURE_CUBE_MAP) as i32,
            glow::CURRENT_PROGRAM => self.current_program.get() as i32,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_never_reused() {
        let gl = RecordingBackend::new();
        let a = gl.create_texture().unwrap();
        gl.delete_texture(a);
        let b = gl.create_texture().unwrap();
        assert_ne!(a, b);
        assert!(a > 0 && b > 0);
    }

    #[test]
    fn test_bindings_are_per_unit() {
        let gl = RecordingBackend::new();
        gl.bind_texture(glow::TEXTURE_2D, 7);
        gl.active_texture(glow::TEXTURE1);
        assert_eq!(gl.get_parameter_i32(glow::TEXTURE_BINDING_2D), 0);
        gl.active_texture(glow::TEXTURE0);
        assert_eq!(gl.get_parameter_i32(glow::TEXTURE_BINDING_2D), 7);
    }

    #[test]
    fn test_stub_overrides_simulated_state() {
        let gl = RecordingBackend::new();
        gl.bind_texture(glow::TEXTURE_2D, 3);
        gl.stub_parameter(glow::TEXTURE_BINDING_2D, 42);
        assert_eq!(gl.get_parameter_i32(glow::TEXTURE_BINDING_2D), 42);
        gl.clear_stubs();
        assert_eq!(gl.get_parameter_i32(glow::TEXTURE_BINDING_2D), 3);
    }

    #[test]
    fn test_failed_allocation_still_records_the_call() {
        let gl = RecordingBackend::new();
        gl.fail_allocations(true);
        assert!(gl.create_shader(glow::VERTEX_SHADER).is_err());
        assert_eq!(
            gl.calls(),
            vec![GlCall::CreateShader {
                shader_type: glow::VERTEX_SHADER
            }]
        );
    }
}
