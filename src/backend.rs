// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

/// The slice of the OpenGL ES 2.0 API the resource wrappers call into.
///
/// Object names are the raw `GLuint`s the driver hands out, with 0 meaning
/// "no object". Enum arguments are the usual `GL_*` values (see the `glow`
/// constants). Every call is synchronous and must happen on the thread that
/// owns the current context.
pub trait GlesBackend {
    // shaders
    fn create_shader(&self, shader_type: u32) -> Result<u32, String>;
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn shader_compile_status(&self, shader: u32) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;
    fn delete_shader(&self, shader: u32);

    // programs
    fn create_program(&self) -> Result<u32, String>;
    fn attach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn program_link_status(&self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;
    fn use_program(&self, program: u32);
    fn attrib_location(&self, program: u32, name: &str) -> Option<u32>;
    fn delete_program(&self, program: u32);

    // textures
    fn create_texture(&self) -> Result<u32, String>;
    fn delete_texture(&self, texture: u32);
    /// `unit` is the `GL_TEXTUREi` enum, not the index.
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: u32);
    /// Uploads tightly packed RGBA8 pixels.
    fn tex_image_2d(&self, target: u32, level: i32, width: u32, height: u32, rgba: &[u8]);
    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32);
    fn generate_mipmap(&self, target: u32);

    // state
    /// `glGetIntegerv` for a single-valued parameter.
    fn get_parameter_i32(&self, pname: u32) -> i32;
}
