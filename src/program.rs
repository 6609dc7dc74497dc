// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use log::{debug, warn};

use crate::backend::GlesBackend;
use crate::error::GlesError;
use crate::gles_state::GlesState;
use crate::handles::{ProgramHandle, ShaderHandle};
use crate::shader::{Shader, ShaderState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Created,
    Linked,
    Deleted,
}

/// A native program object linking compiled shaders.
#[derive(Debug)]
pub struct Program {
    handle: ProgramHandle,
    attached: Vec<ShaderHandle>,
    state: ProgramState,
}

impl Program {
    pub fn new<B: GlesBackend + ?Sized>(gl: &B) -> Result<Self, GlesError> {
        let name = gl
            .create_program()
            .map_err(|e| GlesError::Resource(format!("glCreateProgram failed: {}", e)))?;
        if name == 0 {
            return Err(GlesError::Resource("glCreateProgram returned 0".to_string()));
        }
        debug!("Created program {}", name);
        Ok(Self {
            handle: ProgramHandle(name),
            attached: Vec::new(),
            state: ProgramState::Created,
        })
    }

    /// Compiles both stages, links them and drops the intermediate shaders.
    ///
    /// Whatever was created is deleted again if a step fails.
    pub fn from_sources<B: GlesBackend + ?Sized>(
        gl: &B,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, GlesError> {
        let mut vertex = Shader::vertex(gl, vertex_src)?;
        let mut fragment = match Shader::fragment(gl, fragment_src) {
            Ok(shader) => shader,
            Err(e) => {
                vertex.delete(gl);
                return Err(e);
            }
        };

        let result = Self::link_shaders(gl, &mut vertex, &mut fragment);
        vertex.delete(gl);
        fragment.delete(gl);
        result
    }

    fn link_shaders<B: GlesBackend + ?Sized>(
        gl: &B,
        vertex: &mut Shader,
        fragment: &mut Shader,
    ) -> Result<Self, GlesError> {
        vertex.compile(gl)?;
        fragment.compile(gl)?;

        let mut program = Self::new(gl)?;
        let linked = program
            .attach(gl, vertex)
            .and_then(|p| p.attach(gl, fragment))
            .and_then(|p| p.link(gl))
            .map(|_| ());
        match linked {
            Ok(()) => Ok(program),
            Err(e) => {
                program.delete(gl);
                Err(e)
            }
        }
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn attached(&self) -> &[ShaderHandle] {
        &self.attached
    }

    /// Attaches a compiled shader. Only possible before linking.
    pub fn attach<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        shader: &Shader,
    ) -> Result<&mut Self, GlesError> {
        match self.state {
            ProgramState::Created => {}
            ProgramState::Linked => {
                return Err(GlesError::illegal_state(format!(
                    "program {} is already linked",
                    self.handle.0
                )))
            }
            ProgramState::Deleted => return Err(self.deleted()),
        }
        if shader.state() != ShaderState::Compiled {
            return Err(GlesError::illegal_state(format!(
                "shader {} is {:?}, not compiled",
                shader.handle().0,
                shader.state()
            )));
        }
        gl.attach_shader(self.handle.0, shader.handle().0);
        self.attached.push(shader.handle());
        Ok(self)
    }

    pub fn link<B: GlesBackend + ?Sized>(&mut self, gl: &B) -> Result<&mut Self, GlesError> {
        match self.state {
            ProgramState::Created => {}
            ProgramState::Linked => {
                return Err(GlesError::illegal_state(format!(
                    "program {} is already linked",
                    self.handle.0
                )))
            }
            ProgramState::Deleted => return Err(self.deleted()),
        }
        if self.attached.is_empty() {
            return Err(GlesError::illegal_state(format!(
                "program {} has no attached shaders",
                self.handle.0
            )));
        }

        gl.link_program(self.handle.0);
        if !gl.program_link_status(self.handle.0) {
            let log = gl.program_info_log(self.handle.0);
            warn!("Program {} failed to link: {}", self.handle.0, log);
            return Err(GlesError::Link(log));
        }
        self.state = ProgramState::Linked;
        Ok(self)
    }

    /// `glUseProgram`. The program must be linked.
    pub fn use_program<B: GlesBackend + ?Sized>(&self, gl: &B) -> Result<(), GlesError> {
        self.check_linked()?;
        gl.use_program(self.handle.0);
        Ok(())
    }

    pub fn is_current<B: GlesBackend + ?Sized>(&self, gl: &B) -> bool {
        self.state != ProgramState::Deleted && GlesState::new(gl).current_program() == self.handle
    }

    pub fn attrib_location<B: GlesBackend + ?Sized>(
        &self,
        gl: &B,
        name: &str,
    ) -> Result<u32, GlesError> {
        self.check_linked()?;
        gl.attrib_location(self.handle.0, name).ok_or_else(|| {
            GlesError::argument(format!(
                "program {} has no active attribute '{}'",
                self.handle.0, name
            ))
        })
    }

    /// `glDeleteProgram`. Deleting twice does nothing.
    pub fn delete<B: GlesBackend + ?Sized>(&mut self, gl: &B) {
        if self.state == ProgramState::Deleted {
            return;
        }
        gl.delete_program(self.handle.0);
        self.state = ProgramState::Deleted;
        debug!("Deleted program {}", self.handle.0);
    }

    fn check_linked(&self) -> Result<(), GlesError> {
        match self.state {
            ProgramState::Linked => Ok(()),
            ProgramState::Deleted => Err(self.deleted()),
            ProgramState::Created => Err(GlesError::illegal_state(format!(
                "program {} is not linked",
                self.handle.0
            ))),
        }
    }

    fn deleted(&self) -> GlesError {
        GlesError::illegal_state(format!("program {} has been deleted", self.handle.0))
    }
}
