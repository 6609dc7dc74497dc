// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::fs;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};

use crate::backend::GlesBackend;
use crate::error::GlesError;
use crate::handles::ShaderHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub fn native(self) -> u32 {
        match self {
            ShaderKind::Vertex => glow::VERTEX_SHADER,
            ShaderKind::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    Created,
    SourceSet,
    Compiled,
    Deleted,
}

/// One native shader object.
///
/// ```text
/// Created --set_source--> SourceSet --compile--> Compiled
///    \__________________________\_____________________\__ delete --> Deleted
/// ```
#[derive(Debug)]
pub struct Shader {
    handle: ShaderHandle,
    kind: ShaderKind,
    state: ShaderState,
}

impl Shader {
    /// Calls `glCreateShader`. The shader starts out `Created`.
    pub fn new<B: GlesBackend + ?Sized>(gl: &B, kind: ShaderKind) -> Result<Self, GlesError> {
        let name = gl.create_shader(kind.native()).map_err(|e| {
            GlesError::Resource(format!("glCreateShader({:?}) failed: {}", kind, e))
        })?;
        if name == 0 {
            return Err(GlesError::Resource(format!(
                "glCreateShader({:?}) returned 0",
                kind
            )));
        }
        debug!("Created {:?} shader {}", kind, name);
        Ok(Self {
            handle: ShaderHandle(name),
            kind,
            state: ShaderState::Created,
        })
    }

    /// Creates a shader and attaches `source`. The shader is `SourceSet`.
    pub fn with_source<B: GlesBackend + ?Sized>(
        gl: &B,
        kind: ShaderKind,
        source: &str,
    ) -> Result<Self, GlesError> {
        check_source(source)?;
        let mut shader = Self::new(gl, kind)?;
        shader.set_source(gl, source)?;
        Ok(shader)
    }

    pub fn vertex<B: GlesBackend + ?Sized>(gl: &B, source: &str) -> Result<Self, GlesError> {
        Self::with_source(gl, ShaderKind::Vertex, source)
    }

    pub fn fragment<B: GlesBackend + ?Sized>(gl: &B, source: &str) -> Result<Self, GlesError> {
        Self::with_source(gl, ShaderKind::Fragment, source)
    }

    /// Reads `path` as text and attaches it. Nothing is created if the read fails.
    pub fn from_file<B: GlesBackend + ?Sized>(
        gl: &B,
        kind: ShaderKind,
        path: impl AsRef<Path>,
    ) -> Result<Self, GlesError> {
        let source = fs::read_to_string(path.as_ref())?;
        Self::with_source(gl, kind, &source)
    }

    /// Reads the whole stream as text and attaches it.
    ///
    /// A reader passed by value is dropped (closed) before this returns,
    /// whether or not construction succeeds. Pass `&mut reader` to keep it open.
    pub fn from_reader<B: GlesBackend + ?Sized, R: Read>(
        gl: &B,
        kind: ShaderKind,
        mut reader: R,
    ) -> Result<Self, GlesError> {
        let mut source = String::new();
        let read = reader.read_to_string(&mut source);
        drop(reader);
        read?;
        Self::with_source(gl, kind, &source)
    }

    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn state(&self) -> ShaderState {
        self.state
    }

    /// Calls `glShaderSource`. Allowed once, on a `Created` shader.
    pub fn set_source<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        source: &str,
    ) -> Result<&mut Self, GlesError> {
        check_source(source)?;
        match self.state {
            ShaderState::Created => {}
            ShaderState::Deleted => return Err(self.deleted()),
            other => {
                return Err(GlesError::illegal_state(format!(
                    "shader {} already has its source (state {:?})",
                    self.handle.0, other
                )))
            }
        }
        gl.shader_source(self.handle.0, source);
        self.state = ShaderState::SourceSet;
        Ok(self)
    }

    /// Calls `glCompileShader` and checks `GL_COMPILE_STATUS`.
    ///
    /// On failure the info log is returned in the error and the shader stays
    /// `SourceSet`.
    pub fn compile<B: GlesBackend + ?Sized>(&mut self, gl: &B) -> Result<&mut Self, GlesError> {
        match self.state {
            ShaderState::SourceSet => {}
            ShaderState::Deleted => return Err(self.deleted()),
            ShaderState::Created => {
                return Err(GlesError::illegal_state(format!(
                    "shader {} has no source to compile",
                    self.handle.0
                )))
            }
            ShaderState::Compiled => {
                return Err(GlesError::illegal_state(format!(
                    "shader {} is already compiled",
                    self.handle.0
                )))
            }
        }

        gl.compile_shader(self.handle.0);
        if !gl.shader_compile_status(self.handle.0) {
            let log = gl.shader_info_log(self.handle.0);
            warn!(
                "{:?} shader {} failed to compile: {}",
                self.kind, self.handle.0, log
            );
            return Err(GlesError::Compile(log));
        }
        self.state = ShaderState::Compiled;
        Ok(self)
    }

    pub fn info_log<B: GlesBackend + ?Sized>(&self, gl: &B) -> Result<String, GlesError> {
        if self.state == ShaderState::Deleted {
            return Err(self.deleted());
        }
        Ok(gl.shader_info_log(self.handle.0))
    }

    /// Calls `glDeleteShader`. Deleting twice does nothing.
    pub fn delete<B: GlesBackend + ?Sized>(&mut self, gl: &B) {
        if self.state == ShaderState::Deleted {
            return;
        }
        gl.delete_shader(self.handle.0);
        self.state = ShaderState::Deleted;
        debug!("Deleted {:?} shader {}", self.kind, self.handle.0);
    }

    fn deleted(&self) -> GlesError {
        GlesError::illegal_state(format!("shader {} has been deleted", self.handle.0))
    }
}

fn check_source(source: &str) -> Result<(), GlesError> {
    if source.trim().is_empty() {
        return Err(GlesError::argument("shader source is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording_backend::{GlCall, RecordingBackend};
    use std::cell::Cell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;
    use tempfile::NamedTempFile;

    /// Reader that flags when it is dropped and optionally fails every read.
    struct TrackedReader {
        inner: Cursor<Vec<u8>>,
        fail: bool,
        closed: Rc<Cell<bool>>,
    }

    impl TrackedReader {
        fn new(text: &str, fail: bool) -> (Self, Rc<Cell<bool>>) {
            let closed = Rc::new(Cell::new(false));
            (
                Self {
                    inner: Cursor::new(text.as_bytes().to_vec()),
                    fail,
                    closed: closed.clone(),
                },
                closed,
            )
        }
    }

    impl Read for TrackedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream died"));
            }
            self.inner.read(buf)
        }
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.closed.set(true);
        }
    }

    #[test]
    fn test_new_shader_is_created() {
        let gl = RecordingBackend::new();
        let shader = Shader::new(&gl, ShaderKind::Vertex).unwrap();
        assert_eq!(shader.state(), ShaderState::Created);
        assert_eq!(shader.kind(), ShaderKind::Vertex);
        assert_eq!(
            gl.calls(),
            vec![GlCall::CreateShader {
                shader_type: glow::VERTEX_SHADER
            }]
        );
    }

    #[test]
    fn test_fragment_shader_with_source_is_source_set() {
        let gl = RecordingBackend::new();
        let shader = Shader::fragment(&gl, "void main(){}").unwrap();
        assert_eq!(shader.state(), ShaderState::SourceSet);
        assert_eq!(
            gl.calls(),
            vec![
                GlCall::CreateShader {
                    shader_type: glow::FRAGMENT_SHADER
                },
                GlCall::ShaderSource {
                    shader: shader.handle().0,
                    source: "void main(){}".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_empty_source_is_an_argument_error_without_native_calls() {
        let gl = RecordingBackend::new();
        let result = Shader::with_source(&gl, ShaderKind::Vertex, "  \n");
        assert!(matches!(result, Err(GlesError::Argument(_))));
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn test_allocation_failure_is_a_resource_error() {
        let gl = RecordingBackend::new();
        gl.fail_allocations(true);
        let result = Shader::fragment(&gl, "void main(){}");
        assert!(matches!(result, Err(GlesError::Resource(_))));
    }

    #[test]
    fn test_from_file_reads_source() {
        let gl = RecordingBackend::new();
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "void main() {{ gl_Position = vec4(0.0); }}").unwrap();

        let shader = Shader::from_file(&gl, ShaderKind::Vertex, file.path()).unwrap();
        assert_eq!(shader.state(), ShaderState::SourceSet);
        assert!(gl.calls().contains(&GlCall::ShaderSource {
            shader: shader.handle().0,
            source: "void main() { gl_Position = vec4(0.0); }".to_string(),
        }));
    }

    #[test]
    fn test_from_missing_file_is_an_io_error() {
        let gl = RecordingBackend::new();
        let dir = tempfile::tempdir().unwrap();
        let result = Shader::from_file(&gl, ShaderKind::Vertex, dir.path().join("nope.vert"));
        assert!(matches!(result, Err(GlesError::Io(_))));
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn test_owned_reader_is_closed_on_success() {
        let gl = RecordingBackend::new();
        let (reader, closed) = TrackedReader::new("void main(){}", false);
        let shader = Shader::from_reader(&gl, ShaderKind::Fragment, reader).unwrap();
        assert!(closed.get());
        assert_eq!(shader.state(), ShaderState::SourceSet);
    }

    #[test]
    fn test_owned_reader_is_closed_on_failure() {
        let gl = RecordingBackend::new();
        let (reader, closed) = TrackedReader::new("void main(){}", true);
        let result = Shader::from_reader(&gl, ShaderKind::Fragment, reader);
        assert!(matches!(result, Err(GlesError::Io(_))));
        assert!(closed.get());
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn test_owned_reader_is_closed_when_allocation_fails() {
        let gl = RecordingBackend::new();
        gl.fail_allocations(true);
        let (reader, closed) = TrackedReader::new("void main(){}", false);
        let result = Shader::from_reader(&gl, ShaderKind::Fragment, reader);
        assert!(matches!(result, Err(GlesError::Resource(_))));
        assert!(closed.get());
    }

    #[test]
    fn test_borrowed_reader_stays_open() {
        let gl = RecordingBackend::new();
        let (mut reader, closed) = TrackedReader::new("void main(){}", false);
        Shader::from_reader(&gl, ShaderKind::Fragment, &mut reader).unwrap();
        assert!(!closed.get());
        drop(reader);
        assert!(closed.get());
    }

    #[test]
    fn test_source_can_only_be_set_once() {
        let gl = RecordingBackend::new();
        let mut shader = Shader::new(&gl, ShaderKind::Vertex).unwrap();
        shader.set_source(&gl, "void main(){}").unwrap();
        let again = shader.set_source(&gl, "void main(){}");
        assert!(matches!(again, Err(GlesError::IllegalState(_))));
    }

    #[test]
    fn test_compile_transitions_to_compiled() {
        let gl = RecordingBackend::new();
        let mut shader = Shader::vertex(&gl, "void main(){}").unwrap();
        shader.compile(&gl).unwrap();
        assert_eq!(shader.state(), ShaderState::Compiled);
        assert!(gl.calls().contains(&GlCall::CompileShader {
            shader: shader.handle().0
        }));
    }

    #[test]
    fn test_compile_without_source_fails() {
        let gl = RecordingBackend::new();
        let mut shader = Shader::new(&gl, ShaderKind::Vertex).unwrap();
        assert!(matches!(
            shader.compile(&gl),
            Err(GlesError::IllegalState(_))
        ));
    }

    #[test]
    fn test_compile_twice_fails() {
        let gl = RecordingBackend::new();
        let mut shader = Shader::vertex(&gl, "void main(){}").unwrap();
        shader.compile(&gl).unwrap();
        assert!(matches!(
            shader.compile(&gl),
            Err(GlesError::IllegalState(_))
        ));
    }

    #[test]
    fn test_compile_failure_carries_info_log() {
        let gl = RecordingBackend::new();
        gl.fail_compiles(true);
        let mut shader = Shader::vertex(&gl, "void main(){ oops }").unwrap();
        match shader.compile(&gl) {
            Err(GlesError::Compile(log)) => assert!(log.contains("syntax error")),
            other => panic!("expected compile error, got {:?}", other),
        }
        assert_eq!(shader.state(), ShaderState::SourceSet);
    }

    #[test]
    fn test_deleted_shader_is_terminal() {
        let gl = RecordingBackend::new();
        let mut shader = Shader::vertex(&gl, "void main(){}").unwrap();
        shader.delete(&gl);
        assert_eq!(shader.state(), ShaderState::Deleted);
        assert!(matches!(
            shader.compile(&gl),
            Err(GlesError::IllegalState(_))
        ));
        assert!(matches!(
            shader.info_log(&gl),
            Err(GlesError::IllegalState(_))
        ));

        gl.clear_calls();
        shader.delete(&gl);
        assert!(gl.calls().is_empty());
    }
}
