// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use crate::backend::GlesBackend;
use crate::handles::{ProgramHandle, TextureHandle};
use crate::texture::{TextureKind, TextureUnit};

/// Read-only view of what the context currently has bound.
///
/// Nothing is cached; every accessor is a fresh `glGetIntegerv`.
pub struct GlesState<'a, B: GlesBackend + ?Sized> {
    gl: &'a B,
}

impl<'a, B: GlesBackend + ?Sized> GlesState<'a, B> {
    pub fn new(gl: &'a B) -> Self {
        Self { gl }
    }

    /// `GL_ACTIVE_TEXTURE`, i.e. `GL_TEXTURE0 + i`.
    pub fn active_texture(&self) -> u32 {
        self.gl.get_parameter_i32(glow::ACTIVE_TEXTURE) as u32
    }

    pub fn active_texture_unit(&self) -> Option<TextureUnit> {
        TextureUnit::from_native(self.active_texture())
    }

    pub fn texture_binding_2d(&self) -> TextureHandle {
        self.texture_binding(TextureKind::Texture2D)
    }

    pub fn texture_binding_cube_map(&self) -> TextureHandle {
        self.texture_binding(TextureKind::CubeMap)
    }

    /// Texture bound to `kind`'s target on the active unit.
    pub fn texture_binding(&self, kind: TextureKind) -> TextureHandle {
        TextureHandle(self.gl.get_parameter_i32(kind.binding_query()) as u32)
    }

    pub fn current_program(&self) -> ProgramHandle {
        ProgramHandle(self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) as u32)
    }
}
