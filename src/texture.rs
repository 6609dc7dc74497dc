// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::path::Path;

use image::RgbaImage;
use log::{debug, trace};

use crate::backend::GlesBackend;
use crate::error::GlesError;
use crate::gles_state::GlesState;
use crate::handles::TextureHandle;
use crate::texture_parameters::TextureParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Texture2D,
    CubeMap,
}

impl TextureKind {
    /// Target passed to `glBindTexture`.
    pub fn target(self) -> u32 {
        match self {
            TextureKind::Texture2D => glow::TEXTURE_2D,
            TextureKind::CubeMap => glow::TEXTURE_CUBE_MAP,
        }
    }

    /// `glGetIntegerv` name that reports what is bound to `target()`.
    pub fn binding_query(self) -> u32 {
        match self {
            TextureKind::Texture2D => glow::TEXTURE_BINDING_2D,
            TextureKind::CubeMap => glow::TEXTURE_BINDING_CUBE_MAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeSide {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeSide {
    pub const ALL: [CubeSide; 6] = [
        CubeSide::PositiveX,
        CubeSide::NegativeX,
        CubeSide::PositiveY,
        CubeSide::NegativeY,
        CubeSide::PositiveZ,
        CubeSide::NegativeZ,
    ];

    /// Target passed to `glTexImage2D` for this face.
    pub fn target(self) -> u32 {
        glow::TEXTURE_CUBE_MAP_POSITIVE_X + self.index() as u32
    }

    pub fn index(self) -> usize {
        match self {
            CubeSide::PositiveX => 0,
            CubeSide::NegativeX => 1,
            CubeSide::PositiveY => 2,
            CubeSide::NegativeY => 3,
            CubeSide::PositiveZ => 4,
            CubeSide::NegativeZ => 5,
        }
    }
}

impl TryFrom<u32> for CubeSide {
    type Error = GlesError;

    fn try_from(target: u32) -> Result<Self, Self::Error> {
        CubeSide::ALL
            .into_iter()
            .find(|side| side.target() == target)
            .ok_or_else(|| GlesError::argument(format!("0x{:X} is not a cube map face", target)))
    }
}

/// A texture unit index; `GL_TEXTURE0 + index` on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureUnit(u32);

impl TextureUnit {
    /// `GL_TEXTURE0` .. `GL_TEXTURE31`.
    pub const MAX_UNITS: u32 = 32;

    pub fn new(index: u32) -> Result<Self, GlesError> {
        if index >= Self::MAX_UNITS {
            return Err(GlesError::argument(format!(
                "texture unit {} is out of range (max {})",
                index,
                Self::MAX_UNITS - 1
            )));
        }
        Ok(Self(index))
    }

    pub fn from_native(unit: u32) -> Option<Self> {
        unit.checked_sub(glow::TEXTURE0)
            .and_then(|index| Self::new(index).ok())
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn native(self) -> u32 {
        glow::TEXTURE0 + self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Created,
    HasImage,
    Bound,
    Deleted,
}

/// One native texture object, either 2D or cube map.
///
/// Whether it is bound is never cached: [`Texture::is_bound`] asks the
/// context every time, so binds made behind the wrapper's back are seen.
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    kind: TextureKind,
    unit: TextureUnit,
    has_image: bool,
    faces_loaded: [bool; 6],
    deleted: bool,
}

impl Texture {
    /// Calls `glGenTextures`. The texture starts out `Created` on unit 0.
    pub fn new<B: GlesBackend + ?Sized>(gl: &B, kind: TextureKind) -> Result<Self, GlesError> {
        let name = gl
            .create_texture()
            .map_err(|e| GlesError::Resource(format!("glGenTextures failed: {}", e)))?;
        if name == 0 {
            return Err(GlesError::Resource("glGenTextures returned 0".to_string()));
        }
        debug!("Created {:?} texture {}", kind, name);
        Ok(Self {
            handle: TextureHandle(name),
            kind,
            unit: TextureUnit::default(),
            has_image: false,
            faces_loaded: [false; 6],
            deleted: false,
        })
    }

    pub fn new_2d<B: GlesBackend + ?Sized>(gl: &B) -> Result<Self, GlesError> {
        Self::new(gl, TextureKind::Texture2D)
    }

    pub fn new_cube_map<B: GlesBackend + ?Sized>(gl: &B) -> Result<Self, GlesError> {
        Self::new(gl, TextureKind::CubeMap)
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn unit(&self) -> TextureUnit {
        self.unit
    }

    /// Chooses the unit `bind` activates. Does not rebind.
    pub fn set_unit(&mut self, unit: TextureUnit) -> Result<&mut Self, GlesError> {
        self.check_alive()?;
        self.unit = unit;
        Ok(self)
    }

    pub fn state<B: GlesBackend + ?Sized>(&self, gl: &B) -> TextureState {
        if self.deleted {
            TextureState::Deleted
        } else if self.is_bound(gl) {
            TextureState::Bound
        } else if self.has_image {
            TextureState::HasImage
        } else {
            TextureState::Created
        }
    }

    /// True when this texture's unit is the active one and this texture is
    /// what that unit has bound to this texture's target.
    pub fn is_bound<B: GlesBackend + ?Sized>(&self, gl: &B) -> bool {
        if self.deleted {
            return false;
        }
        let state = GlesState::new(gl);
        state.active_texture() == self.unit.native()
            && state.texture_binding(self.kind) == self.handle
    }

    /// `glActiveTexture(unit)` then `glBindTexture(target, id)`.
    pub fn bind<B: GlesBackend + ?Sized>(&mut self, gl: &B) -> Result<&mut Self, GlesError> {
        self.check_alive()?;
        gl.active_texture(self.unit.native());
        gl.bind_texture(self.kind.target(), self.handle.0);
        trace!(
            "Bound texture {} on unit {}",
            self.handle.0,
            self.unit.index()
        );
        Ok(self)
    }

    /// Binds 0 to this texture's target on its unit.
    pub fn unbind<B: GlesBackend + ?Sized>(&mut self, gl: &B) -> Result<&mut Self, GlesError> {
        self.check_alive()?;
        gl.active_texture(self.unit.native());
        gl.bind_texture(self.kind.target(), 0);
        Ok(self)
    }

    /// Uploads `image` as mip level 0 of a 2D texture.
    pub fn load_image<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        image: &RgbaImage,
    ) -> Result<&mut Self, GlesError> {
        self.load_image_level(gl, image, 0)
    }

    /// Uploads `image` as mip level `level` of a 2D texture, binding first if needed.
    pub fn load_image_level<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        image: &RgbaImage,
        level: i32,
    ) -> Result<&mut Self, GlesError> {
        if self.kind != TextureKind::Texture2D {
            return Err(GlesError::argument(
                "a cube map texture needs a face; use load_cube_face",
            ));
        }
        check_image(image, level)?;
        self.upload(gl, glow::TEXTURE_2D, image, level)?;
        self.has_image = true;
        Ok(self)
    }

    /// Decodes an image file and uploads it as mip level `level` of a 2D texture.
    pub fn load_image_file<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        path: impl AsRef<Path>,
        level: i32,
    ) -> Result<&mut Self, GlesError> {
        let image = image::open(path.as_ref())?.to_rgba8();
        self.load_image_level(gl, &image, level)
    }

    /// Uploads `image` as mip level 0 of one cube face.
    pub fn load_cube_face<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        image: &RgbaImage,
        side: CubeSide,
    ) -> Result<&mut Self, GlesError> {
        self.load_cube_face_level(gl, image, 0, side)
    }

    /// Uploads `image` as mip level `level` of one cube face, binding first if needed.
    pub fn load_cube_face_level<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        image: &RgbaImage,
        level: i32,
        side: CubeSide,
    ) -> Result<&mut Self, GlesError> {
        if self.kind != TextureKind::CubeMap {
            return Err(GlesError::argument(
                "a 2D texture has no faces; use load_image",
            ));
        }
        check_image(image, level)?;
        self.upload(gl, side.target(), image, level)?;
        self.has_image = true;
        self.faces_loaded[side.index()] = true;
        Ok(self)
    }

    pub fn is_face_loaded(&self, side: CubeSide) -> bool {
        self.faces_loaded[side.index()]
    }

    /// A 2D texture with an image, or a cube map with all six faces.
    pub fn is_complete(&self) -> bool {
        match self.kind {
            TextureKind::Texture2D => self.has_image,
            TextureKind::CubeMap => self.faces_loaded.iter().all(|loaded| *loaded),
        }
    }

    pub fn apply_parameters<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        params: &TextureParameters,
    ) -> Result<&mut Self, GlesError> {
        self.check_alive()?;
        self.bind_if_needed(gl);
        for (pname, value) in params.native_pairs() {
            gl.tex_parameter_i32(self.kind.target(), pname, value);
        }
        Ok(self)
    }

    /// `glGenerateMipmap`; the base level must be loaded (every face, for a cube map).
    pub fn generate_mipmap<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
    ) -> Result<&mut Self, GlesError> {
        self.check_alive()?;
        if !self.is_complete() {
            return Err(GlesError::illegal_state(format!(
                "texture {} has no complete base image to build mipmaps from",
                self.handle.0
            )));
        }
        self.bind_if_needed(gl);
        gl.generate_mipmap(self.kind.target());
        Ok(self)
    }

    /// Calls `glDeleteTextures`. Deleting twice does nothing.
    pub fn delete<B: GlesBackend + ?Sized>(&mut self, gl: &B) {
        if self.deleted {
            return;
        }
        gl.delete_texture(self.handle.0);
        self.deleted = true;
        debug!("Deleted {:?} texture {}", self.kind, self.handle.0);
    }

    fn upload<B: GlesBackend + ?Sized>(
        &mut self,
        gl: &B,
        target: u32,
        image: &RgbaImage,
        level: i32,
    ) -> Result<(), GlesError> {
        self.check_alive()?;
        self.bind_if_needed(gl);
        let (width, height) = image.dimensions();
        gl.tex_image_2d(target, level, width, height, image.as_raw());
        trace!(
            "Uploaded {}x{} level {} to texture {} (target 0x{:X})",
            width,
            height,
            level,
            self.handle.0,
            target
        );
        Ok(())
    }

    fn bind_if_needed<B: GlesBackend + ?Sized>(&mut self, gl: &B) {
        if !self.is_bound(gl) {
            gl.active_texture(self.unit.native());
            gl.bind_texture(self.kind.target(), self.handle.0);
        }
    }

    fn check_alive(&self) -> Result<(), GlesError> {
        if self.deleted {
            return Err(GlesError::illegal_state(format!(
                "texture {} has been deleted",
                self.handle.0
            )));
        }
        Ok(())
    }
}

fn check_image(image: &RgbaImage, level: i32) -> Result<(), GlesError> {
    if level < 0 {
        return Err(GlesError::argument(format!(
            "mip level must not be negative, got {}",
            level
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(GlesError::argument("image has no pixels"));
    }
    Ok(())
}
