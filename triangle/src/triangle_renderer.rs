// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use friendly_gles::{GlesBackend, GlesError, GlowBackend, Program, Texture};
use glow::HasContext;
use image::{Rgba, RgbaImage};
use log::debug;

use crate::settings::RendererSettings;
use crate::surface_view::Renderer;

const VERTEX_SHADER: &str = r#"
attribute vec2 a_position;
attribute vec2 a_uv;
attribute vec3 a_color;
varying vec2 v_uv;
varying vec3 v_color;

void main() {
    v_uv = a_uv;
    v_color = a_color;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"
precision mediump float;
uniform sampler2D u_texture;
varying vec2 v_uv;
varying vec3 v_color;

void main() {
    gl_FragColor = texture2D(u_texture, v_uv) * vec4(v_color, 1.0);
}
"#;

const FLOATS_PER_VERTEX: usize = 7;

// position (2), uv (2), color (3)
#[rustfmt::skip]
const VERTICES: [f32; 3 * FLOATS_PER_VERTEX] = [
     0.0,  0.6,   0.5, 1.0,   1.0, 0.2, 0.2,
    -0.6, -0.4,   0.0, 0.0,   0.2, 1.0, 0.2,
     0.6, -0.4,   1.0, 0.0,   0.2, 0.2, 1.0,
];

/// Black and white checkerboard, one texel per square.
pub fn checker_image(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([40, 40, 40, 255])
        }
    })
}

/// The GL objects the triangle needs that go through the resource wrappers.
pub struct TriangleResources {
    pub program: Program,
    pub texture: Texture,
    pub position: u32,
    pub uv: u32,
    pub color: u32,
}

impl TriangleResources {
    /// Builds everything; on failure whatever was created is deleted again.
    pub fn create<B: GlesBackend + ?Sized>(
        gl: &B,
        settings: &RendererSettings,
    ) -> Result<Self, GlesError> {
        let mut program = Program::from_sources(gl, VERTEX_SHADER, FRAGMENT_SHADER)?;
        let locations = (|| {
            Ok::<_, GlesError>((
                program.attrib_location(gl, "a_position")?,
                program.attrib_location(gl, "a_uv")?,
                program.attrib_location(gl, "a_color")?,
            ))
        })();
        let (position, uv, color) = match locations {
            Ok(locations) => locations,
            Err(e) => {
                program.delete(gl);
                return Err(e);
            }
        };

        let mut texture = match Texture::new_2d(gl) {
            Ok(texture) => texture,
            Err(e) => {
                program.delete(gl);
                return Err(e);
            }
        };
        if let Err(e) = Self::fill_texture(gl, &mut texture, settings) {
            texture.delete(gl);
            program.delete(gl);
            return Err(e);
        }

        Ok(Self {
            program,
            texture,
            position,
            uv,
            color,
        })
    }

    fn fill_texture<B: GlesBackend + ?Sized>(
        gl: &B,
        texture: &mut Texture,
        settings: &RendererSettings,
    ) -> Result<(), GlesError> {
        texture
            .load_image(gl, &checker_image(settings.checker_size))?
            .apply_parameters(gl, &settings.texture)?;
        if settings.texture.min_filter.uses_mipmaps() {
            texture.generate_mipmap(gl)?;
        }
        Ok(())
    }

    pub fn release<B: GlesBackend + ?Sized>(&mut self, gl: &B) {
        self.texture.delete(gl);
        self.program.delete(gl);
    }
}

pub struct TriangleRenderer {
    settings: RendererSettings,
    resources: Option<TriangleResources>,
    vertex_buffer: Option<glow::Buffer>,
}

impl TriangleRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            resources: None,
            vertex_buffer: None,
        }
    }
}

impl Renderer<GlowBackend> for TriangleRenderer {
    fn on_surface_created(&mut self, gl: &GlowBackend) -> Result<(), GlesError> {
        let resources = TriangleResources::create(gl, &self.settings)?;
        let buffer = unsafe {
            let buffer = gl.gl().create_buffer().map_err(GlesError::Resource)?;
            gl.gl().bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.gl().buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&VERTICES),
                glow::STATIC_DRAW,
            );
            gl.gl().bind_buffer(glow::ARRAY_BUFFER, None);
            buffer
        };
        self.resources = Some(resources);
        self.vertex_buffer = Some(buffer);
        debug!("Triangle surface created");
        Ok(())
    }

    fn on_surface_changed(&mut self, gl: &GlowBackend, width: u32, height: u32) {
        unsafe { gl.gl().viewport(0, 0, width as i32, height as i32) }
    }

    fn on_draw_frame(&mut self, gl: &GlowBackend) -> Result<(), GlesError> {
        let [r, g, b, a] = self.settings.clear_color;
        unsafe {
            gl.gl().clear_color(r, g, b, a);
            gl.gl().clear(glow::COLOR_BUFFER_BIT);
        }

        let (Some(res), Some(buffer)) = (self.resources.as_mut(), self.vertex_buffer) else {
            return Ok(());
        };
        res.program.use_program(gl)?;
        res.texture.bind(gl)?;

        let stride = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;
        unsafe {
            let raw = gl.gl();
            raw.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            for (location, size, offset) in [(res.position, 2, 0), (res.uv, 2, 2), (res.color, 3, 4)]
            {
                raw.enable_vertex_attrib_array(location);
                raw.vertex_attrib_pointer_f32(
                    location,
                    size,
                    glow::FLOAT,
                    false,
                    stride,
                    offset * std::mem::size_of::<f32>() as i32,
                );
            }
            raw.draw_arrays(glow::TRIANGLES, 0, 3);
            raw.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        Ok(())
    }

    fn on_surface_destroyed(&mut self, gl: &GlowBackend) {
        if let Some(mut res) = self.resources.take() {
            res.release(gl);
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            unsafe { gl.gl().delete_buffer(buffer) }
        }
        debug!("Triangle surface destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use friendly_gles::{GlCall, MinFilter, ProgramState, RecordingBackend, TextureState};

    fn backend_with_attributes() -> RecordingBackend {
        let gl = RecordingBackend::new();
        gl.define_attribute("a_position", 0);
        gl.define_attribute("a_uv", 1);
        gl.define_attribute("a_color", 2);
        gl
    }

    #[test]
    fn test_checker_image_alternates() {
        let image = checker_image(4);
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([40, 40, 40, 255]));
        assert_eq!(image.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_resources_are_created_and_released() {
        let gl = backend_with_attributes();
        let settings = Settings::default().renderer;
        let mut res = TriangleResources::create(&gl, &settings).unwrap();

        assert_eq!(res.program.state(), ProgramState::Linked);
        assert!(res.texture.is_complete());
        assert_eq!((res.position, res.uv, res.color), (0, 1, 2));

        res.release(&gl);
        assert_eq!(res.program.state(), ProgramState::Deleted);
        assert_eq!(res.texture.state(&gl), TextureState::Deleted);
    }

    #[test]
    fn test_mipmapped_filter_generates_mipmaps() {
        let gl = backend_with_attributes();
        let mut settings = Settings::default().renderer;
        settings.texture.min_filter = MinFilter::LinearMipmapLinear;
        TriangleResources::create(&gl, &settings).unwrap();
        assert!(gl.calls().contains(&GlCall::GenerateMipmap {
            target: glow::TEXTURE_2D
        }));
    }

    #[test]
    fn test_missing_attribute_deletes_the_program() {
        let gl = RecordingBackend::new();
        gl.define_attribute("a_position", 0);
        let result = TriangleResources::create(&gl, &Settings::default().renderer);
        assert!(matches!(result, Err(GlesError::Argument(_))));
        assert!(gl
            .calls()
            .iter()
            .any(|c| matches!(c, GlCall::DeleteProgram { .. })));
    }

    #[test]
    fn test_empty_checker_deletes_everything() {
        let gl = backend_with_attributes();
        let mut settings = Settings::default().renderer;
        settings.checker_size = 0;
        let result = TriangleResources::create(&gl, &settings);
        assert!(matches!(result, Err(GlesError::Argument(_))));
        let calls = gl.calls();
        assert!(calls.iter().any(|c| matches!(c, GlCall::DeleteTexture { .. })));
        assert!(calls.iter().any(|c| matches!(c, GlCall::DeleteProgram { .. })));
    }
}
