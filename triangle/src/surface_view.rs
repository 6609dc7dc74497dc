// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::rc::Rc;

use friendly_gles::{GlesBackend, GlesError, GlowBackend};
use glow::HasContext;
use log::{debug, info};
use sdl2::video::{GLContext, GLProfile, SwapInterval, Window, WindowBuildError};
use sdl2::{Sdl, VideoSubsystem};
use thiserror::Error;

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("SDL Error: {0}")]
    Sdl(String),

    #[error("Window Error: {0}")]
    Window(#[from] WindowBuildError),

    #[error("GL Error: {0}")]
    Gles(#[from] GlesError),
}

/// Callbacks a surface drives on its rendering thread.
pub trait Renderer<B: GlesBackend + ?Sized> {
    /// A fresh context is current. Create every GL object here.
    fn on_surface_created(&mut self, gl: &B) -> Result<(), GlesError>;

    fn on_surface_changed(&mut self, gl: &B, width: u32, height: u32);

    fn on_draw_frame(&mut self, gl: &B) -> Result<(), GlesError>;

    /// The context is about to go away; it is still current.
    fn on_surface_destroyed(&mut self, gl: &B);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Paused,
    Running,
}

/// Decides which renderer callbacks fire, independent of the windowing layer.
#[derive(Debug)]
pub struct SurfaceLifecycle {
    preserve_context_on_pause: bool,
    state: SurfaceState,
    surface_ready: bool,
    size: (u32, u32),
    size_dirty: bool,
}

impl SurfaceLifecycle {
    /// Starts paused; call `on_resume` once the owner is visible.
    pub fn new(preserve_context_on_pause: bool, width: u32, height: u32) -> Self {
        Self {
            preserve_context_on_pause,
            state: SurfaceState::Paused,
            surface_ready: false,
            size: (width, height),
            size_dirty: true,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_surface_ready(&self) -> bool {
        self.surface_ready
    }

    pub fn on_resume(&mut self) {
        self.state = SurfaceState::Running;
    }

    /// Returns true when the caller must drop its context.
    pub fn on_pause<B, R>(&mut self, renderer: &mut R, gl: &B) -> bool
    where
        B: GlesBackend + ?Sized,
        R: Renderer<B> + ?Sized,
    {
        self.state = SurfaceState::Paused;
        if self.preserve_context_on_pause || !self.surface_ready {
            return false;
        }
        renderer.on_surface_destroyed(gl);
        self.surface_ready = false;
        true
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        if self.size != (width, height) {
            self.size = (width, height);
            self.size_dirty = true;
        }
    }

    /// Renders one frame if running. Returns whether a frame was drawn.
    pub fn draw_frame<B, R>(&mut self, renderer: &mut R, gl: &B) -> Result<bool, GlesError>
    where
        B: GlesBackend + ?Sized,
        R: Renderer<B> + ?Sized,
    {
        if self.state == SurfaceState::Paused {
            return Ok(false);
        }
        if !self.surface_ready {
            renderer.on_surface_created(gl)?;
            self.surface_ready = true;
            self.size_dirty = true;
        }
        if self.size_dirty {
            let (width, height) = self.size;
            renderer.on_surface_changed(gl, width, height);
            self.size_dirty = false;
        }
        renderer.on_draw_frame(gl)?;
        Ok(true)
    }

    /// Tears the surface down for good, whatever the preserve flag says.
    pub fn shutdown<B, R>(&mut self, renderer: &mut R, gl: &B)
    where
        B: GlesBackend + ?Sized,
        R: Renderer<B> + ?Sized,
    {
        self.state = SurfaceState::Paused;
        if self.surface_ready {
            renderer.on_surface_destroyed(gl);
            self.surface_ready = false;
        }
    }
}

struct SurfaceContext {
    backend: GlowBackend,
    // dropped after the backend
    _gl_context: GLContext,
}

/// An SDL window with a GL ES context that forwards lifecycle events to a renderer.
pub struct SurfaceView<R> {
    video: VideoSubsystem,
    window: Window,
    vsync: bool,
    context: Option<SurfaceContext>,
    lifecycle: SurfaceLifecycle,
    renderer: R,
}

impl<R: Renderer<GlowBackend>> SurfaceView<R> {
    pub fn new(sdl: &Sdl, settings: &Settings, renderer: R) -> Result<Self, SurfaceError> {
        let video = sdl.video().map_err(SurfaceError::Sdl)?;
        let gl_attr = video.gl_attr();
        gl_attr.set_context_profile(GLProfile::GLES);
        gl_attr.set_context_version(settings.surface.egl_context_client_version, 0);

        let window = video
            .window(
                &settings.window.title,
                settings.window.width,
                settings.window.height,
            )
            .opengl()
            .resizable()
            .build()?;
        let (width, height) = window.drawable_size();

        Ok(Self {
            video,
            window,
            vsync: settings.surface.vsync,
            context: None,
            lifecycle: SurfaceLifecycle::new(
                settings.surface.preserve_context_on_pause,
                width,
                height,
            ),
            renderer,
        })
    }

    pub fn on_resume(&mut self) {
        debug!("Surface resumed");
        self.lifecycle.on_resume();
    }

    pub fn on_pause(&mut self) {
        debug!("Surface paused");
        let release = match &self.context {
            Some(ctx) => self.lifecycle.on_pause(&mut self.renderer, &ctx.backend),
            None => false,
        };
        if release {
            info!("Releasing GL context while paused");
            self.context = None;
        }
    }

    pub fn on_size_changed(&mut self) {
        let (width, height) = self.window.drawable_size();
        self.lifecycle.on_resize(width, height);
    }

    pub fn is_paused(&self) -> bool {
        self.lifecycle.state() == SurfaceState::Paused
    }

    /// Draws and presents a frame, creating the context on demand.
    pub fn draw_frame(&mut self) -> Result<bool, SurfaceError> {
        if self.is_paused() {
            return Ok(false);
        }
        if self.context.is_none() {
            self.context = Some(self.create_context()?);
        }
        let Some(ctx) = &self.context else {
            return Ok(false);
        };
        let drawn = self.lifecycle.draw_frame(&mut self.renderer, &ctx.backend)?;
        if drawn {
            self.window.gl_swap_window();
        }
        Ok(drawn)
    }

    pub fn shutdown(&mut self) {
        if let Some(ctx) = &self.context {
            self.lifecycle.shutdown(&mut self.renderer, &ctx.backend);
        }
        self.context = None;
    }

    fn create_context(&self) -> Result<SurfaceContext, SurfaceError> {
        let gl_context = self.window.gl_create_context().map_err(SurfaceError::Sdl)?;
        self.window
            .gl_make_current(&gl_context)
            .map_err(SurfaceError::Sdl)?;
        let interval = if self.vsync {
            SwapInterval::VSync
        } else {
            SwapInterval::Immediate
        };
        self.video
            .gl_set_swap_interval(interval)
            .map_err(SurfaceError::Sdl)?;

        let gl = unsafe {
            glow::Context::from_loader_function(|s| self.video.gl_get_proc_address(s) as *const _)
        };
        info!("Created GL context: {}", unsafe {
            gl.get_parameter_string(glow::VERSION)
        });

        Ok(SurfaceContext {
            backend: GlowBackend::new(Rc::new(gl)),
            _gl_context: gl_context,
        })
    }
}
