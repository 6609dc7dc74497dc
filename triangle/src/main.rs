// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

mod settings;
mod surface_view;
mod triangle_renderer;

use std::thread::sleep;
use std::time::Duration;

use log::{error, info};
use sdl2::event::{Event, WindowEvent};

use crate::settings::Settings;
use crate::surface_view::{SurfaceError, SurfaceView};
use crate::triangle_renderer::TriangleRenderer;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Owns the surface view and forwards window visibility to it as resume/pause.
fn run() -> Result<(), SurfaceError> {
    let settings = Settings::load_user_settings();
    let sdl = sdl2::init().map_err(SurfaceError::Sdl)?;

    let renderer = TriangleRenderer::new(settings.renderer.clone());
    let mut surface_view = SurfaceView::new(&sdl, &settings, renderer)?;
    surface_view.on_resume();

    let mut events = sdl.event_pump().map_err(SurfaceError::Sdl)?;
    let idle = Duration::from_millis(16);

    'running: loop {
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. } => break 'running,
                Event::Window { win_event, .. } => match win_event {
                    WindowEvent::Minimized | WindowEvent::Hidden => surface_view.on_pause(),
                    WindowEvent::Restored | WindowEvent::Shown => surface_view.on_resume(),
                    WindowEvent::SizeChanged(..) => surface_view.on_size_changed(),
                    _ => {}
                },
                _ => {}
            }
        }

        if !surface_view.draw_frame()? {
            sleep(idle);
        }
    }

    surface_view.shutdown();
    info!("Bye");
    Ok(())
}
