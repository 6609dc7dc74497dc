// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! Friendly wrappers over OpenGL ES shader, program and texture objects.
//!
//! Every resource owns one native name and a small state machine; the native
//! calls go through a [`GlesBackend`], which is either a real `glow` context
//! ([`GlowBackend`]) or the call-recording [`RecordingBackend`].

mod backend;
mod error;
mod gles_state;
#[cfg(not(target_arch = "wasm32"))]
mod glow_backend;
mod handles;
mod program;
mod recording_backend;
mod shader;
mod texture;
mod texture_parameters;

pub use backend::GlesBackend;
pub use error::GlesError;
pub use gles_state::GlesState;
#[cfg(not(target_arch = "wasm32"))]
pub use glow_backend::GlowBackend;
pub use handles::{ProgramHandle, ShaderHandle, TextureHandle};
pub use program::{Program, ProgramState};
pub use recording_backend::{GlCall, RecordingBackend};
pub use shader::{Shader, ShaderKind, ShaderState};
pub use texture::{CubeSide, Texture, TextureKind, TextureState, TextureUnit};
pub use texture_parameters::{MagFilter, MinFilter, TextureParameters, Wrap};
