// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use thiserror::Error;

/// Every fallible operation on a GL ES resource reports one of these.
#[derive(Debug, Error)]
pub enum GlesError {
    /// The caller passed something unusable (negative mip level, empty source, wrong face...).
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Reading shader source text from a file or stream failed.
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// The driver refused to allocate a native object.
    #[error("Resource Error: {0}")]
    Resource(String),

    /// The resource is deleted, or not yet in the state the operation needs.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Shader compilation failed: {0}")]
    Compile(String),

    #[error("Program linking failed: {0}")]
    Link(String),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),
}

impl GlesError {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        GlesError::Argument(msg.into())
    }

    pub(crate) fn illegal_state(msg: impl Into<String>) -> Self {
        GlesError::IllegalState(msg.into())
    }
}
