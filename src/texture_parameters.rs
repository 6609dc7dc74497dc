// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinFilter {
    pub fn native(self) -> u32 {
        match self {
            MinFilter::Nearest => glow::NEAREST,
            MinFilter::Linear => glow::LINEAR,
            MinFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            MinFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
            MinFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            MinFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }

    /// Whether sampling reads levels other than 0.
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagFilter {
    Nearest,
    Linear,
}

impl MagFilter {
    pub fn native(self) -> u32 {
        match self {
            MagFilter::Nearest => glow::NEAREST,
            MagFilter::Linear => glow::LINEAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl Wrap {
    pub fn native(self) -> u32 {
        match self {
            Wrap::Repeat => glow::REPEAT,
            Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
            Wrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        }
    }
}

/// Sampling state applied with `glTexParameteri`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureParameters {
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
}

impl Default for TextureParameters {
    fn default() -> Self {
        Self {
            min_filter: MinFilter::Linear,
            mag_filter: MagFilter::Linear,
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
        }
    }
}

impl TextureParameters {
    /// `(pname, value)` pairs in the order they are applied.
    pub fn native_pairs(&self) -> [(u32, i32); 4] {
        [
            (glow::TEXTURE_MIN_FILTER, self.min_filter.native() as i32),
            (glow::TEXTURE_MAG_FILTER, self.mag_filter.native() as i32),
            (glow::TEXTURE_WRAP_S, self.wrap_s.native() as i32),
            (glow::TEXTURE_WRAP_T, self.wrap_t.native() as i32),
        ]
    }
}
