// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use dirs_next::config_dir;
use friendly_gles::TextureParameters;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

const APP_DIR: &str = "TriangleExample";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurfaceSettings {
    pub egl_context_client_version: u8,
    /// Keep the GL context (and every object in it) alive while paused.
    pub preserve_context_on_pause: bool,
    pub vsync: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RendererSettings {
    pub clear_color: [f32; 4],
    /// Edge length of the generated checkerboard texture, in pixels.
    pub checker_size: u32,
    pub texture: TextureParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub window: WindowSettings,
    pub surface: SurfaceSettings,
    pub renderer: RendererSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings {
                title: String::from("OpenGL ES Triangle"),
                width: 800,
                height: 600,
            },
            surface: SurfaceSettings {
                egl_context_client_version: 2,
                preserve_context_on_pause: true,
                vsync: true,
            },
            renderer: RendererSettings {
                clear_color: [0.1, 0.1, 0.12, 1.0],
                checker_size: 8,
                texture: TextureParameters::default(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization/Deserialization Error: {0}")]
    Serde(#[from] toml::de::Error),

    #[error("Serialization Error: {0}")]
    SerdeSer(#[from] toml::ser::Error),

    #[error("Configuration Directory Not Found")]
    ConfigDirNotFound,
}

impl Settings {
    fn user_settings_path() -> Result<PathBuf, SettingsError> {
        let config_dir = config_dir().ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(config_dir
            .join(APP_DIR)
            .join("settings")
            .join("user_settings.toml"))
    }

    fn default_settings_path() -> Result<PathBuf, SettingsError> {
        let config_dir = config_dir().ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(config_dir
            .join(APP_DIR)
            .join("settings")
            .join("default_settings.toml"))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to `path`, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// User settings, else the default file, else hardcoded defaults. Never fails.
    pub fn load_user_settings() -> Settings {
        match Settings::initialize_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Error initializing settings: {}. Using hardcoded defaults.", e);
                Settings::default()
            }
        }
    }

    fn initialize_settings() -> Result<Self, SettingsError> {
        let user_settings_path = Settings::user_settings_path()?;
        let default_settings_path = Settings::default_settings_path()?;

        if user_settings_path.exists() {
            match Settings::load_from_file(&user_settings_path) {
                Ok(settings) => Ok(settings),
                Err(e) => {
                    warn!(
                        "Failed to load user settings: {}. Attempting to load defaults.",
                        e
                    );
                    Settings::load_defaults(user_settings_path, default_settings_path)
                }
            }
        } else {
            info!("User settings not found. Loading default settings.");
            Settings::load_defaults(user_settings_path, default_settings_path)
        }
    }

    /// Loads the default file (writing it out first if missing) and copies it to the user path.
    fn load_defaults(user_path: PathBuf, default_path: PathBuf) -> Result<Self, SettingsError> {
        if default_path.exists() {
            let settings = Settings::load_from_file(&default_path)?;
            settings.save_to_file(&user_path)?;
            info!("Default settings loaded and saved as user settings.");
            Ok(settings)
        } else {
            warn!("Default settings file not found. Using hardcoded defaults.");
            let settings = Settings::default();
            settings.save_to_file(&default_path)?;
            settings.save_to_file(&user_path)?;
            Ok(settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friendly_gles::{MagFilter, MinFilter, Wrap};
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    /// Points dirs-next at a temporary config directory for the duration of `f`.
    fn with_temp_config_dir<F: FnOnce(&Path)>(f: F) {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let original_home = env::var("HOME").ok();
        let original_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("HOME", temp_dir.path());
        env::set_var("XDG_CONFIG_HOME", temp_dir.path());

        f(temp_dir.path());

        match original_home {
            Some(val) => env::set_var("HOME", val),
            None => env::remove_var("HOME"),
        }
        match original_xdg {
            Some(val) => env::set_var("XDG_CONFIG_HOME", val),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_user_settings_path_retrieval() {
        with_temp_config_dir(|config_dir| {
            let expected = config_dir
                .join(APP_DIR)
                .join("settings")
                .join("user_settings.toml");
            assert_eq!(Settings::user_settings_path().unwrap(), expected);
        });
    }

    #[test]
    fn test_default_surface_asks_for_gles2_and_preserves_context() {
        let settings = Settings::default();
        assert_eq!(settings.surface.egl_context_client_version, 2);
        assert!(settings.surface.preserve_context_on_pause);
    }

    #[test]
    fn test_load_from_valid_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
            [window]
            title = "Test"
            width = 320
            height = 240

            [surface]
            egl_context_client_version = 2
            preserve_context_on_pause = false
            vsync = false

            [renderer]
            clear_color = [1.0, 0.0, 0.0, 1.0]
            checker_size = 4

            [renderer.texture]
            min_filter = "nearest"
            mag_filter = "nearest"
            wrap_s = "clamp_to_edge"
            wrap_t = "clamp_to_edge"
        "#,
        )
        .unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.window.width, 320);
        assert!(!settings.surface.preserve_context_on_pause);
        assert_eq!(settings.renderer.clear_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(settings.renderer.texture.min_filter, MinFilter::Nearest);
        assert_eq!(settings.renderer.texture.mag_filter, MagFilter::Nearest);
        assert_eq!(settings.renderer.texture.wrap_t, Wrap::ClampToEdge);
    }

    #[test]
    fn test_load_from_invalid_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[window]\ntitle = 3").unwrap();
        assert!(matches!(
            Settings::load_from_file(&path),
            Err(SettingsError::Serde(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let mut settings = Settings::default();
        settings.window.title = String::from("Saved");
        settings.save_to_file(&path).unwrap();
        assert_eq!(Settings::load_from_file(&path).unwrap(), settings);
    }

    #[test]
    #[serial]
    fn test_first_run_writes_default_and_user_files() {
        with_temp_config_dir(|_| {
            let settings = Settings::load_user_settings();
            assert_eq!(settings, Settings::default());
            assert!(Settings::user_settings_path().unwrap().exists());
            assert!(Settings::default_settings_path().unwrap().exists());
        });
    }

    #[test]
    #[serial]
    fn test_corrupt_user_file_falls_back_to_defaults() {
        with_temp_config_dir(|_| {
            let default_path = Settings::default_settings_path().unwrap();
            let mut defaults = Settings::default();
            defaults.window.width = 1024;
            defaults.save_to_file(&default_path).unwrap();

            let user_path = Settings::user_settings_path().unwrap();
            fs::write(&user_path, "not = [valid").unwrap();

            let settings = Settings::load_user_settings();
            assert_eq!(settings.window.width, 1024);
            // the user file was repaired from the defaults
            assert_eq!(Settings::load_from_file(&user_path).unwrap(), defaults);
        });
    }
}
