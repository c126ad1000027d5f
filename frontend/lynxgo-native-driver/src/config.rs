use crate::device::DisplaySize;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

pub const DEFAULT_AXIS_TRIM: f32 = 0.5;
pub const DEFAULT_BACKGROUND_COLOR: u32 = 0xFF08_0808;
pub const DEFAULT_DISPLAY_SIZE: DisplaySize = DisplaySize { width: 480, height: 320 };
pub const DEFAULT_AUDIO_BUFFER_SIZE: u32 = 2048;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error reading config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error parsing config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unable to determine home directory")]
    NoHomeDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Analog stick deflection beyond which a direction counts as held
    pub axis_trim: f32,
    /// ARGB8888 color drawn behind the frame
    pub background_color: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// Audio queue length in stereo frames
    pub audio_buffer_size: u32,
    /// Directory for `.sav` files; defaults to the user's home directory
    pub save_directory: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            axis_trim: DEFAULT_AXIS_TRIM,
            background_color: DEFAULT_BACKGROUND_COLOR,
            display_width: DEFAULT_DISPLAY_SIZE.width,
            display_height: DEFAULT_DISPLAY_SIZE.height,
            audio_buffer_size: DEFAULT_AUDIO_BUFFER_SIZE,
            save_directory: None,
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    #[must_use]
    pub fn display_size(&self) -> DisplaySize {
        DisplaySize { width: self.display_width, height: self.display_height }
    }

    /// # Errors
    ///
    /// Returns an error if no save directory is configured and the home directory is unknown.
    pub fn save_directory(&self) -> Result<PathBuf, ConfigError> {
        if let Some(save_directory) = &self.save_directory {
            return Ok(save_directory.clone());
        }

        BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()).ok_or(ConfigError::NoHomeDir)
    }
}

impl Display for SessionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  axis_trim: {}", self.axis_trim)?;
        writeln!(f, "  background_color: 0x{:08X}", self.background_color)?;
        writeln!(f, "  display: {}", self.display_size())?;
        writeln!(f, "  audio_buffer_size: {}", self.audio_buffer_size)?;
        match &self.save_directory {
            Some(path) => write!(f, "  save_directory: {}", path.display()),
            None => write!(f, "  save_directory: <home>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: SessionConfig = toml::from_str(
            r#"
            axis_trim = 0.25
            save_directory = "/tmp/saves"
            "#,
        )
        .unwrap();

        assert!((config.axis_trim - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.save_directory, Some(PathBuf::from("/tmp/saves")));
        assert_eq!(config.background_color, DEFAULT_BACKGROUND_COLOR);
        assert_eq!(config.display_size(), DEFAULT_DISPLAY_SIZE);
    }

    #[test]
    fn invalid_file_reports_path() {
        let path = std::env::temp_dir().join("lynxgo-config-invalid-test.toml");
        fs::write(&path, "axis_trim = \"high\"").unwrap();

        let err = SessionConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("lynxgo-config-invalid-test.toml"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn configured_save_directory_wins() {
        let config =
            SessionConfig { save_directory: Some("/saves".into()), ..SessionConfig::default() };
        assert_eq!(config.save_directory().unwrap(), PathBuf::from("/saves"));
    }
}
