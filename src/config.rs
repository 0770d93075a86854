//! Viewport and timing configuration.
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration.

use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::DEFAULT_MAX_SECTORS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render target width in pixels
    pub image_width: usize,
    pub aspect_numerator: f64,
    pub aspect_denominator: f64,
    /// Horizontal field of view is `PI / fov_denominator`
    pub fov_denominator: f64,
    /// Integer pixel scale applied when presenting
    pub scale: usize,
    /// Fixed ticks per second
    pub frame_rate: u32,
    pub max_sectors: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_width: 320,
            aspect_numerator: 4.0,
            aspect_denominator: 3.0,
            fov_denominator: 2.0,
            scale: 3,
            frame_rate: 60,
            max_sectors: DEFAULT_MAX_SECTORS,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
            }
        };

        if self.image_width == 0 {
            return Err(ConfigError::Invalid("image_width must be positive".into()));
        }
        positive("aspect_numerator", self.aspect_numerator)?;
        positive("aspect_denominator", self.aspect_denominator)?;
        if !(self.fov_denominator.is_finite() && self.fov_denominator > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fov_denominator must be greater than 1, got {}",
                self.fov_denominator
            )));
        }
        if self.scale == 0 {
            return Err(ConfigError::Invalid("scale must be at least 1".into()));
        }
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be positive".into()));
        }
        if self.max_sectors == 0 {
            return Err(ConfigError::Invalid("max_sectors must be positive".into()));
        }
        if self.image_height() == 0 {
            return Err(ConfigError::Invalid("image height rounds to zero".into()));
        }
        let fits = |side: usize| {
            side.checked_mul(self.scale)
                .is_some_and(|px| u32::try_from(px).is_ok())
        };
        if !(fits(self.image_width) && fits(self.image_height())) {
            return Err(ConfigError::Invalid(format!(
                "{}x{} at scale {} does not fit a window",
                self.image_width,
                self.image_height(),
                self.scale
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_numerator / self.aspect_denominator
    }

    pub fn image_height(&self) -> usize {
        (self.image_width as f64 / self.aspect_ratio()).round() as usize
    }

    /// Full horizontal field of view in radians
    #[inline]
    pub fn fov(&self) -> f64 {
        PI / self.fov_denominator
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }

    /// Window size in physical pixels
    pub fn window_size(&self) -> (usize, usize) {
        (self.image_width * self.scale, self.image_height() * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_derive_viewport() {
        let config = Config::default();
        assert_eq!(config.image_height(), 240);
        assert_relative_eq!(config.fov(), PI / 2.0);
        assert_eq!(config.window_size(), (960, 720));
        assert_eq!(config.tick_interval(), Duration::from_secs_f64(1.0 / 60.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{ "image_width": 640, "aspect_numerator": 16, "aspect_denominator": 9 }"#,
        )
        .unwrap();
        assert_eq!(config.image_width, 640);
        assert_eq!(config.image_height(), 360);
        assert_eq!(config.frame_rate, 60);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            Config::from_json(r#"{ "scale": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "fov_denominator": 1 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn oversized_window_is_rejected() {
        let config = Config {
            image_width: usize::MAX / 2,
            scale: 3,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let wide = Config {
            image_width: u32::MAX as usize + 1,
            scale: 1,
            ..Config::default()
        };
        assert!(matches!(wide.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Config::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
