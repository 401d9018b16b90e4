// RDB - Remote Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Capture configuration
//!
//! Limits that bound the cost of a single capture, plus the project root that
//! decides which stack frames are attributable to user code. The configuration
//! can be built in code or loaded from a TOML file (`~/.rdb.toml` by default).

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default ceiling on the total size of one snapshot.
pub const DEFAULT_MAX_DATA_SIZE: usize = 20_000;
/// Default maximum length of a captured string.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 100;
/// Default maximum number of properties captured per object.
pub const DEFAULT_MAX_PROPERTIES: usize = 10;
/// Default number of raw stack frames inspected.
pub const DEFAULT_MAX_FRAMES: usize = 20;
/// Default number of frames whose arguments and locals are resolved.
pub const DEFAULT_MAX_EXPAND_FRAMES: usize = 5;

/// Configuration consumed by one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Ceiling on the accounted size of a snapshot. `0` disables the limit.
    pub max_data_size: usize,
    /// Strings longer than this are truncated unless they come from a watch
    /// expression. `0` disables the limit.
    pub max_string_length: usize,
    /// Objects with more properties are truncated unless they come from a
    /// watch expression. `0` disables the limit.
    pub max_properties: usize,
    /// Number of raw stack frames inspected at all
    pub max_frames: usize,
    /// Number of stack frames (by position in the full stack) whose arguments
    /// and locals are resolved
    pub max_expand_frames: usize,
    /// Keep frames whose source lives under a dependency directory
    pub include_dependency_directories: bool,
    /// Path components marking third-party code relative to the project root
    pub dependency_directories: Vec<String>,
    /// Frames whose source is outside this directory are not captured
    pub project_root: PathBuf,
    /// Abort a capture on structural invariant violations instead of
    /// logging them and producing best-effort output
    pub strict_invariants: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_data_size: DEFAULT_MAX_DATA_SIZE,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_properties: DEFAULT_MAX_PROPERTIES,
            max_frames: DEFAULT_MAX_FRAMES,
            max_expand_frames: DEFAULT_MAX_EXPAND_FRAMES,
            include_dependency_directories: false,
            dependency_directories: vec!["node_modules".to_string()],
            project_root: PathBuf::from("."),
            strict_invariants: cfg!(debug_assertions),
        }
    }
}

impl CaptureConfig {
    /// Set the project root used for frame eligibility
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Set the snapshot size budget (`0` for unlimited)
    pub fn with_max_data_size(mut self, size: usize) -> Self {
        self.max_data_size = size;
        self
    }

    /// Set the string length limit
    pub fn with_max_string_length(mut self, len: usize) -> Self {
        self.max_string_length = len;
        self
    }

    /// Set the per-object property limit
    pub fn with_max_properties(mut self, count: usize) -> Self {
        self.max_properties = count;
        self
    }

    /// Set the number of raw frames inspected
    pub fn with_max_frames(mut self, count: usize) -> Self {
        self.max_frames = count;
        self
    }

    /// Set the number of frames with resolved arguments and locals
    pub fn with_max_expand_frames(mut self, count: usize) -> Self {
        self.max_expand_frames = count;
        self
    }

    /// Include or exclude frames from dependency directories
    pub fn with_dependency_directories_included(mut self, include: bool) -> Self {
        self.include_dependency_directories = include;
        self
    }

    /// Enable or disable fatal invariant checks
    pub fn with_strict_invariants(mut self, strict: bool) -> Self {
        self.strict_invariants = strict;
        self
    }

    /// Get the default config file path (~/.rdb.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| eyre::eyre!("Unable to determine home directory"))?;
        Ok(home.join(".rdb.toml"))
    }

    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).wrap_err("Failed to parse capture config as TOML")
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded capture configuration");
        Ok(config)
    }

    /// Load configuration from the default path, falling back to defaults when
    /// the file does not exist
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Serialize the configuration as pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).wrap_err("Failed to serialize capture config to TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.max_data_size, 20_000);
        assert_eq!(config.max_string_length, 100);
        assert_eq!(config.max_properties, 10);
        assert_eq!(config.max_frames, 20);
        assert_eq!(config.max_expand_frames, 5);
        assert!(!config.include_dependency_directories);
        assert_eq!(config.dependency_directories, vec!["node_modules"]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CaptureConfig::from_toml_str(
            r#"
max_data_size = 0
project_root = "/srv/app"
"#,
        )
        .unwrap();
        assert_eq!(config.max_data_size, 0);
        assert_eq!(config.project_root, PathBuf::from("/srv/app"));
        assert_eq!(config.max_properties, DEFAULT_MAX_PROPERTIES);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(CaptureConfig::from_toml_str("max_frames = \"many\"").is_err());
    }

    #[test]
    fn test_builder() {
        let config = CaptureConfig::default()
            .with_max_expand_frames(2)
            .with_max_string_length(5)
            .with_strict_invariants(true);
        assert_eq!(config.max_expand_frames, 2);
        assert_eq!(config.max_string_length, 5);
        assert!(config.strict_invariants);
    }
}
