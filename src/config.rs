//! Configuration management for LILAC using the prefer crate.
//!
//! A config file (`lilac.toml`, `lilac.json`, `lilac.yaml`, ...) is discovered
//! with prefer or passed explicitly, parsed with serde according to its
//! extension, and folded into [`Settings`] together with environment
//! overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{default_categories, CategoryDefinition};
use crate::ocr::OcrConfig;

/// Default archive API root.
pub const DEFAULT_API_URL: &str = "http://localhost/LILAC/api";

/// Filename of the persisted recent-uploads list inside the data directory.
pub const RECENT_UPLOADS_FILENAME: &str = "lilac_recent_uploads.json";

/// Environment variable overriding the archive API root.
pub const API_URL_ENV: &str = "LILAC_API_URL";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "LILAC_DATA_DIR";

/// Upload coordinator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Entries kept in the recent-uploads list.
    #[serde(default = "default_max_recent_uploads")]
    pub max_recent_uploads: usize,
    /// Give a reserved name back when its submission fails.
    #[serde(default = "default_true")]
    pub release_failed_names: bool,
}

fn default_max_recent_uploads() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_recent_uploads: default_max_recent_uploads(),
            release_failed_names: true,
        }
    }
}

/// Content extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Run OCR at all; when false only filenames are classified.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Images larger than this are not OCR'd.
    #[serde(default = "default_image_max_bytes")]
    pub image_max_bytes: u64,
    /// Excerpt length in characters.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Leading PDF pages rendered for OCR.
    #[serde(default = "default_pdf_max_pages")]
    pub pdf_max_pages: u32,
    #[serde(default = "default_render_dpi")]
    pub render_dpi: u32,
    /// Tesseract language code.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_image_max_bytes() -> u64 {
    6 * 1024 * 1024
}

fn default_excerpt_chars() -> usize {
    3000
}

fn default_pdf_max_pages() -> u32 {
    2
}

fn default_render_dpi() -> u32 {
    150
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image_max_bytes: default_image_max_bytes(),
            excerpt_chars: default_excerpt_chars(),
            pdf_max_pages: default_pdf_max_pages(),
            render_dpi: default_render_dpi(),
            language: default_language(),
        }
    }
}

impl ExtractionConfig {
    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            language: self.language.clone(),
            render_dpi: self.render_dpi,
        }
    }
}

/// Lifecycle manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Client-side timeout for each store call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LifecycleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Application settings, resolved from config file, environment and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory (recent uploads live here).
    pub data_dir: PathBuf,
    /// Archive API root.
    pub api_url: String,
    pub upload: UploadConfig,
    pub extraction: ExtractionConfig,
    pub lifecycle: LifecycleConfig,
    /// Category rules in configuration order.
    pub categories: Vec<CategoryDefinition>,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/.local/share/lilac, falling back to the home or current directory
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lilac");

        Self {
            data_dir,
            api_url: DEFAULT_API_URL.to_string(),
            upload: UploadConfig::default(),
            extraction: ExtractionConfig::default(),
            lifecycle: LifecycleConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Path of the persisted recent-uploads list.
    pub fn recent_uploads_path(&self) -> PathBuf {
        self.data_dir.join(RECENT_UPLOADS_FILENAME)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Archive API root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Category rules; the built-in set is used when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryDefinition>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        match prefer::load("lilac").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            Err(_) => {
                tracing::debug!("No lilac config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref api_url) = self.api_url {
            settings.api_url = api_url.clone();
        }
        settings.upload = self.upload.clone();
        settings.extraction = self.extraction.clone();
        settings.lifecycle = self.lifecycle.clone();
        if !self.categories.is_empty() {
            settings.categories = self.categories.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory (--data flag).
    pub data_dir: Option<PathBuf>,
    /// Archive API root (--api-url flag).
    pub api_url: Option<String>,
}

/// Load settings with explicit options.
///
/// Precedence, lowest to highest: defaults, config file, environment,
/// command-line flags.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Config::default()
        }),
        None => Config::load().await,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = config.base_dir().unwrap_or_else(|| cwd.clone());

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(data_dir) = env_var(DATA_DIR_ENV) {
        tracing::debug!("Using {} from environment: {}", DATA_DIR_ENV, data_dir);
        settings.data_dir = config.resolve_path(&data_dir, &cwd);
    }
    if let Some(api_url) = env_var(API_URL_ENV) {
        tracing::debug!("Using {} from environment: {}", API_URL_ENV, api_url);
        settings.api_url = api_url;
    }

    if let Some(data_dir) = options.data_dir {
        settings.data_dir = config.resolve_path(&data_dir.to_string_lossy(), &cwd);
    }
    if let Some(api_url) = options.api_url {
        settings.api_url = api_url;
    }

    (settings, config)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::with_data_dir(PathBuf::from("/tmp/lilac"));
        assert_eq!(settings.upload.max_recent_uploads, 50);
        assert!(settings.upload.release_failed_names);
        assert_eq!(settings.extraction.image_max_bytes, 6_291_456);
        assert_eq!(settings.extraction.excerpt_chars, 3000);
        assert_eq!(settings.extraction.pdf_max_pages, 2);
        assert_eq!(settings.lifecycle.timeout(), Duration::from_secs(10));
        assert_eq!(settings.categories.len(), 5);
        assert_eq!(
            settings.recent_uploads_path(),
            PathBuf::from("/tmp/lilac/lilac_recent_uploads.json")
        );
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::parse(
            r#"
            data_dir = "archive"
            api_url = "https://lilac.example.edu/api"

            [upload]
            max_recent_uploads = 5

            [extraction]
            enabled = false

            [[categories]]
            name = "MOUs & MOAs"
            keywords = ["MOU", "MOA"]
            patterns = ['/\b(MOU|MOA)\b/i']
            priority = 9
            "#,
            "toml",
        )
        .unwrap();

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/srv"));
        assert_eq!(settings.data_dir, PathBuf::from("/srv/archive"));
        assert_eq!(settings.api_url, "https://lilac.example.edu/api");
        assert_eq!(settings.upload.max_recent_uploads, 5);
        assert!(settings.upload.release_failed_names);
        assert!(!settings.extraction.enabled);
        assert_eq!(settings.extraction.language, "eng");
        assert_eq!(settings.categories.len(), 1);
        assert_eq!(settings.categories[0].priority, 9);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse("lifecycle:\n  timeout_secs: 3\n", "yaml").unwrap();
        assert_eq!(yaml.lifecycle.timeout_secs, 3);

        let json = Config::parse(r#"{"upload": {"release_failed_names": false}}"#, "json").unwrap();
        assert!(!json.upload.release_failed_names);
        assert_eq!(json.upload.max_recent_uploads, 50);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Config::parse("data_dir = [", "toml").unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[tokio::test]
    async fn test_load_from_path_records_source() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lilac.toml");
        std::fs::write(&path, "data_dir = \"data\"\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.data_dir, dir.path().join("data"));
    }
}
