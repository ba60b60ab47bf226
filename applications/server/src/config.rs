/// Server configuration
use crate::error::{Result, ServerError};
use juicebox_core::MediaRoot;
use juicebox_importer::{AudioFormat, IngestConfig};
use juicebox_playback::{DeviceAddress, PlaybackConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Root of the canonical song tree
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// In-flight uploads; keep on the same filesystem as `library_dir`
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// `host[:port]` or the path of a Unix socket
    #[serde(default = "default_device_address")]
    pub address: String,

    /// The library directory as the daemon sees it. Defaults to `storage.library_dir`.
    #[serde(default)]
    pub music_root: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestSettings {
    #[serde(default = "default_formats")]
    pub formats: Vec<AudioFormat>,

    #[serde(default = "default_path_template")]
    pub path_template: String,

    #[serde(default)]
    pub normalize: bool,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    #[serde(default)]
    pub cover_art: bool,

    #[serde(default = "default_cover_art_timeout_secs")]
    pub cover_art_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from `config.toml` in the working directory and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file (or `config.toml`) and the environment
    ///
    /// Environment variables use the `JUICEBOX_` prefix and `__` between
    /// sections, e.g. `JUICEBOX_DEVICE__ADDRESS=music-box:6600`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("config.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("JUICEBOX")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ingest.formats")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(ServerError::Config(
                "storage.database_url must not be empty".to_string(),
            ));
        }

        if self.ingest.formats.is_empty() {
            return Err(ServerError::Config(
                "ingest.formats must list at least one format".to_string(),
            ));
        }

        if !self.ingest.path_template.contains("{Title}") {
            return Err(ServerError::Config(format!(
                "ingest.path_template must contain {{Title}}: {}",
                self.ingest.path_template
            )));
        }

        if self.device.timeout_secs == 0 {
            return Err(ServerError::Config(
                "device.timeout_secs must be greater than zero".to_string(),
            ));
        }

        self.device_address()?;

        Ok(())
    }

    pub fn device_address(&self) -> Result<DeviceAddress> {
        self.device
            .address
            .parse()
            .map_err(|e| ServerError::Config(format!("device.address: {}", e)))
    }

    /// Library directory as seen by the playback daemon
    pub fn music_root(&self) -> &Path {
        self.device
            .music_root
            .as_deref()
            .unwrap_or(&self.storage.library_dir)
    }

    /// Mapping from stored song locations to daemon queue references
    pub fn media_root(&self) -> MediaRoot {
        MediaRoot::new(&self.storage.library_dir).with_device_root(self.music_root())
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            timeout: Duration::from_secs(self.device.timeout_secs),
            reconnect_backoff: Duration::from_millis(self.device.reconnect_backoff_ms),
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            library_dir: self.storage.library_dir.clone(),
            scratch_dir: self.storage.scratch_dir.clone(),
            formats: self.ingest.formats.clone(),
            path_template: self.ingest.path_template.clone(),
            normalize: self.ingest.normalize,
            ffmpeg_path: self.ingest.ffmpeg_path.clone(),
            cover_art: self.ingest.cover_art,
            cover_art_timeout: Duration::from_secs(self.ingest.cover_art_timeout_secs),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://./data/juicebox.db".to_string()
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("./data/music")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("./data/music/.scratch")
}

fn default_device_address() -> String {
    "localhost:6600".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_reconnect_backoff_ms() -> u64 {
    250
}

fn default_formats() -> Vec<AudioFormat> {
    AudioFormat::defaults()
}

fn default_path_template() -> String {
    juicebox_importer::path_template::DEFAULT_TEMPLATE.to_string()
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_cover_art_timeout_secs() -> u64 {
    5
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            library_dir: default_library_dir(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: default_device_address(),
            music_root: None,
            timeout_secs: default_timeout_secs(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            path_template: default_path_template(),
            normalize: false,
            ffmpeg_path: default_ffmpeg_path(),
            cover_art: false,
            cover_art_timeout_secs: default_cover_art_timeout_secs(),
        }
    }
}
