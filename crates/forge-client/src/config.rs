//! Runtime configuration: TOML file first, then environment overrides.
//! Validated once at startup; a missing API key is fatal.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Checked in order; the first non-empty one wins.
pub const API_KEY_VARS: [&str; 3] = ["FORGE_API_KEY", "GEMINI_API_KEY", "API_KEY"];

#[derive(Debug)]
pub enum ConfigError {
    MissingCredential,
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCredential => write!(
                f,
                "no API key configured: set {} or `api_key` in the config file",
                API_KEY_VARS.join(", ")
            ),
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// On-disk shape of `config.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub generate_images: Option<bool>,
}

#[derive(Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub endpoint: String,
    pub text_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
    pub generate_images: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.redacted_key())
            .field("endpoint", &self.endpoint)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("generate_images", &self.generate_images)
            .finish()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "api_key = \"{}\"", self.redacted_key())?;
        writeln!(f, "endpoint = \"{}\"", self.endpoint)?;
        writeln!(f, "text_model = \"{}\"", self.text_model)?;
        writeln!(f, "image_model = \"{}\"", self.image_model)?;
        writeln!(f, "timeout_secs = {}", self.timeout_secs)?;
        write!(f, "generate_images = {}", self.generate_images)
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// `~/.stellar-forge`, home of the default config file.
pub fn default_base_dir() -> PathBuf {
    home_dir().join(".stellar-forge")
}

pub fn default_config_path() -> PathBuf {
    default_base_dir().join("config.toml")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Resolve from `path`, `$FORGE_CONFIG`, or the default location, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`] with an injectable environment lookup.
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| non_empty(env("FORGE_CONFIG")).map(PathBuf::from));

        let file = match explicit {
            Some(path) => read_file(&path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    read_file(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::resolve(file, env)
    }

    /// Merge a parsed file with environment overrides and validate.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = API_KEY_VARS
            .into_iter()
            .find_map(|var| non_empty(env(var)))
            .or_else(|| non_empty(file.api_key))
            .ok_or(ConfigError::MissingCredential)?;

        let endpoint = non_empty(env("FORGE_ENDPOINT"))
            .or(non_empty(file.endpoint))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let text_model = non_empty(env("FORGE_TEXT_MODEL"))
            .or(non_empty(file.text_model))
            .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string());
        let image_model = non_empty(env("FORGE_IMAGE_MODEL"))
            .or(non_empty(file.image_model))
            .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());

        let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }

        Ok(Self {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            text_model,
            image_model,
            timeout_secs,
            generate_images: file.generate_images.unwrap_or(true),
        })
    }

    /// Last four characters only.
    pub fn redacted_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
